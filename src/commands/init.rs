//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: Option<PathBuf>,
    pub force: bool,
}

/// Write a default configuration file
pub fn cmd_init(options: InitOptions) -> Result<Config> {
    let base_dir = options
        .base_dir
        .clone()
        .unwrap_or_else(Config::default_base_dir);
    let config_path = base_dir.join("config.toml");

    if config_path.exists() && !options.force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let config = Config::init(Some(base_dir))?;
    info!("Initialized docket at {}", config.paths.base_dir.display());
    Ok(config)
}

pub fn print_init(config: &Config) {
    println!("\n✓ docket initialized\n");
    println!("Configuration: {}", config.paths.config_file.display());
    println!("Index directory: {}", config.index_dir.display());
    println!("Case data: {}", config.data_file.display());
    println!("\nNext: run 'docket build' to index the case law data.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let options = InitOptions {
            base_dir: Some(tmp.path().to_path_buf()),
            force: false,
        };

        let config = cmd_init(options.clone()).unwrap();
        assert!(config.paths.config_file.exists());
        assert_eq!(config.index_dir, tmp.path().join("index"));

        assert!(matches!(
            cmd_init(options.clone()).unwrap_err(),
            Error::Config(_)
        ));

        let forced = InitOptions {
            force: true,
            ..options
        };
        assert!(cmd_init(forced).is_ok());
    }
}
