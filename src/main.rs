//! docket CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docket::{
    commands::{
        cmd_ask, cmd_build, cmd_classify, cmd_init, cmd_search, cmd_status, print_build_report,
        print_chat_response, print_classification, print_init, print_search_report, print_status,
        BuildOptions, InitOptions, SearchOptions,
    },
    config::Config,
    embed::{Embedder, HttpEmbedder},
    error::Result,
    pipeline::AppContext,
    progress::LogWriterFactory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docket")]
#[command(version, about = "Grounded question answering over court opinions", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Chunk, embed and persist the case law corpus
    Build {
        /// Case data file (defaults to data_file from config)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Only index the first N cases
        #[arg(long)]
        max_cases: Option<usize>,

        /// Batch size for embedding
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Ask a legal research question
    Ask {
        /// The question
        message: String,

        /// Append a sources section to the answer text
        #[arg(long)]
        inline_sources: bool,
    },

    /// Search the index without classification or generation
    Search {
        /// The search query
        query: String,

        /// Number of results (1-20)
        #[arg(short, long)]
        k: Option<usize>,

        /// Candidates fetched before filtering
        #[arg(long)]
        retrieve_k: Option<usize>,

        /// Metadata filter as JSON, e.g. '{"court": "del"}'
        #[arg(long)]
        filter: Option<String>,
    },

    /// Classify a query as legal or off-topic
    Classify {
        /// The query to classify
        query: String,
    },

    /// Show system status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "docket", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Init { force } = cli.command {
        init_logging(cli.verbose, cli.log_json, "info");
        let options = InitOptions {
            base_dir: cli.config.as_deref().map(base_dir_for),
            force,
        };
        let config = cmd_init(options)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            print_init(&config);
        }
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, cli.log_json, &config.log_level);

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Build {
            data,
            max_cases,
            batch_size,
        } => {
            let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(&config.embedding)?);
            let options = BuildOptions {
                data_file: data,
                max_cases,
                batch_size,
                quiet: cli.json,
            };
            let report = cmd_build(&config, embedder, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_build_report(&report);
            }
        }

        Commands::Ask {
            message,
            inline_sources,
        } => {
            let ctx = AppContext::load(config)?;
            let response = cmd_ask(&ctx, &message, inline_sources).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_chat_response(&response);
            }
        }

        Commands::Search {
            query,
            k,
            retrieve_k,
            filter,
        } => {
            let ctx = AppContext::load(config)?;
            let options = SearchOptions {
                k,
                retrieve_k,
                filter,
            };
            let report = cmd_search(&ctx, &query, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_search_report(&report);
            }
        }

        Commands::Classify { query } => {
            let ctx = AppContext::from_config(config)?;
            let result = cmd_classify(&ctx, &query).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_classification(&query, &result);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

/// RUST_LOG wins, then --verbose, then the configured level
fn init_logging(verbose: bool, json: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(default_level)
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(LogWriterFactory::default()))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(LogWriterFactory::default()))
            .init();
    }
}

/// A `--config` value may name either the toml file or its directory
fn base_dir_for(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|e| e == "toml") {
        path.parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir)
    } else {
        path.to_path_buf()
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) if p.extension().is_some_and(|e| e == "toml") => Config::load(p),
        Some(dir) => Config::load_from(Some(dir.to_path_buf())),
        None => Config::load_from(None),
    }
}
