//! CLI commands implementation

pub mod ask;
pub mod build;
pub mod classify;
pub mod init;
pub mod search;
pub mod status;

pub use ask::*;
pub use build::*;
pub use classify::*;
pub use init::*;
pub use search::*;
pub use status::*;
