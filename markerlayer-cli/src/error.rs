//! CLI error type.

use markerlayer::config::ConfigError;
use markerlayer::coordinator::daemon::SubmitError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] ConfigError),

    #[error("coordinator unavailable: {0}")]
    Submit(#[from] SubmitError),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
