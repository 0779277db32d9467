use std::io::Error as IoError;

use heartcheck::CacheError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Cache store error: {0}")]
    Cache(#[from] CacheError),
}
