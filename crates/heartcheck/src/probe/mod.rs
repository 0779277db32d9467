//! Probe engines: the live check behind a cache miss.
//!
//! The orchestrator only knows the [`ProbeEngine`] trait. Deadlines belong to
//! the engine; dropping the returned future abandons the probe.

pub mod heartbleed;
pub mod tls;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::target::Target;

pub use heartbleed::HeartbleedProbe;

/// What a probe found when it completed its exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target refused to over-read.
    NotExploitable,
    /// The target echoed back memory beyond the request payload.
    Leaked(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unknown service {0:?}")]
    UnknownService(String),

    #[error("{0:#}")]
    Io(#[from] io::Error),
}

#[async_trait]
pub trait ProbeEngine: Send + Sync {
    /// Run a single probe attempt against `target`.
    async fn probe(&self, target: &Target) -> Result<ProbeOutcome, ProbeError>;
}
