use std::fmt;

use serde::{Deserialize, Serialize};

use crate::probe::{ProbeError, ProbeOutcome};

/// Canonical classification of a target, with its stored integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    Vulnerable = 0,
    Safe = 1,
    Error = 2,
}

impl StatusCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`StatusCode::code`]; `None` for codes this system never writes.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Vulnerable),
            1 => Some(Self::Safe),
            2 => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Vulnerable => write!(f, "VULNERABLE"),
            StatusCode::Safe => write!(f, "SAFE"),
            StatusCode::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of evaluating a target.
///
/// Leaked bytes only exist on `Vulnerable`, a message only on `Error`.
/// Verdicts served from the cache carry empty ones, since only the status
/// code is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Vulnerable(Vec<u8>),
    Safe,
    Error(String),
}

impl Verdict {
    pub fn status(&self) -> StatusCode {
        match self {
            Verdict::Vulnerable(_) => StatusCode::Vulnerable,
            Verdict::Safe => StatusCode::Safe,
            Verdict::Error(_) => StatusCode::Error,
        }
    }

    /// Verdict rebuilt from a stored status code alone.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::Vulnerable => Verdict::Vulnerable(Vec::new()),
            StatusCode::Safe => Verdict::Safe,
            StatusCode::Error => Verdict::Error(String::new()),
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Verdict::Vulnerable(data) => data,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> &str {
        match self {
            Verdict::Error(message) => message,
            _ => "",
        }
    }
}

/// Map a single probe attempt onto a verdict.
pub fn classify(outcome: Result<ProbeOutcome, ProbeError>) -> Verdict {
    match outcome {
        Ok(ProbeOutcome::NotExploitable) => Verdict::Safe,
        Ok(ProbeOutcome::Leaked(data)) => Verdict::Vulnerable(data),
        Err(error) => Verdict::Error(error.to_string()),
    }
}

/// JSON body returned to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub code: u8,
    pub data: String,
    pub error: String,
}

impl From<&Verdict> for Report {
    fn from(verdict: &Verdict) -> Self {
        Self {
            code: verdict.status().code(),
            data: String::from_utf8_lossy(verdict.payload()).into_owned(),
            error: verdict.error_message().to_owned(),
        }
    }
}

impl From<Verdict> for Report {
    fn from(verdict: Verdict) -> Self {
        Self::from(&verdict)
    }
}
