//! Cache-or-probe decision engine for TLS heartbeat checks.
//!
//! A request for a host flows through the [`Orchestrator`]: a cache lookup
//! through a [`VerdictCache`], a freshness check against the configured
//! [`FreshnessPolicy`], and, when the cached verdict cannot be reused, a live
//! [`ProbeEngine`] call whose outcome is classified and written back.

pub mod cache;
pub mod clock;
pub mod freshness;
pub mod orchestrator;
pub mod probe;
pub mod target;
pub mod verdict;

pub use cache::{CacheError, CacheRecord, LibsqlCache, VerdictCache};
pub use clock::{Clock, SystemClock};
pub use freshness::FreshnessPolicy;
pub use orchestrator::Orchestrator;
pub use probe::{HeartbleedProbe, ProbeEngine, ProbeError, ProbeOutcome};
pub use target::Target;
pub use verdict::{Report, StatusCode, Verdict, classify};
