//! Per-request cache-or-probe lifecycle.
//!
//! `lookup -> fresh? -> respond` on a usable hit, otherwise
//! `probe -> classify -> write back -> respond`. Requests never coordinate
//! with each other: concurrent misses for one host each probe and each write,
//! and the last write wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::VerdictCache;
use crate::clock::Clock;
use crate::freshness::FreshnessPolicy;
use crate::probe::ProbeEngine;
use crate::target::{DEFAULT_SERVICE, Target};
use crate::verdict::{Verdict, classify};

pub struct Orchestrator {
    cache: Arc<dyn VerdictCache>,
    probe: Arc<dyn ProbeEngine>,
    policy: FreshnessPolicy,
    clock: Arc<dyn Clock>,
    service: String,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<dyn VerdictCache>,
        probe: Arc<dyn ProbeEngine>,
        policy: FreshnessPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { cache, probe, policy, clock, service: DEFAULT_SERVICE.to_owned() }
    }

    /// Service name attached to every parsed target.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Evaluate `raw` (a host or a URL).
    ///
    /// Cancel-safe: dropping the future abandons whichever cache call or probe
    /// is in flight.
    pub async fn check(&self, raw: &str) -> Verdict {
        let target = Target::parse(raw, &self.service);
        if target.host.is_empty() {
            return Verdict::Error("no target host given".into());
        }

        if let Some(verdict) = self.lookup(&target).await {
            return verdict;
        }

        self.refresh(&target).await
    }

    /// [`Orchestrator::check`] bounded by the caller's deadline.
    ///
    /// On expiry the lifecycle is dropped mid-flight, nothing is written back
    /// and the caller gets an `Error` verdict.
    pub async fn check_within(&self, raw: &str, deadline: Duration) -> Verdict {
        match tokio::time::timeout(deadline, self.check(raw)).await {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!(input = raw, ?deadline, "Request deadline exceeded, abandoning check");
                Verdict::Error(format!("request deadline of {deadline:?} exceeded"))
            }
        }
    }

    async fn lookup(&self, target: &Target) -> Option<Verdict> {
        let record = self.cache.get(target.key()).await?;

        if self.policy.is_fresh(record.last_update, self.clock.now()) {
            debug!(host = %target.host, status = %record.status, "Serving cached verdict");
            Some(Verdict::from_status(record.status))
        } else {
            info!("Refetching {}", target.host);
            None
        }
    }

    async fn refresh(&self, target: &Target) -> Verdict {
        let verdict = classify(self.probe.probe(target).await);
        info!("{} - {}", target.host, verdict.status());

        if let Err(error) = self.cache.put(target.key(), verdict.status()).await {
            warn!(host = %target.host, %error, "Failed to cache verdict");
        }

        verdict
    }
}
