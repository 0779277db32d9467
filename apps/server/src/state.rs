use std::time::Duration;

use heartcheck::Orchestrator;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub redirect_url: String,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, redirect_url: String, request_timeout: Duration) -> Self {
        Self { orchestrator, redirect_url, request_timeout }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use heartcheck::cache::{CacheError, CacheRecord, VerdictCache};
    use heartcheck::clock::{Clock, SystemClock};
    use heartcheck::probe::{ProbeEngine, ProbeError, ProbeOutcome};
    use heartcheck::{FreshnessPolicy, Orchestrator, StatusCode, Target};

    use super::AppState;

    pub const REDIRECT_URL: &str = "https://landing.example";

    #[derive(Default)]
    pub struct MapCache(Mutex<HashMap<String, CacheRecord>>);

    #[async_trait]
    impl VerdictCache for MapCache {
        async fn get(&self, host: &str) -> Option<CacheRecord> {
            self.0.lock().unwrap().get(host).cloned()
        }

        async fn put(&self, host: &str, status: StatusCode) -> Result<(), CacheError> {
            let record = CacheRecord { host: host.to_owned(), last_update: SystemClock.now(), status };
            self.0.lock().unwrap().insert(host.to_owned(), record);
            Ok(())
        }
    }

    /// Answers by host: `vuln.*` leaks, `down.*` fails, anything else is safe.
    #[derive(Default)]
    pub struct ByNameProbe {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ProbeEngine for ByNameProbe {
        async fn probe(&self, target: &Target) -> Result<ProbeOutcome, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if target.host.starts_with("vuln.") {
                Ok(ProbeOutcome::Leaked(b"heartbleed.mozilla.com\x00secret".to_vec()))
            } else if target.host.starts_with("down.") {
                Err(ProbeError::Timeout(Duration::from_secs(10)))
            } else {
                Ok(ProbeOutcome::NotExploitable)
            }
        }
    }

    pub fn state(probe: Arc<ByNameProbe>) -> AppState {
        let orchestrator = Orchestrator::new(
            Arc::new(MapCache::default()),
            probe,
            FreshnessPolicy::new(Duration::from_secs(600)),
            Arc::new(SystemClock),
        );
        AppState::new(orchestrator, REDIRECT_URL.to_owned(), Duration::from_secs(5))
    }
}
