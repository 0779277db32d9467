//! Fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use heartcheck::cache::{CacheError, CacheRecord, LibsqlCache, VerdictCache};
use heartcheck::clock::{Clock, ManualClock};
use heartcheck::probe::{ProbeEngine, ProbeError, ProbeOutcome};
use heartcheck::{StatusCode, Target};
use tempfile::TempDir;

/// 2023-11-14T22:10:00Z, the start of a ten minute bucket.
pub const BUCKET_START: i64 = 1_700_000_000 - 1_700_000_000 % 600;

pub type Scripted = Result<ProbeOutcome, ProbeError>;

/// Probe that replays queued outcomes and records who it was asked about.
#[derive(Default)]
pub struct ScriptedProbe {
    outcomes: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<Target>>,
    delay: Option<Duration>,
}

impl ScriptedProbe {
    pub fn new(outcomes: impl IntoIterator<Item = Scripted>) -> Self {
        Self { outcomes: Mutex::new(outcomes.into_iter().collect()), ..Self::default() }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn targets(&self) -> Vec<Target> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProbeEngine for ScriptedProbe {
    async fn probe(&self, target: &Target) -> Result<ProbeOutcome, ProbeError> {
        self.seen.lock().unwrap().push(target.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(ProbeOutcome::NotExploitable))
    }
}

/// Probe that never returns, and notices when it is abandoned.
#[derive(Default)]
pub struct HangingProbe {
    pub started: AtomicUsize,
    pub dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProbeEngine for HangingProbe {
    async fn probe(&self, _target: &Target) -> Result<ProbeOutcome, ProbeError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(self.dropped.clone());
        std::future::pending().await
    }
}

/// Map-backed cache stamping writes with the shared clock.
pub struct MemoryCache {
    records: Mutex<HashMap<String, CacheRecord>>,
    clock: Arc<dyn Clock>,
    pub puts: AtomicUsize,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { records: Mutex::new(HashMap::new()), clock, puts: AtomicUsize::new(0) }
    }

    pub fn seed(&self, host: &str, last_update: i64, status: StatusCode) {
        self.records
            .lock()
            .unwrap()
            .insert(host.to_owned(), CacheRecord { host: host.to_owned(), last_update, status });
    }

    pub fn record(&self, host: &str) -> Option<CacheRecord> {
        self.records.lock().unwrap().get(host).cloned()
    }
}

#[async_trait]
impl VerdictCache for MemoryCache {
    async fn get(&self, host: &str) -> Option<CacheRecord> {
        self.record(host)
    }

    async fn put(&self, host: &str, status: StatusCode) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.seed(host, self.clock.now(), status);
        Ok(())
    }
}

/// Reads go through to `inner`, every write fails.
pub struct ReadOnly<C> {
    pub inner: C,
    pub attempted_puts: AtomicUsize,
}

impl<C> ReadOnly<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, attempted_puts: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl<C: VerdictCache> VerdictCache for ReadOnly<C> {
    async fn get(&self, host: &str) -> Option<CacheRecord> {
        self.inner.get(host).await
    }

    async fn put(&self, _host: &str, _status: StatusCode) -> Result<(), CacheError> {
        self.attempted_puts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("writes disabled".into()))
    }
}

pub fn manual_clock(now: i64) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(now))
}

/// Real libsql cache in a throwaway directory. Keep the `TempDir` alive.
pub async fn libsql_cache(clock: Arc<dyn Clock>) -> anyhow::Result<(LibsqlCache, TempDir)> {
    let dir = tempfile::tempdir()?;
    let descriptor = dir.path().join("cache.db").to_string_lossy().to_string();
    let cache = LibsqlCache::connect(&descriptor, "", 4, clock).await?;
    Ok((cache, dir))
}
