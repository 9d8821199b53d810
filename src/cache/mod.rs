pub mod clock;
pub mod cname;
pub mod data;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cname::{CnameCache, CnameEntry, CnameKey};
pub use data::{DataCache, DataEntry, DataKey};
pub use sweeper::{MIN_EVICTION_INTERVAL, Sweeper};

use crate::config::CacheConfig;
use crate::dns::{DNSQuestion, DNSResource};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// The caching contract a resolver programs against: look up before going
/// upstream, feed answers back afterwards.
pub trait RRCache: Send + Sync {
    /// Look up a question, following cached aliases.
    fn get(&self, question: &DNSQuestion) -> CacheLookup;

    /// Store the records of a successful exchange.
    fn put(&self, records: &[DNSResource]);
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    /// Alias records in chain order, followed by the answer records.
    pub records: Vec<DNSResource>,
    /// The question rewritten to the last name of the alias chain.
    pub question: DNSQuestion,
    /// True when no answer records were found and the caller has to ask
    /// upstream for `question`.
    pub needs_upstream: bool,
}

impl CacheLookup {
    /// Number of leading alias records in `records`.
    pub fn alias_count(&self) -> usize {
        self.records
            .iter()
            .take_while(|record| record.cname_target().is_some())
            .count()
    }

    pub fn answers(&self) -> &[DNSResource] {
        &self.records[self.alias_count()..]
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub rejected: AtomicU64,
    pub expired_evictions: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_evictions(&self, count: u64) {
        self.expired_evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn expired_evictions(&self) -> u64 {
        self.expired_evictions.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Record cache combining the alias and answer stores, each with its own
/// expiry sweeper.
///
/// Get and put are synchronous and safe to call from any number of threads.
/// The sweepers stop when [`RecordCache::shutdown`] is called or the cache is
/// dropped.
#[derive(Debug)]
pub struct RecordCache {
    aliases: Arc<CnameCache>,
    answers: Arc<DataCache>,
    clock: Arc<dyn Clock>,
    stats: Arc<CacheStats>,
    sweepers: [Sweeper; 2],
}

impl RecordCache {
    /// Cache with default settings and the given eviction interval. Intervals
    /// under one second are raised to one second.
    pub fn new(eviction_interval: Duration) -> Self {
        Self::with_config(CacheConfig {
            eviction_interval,
            ..CacheConfig::default()
        })
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let stats = Arc::new(CacheStats::new());
        let aliases = Arc::new(CnameCache::new(clock.clone(), config.max_chain_length));
        let answers = Arc::new(DataCache::new(clock.clone()));

        let sweepers = [
            Sweeper::spawn_with(
                "alias",
                aliases.clone(),
                clock.clone(),
                stats.clone(),
                config.eviction_interval,
                config.runtime_sweepers,
            ),
            Sweeper::spawn_with(
                "answer",
                answers.clone(),
                clock.clone(),
                stats.clone(),
                config.eviction_interval,
                config.runtime_sweepers,
            ),
        ];

        Self {
            aliases,
            answers,
            clock,
            stats,
            sweepers,
        }
    }

    /// Look up a question in the cache.
    ///
    /// Aliases are chased first; the answer store is then consulted for the
    /// last name of the chain. `needs_upstream` is set whenever the answer part
    /// is empty, even if an alias chain was found.
    pub fn get(&self, question: &DNSQuestion) -> CacheLookup {
        let (mut records, rewritten) = self.aliases.resolve_chain(question);
        let answers = self.answers.lookup(&rewritten);
        let needs_upstream = answers.is_empty();

        if needs_upstream {
            self.stats.record_miss();
            trace!(
                "Cache miss for {} ({} alias record(s), ask upstream for {})",
                question.name(),
                records.len(),
                rewritten.name()
            );
        } else {
            self.stats.record_hit();
            trace!(
                "Cache hit for {} ({} alias + {} answer record(s))",
                question.name(),
                records.len(),
                answers.len()
            );
        }

        records.extend(answers);
        CacheLookup {
            records,
            question: rewritten,
            needs_upstream,
        }
    }

    /// Store a batch of records. Aliases go to the alias store, everything
    /// else to the answer store; ineligible records are skipped.
    pub fn put(&self, records: &[DNSResource]) {
        for record in records {
            let stored = match record.cname_target() {
                Some(_) => self.aliases.put(record),
                None => self.answers.put(record),
            };
            if stored {
                self.stats.record_insert();
            } else {
                self.stats.record_rejected();
            }
        }
        debug!("Stored batch of {} record(s)", records.len());
    }

    /// Run both sweeps now instead of waiting for the next tick. Returns the
    /// number of alias and answer entries removed.
    pub fn purge_expired(&self) -> (usize, usize) {
        let now = self.clock.now_secs();
        let removed = (self.aliases.sweep(now), self.answers.sweep(now));
        self.stats.record_expired_evictions((removed.0 + removed.1) as u64);
        removed
    }

    /// Stop both sweepers. The cache keeps serving reads and writes; expired
    /// data is then only dropped lazily.
    pub fn shutdown(&self) {
        for sweeper in &self.sweepers {
            sweeper.stop();
        }
    }

    pub fn sweepers_running(&self) -> bool {
        self.sweepers.iter().any(Sweeper::is_running)
    }

    pub fn eviction_interval(&self) -> Duration {
        self.sweepers[0].period()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    pub fn answer_key_count(&self) -> usize {
        self.answers.len()
    }

    pub fn answer_entry_count(&self) -> usize {
        self.answers.entry_count()
    }

    /// Summary line for logs.
    pub fn debug_info(&self) -> String {
        let stats = &self.stats;
        format!(
            "RecordCache: aliases={}, answer_keys={}, answer_entries={}, hits={}, misses={}, hit_rate={:.2}%, inserts={}, rejected={}, expired={}",
            self.alias_count(),
            self.answer_key_count(),
            self.answer_entry_count(),
            stats.hits(),
            stats.misses(),
            stats.hit_rate() * 100.0,
            stats.inserts(),
            stats.rejected(),
            stats.expired_evictions()
        )
    }
}

impl RRCache for RecordCache {
    fn get(&self, question: &DNSQuestion) -> CacheLookup {
        RecordCache::get(self, question)
    }

    fn put(&self, records: &[DNSResource]) {
        RecordCache::put(self, records)
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}
