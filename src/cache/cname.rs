//! Alias (CNAME) store.
//!
//! Holds at most one redirection per (name, class). Inserting a new alias for
//! a name replaces the previous one.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use tracing::{debug, trace, warn};

use super::clock::{Clock, expiration, remaining_ttl};
use crate::dns::{
    DNSQuestion, DNSResource, DNSResourceData, canonical_name,
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CnameKey {
    pub name: String,
    pub class: DNSResourceClass,
}

impl CnameKey {
    pub fn new(name: &str, class: DNSResourceClass) -> Self {
        Self {
            name: canonical_name(name),
            class,
        }
    }

    pub fn from_question(question: &DNSQuestion) -> Self {
        Self {
            name: question.name(),
            class: question.qclass,
        }
    }

    pub fn from_record(record: &DNSResource) -> Self {
        Self {
            name: record.name(),
            class: record.rclass,
        }
    }

    /// Synthesize the alias record this key and entry describe.
    fn to_record(&self, entry: &CnameEntry, ttl: u32) -> DNSResource {
        DNSResource::with_type(
            &self.name,
            DNSResourceType::CNAME,
            self.class,
            ttl,
            DNSResourceData::CNAME(entry.target.clone()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnameEntry {
    /// Canonical target name.
    pub target: String,
    /// Unix seconds.
    pub expires_at: u64,
}

impl CnameEntry {
    #[inline]
    pub fn ttl_at(&self, now: u64) -> u32 {
        remaining_ttl(self.expires_at, now)
    }
}

#[derive(Debug)]
pub struct CnameCache {
    entries: DashMap<CnameKey, CnameEntry>,
    clock: Arc<dyn Clock>,
    max_chain_length: usize,
}

impl CnameCache {
    pub fn new(clock: Arc<dyn Clock>, max_chain_length: usize) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            max_chain_length: max_chain_length.max(1),
        }
    }

    /// Store an alias record, replacing whatever alias the name had before.
    /// Returns whether the record was stored.
    pub fn put(&self, record: &DNSResource) -> bool {
        if !record.is_cacheable() {
            trace!("Skipping uncacheable alias record for {}", record.name());
            return false;
        }
        let Some(target) = record.cname_target() else {
            trace!("Record for {} carries no alias target", record.name());
            return false;
        };

        let key = CnameKey::from_record(record);
        let entry = CnameEntry {
            target: canonical_name(target),
            expires_at: expiration(self.clock.now_secs(), record.ttl),
        };
        debug!(
            "Cached alias {} -> {} (TTL: {}s)",
            key.name, entry.target, record.ttl
        );
        self.entries.insert(key, entry);
        true
    }

    /// Live alias for `key`, if any.
    pub fn lookup_one(&self, key: &CnameKey) -> Option<CnameEntry> {
        self.lookup_at(key, self.clock.now_secs())
    }

    fn lookup_at(&self, key: &CnameKey, now: u64) -> Option<CnameEntry> {
        let entry = self.entries.get(key)?.value().clone();
        if entry.ttl_at(now) > 0 {
            return Some(entry);
        }
        // Re-check under the shard write lock; a fresh put may have landed.
        self.entries.remove_if(key, |_, current| current.ttl_at(now) == 0);
        None
    }

    /// Follow the alias chain starting at the question's name.
    ///
    /// Returns the synthesized alias records in chain order and the question
    /// rewritten to the last name of the chain. The chase ends at the first
    /// name without a live alias, at a name already visited, or after
    /// `max_chain_length` hops.
    pub fn resolve_chain(&self, question: &DNSQuestion) -> (Vec<DNSResource>, DNSQuestion) {
        let now = self.clock.now_secs();
        let mut records = Vec::new();
        let mut current = question.name();
        let mut visited = FxHashSet::default();
        visited.insert(current.clone());

        loop {
            let key = CnameKey::new(&current, question.qclass);
            let Some(entry) = self.lookup_at(&key, now) else {
                break;
            };
            if records.len() >= self.max_chain_length {
                warn!(
                    "Alias chain for {} exceeds {} hops, stopping at {}",
                    question.name(),
                    self.max_chain_length,
                    current
                );
                break;
            }
            records.push(key.to_record(&entry, entry.ttl_at(now)));

            let cycle = !visited.insert(entry.target.clone());
            current = entry.target;
            if cycle {
                warn!("Alias cycle detected for {} at {}", question.name(), current);
                break;
            }
        }

        if records.is_empty() {
            return (records, question.clone());
        }

        trace!(
            "Alias chain for {} resolved to {} in {} hop(s)",
            question.name(),
            current,
            records.len()
        );
        (records, question.with_name(&current))
    }

    /// Remove every alias that has expired at `now`. Returns how many went.
    pub fn sweep(&self, now: u64) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.ttl_at(now) > 0;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use std::time::Duration;

    fn store() -> (Arc<ManualClock>, CnameCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = CnameCache::new(clock.clone(), 8);
        (clock, cache)
    }

    fn question(name: &str) -> DNSQuestion {
        DNSQuestion::new(name, DNSResourceType::A, DNSResourceClass::IN)
    }

    #[test]
    fn test_put_and_lookup() {
        let (_clock, cache) = store();
        assert!(cache.put(&DNSResource::cname("WWW.example.com", "Web.Example.com", 60)));

        let entry = cache
            .lookup_one(&CnameKey::new("www.example.com.", DNSResourceClass::IN))
            .expect("alias should be cached");
        assert_eq!(entry.target, "web.example.com.");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let (_clock, cache) = store();
        cache.put(&DNSResource::cname("a.example.", "b.example.", 60));
        cache.put(&DNSResource::cname("a.example.", "c.example.", 60));

        let entry = cache
            .lookup_one(&CnameKey::new("a.example.", DNSResourceClass::IN))
            .unwrap();
        assert_eq!(entry.target, "c.example.");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_class_is_part_of_identity() {
        let (_clock, cache) = store();
        cache.put(&DNSResource::cname("a.example.", "b.example.", 60));
        assert!(
            cache
                .lookup_one(&CnameKey::new("a.example.", DNSResourceClass::CH))
                .is_none()
        );
    }

    #[test]
    fn test_rejects_uncacheable() {
        let (_clock, cache) = store();
        assert!(!cache.put(&DNSResource::cname("a.example.", "b.example.", 0)));
        assert!(!cache.put(&DNSResource::cname(".", "b.example.", 60)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_alias_is_absent_before_sweep() {
        let (clock, cache) = store();
        cache.put(&DNSResource::cname("a.example.", "b.example.", 10));
        clock.advance(Duration::from_secs(10));

        let key = CnameKey::new("a.example.", DNSResourceClass::IN);
        assert!(cache.lookup_one(&key).is_none());
    }

    #[test]
    fn test_resolve_chain_follows_hops() {
        let (clock, cache) = store();
        cache.put(&DNSResource::cname("a.example.", "b.example.", 100));
        cache.put(&DNSResource::cname("b.example.", "c.example.", 50));
        clock.advance(Duration::from_secs(20));

        let (records, rewritten) = cache.resolve_chain(&question("A.example"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "a.example.");
        assert_eq!(records[0].cname_target(), Some("b.example."));
        assert_eq!(records[0].ttl, 80);
        assert_eq!(records[1].name(), "b.example.");
        assert_eq!(records[1].ttl, 30);
        assert_eq!(rewritten.name(), "c.example.");
        assert_eq!(rewritten.qtype, DNSResourceType::A);
    }

    #[test]
    fn test_resolve_chain_without_alias_keeps_question() {
        let (_clock, cache) = store();
        let q = question("Plain.Example");
        let (records, rewritten) = cache.resolve_chain(&q);
        assert!(records.is_empty());
        assert_eq!(rewritten, q);
    }

    #[test]
    fn test_resolve_chain_stops_on_cycle() {
        let (_clock, cache) = store();
        cache.put(&DNSResource::cname("a.example.", "b.example.", 60));
        cache.put(&DNSResource::cname("b.example.", "a.example.", 60));

        let (records, rewritten) = cache.resolve_chain(&question("a.example."));
        assert_eq!(records.len(), 2);
        assert_eq!(rewritten.name(), "a.example.");
    }

    #[test]
    fn test_resolve_chain_stops_on_self_alias() {
        let (_clock, cache) = store();
        cache.put(&DNSResource::cname("loop.example.", "loop.example.", 60));

        let (records, rewritten) = cache.resolve_chain(&question("loop.example."));
        assert_eq!(records.len(), 1);
        assert_eq!(rewritten.name(), "loop.example.");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a subscriber that records warnings; return them as text.
    fn with_captured_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8_lossy(&logs.0.lock()).into_owned();
        (result, text)
    }

    fn chain_of(cache: &CnameCache, hops: usize) {
        for i in 0..hops {
            cache.put(&DNSResource::cname(
                &format!("n{i}.example."),
                &format!("n{}.example.", i + 1),
                60,
            ));
        }
    }

    #[test]
    fn test_resolve_chain_respects_hop_limit() {
        let clock = Arc::new(ManualClock::default());
        let cache = CnameCache::new(clock, 3);
        chain_of(&cache, 10);

        let ((records, rewritten), warnings) =
            with_captured_warnings(|| cache.resolve_chain(&question("n0.example.")));
        assert_eq!(records.len(), 3);
        assert_eq!(rewritten.name(), "n3.example.");
        assert!(warnings.contains("exceeds 3 hops"));
    }

    #[test]
    fn test_chain_of_exactly_max_length_is_not_truncated() {
        let clock = Arc::new(ManualClock::default());
        let cache = CnameCache::new(clock, 3);
        chain_of(&cache, 3);

        let ((records, rewritten), warnings) =
            with_captured_warnings(|| cache.resolve_chain(&question("n0.example.")));
        assert_eq!(records.len(), 3);
        assert_eq!(rewritten.name(), "n3.example.");
        assert!(!warnings.contains("exceeds"), "unexpected warning: {warnings}");
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (clock, cache) = store();
        cache.put(&DNSResource::cname("short.example.", "x.example.", 5));
        cache.put(&DNSResource::cname("long.example.", "y.example.", 500));
        clock.advance(Duration::from_secs(5));

        assert_eq!(cache.sweep(clock.now_secs()), 1);
        assert_eq!(cache.len(), 1);
        assert!(
            cache
                .lookup_one(&CnameKey::new("long.example.", DNSResourceClass::IN))
                .is_some()
        );
    }
}
