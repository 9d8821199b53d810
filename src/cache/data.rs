//! Answer store: every non-alias record, grouped by (name, type, class).

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, expiration, remaining_ttl};
use crate::dns::{
    DNSQuestion, DNSResource,
    enums::{DNSResourceClass, DNSResourceType},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataKey {
    pub name: String,
    pub record_type: DNSResourceType,
    pub record_class: DNSResourceClass,
}

impl DataKey {
    pub fn from_question(question: &DNSQuestion) -> Self {
        Self {
            name: question.name(),
            record_type: question.qtype,
            record_class: question.qclass,
        }
    }

    pub fn from_record(record: &DNSResource) -> Self {
        Self {
            name: record.name(),
            record_type: record.rtype,
            record_class: record.rclass,
        }
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{:?}:{:?}",
            self.name, self.record_type, self.record_class
        )
    }
}

#[derive(Debug, Clone)]
pub struct DataEntry {
    pub record: DNSResource,
    /// Unix seconds.
    pub expires_at: u64,
}

impl DataEntry {
    #[inline]
    pub fn ttl_at(&self, now: u64) -> u32 {
        remaining_ttl(self.expires_at, now)
    }

    /// Copy of the stored record carrying the TTL it has left.
    fn aged_copy(&self, ttl: u32) -> DNSResource {
        let mut record = self.record.clone();
        record.ttl = ttl;
        record
    }
}

#[derive(Debug)]
pub struct DataCache {
    entries: DashMap<DataKey, Vec<DataEntry>>,
    clock: Arc<dyn Clock>,
}

impl DataCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Append a record to its key's entry list. Identical records are not
    /// merged; each insert lives until its own expiry.
    pub fn put(&self, record: &DNSResource) -> bool {
        if !record.is_cacheable() {
            trace!(
                "Skipping uncacheable {:?} record for {} (TTL: {})",
                record.rtype,
                record.name(),
                record.ttl
            );
            return false;
        }

        let key = DataKey::from_record(record);
        let entry = DataEntry {
            record: record.clone(),
            expires_at: expiration(self.clock.now_secs(), record.ttl),
        };
        debug!("Cached record for {} (TTL: {}s)", key, record.ttl);

        // The entry guard holds the shard write lock across the append.
        self.entries.entry(key).or_default().push(entry);
        true
    }

    /// Live records for the question, each with its remaining TTL.
    pub fn lookup(&self, question: &DNSQuestion) -> Vec<DNSResource> {
        let key = DataKey::from_question(question);
        let now = self.clock.now_secs();
        let mut saw_expired = false;

        let records: Vec<DNSResource> = match self.entries.get(&key) {
            None => {
                trace!("Answer cache miss for {}", key);
                return Vec::new();
            }
            Some(list) => {
                debug_assert!(!list.is_empty(), "empty entry list stored for {key}");
                list.iter()
                    .filter_map(|entry| match entry.ttl_at(now) {
                        0 => {
                            saw_expired = true;
                            None
                        }
                        ttl => Some(entry.aged_copy(ttl)),
                    })
                    .collect()
            }
        };

        if saw_expired {
            self.prune(&key, now);
        }
        trace!("Answer cache returned {} record(s) for {}", records.len(), key);
        records
    }

    /// Drop expired entries from one key, removing the key if none survive.
    fn prune(&self, key: &DataKey, now: u64) {
        let removed = self.entries.remove_if_mut(key, |_, list| {
            list.retain(|entry| entry.ttl_at(now) > 0);
            list.is_empty()
        });
        if removed.is_some() {
            trace!("Removed fully expired key {}", key);
        }
    }

    /// Remove every entry that has expired at `now`. Returns how many went.
    pub fn sweep(&self, now: u64) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, list| {
            let before = list.len();
            list.retain(|entry| entry.ttl_at(now) > 0);
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of stored entries across all keys.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().map(|item| item.value().len()).sum()
    }
}
