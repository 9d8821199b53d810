//! In-process DNS record cache.
//!
//! [`RecordCache`] stores answer records by (name, type, class), follows cached
//! CNAME chains on lookup and expires entries by their TTL, both lazily on
//! read and through a periodic sweeper per store.
//!
//! ```no_run
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//! use rrcache::{DNSQuestion, DNSResource, RecordCache};
//! use rrcache::dns::enums::{DNSResourceClass, DNSResourceType};
//!
//! let cache = RecordCache::new(Duration::from_secs(30));
//! cache.put(&[
//!     DNSResource::cname("www.example.com.", "web.example.com.", 300),
//!     DNSResource::a("web.example.com.", Ipv4Addr::new(192, 0, 2, 10), 60),
//! ]);
//!
//! let q = DNSQuestion::new("www.example.com.", DNSResourceType::A, DNSResourceClass::IN);
//! let lookup = cache.get(&q);
//! assert!(!lookup.needs_upstream);
//! assert_eq!(lookup.question.name(), "web.example.com.");
//! ```

pub mod cache;
pub mod config;
pub mod dns;
pub mod error;

pub use cache::{CacheLookup, CacheStats, RRCache, RecordCache};
pub use config::CacheConfig;
pub use dns::{DNSQuestion, DNSResource, DNSResourceData};
pub use error::ConfigError;
