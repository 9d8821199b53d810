//! Shared helpers for the record cache integration tests.

#![allow(dead_code)] // Not every test file uses every helper

use rrcache::{
    CacheConfig, DNSQuestion, DNSResource, RecordCache,
    cache::ManualClock,
    dns::{
        DNSResourceData,
        enums::{DNSResourceClass, DNSResourceType},
    },
};
use std::net::Ipv4Addr;
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Cache driven by a manual clock so expiry can be tested without sleeping.
pub fn create_manual_cache() -> (Arc<ManualClock>, RecordCache) {
    init_tracing();
    let clock = Arc::new(ManualClock::default());
    let cache = RecordCache::with_clock(CacheConfig::default(), clock.clone());
    (clock, cache)
}

pub fn question(name: &str, qtype: DNSResourceType) -> DNSQuestion {
    DNSQuestion::new(name, qtype, DNSResourceClass::IN)
}

pub fn a_question(name: &str) -> DNSQuestion {
    question(name, DNSResourceType::A)
}

pub fn a_record(name: &str, last_octet: u8, ttl: u32) -> DNSResource {
    DNSResource::a(name, Ipv4Addr::new(192, 0, 2, last_octet), ttl)
}

pub fn txt_record(name: &str, text: &str, ttl: u32) -> DNSResource {
    DNSResource::new(
        name,
        DNSResourceClass::IN,
        ttl,
        DNSResourceData::TXT(vec![text.to_string()]),
    )
}

pub fn opt_record(ttl: u32) -> DNSResource {
    DNSResource::with_type(
        "example.com.",
        DNSResourceType::OPT,
        DNSResourceClass::Unknown(1232),
        ttl,
        DNSResourceData::Raw(Vec::new()),
    )
}
