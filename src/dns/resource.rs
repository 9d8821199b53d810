use std::net::{Ipv4Addr, Ipv6Addr};

use super::{
    ROOT_NAME,
    enums::{DNSResourceClass, DNSResourceType},
    labels_from_name, name_from_labels,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdata: DNSResourceData,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DNSResourceData {
    #[default]
    Empty,
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(String),
    CNAME(String),
    PTR(String),
    MX(u16, String),
    TXT(Vec<String>),
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    /// Payload of a type this crate does not model, kept as opaque bytes.
    Raw(Vec<u8>),
}

impl DNSResourceData {
    /// Record type implied by the payload, if it has one.
    pub fn record_type(&self) -> Option<DNSResourceType> {
        match self {
            DNSResourceData::A(_) => Some(DNSResourceType::A),
            DNSResourceData::AAAA(_) => Some(DNSResourceType::AAAA),
            DNSResourceData::NS(_) => Some(DNSResourceType::NS),
            DNSResourceData::CNAME(_) => Some(DNSResourceType::CNAME),
            DNSResourceData::PTR(_) => Some(DNSResourceType::PTR),
            DNSResourceData::MX(..) => Some(DNSResourceType::MX),
            DNSResourceData::TXT(_) => Some(DNSResourceType::TXT),
            DNSResourceData::SOA { .. } => Some(DNSResourceType::SOA),
            DNSResourceData::Empty | DNSResourceData::Raw(_) => None,
        }
    }
}

impl DNSResource {
    /// Build a record whose type follows from its payload. Opaque payloads
    /// (`Empty`, `Raw`) get type `Unknown(0)`, which no question asks for;
    /// use [`DNSResource::with_type`] to give them a real type.
    pub fn new(name: &str, rclass: DNSResourceClass, ttl: u32, rdata: DNSResourceData) -> Self {
        let rtype = rdata
            .record_type()
            .unwrap_or(DNSResourceType::Unknown(0));
        Self::with_type(name, rtype, rclass, ttl, rdata)
    }

    pub fn with_type(
        name: &str,
        rtype: DNSResourceType,
        rclass: DNSResourceClass,
        ttl: u32,
        rdata: DNSResourceData,
    ) -> Self {
        Self {
            labels: labels_from_name(name),
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    pub fn a(name: &str, addr: Ipv4Addr, ttl: u32) -> Self {
        Self::new(name, DNSResourceClass::IN, ttl, DNSResourceData::A(addr))
    }

    pub fn aaaa(name: &str, addr: Ipv6Addr, ttl: u32) -> Self {
        Self::new(name, DNSResourceClass::IN, ttl, DNSResourceData::AAAA(addr))
    }

    pub fn cname(name: &str, target: &str, ttl: u32) -> Self {
        Self::new(
            name,
            DNSResourceClass::IN,
            ttl,
            DNSResourceData::CNAME(target.to_string()),
        )
    }

    /// Canonical (lowercase, dot-terminated) owner name.
    pub fn name(&self) -> String {
        name_from_labels(&self.labels)
    }

    /// Alias target, when this record is a canonical-name redirection.
    pub fn cname_target(&self) -> Option<&str> {
        match &self.rdata {
            DNSResourceData::CNAME(target) => Some(target),
            _ => None,
        }
    }

    /// Whether the record may be stored at all: it must have a lifetime, an
    /// owner below the root and must not be a transaction pseudo-record.
    pub fn is_cacheable(&self) -> bool {
        self.ttl > 0 && !self.rtype.is_meta() && self.name() != ROOT_NAME
    }
}
