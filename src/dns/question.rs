use super::{
    enums::{DNSResourceClass, DNSResourceType},
    labels_from_name, name_from_labels,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DNSQuestion {
    pub labels: Vec<String>,
    pub qtype: DNSResourceType,
    pub qclass: DNSResourceClass,
}

impl DNSQuestion {
    pub fn new(name: &str, qtype: DNSResourceType, qclass: DNSResourceClass) -> Self {
        Self {
            labels: labels_from_name(name),
            qtype,
            qclass,
        }
    }

    /// Canonical (lowercase, dot-terminated) form of the question name.
    pub fn name(&self) -> String {
        name_from_labels(&self.labels)
    }

    /// Same question, asked about a different name.
    pub fn with_name(&self, name: &str) -> Self {
        Self {
            labels: labels_from_name(name),
            qtype: self.qtype,
            qclass: self.qclass,
        }
    }

    /// Two questions are the same cache identity when their canonical names,
    /// types and classes match.
    pub fn same_identity(&self, other: &DNSQuestion) -> bool {
        self.qtype == other.qtype && self.qclass == other.qclass && self.name() == other.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_name_is_canonical() {
        let q = DNSQuestion::new("Example.COM", DNSResourceType::A, DNSResourceClass::IN);
        assert_eq!(q.labels, vec!["Example", "COM"]);
        assert_eq!(q.name(), "example.com.");
    }

    #[test]
    fn test_with_name_keeps_type_and_class() {
        let q = DNSQuestion::new("a.example.", DNSResourceType::MX, DNSResourceClass::CH);
        let rewritten = q.with_name("b.example.");
        assert_eq!(rewritten.name(), "b.example.");
        assert_eq!(rewritten.qtype, DNSResourceType::MX);
        assert_eq!(rewritten.qclass, DNSResourceClass::CH);
    }

    #[test]
    fn test_identity_ignores_case_and_trailing_dot() {
        let a = DNSQuestion::new("WWW.example.com", DNSResourceType::A, DNSResourceClass::IN);
        let b = DNSQuestion::new("www.EXAMPLE.com.", DNSResourceType::A, DNSResourceClass::IN);
        let c = DNSQuestion::new("www.example.com", DNSResourceType::AAAA, DNSResourceClass::IN);
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
    }
}
