pub mod enums;
pub mod question;
pub mod resource;

pub use question::DNSQuestion;
pub use resource::{DNSResource, DNSResourceData};

/// The root name in canonical form.
pub const ROOT_NAME: &str = ".";

/// Normalize a domain name for use as a cache identity.
///
/// DNS names compare case-insensitively, so the result is lowercase and always
/// fully qualified (dot-terminated). Empty labels are dropped, which makes
/// `""`, `"."` and `".."` all collapse to the root name.
pub fn canonical_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len() + 1);
    for label in name.split('.').filter(|label| !label.is_empty()) {
        canonical.push_str(&label.to_ascii_lowercase());
        canonical.push('.');
    }
    if canonical.is_empty() {
        canonical.push('.');
    }
    canonical
}

/// Build the canonical name for a list of labels.
pub fn name_from_labels(labels: &[String]) -> String {
    let mut domain = String::with_capacity(256);
    for label in labels.iter().filter(|label| !label.is_empty()) {
        domain.push_str(&label.to_ascii_lowercase());
        domain.push('.');
    }
    if domain.is_empty() {
        domain.push('.');
    }
    domain
}

/// Split a presentation-format name into labels, keeping the original case.
pub fn labels_from_name(name: &str) -> Vec<String> {
    name.split('.')
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name_lowercases_and_qualifies() {
        assert_eq!(canonical_name("WWW.Example.COM"), "www.example.com.");
        assert_eq!(canonical_name("www.example.com."), "www.example.com.");
    }

    #[test]
    fn test_canonical_root() {
        assert_eq!(canonical_name(""), ROOT_NAME);
        assert_eq!(canonical_name("."), ROOT_NAME);
        assert_eq!(canonical_name(".."), ROOT_NAME);
    }

    #[test]
    fn test_labels_round_trip_through_canonical_form() {
        let labels = labels_from_name("Mail.Example.org.");
        assert_eq!(labels, vec!["Mail", "Example", "org"]);
        assert_eq!(name_from_labels(&labels), "mail.example.org.");
        assert_eq!(name_from_labels(&[]), ROOT_NAME);
    }
}
