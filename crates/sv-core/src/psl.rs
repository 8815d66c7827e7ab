//! Host suffix utilities
//!
//! Suffix walking for domain restrictions and a registrable-domain
//! heuristic for first-party / third-party classification.
//!
//! # Examples
//!
//! ```
//! use sv_core::psl::get_base_domain;
//!
//! assert_eq!(get_base_domain("sub.example.com"), "example.com");
//! assert_eq!(get_base_domain("sub.example.co.uk"), "example.co.uk");
//! ```

use std::net::IpAddr;

/// Common two-part TLDs.
const COMMON_TWO_PART_TLDS: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

// =============================================================================
// Registrable Domain
// =============================================================================

/// Get the registrable domain for a hostname.
///
/// IP addresses and single-label hosts are returned unchanged.
pub fn get_base_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    base_domain_from_labels(&labels)
}

fn base_domain_from_labels(labels: &[&str]) -> String {
    let n = labels.len();
    if n <= 2 {
        return labels.join(".");
    }

    let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
    if COMMON_TWO_PART_TLDS.contains(&last_two.as_str()) {
        return labels[n - 3..].join(".");
    }

    labels[n - 2..].join(".")
}

/// Check if a request to `req_host` made by a document on `doc_host` is third-party.
pub fn is_third_party(doc_host: &str, req_host: &str) -> bool {
    get_base_domain(doc_host) != get_base_domain(req_host)
}

// =============================================================================
// Suffix Walking
// =============================================================================

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and all of its parent domains, most specific first.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = get_parent_domain(result);
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific, down to the TLD.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: Some(host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_domain_simple() {
        assert_eq!(base_domain_from_labels(&["example", "com"]), "example.com");
        assert_eq!(base_domain_from_labels(&["sub", "example", "com"]), "example.com");
    }

    #[test]
    fn test_base_domain_two_part() {
        assert_eq!(base_domain_from_labels(&["sub", "example", "co", "uk"]), "example.co.uk");
        assert_eq!(base_domain_from_labels(&["example", "co", "uk"]), "example.co.uk");
    }

    #[test]
    fn test_base_domain_ip_and_case() {
        assert_eq!(get_base_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(get_base_domain("WWW.Example.COM."), "example.com");
    }

    #[test]
    fn test_third_party() {
        assert!(!is_third_party("www.example.com", "static.example.com"));
        assert!(is_third_party("example.com", "ads.tracker.net"));
    }

    #[test]
    fn test_get_parent_domain() {
        assert_eq!(get_parent_domain("sub.example.com"), Some("example.com"));
        assert_eq!(get_parent_domain("example.com"), Some("com"));
        assert_eq!(get_parent_domain("com"), None);
        assert_eq!(get_parent_domain(""), None);
    }

    #[test]
    fn test_walk_host_suffixes() {
        let walked: Vec<&str> = walk_host_suffixes("a.b.example.com").collect();
        assert_eq!(walked, vec!["a.b.example.com", "b.example.com", "example.com", "com"]);
    }
}
