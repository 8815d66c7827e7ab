//! Document-domain restrictions
//!
//! A restriction is built from a list such as `example.com|~sub.example.com`
//! and decides whether a filter applies on a given document domain.

use std::collections::HashSet;

use crate::psl::walk_host_suffixes;

/// Include/exclude domain sets of a filter. Keys are upper-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRestriction {
    include: Option<HashSet<String>>,
    exclude: Option<HashSet<String>>,
}

impl DomainRestriction {
    /// Parse a domain list split on `separator`.
    ///
    /// Tokens starting with `~` are exclusions; empty tokens are skipped.
    pub fn parse(list: &str, separator: char) -> Self {
        let mut restriction = Self::default();

        for raw in list.split(separator) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let (set, domain) = match raw.strip_prefix('~') {
                Some(rest) => (&mut restriction.exclude, rest),
                None => (&mut restriction.include, raw),
            };
            if domain.is_empty() {
                continue;
            }

            set.get_or_insert_with(HashSet::new)
                .insert(domain.to_ascii_uppercase());
        }

        restriction
    }

    /// True when neither set exists.
    pub fn is_unrestricted(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    pub fn include_domains(&self) -> Option<&HashSet<String>> {
        self.include.as_ref()
    }

    pub fn exclude_domains(&self) -> Option<&HashSet<String>> {
        self.exclude.as_ref()
    }

    /// Check whether a filter with this restriction is active on `doc_domain`.
    ///
    /// The most specific listed suffix decides. Without a decision the filter
    /// is active only if it has no include set.
    pub fn is_active_on(&self, doc_domain: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        let doc_domain = doc_domain.trim_end_matches('.').to_ascii_uppercase();

        for suffix in walk_host_suffixes(&doc_domain) {
            if self.include.as_ref().is_some_and(|set| set.contains(suffix)) {
                return true;
            }
            if self.exclude.as_ref().is_some_and(|set| set.contains(suffix)) {
                return false;
            }
        }

        self.include.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_is_active_everywhere() {
        let restriction = DomainRestriction::parse("", '|');
        assert!(restriction.is_unrestricted());
        assert!(restriction.is_active_on("example.com"));
        assert!(restriction.is_active_on(""));
    }

    #[test]
    fn include_and_exclude_walk() {
        let restriction = DomainRestriction::parse("example.com|~sub.example.com", '|');
        assert!(restriction.is_active_on("example.com"));
        assert!(!restriction.is_active_on("sub.example.com"));
        assert!(!restriction.is_active_on("deep.sub.example.com"));
        assert!(restriction.is_active_on("other.example.com"));
        assert!(!restriction.is_active_on("example.org"));
    }

    #[test]
    fn exclude_only_defaults_to_active() {
        let restriction = DomainRestriction::parse("~example.com", '|');
        assert!(restriction.include_domains().is_none());
        assert!(!restriction.is_active_on("www.example.com"));
        assert!(restriction.is_active_on("example.org"));
    }

    #[test]
    fn normalizes_case_and_trailing_dots() {
        let restriction = DomainRestriction::parse("Example.COM", '|');
        assert!(restriction.is_active_on("WWW.example.com.."));
        assert!(restriction.include_domains().is_some_and(|set| set.contains("EXAMPLE.COM")));
    }

    #[test]
    fn skips_empty_tokens() {
        let restriction = DomainRestriction::parse("|a.com||~|", '|');
        assert_eq!(restriction.include_domains().map(HashSet::len), Some(1));
        assert!(restriction.exclude_domains().is_none());
    }
}
