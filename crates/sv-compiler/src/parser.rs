//! Filter list parser
//!
//! Compiles a whole list line by line through a [`FilterRegistry`] and
//! summarizes the result per filter variant.

use std::sync::Arc;

use sv_core::filter::{Filter, FilterKind};

use crate::registry::FilterRegistry;

/// Per-variant counts of a compiled list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStats {
    pub blocking: usize,
    pub whitelist: usize,
    pub elemhide: usize,
    pub comments: usize,
    pub invalid: usize,
}

impl ListStats {
    pub fn from_filters(filters: &[Arc<Filter>]) -> Self {
        let mut stats = Self::default();
        for filter in filters {
            match filter.kind() {
                FilterKind::Blocking { .. } => stats.blocking += 1,
                FilterKind::Whitelist(_) => stats.whitelist += 1,
                FilterKind::ElemHide(_) => stats.elemhide += 1,
                FilterKind::Comment => stats.comments += 1,
                FilterKind::Invalid { .. } => stats.invalid += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.blocking + self.whitelist + self.elemhide + self.comments + self.invalid
    }
}

/// Compile every line of a filter list through `registry`.
///
/// Lines are trimmed; blank lines and the `[Adblock ...]` header are
/// skipped. Invalid lines are returned as invalid filters.
pub fn parse_filter_list(registry: &FilterRegistry, text: &str) -> Vec<Arc<Filter>> {
    let mut filters = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || is_list_header(line) {
            continue;
        }

        if let Some(filter) = registry.from_text(line) {
            filters.push(filter);
        }
    }

    filters
}

fn is_list_header(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(']') && line[1..].to_ascii_lowercase().starts_with("adblock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_every_line() {
        let registry = FilterRegistry::new();
        let list = "[Adblock Plus 1.1]\n\
                    ! Title: Test list\n\
                    \n\
                    ||ads.example.com^\n\
                    @@||ads.example.com/ok^\n\
                    \t##.banner  \n\
                    /broken(/\n";

        let filters = parse_filter_list(&registry, list);
        let texts: Vec<&str> = filters.iter().map(|f| f.text()).collect();
        assert_eq!(
            texts,
            vec![
                "! Title: Test list",
                "||ads.example.com^",
                "@@||ads.example.com/ok^",
                "##.banner",
                "/broken(/",
            ]
        );

        let stats = ListStats::from_filters(&filters);
        assert_eq!(
            stats,
            ListStats {
                blocking: 1,
                whitelist: 1,
                elemhide: 1,
                comments: 1,
                invalid: 1,
            }
        );
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn repeated_lines_share_one_filter() {
        let registry = FilterRegistry::new();
        let filters = parse_filter_list(&registry, "ads\nads\r\n");
        assert_eq!(filters.len(), 2);
        assert!(Arc::ptr_eq(&filters[0], &filters[1]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn header_detection() {
        assert!(is_list_header("[Adblock Plus 2.0]"));
        assert!(is_list_header("[adblock]"));
        assert!(!is_list_header("[Filter]"));
        assert!(!is_list_header("[adblock"));
    }
}
