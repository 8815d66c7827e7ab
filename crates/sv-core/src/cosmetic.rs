//! Element hiding set
//!
//! Holds the element hiding filters currently in effect, assigns each a
//! unique key for hit attribution and answers "which selectors apply on
//! this document domain".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::filter::Filter;
use crate::hash::filter_key;

/// Declaration appended to the joined selectors of a stylesheet.
const HIDE_DECLARATION: &str = "{display:none !important}";

#[derive(Debug, Default)]
pub struct ElemHideSet {
    filters: Vec<Arc<Filter>>,
    known: HashSet<String>,
    keys: HashMap<String, Arc<Filter>>,
}

impl ElemHideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element hiding filter and assign its key.
    ///
    /// Returns false for other filter types and for filters already present.
    pub fn add(&mut self, filter: Arc<Filter>) -> bool {
        let Some(elemhide) = filter.as_elemhide() else {
            return false;
        };
        if self.known.contains(filter.text()) {
            return false;
        }

        let mut attempt = 0u64;
        let key = loop {
            let candidate = filter_key(filter.text(), attempt);
            if !self.keys.contains_key(&candidate) {
                break candidate;
            }
            attempt += 1;
        };

        elemhide.set_key(Some(key.clone()));
        self.keys.insert(key, Arc::clone(&filter));
        self.known.insert(filter.text().to_string());
        self.filters.push(filter);
        true
    }

    /// Remove a filter and release its key.
    pub fn remove(&mut self, filter: &Filter) -> bool {
        let Some(pos) = self.filters.iter().position(|f| f.text() == filter.text()) else {
            return false;
        };

        let stored = self.filters.remove(pos);
        self.known.remove(stored.text());
        if let Some(elemhide) = stored.as_elemhide() {
            if let Some(key) = elemhide.key() {
                self.keys.remove(&key);
            }
            elemhide.set_key(None);
        }
        true
    }

    pub fn clear(&mut self) {
        for filter in &self.filters {
            if let Some(elemhide) = filter.as_elemhide() {
                elemhide.set_key(None);
            }
        }
        self.filters.clear();
        self.known.clear();
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Resolve a hit key reported by the host back to its filter.
    pub fn filter_by_key(&self, key: &str) -> Option<&Arc<Filter>> {
        self.keys.get(key)
    }

    /// Selectors of enabled filters that apply on `doc_domain`, in insertion order.
    ///
    /// An empty domain only gets unrestricted selectors.
    pub fn selectors_for_domain(&self, doc_domain: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.filters
            .iter()
            .filter(|filter| !filter.is_disabled())
            .filter_map(|filter| filter.as_elemhide())
            .filter(|elemhide| elemhide.is_active_on_domain(doc_domain))
            .map(|elemhide| elemhide.selector())
            .filter(|selector| seen.insert(*selector))
            .collect()
    }

    /// CSS hiding every selector that applies on `doc_domain`, empty if none do.
    pub fn stylesheet_for_domain(&self, doc_domain: &str) -> String {
        let selectors = self.selectors_for_domain(doc_domain);
        if selectors.is_empty() {
            return String::new();
        }
        format!("{}{}", selectors.join(","), HIDE_DECLARATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ElemHideFilter;

    fn elemhide(text: &str, domain: Option<&str>, selector: &str) -> Arc<Filter> {
        let filter = ElemHideFilter::new(domain.map(str::to_string), selector.to_string())
            .expect("selector is valid");
        Arc::new(Filter::elemhide(text, filter))
    }

    #[test]
    fn assigns_unique_keys() {
        let mut set = ElemHideSet::new();
        let a = elemhide("##.ad", None, ".ad");
        let b = elemhide("example.com##.banner", Some("example.com"), ".banner");

        assert!(set.add(Arc::clone(&a)));
        assert!(set.add(Arc::clone(&b)));
        assert!(!set.add(Arc::clone(&a)));
        assert!(!set.add(Arc::new(Filter::comment("! x"))));

        let key_a = a.as_elemhide().and_then(ElemHideFilter::key).expect("key assigned");
        let key_b = b.as_elemhide().and_then(ElemHideFilter::key).expect("key assigned");
        assert_ne!(key_a, key_b);
        assert!(set.filter_by_key(&key_a).is_some_and(|f| Arc::ptr_eq(f, &a)));

        assert!(set.remove(&a));
        assert!(set.filter_by_key(&key_a).is_none());
        assert!(a.as_elemhide().and_then(ElemHideFilter::key).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn selectors_follow_domain_and_disabled() {
        let mut set = ElemHideSet::new();
        let generic = elemhide("##.ad", None, ".ad");
        let specific = elemhide("example.com##.banner", Some("example.com"), ".banner");
        let disabled = elemhide("##.sponsor", None, ".sponsor");
        disabled.set_disabled(true);

        set.add(generic);
        set.add(specific);
        set.add(disabled);

        assert_eq!(set.selectors_for_domain("www.example.com"), vec![".ad", ".banner"]);
        assert_eq!(set.selectors_for_domain("other.org"), vec![".ad"]);
        assert_eq!(set.selectors_for_domain(""), vec![".ad"]);
        assert_eq!(
            set.stylesheet_for_domain("example.com"),
            ".ad,.banner{display:none !important}"
        );
    }
}
