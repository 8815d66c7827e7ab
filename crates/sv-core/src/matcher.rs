//! Request Matching
//!
//! Evaluates a request against a set of blocking and exception filters.
//! This is a plain linear scan over the filters; it builds no index.

use std::collections::HashSet;
use std::sync::Arc;

use crate::filter::{Filter, FilterKind};
use crate::psl::is_third_party;
use crate::types::ContentType;
use crate::url::extract_host;

// =============================================================================
// Request Context
// =============================================================================

/// Request tuple handed to the matching predicate.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Full request URL
    pub location: &'a str,
    /// Resource type
    pub content_type: ContentType,
    /// Host of the document that loads the URL; empty if unknown
    pub doc_domain: &'a str,
    /// Is this a third-party request?
    pub third_party: bool,
}

impl<'a> RequestContext<'a> {
    pub fn new(location: &'a str, content_type: ContentType, doc_domain: &'a str, third_party: bool) -> Self {
        Self {
            location,
            content_type,
            doc_domain,
            third_party,
        }
    }

    /// Derive the document domain and third-party flag from URLs.
    pub fn from_urls(location: &'a str, content_type: ContentType, document_url: Option<&'a str>) -> Self {
        let doc_domain = document_url.and_then(extract_host).unwrap_or("");
        let third_party = match extract_host(location) {
            Some(req_host) if !doc_domain.is_empty() => is_third_party(doc_domain, req_host),
            _ => false,
        };

        Self::new(location, content_type, doc_domain, third_party)
    }
}

// =============================================================================
// Match Decision
// =============================================================================

/// Outcome of matching a request.
#[derive(Debug, Clone)]
pub enum MatchDecision {
    /// An exception filter matched; the request must not be blocked.
    Allow(Arc<Filter>),
    /// A blocking filter matched and no exception did.
    Block(Arc<Filter>),
    /// Nothing matched.
    NoMatch,
}

impl MatchDecision {
    /// Filter that determined the decision.
    pub fn filter(&self) -> Option<&Arc<Filter>> {
        match self {
            Self::Allow(filter) | Self::Block(filter) => Some(filter),
            Self::NoMatch => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Linear matcher over blocking and exception filters.
#[derive(Debug, Default)]
pub struct FilterMatcher {
    blocking: Vec<Arc<Filter>>,
    whitelist: Vec<Arc<Filter>>,
    known: HashSet<String>,
}

impl FilterMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blocking or exception filter. Other types and duplicates are ignored.
    pub fn add(&mut self, filter: Arc<Filter>) -> bool {
        if self.known.contains(filter.text()) {
            return false;
        }

        let list = match filter.kind() {
            FilterKind::Blocking { .. } => &mut self.blocking,
            FilterKind::Whitelist(_) => &mut self.whitelist,
            _ => return false,
        };

        self.known.insert(filter.text().to_string());
        list.push(filter);
        true
    }

    pub fn remove(&mut self, filter: &Filter) -> bool {
        if !self.known.remove(filter.text()) {
            return false;
        }
        self.blocking.retain(|f| f.text() != filter.text());
        self.whitelist.retain(|f| f.text() != filter.text());
        true
    }

    pub fn clear(&mut self) {
        self.blocking.clear();
        self.whitelist.clear();
        self.known.clear();
    }

    pub fn len(&self) -> usize {
        self.blocking.len() + self.whitelist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decide a request: exceptions win over blocking filters.
    ///
    /// Disabled filters are skipped. Hits are not recorded here.
    pub fn match_request(&self, ctx: &RequestContext<'_>) -> MatchDecision {
        if let Some(filter) = Self::first_match(&self.whitelist, ctx) {
            log::trace!("{} allowed by {:?}", ctx.location, filter.text());
            return MatchDecision::Allow(Arc::clone(filter));
        }

        if let Some(filter) = Self::first_match(&self.blocking, ctx) {
            log::trace!("{} blocked by {:?}", ctx.location, filter.text());
            return MatchDecision::Block(Arc::clone(filter));
        }

        MatchDecision::NoMatch
    }

    fn first_match<'f>(filters: &'f [Arc<Filter>], ctx: &RequestContext<'_>) -> Option<&'f Arc<Filter>> {
        filters.iter().find(|filter| {
            !filter.is_disabled()
                && filter.matches(ctx.location, ctx.content_type, ctx.doc_domain, ctx.third_party)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{RegexpFilter, RegexpOptions};

    fn blocking(text: &str, source: &str) -> Arc<Filter> {
        let regexp = RegexpFilter::new(source, RegexpOptions::default()).expect("regex should compile");
        Arc::new(Filter::blocking(text, regexp, None))
    }

    fn whitelist(text: &str, source: &str, content_type: Option<u32>) -> Arc<Filter> {
        let regexp = RegexpFilter::new(
            source,
            RegexpOptions {
                content_type,
                ..Default::default()
            },
        )
        .expect("regex should compile");
        Arc::new(Filter::whitelist(text, regexp))
    }

    #[test]
    fn request_context_from_urls() {
        let ctx = RequestContext::from_urls(
            "https://cdn.tracker.net/t.js",
            ContentType::SCRIPT,
            Some("https://www.example.com/page"),
        );
        assert_eq!(ctx.doc_domain, "www.example.com");
        assert!(ctx.third_party);

        let ctx = RequestContext::from_urls("https://static.example.com/a.png", ContentType::IMAGE, Some("https://example.com/"));
        assert!(!ctx.third_party);

        let ctx = RequestContext::from_urls("https://example.com/", ContentType::DOCUMENT, None);
        assert_eq!(ctx.doc_domain, "");
        assert!(!ctx.third_party);
    }

    #[test]
    fn exception_wins_over_block() {
        let mut matcher = FilterMatcher::new();
        matcher.add(blocking("ads", "ads"));
        matcher.add(whitelist("@@goodads", "goodads", None));

        let ctx = RequestContext::new("http://x.com/ads.js", ContentType::SCRIPT, "x.com", false);
        assert!(matcher.match_request(&ctx).is_blocked());

        let ctx = RequestContext::new("http://x.com/goodads.js", ContentType::SCRIPT, "x.com", false);
        let decision = matcher.match_request(&ctx);
        assert!(matches!(decision, MatchDecision::Allow(_)));
        assert_eq!(decision.filter().map(|f| f.text()), Some("@@goodads"));

        let ctx = RequestContext::new("http://x.com/page.html", ContentType::DOCUMENT, "x.com", false);
        assert!(matches!(matcher.match_request(&ctx), MatchDecision::NoMatch));
    }

    #[test]
    fn disabled_filters_are_skipped() {
        let mut matcher = FilterMatcher::new();
        let filter = blocking("ads", "ads");
        matcher.add(Arc::clone(&filter));
        filter.set_disabled(true);

        let ctx = RequestContext::new("http://x.com/ads.js", ContentType::SCRIPT, "", false);
        assert!(matches!(matcher.match_request(&ctx), MatchDecision::NoMatch));
    }

    #[test]
    fn add_and_remove() {
        let mut matcher = FilterMatcher::new();
        let filter = blocking("ads", "ads");
        assert!(matcher.add(Arc::clone(&filter)));
        assert!(!matcher.add(Arc::clone(&filter)));
        assert!(!matcher.add(Arc::new(Filter::comment("! c"))));
        assert_eq!(matcher.len(), 1);
        assert!(matcher.remove(&filter));
        assert!(matcher.is_empty());
    }
}
