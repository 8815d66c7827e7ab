//! Filter type hierarchy
//!
//! Every line of a filter list becomes one [`Filter`]. The fields every
//! filter has (text, subscription back-references) live on the struct; the
//! variant payload lives in [`FilterKind`]. Blocking, exception and element
//! hiding filters are "active": they carry [`ActiveState`] for the
//! disabled flag and hit accounting.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};

use crate::domain::DomainRestriction;
use crate::types::{ContentType, DEFAULT_CONTENT_MASK};

// =============================================================================
// Errors
// =============================================================================

/// Reasons a filter cannot be constructed.
///
/// These never escape the compiler: they end up as the reason of an
/// invalid filter.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("Duplicate id in element hiding rule")]
    DuplicateId,
    #[error("No criteria in element hiding rule")]
    NoCriteria,
    #[error("Empty element hiding selector")]
    EmptySelector,
}

// =============================================================================
// Active State
// =============================================================================

/// Mutable per-filter state shared by every subscription containing the filter.
///
/// Hit accounting is best-effort: concurrent hits may interleave between
/// `hit_count` and `last_hit`.
#[derive(Debug, Default)]
pub struct ActiveState {
    disabled: AtomicBool,
    hit_count: AtomicU64,
    last_hit: AtomicU64,
}

impl ActiveState {
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Relaxed);
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    pub fn set_hit_count(&self, count: u64) {
        self.hit_count.store(count, Ordering::Relaxed);
    }

    /// Last hit in milliseconds since the epoch, 0 if never hit.
    pub fn last_hit(&self) -> u64 {
        self.last_hit.load(Ordering::Relaxed)
    }

    pub fn set_last_hit(&self, millis: u64) {
        self.last_hit.store(millis, Ordering::Relaxed);
    }

    /// Count a hit at `now_ms`.
    pub fn record_hit(&self, now_ms: u64) {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        self.last_hit.store(now_ms, Ordering::Relaxed);
    }

    /// Count a hit at the current wall-clock time.
    pub fn record_hit_now(&self) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.record_hit(now_ms);
    }

    pub fn reset_hits(&self) {
        self.hit_count.store(0, Ordering::Relaxed);
        self.last_hit.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// RegExp-based Filters
// =============================================================================

/// Options of a regex-based filter, as parsed from `$...` or a stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegexpOptions {
    /// Explicit content type mask; `None` means all types.
    pub content_type: Option<u32>,
    pub match_case: bool,
    /// Raw `domain=` value, e.g. `foo.com|~bar.foo.com`.
    pub domains: Option<String>,
    /// `Some(true)` third-party only, `Some(false)` first-party only.
    pub third_party: Option<bool>,
}

/// Shared payload of blocking and exception filters.
#[derive(Debug)]
pub struct RegexpFilter {
    active: ActiveState,
    regexp: Regex,
    shortcut: Option<String>,
    content_type: Option<u32>,
    match_case: bool,
    domains: Option<String>,
    restriction: DomainRestriction,
    third_party: Option<bool>,
}

impl RegexpFilter {
    /// Compile `source` with the given options.
    pub fn new(source: &str, options: RegexpOptions) -> Result<Self, FilterError> {
        let regexp = RegexBuilder::new(source)
            .case_insensitive(!options.match_case)
            .build()?;

        let restriction = options
            .domains
            .as_deref()
            .map(|list| DomainRestriction::parse(list, '|'))
            .unwrap_or_default();

        Ok(Self {
            active: ActiveState::default(),
            regexp,
            shortcut: None,
            content_type: options.content_type,
            match_case: options.match_case,
            domains: options.domains,
            restriction,
            third_party: options.third_party,
        })
    }

    /// Attach a precomputed shortcut for the external indexer.
    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn active(&self) -> &ActiveState {
        &self.active
    }

    /// Source of the compiled regular expression.
    pub fn regexp_source(&self) -> &str {
        self.regexp.as_str()
    }

    pub fn shortcut(&self) -> Option<&str> {
        self.shortcut.as_deref()
    }

    /// Effective content type mask. A mask of 0 is legal and matches nothing.
    pub fn content_type_mask(&self) -> u32 {
        self.content_type.unwrap_or(DEFAULT_CONTENT_MASK)
    }

    /// The mask as set by options, `None` if it was never overridden.
    pub fn explicit_content_type(&self) -> Option<u32> {
        self.content_type
    }

    pub fn match_case(&self) -> bool {
        self.match_case
    }

    pub fn domains(&self) -> Option<&str> {
        self.domains.as_deref()
    }

    pub fn restriction(&self) -> &DomainRestriction {
        &self.restriction
    }

    pub fn third_party(&self) -> Option<bool> {
        self.third_party
    }

    /// Checks whether this filter is active on a document domain.
    pub fn is_active_on_domain(&self, doc_domain: &str) -> bool {
        self.restriction.is_active_on(doc_domain)
    }

    /// Tests a request against this filter.
    ///
    /// An empty `doc_domain` skips the domain restriction.
    pub fn matches(
        &self,
        location: &str,
        content_type: ContentType,
        doc_domain: &str,
        third_party: bool,
    ) -> bool {
        self.regexp.is_match(location)
            && content_type.bits() & self.content_type_mask() != 0
            && self.third_party.map_or(true, |required| required == third_party)
            && (doc_domain.is_empty() || self.is_active_on_domain(doc_domain))
    }
}

// =============================================================================
// Element Hiding Filters
// =============================================================================

/// Cosmetic filter hiding elements matched by a CSS selector.
#[derive(Debug)]
pub struct ElemHideFilter {
    active: ActiveState,
    domain: Option<String>,
    restriction: DomainRestriction,
    selector: String,
    key: Mutex<Option<String>>,
}

impl ElemHideFilter {
    /// Build from a comma-separated domain list and a non-empty selector.
    pub fn new(domain: Option<String>, selector: String) -> Result<Self, FilterError> {
        if selector.trim().is_empty() {
            return Err(FilterError::EmptySelector);
        }

        let domain = domain.filter(|d| !d.is_empty());
        let restriction = domain
            .as_deref()
            .map(|list| DomainRestriction::parse(list, ','))
            .unwrap_or_default();

        Ok(Self {
            active: ActiveState::default(),
            domain,
            restriction,
            selector,
            key: Mutex::new(None),
        })
    }

    pub fn active(&self) -> &ActiveState {
        &self.active
    }

    /// Domain list the filter is restricted to, `None` for everywhere.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Correlation key used to attribute hits, assigned by [`crate::cosmetic::ElemHideSet`].
    pub fn key(&self) -> Option<String> {
        self.key.lock().clone()
    }

    pub(crate) fn set_key(&self, key: Option<String>) {
        *self.key.lock() = key;
    }

    /// Checks whether the selector applies on a document domain (subdomains included).
    pub fn is_active_on_domain(&self, doc_domain: &str) -> bool {
        self.restriction.is_active_on(doc_domain)
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Variant payload of a [`Filter`].
#[derive(Debug)]
pub enum FilterKind {
    /// Line that could not be compiled.
    Invalid { reason: String },
    /// `!` comment line; never matches.
    Comment,
    /// Blocks matching requests. `collapse: None` defers to the host preference.
    Blocking { regexp: RegexpFilter, collapse: Option<bool> },
    /// `@@` exception; overrides blocking decisions.
    Whitelist(RegexpFilter),
    /// Element hiding rule.
    ElemHide(ElemHideFilter),
}

/// One compiled line of filter list text.
#[derive(Debug)]
pub struct Filter {
    text: String,
    subscriptions: Mutex<Vec<String>>,
    kind: FilterKind,
}

impl Filter {
    fn with_kind(text: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            text: text.into(),
            subscriptions: Mutex::new(Vec::new()),
            kind,
        }
    }

    pub fn invalid(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_kind(text, FilterKind::Invalid { reason: reason.into() })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::with_kind(text, FilterKind::Comment)
    }

    pub fn blocking(text: impl Into<String>, regexp: RegexpFilter, collapse: Option<bool>) -> Self {
        Self::with_kind(text, FilterKind::Blocking { regexp, collapse })
    }

    pub fn whitelist(text: impl Into<String>, regexp: RegexpFilter) -> Self {
        Self::with_kind(text, FilterKind::Whitelist(regexp))
    }

    pub fn elemhide(text: impl Into<String>, filter: ElemHideFilter) -> Self {
        Self::with_kind(text, FilterKind::ElemHide(filter))
    }

    /// Original text; the identity key of the filter.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &FilterKind {
        &self.kind
    }

    /// Record type tag (`invalid`, `comment`, `filterlist`, `whitelist`, `elemhide`).
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            FilterKind::Invalid { .. } => "invalid",
            FilterKind::Comment => "comment",
            FilterKind::Blocking { .. } => "filterlist",
            FilterKind::Whitelist(_) => "whitelist",
            FilterKind::ElemHide(_) => "elemhide",
        }
    }

    pub fn invalid_reason(&self) -> Option<&str> {
        match &self.kind {
            FilterKind::Invalid { reason } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Hit accounting state, present for blocking, exception and element hiding filters.
    pub fn active(&self) -> Option<&ActiveState> {
        match &self.kind {
            FilterKind::Blocking { regexp, .. } | FilterKind::Whitelist(regexp) => Some(regexp.active()),
            FilterKind::ElemHide(filter) => Some(filter.active()),
            FilterKind::Invalid { .. } | FilterKind::Comment => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Regex payload of blocking and exception filters.
    pub fn as_regexp(&self) -> Option<&RegexpFilter> {
        match &self.kind {
            FilterKind::Blocking { regexp, .. } | FilterKind::Whitelist(regexp) => Some(regexp),
            _ => None,
        }
    }

    pub fn as_elemhide(&self) -> Option<&ElemHideFilter> {
        match &self.kind {
            FilterKind::ElemHide(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn is_whitelist(&self) -> bool {
        matches!(self.kind, FilterKind::Whitelist(_))
    }

    /// Collapse preference of a blocking filter.
    pub fn collapse(&self) -> Option<bool> {
        match self.kind {
            FilterKind::Blocking { collapse, .. } => collapse,
            _ => None,
        }
    }

    /// Disabled flag; filters without active state are never disabled.
    pub fn is_disabled(&self) -> bool {
        self.active().is_some_and(ActiveState::is_disabled)
    }

    /// Set the disabled flag. Returns false for filters without active state.
    pub fn set_disabled(&self, disabled: bool) -> bool {
        match self.active() {
            Some(state) => {
                state.set_disabled(disabled);
                true
            }
            None => false,
        }
    }

    /// See [`RegexpFilter::is_active_on_domain`] and [`ElemHideFilter::is_active_on_domain`].
    pub fn is_active_on_domain(&self, doc_domain: &str) -> bool {
        match &self.kind {
            FilterKind::Blocking { regexp, .. } | FilterKind::Whitelist(regexp) => {
                regexp.is_active_on_domain(doc_domain)
            }
            FilterKind::ElemHide(filter) => filter.is_active_on_domain(doc_domain),
            FilterKind::Invalid { .. } | FilterKind::Comment => false,
        }
    }

    /// Tests a request; only blocking and exception filters can match.
    pub fn matches(
        &self,
        location: &str,
        content_type: ContentType,
        doc_domain: &str,
        third_party: bool,
    ) -> bool {
        self.as_regexp()
            .is_some_and(|regexp| regexp.matches(location, content_type, doc_domain, third_party))
    }

    // =========================================================================
    // Subscription back-references
    // =========================================================================

    /// Ids of the subscriptions listing this filter. Not used for matching.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    pub fn add_subscription(&self, id: &str) {
        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.iter().any(|s| s == id) {
            subscriptions.push(id.to_string());
        }
    }

    pub fn remove_subscription(&self, id: &str) {
        self.subscriptions.lock().retain(|s| s != id);
    }
}
