//! Intern registry
//!
//! Every distinct filter text maps to exactly one shared [`Filter`] for the
//! lifetime of the registry, so the disabled flag and hit counts of a line
//! are shared by every subscription that lists it.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use sv_core::filter::Filter;
use sv_core::record::{restore_active_state, restore_elemhide_filter, restore_regexp_filter, FilterRecord};
use sv_core::types::RestoreOptions;

use crate::elemhide::compile_elemhide_filter;
use crate::options::OptionPolicy;
use crate::pattern::compile_url_filter;

static GLOBAL: Lazy<FilterRegistry> = Lazy::new(FilterRegistry::new);

/// Compile one line of filter text without interning it.
///
/// Dispatch order: element hiding grammar, `!` comment, URL pattern.
pub fn compile_filter(text: &str, policy: OptionPolicy) -> Filter {
    if let Some(filter) = compile_elemhide_filter(text) {
        return filter;
    }
    if text.starts_with('!') {
        return Filter::comment(text);
    }
    compile_url_filter(text, policy)
}

#[derive(Debug, Default)]
pub struct FilterRegistry {
    known: RwLock<HashMap<String, Arc<Filter>>>,
    policy: OptionPolicy,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: OptionPolicy) -> Self {
        Self {
            known: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Process-wide default registry.
    pub fn global() -> &'static FilterRegistry {
        &GLOBAL
    }

    pub fn policy(&self) -> OptionPolicy {
        self.policy
    }

    /// Interned filter for `text`, compiling it on first use.
    ///
    /// Returns `None` for blank text. Concurrent first calls for the same
    /// text may both compile, but both get the object stored first.
    pub fn from_text(&self, text: &str) -> Option<Arc<Filter>> {
        if text.trim().is_empty() {
            return None;
        }

        if let Some(filter) = self.get(text) {
            return Some(filter);
        }

        let filter = compile_filter(text, self.policy);
        log::debug!("Compiled {:?} as {}", text, filter.type_name());
        Some(self.intern(filter))
    }

    /// Rebuild a filter from a persisted record and intern it, replacing
    /// any filter with the same text.
    ///
    /// Returns `None` for records without `text` or with an unknown `type`.
    /// Regex-based records written by another format version are
    /// re-derived from their text.
    pub fn from_object(&self, record: &FilterRecord, options: &RestoreOptions) -> Option<Arc<Filter>> {
        let text = record.get("text")?;

        let filter = match record.get("type")? {
            "invalid" => self.from_text(text)?,
            "comment" => self.replace(Filter::comment(text)),
            kind @ ("filterlist" | "whitelist") => {
                let whitelist = kind == "whitelist";
                if !options.is_trusted() {
                    log::debug!(
                        "Record version {} is not current, re-deriving {text:?}",
                        options.stored_version
                    );
                    self.from_text(text)?
                } else {
                    match restore_regexp_filter(record, whitelist) {
                        Some(Ok(filter)) => self.replace(filter),
                        Some(Err(err)) => {
                            log::debug!("Stored regexp of {text:?} is unusable ({err}), re-deriving");
                            self.from_text(text)?
                        }
                        None => self.from_text(text)?,
                    }
                }
            }
            "elemhide" => match restore_elemhide_filter(record) {
                Some(Ok(filter)) => self.replace(filter),
                Some(Err(err)) => {
                    log::debug!("Stored selector of {text:?} is unusable ({err}), re-deriving");
                    self.from_text(text)?
                }
                None => self.from_text(text)?,
            },
            other => {
                log::debug!("Unknown filter record type {other:?}");
                return None;
            }
        };

        if let Some(state) = filter.active() {
            restore_active_state(state, record);
        }

        Some(filter)
    }

    pub fn get(&self, text: &str) -> Option<Arc<Filter>> {
        self.known.read().get(text).cloned()
    }

    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.read().is_empty()
    }

    /// Forget every interned filter. Filters already handed out stay valid.
    pub fn clear(&self) {
        self.known.write().clear();
    }

    fn intern(&self, filter: Filter) -> Arc<Filter> {
        let mut known = self.known.write();
        let entry = known
            .entry(filter.text().to_string())
            .or_insert_with(|| Arc::new(filter));
        Arc::clone(entry)
    }

    fn replace(&self, filter: Filter) -> Arc<Filter> {
        let filter = Arc::new(filter);
        self.known
            .write()
            .insert(filter.text().to_string(), Arc::clone(&filter));
        filter
    }
}
