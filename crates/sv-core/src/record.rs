//! Sparse persistence records
//!
//! A filter serializes to a flat list of `key=value` pairs holding only the
//! fields that differ from the variant's defaults. The text form is the
//! block written by the persistence layer:
//!
//! ```text
//! [Filter]
//! text=||ads.example.com^$script
//! hitCount=3
//! regexp=...
//! contentType=2
//! type=filterlist
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::filter::{ActiveState, ElemHideFilter, Filter, FilterError, FilterKind, RegexpFilter, RegexpOptions};
use crate::types::SHORTCUT_LENGTH;

/// Header line opening a record block.
pub const RECORD_HEADER: &str = "[Filter]";

// =============================================================================
// FilterRecord
// =============================================================================

/// Ordered string-keyed record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRecord {
    entries: Vec<(String, String)>,
}

impl FilterRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Boolean field; anything but `true`/`false` counts as absent.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Decimal integer field; unparsable values count as absent.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key)?.trim().parse().ok()
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key)?.trim().parse().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse every `[Filter]` block in `text`.
    ///
    /// Lines without `=` and lines outside a block are ignored.
    pub fn parse_blocks(text: &str) -> Vec<FilterRecord> {
        let mut records = Vec::new();
        let mut current: Option<FilterRecord> = None;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim() == RECORD_HEADER {
                if let Some(record) = current.take() {
                    records.push(record);
                }
                current = Some(FilterRecord::new());
                continue;
            }

            let Some(record) = current.as_mut() else {
                continue;
            };
            if let Some((key, value)) = line.split_once('=') {
                record.insert(key.trim(), value);
            }
        }

        if let Some(record) = current {
            records.push(record);
        }

        records
    }
}

impl fmt::Display for FilterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RECORD_HEADER}")?;
        for (key, value) in self.iter() {
            write!(f, "\n{key}={value}")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = FilterRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for FilterRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(map.into_iter().collect())
    }
}

// =============================================================================
// Serialization
// =============================================================================

impl Filter {
    /// Sparse record of this filter.
    pub fn serialize(&self) -> FilterRecord {
        let mut record = FilterRecord::new();
        record.insert("text", self.text());

        match self.kind() {
            FilterKind::Invalid { .. } | FilterKind::Comment => {}
            FilterKind::Blocking { regexp, collapse } => {
                write_active(&mut record, regexp.active());
                write_regexp(&mut record, regexp);
                if let Some(collapse) = collapse {
                    record.insert("collapse", collapse.to_string());
                }
            }
            FilterKind::Whitelist(regexp) => {
                write_active(&mut record, regexp.active());
                write_regexp(&mut record, regexp);
            }
            FilterKind::ElemHide(filter) => {
                write_active(&mut record, filter.active());
                if let Some(domain) = filter.domain() {
                    record.insert("domain", domain);
                }
                record.insert("selector", filter.selector());
            }
        }

        record.insert("type", self.type_name());
        record
    }
}

fn write_active(record: &mut FilterRecord, state: &ActiveState) {
    if state.is_disabled() {
        record.insert("disabled", "true");
    }
    if state.hit_count() != 0 {
        record.insert("hitCount", state.hit_count().to_string());
    }
    if state.last_hit() != 0 {
        record.insert("lastHit", state.last_hit().to_string());
    }
}

fn write_regexp(record: &mut FilterRecord, regexp: &RegexpFilter) {
    record.insert("regexp", regexp.regexp_source());
    if let Some(shortcut) = regexp.shortcut() {
        record.insert("shortcut", shortcut);
    }
    if let Some(content_type) = regexp.explicit_content_type() {
        record.insert("contentType", content_type.to_string());
    }
    if regexp.match_case() {
        record.insert("matchCase", "true");
    }
    if let Some(domains) = regexp.domains() {
        record.insert("domains", domains);
    }
    if let Some(third_party) = regexp.third_party() {
        record.insert("thirdParty", third_party.to_string());
    }
}

// =============================================================================
// Restoring
// =============================================================================

/// Rebuild a blocking or exception filter from trusted record fields.
///
/// Returns `None` when the record has no `regexp`; the caller then has to
/// re-derive the filter from its text.
pub fn restore_regexp_filter(
    record: &FilterRecord,
    whitelist: bool,
) -> Option<Result<Filter, FilterError>> {
    let text = record.get("text")?;
    let source = record.get("regexp")?;

    let options = RegexpOptions {
        content_type: record.get_u32("contentType"),
        match_case: record.get_bool("matchCase").unwrap_or(false),
        domains: record.get("domains").map(str::to_string),
        third_party: record.get_bool("thirdParty"),
    };

    let result = RegexpFilter::new(source, options).map(|regexp| {
        let regexp = match record.get("shortcut") {
            Some(shortcut) if shortcut.chars().count() == SHORTCUT_LENGTH => regexp.with_shortcut(shortcut),
            Some(shortcut) => {
                log::debug!("Ignoring stored shortcut {shortcut:?} for {text:?}");
                regexp
            }
            None => regexp,
        };

        if whitelist {
            Filter::whitelist(text, regexp)
        } else {
            Filter::blocking(text, regexp, record.get_bool("collapse"))
        }
    });

    Some(result)
}

/// Rebuild an element hiding filter. Returns `None` without a `selector`.
pub fn restore_elemhide_filter(record: &FilterRecord) -> Option<Result<Filter, FilterError>> {
    let text = record.get("text")?;
    let selector = record.get("selector")?;
    let domain = record.get("domain").map(str::to_string);

    Some(ElemHideFilter::new(domain, selector.to_string()).map(|filter| Filter::elemhide(text, filter)))
}

/// Copy `disabled`/`hitCount`/`lastHit` from a record; absent fields reset to defaults.
pub fn restore_active_state(state: &ActiveState, record: &FilterRecord) {
    if record.contains_key("disabled") {
        state.set_disabled(record.get_bool("disabled").unwrap_or(false));
    }
    if record.contains_key("hitCount") {
        state.set_hit_count(record.get_u64("hitCount").unwrap_or(0));
    }
    if record.contains_key("lastHit") {
        state.set_last_hit(record.get_u64("lastHit").unwrap_or(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;

    fn blocking(text: &str, source: &str, options: RegexpOptions) -> Filter {
        let regexp = RegexpFilter::new(source, options).expect("regex should compile");
        Filter::blocking(text, regexp, None)
    }

    #[test]
    fn defaults_are_not_written() {
        let filter = blocking("ads", "ads", RegexpOptions::default());
        let record = filter.serialize();

        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["text", "regexp", "type"]);
        assert_eq!(record.get("type"), Some("filterlist"));
    }

    #[test]
    fn non_defaults_are_written() {
        let filter = blocking(
            "ads$script,match-case,third-party,domain=a.com",
            "ads",
            RegexpOptions {
                content_type: Some(ContentType::SCRIPT.bits()),
                match_case: true,
                domains: Some("a.com".to_string()),
                third_party: Some(true),
            },
        );
        let state = filter.active().expect("blocking filters are active");
        state.set_disabled(true);
        state.record_hit(42);

        let record = filter.serialize();
        assert_eq!(record.get("disabled"), Some("true"));
        assert_eq!(record.get("hitCount"), Some("1"));
        assert_eq!(record.get("lastHit"), Some("42"));
        assert_eq!(record.get("contentType"), Some("2"));
        assert_eq!(record.get("matchCase"), Some("true"));
        assert_eq!(record.get("domains"), Some("a.com"));
        assert_eq!(record.get("thirdParty"), Some("true"));
        assert_eq!(record.get("collapse"), None);
    }

    #[test]
    fn block_text_parses_back() {
        let filter = blocking("||ads.example.com^", "ads", RegexpOptions::default());
        let text = format!("{}\n\n{}", filter.serialize(), Filter::comment("! c").serialize());

        let records = FilterRecord::parse_blocks(&text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], filter.serialize());
        assert_eq!(records[1].get("type"), Some("comment"));
    }

    #[test]
    fn values_may_contain_equals() {
        let records = FilterRecord::parse_blocks("[Filter]\ntext=a$domain=b.com\nselector=[href=\"x\"]");
        assert_eq!(records[0].get("text"), Some("a$domain=b.com"));
        assert_eq!(records[0].get("selector"), Some("[href=\"x\"]"));
    }

    #[test]
    fn restores_trusted_regexp_fields() {
        let record: FilterRecord = [
            ("text", "ads$image"),
            ("regexp", "ads"),
            ("contentType", "4"),
            ("thirdParty", "false"),
            ("collapse", "true"),
            ("shortcut", "toolong-shortcut"),
            ("type", "filterlist"),
        ]
        .into_iter()
        .collect();

        let filter = restore_regexp_filter(&record, false)
            .expect("record has a regexp")
            .expect("regexp compiles");
        let regexp = filter.as_regexp().expect("blocking filter");
        assert_eq!(regexp.content_type_mask(), 4);
        assert_eq!(regexp.third_party(), Some(false));
        assert_eq!(regexp.shortcut(), None);
        assert_eq!(filter.collapse(), Some(true));
    }

    #[test]
    fn accepts_shortcut_of_exact_length() {
        let record: FilterRecord = [("text", "banner/ad"), ("regexp", "banner\\/ad"), ("shortcut", "banner/a")]
            .into_iter()
            .collect();
        let filter = restore_regexp_filter(&record, true).unwrap().unwrap();
        assert!(filter.is_whitelist());
        assert_eq!(filter.as_regexp().and_then(RegexpFilter::shortcut), Some("banner/a"));
    }

    #[test]
    fn unparsable_fields_fall_back() {
        let record: FilterRecord = [("text", "x"), ("regexp", "x"), ("contentType", "abc"), ("matchCase", "yes")]
            .into_iter()
            .collect();
        let filter = restore_regexp_filter(&record, false).unwrap().unwrap();
        let regexp = filter.as_regexp().unwrap();
        assert_eq!(regexp.explicit_content_type(), None);
        assert!(!regexp.match_case());

        let state = ActiveState::default();
        let stats: FilterRecord = [("hitCount", "many"), ("lastHit", "17"), ("disabled", "true")]
            .into_iter()
            .collect();
        restore_active_state(&state, &stats);
        assert_eq!(state.hit_count(), 0);
        assert_eq!(state.last_hit(), 17);
        assert!(state.is_disabled());
    }

    #[test]
    fn json_shape_is_a_flat_map() {
        let record = Filter::comment("! hi").serialize();
        let json = serde_json::to_string(&record).expect("serializes");
        assert_eq!(json, r#"{"text":"! hi","type":"comment"}"#);

        let back: FilterRecord = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back.get("text"), Some("! hi"));
    }
}
