//! `$option` grammar of URL filters
//!
//! Options are a comma-separated, case-insensitive token list at the end of
//! the filter text: `||ads.example.com^$script,~third-party,domain=a.com|~b.a.com`.

use once_cell::sync::Lazy;
use regex::Regex;

use sv_core::types::{ContentType, DEFAULT_CONTENT_MASK};

/// Trailing option list; group 1 is the list without the `$`.
static OPTIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(~?[A-Za-z0-9_-]+(?:=[^,\s]+)?(?:,~?[A-Za-z0-9_-]+(?:=[^,\s]+)?)*)$").unwrap()
});

/// What to do with option tokens the grammar does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OptionPolicy {
    /// Ignore them, as existing filter lists expect.
    #[default]
    Lenient,
    /// Turn the filter into an invalid filter.
    Strict,
}

/// Parsed option list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    /// `None` until the first type token.
    pub content_type: Option<u32>,
    pub match_case: bool,
    /// `domain=` value as written.
    pub domains: Option<String>,
    pub third_party: Option<bool>,
    pub collapse: Option<bool>,
    /// A bare `document` token was present.
    pub explicit_document: bool,
    /// Tokens that were not understood.
    pub unknown: Vec<String>,
}

/// Split `text` into the pattern and its option list, if it has one.
pub fn split_options(text: &str) -> (&str, Option<&str>) {
    match OPTIONS_RE.captures(text) {
        Some(caps) => {
            let (Some(whole), Some(list)) = (caps.get(0), caps.get(1)) else {
                return (text, None);
            };
            (&text[..whole.start()], Some(list.as_str()))
        }
        None => (text, None),
    }
}

/// Interpret an option list (without the leading `$`).
pub fn parse_options(list: &str) -> ParsedOptions {
    let mut options = ParsedOptions::default();

    for token in list.split(',') {
        // Text after a second `=` is dropped: `domain=a.com=b` means `a.com`.
        let mut parts = token.split('=');
        let raw_name = parts.next().unwrap_or(token);
        let value = parts.next();
        let name = raw_name.to_ascii_uppercase().replacen('-', "_", 1);

        if name == "DOCUMENT" {
            options.explicit_document = true;
        }

        if let Some(bit) = ContentType::from_name(&name) {
            let mask = options.content_type.get_or_insert(0);
            *mask |= bit.bits();
            continue;
        }

        if let Some(bit) = name.strip_prefix('~').and_then(ContentType::from_name) {
            let mask = options.content_type.get_or_insert(DEFAULT_CONTENT_MASK);
            *mask &= !bit.bits();
            continue;
        }

        match (name.as_str(), value) {
            ("MATCH_CASE", _) => options.match_case = true,
            ("DOMAIN", Some(value)) => options.domains = Some(value.to_string()),
            ("THIRD_PARTY", _) => options.third_party = Some(true),
            ("~THIRD_PARTY", _) => options.third_party = Some(false),
            ("COLLAPSE", _) => options.collapse = Some(true),
            ("~COLLAPSE", _) => options.collapse = Some(false),
            _ => options.unknown.push(token.to_string()),
        }
    }

    options
}
