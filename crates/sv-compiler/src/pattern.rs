//! URL pattern compiler
//!
//! Turns blocking and exception filter text into a regular expression plus
//! options:
//!
//! - `/.../` is used verbatim as a regular expression
//! - `*` matches anything, runs of `*` count as one
//! - `|` at the start or end anchors to the start or end of the address
//! - `||` anchors to the host name (any scheme, any subdomain)
//! - `^` matches a separator character or the end of the address

use once_cell::sync::Lazy;
use regex::Regex;

use sv_core::filter::{Filter, RegexpFilter, RegexpOptions};
use sv_core::types::{ContentType, DEFAULT_CONTENT_MASK};

use crate::options::{parse_options, split_options, OptionPolicy, ParsedOptions};

/// Regex emitted for a leading `||`.
const HOST_ANCHOR: &str = r"^[\w\-]+:/+(?:[^/]+\.)?";

/// Regex emitted for `^`.
const SEPARATOR: &str = r"(?:[\x00-\x24\x26-\x2C\x2F\x3A-\x40\x5B-\x5E\x60\x7B-\x7F]|$)";

/// Regex of a pattern that compiles to nothing.
const MATCH_ANYTHING: &str = ".*";

/// Patterns starting with a protocol name, optionally anchored.
static PROTOCOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\|?[A-Za-z0-9_-]+:").unwrap());

/// Compile a blocking filter or, with a leading `@@`, an exception filter.
///
/// Never fails: a pattern that does not compile yields an invalid filter.
pub fn compile_url_filter(text: &str, policy: OptionPolicy) -> Filter {
    let (whitelist, body) = match text.strip_prefix("@@") {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (pattern, options) = match split_options(body) {
        (pattern, Some(list)) => (pattern, parse_options(list)),
        (pattern, None) => (pattern, ParsedOptions::default()),
    };

    if policy == OptionPolicy::Strict && !options.unknown.is_empty() {
        return Filter::invalid(text, format!("Unknown filter option: {}", options.unknown.join(",")));
    }

    let source = pattern_to_regexp(pattern);
    let mut content_type = options.content_type;

    // Exceptions apply to whole pages only when asked for or when they start with a protocol.
    if whitelist
        && content_type.map_or(true, |mask| mask & ContentType::DOCUMENT.bits() != 0)
        && !options.explicit_document
        && !PROTOCOL_RE.is_match(pattern)
    {
        let mask = content_type.unwrap_or(DEFAULT_CONTENT_MASK);
        content_type = Some(mask & !ContentType::DOCUMENT.bits());
    }

    let regexp_options = RegexpOptions {
        content_type,
        match_case: options.match_case,
        domains: options.domains,
        third_party: options.third_party,
    };

    match RegexpFilter::new(&source, regexp_options) {
        Ok(regexp) if whitelist => Filter::whitelist(text, regexp),
        Ok(regexp) => Filter::blocking(text, regexp, options.collapse),
        Err(err) => {
            log::debug!("Invalid filter {text:?}: {err}");
            Filter::invalid(text, err.to_string())
        }
    }
}

/// Translate a pattern (options already removed) into regex source.
pub fn pattern_to_regexp(pattern: &str) -> String {
    if pattern.starts_with('/') && pattern.ends_with('/') {
        // A lone `/` is an empty literal.
        let body = pattern.get(1..pattern.len() - 1).unwrap_or("");
        return if body.is_empty() {
            MATCH_ANYTHING.to_string()
        } else {
            body.to_string()
        };
    }

    let collapsed = collapse_wildcards(pattern);
    let mut rest = collapsed.as_str();
    let mut source = String::with_capacity(rest.len() * 2);

    let start_anchor = if let Some(after) = rest.strip_prefix("||") {
        source.push_str(HOST_ANCHOR);
        rest = after;
        true
    } else if let Some(after) = rest.strip_prefix('|') {
        source.push('^');
        rest = after;
        true
    } else {
        false
    };

    let end_anchor = match rest.strip_suffix('|') {
        Some(before) => {
            rest = before;
            true
        }
        None => false,
    };

    // Unanchored leading/trailing wildcards are implied.
    if !start_anchor {
        rest = rest.strip_prefix('*').unwrap_or(rest);
    }
    if !end_anchor {
        rest = rest.strip_suffix('*').unwrap_or(rest);
    }

    let mut buf = [0u8; 4];
    for ch in rest.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '^' => source.push_str(SEPARATOR),
            _ => source.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
        }
    }

    if end_anchor {
        source.push('$');
    }

    if source.is_empty() {
        return MATCH_ANYTHING.to_string();
    }
    source
}

fn collapse_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut prev_star = false;
    for ch in pattern.chars() {
        if ch == '*' && prev_star {
            continue;
        }
        prev_star = ch == '*';
        out.push(ch);
    }
    out
}
