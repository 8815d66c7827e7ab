//! Element hiding rule compiler
//!
//! Two rule shapes are understood:
//!
//! - `domains##selector`: a raw CSS selector
//! - `domains#tag(attr=value)(id)`: the old tag/attribute form, translated
//!   into a CSS selector here

use once_cell::sync::Lazy;
use regex::Regex;

use sv_core::filter::{ElemHideFilter, Filter, FilterError};

/// Whole element hiding rule. Groups: domains, tag, attribute rules, selector.
static ELEMHIDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^([^/*|@"]*?)#(?:([A-Za-z0-9_-]+|\*)((?:\([A-Za-z0-9_-]+(?:[$^*]?=[^()"]*)?\))*)|#([^{}]+))$"#,
    )
    .unwrap()
});

/// One `(...)` attribute rule.
static ATTR_RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\(([A-Za-z0-9_-]+(?:[$^*]?=[^()"]*)?)\)"#).unwrap());

/// Checks whether `text` has the shape of an element hiding rule.
pub fn is_elemhide_rule(text: &str) -> bool {
    ELEMHIDE_RE.is_match(text)
}

/// Compile an element hiding rule.
///
/// Returns `None` if `text` is not an element hiding rule at all; a rule
/// with the right shape but bad content compiles to an invalid filter.
pub fn compile_elemhide_filter(text: &str) -> Option<Filter> {
    let caps = ELEMHIDE_RE.captures(text)?;
    let domains = normalize_domain_list(caps.get(1).map_or("", |m| m.as_str()));

    let selector = match caps.get(4) {
        Some(selector) => Ok(selector.as_str().to_string()),
        None => build_selector(
            caps.get(2).map_or("", |m| m.as_str()),
            caps.get(3).map_or("", |m| m.as_str()),
        ),
    };

    let filter = selector
        .and_then(|selector| ElemHideFilter::new(Some(domains), selector))
        .map(|elemhide| Filter::elemhide(text, elemhide))
        .unwrap_or_else(|err| {
            log::debug!("Invalid element hiding rule {text:?}: {err}");
            Filter::invalid(text, err.to_string())
        });

    Some(filter)
}

/// Strip leading and trailing commas and collapse runs of them.
pub fn normalize_domain_list(list: &str) -> String {
    list.split(',')
        .filter(|domain| !domain.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Translate `tag(attr=value)(id)` into a CSS selector.
///
/// A bare `(name)` group is the element id; at most one is allowed. An id
/// produces both a class and an id selector.
pub fn build_selector(tag: &str, attr_rules: &str) -> Result<String, FilterError> {
    let tag = if tag == "*" { "" } else { tag };

    let mut id: Option<&str> = None;
    let mut additional = String::new();

    for caps in ATTR_RULE_RE.captures_iter(attr_rules) {
        let Some(rule) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };

        match rule.find('=') {
            Some(pos) if pos > 0 => {
                let (name, value) = (&rule[..pos], &rule[pos + 1..]);
                additional.push_str(&format!("[{name}=\"{value}\"]"));
            }
            _ => {
                if id.is_some() {
                    return Err(FilterError::DuplicateId);
                }
                id = Some(rule);
            }
        }
    }

    match id {
        Some(id) => Ok(format!("{tag}.{id}{additional},{tag}#{id}{additional}")),
        None if !tag.is_empty() || !additional.is_empty() => Ok(format!("{tag}{additional}")),
        None => Err(FilterError::NoCriteria),
    }
}
