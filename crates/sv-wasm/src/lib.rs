//! WebAssembly bindings for Sieve
//!
//! The browser host is single-threaded: the matcher and the element hiding
//! set live in a thread-local, filters are interned in the global registry.

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use sv_compiler::{parse_filter_list, FilterRegistry, ListStats};
use sv_core::{ContentType, ElemHideSet, FilterMatcher, FilterRecord, MatchDecision, RequestContext, RestoreOptions};

#[derive(Default)]
struct EngineState {
    matcher: FilterMatcher,
    elemhide: ElemHideSet,
}

thread_local! {
    static ENGINE: RefCell<EngineState> = RefCell::new(EngineState::default());
}

fn set_field(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &key.into(), value);
}

fn record_to_js(record: &FilterRecord) -> JsValue {
    let obj = js_sys::Object::new();
    for (key, value) in record.iter() {
        set_field(&obj, key, &JsValue::from_str(value));
    }
    obj.into()
}

/// Read a flat object; numbers and booleans are stringified like the text form.
fn record_from_js(value: &JsValue) -> Result<FilterRecord, JsValue> {
    if !value.is_object() {
        return Err(JsValue::from_str("Record must be an object"));
    }

    let mut record = FilterRecord::new();
    let entries = js_sys::Object::entries(&js_sys::Object::from(value.clone()));
    for entry in entries.iter() {
        let pair = js_sys::Array::from(&entry);
        let Some(key) = pair.get(0).as_string() else {
            continue;
        };
        let field = pair.get(1);
        let text = if let Some(s) = field.as_string() {
            s
        } else if let Some(n) = field.as_f64() {
            n.to_string()
        } else if let Some(b) = field.as_bool() {
            b.to_string()
        } else {
            continue;
        };
        record.insert(key, text);
    }

    Ok(record)
}

fn stats_to_js(stats: &ListStats) -> JsValue {
    let obj = js_sys::Object::new();
    set_field(&obj, "blocking", &JsValue::from(stats.blocking as u32));
    set_field(&obj, "whitelist", &JsValue::from(stats.whitelist as u32));
    set_field(&obj, "elemhide", &JsValue::from(stats.elemhide as u32));
    set_field(&obj, "comments", &JsValue::from(stats.comments as u32));
    set_field(&obj, "invalid", &JsValue::from(stats.invalid as u32));
    obj.into()
}

/// Compile a filter list and put its filters in effect.
#[wasm_bindgen]
pub fn load_filter_list(text: &str, subscription_id: Option<String>) -> JsValue {
    let filters = parse_filter_list(FilterRegistry::global(), text);
    let stats = ListStats::from_filters(&filters);

    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        for filter in filters {
            if let Some(id) = subscription_id.as_deref() {
                filter.add_subscription(id);
            }
            if filter.as_elemhide().is_some() {
                engine.elemhide.add(filter);
            } else {
                engine.matcher.add(filter);
            }
        }
    });

    stats_to_js(&stats)
}

/// Record of the interned filter for `text`, `null` for blank text.
#[wasm_bindgen]
pub fn filter_from_text(text: &str) -> JsValue {
    match FilterRegistry::global().from_text(text) {
        Some(filter) => record_to_js(&filter.serialize()),
        None => JsValue::NULL,
    }
}

/// Restore a filter from a persisted record and return its current record.
#[wasm_bindgen]
pub fn filter_from_object(record: JsValue, stored_version: Option<u32>) -> Result<JsValue, JsValue> {
    let record = record_from_js(&record)?;
    let options = stored_version
        .map(|stored_version| RestoreOptions { stored_version })
        .unwrap_or_default();

    Ok(match FilterRegistry::global().from_object(&record, &options) {
        Some(filter) => record_to_js(&filter.serialize()),
        None => JsValue::NULL,
    })
}

/// Returns false if no filter with this text is active.
#[wasm_bindgen]
pub fn set_filter_disabled(text: &str, disabled: bool) -> bool {
    FilterRegistry::global()
        .get(text)
        .is_some_and(|filter| filter.set_disabled(disabled))
}

/// Decide a request and count a hit on the deciding filter.
///
/// Result: `{ decision: "block" | "allow" | "none", filter?: text }`.
#[wasm_bindgen]
pub fn match_request(url: &str, request_type: &str, document_url: Option<String>) -> JsValue {
    let content_type = ContentType::from_request_type(request_type);
    let ctx = RequestContext::from_urls(url, content_type, document_url.as_deref());
    let decision = ENGINE.with(|engine| engine.borrow().matcher.match_request(&ctx));

    let result = js_sys::Object::new();
    let label = match &decision {
        MatchDecision::Block(_) => "block",
        MatchDecision::Allow(_) => "allow",
        MatchDecision::NoMatch => "none",
    };
    set_field(&result, "decision", &JsValue::from_str(label));

    if let Some(filter) = decision.filter() {
        if let Some(state) = filter.active() {
            state.record_hit(js_sys::Date::now() as u64);
        }
        set_field(&result, "filter", &JsValue::from_str(filter.text()));
    }

    result.into()
}

/// Selectors to hide on `domain`.
#[wasm_bindgen]
pub fn selectors_for_domain(domain: &str) -> js_sys::Array {
    let out = js_sys::Array::new();
    ENGINE.with(|engine| {
        let engine = engine.borrow();
        for selector in engine.elemhide.selectors_for_domain(domain) {
            out.push(&JsValue::from_str(selector));
        }
    });
    out
}

/// CSS hiding every selector that applies on `domain`.
#[wasm_bindgen]
pub fn stylesheet_for_domain(domain: &str) -> String {
    ENGINE.with(|engine| engine.borrow().elemhide.stylesheet_for_domain(domain))
}

/// Hit key of the element hiding filter with this text, if it is in effect.
#[wasm_bindgen]
pub fn elemhide_key(text: &str) -> Option<String> {
    FilterRegistry::global()
        .get(text)
        .and_then(|filter| filter.as_elemhide().and_then(|elemhide| elemhide.key()))
}

/// Count a hit on the element hiding filter holding `key`.
#[wasm_bindgen]
pub fn elemhide_hit(key: &str) -> bool {
    ENGINE.with(|engine| {
        let engine = engine.borrow();
        match engine.elemhide.filter_by_key(key).and_then(|filter| filter.active()) {
            Some(state) => {
                state.record_hit(js_sys::Date::now() as u64);
                true
            }
            None => false,
        }
    })
}

/// Drop every filter in effect and forget interned filters.
#[wasm_bindgen]
pub fn reset() {
    ENGINE.with(|engine| {
        let mut engine = engine.borrow_mut();
        engine.matcher.clear();
        engine.elemhide.clear();
    });
    FilterRegistry::global().clear();
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    fn field(value: &JsValue, key: &str) -> Option<String> {
        js_sys::Reflect::get(value, &key.into()).ok().and_then(|v| v.as_string())
    }

    #[wasm_bindgen_test]
    fn load_and_match() {
        reset();
        load_filter_list("||ads.example.com^\n@@||ads.example.com/ok^\n##.banner", Some("test".to_string()));

        let blocked = match_request("http://ads.example.com/x.js", "script", Some("http://news.org/".to_string()));
        assert_eq!(field(&blocked, "decision").as_deref(), Some("block"));
        assert_eq!(field(&blocked, "filter").as_deref(), Some("||ads.example.com^"));

        let allowed = match_request("http://ads.example.com/ok/y.png", "image", None);
        assert_eq!(field(&allowed, "decision").as_deref(), Some("allow"));

        assert_eq!(stylesheet_for_domain("news.org"), ".banner{display:none !important}");
        let key = elemhide_key("##.banner").expect("key assigned");
        assert!(elemhide_hit(&key));
        assert!(!elemhide_hit("0000000000000000"));
    }

    #[wasm_bindgen_test]
    fn records_round_trip_through_objects() {
        reset();
        let record = filter_from_text("ads$image");
        let hits = js_sys::Object::new();
        set_field(&hits, "text", &JsValue::from_str("ads$image"));
        set_field(&hits, "regexp", &JsValue::from_str("ads"));
        set_field(&hits, "contentType", &JsValue::from(4));
        set_field(&hits, "hitCount", &JsValue::from(2));
        set_field(&hits, "type", &JsValue::from_str("filterlist"));

        let restored = filter_from_object(hits.into(), None).expect("object record");
        assert_eq!(field(&restored, "hitCount").as_deref(), Some("2"));
        assert_eq!(field(&restored, "contentType"), field(&record, "contentType"));
    }
}
