//! DOM helpers.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlInputElement};

pub fn doc() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

pub fn by_id(id: &str) -> Result<Element, JsValue> {
    doc()?
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))
}

/// Elements under `parent` matching `selector`.
pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = parent.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Nearest ancestor of an event target (inclusive) matching `selector`.
pub fn closest(target: Option<web_sys::EventTarget>, selector: &str) -> Option<Element> {
    target?.dyn_into::<Element>().ok()?.closest(selector).ok()?
}

pub fn input_value(target: Option<web_sys::EventTarget>) -> Option<(String, String)> {
    let input = target?.dyn_into::<HtmlInputElement>().ok()?;
    Some((input.id(), input.value()))
}

/// Keeps the amount field's focus and caret while the rest of the screen is
/// redrawn.
pub fn focused_id() -> Option<String> {
    let id = doc().ok()?.active_element()?.id();
    (!id.is_empty()).then_some(id)
}

pub fn refocus(id: &str) {
    let Ok(el) = by_id(id) else {
        return;
    };
    if let Ok(input) = el.dyn_into::<HtmlInputElement>() {
        let _ = input.focus();
        let end = input.value().len() as u32;
        let _ = input.set_selection_range(end, end);
    }
}
