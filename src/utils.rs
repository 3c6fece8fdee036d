//! Small DOM and page-context helpers shared across the UI modules.

use gloo_utils::{document, window};
use polcomp_explorer::is_valid_group_id;
use web_sys::{Element, HtmlElement};

/// Look up an element by id. Callers treat `None` as "this page section is
/// not present" and no-op rather than raising.
pub fn element_by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

pub fn html_element_by_id(id: &str) -> Option<HtmlElement> {
    use wasm_bindgen::JsCast;
    element_by_id(id).and_then(|el| el.dyn_into::<HtmlElement>().ok())
}

/// Replace an element's text content, no-op when the element is absent.
pub fn set_inner_text(id: &str, text: &str) {
    if let Some(el) = html_element_by_id(id) {
        el.set_inner_text(text);
    }
}

/// Today's date as an ISO-8601 `YYYY-MM-DD` string.
pub fn today_iso() -> String {
    let iso = js_sys::Date::new_0().to_iso_string();
    String::from(iso).chars().take(10).collect()
}

/// Random duration within `[base, base + jitter]`, used to keep loading
/// affordances visible long enough to register.
pub fn jittered_delay_ms(base: u32, jitter: u32) -> u32 {
    base + (js_sys::Math::random() * jitter as f64) as u32
}

/// Resolve the active respondent-group id: URL query parameter `g` first,
/// then a page-embedded `data-group` attribute. Anything that is not a
/// syntactically valid UUID is treated as absent.
pub fn page_group_id() -> Option<String> {
    if let Some(from_url) = group_id_from_url() {
        return Some(from_url);
    }
    group_id_from_meta()
}

fn group_id_from_url() -> Option<String> {
    let search = window().location().search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    let raw = params.get("g")?;
    let trimmed = raw.trim().to_string();
    is_valid_group_id(&trimmed).then_some(trimmed)
}

fn group_id_from_meta() -> Option<String> {
    let el = element_by_id("group-data")?;
    let raw = el.get_attribute("data-group")?;
    let trimmed = raw.trim().to_string();
    is_valid_group_id(&trimmed).then_some(trimmed)
}
