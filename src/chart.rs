//! JavaScript interop for the Chart.js layer.
//!
//! Charts are constructed by thin helpers in chart_helpers.js (which also
//! owns the quadrant background-tint plugin) and handled here as opaque
//! objects: build a config, construct, later mutate `.data` and call
//! `.update()`. Nothing in Rust reaches into the library's rendering
//! internals.

use js_sys::{Array, Function, Reflect};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/chart_helpers.js")]
extern "C" {
    /// Construct a plain Chart.js chart on the canvas with the given id.
    #[wasm_bindgen(js_name = makeChart)]
    pub fn make_chart(target: &str, config: &JsValue) -> JsValue;

    /// Construct a scatter chart with the quadrant background plugin attached.
    #[wasm_bindgen(js_name = makeQuadrantChart)]
    pub fn make_quadrant_chart(target: &str, config: &JsValue) -> JsValue;
}

/// Serialize a config/data tree into a plain JS object tree (maps become
/// objects, not `Map`s, which is what Chart.js expects).
pub fn to_js<T: Serialize>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value.serialize(&serializer).unwrap_or(JsValue::NULL)
}

fn call0(target: &JsValue, name: &str) {
    if let Ok(f) = Reflect::get(target, &JsValue::from_str(name)) {
        if let Some(func) = f.dyn_ref::<Function>() {
            let _ = func.call0(target);
        }
    }
}

pub fn update(chart: &JsValue) {
    call0(chart, "update");
}

pub fn resize(chart: &JsValue) {
    call0(chart, "resize");
}

/// Replace the chart's `data` wholesale; follow with [`update`].
pub fn set_data(chart: &JsValue, data: &JsValue) {
    let _ = Reflect::set(chart, &JsValue::from_str("data"), data);
}

/// The chart's `data.datasets` array; empty when the chart has no data yet.
pub fn chart_datasets(chart: &JsValue) -> Array {
    Reflect::get(chart, &JsValue::from_str("data"))
        .and_then(|data| Reflect::get(&data, &JsValue::from_str("datasets")))
        .ok()
        .and_then(|v| v.dyn_into::<Array>().ok())
        .unwrap_or_else(Array::new)
}

pub fn get_string(obj: &JsValue, key: &str) -> Option<String> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
}

pub fn get_u32(obj: &JsValue, key: &str) -> Option<u32> {
    Reflect::get(obj, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
        .map(|v| v as u32)
}

pub fn set_string(obj: &JsValue, key: &str, value: &str) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &JsValue::from_str(value));
}
