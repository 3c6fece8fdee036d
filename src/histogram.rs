//! Axis-distribution histogram over the current dataset store.

use polcomp_explorer::{build_histogram_datasets, Axis};
use serde_json::json;
use std::cell::RefCell;
use wasm_bindgen::{JsCast, JsValue};

use crate::chart;
use crate::store;
use crate::utils;

const CANVAS_ID: &str = "histogram-canvas";

thread_local! {
    static HISTOGRAM: RefCell<Option<JsValue>> = const { RefCell::new(None) };
}

/// The axis currently selected in the picker; society when the picker is
/// absent or holds an unknown key.
pub fn selected_axis() -> Axis {
    utils::element_by_id("select-histogram")
        .and_then(|el| el.dyn_into::<web_sys::HtmlSelectElement>().ok())
        .and_then(|sel| Axis::from_key(&sel.value()))
        .unwrap_or(Axis::Society)
}

fn set_pole_labels(axis: Axis) {
    let (left, right) = axis.pole_labels();
    utils::set_inner_text("hist-label-l", left);
    utils::set_inner_text("hist-label-r", right);
}

fn histogram_data(axis: Axis) -> serde_json::Value {
    let (labels, datasets) = store::with(|cohorts| build_histogram_datasets(cohorts, axis));
    json!({
        "labels": labels,
        "datasets": serde_json::to_value(&datasets).unwrap_or(serde_json::Value::Null)
    })
}

fn histogram_config(axis: Axis) -> serde_json::Value {
    json!({
        "type": "bar",
        "data": histogram_data(axis),
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "layout": { "padding": 0, "autoPadding": false },
            "scales": {
                "x": {
                    "display": true,
                    "border": { "display": false },
                    "grid": { "drawTicks": false, "display": false },
                    "ticks": { "display": false },
                    "min": -1,
                    "max": 1
                },
                "y": {
                    "display": true,
                    "border": { "display": false },
                    "grid": { "color": "#9e9e9e", "drawTicks": false, "display": true },
                    "ticks": {
                        "stepSize": 1,
                        "autoSkip": true,
                        "maxTicksLimit": 10,
                        "font": { "family": "Montserrat", "weight": 600, "size": 16 },
                        "color": "#f3f3f3",
                        "display": false
                    },
                    "min": 0,
                    "max": 1
                }
            },
            "plugins": {
                "legend": {
                    "display": true,
                    "labels": {
                        "color": "#f3f3f3",
                        "useBorderRadius": true,
                        "boxWidth": 28,
                        "borderRadius": 4,
                        "padding": 20,
                        "font": { "family": "Montserrat", "weight": 600, "size": 14 }
                    }
                },
                "tooltip": { "enabled": false }
            }
        }
    })
}

/// Create the histogram chart for the given axis. No-op when the canvas is
/// not on the page.
pub fn create_histogram(axis: Axis) {
    if utils::element_by_id(CANVAS_ID).is_none() {
        return;
    }

    set_pole_labels(axis);
    let handle = chart::make_chart(CANVAS_ID, &chart::to_js(&histogram_config(axis)));
    HISTOGRAM.with(|slot| {
        *slot.borrow_mut() = Some(handle);
    });
}

/// Rebuild the histogram for a newly selected axis.
pub fn update(axis: Axis) {
    HISTOGRAM.with(|slot| {
        if let Some(handle) = slot.borrow().as_ref() {
            set_pole_labels(axis);
            chart::set_data(handle, &chart::to_js(&histogram_data(axis)));
            chart::update(handle);
        }
    });
}

/// Rebuild for whatever axis the picker currently shows; called after every
/// successful query.
pub fn refresh() {
    update(selected_axis());
}
