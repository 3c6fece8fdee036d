//! The four quadrant scatter charts.

use polcomp_explorer::{add_transparency, build_quadrant_datasets, label_matches, Axis};
use serde_json::json;
use std::cell::RefCell;
use wasm_bindgen::JsValue;

use crate::chart;
use crate::store;
use crate::utils;

/// Props for one quadrant: canvas id, axis pair, and the four corner tints
/// in top-left, top-right, bottom-left, bottom-right order.
pub struct Quadrant {
    pub id: &'static str,
    pub x: Axis,
    pub y: Axis,
    pub corners: [&'static str; 4],
}

pub const QUADRANTS: [Quadrant; 4] = [
    Quadrant {
        id: "upper_left",
        x: Axis::Society,
        y: Axis::Politics,
        corners: ["#93daf8", "#afafaf", "#afafaf", "#c9e5bd"],
    },
    Quadrant {
        id: "upper_right",
        x: Axis::Economics,
        y: Axis::State,
        corners: ["#afafaf", "#93daf8", "#c9e5bd", "#afafaf"],
    },
    Quadrant {
        id: "lower_left",
        x: Axis::Diplomacy,
        y: Axis::Government,
        corners: ["#afafaf", "#c9e5bd", "#93daf8", "#afafaf"],
    },
    Quadrant {
        id: "lower_right",
        x: Axis::Technology,
        y: Axis::Religion,
        corners: ["#c9e5bd", "#afafaf", "#afafaf", "#93daf8"],
    },
];

thread_local! {
    /// Live chart handles, one per quadrant, created once on mount.
    static CHARTS: RefCell<Vec<(usize, JsValue)>> = const { RefCell::new(Vec::new()) };
}

/// `{ datasets: [...] }` for one quadrant, as a JSON tree.
fn quadrant_data(quadrant: &Quadrant) -> serde_json::Value {
    let datasets =
        store::with(|cohorts| build_quadrant_datasets(cohorts, quadrant.x, quadrant.y));
    let datasets = serde_json::to_value(&datasets).unwrap_or(serde_json::Value::Null);
    json!({ "datasets": datasets })
}

fn quadrant_config(quadrant: &Quadrant, data: serde_json::Value) -> serde_json::Value {
    json!({
        "type": "scatter",
        "data": data,
        "options": {
            "aspectRatio": 1,
            "responsive": true,
            "maintainAspectRatio": true,
            "layout": { "padding": 0, "autoPadding": false },
            "scales": {
                "x": {
                    "display": false,
                    "grid": { "drawTicks": false, "display": false },
                    "ticks": { "display": false },
                    "min": -1,
                    "max": 1
                },
                "y": {
                    "display": true,
                    "grid": { "drawTicks": false, "display": false },
                    "ticks": { "display": false },
                    "min": -1,
                    "max": 1
                }
            },
            "plugins": {
                "quadrants": {
                    "topLeft": quadrant.corners[0],
                    "topRight": quadrant.corners[1],
                    "bottomLeft": quadrant.corners[2],
                    "bottomRight": quadrant.corners[3]
                },
                "legend": { "display": false },
                "tooltip": { "enabled": false }
            }
        }
    })
}

/// Create all four charts from the current store snapshot. Quadrants whose
/// canvas is absent are skipped.
pub fn create_polcomp() {
    CHARTS.with(|charts| charts.borrow_mut().clear());

    for (idx, quadrant) in QUADRANTS.iter().enumerate() {
        if utils::element_by_id(quadrant.id).is_none() {
            continue;
        }

        let config = quadrant_config(quadrant, quadrant_data(quadrant));
        let handle = chart::make_quadrant_chart(quadrant.id, &chart::to_js(&config));
        CHARTS.with(|charts| charts.borrow_mut().push((idx, handle)));
    }
}

/// Recompute every quadrant's full layered dataset list from the store and
/// push it into the charts. Never patches incrementally.
pub fn update_chart_data() {
    CHARTS.with(|charts| {
        for (idx, handle) in charts.borrow().iter() {
            let quadrant = &QUADRANTS[*idx];
            chart::set_data(handle, &chart::to_js(&quadrant_data(quadrant)));
            chart::update(handle);
        }
    });
}

pub fn resize_all() {
    CHARTS.with(|charts| {
        for (_, handle) in charts.borrow().iter() {
            chart::resize(handle);
        }
    });
}

/// Repaint every chart-dataset belonging to the recolored cohort with a
/// half-transparent version of the new color. Targeted by `dataset_id`,
/// falling back to label containment for datasets without one; duplicate
/// labels all match.
pub fn apply_color(custom_id: u32, new_color: &str) {
    let Some(target_label) = store::label_of(custom_id) else {
        return;
    };
    let fill = add_transparency(new_color, 0.5);

    CHARTS.with(|charts| {
        for (_, handle) in charts.borrow().iter() {
            let datasets = chart::chart_datasets(handle);
            for entry in datasets.iter() {
                let by_id = chart::get_u32(&entry, "dataset_id") == Some(custom_id);
                let by_label = chart::get_string(&entry, "label")
                    .is_some_and(|l| label_matches(&l, &target_label));
                if by_id || by_label {
                    chart::set_string(&entry, "pointBackgroundColor", &fill);
                }
            }
            chart::update(handle);
        }
    });
}

/// Swap the displayed label on every chart-dataset tagged with the cohort's
/// id. Mean markers lose their " Average" suffix until the next full
/// rebuild, matching the historical behavior.
pub fn apply_label(custom_id: u32, new_label: &str) {
    CHARTS.with(|charts| {
        for (_, handle) in charts.borrow().iter() {
            let datasets = chart::chart_datasets(handle);
            for entry in datasets.iter() {
                if chart::get_u32(&entry, "dataset_id") == Some(custom_id) {
                    chart::set_string(&entry, "label", new_label);
                }
            }
            chart::update(handle);
        }
    });
}
