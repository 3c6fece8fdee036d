//! Per-question answer distribution chart and question selection state.

use polcomp_explorer::{build_pie_datasets, step_question, ANSWER_ORDER, QUESTION_MIN};
use serde_json::json;
use std::cell::{Cell, RefCell};
use wasm_bindgen::JsValue;

use crate::chart;
use crate::store;
use crate::utils;

const CANVAS_ID: &str = "pie-canvas";

thread_local! {
    static PIE: RefCell<Option<JsValue>> = const { RefCell::new(None) };
    static SELECTED_QUESTION: Cell<u32> = const { Cell::new(QUESTION_MIN) };
}

pub fn selected_question() -> u32 {
    SELECTED_QUESTION.with(|q| q.get())
}

fn pie_data(question_id: u32) -> serde_json::Value {
    let datasets = store::with(|cohorts| build_pie_datasets(cohorts, question_id));
    json!({
        "labels": ANSWER_ORDER,
        "datasets": serde_json::to_value(&datasets).unwrap_or(serde_json::Value::Null)
    })
}

fn pie_config(question_id: u32) -> serde_json::Value {
    json!({
        "type": "bar",
        "data": pie_data(question_id),
        "options": {
            "responsive": true,
            "maintainAspectRatio": false,
            "layout": { "padding": 0, "autoPadding": false },
            "scales": {
                "x": {
                    "display": true,
                    "border": { "display": false },
                    "grid": { "drawTicks": false, "display": false },
                    "ticks": {
                        "font": { "family": "Montserrat", "weight": 600, "size": 12 },
                        "maxRotation": 90,
                        "minRotation": 90,
                        "padding": 5,
                        "color": "#f3f3f3",
                        "display": true
                    }
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

/// Move the row highlight and the displayed question text to the selected
/// row. No-ops when the question table is not on the page.
fn highlight_row(question_id: u32, prev_question_id: u32) {
    if let Some(prev) = utils::element_by_id(&format!("qid_{}", prev_question_id)) {
        let _ = prev.class_list().remove_1("row-selected");
    }

    let Some(row) = utils::element_by_id(&format!("qid_{}", question_id)) else {
        return;
    };
    let _ = row.class_list().add_1("row-selected");

    let cells = row.get_elements_by_tag_name("td");
    if let Some(text) = cells.item(1).and_then(|cell| cell.text_content()) {
        utils::set_inner_text("question_text", &text);
    }
}

/// Create the distribution chart for the given question.
pub fn create_pie(question_id: u32) {
    if utils::element_by_id(CANVAS_ID).is_none() {
        return;
    }

    SELECTED_QUESTION.with(|q| q.set(question_id));
    highlight_row(question_id, question_id);

    let handle = chart::make_chart(CANVAS_ID, &chart::to_js(&pie_config(question_id)));
    PIE.with(|slot| {
        *slot.borrow_mut() = Some(handle);
    });
}

/// Switch to a new question and rebuild the chart.
pub fn update(question_id: u32, prev_question_id: u32) {
    SELECTED_QUESTION.with(|q| q.set(question_id));
    highlight_row(question_id, prev_question_id);

    PIE.with(|slot| {
        if let Some(handle) = slot.borrow().as_ref() {
            chart::set_data(handle, &chart::to_js(&pie_data(question_id)));
            chart::update(handle);
        }
    });
}

/// Rebuild for the currently selected question; called after every
/// successful query.
pub fn refresh() {
    let current = selected_question();
    update(current, current);
}

/// Table-row click handler.
pub fn select_question(question_id: u32) {
    update(question_id, selected_question());
}

/// Prev/next cycling through the fixed question id range.
pub fn change_selected_question(forward: bool) {
    let prev = selected_question();
    update(step_question(prev, forward), prev);
}
