//! Process-wide dataset store.
//!
//! Holds the cohort list from the most recent successfully completed,
//! non-superseded query. Every renderer reads from here; the only writer is
//! the query dispatcher's success path plus the two explicit post-hoc edit
//! operations (recolor, relabel). The slot is swapped wholesale after the
//! full response has been parsed, so readers never observe a half-updated
//! list.

use polcomp_explorer::CohortResult;
use std::cell::RefCell;

thread_local! {
    static DATASETS: RefCell<Vec<CohortResult>> = const { RefCell::new(Vec::new()) };
}

/// Replace the store with a fully parsed response.
pub fn replace(datasets: Vec<CohortResult>) {
    DATASETS.with(|slot| {
        *slot.borrow_mut() = datasets;
    });
}

/// Read the current snapshot.
pub fn with<R>(f: impl FnOnce(&[CohortResult]) -> R) -> R {
    DATASETS.with(|slot| f(&slot.borrow()))
}

/// The label currently attached to a cohort, by its stable id.
pub fn label_of(custom_id: u32) -> Option<String> {
    with(|datasets| {
        datasets
            .iter()
            .find(|d| d.custom_id == Some(custom_id))
            .map(|d| d.label.clone())
    })
}

/// Update one cohort's color in place. Returns whether a cohort matched.
pub fn set_color(custom_id: u32, color: &str) -> bool {
    DATASETS.with(|slot| {
        let mut datasets = slot.borrow_mut();
        let mut found = false;
        for dataset in datasets.iter_mut() {
            if dataset.custom_id == Some(custom_id) {
                dataset.color = color.to_string();
                found = true;
            }
        }
        found
    })
}

/// Update one cohort's label in place. Returns whether a cohort matched.
pub fn set_label(custom_id: u32, label: &str) -> bool {
    DATASETS.with(|slot| {
        let mut datasets = slot.borrow_mut();
        let mut found = false;
        for dataset in datasets.iter_mut() {
            if dataset.custom_id == Some(custom_id) {
                dataset.label = label.to_string();
                found = true;
            }
        }
        found
    })
}
