//! Post-hoc cohort edits: recolor and relabel.
//!
//! Both operate purely off the current dataset store snapshot plus the live
//! chart objects; neither re-queries the backend. The small charts are
//! rebuilt outright, the quadrants patched in place.

use crate::histogram;
use crate::pie;
use crate::polcomp;
use crate::store;

/// Recolor the cohort wired to filterset control `index` (1-based).
pub fn set_filterset_color(index: usize, new_color: &str) {
    let Some(custom_id) = custom_id_for(index) else {
        return;
    };

    // Quadrant datasets are still located under the cohort's current label.
    polcomp::apply_color(custom_id, new_color);
    store::set_color(custom_id, new_color);

    histogram::refresh();
    pie::refresh();
}

/// Relabel the cohort wired to filterset control `index` (1-based).
pub fn set_filterset_label(index: usize, new_label: &str) {
    let Some(custom_id) = custom_id_for(index) else {
        return;
    };

    polcomp::apply_label(custom_id, new_label);
    store::set_label(custom_id, new_label);

    histogram::refresh();
    pie::refresh();
}

/// Control index -> stable cohort id, present only when the last response
/// actually carried a cohort for this position.
fn custom_id_for(index: usize) -> Option<u32> {
    if index == 0 {
        return None;
    }
    let wanted = (index - 1) as u32;
    store::with(|datasets| {
        datasets
            .iter()
            .find(|d| d.custom_id == Some(wanted))
            .and_then(|d| d.custom_id)
    })
}
