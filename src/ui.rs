//! Imperative show/hide toggles around the results area.
//!
//! Every function here no-ops when its target element is absent, since
//! partial page states share these scripts.

use crate::utils::{element_by_id, html_element_by_id};

fn set_display(id: &str, value: &str) {
    if let Some(el) = html_element_by_id(id) {
        let _ = el.style().set_property("display", value);
    }
}

pub fn set_disabled(id: &str, disabled: bool) {
    if let Some(el) = element_by_id(id) {
        if disabled {
            let _ = el.class_list().add_1("disabled");
            let _ = el.set_attribute("disabled", "disabled");
        } else {
            let _ = el.class_list().remove_1("disabled");
            let _ = el.remove_attribute("disabled");
        }
    }
}

/// Hide the charts, show the loading indicator, and lock the apply button.
pub fn show_spinner() {
    set_display("polcomp", "none");
    set_display("savebtns", "none");

    if let Some(spinner) = html_element_by_id("spinner") {
        let _ = spinner.style().set_property("display", "flex");
        let _ = spinner.style().set_property("visibility", "visible");
    }
    if let Some(status) = html_element_by_id("statusmsg") {
        let _ = status.style().set_property("display", "flex");
        status.set_inner_text("Loading...");
        let _ = status.style().set_property("color", "transparent");
    }

    set_disabled("applyfilters", true);
}

/// Restore the charts and re-enable the apply button. The caller resizes the
/// charts afterwards: they were hidden and need to recompute their size.
pub fn hide_spinner() {
    set_display("polcomp", "flex");
    set_display("savebtns", "flex");
    set_display("spinner", "none");
    set_display("statusmsg", "none");
    set_disabled("applyfilters", false);
}

/// Surface a query failure inline and hand the form back to the user.
pub fn show_error(message: &str) {
    if let Some(spinner) = html_element_by_id("spinner") {
        let _ = spinner.style().set_property("visibility", "hidden");
    }
    if let Some(status) = html_element_by_id("statusmsg") {
        status.set_inner_text(message);
        let _ = status.style().set_property("color", "salmon");
    }
    set_disabled("applyfilters", false);
}

pub fn scroll_to(id: &str) {
    if let Some(el) = element_by_id(id) {
        el.scroll_into_view();
    }
}

/// Busy affordance around one filterset's count refresh.
pub fn set_count_busy(index: usize, busy: bool) {
    if let Some(spinner) = element_by_id(&format!("count_spinner_{}", index)) {
        if busy {
            let _ = spinner.class_list().add_1("spin-fa-icon");
        } else {
            let _ = spinner.class_list().remove_1("spin-fa-icon");
        }
    }
    if let Some(link) = element_by_id(&format!("count_refresh_{}", index)) {
        if busy {
            let _ = link.class_list().add_1("disabled-text");
        } else {
            let _ = link.class_list().remove_1("disabled-text");
        }
    }
}
