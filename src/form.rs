//! Filter form model.
//!
//! Each filterset region's controls are bundled into an explicit set of
//! node handles built once, replacing any implicit coupling between element
//! ids and logical indices. Reads pull current values out of the DOM with
//! the documented defaulting rules; writes are the exact inverse and are
//! used by preset application.

use polcomp_explorer::{
    coerce_age, default_label, is_valid_group_id, resolve_max_date, resolve_min_date, defaults,
    Filterset, FormError, MatchMode, Query, SortOrder,
};
use wasm_bindgen::JsCast;
use web_sys::{HtmlInputElement, HtmlOptionElement, HtmlSelectElement};
use yew::NodeRef;

use crate::store;
use crate::utils;

/// The six multi-valued demographic dimensions, in form order.
pub const SELECT_NAMES: [&str; 6] = [
    "country",
    "religion",
    "ethnicity",
    "education",
    "party",
    "identities",
];

/// Handles to one filterset region's controls.
#[derive(Clone, Default, PartialEq)]
pub struct FiltersetRefs {
    pub label: NodeRef,
    pub color: NodeRef,
    pub min_age: NodeRef,
    pub max_age: NodeRef,
    pub mode_any: NodeRef,
    pub mode_all: NodeRef,
    pub group: NodeRef,
    pub country: NodeRef,
    pub religion: NodeRef,
    pub ethnicity: NodeRef,
    pub education: NodeRef,
    pub party: NodeRef,
    pub identities: NodeRef,
}

impl FiltersetRefs {
    fn select(&self, name: &str) -> Option<HtmlSelectElement> {
        let node = match name {
            "country" => &self.country,
            "religion" => &self.religion,
            "ethnicity" => &self.ethnicity,
            "education" => &self.education,
            "party" => &self.party,
            "identities" => &self.identities,
            _ => return None,
        };
        node.cast::<HtmlSelectElement>()
    }
}

/// Handles to the shared query controls plus all four filterset regions.
#[derive(Clone, Default, PartialEq)]
pub struct FormRefs {
    pub filtersets: [FiltersetRefs; 4],
    pub min_date: NodeRef,
    pub max_date: NodeRef,
    pub limit: NodeRef,
    pub order_random: NodeRef,
    pub order_recent: NodeRef,
}

fn input_value(node: &NodeRef) -> Option<String> {
    node.cast::<HtmlInputElement>().map(|el| el.value())
}

fn selected_values(select: Option<HtmlSelectElement>) -> Vec<String> {
    // Missing control coerces to "no restriction", never null.
    let Some(select) = select else {
        return Vec::new();
    };

    let options = select.selected_options();
    let mut values = Vec::new();
    for i in 0..options.length() {
        if let Some(opt) = options
            .item(i)
            .and_then(|el| el.dyn_into::<HtmlOptionElement>().ok())
        {
            let value = opt.value();
            if !value.is_empty() {
                values.push(value);
            }
        }
    }
    values
}

/// Extract one filterset's current values. `index` is 1-based, matching the
/// on-page numbering; a blank label is replaced with its default and written
/// back into the field.
pub fn read_filterset(refs: &FiltersetRefs, index: usize) -> Result<Filterset, FormError> {
    let label_input = refs
        .label
        .cast::<HtmlInputElement>()
        .ok_or(FormError::MissingControls(index))?;

    let mut label = label_input.value();
    if label.trim().is_empty() {
        label = default_label(index);
        label_input.set_value(&label);
    }

    let color = input_value(&refs.color).unwrap_or_else(|| crate::config::GROUP_COLOR.to_string());

    let any_all = match refs.mode_all.cast::<HtmlInputElement>() {
        Some(radio) if radio.checked() => MatchMode::All,
        _ => MatchMode::Any,
    };

    let group_ids = match input_value(&refs.group) {
        None => Vec::new(),
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                Vec::new()
            } else if is_valid_group_id(&trimmed) {
                vec![trimmed]
            } else {
                return Err(FormError::InvalidGroupId(index));
            }
        }
    };

    Ok(Filterset {
        label,
        color,
        min_age: input_value(&refs.min_age).as_deref().and_then(|v| coerce_age(v)),
        max_age: input_value(&refs.max_age).as_deref().and_then(|v| coerce_age(v)),
        any_all,
        group_ids,
        country: selected_values(refs.select("country")),
        religion: selected_values(refs.select("religion")),
        ethnicity: selected_values(refs.select("ethnicity")),
        education: selected_values(refs.select("education")),
        party: selected_values(refs.select("party")),
        identities: selected_values(refs.select("identities")),
    })
}

/// Inverse of [`read_filterset`], used when a preset is applied.
pub fn write_filterset(refs: &FiltersetRefs, index: usize, filterset: &Filterset) {
    if let Some(el) = refs.label.cast::<HtmlInputElement>() {
        if filterset.label.trim().is_empty() {
            el.set_value(&default_label(index));
        } else {
            el.set_value(&filterset.label);
        }
    }
    if !filterset.color.is_empty() {
        if let Some(el) = refs.color.cast::<HtmlInputElement>() {
            el.set_value(&filterset.color);
        }
    }
    if let Some(el) = refs.min_age.cast::<HtmlInputElement>() {
        el.set_value(&filterset.min_age.map(|v| v.to_string()).unwrap_or_default());
    }
    if let Some(el) = refs.max_age.cast::<HtmlInputElement>() {
        el.set_value(&filterset.max_age.map(|v| v.to_string()).unwrap_or_default());
    }

    if let Some(radio) = refs.mode_any.cast::<HtmlInputElement>() {
        radio.set_checked(filterset.any_all == MatchMode::Any);
    }
    if let Some(radio) = refs.mode_all.cast::<HtmlInputElement>() {
        radio.set_checked(filterset.any_all == MatchMode::All);
    }

    if let Some(el) = refs.group.cast::<HtmlInputElement>() {
        el.set_value(filterset.group_ids.first().map(String::as_str).unwrap_or(""));
    }

    for name in SELECT_NAMES {
        let Some(select) = refs.select(name) else {
            continue;
        };
        let wanted: &[String] = match name {
            "country" => &filterset.country,
            "religion" => &filterset.religion,
            "ethnicity" => &filterset.ethnicity,
            "education" => &filterset.education,
            "party" => &filterset.party,
            "identities" => &filterset.identities,
            _ => &[],
        };

        let options = select.options();
        for i in 0..options.length() {
            if let Some(opt) = options
                .item(i)
                .and_then(|el| el.dyn_into::<HtmlOptionElement>().ok())
            {
                let selected = wanted.contains(&opt.value());
                opt.set_selected(selected);
            }
        }
    }
}

/// Write the shared date/sort/limit fields, used by preset application.
pub fn write_shared(form: &FormRefs, order: SortOrder, limit: u32, min_date: &str, max_date: &str) {
    if let Some(radio) = form.order_random.cast::<HtmlInputElement>() {
        radio.set_checked(order == SortOrder::Random);
    }
    if let Some(radio) = form.order_recent.cast::<HtmlInputElement>() {
        radio.set_checked(order == SortOrder::Recent);
    }
    if let Some(el) = form.limit.cast::<HtmlInputElement>() {
        el.set_value(&limit.to_string());
    }
    if let Some(el) = form.min_date.cast::<HtmlInputElement>() {
        el.set_value(min_date);
    }
    if let Some(el) = form.max_date.cast::<HtmlInputElement>() {
        el.set_value(max_date);
    }
}

/// The shared date/sort/limit fields as an envelope with no filtersets yet.
fn read_shared(form: &FormRefs) -> Query {
    let order = match form.order_recent.cast::<HtmlInputElement>() {
        Some(radio) if radio.checked() => SortOrder::Recent,
        _ => SortOrder::Random,
    };

    let limit = input_value(&form.limit)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(defaults::LIMIT);

    let min_date = resolve_min_date(&input_value(&form.min_date).unwrap_or_default());
    let max_date = resolve_max_date(
        &input_value(&form.max_date).unwrap_or_default(),
        &utils::today_iso(),
    );

    Query {
        order,
        limit,
        min_date,
        max_date,
        filtersets: Vec::new(),
    }
}

/// Aggregate the shared query fields and the first `active` filtersets into
/// a request envelope.
pub fn read_query(form: &FormRefs, active: usize) -> Result<Query, FormError> {
    let mut query = read_shared(form);
    for index in 1..=active {
        query
            .filtersets
            .push(read_filterset(&form.filtersets[index - 1], index)?);
    }
    Ok(query)
}

/// Single-filterset variant of [`read_query`] for the scoped count request.
pub fn read_scoped_query(form: &FormRefs, index: usize) -> Result<Query, FormError> {
    let mut query = read_shared(form);
    query
        .filtersets
        .push(read_filterset(&form.filtersets[index - 1], index)?);
    Ok(query)
}

/// All known party option values, read off the first filterset's select.
pub fn known_party_values(form: &FormRefs) -> Vec<String> {
    let Some(select) = form.filtersets[0].select("party") else {
        return Vec::new();
    };

    let options = select.options();
    let mut values = Vec::new();
    for i in 0..options.length() {
        if let Some(opt) = options
            .item(i)
            .and_then(|el| el.dyn_into::<HtmlOptionElement>().ok())
        {
            let value = opt.value();
            if !value.is_empty() && !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// Write one cohort's reported size into its badge. `index` is 1-based.
pub fn set_badge(index: usize, count: u64) {
    utils::set_inner_text(&format!("count_{}", index), &count.to_string());
}

pub fn zero_badge(index: usize) {
    utils::set_inner_text(&format!("count_{}", index), "0");
}

/// Refresh every badge from the current store snapshot. `custom_id` is the
/// stable cross-reference: badge index is `custom_id + 1`.
pub fn update_count_badges() {
    store::with(|datasets| {
        for dataset in datasets {
            if dataset.custom_dataset {
                if let Some(id) = dataset.custom_id {
                    set_badge(id as usize + 1, dataset.count);
                }
            }
        }
    });
}
