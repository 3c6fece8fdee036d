//! Data-exploration page for the eight-axis compass survey, built with Yew.
//! Wires the filter form, preset catalog, query dispatcher, and the chart
//! renderers together.

use log::{debug, warn};
use polcomp_explorer::{
    can_add_filterset, can_remove_filterset, clamp_filterset_count, decode_json_loose, defaults,
    expand_party_tokens, resolve_max_date, resolve_min_date, Axis, CohortResult, SortOrder,
    MAX_FILTERSETS, QUESTION_MIN,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

mod api;
mod catalog;
mod chart;
mod config;
mod consent;
mod edits;
mod export;
mod form;
mod histogram;
mod pie;
mod polcomp;
mod presets;
mod store;
mod ui;
mod utils;

use catalog::Demographics;
use form::{FormRefs, SELECT_NAMES};
use presets::PresetCatalog;

// ──────────────────────────────────────────────────────────────────────────────
// Bootstrap helpers

/// Seed the dataset store from the page-embedded cohort list, when present.
/// This is how the viewer's own `your_results` cohort reaches the page;
/// garbage or absence just means an empty initial store.
fn bootstrap_embedded_datasets() {
    let Some(el) = utils::element_by_id("compass-data") else {
        return;
    };
    let Some(raw) = el.get_attribute("data-compass") else {
        return;
    };
    if raw.trim().is_empty() {
        return;
    }

    match decode_json_loose(&raw).and_then(serde_json::from_value::<Vec<CohortResult>>) {
        Ok(datasets) => {
            debug!("seeded {} embedded datasets", datasets.len());
            store::replace(datasets);
        }
        Err(err) => warn!("embedded dataset bootstrap failed: {}", err),
    }
}

// ──────────────────────────────────────────────────────────────────────────────

/// Primary application component wiring state, effects, and UI elements.
#[function_component(Main)]
fn main_component() -> Html {
    let num_filtersets = use_state(|| 1usize);
    let form_refs = use_state(FormRefs::default);

    // Catalogs; `None` means "still loading".
    let preset_catalog = use_state(|| None::<PresetCatalog>);
    let demographics = use_state(|| None::<Demographics>);
    let questions = use_state(|| None::<Vec<catalog::Question>>);

    let selected_preset = use_state(String::new);
    let preset_status = use_state(String::new);
    let default_applied = use_state(|| false);

    let consent_choice = use_state(consent::stored_choice);

    // --- Preset application ---
    let apply_preset = {
        let preset_catalog = preset_catalog.clone();
        let num_filtersets = num_filtersets.clone();
        let form_refs = form_refs.clone();
        let preset_status = preset_status.clone();
        Callback::from(move |(key, silent): (String, bool)| {
            let Some(cat) = (*preset_catalog).as_ref() else {
                return;
            };
            let Some(preset) = cat.get(&key) else {
                preset_status.set("Preset not found.".to_string());
                return;
            };
            let fd = &preset.filter_data;
            if fd.filtersets.is_empty() {
                preset_status.set("Preset has no filtersets.".to_string());
                return;
            }
            preset_status.set(String::new());

            let order = match fd.order.as_deref() {
                Some("recent") => SortOrder::Recent,
                _ => SortOrder::Random,
            };
            let limit = fd.limit.unwrap_or(defaults::LIMIT);
            let min_date = resolve_min_date(fd.min_date.as_deref().unwrap_or(""));
            let max_date = resolve_max_date(
                fd.max_date.as_deref().unwrap_or("today"),
                &utils::today_iso(),
            );
            form::write_shared(&form_refs, order, limit, &min_date, &max_date);

            let known_parties = form::known_party_values(&form_refs);
            let count = clamp_filterset_count(fd.filtersets.len());
            for index in (count + 1)..=MAX_FILTERSETS {
                form::zero_badge(index);
            }
            num_filtersets.set(count);

            for (i, filterset) in fd.filtersets.iter().take(count).enumerate() {
                let mut filterset = filterset.clone();
                filterset.party = expand_party_tokens(&known_parties, &filterset.party);
                form::write_filterset(&form_refs.filtersets[i], i + 1, &filterset);
            }

            // Round-trip through the form so applying twice is idempotent.
            match form::read_query(&form_refs, count) {
                Ok(query) => api::submit(query, silent),
                Err(err) => ui::show_error(&err.to_string()),
            }
        })
    };

    // --- Form-level callbacks ---
    let on_apply_filters = {
        let form_refs = form_refs.clone();
        let num_filtersets = num_filtersets.clone();
        Callback::from(move |_: MouseEvent| {
            match form::read_query(&form_refs, *num_filtersets) {
                Ok(query) => api::submit(query, false),
                Err(err) => ui::show_error(&err.to_string()),
            }
        })
    };

    let on_add_filterset = {
        let num_filtersets = num_filtersets.clone();
        Callback::from(move |_: MouseEvent| {
            if can_add_filterset(*num_filtersets) {
                num_filtersets.set(*num_filtersets + 1);
            }
        })
    };

    let on_remove_filterset = {
        let num_filtersets = num_filtersets.clone();
        Callback::from(move |_: MouseEvent| {
            if can_remove_filterset(*num_filtersets) {
                form::zero_badge(*num_filtersets);
                num_filtersets.set(*num_filtersets - 1);
            }
        })
    };

    let on_preset_change = {
        let selected_preset = selected_preset.clone();
        let preset_status = preset_status.clone();
        let apply_preset = apply_preset.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let key = select.value();
            preset_status.set(String::new());
            selected_preset.set(key.clone());
            if !key.is_empty() {
                apply_preset.emit((key, false));
            }
        })
    };

    let on_axis_change = Callback::from(|e: Event| {
        let select: HtmlSelectElement = e.target_unchecked_into();
        if let Some(axis) = Axis::from_key(&select.value()) {
            histogram::update(axis);
        }
    });

    let on_prev_question = Callback::from(|_: MouseEvent| pie::change_selected_question(false));
    let on_next_question = Callback::from(|_: MouseEvent| pie::change_selected_question(true));

    let on_export_csv = Callback::from(|_: MouseEvent| export::export_csv());
    let on_export_json = Callback::from(|_: MouseEvent| export::export_all_results());

    let on_consent = {
        let consent_choice = consent_choice.clone();
        Callback::from(move |choice: consent::Choice| {
            consent::store_choice(choice);
            consent_choice.set(Some(choice));
        })
    };

    // --- Mount: seed the store, build the charts, start the catalog loads ---
    {
        let preset_catalog = preset_catalog.clone();
        let demographics = demographics.clone();
        let questions = questions.clone();
        use_effect_with((), move |_| {
            bootstrap_embedded_datasets();
            polcomp::create_polcomp();
            histogram::create_histogram(histogram::selected_axis());
            pie::create_pie(QUESTION_MIN);
            form::update_count_badges();

            spawn_local(async move {
                let loaded = catalog::load_demographics().await;
                demographics.set(Some(loaded));
            });
            spawn_local(async move {
                let loaded = catalog::load_questions().await;
                questions.set(Some(loaded));
            });
            spawn_local(async move {
                let mut loaded = PresetCatalog::load().await;
                if let Some(group_id) = utils::page_group_id() {
                    loaded.inject_group_presets(&group_id);
                }
                preset_catalog.set(Some(loaded));
            });
        });
    }

    // Apply the default preset once both the preset catalog and the
    // demographic options are on the page, exactly once, silently.
    {
        let preset_catalog = preset_catalog.clone();
        let selected_preset = selected_preset.clone();
        let default_applied = default_applied.clone();
        let apply_preset = apply_preset.clone();
        use_effect_with(
            ((*preset_catalog).is_some(), (*demographics).is_some()),
            move |&(catalog_ready, demographics_ready)| {
                if catalog_ready && demographics_ready && !*default_applied {
                    default_applied.set(true);
                    let default_key = (*preset_catalog)
                        .as_ref()
                        .and_then(|c| c.default_key())
                        .map(str::to_string);
                    if let Some(key) = default_key {
                        selected_preset.set(key.clone());
                        apply_preset.emit((key, true));
                    }
                }
            },
        );
    }

    // Re-run the question-row highlight once the table rows exist.
    use_effect_with((*questions).clone(), |qs: &Option<Vec<catalog::Question>>| {
        if qs.as_ref().is_some_and(|qs| !qs.is_empty()) {
            pie::refresh();
        }
    });

    // --- Render ---
    let today = utils::today_iso();
    let demo = (*demographics).clone().unwrap_or_default();
    let preset_list = (*preset_catalog)
        .as_ref()
        .map(|c| c.presets.clone())
        .unwrap_or_default();
    let question_rows = (*questions).clone().unwrap_or_default();

    let preset_desc: Html = (*preset_catalog)
        .as_ref()
        .and_then(|c| c.get(&selected_preset))
        .map(|preset| {
            let legend = preset.legend_entries();
            html! {
                <div id="preset-desc" class="preset-desc">
                    { preset.description.clone().unwrap_or_default() }
                    if !legend.is_empty() {
                        <span class="preset-legend">
                            <span class="preset-legend-heading">{ "Key: " }</span>
                            { for legend.iter().enumerate().map(|(i, entry)| html! {
                                <>
                                    if i > 0 {
                                        <span class="preset-legend-sep">{ " vs " }</span>
                                    }
                                    <span style={format!("font-weight:700;color:{};", entry.color)}>
                                        { entry.label.clone() }
                                    </span>
                                </>
                            }) }
                        </span>
                    }
                </div>
            }
        })
        .unwrap_or_default();

    let form_refs_regions = form_refs.clone();

    html! {
        <div class="container">
            if (*consent_choice).is_none() {
                <div id="cookie-banner" class="cookie-banner">
                    <p>{ "This site uses a cookie to remember your survey session." }</p>
                    <button
                        id="cookie-accept"
                        onclick={on_consent.reform(|_: MouseEvent| consent::Choice::Accept)}
                    >
                        { "Accept" }
                    </button>
                    <button
                        id="cookie-reject"
                        onclick={on_consent.reform(|_: MouseEvent| consent::Choice::Reject)}
                    >
                        { "Reject" }
                    </button>
                </div>
            }

            <h1>{ "Data Explorer" }</h1>

            <section class="filters">
                <div class="preset-row">
                    <label for="preset-select">{ "Preset" }</label>
                    <select id="preset-select" onchange={on_preset_change}>
                        <option value="" selected={selected_preset.is_empty()}></option>
                        { for preset_list.iter().map(|preset| html! {
                            <option
                                value={preset.key.clone()}
                                selected={*selected_preset == preset.key}
                            >
                                { preset.display_label().to_string() }
                            </option>
                        }) }
                    </select>
                    <span id="preset-status" class="preset-status">
                        { (*preset_status).clone() }
                    </span>
                    { preset_desc }
                </div>

                <div class="shared-fields">
                    <fieldset class="sorting">
                        <legend>{ "Sample" }</legend>
                        <label>
                            <input
                                type="radio"
                                name="sorting"
                                value="random"
                                checked={true}
                                ref={form_refs.order_random.clone()}
                            />
                            { "Random" }
                        </label>
                        <label>
                            <input
                                type="radio"
                                name="sorting"
                                value="recent"
                                ref={form_refs.order_recent.clone()}
                            />
                            { "Most recent" }
                        </label>
                    </fieldset>
                    <label>
                        { "Sample size" }
                        <input
                            type="number"
                            name="sample-size"
                            min="1"
                            value="1000"
                            ref={form_refs.limit.clone()}
                        />
                    </label>
                    <label>
                        { "From" }
                        <input
                            type="date"
                            name="min-date"
                            value={defaults::MIN_DATE}
                            ref={form_refs.min_date.clone()}
                        />
                    </label>
                    <label>
                        { "To" }
                        <input
                            type="date"
                            name="max-date"
                            id="todays-date"
                            value={today.clone()}
                            max={today.clone()}
                            ref={form_refs.max_date.clone()}
                        />
                    </label>
                </div>

                <div class="filterset-grid">
                    { for (1..=MAX_FILTERSETS).map(|index| {
                        let refs = form_refs_regions.filtersets[index - 1].clone();
                        let visible = index <= *num_filtersets;

                        let on_label_change = Callback::from(move |e: Event| {
                            let input: HtmlInputElement = e.target_unchecked_into();
                            edits::set_filterset_label(index, &input.value());
                        });
                        let on_color_change = Callback::from(move |e: Event| {
                            let input: HtmlInputElement = e.target_unchecked_into();
                            edits::set_filterset_color(index, &input.value());
                        });
                        let on_refresh_count = {
                            let form_refs = form_refs_regions.clone();
                            Callback::from(move |_: MouseEvent| {
                                match form::read_scoped_query(&form_refs, index) {
                                    Ok(query) => api::submit_scoped(index, query),
                                    Err(err) => ui::show_error(&err.to_string()),
                                }
                            })
                        };

                        html! {
                            <div
                                id={format!("filterset{}", index)}
                                class={classes!("filterset", (!visible).then_some("hidden"))}
                            >
                                <div class="filterset-header">
                                    <input
                                        type="text"
                                        name="label"
                                        placeholder={format!("Filterset {}", index)}
                                        ref={refs.label.clone()}
                                        onchange={on_label_change}
                                    />
                                    <input
                                        type="color"
                                        id={format!("color_{}", index)}
                                        value={config::FILTERSET_COLORS[index - 1]}
                                        ref={refs.color.clone()}
                                        onchange={on_color_change}
                                    />
                                </div>
                                <div class="age-row">
                                    <label>
                                        { "Min age" }
                                        <input
                                            type="number"
                                            name="min-age"
                                            min="0"
                                            ref={refs.min_age.clone()}
                                        />
                                    </label>
                                    <label>
                                        { "Max age" }
                                        <input
                                            type="number"
                                            name="max-age"
                                            min="0"
                                            ref={refs.max_age.clone()}
                                        />
                                    </label>
                                </div>
                                <fieldset class="match-mode">
                                    <legend>{ "Match" }</legend>
                                    <label>
                                        <input
                                            type="radio"
                                            name={format!("any-all{}", index)}
                                            value="any"
                                            checked={true}
                                            ref={refs.mode_any.clone()}
                                        />
                                        { "Any" }
                                    </label>
                                    <label>
                                        <input
                                            type="radio"
                                            name={format!("any-all{}", index)}
                                            value="all"
                                            ref={refs.mode_all.clone()}
                                        />
                                        { "All" }
                                    </label>
                                </fieldset>
                                <label class="group-field">
                                    { "Group ID" }
                                    <input
                                        type="text"
                                        name="group"
                                        placeholder="UUID"
                                        ref={refs.group.clone()}
                                    />
                                </label>
                                { for SELECT_NAMES.iter().map(|name| {
                                    let select_ref = match *name {
                                        "country" => refs.country.clone(),
                                        "religion" => refs.religion.clone(),
                                        "ethnicity" => refs.ethnicity.clone(),
                                        "education" => refs.education.clone(),
                                        "party" => refs.party.clone(),
                                        _ => refs.identities.clone(),
                                    };
                                    html! {
                                        <label class="select-label">
                                            { *name }
                                            <select multiple={true} name={*name} ref={select_ref}>
                                                { for demo.options_for(name).into_iter().map(|value| html! {
                                                    <option value={value.clone()}>{ value }</option>
                                                }) }
                                            </select>
                                        </label>
                                    }
                                }) }
                                <div class="count-row">
                                    <span class="count-label">{ "Respondents: " }</span>
                                    <span id={format!("count_{}", index)}>{ "0" }</span>
                                    <a
                                        id={format!("count_refresh_{}", index)}
                                        class="count-refresh"
                                        onclick={on_refresh_count}
                                    >
                                        { "refresh " }
                                        <i
                                            id={format!("count_spinner_{}", index)}
                                            class="fa fa-rotate"
                                        ></i>
                                    </a>
                                </div>
                            </div>
                        }
                    }) }
                </div>

                <div class="filterset-controls">
                    <button
                        id="addfiltersetbtn"
                        class={classes!((!can_add_filterset(*num_filtersets)).then_some("disabled"))}
                        disabled={!can_add_filterset(*num_filtersets)}
                        onclick={on_add_filterset}
                    >
                        { "+ Add filterset" }
                    </button>
                    <button
                        id="rmfiltersetbtn"
                        class={classes!((!can_remove_filterset(*num_filtersets)).then_some("disabled"))}
                        disabled={!can_remove_filterset(*num_filtersets)}
                        onclick={on_remove_filterset}
                    >
                        { "− Remove filterset" }
                    </button>
                    <button id="applyfilters" class="apply" onclick={on_apply_filters}>
                        { "Apply Filters" }
                    </button>
                </div>
            </section>

            <section id="results-section" class="results">
                <div id="spinner" class="spinner" style="display:none">
                    <div class="loader"></div>
                </div>
                <div id="statusmsg" class="statusmsg" style="display:none"></div>

                <div id="polcomp" class="polcomp-grid">
                    { for polcomp::QUADRANTS.iter().map(|quadrant| html! {
                        <canvas id={quadrant.id}></canvas>
                    }) }
                </div>

                <div id="savebtns" class="savebtns">
                    <button id="exportcsv" onclick={on_export_csv}>{ "Export CSV" }</button>
                    <button id="exportjson" onclick={on_export_json}>{ "Export JSON" }</button>
                </div>

                <div class="histogram-block">
                    <select id="select-histogram" onchange={on_axis_change}>
                        { for Axis::ALL.iter().map(|axis| html! {
                            <option value={axis.key()} selected={*axis == Axis::Society}>
                                { axis.title() }
                            </option>
                        }) }
                    </select>
                    <div class="pole-labels">
                        <span id="hist-label-l"></span>
                        <span id="hist-label-r"></span>
                    </div>
                    <canvas id="histogram-canvas"></canvas>
                </div>

                <div class="pie-block">
                    <div class="question-nav">
                        <button onclick={on_prev_question}>{ "<" }</button>
                        <span id="question_text"></span>
                        <button onclick={on_next_question}>{ ">" }</button>
                    </div>
                    <canvas id="pie-canvas"></canvas>
                    <table id="questions-table">
                        <thead>
                            <tr>
                                <th>{ "#" }</th>
                                <th>{ "Question" }</th>
                            </tr>
                        </thead>
                        <tbody>
                            { for question_rows.iter().map(|question| {
                                let id = question.id;
                                let on_row = Callback::from(move |_: MouseEvent| {
                                    pie::select_question(id);
                                });
                                html! {
                                    <tr id={format!("qid_{}", id)} onclick={on_row}>
                                        <td>{ id }</td>
                                        <td>{ question.text.clone() }</td>
                                    </tr>
                                }
                            }) }
                        </tbody>
                    </table>
                </div>
            </section>
        </div>
    }
}

/// Entry point: panic hook, console logging, then the Yew renderer.
fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<Main>::new().render();
}
