//! Query dispatcher for the aggregation service.
//!
//! At most one main query is logically current at a time: starting a new one
//! aborts the previous in-flight request, and a superseded response is
//! recognized by its generation token and produces zero side effects. Scoped
//! count queries run in their own per-index critical sections and never
//! touch the dataset store.

use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use log::{debug, warn};
use polcomp_explorer::{decode_json_loose, CohortResult, Generation, Query, MAX_FILTERSETS};
use std::cell::RefCell;
use std::fmt;
use wasm_bindgen_futures::spawn_local;
use web_sys::AbortController;

use crate::config;
use crate::form;
use crate::histogram;
use crate::pie;
use crate::polcomp;
use crate::store;
use crate::ui;
use crate::utils;

const GENERIC_DATA_ERROR: &str = "Error loading data, try again.";
const GENERIC_COUNT_ERROR: &str = "Error loading count, try again.";

/// Failure modes of a dispatched request. Aborts are distinguished so the
/// dispatcher can suppress them silently.
#[derive(Debug)]
pub enum FetchError {
    Aborted,
    Transport(String),
    /// Server-side rejection; carries the user-facing message.
    Server(String),
    Parse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Aborted => write!(f, "request aborted"),
            FetchError::Transport(_) | FetchError::Parse(_) => write!(f, "{}", GENERIC_DATA_ERROR),
            FetchError::Server(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

thread_local! {
    static MAIN_GENERATION: RefCell<Generation> = RefCell::new(Generation::default());
    static INFLIGHT: RefCell<Option<AbortController>> = const { RefCell::new(None) };
    static COUNT_BUSY: RefCell<[bool; MAX_FILTERSETS]> = const { RefCell::new([false; MAX_FILTERSETS]) };
}

fn classify(err: gloo_net::Error) -> FetchError {
    match err {
        gloo_net::Error::JsError(js) if js.name == "AbortError" => FetchError::Aborted,
        other => FetchError::Transport(other.to_string()),
    }
}

/// Pull the server's `status` message out of an error body, if it has one.
fn extract_status(text: &str) -> Option<String> {
    let value = decode_json_loose(text).ok()?;
    value
        .get("status")
        .and_then(|s| s.as_str())
        .map(str::to_string)
}

async fn post_action(
    url: &str,
    action: &str,
    data: Option<&Query>,
    signal: Option<&web_sys::AbortSignal>,
    generic_error: &str,
) -> Result<serde_json::Value, FetchError> {
    let payload = match data {
        Some(query) => serde_json::json!({ "action": action, "data": query }),
        None => serde_json::json!({ "action": action }),
    };

    let request = Request::post(url)
        .abort_signal(signal)
        .json(&payload)
        .map_err(classify)?;

    let response = request.send().await.map_err(classify)?;
    let text = response.text().await.map_err(classify)?;

    if !response.ok() {
        let message = extract_status(&text).unwrap_or_else(|| generic_error.to_string());
        return Err(FetchError::Server(message));
    }

    decode_json_loose(&text).map_err(|e| FetchError::Parse(e.to_string()))
}

async fn post_apply_filters(
    query: &Query,
    signal: Option<&web_sys::AbortSignal>,
) -> Result<Vec<CohortResult>, FetchError> {
    let value = post_action(
        config::DATA_API_URL,
        "apply_filters",
        Some(query),
        signal,
        GENERIC_DATA_ERROR,
    )
    .await?;

    let datasets = value
        .get("compass_datasets")
        .cloned()
        .ok_or_else(|| FetchError::Parse("missing compass_datasets".to_string()))?;
    serde_json::from_value(datasets).map_err(|e| FetchError::Parse(e.to_string()))
}

async fn post_filterset_count(query: &Query) -> Result<u64, FetchError> {
    let value = post_action(
        config::COUNT_API_URL,
        "get_filterset_count",
        Some(query),
        None,
        GENERIC_COUNT_ERROR,
    )
    .await?;

    value
        .get("counts")
        .and_then(|c| c.get(0))
        .and_then(|c| c.as_u64())
        .ok_or_else(|| FetchError::Parse("missing counts".to_string()))
}

/// Full-dataset blob for the JSON export button.
pub async fn fetch_all_results() -> Result<serde_json::Value, FetchError> {
    let value = post_action(
        config::DATA_API_URL,
        "get_all_results",
        None,
        None,
        GENERIC_DATA_ERROR,
    )
    .await?;

    value
        .get("all_results")
        .cloned()
        .ok_or_else(|| FetchError::Parse("missing all_results".to_string()))
}

/// Dispatch the main multi-cohort query.
///
/// Cancels any in-flight predecessor, keeps the loading indicator visible
/// for a minimum window, and on success swaps the dataset store wholesale
/// and re-derives every chart. `silent` skips the scroll to the results
/// section (initial-page-load preset application).
pub fn submit(query: Query, silent: bool) {
    if !silent {
        ui::scroll_to("results-section");
    }
    ui::show_spinner();

    // Supersede: bump the generation and abort the previous request. Its
    // eventual callback will fail both guards below.
    let token = MAIN_GENERATION.with(|g| g.borrow_mut().begin());
    INFLIGHT.with(|slot| {
        if let Some(previous) = slot.borrow_mut().take() {
            debug!("aborting superseded query");
            previous.abort();
        }
    });

    let controller = AbortController::new().ok();
    if let Some(ctrl) = &controller {
        INFLIGHT.with(|slot| {
            *slot.borrow_mut() = Some(ctrl.clone());
        });
    }

    spawn_local(async move {
        let signal = controller.as_ref().map(|c| c.signal());
        let result = post_apply_filters(&query, signal.as_ref()).await;

        // Keep fast responses from flashing the indicator imperceptibly.
        TimeoutFuture::new(utils::jittered_delay_ms(
            config::SPINNER_MIN_MS,
            config::SPINNER_JITTER_MS,
        ))
        .await;

        if !MAIN_GENERATION.with(|g| g.borrow().is_current(token)) {
            debug!("dropping superseded query response");
            return;
        }
        INFLIGHT.with(|slot| {
            slot.borrow_mut().take();
        });

        match result {
            Ok(datasets) => {
                store::replace(datasets);
                polcomp::update_chart_data();
                histogram::refresh();
                pie::refresh();
                form::update_count_badges();
                ui::hide_spinner();
                // The canvases were display:none; force a size recompute.
                polcomp::resize_all();
            }
            Err(FetchError::Aborted) => {
                // A newer query owns the UI now; stay silent.
            }
            Err(err) => {
                warn!("query failed: {:?}", err);
                ui::show_error(&err.to_string());
            }
        }
    });
}

/// Re-query a single filterset's count without touching the dataset store.
/// Busy-guarded per index so concurrent refreshes of different badges (or a
/// main query) never interfere.
pub fn submit_scoped(index: usize, query: Query) {
    if index == 0 || index > MAX_FILTERSETS {
        return;
    }
    let already_busy = COUNT_BUSY.with(|busy| {
        let mut busy = busy.borrow_mut();
        std::mem::replace(&mut busy[index - 1], true)
    });
    if already_busy {
        return;
    }

    ui::set_count_busy(index, true);

    spawn_local(async move {
        let result = post_filterset_count(&query).await;

        COUNT_BUSY.with(|busy| busy.borrow_mut()[index - 1] = false);
        ui::set_count_busy(index, false);

        match result {
            Ok(count) => form::set_badge(index, count),
            Err(err) => {
                warn!("count query failed: {:?}", err);
                let message = match &err {
                    FetchError::Server(msg) => msg.clone(),
                    _ => GENERIC_COUNT_ERROR.to_string(),
                };
                ui::show_error(&message);
            }
        }
    });
}
