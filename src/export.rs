//! Data export buttons: a client-side CSV flatten of the current dataset
//! store and the server's full-data JSON blob. Downloads go through a Blob
//! object URL on a temporary anchor.

use gloo_timers::future::TimeoutFuture;
use gloo_utils::document;
use log::warn;
use polcomp_explorer::scores_csv;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use crate::api;
use crate::config;
use crate::store;
use crate::ui;
use crate::utils;

const CSV_BUTTON: &str = "exportcsv";
const JSON_BUTTON: &str = "exportjson";
const CSV_FILENAME: &str = "compass-data.csv";
const JSON_FILENAME: &str = "compass-data.json";

fn download_text(filename: &str, mime: &str, text: &str) {
    let parts = js_sys::Array::of1(&JsValue::from_str(text));
    let options = BlobPropertyBag::new();
    options.set_type(mime);

    let Ok(blob) = Blob::new_with_str_sequence_and_options(&parts, &options) else {
        warn!("export blob construction failed");
        return;
    };
    let Ok(url) = Url::create_object_url_with_blob(&blob) else {
        warn!("export object url construction failed");
        return;
    };

    let anchor = document()
        .create_element("a")
        .ok()
        .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok());
    if let Some(anchor) = anchor {
        anchor.set_href(&url);
        anchor.set_download(filename);
        let _ = anchor.style().set_property("display", "none");
        if let Some(body) = document().body() {
            let _ = body.append_child(&anchor);
        }
        anchor.click();
        anchor.remove();
    }
    let _ = Url::revoke_object_url(&url);
}

/// Flatten the current store to CSV and download it. The button stays
/// disabled for a short randomized window while the file is prepared.
pub fn export_csv() {
    ui::set_disabled(CSV_BUTTON, true);
    spawn_local(async move {
        TimeoutFuture::new(utils::jittered_delay_ms(
            config::EXPORT_MIN_MS,
            config::EXPORT_JITTER_MS,
        ))
        .await;

        let csv = store::with(scores_csv);
        download_text(CSV_FILENAME, "text/csv;charset=utf-8", &csv);
        ui::set_disabled(CSV_BUTTON, false);
    });
}

/// Fetch the full-data blob from the backend and download it as JSON.
pub fn export_all_results() {
    ui::set_disabled(JSON_BUTTON, true);
    spawn_local(async move {
        let result = api::fetch_all_results().await;
        match result {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => download_text(JSON_FILENAME, "application/json", &text),
                Err(err) => warn!("full-data export encode failed: {}", err),
            },
            Err(err) => {
                warn!("full-data export failed: {:?}", err);
                ui::show_error(&err.to_string());
            }
        }
        ui::set_disabled(JSON_BUTTON, false);
    });
}
