//! Client-local cookie-consent flag.
//!
//! One stored value decides whether the consent banner shows. Storage
//! failures read as "no choice yet", so a blocked store just means the
//! banner reappears on the next visit.

use gloo_utils::window;
use web_sys::Storage;

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Accept,
    Reject,
}

fn storage() -> Option<Storage> {
    window().local_storage().ok().flatten()
}

/// The persisted choice, if a recognizable one exists.
pub fn stored_choice() -> Option<Choice> {
    let raw = storage()?.get_item(config::CONSENT_STORAGE_KEY).ok()??;
    match raw.as_str() {
        "accept" => Some(Choice::Accept),
        "reject" => Some(Choice::Reject),
        _ => None,
    }
}

pub fn store_choice(choice: Choice) {
    let value = match choice {
        Choice::Accept => "accept",
        Choice::Reject => "reject",
    };
    if let Some(storage) = storage() {
        let _ = storage.set_item(config::CONSENT_STORAGE_KEY, value);
    }
}
