//! Application-level configuration constants.

// Endpoints
pub const DATA_API_URL: &str = "/api/data";
pub const COUNT_API_URL: &str = "/api/get_filterset_count";
pub const PRESETS_URL: &str = "/static/data/samples/filtersets.json";
pub const DEMOGRAPHICS_URL: &str = "/static/data/demographics/demographics.json";
pub const QUESTIONS_URL: &str = "/static/data/questions/questions.json";

// Loading indicator stays visible at least this long so fast responses do
// not flash it imperceptibly.
pub const SPINNER_MIN_MS: u32 = 500;
pub const SPINNER_JITTER_MS: u32 = 250;

// Export buttons stay disabled briefly while the download is prepared.
pub const EXPORT_MIN_MS: u32 = 500;
pub const EXPORT_JITTER_MS: u32 = 1500;

// Preset keys
pub const DEFAULT_PRESET_KEY: &str = "all_users";
pub const GROUP_PRESET_KEY: &str = "group_only";
pub const GROUP_VS_ALL_PRESET_KEY: &str = "group_vs_all";

// Default colors for injected group presets.
pub const GROUP_COLOR: &str = "#93daf8";
pub const BASELINE_COLOR: &str = "#afafaf";

// Initial color-picker values, one per filterset region.
pub const FILTERSET_COLORS: [&str; 4] = ["#93daf8", "#c9e5bd", "#f5b7b1", "#d7bde2"];

// Client-local persisted cookie-consent choice.
pub const CONSENT_STORAGE_KEY: &str = "polcomp_cookie_consent_v1";
