use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default query parameters applied when form fields are left blank.
pub mod defaults {
    pub const LIMIT: u32 = 1000;
    pub const MIN_DATE: &str = "2023-01-01";
}

/// Sentinel cohort name for the viewer's own single response. Exempt from
/// cross-cohort normalization everywhere.
pub const SELF_COHORT_NAME: &str = "your_results";

pub const MAX_FILTERSETS: usize = 4;

pub const QUESTION_MIN: u32 = 1;
pub const QUESTION_MAX: u32 = 100;

// ──────────────────────────────────────────────────────────────────────────────
// Axes

/// The eight ideological dimensions, each scored in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Society,
    Politics,
    Economics,
    State,
    Diplomacy,
    Government,
    Technology,
    Religion,
}

impl Axis {
    pub const ALL: [Axis; 8] = [
        Axis::Society,
        Axis::Politics,
        Axis::Economics,
        Axis::State,
        Axis::Diplomacy,
        Axis::Government,
        Axis::Technology,
        Axis::Religion,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Axis::Society => "society",
            Axis::Politics => "politics",
            Axis::Economics => "economics",
            Axis::State => "state",
            Axis::Diplomacy => "diplomacy",
            Axis::Government => "government",
            Axis::Technology => "technology",
            Axis::Religion => "religion",
        }
    }

    pub fn from_key(key: &str) -> Option<Axis> {
        Axis::ALL.iter().copied().find(|a| a.key() == key)
    }

    /// Axes whose raw sign is flipped before binning so that "higher" points
    /// the same ideological direction on every histogram.
    pub fn inverted(self) -> bool {
        matches!(
            self,
            Axis::Diplomacy | Axis::Government | Axis::Religion | Axis::Society
        )
    }

    /// Capitalized display name for pickers.
    pub fn title(self) -> &'static str {
        match self {
            Axis::Society => "Society",
            Axis::Politics => "Politics",
            Axis::Economics => "Economics",
            Axis::State => "State",
            Axis::Diplomacy => "Diplomacy",
            Axis::Government => "Government",
            Axis::Technology => "Technology",
            Axis::Religion => "Religion",
        }
    }

    /// Left/right pole captions shown beside the histogram.
    pub fn pole_labels(self) -> (&'static str, &'static str) {
        match self {
            Axis::Society => ("Progressivism", "Conservatism"),
            Axis::Politics => ("Radicalism", "Moderatism"),
            Axis::Economics => ("Socialism", "Capitalism"),
            Axis::State => ("Liberty", "Authority"),
            Axis::Diplomacy => ("Cosmopolitanism", "Nationalism"),
            Axis::Government => ("Democracy", "Autocracy"),
            Axis::Technology => ("Transhumanism", "Primitivism"),
            Axis::Religion => ("Secularism", "Theocracy"),
        }
    }
}

/// One respondent's scores on all eight axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub diplomacy: f64,
    pub economics: f64,
    pub government: f64,
    pub politics: f64,
    pub religion: f64,
    pub society: f64,
    pub state: f64,
    pub technology: f64,
}

impl ScoreRecord {
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Diplomacy => self.diplomacy,
            Axis::Economics => self.economics,
            Axis::Government => self.government,
            Axis::Politics => self.politics,
            Axis::Religion => self.religion,
            Axis::Society => self.society,
            Axis::State => self.state,
            Axis::Technology => self.technology,
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Query model

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Logical OR across the selected demographic categories.
    #[default]
    Any,
    /// Logical AND across the selected demographic categories.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Random,
    Recent,
}

/// One cohort's query definition, rebuilt fresh from the form on every
/// submission. Field names match the wire contract.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filterset {
    pub label: String,
    pub color: String,
    #[serde(rename = "min-age")]
    pub min_age: Option<u32>,
    #[serde(rename = "max-age")]
    pub max_age: Option<u32>,
    #[serde(rename = "any-all", default)]
    pub any_all: MatchMode,
    #[serde(rename = "group-ids", default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub country: Vec<String>,
    #[serde(default)]
    pub religion: Vec<String>,
    #[serde(default)]
    pub ethnicity: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub party: Vec<String>,
    #[serde(default)]
    pub identities: Vec<String>,
}

/// The global request envelope. Filterset order is significant: it determines
/// `custom_id` assignment on the response side (position - 1, zero-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub order: SortOrder,
    pub limit: u32,
    #[serde(rename = "min-date")]
    pub min_date: String,
    #[serde(rename = "max-date")]
    pub max_date: String,
    pub filtersets: Vec<Filterset>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Response model

/// One cohort of the aggregation response. Replaced wholesale on every
/// successful query; never patched except by the explicit recolor/relabel
/// operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortResult {
    #[serde(default)]
    pub custom_dataset: bool,
    #[serde(default)]
    pub custom_id: Option<u32>,
    pub name: String,
    pub label: String,
    pub color: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub all_scores: Vec<ScoreRecord>,
    #[serde(default)]
    pub mean_scores: Option<ScoreRecord>,
    /// question-id -> answer-label -> count. Absent for the viewer cohort,
    /// which carries `answer_counts` with 0/1 indicator semantics instead.
    #[serde(default)]
    pub raw_answer_counts: HashMap<String, HashMap<String, u64>>,
    #[serde(default)]
    pub answer_counts: HashMap<String, HashMap<String, u64>>,
    /// Explicit (opacity, radius) override; short-circuits the step table.
    #[serde(default)]
    pub point_props: Option<(f64, f64)>,
}

impl CohortResult {
    pub fn is_self(&self) -> bool {
        self.name == SELF_COHORT_NAME
    }

    /// Reported count, falling back to the raw sample length.
    pub fn sample_count(&self) -> usize {
        if self.count > 0 {
            self.count as usize
        } else {
            self.all_scores.len()
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Field coercion & validation

// Version nibble 1-5, variant nibble 8/9/a/b.
static GROUP_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$",
    )
    .expect("group id pattern compiles")
});

/// Whether a string is a syntactically valid v1-5 UUID usable as a group id.
pub fn is_valid_group_id(s: &str) -> bool {
    GROUP_ID_REGEX.is_match(s.trim())
}

/// Coerce a raw age field to an optional bound. Empty and `"0"` both mean
/// "unset": zero is not a valid bound and is indistinguishable from blank.
pub fn coerce_age(raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Fallback label for filterset `index` (1-based, as displayed).
pub fn default_label(index: usize) -> String {
    format!("Filterset {}", index)
}

pub fn clamp_filterset_count(n: usize) -> usize {
    n.clamp(1, MAX_FILTERSETS)
}

pub fn can_add_filterset(n: usize) -> bool {
    n < MAX_FILTERSETS
}

pub fn can_remove_filterset(n: usize) -> bool {
    n > 1
}

/// Resolve the max-date field: the special value `"today"` (or blank) reads
/// as the current date at read time.
pub fn resolve_max_date(raw: &str, today: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "today" {
        today.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn resolve_min_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        defaults::MIN_DATE.to_string()
    } else {
        trimmed.to_string()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Party token expansion

pub const VOTERS_TOKEN: &str = "__VOTERS__";

/// Literal party values excluded by the voters token.
pub const NON_VOTER_EXCLUSIONS: [&str; 4] = [
    "Other-I cannot vote",
    "Other-I do not vote",
    "Other-My party is not here",
    "Other-My country is not here",
];

/// Expand `__VOTERS__` in a preset party list into the full set of known
/// party option values minus the non-voter exclusions. Lists without the
/// token pass through untouched; duplicates are dropped.
pub fn expand_party_tokens(known_parties: &[String], party: &[String]) -> Vec<String> {
    if !party.iter().any(|p| p == VOTERS_TOKEN) {
        return party.to_vec();
    }

    let mut out = Vec::new();
    for value in known_parties {
        if value.is_empty() || NON_VOTER_EXCLUSIONS.contains(&value.as_str()) {
            continue;
        }
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

// ──────────────────────────────────────────────────────────────────────────────
// Colors

/// Convert a `#rgb`/`#rrggbb` hex color into an `rgba(...)` string with the
/// given alpha. Unparseable input falls back to a neutral gray so a bad color
/// never breaks a chart build.
pub fn add_transparency(color: &str, alpha: f64) -> String {
    let hex = color.trim().trim_start_matches('#');
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };

    let parsed = if expanded.len() == 6 {
        u32::from_str_radix(&expanded, 16).ok()
    } else {
        None
    };

    match parsed {
        Some(rgb) => format!(
            "rgba({}, {}, {}, {})",
            (rgb >> 16) & 0xff,
            (rgb >> 8) & 0xff,
            rgb & 0xff,
            alpha
        ),
        None => {
            warn!("unparseable color {:?}, using fallback", color);
            format!("rgba(175, 175, 175, {})", alpha)
        }
    }
}

/// Legacy chart-dataset lookup: label containment. Kept only as the fallback
/// path where no `dataset_id` is attached; must tolerate duplicate labels by
/// matching all of them.
pub fn label_matches(chart_label: &str, cohort_label: &str) -> bool {
    chart_label.contains(cohort_label)
}

// ──────────────────────────────────────────────────────────────────────────────
// Quadrant scatter datasets

/// Point (opacity, radius) as a step function of cohort sample size. Sparse
/// cohorts get big opaque points, dense ones small faint ones. An explicit
/// override pair on the cohort wins.
pub fn calc_point_props(point_props: Option<(f64, f64)>, count: usize) -> (f64, f64) {
    if let Some(props) = point_props {
        return props;
    }
    if count > 10000 {
        (0.30, 2.5)
    } else if count > 3300 {
        (0.325, 2.75)
    } else if count > 1000 {
        (0.35, 3.0)
    } else if count > 500 {
        (0.375, 3.25)
    } else if count > 250 {
        (0.4, 3.5)
    } else if count > 100 {
        (0.425, 3.75)
    } else if count > 5 {
        (0.45, 4.0)
    } else {
        (0.65, 5.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BorderWidth {
    pub bottom: u32,
    pub top: u32,
    pub left: u32,
    pub right: u32,
}

impl BorderWidth {
    fn standard() -> Self {
        BorderWidth {
            bottom: 0,
            top: 1,
            left: 1,
            right: 1,
        }
    }
}

/// One chart-dataset of a quadrant scatter chart, in wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterDataset {
    pub point_radius: f64,
    pub point_background_color: String,
    pub point_style: &'static str,
    pub point_border_width: f64,
    pub point_border_color: String,
    pub data: Vec<ScatterPoint>,
    pub label: String,
    /// Stable cross-reference back to the originating filterset control.
    #[serde(rename = "dataset_id")]
    pub dataset_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip_enabled: Option<bool>,
    pub border_width: BorderWidth,
}

const POINT_BORDER_COLOR: &str = "#262626";

fn raw_points(cohort: &CohortResult, x: Axis, y: Axis) -> Vec<ScatterPoint> {
    cohort
        .all_scores
        .iter()
        .map(|s| ScatterPoint {
            x: s.get(x),
            y: s.get(y),
        })
        .collect()
}

/// Build the full layered dataset list for one quadrant. Array order is
/// viewer cohort, then group mean markers, then every cohort's raw points
/// sorted by ascending sample count; the chart draws later entries
/// underneath, putting the raw clouds at the bottom and the viewer's own
/// point on top.
pub fn build_quadrant_datasets(cohorts: &[CohortResult], x: Axis, y: Axis) -> Vec<ScatterDataset> {
    let mut out = Vec::new();

    let mut others: Vec<&CohortResult> = cohorts.iter().filter(|c| !c.is_self()).collect();
    others.sort_by_key(|c| c.sample_count());

    let mut all_sorted: Vec<&CohortResult> = cohorts.iter().collect();
    all_sorted.sort_by_key(|c| c.sample_count());

    for cohort in cohorts.iter().filter(|c| c.is_self()) {
        let (transparency, radius) = calc_point_props(cohort.point_props, cohort.sample_count());
        out.push(ScatterDataset {
            point_radius: radius / 2.0,
            point_background_color: add_transparency(&cohort.color, transparency),
            point_style: "circle",
            point_border_width: radius / 4.0,
            point_border_color: add_transparency(POINT_BORDER_COLOR, transparency),
            data: raw_points(cohort, x, y),
            label: cohort.label.clone(),
            dataset_id: None,
            tooltip_enabled: None,
            border_width: BorderWidth::standard(),
        });
    }

    for cohort in &others {
        let count = cohort.sample_count();
        let (_, radius) = calc_point_props(cohort.point_props, count);

        if count > 1 {
            if let Some(mean) = &cohort.mean_scores {
                out.push(ScatterDataset {
                    point_radius: radius,
                    point_background_color: add_transparency(&cohort.color, 1.0),
                    point_style: "circle",
                    point_border_width: radius / 2.0,
                    point_border_color: add_transparency(POINT_BORDER_COLOR, 1.0),
                    data: vec![ScatterPoint {
                        x: mean.get(x),
                        y: mean.get(y),
                    }],
                    label: format!("{} Average", cohort.label),
                    dataset_id: if cohort.custom_dataset { cohort.custom_id } else { None },
                    tooltip_enabled: Some(false),
                    border_width: BorderWidth::standard(),
                });
            }
        }
    }

    // Raw clouds underneath everything, sparse cohorts over dense ones.
    for cohort in &all_sorted {
        let (transparency, radius) = calc_point_props(cohort.point_props, cohort.sample_count());
        out.push(ScatterDataset {
            point_radius: radius / 2.0,
            point_background_color: add_transparency(&cohort.color, transparency),
            point_style: "circle",
            point_border_width: radius / 4.0,
            point_border_color: add_transparency(POINT_BORDER_COLOR, transparency),
            data: raw_points(cohort, x, y),
            label: cohort.label.clone(),
            dataset_id: if cohort.custom_dataset { cohort.custom_id } else { None },
            tooltip_enabled: None,
            border_width: BorderWidth::standard(),
        });
    }

    out
}

// ──────────────────────────────────────────────────────────────────────────────
// Histogram

pub const HIST_BUCKETS: usize = 20;

/// One cohort's raw values on an axis, sign-flipped for inverted axes.
pub fn axis_values(cohort: &CohortResult, axis: Axis) -> Vec<f64> {
    let sign = if axis.inverted() { -1.0 } else { 1.0 };
    cohort.all_scores.iter().map(|s| sign * s.get(axis)).collect()
}

/// Bin values into 20 equal-width buckets over [-1, 1]. Buckets are
/// left-closed/right-open except the last, which also takes 1.0.
pub fn bin_values(values: &[f64]) -> [u32; HIST_BUCKETS] {
    let mut counts = [0u32; HIST_BUCKETS];
    for &v in values {
        let idx = (((v + 1.0) / 2.0) * HIST_BUCKETS as f64).floor() as isize;
        let idx = idx.clamp(0, HIST_BUCKETS as isize - 1) as usize;
        counts[idx] += 1;
    }
    counts
}

/// Within-cohort proportions; all zeros when the cohort is empty.
pub fn proportions(counts: &[u32]) -> Vec<f64> {
    let total: u32 = counts.iter().sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

/// Divide every non-self row by the largest non-self proportion so the
/// tallest comparison bar is height 1, leaving self rows at true scale.
/// When every non-self proportion is 0 the divisor defaults to 1.
pub fn scale_against_non_self_max(rows: &mut [(bool, Vec<f64>)]) {
    let max = rows
        .iter()
        .filter(|(is_self, _)| !is_self)
        .flat_map(|(_, props)| props.iter().copied())
        .fold(0.0_f64, f64::max);
    let denom = if max > 0.0 { max } else { 1.0 };

    for (is_self, props) in rows.iter_mut() {
        if !*is_self {
            for v in props.iter_mut() {
                *v /= denom;
            }
        }
    }
}

/// One bar chart-dataset (shared by histogram and answer distribution).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarDataset {
    pub label: String,
    pub border_width: u32,
    pub data: Vec<f64>,
    pub background_color: String,
}

/// Bucket edge labels followed by one normalized dataset per cohort.
pub fn build_histogram_datasets(
    cohorts: &[CohortResult],
    axis: Axis,
) -> (Vec<f64>, Vec<BarDataset>) {
    let labels: Vec<f64> = (0..=HIST_BUCKETS)
        .map(|i| -1.0 + i as f64 * (2.0 / HIST_BUCKETS as f64))
        .collect();

    let mut rows: Vec<(bool, Vec<f64>)> = cohorts
        .iter()
        .map(|c| (c.is_self(), proportions(&bin_values(&axis_values(c, axis)))))
        .collect();
    scale_against_non_self_max(&mut rows);

    let datasets = cohorts
        .iter()
        .zip(rows)
        .map(|(cohort, (_, data))| BarDataset {
            label: cohort.label.replace('_', " "),
            border_width: 1,
            data,
            background_color: cohort.color.clone(),
        })
        .collect();

    (labels, datasets)
}

// ──────────────────────────────────────────────────────────────────────────────
// Answer distribution

pub const ANSWER_ORDER: [&str; 5] = [
    "Strongly Disagree",
    "Disagree",
    "Neutral",
    "Agree",
    "Strongly Agree",
];

/// Raw per-answer counts for one cohort and question, in fixed answer order.
/// Prefers backend raw counts, falls back to the viewer cohort's indicator
/// counts, else zeros.
pub fn answer_counts_for(cohort: &CohortResult, question_id: u32) -> [u64; 5] {
    let key = question_id.to_string();
    let source = cohort
        .raw_answer_counts
        .get(&key)
        .or_else(|| cohort.answer_counts.get(&key));

    let mut counts = [0u64; 5];
    if let Some(map) = source {
        for (i, answer) in ANSWER_ORDER.iter().enumerate() {
            counts[i] = map.get(*answer).copied().unwrap_or(0);
        }
    }
    counts
}

/// Per-cohort answer proportions for one question, normalized with the same
/// self-exempt rule as the histogram.
pub fn build_pie_datasets(cohorts: &[CohortResult], question_id: u32) -> Vec<BarDataset> {
    let mut rows: Vec<(bool, Vec<f64>)> = cohorts
        .iter()
        .map(|c| {
            let counts = answer_counts_for(c, question_id);
            let counts_u32: Vec<u32> = counts
                .iter()
                .map(|&v| v.min(u32::MAX as u64) as u32)
                .collect();
            (c.is_self(), proportions(&counts_u32))
        })
        .collect();
    scale_against_non_self_max(&mut rows);

    cohorts
        .iter()
        .zip(rows)
        .map(|(cohort, (_, data))| BarDataset {
            label: cohort.label.clone(),
            border_width: 1,
            data,
            background_color: cohort.color.clone(),
        })
        .collect()
}

/// Cycle the selected question id through the fixed 1..=100 range.
pub fn step_question(current: u32, forward: bool) -> u32 {
    if forward {
        if current < QUESTION_MAX {
            current + 1
        } else {
            QUESTION_MIN
        }
    } else if current == QUESTION_MIN {
        QUESTION_MAX
    } else {
        current - 1
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Transport-edge decoding

/// Decode a JSON payload that may be double-encoded (a JSON string whose
/// contents are themselves JSON). Downstream code only ever sees the decoded
/// structure.
pub fn decode_json_loose(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if let serde_json::Value::String(inner) = &value {
        return serde_json::from_str(inner);
    }
    Ok(value)
}

/// Monotonic token distinguishing the current query from superseded ones.
/// A response whose token no longer matches must produce zero side effects.
#[derive(Debug, Default)]
pub struct Generation {
    current: u32,
}

impl Generation {
    pub fn begin(&mut self) -> u32 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    pub fn is_current(&self, token: u32) -> bool {
        self.current == token
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// CSV flattening

/// Flatten every cohort's raw score rows into CSV, one row per respondent
/// with a trailing 1-based dataset ordinal.
pub fn scores_csv(cohorts: &[CohortResult]) -> String {
    let mut lines = vec![
        "diplomacy,economics,government,politics,religion,society,state,technology,dataset"
            .to_string(),
    ];

    for (ordinal, cohort) in cohorts.iter().enumerate() {
        for s in &cohort.all_scores {
            lines.push(format!(
                "{},{},{},{},{},{},{},{},{}",
                s.diplomacy,
                s.economics,
                s.government,
                s.politics,
                s.religion,
                s.society,
                s.state,
                s.technology,
                ordinal + 1
            ));
        }
    }

    lines.join("\n")
}

// ──────────────────────────────────────────────────────────────────────────────

/// Error raised while reading the filter form, before any request is sent.
#[derive(Debug, PartialEq, Eq)]
pub enum FormError {
    /// The group field of filterset `index` (1-based) holds a non-UUID value.
    InvalidGroupId(usize),
    MissingControls(usize),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::InvalidGroupId(index) => write!(
                f,
                "Filterset {} has an invalid group ID; expected a UUID.",
                index
            ),
            FormError::MissingControls(index) => {
                write!(f, "Filterset {} controls are missing from the page.", index)
            }
        }
    }
}

impl std::error::Error for FormError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(name: &str, label: &str, color: &str, scores: Vec<ScoreRecord>) -> CohortResult {
        CohortResult {
            custom_dataset: false,
            custom_id: None,
            name: name.to_string(),
            label: label.to_string(),
            color: color.to_string(),
            count: scores.len() as u64,
            all_scores: scores,
            mean_scores: None,
            raw_answer_counts: HashMap::new(),
            answer_counts: HashMap::new(),
            point_props: None,
        }
    }

    fn score(v: f64) -> ScoreRecord {
        ScoreRecord {
            diplomacy: v,
            economics: v,
            government: v,
            politics: v,
            religion: v,
            society: v,
            state: v,
            technology: v,
        }
    }

    #[test]
    fn blank_and_zero_ages_are_unset() {
        assert_eq!(coerce_age(""), None);
        assert_eq!(coerce_age("   "), None);
        assert_eq!(coerce_age("0"), None);
        assert_eq!(coerce_age("abc"), None);
        assert_eq!(coerce_age("18"), Some(18));
        assert_eq!(coerce_age(" 65 "), Some(65));
    }

    #[test]
    fn group_id_validation_requires_version_and_variant_nibbles() {
        assert!(is_valid_group_id("123e4567-e89b-42d3-a456-426614174000"));
        assert!(is_valid_group_id("123E4567-E89B-12D3-B456-426614174000"));
        // Wrong variant nibble (c is outside 8/9/a/b).
        assert!(!is_valid_group_id("123e4567-e89b-42d3-c456-426614174000"));
        // Version nibble 0 is not a real UUID version.
        assert!(!is_valid_group_id("123e4567-e89b-02d3-a456-426614174000"));
        assert!(!is_valid_group_id(""));
        assert!(!is_valid_group_id("not-a-uuid"));
    }

    #[test]
    fn voters_token_expands_to_known_parties_minus_exclusions() {
        let known: Vec<String> = [
            "US-Democratic Party",
            "US-Republican Party",
            "Other-I cannot vote",
            "Other-I do not vote",
            "Other-My party is not here",
            "Other-My country is not here",
            "US-Democratic Party",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let expanded = expand_party_tokens(&known, &[VOTERS_TOKEN.to_string()]);
        assert_eq!(
            expanded,
            vec![
                "US-Democratic Party".to_string(),
                "US-Republican Party".to_string()
            ]
        );

        // Lists without the token pass through untouched.
        let plain = vec!["UK-Labour Party".to_string()];
        assert_eq!(expand_party_tokens(&known, &plain), plain);
    }

    #[test]
    fn binning_edges_are_left_closed_with_inclusive_top() {
        let counts = bin_values(&[-1.0, -0.95, 0.0, 0.999, 1.0]);
        assert_eq!(counts[0], 2);
        assert_eq!(counts[10], 1);
        assert_eq!(counts[19], 2);
        assert_eq!(counts.iter().sum::<u32>(), 5);
    }

    #[test]
    fn proportions_of_empty_cohort_are_zero() {
        assert_eq!(proportions(&[0, 0, 0]), vec![0.0, 0.0, 0.0]);
        assert_eq!(proportions(&[1, 1, 2]), vec![0.25, 0.25, 0.5]);
    }

    #[test]
    fn normalization_leaves_self_unscaled_and_caps_others_at_one() {
        let mut rows = vec![
            (true, vec![0.2, 0.8]),
            (false, vec![0.1, 0.4]),
            (false, vec![0.2, 0.1]),
        ];
        scale_against_non_self_max(&mut rows);

        assert_eq!(rows[0].1, vec![0.2, 0.8]);
        assert_eq!(rows[1].1, vec![0.25, 1.0]);
        assert!((rows[2].1[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn normalization_divisor_defaults_to_one_when_all_non_self_empty() {
        let mut rows = vec![(true, vec![0.5, 0.5]), (false, vec![0.0, 0.0])];
        scale_against_non_self_max(&mut rows);
        assert_eq!(rows[0].1, vec![0.5, 0.5]);
        assert_eq!(rows[1].1, vec![0.0, 0.0]);
    }

    #[test]
    fn inverted_axes_flip_sign_before_binning() {
        let c = cohort("cohort", "A", "#ff0000", vec![score(0.5)]);
        assert_eq!(axis_values(&c, Axis::Economics), vec![0.5]);
        assert_eq!(axis_values(&c, Axis::Society), vec![-0.5]);
        assert_eq!(axis_values(&c, Axis::Diplomacy), vec![-0.5]);
        assert_eq!(axis_values(&c, Axis::Government), vec![-0.5]);
        assert_eq!(axis_values(&c, Axis::Religion), vec![-0.5]);
    }

    #[test]
    fn point_props_step_table() {
        assert_eq!(calc_point_props(None, 20000), (0.30, 2.5));
        assert_eq!(calc_point_props(None, 5000), (0.325, 2.75));
        assert_eq!(calc_point_props(None, 2000), (0.35, 3.0));
        assert_eq!(calc_point_props(None, 600), (0.375, 3.25));
        assert_eq!(calc_point_props(None, 300), (0.4, 3.5));
        assert_eq!(calc_point_props(None, 150), (0.425, 3.75));
        assert_eq!(calc_point_props(None, 6), (0.45, 4.0));
        assert_eq!(calc_point_props(None, 1), (0.65, 5.0));
        // Explicit override wins regardless of count.
        assert_eq!(calc_point_props(Some((1.0, 8.0)), 20000), (1.0, 8.0));
    }

    #[test]
    fn quadrant_layering_puts_self_first_and_raw_clouds_last() {
        let mut own = cohort(SELF_COHORT_NAME, "Your Results", "#fa8072", vec![score(0.1)]);
        own.point_props = Some((1.0, 8.0));

        let mut big = cohort("filterset", "Everyone", "#93daf8", vec![score(0.2); 400]);
        big.custom_dataset = true;
        big.custom_id = Some(0);
        big.mean_scores = Some(score(0.2));

        let mut small = cohort("filterset", "Subset", "#c9e5bd", vec![score(-0.3); 10]);
        small.custom_dataset = true;
        small.custom_id = Some(1);
        small.mean_scores = Some(score(-0.3));

        let sets = build_quadrant_datasets(
            &[own.clone(), big.clone(), small.clone()],
            Axis::Society,
            Axis::Politics,
        );

        // self, two means (ascending count), three raw clouds (ascending count).
        assert_eq!(sets.len(), 6);
        assert_eq!(sets[0].label, "Your Results");
        assert_eq!(sets[0].point_radius, 4.0);
        assert_eq!(sets[1].label, "Subset Average");
        assert_eq!(sets[1].dataset_id, Some(1));
        assert_eq!(sets[1].tooltip_enabled, Some(false));
        assert_eq!(sets[2].label, "Everyone Average");
        assert_eq!(sets[3].label, "Your Results");
        assert_eq!(sets[4].label, "Subset");
        assert_eq!(sets[5].label, "Everyone");
        assert_eq!(sets[5].dataset_id, Some(0));

        // Mean markers sit at full opacity; raw clouds use the table alpha.
        assert_eq!(sets[2].point_background_color, "rgba(147, 218, 248, 1)");
        assert_eq!(sets[5].point_background_color, "rgba(147, 218, 248, 0.4)");
    }

    #[test]
    fn mean_markers_skipped_for_single_respondent_cohorts() {
        let mut solo = cohort("filterset", "Solo", "#93daf8", vec![score(0.2)]);
        solo.custom_dataset = true;
        solo.custom_id = Some(0);
        solo.mean_scores = Some(score(0.2));

        let sets = build_quadrant_datasets(&[solo], Axis::Economics, Axis::State);
        assert!(sets.iter().all(|d| !d.label.ends_with(" Average")));
    }

    #[test]
    fn histogram_datasets_scale_non_self_against_shared_max() {
        let own = cohort(SELF_COHORT_NAME, "Your Results", "#fa8072", vec![score(0.05)]);
        let other = cohort(
            "filterset",
            "Group_A",
            "#93daf8",
            vec![score(0.05), score(0.05), score(0.15), score(0.55)],
        );

        let (labels, sets) = build_histogram_datasets(&[own, other], Axis::Economics);
        assert_eq!(labels.len(), HIST_BUCKETS + 1);
        assert_eq!(labels[0], -1.0);
        assert_eq!(*labels.last().unwrap(), 1.0);

        // Underscores read as spaces in the legend.
        assert_eq!(sets[1].label, "Group A");
        // Self stays at true proportions.
        assert_eq!(sets[0].data[10], 1.0);
        // The other cohort's tallest bar is exactly 1 after scaling.
        let max = sets[1].data.iter().cloned().fold(0.0_f64, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn answer_counts_prefer_raw_then_indicator_then_zero() {
        let mut c = cohort("filterset", "A", "#93daf8", vec![]);
        c.raw_answer_counts.insert(
            "3".to_string(),
            [("Agree".to_string(), 5u64), ("Neutral".to_string(), 2u64)]
                .into_iter()
                .collect(),
        );
        assert_eq!(answer_counts_for(&c, 3), [0, 0, 2, 5, 0]);
        assert_eq!(answer_counts_for(&c, 4), [0, 0, 0, 0, 0]);

        let mut own = cohort(SELF_COHORT_NAME, "Your Results", "#fa8072", vec![]);
        own.answer_counts.insert(
            "3".to_string(),
            [("Strongly Agree".to_string(), 1u64)].into_iter().collect(),
        );
        assert_eq!(answer_counts_for(&own, 3), [0, 0, 0, 0, 1]);
    }

    #[test]
    fn pie_datasets_apply_self_exempt_scaling() {
        let mut own = cohort(SELF_COHORT_NAME, "Your Results", "#fa8072", vec![]);
        own.answer_counts.insert(
            "1".to_string(),
            [("Agree".to_string(), 1u64)].into_iter().collect(),
        );
        let mut other = cohort("filterset", "A", "#93daf8", vec![]);
        other.raw_answer_counts.insert(
            "1".to_string(),
            [("Agree".to_string(), 3u64), ("Disagree".to_string(), 1u64)]
                .into_iter()
                .collect(),
        );

        let sets = build_pie_datasets(&[own, other], 1);
        assert_eq!(sets[0].data[3], 1.0);
        assert_eq!(sets[1].data[3], 1.0);
        assert!((sets[1].data[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn question_cycling_wraps_at_both_ends() {
        assert_eq!(step_question(1, true), 2);
        assert_eq!(step_question(100, true), 1);
        assert_eq!(step_question(1, false), 100);
        assert_eq!(step_question(50, false), 49);
    }

    #[test]
    fn loose_decoding_handles_double_encoded_payloads() {
        let direct = decode_json_loose(r#"{"counts": [7]}"#).unwrap();
        assert_eq!(direct["counts"][0], 7);

        let nested = decode_json_loose(r#""{\"counts\": [7]}""#).unwrap();
        assert_eq!(nested["counts"][0], 7);

        assert!(decode_json_loose("not json").is_err());
    }

    #[test]
    fn generation_tokens_invalidate_superseded_queries() {
        let mut generation = Generation::default();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn filterset_count_boundaries() {
        assert_eq!(clamp_filterset_count(0), 1);
        assert_eq!(clamp_filterset_count(9), 4);
        assert!(can_add_filterset(1));
        assert!(!can_add_filterset(4));
        assert!(!can_remove_filterset(1));
        assert!(can_remove_filterset(2));
    }

    #[test]
    fn transparency_conversion_and_fallback() {
        assert_eq!(add_transparency("#ff0000", 0.5), "rgba(255, 0, 0, 0.5)");
        assert_eq!(add_transparency("#abc", 1.0), "rgba(170, 187, 204, 1)");
        assert_eq!(add_transparency("bogus", 0.5), "rgba(175, 175, 175, 0.5)");
    }

    #[test]
    fn query_serializes_with_wire_field_names() {
        let query = Query {
            order: SortOrder::Random,
            limit: 1000,
            min_date: "2023-01-01".to_string(),
            max_date: "2024-06-01".to_string(),
            filtersets: vec![Filterset {
                label: "A".to_string(),
                color: "#93daf8".to_string(),
                min_age: Some(18),
                ..Filterset::default()
            }],
        };

        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["order"], "random");
        assert_eq!(value["min-date"], "2023-01-01");
        assert_eq!(value["filtersets"][0]["min-age"], 18);
        assert_eq!(value["filtersets"][0]["any-all"], "any");
        assert!(value["filtersets"][0]["group-ids"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn cohort_results_parse_from_backend_shape() {
        let raw = r##"{
            "custom_dataset": true,
            "custom_id": 0,
            "name": "filterset",
            "label": "Everyone",
            "color": "#93daf8",
            "count": 2,
            "all_scores": [
                {"diplomacy": 0.1, "economics": 0.2, "government": 0.3, "politics": 0.4,
                 "religion": 0.5, "society": 0.6, "state": 0.7, "technology": 0.8}
            ],
            "mean_scores": {"diplomacy": 0.1, "economics": 0.2, "government": 0.3,
                "politics": 0.4, "religion": 0.5, "society": 0.6, "state": 0.7,
                "technology": 0.8},
            "raw_answer_counts": {"1": {"Agree": 2}}
        }"##;

        let parsed: CohortResult = serde_json::from_str(raw).unwrap();
        assert!(parsed.custom_dataset);
        assert_eq!(parsed.custom_id, Some(0));
        assert_eq!(parsed.sample_count(), 2);
        assert_eq!(answer_counts_for(&parsed, 1), [0, 0, 0, 2, 0]);

        let own = r#"{"name": "your_results", "label": "Your Results",
            "color": "salmon", "count": 1, "point_props": [1, 8], "all_scores": []}"#;
        let parsed: CohortResult = serde_json::from_str(own).unwrap();
        assert!(parsed.is_self());
        assert_eq!(parsed.point_props, Some((1.0, 8.0)));
    }

    #[test]
    fn csv_rows_carry_dataset_ordinals() {
        let a = cohort("filterset", "A", "#93daf8", vec![score(0.5)]);
        let b = cohort("filterset", "B", "#c9e5bd", vec![score(-0.25)]);
        let csv = scores_csv(&[a, b]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("diplomacy,"));
        assert!(lines[0].ends_with(",dataset"));
        assert!(lines[1].ends_with(",1"));
        assert!(lines[2].ends_with(",2"));
    }

    #[test]
    fn date_resolution_defaults() {
        assert_eq!(resolve_min_date(""), "2023-01-01");
        assert_eq!(resolve_min_date("2024-02-02"), "2024-02-02");
        assert_eq!(resolve_max_date("today", "2026-08-05"), "2026-08-05");
        assert_eq!(resolve_max_date("", "2026-08-05"), "2026-08-05");
        assert_eq!(resolve_max_date("2025-01-01", "2026-08-05"), "2025-01-01");
    }
}
