//! Preset catalog: named filter bundles offered for one-click application.
//!
//! The catalog is a best-effort enhancement. A failed fetch or parse leaves
//! it empty and the page degrades to "no presets" without raising.

use gloo_net::http::Request;
use log::warn;
use polcomp_explorer::Filterset;
use serde::Deserialize;

use crate::config;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Query-shaped payload carried by a preset. Missing fields fall back to
/// the form defaults when applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PresetFilterData {
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "min-date", default)]
    pub min_date: Option<String>,
    #[serde(rename = "max-date", default)]
    pub max_date: Option<String>,
    #[serde(default)]
    pub filtersets: Vec<Filterset>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preset {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub legend: Option<Vec<LegendEntry>>,
    #[serde(default)]
    pub filter_data: PresetFilterData,
}

impl Preset {
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// Legend entries: an explicit list wins, else one entry per filterset
    /// label/color pair.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        if let Some(legend) = &self.legend {
            return legend
                .iter()
                .filter(|e| !e.label.is_empty() && !e.color.is_empty())
                .cloned()
                .collect();
        }

        self.filter_data
            .filtersets
            .iter()
            .filter(|fs| !fs.label.is_empty() && !fs.color.is_empty())
            .map(|fs| LegendEntry {
                label: fs.label.clone(),
                color: fs.color.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PresetCatalog {
    #[serde(default)]
    pub presets: Vec<Preset>,
    /// Group id of the currently injected group presets, if any.
    #[serde(skip)]
    injected_group: Option<String>,
}

impl PresetCatalog {
    /// Fetch the static preset document. Any failure yields an empty catalog.
    pub async fn load() -> PresetCatalog {
        let response = match Request::get(config::PRESETS_URL)
            .header("Cache-Control", "no-store")
            .send()
            .await
        {
            Ok(resp) if resp.ok() => resp,
            Ok(resp) => {
                warn!("preset catalog fetch returned {}", resp.status());
                return PresetCatalog::default();
            }
            Err(err) => {
                warn!("preset catalog fetch failed: {}", err);
                return PresetCatalog::default();
            }
        };

        match response.json::<PresetCatalog>().await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!("preset catalog parse failed: {}", err);
                PresetCatalog::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.key == key)
    }

    /// Prepend the two synthesized group presets for `group_id`, replacing
    /// any previously injected pair. Repeated calls never accumulate
    /// duplicates.
    pub fn inject_group_presets(&mut self, group_id: &str) {
        self.presets.retain(|p| {
            p.key != config::GROUP_PRESET_KEY && p.key != config::GROUP_VS_ALL_PRESET_KEY
        });

        self.presets.insert(0, group_vs_all_preset(group_id));
        self.presets.insert(0, group_preset(group_id));
        self.injected_group = Some(group_id.to_string());
    }

    /// The preset selected on initial page load: an injected group preset
    /// when a group is active, else `all_users`, else the first available.
    pub fn default_key(&self) -> Option<&str> {
        if self.injected_group.is_some() {
            if let Some(preset) = self.get(config::GROUP_VS_ALL_PRESET_KEY) {
                return Some(&preset.key);
            }
        }
        if let Some(preset) = self.get(config::DEFAULT_PRESET_KEY) {
            return Some(&preset.key);
        }
        self.presets.first().map(|p| p.key.as_str())
    }
}

fn group_filterset(group_id: &str) -> Filterset {
    Filterset {
        label: "Group".to_string(),
        color: config::GROUP_COLOR.to_string(),
        group_ids: vec![group_id.to_string()],
        ..Filterset::default()
    }
}

fn group_preset(group_id: &str) -> Preset {
    Preset {
        key: config::GROUP_PRESET_KEY.to_string(),
        label: Some("Group".to_string()),
        description: Some("Everyone who took the survey through your group link.".to_string()),
        legend: None,
        filter_data: PresetFilterData {
            filtersets: vec![group_filterset(group_id)],
            ..PresetFilterData::default()
        },
    }
}

fn group_vs_all_preset(group_id: &str) -> Preset {
    Preset {
        key: config::GROUP_VS_ALL_PRESET_KEY.to_string(),
        label: Some("Group vs All Users".to_string()),
        description: Some("Your group compared against the full dataset.".to_string()),
        legend: None,
        filter_data: PresetFilterData {
            filtersets: vec![
                group_filterset(group_id),
                Filterset {
                    label: "All Users".to_string(),
                    color: config::BASELINE_COLOR.to_string(),
                    ..Filterset::default()
                },
            ],
            ..PresetFilterData::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP_ID: &str = "123e4567-e89b-42d3-a456-426614174000";

    fn catalog_with(keys: &[&str]) -> PresetCatalog {
        PresetCatalog {
            presets: keys
                .iter()
                .map(|k| Preset {
                    key: k.to_string(),
                    label: None,
                    description: None,
                    legend: None,
                    filter_data: PresetFilterData::default(),
                })
                .collect(),
            injected_group: None,
        }
    }

    #[test]
    fn group_injection_prepends_and_stays_idempotent() {
        let mut catalog = catalog_with(&["all_users", "voters"]);

        catalog.inject_group_presets(GROUP_ID);
        catalog.inject_group_presets(GROUP_ID);

        let keys: Vec<&str> = catalog.presets.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["group_only", "group_vs_all", "all_users", "voters"]
        );

        let vs_all = catalog.get("group_vs_all").unwrap();
        assert_eq!(vs_all.filter_data.filtersets.len(), 2);
        assert_eq!(
            vs_all.filter_data.filtersets[0].group_ids,
            vec![GROUP_ID.to_string()]
        );
        assert!(vs_all.filter_data.filtersets[1].group_ids.is_empty());
    }

    #[test]
    fn default_key_prefers_group_then_all_users_then_first() {
        let mut catalog = catalog_with(&["voters", "all_users"]);
        assert_eq!(catalog.default_key(), Some("all_users"));

        catalog.inject_group_presets(GROUP_ID);
        assert_eq!(catalog.default_key(), Some("group_vs_all"));

        let bare = catalog_with(&["voters"]);
        assert_eq!(bare.default_key(), Some("voters"));

        assert_eq!(PresetCatalog::default().default_key(), None);
    }

    #[test]
    fn legend_derives_from_filtersets_when_not_explicit() {
        let preset = Preset {
            key: "k".to_string(),
            label: None,
            description: None,
            legend: None,
            filter_data: PresetFilterData {
                filtersets: vec![
                    Filterset {
                        label: "A".to_string(),
                        color: "#93daf8".to_string(),
                        ..Filterset::default()
                    },
                    // No color: skipped in the derived legend.
                    Filterset {
                        label: "B".to_string(),
                        ..Filterset::default()
                    },
                ],
                ..PresetFilterData::default()
            },
        };

        let legend = preset.legend_entries();
        assert_eq!(legend.len(), 1);
        assert_eq!(legend[0].label, "A");
    }
}
