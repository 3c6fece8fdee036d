//! Static demographic-option and question catalogs.
//!
//! Both are best-effort enhancements like the preset catalog: a failed
//! fetch or parse leaves the selects empty and the question table blank,
//! and the rest of the page keeps working.

use gloo_net::http::Request;
use log::warn;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::config;

/// Option values for the six demographic multi-selects. Parties come keyed
/// by country and are flattened to `"{country}-{party}"` option values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub country: Vec<String>,
    #[serde(default)]
    pub religion: Vec<String>,
    #[serde(default)]
    pub ethnicity: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub identities: Vec<String>,
    #[serde(default)]
    pub parties: BTreeMap<String, Vec<String>>,
}

impl Demographics {
    /// Flattened party option values, duplicates dropped.
    pub fn party_options(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (country, parties) in &self.parties {
            for party in parties {
                let value = format!("{}-{}", country, party);
                if !out.contains(&value) {
                    out.push(value);
                }
            }
        }
        out
    }

    /// Option values for one select, by its form control name.
    pub fn options_for(&self, name: &str) -> Vec<String> {
        match name {
            "country" => self.country.clone(),
            "religion" => self.religion.clone(),
            "ethnicity" => self.ethnicity.clone(),
            "education" => self.education.clone(),
            "identities" => self.identities.clone(),
            "party" => self.party_options(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct QuestionCatalog {
    #[serde(default)]
    questions: Vec<Question>,
}

async fn fetch_json<T: for<'de> Deserialize<'de> + Default>(url: &str, what: &str) -> T {
    let response = match Request::get(url)
        .header("Cache-Control", "no-store")
        .send()
        .await
    {
        Ok(resp) if resp.ok() => resp,
        Ok(resp) => {
            warn!("{} fetch returned {}", what, resp.status());
            return T::default();
        }
        Err(err) => {
            warn!("{} fetch failed: {}", what, err);
            return T::default();
        }
    };

    match response.json::<T>().await {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("{} parse failed: {}", what, err);
            T::default()
        }
    }
}

pub async fn load_demographics() -> Demographics {
    fetch_json(config::DEMOGRAPHICS_URL, "demographics catalog").await
}

pub async fn load_questions() -> Vec<Question> {
    fetch_json::<QuestionCatalog>(config::QUESTIONS_URL, "question catalog")
        .await
        .questions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_options_flatten_by_country_without_duplicates() {
        let raw = r#"{
            "country": ["US", "UK"],
            "parties": {
                "UK": ["Labour Party", "Conservative Party"],
                "US": ["Democratic Party", "Democratic Party"]
            }
        }"#;

        let demo: Demographics = serde_json::from_str(raw).unwrap();
        assert_eq!(
            demo.party_options(),
            vec![
                "UK-Labour Party".to_string(),
                "UK-Conservative Party".to_string(),
                "US-Democratic Party".to_string()
            ]
        );
        assert_eq!(demo.options_for("country"), vec!["US", "UK"]);
        assert!(demo.options_for("religion").is_empty());
        assert!(demo.options_for("bogus").is_empty());
    }

    #[test]
    fn question_catalog_parses_with_missing_fields_defaulted() {
        let raw = r#"{"questions": [{"id": 1, "text": "Taxes should be higher."}]}"#;
        let catalog: QuestionCatalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.questions.len(), 1);
        assert_eq!(catalog.questions[0].id, 1);

        let empty: QuestionCatalog = serde_json::from_str("{}").unwrap();
        assert!(empty.questions.is_empty());
    }
}
