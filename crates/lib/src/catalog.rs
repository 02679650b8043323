//! Provider/model catalog from the backend's GET /api/models payload.
//!
//! The model dropdowns depend on the selected provider, so every write of a
//! provider value goes through `clamp_llm`/`clamp_emb` to keep the dependent
//! model inside that provider's list.

use std::collections::HashMap;

use crate::api::ProviderSupport;

const NO_INTRO: &str = "No introduction available for this provider.";

/// Lookup of provider names to their LLM/embedding model lists and intro text.
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
    providers: Vec<String>,
    llm_models: HashMap<String, Vec<String>>,
    emb_models: HashMap<String, Vec<String>>,
    intros: HashMap<String, String>,
}

impl ProviderCatalog {
    pub fn from_support(support: &[ProviderSupport]) -> Self {
        let mut catalog = Self::default();
        for entry in support {
            if catalog.providers.iter().any(|p| p == &entry.provider) {
                continue;
            }
            catalog.providers.push(entry.provider.clone());
            catalog
                .llm_models
                .insert(entry.provider.clone(), entry.llm_model.clone());
            catalog
                .emb_models
                .insert(entry.provider.clone(), entry.emb_model.clone());
            if let Some(ref intro) = entry.prov_intro {
                if !intro.trim().is_empty() {
                    catalog.intros.insert(entry.provider.clone(), intro.clone());
                }
            }
        }
        catalog
    }

    /// Provider names in catalog order.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn llm_models_for(&self, provider: &str) -> &[String] {
        self.llm_models.get(provider).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn emb_models_for(&self, provider: &str) -> &[String] {
        self.emb_models.get(provider).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Intro text for a provider, with a fallback when none is published.
    pub fn intro_for(&self, provider: &str) -> &str {
        self.intros.get(provider).map(|s| s.as_str()).unwrap_or(NO_INTRO)
    }

    /// Keep `current` if the provider's LLM list contains it, otherwise fall
    /// back to the list head. Empty list => empty selection.
    pub fn clamp_llm(&self, provider: &str, current: &str) -> String {
        Self::clamp(self.llm_models_for(provider), current)
    }

    /// Embedding-model counterpart of `clamp_llm`.
    pub fn clamp_emb(&self, provider: &str, current: &str) -> String {
        Self::clamp(self.emb_models_for(provider), current)
    }

    fn clamp(models: &[String], current: &str) -> String {
        if !current.is_empty() && models.iter().any(|m| m == current) {
            return current.to_string();
        }
        models.first().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProviderCatalog {
        ProviderCatalog::from_support(&[
            ProviderSupport {
                provider: "A".to_string(),
                llm_model: vec!["m1".to_string(), "m2".to_string()],
                emb_model: vec!["e1".to_string()],
                prov_intro: Some("Provider A".to_string()),
            },
            ProviderSupport {
                provider: "B".to_string(),
                llm_model: vec!["n1".to_string()],
                emb_model: vec![],
                prov_intro: None,
            },
        ])
    }

    #[test]
    fn providers_keep_catalog_order() {
        let catalog = sample();
        assert_eq!(catalog.providers(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn clamp_keeps_value_in_list() {
        let catalog = sample();
        assert_eq!(catalog.clamp_llm("A", "m2"), "m2");
    }

    #[test]
    fn clamp_falls_back_to_list_head() {
        let catalog = sample();
        // "m1" belongs to A, not B: a provider switch re-derives the model.
        assert_eq!(catalog.clamp_llm("B", "m1"), "n1");
    }

    #[test]
    fn clamp_empty_list_yields_empty_selection() {
        let catalog = sample();
        assert_eq!(catalog.clamp_emb("B", "e1"), "");
    }

    #[test]
    fn intro_fallback_when_missing() {
        let catalog = sample();
        assert_eq!(catalog.intro_for("A"), "Provider A");
        assert_eq!(catalog.intro_for("B"), NO_INTRO);
        assert_eq!(catalog.intro_for("unknown"), NO_INTRO);
    }

    #[test]
    fn duplicate_provider_entries_first_wins() {
        let catalog = ProviderCatalog::from_support(&[
            ProviderSupport {
                provider: "A".to_string(),
                llm_model: vec!["m1".to_string()],
                emb_model: vec![],
                prov_intro: None,
            },
            ProviderSupport {
                provider: "A".to_string(),
                llm_model: vec!["other".to_string()],
                emb_model: vec![],
                prov_intro: None,
            },
        ]);
        assert_eq!(catalog.providers().len(), 1);
        assert_eq!(catalog.llm_models_for("A"), &["m1".to_string()]);
    }
}
