// Model router: decides which model name and which upstream a request is sent to
//
// Resolution is a fixed list of stages run once each, in order. A stage sees the current
// candidate name and either substitutes it or passes. Nothing is re-resolved, so a rule
// whose target is another rule's source is never chained.

pub mod origin;
pub mod registry;
pub mod stages;

pub use origin::RequestOrigin;
pub use registry::ProviderFamily;
pub use stages::{
    AmpDefaultModelStage, AmpMappingStage, GeneralMappingStage, ProviderAliasStage,
    ResolverStage, StageContext, Substitution,
};

use serde::Serialize;

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("model '{model}' is not allowed: no model mapping matches it")]
    ModelNotAllowed { model: String },

    #[error("model name must not be empty")]
    EmptyModel,
}

impl ResolveError {
    /// Stable machine-readable code, used in the `{"error": {...}}` body
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelNotAllowed { .. } => "model_not_allowed",
            Self::EmptyModel => "invalid_request",
        }
    }
}

/// Upstream a resolved request is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderRef {
    /// Entry in `claudeApiKeys`, by position
    ClaudeApiKey {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
    /// Entry in `ampOpenaiProviders`, by id
    #[serde(rename = "amp_openai")]
    AmpOpenAI { id: String, name: String },
    /// Local Copilot bridge
    Copilot { base_url: String },
    /// No credential was bound; whichever provider naturally serves the model
    Registry { provider: ProviderFamily },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedStage {
    pub stage: &'static str,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub requested: String,
    pub model: String,
    pub provider: ProviderRef,
    /// Stages that matched, in the order they ran
    pub applied: Vec<AppliedStage>,
}

impl Resolution {
    pub fn is_passthrough(&self) -> bool {
        self.applied.is_empty()
    }
}

pub struct ModelRouter {
    stages: Vec<Box<dyn ResolverStage>>,
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::standard()
    }
}

impl ModelRouter {
    /// Amp mapping, Amp default model, general mapping, then provider alias
    pub fn standard() -> Self {
        Self::with_stages(vec![
            Box::new(AmpMappingStage) as Box<dyn ResolverStage>,
            Box::new(AmpDefaultModelStage),
            Box::new(GeneralMappingStage),
            Box::new(ProviderAliasStage),
        ])
    }

    pub fn with_stages(stages: Vec<Box<dyn ResolverStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(
        &self,
        config: &AppConfig,
        origin: RequestOrigin,
        requested: &str,
    ) -> Result<Resolution, ResolveError> {
        if requested.trim().is_empty() {
            return Err(ResolveError::EmptyModel);
        }

        let ctx = StageContext { config, origin };
        let mut candidate = requested.to_string();
        let mut provider = None;
        let mut applied = Vec::new();

        for stage in &self.stages {
            let Some(sub) = stage.apply(&candidate, &ctx) else {
                continue;
            };

            tracing::debug!(
                "[ModelRouter] {} matched: {} -> {}",
                stage.name(),
                candidate,
                sub.model
            );
            let from = std::mem::replace(&mut candidate, sub.model);
            applied.push(AppliedStage {
                stage: stage.name(),
                from,
                to: candidate.clone(),
            });
            if sub.provider.is_some() {
                provider = sub.provider;
            }
        }

        if applied.is_empty() && config.force_model_mappings {
            tracing::warn!(
                "[ModelRouter] rejected '{}' ({:?}): force model mappings is on and no rule matched",
                requested,
                origin
            );
            return Err(ResolveError::ModelNotAllowed {
                model: requested.to_string(),
            });
        }

        let provider = provider.unwrap_or_else(|| ProviderRef::Registry {
            provider: registry::detect_provider(&candidate),
        });

        Ok(Resolution {
            requested: requested.to_string(),
            model: candidate,
            provider,
            applied,
        })
    }
}

/// Resolve with the standard stage order
pub fn resolve_model(
    config: &AppConfig,
    origin: RequestOrigin,
    requested: &str,
) -> Result<Resolution, ResolveError> {
    ModelRouter::standard().resolve(config, origin, requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AmpOpenAIProvider, AmpRoutingMode, AmpSlot, ClaudeApiKey, ModelMapping,
        ProviderModelAlias, SlotMapping,
    };

    fn azure_key(aliases: Vec<ProviderModelAlias>) -> ClaudeApiKey {
        ClaudeApiKey {
            api_key: "sk-azure".to_string(),
            base_url: Some("https://example.azure.com/anthropic".to_string()),
            proxy_url: None,
            models: Some(aliases),
        }
    }

    #[test]
    fn test_mapping_then_alias_binds_provider() {
        let mut config = AppConfig::default();
        config
            .custom_model_mappings
            .push(ModelMapping::new("gpt-4", "claude-sonnet-4-5-20250929"));
        config.claude_api_keys.push(azure_key(vec![ProviderModelAlias::new(
            "claude-opus-4-5",
            "claude-sonnet-4-5-20250929",
        )]));

        let res = resolve_model(&config, RequestOrigin::Generic, "gpt-4").unwrap();
        assert_eq!(res.model, "claude-opus-4-5");
        assert_eq!(
            res.provider,
            ProviderRef::ClaudeApiKey {
                index: 0,
                base_url: Some("https://example.azure.com/anthropic".to_string()),
            }
        );
        assert_eq!(res.applied.len(), 2);
        assert_eq!(res.applied[0].stage, "general_mapping");
        assert_eq!(res.applied[1].from, "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_disabled_rules_never_match() {
        let mut config = AppConfig::default();
        config
            .amp_model_mappings
            .push(ModelMapping::new("claude-opus-4-5", "gpt-5").disabled());
        config
            .custom_model_mappings
            .push(ModelMapping::new("claude-opus-4-5", "gemini-2.5-pro").disabled());
        config.predefined_slots.push(SlotMapping {
            slot: AmpSlot::Smart,
            to: "gpt-5".to_string(),
            enabled: false,
        });

        let res = resolve_model(&config, RequestOrigin::Amp, "claude-opus-4-5").unwrap();
        assert!(res.is_passthrough());
        assert_eq!(res.model, "claude-opus-4-5");

        let res = resolve_model(&config, RequestOrigin::Amp, AmpSlot::Smart.model_id()).unwrap();
        assert!(res.is_passthrough());
    }

    #[test]
    fn test_unmatched_model_passes_through_or_is_rejected() {
        let mut config = AppConfig::default();
        config
            .custom_model_mappings
            .push(ModelMapping::new("other", "x"));

        let res = resolve_model(&config, RequestOrigin::Generic, "gemini-2.5-pro").unwrap();
        assert_eq!(res.model, "gemini-2.5-pro");
        assert_eq!(
            res.provider,
            ProviderRef::Registry {
                provider: ProviderFamily::Gemini
            }
        );
        // passthrough is a fixed point
        let again = resolve_model(&config, RequestOrigin::Generic, &res.model).unwrap();
        assert_eq!(again.model, res.model);

        config.force_model_mappings = true;
        let err = resolve_model(&config, RequestOrigin::Generic, "gemini-2.5-pro").unwrap_err();
        assert_eq!(
            err,
            ResolveError::ModelNotAllowed {
                model: "gemini-2.5-pro".to_string()
            }
        );
        assert_eq!(err.code(), "model_not_allowed");
    }

    #[test]
    fn test_force_mode_allows_any_matched_rule() {
        let mut config = AppConfig::default();
        config.force_model_mappings = true;
        config.claude_api_keys.push(azure_key(vec![ProviderModelAlias::new(
            "deployment-a",
            "claude-sonnet-4-5",
        )]));

        let res = resolve_model(&config, RequestOrigin::Generic, "claude-sonnet-4-5").unwrap();
        assert_eq!(res.model, "deployment-a");
    }

    #[test]
    fn test_amp_mapping_is_not_transitive() {
        let mut config = AppConfig::default();
        config.amp_model_mappings.push(ModelMapping::new("a", "b"));
        config.amp_model_mappings.push(ModelMapping::new("b", "c"));
        config.custom_model_mappings.push(ModelMapping::new("b", "d"));

        let res = resolve_model(&config, RequestOrigin::Amp, "a").unwrap();
        // b is handed to the general table, not back to the Amp table
        assert_eq!(res.model, "d");
        assert_eq!(res.applied[0].stage, "amp_mapping");
        assert_eq!(res.applied[1].stage, "general_mapping");
    }

    #[test]
    fn test_cyclic_mappings_terminate() {
        let mut config = AppConfig::default();
        config.amp_model_mappings.push(ModelMapping::new("a", "b"));
        config.amp_model_mappings.push(ModelMapping::new("b", "a"));
        config.custom_model_mappings.push(ModelMapping::new("b", "a"));

        let res = resolve_model(&config, RequestOrigin::Amp, "a").unwrap();
        assert_eq!(res.model, "a");
        assert_eq!(res.applied.len(), 2);
    }

    #[test]
    fn test_passthrough_mode_ignores_amp_table() {
        let mut config = AppConfig::default();
        config.amp_routing_mode = AmpRoutingMode::Passthrough;
        config
            .amp_model_mappings
            .push(ModelMapping::new("claude-sonnet-4-5-20250929", "gpt-5"));
        config
            .custom_model_mappings
            .push(ModelMapping::new("claude-sonnet-4-5-20250929", "gemini-2.5-pro"));

        let res =
            resolve_model(&config, RequestOrigin::Amp, "claude-sonnet-4-5-20250929").unwrap();
        assert_eq!(res.model, "gemini-2.5-pro");
        assert_eq!(res.applied.len(), 1);
        assert_eq!(res.applied[0].stage, "general_mapping");
    }

    #[test]
    fn test_amp_table_only_applies_to_amp_origin() {
        let mut config = AppConfig::default();
        config.amp_model_mappings.push(ModelMapping::new("a", "b"));

        let res = resolve_model(&config, RequestOrigin::Generic, "a").unwrap();
        assert_eq!(res.model, "a");
        let res = resolve_model(&config, RequestOrigin::Amp, "a").unwrap();
        assert_eq!(res.model, "b");
    }

    #[test]
    fn test_default_mode_substitutes_configured_model() {
        let mut config = AppConfig::default();
        config.amp_routing_mode = AmpRoutingMode::DefaultModel;
        config.amp_default_model = "copilot-gpt-5".to_string();
        config.amp_model_mappings.push(ModelMapping::new("a", "b"));
        config.copilot.enabled = true;

        let res = resolve_model(&config, RequestOrigin::Amp, "a").unwrap();
        assert_eq!(res.model, "gpt-5");
        assert_eq!(
            res.provider,
            ProviderRef::Copilot {
                base_url: "http://localhost:4141/v1".to_string()
            }
        );
        assert_eq!(res.applied[0].stage, "amp_default_model");
        assert_eq!(res.applied[1].stage, "provider_alias");
    }

    #[test]
    fn test_custom_provider_alias_binds_by_id() {
        let mut config = AppConfig::default();
        config.amp_openai_providers.push(AmpOpenAIProvider {
            id: "p".to_string(),
            name: "local".to_string(),
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: "k".to_string(),
            models: vec![ProviderModelAlias::new("real", "pub")],
        });

        let res = resolve_model(&config, RequestOrigin::Generic, "pub").unwrap();
        assert_eq!(res.model, "real");
        assert_eq!(
            res.provider,
            ProviderRef::AmpOpenAI {
                id: "p".to_string(),
                name: "local".to_string()
            }
        );

        // without a key the provider cannot serve, so the name passes through
        config.amp_openai_providers[0].api_key.clear();
        let res = resolve_model(&config, RequestOrigin::Generic, "pub").unwrap();
        assert!(res.is_passthrough());
        assert_eq!(res.model, "pub");
    }

    #[test]
    fn test_first_duplicate_rule_wins() {
        let mut config = AppConfig::default();
        config.custom_model_mappings.push(ModelMapping::new("gpt-4", "first"));
        config.custom_model_mappings.push(ModelMapping::new("gpt-4", "second"));

        let res = resolve_model(&config, RequestOrigin::Generic, "gpt-4").unwrap();
        assert_eq!(res.model, "first");
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let config = AppConfig::default();
        let err = resolve_model(&config, RequestOrigin::Generic, "  ").unwrap_err();
        assert_eq!(err, ResolveError::EmptyModel);
        assert_eq!(err.code(), "invalid_request");
    }

    #[test]
    fn test_custom_stage_order() {
        let mut config = AppConfig::default();
        config.custom_model_mappings.push(ModelMapping::new("a", "b"));

        let router = ModelRouter::with_stages(vec![Box::new(ProviderAliasStage) as Box<dyn ResolverStage>]);
        assert_eq!(router.stage_names(), vec!["provider_alias"]);
        let res = router.resolve(&config, RequestOrigin::Generic, "a").unwrap();
        assert!(res.is_passthrough());
    }
}
