// Resolver stages. Each one owns a single lookup table and knows nothing about the others.

use crate::config::{AmpRoutingMode, AppConfig, ModelMapping};

use super::{ProviderRef, RequestOrigin};

pub struct StageContext<'a> {
    pub config: &'a AppConfig,
    pub origin: RequestOrigin,
}

impl StageContext<'_> {
    fn amp_mode(&self) -> Option<AmpRoutingMode> {
        match self.origin {
            RequestOrigin::Amp => Some(self.config.amp_routing_mode),
            RequestOrigin::Generic => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub model: String,
    /// Set when the match pins the request to a specific credential
    pub provider: Option<ProviderRef>,
}

impl Substitution {
    fn model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            provider: None,
        }
    }
}

pub trait ResolverStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means the stage has nothing for this candidate.
    fn apply(&self, candidate: &str, ctx: &StageContext<'_>) -> Option<Substitution>;
}

/// First enabled rule whose `from` equals the candidate
fn lookup<'a>(rules: &'a [ModelMapping], candidate: &str) -> Option<&'a ModelMapping> {
    rules.iter().find(|m| m.enabled && m.from == candidate)
}

/// Amp table, only for Amp requests in `mappings` mode
pub struct AmpMappingStage;

impl ResolverStage for AmpMappingStage {
    fn name(&self) -> &'static str {
        "amp_mapping"
    }

    fn apply(&self, candidate: &str, ctx: &StageContext<'_>) -> Option<Substitution> {
        if ctx.amp_mode() != Some(AmpRoutingMode::Mappings) {
            return None;
        }
        lookup(&ctx.config.amp_model_mappings, candidate).map(|m| Substitution::model(&m.to))
    }
}

/// Replaces every Amp request with `ampDefaultModel` in `default` mode.
/// An empty default leaves the request alone.
pub struct AmpDefaultModelStage;

impl ResolverStage for AmpDefaultModelStage {
    fn name(&self) -> &'static str {
        "amp_default_model"
    }

    fn apply(&self, _candidate: &str, ctx: &StageContext<'_>) -> Option<Substitution> {
        if ctx.amp_mode() != Some(AmpRoutingMode::DefaultModel) {
            return None;
        }
        let default_model = ctx.config.amp_default_model.trim();
        if default_model.is_empty() {
            return None;
        }
        Some(Substitution::model(default_model))
    }
}

/// Custom mappings, then predefined slots, as one ordered list
pub struct GeneralMappingStage;

impl ResolverStage for GeneralMappingStage {
    fn name(&self) -> &'static str {
        "general_mapping"
    }

    fn apply(&self, candidate: &str, ctx: &StageContext<'_>) -> Option<Substitution> {
        if let Some(rule) = lookup(&ctx.config.custom_model_mappings, candidate) {
            return Some(Substitution::model(&rule.to));
        }

        ctx.config
            .predefined_slots
            .iter()
            .find(|s| s.enabled && s.from_model() == candidate)
            .map(|s| Substitution::model(&s.to))
    }
}

/// Per-credential aliases. Claude keys are scanned first, then custom OpenAI providers,
/// then the built-in Copilot table. Providers missing a name, base URL or key are skipped.
pub struct ProviderAliasStage;

impl ResolverStage for ProviderAliasStage {
    fn name(&self) -> &'static str {
        "provider_alias"
    }

    fn apply(&self, candidate: &str, ctx: &StageContext<'_>) -> Option<Substitution> {
        for (index, key) in ctx.config.claude_api_keys.iter().enumerate() {
            let Some(models) = key.models.as_ref() else {
                continue;
            };
            if let Some(m) = models.iter().find(|m| !m.alias.is_empty() && m.alias == candidate) {
                return Some(Substitution {
                    model: m.name.clone(),
                    provider: Some(ProviderRef::ClaudeApiKey {
                        index,
                        base_url: key.base_url.clone(),
                    }),
                });
            }
        }

        for provider in ctx
            .config
            .amp_openai_providers
            .iter()
            .filter(|p| p.is_complete())
        {
            if let Some(m) = provider
                .models
                .iter()
                .find(|m| !m.alias.is_empty() && m.alias == candidate)
            {
                return Some(Substitution {
                    model: m.name.clone(),
                    provider: Some(ProviderRef::AmpOpenAI {
                        id: provider.id.clone(),
                        name: provider.name.clone(),
                    }),
                });
            }
        }

        let copilot = &ctx.config.copilot;
        copilot.lookup_alias(candidate).map(|name| Substitution {
            model: name.to_string(),
            provider: Some(ProviderRef::Copilot {
                base_url: copilot.base_url(),
            }),
        })
    }
}
