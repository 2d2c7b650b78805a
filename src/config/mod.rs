// Configuration module for the router settings file

pub mod edit;
mod store;

pub use store::{default_config_path, ConfigStore};

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("a mapping for '{0}' already exists")]
    DuplicateMapping(String),

    #[error("no mapping for '{0}'")]
    MappingNotFound(String),

    #[error("no provider with id '{0}'")]
    ProviderNotFound(String),

    #[error("invalid value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Required on management routes when non-empty.
    #[serde(default)]
    pub management_key: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub amp_api_key: String,

    #[serde(default)]
    pub amp_model_mappings: Vec<ModelMapping>,

    #[serde(default)]
    pub amp_routing_mode: AmpRoutingMode,

    /// Substituted for every Amp request when the routing mode is `default`.
    #[serde(default)]
    pub amp_default_model: String,

    #[serde(default)]
    pub custom_model_mappings: Vec<ModelMapping>,

    #[serde(default)]
    pub predefined_slots: Vec<SlotMapping>,

    #[serde(default)]
    pub force_model_mappings: bool,

    #[serde(default)]
    pub claude_api_keys: Vec<ClaudeApiKey>,

    #[serde(default)]
    pub amp_openai_providers: Vec<AmpOpenAIProvider>,

    #[serde(default)]
    pub copilot: CopilotConfig,

    /// Deprecated single-provider field, folded into `amp_openai_providers` on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp_openai_provider: Option<AmpOpenAIProvider>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            management_key: String::new(),
            debug: false,
            amp_api_key: String::new(),
            amp_model_mappings: Vec::new(),
            amp_routing_mode: AmpRoutingMode::default(),
            amp_default_model: String::new(),
            custom_model_mappings: Vec::new(),
            predefined_slots: Vec::new(),
            force_model_mappings: false,
            claude_api_keys: Vec::new(),
            amp_openai_providers: Vec::new(),
            copilot: CopilotConfig::default(),
            amp_openai_provider: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8317
}

fn default_enabled() -> bool {
    true
}

/// One routing rule: requests for `from` are sent upstream as `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMapping {
    pub from: String,
    pub to: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ModelMapping {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Provider-side rename: clients ask for `alias`, the backend expects `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderModelAlias {
    pub name: String,
    #[serde(default)]
    pub alias: String,
}

impl ProviderModelAlias {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeApiKey {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<ProviderModelAlias>>,
}

/// Custom OpenAI-compatible upstream registered for Amp routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmpOpenAIProvider {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub models: Vec<ProviderModelAlias>,
}

impl AmpOpenAIProvider {
    /// Only providers with a name, base URL and key can serve requests
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.base_url.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }
}

/// GitHub Copilot bridge (copilot-api) running on localhost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopilotConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_copilot_port")]
    pub port: u16,
    /// "individual", "business" or "enterprise"
    #[serde(default = "default_copilot_account_type")]
    pub account_type: String,
    #[serde(default)]
    pub github_token: String,
    /// Seconds between requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u16>,
    #[serde(default)]
    pub rate_limit_wait: bool,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_copilot_port(),
            account_type: default_copilot_account_type(),
            github_token: String::new(),
            rate_limit: None,
            rate_limit_wait: false,
        }
    }
}

fn default_copilot_port() -> u16 {
    4141
}

fn default_copilot_account_type() -> String {
    "individual".to_string()
}

/// Models the Copilot bridge serves, as (alias, upstream name).
pub static COPILOT_MODEL_ALIASES: &[(&str, &str)] = &[
    // OpenAI
    ("copilot-gpt-4.1", "gpt-4.1"),
    ("copilot-gpt-5", "gpt-5"),
    ("copilot-gpt-5-mini", "gpt-5-mini"),
    ("copilot-gpt-5-codex", "gpt-5-codex"),
    ("copilot-gpt-5.1", "gpt-5.1"),
    ("copilot-gpt-5.1-codex", "gpt-5.1-codex"),
    ("copilot-gpt-5.1-codex-mini", "gpt-5.1-codex-mini"),
    ("copilot-gpt-4o", "gpt-4o"),
    ("copilot-gpt-4", "gpt-4"),
    ("copilot-gpt-4-turbo", "gpt-4-turbo"),
    ("copilot-o1", "o1"),
    ("copilot-o1-mini", "o1-mini"),
    // xAI
    ("copilot-grok-code-fast-1", "grok-code-fast-1"),
    ("copilot-raptor-mini", "raptor-mini"),
    // Gemini
    ("copilot-gemini-2.5-pro", "gemini-2.5-pro"),
    ("copilot-gemini-3-pro", "gemini-3-pro-preview"),
    // Claude
    ("copilot-claude-haiku-4.5", "claude-haiku-4.5"),
    ("copilot-claude-opus-4.1", "claude-opus-4.1"),
    ("copilot-claude-sonnet-4", "claude-sonnet-4"),
    ("copilot-claude-sonnet-4.5", "claude-sonnet-4.5"),
    ("copilot-claude-opus-4.5", "claude-opus-4.5"),
];

impl CopilotConfig {
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}/v1", self.port)
    }

    /// Upstream name for a `copilot-*` alias, or `None` when the bridge is off
    pub fn lookup_alias(&self, alias: &str) -> Option<&'static str> {
        if !self.enabled {
            return None;
        }
        COPILOT_MODEL_ALIASES
            .iter()
            .find(|(a, _)| *a == alias)
            .map(|(_, name)| *name)
    }
}

/// Decides whether Amp requests consult the Amp mapping table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AmpRoutingMode {
    #[default]
    Mappings,
    Passthrough,
    #[serde(rename = "default")]
    DefaultModel,
}

impl AmpRoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mappings => "mappings",
            Self::Passthrough => "passthrough",
            Self::DefaultModel => "default",
        }
    }
}

impl FromStr for AmpRoutingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mappings" => Ok(Self::Mappings),
            "passthrough" => Ok(Self::Passthrough),
            "default" => Ok(Self::DefaultModel),
            other => Err(ConfigError::Invalid(format!(
                "unknown ampRoutingMode '{}' (expected mappings, passthrough or default)",
                other
            ))),
        }
    }
}

// Older settings files carry "" or the retired "openai" mode; both load as mappings.
// Writes through the API go through `FromStr` and reject unknown values.
impl<'de> Deserialize<'de> for AmpRoutingMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

/// Fixed Amp agent slots. Each slot is requested under a model id the user cannot change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmpSlot {
    Smart,
    Rush,
    Oracle,
    Librarian,
    Search,
}

impl AmpSlot {
    pub const ALL: [AmpSlot; 5] = [
        AmpSlot::Smart,
        AmpSlot::Rush,
        AmpSlot::Oracle,
        AmpSlot::Librarian,
        AmpSlot::Search,
    ];

    /// Model id the Amp client sends for this slot
    pub fn model_id(&self) -> &'static str {
        match self {
            Self::Smart => "claude-opus-4-5-20251101",
            Self::Rush => "claude-haiku-4-5-20251001",
            Self::Oracle => "gpt-5.1",
            Self::Librarian => "claude-sonnet-4-5-20250929",
            Self::Search => "gemini-2.5-flash",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Rush => "rush",
            Self::Oracle => "oracle",
            Self::Librarian => "librarian",
            Self::Search => "search",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMapping {
    pub slot: AmpSlot,
    pub to: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SlotMapping {
    pub fn from_model(&self) -> &'static str {
        self.slot.model_id()
    }
}
