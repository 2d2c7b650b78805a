// Model registry: which provider family naturally serves a model id
// Used for passthrough results, where no credential was bound by a mapping or alias

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    Claude,
    OpenAI,
    Gemini,
    Qwen,
    DeepSeek,
    Zhipu,
    Antigravity,
    Unknown,
}

/// Known model families, most specific first.
/// Format: (model_pattern, provider)
static MODEL_PROVIDER_MAP: &[(&str, ProviderFamily)] = &[
    // Claude models
    ("claude-sonnet-4-5", ProviderFamily::Claude),
    ("claude-opus-4-5", ProviderFamily::Claude),
    ("claude-haiku-4-5", ProviderFamily::Claude),
    ("claude-sonnet-4", ProviderFamily::Claude),
    ("claude-opus-4", ProviderFamily::Claude),
    ("claude-3-5-sonnet", ProviderFamily::Claude),
    ("claude-3-opus", ProviderFamily::Claude),
    ("claude-3-haiku", ProviderFamily::Claude),
    // Gemini models
    ("gemini-3-pro", ProviderFamily::Gemini),
    ("gemini-3-flash", ProviderFamily::Gemini),
    ("gemini-2-5-pro", ProviderFamily::Gemini),
    ("gemini-2-5-flash", ProviderFamily::Gemini),
    ("gemini-2-0-flash", ProviderFamily::Gemini),
    // OpenAI/Codex models
    ("gpt-5-codex", ProviderFamily::OpenAI),
    ("gpt-5", ProviderFamily::OpenAI),
    ("gpt-4-1", ProviderFamily::OpenAI),
    ("gpt-4o", ProviderFamily::OpenAI),
    ("o3", ProviderFamily::OpenAI),
    ("o4-mini", ProviderFamily::OpenAI),
];

/// Normalize model names to unify different naming conventions
/// e.g., "claude-sonnet-4.5" and "claude-sonnet-4-5" are the same model
pub fn normalize_model_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['.', '_'], "-")
}

pub fn detect_provider(model: &str) -> ProviderFamily {
    let normalized = normalize_model_name(model);

    // Exact or dated-suffix matches first
    for (pattern, provider) in MODEL_PROVIDER_MAP {
        if normalized == *pattern || normalized.starts_with(&format!("{}-", pattern)) {
            return *provider;
        }
    }

    for (pattern, provider) in MODEL_PROVIDER_MAP {
        if normalized.starts_with(pattern) {
            return *provider;
        }
    }

    infer_from_name(&normalized)
}

fn infer_from_name(normalized: &str) -> ProviderFamily {
    if ["claude", "sonnet", "opus", "haiku"]
        .iter()
        .any(|k| normalized.contains(k))
    {
        return ProviderFamily::Claude;
    }
    if normalized.contains("gpt")
        || normalized.contains("codex")
        || normalized.starts_with("o1")
        || normalized.starts_with("o3")
    {
        return ProviderFamily::OpenAI;
    }
    if normalized.contains("gemini") {
        return ProviderFamily::Gemini;
    }
    if normalized.contains("qwen") {
        return ProviderFamily::Qwen;
    }
    if normalized.contains("deepseek") {
        return ProviderFamily::DeepSeek;
    }
    if normalized.contains("glm") {
        return ProviderFamily::Zhipu;
    }
    if normalized.contains("antigravity") {
        return ProviderFamily::Antigravity;
    }
    ProviderFamily::Unknown
}
