// Request origin detection
// Amp CLI traffic arrives on `/api/provider/{provider}/...`; everything else is a generic
// OpenAI/Anthropic-compatible client.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOrigin {
    Amp,
    #[default]
    Generic,
}

impl RequestOrigin {
    pub fn from_path(path: &str) -> Self {
        if amp_provider_segment(path).is_some() {
            Self::Amp
        } else {
            Self::Generic
        }
    }
}

fn amp_provider_segment(path: &str) -> Option<&str> {
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    while let Some(part) = parts.next() {
        if part == "api" {
            return match (parts.next(), parts.next()) {
                (Some("provider"), Some(provider)) => Some(provider),
                _ => None,
            };
        }
    }
    None
}

/// Upstream named in an Amp-style path, e.g. "/api/provider/anthropic/v1/messages" -> "claude"
pub fn upstream_provider(path: &str) -> Option<String> {
    amp_provider_segment(path).map(|provider| match provider {
        "anthropic" => "claude".to_string(),
        "google" => "gemini".to_string(),
        p => p.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amp_paths() {
        assert_eq!(
            RequestOrigin::from_path("/api/provider/anthropic/v1/messages"),
            RequestOrigin::Amp
        );
        assert_eq!(
            upstream_provider("/api/provider/anthropic/v1/messages").as_deref(),
            Some("claude")
        );
        assert_eq!(
            upstream_provider("/api/provider/google/v1beta1/publishers/google/models/x").as_deref(),
            Some("gemini")
        );
        assert_eq!(
            upstream_provider("/api/provider/openai/v1/chat/completions").as_deref(),
            Some("openai")
        );
    }

    #[test]
    fn test_generic_paths() {
        assert_eq!(RequestOrigin::from_path("/v1/messages"), RequestOrigin::Generic);
        assert_eq!(RequestOrigin::from_path("/v1/chat/completions"), RequestOrigin::Generic);
        assert_eq!(RequestOrigin::from_path("/api/provider"), RequestOrigin::Generic);
        assert_eq!(upstream_provider("/v1beta/models"), None);
    }
}
