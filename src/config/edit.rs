// Table edits applied to a config before it is saved

use super::{AmpOpenAIProvider, AmpSlot, ConfigError, ModelMapping, SlotMapping};

fn validate_mapping(mapping: &ModelMapping) -> Result<(), ConfigError> {
    if mapping.from.trim().is_empty() {
        return Err(ConfigError::Invalid("mapping 'from' must not be empty".to_string()));
    }
    if mapping.to.trim().is_empty() {
        return Err(ConfigError::Invalid("mapping 'to' must not be empty".to_string()));
    }
    Ok(())
}

fn position(list: &[ModelMapping], from: &str) -> Option<usize> {
    list.iter().position(|m| m.from == from)
}

/// Append a rule. A second rule for the same `from` is rejected.
pub fn add_mapping(list: &mut Vec<ModelMapping>, mapping: ModelMapping) -> Result<(), ConfigError> {
    validate_mapping(&mapping)?;
    if position(list, &mapping.from).is_some() {
        return Err(ConfigError::DuplicateMapping(mapping.from));
    }
    list.push(mapping);
    Ok(())
}

/// Replace the rule keyed by `from` in place, keeping its position.
pub fn update_mapping(
    list: &mut [ModelMapping],
    from: &str,
    mapping: ModelMapping,
) -> Result<(), ConfigError> {
    validate_mapping(&mapping)?;
    let idx = position(list, from).ok_or_else(|| ConfigError::MappingNotFound(from.to_string()))?;
    if mapping.from != from && position(list, &mapping.from).is_some() {
        return Err(ConfigError::DuplicateMapping(mapping.from));
    }
    list[idx] = mapping;
    Ok(())
}

pub fn remove_mapping(list: &mut Vec<ModelMapping>, from: &str) -> Result<ModelMapping, ConfigError> {
    let idx = position(list, from).ok_or_else(|| ConfigError::MappingNotFound(from.to_string()))?;
    Ok(list.remove(idx))
}

pub fn set_mapping_enabled(
    list: &mut [ModelMapping],
    from: &str,
    enabled: bool,
) -> Result<(), ConfigError> {
    let idx = position(list, from).ok_or_else(|| ConfigError::MappingNotFound(from.to_string()))?;
    list[idx].enabled = enabled;
    Ok(())
}

/// Insert or replace the mapping for a predefined slot.
pub fn set_slot(
    slots: &mut Vec<SlotMapping>,
    slot: AmpSlot,
    to: String,
    enabled: bool,
) -> Result<(), ConfigError> {
    if to.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "slot '{}' needs a target model",
            slot.as_str()
        )));
    }

    match slots.iter_mut().find(|s| s.slot == slot) {
        Some(existing) => {
            existing.to = to;
            existing.enabled = enabled;
        }
        None => slots.push(SlotMapping { slot, to, enabled }),
    }
    Ok(())
}

fn validate_provider(provider: &AmpOpenAIProvider) -> Result<(), ConfigError> {
    if provider.name.trim().is_empty() {
        return Err(ConfigError::Invalid("provider name must not be empty".to_string()));
    }
    if provider.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("provider baseUrl must not be empty".to_string()));
    }
    if provider.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("provider apiKey must not be empty".to_string()));
    }
    Ok(())
}

/// Register a provider, assigning a fresh id when none was given. Returns the stored id.
pub fn add_amp_provider(
    list: &mut Vec<AmpOpenAIProvider>,
    mut provider: AmpOpenAIProvider,
) -> Result<String, ConfigError> {
    validate_provider(&provider)?;
    if provider.id.is_empty() {
        provider.id = uuid::Uuid::new_v4().to_string();
    } else if list.iter().any(|p| p.id == provider.id) {
        return Err(ConfigError::Invalid(format!(
            "provider id '{}' is already in use",
            provider.id
        )));
    }

    let id = provider.id.clone();
    list.push(provider);
    Ok(id)
}

pub fn update_amp_provider(
    list: &mut [AmpOpenAIProvider],
    provider: AmpOpenAIProvider,
) -> Result<(), ConfigError> {
    validate_provider(&provider)?;
    let existing = list
        .iter_mut()
        .find(|p| p.id == provider.id)
        .ok_or_else(|| ConfigError::ProviderNotFound(provider.id.clone()))?;
    *existing = provider;
    Ok(())
}

pub fn delete_amp_provider(
    list: &mut Vec<AmpOpenAIProvider>,
    id: &str,
) -> Result<AmpOpenAIProvider, ConfigError> {
    let idx = list
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| ConfigError::ProviderNotFound(id.to_string()))?;
    Ok(list.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str) -> AmpOpenAIProvider {
        AmpOpenAIProvider {
            id: String::new(),
            name: name.to_string(),
            base_url: "http://localhost:1234/v1".to_string(),
            api_key: "key".to_string(),
            models: Vec::new(),
        }
    }

    #[test]
    fn test_add_mapping_rejects_duplicate_from() {
        let mut list = Vec::new();
        add_mapping(&mut list, ModelMapping::new("gpt-4", "claude-sonnet-4-5")).unwrap();
        let err = add_mapping(&mut list, ModelMapping::new("gpt-4", "gemini-2.5-pro")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateMapping(from) if from == "gpt-4"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_add_mapping_rejects_blank_fields() {
        let mut list = Vec::new();
        assert!(add_mapping(&mut list, ModelMapping::new(" ", "x")).is_err());
        assert!(add_mapping(&mut list, ModelMapping::new("x", "")).is_err());
        assert!(list.is_empty());
    }

    #[test]
    fn test_update_mapping_keeps_position_and_blocks_collisions() {
        let mut list = vec![ModelMapping::new("a", "1"), ModelMapping::new("b", "2")];

        update_mapping(&mut list, "a", ModelMapping::new("c", "3")).unwrap();
        assert_eq!(list[0], ModelMapping::new("c", "3"));

        let err = update_mapping(&mut list, "c", ModelMapping::new("b", "4")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateMapping(_)));

        let err = update_mapping(&mut list, "zzz", ModelMapping::new("zzz", "4")).unwrap_err();
        assert!(matches!(err, ConfigError::MappingNotFound(_)));
    }

    #[test]
    fn test_toggle_and_remove_mapping() {
        let mut list = vec![ModelMapping::new("a", "1")];
        set_mapping_enabled(&mut list, "a", false).unwrap();
        assert!(!list[0].enabled);

        let removed = remove_mapping(&mut list, "a").unwrap();
        assert_eq!(removed.from, "a");
        assert!(remove_mapping(&mut list, "a").is_err());
    }

    #[test]
    fn test_set_slot_upserts() {
        let mut slots = Vec::new();
        set_slot(&mut slots, AmpSlot::Smart, "gpt-5".to_string(), true).unwrap();
        set_slot(&mut slots, AmpSlot::Smart, "gemini-2.5-pro".to_string(), false).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].to, "gemini-2.5-pro");
        assert!(!slots[0].enabled);
        assert!(set_slot(&mut slots, AmpSlot::Rush, String::new(), true).is_err());
    }

    #[test]
    fn test_provider_lifecycle_by_id() {
        let mut list = Vec::new();
        let id = add_amp_provider(&mut list, provider("Local LLM")).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let mut changed = list[0].clone();
        changed.name = "Renamed".to_string();
        update_amp_provider(&mut list, changed).unwrap();
        assert_eq!(list[0].name, "Renamed");

        let deleted = delete_amp_provider(&mut list, &id).unwrap();
        assert_eq!(deleted.id, id);
        assert!(matches!(
            delete_amp_provider(&mut list, &id),
            Err(ConfigError::ProviderNotFound(_))
        ));
    }

    #[test]
    fn test_provider_without_key_is_rejected() {
        let mut list = Vec::new();
        let mut p = provider("No key");
        p.api_key = String::new();
        let err = add_amp_provider(&mut list, p).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("apiKey")));
        assert!(list.is_empty());
    }

    #[test]
    fn test_add_provider_keeps_given_id_but_rejects_reuse() {
        let mut list = Vec::new();
        let mut p = provider("A");
        p.id = "fixed".to_string();
        assert_eq!(add_amp_provider(&mut list, p.clone()).unwrap(), "fixed");
        assert!(add_amp_provider(&mut list, p).is_err());
    }
}
