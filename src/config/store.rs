// Settings persistence: one JSON file, read at startup and overwritten on every save

use parking_lot::RwLock;
use std::path::{Path, PathBuf};

use super::{AppConfig, ConfigError};

/// Default settings location: `<config_dir>/cliproxy-router/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cliproxy-router")
        .join("config.json")
}

/// Shared owner of the in-memory settings and their backing file.
///
/// Writers go through [`ConfigStore::update`], which serializes edits behind the write
/// lock and only swaps the in-memory copy once the file has been written.
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<AppConfig>,
}

impl ConfigStore {
    /// Load the settings file, creating it with defaults when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let config = if path.exists() {
            let mut config = read_config(&path)?;
            if migrate_legacy_provider(&mut config) {
                tracing::info!("Migrated legacy ampOpenaiProvider in {:?}", path);
                write_config(&path, &config)?;
            }
            config
        } else {
            let config = AppConfig::default();
            write_config(&path, &config)?;
            config
        };

        tracing::info!("Config initialized from {:?}", path);
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Overwrite the whole config, in memory and on disk.
    pub fn replace(&self, mut config: AppConfig) -> Result<(), ConfigError> {
        migrate_legacy_provider(&mut config);
        let mut current = self.config.write();
        write_config(&self.path, &config)?;
        *current = config;
        Ok(())
    }

    /// Read-modify-write. If `edit` fails or the file cannot be written, nothing changes.
    pub fn update<T>(
        &self,
        edit: impl FnOnce(&mut AppConfig) -> Result<T, ConfigError>,
    ) -> Result<T, ConfigError> {
        let mut current = self.config.write();
        let mut next = current.clone();
        let out = edit(&mut next)?;
        write_config(&self.path, &next)?;
        *current = next;
        Ok(out)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, content)?;
    tracing::info!("Config saved to {:?}", path);
    Ok(())
}

/// Fold the deprecated single provider into the list. Returns true when the config changed.
fn migrate_legacy_provider(config: &mut AppConfig) -> bool {
    let Some(mut legacy) = config.amp_openai_provider.take() else {
        return false;
    };

    // Only the first migration counts; a populated list wins over a stale legacy field.
    if config.amp_openai_providers.is_empty() {
        if legacy.id.is_empty() {
            legacy.id = uuid::Uuid::new_v4().to_string();
        }
        config.amp_openai_providers.push(legacy);
    }
    true
}
