//! Connector settings file with hot reload.
//!
//! The file is read once at startup and again only when the watcher sees it
//! change. A reload that fails to parse keeps the previous settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    /// Page size for paginated backend listings.
    pub page_size: u32,
    /// Upper bound on objects returned by bot actions.
    pub max_results: u32,
    /// Locale requested from backends that localize content.
    pub locale: String,
    /// Overrides the connector icon advertised in discovery.
    pub image_url: Option<String>,
    /// How far back "recent" queries look.
    pub lookback_days: u32,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_results: 10,
            locale: "en".to_string(),
            image_url: None,
            lookback_days: 30,
        }
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<ConnectorSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings = serde_json::from_str(&raw)
        .with_context(|| format!("invalid settings file {}", path.display()))?;
    Ok(settings)
}

/// Shared, swappable view of the current settings.
#[derive(Clone)]
pub struct SettingsHandle {
    current: Arc<ArcSwap<ConnectorSettings>>,
    path: Option<PathBuf>,
}

impl SettingsHandle {
    /// Settings that never change (no file configured).
    pub fn fixed(settings: ConnectorSettings) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(settings)),
            path: None,
        }
    }

    /// Load from `path`, or fall back to defaults when there is no file.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Ok(Self {
                current: Arc::new(ArcSwap::from_pointee(load_settings(path)?)),
                path: Some(path.to_path_buf()),
            }),
            None => Ok(Self::fixed(ConnectorSettings::default())),
        }
    }

    pub fn current(&self) -> Arc<ConnectorSettings> {
        self.current.load_full()
    }

    /// Re-read the file. On error the previous settings stay in place.
    pub fn reload(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fresh = load_settings(path)?;
        self.current.store(Arc::new(fresh));
        tracing::info!(path = %path.display(), "connector settings reloaded");
        Ok(())
    }

    /// Watch the settings file and reload on change.
    ///
    /// The returned watcher must be kept alive for as long as reloads are
    /// wanted. Returns `None` when no file is configured.
    pub fn watch(&self) -> Result<Option<RecommendedWatcher>, notify::Error> {
        let Some(path) = self.path.clone() else {
            return Ok(None);
        };
        let handle = self.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Settings file change detected, reloading...");
                        if let Err(e) = handle.reload() {
                            tracing::error!(
                                "Failed to reload settings: {:#}. Keeping current settings.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Settings watcher started");
        Ok(Some(watcher))
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::fixed(ConnectorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}.json", name, uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_file("settings-partial", r#"{"page_size": 20}"#);
        let handle = SettingsHandle::load(Some(&path)).unwrap();
        let settings = handle.current();
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.max_results, 10);
        assert_eq!(settings.locale, "en");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let path = temp_file("settings-reload", r#"{"max_results": 5}"#);
        let handle = SettingsHandle::load(Some(&path)).unwrap();
        assert_eq!(handle.current().max_results, 5);

        std::fs::write(&path, r#"{"max_results": 7}"#).unwrap();
        handle.reload().unwrap();
        assert_eq!(handle.current().max_results, 7);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_bad_reload_keeps_previous() {
        let path = temp_file("settings-bad", r#"{"locale": "fr"}"#);
        let handle = SettingsHandle::load(Some(&path)).unwrap();

        std::fs::write(&path, "{ not json").unwrap();
        assert!(handle.reload().is_err());
        assert_eq!(handle.current().locale, "fr");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("definitely-missing-settings.json");
        assert!(SettingsHandle::load(Some(&path)).is_err());
    }

    #[test]
    fn test_no_file_means_defaults() {
        let handle = SettingsHandle::load(None).unwrap();
        assert_eq!(*handle.current(), ConnectorSettings::default());
        assert!(handle.reload().is_ok());
        assert!(handle.watch().unwrap().is_none());
    }
}
