use lineage_core::GraphFilters;
use lineage_graph::{ExportOptions, LayoutConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    pub api: ApiSettings,
    pub search: SearchSettings,
    /// Filters a freshly mounted view starts with.
    pub filters: GraphFilters,
    pub layout: LayoutConfig,
    pub export: ExportOptions,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub search_limit: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 10,
            search_limit: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub debounce_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Identical notifications inside this window are shown once.
    pub dedup_window_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            dedup_window_ms: 2000,
        }
    }
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            search: SearchSettings::default(),
            filters: GraphFilters::default(),
            layout: LayoutConfig::default(),
            export: ExportOptions::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl ExplorerSettings {
    const APP_DIR: &'static str = "lineage-explorer";
    const FILE_NAME: &'static str = "settings.json";

    /// `<config dir>/lineage-explorer/settings.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::APP_DIR).join(Self::FILE_NAME))
    }

    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::info!("No config directory on this platform, using default settings");
                Self::default()
            }
        }
    }

    /// Reads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        tracing::info!("Loading settings from {:?}", path);
        if !path.exists() {
            tracing::info!("Settings file not found, using defaults");
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    tracing::info!("Settings loaded successfully: {:?}", settings);
                    return settings;
                }
                Err(e) => tracing::error!("Failed to parse settings: {}", e),
            },
            Err(e) => tracing::error!("Failed to read settings file: {}", e),
        }
        Self::default()
    }

    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = Self::default_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory on this platform",
            ));
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent()
            && !dir.exists()
        {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.notifications.dedup_window_ms)
    }
}
