use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "docindex";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Class marking containers whose images must not capture clicks
    #[serde(default = "default_marker_class")]
    pub marker_class: String,

    /// Glob selecting pages for the click-guard, relative to the site root
    #[serde(default = "default_html_glob")]
    pub html_glob: String,

    /// Stem words when building an index
    #[serde(default = "default_stem_words")]
    pub stem_words: bool,

    /// Process pages on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_marker_class() -> String {
    crate::guard::DEFAULT_MARKER_CLASS.to_string()
}

fn default_html_glob() -> String {
    "**/*.html".to_string()
}

fn default_stem_words() -> bool {
    true
}

fn default_parallel() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            marker_class: default_marker_class(),
            html_glob: default_html_glob(),
            stem_words: default_stem_words(),
            parallel: default_parallel(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        match get_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<PathBuf> {
        let dir = get_app_data_dir().context("Could not determine app data directory")?;
        fs::create_dir_all(&dir)?;
        let path = dir.join(CONFIG_FILE);
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Option<PathBuf> {
    get_app_data_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Option<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };
    base.map(|b| b.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.marker_class, "no-click");
        assert_eq!(config.html_glob, "**/*.html");
        assert!(config.stem_words);
        assert!(config.parallel);
    }

    #[test]
    fn test_app_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"marker_class": "static-figure"}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.marker_class, "static-figure");
        assert_eq!(config.html_glob, "**/*.html");
    }

    #[test]
    fn test_app_config_empty_json() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.marker_class, "no-click");
        assert!(config.stem_words);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            stem_words: false,
            parallel: false,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert!(!loaded.stem_words);
        assert!(!loaded.parallel);
    }

    #[test]
    fn test_load_from_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
