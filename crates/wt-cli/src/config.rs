//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wt_core::GrammarKind;
use wt_core::series::{DEFAULT_SPAN_DAYS, DEFAULT_STEP_DAYS};

const DEFAULT_SITE_BASE_URL: &str = "https://shikimori.one";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36 Edg/128.0.0.0";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the metadata cache database.
    pub database_path: PathBuf,
    /// Site that relative title links point into.
    pub site_base_url: String,
    /// User agent sent with title page requests.
    pub user_agent: String,
    /// Language of the activity log.
    pub grammar: GrammarKind,
    /// Width of the trailing window in days.
    pub span_days: u32,
    /// Distance between series samples in days.
    pub step_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("titles.db"),
            site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            grammar: GrammarKind::default(),
            span_days: DEFAULT_SPAN_DAYS,
            step_days: DEFAULT_STEP_DAYS,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for watchtime.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("watchtime"))
}

/// Returns the platform-specific data directory for watchtime.
///
/// On Linux: `~/.local/share/watchtime`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("watchtime"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_watchtime() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "watchtime");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("titles.db"));
        assert_eq!(config.grammar, GrammarKind::En);
        assert_eq!((config.span_days, config.step_days), (49, 14));
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "grammar = \"ru\"\nspan_days = 30\nsite_base_url = \"https://example.org\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();

        assert_eq!(config.grammar, GrammarKind::Ru);
        assert_eq!(config.span_days, 30);
        assert_eq!(config.step_days, 14);
        assert_eq!(config.site_base_url, "https://example.org");
    }
}
