//! User settings loaded from `settings.toml`.
//!
//! ```toml
//! store = "sqlite"
//! document_path = "/home/me/layouts/worktabs.db"
//!
//! [log]
//! file = true
//! filter = "worktabs=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which Persistence Gateway backend holds the layout document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Also write logs to `worktabs.log` in the log directory.
    #[serde(default)]
    pub file: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreBackend,
    /// Overrides the backend's default document location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Where the layout document lives: the explicit override, or the
    /// backend's default under the data directory.
    pub fn document_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.document_path {
            return Some(path.clone());
        }
        match self.store {
            StoreBackend::Json => crate::paths::document_file(),
            StoreBackend::Sqlite => crate::paths::database_file(),
        }
    }
}

/// Parse settings from a TOML file. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(e.into()),
    }
}

/// Load settings from `~/.config/worktabs/settings.toml`.
/// Falls back to defaults if the file is missing or can't be parsed.
pub fn load_settings() -> Settings {
    let Some(path) = crate::paths::settings_file() else {
        return Settings::default();
    };

    match load_settings_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to parse settings at {}: {e}", path.display());
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::TestPathGuard;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let _guard = TestPathGuard::new(temp.path());

        let settings = load_settings();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.store, StoreBackend::Json);
    }

    #[test]
    fn parses_backend_and_log_section() {
        let settings: Settings = toml::from_str(
            r#"
            store = "sqlite"
            document_path = "/tmp/layout.db"

            [log]
            file = true
            filter = "worktabs=debug"
            "#,
        )
        .unwrap();

        assert_eq!(settings.store, StoreBackend::Sqlite);
        assert_eq!(settings.document_path, Some(PathBuf::from("/tmp/layout.db")));
        assert!(settings.log.file);
        assert_eq!(settings.log.filter.as_deref(), Some("worktabs=debug"));
    }

    #[test]
    fn invalid_toml_falls_back_to_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let _guard = TestPathGuard::new(temp.path());
        std::fs::write(temp.path().join("settings.toml"), "store = [[").unwrap();

        assert!(load_settings_from(&temp.path().join("settings.toml")).is_err());
        assert_eq!(load_settings(), Settings::default());
    }

    #[test]
    fn load_reads_settings_file_from_config_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let _guard = TestPathGuard::new(temp.path());
        std::fs::write(
            temp.path().join("settings.toml"),
            "store = \"sqlite\"\n[log]\nfile = true\n",
        )
        .unwrap();

        let settings = load_settings();
        assert_eq!(settings.store, StoreBackend::Sqlite);
        assert!(settings.log.file);
        assert_eq!(settings.log.filter, None);
    }

    #[test]
    fn document_path_defaults_per_backend() {
        let temp = tempfile::TempDir::new().unwrap();
        let _guard = TestPathGuard::new(temp.path());

        let mut settings = Settings::default();
        assert_eq!(
            settings.document_path(),
            Some(temp.path().join("layout.json"))
        );

        settings.store = StoreBackend::Sqlite;
        assert_eq!(
            settings.document_path(),
            Some(temp.path().join("worktabs.db"))
        );

        settings.document_path = Some(PathBuf::from("/elsewhere.db"));
        assert_eq!(settings.document_path(), Some(PathBuf::from("/elsewhere.db")));
    }
}
