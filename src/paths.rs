//! Centralized path resolution for application data files.
//!
//! - Settings (`~/.config/worktabs[-dev]/settings.toml`)
//! - JSON layout document (`~/.local/share/worktabs[-dev]/layout.json`)
//! - SQLite database (`~/.local/share/worktabs[-dev]/worktabs.db`)
//! - Log directory (`~/.local/share/worktabs[-dev]/`)
//!
//! Dev builds (`0.0.0-dev`) use `worktabs-dev` subdirectories to avoid
//! interfering with an installed release binary.
//!
//! ## Production Behavior
//!
//! Follows the XDG Base Directory Specification:
//! - Prefers `$XDG_CONFIG_HOME` for config, fallback to `$HOME/.config`
//! - Prefers `$XDG_DATA_HOME` for data, fallback to `$HOME/.local/share`
//!
//! ## Testing Behavior
//!
//! Tests can override path resolution using `TestPathGuard`:
//! ```ignore
//! #[test]
//! fn test_with_custom_paths() {
//!     let temp_dir = tempfile::TempDir::new().unwrap();
//!     let _guard = TestPathGuard::new(temp_dir.path());
//!
//!     // All paths now resolve under temp_dir
//!     let settings = settings_file().unwrap();
//!     assert_eq!(settings, temp_dir.path().join("settings.toml"));
//! }
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Returns "worktabs-dev" for dev builds, "worktabs" for release builds.
fn app_dir_name() -> &'static str {
    if cfg!(dev_build) {
        "worktabs-dev"
    } else {
        "worktabs"
    }
}

/// Categories of application paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Settings file: `~/.config/worktabs/settings.toml`
    Settings,
    /// JSON layout document: `~/.local/share/worktabs/layout.json`
    Document,
    /// SQLite database: `~/.local/share/worktabs/worktabs.db`
    Database,
    /// Log directory: `~/.local/share/worktabs/`
    LogDir,
}

/// Path resolution strategy (thread-local).
#[derive(Debug, PartialEq)]
enum PathStrategy {
    /// Production: Use XDG Base Directory Specification.
    Xdg,
    /// Testing: Use custom base directory for all paths.
    Override(PathBuf),
}

thread_local! {
    static PATH_STRATEGY: RefCell<PathStrategy> = const { RefCell::new(PathStrategy::Xdg) };
}

/// Resolve a path based on the current strategy.
///
/// Returns `None` if the path cannot be resolved (e.g., HOME not set in XDG mode).
pub fn resolve(kind: PathKind) -> Option<PathBuf> {
    PATH_STRATEGY.with(|strategy| {
        let s = strategy.borrow();
        match *s {
            PathStrategy::Xdg => resolve_xdg(kind),
            PathStrategy::Override(ref base) => Some(resolve_override(base, kind)),
        }
    })
}

/// `$XDG_CONFIG_HOME/worktabs` or `$HOME/.config/worktabs`.
fn config_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join(app_dir_name()));
    }
    std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config").join(app_dir_name()))
}

/// `$XDG_DATA_HOME/worktabs` or `$HOME/.local/share/worktabs`.
fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg).join(app_dir_name()));
    }
    std::env::var_os("HOME").map(|h| {
        PathBuf::from(h)
            .join(".local")
            .join("share")
            .join(app_dir_name())
    })
}

fn resolve_xdg(kind: PathKind) -> Option<PathBuf> {
    match kind {
        PathKind::Settings => config_dir().map(|d| d.join("settings.toml")),
        PathKind::Document => data_dir().map(|d| d.join("layout.json")),
        PathKind::Database => data_dir().map(|d| d.join("worktabs.db")),
        PathKind::LogDir => data_dir(),
    }
}

/// Resolve a path using a custom base directory (for testing).
fn resolve_override(base: &Path, kind: PathKind) -> PathBuf {
    match kind {
        PathKind::Settings => base.join("settings.toml"),
        PathKind::Document => base.join("layout.json"),
        PathKind::Database => base.join("worktabs.db"),
        PathKind::LogDir => base.to_path_buf(),
    }
}

/// Resolve the settings file path.
pub fn settings_file() -> Option<PathBuf> {
    resolve(PathKind::Settings)
}

/// Resolve the JSON layout document path.
pub fn document_file() -> Option<PathBuf> {
    resolve(PathKind::Document)
}

/// Resolve the database file path.
pub fn database_file() -> Option<PathBuf> {
    resolve(PathKind::Database)
}

/// Resolve the log directory path.
pub fn log_directory() -> Option<PathBuf> {
    resolve(PathKind::LogDir)
}

/// Override path resolution for all paths to use a custom base directory.
///
/// This change is thread-local and affects only the current thread.
/// Use `reset_to_xdg()` or `TestPathGuard` to restore XDG behavior.
pub fn set_test_dir(base: impl Into<PathBuf>) {
    PATH_STRATEGY.with(|strategy| {
        *strategy.borrow_mut() = PathStrategy::Override(base.into());
    });
}

/// Reset path resolution back to XDG Base Directory Specification.
pub fn reset_to_xdg() {
    PATH_STRATEGY.with(|strategy| {
        *strategy.borrow_mut() = PathStrategy::Xdg;
    });
}

/// RAII guard for test path overrides. Resets to XDG behavior when dropped.
pub struct TestPathGuard;

impl TestPathGuard {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        set_test_dir(base_dir);
        TestPathGuard
    }
}

impl Drop for TestPathGuard {
    fn drop(&mut self) {
        reset_to_xdg();
    }
}
