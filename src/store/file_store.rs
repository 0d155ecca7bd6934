use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::ConfigStore;
use crate::model::Configuration;

/// Load the configuration from disk. Returns the default configuration if the
/// file doesn't exist.
///
/// # Errors
///
/// Returns an error if the file exists but can't be read or parsed.
pub fn load_configuration(path: &Path) -> io::Result<Configuration> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str::<Configuration>(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse layout document: {}", e),
            )
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Configuration::default()),
        Err(e) => Err(e),
    }
}

/// Save the configuration to disk atomically.
///
/// Uses a temporary file with PID suffix and atomic rename so a reader never
/// sees a half-written document.
///
/// # Errors
///
/// Returns an error if the write fails (e.g., disk full, permission denied).
pub fn save_configuration(path: &Path, config: &Configuration) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let serialized = serde_json::to_string_pretty(config)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let temp_path = PathBuf::from(format!("{}.tmp.{}", path.display(), std::process::id()));

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    debug!("Saved layout document to {}", path.display());

    Ok(())
}

/// JSON document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileStore {
    fn read(&self) -> Result<Configuration> {
        load_configuration(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))
    }

    fn write(&self, config: &Configuration) -> Result<()> {
        save_configuration(&self.path, config)
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Workspace, WorkspaceId, Worktree, WorktreeId};
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        let config = load_configuration(&path).unwrap();
        assert!(config.workspaces.is_empty());
    }

    #[test]
    fn save_then_load_preserves_workspaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("layout.json");

        let mut workspace = Workspace::new(WorkspaceId::from("ws"), "Main");
        workspace.worktrees.push(Worktree::new(
            WorktreeId::from("wt"),
            "feature",
            "/repo/.git/wt/feature",
        ));
        let mut original = Configuration::default();
        original.active_workspace_id = Some(workspace.id.clone());
        original.workspaces.push(workspace);

        save_configuration(&path, &original).unwrap();
        let loaded = load_configuration(&path).unwrap();

        assert_eq!(loaded, original);
    }

    #[test]
    fn save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("layout.json");

        save_configuration(&path, &Configuration::default()).unwrap();

        assert!(path.exists());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("layout.json");

        save_configuration(&path, &Configuration::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn invalid_json_content_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_configuration(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn file_store_reports_path_in_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        fs::write(&path, "42").unwrap();

        let store = FileStore::new(&path);
        let err = store.read().unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
    }
}
