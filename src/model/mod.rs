//! Persisted layout document: workspaces, worktrees and the nested tab tree.
//!
//! These types are what the Persistence Gateway reads and writes. The tab tree
//! is stored nested here; structural edits go through [`crate::tree::TabForest`],
//! which flattens it into an arena for the duration of an operation.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column count used for position math on a worktree's top-level tabs.
///
/// Top-level tabs are not rendered as a grid, but their `row`/`col` are still
/// derived as if they were laid out in two columns.
pub const ROOT_COLUMNS: u32 = 2;

/// Default grid shape for a newly created group tab.
pub const DEFAULT_GROUP_ROWS: u32 = 2;
pub const DEFAULT_GROUP_COLS: u32 = 2;

/// Largest row or column count a group may be created with.
pub const MAX_GRID_DIM: u32 = 64;

/// Milliseconds since the Unix epoch.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Identifiers ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TabId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Uuid>().map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorktreeId(String);

impl WorktreeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorktreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorktreeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Geometry ────────────────────────────────────────────────────

/// A node's slot among its siblings. `order` is authoritative; `row` and
/// `col` are derived from it and the container's column count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub order: u32,
    pub row: u32,
    pub col: u32,
}

/// Number of grid cells a node occupies. Absent means 1×1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub row_span: u32,
    pub col_span: u32,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            row_span: 1,
            col_span: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: u32,
    pub cols: u32,
}

impl GridShape {
    /// Build a grid shape; zero dimensions are raised to 1.
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_ROWS, DEFAULT_GROUP_COLS)
    }
}

/// Fractional sizing of a group's rows and columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellWeights {
    pub row_weights: Vec<f64>,
    pub col_weights: Vec<f64>,
}

impl CellWeights {
    /// Equal weights for every row and column of `grid`.
    pub fn even(grid: GridShape) -> Self {
        Self {
            row_weights: even_weights(grid.rows),
            col_weights: even_weights(grid.cols),
        }
    }
}

/// `n` equal fractions, with `n` clamped to `1..=MAX_GRID_DIM`.
pub(crate) fn even_weights(n: u32) -> Vec<f64> {
    let n = n.clamp(1, MAX_GRID_DIM);
    vec![1.0 / f64::from(n); n as usize]
}

// ── Tabs ────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    #[default]
    Terminal,
    Editor,
    Browser,
    Preview,
    Group,
}

impl fmt::Display for TabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => write!(f, "terminal"),
            Self::Editor => write!(f, "editor"),
            Self::Browser => write!(f, "browser"),
            Self::Preview => write!(f, "preview"),
            Self::Group => write!(f, "group"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

/// A group tab's grid and its ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayout {
    pub grid: GridShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_weights: Option<CellWeights>,
    #[serde(default)]
    pub children: Vec<Tab>,
}

/// Kind-specific part of a tab. Only [`TabContent::Group`] can own children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TabContent {
    Terminal(TerminalPayload),
    Editor(EditorPayload),
    Browser(BrowserPayload),
    Preview(PreviewPayload),
    Group(GroupLayout),
}

impl TabContent {
    pub fn kind(&self) -> TabKind {
        match self {
            Self::Terminal(_) => TabKind::Terminal,
            Self::Editor(_) => TabKind::Editor,
            Self::Browser(_) => TabKind::Browser,
            Self::Preview(_) => TabKind::Preview,
            Self::Group(_) => TabKind::Group,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub name: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    pub created_at: u64,
    #[serde(flatten)]
    pub content: TabContent,
}

impl Tab {
    pub fn kind(&self) -> TabKind {
        self.content.kind()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.content, TabContent::Group(_))
    }

    /// Span with the 1×1 default applied.
    pub fn effective_span(&self) -> Span {
        self.span.unwrap_or_default()
    }

    pub fn group(&self) -> Option<&GroupLayout> {
        match &self.content {
            TabContent::Group(g) => Some(g),
            _ => None,
        }
    }
}

// ── Containers ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worktree {
    pub id: WorktreeId,
    pub branch: String,
    pub path: PathBuf,
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl Worktree {
    pub fn new(id: WorktreeId, branch: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            branch: branch.into(),
            path: path.into(),
            tabs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub worktrees: Vec<Worktree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_worktree_id: Option<WorktreeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab_id: Option<TabId>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Workspace {
    pub fn new(id: WorkspaceId, name: impl Into<String>) -> Self {
        let now = current_time_millis();
        Self {
            id,
            name: name.into(),
            worktrees: Vec::new(),
            active_worktree_id: None,
            active_tab_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn worktree(&self, id: &WorktreeId) -> Option<&Worktree> {
        self.worktrees.iter().find(|w| &w.id == id)
    }

    pub fn worktree_mut(&mut self, id: &WorktreeId) -> Option<&mut Worktree> {
        self.worktrees.iter_mut().find(|w| &w.id == id)
    }

    /// Stamp `updated_at`, guaranteeing it moves forward even when the clock
    /// has not advanced since the previous stamp.
    pub fn touch(&mut self) {
        self.updated_at = current_time_millis().max(self.updated_at + 1);
    }
}

/// The whole document owned by the Persistence Gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_workspace_id: Option<WorkspaceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_workspace_id: Option<WorkspaceId>,
}

impl Configuration {
    pub fn workspace(&self, id: &WorkspaceId) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| &w.id == id)
    }

    pub fn workspace_mut(&mut self, id: &WorkspaceId) -> Option<&mut Workspace> {
        self.workspaces.iter_mut().find(|w| &w.id == id)
    }
}
