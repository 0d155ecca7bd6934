//! Request types for the tab engine operations.

use std::path::PathBuf;

use serde::Deserialize;

use crate::model::{TabId, TabKind, WorktreeId};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTabInput {
    pub worktree_id: WorktreeId,
    #[serde(default)]
    pub parent_tab_id: Option<TabId>,
    pub name: String,
    /// Defaults to a terminal tab.
    #[serde(default)]
    pub kind: Option<TabKind>,

    // Kind-specific payload; fields that do not apply to `kind` are ignored.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,

    /// Grid shape for group tabs (default 2×2).
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub cols: Option<u32>,

    /// Explicit placement inside the parent group. Only honoured when a
    /// parent is given and both `row` and `col` are set.
    #[serde(default)]
    pub row: Option<u32>,
    #[serde(default)]
    pub col: Option<u32>,
    #[serde(default)]
    pub row_span: Option<u32>,
    #[serde(default)]
    pub col_span: Option<u32>,
}

impl CreateTabInput {
    pub fn new(worktree_id: WorktreeId, name: impl Into<String>) -> Self {
        Self {
            worktree_id,
            parent_tab_id: None,
            name: name.into(),
            kind: None,
            cwd: None,
            command: None,
            file_path: None,
            url: None,
            rows: None,
            cols: None,
            row: None,
            col: None,
            row_span: None,
            col_span: None,
        }
    }

    pub fn with_kind(mut self, kind: TabKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn under(mut self, parent: TabId) -> Self {
        self.parent_tab_id = Some(parent);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteTabInput {
    pub worktree_id: WorktreeId,
    pub tab_id: TabId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderTabsInput {
    pub worktree_id: WorktreeId,
    #[serde(default)]
    pub parent_tab_id: Option<TabId>,
    pub tab_ids: Vec<TabId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveTabInput {
    pub worktree_id: WorktreeId,
    pub tab_id: TabId,
    #[serde(default)]
    pub source_parent_tab_id: Option<TabId>,
    #[serde(default)]
    pub target_parent_tab_id: Option<TabId>,
    pub target_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSizesInput {
    pub worktree_id: WorktreeId,
    pub tab_id: TabId,
    #[serde(default)]
    pub row_sizes: Option<Vec<f64>>,
    #[serde(default)]
    pub col_sizes: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerminalCwdInput {
    pub worktree_id: WorktreeId,
    pub tab_id: TabId,
    pub cwd: PathBuf,
}
