//! Tab Tree Engine: structural operations on a workspace's tab layout.
//!
//! Every mutating operation runs the same cycle while holding the workspace's
//! lock: read the configuration, locate the workspace and worktree, flatten
//! the worktree's tabs into a [`TabForest`], validate, mutate, recalculate
//! positions, rebuild the nested tabs, stamp `updated_at` and write the whole
//! configuration back. Validation failures return before anything is written.

pub mod error;
pub mod input;
pub mod response;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::model::{
    current_time_millis, BrowserPayload, CellWeights, EditorPayload, GridShape, GroupLayout,
    Position, PreviewPayload, Span, Tab, TabContent, TabId, TabKind, TerminalPayload, Workspace,
    WorkspaceId, Worktree, WorktreeId, DEFAULT_GROUP_COLS, DEFAULT_GROUP_ROWS, MAX_GRID_DIM,
    ROOT_COLUMNS,
};
use crate::store::ConfigStore;
use crate::tree::{grid_position, is_container, Leaf, NodeBody, Parent, TabForest, Violation};

pub use error::{Entity, ErrorKind, TabError};
pub use input::{
    CreateTabInput, DeleteTabInput, GridSizesInput, MoveTabInput, ReorderTabsInput,
    TerminalCwdInput,
};
pub use response::{CreatedTab, Response};

pub type Result<T> = std::result::Result<T, TabError>;

pub struct TabEngine<S> {
    store: S,
    /// One mutex per workspace id; held for a whole read-modify-write cycle.
    locks: Mutex<HashMap<WorkspaceId, Arc<Mutex<()>>>>,
}

impl<S: ConfigStore> TabEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn workspace_lock(&self, workspace_id: &WorkspaceId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(workspace_id.clone()).or_default())
    }

    /// Run `f` while holding the workspace's lock. An entry created for a
    /// workspace that turns out not to exist is dropped again afterwards.
    fn with_workspace_lock<T>(
        &self,
        workspace_id: &WorkspaceId,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let lock = self.workspace_lock(workspace_id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        if matches!(
            result,
            Err(TabError::NotFound {
                entity: Entity::Workspace,
                ..
            })
        ) {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks
                .get(workspace_id)
                .is_some_and(|l| Arc::strong_count(l) == 1)
            {
                locks.remove(workspace_id);
            }
        }
        result
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run `op` against one worktree's forest and persist the result.
    ///
    /// The worktree's tabs are moved into the forest for the duration of `op`,
    /// so `op` must reach them through the forest, not through the workspace.
    fn mutate<T>(
        &self,
        workspace_id: &WorkspaceId,
        worktree_id: &WorktreeId,
        op: impl FnOnce(&mut TabForest, &mut Workspace) -> Result<T>,
    ) -> Result<T> {
        self.with_workspace_lock(workspace_id, || {
            let mut config = self.store.read()?;
            let workspace = config
                .workspace_mut(workspace_id)
                .ok_or_else(|| TabError::not_found(Entity::Workspace, workspace_id))?;
            let index = workspace
                .worktrees
                .iter()
                .position(|w| &w.id == worktree_id)
                .ok_or_else(|| TabError::not_found(Entity::Worktree, worktree_id))?;

            let tabs = std::mem::take(&mut workspace.worktrees[index].tabs);
            let mut forest = TabForest::from_tabs(tabs).map_err(anyhow::Error::from)?;

            let value = op(&mut forest, workspace)?;

            workspace.worktrees[index].tabs = forest.into_tabs();
            workspace.touch();
            self.store.write(&config)?;

            Ok(value)
        })
    }

    // ── Structural operations ───────────────────────────────────

    /// Create a tab at the top level of a worktree or inside a group.
    pub fn create_tab(&self, workspace_id: &WorkspaceId, input: CreateTabInput) -> Result<Tab> {
        let worktree_id = input.worktree_id.clone();
        let tab = self.mutate(workspace_id, &worktree_id, |forest, _| {
            let parent = Parent::from(input.parent_tab_id);
            if let Parent::Group(pid) = parent {
                let node = forest
                    .find(pid)
                    .ok_or_else(|| TabError::not_found(Entity::Tab, pid))?;
                if !is_container(node) {
                    return Err(TabError::InvalidParent(pid));
                }
            }

            let cols = forest.columns(parent).unwrap_or(ROOT_COLUMNS);
            let siblings = forest.children(parent).map_or(0, <[TabId]>::len) as u32;
            let tab = build_tab(&input, parent, cols, siblings)?;

            forest
                .insert(parent, tab.clone())
                .map_err(anyhow::Error::from)?;
            Ok(tab)
        })?;

        info!(
            "Created {} tab {} in worktree {} of workspace {}",
            tab.kind(),
            tab.id,
            worktree_id,
            workspace_id
        );
        Ok(tab)
    }

    /// Delete a tab and everything nested in it.
    pub fn delete_tab(&self, workspace_id: &WorkspaceId, input: DeleteTabInput) -> Result<()> {
        let tab_id = input.tab_id;
        let removed = self.mutate(workspace_id, &input.worktree_id, |forest, workspace| {
            if !forest.contains(tab_id) {
                return Err(TabError::not_found(Entity::Tab, tab_id));
            }
            let subtree = forest.subtree(tab_id);
            if !forest.remove(tab_id) {
                return Err(TabError::not_found(Entity::Tab, tab_id));
            }
            if workspace
                .active_tab_id
                .is_some_and(|active| subtree.contains(&active))
            {
                workspace.active_tab_id = None;
            }
            Ok(subtree.len())
        })?;

        info!("Deleted tab {tab_id} ({removed} tabs removed) from workspace {workspace_id}");
        Ok(())
    }

    /// Put the children of a container into the order given by `tab_ids`.
    pub fn reorder_tabs(&self, workspace_id: &WorkspaceId, input: ReorderTabsInput) -> Result<()> {
        let parent = Parent::from(input.parent_tab_id);
        self.mutate(workspace_id, &input.worktree_id, |forest, _| {
            require_container(forest, parent)?;
            let current = forest.children(parent).unwrap_or_default().to_vec();

            let resolved: Vec<TabId> = input
                .tab_ids
                .iter()
                .filter(|id| current.contains(id))
                .copied()
                .collect();
            let mut seen = HashSet::with_capacity(resolved.len());
            let distinct = resolved.iter().all(|id| seen.insert(*id));

            if resolved.len() != current.len() || !distinct {
                return Err(TabError::CountMismatch {
                    expected: current.len(),
                    actual: resolved.len(),
                });
            }

            forest.set_children(parent, resolved);
            forest.recalculate(parent);
            Ok(())
        })?;

        debug!("Reordered children of {parent} in workspace {workspace_id}");
        Ok(())
    }

    /// Move a tab within its sibling list or into another container.
    pub fn move_tab(&self, workspace_id: &WorkspaceId, input: MoveTabInput) -> Result<()> {
        let source = Parent::from(input.source_parent_tab_id);
        let target = Parent::from(input.target_parent_tab_id);
        let tab_id = input.tab_id;

        self.mutate(workspace_id, &input.worktree_id, |forest, _| {
            require_container(forest, source)?;
            require_container(forest, target)?;

            let in_source = forest
                .children(source)
                .is_some_and(|children| children.contains(&tab_id));
            if !in_source {
                return Err(TabError::not_found(Entity::Tab, tab_id));
            }
            if let Parent::Group(target_id) = target {
                if forest.is_descendant(tab_id, target_id) {
                    return Err(TabError::InvalidParent(target_id));
                }
            }

            forest
                .detach(source, tab_id)
                .ok_or_else(|| TabError::not_found(Entity::Tab, tab_id))?;
            forest
                .attach(target, tab_id, input.target_index)
                .ok_or_else(|| anyhow!("failed to attach tab {tab_id} to {target}"))?;

            forest.recalculate(source);
            if target != source {
                forest.recalculate(target);
            }
            Ok(())
        })?;

        debug!("Moved tab {tab_id} from {source} to {target} in workspace {workspace_id}");
        Ok(())
    }

    /// Overwrite the row and/or column weights of a group tab.
    pub fn update_tab_grid_sizes(
        &self,
        workspace_id: &WorkspaceId,
        input: GridSizesInput,
    ) -> Result<()> {
        let tab_id = input.tab_id;
        self.mutate(workspace_id, &input.worktree_id, |forest, _| {
            let node = forest
                .find_mut(tab_id)
                .ok_or_else(|| TabError::not_found(Entity::Tab, tab_id))?;
            let container = node
                .container_mut()
                .ok_or(TabError::NotAContainer(tab_id))?;

            let grid = container.grid;
            let weights = container
                .cell_weights
                .get_or_insert_with(|| CellWeights::even(grid));
            if let Some(rows) = input.row_sizes {
                weights.row_weights = rows;
            }
            if let Some(cols) = input.col_sizes {
                weights.col_weights = cols;
            }
            Ok(())
        })?;

        debug!("Resized grid of tab {tab_id} in workspace {workspace_id}");
        Ok(())
    }

    /// Record a terminal tab's working directory. Returns whether the change
    /// was persisted.
    pub fn update_terminal_cwd(&self, workspace_id: &WorkspaceId, input: TerminalCwdInput) -> bool {
        let tab_id = input.tab_id;
        let result = self.mutate(workspace_id, &input.worktree_id, |forest, _| {
            let node = forest
                .find_mut(tab_id)
                .ok_or_else(|| TabError::not_found(Entity::Tab, tab_id))?;
            match &mut node.body {
                NodeBody::Leaf(Leaf::Terminal(payload)) => {
                    payload.cwd = Some(input.cwd);
                    Ok(())
                }
                _ => Err(TabError::not_found(Entity::TerminalTab, tab_id)),
            }
        });

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to update cwd of tab {tab_id}: {e}");
                false
            }
        }
    }

    // ── Bootstrap and queries ───────────────────────────────────

    /// Return the workspace with this id, creating an empty one if needed.
    pub fn ensure_workspace(&self, workspace_id: &WorkspaceId, name: &str) -> Result<Workspace> {
        let lock = self.workspace_lock(workspace_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut config = self.store.read()?;
        if let Some(existing) = config.workspace(workspace_id) {
            return Ok(existing.clone());
        }

        let workspace = Workspace::new(workspace_id.clone(), name);
        config.workspaces.push(workspace.clone());
        config
            .active_workspace_id
            .get_or_insert_with(|| workspace_id.clone());
        config.last_opened_workspace_id = Some(workspace_id.clone());
        self.store.write(&config)?;

        info!("Created workspace {workspace_id}");
        Ok(workspace)
    }

    /// Add an empty worktree to a workspace.
    pub fn add_worktree(&self, workspace_id: &WorkspaceId, worktree: Worktree) -> Result<()> {
        let worktree_id = worktree.id.clone();
        self.with_workspace_lock(workspace_id, || {
            let mut config = self.store.read()?;
            let workspace = config
                .workspace_mut(workspace_id)
                .ok_or_else(|| TabError::not_found(Entity::Workspace, workspace_id))?;
            if workspace.worktree(&worktree.id).is_some() {
                return Err(anyhow!("Worktree {} already exists", worktree.id).into());
            }

            workspace
                .active_worktree_id
                .get_or_insert_with(|| worktree_id.clone());
            workspace.worktrees.push(worktree);
            workspace.touch();
            self.store.write(&config)?;
            Ok(())
        })?;

        info!("Added worktree {worktree_id} to workspace {workspace_id}");
        Ok(())
    }

    pub fn list_tabs(
        &self,
        workspace_id: &WorkspaceId,
        worktree_id: &WorktreeId,
    ) -> Result<Vec<Tab>> {
        let config = self.store.read()?;
        let workspace = config
            .workspace(workspace_id)
            .ok_or_else(|| TabError::not_found(Entity::Workspace, workspace_id))?;
        let worktree = workspace
            .worktree(worktree_id)
            .ok_or_else(|| TabError::not_found(Entity::Worktree, worktree_id))?;
        Ok(worktree.tabs.clone())
    }

    pub fn get_tab(
        &self,
        workspace_id: &WorkspaceId,
        worktree_id: &WorktreeId,
        tab_id: TabId,
    ) -> Result<Tab> {
        let tabs = self.list_tabs(workspace_id, worktree_id)?;
        find_tab(&tabs, tab_id)
            .cloned()
            .ok_or_else(|| TabError::not_found(Entity::Tab, tab_id))
    }

    /// Every structural invariant broken anywhere in the workspace, keyed by
    /// the worktree it was found in. Empty means the layout is consistent.
    pub fn check_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<(WorktreeId, Violation)>> {
        let config = self.store.read()?;
        let workspace = config
            .workspace(workspace_id)
            .ok_or_else(|| TabError::not_found(Entity::Workspace, workspace_id))?;

        let mut findings = Vec::new();
        let mut seen = HashSet::new();
        for worktree in &workspace.worktrees {
            let mut ids = Vec::new();
            collect_ids(&worktree.tabs, &mut ids);
            for id in ids {
                if !seen.insert(id) {
                    findings.push((worktree.id.clone(), Violation::DuplicateId(id)));
                }
            }

            // Duplicates were reported above; a forest can only be checked without them.
            if let Ok(forest) = TabForest::from_tabs(worktree.tabs.clone()) {
                if let Err(violations) = forest.check() {
                    findings.extend(violations.into_iter().map(|v| (worktree.id.clone(), v)));
                }
            }
        }
        Ok(findings)
    }
}

fn require_container(forest: &TabForest, parent: Parent) -> Result<()> {
    let Parent::Group(id) = parent else {
        return Ok(());
    };
    match forest.find(id) {
        None => Err(TabError::not_found(Entity::Tab, id)),
        Some(node) if !is_container(node) => Err(TabError::NotAContainer(id)),
        Some(_) => Ok(()),
    }
}

/// Build a new tab for `input`. With a group parent and both `row` and `col`
/// set, the tab is placed explicitly; otherwise it takes the next free order.
fn build_tab(input: &CreateTabInput, parent: Parent, cols: u32, siblings: u32) -> Result<Tab> {
    let requested_span = (input.row_span.is_some() || input.col_span.is_some()).then(|| Span {
        row_span: input.row_span.unwrap_or(1),
        col_span: input.col_span.unwrap_or(1),
    });

    let position = match (parent, input.row, input.col) {
        (Parent::Group(_), Some(row), Some(col)) => {
            let order = row
                .checked_mul(cols)
                .and_then(|o| o.checked_add(col))
                .ok_or_else(|| {
                    TabError::InvalidGrid(format!(
                        "cell ({row}, {col}) is outside a {cols}-column grid"
                    ))
                })?;
            Position { order, row, col }
        }
        _ => grid_position(siblings, cols),
    };

    let content = match input.kind.unwrap_or_default() {
        TabKind::Terminal => TabContent::Terminal(TerminalPayload {
            cwd: input.cwd.clone(),
            command: input.command.clone(),
        }),
        TabKind::Editor => TabContent::Editor(EditorPayload {
            file_path: input.file_path.clone(),
        }),
        TabKind::Browser => TabContent::Browser(BrowserPayload {
            url: input.url.clone(),
        }),
        TabKind::Preview => TabContent::Preview(PreviewPayload {
            file_path: input.file_path.clone(),
        }),
        TabKind::Group => {
            let rows = grid_dimension("rows", input.rows, DEFAULT_GROUP_ROWS)?;
            let cols = grid_dimension("cols", input.cols, DEFAULT_GROUP_COLS)?;
            let grid = GridShape::new(rows, cols);
            TabContent::Group(GroupLayout {
                grid,
                cell_weights: Some(CellWeights::even(grid)),
                children: Vec::new(),
            })
        }
    };

    Ok(Tab {
        id: TabId::new(),
        name: input.name.clone(),
        position,
        span: requested_span,
        created_at: current_time_millis(),
        content,
    })
}

fn grid_dimension(field: &str, requested: Option<u32>, default: u32) -> Result<u32> {
    match requested {
        Some(n) if n > MAX_GRID_DIM => Err(TabError::InvalidGrid(format!(
            "{field} {n} exceeds the maximum of {MAX_GRID_DIM}"
        ))),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

/// Depth-first search of a nested tab sequence.
pub fn find_tab(tabs: &[Tab], id: TabId) -> Option<&Tab> {
    for tab in tabs {
        if tab.id == id {
            return Some(tab);
        }
        if let TabContent::Group(group) = &tab.content {
            if let Some(found) = find_tab(&group.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_ids(tabs: &[Tab], out: &mut Vec<TabId>) {
    for tab in tabs {
        out.push(tab.id);
        if let TabContent::Group(group) = &tab.content {
            collect_ids(&group.children, out);
        }
    }
}
