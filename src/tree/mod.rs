//! Arena representation of a worktree's tab tree.
//!
//! A [`TabForest`] is built from the nested [`Tab`] sequence of one worktree,
//! mutated through id-based primitives, then turned back into nested tabs.
//! Group nodes hold their children as id sequences, so nothing in the arena
//! can be reached from two places at once.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::model::{
    BrowserPayload, CellWeights, EditorPayload, GridShape, GroupLayout, Position, PreviewPayload,
    Span, Tab, TabContent, TabId, TabKind, TerminalPayload, ROOT_COLUMNS,
};

/// The container a node sits in: the worktree's top-level list or a group tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    Root,
    Group(TabId),
}

impl From<Option<TabId>> for Parent {
    fn from(id: Option<TabId>) -> Self {
        id.map_or(Self::Root, Self::Group)
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Group(id) => write!(f, "{id}"),
        }
    }
}

/// Content of a leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Terminal(TerminalPayload),
    Editor(EditorPayload),
    Browser(BrowserPayload),
    Preview(PreviewPayload),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub grid: GridShape,
    pub cell_weights: Option<CellWeights>,
    pub children: Vec<TabId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    Leaf(Leaf),
    Container(Container),
}

/// One arena slot: the identity/position record shared by every kind, plus
/// the kind-specific body.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: TabId,
    pub name: String,
    pub position: Position,
    pub span: Option<Span>,
    pub created_at: u64,
    pub body: NodeBody,
}

impl Node {
    pub fn kind(&self) -> TabKind {
        match &self.body {
            NodeBody::Leaf(Leaf::Terminal(_)) => TabKind::Terminal,
            NodeBody::Leaf(Leaf::Editor(_)) => TabKind::Editor,
            NodeBody::Leaf(Leaf::Browser(_)) => TabKind::Browser,
            NodeBody::Leaf(Leaf::Preview(_)) => TabKind::Preview,
            NodeBody::Container(_) => TabKind::Group,
        }
    }

    pub fn container(&self) -> Option<&Container> {
        match &self.body {
            NodeBody::Container(c) => Some(c),
            NodeBody::Leaf(_) => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut Container> {
        match &mut self.body {
            NodeBody::Container(c) => Some(c),
            NodeBody::Leaf(_) => None,
        }
    }
}

/// True iff the node can own children.
pub fn is_container(node: &Node) -> bool {
    matches!(node.body, NodeBody::Container(_))
}

/// Grid coordinates for the sibling at `order` in a container with `cols` columns.
pub fn grid_position(order: u32, cols: u32) -> Position {
    let cols = cols.max(1);
    Position {
        order,
        row: order / cols,
        col: order % cols,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestError {
    #[error("duplicate tab id in layout: {0}")]
    DuplicateId(TabId),
    #[error("no group container {0}")]
    NoSuchContainer(Parent),
}

/// A broken structural invariant found by [`TabForest::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Sibling `order` values are not exactly `0..n-1` in array order.
    OrderNotContiguous {
        parent: Parent,
        id: TabId,
        expected: u32,
        found: u32,
    },
    /// `row`/`col` disagree with `order` and the container's columns.
    PositionMismatch {
        id: TabId,
        expected: Position,
        found: Position,
    },
    /// A node in the arena that no container references.
    Unreachable(TabId),
    /// The same id appears more than once in a workspace.
    DuplicateId(TabId),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderNotContiguous {
                parent,
                id,
                expected,
                found,
            } => write!(
                f,
                "tab {id} under {parent} has order {found}, expected {expected}"
            ),
            Self::PositionMismatch {
                id,
                expected,
                found,
            } => write!(
                f,
                "tab {id} at ({}, {}), expected ({}, {})",
                found.row, found.col, expected.row, expected.col
            ),
            Self::Unreachable(id) => write!(f, "tab {id} is not reachable from any container"),
            Self::DuplicateId(id) => write!(f, "tab id {id} is used more than once"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabForest {
    nodes: HashMap<TabId, Node>,
    roots: Vec<TabId>,
}

impl TabForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a nested tab sequence into an arena. Fails on a repeated id.
    pub fn from_tabs(tabs: Vec<Tab>) -> Result<Self, ForestError> {
        let mut forest = Self::new();
        for tab in tabs {
            let id = forest.insert_tree(tab)?;
            forest.roots.push(id);
        }
        Ok(forest)
    }

    fn insert_tree(&mut self, tab: Tab) -> Result<TabId, ForestError> {
        let id = tab.id;
        if self.nodes.contains_key(&id) {
            return Err(ForestError::DuplicateId(id));
        }

        let body = match tab.content {
            TabContent::Terminal(p) => NodeBody::Leaf(Leaf::Terminal(p)),
            TabContent::Editor(p) => NodeBody::Leaf(Leaf::Editor(p)),
            TabContent::Browser(p) => NodeBody::Leaf(Leaf::Browser(p)),
            TabContent::Preview(p) => NodeBody::Leaf(Leaf::Preview(p)),
            TabContent::Group(group) => {
                // Reserve the slot first so a child reusing the group's id is caught.
                self.nodes.insert(id, placeholder(id));
                let mut children = Vec::with_capacity(group.children.len());
                for child in group.children {
                    children.push(self.insert_tree(child)?);
                }
                NodeBody::Container(Container {
                    grid: group.grid,
                    cell_weights: group.cell_weights,
                    children,
                })
            }
        };

        self.nodes.insert(
            id,
            Node {
                id,
                name: tab.name,
                position: tab.position,
                span: tab.span,
                created_at: tab.created_at,
                body,
            },
        );
        Ok(id)
    }

    /// Rebuild the nested tab sequence in container order.
    pub fn into_tabs(mut self) -> Vec<Tab> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .filter_map(|id| self.take_tree(id))
            .collect()
    }

    fn take_tree(&mut self, id: TabId) -> Option<Tab> {
        let node = self.nodes.remove(&id)?;
        let content = match node.body {
            NodeBody::Leaf(Leaf::Terminal(p)) => TabContent::Terminal(p),
            NodeBody::Leaf(Leaf::Editor(p)) => TabContent::Editor(p),
            NodeBody::Leaf(Leaf::Browser(p)) => TabContent::Browser(p),
            NodeBody::Leaf(Leaf::Preview(p)) => TabContent::Preview(p),
            NodeBody::Container(c) => TabContent::Group(GroupLayout {
                grid: c.grid,
                cell_weights: c.cell_weights,
                children: c
                    .children
                    .into_iter()
                    .filter_map(|child| self.take_tree(child))
                    .collect(),
            }),
        };
        Some(Tab {
            id: node.id,
            name: node.name,
            position: node.position,
            span: node.span,
            created_at: node.created_at,
            content,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[TabId] {
        &self.roots
    }

    pub fn find(&self, id: TabId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn find_mut(&mut self, id: TabId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Depth-first search for the container whose immediate children include `id`.
    pub fn find_parent(&self, id: TabId) -> Option<Parent> {
        if self.roots.contains(&id) {
            return Some(Parent::Root);
        }
        let mut stack: Vec<TabId> = self.roots.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            let Some(container) = self.nodes.get(&current).and_then(Node::container) else {
                continue;
            };
            if container.children.contains(&id) {
                return Some(Parent::Group(current));
            }
            stack.extend(container.children.iter().rev().copied());
        }
        None
    }

    /// Child ids of `parent`, or `None` if it is not an existing group.
    pub fn children(&self, parent: Parent) -> Option<&[TabId]> {
        match parent {
            Parent::Root => Some(&self.roots),
            Parent::Group(id) => self
                .nodes
                .get(&id)
                .and_then(Node::container)
                .map(|c| c.children.as_slice()),
        }
    }

    fn children_mut(&mut self, parent: Parent) -> Option<&mut Vec<TabId>> {
        match parent {
            Parent::Root => Some(&mut self.roots),
            Parent::Group(id) => self
                .nodes
                .get_mut(&id)
                .and_then(Node::container_mut)
                .map(|c| &mut c.children),
        }
    }

    /// Column count used for position math under `parent`.
    pub fn columns(&self, parent: Parent) -> Option<u32> {
        match parent {
            Parent::Root => Some(ROOT_COLUMNS),
            Parent::Group(id) => self
                .nodes
                .get(&id)
                .and_then(Node::container)
                .map(|c| c.grid.cols),
        }
    }

    /// Reassign `order`, `row` and `col` of every child of `parent` from its
    /// current array index. Membership is never changed.
    pub fn recalculate(&mut self, parent: Parent) {
        let (Some(children), Some(cols)) = (self.children(parent), self.columns(parent)) else {
            return;
        };
        let children = children.to_vec();
        for (index, child) in children.into_iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.position = grid_position(index as u32, cols);
            }
        }
    }

    /// Add `tab` (and anything nested in it) at the end of `parent`'s
    /// children. Positions are stored exactly as given.
    pub fn insert(&mut self, parent: Parent, tab: Tab) -> Result<TabId, ForestError> {
        if self.children(parent).is_none() {
            return Err(ForestError::NoSuchContainer(parent));
        }
        let id = self.insert_tree(tab)?;
        if let Some(children) = self.children_mut(parent) {
            children.push(id);
        }
        Ok(id)
    }

    /// Remove `id` and its whole subtree. The container it was removed from
    /// is recalculated before returning. Returns false if `id` is absent.
    pub fn remove(&mut self, id: TabId) -> bool {
        let Some(parent) = self.find_parent(id) else {
            return false;
        };
        if self.detach(parent, id).is_none() {
            return false;
        }
        self.recalculate(parent);
        for gone in self.subtree(id) {
            self.nodes.remove(&gone);
        }
        true
    }

    /// Unlink `id` from `parent`'s children without touching the arena.
    /// Returns the index it occupied.
    pub fn detach(&mut self, parent: Parent, id: TabId) -> Option<usize> {
        let children = self.children_mut(parent)?;
        let index = children.iter().position(|c| *c == id)?;
        children.remove(index);
        Some(index)
    }

    /// Link an existing node into `parent`'s children at `index`, clamped to
    /// the current length. Returns the index actually used.
    pub fn attach(&mut self, parent: Parent, id: TabId, index: usize) -> Option<usize> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        let children = self.children_mut(parent)?;
        let index = index.min(children.len());
        children.insert(index, id);
        Some(index)
    }

    /// Replace `parent`'s children with `ordered`. Callers guarantee `ordered`
    /// is a permutation of the current children.
    pub fn set_children(&mut self, parent: Parent, ordered: Vec<TabId>) -> bool {
        match self.children_mut(parent) {
            Some(children) => {
                *children = ordered;
                true
            }
            None => false,
        }
    }

    /// `id` followed by every node beneath it, depth-first.
    pub fn subtree(&self, id: TabId) -> Vec<TabId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            if let Some(container) = node.container() {
                stack.extend(container.children.iter().rev().copied());
            }
        }
        out
    }

    /// True if `id` is `ancestor` or lies anywhere beneath it.
    pub fn is_descendant(&self, ancestor: TabId, id: TabId) -> bool {
        self.subtree(ancestor).contains(&id)
    }

    /// Verify order contiguity, derived positions and reachability.
    pub fn check(&self) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        let mut reached = HashSet::new();
        let mut pending = vec![Parent::Root];

        while let Some(parent) = pending.pop() {
            let (Some(children), Some(cols)) = (self.children(parent), self.columns(parent))
            else {
                continue;
            };
            for (index, child) in children.iter().enumerate() {
                let Some(node) = self.nodes.get(child) else {
                    continue;
                };
                reached.insert(*child);
                let expected = index as u32;
                if node.position.order != expected {
                    violations.push(Violation::OrderNotContiguous {
                        parent,
                        id: *child,
                        expected,
                        found: node.position.order,
                    });
                }
                let derived = grid_position(node.position.order, cols);
                if derived != node.position {
                    violations.push(Violation::PositionMismatch {
                        id: *child,
                        expected: derived,
                        found: node.position,
                    });
                }
                if is_container(node) {
                    pending.push(Parent::Group(*child));
                }
            }
        }

        let mut unreachable: Vec<TabId> = self
            .nodes
            .keys()
            .filter(|id| !reached.contains(*id))
            .copied()
            .collect();
        unreachable.sort();
        violations.extend(unreachable.into_iter().map(Violation::Unreachable));

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn placeholder(id: TabId) -> Node {
    Node {
        id,
        name: String::new(),
        position: Position::default(),
        span: None,
        created_at: 0,
        body: NodeBody::Leaf(Leaf::Terminal(TerminalPayload::default())),
    }
}
