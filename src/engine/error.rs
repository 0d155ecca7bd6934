use std::fmt;

use serde::Serialize;

use crate::model::TabId;

/// What kind of thing a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Workspace,
    Worktree,
    Tab,
    TerminalTab,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workspace => write!(f, "Workspace"),
            Self::Worktree => write!(f, "Worktree"),
            Self::Tab => write!(f, "Tab"),
            Self::TerminalTab => write!(f, "Terminal tab"),
        }
    }
}

/// Machine-readable category of a [`TabError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidParent,
    NotAContainer,
    CountMismatch,
    InvalidGrid,
    Unexpected,
}

/// Failure of a tab engine operation. Every variant except `Unexpected` is
/// raised before anything is mutated or persisted.
#[derive(Debug, thiserror::Error)]
pub enum TabError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("Parent tab {0} is not a group")]
    InvalidParent(TabId),

    #[error("Tab {0} is not a group")]
    NotAContainer(TabId),

    #[error("Expected {expected} tab ids, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl TabError {
    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidParent(_) => ErrorKind::InvalidParent,
            Self::NotAContainer(_) => ErrorKind::NotAContainer,
            Self::CountMismatch { .. } => ErrorKind::CountMismatch,
            Self::InvalidGrid(_) => ErrorKind::InvalidGrid,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_missing_entity() {
        let err = TabError::not_found(Entity::Worktree, "wt-1");
        assert_eq!(err.to_string(), "Worktree not found: wt-1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn count_mismatch_message() {
        let err = TabError::CountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Expected 3 tab ids, got 2");
    }

    #[test]
    fn invalid_grid_message() {
        let err = TabError::InvalidGrid("rows 100 exceeds 64".to_string());
        assert_eq!(err.to_string(), "Invalid grid: rows 100 exceeds 64");
        assert_eq!(err.kind(), ErrorKind::InvalidGrid);
    }

    #[test]
    fn unexpected_wraps_anyhow() {
        let err: TabError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotAContainer).unwrap();
        assert_eq!(json, "\"not_a_container\"");
    }
}
