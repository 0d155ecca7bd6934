//! worktabs: persisted grid-of-tabs layouts for worktree-based workspaces.

pub mod engine;
pub mod model;
pub mod paths;
pub mod settings;
pub mod store;
pub mod tree;
