/// Integration tests running the tab engine against the on-disk stores.
///
/// Each test drives operations through one engine, then opens a fresh store
/// on the same path to verify what a second process would see.
use std::path::Path;

use tempfile::TempDir;
use worktabs::engine::{
    CreateTabInput, DeleteTabInput, MoveTabInput, ReorderTabsInput, TabEngine,
};
use worktabs::model::{TabContent, TabId, TabKind, WorkspaceId, Worktree, WorktreeId};
use worktabs::paths::TestPathGuard;
use worktabs::settings::{Settings, StoreBackend};
use worktabs::store::{self, ConfigStore, FileStore, SqliteStore};

fn ws() -> WorkspaceId {
    WorkspaceId::from("ws")
}

fn wt() -> WorktreeId {
    WorktreeId::from("wt")
}

fn bootstrap<S: ConfigStore>(engine: &TabEngine<S>) {
    engine.ensure_workspace(&ws(), "Workspace").unwrap();
    engine
        .add_worktree(&ws(), Worktree::new(wt(), "main", "/repo"))
        .unwrap();
}

/// Build a group holding three terminals, reorder it, then move one tab out.
fn run_scenario<S: ConfigStore>(engine: &TabEngine<S>) {
    bootstrap(engine);

    let mut input = CreateTabInput::new(wt(), "grid").with_kind(TabKind::Group);
    input.cols = Some(2);
    let grid = engine.create_tab(&ws(), input).unwrap();

    let ids: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            engine
                .create_tab(&ws(), CreateTabInput::new(wt(), name).under(grid.id))
                .unwrap()
                .id
        })
        .collect();

    engine
        .reorder_tabs(
            &ws(),
            ReorderTabsInput {
                worktree_id: wt(),
                parent_tab_id: Some(grid.id),
                tab_ids: vec![ids[2], ids[0], ids[1]],
            },
        )
        .unwrap();

    engine
        .move_tab(
            &ws(),
            MoveTabInput {
                worktree_id: wt(),
                tab_id: ids[0],
                source_parent_tab_id: Some(grid.id),
                target_parent_tab_id: None,
                target_index: 0,
            },
        )
        .unwrap();
}

fn assert_scenario_persisted(store: &dyn ConfigStore) {
    let config = store.read().unwrap();
    let workspace = config.workspace(&ws()).unwrap();
    let tabs = &workspace.worktree(&wt()).unwrap().tabs;

    let names: Vec<_> = tabs.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["a", "grid"]);
    assert_eq!(tabs[1].position.order, 1);
    assert_eq!(tabs[1].position.col, 1);

    let grid = tabs[1].group().unwrap();
    let names: Vec<_> = grid.children.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["c", "b"]);
    assert_eq!(grid.children[1].position.order, 1);
    assert_eq!(grid.children[1].position.col, 1);
}

#[test]
fn json_store_persists_across_instances() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("layout.json");

    run_scenario(&TabEngine::new(FileStore::new(&path)));

    assert_scenario_persisted(&FileStore::new(&path));
}

#[test]
fn sqlite_store_persists_across_instances() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("worktabs.db");

    run_scenario(&TabEngine::new(SqliteStore::open(&path).unwrap()));

    assert_scenario_persisted(&SqliteStore::open(&path).unwrap());
}

#[test]
fn json_document_uses_tagged_tab_kinds() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("layout.json");
    let engine = TabEngine::new(FileStore::new(&path));
    bootstrap(&engine);

    let grid = engine
        .create_tab(
            &ws(),
            CreateTabInput::new(wt(), "grid").with_kind(TabKind::Group),
        )
        .unwrap();
    let mut input = CreateTabInput::new(wt(), "shell").under(grid.id);
    input.cwd = Some("/repo/src".into());
    engine.create_tab(&ws(), input).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let tab = &raw["workspaces"][0]["worktrees"][0]["tabs"][0];
    assert_eq!(tab["type"], "group");
    assert_eq!(tab["grid"]["cols"], 2);
    assert_eq!(tab["children"][0]["type"], "terminal");
    assert_eq!(tab["children"][0]["cwd"], "/repo/src");
}

#[test]
fn failed_operation_leaves_document_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("layout.json");
    let engine = TabEngine::new(FileStore::new(&path));
    bootstrap(&engine);
    let leaf = engine
        .create_tab(&ws(), CreateTabInput::new(wt(), "leaf"))
        .unwrap();
    let before = std::fs::read(&path).unwrap();

    assert!(engine
        .create_tab(&ws(), CreateTabInput::new(wt(), "child").under(leaf.id))
        .is_err());
    assert!(engine
        .delete_tab(
            &ws(),
            DeleteTabInput {
                worktree_id: wt(),
                tab_id: TabId::new(),
            },
        )
        .is_err());

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn sqlite_writes_leave_audit_trail() {
    let store = SqliteStore::open_in_memory().unwrap();
    let engine = TabEngine::new(store);
    bootstrap(&engine);
    engine
        .create_tab(&ws(), CreateTabInput::new(wt(), "a"))
        .unwrap();

    let entries = engine
        .store()
        .audit_log(None, None, 50)
        .unwrap();
    let actions: Vec<_> = entries
        .iter()
        .map(|e| (e.entity_type.as_str(), e.action.as_str()))
        .collect();

    assert!(actions.contains(&("workspace", "created")));
    assert!(actions.contains(&("worktree", "created")));
    assert!(actions.contains(&("workspace", "updated")));
}

#[test]
fn settings_select_backend_and_default_path() {
    let temp_dir = TempDir::new().unwrap();
    let _guard = TestPathGuard::new(temp_dir.path());

    let settings = Settings {
        store: StoreBackend::Sqlite,
        ..Settings::default()
    };
    let path = settings.document_path().unwrap();
    assert_eq!(path, temp_dir.path().join("worktabs.db"));

    let engine = TabEngine::new(store::open(&settings, &path).unwrap());
    bootstrap(&engine);
    assert!(Path::new(&path).exists());
}

#[test]
fn terminal_cwd_survives_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("layout.json");
    let engine = TabEngine::new(FileStore::new(&path));
    bootstrap(&engine);
    let shell = engine
        .create_tab(&ws(), CreateTabInput::new(wt(), "shell"))
        .unwrap();

    assert!(engine.update_terminal_cwd(
        &ws(),
        worktabs::engine::TerminalCwdInput {
            worktree_id: wt(),
            tab_id: shell.id,
            cwd: "/elsewhere".into(),
        }
    ));

    let reloaded = TabEngine::new(FileStore::new(&path));
    let tab = reloaded.get_tab(&ws(), &wt(), shell.id).unwrap();
    match tab.content {
        TabContent::Terminal(payload) => {
            assert_eq!(payload.cwd.as_deref(), Some(Path::new("/elsewhere")))
        }
        other => panic!("expected terminal, got {other:?}"),
    }
}
