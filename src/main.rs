//! worktabs command-line front-end.
//!
//! Every subcommand runs one engine operation against the configured store
//! and prints the tagged JSON result on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use worktabs::engine::{
    CreateTabInput, CreatedTab, DeleteTabInput, GridSizesInput, MoveTabInput, ReorderTabsInput,
    Response, TabEngine, TerminalCwdInput,
};
use worktabs::model::{TabId, TabKind, WorkspaceId, Worktree, WorktreeId};
use worktabs::settings::{self, Settings, StoreBackend};
use worktabs::store::{self, ConfigStore};

/// Manage persisted tab layouts of worktree-based workspaces.
#[derive(Parser, Debug)]
#[command(name = "worktabs", version = env!("WORKTABS_VERSION"))]
struct Cli {
    /// Storage backend (overrides settings.toml).
    #[arg(long, global = true, value_enum)]
    store: Option<StoreBackend>,

    /// Layout document or database path (overrides settings.toml).
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    /// Also write logs to worktabs.log in the log directory.
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a workspace if it does not exist yet.
    InitWorkspace {
        workspace: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Add an empty worktree to a workspace.
    AddWorktree {
        workspace: String,
        worktree: String,
        #[arg(long, default_value = "main")]
        branch: String,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Create a tab at the top level or inside a group.
    Create {
        workspace: String,
        worktree: String,
        name: String,
        #[arg(long, value_enum)]
        kind: Option<TabKind>,
        #[arg(long)]
        parent: Option<TabId>,
        #[arg(long)]
        cwd: Option<PathBuf>,
        #[arg(long)]
        command: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        rows: Option<u32>,
        #[arg(long)]
        cols: Option<u32>,
        #[arg(long)]
        row: Option<u32>,
        #[arg(long)]
        col: Option<u32>,
        #[arg(long)]
        row_span: Option<u32>,
        #[arg(long)]
        col_span: Option<u32>,
    },
    /// Delete a tab and everything inside it.
    Delete {
        workspace: String,
        worktree: String,
        tab: TabId,
    },
    /// Reorder the children of a group (or the top level).
    Reorder {
        workspace: String,
        worktree: String,
        #[arg(long)]
        parent: Option<TabId>,
        #[arg(required = true)]
        tabs: Vec<TabId>,
    },
    /// Move a tab to another container or position.
    Move {
        workspace: String,
        worktree: String,
        tab: TabId,
        #[arg(long)]
        from: Option<TabId>,
        #[arg(long)]
        to: Option<TabId>,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
    /// Set the row and/or column weights of a group.
    Resize {
        workspace: String,
        worktree: String,
        tab: TabId,
        #[arg(long, value_delimiter = ',')]
        rows: Option<Vec<f64>>,
        #[arg(long, value_delimiter = ',')]
        cols: Option<Vec<f64>>,
    },
    /// Record a terminal tab's working directory.
    Cwd {
        workspace: String,
        worktree: String,
        tab: TabId,
        dir: PathBuf,
    },
    /// Print a worktree's tabs, or a single tab.
    Show {
        workspace: String,
        worktree: String,
        #[arg(long)]
        tab: Option<TabId>,
    },
    /// Report structural problems in a workspace's layout.
    Check { workspace: String },
}

#[derive(Serialize)]
struct Updated {
    updated: bool,
}

#[derive(Serialize)]
struct Listing {
    tabs: Vec<worktabs::model::Tab>,
}

#[derive(Serialize)]
struct Finding {
    worktree_id: WorktreeId,
    violation: String,
}

#[derive(Serialize)]
struct CheckReport {
    consistent: bool,
    findings: Vec<Finding>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = settings::load_settings();
    if let Some(backend) = cli.store {
        settings.store = backend;
    }
    if let Some(path) = &cli.path {
        settings.document_path = Some(path.clone());
    }
    settings.log.file |= cli.log_file;

    let _log_guard = init_logging(&settings);

    match run(cli.command, &settings) {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

/// Stderr logging, plus a plain-text file layer when enabled. The returned
/// guard flushes the file writer on drop.
fn init_logging(settings: &Settings) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = match &settings.log.filter {
        Some(directive) if std::env::var_os("RUST_LOG").is_none() => EnvFilter::new(directive),
        _ => EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
    };

    let (file_layer, guard) = match settings
        .log
        .file
        .then(worktabs::paths::log_directory)
        .flatten()
    {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "worktabs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

/// Print `response` as JSON and report whether it was a success.
fn emit<T: Serialize>(response: Response<T>) -> anyhow::Result<bool> {
    let json = serde_json::to_string_pretty(&response).context("Failed to encode response")?;
    println!("{json}");
    Ok(response.success)
}

fn run(command: Command, settings: &Settings) -> anyhow::Result<bool> {
    let path = settings
        .document_path()
        .ok_or_else(|| anyhow::anyhow!("Cannot resolve layout path (is HOME set?)"))?;
    tracing::debug!("Using {:?} store at {}", settings.store, path.display());

    let engine = TabEngine::new(store::open(settings, &path)?);
    dispatch(&engine, command)
}

fn dispatch<S: ConfigStore>(engine: &TabEngine<S>, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::InitWorkspace { workspace, name } => {
            let id = WorkspaceId::new(workspace);
            let name = name.unwrap_or_else(|| id.to_string());
            emit(Response::from(
                engine.ensure_workspace(&id, &name).map(|_| ()),
            ))
        }
        Command::AddWorktree {
            workspace,
            worktree,
            branch,
            dir,
        } => {
            let worktree = Worktree::new(WorktreeId::new(worktree), branch, dir);
            emit(Response::from(
                engine.add_worktree(&WorkspaceId::new(workspace), worktree),
            ))
        }
        Command::Create {
            workspace,
            worktree,
            name,
            kind,
            parent,
            cwd,
            command,
            file,
            url,
            rows,
            cols,
            row,
            col,
            row_span,
            col_span,
        } => {
            let input = CreateTabInput {
                worktree_id: WorktreeId::new(worktree),
                parent_tab_id: parent,
                name,
                kind,
                cwd,
                command,
                file_path: file,
                url,
                rows,
                cols,
                row,
                col,
                row_span,
                col_span,
            };
            emit(Response::from(
                engine
                    .create_tab(&WorkspaceId::new(workspace), input)
                    .map(|tab| CreatedTab { tab }),
            ))
        }
        Command::Delete {
            workspace,
            worktree,
            tab,
        } => emit(Response::from(engine.delete_tab(
            &WorkspaceId::new(workspace),
            DeleteTabInput {
                worktree_id: WorktreeId::new(worktree),
                tab_id: tab,
            },
        ))),
        Command::Reorder {
            workspace,
            worktree,
            parent,
            tabs,
        } => emit(Response::from(engine.reorder_tabs(
            &WorkspaceId::new(workspace),
            ReorderTabsInput {
                worktree_id: WorktreeId::new(worktree),
                parent_tab_id: parent,
                tab_ids: tabs,
            },
        ))),
        Command::Move {
            workspace,
            worktree,
            tab,
            from,
            to,
            index,
        } => emit(Response::from(engine.move_tab(
            &WorkspaceId::new(workspace),
            MoveTabInput {
                worktree_id: WorktreeId::new(worktree),
                tab_id: tab,
                source_parent_tab_id: from,
                target_parent_tab_id: to,
                target_index: index,
            },
        ))),
        Command::Resize {
            workspace,
            worktree,
            tab,
            rows,
            cols,
        } => emit(Response::from(engine.update_tab_grid_sizes(
            &WorkspaceId::new(workspace),
            GridSizesInput {
                worktree_id: WorktreeId::new(worktree),
                tab_id: tab,
                row_sizes: rows,
                col_sizes: cols,
            },
        ))),
        Command::Cwd {
            workspace,
            worktree,
            tab,
            dir,
        } => {
            let updated = engine.update_terminal_cwd(
                &WorkspaceId::new(workspace),
                TerminalCwdInput {
                    worktree_id: WorktreeId::new(worktree),
                    tab_id: tab,
                    cwd: dir,
                },
            );
            Ok(emit(Response::ok(Updated { updated }))? && updated)
        }
        Command::Show {
            workspace,
            worktree,
            tab,
        } => {
            let workspace = WorkspaceId::new(workspace);
            let worktree = WorktreeId::new(worktree);
            match tab {
                Some(tab_id) => emit(Response::from(
                    engine
                        .get_tab(&workspace, &worktree, tab_id)
                        .map(|tab| CreatedTab { tab }),
                )),
                None => emit(Response::from(
                    engine
                        .list_tabs(&workspace, &worktree)
                        .map(|tabs| Listing { tabs }),
                )),
            }
        }
        Command::Check { workspace } => {
            let report = engine
                .check_workspace(&WorkspaceId::new(workspace))
                .map(|findings| CheckReport {
                    consistent: findings.is_empty(),
                    findings: findings
                        .into_iter()
                        .map(|(worktree_id, violation)| Finding {
                            worktree_id,
                            violation: violation.to_string(),
                        })
                        .collect(),
                });
            emit(Response::from(report))
        }
    }
}
