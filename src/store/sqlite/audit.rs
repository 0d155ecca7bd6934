use std::collections::HashMap;

use rusqlite::{params, Connection};

use crate::model::{current_time_millis, Configuration, Workspace};

/// Entity type for audit log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Workspace,
    Worktree,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Worktree => "worktree",
        }
    }
}

/// Action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Old and new value of a single changed field.
#[derive(Debug, Clone, Copy)]
pub struct FieldChange<'a> {
    pub field: &'a str,
    pub old_value: Option<&'a str>,
    pub new_value: Option<&'a str>,
}

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: u64,
    pub entity_type: String,
    pub entity_id: String,
    pub action: String,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub instance_id: Option<String>,
}

/// Record an audit log entry.
pub fn log_audit(
    conn: &Connection,
    instance_id: &str,
    entity_type: EntityType,
    entity_id: &str,
    action: AuditAction,
    change: Option<FieldChange<'_>>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, entity_type, entity_id, action, field, old_value, new_value, instance_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            current_time_millis() as i64,
            entity_type.as_str(),
            entity_id,
            action.as_str(),
            change.map(|c| c.field),
            change.and_then(|c| c.old_value),
            change.and_then(|c| c.new_value),
            instance_id,
        ],
    )?;
    Ok(())
}

/// Audit what differs between two versions of the document: workspaces
/// created, deleted or re-stamped, and worktrees added or removed.
pub fn record_changes(
    conn: &Connection,
    instance_id: &str,
    previous: &Configuration,
    next: &Configuration,
) -> rusqlite::Result<()> {
    let before: HashMap<&str, &Workspace> = previous
        .workspaces
        .iter()
        .map(|w| (w.id.as_str(), w))
        .collect();

    for ws in &next.workspaces {
        let Some(old) = before.get(ws.id.as_str()) else {
            log_audit(
                conn,
                instance_id,
                EntityType::Workspace,
                ws.id.as_str(),
                AuditAction::Created,
                None,
            )?;
            continue;
        };

        if old.updated_at != ws.updated_at {
            let old_value = old.updated_at.to_string();
            let new_value = ws.updated_at.to_string();
            log_audit(
                conn,
                instance_id,
                EntityType::Workspace,
                ws.id.as_str(),
                AuditAction::Updated,
                Some(FieldChange {
                    field: "updated_at",
                    old_value: Some(&old_value),
                    new_value: Some(&new_value),
                }),
            )?;
        }

        for wt in &ws.worktrees {
            if old.worktree(&wt.id).is_none() {
                log_audit(
                    conn,
                    instance_id,
                    EntityType::Worktree,
                    wt.id.as_str(),
                    AuditAction::Created,
                    None,
                )?;
            }
        }
        for wt in &old.worktrees {
            if ws.worktree(&wt.id).is_none() {
                log_audit(
                    conn,
                    instance_id,
                    EntityType::Worktree,
                    wt.id.as_str(),
                    AuditAction::Deleted,
                    None,
                )?;
            }
        }
    }

    for old in &previous.workspaces {
        if next.workspace(&old.id).is_none() {
            log_audit(
                conn,
                instance_id,
                EntityType::Workspace,
                old.id.as_str(),
                AuditAction::Deleted,
                None,
            )?;
        }
    }

    Ok(())
}

/// Query audit log entries with optional filters, newest first.
pub fn get_audit_log(
    conn: &Connection,
    entity_type: Option<EntityType>,
    entity_id: Option<&str>,
    limit: usize,
) -> rusqlite::Result<Vec<AuditEntry>> {
    let mut sql = String::from(
        "SELECT id, timestamp, entity_type, entity_id, action, field, old_value, new_value, instance_id \
         FROM audit_log WHERE 1=1",
    );

    if entity_type.is_some() {
        sql.push_str(" AND entity_type = ?1");
    }
    if entity_id.is_some() {
        sql.push_str(" AND entity_id = ?2");
    }
    sql.push_str(" ORDER BY id DESC LIMIT ?3");

    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt.query_map(
        params![entity_type.map(|e| e.as_str()), entity_id, limit as i64],
        |row| {
            Ok(AuditEntry {
                id: row.get(0)?,
                timestamp: row.get::<_, i64>(1)? as u64,
                entity_type: row.get(2)?,
                entity_id: row.get(3)?,
                action: row.get(4)?,
                field: row.get(5)?,
                old_value: row.get(6)?,
                new_value: row.get(7)?,
                instance_id: row.get(8)?,
            })
        },
    )?;

    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::super::schema;
    use super::*;
    use crate::model::{WorkspaceId, Worktree, WorktreeId};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn log_and_query_audit() {
        let conn = conn();

        log_audit(
            &conn,
            "instance",
            EntityType::Workspace,
            "ws-1",
            AuditAction::Created,
            None,
        )
        .unwrap();

        let entries = get_audit_log(&conn, None, None, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, "workspace");
        assert_eq!(entries[0].entity_id, "ws-1");
        assert_eq!(entries[0].action, "created");
        assert_eq!(entries[0].instance_id.as_deref(), Some("instance"));
    }

    #[test]
    fn filter_by_entity_type() {
        let conn = conn();

        log_audit(&conn, "i", EntityType::Workspace, "w1", AuditAction::Created, None).unwrap();
        log_audit(&conn, "i", EntityType::Worktree, "t1", AuditAction::Created, None).unwrap();

        let worktrees = get_audit_log(&conn, Some(EntityType::Worktree), None, 10).unwrap();
        assert_eq!(worktrees.len(), 1);
        assert_eq!(worktrees[0].entity_id, "t1");
    }

    #[test]
    fn audit_records_field_changes() {
        let conn = conn();

        log_audit(
            &conn,
            "i",
            EntityType::Workspace,
            "w1",
            AuditAction::Updated,
            Some(FieldChange {
                field: "updated_at",
                old_value: Some("1"),
                new_value: Some("2"),
            }),
        )
        .unwrap();

        let entries = get_audit_log(&conn, None, None, 10).unwrap();
        assert_eq!(entries[0].field.as_deref(), Some("updated_at"));
        assert_eq!(entries[0].old_value.as_deref(), Some("1"));
        assert_eq!(entries[0].new_value.as_deref(), Some("2"));
    }

    #[test]
    fn record_changes_tracks_workspace_lifecycle() {
        let conn = conn();

        let mut first = Configuration::default();
        let mut ws = Workspace::new(WorkspaceId::from("ws"), "Main");
        ws.worktrees
            .push(Worktree::new(WorktreeId::from("wt"), "main", "/repo"));
        first.workspaces.push(ws.clone());

        record_changes(&conn, "i", &Configuration::default(), &first).unwrap();
        let created = get_audit_log(&conn, None, None, 10).unwrap();
        assert_eq!(created.len(), 2);

        let mut second = first.clone();
        second.workspaces[0].touch();
        second.workspaces[0].worktrees.clear();
        record_changes(&conn, "i", &first, &second).unwrap();

        let updated = get_audit_log(&conn, Some(EntityType::Workspace), Some("ws"), 1).unwrap();
        assert_eq!(updated[0].action, "updated");
        let removed = get_audit_log(&conn, Some(EntityType::Worktree), Some("wt"), 1).unwrap();
        assert_eq!(removed[0].action, "deleted");

        record_changes(&conn, "i", &second, &Configuration::default()).unwrap();
        let deleted = get_audit_log(&conn, Some(EntityType::Workspace), Some("ws"), 1).unwrap();
        assert_eq!(deleted[0].action, "deleted");
    }

    #[test]
    fn audit_limit_works() {
        let conn = conn();

        for i in 0..5 {
            log_audit(
                &conn,
                "i",
                EntityType::Worktree,
                &format!("t{i}"),
                AuditAction::Created,
                None,
            )
            .unwrap();
        }

        assert_eq!(get_audit_log(&conn, None, None, 3).unwrap().len(), 3);
    }
}
