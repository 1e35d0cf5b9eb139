mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::*;
use planner_core::{ItemStore, MemberStore, PlanError, SprintStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

const ITEM_COLUMNS: &str = "id, kind, title, description, status, sprint_id, parent_id, member_id,
     priority, duration_weeks, duration_days, project_id, application_id, external_code,
     completed_on";

const SPRINT_COLUMNS: &str = "id, name, start_date, duration_weeks, end_date";

const MEMBER_COLUMNS: &str = "id, name, role, active, specialties";

/// SQLite-backed store. Clones share one connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "sprint-planner")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("sprint-planner.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        schema::migrate(&mut conn)?;
        Ok(())
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> planner_core::Result<T> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        f(&mut *conn).map_err(store_err)
    }

    // ============================================================
    // Sprint operations
    // ============================================================

    /// Create a sprint, rejecting invalid input and overlapping periods.
    pub fn create_sprint(&self, input: NewSprint) -> planner_core::Result<Sprint> {
        let mut sprint = Sprint::from_input(0, input)?;
        let conn = self.conn.lock().expect("database lock poisoned");

        let existing = query_sprints(&conn).map_err(store_err)?;
        check_overlap(&existing, &sprint)?;

        conn.execute(
            "INSERT INTO sprints (name, start_date, duration_weeks, end_date) VALUES (?, ?, ?, ?)",
            (
                &sprint.name,
                format_date(sprint.start_date),
                sprint.duration_weeks,
                format_date(sprint.end_date),
            ),
        )
        .map_err(store_err)?;
        sprint.id = conn.last_insert_rowid();

        tracing::info!(sprint_id = sprint.id, end_date = %sprint.end_date, "Created sprint");
        Ok(sprint)
    }

    /// Replace a sprint's name and period. The end date is derived again.
    pub fn update_sprint(&self, id: i64, input: NewSprint) -> planner_core::Result<Sprint> {
        let sprint = Sprint::from_input(id, input)?;
        let conn = self.conn.lock().expect("database lock poisoned");

        let existing = query_sprints(&conn).map_err(store_err)?;
        if !existing.iter().any(|s| s.id == id) {
            return Err(PlanError::not_found("sprint", id));
        }
        check_overlap(&existing, &sprint)?;

        conn.execute(
            "UPDATE sprints SET name = ?, start_date = ?, duration_weeks = ?, end_date = ? WHERE id = ?",
            (
                &sprint.name,
                format_date(sprint.start_date),
                sprint.duration_weeks,
                format_date(sprint.end_date),
                id,
            ),
        )
        .map_err(store_err)?;

        tracing::info!(sprint_id = id, "Updated sprint");
        Ok(sprint)
    }

    /// Delete a sprint together with the items planned in it.
    pub fn delete_sprint(&self, id: i64) -> planner_core::Result<bool> {
        let deleted = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM work_items WHERE sprint_id = ?", [id])?;
            let rows = tx.execute("DELETE FROM sprints WHERE id = ?", [id])?;
            tx.commit()?;
            Ok(rows > 0)
        })?;
        if deleted {
            tracing::info!(sprint_id = id, "Deleted sprint");
        }
        Ok(deleted)
    }

    // ============================================================
    // Member operations
    // ============================================================

    pub fn create_member(&self, input: NewMember) -> planner_core::Result<Member> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO members (name, role, active, specialties) VALUES (?, ?, ?, ?)",
                (
                    &input.name,
                    input.role.as_str(),
                    input.active,
                    &input.specialties,
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(member_id = id, "Created member");
        Ok(Member {
            id,
            name: input.name,
            role: input.role,
            active: input.active,
            specialties: input.specialties,
        })
    }

    /// Delete a member. Subtasks keep their `member_id` and are still
    /// allocated under it.
    pub fn delete_member(&self, id: i64) -> planner_core::Result<bool> {
        let rows = self.with_conn(|conn| conn.execute("DELETE FROM members WHERE id = ?", [id]))?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl ItemStore for Database {
    fn list_by_sprint(&self, sprint_id: i64) -> planner_core::Result<Vec<WorkItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM work_items WHERE sprint_id = ? ORDER BY id"
            ))?;
            let items = stmt
                .query_map([sprint_id], item_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    fn list_by_parent(&self, parent_id: i64) -> planner_core::Result<Vec<WorkItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM work_items WHERE parent_id = ? ORDER BY id"
            ))?;
            let items = stmt
                .query_map([parent_id], item_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    fn find_item(&self, id: i64) -> planner_core::Result<Option<WorkItem>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM work_items WHERE id = ?"),
                [id],
                item_from_row,
            )
            .optional()
        })
    }

    fn save_item(&self, item: &WorkItem) -> planner_core::Result<i64> {
        self.with_conn(|conn| {
            let (weeks, days) = ItemDuration::to_columns(item.duration);
            conn.execute(
                "INSERT INTO work_items (kind, title, description, status, sprint_id, parent_id,
                     member_id, priority, duration_weeks, duration_days, project_id,
                     application_id, external_code, completed_on)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    item.kind.as_str(),
                    &item.title,
                    &item.description,
                    item.status.as_str(),
                    item.sprint_id,
                    item.parent_id,
                    item.member_id,
                    item.priority,
                    weeks,
                    days,
                    item.project_id,
                    item.application_id,
                    &item.external_code,
                    item.completed_on.map(format_date),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update_item(&self, item: &WorkItem) -> planner_core::Result<()> {
        let rows = self.with_conn(|conn| write_item(conn, item))?;
        if rows == 0 {
            return Err(PlanError::not_found("item", item.id));
        }
        Ok(())
    }

    fn delete_item(&self, id: i64) -> planner_core::Result<bool> {
        let rows =
            self.with_conn(|conn| conn.execute("DELETE FROM work_items WHERE id = ?", [id]))?;
        Ok(rows > 0)
    }

    /// All updates commit together or none do.
    fn update_items(&self, items: &[WorkItem]) -> planner_core::Result<()> {
        let missing = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for item in items {
                if write_item(&tx, item)? == 0 {
                    // Dropping the transaction rolls it back.
                    return Ok(Some(item.id));
                }
            }
            tx.commit()?;
            Ok(None)
        })?;

        match missing {
            Some(id) => Err(PlanError::not_found("item", id)),
            None => Ok(()),
        }
    }
}

impl SprintStore for Database {
    fn find_sprint(&self, id: i64) -> planner_core::Result<Option<Sprint>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SPRINT_COLUMNS} FROM sprints WHERE id = ?"),
                [id],
                sprint_from_row,
            )
            .optional()
        })
    }

    /// Most recent sprint first.
    fn list_sprints(&self) -> planner_core::Result<Vec<Sprint>> {
        self.with_conn(|conn| query_sprints(conn))
    }
}

impl MemberStore for Database {
    fn find_member(&self, id: i64) -> planner_core::Result<Option<Member>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?"),
                [id],
                member_from_row,
            )
            .optional()
        })
    }

    fn list_members(&self) -> planner_core::Result<Vec<Member>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY name"))?;
            let members = stmt
                .query_map([], member_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(members)
        })
    }
}

fn store_err(e: rusqlite::Error) -> PlanError {
    tracing::error!(error = %e, "Database operation failed");
    PlanError::store(e)
}

fn check_overlap(existing: &[Sprint], sprint: &Sprint) -> planner_core::Result<()> {
    match find_overlap(existing, sprint) {
        Some(clash) => Err(PlanError::SprintOverlap {
            name: clash.name.clone(),
            start: clash.start_date,
            end: clash.end_date,
        }),
        None => Ok(()),
    }
}

fn query_sprints(conn: &Connection) -> rusqlite::Result<Vec<Sprint>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SPRINT_COLUMNS} FROM sprints ORDER BY start_date DESC"
    ))?;
    let sprints = stmt
        .query_map([], sprint_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sprints)
}

fn write_item(conn: &Connection, item: &WorkItem) -> rusqlite::Result<usize> {
    let (weeks, days) = ItemDuration::to_columns(item.duration);
    conn.execute(
        "UPDATE work_items SET kind = ?, title = ?, description = ?, status = ?, sprint_id = ?,
             parent_id = ?, member_id = ?, priority = ?, duration_weeks = ?, duration_days = ?,
             project_id = ?, application_id = ?, external_code = ?, completed_on = ?
         WHERE id = ?",
        rusqlite::params![
            item.kind.as_str(),
            &item.title,
            &item.description,
            item.status.as_str(),
            item.sprint_id,
            item.parent_id,
            item.member_id,
            item.priority,
            weeks,
            days,
            item.project_id,
            item.application_id,
            &item.external_code,
            item.completed_on.map(format_date),
            item.id,
        ],
    )
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    Ok(WorkItem {
        id: row.get(0)?,
        kind: parse_column(row, 1, ItemKind::from_str)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_column(row, 4, ItemStatus::from_str)?,
        sprint_id: row.get(5)?,
        parent_id: row.get(6)?,
        member_id: row.get(7)?,
        priority: row.get(8)?,
        duration: ItemDuration::from_columns(row.get(9)?, row.get(10)?),
        project_id: row.get(11)?,
        application_id: row.get(12)?,
        external_code: row.get(13)?,
        completed_on: row
            .get::<_, Option<String>>(14)?
            .map(|s| parse_date(14, &s))
            .transpose()?,
    })
}

fn sprint_from_row(row: &Row<'_>) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: parse_date(2, &row.get::<_, String>(2)?)?,
        duration_weeks: row.get(3)?,
        end_date: parse_date(4, &row.get::<_, String>(4)?)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        name: row.get(1)?,
        role: parse_column(row, 2, MemberRole::from_str)?,
        active: row.get(3)?,
        specialties: row.get(4)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unrecognized value '{value}'").into(),
        )
    })
}

fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
