//! Versioned schema changes for the planner database.
//!
//! Every step runs in its own transaction together with the row that records
//! it in `schema_migrations`, so a failed step leaves neither table changes
//! nor a version behind.

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by version. Append new steps; never edit an applied one.
const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Step {
        version: 2,
        name: "subtask_priority",
        sql: include_str!("migrations/002_subtask_priority.sql"),
    },
    Step {
        version: 3,
        name: "item_tracking",
        sql: include_str!("migrations/003_item_tracking.sql"),
    },
];

const LEDGER: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Bring the schema up to the latest version. Returns how many steps ran.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    conn.execute_batch(LEDGER)
        .context("Failed to create schema_migrations table")?;

    let current = current_version(conn)?;
    let pending: Vec<&Step> = STEPS.iter().filter(|s| s.version > current).collect();
    if pending.is_empty() {
        tracing::debug!(version = current, "Schema is up to date");
        return Ok(0);
    }

    for step in &pending {
        let tx = conn.transaction()?;
        apply(tx, step)?;
    }

    tracing::info!(
        from = current,
        to = pending.last().map_or(current, |s| s.version),
        steps = pending.len(),
        "Schema migrated"
    );
    Ok(pending.len())
}

/// Highest recorded version, 0 for a fresh database.
fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

fn apply(tx: Transaction<'_>, step: &Step) -> Result<()> {
    tx.execute_batch(step.sql)
        .with_context(|| format!("Schema step {} ({}) failed", step.version, step.name))?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        (step.version, step.name, chrono::Utc::now().to_rfc3339()),
    )?;
    tx.commit()?;

    tracing::info!(version = step.version, name = step.name, "Applied schema step");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded(conn: &Connection) -> Vec<u32> {
        let mut stmt = conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<u32>>>()
            .unwrap()
    }

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("SELECT name FROM pragma_table_info('{table}')"))
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn test_fresh_db_runs_every_step() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(migrate(&mut conn).unwrap(), STEPS.len());

        assert!(table_exists(&conn, "work_items"));
        assert_eq!(recorded(&conn), vec![1, 2, 3]);
        assert_eq!(current_version(&conn).unwrap(), 3);
    }

    #[test]
    fn test_second_run_does_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(migrate(&mut conn).unwrap(), 0);
        assert_eq!(recorded(&conn), vec![1, 2, 3]);
    }

    #[test]
    fn test_later_steps_add_columns() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let columns = column_names(&conn, "work_items");
        for expected in ["priority", "external_code", "completed_on"] {
            assert!(columns.iter().any(|c| c == expected), "missing {expected}");
        }
        assert!(column_names(&conn, "members")
            .iter()
            .any(|c| c == "specialties"));
    }

    #[test]
    fn test_failed_step_is_rolled_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let broken = Step {
            version: 4,
            name: "broken",
            sql: "CREATE TABLE labels (id INTEGER PRIMARY KEY);
                  INSERT INTO no_such_table VALUES (1);",
        };
        let tx = conn.transaction().unwrap();
        let err = apply(tx, &broken).unwrap_err();

        assert!(err.to_string().contains("Schema step 4 (broken) failed"));
        assert!(!table_exists(&conn, "labels"));
        assert_eq!(current_version(&conn).unwrap(), 3);
    }
}
