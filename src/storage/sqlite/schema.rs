use anyhow::{bail, Context, Result};
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

/// Creates the key-value table on a fresh database and stamps `user_version`.
pub fn ensure_schema(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    match version {
        SCHEMA_VERSION => Ok(()),
        0 => {
            let tx = conn.transaction().context("failed to open schema transaction")?;
            tx.execute_batch(include_str!("schemas/schema_v1.sql"))
                .context("failed to create kv_store")?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)
                .context("failed to update user_version pragma")?;
            tx.commit().context("failed to commit schema")
        }
        other => bail!("database schema version {other} is not supported (expected {SCHEMA_VERSION})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_schema_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        ensure_schema(&mut conn).unwrap();
        ensure_schema(&mut conn).unwrap();

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv_store'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn refuses_unknown_schema_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        assert!(ensure_schema(&mut conn).is_err());
    }
}
