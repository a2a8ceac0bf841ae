use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::sync::BlobStore;

pub fn open_db(workspace: &Path, file_name: &str) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(file_name);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;

    // One row per collection; payload is the JSON array of records.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS collections(
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

impl BlobStore for Connection {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let payload = self
            .query_row(
                "SELECT payload FROM collections WHERE key = ?",
                [key],
                |r| r.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read collection {key}"))?;
        Ok(payload)
    }

    fn put_all(&mut self, entries: &[(&str, String)]) -> anyhow::Result<()> {
        let tx = self.transaction().context("failed to begin transaction")?;
        for (key, payload) in entries {
            tx.execute(
                "INSERT INTO collections(key, payload, updated_at)
                 VALUES(?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
                 ON CONFLICT(key) DO UPDATE SET
                   payload = excluded.payload,
                   updated_at = excluded.updated_at",
                (key, payload),
            )
            .with_context(|| format!("failed to write collection {key}"))?;
        }
        tx.commit().context("failed to commit collections")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_all_upserts_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut conn = open_db(dir.path(), "rosterd.sqlite3").expect("open db");

        assert_eq!(conn.get("students").unwrap(), None);
        conn.put_all(&[("students", "[]".to_string()), ("classes", "[1]".to_string())])
            .unwrap();
        conn.put_all(&[("students", "[2]".to_string())]).unwrap();

        assert_eq!(conn.get("students").unwrap().as_deref(), Some("[2]"));
        assert_eq!(conn.get("classes").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn put_all_rolls_back_when_a_later_entry_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut conn = open_db(dir.path(), "rosterd.sqlite3").expect("open db");
        conn.put_all(&[("students", "[1]".to_string())]).unwrap();

        conn.execute_batch(
            "CREATE TRIGGER reject_classes BEFORE INSERT ON collections
             WHEN NEW.key = 'classes'
             BEGIN SELECT RAISE(ABORT, 'classes rejected'); END;",
        )
        .unwrap();

        let result = conn.put_all(&[
            ("students", "[2]".to_string()),
            ("classes", "[3]".to_string()),
        ]);
        assert!(result.is_err());
        assert_eq!(conn.get("students").unwrap().as_deref(), Some("[1]"));
        assert_eq!(conn.get("classes").unwrap(), None);
    }

    #[test]
    fn reopen_keeps_existing_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut conn = open_db(dir.path(), "rosterd.sqlite3").expect("open db");
            conn.put_all(&[("evaluations", "[]".to_string())]).unwrap();
        }
        let conn = open_db(dir.path(), "rosterd.sqlite3").expect("reopen db");
        assert_eq!(conn.get("evaluations").unwrap().as_deref(), Some("[]"));
    }
}
