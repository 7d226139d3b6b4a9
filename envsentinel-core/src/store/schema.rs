//! Working-copy schema and row mapping for the snapshot store.

use crate::store::models::TrackedFile;
use crate::{EnvSentinelError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// In-memory working copy of the snapshot.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a fresh, empty working copy.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tracked_files (
                path TEXT PRIMARY KEY NOT NULL,
                remotes TEXT NOT NULL,
                sha256 TEXT NOT NULL,
                contents BLOB NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Copy every row from the decrypted snapshot file at `path` into this
    /// working copy.
    pub fn restore_from(&self, path: &Path) -> Result<()> {
        self.conn
            .execute("ATTACH DATABASE ?1 AS snapshot", params![path_str(path)?])?;

        let copied = self.conn.execute(
            "INSERT INTO main.tracked_files SELECT * FROM snapshot.tracked_files",
            [],
        );
        let detached = self.conn.execute("DETACH DATABASE snapshot", []);

        copied?;
        detached?;
        Ok(())
    }

    /// Serialize the working copy into a standalone sqlite file at `path`.
    /// The target must not exist yet.
    pub fn dump_to(&self, path: &Path) -> Result<()> {
        self.conn
            .execute("VACUUM INTO ?1", params![path_str(path)?])?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<TrackedFile>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, remotes, sha256, contents FROM tracked_files")?;
        let rows = stmt.query_map([], row_to_parts)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(parts_to_record(row?)?);
        }
        Ok(records)
    }

    pub fn fetch(&self, path: &Path) -> Result<TrackedFile> {
        let mut stmt = self.conn.prepare(
            "SELECT path, remotes, sha256, contents FROM tracked_files WHERE path = ?1",
        )?;
        let parts = stmt
            .query_row(params![path_str(path)?], row_to_parts)
            .optional()?;

        match parts {
            Some(parts) => parts_to_record(parts),
            None => Err(EnvSentinelError::NotFound(path.display().to_string())),
        }
    }

    pub fn upsert(&self, record: &TrackedFile) -> Result<()> {
        let remotes = serde_json::to_string(record.remotes())
            .map_err(|e| EnvSentinelError::InvalidSnapshot(e.to_string()))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO tracked_files (path, remotes, sha256, contents)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                path_str(record.path())?,
                remotes,
                record.content_hash(),
                record.content()
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, path: &Path) -> Result<()> {
        let affected = self.conn.execute(
            "DELETE FROM tracked_files WHERE path = ?1",
            params![path_str(path)?],
        )?;

        if affected == 0 {
            return Err(EnvSentinelError::NotFound(path.display().to_string()));
        }
        Ok(())
    }
}

type RowParts = (String, String, String, Vec<u8>);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn parts_to_record((path, remotes_json, sha256, contents): RowParts) -> Result<TrackedFile> {
    let remotes: BTreeSet<String> = serde_json::from_str(&remotes_json).map_err(|e| {
        EnvSentinelError::InvalidSnapshot(format!("bad remotes for {path}: {e}"))
    })?;

    Ok(TrackedFile::from_parts(
        PathBuf::from(path),
        remotes,
        sha256,
        contents,
    )?)
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| EnvSentinelError::NonUtf8Path(path.to_path_buf()))
}
