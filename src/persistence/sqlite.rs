use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::persistence::autosave::{AutosaveError, AutosaveSnapshot, AutosaveStore};

const AUTOSAVE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS autosave (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  saved_at TEXT NOT NULL,
  relax_gauge REAL NOT NULL,
  payload TEXT NOT NULL
);
"#;

/// Single-row autosave table; each save replaces the previous one.
pub struct SqliteAutosave {
    conn: Connection,
}

impl SqliteAutosave {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AutosaveError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, AutosaveError> {
        conn.execute_batch(AUTOSAVE_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl AutosaveStore for SqliteAutosave {
    fn save(&mut self, snapshot: &AutosaveSnapshot) -> Result<(), AutosaveError> {
        let payload = snapshot.to_json()?;
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM autosave", [])?;
        tx.execute(
            "INSERT INTO autosave (id, saved_at, relax_gauge, payload) VALUES (1, ?1, ?2, ?3)",
            params![snapshot.saved_at.to_rfc3339(), snapshot.relax_gauge, payload],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_latest(&self) -> Result<Option<AutosaveSnapshot>, AutosaveError> {
        let payload: Option<String> = self
            .conn
            .query_row("SELECT payload FROM autosave WHERE id = 1", [], |row| row.get(0))
            .optional()?;
        payload
            .map(|data| AutosaveSnapshot::from_json(&data))
            .transpose()
    }
}
