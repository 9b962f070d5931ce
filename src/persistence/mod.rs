pub mod autosave;
pub mod sqlite;

pub use autosave::{AutosaveError, AutosaveSnapshot, AutosaveStore, JsonFileAutosave};
pub use sqlite::SqliteAutosave;

use std::path::Path;

/// Picks the store from the file extension: `.db`/`.sqlite` use SQLite, anything else JSON.
pub fn open_autosave(path: &Path) -> Result<Box<dyn AutosaveStore>, AutosaveError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("db") | Some("sqlite") => Ok(Box::new(SqliteAutosave::open(path)?)),
        _ => Ok(Box::new(JsonFileAutosave::new(path))),
    }
}
