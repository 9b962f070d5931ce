use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::content::repository::{ContentError, ContentRepository, ContentRow, EntityType};

/// Content stored as one table per entity type.
pub struct SqliteContentRepository {
    conn: Connection,
}

impl SqliteContentRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn table_exists(&self, entity: EntityType) -> Result<bool, ContentError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [entity.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl ContentRepository for SqliteContentRepository {
    fn rows(&self, entity: EntityType) -> Result<Vec<ContentRow>, ContentError> {
        if !self.table_exists(entity)? {
            return Err(ContentError::MissingSource(entity));
        }

        // Table names come from the fixed EntityType list.
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM \"{}\"", entity.as_str()))?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut content = ContentRow::new();
            for (idx, column) in columns.iter().enumerate() {
                content.insert(column.clone(), value_to_text(row.get_ref(idx)?));
            }
            out.push(content);
        }
        Ok(out)
    }
}

fn value_to_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteContentRepository {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE click_areas (part_id TEXT, base_gain REAL, note TEXT);
            INSERT INTO click_areas VALUES ('shoulder', 1.5, NULL);
            INSERT INTO click_areas VALUES ('neck', 2, 'stiff');
            CREATE TABLE skills (skill_id TEXT, duration INTEGER);
            INSERT INTO skills VALUES ('combo_boost', 8);
            "#,
        )
        .unwrap();
        SqliteContentRepository::from_connection(conn)
    }

    #[test]
    fn columns_are_rendered_as_text() {
        let repo = seeded();
        let rows = repo.rows(EntityType::ClickAreas).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("part_id"), Some("shoulder"));
        assert_eq!(rows[0].parse::<f64>("base_gain"), Some(1.5));
        assert_eq!(rows[0].get("note"), Some(""));
        assert_eq!(rows[1].parse::<f64>("base_gain"), Some(2.0));

        let skills = repo.rows(EntityType::Skills).unwrap();
        assert_eq!(skills[0].get("duration"), Some("8"));
    }

    #[test]
    fn missing_table_is_reported() {
        let repo = seeded();
        assert!(matches!(
            repo.rows(EntityType::Dialogues),
            Err(ContentError::MissingSource(EntityType::Dialogues))
        ));
    }
}
