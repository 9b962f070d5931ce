use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::content::repository::{ContentError, ContentRepository, ContentRow, EntityType};

pub const DEFAULT_CSV_DIR: &str = "./assets/data/csv";

/// Reads `<dir>/<entity>.csv` files.
pub struct CsvContentRepository {
    dir: PathBuf,
}

impl CsvContentRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, entity: EntityType) -> PathBuf {
        self.dir.join(format!("{}.csv", entity.as_str()))
    }
}

impl ContentRepository for CsvContentRepository {
    fn rows(&self, entity: EntityType) -> Result<Vec<ContentRow>, ContentError> {
        let path = self.path_for(entity);
        let bytes = fs::read(&path).map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(parse_csv(&text))
    }
}

/// Parses a whole CSV document into rows keyed by the header line.
///
/// Blank lines are skipped, rows whose field count differs from the header
/// are dropped, and a document without at least one data row is empty.
pub fn parse_csv(text: &str) -> Vec<ContentRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = text.replace("\r\n", "\n");
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let headers = parse_csv_line(lines[0]);
    let mut rows = Vec::with_capacity(lines.len() - 1);
    for (line_no, line) in lines.iter().enumerate().skip(1) {
        let values = parse_csv_line(line);
        if values.len() != headers.len() {
            debug!(
                line = line_no + 1,
                expected = headers.len(),
                found = values.len(),
                "dropping malformed csv row"
            );
            continue;
        }
        rows.push(headers.iter().cloned().zip(values).collect());
    }
    rows
}

/// Splits one line on commas outside quotes; `""` inside quotes is a literal quote.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            other => current.push(other),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
