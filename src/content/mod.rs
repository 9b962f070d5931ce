pub mod csv;
pub mod repository;
pub mod sqlite;
pub mod tables;

pub use csv::CsvContentRepository;
pub use repository::{ContentError, ContentRepository, ContentRow, EntityType, MemoryContentRepository};
pub use sqlite::SqliteContentRepository;
pub use tables::{ContentTables, LoadReport};
