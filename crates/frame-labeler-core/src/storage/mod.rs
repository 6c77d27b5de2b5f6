pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{LabelRecord, LabelRun};
pub use sqlite::Database;
