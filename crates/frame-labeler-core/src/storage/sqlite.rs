use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::debug;

/// A connection to the label database. Every worker opens its own; SQLite's
/// write lock serializes inserts across them.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        // busy_timeout first so that switching to WAL waits on a concurrent opener
        self.conn.busy_timeout(std::time::Duration::from_secs(30))?;
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 30s busy timeout)");
        Ok(())
    }

    fn migrate_schema(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(include_str!("schema.sql"))?;
            debug!("SQLite schema initialized (version 1)");
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
