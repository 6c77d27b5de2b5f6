use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

impl Database {
    // ── Labels ───────────────────────────────────────────────────

    /// Insert `record` unless its `(series_id, item_id)` is already stored.
    /// Returns `true` when a row was written, `false` when the identity was
    /// present. The existing row is never overwritten.
    pub fn insert_if_absent(&self, record: &LabelRecord) -> Result<bool> {
        let changed = self.connection().execute(
            "INSERT INTO image_label (series_id, item_id, label_text) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (series_id, item_id) DO NOTHING",
            params![record.series_id, record.item_id, record.label_text],
        )?;
        Ok(changed == 1)
    }

    pub fn count_labels(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM image_label", [], |row| row.get(0))
    }

    pub fn get_label(&self, series_id: &str, item_id: &str) -> Result<Option<LabelRecord>> {
        self.connection()
            .query_row(
                "SELECT series_id, item_id, label_text FROM image_label \
                 WHERE series_id = ?1 AND item_id = ?2",
                params![series_id, item_id],
                label_from_row,
            )
            .optional()
    }

    /// Labels ordered by identity, for paging and export.
    pub fn list_labels(&self, offset: i64, limit: i64) -> Result<Vec<LabelRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT series_id, item_id, label_text FROM image_label \
             ORDER BY series_id, item_id \
             LIMIT ?1 OFFSET ?2",
        )?;
        let labels = stmt
            .query_map(params![limit, offset], label_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(labels)
    }

    // ── Runs ─────────────────────────────────────────────────────

    pub fn create_run(&self, input_path: &str, device_count: usize) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "INSERT INTO label_run (started_at, status, input_path, device_count) \
             VALUES (?1, 'running', ?2, ?3)",
            params![now, input_path, device_count as i64],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Created label run {} for {}", id, input_path);
        Ok(id)
    }

    pub fn complete_run(
        &self,
        run_id: i64,
        status: &str,
        items_processed: usize,
        items_inserted: usize,
        files_relocated: usize,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "UPDATE label_run SET completed_at = ?1, status = ?2, items_processed = ?3, \
             items_inserted = ?4, files_relocated = ?5 WHERE id = ?6",
            params![
                now,
                status,
                items_processed as i64,
                items_inserted as i64,
                files_relocated as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: i64) -> Result<Option<LabelRun>> {
        self.connection()
            .query_row(
                "SELECT id, started_at, completed_at, status, input_path, device_count, \
                        items_processed, items_inserted, files_relocated \
                 FROM label_run WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(LabelRun {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        completed_at: row.get(2)?,
                        status: row.get(3)?,
                        input_path: row.get(4)?,
                        device_count: row.get(5)?,
                        items_processed: row.get(6)?,
                        items_inserted: row.get(7)?,
                        files_relocated: row.get(8)?,
                    })
                },
            )
            .optional()
    }
}

fn label_from_row(row: &Row<'_>) -> Result<LabelRecord> {
    Ok(LabelRecord {
        series_id: row.get(0)?,
        item_id: row.get(1)?,
        label_text: row.get(2)?,
    })
}
