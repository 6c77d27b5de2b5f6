use crate::error::Error;
use crate::storage::Database;
use std::path::Path;
use tracing::info;

const EXPORT_PAGE_SIZE: i64 = 1000;

/// Write every stored label to `path` as CSV with a
/// `series_id,item_id,label_text` header. Returns the number of rows written.
pub fn export_labels_csv(db: &Database, path: &Path) -> Result<usize, Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["series_id", "item_id", "label_text"])?;

    let mut written = 0usize;
    let mut offset = 0i64;
    loop {
        let page = db.list_labels(offset, EXPORT_PAGE_SIZE)?;
        if page.is_empty() {
            break;
        }
        for record in &page {
            wtr.write_record([&record.series_id, &record.item_id, &record.label_text])?;
        }
        written += page.len();
        offset += page.len() as i64;
    }

    wtr.flush()?;
    info!("Exported {} labels to {}", written, path.display());
    Ok(written)
}
