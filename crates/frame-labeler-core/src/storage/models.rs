/// One labeled frame. `(series_id, item_id)` is the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub series_id: String,
    pub item_id: String,
    pub label_text: String,
}

impl LabelRecord {
    pub fn new(series_id: &str, item_id: &str, label_text: &str) -> Self {
        Self {
            series_id: series_id.to_string(),
            item_id: item_id.to_string(),
            label_text: label_text.to_string(),
        }
    }
}

/// One invocation of the labeling pipeline.
#[derive(Debug, Clone)]
pub struct LabelRun {
    pub id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub input_path: String,
    pub device_count: i64,
    pub items_processed: i64,
    pub items_inserted: i64,
    pub files_relocated: i64,
}
