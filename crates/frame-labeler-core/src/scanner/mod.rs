pub mod triage;
pub mod walk;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use triage::{scan, TriageReport};

/// An image discovered in the input directory, with the `(series_id, item_id)`
/// identity derived from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
    pub series_id: String,
    pub item_id: String,
}

impl ImageFile {
    /// `sessionA_frame007.jpg` splits at the last separator into
    /// `("sessionA", "frame007")`. Stems without a usable split fall back to
    /// the parent directory name as the series.
    pub fn from_path(path: &Path, separator: &str) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let split = stem
            .rsplit_once(separator)
            .filter(|(series, item)| !series.is_empty() && !item.is_empty())
            .map(|(series, item)| (series.to_string(), item.to_string()));

        let (series_id, item_id) = match split {
            Some(ids) => ids,
            None => {
                let parent = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (parent, stem)
            }
        };

        Self {
            path: path.to_path_buf(),
            series_id,
            item_id,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pairs of files that derive the same `(series_id, item_id)`, each paired
/// with the first file seen under that identity. Only the first of a pair can
/// ever be stored.
pub fn identity_clashes(files: &[ImageFile]) -> Vec<(&ImageFile, &ImageFile)> {
    let mut seen: HashMap<(&str, &str), &ImageFile> = HashMap::new();
    let mut clashes = Vec::new();
    for file in files {
        let key = (file.series_id.as_str(), file.item_id.as_str());
        match seen.get(&key) {
            Some(first) => clashes.push((*first, file)),
            None => {
                seen.insert(key, file);
            }
        }
    }
    clashes
}
