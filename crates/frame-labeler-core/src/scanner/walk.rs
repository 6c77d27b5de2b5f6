use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// List the files directly inside `dir` whose extension matches one of
/// `extensions` (case-insensitive). Order is whatever the filesystem yields.
pub fn list_image_files(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Error reading directory {}: {}", dir.display(), err),
        )
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if has_image_extension(&path, extensions) {
            files.push(path);
        }
    }

    Ok(files)
}

pub fn has_image_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|wanted| ext.eq_ignore_ascii_case(wanted.trim_start_matches('.')))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exts() -> Vec<String> {
        vec!["png".to_string(), "jpg".to_string(), ".jpeg".to_string()]
    }

    #[test]
    fn test_extension_match_is_case_insensitive() {
        assert!(has_image_extension(Path::new("a.PNG"), &exts()));
        assert!(has_image_extension(Path::new("a.JpEg"), &exts()));
        assert!(!has_image_extension(Path::new("a.gif"), &exts()));
        assert!(!has_image_extension(Path::new("jpg"), &exts()));
    }

    #[test]
    fn test_list_skips_directories_and_other_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a_1.png"), b"x").unwrap();
        fs::write(dir.path().join("a_2.JPG"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let mut files = list_image_files(dir.path(), &exts()).unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![dir.path().join("a_1.png"), dir.path().join("a_2.JPG")]
        );
    }

    #[test]
    fn test_list_missing_directory_errors() {
        let dir = tempdir().unwrap();
        assert!(list_image_files(&dir.path().join("missing"), &exts()).is_err());
    }
}
