//! Folder walking and content hashing.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::ImportError;

/// File extensions accepted by the importer (lower case).
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "webp", "heic"];

/// Reports whether `path` has a supported image extension (case-insensitive).
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Recursively lists supported image files under `root`, sorted by path.
pub fn scan_folder(root: &Path) -> Result<Vec<PathBuf>, ImportError> {
    if !root.is_dir() {
        return Err(ImportError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ImportError::Walk(e.to_string()))?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// SHA-256 of the file contents as lower-case hex.
pub fn content_hash(path: &Path) -> Result<String, ImportError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn supported_extensions() {
        assert!(is_supported(Path::new("a/b/IMG_001.JPG")));
        assert!(is_supported(Path::new("x.heic")));
        assert!(is_supported(Path::new("x.Tiff")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("x.jpg.faces.json")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn scan_is_recursive_and_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("2021")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        fs::write(dir.path().join("readme.md"), b"-").unwrap();
        fs::write(dir.path().join("2021").join("c.JPEG"), b"c").unwrap();

        let files = scan_folder(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["2021/c.JPEG", "a.png", "b.jpg"]);
    }

    #[test]
    fn scan_rejects_missing_dir() {
        let dir = tempdir().unwrap();
        let err = scan_folder(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ImportError::NotADirectory(_)));
    }

    #[test]
    fn hash_known_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.jpg");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            content_hash(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn identical_content_same_hash() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.jpg"), b"same bytes").unwrap();
        fs::write(dir.path().join("y.png"), b"same bytes").unwrap();
        assert_eq!(
            content_hash(&dir.path().join("x.jpg")).unwrap(),
            content_hash(&dir.path().join("y.png")).unwrap()
        );
    }
}
