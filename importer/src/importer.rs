use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use famphoto_catalog::{NewPhoto, PhotoCatalog};
use famphoto_faceid::{
    Clusterer, CommitReport, FaceIdError, IdAllocator, IdentityStore, NewFace, PhotoResolver,
    commit_outcome,
};
use tracing::{debug, error, info, warn};

use crate::metadata::read_metadata;
use crate::scan::{content_hash, scan_folder};
use crate::{FaceEncoder, ImportError};

/// Outcome of one folder import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Supported image files found under the folder.
    pub scanned: usize,
    /// Photos newly registered in the catalog.
    pub imported: usize,
    /// Files whose content hash was already in the catalog.
    pub skipped_duplicates: usize,
    /// Files that could not be read or described.
    pub failed: usize,
    /// Imported photos the encoder could not process.
    pub encode_failures: usize,
    pub faces_detected: usize,
    pub minted_identities: usize,
    /// Imported photos with at least one committed identity link.
    pub linked_photos: usize,
    /// Imported photos that carried faces but got no link.
    pub unlinked_photos: usize,
    /// Content hashes whose links could not be committed.
    pub unresolved: Vec<String>,
    /// Why the clustering pass failed, if it did. Nothing was linked then.
    pub pass_error: Option<String>,
}

impl ImportReport {
    pub fn pass_failed(&self) -> bool {
        self.pass_error.is_some()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "imported {} of {} photos ({} duplicates skipped, {} failed)",
            self.imported, self.scanned, self.skipped_duplicates, self.failed
        )?;
        writeln!(
            f,
            "detected {} faces, minted {} new people",
            self.faces_detected, self.minted_identities
        )?;
        write!(
            f,
            "linked {} photos, {} photos not yet linked",
            self.linked_photos, self.unlinked_photos
        )?;
        if let Some(e) = &self.pass_error {
            write!(f, "\nface linking failed: {e}")?;
        }
        Ok(())
    }
}

/// Builds the catalog entry for an image file.
///
/// Capture time, GPS position and camera come from EXIF. Without an EXIF
/// date the file's modification time is used. Only `DateTimeOriginal` marks
/// the capture time as accurate.
pub fn describe_photo(path: &Path, content_hash: &str) -> Result<NewPhoto, ImportError> {
    let meta = fs::metadata(path)?;
    let exif = read_metadata(path);
    let captured_at: DateTime<Utc> = match exif.taken_at {
        Some(t) => t,
        None => meta.modified()?.into(),
    };
    let format = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_uppercase())
    {
        Some(e) if e == "JPG" => "JPEG".to_string(),
        Some(e) => e,
        None => "UNKNOWN".to_string(),
    };

    Ok(NewPhoto {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_path: path.to_path_buf(),
        file_size: meta.len(),
        format,
        content_hash: content_hash.to_string(),
        captured_at,
        capture_time_accurate: exif.taken_at_original,
        location: exif.location,
        camera: exif.camera,
        imported_at: Utc::now(),
    })
}

/// Imports folders into a catalog and links their faces to identities.
pub struct Importer<'a, C, E> {
    catalog: &'a C,
    encoder: E,
    clusterer: Clusterer,
}

impl<'a, C, E> Importer<'a, C, E>
where
    C: PhotoCatalog + IdentityStore + PhotoResolver,
    E: FaceEncoder,
{
    pub fn new(catalog: &'a C, encoder: E, clusterer: Clusterer) -> Self {
        Self {
            catalog,
            encoder,
            clusterer,
        }
    }

    /// Imports every new photo under `root`, then runs one clustering pass
    /// over all faces found in them.
    ///
    /// Per-file problems are counted in the report. A failed clustering pass
    /// is reported through [`ImportReport::pass_error`]; the photos stay
    /// imported. Catalog failures while registering photos are returned as
    /// errors.
    pub fn import_folder(&self, root: &Path) -> Result<ImportReport, ImportError> {
        let files = scan_folder(root)?;
        info!("found {} image files under {}", files.len(), root.display());

        let mut report = ImportReport {
            scanned: files.len(),
            ..Default::default()
        };
        let mut faces: Vec<NewFace<String>> = Vec::new();

        for path in &files {
            let hash = match content_hash(path) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!("cannot hash {}: {e}", path.display());
                    report.failed += 1;
                    continue;
                }
            };
            if self.catalog.contains_hash(&hash)? {
                debug!("{} already in catalog, skipped", path.display());
                report.skipped_duplicates += 1;
                continue;
            }
            let photo = match describe_photo(path, &hash) {
                Ok(photo) => photo,
                Err(e) => {
                    warn!("cannot read {}: {e}", path.display());
                    report.failed += 1;
                    continue;
                }
            };
            self.catalog.add_photo(photo)?;
            report.imported += 1;

            match self.encoder.encode_faces(path) {
                Ok(encodings) => {
                    debug!("{} faces in {}", encodings.len(), path.display());
                    faces.extend(encodings.into_iter().map(|encoding| NewFace {
                        photo: hash.clone(),
                        encoding,
                    }));
                }
                Err(e) => {
                    warn!("face encoding failed for {}: {e}", path.display());
                    report.encode_failures += 1;
                }
            }
        }

        report.faces_detected = faces.len();
        self.link_faces(&faces, &mut report);

        info!(
            imported = report.imported,
            skipped = report.skipped_duplicates,
            faces = report.faces_detected,
            minted = report.minted_identities,
            "import finished"
        );
        Ok(report)
    }

    fn link_faces(&self, faces: &[NewFace<String>], report: &mut ImportReport) {
        if faces.is_empty() {
            return;
        }
        let photos_with_faces: HashSet<&str> = faces.iter().map(|f| f.photo.as_str()).collect();

        match self.run_pass(faces) {
            Ok(commit) => {
                report.minted_identities = commit.minted;
                report.linked_photos = commit.linked_photos();
                report.unlinked_photos = photos_with_faces.len().saturating_sub(report.linked_photos);
                let mut unresolved: Vec<String> =
                    commit.unresolved.into_iter().map(|u| u.photo).collect();
                unresolved.sort();
                unresolved.dedup();
                report.unresolved = unresolved;
            }
            Err(e) => {
                error!("face linking failed, nothing was linked: {e}");
                report.pass_error = Some(e.to_string());
                report.unlinked_photos = photos_with_faces.len();
            }
        }
    }

    fn run_pass(&self, faces: &[NewFace<String>]) -> Result<CommitReport<String>, FaceIdError> {
        let existing = self.catalog.load_identities()?;
        let alloc = IdAllocator::after(self.catalog.max_identity_id()?);
        let outcome = self.clusterer.cluster_with(&existing, faces, alloc)?;
        commit_outcome(&outcome, self.catalog, self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn describe_photo_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_7.jpg");
        fs::write(&path, b"12345").unwrap();

        let photo = describe_photo(&path, "abc").unwrap();
        assert_eq!(photo.file_name, "IMG_7.jpg");
        assert_eq!(photo.file_size, 5);
        assert_eq!(photo.format, "JPEG");
        assert_eq!(photo.content_hash, "abc");
        assert!(!photo.capture_time_accurate);
        assert_eq!(photo.location, None);
        assert_eq!(photo.camera, None);
    }

    #[test]
    fn describe_photo_prefers_exif() {
        use crate::metadata::tests::{sample_fields, write_tiff};
        use chrono::TimeZone;

        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.tiff");
        write_tiff(&path, &sample_fields());

        let photo = describe_photo(&path, "h").unwrap();
        assert_eq!(photo.format, "TIFF");
        assert_eq!(
            photo.captured_at,
            Utc.with_ymd_and_hms(2009, 7, 21, 16, 45, 10).unwrap()
        );
        assert!(photo.capture_time_accurate);
        assert_eq!(photo.camera.as_deref(), Some("Canon EOS 5D"));
        let (lat, lon) = photo.location.unwrap();
        assert!((lat - 52.5).abs() < 1e-9);
        assert!((lon + 13.26).abs() < 1e-9);
    }

    #[test]
    fn describe_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            describe_photo(&dir.path().join("gone.png"), "h"),
            Err(ImportError::Io(_))
        ));
    }

    #[test]
    fn report_display_mentions_failure() {
        let report = ImportReport {
            scanned: 3,
            imported: 2,
            unlinked_photos: 2,
            pass_error: Some("clustering unavailable: dimension mismatch".into()),
            ..Default::default()
        };
        let s = report.to_string();
        assert!(s.contains("imported 2 of 3 photos"));
        assert!(s.contains("2 photos not yet linked"));
        assert!(s.contains("face linking failed"));
        assert!(report.pass_failed());
    }
}
