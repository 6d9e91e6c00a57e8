//! Face encoder seam.
//!
//! Detection and encoding happen outside this workspace. The importer only
//! needs something that maps an image file to zero or more fixed-length
//! vectors, one per detected face.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ImportError;

/// Maps an image to one encoding per detected face.
pub trait FaceEncoder: Send + Sync {
    fn encode_faces(&self, image: &Path) -> Result<Vec<Vec<f64>>, ImportError>;
}

/// Suffix appended to an image path to locate its sidecar.
pub const SIDECAR_SUFFIX: &str = ".faces.json";

/// Reads precomputed encodings from a JSON sidecar next to each image.
///
/// For `IMG_0001.jpg` the sidecar is `IMG_0001.jpg.faces.json` and holds an
/// array of arrays of numbers. A missing sidecar means no faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarEncoder;

impl SidecarEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut name = image.as_os_str().to_os_string();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }
}

impl FaceEncoder for SidecarEncoder {
    fn encode_faces(&self, image: &Path) -> Result<Vec<Vec<f64>>, ImportError> {
        let path = Self::sidecar_path(image);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no sidecar for {}", image.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let faces: Vec<Vec<f64>> = serde_json::from_slice(&data)
            .map_err(|e| ImportError::Encoder(format!("{}: {e}", path.display())))?;
        if let Some(i) = faces.iter().position(|f| f.is_empty()) {
            return Err(ImportError::Encoder(format!(
                "{}: face {i} has an empty encoding",
                path.display()
            )));
        }
        Ok(faces)
    }
}
