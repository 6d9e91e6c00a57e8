use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity ids are assigned monotonically and never reused.
pub type IdentityId = u64;

/// Catalog id of a photo.
pub type PhotoId = u64;

/// Placeholder label for an identity nobody has named yet.
pub fn unnamed_label(n: IdentityId) -> String {
    format!("Unnamed-{n}")
}

/// A persistent person, anchored by one representative encoding.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,

    /// Comparison anchor. Never updated after the identity is minted.
    pub encoding: Vec<f64>,

    /// Human-readable name, editable by the user.
    pub label: String,
}

impl Identity {
    pub fn new(id: IdentityId, encoding: Vec<f64>, label: impl Into<String>) -> Self {
        Self {
            id,
            encoding,
            label: label.into(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("encoding_len", &self.encoding.len())
            .finish()
    }
}

/// One face encoding from the current batch, tagged with its source photo.
///
/// `R` is the photo reference; the import pipeline uses the photo's content
/// hash.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFace<R> {
    pub photo: R,
    pub encoding: Vec<f64>,
}

impl<R> NewFace<R> {
    pub fn new(photo: impl Into<R>, encoding: Vec<f64>) -> Self {
        Self {
            photo: photo.into(),
            encoding,
        }
    }
}

/// The identity a new face was assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceLink<R> {
    pub photo: R,
    pub identity_id: IdentityId,
    /// True when the identity was minted in this pass, for the face that
    /// seeded it and for every later face linked to it.
    pub minted: bool,
}

/// Result of one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome<R> {
    /// One link per new face, in input order.
    pub links: Vec<FaceLink<R>>,

    /// Identities minted in this pass, in allocation order.
    pub minted: Vec<Identity>,
}

impl<R> ClusterOutcome<R> {
    pub fn empty() -> Self {
        Self {
            links: Vec::new(),
            minted: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.minted.is_empty()
    }
}

impl<R> Default for ClusterOutcome<R> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A persisted photo-to-identity association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoFaceLink {
    pub photo_id: PhotoId,
    pub identity_id: IdentityId,
}
