//! Face identity clustering with stable identity ids across import runs.
//!
//! Each import pass hands the [`Clusterer`] the full snapshot of known
//! identities plus the face encodings found in the newly imported photos.
//! Every new face is resolved to exactly one identity: an existing one when
//! the face clusters together with that identity's representative, or a
//! freshly minted `Unnamed-<n>` identity otherwise.
//!
//! # Usage
//!
//! ```
//! use famphoto_faceid::{ClusterConfig, Clusterer, Identity, NewFace};
//!
//! let clusterer = Clusterer::new(ClusterConfig {
//!     eps: 0.5,
//!     min_samples: 2,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let existing = vec![Identity::new(7, vec![0.0, 0.0], "Grandma")];
//! let faces = vec![NewFace::<String>::new("hash-a", vec![0.1, 0.0])];
//!
//! let outcome = clusterer.cluster(&existing, &faces).unwrap();
//! assert_eq!(outcome.links[0].identity_id, 7);
//! assert!(outcome.minted.is_empty());
//! ```
//!
//! # Design
//!
//! The [`Clusterer`] is purely computational. Persisting its
//! [`ClusterOutcome`] goes through [`commit_outcome`], which resolves photo
//! references via a [`PhotoResolver`] and writes minted identities and links
//! in one [`IdentityStore::commit`] call.
//!
//! Identity ids are never derived from labels: labels are user-editable and
//! may collide, ids may not.

mod cluster;
mod commit;
mod config;
mod dbscan;
mod distance;
mod encoding;
mod error;
mod histogram;
mod nearest;
mod store;
mod types;

pub use cluster::{Clusterer, IdAllocator};
pub use commit::{CommitReport, UnresolvedPhoto, commit_outcome};
pub use config::{ClusterConfig, Strategy};
pub use dbscan::{NOISE, dbscan};
pub use distance::{Metric, cosine_similarity, euclidean_distance};
pub use encoding::{decode_blob, encode_blob};
pub use error::FaceIdError;
pub use histogram::{DistanceHistogram, distance_histogram};
pub use store::{IdentityStore, MemoryStore, PhotoResolver};
pub use types::{
    ClusterOutcome, FaceLink, Identity, IdentityId, NewFace, PhotoFaceLink, PhotoId,
    unnamed_label,
};
