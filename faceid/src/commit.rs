use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{ClusterOutcome, FaceIdError, IdentityStore, PhotoFaceLink, PhotoId, PhotoResolver};

/// A link that could not be committed because its photo was not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPhoto<R> {
    pub photo: R,
    pub reason: String,
}

/// What [`commit_outcome`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport<R> {
    pub minted: usize,
    pub linked: Vec<PhotoFaceLink>,
    pub unresolved: Vec<UnresolvedPhoto<R>>,
}

impl<R> CommitReport<R> {
    /// Distinct photos that received at least one link.
    pub fn linked_photos(&self) -> usize {
        self.linked
            .iter()
            .map(|l| l.photo_id)
            .collect::<HashSet<PhotoId>>()
            .len()
    }
}

/// Persists a clustering outcome.
///
/// Photo references are resolved first. A photo that cannot be resolved is
/// reported and its link skipped; the rest of the batch still commits.
/// Minted identities and resolved links are then written in one
/// [`IdentityStore::commit`] call, so a store failure writes nothing.
pub fn commit_outcome<R, P, S>(
    outcome: &ClusterOutcome<R>,
    resolver: &P,
    store: &S,
) -> Result<CommitReport<R>, FaceIdError>
where
    R: AsRef<str> + Clone,
    P: PhotoResolver + ?Sized,
    S: IdentityStore + ?Sized,
{
    let mut linked = Vec::with_capacity(outcome.links.len());
    let mut unresolved = Vec::new();

    for link in &outcome.links {
        let hash = link.photo.as_ref();
        match resolver.resolve_photo_id(hash) {
            Ok(Some(photo_id)) => linked.push(PhotoFaceLink {
                photo_id,
                identity_id: link.identity_id,
            }),
            Ok(None) => {
                warn!(photo = hash, identity = link.identity_id, "photo not in catalog, link skipped");
                unresolved.push(UnresolvedPhoto {
                    photo: link.photo.clone(),
                    reason: "photo not found in catalog".into(),
                });
            }
            Err(e) => {
                warn!(photo = hash, identity = link.identity_id, error = %e, "photo lookup failed, link skipped");
                unresolved.push(UnresolvedPhoto {
                    photo: link.photo.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    store.commit(&outcome.minted, &linked)?;
    debug!(
        minted = outcome.minted.len(),
        linked = linked.len(),
        unresolved = unresolved.len(),
        "committed clustering outcome"
    );

    Ok(CommitReport {
        minted: outcome.minted.len(),
        linked,
        unresolved,
    })
}
