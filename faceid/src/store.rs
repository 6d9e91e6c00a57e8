use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use crate::{FaceIdError, Identity, IdentityId, PhotoFaceLink, PhotoId};

/// Persists identities and photo-to-identity links.
///
/// Implementations must be safe for concurrent use. A clustering pass
/// assumes it is the only writer for its duration.
pub trait IdentityStore: Send + Sync {
    /// Returns every identity, ordered by id.
    fn load_identities(&self) -> Result<Vec<Identity>, FaceIdError>;

    /// Returns the largest identity id ever stored, or `None` if empty.
    fn max_identity_id(&self) -> Result<Option<IdentityId>, FaceIdError>;

    /// Writes minted identities, then links, atomically.
    ///
    /// Fails with [`FaceIdError::IdentityCollision`] if a minted id already
    /// exists and with [`FaceIdError::DanglingLink`] if a link points at an
    /// identity that is neither stored nor minted. On failure nothing is
    /// written.
    fn commit(&self, minted: &[Identity], links: &[PhotoFaceLink]) -> Result<(), FaceIdError>;
}

/// Resolves a photo's content hash to its catalog id.
pub trait PhotoResolver: Send + Sync {
    fn resolve_photo_id(&self, content_hash: &str) -> Result<Option<PhotoId>, FaceIdError>;
}

/// In-memory [`IdentityStore`] and [`PhotoResolver`].
/// Data is lost on restart. Suitable for testing or ephemeral use.
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

struct MemoryStoreInner {
    identities: BTreeMap<IdentityId, Identity>,
    links: Vec<PhotoFaceLink>,
    photos: HashMap<String, PhotoId>,
    photo_seq: PhotoId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreInner {
                identities: BTreeMap::new(),
                links: Vec::new(),
                photos: HashMap::new(),
                photo_seq: 0,
            }),
        }
    }

    /// Creates a store pre-populated with identities.
    pub fn with_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            for identity in identities {
                inner.identities.insert(identity.id, identity);
            }
        }
        store
    }

    /// Registers a photo under its content hash. Returns its photo id.
    /// Registering the same hash twice returns the existing id.
    pub fn add_photo(&self, content_hash: &str) -> PhotoId {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&id) = inner.photos.get(content_hash) {
            return id;
        }
        inner.photo_seq += 1;
        let id = inner.photo_seq;
        inner.photos.insert(content_hash.to_string(), id);
        id
    }

    /// Returns all links in commit order.
    pub fn links(&self) -> Vec<PhotoFaceLink> {
        self.inner.lock().unwrap().links.clone()
    }

    /// Renames an identity. Returns false if it does not exist.
    pub fn rename(&self, id: IdentityId, label: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.identities.get_mut(&id) {
            Some(identity) => {
                identity.label = label.to_string();
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityStore for MemoryStore {
    fn load_identities(&self) -> Result<Vec<Identity>, FaceIdError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.identities.values().cloned().collect())
    }

    fn max_identity_id(&self) -> Result<Option<IdentityId>, FaceIdError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.identities.keys().next_back().copied())
    }

    fn commit(&self, minted: &[Identity], links: &[PhotoFaceLink]) -> Result<(), FaceIdError> {
        let mut inner = self.inner.lock().unwrap();

        // Validate everything before touching state.
        let mut new_ids = HashSet::new();
        for identity in minted {
            if inner.identities.contains_key(&identity.id) || !new_ids.insert(identity.id) {
                return Err(FaceIdError::IdentityCollision(identity.id));
            }
        }
        for link in links {
            if !inner.identities.contains_key(&link.identity_id)
                && !new_ids.contains(&link.identity_id)
            {
                return Err(FaceIdError::DanglingLink {
                    photo_id: link.photo_id,
                    identity_id: link.identity_id,
                });
            }
        }

        for identity in minted {
            inner.identities.insert(identity.id, identity.clone());
        }
        inner.links.extend_from_slice(links);
        Ok(())
    }
}

impl PhotoResolver for MemoryStore {
    fn resolve_photo_id(&self, content_hash: &str) -> Result<Option<PhotoId>, FaceIdError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.photos.get(content_hash).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photos_get_sequential_ids() {
        let store = MemoryStore::new();
        assert_eq!(store.add_photo("aa"), 1);
        assert_eq!(store.add_photo("bb"), 2);
        assert_eq!(store.add_photo("aa"), 1);
        assert_eq!(store.resolve_photo_id("bb").unwrap(), Some(2));
        assert_eq!(store.resolve_photo_id("zz").unwrap(), None);
    }

    #[test]
    fn commit_and_load() {
        let store = MemoryStore::new();
        assert_eq!(store.max_identity_id().unwrap(), None);

        let minted = vec![
            Identity::new(1, vec![1.0], "Unnamed-1"),
            Identity::new(2, vec![2.0], "Unnamed-2"),
        ];
        let links = vec![
            PhotoFaceLink {
                photo_id: 1,
                identity_id: 2,
            },
            PhotoFaceLink {
                photo_id: 1,
                identity_id: 2,
            },
        ];
        store.commit(&minted, &links).unwrap();

        assert_eq!(store.load_identities().unwrap(), minted);
        assert_eq!(store.max_identity_id().unwrap(), Some(2));
        // Duplicate pairs are kept: two faces of one person in one photo.
        assert_eq!(store.links().len(), 2);
    }

    #[test]
    fn collision_aborts_whole_commit() {
        let store = MemoryStore::with_identities([Identity::new(3, vec![0.0], "Mom")]);
        let minted = vec![
            Identity::new(4, vec![1.0], "Unnamed-4"),
            Identity::new(3, vec![1.0], "Unnamed-3"),
        ];
        let err = store.commit(&minted, &[]).unwrap_err();
        assert!(matches!(err, FaceIdError::IdentityCollision(3)));
        assert_eq!(store.load_identities().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_minted_ids_collide() {
        let store = MemoryStore::new();
        let minted = vec![
            Identity::new(1, vec![1.0], "Unnamed-1"),
            Identity::new(1, vec![2.0], "Unnamed-1"),
        ];
        assert!(matches!(
            store.commit(&minted, &[]),
            Err(FaceIdError::IdentityCollision(1))
        ));
    }

    #[test]
    fn dangling_link_rejected() {
        let store = MemoryStore::new();
        let links = vec![PhotoFaceLink {
            photo_id: 1,
            identity_id: 99,
        }];
        assert!(matches!(
            store.commit(&[], &links),
            Err(FaceIdError::DanglingLink {
                photo_id: 1,
                identity_id: 99
            })
        ));
        assert!(store.links().is_empty());
    }

    #[test]
    fn rename_by_id() {
        let store = MemoryStore::with_identities([
            Identity::new(1, vec![0.0], "Unnamed-1"),
            Identity::new(2, vec![1.0], "Unnamed-1"),
        ]);
        assert!(store.rename(2, "Grandma"));
        assert!(!store.rename(5, "Nobody"));
        let labels: Vec<String> = store
            .load_identities()
            .unwrap()
            .into_iter()
            .map(|i| i.label)
            .collect();
        assert_eq!(labels, vec!["Unnamed-1", "Grandma"]);
    }
}
