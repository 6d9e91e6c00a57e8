//! Redb-backed persistent catalog.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use famphoto_faceid::{
    FaceIdError, Identity, IdentityId, IdentityStore, PhotoFaceLink, PhotoId, PhotoResolver,
    decode_blob, encode_blob, unnamed_label,
};
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info};

use crate::{CatalogError, CatalogResult, NewPhoto, PhotoCatalog, PhotoRecord};

/// Photo id -> JSON-encoded [`PhotoRecord`].
const PHOTOS: TableDefinition<u64, &str> = TableDefinition::new("photos");
/// Content hash -> photo id.
const PHOTO_HASHES: TableDefinition<&str, u64> = TableDefinition::new("photo_hashes");
/// Identity id -> representative encoding blob.
const IDENTITY_ENCODINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("identity_encodings");
/// Identity id -> label.
const IDENTITY_LABELS: TableDefinition<u64, &str> = TableDefinition::new("identity_labels");
/// Link sequence -> (photo id, identity id).
const LINKS: TableDefinition<u64, (u64, u64)> = TableDefinition::new("photo_face_links");
/// Counters that must survive deletes.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Next photo id. Photo ids are never reused, even after a delete.
const NEXT_PHOTO_ID: &str = "next_photo_id";

trait OrStorage<T> {
    fn or_storage(self) -> CatalogResult<T>;
}

impl<T, E: fmt::Display> OrStorage<T> for Result<T, E> {
    fn or_storage(self) -> CatalogResult<T> {
        self.map_err(|e| CatalogError::Storage(e.to_string()))
    }
}

/// Next free key in a table keyed by sequence numbers starting at 1.
fn next_key<V: redb::Value + 'static>(table: &impl ReadableTable<u64, V>) -> CatalogResult<u64> {
    Ok(table.last().or_storage()?.map_or(1, |(k, _)| k.value() + 1))
}

/// A persistent catalog backed by redb.
pub struct RedbCatalog {
    db: Database,
}

impl RedbCatalog {
    /// Open or create a catalog at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path).or_storage()?;

        // Create the tables if they don't exist
        let tx = db.begin_write().or_storage()?;
        {
            tx.open_table(PHOTOS).or_storage()?;
            tx.open_table(PHOTO_HASHES).or_storage()?;
            tx.open_table(IDENTITY_ENCODINGS).or_storage()?;
            tx.open_table(IDENTITY_LABELS).or_storage()?;
            tx.open_table(LINKS).or_storage()?;
            tx.open_table(META).or_storage()?;
        }
        tx.commit().or_storage()?;

        info!("opened catalog at {}", path.display());
        Ok(Self { db })
    }

    /// Returns a photo by id.
    pub fn photo(&self, id: PhotoId) -> CatalogResult<Option<PhotoRecord>> {
        let tx = self.db.begin_read().or_storage()?;
        let table = tx.open_table(PHOTOS).or_storage()?;
        let photo = match table.get(id).or_storage()? {
            Some(json) => Some(serde_json::from_str(json.value())?),
            None => None,
        };
        Ok(photo)
    }

    /// Returns all photos ordered by capture time, oldest first.
    pub fn photos(&self) -> CatalogResult<Vec<PhotoRecord>> {
        let tx = self.db.begin_read().or_storage()?;
        let table = tx.open_table(PHOTOS).or_storage()?;

        let mut photos = Vec::new();
        for item in table.iter().or_storage()? {
            let (_, json) = item.or_storage()?;
            photos.push(serde_json::from_str::<PhotoRecord>(json.value())?);
        }
        sort_by_capture(&mut photos);
        Ok(photos)
    }

    /// Removes a photo and every link that references it.
    /// Returns false if the photo did not exist.
    pub fn delete_photo(&self, id: PhotoId) -> CatalogResult<bool> {
        let tx = self.db.begin_write().or_storage()?;
        {
            let mut photos = tx.open_table(PHOTOS).or_storage()?;
            let record: PhotoRecord = match photos.remove(id).or_storage()? {
                Some(json) => serde_json::from_str(json.value())?,
                None => return Ok(false),
            };

            let mut hashes = tx.open_table(PHOTO_HASHES).or_storage()?;
            hashes.remove(record.content_hash.as_str()).or_storage()?;

            let mut links = tx.open_table(LINKS).or_storage()?;
            let mut doomed = Vec::new();
            for item in links.iter().or_storage()? {
                let (seq, pair) = item.or_storage()?;
                if pair.value().0 == id {
                    doomed.push(seq.value());
                }
            }
            for seq in doomed {
                links.remove(seq).or_storage()?;
            }
        }
        tx.commit().or_storage()?;
        debug!(photo = id, "deleted photo");
        Ok(true)
    }

    /// Returns all identities ordered by id.
    pub fn identities(&self) -> CatalogResult<Vec<Identity>> {
        let tx = self.db.begin_read().or_storage()?;
        let encodings = tx.open_table(IDENTITY_ENCODINGS).or_storage()?;
        let labels = tx.open_table(IDENTITY_LABELS).or_storage()?;

        let mut out = Vec::new();
        for item in encodings.iter().or_storage()? {
            let (id, blob) = item.or_storage()?;
            let id = id.value();
            let encoding = decode_blob(blob.value())?;
            let label = match labels.get(id).or_storage()? {
                Some(label) => label.value().to_string(),
                None => unnamed_label(id),
            };
            out.push(Identity::new(id, encoding, label));
        }
        Ok(out)
    }

    /// Renames an identity. Identities are addressed by id only.
    pub fn rename_identity(&self, id: IdentityId, label: &str) -> CatalogResult<()> {
        let tx = self.db.begin_write().or_storage()?;
        {
            let mut labels = tx.open_table(IDENTITY_LABELS).or_storage()?;
            if labels.get(id).or_storage()?.is_none() {
                return Err(CatalogError::IdentityNotFound(id));
            }
            labels.insert(id, label).or_storage()?;
        }
        tx.commit().or_storage()?;
        info!(identity = id, label, "renamed identity");
        Ok(())
    }

    /// Returns all links in commit order.
    pub fn links(&self) -> CatalogResult<Vec<PhotoFaceLink>> {
        let tx = self.db.begin_read().or_storage()?;
        let table = tx.open_table(LINKS).or_storage()?;

        let mut out = Vec::new();
        for item in table.iter().or_storage()? {
            let (_, pair) = item.or_storage()?;
            let (photo_id, identity_id) = pair.value();
            out.push(PhotoFaceLink {
                photo_id,
                identity_id,
            });
        }
        Ok(out)
    }

    /// Identities linked to a photo, in link order, without repeats.
    pub fn identities_of_photo(&self, photo_id: PhotoId) -> CatalogResult<Vec<Identity>> {
        let mut seen = HashSet::new();
        let ids: Vec<IdentityId> = self
            .links()?
            .into_iter()
            .filter(|l| l.photo_id == photo_id && seen.insert(l.identity_id))
            .map(|l| l.identity_id)
            .collect();

        let mut all: HashMap<IdentityId, Identity> =
            self.identities()?.into_iter().map(|i| (i.id, i)).collect();
        Ok(ids.into_iter().filter_map(|id| all.remove(&id)).collect())
    }

    /// Photos showing an identity, ordered by capture time.
    pub fn photos_of_identity(&self, identity_id: IdentityId) -> CatalogResult<Vec<PhotoRecord>> {
        let mut seen = HashSet::new();
        let mut photos = Vec::new();
        for link in self.links()? {
            if link.identity_id != identity_id || !seen.insert(link.photo_id) {
                continue;
            }
            if let Some(photo) = self.photo(link.photo_id)? {
                photos.push(photo);
            }
        }
        sort_by_capture(&mut photos);
        Ok(photos)
    }

    /// Number of distinct photos linked to each identity.
    pub fn photo_counts(&self) -> CatalogResult<BTreeMap<IdentityId, usize>> {
        let distinct: HashSet<PhotoFaceLink> = self.links()?.into_iter().collect();
        let mut counts = BTreeMap::new();
        for link in distinct {
            *counts.entry(link.identity_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn commit_pass(&self, minted: &[Identity], links: &[PhotoFaceLink]) -> CatalogResult<()> {
        let tx = self.db.begin_write().or_storage()?;
        {
            let mut encodings = tx.open_table(IDENTITY_ENCODINGS).or_storage()?;
            let mut labels = tx.open_table(IDENTITY_LABELS).or_storage()?;
            let mut link_table = tx.open_table(LINKS).or_storage()?;

            // Returning early drops the transaction uncommitted.
            for identity in minted {
                if labels.get(identity.id).or_storage()?.is_some() {
                    return Err(FaceIdError::IdentityCollision(identity.id).into());
                }
                let blob = encode_blob(&identity.encoding)?;
                encodings.insert(identity.id, blob.as_slice()).or_storage()?;
                labels.insert(identity.id, identity.label.as_str()).or_storage()?;
            }

            let mut seq = next_key(&link_table)?;
            for link in links {
                if labels.get(link.identity_id).or_storage()?.is_none() {
                    return Err(FaceIdError::DanglingLink {
                        photo_id: link.photo_id,
                        identity_id: link.identity_id,
                    }
                    .into());
                }
                link_table
                    .insert(seq, (link.photo_id, link.identity_id))
                    .or_storage()?;
                seq += 1;
            }
        }
        tx.commit().or_storage()?;
        Ok(())
    }
}

fn sort_by_capture(photos: &mut [PhotoRecord]) {
    photos.sort_by(|a, b| a.captured_at.cmp(&b.captured_at).then(a.id.cmp(&b.id)));
}

impl PhotoCatalog for RedbCatalog {
    fn contains_hash(&self, content_hash: &str) -> CatalogResult<bool> {
        let tx = self.db.begin_read().or_storage()?;
        let table = tx.open_table(PHOTO_HASHES).or_storage()?;
        let found = table.get(content_hash).or_storage()?.is_some();
        Ok(found)
    }

    fn add_photo(&self, photo: NewPhoto) -> CatalogResult<PhotoRecord> {
        let tx = self.db.begin_write().or_storage()?;
        let record = {
            let mut hashes = tx.open_table(PHOTO_HASHES).or_storage()?;
            if hashes.get(photo.content_hash.as_str()).or_storage()?.is_some() {
                return Err(CatalogError::DuplicatePhoto(photo.content_hash));
            }

            let mut photos = tx.open_table(PHOTOS).or_storage()?;
            let mut meta = tx.open_table(META).or_storage()?;
            let stored = meta.get(NEXT_PHOTO_ID).or_storage()?.map(|v| v.value());
            let id = match stored {
                Some(id) => id.max(next_key(&photos)?),
                None => next_key(&photos)?,
            };
            let next = id
                .checked_add(1)
                .ok_or_else(|| CatalogError::Storage("photo ids exhausted".into()))?;
            meta.insert(NEXT_PHOTO_ID, next).or_storage()?;
            let record = photo.into_record(id);
            let json = serde_json::to_string(&record)?;
            photos.insert(id, json.as_str()).or_storage()?;
            hashes.insert(record.content_hash.as_str(), id).or_storage()?;
            record
        };
        tx.commit().or_storage()?;

        debug!(photo = record.id, hash = %record.content_hash, "registered photo");
        Ok(record)
    }
}

impl IdentityStore for RedbCatalog {
    fn load_identities(&self) -> Result<Vec<Identity>, FaceIdError> {
        Ok(self.identities()?)
    }

    fn max_identity_id(&self) -> Result<Option<IdentityId>, FaceIdError> {
        let tx = self.db.begin_read().or_storage()?;
        let labels = tx.open_table(IDENTITY_LABELS).or_storage()?;
        let max = labels.last().or_storage()?.map(|(k, _)| k.value());
        Ok(max)
    }

    fn commit(&self, minted: &[Identity], links: &[PhotoFaceLink]) -> Result<(), FaceIdError> {
        self.commit_pass(minted, links)?;
        debug!(
            minted = minted.len(),
            links = links.len(),
            "committed identities and links"
        );
        Ok(())
    }
}

impl PhotoResolver for RedbCatalog {
    fn resolve_photo_id(&self, content_hash: &str) -> Result<Option<PhotoId>, FaceIdError> {
        let tx = self.db.begin_read().or_storage()?;
        let table = tx.open_table(PHOTO_HASHES).or_storage()?;
        let id = table.get(content_hash).or_storage()?.map(|id| id.value());
        Ok(id)
    }
}
