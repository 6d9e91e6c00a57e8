use std::collections::HashMap;

use tracing::debug;

use crate::dbscan::{NOISE, dbscan};
use crate::encoding::check_population;
use crate::nearest;
use crate::{
    ClusterConfig, ClusterOutcome, FaceIdError, FaceLink, Identity, IdentityId, NewFace, Strategy,
    unnamed_label,
};

/// Hands out identity ids for one pass.
///
/// Seeded from the largest id already in the store, so ids never collide
/// with stored ones even across restarts. No counter is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    /// `None` once `IdentityId::MAX` has been handed out or observed.
    next: Option<IdentityId>,
}

impl IdAllocator {
    /// Starts after `max_existing`, or at 1 when the store is empty.
    pub fn after(max_existing: Option<IdentityId>) -> Self {
        Self {
            next: max_existing.map_or(Some(1), |m| m.checked_add(1)),
        }
    }

    /// Makes sure `id` will never be handed out.
    pub fn observe(&mut self, id: IdentityId) {
        if let Some(next) = self.next {
            if id >= next {
                self.next = id.checked_add(1);
            }
        }
    }

    /// The id the next call to [`allocate`](Self::allocate) returns, or
    /// `None` when the id space is used up.
    pub fn peek(&self) -> Option<IdentityId> {
        self.next
    }

    pub fn allocate(&mut self) -> Result<IdentityId, FaceIdError> {
        let id = self.next.ok_or(FaceIdError::IdsExhausted)?;
        self.next = id.checked_add(1);
        Ok(id)
    }

    /// Allocates an id and builds the `Unnamed-<n>` identity for `encoding`.
    pub(crate) fn mint(&mut self, encoding: &[f64]) -> Result<Identity, FaceIdError> {
        let id = self.allocate()?;
        Ok(Identity::new(id, encoding.to_vec(), unnamed_label(id)))
    }
}

/// Assigns each new face of a batch to an existing or a new identity.
///
/// Stateless between passes: every call receives a fresh snapshot of the
/// known identities and never mutates it.
#[derive(Debug, Clone)]
pub struct Clusterer {
    cfg: ClusterConfig,
}

impl Clusterer {
    pub fn new(cfg: ClusterConfig) -> Result<Self, FaceIdError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.cfg
    }

    /// Clusters `faces` against `existing`, seeding the id allocator from the
    /// largest id in the snapshot.
    pub fn cluster<R: Clone>(
        &self,
        existing: &[Identity],
        faces: &[NewFace<R>],
    ) -> Result<ClusterOutcome<R>, FaceIdError> {
        self.cluster_with(existing, faces, IdAllocator::after(None))
    }

    /// Like [`cluster`](Self::cluster), with an allocator seeded by the
    /// caller (typically from the store's max identity id).
    ///
    /// The allocator is advanced past every id in `existing` regardless of
    /// its seed.
    pub fn cluster_with<R: Clone>(
        &self,
        existing: &[Identity],
        faces: &[NewFace<R>],
        mut alloc: IdAllocator,
    ) -> Result<ClusterOutcome<R>, FaceIdError> {
        if faces.is_empty() {
            debug!("no new faces, skipping clustering");
            return Ok(ClusterOutcome::empty());
        }
        for identity in existing {
            alloc.observe(identity.id);
        }

        let outcome = match self.cfg.strategy {
            Strategy::Density => self.density(existing, faces, alloc)?,
            Strategy::NearestRepresentative => nearest::assign(&self.cfg, existing, faces, alloc)?,
        };

        debug!(
            existing = existing.len(),
            faces = faces.len(),
            minted = outcome.minted.len(),
            strategy = %self.cfg.strategy,
            "clustering pass done"
        );
        Ok(outcome)
    }

    fn density<R: Clone>(
        &self,
        existing: &[Identity],
        faces: &[NewFace<R>],
        mut alloc: IdAllocator,
    ) -> Result<ClusterOutcome<R>, FaceIdError> {
        // Existing representatives occupy [0, E), new faces [E, E+N).
        let population: Vec<&[f64]> = existing
            .iter()
            .map(|i| i.encoding.as_slice())
            .chain(faces.iter().map(|f| f.encoding.as_slice()))
            .collect();
        check_population(&population)?;

        let labels = dbscan(
            &population,
            self.cfg.eps,
            self.cfg.min_samples,
            self.cfg.metric,
        );
        if labels.len() != population.len() {
            return Err(FaceIdError::ClusteringUnavailable(format!(
                "expected {} labels, got {}",
                population.len(),
                labels.len()
            )));
        }
        let (existing_labels, new_labels) = labels.split_at(existing.len());

        // Cluster label -> (identity, minted in this pass). A cluster holding
        // several existing identities resolves to the lowest id among them.
        let mut resolved: HashMap<i32, (IdentityId, bool)> = HashMap::new();
        for (identity, &label) in existing.iter().zip(existing_labels) {
            if label == NOISE {
                continue;
            }
            resolved
                .entry(label)
                .and_modify(|(id, _)| *id = (*id).min(identity.id))
                .or_insert((identity.id, false));
        }

        let mut links = Vec::with_capacity(faces.len());
        let mut minted = Vec::new();
        for (face, &label) in faces.iter().zip(new_labels) {
            let known = if label == NOISE {
                None
            } else {
                resolved.get(&label).copied()
            };
            let (identity_id, is_new) = match known {
                Some(hit) => hit,
                None => {
                    let identity = alloc.mint(&face.encoding)?;
                    let id = identity.id;
                    minted.push(identity);
                    // The first face of a cluster without existing members
                    // seeds the identity for the rest of that cluster.
                    if label != NOISE {
                        resolved.insert(label, (id, true));
                    }
                    (id, true)
                }
            };
            links.push(FaceLink {
                photo: face.photo.clone(),
                identity_id,
                minted: is_new,
            });
        }

        Ok(ClusterOutcome { links, minted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;

    fn clusterer(eps: f64, min_samples: usize) -> Clusterer {
        Clusterer::new(ClusterConfig {
            eps,
            min_samples,
            ..Default::default()
        })
        .unwrap()
    }

    fn face(photo: &str, encoding: Vec<f64>) -> NewFace<String> {
        NewFace::new(photo, encoding)
    }

    #[test]
    fn allocator_seeding() {
        assert_eq!(IdAllocator::after(None).peek(), Some(1));
        assert_eq!(IdAllocator::after(Some(41)).peek(), Some(42));

        let mut alloc = IdAllocator::after(Some(3));
        alloc.observe(2);
        assert_eq!(alloc.peek(), Some(4));
        alloc.observe(9);
        assert_eq!(alloc.allocate().unwrap(), 10);
        assert_eq!(alloc.allocate().unwrap(), 11);
    }

    #[test]
    fn allocator_stops_at_max_id() {
        let mut alloc = IdAllocator::after(Some(u64::MAX - 1));
        assert_eq!(alloc.allocate().unwrap(), u64::MAX);
        assert_eq!(alloc.peek(), None);
        assert!(matches!(alloc.allocate(), Err(FaceIdError::IdsExhausted)));

        let mut alloc = IdAllocator::after(Some(5));
        alloc.observe(u64::MAX);
        assert!(matches!(alloc.allocate(), Err(FaceIdError::IdsExhausted)));
        assert_eq!(IdAllocator::after(Some(u64::MAX)).peek(), None);
    }

    #[test]
    fn exhausted_ids_fail_the_pass() {
        let existing = vec![Identity::new(u64::MAX, vec![0.0, 0.0], "last")];
        let faces = vec![face("p1", vec![9.0, 9.0])];
        assert!(matches!(
            clusterer(0.5, 2).cluster(&existing, &faces),
            Err(FaceIdError::IdsExhausted)
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let err = Clusterer::new(ClusterConfig {
            eps: 0.0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, FaceIdError::InvalidConfig(_)));
    }

    #[test]
    fn empty_batch_short_circuits() {
        // Mismatched dimensions would fail clustering; an empty batch must
        // return before the population is even looked at.
        let existing = vec![
            Identity::new(1, vec![0.0, 0.0], "a"),
            Identity::new(2, vec![0.0, 0.0, 0.0], "b"),
        ];
        let faces: Vec<NewFace<String>> = Vec::new();
        let outcome = clusterer(0.5, 2).cluster(&existing, &faces).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn empty_store_far_apart_faces_mint_one_each() {
        let faces = vec![
            face("p1", vec![0.0, 0.0]),
            face("p2", vec![10.0, 0.0]),
            face("p3", vec![0.0, 10.0]),
        ];
        let outcome = clusterer(0.5, 3).cluster(&[], &faces).unwrap();

        let ids: Vec<IdentityId> = outcome.links.iter().map(|l| l.identity_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(outcome.links.iter().all(|l| l.minted));
        let labels: Vec<&str> = outcome.minted.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Unnamed-1", "Unnamed-2", "Unnamed-3"]);
        assert_eq!(outcome.minted[1].encoding, vec![10.0, 0.0]);
    }

    #[test]
    fn new_only_cluster_mints_single_identity() {
        let faces: Vec<NewFace<String>> = (0..5)
            .map(|i| face(&format!("p{i}"), vec![0.01 * i as f64, 0.0]))
            .collect();
        let outcome = clusterer(0.5, 3).cluster(&[], &faces).unwrap();

        assert_eq!(outcome.minted.len(), 1);
        assert_eq!(outcome.minted[0].id, 1);
        assert_eq!(outcome.minted[0].encoding, faces[0].encoding);
        assert_eq!(outcome.links.len(), 5);
        assert!(outcome.links.iter().all(|l| l.identity_id == 1));
        assert!(outcome.links.iter().all(|l| l.minted));
    }

    #[test]
    fn face_near_existing_resolves_to_it() {
        let existing = vec![Identity::new(7, vec![1.0, 1.0, 1.0], "Grandpa")];
        let faces = vec![face("p1", vec![1.1, 1.0, 1.0])];
        let outcome = clusterer(0.5, 2).cluster(&existing, &faces).unwrap();

        assert!(outcome.minted.is_empty());
        assert_eq!(
            outcome.links,
            vec![FaceLink {
                photo: "p1".to_string(),
                identity_id: 7,
                minted: false,
            }]
        );
    }

    #[test]
    fn minted_ids_follow_snapshot_max() {
        let existing = vec![
            Identity::new(3, vec![0.0, 0.0], "a"),
            Identity::new(12, vec![5.0, 5.0], "b"),
        ];
        let faces = vec![face("p1", vec![-20.0, 0.0]), face("p2", vec![20.0, 0.0])];
        let outcome = clusterer(0.5, 2).cluster(&existing, &faces).unwrap();

        let ids: Vec<IdentityId> = outcome.minted.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![13, 14]);
    }

    #[test]
    fn caller_seeded_allocator_wins_when_larger() {
        let existing = vec![Identity::new(3, vec![0.0, 0.0], "a")];
        let faces = vec![face("p1", vec![9.0, 9.0])];
        let outcome = clusterer(0.5, 2)
            .cluster_with(&existing, &faces, IdAllocator::after(Some(20)))
            .unwrap();
        assert_eq!(outcome.minted[0].id, 21);
    }

    #[test]
    fn shared_cluster_with_two_existing_picks_lowest_id() {
        let existing = vec![
            Identity::new(9, vec![0.0, 0.0], "twin b"),
            Identity::new(4, vec![0.2, 0.0], "twin a"),
        ];
        let faces = vec![face("p1", vec![0.1, 0.0])];
        let outcome = clusterer(0.5, 2).cluster(&existing, &faces).unwrap();
        assert_eq!(outcome.links[0].identity_id, 4);
    }

    #[test]
    fn mixed_batch_keeps_input_order() {
        let existing = vec![Identity::new(1, vec![0.0, 0.0], "Mom")];
        let faces = vec![
            face("a", vec![30.0, 30.0]),
            face("b", vec![0.1, 0.0]),
            face("c", vec![-30.0, 30.0]),
            face("a", vec![0.0, 0.1]),
        ];
        let outcome = clusterer(0.5, 2).cluster(&existing, &faces).unwrap();

        let got: Vec<(&str, IdentityId)> = outcome
            .links
            .iter()
            .map(|l| (l.photo.as_str(), l.identity_id))
            .collect();
        assert_eq!(got, vec![("a", 2), ("b", 1), ("c", 3), ("a", 1)]);
    }

    #[test]
    fn existing_snapshot_is_untouched() {
        let existing = vec![
            Identity::new(1, vec![0.0, 0.0], "Mom"),
            Identity::new(2, vec![4.0, 4.0], "Dad"),
        ];
        let before = existing.clone();
        let faces = vec![face("p", vec![0.05, 0.0]), face("q", vec![4.0, 4.05])];
        let outcome = clusterer(0.5, 2).cluster(&existing, &faces).unwrap();

        assert_eq!(existing, before);
        assert!(outcome.minted.is_empty());
    }

    #[test]
    fn dimension_mismatch_is_clustering_unavailable() {
        let existing = vec![Identity::new(1, vec![0.0; 128], "a")];
        let faces = vec![face("p", vec![0.0; 64])];
        let err = clusterer(0.5, 2).cluster(&existing, &faces).unwrap_err();
        assert!(matches!(err, FaceIdError::ClusteringUnavailable(_)));
    }

    #[test]
    fn deterministic_across_runs() {
        let existing = vec![Identity::new(5, vec![1.0, 0.0], "x")];
        let faces: Vec<NewFace<String>> = (0..12)
            .map(|i| face(&format!("p{i}"), vec![(i % 3) as f64 * 3.0, 0.05 * i as f64]))
            .collect();
        let c = Clusterer::new(ClusterConfig {
            eps: 0.6,
            min_samples: 2,
            metric: Metric::Euclidean,
            strategy: Strategy::Density,
        })
        .unwrap();
        let a = c.cluster(&existing, &faces).unwrap();
        let b = c.cluster(&existing, &faces).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn totality_and_unique_minted_ids() {
        let faces: Vec<NewFace<String>> = (0..40)
            .map(|i| face(&format!("p{i}"), vec![(i * 7 % 13) as f64, (i % 4) as f64 * 0.2]))
            .collect();
        let outcome = clusterer(0.3, 2).cluster(&[], &faces).unwrap();

        assert_eq!(outcome.links.len(), faces.len());
        for (link, face) in outcome.links.iter().zip(&faces) {
            assert_eq!(link.photo, face.photo);
        }
        let mut ids: Vec<IdentityId> = outcome.minted.iter().map(|i| i.id).collect();
        let n = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), n);
        for link in &outcome.links {
            assert!(outcome.minted.iter().any(|i| i.id == link.identity_id));
        }
    }
}
