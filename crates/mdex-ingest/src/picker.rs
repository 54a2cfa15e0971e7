//! Random monster selection
//!
//! The previous pick lives in a [`LastPick`] owned by the caller and passed
//! in, so concurrent callers sharing one slot never get the same monster
//! twice in a row.

use crate::error::{IngestError, Result};
use crate::resource::Namespace;
use crate::store::DataStore;
use mdex_common::types::Monster;
use mdex_common::EntityId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Mutex;
use tracing::debug;

/// Single-slot memory of the last returned ID
#[derive(Debug, Default)]
pub struct LastPick {
    slot: Mutex<Option<EntityId>>,
}

impl LastPick {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<EntityId> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Choose from `candidates`, avoiding the previous pick when another exists,
    /// and remember the result. Selection and update happen under one lock.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        candidates: &[EntityId],
        rng: &mut R,
    ) -> Option<EntityId> {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());

        let picked = match *slot {
            Some(last) if candidates.len() > 1 => {
                let others: Vec<EntityId> =
                    candidates.iter().copied().filter(|&id| id != last).collect();
                others.choose(rng).copied()
            }
            _ => candidates.choose(rng).copied(),
        }?;

        *slot = Some(picked);
        Some(picked)
    }
}

/// Load a random persisted monster
pub async fn pick_random(store: &DataStore, last: &LastPick) -> Result<Monster> {
    let ids = store.list_record_ids(Namespace::Monster).await?;
    let id = last
        .choose(&ids, &mut rand::thread_rng())
        .ok_or_else(|| IngestError::MissingInput {
            path: store.namespace_dir(Namespace::Monster),
        })?;

    debug!(id, candidates = ids.len(), "Picked monster");
    store.read_record(Namespace::Monster, id).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mdex_common::types::BaseStats;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_no_immediate_repeat() {
        let last = LastPick::new();
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = [1, 2, 3];

        let mut previous = last.choose(&candidates, &mut rng).unwrap();
        for _ in 0..200 {
            let next = last.choose(&candidates, &mut rng).unwrap();
            assert_ne!(next, previous);
            previous = next;
        }
        assert_eq!(last.get(), Some(previous));
    }

    #[test]
    fn test_single_candidate_may_repeat() {
        let last = LastPick::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(last.choose(&[9], &mut rng), Some(9));
        assert_eq!(last.choose(&[9], &mut rng), Some(9));
        assert_eq!(last.choose(&[], &mut rng), None);
    }

    #[test]
    fn test_shared_slot_across_threads() {
        let last = Arc::new(LastPick::new());
        let handles: Vec<_> = (0..4)
            .map(|seed| {
                let last = Arc::clone(&last);
                std::thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for _ in 0..50 {
                        last.choose(&[1, 2], &mut rng).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(matches!(last.get(), Some(1) | Some(2)));
    }

    #[tokio::test]
    async fn test_pick_random_reads_monster() {
        let dir = TempDir::new().unwrap();
        let store = DataStore::new(dir.path());
        let last = LastPick::new();

        let err = pick_random(&store, &last).await.unwrap_err();
        assert!(matches!(err, IngestError::MissingInput { .. }));

        let monster = Monster {
            id: 25,
            name: "ピカチュウ".into(),
            types: vec!["電".into()],
            stats: BaseStats::new([35, 55, 40, 50, 50, 90]),
            image: String::new(),
        };
        store.write_record(Namespace::Monster, 25, &monster).await.unwrap();

        let picked = pick_random(&store, &last).await.unwrap();
        assert_eq!(picked, monster);
        assert_eq!(last.get(), Some(25));
    }
}
