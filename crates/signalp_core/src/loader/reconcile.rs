//! Natural-key reconciliation of incoming rows against stored records.

use crate::model::keys::NaturallyKeyed;
use std::collections::HashMap;

/// Records staged for writing, deduplicated by natural key.
///
/// A key staged twice keeps the later values. Stored records keep their
/// storage id and are written as updates.
pub(crate) struct Staging<R: NaturallyKeyed> {
    existing: HashMap<R::Key, R>,
    positions: HashMap<R::Key, usize>,
    staged: Vec<R>,
}

/// Staged records split by write kind, in first-seen order.
pub(crate) struct WritePlan<R> {
    pub(crate) updates: Vec<R>,
    pub(crate) creates: Vec<R>,
}

impl<R: NaturallyKeyed> Staging<R> {
    pub(crate) fn new(existing: HashMap<R::Key, R>) -> Self {
        Self {
            existing,
            positions: HashMap::new(),
            staged: Vec::new(),
        }
    }

    pub(crate) fn stage(&mut self, incoming: R) {
        let key = incoming.natural_key();
        if let Some(&position) = self.positions.get(&key) {
            self.staged[position].apply_update(incoming);
            return;
        }

        let record = match self.existing.remove(&key) {
            Some(mut stored) => {
                stored.apply_update(incoming);
                stored
            }
            None => incoming,
        };
        self.positions.insert(key, self.staged.len());
        self.staged.push(record);
    }

    pub(crate) fn into_plan(self) -> WritePlan<R> {
        let (updates, creates) = self
            .staged
            .into_iter()
            .partition(|record| record.storage_id().is_some());
        WritePlan { updates, creates }
    }
}

#[cfg(test)]
mod tests {
    use super::Staging;
    use crate::model::genome::GenomeMetadata;
    use std::collections::HashMap;

    fn genome(version: &str, id: Option<i64>, size: i64) -> GenomeMetadata {
        let mut genome = GenomeMetadata::new(version);
        genome.id = id;
        genome.genome_size = Some(size);
        genome
    }

    #[test]
    fn stored_keys_become_updates_and_keep_their_id() {
        let existing = HashMap::from([("G1".to_string(), genome("G1", Some(7), 10))]);
        let mut staging = Staging::new(existing);
        staging.stage(genome("G1", None, 20));
        staging.stage(genome("G2", None, 30));

        let plan = staging.into_plan();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, Some(7));
        assert_eq!(plan.updates[0].genome_size, Some(20));
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.creates[0].genome_version, "G2");
    }

    #[test]
    fn later_rows_win_for_repeated_keys() {
        let mut staging = Staging::new(HashMap::new());
        staging.stage(genome("G1", None, 1));
        staging.stage(genome("G2", None, 2));
        staging.stage(genome("G1", None, 3));

        let plan = staging.into_plan();
        assert!(plan.updates.is_empty());
        let sizes: Vec<_> = plan
            .creates
            .iter()
            .map(|record| (record.genome_version.as_str(), record.genome_size))
            .collect();
        assert_eq!(sizes, vec![("G1", Some(3)), ("G2", Some(2))]);
    }
}
