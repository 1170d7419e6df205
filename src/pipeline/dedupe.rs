use crate::domain::{NaturalKey, Record};
use std::collections::HashSet;

/// Candidate rows partitioned against the dataset's current contents.
#[derive(Debug, Clone, Default)]
pub struct DedupeOutcome {
    pub fresh: Vec<Record>,
    pub duplicates: Vec<Record>,
}

/// Partition candidates into fresh rows and duplicates by natural key.
///
/// A candidate is a duplicate when its key is already stored, or when an
/// earlier candidate in the same batch claimed the key; a single file
/// repeating its own rows therefore stores each key once. Candidate order
/// is preserved within each partition.
pub fn partition(candidates: Vec<Record>, existing: &[Record]) -> DedupeOutcome {
    let mut seen: HashSet<NaturalKey> = existing.iter().map(Record::natural_key).collect();

    let mut outcome = DedupeOutcome::default();
    for candidate in candidates {
        if seen.insert(candidate.natural_key()) {
            outcome.fresh.push(candidate);
        } else {
            outcome.duplicates.push(candidate);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(species: &str, amount: f64, uploaded_by: &str) -> Record {
        Record {
            species: species.to_string(),
            chemical: "mercury".to_string(),
            amount,
            doi: "10.1/a".to_string(),
            uploaded_by: uploaded_by.to_string(),
        }
    }

    #[test]
    fn splits_candidates_against_existing_rows() {
        let existing = vec![record("salmon", 1.5, "alice")];
        let candidates = vec![record("salmon", 1.5, "alice"), record("trout", 2.0, "alice")];

        let outcome = partition(candidates, &existing);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.fresh.len(), 1);
        assert_eq!(outcome.fresh[0].species, "trout");
    }

    #[test]
    fn uploader_is_excluded_from_the_key() {
        let existing = vec![record("salmon", 1.5, "alice")];
        let candidates = vec![record("salmon", 1.5, "bob")];

        let outcome = partition(candidates, &existing);
        assert_eq!(outcome.duplicates.len(), 1);
        assert!(outcome.fresh.is_empty());
    }

    #[test]
    fn empty_dataset_accepts_everything() {
        let candidates = vec![record("salmon", 1.5, "alice"), record("trout", 2.0, "alice")];
        let outcome = partition(candidates, &[]);
        assert_eq!(outcome.fresh.len(), 2);
        assert!(outcome.duplicates.is_empty());
    }

    #[test]
    fn repeats_within_a_batch_are_duplicates() {
        let candidates = vec![record("salmon", 1.5, "alice"), record("salmon", 1.5, "alice")];
        let outcome = partition(candidates, &[]);
        assert_eq!(outcome.fresh.len(), 1);
        assert_eq!(outcome.duplicates.len(), 1);
    }
}
