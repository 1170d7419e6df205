use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single measurement row in the shared dataset.
///
/// `uploaded_by` is provenance metadata stamped by the normalizer; it is not
/// part of the row's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub species: String,
    pub chemical: String,
    pub amount: f64,
    pub doi: String,
    pub uploaded_by: String,
}

impl Record {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            species: self.species.clone(),
            chemical: self.chemical.clone(),
            amount_bits: self.amount.to_bits(),
            doi: self.doi.clone(),
        }
    }
}

/// Identity of a record: (species, chemical, amount, doi).
///
/// Amount equality is exact bit equality on the coerced f64. Values that
/// differ only in their textual encoding (e.g. "1.0" vs "1.0000001") are
/// distinct keys; there is deliberately no tolerance window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub species: String,
    pub chemical: String,
    amount_bits: u64,
    pub doi: String,
}

/// Who uploaded which file, and when. One entry per ingestion attempt that
/// reaches the commit stage, even when zero rows end up inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAudit {
    pub user_id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Authenticated identity supplied by the identity port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub is_approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(species: &str, amount: f64, uploaded_by: &str) -> Record {
        Record {
            species: species.to_string(),
            chemical: "mercury".to_string(),
            amount,
            doi: "10.1000/x".to_string(),
            uploaded_by: uploaded_by.to_string(),
        }
    }

    #[test]
    fn natural_key_ignores_uploader() {
        let a = record("salmon", 1.5, "alice");
        let b = record("salmon", 1.5, "bob");
        assert_eq!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn natural_key_is_exact_on_amount() {
        let a = record("salmon", 1.0, "alice");
        let b = record("salmon", 1.0000001, "alice");
        assert_ne!(a.natural_key(), b.natural_key());
    }
}
