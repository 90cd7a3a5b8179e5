//! Patient store: the persistence boundary every caller goes through.
//!
//! [`PatientStore`] is implemented by three interchangeable adapters:
//!
//! - [`MemoryStore`]: in-process collection
//! - [`SqliteStore`]: embedded SQLite database
//! - [`JsonFileStore`]: a single `patients.json` file
//!
//! Adapters implement storage primitives; validation, id assignment, search and
//! filtering are provided once on the trait.

mod json_file;
mod memory;
mod sqlite;

pub use json_file::*;
pub use memory::*;
pub use sqlite::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;
use crate::models::{check_payment_amount, NewPatient, Patient, ValidationError};
use crate::query::{self, FilterCriteria, InvalidCriteria, ListFilter};

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(#[from] InvalidCriteria),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Whether the caller can fix the request (as opposed to a backend failure).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StoreError::Storage(_))
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(id) => StoreError::NotFound(id),
            DbError::Validation(e) => StoreError::Validation(e),
            other => StoreError::Storage(other.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(format!("I/O error: {}", e))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(format!("Corrupt patient data: {}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Storage(format!("Lock poisoned: {}", e))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of removing one id in a batch delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    Deleted,
    NotFound,
}

/// Per-id outcome of [`PatientStore::delete_many`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub id: String,
    pub status: DeleteStatus,
}

impl DeleteOutcome {
    pub fn new(id: &str, deleted: bool) -> Self {
        Self {
            id: id.to_string(),
            status: if deleted {
                DeleteStatus::Deleted
            } else {
                DeleteStatus::NotFound
            },
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == DeleteStatus::Deleted
    }
}

/// Owner of the patient collection.
///
/// Implementations must keep insertion order for [`list`](Self::list) and
/// perform [`update_payment`](Self::update_payment) as one atomic
/// read-increment-write.
pub trait PatientStore: Send + Sync {
    /// Short backend name for logs and health checks.
    fn backend_name(&self) -> &'static str;

    /// Append an already-registered record.
    fn insert(&self, patient: &Patient) -> StoreResult<()>;

    /// All records in insertion order.
    fn list(&self) -> StoreResult<Vec<Patient>>;

    fn get(&self, id: &str) -> StoreResult<Option<Patient>>;

    /// Remove one record. Returns `false` if the id is absent.
    fn delete_one(&self, id: &str) -> StoreResult<bool>;

    /// Remove every listed id that exists, reporting each id's outcome in
    /// request order.
    fn delete_many(&self, ids: &[String]) -> StoreResult<Vec<DeleteOutcome>>;

    /// Add `amount` to the paid amount (clamped at the total) and return the
    /// updated record.
    fn update_payment(&self, id: &str, amount: f64) -> StoreResult<Patient>;

    /// Validate, assign id and timestamp, derive payment fields and persist.
    fn create(&self, new: NewPatient) -> StoreResult<Patient> {
        let patient = Patient::register(new)?;
        self.insert(&patient)?;
        tracing::info!(
            backend = self.backend_name(),
            patient_id = %patient.id,
            "patient created"
        );
        Ok(patient)
    }

    fn list_all(&self) -> StoreResult<Vec<Patient>> {
        self.list()
    }

    /// Name (case-insensitive) or phone substring search.
    fn search(&self, query: &str) -> StoreResult<Vec<Patient>> {
        Ok(query::search(self.list()?, query))
    }

    fn filter(&self, criteria: FilterCriteria) -> StoreResult<Vec<Patient>> {
        Ok(query::filter(self.list()?, criteria))
    }

    /// Search, then narrow by every set field of `list_filter`.
    fn find(&self, search: &str, list_filter: &ListFilter) -> StoreResult<Vec<Patient>> {
        Ok(query::filter_list(self.search(search)?, list_filter))
    }

    /// Filter by a raw criteria key such as `"unpaid"`.
    fn filter_by(&self, criteria: &str) -> StoreResult<Vec<Patient>> {
        let criteria: FilterCriteria = criteria.parse()?;
        self.filter(criteria)
    }
}

pub(crate) fn log_batch_delete(outcomes: &[DeleteOutcome]) {
    let deleted = outcomes.iter().filter(|o| o.is_deleted()).count();
    tracing::info!(requested = outcomes.len(), deleted, "patients deleted");
}

/// Reject unusable payment amounts before touching storage.
pub(crate) fn check_payment(amount: f64) -> StoreResult<()> {
    Ok(check_payment_amount(amount)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_outcome() {
        assert!(DeleteOutcome::new("a", true).is_deleted());
        assert_eq!(DeleteOutcome::new("b", false).status, DeleteStatus::NotFound);
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: StoreError = DbError::NotFound("p-1".into()).into();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "p-1"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_storage_errors_are_not_client_errors() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_check_payment() {
        assert!(check_payment(10.0).is_ok());
        assert!(matches!(check_payment(0.0), Err(StoreError::Validation(_))));
        assert!(check_payment(f64::INFINITY).is_err());
        assert!(matches!(
            check_payment(1e300),
            Err(StoreError::Validation(ValidationError::AmountTooLarge { .. }))
        ));
    }
}
