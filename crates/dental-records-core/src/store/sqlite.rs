//! Embedded SQLite patient store.

use std::path::Path;
use std::sync::Mutex;

use super::{check_payment, log_batch_delete, DeleteOutcome, PatientStore, StoreResult};
use crate::db::Database;
use crate::models::Patient;

/// Store backed by a [`Database`]. The connection is shared behind a mutex;
/// payment updates additionally run in an IMMEDIATE transaction so other
/// processes holding the same file are serialized too.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = Database::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "opened patient database");
        Ok(Self::new(db))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }
}

impl PatientStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn insert(&self, patient: &Patient) -> StoreResult<()> {
        let db = self.db.lock()?;
        db.insert_patient(patient)?;
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Patient>> {
        let db = self.db.lock()?;
        Ok(db.list_patients()?)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Patient>> {
        let db = self.db.lock()?;
        Ok(db.get_patient(id)?)
    }

    fn delete_one(&self, id: &str) -> StoreResult<bool> {
        let db = self.db.lock()?;
        let deleted = db.delete_patient(id)?;
        if deleted {
            tracing::info!(patient_id = id, "patient deleted");
        }
        Ok(deleted)
    }

    fn delete_many(&self, ids: &[String]) -> StoreResult<Vec<DeleteOutcome>> {
        let mut db = self.db.lock()?;
        let removed = db.delete_patients(ids)?;
        let outcomes: Vec<DeleteOutcome> = ids
            .iter()
            .zip(removed)
            .map(|(id, deleted)| DeleteOutcome::new(id, deleted))
            .collect();
        log_batch_delete(&outcomes);
        Ok(outcomes)
    }

    fn update_payment(&self, id: &str, amount: f64) -> StoreResult<Patient> {
        check_payment(amount)?;
        let mut db = self.db.lock()?;
        let patient = db.apply_payment(id, amount)?;
        tracing::debug!(patient_id = id, amount, "payment recorded");
        Ok(patient)
    }
}
