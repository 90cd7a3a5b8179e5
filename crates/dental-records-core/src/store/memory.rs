//! In-process patient store.

use std::sync::RwLock;

use super::{
    check_payment, log_batch_delete, DeleteOutcome, PatientStore, StoreError, StoreResult,
};
use crate::models::Patient;

/// Patient collection held in memory. Every write holds the lock for its whole
/// read-modify-write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    patients: RwLock<Vec<Patient>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatientStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert(&self, patient: &Patient) -> StoreResult<()> {
        let mut patients = self.patients.write()?;
        if patients.iter().any(|p| p.id == patient.id) {
            return Err(StoreError::Storage(format!(
                "Duplicate patient id: {}",
                patient.id
            )));
        }
        patients.push(patient.clone());
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.patients.read()?.clone())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Patient>> {
        Ok(self.patients.read()?.iter().find(|p| p.id == id).cloned())
    }

    fn delete_one(&self, id: &str) -> StoreResult<bool> {
        let mut patients = self.patients.write()?;
        let before = patients.len();
        patients.retain(|p| p.id != id);
        let deleted = patients.len() < before;
        if deleted {
            tracing::info!(patient_id = id, "patient deleted");
        }
        Ok(deleted)
    }

    fn delete_many(&self, ids: &[String]) -> StoreResult<Vec<DeleteOutcome>> {
        let mut patients = self.patients.write()?;
        let outcomes: Vec<DeleteOutcome> = ids
            .iter()
            .map(|id| {
                let before = patients.len();
                patients.retain(|p| &p.id != id);
                DeleteOutcome::new(id, patients.len() < before)
            })
            .collect();
        log_batch_delete(&outcomes);
        Ok(outcomes)
    }

    fn update_payment(&self, id: &str, amount: f64) -> StoreResult<Patient> {
        check_payment(amount)?;
        let mut patients = self.patients.write()?;
        let patient = patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patient.apply_payment(amount)?;
        Ok(patient.clone())
    }
}
