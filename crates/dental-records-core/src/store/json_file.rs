//! JSON file patient store.
//!
//! The collection lives in `<data_dir>/patients.json` as a pretty-printed array.
//! Each write replaces the file through a sibling temp file and a rename, so a
//! crash mid-write leaves the previous contents intact.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{
    check_payment, log_batch_delete, DeleteOutcome, PatientStore, StoreError, StoreResult,
};
use crate::models::Patient;

const PATIENTS_FILE: &str = "patients.json";

/// File-backed store. All access is serialized through one mutex so
/// read-modify-write cycles from this process never interleave.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store in `data_dir`, creating the directory and an empty
    /// collection file if needed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(PATIENTS_FILE);
        if !path.exists() {
            fs::write(&path, "[]")?;
            tracing::info!(path = %path.display(), "initialized patient file");
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the collection file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StoreResult<Vec<Patient>> {
        let data = fs::read_to_string(&self.path).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to read patient file");
            StoreError::from(e)
        })?;
        serde_json::from_str(&data).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "patient file is corrupt");
            StoreError::from(e)
        })
    }

    fn write_all(&self, patients: &[Patient]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(patients)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                tracing::error!(path = %self.path.display(), error = %e, "failed to write patient file");
                StoreError::from(e)
            })
    }
}

impl PatientStore for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn insert(&self, patient: &Patient) -> StoreResult<()> {
        let _guard = self.lock.lock()?;
        let mut patients = self.read_all()?;
        if patients.iter().any(|p| p.id == patient.id) {
            return Err(StoreError::Storage(format!(
                "Duplicate patient id: {}",
                patient.id
            )));
        }
        patients.push(patient.clone());
        self.write_all(&patients)
    }

    fn list(&self) -> StoreResult<Vec<Patient>> {
        let _guard = self.lock.lock()?;
        self.read_all()
    }

    fn get(&self, id: &str) -> StoreResult<Option<Patient>> {
        let _guard = self.lock.lock()?;
        Ok(self.read_all()?.into_iter().find(|p| p.id == id))
    }

    fn delete_one(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock()?;
        let mut patients = self.read_all()?;
        let before = patients.len();
        patients.retain(|p| p.id != id);
        if patients.len() == before {
            return Ok(false);
        }
        self.write_all(&patients)?;
        tracing::info!(patient_id = id, "patient deleted");
        Ok(true)
    }

    fn delete_many(&self, ids: &[String]) -> StoreResult<Vec<DeleteOutcome>> {
        let _guard = self.lock.lock()?;
        let mut patients = self.read_all()?;
        let outcomes: Vec<DeleteOutcome> = ids
            .iter()
            .map(|id| {
                let before = patients.len();
                patients.retain(|p| &p.id != id);
                DeleteOutcome::new(id, patients.len() < before)
            })
            .collect();

        if outcomes.iter().any(DeleteOutcome::is_deleted) {
            self.write_all(&patients)?;
        }
        log_batch_delete(&outcomes);
        Ok(outcomes)
    }

    fn update_payment(&self, id: &str, amount: f64) -> StoreResult<Patient> {
        check_payment(amount)?;
        let _guard = self.lock.lock()?;
        let mut patients = self.read_all()?;
        let patient = patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patient.apply_payment(amount)?;
        let updated = patient.clone();

        self.write_all(&patients)?;
        tracing::debug!(patient_id = id, amount, "payment recorded");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, NewPatient};
    use chrono::NaiveDate;

    fn make_new(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            age: 52,
            gender: Gender::Female,
            phone_number: "555-7777".into(),
            diagnosis: "Missing tooth".into(),
            treatment_plan: "Implant".into(),
            tro: "Titanium".into(),
            tooth_number: "46".into(),
            is_new_patient: false,
            entry_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            total_amount: 2500.0,
            paid_amount: Some(1000.0),
        }
    }

    #[test]
    fn test_open_initializes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data")).unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let created = {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.create(make_new("Dana")).unwrap()
        };

        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.list().unwrap(), vec![created]);
    }

    #[test]
    fn test_file_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.create(make_new("Dana")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["remainingBalance"], 1500.0);
        assert_eq!(raw[0]["paymentStatus"], "UNPAID");
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.list(), Err(StoreError::Storage(_))));
        // The corrupt file is left alone rather than reset
        assert!(store.create(make_new("Dana")).is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{not json");
    }

    #[test]
    fn test_delete_missing_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.create(make_new("Dana")).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        assert!(!store.delete_one("missing").unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }
}
