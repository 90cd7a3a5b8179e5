//! Dental Records Core Library
//!
//! Patient intake, payment tracking and list queries for a dental practice.
//!
//! # Architecture
//!
//! ```text
//!   Intake form ──► PatientForm::parse ──► NewPatient
//!                                             │
//!                                   PatientStore::create
//!                                             │
//!               ┌─────────────────────────────┼─────────────────────────────┐
//!               │                             │                             │
//!               ▼                             ▼                             ▼
//!          MemoryStore                   SqliteStore                  JsonFileStore
//!               │                             │                             │
//!               └─────────────────────────────┼─────────────────────────────┘
//!                                             │
//!                                          list()
//!                                             │
//!                        ┌────────────────────┴────────────────────┐
//!                        ▼                                         ▼
//!            query (search / filter / sort)             stats (dashboard)
//! ```
//!
//! # Core Principle
//!
//! **Payment fields are always derived.** `remaining_balance` and
//! `payment_status` are recomputed on every write and `paid_amount` can never
//! exceed `total_amount`.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, NewPatient, PatientForm)
//! - [`store`]: `PatientStore` capability and its backend adapters
//! - [`query`]: Search, filter and sort over patient lists
//! - [`stats`]: Dashboard aggregates

pub mod db;
pub mod models;
pub mod query;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use db::Database;
pub use models::{Gender, NewPatient, Patient, PatientForm, PaymentStatus, ValidationError};
pub use query::{FilterCriteria, InvalidCriteria, ListFilter, SortOrder};
pub use stats::{Dashboard, MonthlySummary};
pub use store::{
    DeleteOutcome, DeleteStatus, JsonFileStore, MemoryStore, PatientStore, SqliteStore,
    StoreError, StoreResult,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalRecordsError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<StoreError> for DentalRecordsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(e) => DentalRecordsError::ValidationError(e.to_string()),
            StoreError::NotFound(id) => DentalRecordsError::NotFound(id),
            StoreError::InvalidCriteria(e) => DentalRecordsError::InvalidCriteria(e.to_string()),
            StoreError::Storage(msg) => DentalRecordsError::StorageError(msg),
        }
    }
}

impl From<ValidationError> for DentalRecordsError {
    fn from(e: ValidationError) -> Self {
        DentalRecordsError::ValidationError(e.to_string())
    }
}

impl From<InvalidCriteria> for DentalRecordsError {
    fn from(e: InvalidCriteria) -> Self {
        DentalRecordsError::InvalidCriteria(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a SQLite database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<DentalRecordsCore>, DentalRecordsError> {
    let store = SqliteStore::open(&path)?;
    Ok(DentalRecordsCore::from_store(Arc::new(store)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<DentalRecordsCore>, DentalRecordsError> {
    let store = SqliteStore::open_in_memory()?;
    Ok(DentalRecordsCore::from_store(Arc::new(store)))
}

/// Open or create a `patients.json` store in the given directory.
#[uniffi::export]
pub fn open_json_store(data_dir: String) -> Result<Arc<DentalRecordsCore>, DentalRecordsError> {
    let store = JsonFileStore::open(&data_dir)?;
    Ok(DentalRecordsCore::from_store(Arc::new(store)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct DentalRecordsCore {
    store: Arc<dyn PatientStore>,
}

impl DentalRecordsCore {
    /// Wrap any store adapter.
    pub fn from_store(store: Arc<dyn PatientStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

#[uniffi::export]
impl DentalRecordsCore {
    /// Name of the backing store ("sqlite", "json" or "memory").
    pub fn backend_name(&self) -> String {
        self.store.backend_name().to_string()
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create a patient from typed input.
    pub fn create_patient(&self, patient: FfiNewPatient) -> Result<FfiPatient, DentalRecordsError> {
        let new = NewPatient::try_from(patient)?;
        Ok(self.store.create(new)?.into())
    }

    /// Create a patient from raw intake form text.
    pub fn submit_intake_form(
        &self,
        form: FfiPatientForm,
    ) -> Result<FfiPatient, DentalRecordsError> {
        let new = PatientForm::from(form).parse()?;
        Ok(self.store.create(new)?.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: String) -> Result<Option<FfiPatient>, DentalRecordsError> {
        Ok(self.store.get(&id)?.map(|p| p.into()))
    }

    /// All patients in insertion order.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, DentalRecordsError> {
        Ok(into_ffi(self.store.list()?))
    }

    /// Search by name or phone number.
    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, DentalRecordsError> {
        Ok(into_ffi(self.store.search(&query)?))
    }

    /// Search, then narrow by the list filter fields. Blank fields are ignored.
    pub fn find_patients(
        &self,
        query: String,
        filter: FfiListFilter,
    ) -> Result<Vec<FfiPatient>, DentalRecordsError> {
        let filter = ListFilter::try_from(filter)?;
        Ok(into_ffi(self.store.find(&query, &filter)?))
    }

    /// Filter by "all", "new", "returning", "age" or "unpaid".
    pub fn filter_patients(&self, criteria: String) -> Result<Vec<FfiPatient>, DentalRecordsError> {
        Ok(into_ffi(self.store.filter_by(&criteria)?))
    }

    /// All patients sorted by entry date ("asc" or "desc").
    pub fn patients_by_entry_date(
        &self,
        order: String,
    ) -> Result<Vec<FfiPatient>, DentalRecordsError> {
        let order: SortOrder = order.parse()?;
        Ok(into_ffi(query::sort_by_entry_date(self.store.list()?, order)))
    }

    /// Delete a patient. Returns false if it did not exist.
    pub fn delete_patient(&self, id: String) -> Result<bool, DentalRecordsError> {
        Ok(self.store.delete_one(&id)?)
    }

    /// Delete several patients, reporting each id's outcome.
    pub fn delete_patients(
        &self,
        ids: Vec<String>,
    ) -> Result<Vec<FfiDeleteOutcome>, DentalRecordsError> {
        let outcomes = self.store.delete_many(&ids)?;
        Ok(outcomes.into_iter().map(|o| o.into()).collect())
    }

    /// Record an additional payment.
    pub fn update_payment(&self, id: String, amount: f64) -> Result<FfiPatient, DentalRecordsError> {
        Ok(self.store.update_payment(&id, amount)?.into())
    }

    // =========================================================================
    // Dashboard Operations
    // =========================================================================

    /// Headline numbers for a calendar month.
    pub fn monthly_summary(
        &self,
        year: i32,
        month: u32,
    ) -> Result<FfiMonthlySummary, DentalRecordsError> {
        let patients = self.store.list()?;
        Ok(MonthlySummary::for_month(&patients, year, month).into())
    }

    /// Full dashboard as JSON.
    pub fn dashboard_json(&self, year: i32, month: u32) -> Result<String, DentalRecordsError> {
        let patients = self.store.list()?;
        let today = chrono::Local::now().date_naive();
        serde_json::to_string_pretty(&Dashboard::build(&patients, year, month, today))
            .map_err(|e| DentalRecordsError::StorageError(e.to_string()))
    }
}

fn into_ffi(patients: Vec<Patient>) -> Vec<FfiPatient> {
    patients.into_iter().map(|p| p.into()).collect()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub phone_number: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub tro: String,
    pub tooth_number: String,
    pub is_new_patient: bool,
    /// ISO 8601 date
    pub entry_date: String,
    pub total_amount: f64,
    pub paid_amount: f64,
    pub remaining_balance: f64,
    /// "PAID" or "UNPAID"
    pub payment_status: String,
    /// RFC 3339 timestamp
    pub created_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            age: patient.age,
            gender: patient.gender.as_str().to_string(),
            phone_number: patient.phone_number,
            diagnosis: patient.diagnosis,
            treatment_plan: patient.treatment_plan,
            tro: patient.tro,
            tooth_number: patient.tooth_number,
            is_new_patient: patient.is_new_patient,
            entry_date: patient.entry_date.to_string(),
            total_amount: patient.total_amount,
            paid_amount: patient.paid_amount,
            remaining_balance: patient.remaining_balance,
            payment_status: patient.payment_status.as_str().to_string(),
            created_at: patient.created_at.to_rfc3339(),
        }
    }
}

/// FFI-safe create input.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub phone_number: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub tro: String,
    pub tooth_number: String,
    pub is_new_patient: bool,
    pub entry_date: String,
    pub total_amount: f64,
    pub paid_amount: Option<f64>,
}

impl TryFrom<FfiNewPatient> for NewPatient {
    type Error = ValidationError;

    fn try_from(p: FfiNewPatient) -> Result<Self, Self::Error> {
        let entry_date = NaiveDate::parse_from_str(&p.entry_date, "%Y-%m-%d").map_err(|_| {
            ValidationError::InvalidDate {
                field: "entryDate",
                value: p.entry_date.clone(),
            }
        })?;
        Ok(NewPatient {
            name: p.name,
            age: p.age,
            gender: p.gender.parse()?,
            phone_number: p.phone_number,
            diagnosis: p.diagnosis,
            treatment_plan: p.treatment_plan,
            tro: p.tro,
            tooth_number: p.tooth_number,
            is_new_patient: p.is_new_patient,
            entry_date,
            total_amount: p.total_amount,
            paid_amount: p.paid_amount,
        })
    }
}

/// FFI-safe intake form (all text).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub phone_number: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub tro: String,
    pub tooth_number: String,
    pub is_new_patient: String,
    pub payment: String,
    pub paid_amount: String,
    pub entry_date: String,
}

impl From<FfiPatientForm> for PatientForm {
    fn from(form: FfiPatientForm) -> Self {
        PatientForm {
            name: form.name,
            age: form.age,
            gender: form.gender,
            phone_number: form.phone_number,
            diagnosis: form.diagnosis,
            treatment_plan: form.treatment_plan,
            tro: form.tro,
            tooth_number: form.tooth_number,
            is_new_patient: form.is_new_patient,
            payment: form.payment,
            paid_amount: form.paid_amount,
            entry_date: form.entry_date,
        }
    }
}

/// FFI-safe batch delete outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDeleteOutcome {
    pub id: String,
    pub deleted: bool,
}

impl From<DeleteOutcome> for FfiDeleteOutcome {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            deleted: outcome.is_deleted(),
            id: outcome.id,
        }
    }
}

/// FFI-safe monthly summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMonthlySummary {
    pub year: i32,
    pub month: u32,
    pub total_patients: u32,
    pub new_patients: u32,
    pub returning_patients: u32,
    pub total_revenue: f64,
    pub average_revenue: f64,
    pub male_patients: u32,
    pub female_patients: u32,
    pub average_age: f64,
}

impl From<MonthlySummary> for FfiMonthlySummary {
    fn from(s: MonthlySummary) -> Self {
        Self {
            year: s.year,
            month: s.month,
            total_patients: s.total_patients as u32,
            new_patients: s.new_patients as u32,
            returning_patients: s.returning_patients as u32,
            total_revenue: s.total_revenue,
            average_revenue: s.average_revenue,
            male_patients: s.male_patients as u32,
            female_patients: s.female_patients as u32,
            average_age: s.average_age,
        }
    }
}

/// List filter fields as plain strings, e.g. age range "19-30" or date "2024-03-01".
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiListFilter {
    pub age_range: Option<String>,
    pub payment_status: Option<String>,
    pub patient_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TryFrom<FfiListFilter> for ListFilter {
    type Error = InvalidCriteria;

    fn try_from(f: FfiListFilter) -> Result<Self, Self::Error> {
        ListFilter::from_keys(
            f.age_range.as_deref(),
            f.payment_status.as_deref(),
            f.patient_type.as_deref(),
            f.start_date.as_deref(),
            f.end_date.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffi_new(name: &str) -> FfiNewPatient {
        FfiNewPatient {
            name: name.into(),
            age: 34,
            gender: "Female".into(),
            phone_number: "555-0101".into(),
            diagnosis: "Caries".into(),
            treatment_plan: "Filling".into(),
            tro: "Composite".into(),
            tooth_number: "14".into(),
            is_new_patient: true,
            entry_date: "2024-03-01".into(),
            total_amount: 500.0,
            paid_amount: Some(200.0),
        }
    }

    #[test]
    fn test_ffi_create_and_pay() {
        let core = open_database_in_memory().unwrap();
        let created = core.create_patient(ffi_new("Jane Doe")).unwrap();
        assert_eq!(created.remaining_balance, 300.0);
        assert_eq!(created.payment_status, "UNPAID");

        let paid = core.update_payment(created.id.clone(), 300.0).unwrap();
        assert_eq!(paid.payment_status, "PAID");
        assert_eq!(paid.remaining_balance, 0.0);
    }

    #[test]
    fn test_ffi_bad_date() {
        let core = open_database_in_memory().unwrap();
        let mut input = ffi_new("Jane Doe");
        input.entry_date = "March 1st".into();
        assert!(matches!(
            core.create_patient(input),
            Err(DentalRecordsError::ValidationError(_))
        ));
    }

    #[test]
    fn test_ffi_intake_form() {
        let core = open_database_in_memory().unwrap();
        let created = core
            .submit_intake_form(FfiPatientForm {
                name: "Omar".into(),
                age: "58".into(),
                gender: "male".into(),
                phone_number: "555-4444".into(),
                diagnosis: "Periodontitis".into(),
                treatment_plan: "Deep cleaning".into(),
                tro: "SRP".into(),
                tooth_number: "all".into(),
                is_new_patient: "true".into(),
                payment: "300".into(),
                paid_amount: String::new(),
                entry_date: "2024-08-08".into(),
            })
            .unwrap();
        assert_eq!(created.gender, "Male");
        assert_eq!(created.paid_amount, 0.0);
    }

    #[test]
    fn test_ffi_filter_rejects_unknown_criteria() {
        let core = open_database_in_memory().unwrap();
        assert!(matches!(
            core.filter_patients("vip".into()),
            Err(DentalRecordsError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_ffi_find_patients() {
        let core = open_database_in_memory().unwrap();
        let young = core.create_patient(ffi_new("Jane Young")).unwrap();
        let mut older = ffi_new("Jane Older");
        older.age = 62;
        older.is_new_patient = false;
        core.create_patient(older).unwrap();

        let found = core
            .find_patients(
                "jane".into(),
                FfiListFilter {
                    age_range: Some("31-50".into()),
                    payment_status: Some("unpaid".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, young.id);

        let returning = core
            .find_patients(
                String::new(),
                FfiListFilter {
                    patient_type: Some("returning".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(returning.len(), 1);
        assert_eq!(returning[0].name, "Jane Older");

        assert!(matches!(
            core.find_patients(
                String::new(),
                FfiListFilter {
                    start_date: Some("03/01/2024".into()),
                    ..Default::default()
                },
            ),
            Err(DentalRecordsError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_ffi_delete_patients() {
        let core = open_database_in_memory().unwrap();
        let a = core.create_patient(ffi_new("A")).unwrap();
        let outcomes = core
            .delete_patients(vec![a.id.clone(), "missing".into()])
            .unwrap();
        assert!(outcomes[0].deleted);
        assert!(!outcomes[1].deleted);
        assert!(!core.delete_patient(a.id).unwrap());
    }

    #[test]
    fn test_ffi_monthly_summary() {
        let core = open_database_in_memory().unwrap();
        core.create_patient(ffi_new("A")).unwrap();
        let summary = core.monthly_summary(2024, 3).unwrap();
        assert_eq!(summary.total_patients, 1);
        assert_eq!(summary.female_patients, 1);
        assert!(core.dashboard_json(2024, 3).unwrap().contains("ageDistribution"));
    }
}
