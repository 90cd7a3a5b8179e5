//! Patient database operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{Database, DbError, DbResult};
use crate::models::{Gender, Patient, PaymentStatus};

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, age, gender, phone_number, diagnosis, treatment_plan, tro,
           tooth_number, is_new_patient, entry_date, total_amount, paid_amount,
           remaining_balance, payment_status, created_at
    FROM patients
"#;

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, name, age, gender, phone_number, diagnosis, treatment_plan, tro,
                tooth_number, is_new_patient, entry_date, total_amount, paid_amount,
                remaining_balance, payment_status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                patient.id,
                patient.name,
                patient.age,
                patient.gender.as_str(),
                patient.phone_number,
                patient.diagnosis,
                patient.treatment_plan,
                patient.tro,
                patient.tooth_number,
                patient.is_new_patient,
                patient.entry_date,
                patient.total_amount,
                patient.paid_amount,
                patient.remaining_balance,
                patient.payment_status.as_str(),
                patient.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        query_patient(&self.conn, id)
    }

    /// List all patients in insertion order.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY seq", SELECT_COLUMNS))?;

        let rows = stmt.query_map([], PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Delete several patients in one transaction. Returns whether each id was
    /// removed, in request order.
    pub fn delete_patients(&mut self, ids: &[String]) -> DbResult<Vec<bool>> {
        let tx = self.conn.transaction()?;
        let mut removed = Vec::with_capacity(ids.len());
        {
            let mut stmt = tx.prepare("DELETE FROM patients WHERE id = ?")?;
            for id in ids {
                removed.push(stmt.execute([id])? > 0);
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Add a payment under an IMMEDIATE transaction so concurrent writers
    /// cannot interleave between the read and the write.
    pub fn apply_payment(&mut self, id: &str, amount: f64) -> DbResult<Patient> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut patient =
            query_patient(&tx, id)?.ok_or_else(|| DbError::NotFound(id.to_string()))?;
        patient.apply_payment(amount)?;

        tx.execute(
            r#"
            UPDATE patients SET
                paid_amount = ?2,
                remaining_balance = ?3,
                payment_status = ?4
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.paid_amount,
                patient.remaining_balance,
                patient.payment_status.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(patient)
    }
}

fn query_patient(conn: &Connection, id: &str) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("{} WHERE id = ?", SELECT_COLUMNS),
        [id],
        PatientRow::from_row,
    )
    .optional()?
    .map(|row| row.try_into())
    .transpose()
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: String,
    name: String,
    age: u32,
    gender: String,
    phone_number: String,
    diagnosis: String,
    treatment_plan: String,
    tro: String,
    tooth_number: String,
    is_new_patient: bool,
    entry_date: NaiveDate,
    total_amount: f64,
    paid_amount: f64,
    remaining_balance: f64,
    payment_status: String,
    created_at: DateTime<Utc>,
}

impl PatientRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            gender: row.get(3)?,
            phone_number: row.get(4)?,
            diagnosis: row.get(5)?,
            treatment_plan: row.get(6)?,
            tro: row.get(7)?,
            tooth_number: row.get(8)?,
            is_new_patient: row.get(9)?,
            entry_date: row.get(10)?,
            total_amount: row.get(11)?,
            paid_amount: row.get(12)?,
            remaining_balance: row.get(13)?,
            payment_status: row.get(14)?,
            created_at: row.get(15)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender: Gender = row
            .gender
            .parse()
            .map_err(|_| DbError::Constraint(format!("Unknown gender: {}", row.gender)))?;
        let payment_status: PaymentStatus = row.payment_status.parse().map_err(|_| {
            DbError::Constraint(format!("Unknown payment status: {}", row.payment_status))
        })?;

        Ok(Patient {
            id: row.id,
            name: row.name,
            age: row.age,
            gender,
            phone_number: row.phone_number,
            diagnosis: row.diagnosis,
            treatment_plan: row.treatment_plan,
            tro: row.tro,
            tooth_number: row.tooth_number,
            is_new_patient: row.is_new_patient,
            entry_date: row.entry_date,
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            remaining_balance: row.remaining_balance,
            payment_status,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPatient;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_patient(name: &str, total: f64) -> Patient {
        Patient::register(NewPatient {
            name: name.into(),
            age: 27,
            gender: Gender::Male,
            phone_number: "555-3131".into(),
            diagnosis: "Impacted molar".into(),
            treatment_plan: "Extraction".into(),
            tro: "Surgical".into(),
            tooth_number: "48".into(),
            is_new_patient: true,
            entry_date: NaiveDate::from_ymd_opt(2024, 4, 12).unwrap(),
            total_amount: total,
            paid_amount: None,
        })
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let patient = make_patient("Max", 350.0);
        db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(retrieved, patient);
    }

    #[test]
    fn test_get_missing() {
        let db = setup_db();
        assert!(db.get_patient("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let db = setup_db();
        // Names deliberately out of alphabetical order
        for name in ["Zed", "Amy", "Moe"] {
            db.insert_patient(&make_patient(name, 100.0)).unwrap();
        }

        let names: Vec<String> = db
            .list_patients()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Zed", "Amy", "Moe"]);
    }

    #[test]
    fn test_delete_patients() {
        let mut db = setup_db();
        let a = make_patient("A", 100.0);
        let b = make_patient("B", 100.0);
        db.insert_patient(&a).unwrap();
        db.insert_patient(&b).unwrap();

        let removed = db
            .delete_patients(&[a.id.clone(), "missing".to_string()])
            .unwrap();
        assert_eq!(removed, vec![true, false]);
        assert_eq!(db.list_patients().unwrap(), vec![b]);
    }

    #[test]
    fn test_apply_payment() {
        let mut db = setup_db();
        let patient = make_patient("Max", 350.0);
        db.insert_patient(&patient).unwrap();

        let updated = db.apply_payment(&patient.id, 350.0).unwrap();
        assert_eq!(updated.payment_status, PaymentStatus::Paid);

        let stored = db.get_patient(&patient.id).unwrap().unwrap();
        assert_eq!(stored.paid_amount, 350.0);
        assert_eq!(stored.remaining_balance, 0.0);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_apply_payment_missing() {
        let mut db = setup_db();
        assert!(matches!(
            db.apply_payment("missing", 10.0),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_apply_payment_invalid_amount_rolls_back() {
        let mut db = setup_db();
        let patient = make_patient("Max", 350.0);
        db.insert_patient(&patient).unwrap();

        assert!(matches!(
            db.apply_payment(&patient.id, -1.0),
            Err(DbError::Validation(_))
        ));
        assert_eq!(db.get_patient(&patient.id).unwrap().unwrap(), patient);
    }
}
