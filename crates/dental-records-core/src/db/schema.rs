//! SQLite schema definition.

/// Complete database schema for dental records.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,       -- insertion order
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age >= 0),
    gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female', 'Other')),
    phone_number TEXT NOT NULL,
    diagnosis TEXT NOT NULL,
    treatment_plan TEXT NOT NULL,
    tro TEXT NOT NULL,
    tooth_number TEXT NOT NULL,
    is_new_patient INTEGER NOT NULL,
    entry_date TEXT NOT NULL,                    -- YYYY-MM-DD
    total_amount REAL NOT NULL CHECK (total_amount >= 0),
    paid_amount REAL NOT NULL DEFAULT 0,
    remaining_balance REAL NOT NULL,
    payment_status TEXT NOT NULL CHECK (payment_status IN ('PAID', 'UNPAID')),
    created_at TEXT NOT NULL,
    CHECK (paid_amount >= 0 AND paid_amount <= total_amount)
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
CREATE INDEX IF NOT EXISTS idx_patients_status ON patients(payment_status);

-- Only the payment columns may change after intake
CREATE TRIGGER IF NOT EXISTS patients_intake_immutable
BEFORE UPDATE OF id, name, age, gender, phone_number, diagnosis, treatment_plan,
                 tro, tooth_number, is_new_patient, entry_date, total_amount, created_at
ON patients
BEGIN
    SELECT RAISE(ABORT, 'Intake fields are immutable');
END;
"#;
