//! Patient models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Patient gender as captured on the intake form. Accepted case-insensitively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(ValidationError::InvalidGender(s.to_string())),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Payment status, always derived from the remaining balance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Unpaid => "UNPAID",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(PaymentStatus::Paid),
            "UNPAID" => Ok(PaymentStatus::Unpaid),
            _ => Err(ValidationError::InvalidValue {
                field: "paymentStatus",
                value: s.to_string(),
            }),
        }
    }
}

/// Input for creating a patient: everything except the store-assigned and
/// derived fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone_number: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub tro: String,
    pub tooth_number: String,
    pub is_new_patient: bool,
    pub entry_date: NaiveDate,
    /// Total treatment cost
    #[serde(alias = "payment")]
    pub total_amount: f64,
    /// Amount paid at intake; 0 when omitted
    #[serde(default)]
    pub paid_amount: Option<f64>,
}

impl NewPatient {
    /// Check required text fields and payment amounts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("name", &self.name),
            ("phoneNumber", &self.phone_number),
            ("diagnosis", &self.diagnosis),
            ("treatmentPlan", &self.treatment_plan),
            ("tro", &self.tro),
            ("toothNumber", &self.tooth_number),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }

        check_amount("totalAmount", self.total_amount)?;
        if let Some(paid) = self.paid_amount {
            check_amount("paidAmount", paid)?;
            if to_cents(paid) > to_cents(self.total_amount) {
                return Err(ValidationError::Overpayment {
                    paid,
                    total: self.total_amount,
                });
            }
        }
        Ok(())
    }
}

/// A stored patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// UUID assigned at creation
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone_number: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    /// Treatment record outcome
    pub tro: String,
    pub tooth_number: String,
    pub is_new_patient: bool,
    pub entry_date: NaiveDate,
    #[serde(alias = "payment")]
    pub total_amount: f64,
    pub paid_amount: f64,
    pub remaining_balance: f64,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Validate intake data and build a new record with a fresh id and derived
    /// payment fields.
    pub fn register(new: NewPatient) -> Result<Self, ValidationError> {
        new.validate()?;

        let mut patient = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            age: new.age,
            gender: new.gender,
            phone_number: new.phone_number.trim().to_string(),
            diagnosis: new.diagnosis,
            treatment_plan: new.treatment_plan,
            tro: new.tro,
            tooth_number: new.tooth_number,
            is_new_patient: new.is_new_patient,
            entry_date: new.entry_date,
            total_amount: new.total_amount,
            paid_amount: new.paid_amount.unwrap_or(0.0),
            remaining_balance: 0.0,
            payment_status: PaymentStatus::Unpaid,
            created_at: Utc::now(),
        };
        patient.recompute_balance();
        Ok(patient)
    }

    /// Add a payment, clamping the paid amount at the total.
    pub fn apply_payment(&mut self, amount: f64) -> Result<(), ValidationError> {
        check_payment_amount(amount)?;
        let paid = to_cents(self.paid_amount).saturating_add(to_cents(amount));
        self.paid_amount = from_cents(paid.min(to_cents(self.total_amount)));
        self.recompute_balance();
        Ok(())
    }

    /// Re-derive remaining balance and payment status from total and paid.
    pub fn recompute_balance(&mut self) {
        let total = to_cents(self.total_amount);
        let paid = to_cents(self.paid_amount).clamp(0, total);

        self.total_amount = from_cents(total);
        self.paid_amount = from_cents(paid);
        self.remaining_balance = from_cents(total - paid);
        self.payment_status = if total == paid {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Largest amount accepted for a treatment total or a single payment.
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

fn check_amount(field: &'static str, amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidNumber {
            field,
            value: amount.to_string(),
        });
    }
    if amount < 0.0 {
        return Err(ValidationError::NegativeAmount { field, amount });
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge {
            field,
            amount,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// A payment must be a positive, bounded amount of at least one cent.
pub fn check_payment_amount(amount: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() || to_cents(amount) <= 0 {
        return Err(ValidationError::NonPositivePayment(amount));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge {
            field: "amount",
            amount,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Money is compared and summed in whole cents.
pub(crate) fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub(crate) fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}
