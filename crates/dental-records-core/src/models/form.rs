//! String-typed intake form, as submitted by the three-step patient wizard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Gender, NewPatient, ValidationError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw intake form values. Every field arrives as text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub phone_number: String,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub tro: String,
    pub tooth_number: String,
    /// "true" for a new patient, "false" for a returning one
    pub is_new_patient: String,
    #[serde(alias = "totalAmount")]
    pub payment: String,
    /// Optional amount paid at intake
    pub paid_amount: String,
    pub entry_date: String,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: String::new(),
            gender: String::new(),
            phone_number: String::new(),
            diagnosis: String::new(),
            treatment_plan: String::new(),
            tro: String::new(),
            tooth_number: String::new(),
            is_new_patient: "true".to_string(),
            payment: String::new(),
            paid_amount: String::new(),
            entry_date: chrono::Local::now().date_naive().format(DATE_FORMAT).to_string(),
        }
    }
}

impl PatientForm {
    /// Whether every field of a wizard step (1-3) has been filled in.
    pub fn step_complete(&self, step: u8) -> bool {
        let fields = match step {
            1 => vec![
                &self.name,
                &self.age,
                &self.gender,
                &self.phone_number,
                &self.entry_date,
            ],
            2 => vec![
                &self.diagnosis,
                &self.treatment_plan,
                &self.tro,
                &self.tooth_number,
            ],
            3 => vec![&self.is_new_patient, &self.payment],
            _ => return false,
        };
        fields.iter().all(|f| !f.trim().is_empty())
    }

    /// Parse and validate the form into create input.
    pub fn parse(&self) -> Result<NewPatient, ValidationError> {
        let name = required("name", &self.name)?;
        let age = required("age", &self.age)?;
        let age = age.parse::<u32>().map_err(|_| ValidationError::InvalidNumber {
            field: "age",
            value: age.to_string(),
        })?;
        let gender = required("gender", &self.gender)?.parse::<Gender>()?;
        let phone_number = required("phoneNumber", &self.phone_number)?;
        let entry_date = required("entryDate", &self.entry_date)?;
        let entry_date = NaiveDate::parse_from_str(entry_date, DATE_FORMAT).map_err(|_| {
            ValidationError::InvalidDate {
                field: "entryDate",
                value: entry_date.to_string(),
            }
        })?;

        let diagnosis = required("diagnosis", &self.diagnosis)?;
        let treatment_plan = required("treatmentPlan", &self.treatment_plan)?;
        let tro = required("tro", &self.tro)?;
        let tooth_number = required("toothNumber", &self.tooth_number)?;

        let is_new_patient = match required("isNewPatient", &self.is_new_patient)? {
            "true" => true,
            "false" => false,
            other => {
                return Err(ValidationError::InvalidValue {
                    field: "isNewPatient",
                    value: other.to_string(),
                })
            }
        };
        let total_amount = parse_amount("payment", required("payment", &self.payment)?)?;
        let paid_amount = match self.paid_amount.trim() {
            "" => None,
            paid => Some(parse_amount("paidAmount", paid)?),
        };

        let new = NewPatient {
            name: name.to_string(),
            age,
            gender,
            phone_number: phone_number.to_string(),
            diagnosis: diagnosis.to_string(),
            treatment_plan: treatment_plan.to_string(),
            tro: tro.to_string(),
            tooth_number: tooth_number.to_string(),
            is_new_patient,
            entry_date,
            total_amount,
            paid_amount,
        };
        new.validate()?;
        Ok(new)
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn parse_amount(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> PatientForm {
        PatientForm {
            name: "John Smith".into(),
            age: "41".into(),
            gender: "Male".into(),
            phone_number: "555-0199".into(),
            diagnosis: "Pulpitis".into(),
            treatment_plan: "Root canal".into(),
            tro: "RCT".into(),
            tooth_number: "36".into(),
            is_new_patient: "false".into(),
            payment: "1200.50".into(),
            paid_amount: String::new(),
            entry_date: "2024-05-20".into(),
        }
    }

    #[test]
    fn test_parse_filled_form() {
        let new = filled_form().parse().unwrap();
        assert_eq!(new.age, 41);
        assert_eq!(new.gender, Gender::Male);
        assert!(!new.is_new_patient);
        assert_eq!(new.total_amount, 1200.50);
        assert_eq!(new.paid_amount, None);
        assert_eq!(new.entry_date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
    }

    #[test]
    fn test_parse_reports_missing_field() {
        let mut form = filled_form();
        form.tooth_number = " ".into();
        assert_eq!(
            form.parse().unwrap_err(),
            ValidationError::MissingField("toothNumber")
        );
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        let mut form = filled_form();
        form.age = "-3".into();
        assert!(matches!(
            form.parse(),
            Err(ValidationError::InvalidNumber { field: "age", .. })
        ));

        let mut form = filled_form();
        form.payment = "a lot".into();
        assert!(matches!(
            form.parse(),
            Err(ValidationError::InvalidNumber { field: "payment", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_date_and_gender() {
        let mut form = filled_form();
        form.entry_date = "20/05/2024".into();
        assert!(matches!(form.parse(), Err(ValidationError::InvalidDate { .. })));

        let mut form = filled_form();
        form.gender = "unknown".into();
        assert!(matches!(form.parse(), Err(ValidationError::InvalidGender(_))));
    }

    #[test]
    fn test_parse_with_initial_payment() {
        let mut form = filled_form();
        form.paid_amount = "200".into();
        assert_eq!(form.parse().unwrap().paid_amount, Some(200.0));

        form.paid_amount = "5000".into();
        assert!(matches!(form.parse(), Err(ValidationError::Overpayment { .. })));
    }

    #[test]
    fn test_step_completion() {
        let mut form = PatientForm::default();
        assert!(!form.step_complete(1));
        assert!(!form.step_complete(3));

        form = filled_form();
        assert!(form.step_complete(1));
        assert!(form.step_complete(2));
        assert!(form.step_complete(3));
        assert!(!form.step_complete(4));
    }

    #[test]
    fn test_default_form() {
        let form = PatientForm::default();
        assert_eq!(form.is_new_patient, "true");
        assert_eq!(form.entry_date.len(), 10);
    }
}
