//! Pure list queries over patient collections: search, filter and sort.
//!
//! Every function takes the collection in insertion order and returns a new
//! vector; nothing here touches storage.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Patient, PaymentStatus};

/// Unrecognized filter or sort key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidCriteria {
    #[error("Unknown filter criteria: {0:?}")]
    Filter(String),

    #[error("Unknown sort order: {0:?}")]
    SortOrder(String),

    #[error("Unknown age range: {0:?}")]
    AgeRange(String),

    #[error("Unknown payment status: {0:?}")]
    PaymentStatus(String),

    #[error("Unknown patient type: {0:?}")]
    PatientType(String),

    #[error("Invalid {field} date: {value:?}")]
    Date { field: &'static str, value: String },
}

/// Patient list filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterCriteria {
    #[default]
    All,
    /// First visit
    New,
    Returning,
    /// All records, youngest first
    Age,
    Unpaid,
}

impl FilterCriteria {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCriteria::All => "all",
            FilterCriteria::New => "new",
            FilterCriteria::Returning => "returning",
            FilterCriteria::Age => "age",
            FilterCriteria::Unpaid => "unpaid",
        }
    }
}

impl FromStr for FilterCriteria {
    type Err = InvalidCriteria;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FilterCriteria::All),
            "new" => Ok(FilterCriteria::New),
            "returning" => Ok(FilterCriteria::Returning),
            "age" => Ok(FilterCriteria::Age),
            "unpaid" => Ok(FilterCriteria::Unpaid),
            _ => Err(InvalidCriteria::Filter(s.to_string())),
        }
    }
}

impl fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry-date sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = InvalidCriteria;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(InvalidCriteria::SortOrder(s.to_string())),
        }
    }
}

/// Age band used by the patient list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgeRange {
    #[serde(rename = "0-18")]
    Minor,
    #[serde(rename = "19-30")]
    YoungAdult,
    #[serde(rename = "31-50")]
    Adult,
    #[serde(rename = "51+")]
    Senior,
}

impl AgeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRange::Minor => "0-18",
            AgeRange::YoungAdult => "19-30",
            AgeRange::Adult => "31-50",
            AgeRange::Senior => "51+",
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        match self {
            AgeRange::Minor => age <= 18,
            AgeRange::YoungAdult => (19..=30).contains(&age),
            AgeRange::Adult => (31..=50).contains(&age),
            AgeRange::Senior => age >= 51,
        }
    }
}

impl FromStr for AgeRange {
    type Err = InvalidCriteria;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0-18" => Ok(AgeRange::Minor),
            "19-30" => Ok(AgeRange::YoungAdult),
            "31-50" => Ok(AgeRange::Adult),
            "51+" => Ok(AgeRange::Senior),
            _ => Err(InvalidCriteria::AgeRange(s.to_string())),
        }
    }
}

/// First visit or returning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatientType {
    New,
    Returning,
}

impl FromStr for PatientType {
    type Err = InvalidCriteria;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(PatientType::New),
            "returning" => Ok(PatientType::Returning),
            _ => Err(InvalidCriteria::PatientType(s.to_string())),
        }
    }
}

/// Combined patient-list filter. Unset fields match everything; set fields
/// must all match. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListFilter {
    pub age_range: Option<AgeRange>,
    pub payment_status: Option<PaymentStatus>,
    pub patient_type: Option<PatientType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ListFilter {
    /// Build from raw keys as sent by a list form. Blank values are unset.
    pub fn from_keys(
        age_range: Option<&str>,
        payment_status: Option<&str>,
        patient_type: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self, InvalidCriteria> {
        Ok(Self {
            age_range: non_blank(age_range).map(str::parse::<AgeRange>).transpose()?,
            payment_status: non_blank(payment_status)
                .map(|s| {
                    s.to_uppercase()
                        .parse::<PaymentStatus>()
                        .map_err(|_| InvalidCriteria::PaymentStatus(s.to_string()))
                })
                .transpose()?,
            patient_type: non_blank(patient_type)
                .map(str::parse::<PatientType>)
                .transpose()?,
            start_date: parse_date("start", start_date)?,
            end_date: parse_date("end", end_date)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, patient: &Patient) -> bool {
        self.age_range.map_or(true, |r| r.contains(patient.age))
            && self
                .payment_status
                .map_or(true, |s| patient.payment_status == s)
            && self.patient_type.map_or(true, |t| {
                patient.is_new_patient == (t == PatientType::New)
            })
            && self.start_date.map_or(true, |d| patient.entry_date >= d)
            && self.end_date.map_or(true, |d| patient.entry_date <= d)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, InvalidCriteria> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| InvalidCriteria::Date {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

/// Keep the records matching every set field of `list_filter`, in order.
pub fn filter_list(patients: Vec<Patient>, list_filter: &ListFilter) -> Vec<Patient> {
    if list_filter.is_empty() {
        return patients;
    }
    patients
        .into_iter()
        .filter(|p| list_filter.matches(p))
        .collect()
}

/// Records whose name contains `query` (case-insensitive) or whose phone
/// number contains it. A blank query matches everything.
pub fn search(patients: Vec<Patient>, query: &str) -> Vec<Patient> {
    let query = query.trim();
    if query.is_empty() {
        return patients;
    }

    let needle = query.to_lowercase();
    patients
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&needle) || p.phone_number.contains(query))
        .collect()
}

/// Apply a filter criteria. `Age` sorts rather than narrows.
pub fn filter(patients: Vec<Patient>, criteria: FilterCriteria) -> Vec<Patient> {
    match criteria {
        FilterCriteria::All => patients,
        FilterCriteria::New => patients.into_iter().filter(|p| p.is_new_patient).collect(),
        FilterCriteria::Returning => patients.into_iter().filter(|p| !p.is_new_patient).collect(),
        FilterCriteria::Age => {
            let mut sorted = patients;
            // sort_by_key is stable: equal ages keep insertion order
            sorted.sort_by_key(|p| p.age);
            sorted
        }
        FilterCriteria::Unpaid => patients
            .into_iter()
            .filter(|p| p.payment_status == PaymentStatus::Unpaid)
            .collect(),
    }
}

/// Stable sort by entry date.
pub fn sort_by_entry_date(mut patients: Vec<Patient>, order: SortOrder) -> Vec<Patient> {
    match order {
        SortOrder::Asc => patients.sort_by(|a, b| a.entry_date.cmp(&b.entry_date)),
        SortOrder::Desc => patients.sort_by(|a, b| b.entry_date.cmp(&a.entry_date)),
    }
    patients
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, NewPatient};
    use chrono::NaiveDate;

    fn make_patient(name: &str, phone: &str, age: u32, is_new: bool, day: u32) -> Patient {
        Patient::register(NewPatient {
            name: name.into(),
            age,
            gender: Gender::Other,
            phone_number: phone.into(),
            diagnosis: "Gingivitis".into(),
            treatment_plan: "Scaling".into(),
            tro: "SRP".into(),
            tooth_number: "11".into(),
            is_new_patient: is_new,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            total_amount: 100.0,
            paid_amount: None,
        })
        .unwrap()
    }

    fn sample() -> Vec<Patient> {
        vec![
            make_patient("Alice Moore", "555-1000", 40, true, 3),
            make_patient("Bob Stone", "555-2000", 25, false, 1),
            make_patient("alicia keys", "777-3000", 40, false, 2),
            make_patient("Carl Young", "555-4000", 18, true, 2),
        ]
    }

    fn names(patients: &[Patient]) -> Vec<&str> {
        patients.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_search_by_name_case_insensitive() {
        let results = search(sample(), "ALIC");
        assert_eq!(names(&results), vec!["Alice Moore", "alicia keys"]);
    }

    #[test]
    fn test_search_by_phone() {
        let results = search(sample(), "777");
        assert_eq!(names(&results), vec!["alicia keys"]);
    }

    #[test]
    fn test_empty_search_returns_all() {
        let patients = sample();
        assert_eq!(search(patients.clone(), ""), patients);
        assert_eq!(search(patients, "   ").len(), 4);
    }

    #[test]
    fn test_filter_new_and_returning() {
        assert_eq!(
            names(&filter(sample(), FilterCriteria::New)),
            vec!["Alice Moore", "Carl Young"]
        );
        assert_eq!(
            names(&filter(sample(), FilterCriteria::Returning)),
            vec!["Bob Stone", "alicia keys"]
        );
    }

    #[test]
    fn test_filter_age_is_stable() {
        let sorted = filter(sample(), FilterCriteria::Age);
        assert_eq!(
            names(&sorted),
            vec!["Carl Young", "Bob Stone", "Alice Moore", "alicia keys"]
        );
    }

    #[test]
    fn test_filter_unpaid() {
        let mut patients = sample();
        patients[1].apply_payment(100.0).unwrap();
        let unpaid = filter(patients, FilterCriteria::Unpaid);
        assert_eq!(unpaid.len(), 3);
        assert!(unpaid.iter().all(|p| p.name != "Bob Stone"));
    }

    #[test]
    fn test_parse_criteria() {
        assert_eq!("unpaid".parse::<FilterCriteria>(), Ok(FilterCriteria::Unpaid));
        assert_eq!(
            "oldest".parse::<FilterCriteria>(),
            Err(InvalidCriteria::Filter("oldest".into()))
        );
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_list_filter_age_range() {
        let filter = ListFilter {
            age_range: Some(AgeRange::Adult),
            ..ListFilter::default()
        };
        assert_eq!(
            names(&filter_list(sample(), &filter)),
            vec!["Alice Moore", "alicia keys"]
        );
        assert!(AgeRange::Minor.contains(18));
        assert!(!AgeRange::YoungAdult.contains(31));
        assert!(AgeRange::Senior.contains(51));
    }

    #[test]
    fn test_list_filter_combines_fields() {
        let mut patients = sample();
        patients[2].apply_payment(100.0).unwrap();

        let paid_returning =
            ListFilter::from_keys(None, Some("paid"), Some("RETURNING"), None, None).unwrap();
        assert_eq!(
            names(&filter_list(patients.clone(), &paid_returning)),
            vec!["alicia keys"]
        );

        let day = Some("2024-01-02");
        let dated = ListFilter::from_keys(Some(""), None, None, day, day).unwrap();
        assert_eq!(
            names(&filter_list(patients, &dated)),
            vec!["alicia keys", "Carl Young"]
        );
    }

    #[test]
    fn test_empty_list_filter_keeps_everything() {
        let filter = ListFilter::from_keys(Some(" "), Some(""), None, None, Some("")).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter_list(sample(), &filter).len(), 4);
    }

    #[test]
    fn test_list_filter_rejects_bad_keys() {
        assert_eq!(
            ListFilter::from_keys(Some("20-40"), None, None, None, None),
            Err(InvalidCriteria::AgeRange("20-40".into()))
        );
        assert_eq!(
            ListFilter::from_keys(None, Some("partial"), None, None, None),
            Err(InvalidCriteria::PaymentStatus("partial".into()))
        );
        assert!(ListFilter::from_keys(None, None, Some("vip"), None, None).is_err());
        assert!(matches!(
            ListFilter::from_keys(None, None, None, Some("01/02/2024"), None),
            Err(InvalidCriteria::Date { field: "start", .. })
        ));
    }

    #[test]
    fn test_sort_by_entry_date() {
        let asc = sort_by_entry_date(sample(), SortOrder::Asc);
        assert_eq!(
            names(&asc),
            vec!["Bob Stone", "alicia keys", "Carl Young", "Alice Moore"]
        );
        let desc = sort_by_entry_date(sample(), SortOrder::Desc);
        assert_eq!(
            names(&desc),
            vec!["Alice Moore", "alicia keys", "Carl Young", "Bob Stone"]
        );
    }
}
