//! Dashboard aggregates over a patient list.
//!
//! These are pure functions: callers pass whatever `list()` returned and render
//! the result however they like.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{from_cents, to_cents, Gender, Patient, PaymentStatus};

/// Headline numbers for one calendar month of entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub total_patients: usize,
    pub new_patients: usize,
    pub returning_patients: usize,
    /// Sum of treatment totals
    pub total_revenue: f64,
    pub average_revenue: f64,
    pub male_patients: usize,
    pub female_patients: usize,
    pub average_age: f64,
}

impl MonthlySummary {
    /// Summarize patients whose entry date falls in `year`/`month`.
    /// Averages are 0 for an empty month.
    pub fn for_month(patients: &[Patient], year: i32, month: u32) -> Self {
        let monthly: Vec<&Patient> = patients
            .iter()
            .filter(|p| p.entry_date.year() == year && p.entry_date.month() == month)
            .collect();

        let total_patients = monthly.len();
        let new_patients = monthly.iter().filter(|p| p.is_new_patient).count();
        let revenue_cents = sum_cents(monthly.iter().map(|p| p.total_amount));
        let age_sum: u64 = monthly.iter().map(|p| u64::from(p.age)).sum();

        let (average_revenue, average_age) = if total_patients == 0 {
            (0.0, 0.0)
        } else {
            (
                from_cents(revenue_cents) / total_patients as f64,
                age_sum as f64 / total_patients as f64,
            )
        };

        Self {
            year,
            month,
            total_patients,
            new_patients,
            returning_patients: total_patients - new_patients,
            total_revenue: from_cents(revenue_cents),
            average_revenue,
            male_patients: count_gender(&monthly, Gender::Male),
            female_patients: count_gender(&monthly, Gender::Female),
            average_age,
        }
    }
}

fn count_gender(patients: &[&Patient], gender: Gender) -> usize {
    patients.iter().filter(|p| p.gender == gender).count()
}

/// Sum amounts in cents, saturating instead of overflowing.
fn sum_cents(amounts: impl Iterator<Item = f64>) -> i64 {
    amounts.fold(0i64, |acc, amount| acc.saturating_add(to_cents(amount)))
}

/// Paid vs. unpaid split and money totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub paid: usize,
    pub unpaid: usize,
    pub billed: f64,
    pub collected: f64,
    pub outstanding: f64,
}

impl PaymentBreakdown {
    pub fn from_patients(patients: &[Patient]) -> Self {
        let paid = patients
            .iter()
            .filter(|p| p.payment_status == PaymentStatus::Paid)
            .count();
        let billed = sum_cents(patients.iter().map(|p| p.total_amount));
        let collected = sum_cents(patients.iter().map(|p| p.paid_amount));

        Self {
            paid,
            unpaid: patients.len() - paid,
            billed: from_cents(billed),
            collected: from_cents(collected),
            outstanding: from_cents(billed - collected),
        }
    }
}

/// Number of patients in one age band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgeBucket {
    pub label: String,
    pub count: usize,
}

const AGE_BANDS: [(&str, u32); 5] = [
    ("0-18", 18),
    ("19-30", 30),
    ("31-45", 45),
    ("46-60", 60),
    ("60+", u32::MAX),
];

/// Counts per age band, in band order. Every band is present.
pub fn age_distribution(patients: &[Patient]) -> Vec<AgeBucket> {
    let mut counts = [0usize; AGE_BANDS.len()];
    for patient in patients {
        if let Some(band) = AGE_BANDS.iter().position(|(_, max)| patient.age <= *max) {
            counts[band] += 1;
        }
    }

    AGE_BANDS
        .iter()
        .zip(counts)
        .map(|((label, _), count)| AgeBucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// How often a treatment plan occurs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentCount {
    pub treatment_plan: String,
    pub count: usize,
}

/// The `limit` most common treatment plans, most frequent first. Ties keep
/// the order in which plans first appear.
pub fn top_treatments(patients: &[Patient], limit: usize) -> Vec<TreatmentCount> {
    let mut counts: Vec<TreatmentCount> = Vec::new();
    for patient in patients {
        match counts
            .iter_mut()
            .find(|c| c.treatment_plan == patient.treatment_plan)
        {
            Some(entry) => entry.count += 1,
            None => counts.push(TreatmentCount {
                treatment_plan: patient.treatment_plan.clone(),
                count: 1,
            }),
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Patients entered on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Entries per day for the `days` days ending on `today`, oldest first.
/// Days without entries are present with a zero count.
pub fn daily_intake(patients: &[Patient], today: NaiveDate, days: u32) -> Vec<DailyCount> {
    (0..i64::from(days))
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            DailyCount {
                date,
                count: patients.iter().filter(|p| p.entry_date == date).count(),
            }
        })
        .collect()
}

/// Number of patients of one gender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: usize,
}

/// Counts per gender over all patients. Genders with no patients are omitted.
pub fn gender_distribution(patients: &[Patient]) -> Vec<GenderCount> {
    let all: Vec<&Patient> = patients.iter().collect();
    [Gender::Male, Gender::Female, Gender::Other]
        .into_iter()
        .map(|gender| GenderCount {
            gender,
            count: count_gender(&all, gender),
        })
        .filter(|c| c.count > 0)
        .collect()
}

/// The last `limit` patients added, newest first.
pub fn recent_patients(patients: &[Patient], limit: usize) -> Vec<Patient> {
    patients.iter().rev().take(limit).cloned().collect()
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub monthly: MonthlySummary,
    pub payments: PaymentBreakdown,
    pub age_distribution: Vec<AgeBucket>,
    pub gender_distribution: Vec<GenderCount>,
    pub daily_intake: Vec<DailyCount>,
    pub top_treatments: Vec<TreatmentCount>,
    pub recent_patients: Vec<Patient>,
}

impl Dashboard {
    pub const TOP_TREATMENTS: usize = 5;
    pub const RECENT_PATIENTS: usize = 5;
    pub const INTAKE_DAYS: u32 = 30;

    /// `today` anchors the daily intake series.
    pub fn build(patients: &[Patient], year: i32, month: u32, today: NaiveDate) -> Self {
        Self {
            monthly: MonthlySummary::for_month(patients, year, month),
            payments: PaymentBreakdown::from_patients(patients),
            age_distribution: age_distribution(patients),
            gender_distribution: gender_distribution(patients),
            daily_intake: daily_intake(patients, today, Self::INTAKE_DAYS),
            top_treatments: top_treatments(patients, Self::TOP_TREATMENTS),
            recent_patients: recent_patients(patients, Self::RECENT_PATIENTS),
        }
    }
}
