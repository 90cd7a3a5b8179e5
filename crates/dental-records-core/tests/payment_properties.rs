//! Property tests for payment bookkeeping.

use chrono::NaiveDate;
use dental_records_core::models::{Gender, NewPatient, Patient, PaymentStatus};
use dental_records_core::store::{MemoryStore, PatientStore};
use proptest::prelude::*;

fn make_new(total_cents: i64, paid_cents: i64) -> NewPatient {
    NewPatient {
        name: "Prop Patient".to_string(),
        age: 40,
        gender: Gender::Other,
        phone_number: "555-7777".to_string(),
        diagnosis: "Checkup".to_string(),
        treatment_plan: "Cleaning".to_string(),
        tro: "Done".to_string(),
        tooth_number: "all".to_string(),
        is_new_patient: true,
        entry_date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        total_amount: total_cents as f64 / 100.0,
        paid_amount: Some(paid_cents as f64 / 100.0),
    }
}

fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn assert_consistent(patient: &Patient) {
    let total = cents(patient.total_amount);
    let paid = cents(patient.paid_amount);
    assert!(paid <= total);
    assert_eq!(cents(patient.remaining_balance), total - paid);
    assert_eq!(patient.payment_status == PaymentStatus::Paid, paid == total);
}

proptest! {
    #[test]
    fn registered_patients_are_consistent(
        (total, paid) in (0i64..10_000_000).prop_flat_map(|t| (Just(t), 0..=t))
    ) {
        let patient = Patient::register(make_new(total, paid)).unwrap();
        assert_consistent(&patient);
        prop_assert_eq!(cents(patient.remaining_balance), total - paid);
    }

    #[test]
    fn payments_never_exceed_total(
        total in 1i64..1_000_000,
        payments in prop::collection::vec(1i64..500_000, 1..8)
    ) {
        let store = MemoryStore::new();
        let created = store.create(make_new(total, 0)).unwrap();

        let mut expected = 0i64;
        for payment in payments {
            let updated = store.update_payment(&created.id, payment as f64 / 100.0).unwrap();
            expected = (expected + payment).min(total);
            assert_consistent(&updated);
            prop_assert_eq!(cents(updated.paid_amount), expected);
        }
    }

    #[test]
    fn overpaid_intake_is_rejected(total in 0i64..1_000_000, extra in 1i64..1_000) {
        prop_assert!(Patient::register(make_new(total, total + extra)).is_err());
    }
}
