//! Tests for tax exemption rules

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use proptest::prelude::*;

use core_kernel::Rate;
use domain_tax::{filter_applicable, is_pst_exempt_on, ItemType, TaxRate, PST_BC};

fn standard_rates() -> Vec<TaxRate> {
    vec![
        TaxRate::new("GST", Rate::new(dec!(0.05))),
        TaxRate::new(PST_BC, Rate::new(dec!(0.07))).with_region("BC"),
    ]
}

mod jurisdiction {
    use super::*;

    #[test]
    fn test_individual_session_exempt_from_pst() {
        let applicable = filter_applicable(standard_rates(), ItemType::IndividualSession, false);
        assert!(applicable.iter().all(|r| r.name != PST_BC));
    }

    #[test]
    fn test_other_regional_rates_kept() {
        let mut rates = standard_rates();
        rates.push(TaxRate::new("PST_MB", Rate::new(dec!(0.07))).with_region("MB"));

        let applicable = filter_applicable(rates, ItemType::ClassEnrollment, false);
        let names: Vec<_> = applicable.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["GST", "PST_MB"]);
    }

    #[test]
    fn test_rate_order_preserved() {
        let applicable = filter_applicable(standard_rates(), ItemType::Product, false);
        assert_eq!(applicable[0].name, "GST");
        assert_eq!(applicable[1].name, PST_BC);
    }
}

mod age_exemption {
    use super::*;

    #[test]
    fn test_birthday_today_at_fifteen_not_exempt() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let born = NaiveDate::from_ymd_opt(2011, 10, 16).unwrap();
        assert!(!is_pst_exempt_on(Some(born), today));
    }

    #[test]
    fn test_one_day_short_of_fifteen_exempt() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let born = NaiveDate::from_ymd_opt(2011, 10, 17).unwrap();
        assert!(is_pst_exempt_on(Some(born), today));
    }

    #[test]
    fn test_adult_not_exempt() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let born = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert!(!is_pst_exempt_on(Some(born), today));
    }
}

proptest! {
    #[test]
    fn class_enrollment_never_includes_pst(exempt in any::<bool>(), extra in 0u32..5u32) {
        let mut rates = standard_rates();
        for i in 0..extra {
            rates.push(TaxRate::new(format!("LEVY_{}", i), Rate::new(Decimal::new(i as i64, 2))));
        }
        let applicable = filter_applicable(rates, ItemType::ClassEnrollment, exempt);
        prop_assert!(applicable.iter().all(|r| r.name != PST_BC));
    }

    #[test]
    fn exemption_matches_age_threshold(days_old in 0u64..(40 * 366)) {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let born = today.checked_sub_days(Days::new(days_old)).unwrap();
        let fifteenth_birthday = NaiveDate::from_ymd_opt(2011, 10, 16).unwrap();
        prop_assert_eq!(is_pst_exempt_on(Some(born), today), born > fifteenth_birthday);
    }
}
