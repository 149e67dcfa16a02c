use census_quoter::error::CensusError;
use census_quoter::quote::{compute_age_band_stats, compute_multipliers, compute_quote};
use census_quoter::types::{AgeBand, PersonRow};
use chrono::{Datelike, NaiveDate};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn person_aged(age: i32) -> PersonRow {
    let t = today();
    PersonRow {
        first_name: "Pat".to_string(),
        last_name: format!("Aged{age}"),
        email: format!("pat{age}@example.com"),
        gender: "X".to_string(),
        dob: NaiveDate::from_ymd_opt(t.year() - age, 1, 15).unwrap(),
        state: "WA".to_string(),
    }
}

fn mixed_census() -> Vec<Vec<PersonRow>> {
    vec![
        vec![person_aged(25)],
        vec![person_aged(25), person_aged(45), person_aged(65)],
        (0..10).map(|i| person_aged(20 + i * 7)).collect(),
        (0..40).map(|i| person_aged(18 + i)).collect(),
        vec![person_aged(70); 5],
        vec![person_aged(39), person_aged(40), person_aged(59), person_aged(60)],
    ]
}

#[test]
fn three_band_scenario_matches_reference_values() {
    let rows = vec![person_aged(25), person_aged(45), person_aged(65)];
    let (aged, stats) = compute_age_band_stats(&rows, today()).unwrap();
    let ages: Vec<u32> = aged.iter().map(|a| a.age).collect();
    assert_eq!(ages, vec![25, 45, 65]);
    for f in [stats.band1, stats.band2, stats.band3] {
        assert!((f - 1.0 / 3.0).abs() < 1e-12);
    }

    let m = compute_multipliers(&rows, today()).unwrap();
    assert!((m.band1 - 10.0 / 9.0).abs() < 1e-12);

    let quote = compute_quote(&rows, today()).unwrap();
    let band1 = quote.row(AgeBand::Band1).unwrap();
    assert_eq!(band1.label, "< 40");
    assert_eq!(band1.small, "16.67");
    assert_eq!(band1.significant, "10.00");
    assert_eq!(band1.major, "3.33");
    let band3 = quote.row(AgeBand::Band3).unwrap();
    assert_eq!(band3.small, "100.00");
    assert_eq!(band3.major, "20.00");
}

#[test]
fn fractions_sum_to_one() {
    for rows in mixed_census() {
        let (_, stats) = compute_age_band_stats(&rows, today()).unwrap();
        let total = stats.band1 + stats.band2 + stats.band3;
        assert!((total - 1.0).abs() < 1e-9, "total = {total}");
    }
}

#[test]
fn ages_agree_with_band_thresholds() {
    for rows in mixed_census() {
        let (aged, _) = compute_age_band_stats(&rows, today()).unwrap();
        assert_eq!(aged.len(), rows.len());
        for a in aged {
            let expected = if a.age < 40 {
                AgeBand::Band1
            } else if a.age < 60 {
                AgeBand::Band2
            } else {
                AgeBand::Band3
            };
            assert_eq!(a.band, expected, "age {}", a.age);
        }
    }
}

#[test]
fn multipliers_stay_in_range() {
    for rows in mixed_census() {
        let m = compute_multipliers(&rows, today()).unwrap();
        for v in [m.band1, m.band2, m.band3] {
            assert!((1.0..=1.0 + 1.0 / 3.0 + 1e-12).contains(&v), "multiplier {v}");
        }
    }
}

fn money(value: &str) -> f64 {
    value.parse().unwrap()
}

#[test]
fn quotes_never_decrease_with_age() {
    for rows in mixed_census() {
        let quote = compute_quote(&rows, today()).unwrap();
        let small: Vec<f64> = quote.rows.iter().map(|r| money(&r.small)).collect();
        let significant: Vec<f64> = quote.rows.iter().map(|r| money(&r.significant)).collect();
        let major: Vec<f64> = quote.rows.iter().map(|r| money(&r.major)).collect();
        for values in [small, significant, major] {
            assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
        }
    }
}

#[test]
fn every_value_has_two_decimals() {
    let quote = compute_quote(&mixed_census()[3], today()).unwrap();
    for row in &quote.rows {
        for value in [&row.small, &row.significant, &row.major] {
            let (_, frac) = value.split_once('.').unwrap();
            assert_eq!(frac.len(), 2, "{value}");
        }
    }
}

#[test]
fn empty_input_is_an_error() {
    assert!(matches!(compute_quote(&[], today()), Err(CensusError::EmptyInput)));
    assert!(matches!(compute_multipliers(&[], today()), Err(CensusError::EmptyInput)));
}
