//! Age-banded quote engine.
//!
//! Everything here is pure: rows go in, derived statistics and a formatted quote
//! table come out. "Today" is an explicit argument so results are reproducible;
//! the `*_now` wrappers pin it to the local calendar date.

use crate::constants::{
    BAND1_AGE_MULTIPLIER, BAND2_AGE_MULTIPLIER, BAND3_AGE_MULTIPLIER, MAJOR_BASE_RATE,
    SIGNIFICANT_BASE_RATE, SMALL_BASE_RATE,
};
use crate::error::{CensusError, Result};
use crate::types::{AgeBand, AgeBandStats, AgedRow, PersonRow, QuoteRow, QuoteTable, RateMultiplier};
use chrono::{Local, NaiveDate};
use tracing::debug;

/// Whole years elapsed between `dob` and `today`, truncated. Future dates count as zero.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    today.years_since(dob).unwrap_or(0)
}

/// Pair every row with its computed age and band, and report the band fractions.
pub fn compute_age_band_stats(
    rows: &[PersonRow],
    today: NaiveDate,
) -> Result<(Vec<AgedRow>, AgeBandStats)> {
    if rows.is_empty() {
        return Err(CensusError::EmptyInput);
    }

    let mut counts = [0usize; 3];
    let aged: Vec<AgedRow> = rows
        .iter()
        .map(|row| {
            let age = age_on(row.dob, today);
            let band = AgeBand::from_age(age);
            counts[band_index(band)] += 1;
            AgedRow {
                row: row.clone(),
                age,
                band,
            }
        })
        .collect();

    let total = rows.len() as f64;
    let stats = AgeBandStats {
        band1: counts[0] as f64 / total,
        band2: counts[1] as f64 / total,
        band3: counts[2] as f64 / total,
    };
    debug!(?counts, total = rows.len(), "Computed age band distribution");

    Ok((aged, stats))
}

/// Rate multiplier for each band: `1 + fraction / 3`.
pub fn compute_multipliers(rows: &[PersonRow], today: NaiveDate) -> Result<RateMultiplier> {
    let (_, stats) = compute_age_band_stats(rows, today)?;
    Ok(multipliers_from_stats(&stats))
}

pub fn multipliers_from_stats(stats: &AgeBandStats) -> RateMultiplier {
    RateMultiplier {
        band1: 1.0 + stats.band1 / 3.0,
        band2: 1.0 + stats.band2 / 3.0,
        band3: 1.0 + stats.band3 / 3.0,
    }
}

/// Build the tiered quote table, ordered band1, band2, band3.
pub fn compute_quote(rows: &[PersonRow], today: NaiveDate) -> Result<QuoteTable> {
    let multipliers = compute_multipliers(rows, today)?;
    Ok(quote_from_multipliers(&multipliers))
}

pub fn quote_from_multipliers(multipliers: &RateMultiplier) -> QuoteTable {
    let rows = AgeBand::ALL
        .iter()
        .map(|&band| {
            let scale = static_age_multiplier(band) * multipliers.for_band(band);
            QuoteRow {
                band,
                label: band.label().to_string(),
                small: format_money(SMALL_BASE_RATE * scale),
                significant: format_money(SIGNIFICANT_BASE_RATE * scale),
                major: format_money(MAJOR_BASE_RATE * scale),
            }
        })
        .collect();
    QuoteTable { rows }
}

pub fn compute_quote_now(rows: &[PersonRow]) -> Result<QuoteTable> {
    compute_quote(rows, Local::now().date_naive())
}

pub fn compute_age_band_stats_now(rows: &[PersonRow]) -> Result<(Vec<AgedRow>, AgeBandStats)> {
    compute_age_band_stats(rows, Local::now().date_naive())
}

/// Fixed actuarial multiplier for a band, independent of the input distribution
pub fn static_age_multiplier(band: AgeBand) -> f64 {
    match band {
        AgeBand::Band1 => BAND1_AGE_MULTIPLIER,
        AgeBand::Band2 => BAND2_AGE_MULTIPLIER,
        AgeBand::Band3 => BAND3_AGE_MULTIPLIER,
    }
}

/// Two fractional digits, half away from zero.
pub fn format_money(value: f64) -> String {
    let cents = (value * 100.0).round();
    format!("{:.2}", cents / 100.0)
}

fn band_index(band: AgeBand) -> usize {
    match band {
        AgeBand::Band1 => 0,
        AgeBand::Band2 => 1,
        AgeBand::Band3 => 2,
    }
}
