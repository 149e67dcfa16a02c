use crate::constants::{BAND2_MIN_AGE, BAND3_MIN_AGE, CENSUS_FK_FIELD};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field map handed to the record store for a create operation
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Identifier assigned by the record store when a Census is created
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CensusId(pub String);

impl fmt::Display for CensusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parent record for one ingestion event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Census {
    pub id: CensusId,
    pub source_blob: String,
    pub file_ref: String,
    pub source_sha256: String,
}

/// One parsed census line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    Band1,
    Band2,
    Band3,
}

impl AgeBand {
    pub const ALL: [AgeBand; 3] = [AgeBand::Band1, AgeBand::Band2, AgeBand::Band3];

    pub fn from_age(age: u32) -> Self {
        if age >= BAND3_MIN_AGE {
            AgeBand::Band3
        } else if age >= BAND2_MIN_AGE {
            AgeBand::Band2
        } else {
            AgeBand::Band1
        }
    }

    /// Human-readable age range used in reports
    pub fn label(&self) -> &'static str {
        match self {
            AgeBand::Band1 => "< 40",
            AgeBand::Band2 => "40-59",
            AgeBand::Band3 => "60+",
        }
    }
}

/// A row paired with the age computed for it at processing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgedRow {
    pub row: PersonRow,
    pub age: u32,
    pub band: AgeBand,
}

/// Persisted form of a PersonRow, linked to its owning Census
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusLine {
    pub census_id: CensusId,
    #[serde(flatten)]
    pub person: PersonRow,
}

impl CensusLine {
    pub fn new(census_id: CensusId, person: PersonRow) -> Self {
        Self { census_id, person }
    }

    /// Record store field map, including the foreign reference to the Census
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(CENSUS_FK_FIELD.to_string(), self.census_id.0.clone().into());
        fields.insert("first_name".to_string(), self.person.first_name.clone().into());
        fields.insert("last_name".to_string(), self.person.last_name.clone().into());
        fields.insert("email".to_string(), self.person.email.clone().into());
        fields.insert("gender".to_string(), self.person.gender.clone().into());
        fields.insert("dob".to_string(), self.person.dob.format("%Y-%m-%d").to_string().into());
        fields.insert("state".to_string(), self.person.state.clone().into());
        fields
    }
}

/// Fraction of rows falling into each age band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeBandStats {
    pub band1: f64,
    pub band2: f64,
    pub band3: f64,
}

impl AgeBandStats {
    pub fn fraction(&self, band: AgeBand) -> f64 {
        match band {
            AgeBand::Band1 => self.band1,
            AgeBand::Band2 => self.band2,
            AgeBand::Band3 => self.band3,
        }
    }
}

/// Distribution-sensitive rate adjustment per band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateMultiplier {
    pub band1: f64,
    pub band2: f64,
    pub band3: f64,
}

impl RateMultiplier {
    pub fn for_band(&self, band: AgeBand) -> f64 {
        match band {
            AgeBand::Band1 => self.band1,
            AgeBand::Band2 => self.band2,
            AgeBand::Band3 => self.band3,
        }
    }
}

/// One band of the quote, with monetary tiers formatted to two decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRow {
    pub band: AgeBand,
    pub label: String,
    pub small: String,
    pub significant: String,
    pub major: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteTable {
    pub rows: Vec<QuoteRow>,
}

impl QuoteTable {
    pub fn row(&self, band: AgeBand) -> Option<&QuoteRow> {
        self.rows.iter().find(|r| r.band == band)
    }
}

/// Rendered artifact ready for upload
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Inbound chat event announcing a census attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusEvent {
    pub token: String,
    pub file_id: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_band_thresholds() {
        assert_eq!(AgeBand::from_age(0), AgeBand::Band1);
        assert_eq!(AgeBand::from_age(39), AgeBand::Band1);
        assert_eq!(AgeBand::from_age(40), AgeBand::Band2);
        assert_eq!(AgeBand::from_age(59), AgeBand::Band2);
        assert_eq!(AgeBand::from_age(60), AgeBand::Band3);
        assert_eq!(AgeBand::from_age(101), AgeBand::Band3);
    }

    #[test]
    fn census_line_fields_carry_foreign_key() {
        let line = CensusLine::new(
            CensusId("cen-1".to_string()),
            PersonRow {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                gender: "F".to_string(),
                dob: NaiveDate::from_ymd_opt(1980, 12, 10).unwrap(),
                state: "WA".to_string(),
            },
        );
        let fields = line.to_fields();
        assert_eq!(fields[CENSUS_FK_FIELD], "cen-1");
        assert_eq!(fields["dob"], "1980-12-10");
        assert_eq!(fields.len(), 7);
    }

    #[test]
    fn event_thread_is_optional() {
        let event: CensusEvent =
            serde_json::from_str(r#"{"token":"xoxb-1","file_id":"F123"}"#).unwrap();
        assert_eq!(event.file_id, "F123");
        assert!(event.thread_ts.is_none());
    }
}
