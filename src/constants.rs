/// Record store and actuarial constants shared across the pipeline

// Record store entity names
pub const CENSUS_ENTITY: &str = "Census";
pub const CENSUS_LINE_ENTITY: &str = "CensusLine";

// Foreign key field linking a CensusLine to its Census
pub const CENSUS_FK_FIELD: &str = "census_id";

/// Maximum pending create operations in one unit of work
pub const BATCH_CAPACITY: usize = 500;

// Baseline risk unit prices for the youngest band
pub const MAJOR_BASE_RATE: f64 = 3.0;
pub const SMALL_BASE_RATE: f64 = MAJOR_BASE_RATE * 5.0;
pub const SIGNIFICANT_BASE_RATE: f64 = MAJOR_BASE_RATE * 3.0;

// Static age-tier multipliers, independent of the input distribution
pub const BAND1_AGE_MULTIPLIER: f64 = 1.0;
pub const BAND2_AGE_MULTIPLIER: f64 = 3.0;
pub const BAND3_AGE_MULTIPLIER: f64 = 6.0;

// Age thresholds (inclusive lower bounds)
pub const BAND2_MIN_AGE: u32 = 40;
pub const BAND3_MIN_AGE: u32 = 60;

// Expected census header, in order
pub const CENSUS_HEADER: [&str; 6] = ["first_name", "last_name", "email", "gender", "dob", "state"];

// Accepted date-of-birth layouts, tried in order
pub const DOB_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

// Rendered artifact file names
pub const QUOTE_IMAGE_FILENAME: &str = "quote_table.svg";
pub const CHART_IMAGE_FILENAME: &str = "age_distribution.svg";
