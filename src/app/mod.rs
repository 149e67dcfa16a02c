pub mod ports;
pub mod census_use_case;
