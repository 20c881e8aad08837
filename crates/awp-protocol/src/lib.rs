//! AWP weather-station report protocol.
//!
//! Supports:
//! - Conformant reports (`/data/report/STATION?tempf=72.5&humidity=45`)
//! - Firmware that drops the `?` (`/data/report/STATION&tempf=72.5&humidity=45`)
//! - Partial recovery of malformed query pairs

pub mod error;
pub mod fields;
pub mod query;

pub use error::DecodeError;
pub use fields::{is_ignored_field, IGNORED_FIELDS};
pub use query::{decode_report, parse_query, station_from_path, DecodedReport, ObservationSet};
