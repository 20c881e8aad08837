//! Report fields that carry device identity rather than sensor readings.

/// Fields never turned into metrics. Not every device sends all of them.
pub const IGNORED_FIELDS: [&str; 6] = [
    "PASSKEY",
    "MAC",
    "STATIONTYPE",
    "SOFTWARETYPE",
    "DATEUTC",
    "TZ",
];

/// Case-insensitive membership test against [`IGNORED_FIELDS`].
pub fn is_ignored_field(name: &str) -> bool {
    IGNORED_FIELDS
        .iter()
        .any(|ignored| ignored.eq_ignore_ascii_case(name))
}
