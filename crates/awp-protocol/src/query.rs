//! Report request decoding.
//!
//! AWP devices send their readings as a GET request against
//! `/data/report/<station>`. Well-behaved firmware uses a normal query string;
//! some units join the station and the first parameter with `&` and never
//! send a `?` at all. Both shapes decode to the same [`DecodedReport`].

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::error::DecodeError;

/// Request-scoped set of observed fields.
///
/// Fields keep every value in arrival order, but only the first one is
/// meaningful for metrics. Iteration is ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationSet {
    fields: BTreeMap<String, Vec<String>>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `field`.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(value.into());
    }

    /// First value observed for `field`.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value observed for `field`, in arrival order.
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(field, first value)` for every field.
    pub fn iter_first(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(|(field, values)| {
            values
                .first()
                .map(|value| (field.as_str(), value.as_str()))
        })
    }

    /// Every `(field, value)` pair, including repeats.
    pub fn iter_all(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().flat_map(|(field, values)| {
            values
                .iter()
                .map(move |value| (field.as_str(), value.as_str()))
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of distinct fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ObservationSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ObservationSet::new();
        for (field, value) in iter {
            set.insert(field, value);
        }
        set
    }
}

/// Result of decoding one report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReport {
    pub station: String,
    pub observations: ObservationSet,
    /// Fragments that were dropped while decoding.
    pub warnings: Vec<DecodeError>,
}

impl DecodedReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Decode a report from the request path and optional raw query.
///
/// The station is the last path segment before any `&`. A standard query is
/// decoded first; parameters embedded in the path after the first `&` are
/// decoded next, so on duplicate keys the standard query wins.
pub fn decode_report(path: &str, query: Option<&str>) -> DecodedReport {
    let mut observations = ObservationSet::new();
    let mut warnings = Vec::new();

    // Some firmware escapes the separator as `%26`; fall back to the decoded
    // path when the raw one has no `&`.
    let decoded_path: Option<String>;
    let (path, embedded) = match path.split_once('&') {
        Some((path, rest)) => (path, Some(rest)),
        None => {
            decoded_path = decode_escaped_separator(path);
            match decoded_path.as_deref().and_then(|p| p.split_once('&')) {
                Some((path, rest)) => (path, Some(rest)),
                None => (path, None),
            }
        }
    };

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        parse_query(query, &mut observations, &mut warnings);
    }
    if let Some(embedded) = embedded {
        parse_query(embedded, &mut observations, &mut warnings);
    }

    let station = station_from_path(path).unwrap_or_else(|e| {
        warnings.push(e);
        base_segment(path).to_string()
    });

    DecodedReport {
        station,
        observations,
        warnings,
    }
}

/// Decode an `application/x-www-form-urlencoded` style query into `into`.
///
/// Malformed pairs are dropped and recorded in `warnings`; the rest of the
/// query is still decoded.
pub fn parse_query(raw: &str, into: &mut ObservationSet, warnings: &mut Vec<DecodeError>) {
    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }
        if segment.contains(';') {
            warnings.push(DecodeError::Semicolon {
                segment: segment.to_string(),
            });
            continue;
        }

        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));

        let decoded = unescape_component(key).and_then(|key| {
            unescape_component(value).map(|value| (key, value))
        });
        match decoded {
            Some((key, _)) if key.is_empty() => {}
            Some((key, value)) => into.insert(key, value),
            None => warnings.push(DecodeError::InvalidEscape {
                segment: segment.to_string(),
            }),
        }
    }
}

/// Station identifier from a request path: the final segment, percent-decoded.
pub fn station_from_path(path: &str) -> Result<String, DecodeError> {
    let segment = base_segment(path);
    if !has_valid_escapes(segment) {
        return Err(DecodeError::InvalidEscape {
            segment: segment.to_string(),
        });
    }
    Ok(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// Percent-decoded path, only when it carries an escaped `&`.
fn decode_escaped_separator(path: &str) -> Option<String> {
    let escaped = path.contains("%26");
    if !escaped || !has_valid_escapes(path) {
        return None;
    }
    Some(percent_decode_str(path).decode_utf8_lossy().into_owned())
}

/// Last element of a slash-separated path, ignoring trailing slashes.
fn base_segment(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Query component decoding: `+` is a space, `%XX` must be well-formed.
fn unescape_component(raw: &str) -> Option<String> {
    if !has_valid_escapes(raw) {
        return None;
    }
    let spaced = raw.replace('+', " ");
    Some(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
}

fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            match hex {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}
