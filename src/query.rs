//! Query-string building for resource paths
//!
//! Filter queries are written by users as `key=value&key=value`. Only the
//! values are percent-encoded; keys such as `filter[category]` and the `&`/`=`
//! delimiters are kept verbatim.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Result, UpError};

/// Characters left alone by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Encode each value of a `k=v&k=v` filter query independently.
///
/// Pairs are split on the first `=`, so a value may itself contain `=`.
/// Empty segments are dropped and a segment without `=` is kept as a bare key.
pub fn encode_filter_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => format!("{}={}", key, encode_component(value)),
            None => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3339 UTC with millisecond precision, percent-encoded
pub fn encode_date(date: DateTime<Utc>) -> String {
    encode_component(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| UpError::InvalidArgument {
            reason: format!("'{}' is not a date (use YYYY-MM-DD or RFC 3339)", input),
        })
}

/// Append the non-empty query fragments to `path`
pub fn with_query(path: &str, fragments: &[String]) -> String {
    let query = fragments
        .iter()
        .filter(|f| !f.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query)
    }
}
