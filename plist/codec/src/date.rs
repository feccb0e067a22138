//! Conversions between instants and their two plist encodings.
//!
//! XML carries `yyyy-MM-ddTHH:mm:ssZ` text at second precision.  The binary format carries a
//! big-endian `f64` of seconds since 2001-01-01T00:00:00Z, which we interpret at millisecond
//! precision.

use chrono::{DateTime, NaiveDateTime, SecondsFormat};
use snafu::prelude::*;

use crate::error::{DateSnafu, Error};
use crate::value::Date;

const XML_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// 2001-01-01T00:00:00Z in Unix milliseconds.
const BINARY_EPOCH_MILLIS: i64 = 978_307_200_000;

pub fn to_xml(date: &Date) -> String {
    date.format(XML_FORMAT).to_string()
}

pub fn from_xml(text: &str) -> Result<Date, Error> {
    NaiveDateTime::parse_from_str(text, XML_FORMAT)
        .map(|date| date.and_utc())
        .map_err(|_| Error::Date {
            date: text.to_string(),
        })
}

pub fn to_binary(date: &Date) -> f64 {
    (date.timestamp_millis() - BINARY_EPOCH_MILLIS) as f64 / 1000.0
}

pub fn from_binary(seconds: f64) -> Result<Date, Error> {
    ensure!(
        seconds.is_finite(),
        DateSnafu {
            date: seconds.to_string(),
        },
    );
    // `as` saturates; a saturated value fails `checked_add` or the range check.
    let millis = (seconds * 1000.0).round() as i64;
    millis
        .checked_add(BINARY_EPOCH_MILLIS)
        .and_then(DateTime::from_timestamp_millis)
        .context(DateSnafu {
            date: seconds.to_string(),
        })
}

pub(crate) fn to_rfc3339(date: &Date) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
