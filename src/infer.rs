//! Per-column type inference over string samples.
//!
//! The thresholds here are contractual: datetime wins at >= 80% confidence,
//! a mixed numeric column becomes REAL once reals reach 10% and the numeric
//! share reaches 80%, and a single text value among many forces TEXT.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::ColumnType;

/// Columns longer than this are sampled in three equal strata
/// (head/middle/tail) instead of scanned in full.
pub const MAX_SAMPLE: usize = 1000;

const DATETIME_MIN_LEN: usize = 4;
const DATETIME_MAX_LEN: usize = 35;
const DATETIME_SEPARATORS: &[char] = &['-', '/', '.', ':', 'T', ' '];

enum DtFormat {
    Date(&'static str),
    DateTime(&'static str),
    Time(&'static str),
    Rfc3339,
}

struct DtPattern {
    re: Regex,
    formats: &'static [DtFormat],
}

/// The ten canonical datetime shapes, each paired with the chrono format
/// strings that must also parse for the match to count.
static DT_PATTERNS: Lazy<Vec<DtPattern>> = Lazy::new(|| {
    vec![
        DtPattern {
            re: Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap(),
            formats: &[DtFormat::Date("%Y-%m-%d")],
        },
        DtPattern {
            re: Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap(),
            formats: &[DtFormat::DateTime("%Y-%m-%d %H:%M:%S")],
        },
        DtPattern {
            re: Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$").unwrap(),
            formats: &[DtFormat::DateTime("%Y-%m-%dT%H:%M:%S")],
        },
        DtPattern {
            re: Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}\.\d{1,9}$").unwrap(),
            formats: &[
                DtFormat::DateTime("%Y-%m-%dT%H:%M:%S%.f"),
                DtFormat::DateTime("%Y-%m-%d %H:%M:%S%.f"),
            ],
        },
        DtPattern {
            re: Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?(?:Z|[+-]\d{2}:?\d{2})$")
                .unwrap(),
            formats: &[
                DtFormat::Rfc3339,
                DtFormat::DateTime("%Y-%m-%dT%H:%M:%S%.f%z"),
            ],
        },
        DtPattern {
            re: Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").unwrap(),
            formats: &[DtFormat::Date("%m/%d/%Y")],
        },
        DtPattern {
            re: Regex::new(r"^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}:\d{2}$").unwrap(),
            formats: &[DtFormat::DateTime("%m/%d/%Y %H:%M:%S")],
        },
        DtPattern {
            re: Regex::new(r"(?i)^\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}:\d{2} (?:AM|PM)$").unwrap(),
            formats: &[DtFormat::DateTime("%m/%d/%Y %I:%M:%S %p")],
        },
        DtPattern {
            re: Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}(?: \d{1,2}:\d{2}:\d{2})?$").unwrap(),
            formats: &[
                DtFormat::Date("%d.%m.%Y"),
                DtFormat::DateTime("%d.%m.%Y %H:%M:%S"),
            ],
        },
        DtPattern {
            re: Regex::new(r"^\d{1,2}:\d{2}(?::\d{2}(?:\.\d{1,6})?)?$").unwrap(),
            formats: &[
                DtFormat::Time("%H:%M"),
                DtFormat::Time("%H:%M:%S"),
                DtFormat::Time("%H:%M:%S%.f"),
            ],
        },
    ]
});

/// Whether `value` looks like a date, time, or timestamp. Requires a
/// plausible length, at least one digit, at least one separator, a match
/// against one of the canonical shapes, and a successful parse under a
/// format paired with that shape.
pub fn is_datetime(value: &str) -> bool {
    let len = value.chars().count();
    if !(DATETIME_MIN_LEN..=DATETIME_MAX_LEN).contains(&len) {
        return false;
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if !value.chars().any(|c| DATETIME_SEPARATORS.contains(&c)) {
        return false;
    }

    DT_PATTERNS
        .iter()
        .filter(|p| p.re.is_match(value))
        .any(|p| p.formats.iter().any(|f| parses_as(value, f)))
}

fn parses_as(value: &str, format: &DtFormat) -> bool {
    match format {
        DtFormat::Date(f) => NaiveDate::parse_from_str(value, f).is_ok(),
        DtFormat::DateTime(f) => NaiveDateTime::parse_from_str(value, f).is_ok(),
        DtFormat::Time(f) => NaiveTime::parse_from_str(value, f).is_ok(),
        DtFormat::Rfc3339 => DateTime::parse_from_rfc3339(value).is_ok(),
    }
}

fn is_integer(value: &str) -> bool {
    value.parse::<i64>().is_ok()
}

fn is_real(value: &str) -> bool {
    value.parse::<f64>().is_ok()
}

/// Classify a column from its string values. Empty values never count
/// towards any type; a column of only empty values is TEXT.
pub fn infer(values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Text;
    }

    let sample = stratified_sample(values);

    let mut integers = 0usize;
    let mut reals = 0usize;
    let mut datetimes = 0usize;
    let mut texts = 0usize;
    let mut classified = 0usize;

    for value in sample {
        if value.is_empty() {
            continue;
        }
        classified += 1;
        if is_datetime(value) {
            datetimes += 1;
        } else if is_integer(value) {
            integers += 1;
        } else if is_real(value) {
            reals += 1;
        } else {
            texts += 1;
        }
        // A majority of text settles the column without scanning the rest.
        if texts * 2 > classified {
            return ColumnType::Text;
        }
    }

    if classified == 0 || texts > 0 {
        return ColumnType::Text;
    }

    let total = classified as f64;
    let dt_share = datetimes as f64 / total;
    let real_share = reals as f64 / total;
    let int_share = integers as f64 / total;

    if dt_share >= 0.8 {
        ColumnType::Datetime
    } else if real_share >= 0.1 && real_share + int_share >= 0.8 {
        ColumnType::Real
    } else if int_share >= 0.8 {
        ColumnType::Integer
    } else if reals > 0 && reals >= integers && reals >= datetimes {
        ColumnType::Real
    } else if integers > 0 && integers >= datetimes {
        ColumnType::Integer
    } else if datetimes > 0 {
        ColumnType::Datetime
    } else {
        ColumnType::Text
    }
}

/// Up to [`MAX_SAMPLE`] values drawn from three equal sections of the
/// column, so skew at either end cannot dominate the verdict.
fn stratified_sample<'a>(values: &'a [&'a str]) -> Vec<&'a str> {
    if values.len() <= MAX_SAMPLE {
        return values.to_vec();
    }

    let third = MAX_SAMPLE / 3;
    let tail = MAX_SAMPLE - 2 * third;
    let n = values.len();

    let mut sample = Vec::with_capacity(MAX_SAMPLE);
    sample.extend_from_slice(&values[..third]);
    let mid_start = n / 2 - third / 2;
    sample.extend_from_slice(&values[mid_start..mid_start + third]);
    sample.extend_from_slice(&values[n - tail..]);
    sample
}
