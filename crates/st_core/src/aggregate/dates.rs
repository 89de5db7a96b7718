use chrono::{DateTime, Locale, NaiveDate, Utc};
use std::str::FromStr;

use crate::{Error, Result};

const LOCALE: Locale = Locale::pt_BR;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// The two date layouts shown to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePattern {
    /// `dd MMM yyyy`, e.g. `25 mar 2021`
    Publication,
    /// `dd MM yyyy`, e.g. `25 03 2021`
    Edited,
}

impl DatePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePattern::Publication => "dd MMM yyyy",
            DatePattern::Edited => "dd MM yyyy",
        }
    }

    fn strftime(&self) -> &'static str {
        match self {
            DatePattern::Publication => "%d %b %Y",
            DatePattern::Edited => "%d %m %Y",
        }
    }
}

impl FromStr for DatePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dd MMM yyyy" => Ok(DatePattern::Publication),
            "dd MM yyyy" => Ok(DatePattern::Edited),
            other => Err(Error::Mapping(format!("unsupported date pattern: {}", other))),
        }
    }
}

/// Formats in pt-BR, always on the UTC calendar day.
pub fn format_date(timestamp: &DateTime<Utc>, pattern: DatePattern) -> String {
    timestamp.format_localized(pattern.strftime(), LOCALE).to_string()
}

/// Reads back a date produced by [`format_date`].
pub fn parse_date(text: &str, pattern: DatePattern) -> Result<NaiveDate> {
    let invalid = || Error::Mapping(format!("{:?} does not match {}", text, pattern.as_str()));

    let parts: Vec<&str> = text.split(' ').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(invalid());
    };

    let day: u32 = day.parse().map_err(|_| invalid())?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = match pattern {
        DatePattern::Publication => MONTH_ABBREVIATIONS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(month.trim_end_matches('.')))
            .map(|i| i as u32 + 1)
            .ok_or_else(invalid)?,
        DatePattern::Edited => month.parse().map_err(|_| invalid())?,
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}
