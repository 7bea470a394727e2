//! Date and time values

use crate::error::{CoreResult, Error};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// The kind of a temporal value; part of its type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemporalKind {
    /// Calendar date (year, month, day)
    Date,
    /// Time of day
    Time,
    /// Date and time of day
    DateTime,
}

impl TemporalKind {
    /// Keyword used for literals and type syntax
    pub fn keyword(self) -> &'static str {
        match self {
            TemporalKind::Date => "date",
            TemporalKind::Time => "time",
            TemporalKind::DateTime => "datetime",
        }
    }

    /// Parse the keyword back
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "date" => Some(TemporalKind::Date),
            "time" => Some(TemporalKind::Time),
            "datetime" => Some(TemporalKind::DateTime),
            _ => None,
        }
    }
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemporalKind::Date => "Date",
            TemporalKind::Time => "Time",
            TemporalKind::DateTime => "DateTime",
        };
        write!(f, "{}", name)
    }
}

/// A date, time or date-time value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemporalValue {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl TemporalValue {
    /// The kind of this value
    pub fn kind(&self) -> TemporalKind {
        match self {
            TemporalValue::Date(_) => TemporalKind::Date,
            TemporalValue::Time(_) => TemporalKind::Time,
            TemporalValue::DateTime(_) => TemporalKind::DateTime,
        }
    }

    /// Parse the body of a `date{...}`, `time{...}` or `datetime{...}` literal
    pub fn parse(kind: TemporalKind, text: &str) -> CoreResult<Self> {
        let text = text.trim();
        let invalid = || Error::InvalidTemporal {
            kind: kind.keyword(),
            text: text.to_string(),
        };
        match kind {
            TemporalKind::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(TemporalValue::Date)
                .map_err(|_| invalid()),
            TemporalKind::Time => NaiveTime::parse_from_str(text, TIME_FORMAT)
                .map(TemporalValue::Time)
                .map_err(|_| invalid()),
            TemporalKind::DateTime => NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
                .map(TemporalValue::DateTime)
                .map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for TemporalValue {
    /// Renders the literal body, which [`TemporalValue::parse`] accepts back.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            TemporalValue::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            TemporalValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let d = TemporalValue::parse(TemporalKind::Date, "2024-02-29").unwrap();
        assert_eq!(d.to_string(), "2024-02-29");

        let t = TemporalValue::parse(TemporalKind::Time, "08:30:00").unwrap();
        assert_eq!(t.to_string(), "08:30:00");

        let dt = TemporalValue::parse(TemporalKind::DateTime, "2024-01-05 12:00:01.5").unwrap();
        assert_eq!(dt.to_string(), "2024-01-05 12:00:01.500");
        assert_eq!(TemporalValue::parse(TemporalKind::DateTime, &dt.to_string()).unwrap(), dt);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TemporalValue::parse(TemporalKind::Date, "2023-02-29").is_err());
        assert!(TemporalValue::parse(TemporalKind::Time, "noon").is_err());
    }
}
