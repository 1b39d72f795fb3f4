//! CRM date-time handling
//!
//! Webhook payloads carry epoch seconds. CiviCRM's API expects local
//! date-times in the compact `YYYYMMDDHHMMSS` form, interpreted in the
//! timezone the CRM site is configured for.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Format string of CiviCRM's compact date-time representation
pub const CRM_DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Timezone wrapper for the CRM site
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Converts a UTC datetime to the local timezone
    pub fn to_local(&self, utc: DateTime<Utc>) -> DateTime<Tz> {
        utc.with_timezone(&self.0)
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Europe::Berlin)
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Timestamp out of range: {0}")]
    OutOfRange(i64),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Invalid CRM date-time: {0}")]
    InvalidFormat(String),
}

/// A local date-time as CiviCRM expects it in API calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrmDateTime(NaiveDateTime);

impl CrmDateTime {
    /// Converts epoch seconds into the CRM site's local time
    pub fn from_epoch(seconds: i64, timezone: Timezone) -> Result<Self, TemporalError> {
        let utc = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or(TemporalError::OutOfRange(seconds))?;
        Ok(Self(timezone.to_local(utc).naive_local()))
    }

    /// Parses the compact `YYYYMMDDHHMMSS` representation
    pub fn parse(value: &str) -> Result<Self, TemporalError> {
        NaiveDateTime::parse_from_str(value.trim(), CRM_DATE_TIME_FORMAT)
            .map(Self)
            .map_err(|_| TemporalError::InvalidFormat(value.to_string()))
    }

    /// Returns the local date-time
    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for CrmDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CRM_DATE_TIME_FORMAT))
    }
}

impl Serialize for CrmDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CrmDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // CiviCRM reads back dates as "YYYY-MM-DD HH:MM:SS"
        let compact: String = s.chars().filter(char::is_ascii_digit).collect();
        Self::parse(&compact).map_err(serde::de::Error::custom)
    }
}
