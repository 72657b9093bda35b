// src/feed/types.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One decoded event from the feed. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeismicEvent {
    location: String,
    magnitude: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    detail_url: String,
}

impl SeismicEvent {
    pub fn new(
        location: impl Into<String>,
        magnitude: f64,
        timestamp: DateTime<Utc>,
        detail_url: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            magnitude,
            timestamp,
            detail_url: detail_url.into(),
        }
    }

    /// Raw place text, e.g. "100km WSW of Valparaiso, Chile".
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Milliseconds since the Unix epoch, as given by the feed.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// May be empty; never validated.
    pub fn detail_url(&self) -> &str {
        &self.detail_url
    }
}

/// Sort order understood by the FDSN event service (`orderby=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderBy {
    #[default]
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "time-asc")]
    TimeAsc,
    #[serde(rename = "magnitude")]
    Magnitude,
    #[serde(rename = "magnitude-asc")]
    MagnitudeAsc,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Time => "time",
            OrderBy::TimeAsc => "time-asc",
            OrderBy::Magnitude => "magnitude",
            OrderBy::MagnitudeAsc => "magnitude-asc",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown orderby value: {0:?}")]
pub struct UnknownOrderBy(pub String);

impl FromStr for OrderBy {
    type Err = UnknownOrderBy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(OrderBy::Time),
            "time-asc" => Ok(OrderBy::TimeAsc),
            "magnitude" => Ok(OrderBy::Magnitude),
            "magnitude-asc" => Ok(OrderBy::MagnitudeAsc),
            _ => Err(UnknownOrderBy(s.to_string())),
        }
    }
}

pub const DEFAULT_MIN_MAGNITUDE: &str = "6";
pub const DEFAULT_LIMIT: u32 = 10;

/// Per-fetch query options. `min_magnitude` stays string-encoded and is passed through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequestOptions {
    pub min_magnitude: String,
    pub order_by: OrderBy,
    pub limit: u32,
}

impl FetchRequestOptions {
    pub fn new(min_magnitude: impl Into<String>, order_by: OrderBy, limit: u32) -> Self {
        Self {
            min_magnitude: min_magnitude.into(),
            order_by,
            limit,
        }
    }
}

impl Default for FetchRequestOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MAGNITUDE, OrderBy::Time, DEFAULT_LIMIT)
    }
}
