// src/display.rs
//! Small pure helpers for whoever renders events: location split, magnitude
//! formatting and colour bucket, UTC date/time strings.

use chrono::{DateTime, Utc};
use serde::Serialize;

const LOCATION_SEPARATOR: &str = " of ";

/// Split `"100km WSW of Valparaiso, Chile"` into `("100km WSW of", "Valparaiso, Chile")`.
/// Without `" of "` the whole string is the place and the offset is empty.
pub fn split_location(location: &str) -> (&str, &str) {
    match location.find(LOCATION_SEPARATOR) {
        // keep " of" on the offset side, drop the trailing space
        Some(idx) => {
            let cut = idx + LOCATION_SEPARATOR.len() - 1;
            (&location[..cut], &location[cut + 1..])
        }
        None => ("", location),
    }
}

/// One decimal digit: `6.6`, `7.0`.
pub fn format_magnitude(magnitude: f64) -> String {
    format!("{magnitude:.1}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeBucket {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
    M8,
    M9,
    M10Plus,
}

impl MagnitudeBucket {
    /// Floor of the magnitude; 0 and anything below share the first bucket.
    /// Negative values share M1 rather than the top bucket.
    pub fn for_magnitude(magnitude: f64) -> Self {
        let floor = if magnitude.is_finite() { magnitude.floor() } else { 0.0 };
        match floor as i64 {
            i64::MIN..=1 => MagnitudeBucket::M1,
            2 => MagnitudeBucket::M2,
            3 => MagnitudeBucket::M3,
            4 => MagnitudeBucket::M4,
            5 => MagnitudeBucket::M5,
            6 => MagnitudeBucket::M6,
            7 => MagnitudeBucket::M7,
            8 => MagnitudeBucket::M8,
            9 => MagnitudeBucket::M9,
            _ => MagnitudeBucket::M10Plus,
        }
    }

    pub fn hex_color(&self) -> &'static str {
        match self {
            MagnitudeBucket::M1 => "#4A7BA7",
            MagnitudeBucket::M2 => "#04B4B3",
            MagnitudeBucket::M3 => "#10CAC9",
            MagnitudeBucket::M4 => "#F5A623",
            MagnitudeBucket::M5 => "#FF7D50",
            MagnitudeBucket::M6 => "#FC6644",
            MagnitudeBucket::M7 => "#E75F40",
            MagnitudeBucket::M8 => "#E13A20",
            MagnitudeBucket::M9 => "#D93218",
            MagnitudeBucket::M10Plus => "#C03823",
        }
    }
}

/// `Mar 04, 2016`
pub fn format_date(ts: DateTime<Utc>) -> String {
    ts.format("%b %d, %Y").to_string()
}

/// `4:35 PM`
pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%-I:%M %p").to_string()
}
