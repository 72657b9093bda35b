// src/feed/decoder.rs
//! GeoJSON feed -> `SeismicEvent` list.
//!
//! Only the envelope can fail: the document must be an object with a `features`
//! array. Everything below that is best-effort. A field that is missing or has
//! the wrong shape falls back to its default (`0.0`, `""`, epoch `0`) and the
//! record is still emitted. A feature without a `properties` object carries no
//! record at all and is skipped.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde_json::{Map, Value};

use crate::feed::types::SeismicEvent;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed feed: {0}")]
    MalformedFeed(String),
}

/// Decode the raw response text. Source array order is preserved.
pub fn decode(raw: &str) -> Result<Vec<SeismicEvent>, DecodeError> {
    let t0 = std::time::Instant::now();

    let root: Value = serde_json::from_str(raw)
        .map_err(|e| DecodeError::MalformedFeed(format!("invalid json: {e}")))?;
    let root = root
        .as_object()
        .ok_or_else(|| DecodeError::MalformedFeed("top level is not an object".into()))?;
    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::MalformedFeed("missing `features` array".into()))?;

    let mut out = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        match feature.get("properties").and_then(Value::as_object) {
            Some(props) => out.push(decode_properties(props)),
            None => {
                tracing::debug!(target: "feed", idx, "feature without properties, skipped");
                counter!("feed_features_skipped_total").increment(1);
            }
        }
    }

    histogram!("feed_decode_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("feed_events_decoded_total").increment(out.len() as u64);
    Ok(out)
}

fn decode_properties(props: &Map<String, Value>) -> SeismicEvent {
    let magnitude = field(props, "mag", number).unwrap_or(0.0);
    let location = field(props, "place", text).unwrap_or_default();
    let millis = field(props, "time", epoch_millis).unwrap_or(0);
    let detail_url = field(props, "url", text).unwrap_or_default();

    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(|| {
        tracing::debug!(target: "feed", millis, "time out of range, using epoch");
        DateTime::<Utc>::UNIX_EPOCH
    });

    SeismicEvent::new(location, magnitude, timestamp, detail_url)
}

/// Look up and convert one field, counting every fallback to a default.
fn field<T>(props: &Map<String, Value>, key: &'static str, conv: fn(&Value) -> Option<T>) -> Option<T> {
    let got = props.get(key).and_then(conv);
    if got.is_none() {
        counter!("feed_field_defaults_total", "field" => key).increment(1);
    }
    got
}

// Numeric strings count as numbers.
fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn epoch_millis(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// Scalars are stringified; null, arrays and objects are not text.
fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(json: &str) -> SeismicEvent {
        let v: Value = serde_json::from_str(json).unwrap();
        decode_properties(v.as_object().unwrap())
    }

    #[test]
    fn numeric_strings_and_floats_are_coerced() {
        let ev = props(r#"{"mag":"4.5","time":1.5e12,"place":12,"url":null}"#);
        assert_eq!(ev.magnitude(), 4.5);
        assert_eq!(ev.timestamp_millis(), 1_500_000_000_000);
        assert_eq!(ev.location(), "12");
        assert_eq!(ev.detail_url(), "");
    }

    #[test]
    fn wrong_shapes_fall_back_to_defaults() {
        let ev = props(r#"{"mag":[1],"time":"soon","place":{"a":1},"url":false}"#);
        assert_eq!(ev.magnitude(), 0.0);
        assert_eq!(ev.timestamp_millis(), 0);
        assert_eq!(ev.location(), "");
        assert_eq!(ev.detail_url(), "false");
    }

    #[test]
    fn feature_without_properties_is_skipped() {
        let out = decode(r#"{"features":[{"id":"a"},{"properties":{"mag":1.0}},{"properties":3}]}"#)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].magnitude(), 1.0);
    }

    #[test]
    fn features_not_array_is_malformed() {
        assert!(matches!(
            decode(r#"{"features":{}}"#),
            Err(DecodeError::MalformedFeed(_))
        ));
        assert!(decode(r#"{"type":"FeatureCollection"}"#).is_err());
    }
}
