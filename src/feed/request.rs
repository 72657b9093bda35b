// src/feed/request.rs
use url::Url;

use crate::feed::types::FetchRequestOptions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Build the query URL: `format=geojson&limit=..&minmag=..&orderby=..` appended to the endpoint.
/// Pure; percent-encoding is handled by `url`.
pub fn build(base_endpoint: &str, options: &FetchRequestOptions) -> Result<Url, RequestError> {
    let mut url = Url::parse(base_endpoint.trim()).map_err(|e| RequestError::InvalidEndpoint {
        endpoint: base_endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(RequestError::InvalidEndpoint {
            endpoint: base_endpoint.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }

    url.query_pairs_mut()
        .append_pair("format", "geojson")
        .append_pair("limit", &options.limit.to_string())
        .append_pair("minmag", &options.min_magnitude)
        .append_pair("orderby", options.order_by.as_str());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::OrderBy;

    #[test]
    fn appends_four_params_in_order() {
        let url = build(
            "https://earthquake.usgs.gov/fdsnws/event/1/query",
            &FetchRequestOptions::default(),
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://earthquake.usgs.gov/fdsnws/event/1/query?format=geojson&limit=10&minmag=6&orderby=time"
        );
    }

    #[test]
    fn rejects_relative_and_opaque_endpoints() {
        let opts = FetchRequestOptions::new("5", OrderBy::Magnitude, 3);
        assert!(matches!(
            build("/fdsnws/event/1/query", &opts),
            Err(RequestError::InvalidEndpoint { .. })
        ));
        assert!(build("mailto:someone@example.com", &opts).is_err());
    }
}
