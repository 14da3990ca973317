//! HTTP request handlers for the EDR API.

pub mod collections;
pub mod conformance;
pub mod coverage;
pub mod edr;
pub mod health;
pub mod items;
pub mod landing;

use std::time::Instant;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use edr_protocol::{media_types, EdrError, FeatureCollection};
use edr_providers::QueryOutput;
use serde::Serialize;

use crate::content_negotiation::OutputFormat;
use crate::error::ApiError;

/// Serialize `value` as a JSON response of `content_type`.
pub(crate) fn json_response<T: Serialize>(value: &T, content_type: &'static str) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(value)
        .map_err(|e| EdrError::Internal(format!("Failed to serialize response: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

/// JSON metadata response, cacheable for five minutes.
pub(crate) fn metadata_response<T: Serialize>(value: &T) -> Result<Response, ApiError> {
    let mut response = json_response(value, media_types::JSON)?;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, header::HeaderValue::from_static("max-age=300"));
    Ok(response)
}

/// Render a provider result in the negotiated format.
pub(crate) fn render_output(output: QueryOutput, format: OutputFormat) -> Result<Response, ApiError> {
    match output {
        QueryOutput::Coverage(doc) if format == OutputFormat::GeoJson => {
            json_response(&FeatureCollection::from(&doc), media_types::GEO_JSON)
        }
        QueryOutput::Coverage(doc) => json_response(&doc, media_types::COVERAGE_JSON),
        QueryOutput::Features(features) => json_response(&features, media_types::GEO_JSON),
        QueryOutput::Native {
            bytes,
            media_type,
            filename,
        } => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, media_type),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            Bytes::from(bytes),
        )
            .into_response()),
    }
}

/// Count a data request and record its latency.
pub(crate) fn record_query<T, E>(collection: &str, operation: &'static str, started: Instant, result: &Result<T, E>) {
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(
        "edr_queries_total",
        "collection" => collection.to_string(),
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!("edr_query_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

/// Split a comma-separated number list.
pub(crate) fn parse_numbers(name: &str, value: &str) -> Result<Vec<f64>, ApiError> {
    value
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| ApiError::invalid_parameter(format!("Invalid {} value '{}'", name, v.trim())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_protocol::{CoverageCollection, CoverageDocument, DomainType};

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_numbers("bbox", "-10, 0,10,20").unwrap(), vec![-10.0, 0.0, 10.0, 20.0]);
        assert!(parse_numbers("bbox", "-10,x,10,20").is_err());
    }

    #[test]
    fn test_native_output_is_attachment() {
        let response = render_output(QueryOutput::netcdf(vec![0x43, 0x44, 0x46]), OutputFormat::NetCdf).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], media_types::NETCDF);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"data.nc\""
        );
    }

    #[test]
    fn test_features_are_geojson() {
        let response = render_output(QueryOutput::Features(FeatureCollection::new()), OutputFormat::CoverageJson).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], media_types::GEO_JSON);
    }

    #[test]
    fn test_coverage_converted_on_request() {
        let doc: CoverageDocument = CoverageCollection::new(DomainType::PointSeries).into();
        let output = QueryOutput::Coverage(doc);
        let response = render_output(output.clone(), OutputFormat::GeoJson).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], media_types::GEO_JSON);
        let response = render_output(output, OutputFormat::CoverageJson).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], media_types::COVERAGE_JSON);
    }
}
