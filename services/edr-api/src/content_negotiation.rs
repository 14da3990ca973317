//! Content negotiation for the `f` parameter and the Accept header.
//!
//! Data queries default to CoverageJSON. An explicit `f` wins over the
//! Accept header; an empty `f=` falls through to the header.

use axum::http::{header, HeaderMap};
use edr_protocol::media_types;

use crate::error::ApiError;

/// Supported media types for data queries (position, cube, coverage).
pub const DATA_QUERY_MEDIA_TYPES: &[&str] = &[
    media_types::COVERAGE_JSON,
    "application/prs.coverage+json",
    media_types::GEO_JSON,
    media_types::JSON,
    media_types::ZIP,
    media_types::NETCDF,
    media_types::OCTET_STREAM,
];

/// Supported media types for metadata (landing, collections, items).
pub const METADATA_MEDIA_TYPES: &[&str] = &[media_types::JSON, media_types::GEO_JSON];

/// Output format of a data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    CoverageJson,
    /// CoverageJSON converted to features.
    GeoJson,
    /// Zipped Zarr store.
    Zarr,
    NetCdf,
    /// The source file as stored.
    Native,
}

impl OutputFormat {
    /// Parse format from the `f` query parameter value.
    pub fn from_query_param(f: &str) -> Option<Self> {
        match f.to_lowercase().as_str() {
            "covjson" | "coveragejson" | "json" | "application/vnd.cov+json" | "application/json" => {
                Some(OutputFormat::CoverageJson)
            }
            "geojson" | "geo+json" | "application/geo+json" => Some(OutputFormat::GeoJson),
            "zarr" | "application/zip" => Some(OutputFormat::Zarr),
            "netcdf" | "nc" | "application/x-netcdf" => Some(OutputFormat::NetCdf),
            "native" => Some(OutputFormat::Native),
            _ => None,
        }
    }

    /// Parse format from an Accept header media type.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "application/vnd.cov+json" | "application/prs.coverage+json" | "application/json" => {
                Some(OutputFormat::CoverageJson)
            }
            "application/geo+json" => Some(OutputFormat::GeoJson),
            "application/zip" => Some(OutputFormat::Zarr),
            "application/x-netcdf" => Some(OutputFormat::NetCdf),
            "application/octet-stream" => Some(OutputFormat::Native),
            _ => None,
        }
    }

    /// Format name passed to providers; GeoJSON is converted after the query.
    pub fn provider_format(&self) -> &'static str {
        match self {
            OutputFormat::CoverageJson | OutputFormat::GeoJson => "json",
            OutputFormat::Zarr => "zarr",
            OutputFormat::NetCdf => "netcdf",
            OutputFormat::Native => "native",
        }
    }
}

/// Negotiate the output format of a data query.
pub fn negotiate_format(headers: &HeaderMap, f_param: Option<&str>) -> Result<OutputFormat, ApiError> {
    if let Some(f) = f_param.filter(|f| !f.is_empty()) {
        return OutputFormat::from_query_param(f).ok_or_else(|| {
            ApiError::invalid_parameter(format!(
                "Invalid output format '{}'. Supported formats: CoverageJSON, GeoJSON, zarr, netcdf, native",
                f
            ))
        });
    }

    let mut accepted = accepted_types(headers);
    // Highest quality first; stable for equal weights.
    accepted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (media_type, _) in &accepted {
        if *media_type == "*/*" || *media_type == "application/*" {
            return Ok(OutputFormat::CoverageJson);
        }
        if let Some(format) = OutputFormat::from_media_type(media_type) {
            return Ok(format);
        }
    }
    if accepted.is_empty() {
        return Ok(OutputFormat::CoverageJson);
    }

    let requested: Vec<&str> = accepted.iter().map(|(t, _)| *t).collect();
    Err(not_acceptable(&requested, DATA_QUERY_MEDIA_TYPES))
}

/// Check that the Accept header allows one of `supported_types`.
pub fn check_accept_header(headers: &HeaderMap, supported_types: &[&str]) -> Result<(), ApiError> {
    let accepted = accepted_types(headers);
    if accepted.is_empty() {
        return Ok(());
    }

    for (media_type, _) in &accepted {
        if *media_type == "*/*" {
            return Ok(());
        }
        if let Some(prefix) = media_type.strip_suffix('*') {
            if supported_types.iter().any(|s| s.starts_with(prefix)) {
                return Ok(());
            }
            continue;
        }
        if supported_types.contains(media_type) {
            return Ok(());
        }
    }

    let requested: Vec<&str> = accepted.iter().map(|(t, _)| *t).collect();
    Err(not_acceptable(&requested, supported_types))
}

/// Check the Accept header of a metadata request.
pub fn check_metadata_accept(headers: &HeaderMap) -> Result<(), ApiError> {
    check_accept_header(headers, METADATA_MEDIA_TYPES)
}

/// Media types of the Accept header with their quality (default 1.0).
fn accepted_types(headers: &HeaderMap) -> Vec<(&str, f32)> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("*/*");

    accept
        .split(',')
        .filter_map(|s| {
            let mut parts = s.split(';');
            let media_type = parts.next()?.trim();
            if media_type.is_empty() {
                return None;
            }
            let quality = parts
                .find_map(|p| p.trim().strip_prefix("q=").and_then(|q| q.parse::<f32>().ok()))
                .unwrap_or(1.0);
            Some((media_type, quality))
        })
        .collect()
}

fn not_acceptable(requested: &[&str], supported: &[&str]) -> ApiError {
    ApiError::NotAcceptable(format!(
        "Content negotiation failed. Requested format(s) '{}' not supported. Supported formats: {}",
        requested.join(", "),
        supported.join(", ")
    ))
}
