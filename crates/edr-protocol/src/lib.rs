//! OGC API - Environmental Data Retrieval (EDR) and Coverages protocol types.
//!
//! This crate provides the document types and query parsing shared by the
//! coverage providers and the HTTP service.
//!
//! # Conformance Classes
//!
//! - Core
//! - Collections
//! - Position Query
//! - Cube Query
//! - CoverageJSON
//! - GeoJSON
//!
//! # Example
//!
//! ```rust
//! use edr_protocol::{BboxQuery, QueryGeometry};
//!
//! let point = QueryGeometry::parse("POINT(-3.5 51.2)").unwrap();
//! assert_eq!(point.geom_type(), "Point");
//!
//! let bbox = BboxQuery::parse("-10,40,5,60").unwrap();
//! assert_eq!(bbox.as_array(), [-10.0, 40.0, 5.0, 60.0]);
//! ```

pub mod types;
pub mod collections;
pub mod parameters;
pub mod coverage_json;
pub mod queries;
pub mod cis;
pub mod geojson;
pub mod responses;
pub mod errors;

// Re-export commonly used types
pub use types::{Link, Extent, SpatialExtent, TemporalExtent};
pub use collections::{Collection, CollectionList, DataQueries};
pub use parameters::{Category, I18nString, ObservedProperty, Parameter, Unit, UnitSymbol};
pub use coverage_json::{
    Axis, AxisValue, CovJsonParameter, CoverageCollection, CoverageDocument, CoverageJson,
    Domain, DomainType, NdArray, ReferenceSystem, ReferenceSystemConnection,
};
pub use queries::{
    parse_instant, parse_parameter_names, BboxQuery, CoordinateParseError, DateTimeQuery,
    QueryGeometry, SubsetQuery,
};
pub use cis::{DomainSet, RangeField, RangeType};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use responses::{ConformanceClasses, ExceptionResponse, LandingPage};
pub use errors::EdrError;

/// EDR API conformance class URIs
pub mod conformance {
    /// Core conformance class
    pub const CORE: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/core";
    /// Collections conformance class
    pub const COLLECTIONS: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/collections";
    /// Position query conformance class
    pub const POSITION: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/position";
    /// Cube query conformance class
    pub const CUBE: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/cube";
    /// CoverageJSON conformance class
    pub const COVJSON: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/covjson";
    /// GeoJSON conformance class
    pub const GEOJSON: &str = "http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/geojson";
    /// OGC API - Coverages core
    pub const COVERAGES_CORE: &str = "http://www.opengis.net/spec/ogcapi-coverages-1/1.0/conf/core";
    /// OGC API - Features core, for observation items
    pub const FEATURES_CORE: &str = "http://www.opengis.net/spec/ogcapi-features-1/1.0/conf/core";

    /// Every class the server declares.
    pub const DECLARED: &[&str] = &[
        CORE,
        COLLECTIONS,
        POSITION,
        CUBE,
        COVJSON,
        GEOJSON,
        COVERAGES_CORE,
        FEATURES_CORE,
    ];
}

/// Media types used in EDR responses
pub mod media_types {
    /// CoverageJSON media type
    pub const COVERAGE_JSON: &str = "application/vnd.cov+json";
    /// GeoJSON media type
    pub const GEO_JSON: &str = "application/geo+json";
    /// JSON media type
    pub const JSON: &str = "application/json";
    /// Zipped Zarr store
    pub const ZIP: &str = "application/zip";
    /// NetCDF file
    pub const NETCDF: &str = "application/x-netcdf";
    /// Raw bytes of a source file
    pub const OCTET_STREAM: &str = "application/octet-stream";
}
