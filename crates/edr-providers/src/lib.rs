//! Coverage and EDR data providers.
//!
//! Each provider adapts one backend to coverage (CIS metadata, coverage
//! queries) and EDR (`position`, `cube`) responses:
//!
//! - [`XarrayProvider`]: labeled array datasets (Zarr, NetCDF)
//! - [`XarrayEdrProvider`]: EDR queries over gridded datasets
//! - [`TimeSeriesEdrProvider`]: EDR queries over station time series
//! - [`InfluxProvider`] / [`InfluxEdrProvider`]: InfluxDB measurements
//! - [`WcsEdrProvider`]: a remote WCS 2.0 server
//!
//! Providers are built from YAML definitions with [`build_provider`].
//!
//! # Example
//!
//! ```rust
//! use edr_providers::{ProviderConfig, QueryType};
//!
//! let config: ProviderConfig = serde_yaml::from_str("name: wcs-edr\nbase_url: http://localhost/wcs").unwrap();
//! let provider = edr_providers::build_provider(&config).unwrap();
//! assert_eq!(provider.query_types(), &[QueryType::Cube]);
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod influx;
pub mod provider;
pub mod timeseries;
pub mod wcs;
pub mod xarray;
pub mod xarray_edr;

use std::sync::Arc;

pub use config::{InfluxConfig, ProviderConfig, TimeSeriesConfig, WcsConfig, XarrayConfig};
pub use error::{ProviderError, Result};
pub use influx::{InfluxEdrProvider, InfluxProvider};
pub use provider::{
    run_edr_query, CoverageQuery, EdrQuery, FieldInfo, Fields, ItemsQuery, Provider, QueryOutput,
    QueryType,
};
pub use timeseries::TimeSeriesEdrProvider;
pub use wcs::WcsEdrProvider;
pub use xarray::XarrayProvider;
pub use xarray_edr::XarrayEdrProvider;

/// Build the provider a definition names.
///
/// Dataset providers load their data here; remote providers only set up
/// their HTTP client.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config {
        ProviderConfig::Xarray(c) => Arc::new(XarrayProvider::open(c.clone())?),
        ProviderConfig::XarrayEdr(c) => Arc::new(XarrayEdrProvider::open(c.clone())?),
        ProviderConfig::TimeSeries(c) => Arc::new(TimeSeriesEdrProvider::open(c.clone())?),
        ProviderConfig::Influx(c) => Arc::new(InfluxProvider::new(c.clone())?),
        ProviderConfig::InfluxEdr(c) => Arc::new(InfluxEdrProvider::new(c.clone())?),
        ProviderConfig::Wcs(c) => Arc::new(WcsEdrProvider::new(c.clone())?),
    };
    tracing::debug!(provider = provider.name(), "Built provider");
    Ok(provider)
}
