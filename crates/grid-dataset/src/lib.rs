//! Labeled N-dimensional datasets for coverage providers.
//!
//! This crate provides:
//! - An in-memory [`Dataset`] model (dimensions, coordinates, data variables)
//! - Label-based selection ([`Selector`], [`Dataset::sel`])
//! - Zarr V3 reading/writing via `zarrs`, NetCDF via the `netcdf` feature
//! - CF time decoding and time summary helpers
//!
//! # Example
//!
//! ```rust
//! use grid_dataset::{testdata, Selector};
//!
//! let ds = testdata::ocean_grid();
//! let west = ds.sel(&[("lon", Selector::slice(-20.0, 0.0))]).unwrap();
//! assert_eq!(west.sizes("lon"), Some(3));
//! ```

pub mod dataset;
pub mod error;
#[cfg(feature = "netcdf")]
pub mod nc;
pub mod select;
pub mod source;
pub mod testdata;
pub mod time;
pub mod zarr;

pub use dataset::{number, Attrs, CoordValues, Coordinate, DataKind, DataVariable, Dataset};
pub use error::{GridError, Result};
pub use select::Selector;
pub use source::{native_bytes, netcdf_bytes, netcdf_from_bytes, open_dataset, zarr_zip_bytes, zip_directory};
pub use time::{time_coverage_duration, time_resolution, to_datetime_string};
pub use zarr::{read_zarr, write_zarr};
