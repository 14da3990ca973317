//! Common test fixtures for provider and service tests.
//!
//! This module provides on-disk datasets, InfluxDB responses and
//! provider definitions representing the usual deployment scenarios.

use std::path::{Path, PathBuf};

use grid_dataset::testdata;
use tempfile::TempDir;

/// Common bounding box definitions for testing, as `[minx, miny, maxx, maxy]`.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

    /// Extent of `testdata::ocean_grid`
    pub const OCEAN_GRID: [f64; 4] = [-20.0, 0.0, 20.0, 30.0];

    /// Around the Munkholmen station in the Trondheim fjord
    pub const MUNKHOLMEN: [f64; 4] = [10.0, 63.0, 11.0, 64.0];

    /// Open sea far from any fixture location
    pub const SOUTH_ATLANTIC: [f64; 4] = [-30.0, -50.0, -20.0, -40.0];
}

/// A dataset written to a temporary Zarr store, removed on drop.
pub struct ZarrFixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl ZarrFixture {
    fn write(ds: &grid_dataset::Dataset, name: &str) -> Self {
        let dir = crate::temp_test_dir_with_prefix("edr_zarr_");
        let path = testdata::write_fixture(ds, dir.path(), name)
            .expect("Failed to write Zarr fixture");
        Self { _dir: dir, path }
    }

    /// `testdata::ocean_grid` as `ocean.zarr`.
    pub fn ocean_grid() -> Self {
        Self::write(&testdata::ocean_grid(), "ocean.zarr")
    }

    /// `testdata::station_series` as `stations.zarr`.
    pub fn station_series() -> Self {
        Self::write(&testdata::station_series(), "stations.zarr")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The store path as a config string.
    pub fn data(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Pivoted response of the `ctd_temperature_munkholmen` measurement.
pub const INFLUX_CSV: &str = "#datatype,string,long,dateTime:RFC3339,double,string,string\n\
#group,false,false,false,false,false,false\n\
#default,_result,,,,,\n\
,result,table,_time,temperature,approved,sensor\n\
,,0,2023-05-01T02:30:00Z,8.25,yes,ctd-01\n\
,,0,2023-05-01T02:31:00Z,8.5,no,ctd-01\n\
,,0,2023-05-01T02:32:00Z,,maybe,ctd-01\n";

/// Environment variable read for the InfluxDB token in fixtures.
pub const INFLUX_TOKEN_VARIABLE: &str = "EDR_TEST_INFLUX_TOKEN";

/// `influx-edr` provider definition pointing at `url`.
///
/// Two locations observe the same measurement: a point at Munkholmen and
/// a polygon over the outer fjord.
pub fn influx_provider_yaml(url: &str) -> String {
    format!(
        r#"name: influx-edr
data:
  url: {url}
  bucket: oceanlab
  org: sintef
  token_variable: {token}
locations:
  - name: munkholmen
    geometry:
      point: [10.38, 63.45]
    tables:
      ctd_temperature_munkholmen:
        sea_water_temperature: temperature
        approved: approved
  - name: outer_fjord
    geometry:
      polygon: [[9, 63], [10, 63], [10, 64], [9, 64], [9, 63]]
    tables:
      ctd_temperature_munkholmen:
        sea_water_temperature: temperature
parameters:
  sea_water_temperature:
    id: sea_water_temperature
    type: Quantity
    name: sea_water_temperature
    data_type: float
    description: Sea water temperature is the in situ temperature of the sea water
    unit_label: degree_Celsius
    unit_symbol: Cel
    unit_type: http://www.opengis.net/def/uom/UCUM/
    observed_property_id: http://vocab.nerc.ac.uk/standard_name/sea_water_temperature/
    observed_property_label: Sea Water temperature
    properties:
      madeBySensor: http://example.org/sensors/ctd
  approved:
    id: measurement_approved
    type: Category
    name: measurement_approved
    label: providers approved
    data_type: category
    description: yes if passed a data quality filter, no if not
    observed_property_id: http://example.org/observedProperties/approved
    observed_property_label: measurement_approved
    observed_property_description: Whether the measurement passed a quality assessment
    observed_property_categories:
      - id: http://example.org/observedProperties/approved/yes
        label: "yes"
      - id: http://example.org/observedProperties/approved/no
        label: "no"
    categoryEncoding:
      "yes": 1
      "no": 0
"#,
        url = url,
        token = INFLUX_TOKEN_VARIABLE
    )
}

/// `xarray-edr` provider definition over a dataset path.
pub fn xarray_edr_provider_yaml(data: &str) -> String {
    format!("name: xarray-edr\ndata: {}\n", data)
}
