//! Offline conversion of a dataset into a CoverageJSON document.

use std::str::FromStr;

use edr_protocol::coverage_json::CRS84;
use edr_protocol::{
    Axis, CovJsonParameter, CoverageCollection, CoverageDocument, CoverageJson, Domain,
    DomainType, I18nString, NdArray, ObservedProperty, ReferenceSystemConnection, Unit,
};
use grid_dataset::{Dataset, Selector};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::timeseries::{described, STATION_DIM};

/// Default x of a single time series without a station position.
pub const DEFAULT_X_VAL: f64 = 10.12;
/// Default y of a single time series without a station position.
pub const DEFAULT_Y_VAL: f64 = 30.22;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of the source dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// `time` (and optionally `timeSeries`) dimensions.
    TimeSeries,
    /// `time`, `y`, `x` grid.
    Grid,
}

impl FromStr for Profile {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "timeSeries" => Ok(Profile::TimeSeries),
            "grid" => Ok(Profile::Grid),
            other => Err(ProviderError::Query(format!(
                "unknown profile {}, expected timeSeries or grid",
                other
            ))),
        }
    }
}

/// Names of the x, y and time variables of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAxes {
    pub x: String,
    pub y: String,
    pub t: String,
}

/// Convert a dataset to CoverageJSON.
///
/// Time series become one `PointSeries` coverage, or a collection of them
/// when there is more than one station; `x_val`/`y_val` position a single
/// series. Grids become one `Grid` coverage with value axes.
pub fn netcdf_to_coveragejson(
    data: &Dataset,
    axes: &SourceAxes,
    profile: Profile,
    x_val: f64,
    y_val: f64,
) -> Result<CoverageDocument> {
    debug!(profile = ?profile, axes = ?axes, "Converting dataset");
    match profile {
        Profile::TimeSeries => time_series_profile(data, axes, x_val, y_val),
        Profile::Grid => grid_profile(data, axes).map(CoverageDocument::from),
    }
}

fn time_series_profile(data: &Dataset, axes: &SourceAxes, x_val: f64, y_val: f64) -> Result<CoverageDocument> {
    let data = data.clone().to_float64();
    let stations = data.sizes(STATION_DIM).unwrap_or(1);

    if stations <= 1 {
        return Ok(one_time_series(&data, axes, x_val, y_val)?.into());
    }

    let mut collection = CoverageCollection::new(DomainType::PointSeries);
    for i in 0..stations {
        let station = data.sel(&[(STATION_DIM, Selector::Index(i))])?;
        let x = scalar(&station, &axes.x).unwrap_or(x_val);
        let y = scalar(&station, &axes.y).unwrap_or(y_val);
        collection.push(one_time_series(&station, axes, x, y)?);
    }
    Ok(collection.into())
}

fn one_time_series(data: &Dataset, axes: &SourceAxes, x: f64, y: f64) -> Result<CoverageJson> {
    let times: Vec<String> = data
        .coord(&axes.t)
        .and_then(|c| c.values.as_time())
        .ok_or_else(ProviderError::no_data)?
        .iter()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .collect();
    if times.is_empty() {
        return Err(ProviderError::no_data());
    }
    let steps = times.len();

    let mut coverage = CoverageJson::new(
        Domain::new(DomainType::PointSeries)
            .with_axis("x", Axis::values_f64(vec![x]))
            .with_axis("y", Axis::values_f64(vec![y]))
            .with_axis("t", Axis::values_str(times))
            .with_referencing(ReferenceSystemConnection::geographic(CRS84))
            .with_referencing(ReferenceSystemConnection::temporal()),
    );

    let order = [axes.t.as_str(), STATION_DIM];
    let series = data
        .data_vars
        .iter()
        .filter(|v| v.dims.iter().any(|d| *d == axes.t))
        .filter(|v| v.dims.iter().all(|d| order.contains(&d.as_str())));
    for var in series {
        let values = data.transpose_values(&var.name, &order)?;
        coverage = coverage
            .with_parameter(&var.name, parameter(var))
            .with_range(
                &var.name,
                NdArray::from_nan_values(&values, vec![steps], vec!["t".to_string()]),
            );
    }
    Ok(coverage)
}

fn grid_profile(data: &Dataset, axes: &SourceAxes) -> Result<CoverageJson> {
    let coord_values = |name: &str| -> Result<Vec<f64>> {
        data.coord(name)
            .and_then(|c| c.values.as_numeric())
            .map(<[f64]>::to_vec)
            .ok_or_else(|| ProviderError::InvalidData(format!("{} is not a numeric coordinate", name)))
    };
    let xs = coord_values(&axes.x)?;
    let ys = coord_values(&axes.y)?;
    let times: Vec<String> = data
        .coord(&axes.t)
        .and_then(|c| c.values.as_time())
        .map(|t| t.iter().map(grid_dataset::to_datetime_string).collect())
        .unwrap_or_default();
    let full_shape = [times.len().max(1), ys.len(), xs.len()];

    let mut coverage = CoverageJson::new(
        Domain::new(DomainType::Grid)
            .with_axis("x", Axis::values_f64(xs))
            .with_axis("y", Axis::values_f64(ys))
            .with_axis("t", Axis::values_str(times))
            .with_referencing(ReferenceSystemConnection::geographic(CRS84))
            .with_referencing(ReferenceSystemConnection::temporal()),
    );

    let order = [axes.t.as_str(), axes.y.as_str(), axes.x.as_str()];
    let data = data.clone().to_float64();
    for var in data.data_vars.iter().filter(|v| v.dims.iter().all(|d| order.contains(&d.as_str()))) {
        if var.dims.is_empty() {
            continue;
        }
        let shape = order
            .iter()
            .zip(full_shape)
            .map(|(d, n)| if var.dims.iter().any(|v| v.as_str() == *d) { n } else { 1 })
            .collect();
        let values = data.transpose_values(&var.name, &order)?;
        let range = NdArray::from_nan_values(
            &values,
            shape,
            vec!["t".to_string(), "y".to_string(), "x".to_string()],
        )
        .with_data_type(var.dtype.covjson_type());
        coverage = coverage.with_parameter(&var.name, parameter(var)).with_range(&var.name, range);
    }
    Ok(coverage)
}

fn parameter(var: &grid_dataset::DataVariable) -> CovJsonParameter {
    let (title, unit) = described(
        &var.name,
        var.attr_str("long_name").map(str::to_string),
        var.attr_str("units").map(str::to_string),
    );
    let title = title.unwrap_or_else(|| var.name.clone());
    let mut param = CovJsonParameter::new(ObservedProperty::new(&title).with_id(var.name.as_str()))
        .with_description(I18nString::english(&title));
    if let Some(unit) = unit {
        param = param.with_unit(Unit::from_symbol(unit));
    }
    param
}

fn scalar(data: &Dataset, name: &str) -> Option<f64> {
    data.coord(name)
        .and_then(|c| c.values.as_numeric())
        .and_then(|v| v.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_protocol::AxisValue;
    use grid_dataset::testdata;

    fn station_axes() -> SourceAxes {
        SourceAxes {
            x: "lon".into(),
            y: "lat".into(),
            t: "time".into(),
        }
    }

    #[test]
    fn test_profile_names() {
        assert_eq!("timeSeries".parse::<Profile>().unwrap(), Profile::TimeSeries);
        assert_eq!("grid".parse::<Profile>().unwrap(), Profile::Grid);
        assert!("trajectory".parse::<Profile>().is_err());
    }

    #[test]
    fn test_stations_become_collection() {
        let doc = netcdf_to_coveragejson(
            &testdata::station_series(),
            &station_axes(),
            Profile::TimeSeries,
            DEFAULT_X_VAL,
            DEFAULT_Y_VAL,
        )
        .unwrap();
        let collection = match doc {
            CoverageDocument::Collection(c) => c,
            CoverageDocument::Coverage(_) => panic!("expected a collection"),
        };
        assert_eq!(collection.len(), 2);

        let second = &collection.coverages[1];
        assert_eq!(second.domain.axis("x"), Some(&Axis::values_f64(vec![5.25])));
        assert_eq!(
            second.domain.axis("t").map(Axis::expand).unwrap()[0],
            AxisValue::String("2021-03-01 00:00:00".into())
        );
        let range = &second.ranges.as_ref().unwrap()["Temperature"];
        assert_eq!(range.values, vec![Some(20.0), Some(21.0), None, Some(23.0)]);

        let param = &second.parameters.as_ref().unwrap()["Temperature"];
        assert_eq!(param.description, Some(I18nString::english("Sea Water temperature")));
        assert_eq!(param.unit, Some(Unit::from_symbol("degC")));
    }

    #[test]
    fn test_single_series_uses_given_position() {
        let one = testdata::station_series()
            .sel(&[(STATION_DIM, Selector::Indices(vec![0]))])
            .unwrap();
        let doc = netcdf_to_coveragejson(&one, &station_axes(), Profile::TimeSeries, 1.5, 2.5).unwrap();
        let cov = match doc {
            CoverageDocument::Coverage(c) => c,
            CoverageDocument::Collection(_) => panic!("expected a coverage"),
        };
        assert_eq!(cov.domain.axis("y"), Some(&Axis::values_f64(vec![2.5])));
        assert_eq!(cov.domain.domain_type, DomainType::PointSeries);
    }

    #[test]
    fn test_grid_profile() {
        let doc = netcdf_to_coveragejson(
            &testdata::ocean_grid(),
            &station_axes(),
            Profile::Grid,
            DEFAULT_X_VAL,
            DEFAULT_Y_VAL,
        )
        .unwrap();
        let cov = match doc {
            CoverageDocument::Coverage(c) => c,
            CoverageDocument::Collection(_) => panic!("expected a coverage"),
        };
        assert_eq!(cov.domain.domain_type, DomainType::Grid);
        let temp = &cov.ranges.as_ref().unwrap()["TEMP"];
        assert_eq!(temp.axis_names, Some(vec!["t".into(), "y".into(), "x".into()]));
        assert_eq!(temp.shape, Some(vec![3, 4, 5]));
        assert_eq!(temp.values[1], None);
        assert_eq!(temp.values[2], Some(2.0));
        let depth = &cov.ranges.as_ref().unwrap()["depth"];
        assert_eq!(depth.shape, Some(vec![1, 4, 5]));
        assert!(depth.is_consistent());
    }
}
