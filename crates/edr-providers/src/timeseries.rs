//! EDR queries over station time series (CF `timeSeries` layout) returning
//! `PointSeries` coverages.

use std::collections::BTreeMap;

use async_trait::async_trait;
use edr_protocol::coverage_json::CRS84;
use edr_protocol::{
    CovJsonParameter, CoverageCollection, CoverageJson, DomainSet, DomainType, Extent, I18nString, NdArray,
    ObservedProperty, QueryGeometry, RangeType, ReferenceSystemConnection, Unit,
};
use grid_dataset::{CoordValues, Coordinate, Dataset, Selector};
use tracing::{debug, instrument, warn};

use crate::config::TimeSeriesConfig;
use crate::error::{ProviderError, Result};
use crate::provider::{EdrQuery, Fields, Provider, QueryOutput, QueryType};
use crate::xarray::properties::numeric_coord;
use crate::xarray::{bbox4, select, InstantMatch, XarrayProvider};

/// Station dimension of the CF discrete sampling geometry layout.
pub const STATION_DIM: &str = "timeSeries";

const QUERY_TYPES: &[QueryType] = &[QueryType::Position, QueryType::Cube];

/// Title and unit of variables that carry no attributes of their own.
const VARIABLES_MAP: &[(&str, &str, &str)] = &[("Temperature", "Sea Water temperature", "degC")];

/// One location and its series, one per field.
#[derive(Debug, Clone, PartialEq)]
struct Station {
    x: f64,
    y: f64,
    series: BTreeMap<String, Vec<f64>>,
}

/// Station (or grid cell) time series served as CoverageJSON `PointSeries`.
#[derive(Debug, Clone)]
pub struct TimeSeriesEdrProvider {
    inner: XarrayProvider,
    domain_type: DomainType,
}

impl TimeSeriesEdrProvider {
    pub fn open(config: TimeSeriesConfig) -> Result<Self> {
        let ds = grid_dataset::open_dataset(&config.dataset.data)
            .map_err(|e| ProviderError::Connection(format!("{}: {}", config.dataset.data, e)))?;
        Self::from_dataset(config, ds)
    }

    /// Serve a loaded dataset. Configured `lat`/`lon` lists become station
    /// coordinates when the dataset has none.
    pub fn from_dataset(config: TimeSeriesConfig, ds: Dataset) -> Result<Self> {
        let ds = with_configured_stations(ds, &config);
        let domain_type = match config.domain_type.as_deref() {
            Some(name) => DomainType::from_name(name).ok_or_else(|| {
                ProviderError::Connection(format!("unknown domain type {}", name))
            })?,
            None => DomainType::PointSeries,
        };
        Ok(Self {
            inner: XarrayProvider::from_dataset(config.dataset, ds)?,
            domain_type,
        })
    }

    pub fn coverage(&self) -> &XarrayProvider {
        &self.inner
    }

    /// Field descriptions, falling back to the built-in variable map for
    /// missing titles and units.
    pub fn fields(&self) -> Fields {
        let mut fields = self.inner.fields();
        for (name, info) in fields.iter_mut() {
            let (title, unit) = described(name, info.title.take(), info.unit.take());
            info.title = title;
            info.unit = unit;
        }
        fields
    }

    fn station_layout(&self) -> bool {
        let x = &self.inner.properties().axes.x;
        self.inner
            .dataset()
            .coord(x)
            .is_some_and(|c| c.dims.len() == 1 && c.dims[0] == STATION_DIM)
    }

    fn requested_fields(&self, query: &EdrQuery) -> Vec<String> {
        if !query.select_properties.is_empty() {
            return query.select_properties.clone();
        }
        let ds = self.inner.dataset();
        let time = self.inner.properties().axes.time.as_deref();
        ds.data_vars
            .iter()
            .filter(|v| time.is_some_and(|t| v.dims.iter().any(|d| d == t)))
            .map(|v| v.name.clone())
            .collect()
    }

    fn time_selection(&self, query: &EdrQuery) -> Result<Option<(String, Selector)>> {
        query
            .datetime
            .as_deref()
            .map(|dt| self.inner.datetime_selector(dt, InstantMatch::SameDate))
            .transpose()
    }

    /// Series at the station (or grid cell) nearest to a point.
    #[instrument(skip(self, query), fields(wkt = ?query.wkt, datetime = ?query.datetime))]
    pub fn position_query(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let wkt = query
            .wkt
            .as_ref()
            .ok_or_else(|| ProviderError::Query("position query requires coords".to_string()))?;
        let axes = &self.inner.properties().axes;
        let ds = self.inner.dataset();

        let mut selections = Vec::new();
        if let Some(time) = self.time_selection(query)? {
            selections.push(time);
        }

        if self.station_layout() {
            let xs = numeric_coord(ds, &axes.x)?;
            let ys = numeric_coord(ds, &axes.y)?;
            let indices: Vec<usize> = wkt
                .vertices()
                .iter()
                .filter_map(|(x, y)| nearest_station(&xs, &ys, *x, *y))
                .collect();
            let indices = dedup(indices);
            if indices.is_empty() {
                return Err(ProviderError::no_data());
            }
            selections.push((STATION_DIM.to_string(), Selector::Indices(indices)));
        } else {
            match wkt {
                QueryGeometry::Point { x, y } => {
                    selections.push((axes.x.clone(), Selector::Nearest(*x)));
                    selections.push((axes.y.clone(), Selector::Nearest(*y)));
                }
                QueryGeometry::Polygon(_) => {
                    let [minx, miny, maxx, maxy] = wkt.bounds();
                    selections.push((axes.x.clone(), self.inner.axis_slice(&axes.x, minx, maxx)));
                    selections.push((axes.y.clone(), self.inner.axis_slice(&axes.y, miny, maxy)));
                }
                _ => {
                    let (xs, ys) = wkt.xy();
                    selections.push((axes.x.clone(), Selector::NearestMany(xs)));
                    selections.push((axes.y.clone(), Selector::NearestMany(ys)));
                }
            }
        }

        self.series_output(query, &selections)
    }

    /// Series of every station (or grid cell) inside a bounding box.
    #[instrument(skip(self, query), fields(bbox = ?query.bbox, datetime = ?query.datetime))]
    pub fn cube_query(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let bbox = bbox4(&query.bbox, "z-axis not supported")?;
        let axes = &self.inner.properties().axes;

        let mut selections = Vec::new();
        if let Some(time) = self.time_selection(query)? {
            selections.push(time);
        }

        if self.station_layout() {
            let ds = self.inner.dataset();
            let indices = stations_in_bbox(&numeric_coord(ds, &axes.x)?, &numeric_coord(ds, &axes.y)?, bbox);
            if indices.is_empty() {
                return Err(ProviderError::no_data());
            }
            selections.push((STATION_DIM.to_string(), Selector::Indices(indices)));
        } else {
            let [minx, miny, maxx, maxy] = configure_bbox(self.inner.dataset(), &axes.x, &axes.y, bbox);
            selections.push((axes.x.clone(), Selector::slice(minx, maxx)));
            selections.push((axes.y.clone(), Selector::slice(miny, maxy)));
        }

        self.series_output(query, &selections)
    }

    fn series_output(&self, query: &EdrQuery, selections: &[(String, Selector)]) -> Result<QueryOutput> {
        let fields = self.requested_fields(query);
        debug!(fields = ?fields, selections = ?selections, "Time series selection");

        let data = self.inner.dataset().select_variables(&fields)?;
        let data = select(&data, selections)?.to_float64();
        self.inner.ensure_not_empty(&data)?;
        if data.sizes(STATION_DIM) == Some(0) {
            return Err(ProviderError::no_data());
        }

        let times = self.time_labels(&data);
        let stations = self.stations(&data, &fields, times.len())?;
        let parameters = self.parameters(&fields);

        if let [station] = stations.as_slice() {
            let mut coverage = point_series(station, times, self.domain_type);
            for (name, param) in parameters {
                coverage = coverage.with_parameter(&name, param);
            }
            return Ok(coverage.into());
        }

        let mut collection = CoverageCollection::new(self.domain_type)
            .with_parameters(parameters)
            .with_referencing(vec![
                ReferenceSystemConnection::geographic(CRS84),
                ReferenceSystemConnection::temporal(),
            ]);
        for station in &stations {
            collection.push(point_series(station, times.clone(), self.domain_type).without_parameters());
        }
        Ok(collection.into())
    }

    fn time_labels(&self, data: &Dataset) -> Vec<String> {
        self.inner
            .properties()
            .axes
            .time
            .as_deref()
            .and_then(|t| data.coord(t))
            .and_then(|c| c.values.as_time())
            .map(|times| times.iter().map(grid_dataset::to_datetime_string).collect())
            .unwrap_or_default()
    }

    /// Split the selected data into one series per location, in row-major
    /// order of the location dimensions.
    fn stations(&self, data: &Dataset, fields: &[String], steps: usize) -> Result<Vec<Station>> {
        let axes = &self.inner.properties().axes;
        let xs = numeric_coord(data, &axes.x)?;
        let ys = numeric_coord(data, &axes.y)?;
        let station_layout = self.station_layout();

        let mut order: Vec<&str> = if station_layout {
            vec![STATION_DIM]
        } else {
            vec![axes.y.as_str(), axes.x.as_str()]
        };
        if let Some(t) = axes.time.as_deref() {
            order.push(t);
        }

        let count = if station_layout { xs.len() } else { xs.len() * ys.len() };
        let location = |i: usize| -> (f64, f64) {
            if station_layout {
                (xs[i], ys[i])
            } else {
                (xs[i % xs.len()], ys[i / xs.len()])
            }
        };

        let mut stations: Vec<Station> = (0..count)
            .map(|i| {
                let (x, y) = location(i);
                Station { x, y, series: BTreeMap::new() }
            })
            .collect();

        let steps = steps.max(1);
        for name in fields {
            let values = data.transpose_values(name, &order)?;
            if values.len() != count * steps {
                warn!(field = %name, len = values.len(), "Series length does not match locations");
                return Err(ProviderError::InvalidData(format!("{} has an unexpected shape", name)));
            }
            for (station, chunk) in stations.iter_mut().zip(values.chunks(steps)) {
                station.series.insert(name.clone(), chunk.to_vec());
            }
        }
        Ok(stations)
    }

    fn parameters(&self, fields: &[String]) -> BTreeMap<String, CovJsonParameter> {
        let infos = self.fields();
        fields
            .iter()
            .map(|name| {
                let info = infos.get(name);
                let title = info.and_then(|i| i.title.clone()).unwrap_or_else(|| name.clone());
                let mut param = CovJsonParameter::new(ObservedProperty::new(&title).with_id(name.as_str()))
                    .with_description(I18nString::english(&title));
                if let Some(unit) = info.and_then(|i| i.unit.as_deref()) {
                    param = param.with_unit(Unit::from_symbol(unit));
                }
                (name.clone(), param)
            })
            .collect()
    }
}

/// Title and unit of a variable, completed from the built-in variable map.
pub(crate) fn described(
    name: &str,
    title: Option<String>,
    unit: Option<String>,
) -> (Option<String>, Option<String>) {
    match VARIABLES_MAP.iter().find(|(n, _, _)| *n == name) {
        Some((_, t, u)) => (
            title.or_else(|| Some(t.to_string())),
            unit.or_else(|| Some(u.to_string())),
        ),
        None => (title, unit),
    }
}

fn point_series(station: &Station, times: Vec<String>, domain_type: DomainType) -> CoverageJson {
    let steps = times.len();
    let mut coverage = CoverageJson::point_series(station.x, station.y, times);
    coverage.domain.domain_type = domain_type;
    for (name, values) in &station.series {
        coverage = coverage.with_range(
            name,
            NdArray::from_nan_values(values, vec![steps.max(1)], vec!["t".to_string()]),
        );
    }
    coverage
}

/// Add configured station coordinates to a dataset lacking them.
fn with_configured_stations(mut ds: Dataset, config: &TimeSeriesConfig) -> Dataset {
    let x = config.dataset.x_field.as_deref().unwrap_or("lon");
    let y = config.dataset.y_field.as_deref().unwrap_or("lat");
    if ds.sizes(STATION_DIM).is_none() {
        return ds;
    }
    if ds.coord(x).is_none() && !config.lon.is_empty() {
        ds = ds.with_coord(
            Coordinate::new(x, vec![STATION_DIM.into()], CoordValues::Numeric(config.lon.clone()))
                .with_attr("units", "degrees_east"),
        );
    }
    if ds.coord(y).is_none() && !config.lat.is_empty() {
        ds = ds.with_coord(
            Coordinate::new(y, vec![STATION_DIM.into()], CoordValues::Numeric(config.lat.clone()))
                .with_attr("units", "degrees_north"),
        );
    }
    ds
}

fn nearest_station(xs: &[f64], ys: &[f64], x: f64, y: f64) -> Option<usize> {
    xs.iter()
        .zip(ys)
        .map(|(sx, sy)| (sx - x).powi(2) + (sy - y).powi(2))
        .enumerate()
        .filter(|(_, d)| d.is_finite())
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

fn stations_in_bbox(xs: &[f64], ys: &[f64], bbox: [f64; 4]) -> Vec<usize> {
    let [minx, miny, maxx, maxy] = bbox;
    xs.iter()
        .zip(ys)
        .enumerate()
        .filter(|(_, (x, y))| (minx..=maxx).contains(*x) && (miny..=maxy).contains(*y))
        .map(|(i, _)| i)
        .collect()
}

fn dedup(indices: Vec<usize>) -> Vec<usize> {
    let mut out: Vec<usize> = Vec::with_capacity(indices.len());
    for i in indices {
        if !out.contains(&i) {
            out.push(i);
        }
    }
    out
}

/// Order bbox bounds like the x/y labels so that slices select inside the
/// box on descending axes too.
fn configure_bbox(ds: &Dataset, x: &str, y: &str, bbox: [f64; 4]) -> [f64; 4] {
    let [mut minx, mut miny, mut maxx, mut maxy] = bbox;
    let descending = |name: &str| ds.coord(name).is_some_and(|c| c.values.is_descending());
    if descending(x) {
        std::mem::swap(&mut minx, &mut maxx);
    }
    if descending(y) {
        std::mem::swap(&mut miny, &mut maxy);
    }
    [minx, miny, maxx, maxy]
}

#[async_trait]
impl Provider for TimeSeriesEdrProvider {
    fn name(&self) -> &str {
        "xarray-edr-timeseries"
    }

    fn query_types(&self) -> &[QueryType] {
        QUERY_TYPES
    }

    fn extent(&self) -> Option<Extent> {
        self.inner.extent()
    }

    fn get_fields(&self) -> Result<Fields> {
        Ok(self.fields())
    }

    fn get_coverage_rangetype(&self) -> Result<RangeType> {
        Ok(self.inner.rangetype())
    }

    fn get_coverage_domainset(&self) -> Result<DomainSet> {
        Ok(self.inner.domainset())
    }

    async fn position(&self, query: &EdrQuery) -> Result<QueryOutput> {
        self.position_query(query)
    }

    async fn cube(&self, query: &EdrQuery) -> Result<QueryOutput> {
        self.cube_query(query)
    }
}
