//! Coverage provider over labeled array datasets (Zarr / NetCDF).

pub mod covjson;
pub mod properties;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use edr_protocol::cis::{
    EncodingInfo, GeneralGrid, GridLimits, Meta, RegularAxis, UnitOfMeasure, OGC_DATA_TYPE_PREFIX,
};
use edr_protocol::{media_types, parse_instant, DateTimeQuery, DomainSet, Extent, RangeField, RangeType, SubsetQuery};
use grid_dataset::{native_bytes, netcdf_bytes, number, open_dataset, zarr_zip_bytes, Coordinate, Dataset, Selector};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

pub use covjson::{gen_covjson, OutMeta};
pub use properties::{AxisNames, CoverageProperties, CrsType};

use crate::config::XarrayConfig;
use crate::error::{ProviderError, Result};
use crate::provider::{CoverageQuery, FieldInfo, Fields, Provider, QueryOutput};

/// How an instant `datetime` matches time labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstantMatch {
    /// The exact timestamp.
    Exact,
    /// Every timestamp on the same calendar date.
    SameDate,
}

/// A dataset opened once and served read-only.
#[derive(Debug, Clone)]
pub struct XarrayProvider {
    config: XarrayConfig,
    data: Arc<Dataset>,
    properties: CoverageProperties,
}

impl XarrayProvider {
    /// Open the configured dataset and discover its axes.
    pub fn open(config: XarrayConfig) -> Result<Self> {
        info!(data = %config.data, "Opening dataset");
        let ds = open_dataset(&config.data)
            .map_err(|e| ProviderError::Connection(format!("{}: {}", config.data, e)))?;
        Self::from_dataset(config, ds)
    }

    /// Serve an already loaded dataset.
    pub fn from_dataset(config: XarrayConfig, ds: Dataset) -> Result<Self> {
        let axes = AxisNames::discover(&ds, &config)?;
        let properties = CoverageProperties::from_dataset(&ds, axes)?;
        debug!(
            x = %properties.axes.x,
            y = %properties.axes.y,
            time = ?properties.axes.time,
            fields = ?properties.fields,
            "Discovered coverage properties"
        );
        Ok(Self {
            config,
            data: Arc::new(ds),
            properties,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    pub fn properties(&self) -> &CoverageProperties {
        &self.properties
    }

    pub fn config(&self) -> &XarrayConfig {
        &self.config
    }

    /// Field descriptions of every data variable.
    pub fn fields(&self) -> Fields {
        self.data
            .data_vars
            .iter()
            .map(|var| {
                let info = FieldInfo {
                    type_: var.dtype.covjson_type().to_string(),
                    title: var.attr_str("long_name").map(str::to_string),
                    unit: var.attr_str("units").map(str::to_string),
                };
                (var.name.clone(), info)
            })
            .collect()
    }

    /// CIS range type of the coverage fields.
    pub fn rangetype(&self) -> RangeType {
        let field = self
            .properties
            .fields
            .iter()
            .filter_map(|name| self.data.variable(name))
            .map(|var| RangeField {
                id: var.name.clone(),
                type_: "Quantity".to_string(),
                name: var.attr_str("long_name").map(str::to_string),
                encoding_info: EncodingInfo {
                    data_type: format!("{}{}", OGC_DATA_TYPE_PREFIX, var.dtype.name()),
                },
                nodata: "null".to_string(),
                uom: UnitOfMeasure::ucum(var.attr_str("units")),
                meta: Some(Meta {
                    tags: Value::Object(var.attrs.clone()),
                }),
            })
            .collect();
        RangeType {
            field,
            ..Default::default()
        }
    }

    /// CIS domain set of the grid.
    pub fn domainset(&self) -> DomainSet {
        let p = &self.properties;
        let mut axis_labels = vec![p.axes.x.clone(), p.axes.y.clone()];
        let mut axis = vec![
            RegularAxis::new(
                &p.axes.x,
                number(p.bbox[0]),
                number(p.bbox[2]),
                Some(p.bbox_units.clone()),
                Some(number(p.resx)),
            ),
            RegularAxis::new(
                &p.axes.y,
                number(p.bbox[1]),
                number(p.bbox[3]),
                Some(p.bbox_units.clone()),
                Some(number(p.resy)),
            ),
        ];
        if let (Some(t), Some((begin, end))) = (&p.axes.time, &p.time_range) {
            axis_labels.push(t.clone());
            axis.push(RegularAxis::new(
                t,
                Value::from(begin.as_str()),
                Value::from(end.as_str()),
                p.restime.clone(),
                p.restime.clone().map(Value::from),
            ));
        }

        let mut domainset = DomainSet::new(GeneralGrid {
            type_: "GeneralGridCoverage".to_string(),
            srs_name: p.bbox_crs.clone(),
            axis_labels,
            axis,
            grid_limits: GridLimits::index_2d(p.width, p.height),
        });
        domainset.meta = Some(Meta {
            tags: Value::Object(self.data.attrs.clone()),
        });
        domainset
    }

    /// Coverage query: subset by properties, per-axis subsets, bbox and
    /// datetime, and render in the requested format.
    #[instrument(skip(self), fields(data = %self.config.data))]
    pub fn query_coverage(&self, query: &CoverageQuery) -> Result<QueryOutput> {
        if query.properties.is_empty() && query.subsets.is_empty() && !query.wants_json() {
            return self.native_output(query.format.as_deref());
        }

        let axes = &self.properties.axes;
        let fields = if query.properties.is_empty() {
            self.properties.fields.clone()
        } else {
            query.properties.clone()
        };

        let x_subset = query.subset(&axes.x);
        let y_subset = query.subset(&axes.y);
        let time_subset = axes.time.as_deref().and_then(|t| query.subset(t));

        if !query.bbox.is_empty() && x_subset.is_some() && y_subset.is_some() {
            error!("bbox and subsetting by coordinates are exclusive");
            return Err(ProviderError::Query(
                "bbox and subsetting by coordinates are exclusive".to_string(),
            ));
        }
        if query.datetime.is_some() && time_subset.is_some() {
            error!("datetime and temporal subsetting are exclusive");
            return Err(ProviderError::Query(
                "datetime and temporal subsetting are exclusive".to_string(),
            ));
        }

        let mut selections: Vec<(String, Selector)> = Vec::new();
        for subset in &query.subsets {
            selections.push((subset.axis.clone(), self.subset_selector(subset)?));
        }
        if !query.bbox.is_empty() {
            let bbox = bbox4(&query.bbox, "bbox must have four values")?;
            // An explicit subset on one axis wins over the bbox on that axis.
            if x_subset.is_none() {
                selections.push((axes.x.clone(), self.axis_slice(&axes.x, bbox[0], bbox[2])));
            }
            if y_subset.is_none() {
                selections.push((axes.y.clone(), self.axis_slice(&axes.y, bbox[1], bbox[3])));
            }
        }
        if let Some(datetime) = &query.datetime {
            let (time, selector) = self.datetime_selector(datetime, InstantMatch::Exact)?;
            selections.push((time, selector));
        }
        debug!(fields = ?fields, selections = ?selections, "Subsetting coverage");

        let mut data = self.data.select_variables(&fields)?;
        if !selections.is_empty() {
            data = select(&data, &selections)?;
        }
        self.ensure_not_empty(&data)?;

        self.render(data, &fields, query.format.as_deref(), None)
    }

    /// Render a subset: CoverageJSON unless `zarr` or `netcdf` is asked for.
    pub(crate) fn render(
        &self,
        data: Dataset,
        fields: &[String],
        format: Option<&str>,
        bbox: Option<[f64; 4]>,
    ) -> Result<QueryOutput> {
        match format {
            Some("zarr") => Ok(QueryOutput::zarr_zip(zarr_zip_bytes(&data)?)),
            Some("netcdf") | Some("nc") => Ok(QueryOutput::netcdf(netcdf_bytes(&data)?)),
            _ => {
                let mut meta = OutMeta::from_data(&data, &self.properties.axes)?;
                if let Some(bbox) = bbox {
                    meta = meta.with_bbox(bbox);
                }
                Ok(gen_covjson(&self.properties, &meta, &data, fields)?.into())
            }
        }
    }

    fn native_output(&self, format: Option<&str>) -> Result<QueryOutput> {
        if format == Some("zarr") {
            return Ok(QueryOutput::zarr_zip(zarr_zip_bytes(&self.data)?));
        }
        let bytes = native_bytes(&self.config.data)?;
        let media_type = self
            .config
            .format
            .as_ref()
            .and_then(|f| f.mimetype.clone())
            .unwrap_or_else(|| media_types::OCTET_STREAM.to_string());
        let filename = Path::new(self.config.data.trim_end_matches('/'))
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        Ok(QueryOutput::Native {
            bytes,
            media_type,
            filename,
        })
    }

    pub(crate) fn ensure_not_empty(&self, data: &Dataset) -> Result<()> {
        let axes = &self.properties.axes;
        for name in [Some(&axes.x), Some(&axes.y), axes.time.as_ref()].into_iter().flatten() {
            if data.sizes(name) == Some(0) {
                return Err(ProviderError::no_data());
            }
        }
        Ok(())
    }

    /// Inclusive slice along a numeric axis, ordered like its labels.
    pub(crate) fn axis_slice(&self, axis: &str, a: f64, b: f64) -> Selector {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if self.data.coord(axis).is_some_and(|c| c.values.is_descending()) {
            Selector::slice(hi, lo)
        } else {
            Selector::slice(lo, hi)
        }
    }

    fn subset_selector(&self, subset: &SubsetQuery) -> Result<Selector> {
        let coord = self
            .data
            .coord(&subset.axis)
            .ok_or_else(|| ProviderError::Query(format!("Invalid subset axis {}", subset.axis)))?;

        if coord.values.as_time().is_some() {
            let low = parse_instant(&subset.low)?;
            let high = parse_instant(&subset.high)?;
            let (lo, hi) = if low <= high { (low, high) } else { (high, low) };
            return Ok(if coord.values.is_descending() {
                Selector::time_slice(hi, lo)
            } else {
                Selector::time_slice(lo, hi)
            });
        }

        let (low, high) = subset
            .numeric()
            .ok_or_else(|| ProviderError::Query(format!("Invalid subset {}({}:{})", subset.axis, subset.low, subset.high)))?;
        Ok(self.axis_slice(&subset.axis, low, high))
    }

    /// Selector for a `datetime` parameter on the time axis. Open interval
    /// ends resolve to the first/last time label.
    pub(crate) fn datetime_selector(
        &self,
        datetime: &str,
        instant: InstantMatch,
    ) -> Result<(String, Selector)> {
        let (name, coord) = self.time_coord()?;
        let times = coord.values.as_time().unwrap_or_default();
        let descending = coord.values.is_descending();
        let (min, max) = match (times.iter().min(), times.iter().max()) {
            (Some(min), Some(max)) => (*min, *max),
            _ => return Err(ProviderError::no_data()),
        };

        let selector = match DateTimeQuery::parse(&DateTimeQuery::normalize(datetime))?.ordered() {
            DateTimeQuery::Instant(value) => {
                let t = parse_instant(&value)?;
                match instant {
                    InstantMatch::Exact => Selector::TimeExact(t),
                    InstantMatch::SameDate => Selector::DateEquals(t.date_naive()),
                }
            }
            DateTimeQuery::Interval { start, end } => {
                let start = start.as_deref().map(parse_instant).transpose()?.unwrap_or(min);
                let end = end.as_deref().map(parse_instant).transpose()?.unwrap_or(max);
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                if descending {
                    Selector::time_slice(hi, lo)
                } else {
                    Selector::time_slice(lo, hi)
                }
            }
            DateTimeQuery::List(_) => {
                return Err(ProviderError::Query("datetime lists are not supported".to_string()))
            }
        };
        Ok((name.to_string(), selector))
    }

    fn time_coord(&self) -> Result<(&str, &Coordinate)> {
        let name = self
            .properties
            .axes
            .time
            .as_deref()
            .ok_or_else(|| ProviderError::Query("dataset has no time axis".to_string()))?;
        let coord = self
            .data
            .coord(name)
            .ok_or_else(|| ProviderError::Query(format!("time coordinate {} not found", name)))?;
        Ok((name, coord))
    }
}

/// Apply owned selections to a dataset.
pub(crate) fn select(data: &Dataset, selections: &[(String, Selector)]) -> Result<Dataset> {
    let refs: Vec<(&str, Selector)> = selections
        .iter()
        .map(|(dim, selector)| (dim.as_str(), selector.clone()))
        .collect();
    Ok(data.sel(&refs)?)
}

/// The first four values of a bbox, or `Query(message)`.
pub(crate) fn bbox4(bbox: &[f64], message: &str) -> Result<[f64; 4]> {
    match bbox {
        [a, b, c, d] => Ok([*a, *b, *c, *d]),
        _ => Err(ProviderError::Query(message.to_string())),
    }
}

#[async_trait]
impl Provider for XarrayProvider {
    fn name(&self) -> &str {
        "xarray"
    }

    fn extent(&self) -> Option<Extent> {
        let p = &self.properties;
        Some(Extent::from_bounds(p.bbox, Some(p.bbox_crs.clone()), p.time_range.clone()))
    }

    fn get_fields(&self) -> Result<Fields> {
        Ok(self.fields())
    }

    fn get_coverage_rangetype(&self) -> Result<RangeType> {
        Ok(self.rangetype())
    }

    fn get_coverage_domainset(&self) -> Result<DomainSet> {
        Ok(self.domainset())
    }

    async fn query(&self, query: &CoverageQuery) -> Result<QueryOutput> {
        self.query_coverage(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edr_protocol::{Axis, CoverageDocument};
    use grid_dataset::testdata;

    fn provider() -> XarrayProvider {
        XarrayProvider::from_dataset(XarrayConfig::new("memory"), testdata::ocean_grid()).unwrap()
    }

    fn coverage(output: QueryOutput) -> edr_protocol::CoverageJson {
        match output {
            QueryOutput::Coverage(CoverageDocument::Coverage(cov)) => cov,
            other => panic!("expected a coverage, got {:?}", other.media_type()),
        }
    }

    fn subset(expr: &str) -> SubsetQuery {
        SubsetQuery::parse(expr).unwrap()
    }

    #[test]
    fn test_fields_and_rangetype() {
        let p = provider();
        let fields = p.fields();
        assert_eq!(fields["TEMP"].type_, "float");
        assert_eq!(fields["TEMP"].title.as_deref(), Some("Sea Water temperature"));
        assert_eq!(fields["depth"].unit.as_deref(), Some("m"));

        let rangetype = p.rangetype();
        assert_eq!(rangetype.field.len(), 1);
        let temp = rangetype.get("TEMP").unwrap();
        assert_eq!(temp.encoding_info.data_type, format!("{}float32", OGC_DATA_TYPE_PREFIX));
        assert_eq!(temp.uom.code.as_deref(), Some("degC"));
    }

    #[test]
    fn test_domainset() {
        let json = serde_json::to_value(provider().domainset()).unwrap();
        let grid = &json["generalGrid"];
        assert_eq!(grid["axisLabels"], serde_json::json!(["lon", "lat", "time"]));
        assert_eq!(grid["axis"][1]["lowerBound"], 30.0);
        assert_eq!(grid["axis"][2]["resolution"], "1 days");
        assert_eq!(grid["gridLimits"]["axis"][0]["upperBound"], 5);
        assert_eq!(json["_meta"]["tags"]["title"], "Synthetic ocean temperature");
    }

    #[test]
    fn test_subset_on_descending_axis() {
        let query = CoverageQuery {
            subsets: vec![subset("lat(5:25)"), subset("lon(-10:10)")],
            ..Default::default()
        };
        let cov = coverage(provider().query_coverage(&query).unwrap());
        assert_eq!(cov.domain.axis("y"), Some(&Axis::Regular { start: 10.0, stop: 20.0, num: 2 }));
        assert_eq!(cov.domain.axis("x").map(Axis::len), Some(3));
        let range = &cov.ranges.unwrap()["TEMP"];
        assert_eq!(range.shape, Some(vec![2, 3, 3]));
    }

    #[test]
    fn test_bbox_and_datetime() {
        let query = CoverageQuery {
            bbox: vec![-5.0, 5.0, 15.0, 35.0],
            datetime: Some("2000-01-03/2000-01-02".to_string()),
            ..Default::default()
        };
        let cov = coverage(provider().query_coverage(&query).unwrap());
        assert_eq!(cov.domain.axis("x").map(Axis::len), Some(2));
        assert_eq!(cov.domain.axis("y").map(Axis::len), Some(3));
        assert_eq!(cov.domain.axis("t").map(Axis::len), Some(2));
    }

    #[test]
    fn test_exclusive_parameters() {
        let p = provider();
        let both = CoverageQuery {
            bbox: vec![-5.0, 5.0, 15.0, 35.0],
            subsets: vec![subset("lat(5:25)"), subset("lon(-10:10)")],
            ..Default::default()
        };
        let err = p.query_coverage(&both).unwrap_err();
        assert!(err.to_string().contains("bbox and subsetting by coordinates are exclusive"));

        let temporal = CoverageQuery {
            datetime: Some("2000-01-01".to_string()),
            subsets: vec![subset("time(\"2000-01-01\":\"2000-01-02\")")],
            ..Default::default()
        };
        let err = p.query_coverage(&temporal).unwrap_err();
        assert!(err.to_string().contains("datetime and temporal subsetting are exclusive"));
    }

    #[test]
    fn test_empty_selection_is_no_data() {
        let query = CoverageQuery {
            subsets: vec![subset("lon(100:120)")],
            ..Default::default()
        };
        assert!(matches!(
            provider().query_coverage(&query),
            Err(ProviderError::NoData(_))
        ));
    }

    #[test]
    fn test_zarr_output_of_subset() {
        let query = CoverageQuery {
            properties: vec!["TEMP".to_string()],
            format: Some("zarr".to_string()),
            ..Default::default()
        };
        let output = provider().query_coverage(&query).unwrap();
        assert_eq!(output.media_type(), media_types::ZIP);
    }

    #[test]
    fn test_native_output_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = testdata::write_fixture(&testdata::ocean_grid(), dir.path(), "ocean.zarr").unwrap();
        let p = XarrayProvider::open(XarrayConfig::new(path.to_string_lossy())).unwrap();

        let query = CoverageQuery {
            format: Some("native".to_string()),
            ..Default::default()
        };
        match p.query_coverage(&query).unwrap() {
            QueryOutput::Native { filename, media_type, bytes } => {
                assert_eq!(filename, "ocean.zarr");
                assert_eq!(media_type, media_types::OCTET_STREAM);
                assert!(!bytes.is_empty());
            }
            other => panic!("unexpected {:?}", other.media_type()),
        }
    }

    #[test]
    fn test_open_missing_dataset_is_connection_error() {
        let err = XarrayProvider::open(XarrayConfig::new("/nonexistent/ocean.zarr")).unwrap_err();
        assert!(matches!(err, ProviderError::Connection(_)));
    }

    #[test]
    fn test_fields_with_different_axes_are_rejected() {
        let query = CoverageQuery {
            properties: vec!["TEMP".to_string(), "depth".to_string()],
            format: Some("json".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            provider().query_coverage(&query),
            Err(ProviderError::Query(_))
        ));
    }

    #[test]
    fn test_extent_of_north_up_grid() {
        let p = provider();
        // the properties bbox keeps the data order of the labels
        assert_eq!(p.properties().bbox, [-20.0, 30.0, 20.0, 0.0]);

        let extent = p.extent().unwrap();
        assert_eq!(extent.bbox(), Some(&[-20.0, 0.0, 20.0, 30.0][..]));
        let temporal = extent.temporal.unwrap();
        assert_eq!(temporal.interval[0][0].as_deref(), Some("2000-01-01T00:00:00Z"));
    }
}
