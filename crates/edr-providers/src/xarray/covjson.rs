//! CoverageJSON grid output for gridded datasets.

use edr_protocol::{
    Axis, CovJsonParameter, CoverageJson, Domain, DomainType, I18nString, NdArray, ObservedProperty,
    ReferenceSystemConnection, Unit,
};
use grid_dataset::{to_datetime_string, Dataset};

use super::properties::{numeric_coord, AxisNames, CoverageProperties};
use crate::error::{ProviderError, Result};

/// Shape and extent of a (subset) dataset about to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct OutMeta {
    /// `[minx, miny, maxx, maxy]` as first/last labels.
    pub bbox: [f64; 4],
    pub time: Option<(String, String)>,
    pub width: usize,
    pub height: usize,
    pub time_steps: usize,
    pub time_values: Vec<String>,
    /// Rows of the data run north to south.
    pub y_descending: bool,
}

impl OutMeta {
    /// Describe `data`. Dimensions removed by a scalar selection count as
    /// length 1.
    pub fn from_data(data: &Dataset, axes: &AxisNames) -> Result<Self> {
        let x = numeric_coord(data, &axes.x)?;
        let y = numeric_coord(data, &axes.y)?;
        let (x0, x1) = ends(&x, &axes.x)?;
        let (y0, y1) = ends(&y, &axes.y)?;

        let time_values: Vec<String> = axes
            .time
            .as_deref()
            .and_then(|t| data.coord(t))
            .and_then(|c| c.values.as_time())
            .map(|times| times.iter().map(to_datetime_string).collect())
            .unwrap_or_default();
        let time = match (time_values.first(), time_values.last()) {
            (Some(a), Some(b)) => Some((a.clone(), b.clone())),
            _ => None,
        };

        Ok(Self {
            bbox: [x0, y0, x1, y1],
            time,
            width: data.sizes(&axes.x).unwrap_or(1),
            height: data.sizes(&axes.y).unwrap_or(1),
            time_steps: time_values.len(),
            time_values,
            y_descending: y0 > y1,
        })
    }

    /// Replace the reported bounding box (e.g. with the query geometry's).
    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = bbox;
        self
    }
}

fn ends(values: &[f64], name: &str) -> Result<(f64, f64)> {
    match (values.first(), values.last()) {
        (Some(a), Some(b)) => Ok((*a, *b)),
        _ => Err(ProviderError::NoData(format!("No data found along {}", name))),
    }
}

/// Render `fields` of `data` as a CoverageJSON `Grid` coverage.
///
/// The y axis is always written south to north; rows of a north-up grid
/// are flipped to match.
pub fn gen_covjson(
    props: &CoverageProperties,
    meta: &OutMeta,
    data: &Dataset,
    fields: &[String],
) -> Result<CoverageJson> {
    let [minx, y0, maxx, y1] = meta.bbox;
    let flip_rows = meta.y_descending;
    let (miny, maxy) = (y0.min(y1), y0.max(y1));

    let x_axis = Axis::Regular { start: minx, stop: maxx, num: meta.width };
    let y_axis = Axis::Regular { start: miny, stop: maxy, num: meta.height };
    let has_time = props.axes.time.is_some() && !meta.time_values.is_empty();

    let mut domain = if has_time {
        Domain::grid(x_axis, y_axis, meta.time_values.clone())
    } else {
        Domain::new(DomainType::Grid)
            .with_axis("x", x_axis)
            .with_axis("y", y_axis)
    };
    domain = domain.with_referencing(props.referencing());
    if has_time {
        domain = domain.with_referencing(ReferenceSystemConnection::temporal());
    }

    let mut order: Vec<&str> = vec![props.axes.y.as_str(), props.axes.x.as_str()];
    let mut axis_names = vec!["y".to_string(), "x".to_string()];
    let mut shape = vec![meta.height, meta.width];
    if let (true, Some(t)) = (has_time, props.axes.time.as_deref()) {
        order.push(t);
        axis_names.push("t".to_string());
        shape.push(meta.time_steps);
    }
    let row_len = shape[1..].iter().product::<usize>();

    let data = data.clone().to_float64();
    let mut coverage = CoverageJson::new(domain);
    for name in fields {
        let var = data
            .variable(name)
            .ok_or_else(|| ProviderError::NoData(format!("{} not found", name)))?;
        // A range must span every domain axis longer than one step.
        if let Some((axis, _)) = order
            .iter()
            .zip(&shape)
            .find(|(axis, len)| **len > 1 && !var.dims.iter().any(|d| d == *axis))
        {
            return Err(ProviderError::Query(format!(
                "{} does not vary along {} and cannot share a grid with the other fields",
                name, axis
            )));
        }
        let title = var.attr_str("long_name").unwrap_or(name);

        let mut param = CovJsonParameter::new(ObservedProperty::new(title).with_id(name.as_str()))
            .with_description(I18nString::english(title));
        if let Some(units) = var.attr_str("units") {
            param = param.with_unit(Unit::from_symbol(units));
        }

        let mut values = data.transpose_values(name, &order)?;
        if flip_rows && row_len > 0 {
            values = values.chunks(row_len).rev().flatten().copied().collect();
        }
        let range = NdArray::from_nan_values(&values, shape.clone(), axis_names.clone())
            .with_data_type(var.dtype.covjson_type());

        coverage = coverage.with_parameter(name, param).with_range(name, range);
    }

    Ok(coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::XarrayConfig;
    use grid_dataset::{testdata, Selector};

    fn setup() -> (Dataset, CoverageProperties) {
        let ds = testdata::ocean_grid();
        let axes = AxisNames::discover(&ds, &XarrayConfig::new("memory")).unwrap();
        let props = CoverageProperties::from_dataset(&ds, axes).unwrap();
        (ds, props)
    }

    #[test]
    fn test_grid_coverage_shape_and_axes() {
        let (ds, props) = setup();
        let meta = OutMeta::from_data(&ds, &props.axes).unwrap();
        assert_eq!((meta.width, meta.height, meta.time_steps), (5, 4, 3));

        let cov = gen_covjson(&props, &meta, &ds, &["TEMP".to_string()]).unwrap();
        assert_eq!(cov.domain.domain_type, DomainType::Grid);
        assert_eq!(
            cov.domain.axis("y"),
            Some(&Axis::Regular { start: 0.0, stop: 30.0, num: 4 })
        );
        assert_eq!(cov.domain.axis("t").map(Axis::len), Some(3));

        let range = &cov.ranges.as_ref().unwrap()["TEMP"];
        assert!(range.is_consistent());
        assert_eq!(range.shape, Some(vec![4, 5, 3]));
        assert_eq!(range.data_type, "float");
    }

    #[test]
    fn test_rows_follow_ascending_y_axis() {
        let (ds, props) = setup();
        let meta = OutMeta::from_data(&ds, &props.axes).unwrap();
        let cov = gen_covjson(&props, &meta, &ds, &["TEMP".to_string()]).unwrap();
        let range = &cov.ranges.as_ref().unwrap()["TEMP"];

        // southernmost row first: lat 0 is row index 3 in the source
        let first = range.flat_index(&[("y", 0), ("x", 0), ("t", 0)]).unwrap();
        assert_eq!(range.values[first], Some(30.0));
        // the missing cell sits on the northernmost row
        let missing = range.flat_index(&[("y", 3), ("x", 1), ("t", 0)]).unwrap();
        assert_eq!(range.values[missing], None);
    }

    #[test]
    fn test_scalar_selection_counts_as_one() {
        let (ds, props) = setup();
        let point = ds
            .sel(&[("lon", Selector::Nearest(1.0)), ("lat", Selector::Nearest(9.0))])
            .unwrap();
        let meta = OutMeta::from_data(&point, &props.axes).unwrap();
        assert_eq!((meta.width, meta.height), (1, 1));

        let cov = gen_covjson(&props, &meta, &point, &["TEMP".to_string()]).unwrap();
        let range = &cov.ranges.as_ref().unwrap()["TEMP"];
        assert_eq!(range.values, vec![Some(22.0), Some(122.0), Some(222.0)]);
        let param = &cov.parameters.as_ref().unwrap()["TEMP"];
        assert_eq!(param.unit, Some(Unit::from_symbol("degC")));
    }

    #[test]
    fn test_field_without_time_axis_is_rejected() {
        let (ds, props) = setup();
        let meta = OutMeta::from_data(&ds, &props.axes).unwrap();
        let fields = vec!["TEMP".to_string(), "depth".to_string()];

        let err = gen_covjson(&props, &meta, &ds, &fields).unwrap_err();
        assert!(matches!(err, ProviderError::Query(_)));
        assert!(err.to_string().contains("depth does not vary along time"));
    }

    #[test]
    fn test_field_without_time_axis_on_single_step() {
        let (ds, props) = setup();
        let day = ds.sel(&[("time", Selector::Index(1))]).unwrap();
        let meta = OutMeta::from_data(&day, &props.axes).unwrap();
        let fields = vec!["TEMP".to_string(), "depth".to_string()];

        let cov = gen_covjson(&props, &meta, &day, &fields).unwrap();
        let ranges = cov.ranges.as_ref().unwrap();
        for name in &fields {
            assert!(ranges[name].is_consistent(), "{} range is inconsistent", name);
        }
        assert_eq!(ranges["depth"].values.len(), 20);
    }
}
