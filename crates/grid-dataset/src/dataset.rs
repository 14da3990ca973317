//! In-memory labeled dataset model.
//!
//! A [`Dataset`] is a set of named dimensions, coordinate variables that
//! label positions along those dimensions, and data variables stored as
//! row-major `f64` buffers (`NaN` marks missing values).

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{GridError, Result};
use crate::time::to_datetime_string;

/// Free-form variable or dataset attributes.
pub type Attrs = Map<String, Value>;

/// Storage type of a variable in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DataKind {
    /// Parse a numpy/zarr style type name (`float32`, `int16`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => return None,
        })
    }

    /// Type name as used in OGC data type URIs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Whether the type is floating point.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// CoverageJSON `dataType` for values of this kind.
    pub fn covjson_type(self) -> &'static str {
        if self.is_float() {
            "float"
        } else {
            "integer"
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Labels of a coordinate variable.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValues {
    Numeric(Vec<f64>),
    Time(Vec<DateTime<Utc>>),
    Text(Vec<String>),
}

impl CoordValues {
    /// Number of labels.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Time(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// True when there are no labels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric labels, if this is a numeric coordinate.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Time labels, if this is a time coordinate.
    pub fn as_time(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            Self::Time(v) => Some(v),
            _ => None,
        }
    }

    /// Label at `index` as JSON (numbers, ISO 8601 strings or text).
    pub fn label(&self, index: usize) -> Option<Value> {
        match self {
            Self::Numeric(v) => v.get(index).map(|x| number(*x)),
            Self::Time(v) => v.get(index).map(|t| Value::String(to_datetime_string(t))),
            Self::Text(v) => v.get(index).map(|s| Value::String(s.clone())),
        }
    }

    /// True when the labels run from high to low.
    pub fn is_descending(&self) -> bool {
        match self {
            Self::Numeric(v) => v.len() > 1 && v[0] > v[v.len() - 1],
            Self::Time(v) => v.len() > 1 && v[0] > v[v.len() - 1],
            Self::Text(_) => false,
        }
    }

    pub(crate) fn gather(&self, shape: &[usize], picks: &[Vec<usize>]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(gather(v, shape, picks)),
            Self::Time(v) => Self::Time(gather(v, shape, picks)),
            Self::Text(v) => Self::Text(gather(v, shape, picks)),
        }
    }
}

/// JSON number for a float, `null` for non-finite values.
pub fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// A coordinate variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub name: String,
    pub dims: Vec<String>,
    pub values: CoordValues,
    pub attrs: Attrs,
}

impl Coordinate {
    /// Create a coordinate over the given dimensions.
    pub fn new(name: impl Into<String>, dims: Vec<String>, values: CoordValues) -> Self {
        Self {
            name: name.into(),
            dims,
            values,
            attrs: Attrs::new(),
        }
    }

    /// Create an index coordinate (a coordinate named after its only dimension).
    pub fn index(name: impl Into<String>, values: CoordValues) -> Self {
        let name = name.into();
        Self::new(name.clone(), vec![name], values)
    }

    /// Set an attribute.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Whether this coordinate indexes its own dimension.
    pub fn is_index(&self) -> bool {
        self.dims.len() == 1 && self.dims[0] == self.name
    }

    /// The `units` attribute.
    pub fn units(&self) -> Option<&str> {
        self.attrs.get("units").and_then(Value::as_str)
    }

    /// First label.
    pub fn first(&self) -> Option<Value> {
        self.values.label(0)
    }

    /// Last label.
    pub fn last(&self) -> Option<Value> {
        self.values.label(self.values.len().checked_sub(1)?)
    }
}

/// A data variable.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: Vec<f64>,
    pub dtype: DataKind,
    pub attrs: Attrs,
}

impl DataVariable {
    /// Create a data variable.
    pub fn new(name: impl Into<String>, dims: Vec<String>, data: Vec<f64>, dtype: DataKind) -> Self {
        Self {
            name: name.into(),
            dims,
            data,
            dtype,
            attrs: Attrs::new(),
        }
    }

    /// Set an attribute.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// A string attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

/// A labeled N-dimensional dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    /// Dimension names and sizes, in order.
    pub dims: Vec<(String, usize)>,
    pub coords: Vec<Coordinate>,
    pub data_vars: Vec<DataVariable>,
    pub attrs: Attrs,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension.
    pub fn with_dim(mut self, name: impl Into<String>, len: usize) -> Self {
        let name = name.into();
        match self.dims.iter_mut().find(|(n, _)| *n == name) {
            Some(dim) => dim.1 = len,
            None => self.dims.push((name, len)),
        }
        self
    }

    /// Add a coordinate. Index coordinates declare their dimension.
    pub fn with_coord(mut self, coord: Coordinate) -> Self {
        if coord.is_index() && self.sizes(&coord.name).is_none() {
            self.dims.push((coord.name.clone(), coord.values.len()));
        }
        self.coords.retain(|c| c.name != coord.name);
        self.coords.push(coord);
        self
    }

    /// Add a data variable.
    pub fn with_variable(mut self, var: DataVariable) -> Self {
        self.data_vars.retain(|v| v.name != var.name);
        self.data_vars.push(var);
        self
    }

    /// Set a dataset attribute.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Size of a dimension.
    pub fn sizes(&self, dim: &str) -> Option<usize> {
        self.dims.iter().find(|(n, _)| n == dim).map(|(_, len)| *len)
    }

    /// Dimension names in order.
    pub fn dim_names(&self) -> Vec<&str> {
        self.dims.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a coordinate.
    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.iter().find(|c| c.name == name)
    }

    /// Look up a data variable.
    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.data_vars.iter().find(|v| v.name == name)
    }

    /// Whether `name` is a coordinate.
    pub fn is_coord(&self, name: &str) -> bool {
        self.coord(name).is_some()
    }

    /// All variable names: data variables first, then coordinates.
    pub fn variables(&self) -> Vec<&str> {
        self.data_vars
            .iter()
            .map(|v| v.name.as_str())
            .chain(self.coords.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Dimensions of a data variable or coordinate.
    pub fn dims_of(&self, name: &str) -> Option<&[String]> {
        self.variable(name)
            .map(|v| v.dims.as_slice())
            .or_else(|| self.coord(name).map(|c| c.dims.as_slice()))
    }

    /// Attributes of a data variable or coordinate.
    pub fn attrs_of(&self, name: &str) -> Option<&Attrs> {
        self.variable(name)
            .map(|v| &v.attrs)
            .or_else(|| self.coord(name).map(|c| &c.attrs))
    }

    /// Shape of the given dimensions (unknown dimensions count as 1).
    pub fn shape_of(&self, dims: &[String]) -> Vec<usize> {
        dims.iter().map(|d| self.sizes(d).unwrap_or(1)).collect()
    }

    /// Check that every variable's buffer matches its dimensions.
    pub fn validate(&self) -> Result<()> {
        for coord in &self.coords {
            self.check_len(&coord.name, &coord.dims, coord.values.len())?;
        }
        for var in &self.data_vars {
            self.check_len(&var.name, &var.dims, var.data.len())?;
        }
        Ok(())
    }

    fn check_len(&self, name: &str, dims: &[String], len: usize) -> Result<()> {
        let mut expected = 1usize;
        for dim in dims {
            expected *= self
                .sizes(dim)
                .ok_or_else(|| GridError::MissingDimension(format!("{} (used by {})", dim, name)))?;
        }
        if expected != len {
            return Err(GridError::InvalidData(format!(
                "{} holds {} values but its dimensions {:?} require {}",
                name, len, dims, expected
            )));
        }
        Ok(())
    }
}

/// Select `picks[d]` positions along each axis of a row-major buffer.
pub(crate) fn gather<T: Clone>(values: &[T], shape: &[usize], picks: &[Vec<usize>]) -> Vec<T> {
    let out_len: usize = picks.iter().map(Vec::len).product();
    let mut out = Vec::with_capacity(out_len);
    if out_len == 0 {
        return out;
    }

    let strides = strides(shape);
    let mut counter = vec![0usize; shape.len()];
    loop {
        let offset: usize = counter
            .iter()
            .enumerate()
            .map(|(d, &c)| picks[d][c] * strides[d])
            .sum();
        if let Some(v) = values.get(offset) {
            out.push(v.clone());
        }

        let mut d = counter.len();
        loop {
            if d == 0 {
                return out;
            }
            d -= 1;
            counter[d] += 1;
            if counter[d] < picks[d].len() {
                break;
            }
            counter[d] = 0;
        }
    }
}

/// Re-order a row-major buffer. `axes[k]` names the source axis of output
/// axis `k`; `None` inserts a length-1 axis.
pub(crate) fn permute<T: Clone>(values: &[T], shape: &[usize], axes: &[Option<usize>]) -> Vec<T> {
    let src_strides = strides(shape);
    let out_shape: Vec<usize> = axes.iter().map(|a| a.map_or(1, |s| shape[s])).collect();
    let out_strides: Vec<usize> = axes.iter().map(|a| a.map_or(0, |s| src_strides[s])).collect();

    let out_len: usize = out_shape.iter().product();
    let mut out = Vec::with_capacity(out_len);
    if out_len == 0 {
        return out;
    }

    let mut counter = vec![0usize; out_shape.len()];
    loop {
        let offset: usize = counter.iter().zip(&out_strides).map(|(c, s)| c * s).sum();
        if let Some(v) = values.get(offset) {
            out.push(v.clone());
        }

        let mut d = counter.len();
        loop {
            if d == 0 {
                return out;
            }
            d -= 1;
            counter[d] += 1;
            if counter[d] < out_shape[d] {
                break;
            }
            counter[d] = 0;
        }
    }
}

fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    strides
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_2d() {
        // 2 x 3 grid: [[0, 1, 2], [3, 4, 5]]
        let values: Vec<f64> = (0..6).map(|v| v as f64).collect();
        let out = gather(&values, &[2, 3], &[vec![1], vec![0, 2]]);
        assert_eq!(out, vec![3.0, 5.0]);

        let empty = gather(&values, &[2, 3], &[vec![], vec![0, 1, 2]]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_gather_scalar() {
        let out = gather(&[7.0], &[], &[]);
        assert_eq!(out, vec![7.0]);
    }

    #[test]
    fn test_permute_transposes() {
        // shape [2, 3] -> [3, 2]
        let values: Vec<f64> = (0..6).map(|v| v as f64).collect();
        let out = permute(&values, &[2, 3], &[Some(1), Some(0)]);
        assert_eq!(out, vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);

        let padded = permute(&values, &[2, 3], &[Some(0), Some(1), None]);
        assert_eq!(padded, values);
    }

    #[test]
    fn test_validate_detects_bad_lengths() {
        let ds = Dataset::new()
            .with_coord(Coordinate::index("x", CoordValues::Numeric(vec![0.0, 1.0])))
            .with_variable(DataVariable::new("v", vec!["x".into()], vec![1.0], DataKind::Float32));
        assert!(matches!(ds.validate(), Err(GridError::InvalidData(_))));
    }

    #[test]
    fn test_coord_labels() {
        let coord = Coordinate::index("lat", CoordValues::Numeric(vec![10.0, 5.0, 0.0]))
            .with_attr("units", "degrees_north");
        assert!(coord.values.is_descending());
        assert_eq!(coord.first(), Some(serde_json::json!(10.0)));
        assert_eq!(coord.last(), Some(serde_json::json!(0.0)));
        assert_eq!(coord.units(), Some("degrees_north"));
    }

    #[test]
    fn test_data_kind_names() {
        assert_eq!(DataKind::from_name("Float32"), Some(DataKind::Float32));
        assert_eq!(DataKind::Int16.covjson_type(), "integer");
        assert_eq!(DataKind::Float64.to_string(), "float64");
        assert!(DataKind::from_name("complex64").is_none());
    }
}
