//! Label-based selection on [`Dataset`]s.
//!
//! Semantics follow the usual labeled-array conventions:
//! - slices are inclusive on both ends and follow the orientation of the
//!   index, so on a descending index `Slice { start: 10, stop: 0 }` selects
//!   labels from 10 down to 0 while `Slice { start: 0, stop: 10 }` selects
//!   nothing;
//! - scalar selectors (`Exact`, `Nearest`, `TimeExact`, `Index`) drop the
//!   dimension and keep the coordinate as a scalar;
//! - list, slice and date selectors keep the dimension.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::dataset::{gather, permute, CoordValues, DataKind, Dataset};
use crate::error::{GridError, Result};

/// A selection along one dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// The label equal to the value.
    Exact(f64),
    /// The label closest to the value.
    Nearest(f64),
    /// The closest label for each value (keeps the dimension).
    NearestMany(Vec<f64>),
    /// Labels within an inclusive range; open ends are unbounded.
    Slice { start: Option<f64>, stop: Option<f64> },
    /// The timestamp equal to the value.
    TimeExact(DateTime<Utc>),
    /// Timestamps within an inclusive range.
    TimeSlice {
        start: Option<DateTime<Utc>>,
        stop: Option<DateTime<Utc>>,
    },
    /// Every timestamp on the given calendar date.
    DateEquals(NaiveDate),
    /// A position along the dimension.
    Index(usize),
    /// Several positions along the dimension (keeps the dimension).
    Indices(Vec<usize>),
}

impl Selector {
    /// Inclusive slice between two labels.
    pub fn slice(start: f64, stop: f64) -> Self {
        Self::Slice {
            start: Some(start),
            stop: Some(stop),
        }
    }

    /// Inclusive slice between two timestamps.
    pub fn time_slice(start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        Self::TimeSlice {
            start: Some(start),
            stop: Some(stop),
        }
    }

    fn drops_dimension(&self) -> bool {
        matches!(
            self,
            Self::Exact(_) | Self::Nearest(_) | Self::TimeExact(_) | Self::Index(_)
        )
    }

    fn describe(&self) -> String {
        match self {
            Self::Exact(v) | Self::Nearest(v) => v.to_string(),
            Self::NearestMany(v) => format!("{:?}", v),
            Self::Slice { start, stop } => format!("{:?}..{:?}", start, stop),
            Self::TimeExact(t) => t.to_rfc3339(),
            Self::TimeSlice { start, stop } => format!("{:?}..{:?}", start, stop),
            Self::DateEquals(d) => d.to_string(),
            Self::Index(i) => format!("#{}", i),
            Self::Indices(v) => format!("#{:?}", v),
        }
    }
}

struct DimPick {
    positions: Vec<usize>,
    drop: bool,
}

impl Dataset {
    /// Select by labels along one or more dimensions.
    pub fn sel(&self, selections: &[(&str, Selector)]) -> Result<Dataset> {
        let mut picks: BTreeMap<String, DimPick> = BTreeMap::new();
        for (dim, selector) in selections {
            if self.sizes(dim).is_none() {
                return Err(GridError::MissingDimension(dim.to_string()));
            }
            if picks.contains_key(*dim) {
                return Err(GridError::invalid_selector(*dim, "dimension selected twice"));
            }
            let positions = self.positions(dim, selector)?;
            tracing::trace!(dim = %dim, selector = %selector.describe(), count = positions.len(), "Resolved selector");
            picks.insert(
                dim.to_string(),
                DimPick {
                    positions,
                    drop: selector.drops_dimension(),
                },
            );
        }
        Ok(self.take(&picks))
    }

    /// Keep the named variables and the coordinates that describe them.
    pub fn select_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset> {
        let mut data_vars = Vec::new();
        let mut used_dims: HashSet<&str> = HashSet::new();
        for name in names {
            let name = name.as_ref();
            if let Some(var) = self.variable(name) {
                used_dims.extend(var.dims.iter().map(String::as_str));
                data_vars.push(var.clone());
            } else if let Some(coord) = self.coord(name) {
                used_dims.extend(coord.dims.iter().map(String::as_str));
            } else {
                return Err(GridError::MissingVariable(name.to_string()));
            }
        }

        let coords = self
            .coords
            .iter()
            .filter(|c| c.dims.iter().all(|d| used_dims.contains(d.as_str())))
            .cloned()
            .collect();
        let dims = self
            .dims
            .iter()
            .filter(|(d, _)| used_dims.contains(d.as_str()))
            .cloned()
            .collect();

        Ok(Dataset {
            dims,
            coords,
            data_vars,
            attrs: self.attrs.clone(),
        })
    }

    /// Values of a data variable re-ordered to `order`.
    ///
    /// Dimensions in `order` that the variable lacks are treated as length 1.
    pub fn transpose_values(&self, name: &str, order: &[&str]) -> Result<Vec<f64>> {
        let var = self
            .variable(name)
            .ok_or_else(|| GridError::MissingVariable(name.to_string()))?;

        if let Some(extra) = var.dims.iter().find(|d| !order.contains(&d.as_str())) {
            return Err(GridError::InvalidData(format!(
                "{} has dimension {} outside of {:?}",
                name, extra, order
            )));
        }

        let shape = self.shape_of(&var.dims);
        let axes: Vec<Option<usize>> = order
            .iter()
            .map(|o| var.dims.iter().position(|d| d == o))
            .collect();
        Ok(permute(&var.data, &shape, &axes))
    }

    /// Widen `float32` data variables to `float64`, keeping attributes.
    pub fn to_float64(mut self) -> Self {
        for var in &mut self.data_vars {
            if var.dtype == DataKind::Float32 {
                var.dtype = DataKind::Float64;
            }
        }
        self
    }

    fn positions(&self, dim: &str, selector: &Selector) -> Result<Vec<usize>> {
        let len = self.sizes(dim).unwrap_or(0);
        if let Selector::Index(i) = selector {
            return if *i < len {
                Ok(vec![*i])
            } else {
                Err(GridError::label_not_found(dim, selector.describe()))
            };
        }
        if let Selector::Indices(indices) = selector {
            if let Some(i) = indices.iter().find(|i| **i >= len) {
                return Err(GridError::label_not_found(dim, format!("#{}", i)));
            }
            return Ok(indices.clone());
        }

        let index = self
            .coord(dim)
            .filter(|c| c.is_index())
            .ok_or_else(|| GridError::invalid_selector(dim, "dimension has no index coordinate"))?;

        let positions = match (&index.values, selector) {
            (CoordValues::Numeric(labels), Selector::Exact(v)) => {
                let tolerance = 1e-9 * v.abs().max(1.0);
                labels
                    .iter()
                    .position(|l| (l - v).abs() <= tolerance)
                    .map(|p| vec![p])
                    .unwrap_or_default()
            }
            (CoordValues::Numeric(labels), Selector::Nearest(v)) => {
                nearest(labels, *v).map(|p| vec![p]).unwrap_or_default()
            }
            (CoordValues::Numeric(labels), Selector::NearestMany(values)) => {
                let mut out = Vec::with_capacity(values.len());
                for v in values {
                    out.push(nearest(labels, *v).ok_or_else(|| GridError::label_not_found(dim, v))?);
                }
                return Ok(out);
            }
            (CoordValues::Numeric(labels), Selector::Slice { start, stop }) => {
                return Ok(slice_positions(labels, start.as_ref(), stop.as_ref()));
            }
            (CoordValues::Time(labels), Selector::TimeExact(t)) => labels
                .iter()
                .position(|l| l == t)
                .map(|p| vec![p])
                .unwrap_or_default(),
            (CoordValues::Time(labels), Selector::TimeSlice { start, stop }) => {
                return Ok(slice_positions(labels, start.as_ref(), stop.as_ref()));
            }
            (CoordValues::Time(labels), Selector::DateEquals(date)) => labels
                .iter()
                .enumerate()
                .filter(|(_, l)| l.date_naive() == *date)
                .map(|(i, _)| i)
                .collect(),
            _ => {
                return Err(GridError::invalid_selector(
                    dim,
                    format!("{:?} does not apply to this index", selector),
                ))
            }
        };

        if positions.is_empty() {
            return Err(GridError::label_not_found(dim, selector.describe()));
        }
        Ok(positions)
    }

    fn take(&self, picks: &BTreeMap<String, DimPick>) -> Dataset {
        let axis_picks = |dims: &[String]| -> Vec<Vec<usize>> {
            dims.iter()
                .map(|d| match picks.get(d) {
                    Some(pick) => pick.positions.clone(),
                    None => (0..self.sizes(d).unwrap_or(1)).collect(),
                })
                .collect()
        };
        let kept_dims = |dims: &[String]| -> Vec<String> {
            dims.iter()
                .filter(|d| !picks.get(*d).map_or(false, |p| p.drop))
                .cloned()
                .collect()
        };

        let dims = self
            .dims
            .iter()
            .filter_map(|(name, len)| match picks.get(name) {
                Some(pick) if pick.drop => None,
                Some(pick) => Some((name.clone(), pick.positions.len())),
                None => Some((name.clone(), *len)),
            })
            .collect();

        let coords = self
            .coords
            .iter()
            .map(|c| {
                let shape = self.shape_of(&c.dims);
                let mut coord = c.clone();
                coord.values = c.values.gather(&shape, &axis_picks(&c.dims));
                coord.dims = kept_dims(&c.dims);
                coord
            })
            .collect();

        let data_vars = self
            .data_vars
            .iter()
            .map(|v| {
                let shape = self.shape_of(&v.dims);
                let mut var = v.clone();
                var.data = gather(&v.data, &shape, &axis_picks(&v.dims));
                var.dims = kept_dims(&v.dims);
                var
            })
            .collect();

        Dataset {
            dims,
            coords,
            data_vars,
            attrs: self.attrs.clone(),
        }
    }
}

fn nearest(labels: &[f64], value: f64) -> Option<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_nan())
        .min_by(|(_, a), (_, b)| {
            (*a - value)
                .abs()
                .partial_cmp(&(*b - value).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

fn slice_positions<T: PartialOrd>(labels: &[T], start: Option<&T>, stop: Option<&T>) -> Vec<usize> {
    let descending = labels.len() > 1 && labels[0] > labels[labels.len() - 1];
    labels
        .iter()
        .enumerate()
        .filter(|(_, v)| {
            if descending {
                start.map_or(true, |s| *v <= s) && stop.map_or(true, |e| *v >= e)
            } else {
                start.map_or(true, |s| *v >= s) && stop.map_or(true, |e| *v <= e)
            }
        })
        .map(|(i, _)| i)
        .collect()
}
