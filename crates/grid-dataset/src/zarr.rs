//! Zarr V3 group reading and writing.
//!
//! A dataset maps to a Zarr group with one array per variable. Dimension
//! names are kept in the `_ARRAY_DIMENSIONS` attribute (falling back to the
//! V3 `dimension_names` metadata), non-index coordinates are listed in the
//! `coordinates` attribute of data variables, and time coordinates are
//! stored as CF-encoded offsets.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;

use crate::dataset::{Attrs, CoordValues, Coordinate, DataKind, DataVariable, Dataset};
use crate::error::{GridError, Result};
use crate::time::{encode_cf_times, CfTimeUnits, CF_WRITE_UNITS};

const DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";

/// An array node found in a group, before classification.
pub(crate) struct RawArray {
    pub(crate) name: String,
    pub(crate) dims: Vec<String>,
    pub(crate) shape: Vec<usize>,
    pub(crate) dtype: DataKind,
    pub(crate) data: Vec<f64>,
    pub(crate) attrs: Attrs,
}

/// Read a Zarr V3 group from a directory.
pub fn read_zarr(path: &Path) -> Result<Dataset> {
    let group_meta = read_node_metadata(&path.join("zarr.json")).map_err(|_| {
        GridError::Unsupported(format!(
            "{} is not a Zarr V3 group (missing zarr.json)",
            path.display()
        ))
    })?;
    let store = Arc::new(
        FilesystemStore::new(path).map_err(|e| GridError::open_failed(e.to_string()))?,
    );

    let mut raw = Vec::new();
    for entry in WalkDir::new(path).min_depth(2).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| GridError::open_failed(e.to_string()))?;
        if entry.file_name() != "zarr.json" {
            continue;
        }
        let meta = read_node_metadata(entry.path())?;
        if meta.get("node_type").and_then(Value::as_str) != Some("array") {
            continue;
        }
        let Some(name) = entry
            .path()
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
        else {
            continue;
        };
        raw.push(read_array(store.clone(), name, &meta)?);
    }

    let attrs = group_meta
        .get("attributes")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    debug!(path = %path.display(), arrays = raw.len(), "Read Zarr group");
    assemble(raw, attrs)
}

fn read_node_metadata(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn read_array<S: ReadableStorageTraits + 'static>(
    store: Arc<S>,
    name: &str,
    meta: &Value,
) -> Result<RawArray> {
    let array = Array::open(store, &format!("/{}", name))
        .map_err(|e| GridError::open_failed(format!("{}: {}", name, e)))?;

    let type_name = meta.get("data_type").and_then(Value::as_str).unwrap_or_default();
    let dtype = DataKind::from_name(type_name)
        .ok_or_else(|| GridError::Unsupported(format!("{}: data type {}", name, type_name)))?;

    let subset = array.subset_all();
    macro_rules! retrieve_as_f64 {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(&subset)
                .map(|v| v.into_iter().map(|x| x as f64).collect::<Vec<f64>>())
        };
    }
    let data = match dtype {
        DataKind::Int8 => retrieve_as_f64!(i8),
        DataKind::Int16 => retrieve_as_f64!(i16),
        DataKind::Int32 => retrieve_as_f64!(i32),
        DataKind::Int64 => retrieve_as_f64!(i64),
        DataKind::UInt8 => retrieve_as_f64!(u8),
        DataKind::UInt16 => retrieve_as_f64!(u16),
        DataKind::UInt32 => retrieve_as_f64!(u32),
        DataKind::UInt64 => retrieve_as_f64!(u64),
        DataKind::Float32 => retrieve_as_f64!(f32),
        DataKind::Float64 => retrieve_as_f64!(f64),
    }
    .map_err(|e| GridError::read_failed(format!("{}: {}", name, e)))?;

    let mut attrs = array.attributes().clone();
    let dims = match attrs.remove(DIMENSIONS_ATTR) {
        Some(value) => string_list(&value),
        None => meta
            .get("dimension_names")
            .map(string_list)
            .unwrap_or_default(),
    };

    let shape = array.shape();
    let scalar = dims.is_empty() && shape.iter().product::<u64>() == 1;
    if !scalar && dims.len() != shape.len() {
        return Err(GridError::InvalidData(format!(
            "{}: {} dimension names for a {}-dimensional array",
            name,
            dims.len(),
            shape.len()
        )));
    }

    let (data, dtype) = mask_and_scale(data, dtype, &mut attrs);
    Ok(RawArray {
        name: name.to_string(),
        shape: if scalar { Vec::new() } else { shape.iter().map(|&n| n as usize).collect() },
        dims,
        dtype,
        data,
        attrs,
    })
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Apply CF `_FillValue` / `missing_value` masking and `scale_factor` /
/// `add_offset` unpacking.
pub(crate) fn mask_and_scale(mut data: Vec<f64>, dtype: DataKind, attrs: &mut Attrs) -> (Vec<f64>, DataKind) {
    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|k| attrs.remove(*k))
        .filter_map(|v| v.as_f64())
        .collect();
    if !fills.is_empty() {
        for v in data.iter_mut() {
            if fills.contains(v) {
                *v = f64::NAN;
            }
        }
    }

    let scale = attrs.remove("scale_factor").and_then(|v| v.as_f64());
    let offset = attrs.remove("add_offset").and_then(|v| v.as_f64());
    if scale.is_none() && offset.is_none() {
        return (data, if fills.is_empty() || dtype.is_float() { dtype } else { DataKind::Float64 });
    }
    let (scale, offset) = (scale.unwrap_or(1.0), offset.unwrap_or(0.0));
    for v in data.iter_mut() {
        *v = *v * scale + offset;
    }
    (data, DataKind::Float64)
}

/// Sort raw arrays into dimensions, coordinates and data variables.
pub(crate) fn assemble(raw: Vec<RawArray>, attrs: Attrs) -> Result<Dataset> {
    let mut ds = Dataset::new();
    ds.attrs = attrs;

    let mut coord_names: Vec<String> = Vec::new();
    for array in &raw {
        if let Some(listed) = array.attrs.get("coordinates").and_then(Value::as_str) {
            coord_names.extend(listed.split_whitespace().map(str::to_string));
        }
    }

    // Dimension sizes come from the arrays that span them.
    for array in &raw {
        for (dim, &len) in array.dims.iter().zip(&array.shape) {
            match ds.sizes(dim) {
                Some(existing) if existing != len => {
                    return Err(GridError::InvalidData(format!(
                        "dimension {} has conflicting sizes {} and {}",
                        dim, existing, len
                    )));
                }
                Some(_) => {}
                None => ds = ds.with_dim(dim.clone(), len),
            }
        }
    }

    for mut array in raw {
        let is_index = array.dims.len() == 1 && array.dims[0] == array.name;
        if is_index || coord_names.contains(&array.name) {
            let values = match array
                .attrs
                .get("units")
                .and_then(Value::as_str)
                .and_then(CfTimeUnits::parse)
            {
                Some(units) => match units.decode(&array.data) {
                    Ok(times) => {
                        array.attrs.remove("units");
                        array.attrs.remove("calendar");
                        CoordValues::Time(times)
                    }
                    Err(e) => {
                        warn!(coordinate = %array.name, error = %e, "Keeping undecodable time coordinate as numbers");
                        CoordValues::Numeric(array.data)
                    }
                },
                None => CoordValues::Numeric(array.data),
            };
            let mut coord = Coordinate::new(array.name, array.dims, values);
            coord.attrs = array.attrs;
            ds.coords.push(coord);
        } else {
            array.attrs.remove("coordinates");
            let mut var = DataVariable::new(array.name, array.dims, array.data, array.dtype);
            var.attrs = array.attrs;
            ds.data_vars.push(var);
        }
    }

    ds.validate()?;
    Ok(ds)
}

/// Write a dataset as a Zarr V3 group.
///
/// Time coordinates are written as seconds since the Unix epoch; text
/// coordinates are not representable and are skipped.
pub fn write_zarr(ds: &Dataset, path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(
        FilesystemStore::new(path).map_err(|e| GridError::write_failed(e.to_string()))?,
    );

    let group = GroupBuilder::new()
        .attributes(ds.attrs.clone())
        .build(store.clone(), "/")
        .map_err(|e| GridError::write_failed(e.to_string()))?;
    group
        .store_metadata()
        .map_err(|e| GridError::write_failed(e.to_string()))?;

    let aux_coords: Vec<&str> = ds
        .coords
        .iter()
        .filter(|c| !c.is_index())
        .map(|c| c.name.as_str())
        .collect();

    for coord in &ds.coords {
        let mut attrs = coord.attrs.clone();
        let data = match &coord.values {
            CoordValues::Numeric(v) => v.clone(),
            CoordValues::Time(t) => {
                attrs.insert("units".to_string(), json!(CF_WRITE_UNITS));
                attrs.insert("calendar".to_string(), json!("proleptic_gregorian"));
                encode_cf_times(t)
            }
            CoordValues::Text(_) => {
                warn!(coordinate = %coord.name, "Skipping text coordinate in Zarr output");
                continue;
            }
        };
        write_array(&store, ds, &coord.name, &coord.dims, &data, DataKind::Float64, attrs)?;
    }

    for var in &ds.data_vars {
        let mut attrs = var.attrs.clone();
        let related: Vec<&str> = aux_coords
            .iter()
            .copied()
            .filter(|c| {
                ds.coord(c)
                    .map_or(false, |coord| coord.dims.iter().all(|d| var.dims.contains(d)))
            })
            .collect();
        if !related.is_empty() {
            attrs.insert("coordinates".to_string(), json!(related.join(" ")));
        }
        write_array(&store, ds, &var.name, &var.dims, &var.data, var.dtype, attrs)?;
    }

    debug!(path = %path.display(), "Wrote Zarr group");
    Ok(())
}

fn write_array(
    store: &Arc<FilesystemStore>,
    ds: &Dataset,
    name: &str,
    dims: &[String],
    data: &[f64],
    dtype: DataKind,
    mut attrs: Attrs,
) -> Result<()> {
    attrs.insert(DIMENSIONS_ATTR.to_string(), json!(dims));

    // Scalars are stored as a single-element array with no dimension names.
    let shape: Vec<u64> = if dims.is_empty() {
        vec![1]
    } else {
        ds.shape_of(dims).iter().map(|&n| n as u64).collect()
    };
    let chunk_shape: Vec<u64> = shape.iter().map(|&n| n.max(1)).collect();
    let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
        .try_into()
        .map_err(|e| GridError::write_failed(format!("{}: {:?}", name, e)))?;

    let (data_type, fill_value) = if dtype == DataKind::Float32 {
        (DataType::Float32, FillValue::from(f32::NAN))
    } else {
        (DataType::Float64, FillValue::from(f64::NAN))
    };

    let array = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value)
        .attributes(attrs)
        .build(store.clone(), &format!("/{}", name))
        .map_err(|e| GridError::write_failed(format!("{}: {}", name, e)))?;
    array
        .store_metadata()
        .map_err(|e| GridError::write_failed(format!("{}: {}", name, e)))?;

    if shape.iter().any(|&n| n == 0) {
        return Ok(());
    }

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
        .map_err(|e| GridError::write_failed(format!("{}: {}", name, e)))?;
    let stored = if dtype == DataKind::Float32 {
        let narrowed: Vec<f32> = data.iter().map(|&v| v as f32).collect();
        array.store_array_subset_elements(&subset, &narrowed)
    } else {
        array.store_array_subset_elements(&subset, data)
    };
    stored.map_err(|e| GridError::write_failed(format!("{}: {}", name, e)))
}
