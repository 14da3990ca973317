//! NetCDF reading and writing through the netCDF-C library.

use std::io::Write;
use std::path::Path;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use serde_json::{json, Value};
use tracing::debug;

use crate::dataset::{Attrs, CoordValues, DataKind, Dataset};
use crate::error::{GridError, Result};
use crate::time::{encode_cf_times, CF_WRITE_UNITS};
use crate::zarr::{assemble, mask_and_scale, RawArray};

/// Read a NetCDF file.
pub fn read_netcdf(path: &Path) -> Result<Dataset> {
    let file = netcdf::open(path)
        .map_err(|e| GridError::open_failed(format!("{}: {}", path.display(), e)))?;

    let mut raw = Vec::new();
    for var in file.variables() {
        let name = var.name();
        let Some(dtype) = data_kind(&var.vartype()) else {
            debug!(variable = %name, "Skipping non-numeric NetCDF variable");
            continue;
        };
        let data: Vec<f64> = var
            .get_values::<f64, _>(..)
            .map_err(|e| GridError::read_failed(format!("{}: {}", name, e)))?;

        let mut attrs = Attrs::new();
        for attr in var.attributes() {
            if let Ok(value) = attr.value() {
                attrs.insert(attr.name().to_string(), attribute_json(value));
            }
        }

        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let (data, dtype) = mask_and_scale(data, dtype, &mut attrs);
        raw.push(RawArray {
            name,
            dims,
            shape,
            dtype,
            data,
            attrs,
        });
    }

    let mut attrs = Attrs::new();
    for attr in file.attributes() {
        if let Ok(value) = attr.value() {
            attrs.insert(attr.name().to_string(), attribute_json(value));
        }
    }

    debug!(path = %path.display(), variables = raw.len(), "Read NetCDF file");
    assemble(raw, attrs)
}

/// Read a NetCDF payload held in memory (e.g. a WCS response).
pub fn read_netcdf_bytes(bytes: &[u8]) -> Result<Dataset> {
    let mut file = tempfile::Builder::new().suffix(".nc").tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    read_netcdf(file.path())
}

/// Write a dataset as a NetCDF file.
pub fn write_netcdf(ds: &Dataset, path: &Path) -> Result<()> {
    let map_err = |e: netcdf::Error| GridError::write_failed(e.to_string());
    let mut file = netcdf::create(path).map_err(map_err)?;

    for (name, len) in &ds.dims {
        file.add_dimension(name, *len).map_err(map_err)?;
    }
    for (key, value) in &ds.attrs {
        if let Some(value) = attribute_value(value) {
            file.add_attribute(key, value).map_err(map_err)?;
        }
    }

    for coord in &ds.coords {
        let mut attrs = coord.attrs.clone();
        let data = match &coord.values {
            CoordValues::Numeric(v) => v.clone(),
            CoordValues::Time(t) => {
                attrs.insert("units".to_string(), json!(CF_WRITE_UNITS));
                encode_cf_times(t)
            }
            CoordValues::Text(_) => continue,
        };
        let dims: Vec<&str> = coord.dims.iter().map(String::as_str).collect();
        let mut var = file.add_variable::<f64>(&coord.name, &dims).map_err(map_err)?;
        for (key, value) in &attrs {
            if let Some(value) = attribute_value(value) {
                var.put_attribute(key, value).map_err(map_err)?;
            }
        }
        var.put_values(&data, ..).map_err(map_err)?;
    }

    for data_var in &ds.data_vars {
        let dims: Vec<&str> = data_var.dims.iter().map(String::as_str).collect();
        let mut var = file.add_variable::<f64>(&data_var.name, &dims).map_err(map_err)?;
        // The fill value has to be declared before any data is written.
        var.put_attribute("_FillValue", f64::NAN).map_err(map_err)?;
        for (key, value) in &data_var.attrs {
            if let Some(value) = attribute_value(value) {
                var.put_attribute(key, value).map_err(map_err)?;
            }
        }
        var.put_values(&data_var.data, ..).map_err(map_err)?;
    }

    Ok(())
}

fn data_kind(vartype: &NcVariableType) -> Option<DataKind> {
    Some(match vartype {
        NcVariableType::Int(IntType::I8) => DataKind::Int8,
        NcVariableType::Int(IntType::I16) => DataKind::Int16,
        NcVariableType::Int(IntType::I32) => DataKind::Int32,
        NcVariableType::Int(IntType::I64) => DataKind::Int64,
        NcVariableType::Int(IntType::U8) => DataKind::UInt8,
        NcVariableType::Int(IntType::U16) => DataKind::UInt16,
        NcVariableType::Int(IntType::U32) => DataKind::UInt32,
        NcVariableType::Int(IntType::U64) => DataKind::UInt64,
        NcVariableType::Float(FloatType::F32) => DataKind::Float32,
        NcVariableType::Float(FloatType::F64) => DataKind::Float64,
        _ => return None,
    })
}

fn attribute_json(value: AttributeValue) -> Value {
    match value {
        AttributeValue::Str(s) => json!(s),
        AttributeValue::Strs(v) => json!(v),
        AttributeValue::Double(v) => json!(v),
        AttributeValue::Doubles(v) => json!(v),
        AttributeValue::Float(v) => json!(v),
        AttributeValue::Floats(v) => json!(v),
        AttributeValue::Int(v) => json!(v),
        AttributeValue::Ints(v) => json!(v),
        AttributeValue::Short(v) => json!(v),
        AttributeValue::Shorts(v) => json!(v),
        AttributeValue::Longlong(v) => json!(v),
        AttributeValue::Longlongs(v) => json!(v),
        AttributeValue::Uchar(v) => json!(v),
        AttributeValue::Schar(v) => json!(v),
        _ => Value::Null,
    }
}

fn attribute_value(value: &Value) -> Option<AttributeValue> {
    match value {
        Value::String(s) => Some(AttributeValue::Str(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(AttributeValue::Longlong)
            .or_else(|| n.as_f64().map(AttributeValue::Double)),
        Value::Array(items) => {
            let numbers: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
            numbers.map(AttributeValue::Doubles)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;

    #[test]
    fn test_write_then_read_ocean_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocean.nc");
        let source = testdata::ocean_grid();
        write_netcdf(&source, &path).unwrap();

        let ds = read_netcdf(&path).unwrap();
        assert_eq!(ds.sizes("time"), Some(3));
        assert_eq!(ds.sizes("lat"), Some(4));
        assert_eq!(
            ds.coord("lat").and_then(|c| c.values.as_numeric()),
            Some(&testdata::GRID_LATS[..])
        );
        assert_eq!(
            ds.coord("time").and_then(|c| c.values.as_time()),
            source.coord("time").and_then(|c| c.values.as_time())
        );

        let temp = ds.variable("TEMP").unwrap();
        assert_eq!(temp.attr_str("units"), Some("degC"));
        assert!(temp.data[1].is_nan());
        assert_eq!(temp.data[2], 2.0);
    }

    #[test]
    fn test_read_garbage_bytes_fails() {
        assert!(read_netcdf_bytes(b"<ows:ExceptionReport/>").is_err());
    }
}
