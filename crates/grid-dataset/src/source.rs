//! Dataset sources and native-format output.

use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::dataset::Dataset;
use crate::error::{GridError, Result};
use crate::zarr::{read_zarr, write_zarr};

/// Open a dataset from a path.
///
/// `*.zarr` directories are read as Zarr V3 groups; any other path is read
/// as NetCDF. Multi-file globs and object-store URLs are not supported.
pub fn open_dataset(path: &str) -> Result<Dataset> {
    if path.starts_with("s3://") {
        return Err(GridError::Unsupported(format!("object storage source {}", path)));
    }
    if path.contains('*') {
        return Err(GridError::Unsupported(format!("multi-file dataset {}", path)));
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.ends_with(".zarr") {
        debug!(path = %path, "Opening Zarr dataset");
        return read_zarr(Path::new(trimmed));
    }
    debug!(path = %path, "Opening NetCDF dataset");
    open_netcdf(Path::new(path))
}

#[cfg(feature = "netcdf")]
fn open_netcdf(path: &Path) -> Result<Dataset> {
    crate::nc::read_netcdf(path)
}

#[cfg(not(feature = "netcdf"))]
fn open_netcdf(path: &Path) -> Result<Dataset> {
    Err(GridError::Unsupported(format!(
        "{}: NetCDF support is not enabled in this build",
        path.display()
    )))
}

/// Decode an in-memory NetCDF payload.
pub fn netcdf_from_bytes(bytes: &[u8]) -> Result<Dataset> {
    #[cfg(feature = "netcdf")]
    {
        crate::nc::read_netcdf_bytes(bytes)
    }
    #[cfg(not(feature = "netcdf"))]
    {
        Err(GridError::Unsupported(format!(
            "NetCDF payload of {} bytes: NetCDF support is not enabled in this build",
            bytes.len()
        )))
    }
}

/// Encode a dataset as NetCDF bytes.
pub fn netcdf_bytes(ds: &Dataset) -> Result<Vec<u8>> {
    #[cfg(feature = "netcdf")]
    {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data.nc");
        crate::nc::write_netcdf(ds, &path)?;
        Ok(std::fs::read(path)?)
    }
    #[cfg(not(feature = "netcdf"))]
    {
        Err(GridError::Unsupported(format!(
            "NetCDF output of {} variables: NetCDF support is not enabled in this build",
            ds.data_vars.len()
        )))
    }
}

/// Raw bytes of a source: a zipped directory for Zarr, the file otherwise.
pub fn native_bytes(path: &str) -> Result<Vec<u8>> {
    let source = Path::new(path.trim_end_matches('/'));
    if source.is_dir() {
        zip_directory(source)
    } else {
        Ok(std::fs::read(source)?)
    }
}

/// Write a dataset to a temporary Zarr group and return it zipped.
pub fn zarr_zip_bytes(ds: &Dataset) -> Result<Vec<u8>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.zarr");
    write_zarr(ds, &path)?;
    zip_directory(&path)
}

/// Zip a directory. Entries keep the directory's own name as prefix
/// (`data.zarr/zarr.json`, `data.zarr/SST/c/0/0/0`, ...).
pub fn zip_directory(dir: &Path) -> Result<Vec<u8>> {
    let prefix = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| GridError::InvalidData(format!("{} has no directory name", dir.display())))?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| GridError::read_failed(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| GridError::read_failed(e.to_string()))?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let name = format!("{}/{}", prefix, parts.join("/"));

        zip.start_file::<_, ()>(
            name,
            FileOptions::default().compression_method(CompressionMethod::Deflated),
        )?;
        zip.write_all(&std::fs::read(entry.path())?)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CoordValues, Coordinate, DataKind, DataVariable};
    use std::io::Read;

    #[test]
    fn test_rejects_unsupported_sources() {
        assert!(matches!(open_dataset("s3://bucket/data.zarr"), Err(GridError::Unsupported(_))));
        assert!(matches!(open_dataset("/data/*.nc"), Err(GridError::Unsupported(_))));
    }

    #[test]
    fn test_native_bytes_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.nc");
        std::fs::write(&path, b"CDF\x01").unwrap();
        assert_eq!(native_bytes(path.to_str().unwrap()).unwrap(), b"CDF\x01");
    }

    #[test]
    fn test_zarr_zip_contains_group_metadata() {
        let ds = Dataset::new()
            .with_coord(Coordinate::index("x", CoordValues::Numeric(vec![0.0, 1.0])))
            .with_variable(DataVariable::new("v", vec!["x".into()], vec![1.0, 2.0], DataKind::Float64));

        let bytes = zarr_zip_bytes(&ds).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut group = String::new();
        archive
            .by_name("data.zarr/zarr.json")
            .unwrap()
            .read_to_string(&mut group)
            .unwrap();
        assert!(group.contains("\"group\""));
        assert!(archive.by_name("data.zarr/v/zarr.json").is_ok());
    }
}
