//! Resource configuration for the EDR API.
//!
//! Each YAML file in the configuration directory describes one collection
//! and the provider serving it:
//!
//! ```yaml
//! id: ocean
//! title: Ocean model
//! description: Sea water temperature and salinity
//! keywords: [ocean, temperature]
//! provider:
//!   name: xarray-edr
//!   data: /data/ocean.zarr
//! ```
//!
//! A file named `server.yaml` holds the landing page metadata instead.

use anyhow::{bail, Context, Result};
use edr_providers::ProviderConfig;
use serde::Deserialize;
use std::path::Path;

/// Loaded API configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    pub server: ServerInfo,
    /// Resources in file name order.
    pub resources: Vec<ResourceConfig>,
}

/// Landing page metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
        }
    }
}

fn default_title() -> String {
    "EDR data server".to_string()
}

fn default_description() -> String {
    "OGC API - Environmental Data Retrieval and Coverages".to_string()
}

/// One collection and its provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Collection id; defaults to the file stem.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub provider: ProviderConfig,
}

impl ApiConfig {
    /// Load configuration from a directory of YAML files.
    pub fn load_from_dir(dir: &str) -> Result<Self> {
        let path = Path::new(dir);

        if !path.exists() {
            tracing::warn!("EDR config directory {} does not exist, serving no collections", dir);
            return Ok(Self::default());
        }

        let mut files = Vec::new();
        for entry in
            std::fs::read_dir(path).with_context(|| format!("Failed to read directory: {}", dir))?
        {
            let file_path = entry?.path();
            if matches!(
                file_path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                files.push(file_path);
            }
        }
        files.sort();

        let mut config = Self::default();
        for file_path in files {
            let content = std::fs::read_to_string(&file_path)
                .with_context(|| format!("Failed to read: {:?}", file_path))?;
            let file_name = file_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");

            if file_name == "server" {
                config.server = serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse server config: {:?}", file_path))?;
                continue;
            }

            let mut resource: ResourceConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse: {:?}", file_path))?;
            if resource.id.is_empty() {
                resource.id = file_name.to_string();
            }
            tracing::info!(
                collection = %resource.id,
                provider = resource.provider.name(),
                "Loaded resource from {:?}",
                file_path
            );
            config.add(resource)?;
        }

        Ok(config)
    }

    /// Add a resource, refusing duplicate collection ids.
    pub fn add(&mut self, resource: ResourceConfig) -> Result<()> {
        if self.resources.iter().any(|r| r.id == resource.id) {
            bail!("Duplicate collection id: {}", resource.id);
        }
        self.resources.push(resource);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_dir_is_empty() {
        let config = ApiConfig::load_from_dir("/nonexistent/edr").unwrap();
        assert!(config.resources.is_empty());
        assert_eq!(config.server.title, "EDR data server");
    }

    #[test]
    fn test_load_resources_and_server() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("wcs.yaml"),
            "title: Remote WCS\nprovider:\n  name: wcs-edr\n  base_url: http://localhost/wcs\n  layer: TEMP\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a_stations.yml"),
            "id: stations\nprovider:\n  name: xarray-edr-timeseries\n  data: /data/stations.zarr\n",
        )
        .unwrap();
        fs::write(dir.path().join("server.yaml"), "title: Fjord data\n").unwrap();
        fs::write(dir.path().join("README.md"), "not a resource").unwrap();

        let config = ApiConfig::load_from_dir(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.title, "Fjord data");
        let ids: Vec<_> = config.resources.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["stations", "wcs"]);
        assert_eq!(config.resources[1].provider.name(), "wcs-edr");
        assert_eq!(config.resources[1].title.as_deref(), Some("Remote WCS"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "id: ocean\nprovider:\n  name: wcs-edr\n  base_url: http://localhost/wcs\n";
        fs::write(dir.path().join("one.yaml"), yaml).unwrap();
        fs::write(dir.path().join("two.yaml"), yaml).unwrap();

        let err = ApiConfig::load_from_dir(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Duplicate collection id"));
    }

    #[test]
    fn test_unknown_provider_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.yaml"),
            "provider:\n  name: postgres\n  data: x\n",
        )
        .unwrap();
        assert!(ApiConfig::load_from_dir(dir.path().to_str().unwrap()).is_err());
    }
}
