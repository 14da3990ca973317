//! EDR Collection types.
//!
//! Collections represent the datasets exposed by configured providers.
//! A collection may offer coverage access, EDR queries, feature items,
//! or a combination of these.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::media_types;
use crate::parameters::Parameter;
use crate::types::{Extent, Link};

/// A list of collections available from the EDR API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionList {
    /// Links to related resources.
    pub links: Vec<Link>,

    /// The collections.
    pub collections: Vec<Collection>,
}

impl CollectionList {
    /// Create a new collection list.
    pub fn new(collections: Vec<Collection>, base_url: &str) -> Self {
        Self {
            links: vec![Link::new(format!("{}/collections", base_url), "self")
                .with_type(media_types::JSON)],
            collections,
        }
    }
}

/// An EDR collection representing a dataset or data source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    /// Unique identifier for the collection.
    pub id: String,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Detailed description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Keywords for discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    /// Links to related resources.
    pub links: Vec<Link>,

    /// Spatial and temporal extent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Extent>,

    /// Available query types and their links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_queries: Option<DataQueries>,

    /// Output formats supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_formats: Option<Vec<String>>,

    /// Parameters available in this collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_names: Option<BTreeMap<String, Parameter>>,
}

impl Collection {
    /// Create a new collection with required fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            keywords: None,
            links: Vec::new(),
            extent: None,
            data_queries: None,
            output_formats: None,
            parameter_names: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the keywords.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = Some(keywords);
        self
    }

    /// Set the extent.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Set the data queries.
    pub fn with_data_queries(mut self, queries: DataQueries) -> Self {
        self.data_queries = Some(queries);
        self
    }

    /// Set output formats.
    pub fn with_output_formats(mut self, formats: Vec<String>) -> Self {
        self.output_formats = Some(formats);
        self
    }

    /// Set parameters.
    pub fn with_parameters(mut self, params: BTreeMap<String, Parameter>) -> Self {
        self.parameter_names = Some(params);
        self
    }

    /// Build standard links for a collection.
    ///
    /// `coverage` and `items` add links to the coverage and feature
    /// endpoints respectively.
    pub fn build_links(&mut self, base_url: &str, coverage: bool, items: bool) {
        let collection_url = format!("{}/collections/{}", base_url, self.id);
        self.links = vec![
            Link::new(&collection_url, "self").with_type(media_types::JSON),
            Link::new(base_url, "root").with_type(media_types::JSON),
        ];

        if coverage {
            self.links.push(
                Link::new(format!("{}/coverage", collection_url), "http://www.opengis.net/def/rel/ogc/1.0/coverage")
                    .with_type(media_types::COVERAGE_JSON)
                    .with_title("Coverage data"),
            );
            self.links.push(
                Link::new(
                    format!("{}/coverage/domainset", collection_url),
                    "http://www.opengis.net/def/rel/ogc/1.0/coverage-domainset",
                )
                .with_type(media_types::JSON)
                .with_title("Coverage domain set"),
            );
            self.links.push(
                Link::new(
                    format!("{}/coverage/rangetype", collection_url),
                    "http://www.opengis.net/def/rel/ogc/1.0/coverage-rangetype",
                )
                .with_type(media_types::JSON)
                .with_title("Coverage range type"),
            );
        }

        if items {
            self.links.push(
                Link::new(format!("{}/items", collection_url), "items")
                    .with_type(media_types::GEO_JSON)
                    .with_title("Features"),
            );
        }
    }
}

/// Supported data query types for a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DataQueries {
    /// Position query (point sampling).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<QueryDescription>,

    /// Cube query (bbox).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cube: Option<QueryDescription>,
}

impl DataQueries {
    /// Describe the given query types (`position`, `cube`); others are ignored.
    pub fn for_query_types(base_url: &str, collection_id: &str, query_types: &[&str]) -> Self {
        let mut queries = Self::default();
        for query_type in query_types {
            let description = QueryDescription::new(base_url, collection_id, query_type);
            match *query_type {
                "position" => queries.position = Some(description),
                "cube" => queries.cube = Some(description),
                _ => {}
            }
        }
        queries
    }

    /// True when no query type is advertised.
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.cube.is_none()
    }
}

/// Description of a query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryDescription {
    /// Link to the query endpoint.
    pub link: Link,
}

impl QueryDescription {
    fn new(base_url: &str, collection_id: &str, query_type: &str) -> Self {
        let mut title = query_type.to_string();
        if let Some(first) = title.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        Self {
            link: Link::new(
                format!("{}/collections/{}/{}", base_url, collection_id, query_type),
                "data",
            )
            .with_type(media_types::COVERAGE_JSON)
            .with_title(format!("{} query", title)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Unit;

    #[test]
    fn test_collection_builder() {
        let mut params = BTreeMap::new();
        params.insert(
            "TEMP".to_string(),
            Parameter::new("TEMP", "Sea Water temperature").with_unit(Unit::from_symbol("degC")),
        );

        let collection = Collection::new("icoads-sst")
            .with_title("ICOADS SST")
            .with_description("Sea surface temperature")
            .with_keywords(vec!["sst".into()])
            .with_parameters(params)
            .with_output_formats(vec!["CoverageJSON".into()]);

        assert_eq!(collection.id, "icoads-sst");
        assert!(collection.parameter_names.unwrap().contains_key("TEMP"));
    }

    #[test]
    fn test_collection_links() {
        let mut collection = Collection::new("icoads-sst");
        collection.build_links("http://localhost:5000", true, false);

        assert!(collection.links.iter().any(|l| l.rel == "self"));
        assert!(collection.links.iter().any(|l| l.href.ends_with("/coverage/rangetype")));
        assert!(!collection.links.iter().any(|l| l.rel == "items"));

        collection.build_links("http://localhost:5000", false, true);
        assert!(collection.links.iter().any(|l| l.rel == "items"));
        assert!(!collection.links.iter().any(|l| l.href.ends_with("/coverage")));
    }

    #[test]
    fn test_data_queries_for_query_types() {
        let queries = DataQueries::for_query_types("http://localhost:5000", "sst", &["position", "cube", "radius"]);
        let position = queries.position.unwrap();
        assert_eq!(position.link.href, "http://localhost:5000/collections/sst/position");
        assert_eq!(position.link.title.as_deref(), Some("Position query"));
        assert!(queries.cube.is_some());

        let none = DataQueries::for_query_types("http://localhost:5000", "sst", &[]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_collection_serialization_skips_empty() {
        let collection = Collection::new("c1").with_data_queries(DataQueries::for_query_types(
            "http://x",
            "c1",
            &["cube"],
        ));
        let json = serde_json::to_value(&collection).unwrap();
        assert!(json.get("title").is_none());
        assert!(json["data_queries"].get("position").is_none());
        assert_eq!(json["data_queries"]["cube"]["link"]["rel"], "data");
    }
}
