//! Landing page, conformance declaration and exception bodies.

use serde::{Deserialize, Serialize};

use crate::media_types;
use crate::types::Link;

/// Resources linked from the landing page: path, relation, title.
const LANDING_LINKS: &[(&str, &str, &str)] = &[
    ("", "self", "This document"),
    ("/conformance", "conformance", "Conformance classes"),
    ("/collections", "data", "Collections"),
];

/// Response of the API root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandingPage {
    pub title: String,
    pub description: String,
    pub links: Vec<Link>,
}

impl LandingPage {
    pub fn new(title: impl Into<String>, description: impl Into<String>, base_url: &str) -> Self {
        let links = LANDING_LINKS
            .iter()
            .map(|(path, rel, title)| {
                Link::new(format!("{}{}", base_url, path), *rel)
                    .with_type(media_types::JSON)
                    .with_title(*title)
            })
            .collect();
        Self {
            title: title.into(),
            description: description.into(),
            links,
        }
    }
}

/// Conformance declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConformanceClasses {
    #[serde(rename = "conformsTo")]
    pub conforms_to: Vec<String>,
}

impl ConformanceClasses {
    pub fn contains(&self, class: &str) -> bool {
        self.conforms_to.iter().any(|c| c == class)
    }
}

impl<'a> FromIterator<&'a str> for ConformanceClasses {
    /// Collect class URIs, dropping repeats.
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut classes = Self::default();
        for class in iter {
            if !classes.contains(class) {
                classes.conforms_to.push(class.to_string());
            }
        }
        classes
    }
}

const EXCEPTION_BASE: &str = "http://www.opengis.net/def/exceptions/ogcapi-edr-1/1.0";

/// OGC exception body returned with every error status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    #[serde(rename = "type")]
    pub type_: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl ExceptionResponse {
    /// Exception for an HTTP status; type and title follow from the status.
    pub fn for_status(status: u16, detail: impl Into<String>) -> Self {
        let (kind, title) = match status {
            400 => ("invalid-parameter-value", "Bad Request"),
            404 => ("not-found", "Not Found"),
            406 => ("not-acceptable", "Not Acceptable"),
            502 => ("server-error", "Bad Gateway"),
            _ => ("server-error", "Internal Server Error"),
        };
        Self {
            type_: format!("{}/{}", EXCEPTION_BASE, kind),
            title: title.to_string(),
            status,
            detail: detail.into(),
        }
    }
}
