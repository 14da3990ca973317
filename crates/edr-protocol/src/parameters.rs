//! Parameter metadata types shared by collection descriptions and
//! CoverageJSON documents.
//!
//! Parameters describe the data variables exposed by a provider,
//! including their units, observed properties and, for categorical
//! data, the list of categories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parameter (observed property) available in a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    /// The type of parameter (always "Parameter").
    #[serde(rename = "type")]
    pub type_: String,

    /// Unique identifier for the parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Multi-language description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,

    /// The observed property.
    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,

    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Parameter {
    /// Create a new parameter.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            type_: "Parameter".to_string(),
            id: Some(id.into()),
            label: Some(label.clone()),
            description: None,
            observed_property: ObservedProperty::new(label),
            unit: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(I18nString::english(&desc.into()));
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// Internationalized string supporting multiple languages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum I18nString {
    /// Simple string (assumes English).
    Simple(String),
    /// Map of language codes to strings.
    Localized(BTreeMap<String, String>),
}

impl I18nString {
    /// Create an English-only i18n string.
    pub fn english(s: &str) -> Self {
        Self::localized("en", s)
    }

    /// Create a single-language i18n string.
    pub fn localized(lang: &str, s: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(lang.to_string(), s.to_string());
        I18nString::Localized(map)
    }

    /// Get the English text, or any available text.
    pub fn text(&self) -> &str {
        match self {
            I18nString::Simple(s) => s,
            I18nString::Localized(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .map(|s| s.as_str())
                .unwrap_or(""),
        }
    }
}

/// The observed property being measured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedProperty {
    /// URI identifier for the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<I18nString>,

    /// Description of the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,

    /// Categories for categorical data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

impl ObservedProperty {
    /// Create a new observed property with an English label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: None,
            label: Some(I18nString::english(&label.into())),
            description: None,
            categories: None,
        }
    }

    /// Set the ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the label with an explicit language tag.
    pub fn with_label(mut self, lang: &str, label: &str) -> Self {
        self.label = Some(I18nString::localized(lang, label));
        self
    }

    /// Set the description.
    pub fn with_description(mut self, lang: &str, desc: &str) -> Self {
        self.description = Some(I18nString::localized(lang, desc));
        self
    }

    /// Set the categories.
    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = Some(categories);
        self
    }
}

/// A category for categorical observed properties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Category identifier.
    pub id: String,

    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<I18nString>,

    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,
}

/// Unit of measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    /// Human-readable label for the unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<I18nString>,

    /// Symbol or abbreviation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<UnitSymbol>,
}

impl Unit {
    /// Create a unit from a symbol string.
    pub fn from_symbol(symbol: impl Into<String>) -> Self {
        Self {
            label: None,
            symbol: Some(UnitSymbol::Simple(symbol.into())),
        }
    }

    /// Create a unit with a label and a typed symbol (e.g. UCUM).
    pub fn structured(
        label: Option<I18nString>,
        value: impl Into<String>,
        type_: Option<String>,
    ) -> Self {
        Self {
            label,
            symbol: Some(UnitSymbol::Structured {
                value: value.into(),
                type_,
            }),
        }
    }
}

/// Unit symbol representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UnitSymbol {
    /// Simple string symbol.
    Simple(String),
    /// Structured symbol with type and value.
    Structured {
        /// Symbol value.
        value: String,
        /// Symbol type (e.g., "<http://www.opengis.net/def/uom/UCUM/>").
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        type_: Option<String>,
    },
}

impl UnitSymbol {
    /// Get the symbol string.
    pub fn value(&self) -> &str {
        match self {
            UnitSymbol::Simple(s) => s,
            UnitSymbol::Structured { value, .. } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_builder() {
        let param = Parameter::new("TEMP", "Sea Water temperature")
            .with_description("In situ temperature")
            .with_unit(Unit::from_symbol("degC"));

        assert_eq!(param.id.as_deref(), Some("TEMP"));
        assert_eq!(param.unit.unwrap().symbol.unwrap().value(), "degC");
        assert_eq!(param.description.unwrap().text(), "In situ temperature");
    }

    #[test]
    fn test_i18n_text_fallback() {
        let norwegian = I18nString::localized("no", "temperatur");
        assert_eq!(norwegian.text(), "temperatur");

        let simple = I18nString::Simple("plain".to_string());
        assert_eq!(simple.text(), "plain");
    }

    #[test]
    fn test_structured_symbol_serialization() {
        let unit = Unit::structured(
            Some(I18nString::english("Degree Celsius")),
            "Cel",
            Some("http://www.opengis.net/def/uom/UCUM/".to_string()),
        );

        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["symbol"]["value"], "Cel");
        assert_eq!(json["symbol"]["type"], "http://www.opengis.net/def/uom/UCUM/");
        assert_eq!(json["label"]["en"], "Degree Celsius");
    }

    #[test]
    fn test_plain_symbol_roundtrip() {
        let json = r#"{"symbol": "psu"}"#;
        let unit: Unit = serde_json::from_str(json).unwrap();
        assert_eq!(unit.symbol, Some(UnitSymbol::Simple("psu".to_string())));
    }

    #[test]
    fn test_observed_property_with_categories() {
        let prop = ObservedProperty::new("approved")
            .with_id("http://example.com/approved")
            .with_categories(vec![Category {
                id: "http://example.com/approved/yes".to_string(),
                label: Some(I18nString::english("yes")),
                description: None,
            }]);

        let json = serde_json::to_value(&prop).unwrap();
        assert_eq!(json["categories"][0]["label"]["en"], "yes");
        assert_eq!(json["id"], "http://example.com/approved");
    }
}
