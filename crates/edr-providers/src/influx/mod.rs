//! InfluxDB measurements exposed as observations and point series.
//!
//! Each configured location lists the measurements (tables) observed
//! there and maps parameter names to table columns. Parameter metadata
//! comes from the provider configuration, not from the database.

mod client;
mod flux;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use edr_protocol::cis::{EncodingInfo, Meta, UnitOfMeasure, UCUM_PREFIX};
use edr_protocol::coverage_json::CRS84;
use edr_protocol::{
    Category, CovJsonParameter, CoverageCollection, CoverageJson, Domain, DomainSet, DomainType,
    Extent, Feature, FeatureCollection, Geometry, I18nString, NdArray, ObservedProperty,
    QueryGeometry, RangeField, RangeType, ReferenceSystemConnection, Unit,
};
use geo::{Centroid, Intersects};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

pub use client::InfluxClient;
pub use flux::{define_query, parse_annotated_csv, FluxRecord, TimeRange};

use crate::config::{default_lang, InfluxConfig, LocationConfig, LocationGeometry, ParameterConfig, ParameterKind};
use crate::error::{ProviderError, Result};
use crate::provider::{EdrQuery, FieldInfo, Fields, ItemsQuery, Provider, QueryOutput, QueryType};
use crate::xarray::bbox4;

const QUERY_TYPES: &[QueryType] = &[QueryType::Position, QueryType::Cube];

/// One parameter of a measurement at a location.
struct Column<'a> {
    key: &'a str,
    definition: &'a ParameterConfig,
    column: &'a str,
}

/// Observation provider over InfluxDB.
#[derive(Debug)]
pub struct InfluxProvider {
    config: InfluxConfig,
    client: InfluxClient,
    rangetype: OnceLock<RangeType>,
}

impl InfluxProvider {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        if let Some(since) = &config.data.since {
            TimeRange::since(since)?;
        }
        let client = InfluxClient::new(&config.data)?;
        info!(
            url = %config.data.url,
            bucket = %config.data.bucket,
            locations = config.locations.len(),
            parameters = config.parameters.len(),
            "InfluxDB provider configured"
        );
        Ok(Self {
            config,
            client,
            rangetype: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Range type over every defined parameter of every location,
    /// built on first use.
    pub fn rangetype(&self) -> &RangeType {
        self.rangetype.get_or_init(|| self.build_rangetype())
    }

    fn build_rangetype(&self) -> RangeType {
        let mut rangetype = RangeType::default();
        for location in &self.config.locations {
            for columns in location.tables.values() {
                for key in columns.keys() {
                    let Some(definition) = self.config.parameters.get(key) else {
                        continue;
                    };
                    let id = field_id(key, definition);
                    if rangetype.contains(&id) {
                        continue;
                    }
                    rangetype.field.push(range_field(id, definition));
                }
            }
        }
        debug!(fields = rangetype.field.len(), "Built InfluxDB range type");
        rangetype
    }

    /// Fields of the parameters observed at any location.
    pub fn fields(&self) -> Fields {
        self.observed_columns()
            .map(|c| {
                let info = FieldInfo {
                    type_: c.definition.data_type.clone().unwrap_or_else(|| "float".to_string()),
                    title: c
                        .definition
                        .observed_property_label
                        .clone()
                        .or_else(|| c.definition.description.clone()),
                    unit: c.definition.unit_symbol.clone(),
                };
                (c.key.to_string(), info)
            })
            .collect()
    }

    /// Bounds of all location geometries.
    pub fn extent(&self) -> Option<Extent> {
        let vertices: Vec<(f64, f64)> = self
            .config
            .locations
            .iter()
            .flat_map(|l| match &l.geometry {
                LocationGeometry::Point(p) => vec![p.xy()],
                LocationGeometry::Polygon(ring) => ring.iter().map(|[x, y]| (*x, *y)).collect(),
            })
            .collect();
        if vertices.is_empty() {
            return None;
        }
        let bounds = QueryGeometry::MultiPoint(vertices).bounds();
        Some(Extent::from_bounds(bounds, Some(CRS84.to_string()), None))
    }

    fn observed_columns(&self) -> impl Iterator<Item = Column<'_>> {
        self.config.locations.iter().flat_map(move |l| {
            l.tables
                .values()
                .flat_map(move |columns| self.columns(columns, &[]))
        })
    }

    /// Defined parameters of a table, restricted to `selected` when given.
    fn columns<'a>(&'a self, columns: &'a BTreeMap<String, String>, selected: &[String]) -> Vec<Column<'a>> {
        columns
            .iter()
            .filter_map(|(key, column)| {
                let definition = self.config.parameters.get(key)?;
                let wanted = selected.is_empty()
                    || selected.iter().any(|s| s == key || Some(s) == definition.id.as_ref());
                wanted.then_some(Column {
                    key,
                    definition,
                    column,
                })
            })
            .collect()
    }

    /// Locations whose geometry intersects `geometry`; all of them when
    /// no geometry is given.
    fn locations_matching(&self, geometry: Option<&QueryGeometry>) -> Vec<&LocationConfig> {
        let Some(geometry) = geometry else {
            return self.config.locations.iter().collect();
        };
        let query = geometry.to_geo();
        self.config
            .locations
            .iter()
            .filter(|l| match &l.geometry {
                LocationGeometry::Point(p) => {
                    let (x, y) = p.xy();
                    query.intersects(&geo::Point::new(x, y))
                }
                LocationGeometry::Polygon(ring) => query.intersects(&location_polygon(ring)),
            })
            .collect()
    }

    fn time_range(&self, datetime: Option<&str>) -> Result<TimeRange> {
        match (datetime, &self.config.data.since) {
            (None, Some(since)) => TimeRange::since(since),
            (datetime, _) => TimeRange::from_datetime(datetime),
        }
    }

    async fn fetch(&self, measurement: &str, range: &TimeRange) -> Result<Vec<FluxRecord>> {
        let flux = define_query(&self.config.data.bucket, measurement, range);
        let records = self.client.query(&flux).await?;
        Ok(records.into_iter().filter(|r| r.time().is_some()).collect())
    }

    /// Point series of every (location, measurement) pair intersecting
    /// `geometry`.
    #[instrument(skip(self, geometry), fields(geometry = geometry.geom_type()))]
    pub async fn point_series(
        &self,
        geometry: &QueryGeometry,
        datetime: Option<&str>,
        selected: &[String],
    ) -> Result<CoverageCollection> {
        let range = self.time_range(datetime)?;
        let locations = self.locations_matching(Some(geometry));
        debug!(locations = locations.len(), range = %range.to_flux(), "Matched locations");
        if locations.is_empty() {
            return Err(ProviderError::no_data());
        }

        let mut parameters = BTreeMap::new();
        let mut collection = CoverageCollection::new(DomainType::PointSeries).with_referencing(vec![
            ReferenceSystemConnection::geographic(CRS84),
            ReferenceSystemConnection::temporal(),
        ]);

        for location in locations {
            let (x, y) = location_xy(&location.geometry);
            for (measurement, columns) in &location.tables {
                let columns = self.columns(columns, selected);
                if columns.is_empty() {
                    continue;
                }
                let records = self.fetch(measurement, &range).await?;
                if records.is_empty() {
                    continue;
                }

                let times = records.iter().filter_map(|r| r.time()).map(str::to_string).collect();
                let mut coverage = CoverageJson::new(Domain::point_series(x, y, times));
                for c in &columns {
                    parameters
                        .entry(c.key.to_string())
                        .or_insert_with(|| covjson_parameter(c.key, c.definition));
                    coverage = coverage.with_range(c.key, series_range(c, &records));
                }
                collection.push(coverage.without_parameters());
            }
        }

        if collection.is_empty() {
            return Err(ProviderError::no_data());
        }
        Ok(collection.with_parameters(parameters))
    }

    /// Observation features, one per row and parameter.
    #[instrument(skip(self, query), fields(bbox = ?query.bbox, datetime = ?query.datetime))]
    pub async fn observations(&self, query: &ItemsQuery) -> Result<FeatureCollection> {
        let geometry = if query.bbox.is_empty() {
            None
        } else {
            Some(bbox_geometry(bbox4(&query.bbox, "z-axis not supported")?))
        };
        let range = self.time_range(query.datetime.as_deref())?;

        let mut features = Vec::new();
        for location in self.locations_matching(geometry.as_ref()) {
            for (measurement, columns) in &location.tables {
                let columns = self.columns(columns, &query.properties);
                if columns.is_empty() {
                    continue;
                }
                let records = self.fetch(measurement, &range).await?;
                for record in &records {
                    features.extend(columns.iter().filter_map(|c| observation(location, c, record)));
                }
            }
        }

        let matched = features.len();
        let page: Vec<Feature> = features
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(FeatureCollection::new().with_features(page).with_counts(matched))
    }

    /// A single observation by `location/parameter/time` id.
    pub async fn observation(&self, id: &str) -> Result<Feature> {
        let not_found = || ProviderError::ItemNotFound(format!("item {} not found", id));

        let mut parts = id.splitn(3, '/');
        let (Some(name), Some(key), Some(time)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(not_found());
        };
        let location = self
            .config
            .locations
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(not_found)?;
        let range = TimeRange::from_datetime(Some(time)).map_err(|_| not_found())?;

        for (measurement, columns) in &location.tables {
            let selected = [key.to_string()];
            let Some(column) = self.columns(columns, &selected).into_iter().next() else {
                continue;
            };
            let records = self.fetch(measurement, &range).await?;
            if let Some(feature) = records
                .iter()
                .filter(|r| r.time() == Some(time))
                .find_map(|r| observation(location, &column, r))
            {
                return Ok(feature);
            }
        }
        Err(not_found())
    }
}

fn field_id(key: &str, definition: &ParameterConfig) -> String {
    definition
        .name
        .clone()
        .or_else(|| definition.id.clone())
        .unwrap_or_else(|| key.to_string())
}

fn range_field(id: String, definition: &ParameterConfig) -> RangeField {
    let unit_type = definition.unit_type.clone().unwrap_or_else(|| UCUM_PREFIX.to_string());
    RangeField {
        id,
        type_: definition.kind.as_str().to_string(),
        name: definition.description.clone(),
        encoding_info: EncodingInfo {
            data_type: definition.data_type.clone().unwrap_or_else(|| "float".to_string()),
        },
        nodata: "null".to_string(),
        uom: UnitOfMeasure {
            id: format!("{}{}", unit_type, definition.unit_symbol.as_deref().unwrap_or("")),
            type_: unit_type,
            code: definition.unit_label.clone(),
        },
        meta: definition.properties.clone().map(|tags| Meta { tags }),
    }
}

fn lang(lang: &Option<String>) -> String {
    lang.clone().unwrap_or_else(default_lang)
}

/// CoverageJSON parameter of a configured parameter definition.
fn covjson_parameter(key: &str, definition: &ParameterConfig) -> CovJsonParameter {
    let label = definition
        .observed_property_label
        .as_deref()
        .or(definition.label.as_deref())
        .unwrap_or(key);
    let mut observed = ObservedProperty::new(label)
        .with_label(&lang(&definition.observed_property_label_lang), label);
    if let Some(id) = &definition.observed_property_id {
        observed = observed.with_id(id.as_str());
    }
    if let Some(description) = &definition.observed_property_description {
        observed = observed.with_description(&lang(&definition.observed_property_description_lang), description);
    }
    if definition.kind == ParameterKind::Category {
        let categories = definition
            .observed_property_categories
            .iter()
            .map(|c| Category {
                id: c.id.clone(),
                label: Some(I18nString::localized(&c.label_lang, &c.label)),
                description: None,
            })
            .collect();
        observed = observed.with_categories(categories);
    }

    let mut parameter = CovJsonParameter::new(observed)
        .with_id(definition.id.clone().unwrap_or_else(|| key.to_string()));
    if let Some(description) = &definition.description {
        parameter = parameter.with_description(I18nString::localized(&lang(&definition.description_lang), description));
    }
    match definition.kind {
        ParameterKind::Quantity => {
            if let Some(symbol) = &definition.unit_symbol {
                let label = definition
                    .unit_label
                    .as_deref()
                    .map(|l| I18nString::localized(&lang(&definition.unit_label_lang), l));
                let unit_type = definition.unit_type.clone().unwrap_or_else(|| UCUM_PREFIX.to_string());
                parameter = parameter.with_unit(Unit::structured(label, symbol.as_str(), Some(unit_type)));
            }
        }
        ParameterKind::Category => {
            if let Some(label) = &definition.label {
                parameter = parameter.with_label(I18nString::localized(&lang(&definition.label_lang), label));
            }
            parameter = parameter.with_category_encoding(definition.category_encoding.clone());
        }
    }
    if let Some(properties) = &definition.properties {
        parameter = parameter.with_properties(properties.clone());
    }
    parameter
}

/// `[x, y, t]` range of one column; categories are encoded as integers
/// and unknown labels become nulls.
fn series_range(column: &Column<'_>, records: &[FluxRecord]) -> NdArray {
    let values: Vec<Option<f64>> = records
        .iter()
        .map(|r| match column.definition.kind {
            ParameterKind::Quantity => r.number(column.column),
            ParameterKind::Category => r
                .get(column.column)
                .and_then(|label| column.definition.category_encoding.get(label))
                .map(|code| *code as f64),
        })
        .collect();
    let shape = vec![1, 1, values.len()];
    let range = NdArray::with_missing(values, shape, vec!["x".into(), "y".into(), "t".into()]);
    match column.definition.kind {
        ParameterKind::Quantity => range,
        ParameterKind::Category => range.with_data_type("integer"),
    }
}

fn observation(location: &LocationConfig, column: &Column<'_>, record: &FluxRecord) -> Option<Feature> {
    let time = record.time()?;
    let value = match record.number(column.column) {
        Some(n) => json!(n),
        None => Value::String(record.get(column.column)?.to_string()),
    };
    let sensor = record
        .get("sensor")
        .map(|s| Value::String(s.to_string()))
        .or_else(|| {
            column
                .definition
                .properties
                .as_ref()
                .and_then(|p| p.get("madeBySensor"))
                .cloned()
        })
        .unwrap_or(Value::Null);
    let unit = column
        .definition
        .unit_symbol
        .as_deref()
        .or_else(|| record.get("unit"));
    let observed_property = column
        .definition
        .observed_property_id
        .as_deref()
        .unwrap_or(column.key);

    let (x, y) = location_xy(&location.geometry);
    Some(
        Feature::new(Some(Geometry::point(x, y)))
            .with_id(format!("{}/{}/{}", location.name, column.key, time))
            .with_property("resultTime", time)
            .with_property("phenomenonTime", time)
            .with_property("madeBySensor", sensor)
            .with_property("hasFeatureOfInterest", location.name.as_str())
            .with_property("observedProperty", observed_property)
            .with_property("unit", unit.map(|u| Value::String(u.to_string())).unwrap_or(Value::Null))
            .with_property("value", value),
    )
}

fn location_polygon(ring: &[[f64; 2]]) -> geo::Polygon<f64> {
    geo::Polygon::new(
        geo::LineString::from(ring.iter().map(|[x, y]| (*x, *y)).collect::<Vec<_>>()),
        vec![],
    )
}

/// Position of a location: the point itself or the polygon centroid.
fn location_xy(geometry: &LocationGeometry) -> (f64, f64) {
    match geometry {
        LocationGeometry::Point(p) => p.xy(),
        LocationGeometry::Polygon(ring) => location_polygon(ring)
            .centroid()
            .map(|c| (c.x(), c.y()))
            .or_else(|| ring.first().map(|[x, y]| (*x, *y)))
            .unwrap_or((f64::NAN, f64::NAN)),
    }
}

fn bbox_geometry([minx, miny, maxx, maxy]: [f64; 4]) -> QueryGeometry {
    QueryGeometry::Polygon(vec![
        (minx, miny),
        (minx, maxy),
        (maxx, maxy),
        (maxx, miny),
        (minx, miny),
    ])
}

#[async_trait]
impl Provider for InfluxProvider {
    fn name(&self) -> &str {
        "influx"
    }

    fn extent(&self) -> Option<Extent> {
        InfluxProvider::extent(self)
    }

    fn get_fields(&self) -> Result<Fields> {
        Ok(self.fields())
    }

    fn get_coverage_rangetype(&self) -> Result<RangeType> {
        Ok(self.rangetype().clone())
    }

    async fn items(&self, query: &ItemsQuery) -> Result<FeatureCollection> {
        self.observations(query).await
    }

    async fn get(&self, id: &str) -> Result<Feature> {
        self.observation(id).await
    }
}

/// InfluxDB measurements answering EDR `position` and `cube` queries.
#[derive(Debug)]
pub struct InfluxEdrProvider {
    inner: InfluxProvider,
}

impl InfluxEdrProvider {
    pub fn new(config: InfluxConfig) -> Result<Self> {
        Ok(Self {
            inner: InfluxProvider::new(config)?,
        })
    }

    pub fn observations(&self) -> &InfluxProvider {
        &self.inner
    }
}

#[async_trait]
impl Provider for InfluxEdrProvider {
    fn name(&self) -> &str {
        "influx-edr"
    }

    fn query_types(&self) -> &[QueryType] {
        QUERY_TYPES
    }

    fn extent(&self) -> Option<Extent> {
        self.inner.extent()
    }

    fn get_fields(&self) -> Result<Fields> {
        Ok(self.inner.fields())
    }

    fn get_coverage_rangetype(&self) -> Result<RangeType> {
        Ok(self.inner.rangetype().clone())
    }

    fn get_coverage_domainset(&self) -> Result<DomainSet> {
        Err(ProviderError::not_implemented("domainset"))
    }

    async fn position(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let wkt = query
            .wkt
            .as_ref()
            .ok_or_else(|| ProviderError::Query("position query requires coords".to_string()))?;
        let collection = self
            .inner
            .point_series(wkt, query.datetime.as_deref(), &query.select_properties)
            .await?;
        Ok(collection.into())
    }

    async fn cube(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let bbox = bbox_geometry(bbox4(&query.bbox, "z-axis not supported")?);
        let collection = self
            .inner
            .point_series(&bbox, query.datetime.as_deref(), &query.select_properties)
            .await?;
        Ok(collection.into())
    }

    async fn items(&self, query: &ItemsQuery) -> Result<FeatureCollection> {
        self.inner.observations(query).await
    }

    async fn get(&self, id: &str) -> Result<Feature> {
        self.inner.observation(id).await
    }
}
