//! EDR `position` / `cube` queries over a gridded dataset.

use async_trait::async_trait;
use edr_protocol::{DomainSet, Extent, QueryGeometry, RangeType};
use grid_dataset::Selector;
use tracing::{debug, instrument};

use crate::config::XarrayConfig;
use crate::error::{ProviderError, Result};
use crate::provider::{CoverageQuery, EdrQuery, Fields, Provider, QueryOutput, QueryType};
use crate::xarray::{bbox4, select, InstantMatch, XarrayProvider};

const QUERY_TYPES: &[QueryType] = &[QueryType::Position, QueryType::Cube];

/// Gridded dataset answering EDR queries in addition to coverage requests.
#[derive(Debug, Clone)]
pub struct XarrayEdrProvider {
    inner: XarrayProvider,
}

impl XarrayEdrProvider {
    pub fn open(config: XarrayConfig) -> Result<Self> {
        Ok(Self {
            inner: XarrayProvider::open(config)?,
        })
    }

    pub fn new(inner: XarrayProvider) -> Self {
        Self { inner }
    }

    pub fn coverage(&self) -> &XarrayProvider {
        &self.inner
    }

    fn requested_fields(&self, query: &EdrQuery) -> Vec<String> {
        if query.select_properties.is_empty() {
            self.inner.properties().fields.clone()
        } else {
            query.select_properties.clone()
        }
    }

    /// Values at a point (nearest cell), along a line (nearest cell per
    /// vertex) or within a polygon's bounds.
    #[instrument(skip(self, query), fields(wkt = ?query.wkt, datetime = ?query.datetime))]
    pub fn position_query(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let wkt = query
            .wkt
            .as_ref()
            .ok_or_else(|| ProviderError::Query("position query requires coords".to_string()))?;
        let axes = &self.inner.properties().axes;

        let mut selections = match wkt {
            QueryGeometry::Point { x, y } => vec![
                (axes.x.clone(), Selector::Nearest(*x)),
                (axes.y.clone(), Selector::Nearest(*y)),
            ],
            QueryGeometry::LineString(_) | QueryGeometry::MultiPoint(_) => {
                let (xs, ys) = wkt.xy();
                vec![
                    (axes.x.clone(), Selector::NearestMany(xs)),
                    (axes.y.clone(), Selector::NearestMany(ys)),
                ]
            }
            QueryGeometry::Polygon(_) => {
                let [minx, miny, maxx, maxy] = wkt.bounds();
                vec![
                    (axes.x.clone(), self.inner.axis_slice(&axes.x, minx, maxx)),
                    (axes.y.clone(), self.inner.axis_slice(&axes.y, miny, maxy)),
                ]
            }
        };
        if let Some(datetime) = &query.datetime {
            selections.push(self.inner.datetime_selector(datetime, InstantMatch::Exact)?);
        }

        let fields = self.requested_fields(query);
        debug!(fields = ?fields, selections = ?selections, "Position selection");
        let data = self.inner.dataset().select_variables(&fields)?;
        let data = select(&data, &selections)?;
        self.inner.ensure_not_empty(&data)?;

        self.inner
            .render(data, &fields, query.format.as_deref(), Some(wkt.bounds()))
    }

    /// Values within a bounding box.
    #[instrument(skip(self, query), fields(bbox = ?query.bbox, datetime = ?query.datetime))]
    pub fn cube_query(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let [minx, miny, maxx, maxy] = bbox4(&query.bbox, "z-axis not supported")?;
        let axes = &self.inner.properties().axes;

        let mut selections = vec![
            (axes.x.clone(), self.inner.axis_slice(&axes.x, minx, maxx)),
            (axes.y.clone(), self.inner.axis_slice(&axes.y, miny, maxy)),
        ];
        if let Some(datetime) = &query.datetime {
            selections.push(self.inner.datetime_selector(datetime, InstantMatch::Exact)?);
        }

        let fields = self.requested_fields(query);
        debug!(fields = ?fields, selections = ?selections, "Cube selection");
        let data = self.inner.dataset().select_variables(&fields)?;
        let data = select(&data, &selections)?;
        self.inner.ensure_not_empty(&data)?;

        self.inner.render(data, &fields, query.format.as_deref(), None)
    }
}

#[async_trait]
impl Provider for XarrayEdrProvider {
    fn name(&self) -> &str {
        "xarray-edr"
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
        Ok(self.inner.rangetype())
    }

    fn get_coverage_domainset(&self) -> Result<DomainSet> {
        Ok(self.inner.domainset())
    }

    async fn query(&self, query: &CoverageQuery) -> Result<QueryOutput> {
        self.inner.query_coverage(query)
    }

    async fn position(&self, query: &EdrQuery) -> Result<QueryOutput> {
        self.position_query(query)
    }

    async fn cube(&self, query: &EdrQuery) -> Result<QueryOutput> {
        self.cube_query(query)
    }
}
