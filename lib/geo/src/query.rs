//! Spatial queries against geo_shape fields
//!
//! A field type answers `geo_shape_query` through its query processor. The
//! returned [`Query`] carries what a searcher needs (primitives or prefix
//! cells) plus the shape itself, so [`Query::matches`] can evaluate the
//! relation exactly against a document geometry.

use crate::geometry::Orientation;
use crate::indexer::{decompose, GeoShapeIndexer};
use crate::legacy::{LegacyGeoShapeFieldType, PrefixTreeIndexer};
use crate::mapper::GeoShapeFieldType;
use geo::{CoordsIter, Relate};
use geo_types::Geometry;
use geomap_core::settings::ALLOW_EXPENSIVE_QUERIES;
use geomap_core::{Error, IndexSettings, MappedFieldType, Result, ShapePrimitive, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeRelation {
    Intersects,
    Disjoint,
    Within,
    Contains,
}

impl ShapeRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeRelation::Intersects => "intersects",
            ShapeRelation::Disjoint => "disjoint",
            ShapeRelation::Within => "within",
            ShapeRelation::Contains => "contains",
        }
    }
}

impl FromStr for ShapeRelation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "intersects" => Ok(ShapeRelation::Intersects),
            "disjoint" => Ok(ShapeRelation::Disjoint),
            "within" => Ok(ShapeRelation::Within),
            "contains" => Ok(ShapeRelation::Contains),
            other => Err(Error::InvalidArgument(format!("Unknown shape relation [{}]", other))),
        }
    }
}

impl fmt::Display for ShapeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a geo_shape field is laid out in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialStrategy {
    /// Triangles in a BKD tree
    Bkd,
    /// Prefix-tree cells, all relations
    Recursive,
    /// Prefix-tree cells, points only, intersects only
    Term,
}

impl SpatialStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialStrategy::Bkd => "BKD",
            SpatialStrategy::Recursive => "recursive",
            SpatialStrategy::Term => "term",
        }
    }

    /// Strategies a legacy declaration may name
    pub fn from_legacy(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "recursive" => Some(SpatialStrategy::Recursive),
            "term" => Some(SpatialStrategy::Term),
            _ => None,
        }
    }
}

impl fmt::Display for SpatialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-shard state a query is built against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryShardContext {
    index_created_version: Version,
    shard_id: u32,
    allow_expensive_queries: bool,
}

impl QueryShardContext {
    pub fn new(index_created_version: Version) -> Self {
        Self {
            index_created_version,
            shard_id: 0,
            allow_expensive_queries: true,
        }
    }

    pub fn from_settings(settings: &IndexSettings, shard_id: u32) -> Result<Self> {
        Ok(Self {
            index_created_version: Version::index_created(settings)?,
            shard_id,
            allow_expensive_queries: settings.get_bool(ALLOW_EXPENSIVE_QUERIES, true)?,
        })
    }

    pub fn with_shard_id(mut self, shard_id: u32) -> Self {
        self.shard_id = shard_id;
        self
    }

    pub fn with_allow_expensive_queries(mut self, allow: bool) -> Self {
        self.allow_expensive_queries = allow;
        self
    }

    pub fn index_created_version(&self) -> Version {
        self.index_created_version
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub fn allow_expensive_queries(&self) -> bool {
        self.allow_expensive_queries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// The query shape has no coordinates
    MatchNone { field: String },
    /// Vector strategy: query primitives against indexed triangles
    Shape {
        field: String,
        relation: ShapeRelation,
        shape: Geometry<f64>,
        primitives: Vec<ShapePrimitive>,
    },
    /// Legacy strategy: prefix-tree cell terms
    PrefixTree {
        field: String,
        relation: ShapeRelation,
        strategy: SpatialStrategy,
        shape: Geometry<f64>,
        cells: Vec<String>,
    },
}

impl Query {
    pub fn field(&self) -> &str {
        match self {
            Query::MatchNone { field }
            | Query::Shape { field, .. }
            | Query::PrefixTree { field, .. } => field,
        }
    }

    pub fn relation(&self) -> Option<ShapeRelation> {
        match self {
            Query::MatchNone { .. } => None,
            Query::Shape { relation, .. } | Query::PrefixTree { relation, .. } => Some(*relation),
        }
    }

    /// Exact evaluation of the relation for one document geometry
    pub fn matches(&self, document: &Geometry<f64>) -> bool {
        match self {
            Query::MatchNone { .. } => false,
            Query::Shape { relation, shape, .. } | Query::PrefixTree { relation, shape, .. } => {
                let matrix = document.relate(shape);
                match relation {
                    ShapeRelation::Intersects => matrix.is_intersects(),
                    ShapeRelation::Disjoint => matrix.is_disjoint(),
                    ShapeRelation::Within => matrix.is_within(),
                    ShapeRelation::Contains => matrix.is_contains(),
                }
            }
        }
    }
}

/// Builds queries for one strategy. Implementations hold no per-query state.
pub trait GeoShapeQueryProcessor: fmt::Debug + Send + Sync {
    fn strategy(&self) -> SpatialStrategy;

    fn process(
        &self,
        shape: &Geometry<f64>,
        field_name: &str,
        relation: ShapeRelation,
        context: &QueryShardContext,
    ) -> Result<Query>;
}

fn invalid_query_shape(field_name: &str, reason: impl fmt::Display) -> Error {
    Error::InvalidArgument(format!("invalid query shape for field [{}]: {}", field_name, reason))
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VectorGeoShapeQueryProcessor {
    orientation: Orientation,
}

impl VectorGeoShapeQueryProcessor {
    pub fn new(orientation: Orientation) -> Self {
        Self { orientation }
    }
}

impl GeoShapeQueryProcessor for VectorGeoShapeQueryProcessor {
    fn strategy(&self) -> SpatialStrategy {
        SpatialStrategy::Bkd
    }

    fn process(
        &self,
        shape: &Geometry<f64>,
        field_name: &str,
        relation: ShapeRelation,
        context: &QueryShardContext,
    ) -> Result<Query> {
        if relation == ShapeRelation::Contains
            && context.index_created_version().before(Version::V_7_5_0)
        {
            return Err(Error::UnsupportedRelation {
                field: field_name.to_string(),
                relation: relation.to_string(),
                strategy: format!(
                    "{} (index created before {})",
                    self.strategy(),
                    Version::V_7_5_0
                ),
            });
        }
        if shape.coords_count() == 0 {
            return Ok(Query::MatchNone {
                field: field_name.to_string(),
            });
        }
        let indexer = GeoShapeIndexer::new(self.orientation, field_name);
        let prepared = indexer
            .prepare(shape)
            .map_err(|e| invalid_query_shape(field_name, e))?;
        let primitives = decompose(&prepared);
        Ok(Query::Shape {
            field: field_name.to_string(),
            relation,
            shape: prepared,
            primitives,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyGeoShapeQueryProcessor {
    strategy: SpatialStrategy,
    indexer: PrefixTreeIndexer,
}

impl LegacyGeoShapeQueryProcessor {
    pub fn new(strategy: SpatialStrategy, indexer: PrefixTreeIndexer) -> Self {
        Self { strategy, indexer }
    }
}

impl GeoShapeQueryProcessor for LegacyGeoShapeQueryProcessor {
    fn strategy(&self) -> SpatialStrategy {
        self.strategy
    }

    fn process(
        &self,
        shape: &Geometry<f64>,
        field_name: &str,
        relation: ShapeRelation,
        context: &QueryShardContext,
    ) -> Result<Query> {
        if !context.allow_expensive_queries() {
            return Err(Error::unsupported(
                field_name,
                format!(
                    "[geo-shape] queries on [PrefixTree geo shapes] cannot be executed when \
                     '{}' is set to false",
                    ALLOW_EXPENSIVE_QUERIES
                ),
            ));
        }
        if self.strategy == SpatialStrategy::Term && relation != ShapeRelation::Intersects {
            return Err(Error::UnsupportedRelation {
                field: field_name.to_string(),
                relation: relation.to_string(),
                strategy: self.strategy.to_string(),
            });
        }
        if shape.coords_count() == 0 {
            return Ok(Query::MatchNone {
                field: field_name.to_string(),
            });
        }
        // query shapes are not bound by the field's points_only restriction
        let cells = self
            .indexer
            .cover(shape)
            .map_err(|e| invalid_query_shape(field_name, e))?;
        Ok(Query::PrefixTree {
            field: field_name.to_string(),
            relation,
            strategy: self.strategy,
            shape: shape.clone(),
            cells,
        })
    }
}

/// Field types that answer geo_shape queries
pub trait GeoShapeQueryable: MappedFieldType {
    fn query_processor(&self) -> &dyn GeoShapeQueryProcessor;

    fn geo_shape_query(
        &self,
        shape: &Geometry<f64>,
        field_name: &str,
        relation: ShapeRelation,
        context: &QueryShardContext,
    ) -> Result<Query> {
        self.query_processor().process(shape, field_name, relation, context)
    }
}

/// Query-capability view of a field type
pub trait AsGeoShapeQueryable {
    fn as_geo_shape_queryable(&self) -> Option<&dyn GeoShapeQueryable>;
}

impl<'a> AsGeoShapeQueryable for dyn MappedFieldType + 'a {
    fn as_geo_shape_queryable(&self) -> Option<&dyn GeoShapeQueryable> {
        let any = self.as_any();
        if let Some(field_type) = any.downcast_ref::<GeoShapeFieldType>() {
            return Some(field_type);
        }
        any.downcast_ref::<LegacyGeoShapeFieldType>()
            .map(|field_type| field_type as &dyn GeoShapeQueryable)
    }
}
