//! # geomap Geo
//!
//! The `geo_shape` field type for geomap.
//!
//! - [`GeometryParser`] - GeoJSON and WKT input under a field's coordinate policy
//! - [`GeoShapeIndexer`] - Dateline handling and triangle decomposition
//! - [`GeoShapeFieldMapper`] - Vector (`BKD`) strategy mapper
//! - [`LegacyGeoShapeFieldMapper`] - Prefix-tree strategies (`recursive`, `term`)
//! - [`Query`] - Spatial relation queries built by a field type's query processor
//!
//! ## Example
//!
//! ```rust
//! use geomap_core::{IndexSettings, Mapping, ParserContext, Similarities, TypeParsers};
//! use std::sync::Arc;
//!
//! let mut parsers = TypeParsers::with_core_types();
//! geomap_geo::register(&mut parsers);
//! let context = ParserContext::new(
//!     Arc::new(parsers),
//!     Arc::new(Similarities::default()),
//!     Arc::new(IndexSettings::new()),
//! )
//! .unwrap();
//!
//! let mapping = Mapping::parse(
//!     &serde_json::json!({"properties": {"location": {"type": "geo_shape"}}}),
//!     &context,
//! )
//! .unwrap();
//! let doc = mapping
//!     .parse_document(&serde_json::json!({"location": "POINT (13.4 52.5)"}))
//!     .unwrap();
//! assert_eq!(doc.shapes("location").len(), 1);
//! ```

pub mod geometry;
pub mod indexer;
pub mod legacy;
pub mod mapper;
pub mod query;

pub use geometry::{GeometryParser, InvalidShape, Orientation};
pub use indexer::GeoShapeIndexer;
pub use legacy::{
    DeprecatedParameters, LegacyGeoShapeFieldMapper, LegacyGeoShapeFieldType, PrefixTreeType,
};
pub use mapper::{
    GeoShapeFieldMapper, GeoShapeFieldMapperBuilder, GeoShapeFieldType, GeoShapeTypeParser,
    ParsedDeclaration,
};
pub use query::{
    AsGeoShapeQueryable, GeoShapeQueryProcessor, GeoShapeQueryable, Query, QueryShardContext,
    ShapeRelation, SpatialStrategy,
};

use geomap_core::TypeParsers;

/// Registers the `geo_shape` type parser
pub fn register(parsers: &mut TypeParsers) {
    parsers.register(mapper::CONTENT_TYPE, GeoShapeTypeParser);
}
