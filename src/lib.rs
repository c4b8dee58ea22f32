//! # geomap
//!
//! Field mapping and merge engine for document search indexes.
//!
//! geomap turns JSON mapping declarations into an immutable tree of field
//! mappers, merges schema revisions without touching the running mapping,
//! and encodes source documents into indexable values. Geometric fields
//! (`geo_shape`) accept GeoJSON or WKT and are decomposed into points, line
//! segments and triangles.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! geomap check mapping.json --settings settings.json
//! geomap merge current.json update.json
//! geomap index mapping.json docs.jsonl
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use geomap::prelude::*;
//!
//! let context = geomap::parser_context(IndexSettings::new()).unwrap();
//! let mapping = Mapping::parse(
//!     &serde_json::json!({
//!         "properties": {
//!             "name": {"type": "keyword"},
//!             "area": {"type": "geo_shape", "coerce": true}
//!         }
//!     }),
//!     &context,
//! )
//! .unwrap();
//!
//! let doc = mapping
//!     .parse_document(&serde_json::json!({
//!         "name": "square",
//!         "area": "POLYGON ((100 0, 101 0, 101 1, 100 1, 100 0))"
//!     }))
//!     .unwrap();
//! assert_eq!(doc.shapes("area").len(), 2);
//! ```
//!
//! ## Crate Structure
//!
//! - `geomap-core` - Mapper model, contexts, object and keyword fields, merge and validation
//! - `geomap-geo` - The `geo_shape` field type, shape indexing and spatial queries

use std::sync::Arc;

// Re-export core types
pub use geomap_core::{
    BuilderContext, Error, Explicit, IndexSettings, IndexableField, IndexableValue, MappedFieldType,
    Mapper, MapperBuilder, Mapping, MappingLookup, ParsedDocument, ParserContext, Result,
    ShapePrimitive, Similarities, TypeParser, TypeParsers, Version,
};

// Re-export geo types
pub use geomap_geo::{
    AsGeoShapeQueryable, GeoShapeFieldMapper, GeoShapeQueryable, LegacyGeoShapeFieldMapper,
    Orientation, Query, QueryShardContext, ShapeRelation, SpatialStrategy,
};

/// Registry with every field type this crate ships: `object`, `keyword`, `geo_shape`
pub fn default_type_parsers() -> TypeParsers {
    let mut parsers = TypeParsers::with_core_types();
    geomap_geo::register(&mut parsers);
    parsers
}

/// Parser context over [`default_type_parsers`] and the default similarities
pub fn parser_context(settings: IndexSettings) -> Result<ParserContext> {
    ParserContext::new(
        Arc::new(default_type_parsers()),
        Arc::new(Similarities::default()),
        Arc::new(settings),
    )
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AsGeoShapeQueryable, Error, IndexSettings, IndexableValue, Mapping, ParsedDocument,
        ParserContext, QueryShardContext, Result, ShapePrimitive, ShapeRelation, Version,
    };
}
