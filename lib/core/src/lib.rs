//! # geomap Core
//!
//! Mapping model for the geomap field mapping engine.
//!
//! This crate provides the type-independent part of a schema:
//!
//! - [`Mapper`] - An immutable node of the mapping tree, with `merge` and `validate`
//! - [`MappedFieldType`] - Capability flags the query layer sees for a field
//! - [`BuilderContext`] / [`ParserContext`] - Environments for building and parsing
//! - [`TypeParsers`] - Registry from type name to [`TypeParser`]
//! - [`Mapping`] - A complete mapping: parse, merge, validate, encode documents
//!
//! `object` and `keyword` are built in; other field types register their
//! parsers with [`TypeParsers::register`].
//!
//! ## Example
//!
//! ```rust
//! use geomap_core::{IndexSettings, Mapping, ParserContext, Similarities, TypeParsers};
//! use std::sync::Arc;
//!
//! let context = ParserContext::new(
//!     Arc::new(TypeParsers::with_core_types()),
//!     Arc::new(Similarities::default()),
//!     Arc::new(IndexSettings::new()),
//! )
//! .unwrap();
//!
//! let mapping = Mapping::parse(
//!     &serde_json::json!({"properties": {"tag": {"type": "keyword"}}}),
//!     &context,
//! )
//! .unwrap();
//! assert_eq!(mapping.lookup().mapper("tag").unwrap().type_name(), "keyword");
//! ```

pub mod context;
pub mod document;
pub mod error;
pub mod explicit;
pub mod field_type;
pub mod keyword;
pub mod lookup;
pub mod mapper;
pub mod mapping;
pub mod object;
pub mod params;
pub mod registry;
pub mod settings;

pub use context::{BuilderContext, ContentPath, ParserContext, Similarities, SimilarityProvider};
pub use document::{IndexableField, IndexableValue, ParseContext, ParsedDocument, ShapePrimitive};
pub use error::{Error, Result};
pub use explicit::Explicit;
pub use field_type::{FieldTypeBase, MappedFieldType, SortField};
pub use keyword::{KeywordFieldMapper, KeywordFieldMapperBuilder, KeywordFieldType};
pub use lookup::MappingLookup;
pub use mapper::{Conflicts, Mapper, MapperBuilder, MultiFields, MultiFieldsBuilder, TypeParser};
pub use mapping::Mapping;
pub use object::{ObjectMapper, ObjectMapperBuilder};
pub use registry::TypeParsers;
pub use settings::{IndexSettings, Version};
