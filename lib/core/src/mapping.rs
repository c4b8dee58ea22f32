//! Complete mappings: parse, merge, validate and encode documents
//!
//! A [`Mapping`] owns the root object mapper and a lookup over it. Every
//! operation that changes the schema returns a new `Mapping`; the previous
//! one stays valid, so callers can swap the whole tree atomically.

use crate::context::ParserContext;
use crate::document::{ParseContext, ParsedDocument};
use crate::error::{Error, Result};
use crate::field_type::SortField;
use crate::lookup::MappingLookup;
use crate::mapper::{Mapper, MapperBuilder};
use crate::object::{self, ObjectMapperBuilder, ROOT_NAME};
use crate::params::{self, PROPERTIES};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Mapping {
    root: Arc<dyn Mapper>,
    lookup: MappingLookup,
}

impl Mapping {
    /// Parses and builds `{"properties": {...}}` (optionally wrapped in `_doc`)
    pub fn parse(source: &Value, context: &ParserContext) -> Result<Mapping> {
        let source = match source.get(ROOT_NAME) {
            Some(inner) if source.as_object().map(|o| o.len()) == Some(1) => inner,
            _ => source,
        };
        let mut node = source.as_object().cloned().ok_or_else(|| {
            Error::InvalidArgument(format!("mapping must be an object, got [{}]", source))
        })?;

        let mut builder = ObjectMapperBuilder::root();
        if let Some(properties) = node.remove(PROPERTIES) {
            builder = object::parse_properties(builder, &properties, context)?;
        }
        params::check_no_remaining_fields(ROOT_NAME, &node)?;

        let root = Box::new(builder).build(&context.root_builder_context()?)?;
        let mapping = Self::from_root(root);
        mapping.validate()?;
        tracing::debug!(fields = mapping.lookup.len(), "built mapping");
        Ok(mapping)
    }

    pub fn from_root(root: Arc<dyn Mapper>) -> Mapping {
        let lookup = MappingLookup::from_root(&root);
        Mapping { root, lookup }
    }

    pub fn root(&self) -> &Arc<dyn Mapper> {
        &self.root
    }

    pub fn lookup(&self) -> &MappingLookup {
        &self.lookup
    }

    /// Merges `update` into this mapping. Either the whole merged tree is
    /// returned, validated, or nothing is.
    pub fn merge(&self, update: &Mapping) -> Result<Mapping> {
        let root = self.root.merge(update.root.as_ref())?;
        let merged = Self::from_root(root);
        merged.validate()?;
        tracing::debug!(fields = merged.lookup.len(), "merged mapping");
        Ok(merged)
    }

    pub fn validate(&self) -> Result<()> {
        self.root.validate(&self.lookup)
    }

    pub fn sort_field(&self, field: &str) -> Result<SortField> {
        self.lookup.sort_field(field)
    }

    /// Encodes one source document
    pub fn parse_document(&self, source: &Value) -> Result<ParsedDocument> {
        let mut context = ParseContext::new(&self.lookup);
        self.root.parse(&mut context, source)?;
        Ok(context.finish())
    }

    pub fn to_json(&self) -> Value {
        self.root.to_json()
    }
}
