//! Per-document encoding output
//!
//! Mappers append [`IndexableField`]s to a [`ParseContext`] while a document
//! is walked. The physical layout of these values belongs to the storage
//! layer; this module only fixes their logical shape.

use crate::error::{Error, Result};
use crate::lookup::MappingLookup;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Geometric unit produced by a shape indexer, coordinates as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShapePrimitive {
    Point { at: [f64; 2] },
    Line { from: [f64; 2], to: [f64; 2] },
    Triangle { a: [f64; 2], b: [f64; 2], c: [f64; 2] },
}

impl ShapePrimitive {
    pub fn vertices(&self) -> Vec<[f64; 2]> {
        match self {
            ShapePrimitive::Point { at } => vec![*at],
            ShapePrimitive::Line { from, to } => vec![*from, *to],
            ShapePrimitive::Triangle { a, b, c } => vec![*a, *b, *c],
        }
    }
}

/// Bounding extent `[min_x, min_y, max_x, max_y]` of a primitive sequence
pub fn extent(primitives: &[ShapePrimitive]) -> Option<[f64; 4]> {
    let mut vertices = primitives.iter().flat_map(|p| p.vertices());
    let first = vertices.next()?;
    let mut bounds = [first[0], first[1], first[0], first[1]];
    for [x, y] in vertices {
        bounds[0] = bounds[0].min(x);
        bounds[1] = bounds[1].min(y);
        bounds[2] = bounds[2].max(x);
        bounds[3] = bounds[3].max(y);
    }
    Some(bounds)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IndexableValue {
    /// Inverted-index term
    Term(String),
    /// Verbatim stored value
    Stored(Value),
    /// Sortable column value
    DocValue(String),
    /// Spatial primitive
    Shape(ShapePrimitive),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexableField {
    pub name: String,
    #[serde(flatten)]
    pub value: IndexableValue,
}

/// Encoded form of one source document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub fields: Vec<IndexableField>,
    /// Fields skipped under `ignore_malformed` or `ignore_above`
    pub ignored: Vec<String>,
}

impl ParsedDocument {
    pub fn fields_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a IndexableField> + 'a {
        self.fields.iter().filter(move |f| f.name == name)
    }

    pub fn shapes(&self, name: &str) -> Vec<ShapePrimitive> {
        self.fields_named(name)
            .filter_map(|f| match f.value {
                IndexableValue::Shape(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

/// Mutable state of one document parse
pub struct ParseContext<'a> {
    lookup: &'a MappingLookup,
    document: ParsedDocument,
}

impl<'a> ParseContext<'a> {
    pub fn new(lookup: &'a MappingLookup) -> Self {
        Self {
            lookup,
            document: ParsedDocument::default(),
        }
    }

    pub fn lookup(&self) -> &MappingLookup {
        self.lookup
    }

    pub fn add(&mut self, name: impl Into<String>, value: IndexableValue) {
        self.document.fields.push(IndexableField {
            name: name.into(),
            value,
        });
    }

    pub fn add_ignored(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.document.ignored.contains(&name) {
            self.document.ignored.push(name);
        }
    }

    /// Feeds `value` to each `copy_to` target. Copied values do not copy further.
    pub fn copy_value(&mut self, source: &str, targets: &[String], value: &Value) -> Result<()> {
        for target in targets {
            let mapper = self.lookup.mapper(target).map(Arc::clone).ok_or_else(|| {
                Error::MappingValidation {
                    field: source.to_string(),
                    referenced: target.clone(),
                    reason: "copy_to target does not exist".to_string(),
                }
            })?;
            mapper.parse(self, value)?;
        }
        Ok(())
    }

    pub fn finish(self) -> ParsedDocument {
        self.document
    }
}
