//! The declared-field model
//!
//! - [`Mapper`]: an immutable node of the mapping tree (object or leaf field)
//! - [`MapperBuilder`]: mutable accumulator that produces exactly one mapper
//! - [`TypeParser`]: stateless factory turning a declaration into a builder
//! - [`MultiFields`]: alternate indexings of a leaf value under `fields`
//!
//! Mappers are shared as `Arc<dyn Mapper>` and never change after `build`.
//! A schema change is expressed by `merge`, which returns a new mapper.

use crate::context::{BuilderContext, ParserContext};
use crate::document::ParseContext;
use crate::error::{Error, Result};
use crate::field_type::MappedFieldType;
use crate::lookup::MappingLookup;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub trait Mapper: fmt::Debug + Send + Sync + 'static {
    /// Name at this level of the tree
    fn simple_name(&self) -> &str;

    /// Full dotted path, fixed at build time
    fn name(&self) -> &str;

    fn type_name(&self) -> &str;

    /// Returns `other` merged into `self`. Neither input changes.
    fn merge(&self, other: &dyn Mapper) -> Result<Arc<dyn Mapper>>;

    /// Checks references to other fields of the full mapping
    fn validate(&self, lookup: &MappingLookup) -> Result<()>;

    /// Encodes one document value into the parse context
    fn parse(&self, context: &mut ParseContext<'_>, value: &Value) -> Result<()>;

    /// Declaration form of this mapper (without its own name)
    fn to_json(&self) -> Value;

    fn as_any(&self) -> &dyn Any;

    fn field_type(&self) -> Option<&dyn MappedFieldType> {
        None
    }

    /// Object properties and multi-fields
    fn children(&self) -> Vec<Arc<dyn Mapper>> {
        Vec::new()
    }

    fn copy_to(&self) -> &[String] {
        &[]
    }

    fn is_object(&self) -> bool {
        false
    }
}

pub trait MapperBuilder: Send {
    fn name(&self) -> &str;

    fn build(self: Box<Self>, context: &BuilderContext) -> Result<Arc<dyn Mapper>>;
}

pub trait TypeParser: Send + Sync {
    /// Consumes the options it understands from `node`. Anything left over is
    /// reported as an unknown parameter by the caller.
    fn parse(
        &self,
        name: &str,
        node: &mut Map<String, Value>,
        context: &ParserContext,
    ) -> Result<Box<dyn MapperBuilder>>;
}

pub fn check_simple_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "field name cannot be null or empty".to_string(),
        ));
    }
    if name.contains('.') {
        return Err(Error::InvalidArgument(format!(
            "field name [{}] cannot contain '.'",
            name
        )));
    }
    Ok(())
}

/// Resolves the merge partner as the same concrete mapper type
pub fn merge_target<'a, T: Mapper>(this: &dyn Mapper, other: &'a dyn Mapper) -> Result<&'a T> {
    if this.type_name() != other.type_name() {
        return Err(Error::conflict(
            this.name(),
            format!(
                "mapper [{}] cannot be changed from type [{}] to [{}]",
                this.name(),
                this.type_name(),
                other.type_name()
            ),
        ));
    }
    other.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::conflict(
            this.name(),
            format!(
                "mapper [{}] of type [{}] cannot be merged with a different implementation",
                this.name(),
                this.type_name()
            ),
        )
    })
}

/// Collects conflicts for one merge so that all of them are reported together
#[derive(Debug, Default)]
pub struct Conflicts {
    field: String,
    messages: Vec<String>,
}

impl Conflicts {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            messages: Vec::new(),
        }
    }

    pub fn check<T: PartialEq + fmt::Debug>(&mut self, option: &str, current: &T, incoming: &T) {
        if current != incoming {
            self.messages.push(format!(
                "mapper [{}] has different [{}] values, current [{:?}], merged [{:?}]",
                self.field, option, current, incoming
            ));
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(Error::MergeConflict {
                field: self.field,
                conflicts: self.messages,
            })
        }
    }
}

/// Built multi-fields of a leaf mapper, keyed by simple name
#[derive(Debug, Clone, Default)]
pub struct MultiFields {
    mappers: BTreeMap<String, Arc<dyn Mapper>>,
}

impl MultiFields {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, simple_name: &str) -> Option<&Arc<dyn Mapper>> {
        self.mappers.get(simple_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Mapper>> {
        self.mappers.values()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Existing sub-fields are merged, new ones added
    pub fn merge(&self, other: &MultiFields) -> Result<MultiFields> {
        let mut mappers = self.mappers.clone();
        for (name, incoming) in &other.mappers {
            let merged = match mappers.get(name) {
                Some(current) => current.merge(incoming.as_ref())?,
                None => Arc::clone(incoming),
            };
            mappers.insert(name.clone(), merged);
        }
        Ok(MultiFields { mappers })
    }

    pub fn validate(&self, lookup: &MappingLookup) -> Result<()> {
        self.mappers.values().try_for_each(|m| m.validate(lookup))
    }

    pub fn parse(&self, context: &mut ParseContext<'_>, value: &Value) -> Result<()> {
        for mapper in self.mappers.values() {
            mapper.parse(context, value)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Option<Value> {
        if self.mappers.is_empty() {
            return None;
        }
        let fields: Map<String, Value> = self
            .mappers
            .iter()
            .map(|(name, m)| (name.clone(), m.to_json()))
            .collect();
        Some(Value::Object(fields))
    }

    pub fn to_vec(&self) -> Vec<Arc<dyn Mapper>> {
        self.mappers.values().cloned().collect()
    }
}

/// Sub-builders declared under `fields`
#[derive(Default)]
pub struct MultiFieldsBuilder {
    builders: Vec<Box<dyn MapperBuilder>>,
}

impl MultiFieldsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, builder: Box<dyn MapperBuilder>) {
        self.builders.push(builder);
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Sub-fields live one level below their parent field
    pub fn build(self, parent_simple_name: &str, context: &BuilderContext) -> Result<MultiFields> {
        let child_context = context.child(parent_simple_name);
        let mut mappers = BTreeMap::new();
        for builder in self.builders {
            let mapper = builder.build(&child_context)?;
            mappers.insert(mapper.simple_name().to_string(), mapper);
        }
        Ok(MultiFields { mappers })
    }
}

impl fmt::Debug for MultiFieldsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.builders.iter().map(|b| b.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_simple_name() {
        assert!(check_simple_name("geo").is_ok());
        assert!(matches!(check_simple_name(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(check_simple_name("  "), Err(Error::InvalidArgument(_))));
        assert!(matches!(check_simple_name("a.b"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_conflicts_collects_all() {
        let mut conflicts = Conflicts::new("geo");
        conflicts.check("orientation", &"ccw", &"cw");
        conflicts.check("coerce", &true, &true);
        conflicts.push("custom");

        match conflicts.into_result() {
            Err(Error::MergeConflict { field, conflicts }) => {
                assert_eq!(field, "geo");
                assert_eq!(conflicts.len(), 2);
                assert!(conflicts[0].contains("[orientation]"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert!(Conflicts::new("x").into_result().is_ok());
    }
}
