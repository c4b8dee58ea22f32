//! Object mappers: inner nodes of the mapping tree

use crate::context::{BuilderContext, ParserContext};
use crate::document::ParseContext;
use crate::error::{Error, Result};
use crate::explicit::Explicit;
use crate::lookup::MappingLookup;
use crate::mapper::{check_simple_name, merge_target, Conflicts, Mapper, MapperBuilder, TypeParser};
use crate::params::{self, PROPERTIES};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONTENT_TYPE: &str = "object";
pub const ROOT_NAME: &str = "_doc";

#[derive(Debug, Clone)]
pub struct ObjectMapper {
    simple_name: String,
    name: String,
    enabled: Explicit<bool>,
    root: bool,
    mappers: BTreeMap<String, Arc<dyn Mapper>>,
}

impl ObjectMapper {
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.value()
    }

    pub fn get(&self, simple_name: &str) -> Option<&Arc<dyn Mapper>> {
        self.mappers.get(simple_name)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Object child named by the first segment of a dotted key, and the rest of the key
    fn dotted_target<'k>(&self, key: &'k str) -> Option<(&Arc<dyn Mapper>, &'k str)> {
        let (head, rest) = key.split_once('.')?;
        let child = self.mappers.get(head).filter(|m| m.is_object())?;
        Some((child, rest))
    }

    fn parse_child(
        context: &mut ParseContext<'_>,
        child: &Arc<dyn Mapper>,
        value: &Value,
    ) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Array(items) => items
                .iter()
                .try_for_each(|item| Self::parse_child(context, child, item)),
            _ => {
                child.parse(context, value)?;
                context.copy_value(child.name(), child.copy_to(), value)
            }
        }
    }
}

impl Mapper for ObjectMapper {
    fn simple_name(&self) -> &str {
        &self.simple_name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        CONTENT_TYPE
    }

    fn merge(&self, other: &dyn Mapper) -> Result<Arc<dyn Mapper>> {
        let other: &ObjectMapper = merge_target(self, other)?;

        let mut conflicts = Conflicts::new(&self.name);
        if other.enabled.is_explicit() {
            conflicts.check("enabled", &self.enabled.value(), &other.enabled.value());
        }
        conflicts.into_result()?;

        let mut mappers = self.mappers.clone();
        for (child_name, incoming) in &other.mappers {
            let merged = match mappers.get(child_name) {
                Some(current) => current.merge(incoming.as_ref())?,
                None => Arc::clone(incoming),
            };
            mappers.insert(child_name.clone(), merged);
        }

        Ok(Arc::new(ObjectMapper {
            simple_name: self.simple_name.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
            root: self.root,
            mappers,
        }))
    }

    fn validate(&self, lookup: &MappingLookup) -> Result<()> {
        self.mappers.values().try_for_each(|m| m.validate(lookup))
    }

    fn parse(&self, context: &mut ParseContext<'_>, value: &Value) -> Result<()> {
        if !self.enabled.value() {
            return Ok(());
        }
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "object mapping for [{}] tried to parse field as object, but found a \
                     concrete value [{}]",
                    self.name, other
                )))
            }
        };
        for (key, child_value) in object {
            if let Some(child) = self.mappers.get(key) {
                Self::parse_child(context, child, child_value)?;
            } else if let Some((parent, rest)) = self.dotted_target(key) {
                // `a.b: v` is read as `a: {b: v}`
                let mut expanded = Map::new();
                expanded.insert(rest.to_string(), child_value.clone());
                parent.parse(context, &Value::Object(expanded))?;
            } else {
                tracing::debug!(object = %self.name, field = %key, "skipping unmapped field");
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        if !self.root && self.mappers.is_empty() {
            out.insert(params::TYPE.to_string(), Value::String(CONTENT_TYPE.to_string()));
        }
        if self.enabled.is_explicit() {
            out.insert("enabled".to_string(), Value::Bool(self.enabled.value()));
        }
        if !self.mappers.is_empty() || self.root {
            let properties: Map<String, Value> = self
                .mappers
                .iter()
                .map(|(name, m)| (name.clone(), m.to_json()))
                .collect();
            out.insert(PROPERTIES.to_string(), Value::Object(properties));
        }
        Value::Object(out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Arc<dyn Mapper>> {
        self.mappers.values().cloned().collect()
    }

    fn is_object(&self) -> bool {
        true
    }
}

pub struct ObjectMapperBuilder {
    name: String,
    enabled: Option<bool>,
    root: bool,
    children: Vec<Box<dyn MapperBuilder>>,
}

impl ObjectMapperBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: None,
            root: false,
            children: Vec::new(),
        }
    }

    /// Top-level object; its children are named without a prefix
    pub fn root() -> Self {
        Self {
            root: true,
            ..Self::new(ROOT_NAME)
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn add(mut self, child: Box<dyn MapperBuilder>) -> Self {
        self.children.push(child);
        self
    }
}

impl MapperBuilder for ObjectMapperBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(self: Box<Self>, context: &BuilderContext) -> Result<Arc<dyn Mapper>> {
        check_simple_name(&self.name)?;
        let child_context = if self.root {
            context.clone()
        } else {
            context.child(&self.name)
        };

        let mut mappers = BTreeMap::new();
        for child in self.children {
            let mapper = child.build(&child_context)?;
            mappers.insert(mapper.simple_name().to_string(), mapper);
        }

        let name = if self.root {
            self.name.clone()
        } else {
            context.full_name(&self.name)
        };
        Ok(Arc::new(ObjectMapper {
            simple_name: self.name,
            name,
            enabled: Explicit::or_default(self.enabled, true),
            root: self.root,
            mappers,
        }))
    }
}

/// Parses the children of a `properties` block into `builder`
pub fn parse_properties(
    mut builder: ObjectMapperBuilder,
    properties: &Value,
    context: &ParserContext,
) -> Result<ObjectMapperBuilder> {
    let properties = properties.as_object().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "Expected map for [properties] on object [{}] but got [{}]",
            builder.name, properties
        ))
    })?;
    for (child_name, child_node) in properties {
        builder = builder.add(params::parse_field(child_name, child_node, context)?);
    }
    Ok(builder)
}

pub struct ObjectTypeParser;

impl TypeParser for ObjectTypeParser {
    fn parse(
        &self,
        name: &str,
        node: &mut Map<String, Value>,
        context: &ParserContext,
    ) -> Result<Box<dyn MapperBuilder>> {
        if context.is_within_multi_field() {
            return Err(Error::InvalidArgument(format!(
                "Type [{}] cannot be used in multi field [{}]",
                CONTENT_TYPE, name
            )));
        }
        let mut builder = ObjectMapperBuilder::new(name);
        if let Some(enabled) = params::take_bool(name, node, "enabled")? {
            builder = builder.enabled(enabled);
        }
        if let Some(properties) = node.remove(PROPERTIES) {
            builder = parse_properties(builder, &properties, context)?;
        }
        Ok(Box::new(builder))
    }
}
