//! Keyword fields: the whole value indexed as a single term

use crate::context::{BuilderContext, ParserContext};
use crate::document::{IndexableValue, ParseContext};
use crate::error::{Error, Result};
use crate::explicit::Explicit;
use crate::field_type::{FieldTypeBase, MappedFieldType};
use crate::lookup::MappingLookup;
use crate::mapper::{
    check_simple_name, merge_target, Conflicts, Mapper, MapperBuilder, MultiFields,
    MultiFieldsBuilder, TypeParser,
};
use crate::params;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONTENT_TYPE: &str = "keyword";

const DEFAULT_IGNORE_ABOVE: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordFieldType {
    base: FieldTypeBase,
    similarity: Option<String>,
}

impl KeywordFieldType {
    pub fn similarity(&self) -> Option<&str> {
        self.similarity.as_deref()
    }
}

impl MappedFieldType for KeywordFieldType {
    fn base(&self) -> &FieldTypeBase {
        &self.base
    }

    fn type_name(&self) -> &str {
        CONTENT_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct KeywordFieldMapper {
    simple_name: String,
    field_type: Arc<KeywordFieldType>,
    index: Explicit<bool>,
    store: Explicit<bool>,
    doc_values: Explicit<bool>,
    ignore_above: Explicit<u32>,
    multi_fields: MultiFields,
    copy_to: Vec<String>,
}

impl KeywordFieldMapper {
    pub fn ignore_above(&self) -> u32 {
        self.ignore_above.value()
    }

    pub fn multi_fields(&self) -> &MultiFields {
        &self.multi_fields
    }

    fn value_as_string(&self, value: &Value) -> Result<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(_) | Value::Bool(_) => Ok(value.to_string()),
            other => Err(Error::InvalidArgument(format!(
                "failed to parse field [{}] of type [{}]: expected a concrete value, got [{}]",
                self.name(),
                CONTENT_TYPE,
                other
            ))),
        }
    }
}

impl Mapper for KeywordFieldMapper {
    fn simple_name(&self) -> &str {
        &self.simple_name
    }

    fn name(&self) -> &str {
        self.field_type.name()
    }

    fn type_name(&self) -> &str {
        CONTENT_TYPE
    }

    fn merge(&self, other: &dyn Mapper) -> Result<Arc<dyn Mapper>> {
        let other: &KeywordFieldMapper = merge_target(self, other)?;

        let mut conflicts = Conflicts::new(self.name());
        conflicts.check("index", &self.index.value(), &other.index.value());
        conflicts.check("store", &self.store.value(), &other.store.value());
        conflicts.check("doc_values", &self.doc_values.value(), &other.doc_values.value());
        conflicts.check("similarity", &self.field_type.similarity, &other.field_type.similarity);
        conflicts.into_result()?;

        let meta = if other.field_type.meta().is_empty() {
            self.field_type.meta().clone()
        } else {
            other.field_type.meta().clone()
        };
        let field_type = KeywordFieldType {
            base: self.field_type.base.clone().with_meta(meta),
            similarity: self.field_type.similarity.clone(),
        };

        Ok(Arc::new(KeywordFieldMapper {
            simple_name: self.simple_name.clone(),
            field_type: Arc::new(field_type),
            index: self.index,
            store: self.store,
            doc_values: self.doc_values,
            ignore_above: self.ignore_above.merged_with(&other.ignore_above),
            multi_fields: self.multi_fields.merge(&other.multi_fields)?,
            copy_to: other.copy_to.clone(),
        }))
    }

    fn validate(&self, lookup: &MappingLookup) -> Result<()> {
        for target in &self.copy_to {
            lookup.check_leaf_reference(self.name(), target, params::COPY_TO)?;
        }
        self.multi_fields.validate(lookup)
    }

    fn parse(&self, context: &mut ParseContext<'_>, value: &Value) -> Result<()> {
        let text = self.value_as_string(value)?;
        if text.chars().count() > self.ignore_above.value() as usize {
            context.add_ignored(self.name());
        } else {
            if self.field_type.is_searchable() {
                context.add(self.name(), IndexableValue::Term(text.clone()));
            }
            if self.field_type.is_stored() {
                context.add(self.name(), IndexableValue::Stored(Value::String(text.clone())));
            }
            if self.field_type.has_doc_values() {
                context.add(self.name(), IndexableValue::DocValue(text));
            }
        }
        self.multi_fields.parse(context, value)
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(params::TYPE.to_string(), Value::String(CONTENT_TYPE.to_string()));
        let options = [
            ("index", self.index),
            ("store", self.store),
            ("doc_values", self.doc_values),
        ];
        for (key, option) in options {
            if option.is_explicit() {
                out.insert(key.to_string(), Value::Bool(option.value()));
            }
        }
        if self.ignore_above.is_explicit() {
            out.insert("ignore_above".to_string(), Value::from(self.ignore_above.value()));
        }
        if let Some(similarity) = &self.field_type.similarity {
            out.insert("similarity".to_string(), Value::String(similarity.clone()));
        }
        if let Some(fields) = self.multi_fields.to_json() {
            out.insert(params::FIELDS.to_string(), fields);
        }
        if !self.copy_to.is_empty() {
            out.insert(params::COPY_TO.to_string(), params::copy_to_json(&self.copy_to));
        }
        if !self.field_type.meta().is_empty() {
            out.insert(params::META.to_string(), params::meta_to_json(self.field_type.meta()));
        }
        Value::Object(out)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field_type(&self) -> Option<&dyn MappedFieldType> {
        Some(self.field_type.as_ref())
    }

    fn children(&self) -> Vec<Arc<dyn Mapper>> {
        self.multi_fields.to_vec()
    }

    fn copy_to(&self) -> &[String] {
        &self.copy_to
    }
}

#[derive(Debug)]
pub struct KeywordFieldMapperBuilder {
    name: String,
    index: Option<bool>,
    store: Option<bool>,
    doc_values: Option<bool>,
    ignore_above: Option<u32>,
    similarity: Option<String>,
    multi_fields: MultiFieldsBuilder,
    copy_to: Vec<String>,
    meta: BTreeMap<String, String>,
}

impl KeywordFieldMapperBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            store: None,
            doc_values: None,
            ignore_above: None,
            similarity: None,
            multi_fields: MultiFieldsBuilder::new(),
            copy_to: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn index(mut self, index: bool) -> Self {
        self.index = Some(index);
        self
    }

    pub fn store(mut self, store: bool) -> Self {
        self.store = Some(store);
        self
    }

    pub fn doc_values(mut self, doc_values: bool) -> Self {
        self.doc_values = Some(doc_values);
        self
    }

    pub fn ignore_above(mut self, ignore_above: u32) -> Self {
        self.ignore_above = Some(ignore_above);
        self
    }

    pub fn copy_to(mut self, target: impl Into<String>) -> Self {
        self.copy_to.push(target.into());
        self
    }

    pub fn add_multi_field(mut self, builder: Box<dyn MapperBuilder>) -> Self {
        self.multi_fields.add(builder);
        self
    }
}

impl MapperBuilder for KeywordFieldMapperBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(self: Box<Self>, context: &BuilderContext) -> Result<Arc<dyn Mapper>> {
        check_simple_name(&self.name)?;
        let index = Explicit::or_default(self.index, true);
        let store = Explicit::or_default(self.store, false);
        let doc_values = Explicit::or_default(self.doc_values, true);

        let base = FieldTypeBase::new(
            context.full_name(&self.name),
            index.value(),
            store.value(),
            doc_values.value(),
        )
        .with_meta(self.meta);
        let field_type = KeywordFieldType {
            base,
            similarity: self.similarity,
        };

        let multi_fields = self.multi_fields.build(&self.name, context)?;
        Ok(Arc::new(KeywordFieldMapper {
            simple_name: self.name,
            field_type: Arc::new(field_type),
            index,
            store,
            doc_values,
            ignore_above: Explicit::or_default(self.ignore_above, DEFAULT_IGNORE_ABOVE),
            multi_fields,
            copy_to: self.copy_to,
        }))
    }
}

pub struct KeywordTypeParser;

impl TypeParser for KeywordTypeParser {
    fn parse(
        &self,
        name: &str,
        node: &mut Map<String, Value>,
        context: &ParserContext,
    ) -> Result<Box<dyn MapperBuilder>> {
        let mut builder = KeywordFieldMapperBuilder::new(name);
        builder.index = params::take_bool(name, node, "index")?;
        builder.store = params::take_bool(name, node, "store")?;
        builder.doc_values = params::take_bool(name, node, "doc_values")?;
        builder.ignore_above = params::take_u32(name, node, "ignore_above")?;
        if builder.ignore_above == Some(0) {
            return Err(Error::InvalidArgument(format!(
                "[ignore_above] must be positive on field [{}]",
                name
            )));
        }
        if let Some(similarity) = params::take_string(name, node, "similarity")? {
            if context.similarity(&similarity).is_none() {
                return Err(Error::UnknownSimilarity {
                    field: name.to_string(),
                    name: similarity,
                });
            }
            builder.similarity = Some(similarity);
        }
        builder.copy_to = params::take_copy_to(name, node)?;
        builder.meta = params::take_meta(name, node)?;
        builder.multi_fields = params::take_multi_fields(name, node, context)?;
        Ok(Box::new(builder))
    }
}
