//! The `geo_shape` field mapper (vector strategy)
//!
//! Declarations carrying any prefix-tree parameter are routed to
//! [`LegacyGeoShapeFieldMapper`](crate::legacy::LegacyGeoShapeFieldMapper)
//! by [`ParsedDeclaration::resolve`]; everything else builds a
//! [`GeoShapeFieldMapper`] that indexes triangles.

use crate::geometry::{GeometryParser, Orientation, ShapeResult};
use crate::indexer::GeoShapeIndexer;
use crate::legacy::{
    DeprecatedParameters, LegacyGeoShapeFieldMapper, LegacyGeoShapeFieldMapperBuilder,
};
use crate::query::{
    GeoShapeQueryProcessor, GeoShapeQueryable, SpatialStrategy, VectorGeoShapeQueryProcessor,
};
use geomap_core::mapper::{check_simple_name, merge_target};
use geomap_core::params;
use geomap_core::settings::{INDEX_MAPPING_COERCE, INDEX_MAPPING_IGNORE_MALFORMED};
use geomap_core::{
    BuilderContext, Conflicts, Error, Explicit, FieldTypeBase, IndexableValue, MappedFieldType,
    Mapper, MapperBuilder, MappingLookup, MultiFields, MultiFieldsBuilder, ParseContext,
    ParserContext, Result, TypeParser, Version,
};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONTENT_TYPE: &str = "geo_shape";

pub const IGNORE_MALFORMED: &str = "ignore_malformed";
pub const COERCE: &str = "coerce";
pub const IGNORE_Z_VALUE: &str = "ignore_z_value";
pub const ORIENTATION: &str = "orientation";

/// Options as written in the declaration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeclaredShapeOptions {
    pub ignore_malformed: Option<bool>,
    pub coerce: Option<bool>,
    pub ignore_z_value: Option<bool>,
    pub orientation: Option<Orientation>,
}

impl DeclaredShapeOptions {
    pub fn take(field: &str, node: &mut Map<String, Value>) -> Result<Self> {
        let orientation = params::take_string(field, node, ORIENTATION)?
            .map(|raw| {
                raw.parse::<Orientation>()
                    .map_err(|e| Error::InvalidArgument(format!("{} on field [{}]", e, field)))
            })
            .transpose()?;
        Ok(Self {
            ignore_malformed: params::take_bool(field, node, IGNORE_MALFORMED)?,
            coerce: params::take_bool(field, node, COERCE)?,
            ignore_z_value: params::take_bool(field, node, IGNORE_Z_VALUE)?,
            orientation,
        })
    }

    /// Declared values win; index settings supply the remaining defaults
    pub fn resolve(&self, context: &BuilderContext) -> Result<ShapeOptions> {
        let settings = context.index_settings();
        let ignore_malformed = match self.ignore_malformed {
            Some(value) => Explicit::explicit(value),
            None => Explicit::implicit(settings.get_bool(INDEX_MAPPING_IGNORE_MALFORMED, false)?),
        };
        let coerce = match self.coerce {
            Some(value) => Explicit::explicit(value),
            None => Explicit::implicit(settings.get_bool(INDEX_MAPPING_COERCE, false)?),
        };
        Ok(ShapeOptions {
            ignore_malformed,
            coerce,
            ignore_z_value: Explicit::or_default(self.ignore_z_value, true),
            orientation: Explicit::or_default(self.orientation, Orientation::default()),
        })
    }
}

/// Resolved per-field shape options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeOptions {
    pub ignore_malformed: Explicit<bool>,
    pub coerce: Explicit<bool>,
    pub ignore_z_value: Explicit<bool>,
    pub orientation: Explicit<Orientation>,
}

impl ShapeOptions {
    pub fn parser(&self) -> GeometryParser {
        GeometryParser::new(
            self.orientation.value(),
            self.coerce.value(),
            self.ignore_z_value.value(),
        )
    }

    /// Orientation is fixed; the other options take explicit incoming values
    pub fn merge(&self, other: &ShapeOptions, conflicts: &mut Conflicts) -> ShapeOptions {
        conflicts.check(ORIENTATION, &self.orientation.value(), &other.orientation.value());
        ShapeOptions {
            ignore_malformed: self.ignore_malformed.merged_with(&other.ignore_malformed),
            coerce: self.coerce.merged_with(&other.coerce),
            ignore_z_value: self.ignore_z_value.merged_with(&other.ignore_z_value),
            orientation: self.orientation,
        }
    }

    pub fn write_json(&self, out: &mut Map<String, Value>) {
        for (key, option) in [
            (IGNORE_MALFORMED, self.ignore_malformed),
            (COERCE, self.coerce),
            (IGNORE_Z_VALUE, self.ignore_z_value),
        ] {
            if option.is_explicit() {
                out.insert(key.to_string(), Value::Bool(option.value()));
            }
        }
        if self.orientation.is_explicit() {
            out.insert(
                ORIENTATION.to_string(),
                Value::String(self.orientation.value().to_string()),
            );
        }
    }
}

/// Appends encoded values, or applies the `ignore_malformed` policy
pub(crate) fn add_shape_values(
    context: &mut ParseContext<'_>,
    field: &str,
    ignore_malformed: bool,
    encoded: ShapeResult<Vec<IndexableValue>>,
) -> Result<()> {
    match encoded {
        Ok(values) => {
            for value in values {
                context.add(field, value);
            }
            Ok(())
        }
        Err(e) if ignore_malformed => {
            tracing::warn!(field = %field, error = %e, "ignoring malformed shape");
            context.add_ignored(field);
            Ok(())
        }
        Err(e) => Err(Error::MalformedGeometry {
            field: field.to_string(),
            type_name: CONTENT_TYPE.to_string(),
            reason: e.to_string(),
        }),
    }
}

pub(crate) fn strategy_conflict(
    field: &str,
    current: SpatialStrategy,
    incoming: SpatialStrategy,
) -> Error {
    Error::conflict(
        field,
        format!(
            "mapper [{}] of type [{}] with [{}] strategy cannot be merged with [{}] strategy",
            field, CONTENT_TYPE, current, incoming
        ),
    )
}

pub(crate) fn display_unsupported(field: &str) -> Error {
    Error::unsupported(
        field,
        format!("field of type [{}] doesn't support formatting values for display", CONTENT_TYPE),
    )
}

#[derive(Debug, Clone)]
pub struct GeoShapeFieldType {
    base: FieldTypeBase,
    orientation: Orientation,
    query_processor: Arc<VectorGeoShapeQueryProcessor>,
}

impl GeoShapeFieldType {
    pub fn new(
        name: impl Into<String>,
        orientation: Orientation,
        meta: BTreeMap<String, String>,
    ) -> Self {
        Self {
            base: FieldTypeBase::new(name, true, false, false).with_meta(meta),
            orientation,
            query_processor: Arc::new(VectorGeoShapeQueryProcessor::new(orientation)),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

impl MappedFieldType for GeoShapeFieldType {
    fn base(&self) -> &FieldTypeBase {
        &self.base
    }

    fn type_name(&self) -> &str {
        CONTENT_TYPE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value_for_display(&self, _value: &Value) -> Result<Value> {
        Err(display_unsupported(self.name()))
    }
}

impl GeoShapeQueryable for GeoShapeFieldType {
    fn query_processor(&self) -> &dyn GeoShapeQueryProcessor {
        self.query_processor.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct GeoShapeFieldMapper {
    simple_name: String,
    field_type: Arc<GeoShapeFieldType>,
    options: ShapeOptions,
    parser: GeometryParser,
    indexer: GeoShapeIndexer,
    multi_fields: MultiFields,
    copy_to: Vec<String>,
}

impl GeoShapeFieldMapper {
    fn assemble(
        simple_name: String,
        name: String,
        options: ShapeOptions,
        meta: BTreeMap<String, String>,
        multi_fields: MultiFields,
        copy_to: Vec<String>,
    ) -> Self {
        let orientation = options.orientation.value();
        Self {
            simple_name,
            indexer: GeoShapeIndexer::new(orientation, name.clone()),
            field_type: Arc::new(GeoShapeFieldType::new(name, orientation, meta)),
            parser: options.parser(),
            options,
            multi_fields,
            copy_to,
        }
    }

    pub fn options(&self) -> &ShapeOptions {
        &self.options
    }

    pub fn geo_shape_field_type(&self) -> &GeoShapeFieldType {
        &self.field_type
    }

    pub fn multi_fields(&self) -> &MultiFields {
        &self.multi_fields
    }

    pub fn strategy(&self) -> SpatialStrategy {
        SpatialStrategy::Bkd
    }
}

impl Mapper for GeoShapeFieldMapper {
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
        if let Some(legacy) = other.as_any().downcast_ref::<LegacyGeoShapeFieldMapper>() {
            return Err(strategy_conflict(self.name(), self.strategy(), legacy.strategy()));
        }
        let other: &GeoShapeFieldMapper = merge_target(self, other)?;

        let mut conflicts = Conflicts::new(self.name());
        let options = self.options.merge(&other.options, &mut conflicts);
        conflicts.into_result()?;

        let meta = if other.field_type.meta().is_empty() {
            self.field_type.meta().clone()
        } else {
            other.field_type.meta().clone()
        };
        tracing::debug!(field = %self.name(), "merged geo_shape mapper");
        Ok(Arc::new(GeoShapeFieldMapper::assemble(
            self.simple_name.clone(),
            self.name().to_string(),
            options,
            meta,
            self.multi_fields.merge(&other.multi_fields)?,
            other.copy_to.clone(),
        )))
    }

    fn validate(&self, lookup: &MappingLookup) -> Result<()> {
        for target in &self.copy_to {
            lookup.check_leaf_reference(self.name(), target, params::COPY_TO)?;
        }
        self.multi_fields.validate(lookup)
    }

    fn parse(&self, context: &mut ParseContext<'_>, value: &Value) -> Result<()> {
        let encoded = self
            .parser
            .parse(value)
            .and_then(|geometry| self.indexer.index(&geometry))
            .map(|primitives| primitives.into_iter().map(IndexableValue::Shape).collect());
        add_shape_values(context, self.name(), self.options.ignore_malformed.value(), encoded)
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(params::TYPE.to_string(), Value::String(CONTENT_TYPE.to_string()));
        self.options.write_json(&mut out);
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
pub struct GeoShapeFieldMapperBuilder {
    pub(crate) name: String,
    pub(crate) options: DeclaredShapeOptions,
    pub(crate) multi_fields: MultiFieldsBuilder,
    pub(crate) copy_to: Vec<String>,
    pub(crate) meta: BTreeMap<String, String>,
}

impl GeoShapeFieldMapperBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: DeclaredShapeOptions::default(),
            multi_fields: MultiFieldsBuilder::new(),
            copy_to: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.options.orientation = Some(orientation);
        self
    }

    pub fn coerce(mut self, coerce: bool) -> Self {
        self.options.coerce = Some(coerce);
        self
    }

    pub fn ignore_malformed(mut self, ignore_malformed: bool) -> Self {
        self.options.ignore_malformed = Some(ignore_malformed);
        self
    }

    pub fn ignore_z_value(mut self, ignore_z_value: bool) -> Self {
        self.options.ignore_z_value = Some(ignore_z_value);
        self
    }

    pub fn copy_to(mut self, target: impl Into<String>) -> Self {
        self.copy_to.push(target.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn add_multi_field(mut self, builder: Box<dyn MapperBuilder>) -> Self {
        self.multi_fields.add(builder);
        self
    }
}

impl MapperBuilder for GeoShapeFieldMapperBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(self: Box<Self>, context: &BuilderContext) -> Result<Arc<dyn Mapper>> {
        check_simple_name(&self.name)?;
        let options = self.options.resolve(context)?;
        let multi_fields = self.multi_fields.build(&self.name, context)?;
        let name = context.full_name(&self.name);
        Ok(Arc::new(GeoShapeFieldMapper::assemble(
            self.name,
            name,
            options,
            self.meta,
            multi_fields,
            self.copy_to,
        )))
    }
}

/// Which mapper a `geo_shape` declaration resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDeclaration {
    Current,
    Legacy(DeprecatedParameters),
}

impl ParsedDeclaration {
    /// Removes any prefix-tree parameters from `node`
    pub fn resolve(
        field: &str,
        node: &mut Map<String, Value>,
        context: &ParserContext,
    ) -> Result<Self> {
        match DeprecatedParameters::take(field, node)? {
            None => Ok(ParsedDeclaration::Current),
            Some(parameters) => {
                let created = context.index_version_created();
                if created.on_or_after(Version::V_8_0_0) {
                    return Err(Error::InvalidArgument(format!(
                        "using deprecated parameters {:?} in mapper [{}] of type [{}] is no longer \
                         allowed for indices created on or after {}",
                        parameters.declared_keys(),
                        field,
                        CONTENT_TYPE,
                        Version::V_8_0_0
                    )));
                }
                tracing::warn!(
                    field = %field,
                    parameters = ?parameters.declared_keys(),
                    "geo_shape prefix-tree parameters are deprecated"
                );
                Ok(ParsedDeclaration::Legacy(parameters))
            }
        }
    }
}

pub struct GeoShapeTypeParser;

impl TypeParser for GeoShapeTypeParser {
    fn parse(
        &self,
        name: &str,
        node: &mut Map<String, Value>,
        context: &ParserContext,
    ) -> Result<Box<dyn MapperBuilder>> {
        let declaration = ParsedDeclaration::resolve(name, node, context)?;

        let mut builder = GeoShapeFieldMapperBuilder::new(name);
        builder.options = DeclaredShapeOptions::take(name, node)?;
        for key in ["store", "doc_values"] {
            if params::take_bool(name, node, key)? == Some(true) {
                return Err(Error::unsupported(
                    name,
                    format!("field type [{}] does not support [{}]", CONTENT_TYPE, key),
                ));
            }
        }
        builder.copy_to = params::take_copy_to(name, node)?;
        builder.meta = params::take_meta(name, node)?;
        builder.multi_fields = params::take_multi_fields(name, node, context)?;

        Ok(match declaration {
            ParsedDeclaration::Current => Box::new(builder),
            ParsedDeclaration::Legacy(parameters) => {
                Box::new(LegacyGeoShapeFieldMapperBuilder::new(builder, parameters))
            }
        })
    }
}
