//! Legacy prefix-tree `geo_shape` fields
//!
//! Declarations that name `tree`, `strategy`, `precision`, `tree_levels`,
//! `distance_error_pct` or `points_only` are indexed as grid cells instead of
//! triangles. Each shape is covered by the cells it intersects at a level
//! chosen from the shape size and `distance_error_pct`; the cell tokens are
//! emitted as terms.

use crate::geometry::{validate, GeometryParser, InvalidShape, Orientation, ShapeResult};
use crate::mapper::{
    add_shape_values, display_unsupported, strategy_conflict, GeoShapeFieldMapper,
    GeoShapeFieldMapperBuilder, ShapeOptions, CONTENT_TYPE,
};
use crate::query::{
    GeoShapeQueryProcessor, GeoShapeQueryable, LegacyGeoShapeQueryProcessor, SpatialStrategy,
};
use geo::{BoundingRect, Relate};
use geo_types::{coord, Geometry, Rect};
use geomap_core::mapper::{check_simple_name, merge_target};
use geomap_core::params;
use geomap_core::{
    BuilderContext, Conflicts, Error, FieldTypeBase, IndexableValue, MappedFieldType, Mapper,
    MapperBuilder, MappingLookup, MultiFields, ParseContext, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const STRATEGY: &str = "strategy";
pub const TREE: &str = "tree";
pub const TREE_LEVELS: &str = "tree_levels";
pub const PRECISION: &str = "precision";
pub const DISTANCE_ERROR_PCT: &str = "distance_error_pct";
pub const POINTS_ONLY: &str = "points_only";

pub const DEFAULT_DISTANCE_ERROR_PCT: f64 = 0.025;
pub const DEFAULT_PRECISION_METERS: f64 = 50.0;

const METERS_PER_DEGREE: f64 = 111_319.490_793_273_57;
const MAX_CELLS: usize = 1024;
const GEOHASH_ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixTreeType {
    Geohash,
    Quadtree,
}

impl PrefixTreeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixTreeType::Geohash => "geohash",
            PrefixTreeType::Quadtree => "quadtree",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "geohash" => Some(PrefixTreeType::Geohash),
            "quadtree" => Some(PrefixTreeType::Quadtree),
            _ => None,
        }
    }

    pub fn max_levels(&self) -> u32 {
        match self {
            PrefixTreeType::Geohash => 12,
            PrefixTreeType::Quadtree => 26,
        }
    }

    /// Columns and rows of the grid at `level`
    fn grid(&self, level: u32) -> (u64, u64) {
        match self {
            PrefixTreeType::Quadtree => (1 << level, 1 << level),
            PrefixTreeType::Geohash => {
                let bits = 5 * level;
                (1 << ((bits + 1) / 2), 1 << (bits / 2))
            }
        }
    }

    /// Shallowest level whose cells are at most `degrees` wide
    fn level_for_width(&self, degrees: f64) -> u32 {
        (1..=self.max_levels())
            .find(|&level| 360.0 / self.grid(level).0 as f64 <= degrees)
            .unwrap_or_else(|| self.max_levels())
    }

    pub fn levels_for_precision(&self, meters: f64) -> u32 {
        self.level_for_width(meters / METERS_PER_DEGREE)
    }

    pub fn default_levels(&self) -> u32 {
        self.levels_for_precision(DEFAULT_PRECISION_METERS)
    }

    fn token(&self, level: u32, col: u64, row: u64) -> String {
        match self {
            PrefixTreeType::Quadtree => (0..level)
                .rev()
                .map(|i| {
                    let digit = ((col >> i) & 1) | (((row >> i) & 1) << 1);
                    char::from(b'0' + digit as u8)
                })
                .collect(),
            PrefixTreeType::Geohash => {
                let bits = 5 * level;
                let (mut lon_left, mut lat_left) = ((bits + 1) / 2, bits / 2);
                let mut out = String::with_capacity(level as usize);
                let mut chunk = 0usize;
                for k in 0..bits {
                    let bit = if k % 2 == 0 {
                        lon_left -= 1;
                        (col >> lon_left) & 1
                    } else {
                        lat_left -= 1;
                        (row >> lat_left) & 1
                    };
                    chunk = (chunk << 1) | bit as usize;
                    if k % 5 == 4 {
                        out.push(char::from(GEOHASH_ALPHABET[chunk]));
                        chunk = 0;
                    }
                }
                out
            }
        }
    }
}

impl fmt::Display for PrefixTreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses `50m`, `1km`, `0.5mi` or a bare number of meters
fn parse_distance(raw: &str) -> Option<f64> {
    let raw = raw.trim().to_ascii_lowercase();
    let split = raw
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: f64 = number.trim().parse().ok()?;
    let factor = match unit.trim() {
        "" | "m" | "meters" => 1.0,
        "km" | "kilometers" => 1_000.0,
        "cm" => 0.01,
        "mm" => 0.001,
        "mi" | "miles" => 1_609.344,
        "yd" => 0.9144,
        "ft" => 0.3048,
        "in" => 0.0254,
        "nmi" | "nm" => 1_852.0,
        _ => return None,
    };
    Some(value * factor)
}

/// Prefix-tree parameters exactly as declared
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeprecatedParameters {
    pub strategy: Option<SpatialStrategy>,
    pub tree: Option<PrefixTreeType>,
    pub tree_levels: Option<u32>,
    /// Meters
    pub precision: Option<f64>,
    pub distance_error_pct: Option<f64>,
    pub points_only: Option<bool>,
}

impl DeprecatedParameters {
    pub const KEYS: [&'static str; 6] =
        [STRATEGY, TREE, TREE_LEVELS, PRECISION, DISTANCE_ERROR_PCT, POINTS_ONLY];

    /// `None` when the declaration uses none of the prefix-tree keys
    pub fn take(field: &str, node: &mut Map<String, Value>) -> Result<Option<Self>> {
        if !Self::KEYS.iter().any(|key| node.contains_key(*key)) {
            return Ok(None);
        }
        let invalid =
            |message: String| Error::InvalidArgument(format!("{} on field [{}]", message, field));

        let strategy = params::take_string(field, node, STRATEGY)?
            .map(|raw| {
                SpatialStrategy::from_legacy(&raw)
                    .ok_or_else(|| invalid(format!("Unknown strategy [{}]", raw)))
            })
            .transpose()?;
        let tree = params::take_string(field, node, TREE)?
            .map(|raw| {
                PrefixTreeType::from_name(&raw)
                    .ok_or_else(|| invalid(format!("Unknown prefix tree type [{}]", raw)))
            })
            .transpose()?;
        let tree_levels = params::take_u32(field, node, TREE_LEVELS)?;
        if tree_levels == Some(0) {
            return Err(invalid("[tree_levels] must be positive".to_string()));
        }
        let precision = match node.remove(PRECISION) {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => Some(parse_distance(&s).ok_or_else(|| {
                invalid(format!("failed to parse [precision] value [{}]", s))
            })?),
            Some(other) => {
                return Err(invalid(format!("failed to parse [precision] value [{}]", other)))
            }
        };
        if matches!(precision, Some(p) if p <= 0.0) {
            return Err(invalid("[precision] must be greater than 0".to_string()));
        }
        let distance_error_pct = params::take_f64(field, node, DISTANCE_ERROR_PCT)?;
        if matches!(distance_error_pct, Some(pct) if !(0.0..=0.5).contains(&pct)) {
            return Err(invalid("[distance_error_pct] must be between 0.0 and 0.5".to_string()));
        }
        let points_only = params::take_bool(field, node, POINTS_ONLY)?;
        if strategy == Some(SpatialStrategy::Term) && points_only == Some(false) {
            return Err(invalid("points_only cannot be set to false for term strategy".to_string()));
        }

        Ok(Some(Self {
            strategy,
            tree,
            tree_levels,
            precision,
            distance_error_pct,
            points_only,
        }))
    }

    pub fn declared_keys(&self) -> Vec<&'static str> {
        let declared = [
            self.strategy.is_some(),
            self.tree.is_some(),
            self.tree_levels.is_some(),
            self.precision.is_some(),
            self.distance_error_pct.is_some(),
            self.points_only.is_some(),
        ];
        Self::KEYS
            .iter()
            .zip(declared)
            .filter_map(|(key, set)| set.then_some(*key))
            .collect()
    }

    pub fn resolve(&self) -> PrefixTreeSettings {
        let strategy = self.strategy.unwrap_or(SpatialStrategy::Recursive);
        let tree = self.tree.unwrap_or(PrefixTreeType::Geohash);
        let levels = match (self.tree_levels, self.precision) {
            (Some(levels), _) => levels.min(tree.max_levels()),
            (None, Some(meters)) => tree.levels_for_precision(meters),
            (None, None) => tree.default_levels(),
        };
        PrefixTreeSettings {
            strategy,
            tree,
            levels,
            distance_error_pct: self.distance_error_pct.unwrap_or(DEFAULT_DISTANCE_ERROR_PCT),
            points_only: self.points_only.unwrap_or(strategy == SpatialStrategy::Term),
        }
    }

    pub fn write_json(&self, out: &mut Map<String, Value>) {
        if let Some(strategy) = self.strategy {
            out.insert(STRATEGY.to_string(), Value::String(strategy.to_string()));
        }
        if let Some(tree) = self.tree {
            out.insert(TREE.to_string(), Value::String(tree.to_string()));
        }
        if let Some(levels) = self.tree_levels {
            out.insert(TREE_LEVELS.to_string(), Value::from(levels));
        }
        if let Some(precision) = self.precision {
            out.insert(PRECISION.to_string(), Value::String(format!("{}m", precision)));
        }
        if let Some(pct) = self.distance_error_pct {
            out.insert(DISTANCE_ERROR_PCT.to_string(), Value::from(pct));
        }
        if let Some(points_only) = self.points_only {
            out.insert(POINTS_ONLY.to_string(), Value::Bool(points_only));
        }
    }
}

/// Effective prefix-tree configuration after defaults
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefixTreeSettings {
    pub strategy: SpatialStrategy,
    pub tree: PrefixTreeType,
    pub levels: u32,
    pub distance_error_pct: f64,
    pub points_only: bool,
}

/// Covers shapes with prefix-tree cells
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixTreeIndexer {
    tree: PrefixTreeType,
    levels: u32,
    distance_error_pct: f64,
    points_only: bool,
}

impl PrefixTreeIndexer {
    pub fn new(
        tree: PrefixTreeType,
        levels: u32,
        distance_error_pct: f64,
        points_only: bool,
    ) -> Self {
        Self {
            tree,
            levels: levels.clamp(1, tree.max_levels()),
            distance_error_pct,
            points_only,
        }
    }

    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Cell terms for a document shape
    pub fn index(&self, geometry: &Geometry<f64>) -> ShapeResult<Vec<String>> {
        if self.points_only && !is_points(geometry) {
            return Err(InvalidShape(
                "field is configured for points only, found a non-point shape".to_string(),
            ));
        }
        self.cover(geometry)
    }

    /// Cells intersecting `geometry`, coarsened until at most a bounded number remain
    pub fn cover(&self, geometry: &Geometry<f64>) -> ShapeResult<Vec<String>> {
        validate(geometry)?;
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| InvalidShape("shape has no extent".to_string()))?;
        let mut level = self.level_for(&rect);
        loop {
            if let Some(cells) = self.cover_at(geometry, &rect, level) {
                if cells.len() <= MAX_CELLS || level == 1 {
                    return Ok(cells);
                }
            }
            level -= 1;
        }
    }

    fn level_for(&self, rect: &Rect<f64>) -> u32 {
        let error = rect.width().hypot(rect.height()) * self.distance_error_pct;
        if error <= 0.0 {
            return self.levels;
        }
        self.tree.level_for_width(error).clamp(1, self.levels)
    }

    fn cover_at(
        &self,
        geometry: &Geometry<f64>,
        rect: &Rect<f64>,
        level: u32,
    ) -> Option<Vec<String>> {
        let (cols, rows) = self.tree.grid(level);
        let width = 360.0 / cols as f64;
        let height = 180.0 / rows as f64;
        let col = |x: f64| (((x + 180.0) / width).floor().max(0.0) as u64).min(cols - 1);
        let row = |y: f64| (((y + 90.0) / height).floor().max(0.0) as u64).min(rows - 1);

        let (c0, c1) = (col(rect.min().x), col(rect.max().x));
        let (r0, r1) = (row(rect.min().y), row(rect.max().y));
        if (c1 - c0 + 1) * (r1 - r0 + 1) > (MAX_CELLS * 16) as u64 {
            return None;
        }

        let mut cells = Vec::new();
        for c in c0..=c1 {
            for r in r0..=r1 {
                let cell = Rect::new(
                    coord! {
                        x: -180.0 + c as f64 * width,
                        y: -90.0 + r as f64 * height,
                    },
                    coord! {
                        x: -180.0 + (c + 1) as f64 * width,
                        y: -90.0 + (r + 1) as f64 * height,
                    },
                );
                if Geometry::Rect(cell).relate(geometry).is_intersects() {
                    cells.push(self.tree.token(level, c, r));
                }
            }
        }
        Some(cells)
    }
}

fn is_points(geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => true,
        Geometry::GeometryCollection(collection) => collection.0.iter().all(is_points),
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct LegacyGeoShapeFieldType {
    base: FieldTypeBase,
    orientation: Orientation,
    tree: PrefixTreeSettings,
    query_processor: Arc<LegacyGeoShapeQueryProcessor>,
}

impl LegacyGeoShapeFieldType {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn tree(&self) -> &PrefixTreeSettings {
        &self.tree
    }
}

impl MappedFieldType for LegacyGeoShapeFieldType {
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

impl GeoShapeQueryable for LegacyGeoShapeFieldType {
    fn query_processor(&self) -> &dyn GeoShapeQueryProcessor {
        self.query_processor.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct LegacyGeoShapeFieldMapper {
    simple_name: String,
    field_type: Arc<LegacyGeoShapeFieldType>,
    options: ShapeOptions,
    parameters: DeprecatedParameters,
    parser: GeometryParser,
    indexer: PrefixTreeIndexer,
    multi_fields: MultiFields,
    copy_to: Vec<String>,
}

impl LegacyGeoShapeFieldMapper {
    fn assemble(
        simple_name: String,
        name: String,
        options: ShapeOptions,
        parameters: DeprecatedParameters,
        meta: BTreeMap<String, String>,
        multi_fields: MultiFields,
        copy_to: Vec<String>,
    ) -> Self {
        let tree = parameters.resolve();
        let indexer = PrefixTreeIndexer::new(
            tree.tree,
            tree.levels,
            tree.distance_error_pct,
            tree.points_only,
        );
        let field_type = LegacyGeoShapeFieldType {
            base: FieldTypeBase::new(name, true, false, false).with_meta(meta),
            orientation: options.orientation.value(),
            tree,
            query_processor: Arc::new(LegacyGeoShapeQueryProcessor::new(
                tree.strategy,
                indexer.clone(),
            )),
        };
        Self {
            simple_name,
            field_type: Arc::new(field_type),
            parser: options.parser(),
            options,
            parameters,
            indexer,
            multi_fields,
            copy_to,
        }
    }

    pub fn strategy(&self) -> SpatialStrategy {
        self.field_type.tree.strategy
    }

    pub fn options(&self) -> &ShapeOptions {
        &self.options
    }

    pub fn tree(&self) -> &PrefixTreeSettings {
        &self.field_type.tree
    }

    pub fn parameters(&self) -> &DeprecatedParameters {
        &self.parameters
    }
}

impl Mapper for LegacyGeoShapeFieldMapper {
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
        if let Some(vector) = other.as_any().downcast_ref::<GeoShapeFieldMapper>() {
            return Err(strategy_conflict(self.name(), self.strategy(), vector.strategy()));
        }
        let other: &LegacyGeoShapeFieldMapper = merge_target(self, other)?;

        let (current, incoming) = (self.tree(), other.tree());
        let mut conflicts = Conflicts::new(self.name());
        conflicts.check(STRATEGY, &current.strategy, &incoming.strategy);
        conflicts.check(TREE, &current.tree, &incoming.tree);
        conflicts.check(TREE_LEVELS, &current.levels, &incoming.levels);
        conflicts.check(
            DISTANCE_ERROR_PCT,
            &current.distance_error_pct,
            &incoming.distance_error_pct,
        );
        conflicts.check(POINTS_ONLY, &current.points_only, &incoming.points_only);
        let options = self.options.merge(&other.options, &mut conflicts);
        conflicts.into_result()?;

        let meta = if other.field_type.meta().is_empty() {
            self.field_type.meta().clone()
        } else {
            other.field_type.meta().clone()
        };
        tracing::debug!(field = %self.name(), "merged legacy geo_shape mapper");
        Ok(Arc::new(LegacyGeoShapeFieldMapper::assemble(
            self.simple_name.clone(),
            self.name().to_string(),
            options,
            self.parameters.clone(),
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
            .map(|cells| cells.into_iter().map(IndexableValue::Term).collect());
        add_shape_values(context, self.name(), self.options.ignore_malformed.value(), encoded)
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(params::TYPE.to_string(), Value::String(CONTENT_TYPE.to_string()));
        self.parameters.write_json(&mut out);
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
pub struct LegacyGeoShapeFieldMapperBuilder {
    base: GeoShapeFieldMapperBuilder,
    parameters: DeprecatedParameters,
}

impl LegacyGeoShapeFieldMapperBuilder {
    pub fn new(base: GeoShapeFieldMapperBuilder, parameters: DeprecatedParameters) -> Self {
        Self { base, parameters }
    }
}

impl MapperBuilder for LegacyGeoShapeFieldMapperBuilder {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn build(self: Box<Self>, context: &BuilderContext) -> Result<Arc<dyn Mapper>> {
        let Self { base, parameters } = *self;
        check_simple_name(&base.name)?;
        let options = base.options.resolve(context)?;
        let multi_fields = base.multi_fields.build(&base.name, context)?;
        let name = context.full_name(&base.name);
        Ok(Arc::new(LegacyGeoShapeFieldMapper::assemble(
            base.name,
            name,
            options,
            parameters,
            base.meta,
            multi_fields,
            base.copy_to,
        )))
    }
}
