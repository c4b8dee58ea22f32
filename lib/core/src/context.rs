//! Construction environments threaded through parsing and building
//!
//! - [`ContentPath`]: ancestor names used to derive a mapper's full name
//! - [`BuilderContext`]: settings + path handed to `MapperBuilder::build`
//! - [`ParserContext`]: type/similarity lookups handed to `TypeParser::parse`
//!
//! All three are plain values. Descending into an object or a multi-field
//! produces a new context instead of mutating the current one.

use crate::error::Result;
use crate::mapper::TypeParser;
use crate::registry::TypeParsers;
use crate::settings::{IndexSettings, Version};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Ordered ancestor names of the field currently being built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPath {
    parts: SmallVec<[String; 4]>,
}

impl ContentPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path one level deeper
    pub fn child(&self, name: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.push(name.to_string());
        Self { parts }
    }

    /// Dotted full name of a field with the given simple name at this level
    pub fn full_name(&self, simple_name: &str) -> String {
        if self.parts.is_empty() {
            return simple_name.to_string();
        }
        let mut name = self.parts.join(".");
        name.push('.');
        name.push_str(simple_name);
        name
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn depth(&self) -> usize {
        self.parts.len()
    }
}

/// Environment for `MapperBuilder::build`
#[derive(Debug, Clone)]
pub struct BuilderContext {
    index_settings: Arc<IndexSettings>,
    path: ContentPath,
    index_created_version: Version,
}

impl BuilderContext {
    pub fn new(index_settings: Arc<IndexSettings>, path: ContentPath) -> Result<Self> {
        let index_created_version = Version::index_created(&index_settings)?;
        Ok(Self {
            index_settings,
            path,
            index_created_version,
        })
    }

    pub fn path(&self) -> &ContentPath {
        &self.path
    }

    pub fn index_settings(&self) -> &Arc<IndexSettings> {
        &self.index_settings
    }

    pub fn index_created_version(&self) -> Version {
        self.index_created_version
    }

    /// Context for the children of the object named `name`
    pub fn child(&self, name: &str) -> Self {
        Self {
            index_settings: Arc::clone(&self.index_settings),
            path: self.path.child(name),
            index_created_version: self.index_created_version,
        }
    }

    pub fn full_name(&self, simple_name: &str) -> String {
        self.path.full_name(simple_name)
    }
}

/// Named scoring model a text-like field may declare via `similarity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityProvider {
    name: String,
    algorithm: String,
}

impl SimilarityProvider {
    pub fn new(name: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithm: algorithm.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

/// Similarity name -> provider lookup
#[derive(Debug, Clone)]
pub struct Similarities {
    providers: AHashMap<String, SimilarityProvider>,
}

impl Similarities {
    pub fn empty() -> Self {
        Self {
            providers: AHashMap::new(),
        }
    }

    pub fn register(&mut self, provider: SimilarityProvider) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&SimilarityProvider> {
        self.providers.get(name)
    }
}

impl Default for Similarities {
    /// The built-in `BM25` and `boolean` similarities
    fn default() -> Self {
        let mut similarities = Self::empty();
        similarities.register(SimilarityProvider::new("BM25", "BM25"));
        similarities.register(SimilarityProvider::new("boolean", "boolean"));
        similarities
    }
}

/// Environment for `TypeParser::parse`
#[derive(Clone)]
pub struct ParserContext {
    type_parsers: Arc<TypeParsers>,
    similarities: Arc<Similarities>,
    index_settings: Arc<IndexSettings>,
    index_version_created: Version,
    within_multi_field: bool,
}

impl ParserContext {
    pub fn new(
        type_parsers: Arc<TypeParsers>,
        similarities: Arc<Similarities>,
        index_settings: Arc<IndexSettings>,
    ) -> Result<Self> {
        let index_version_created = Version::index_created(&index_settings)?;
        Ok(Self {
            type_parsers,
            similarities,
            index_settings,
            index_version_created,
            within_multi_field: false,
        })
    }

    pub fn type_parser(&self, type_name: &str) -> Option<Arc<dyn TypeParser>> {
        self.type_parsers.get(type_name)
    }

    pub fn similarity(&self, name: &str) -> Option<&SimilarityProvider> {
        self.similarities.get(name)
    }

    pub fn index_version_created(&self) -> Version {
        self.index_version_created
    }

    pub fn index_settings(&self) -> &Arc<IndexSettings> {
        &self.index_settings
    }

    pub fn type_parsers(&self) -> &Arc<TypeParsers> {
        &self.type_parsers
    }

    pub fn similarities(&self) -> &Arc<Similarities> {
        &self.similarities
    }

    pub fn is_within_multi_field(&self) -> bool {
        self.within_multi_field
    }

    /// Same lookups, flagged as parsing inside a multi-field
    pub fn create_multi_field_context(&self) -> ParserContext {
        ParserContext {
            type_parsers: Arc::clone(&self.type_parsers),
            similarities: Arc::clone(&self.similarities),
            index_settings: Arc::clone(&self.index_settings),
            index_version_created: self.index_version_created,
            within_multi_field: true,
        }
    }

    /// Builder context rooted at the top of the mapping
    pub fn root_builder_context(&self) -> Result<BuilderContext> {
        BuilderContext::new(Arc::clone(&self.index_settings), ContentPath::new())
    }
}

impl fmt::Debug for ParserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserContext")
            .field("index_version_created", &self.index_version_created)
            .field("within_multi_field", &self.within_multi_field)
            .finish()
    }
}
