//! Type name -> type parser registry

use crate::keyword::KeywordTypeParser;
use crate::mapper::TypeParser;
use crate::object::ObjectTypeParser;
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct TypeParsers {
    parsers: AHashMap<String, Arc<dyn TypeParser>>,
}

impl TypeParsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `object` and `keyword`
    pub fn with_core_types() -> Self {
        let mut parsers = Self::new();
        parsers.register(crate::object::CONTENT_TYPE, ObjectTypeParser);
        parsers.register(crate::keyword::CONTENT_TYPE, KeywordTypeParser);
        parsers
    }

    pub fn register(&mut self, type_name: impl Into<String>, parser: impl TypeParser + 'static) {
        let type_name = type_name.into();
        tracing::debug!(type_name = %type_name, "registering type parser");
        self.parsers.insert(type_name, Arc::new(parser));
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn TypeParser>> {
        self.parsers.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.parsers.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for TypeParsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeParsers")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_types_registered() {
        let parsers = TypeParsers::with_core_types();
        assert_eq!(parsers.type_names(), vec!["keyword", "object"]);
        assert!(parsers.get("keyword").is_some());
        assert!(parsers.get("geo_shape").is_none());
    }
}
