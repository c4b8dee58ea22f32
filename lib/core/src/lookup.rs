//! Full-name index over a built mapping tree

use crate::error::{Error, Result};
use crate::field_type::{MappedFieldType, SortField};
use crate::mapper::Mapper;
use ahash::AHashMap;
use std::sync::Arc;

/// Read access to every mapper of a mapping by full name
#[derive(Debug, Clone, Default)]
pub struct MappingLookup {
    mappers: AHashMap<String, Arc<dyn Mapper>>,
}

impl MappingLookup {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Indexes `root`'s descendants. The root itself is not addressable.
    pub fn from_root(root: &Arc<dyn Mapper>) -> Self {
        let mut mappers = AHashMap::new();
        let mut stack = root.children();
        while let Some(mapper) = stack.pop() {
            stack.extend(mapper.children());
            mappers.insert(mapper.name().to_string(), mapper);
        }
        Self { mappers }
    }

    pub fn mapper(&self, name: &str) -> Option<&Arc<dyn Mapper>> {
        self.mappers.get(name)
    }

    pub fn field_type(&self, name: &str) -> Option<&dyn MappedFieldType> {
        self.mappers.get(name).and_then(|m| m.field_type())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappers.contains_key(name)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.mappers.get(name).map(|m| m.is_object()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Full names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mappers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolves a sort request against the field's capabilities
    pub fn sort_field(&self, name: &str) -> Result<SortField> {
        match self.mappers.get(name) {
            None => Err(Error::MappingValidation {
                field: "_sort".to_string(),
                referenced: name.to_string(),
                reason: "no mapping found for sort field".to_string(),
            }),
            Some(mapper) => match mapper.field_type() {
                Some(ft) => ft.sort_field(),
                None => Err(Error::unsupported(
                    name,
                    format!("can't sort on field of type [{}]", mapper.type_name()),
                )),
            },
        }
    }

    /// Validates that `referenced`, used by `field`, names a leaf field
    pub fn check_leaf_reference(&self, field: &str, referenced: &str, option: &str) -> Result<()> {
        if !self.contains(referenced) {
            return Err(Error::MappingValidation {
                field: field.to_string(),
                referenced: referenced.to_string(),
                reason: format!("[{}] target does not exist", option),
            });
        }
        if self.is_object(referenced) {
            return Err(Error::MappingValidation {
                field: field.to_string(),
                referenced: referenced.to_string(),
                reason: format!("[{}] cannot target an object field", option),
            });
        }
        Ok(())
    }
}
