//! Runtime field type descriptors
//!
//! A [`MappedFieldType`] is what the query and aggregation layers see of a
//! field: its name, type tag and capability flags. Concrete types embed a
//! [`FieldTypeBase`] for the common part and add their own state.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Capability flags and metadata shared by every field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTypeBase {
    pub name: String,
    pub searchable: bool,
    pub stored: bool,
    pub has_doc_values: bool,
    pub meta: BTreeMap<String, String>,
}

impl FieldTypeBase {
    pub fn new(
        name: impl Into<String>,
        searchable: bool,
        stored: bool,
        has_doc_values: bool,
    ) -> Self {
        Self {
            name: name.into(),
            searchable,
            stored,
            has_doc_values,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, meta: BTreeMap<String, String>) -> Self {
        self.meta = meta;
        self
    }
}

/// Sort handle returned when a field can be sorted on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub type_name: String,
}

pub trait MappedFieldType: fmt::Debug + Send + Sync + 'static {
    fn base(&self) -> &FieldTypeBase;

    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn is_searchable(&self) -> bool {
        self.base().searchable
    }

    fn is_stored(&self) -> bool {
        self.base().stored
    }

    fn has_doc_values(&self) -> bool {
        self.base().has_doc_values
    }

    fn meta(&self) -> &BTreeMap<String, String> {
        &self.base().meta
    }

    /// Sorting reads doc values; fields without them refuse up front
    fn sort_field(&self) -> Result<SortField> {
        if !self.has_doc_values() {
            return Err(Error::unsupported(
                self.name(),
                format!(
                    "can't sort on field of type [{}] without doc values",
                    self.type_name()
                ),
            ));
        }
        Ok(SortField {
            field: self.name().to_string(),
            type_name: self.type_name().to_string(),
        })
    }

    /// Source value as shown to the user in search hits
    fn value_for_display(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct PlainFieldType(FieldTypeBase);

    impl MappedFieldType for PlainFieldType {
        fn base(&self) -> &FieldTypeBase {
            &self.0
        }

        fn type_name(&self) -> &str {
            "plain"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_sort_requires_doc_values() {
        let sortable = PlainFieldType(FieldTypeBase::new("a", true, false, true));
        assert_eq!(sortable.sort_field().unwrap().field, "a");

        let unsortable = PlainFieldType(FieldTypeBase::new("b", true, false, false));
        match unsortable.sort_field() {
            Err(Error::UnsupportedOperation { field, .. }) => assert_eq!(field, "b"),
            other => panic!("expected UnsupportedOperation, got {:?}", other),
        }
    }

    #[test]
    fn test_value_for_display_passes_through() {
        let ft = PlainFieldType(FieldTypeBase::new("d", true, false, false));
        let value = serde_json::json!("x");
        assert_eq!(ft.value_for_display(&value).unwrap(), value);
    }
}
