//! Option parsing shared by the type parsers
//!
//! Declarations arrive as JSON objects. Parsers `remove` each option they
//! understand so that whatever is left can be rejected as unknown.

use crate::context::ParserContext;
use crate::error::{Error, Result};
use crate::mapper::{check_simple_name, MapperBuilder, MultiFieldsBuilder};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const TYPE: &str = "type";
pub const PROPERTIES: &str = "properties";
pub const FIELDS: &str = "fields";
pub const COPY_TO: &str = "copy_to";
pub const META: &str = "meta";

/// Parses one field declaration into a builder via the registered parser
pub fn parse_field(
    name: &str,
    node: &Value,
    context: &ParserContext,
) -> Result<Box<dyn MapperBuilder>> {
    check_simple_name(name)?;
    let mut node = match node {
        Value::Object(map) => map.clone(),
        other => {
            return Err(Error::InvalidArgument(format!(
                "Expected map for property [{}] on field [{}] but got [{}]",
                TYPE, name, other
            )))
        }
    };

    let type_name = match node.remove(TYPE) {
        Some(Value::String(t)) => t,
        Some(other) => {
            return Err(Error::InvalidArgument(format!(
                "type of field [{}] must be a string, got [{}]",
                name, other
            )))
        }
        None if node.contains_key(PROPERTIES) => "object".to_string(),
        None => {
            return Err(Error::InvalidArgument(format!(
                "No type specified for field [{}]",
                name
            )))
        }
    };

    let parser = context
        .type_parser(&type_name)
        .ok_or_else(|| Error::UnknownType {
            field: name.to_string(),
            type_name: type_name.clone(),
        })?;
    let builder = parser.parse(name, &mut node, context)?;
    check_no_remaining_fields(name, &node)?;
    Ok(builder)
}

pub fn check_no_remaining_fields(field: &str, node: &Map<String, Value>) -> Result<()> {
    match node.keys().next() {
        Some(key) => Err(Error::UnknownParameter {
            field: field.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

/// Accepts JSON booleans and the strings "true"/"false"
pub fn take_bool(field: &str, node: &mut Map<String, Value>, key: &str) -> Result<Option<bool>> {
    match node.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) if s == "true" => Ok(Some(true)),
        Some(Value::String(s)) if s == "false" => Ok(Some(false)),
        Some(other) => Err(Error::InvalidArgument(format!(
            "Failed to parse value [{}] as only [true] or [false] are allowed for [{}] on \
             field [{}]",
            other, key, field
        ))),
    }
}

pub fn take_string(
    field: &str,
    node: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<String>> {
    match node.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(other.to_string())),
        Some(other) => Err(Error::InvalidArgument(format!(
            "[{}] on field [{}] must be a string, got [{}]",
            key, field, other
        ))),
    }
}

pub fn take_u32(field: &str, node: &mut Map<String, Value>, key: &str) -> Result<Option<u32>> {
    let invalid = |v: &Value| {
        Error::InvalidArgument(format!(
            "[{}] on field [{}] must be a non-negative integer, got [{}]",
            key, field, v
        ))
    };
    match node.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v @ Value::Number(_)) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(&v)),
        Some(Value::String(s)) => s
            .parse::<u32>()
            .map(Some)
            .map_err(|_| invalid(&Value::String(s.clone()))),
        Some(other) => Err(invalid(&other)),
    }
}

pub fn take_f64(field: &str, node: &mut Map<String, Value>, key: &str) -> Result<Option<f64>> {
    match node.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s.parse::<f64>().map(Some).map_err(|_| {
            Error::InvalidArgument(format!(
                "[{}] on field [{}] must be a number, got [{}]",
                key, field, s
            ))
        }),
        Some(other) => Err(Error::InvalidArgument(format!(
            "[{}] on field [{}] must be a number, got [{}]",
            key, field, other
        ))),
    }
}

/// `copy_to` accepts a single name or a list of names
pub fn take_copy_to(field: &str, node: &mut Map<String, Value>) -> Result<Vec<String>> {
    let invalid = |v: &Value| {
        Error::InvalidArgument(format!(
            "[{}] on field [{}] must be a field name or a list of field names, got [{}]",
            COPY_TO, field, v
        ))
    };
    match node.remove(COPY_TO) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(target)) => Ok(vec![target]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(|| invalid(item)))
            .collect(),
        Some(other) => Err(invalid(&other)),
    }
}

/// `meta` is a flat map of short string values
pub fn take_meta(field: &str, node: &mut Map<String, Value>) -> Result<BTreeMap<String, String>> {
    let mut meta = BTreeMap::new();
    match node.remove(META) {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (key, value) in entries {
                match value {
                    Value::String(s) if s.chars().count() <= 50 => {
                        meta.insert(key, s);
                    }
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "[meta] values on field [{}] must be strings of at most 50 \
                             chars, got [{}] for key [{}]",
                            field, other, key
                        )))
                    }
                }
            }
        }
        Some(other) => {
            return Err(Error::InvalidArgument(format!(
                "[meta] on field [{}] must be an object, got [{}]",
                field, other
            )))
        }
    }
    Ok(meta)
}

/// Parses `fields` into sub-builders under a multi-field context
pub fn take_multi_fields(
    field: &str,
    node: &mut Map<String, Value>,
    context: &ParserContext,
) -> Result<MultiFieldsBuilder> {
    let mut builder = MultiFieldsBuilder::new();
    let fields = match node.remove(FIELDS) {
        None | Some(Value::Null) => return Ok(builder),
        Some(Value::Object(fields)) => fields,
        Some(other) => {
            return Err(Error::InvalidArgument(format!(
                "[fields] on field [{}] must be an object, got [{}]",
                field, other
            )))
        }
    };
    if context.is_within_multi_field() {
        return Err(Error::InvalidArgument(format!(
            "Field [{}] cannot declare [fields] inside a multi-field",
            field
        )));
    }

    let multi_field_context = context.create_multi_field_context();
    for (sub_name, sub_node) in &fields {
        builder.add(parse_field(sub_name, sub_node, &multi_field_context)?);
    }
    Ok(builder)
}

pub fn meta_to_json(meta: &BTreeMap<String, String>) -> Value {
    Value::Object(
        meta.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

pub fn copy_to_json(copy_to: &[String]) -> Value {
    Value::Array(copy_to.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_take_bool_variants() {
        let mut n = node(json!({"a": true, "b": "false", "c": 1}));
        assert_eq!(take_bool("f", &mut n, "a").unwrap(), Some(true));
        assert_eq!(take_bool("f", &mut n, "b").unwrap(), Some(false));
        assert!(take_bool("f", &mut n, "c").is_err());
        assert_eq!(take_bool("f", &mut n, "missing").unwrap(), None);
        assert!(n.is_empty());
    }

    #[test]
    fn test_take_copy_to() {
        let mut n = node(json!({"copy_to": "all"}));
        assert_eq!(take_copy_to("f", &mut n).unwrap(), vec!["all"]);

        let mut n = node(json!({"copy_to": ["a", "b"]}));
        assert_eq!(take_copy_to("f", &mut n).unwrap(), vec!["a", "b"]);

        let mut n = node(json!({"copy_to": [1]}));
        assert!(take_copy_to("f", &mut n).is_err());
    }

    #[test]
    fn test_take_meta_limits() {
        let mut n = node(json!({"meta": {"unit": "deg"}}));
        assert_eq!(take_meta("f", &mut n).unwrap().get("unit").unwrap(), "deg");

        let mut n = node(json!({"meta": {"unit": 5}}));
        assert!(take_meta("f", &mut n).is_err());
    }

    #[test]
    fn test_remaining_fields_reported() {
        let n = node(json!({"bogus": 1}));
        match check_no_remaining_fields("geo", &n) {
            Err(Error::UnknownParameter { field, key }) => {
                assert_eq!(field, "geo");
                assert_eq!(key, "bogus");
            }
            other => panic!("expected UnknownParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_take_u32() {
        let mut n = node(json!({"a": 10, "b": "12", "c": -1}));
        assert_eq!(take_u32("f", &mut n, "a").unwrap(), Some(10));
        assert_eq!(take_u32("f", &mut n, "b").unwrap(), Some(12));
        assert!(take_u32("f", &mut n, "c").is_err());
    }
}
