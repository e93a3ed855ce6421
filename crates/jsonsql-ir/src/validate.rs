//! Structural self-check for outgoing documents
//!
//! Walks a finished document and verifies the shapes the remote engine is
//! strict about, so an internal translation bug surfaces as a typed error
//! instead of an opaque remote rejection. This is a shape check, not a
//! semantic one; it knows nothing about tables or fields.

use serde_json::Value;
use thiserror::Error;

use crate::{JsonsqlDocument, SelectDocument};

#[derive(Debug, Error, PartialEq)]
pub enum ValidateError {
    #[error("select document `data` must be an array at the top level, got {got}")]
    DataNotArray { got: String },

    #[error("select document `from` must be a string or a non-empty array, got {got}")]
    MalformedFrom { got: String },

    #[error("function object missing `args` key: {fragment}")]
    FunctionMissingArgs { fragment: String },

    #[error("function object `function` key must be a string: {fragment}")]
    FunctionNameNotString { fragment: String },

    #[error("function `args` must be an array, string, or nested function object: {fragment}")]
    MalformedFunctionArgs { fragment: String },

    #[error("embedded select missing `{key}` key: {fragment}")]
    SelectMissingKey { key: &'static str, fragment: String },

    #[error("`values` must be an array of row arrays, got {got}")]
    MalformedValues { got: String },
}

fn fragment(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 120 {
        let head: String = text.chars().take(120).collect();
        format!("{head}...")
    } else {
        text
    }
}

/// Check a complete document before it is handed to the transport layer.
pub fn validate(doc: &JsonsqlDocument) -> Result<(), ValidateError> {
    match doc {
        JsonsqlDocument::Select(select) => validate_select(select),
        JsonsqlDocument::Insert(insert) => {
            match &insert.values {
                Value::Array(rows) if rows.iter().all(Value::is_array) => {}
                other => {
                    return Err(ValidateError::MalformedValues { got: fragment(other) });
                }
            }
            walk(&insert.values)
        }
        JsonsqlDocument::Update(update) => {
            walk(&update.set)?;
            if let Some(filter) = &update.filter {
                walk(filter)?;
            }
            Ok(())
        }
        JsonsqlDocument::Delete(delete) => {
            if let Some(filter) = &delete.filter {
                walk(filter)?;
            }
            Ok(())
        }
    }
}

fn validate_select(select: &SelectDocument) -> Result<(), ValidateError> {
    if !select.data.is_array() {
        return Err(ValidateError::DataNotArray { got: fragment(&select.data) });
    }
    match &select.from {
        Value::String(_) => {}
        Value::Array(entries) if !entries.is_empty() => {}
        other => return Err(ValidateError::MalformedFrom { got: fragment(other) }),
    }

    walk(&select.data)?;
    walk(&select.from)?;
    for clause in [&select.filter, &select.group_by, &select.order_by]
        .into_iter()
        .flatten()
    {
        walk(clause)?;
    }
    Ok(())
}

/// Recursive shape walk over a translated expression tree.
fn walk(value: &Value) -> Result<(), ValidateError> {
    match value {
        Value::Array(items) => {
            for item in items {
                walk(item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            if map.contains_key("function") {
                return walk_function(map, value);
            }
            if let Some(inner) = map.get("select") {
                return walk_embedded_select(inner);
            }
            for sub in map.values() {
                walk(sub)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn walk_function(
    map: &serde_json::Map<String, Value>,
    value: &Value,
) -> Result<(), ValidateError> {
    if !map["function"].is_string() {
        return Err(ValidateError::FunctionNameNotString { fragment: fragment(value) });
    }
    let Some(args) = map.get("args") else {
        return Err(ValidateError::FunctionMissingArgs { fragment: fragment(value) });
    };
    match args {
        Value::Array(items) => {
            for item in items {
                walk(item)?;
            }
            Ok(())
        }
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => Ok(()),
        Value::Object(inner) => {
            if inner.contains_key("function") || inner.contains_key("select") {
                walk(args)
            } else {
                Err(ValidateError::MalformedFunctionArgs { fragment: fragment(value) })
            }
        }
    }
}

fn walk_embedded_select(inner: &Value) -> Result<(), ValidateError> {
    for key in ["data", "from"] {
        if inner.get(key).is_none() {
            return Err(ValidateError::SelectMissingKey { key, fragment: fragment(inner) });
        }
    }
    // Subquery `data` may be a collapsed bare value, so no array check here.
    walk(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeleteDocument, InsertDocument};
    use serde_json::json;

    fn select(data: Value, from: Value) -> JsonsqlDocument {
        JsonsqlDocument::Select(SelectDocument {
            data,
            from,
            ..Default::default()
        })
    }

    #[test]
    fn test_accepts_count_star_shape() {
        let doc = select(json!([{"function": "count", "args": ["*"]}]), json!("tv_channel"));
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_accepts_nested_distinct_shape() {
        let doc = select(
            json!([{"function": "count", "args": {"function": "distinct", "args": "mac_addr"}}]),
            json!("terminal"),
        );
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_rejects_bare_value_data() {
        let doc = select(json!("id"), json!("media"));
        assert!(matches!(
            validate(&doc),
            Err(ValidateError::DataNotArray { .. })
        ));
    }

    #[test]
    fn test_rejects_function_without_args() {
        let doc = select(json!([{"function": "count"}]), json!("media"));
        assert!(matches!(
            validate(&doc),
            Err(ValidateError::FunctionMissingArgs { .. })
        ));
    }

    #[test]
    fn test_rejects_plain_object_args() {
        let doc = select(
            json!([{"function": "count", "args": {"field": "id"}}]),
            json!("media"),
        );
        assert!(matches!(
            validate(&doc),
            Err(ValidateError::MalformedFunctionArgs { .. })
        ));
    }

    #[test]
    fn test_embedded_select_requires_data_and_from() {
        let doc = JsonsqlDocument::Delete(DeleteDocument {
            from: "payment".to_string(),
            filter: Some(json!({"in": ["subscriber_id", {"select": {"data": "id"}}]})),
            returning: None,
        });
        assert!(matches!(
            validate(&doc),
            Err(ValidateError::SelectMissingKey { key: "from", .. })
        ));
    }

    #[test]
    fn test_embedded_select_allows_collapsed_data() {
        let doc = JsonsqlDocument::Delete(DeleteDocument {
            from: "payment".to_string(),
            filter: Some(json!({
                "in": ["subscriber_id", {"select": {"data": "id", "from": "subscriber"}}]
            })),
            returning: None,
        });
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn test_insert_values_must_be_row_arrays() {
        let doc = JsonsqlDocument::Insert(InsertDocument {
            into: "media".to_string(),
            columns: vec!["name".to_string()],
            values: json!(["trailer"]),
            returning: None,
        });
        assert!(matches!(
            validate(&doc),
            Err(ValidateError::MalformedValues { .. })
        ));
    }
}
