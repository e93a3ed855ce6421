//! JSONSQL wire documents
//!
//! The document types the remote engine's JSON-RPC endpoint accepts.
//! Translated expressions are plain [`serde_json::Value`] trees; the structs
//! here pin down the top-level key layout of each statement kind and which
//! keys are omitted when absent.
//!
//! # Example
//!
//! ```
//! use jsonsql_ir::{JsonsqlDocument, SelectDocument};
//! use serde_json::json;
//!
//! let doc = JsonsqlDocument::Select(SelectDocument {
//!     data: json!([{"function": "count", "args": ["*"]}]),
//!     from: json!("tv_channel"),
//!     ..Default::default()
//! });
//! assert_eq!(
//!     serde_json::to_string(&doc).unwrap(),
//!     r#"{"data":[{"function":"count","args":["*"]}],"from":"tv_channel"}"#
//! );
//! ```

pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use validate::{validate, ValidateError};

/// A complete query document, ready for JSON-RPC submission.
///
/// The wire protocol has no statement-kind tag; the key set alone identifies
/// the variant, so serialization is untagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonsqlDocument {
    Select(SelectDocument),
    Insert(InsertDocument),
    Update(UpdateDocument),
    Delete(DeleteDocument),
}

impl JsonsqlDocument {
    /// The document as a JSON value tree.
    pub fn to_value(&self) -> Value {
        // Serialization of these types cannot fail: no non-string map keys,
        // no non-finite floats are ever produced by translation.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Content-addressed identity of the document.
    ///
    /// Two documents with identical structure produce identical hashes, so
    /// this works as a cache key for prepared remote queries.
    pub fn fingerprint(&self) -> String {
        let json = self.to_value().to_string();
        format!("{:x}", Sha256::digest(json.as_bytes()))
    }
}

fn is_false(b: &bool) -> bool {
    !b
}

/// `SELECT` document: `{"data":...,"from":...,"where":...,...}`.
///
/// `data` is an array of projection expressions at the top level; when the
/// document is embedded as a subquery a single-element projection collapses
/// to the bare expression.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectDocument {
    pub data: Value,
    pub from: Value,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group_by: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order_by: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "is_false", default)]
    pub distinct: bool,
}

/// `INSERT` document: `{"into":...,"columns":...,"values":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertDocument {
    pub into: String,
    pub columns: Vec<String>,
    /// One inner array per inserted row.
    pub values: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub returning: Option<Value>,
}

/// `UPDATE` document: `{"table":...,"set":...,"where":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub table: String,
    /// Column name to translated value expression.
    pub set: Value,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub returning: Option<Value>,
}

/// `DELETE` document: `{"from":...,"where":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteDocument {
    pub from: String,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none", default)]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub returning: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_serializes_minimal_keys() {
        let doc = JsonsqlDocument::Select(SelectDocument {
            data: json!(["id", "name"]),
            from: json!("media"),
            ..Default::default()
        });
        assert_eq!(
            doc.to_value(),
            json!({"data": ["id", "name"], "from": "media"})
        );
    }

    #[test]
    fn test_select_where_key_renamed() {
        let doc = JsonsqlDocument::Select(SelectDocument {
            data: json!(["id"]),
            from: json!("media"),
            filter: Some(json!({"eq": ["id", 5]})),
            ..Default::default()
        });
        let value = doc.to_value();
        assert_eq!(value["where"], json!({"eq": ["id", 5]}));
        assert!(value.get("filter").is_none());
    }

    #[test]
    fn test_distinct_omitted_when_false() {
        let plain = JsonsqlDocument::Select(SelectDocument {
            data: json!(["id"]),
            from: json!("media"),
            ..Default::default()
        });
        assert!(plain.to_value().get("distinct").is_none());

        let distinct = JsonsqlDocument::Select(SelectDocument {
            data: json!(["id"]),
            from: json!("media"),
            distinct: true,
            ..Default::default()
        });
        assert_eq!(distinct.to_value()["distinct"], json!(true));
    }

    #[test]
    fn test_insert_document_shape() {
        let doc = JsonsqlDocument::Insert(InsertDocument {
            into: "media".to_string(),
            columns: vec!["name".to_string(), "kind".to_string()],
            values: json!([["trailer", 2]]),
            returning: Some(json!("id")),
        });
        assert_eq!(
            doc.to_value(),
            json!({
                "into": "media",
                "columns": ["name", "kind"],
                "values": [["trailer", 2]],
                "returning": "id"
            })
        );
    }

    #[test]
    fn test_fingerprint_stable_and_distinct() {
        let a = JsonsqlDocument::Select(SelectDocument {
            data: json!(["id"]),
            from: json!("media"),
            ..Default::default()
        });
        let b = JsonsqlDocument::Select(SelectDocument {
            data: json!(["id"]),
            from: json!("terminal"),
            ..Default::default()
        });
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_roundtrip_through_untagged_enum() {
        let doc = JsonsqlDocument::Delete(DeleteDocument {
            from: "payment".to_string(),
            filter: Some(json!({"lt": ["amount", 0]})),
            returning: None,
        });
        let text = serde_json::to_string(&doc).unwrap();
        let back: JsonsqlDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
