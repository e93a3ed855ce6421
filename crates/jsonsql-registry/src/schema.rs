//! Per-table schema types
//!
//! A [`TableSchema`] is partial by design: `fields` may cover only some of
//! the positions in `0..total_fields`, and undocumented positions resolve to
//! a synthesized `Field_<position>` name on demand.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::SchemaError;

/// Field value types the remote engine is known to store.
///
/// Date/time values travel as ISO-8601 strings on the wire; the distinction
/// here only informs result interpretation, never query encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    String,
    Boolean,
    Float,
    DateTime,
    Date,
    Json,
    #[default]
    Unknown,
}

/// Metadata for one positional column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub position: u32,
    pub name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl FieldDefinition {
    /// The name used in queries and star expansion for this position.
    pub fn resolved_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Column layout of one remote table, keyed by 0-indexed result position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub total_fields: u32,
    #[serde(default)]
    pub fields: BTreeMap<u32, FieldDefinition>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, total_fields: u32) -> Self {
        TableSchema {
            table_name: table_name.into(),
            total_fields,
            fields: BTreeMap::new(),
        }
    }

    /// Schema inferred from a sampled row: correct arity, placeholder names
    /// at every position. A sample alone carries no semantic names.
    pub fn synthetic(table_name: impl Into<String>, total_fields: u32) -> Self {
        let table_name = table_name.into();
        let fields = (0..total_fields)
            .map(|position| {
                (
                    position,
                    FieldDefinition {
                        position,
                        name: format!("Field_{position}"),
                        field_type: FieldType::Unknown,
                        alias: None,
                    },
                )
            })
            .collect();
        TableSchema {
            table_name,
            total_fields,
            fields,
        }
    }

    /// Add or replace the definition at `definition.position`.
    pub fn insert_field(&mut self, definition: FieldDefinition) -> Result<(), SchemaError> {
        if definition.position >= self.total_fields {
            return Err(SchemaError::PositionOutOfRange {
                table: self.table_name.clone(),
                position: definition.position,
                total_fields: self.total_fields,
            });
        }
        self.fields.insert(definition.position, definition);
        Ok(())
    }

    /// The name resolved for one position, synthesizing `Field_<position>`
    /// when the position is undocumented.
    pub fn field_name(&self, position: u32) -> String {
        match self.fields.get(&position) {
            Some(field) => field.resolved_name().to_string(),
            None => format!("Field_{position}"),
        }
    }

    /// All `total_fields` names in position order.
    pub fn positional_names(&self) -> Vec<String> {
        (0..self.total_fields).map(|p| self.field_name(p)).collect()
    }

    /// Whether any position resolves to `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.values().any(|f| f.resolved_name() == name)
    }
}
