//! Registry seeding from external schema files
//!
//! Deployments that already know their tables ship a YAML or JSON file
//! describing each table's arity and whatever positions have documented
//! names. The seed format is deliberately flat; positions left out of a
//! table entry stay synthetic.
//!
//! ```yaml
//! tables:
//!   - table: subscriber
//!     total_fields: 6
//!     fields:
//!       - position: 0
//!         name: id
//!         field_type: integer
//!       - position: 1
//!         name: username
//!         field_type: string
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{SchemaError, SchemaRegistry};
use crate::schema::{FieldDefinition, FieldType, TableSchema};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML seed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON seed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSeed {
    pub tables: Vec<TableSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSeed {
    pub table: String,
    pub total_fields: u32,
    #[serde(default)]
    pub fields: Vec<FieldSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSeed {
    pub position: u32,
    pub name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub alias: Option<String>,
}

impl SchemaSeed {
    pub fn from_yaml_str(text: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a seed file, picking the format from the extension. Anything
    /// that is not `.json` parses as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }
}

impl TableSeed {
    pub fn into_schema(self) -> Result<TableSchema, SchemaError> {
        let mut schema = TableSchema::new(self.table, self.total_fields);
        for field in self.fields {
            schema.insert_field(FieldDefinition {
                position: field.position,
                name: field.name,
                field_type: field.field_type,
                alias: field.alias,
            })?;
        }
        Ok(schema)
    }
}

impl SchemaRegistry {
    /// Register every table in the seed. Returns the number of tables
    /// registered; fails on the first malformed entry without rolling back
    /// entries already applied.
    pub fn load_seed(&self, seed: SchemaSeed) -> Result<usize, SeedError> {
        let mut count = 0;
        for table in seed.tables {
            let name = table.table.clone();
            self.register(table.into_schema()?);
            tracing::debug!(table = %name, "seeded schema");
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
tables:
  - table: subscriber
    total_fields: 6
    fields:
      - position: 0
        name: id
        field_type: integer
      - position: 1
        name: username
        field_type: string
  - table: tv_channel
    total_fields: 3
"#;

    #[test]
    fn test_yaml_seed_loads_partial_schemas() {
        let seed = SchemaSeed::from_yaml_str(YAML).unwrap();
        let registry = SchemaRegistry::new(false);
        assert_eq!(registry.load_seed(seed).unwrap(), 2);

        assert_eq!(
            registry.resolve_star("subscriber").unwrap(),
            vec!["id", "username", "Field_2", "Field_3", "Field_4", "Field_5"]
        );
        assert_eq!(
            registry.resolve_star("tv_channel").unwrap(),
            vec!["Field_0", "Field_1", "Field_2"]
        );
    }

    #[test]
    fn test_json_seed() {
        let json = r#"{
            "tables": [
                {
                    "table": "media",
                    "total_fields": 2,
                    "fields": [
                        {"position": 0, "name": "id", "field_type": "integer"},
                        {"position": 1, "name": "title", "alias": "name"}
                    ]
                }
            ]
        }"#;
        let seed = SchemaSeed::from_json_str(json).unwrap();
        let registry = SchemaRegistry::new(false);
        registry.load_seed(seed).unwrap();
        assert_eq!(registry.resolve_star("media").unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_out_of_range_position_fails() {
        let yaml = r#"
tables:
  - table: media
    total_fields: 1
    fields:
      - position: 5
        name: ghost
"#;
        let seed = SchemaSeed::from_yaml_str(yaml).unwrap();
        let registry = SchemaRegistry::new(false);
        let err = registry.load_seed(seed).unwrap_err();
        assert!(matches!(
            err,
            SeedError::Schema(SchemaError::PositionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_missing_field_type_defaults_to_unknown() {
        let seed = SchemaSeed::from_yaml_str(YAML).unwrap();
        let tv = seed.tables[1].clone().into_schema().unwrap();
        assert_eq!(tv.field_name(0), "Field_0");
        let sub = seed.tables[0].clone().into_schema().unwrap();
        assert_eq!(sub.fields[&0].field_type, FieldType::Integer);
    }
}
