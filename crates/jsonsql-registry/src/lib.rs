//! Schema registry for positional field resolution
//!
//! The remote engine returns result rows as bare positional arrays and
//! exposes no catalog, so `SELECT *` can only be expanded against locally
//! held knowledge of each table's column layout. This crate owns that
//! knowledge: per-table schemas that may cover only a subset of positions,
//! a registry with explicit registration and seeding, and a lazy
//! auto-generation path that infers a table's arity by sampling one row.

pub mod registry;
pub mod schema;
pub mod seed;

pub use registry::{RowSampler, SchemaError, SchemaRegistry};
pub use schema::{FieldDefinition, FieldType, TableSchema};
pub use seed::{FieldSeed, SchemaSeed, SeedError, TableSeed};
