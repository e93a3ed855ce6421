//! SQL to JSONSQL transpiler
//!
//! Translates SQL statements into the nested-JSON query documents a remote
//! tabular store accepts over JSON-RPC. The store exposes no catalog and
//! returns rows as bare positional arrays, so translation leans on a
//! [`SchemaRegistry`] to expand `SELECT *` into explicit field lists and to
//! resolve unqualified columns in join scopes.
//!
//! ```
//! use std::sync::Arc;
//! use jsonsql_registry::SchemaRegistry;
//! use jsonsql_transpiler::{Transpiler, TranspilerConfig};
//! use serde_json::json;
//!
//! let registry = Arc::new(SchemaRegistry::new(false));
//! let transpiler = Transpiler::new(registry, TranspilerConfig::default());
//! let doc = transpiler.transpile_sql("SELECT COUNT(*) FROM tv_channel").unwrap();
//! assert_eq!(
//!     doc.to_value(),
//!     json!({"data": [{"function": "count", "args": ["*"]}], "from": "tv_channel"})
//! );
//! ```
//!
//! Translation itself is pure and synchronous. The only I/O in the crate
//! family is the optional schema probe behind the [`RowSampler`] trait,
//! reached through [`Transpiler::transpile_autogen`].

mod config;
mod error;
mod expr;
mod stmt;
mod transpiler;

pub use config::TranspilerConfig;
pub use error::TranspileError;
pub use transpiler::Transpiler;

pub use jsonsql_ast::{parse, SqlDialect, Statement};
pub use jsonsql_ir::JsonsqlDocument;
pub use jsonsql_registry::{RowSampler, SchemaError, SchemaRegistry, TableSchema};
