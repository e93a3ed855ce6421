//! JSONSQL AST - normalized SQL statement/expression types and the
//! ingestion adapter over the external `sqlparser` crate.
//!
//! The rest of the workspace never touches `sqlparser` types directly; it
//! sees only the closed representation defined in [`ast`].

pub mod ast;
mod ingest;
mod parser;

pub use ast::*;
pub use ingest::{ingest, IngestError};
pub use parser::{parse, SqlDialect};
