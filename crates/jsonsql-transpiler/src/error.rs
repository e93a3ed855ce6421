use jsonsql_ast::IngestError;
use jsonsql_ir::ValidateError;
use jsonsql_registry::SchemaError;
use thiserror::Error;

/// Errors surfaced by the transpiler facade.
///
/// Every variant carries enough context for offline diagnosis; no variant is
/// retried here. Probe retries belong to whoever implements the sampler.
#[derive(Debug, Error)]
pub enum TranspileError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("unsupported SQL construct: {construct} in `{fragment}`")]
    UnsupportedConstruct { construct: String, fragment: String },

    #[error("ambiguous field reference `{column}`: cannot resolve a single owning table")]
    AmbiguousFieldReference { column: String },

    #[error(transparent)]
    SchemaResolution(#[from] SchemaError),

    #[error("function `{function}` takes {expected}, got {got} argument(s)")]
    InvalidFunctionArity {
        function: String,
        got: usize,
        expected: String,
    },

    #[error("output validation failed: {0}")]
    Validate(#[from] ValidateError),
}
