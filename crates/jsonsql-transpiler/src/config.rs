use jsonsql_ast::SqlDialect;

/// Per-call translation settings. Immutable during a transpile call.
#[derive(Debug, Clone, Copy)]
pub struct TranspilerConfig {
    /// Input dialect handed to the SQL parser.
    pub dialect: SqlDialect,
    /// Append `order_by: ["id"]` to a `SELECT` with no explicit ordering
    /// when the table's schema resolves an `id` field. The remote engine has
    /// no stable default order, so paginated reads need an injected key.
    pub auto_order_by_id: bool,
    /// Run the structural self-check on every produced document.
    pub validate_output: bool,
}

impl Default for TranspilerConfig {
    fn default() -> Self {
        TranspilerConfig {
            dialect: SqlDialect::Generic,
            auto_order_by_id: false,
            validate_output: true,
        }
    }
}
