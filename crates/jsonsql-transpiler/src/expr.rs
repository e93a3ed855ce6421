//! Expression translation
//!
//! Converts normalized expression nodes into JSONSQL value trees. Column
//! encoding depends on the statement's table scope: single-table statements
//! use bare field-name strings, multi-table statements use one-key
//! `{"<alias>":"<field>"}` objects. Function arguments keep their
//! shape-per-arity encoding (see [`jsonsql_ast::FunctionArgs`]).

use jsonsql_ast::{Expr, FunctionArgs, TableRef, Value as AstValue};
use jsonsql_registry::SchemaRegistry;
use serde_json::{json, Value};

use crate::error::TranspileError;
use crate::stmt;

/// Table scope of the statement currently being translated.
///
/// Holds the base source plus join sources in declaration order. The scope
/// decides column qualification and resolves unqualified columns against
/// registered schemas.
pub(crate) struct QueryScope<'a> {
    registry: &'a SchemaRegistry,
    tables: Vec<&'a TableRef>,
}

impl<'a> QueryScope<'a> {
    pub(crate) fn new(registry: &'a SchemaRegistry, tables: Vec<&'a TableRef>) -> Self {
        QueryScope { registry, tables }
    }

    pub(crate) fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub(crate) fn is_multi_table(&self) -> bool {
        self.tables.len() > 1
    }

    fn alias_in_scope(&self, alias: &str) -> bool {
        self.tables.iter().any(|t| t.effective_alias() == alias)
    }

    /// Find the single scope table whose schema resolves `name`.
    ///
    /// Requires every scope table to have a known schema; with any table
    /// unknown, ownership cannot be proven and the reference is ambiguous.
    fn owner_of(&self, name: &str) -> Result<&str, TranspileError> {
        let mut owner = None;
        for table in &self.tables {
            let Some(schema) = self.registry.get(&table.name) else {
                return Err(TranspileError::AmbiguousFieldReference {
                    column: name.to_string(),
                });
            };
            if schema.has_field(name) {
                if owner.is_some() {
                    return Err(TranspileError::AmbiguousFieldReference {
                        column: name.to_string(),
                    });
                }
                owner = Some(table.effective_alias());
            }
        }
        owner.ok_or_else(|| TranspileError::AmbiguousFieldReference {
            column: name.to_string(),
        })
    }
}

/// One-key object, the encoding for operators and qualified columns.
fn single_key(key: &str, value: Value) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

pub(crate) fn translate_expr(scope: &QueryScope, expr: &Expr) -> Result<Value, TranspileError> {
    match expr {
        Expr::Column { table, name } => translate_column(scope, table.as_deref(), name),
        Expr::Literal(value) => Ok(literal_value(value)),
        Expr::Operator { name, operands } => translate_operator(scope, name, operands),
        Expr::Function { name, args, distinct } => {
            translate_function(scope, name, args, *distinct)
        }
        Expr::Subquery(select) => {
            let document = stmt::translate_select(scope.registry(), select, false, false)?;
            Ok(json!({ "select": serde_json::to_value(document).unwrap_or(Value::Null) }))
        }
        Expr::Aliased { expr, alias } => {
            let inner = translate_expr(scope, expr)?;
            Ok(json!({ "as": [inner, alias] }))
        }
    }
}

fn translate_column(
    scope: &QueryScope,
    table: Option<&str>,
    name: &str,
) -> Result<Value, TranspileError> {
    if !scope.is_multi_table() {
        // Single-table statements use the bare field name; the qualifier is
        // dropped, but only after it is checked against the scope table.
        if let Some(alias) = table {
            if !scope.alias_in_scope(alias) {
                return Err(TranspileError::AmbiguousFieldReference {
                    column: format!("{alias}.{name}"),
                });
            }
        }
        return Ok(Value::String(name.to_string()));
    }
    match table {
        Some(alias) => {
            if !scope.alias_in_scope(alias) {
                return Err(TranspileError::AmbiguousFieldReference {
                    column: format!("{alias}.{name}"),
                });
            }
            Ok(single_key(alias, Value::String(name.to_string())))
        }
        None => {
            let alias = scope.owner_of(name)?;
            Ok(single_key(alias, Value::String(name.to_string())))
        }
    }
}

pub(crate) fn literal_value(value: &AstValue) -> Value {
    match value {
        AstValue::Null => Value::Null,
        AstValue::Bool(b) => json!(b),
        AstValue::Int(i) => json!(i),
        AstValue::Float(f) => json!(f),
        AstValue::String(s) => json!(s),
    }
}

fn translate_operator(
    scope: &QueryScope,
    name: &str,
    operands: &[Expr],
) -> Result<Value, TranspileError> {
    // `in` keeps a two-slot shape on the wire: left-hand side, then either a
    // value array or an embedded select.
    if name == "in" {
        let lhs = operands
            .first()
            .map(|e| translate_expr(scope, e))
            .transpose()?
            .ok_or_else(|| TranspileError::InvalidFunctionArity {
                function: "in".to_string(),
                got: 0,
                expected: "at least 2 operands".to_string(),
            })?;
        let rest = &operands[1..];
        let rhs = match rest {
            [Expr::Subquery(_)] => translate_expr(scope, &rest[0])?,
            _ => Value::Array(
                rest.iter()
                    .map(|e| translate_expr(scope, e))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        return Ok(json!({ "in": [lhs, rhs] }));
    }

    let translated = operands
        .iter()
        .map(|e| translate_expr(scope, e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(single_key(name, Value::Array(translated)))
}

fn translate_function(
    scope: &QueryScope,
    name: &str,
    args: &FunctionArgs,
    distinct: bool,
) -> Result<Value, TranspileError> {
    let args_value = match args {
        // One-element array even though it names no columns.
        FunctionArgs::Star => json!(["*"]),
        // Bare value, never wrapped in an array.
        FunctionArgs::Single(expr) => translate_expr(scope, expr)?,
        FunctionArgs::Many(exprs) => Value::Array(
            exprs
                .iter()
                .map(|e| translate_expr(scope, e))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    let args_value = if distinct {
        // DISTINCT is a nested function object, not a flag.
        match args {
            FunctionArgs::Single(_) => json!({ "function": "distinct", "args": args_value }),
            FunctionArgs::Star => {
                return Err(TranspileError::InvalidFunctionArity {
                    function: name.to_string(),
                    got: 0,
                    expected: "exactly 1 argument with DISTINCT".to_string(),
                });
            }
            FunctionArgs::Many(exprs) => {
                return Err(TranspileError::InvalidFunctionArity {
                    function: name.to_string(),
                    got: exprs.len(),
                    expected: "exactly 1 argument with DISTINCT".to_string(),
                });
            }
        }
    } else {
        args_value
    };

    Ok(json!({ "function": name, "args": args_value }))
}
