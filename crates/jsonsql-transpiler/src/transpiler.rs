//! Transpiler facade
//!
//! Single public entry point wiring parsing, statement translation, schema
//! resolution, and output validation together. Holds no per-call state; one
//! instance is safe to share across any number of concurrent callers.

use std::sync::Arc;

use jsonsql_ast::{parse, Expr, Projection, SelectStatement, Statement};
use jsonsql_ir::{validate, JsonsqlDocument};
use jsonsql_registry::{RowSampler, SchemaRegistry};

use crate::config::TranspilerConfig;
use crate::error::TranspileError;
use crate::stmt::translate_statement;

pub struct Transpiler {
    registry: Arc<SchemaRegistry>,
    config: TranspilerConfig,
}

impl Transpiler {
    pub fn new(registry: Arc<SchemaRegistry>, config: TranspilerConfig) -> Self {
        Transpiler { registry, config }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &TranspilerConfig {
        &self.config
    }

    /// Translate a normalized statement against the current schema snapshot.
    ///
    /// Pure and synchronous. Star expansion requires the touched tables to
    /// be registered already; use [`Self::transpile_autogen`] to probe
    /// unknown tables first.
    pub fn transpile(&self, stmt: &Statement) -> Result<JsonsqlDocument, TranspileError> {
        let document =
            translate_statement(&self.registry, stmt, self.config.auto_order_by_id)?;
        if self.config.validate_output {
            validate(&document)?;
        }
        Ok(document)
    }

    /// Parse SQL text and translate it in one step.
    pub fn transpile_sql(&self, sql: &str) -> Result<JsonsqlDocument, TranspileError> {
        let stmt = parse(sql, self.config.dialect)?;
        self.transpile(&stmt)
    }

    /// Like [`Self::transpile`], but first auto-generates schemas for every
    /// table the statement star-expands, probing each unknown table once via
    /// `sampler`.
    pub async fn transpile_autogen(
        &self,
        stmt: &Statement,
        sampler: &dyn RowSampler,
    ) -> Result<JsonsqlDocument, TranspileError> {
        for table in star_tables(stmt) {
            if !self.registry.is_known(&table) {
                self.registry.ensure_generated(&table, sampler).await?;
            }
        }
        self.transpile(stmt)
    }

    pub async fn transpile_sql_autogen(
        &self,
        sql: &str,
        sampler: &dyn RowSampler,
    ) -> Result<JsonsqlDocument, TranspileError> {
        let stmt = parse(sql, self.config.dialect)?;
        self.transpile_autogen(&stmt, sampler).await
    }
}

/// Tables whose schemas star expansion will consult, including inside
/// subqueries. Joined stars are rejected later in translation, so only
/// single-source selects contribute.
fn star_tables(stmt: &Statement) -> Vec<String> {
    let mut tables = Vec::new();
    if let Statement::Select(select) = stmt {
        collect_select(select, &mut tables);
    }
    tables.dedup();
    tables
}

fn collect_select(select: &SelectStatement, out: &mut Vec<String>) {
    let has_star = select
        .projection
        .iter()
        .any(|p| matches!(p, Projection::Star));
    if has_star && select.joins.is_empty() {
        out.push(select.from.name.clone());
    }

    for item in &select.projection {
        match item {
            Projection::Expr(expr) | Projection::Aliased { expr, .. } => {
                collect_expr(expr, out);
            }
            Projection::Star => {}
        }
    }
    for expr in select
        .selection
        .iter()
        .chain(&select.group_by)
        .chain(select.order_by.iter().map(|k| &k.expr))
        .chain(select.joins.iter().map(|j| &j.on))
    {
        collect_expr(expr, out);
    }
}

fn collect_expr(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Subquery(select) => collect_select(select, out),
        Expr::Operator { operands, .. } => {
            for operand in operands {
                collect_expr(operand, out);
            }
        }
        Expr::Function { args, .. } => match args {
            jsonsql_ast::FunctionArgs::Single(inner) => collect_expr(inner, out),
            jsonsql_ast::FunctionArgs::Many(exprs) => {
                for inner in exprs {
                    collect_expr(inner, out);
                }
            }
            jsonsql_ast::FunctionArgs::Star => {}
        },
        Expr::Aliased { expr, .. } => collect_expr(expr, out),
        Expr::Column { .. } | Expr::Literal(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonsql_ast::SqlDialect;

    fn statement(sql: &str) -> Statement {
        parse(sql, SqlDialect::Generic).unwrap()
    }

    #[test]
    fn test_star_tables_single_source() {
        let tables = star_tables(&statement("SELECT * FROM media"));
        assert_eq!(tables, vec!["media"]);
    }

    #[test]
    fn test_star_tables_ignores_explicit_projection() {
        let tables = star_tables(&statement("SELECT id FROM media"));
        assert!(tables.is_empty());
    }

    #[test]
    fn test_star_tables_sees_subquery() {
        let tables = star_tables(&statement(
            "SELECT id FROM payment WHERE subscriber_id IN (SELECT * FROM subscriber)",
        ));
        assert_eq!(tables, vec!["subscriber"]);
    }
}
