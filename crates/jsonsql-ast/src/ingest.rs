//! Ingestion adapter: external `sqlparser` tree -> normalized AST
//!
//! Dialect normalization happens upstream in the parser; this module only
//! maps generic node kinds onto the closed [`crate::ast`] representation and
//! rejects anything the JSONSQL wire format cannot express. Grouping produced
//! by the parser is preserved verbatim: contiguous `AND`/`OR` chains flatten
//! into one operand list, but parenthesized sub-expressions keep their own
//! node.

use sqlparser::ast as sql;
use thiserror::Error;

use crate::ast::*;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("SQL parse error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    #[error("unsupported SQL construct: {construct} in `{fragment}`")]
    Unsupported { construct: String, fragment: String },

    #[error("empty SQL input")]
    Empty,
}

impl IngestError {
    fn unsupported(construct: &str, fragment: impl ToString) -> Self {
        IngestError::Unsupported {
            construct: construct.to_string(),
            fragment: fragment.to_string(),
        }
    }
}

/// Normalize one externally-parsed statement.
pub fn ingest(stmt: &sql::Statement) -> Result<Statement, IngestError> {
    match stmt {
        sql::Statement::Query(query) => Ok(Statement::Select(ingest_query(query)?)),
        sql::Statement::Insert(insert) => Ok(Statement::Insert(ingest_insert(insert)?)),
        sql::Statement::Update(update) => Ok(Statement::Update(ingest_update(update)?)),
        sql::Statement::Delete(delete) => Ok(Statement::Delete(ingest_delete(delete)?)),
        other => Err(IngestError::unsupported("statement kind", other)),
    }
}

fn ingest_query(query: &sql::Query) -> Result<SelectStatement, IngestError> {
    if query.with.is_some() {
        // Not confirmed supported by the remote engine; reject rather than guess.
        return Err(IngestError::unsupported("common table expression", query));
    }

    let select = match query.body.as_ref() {
        sql::SetExpr::Select(select) => select,
        other => return Err(IngestError::unsupported("set expression", other)),
    };

    let mut stmt = ingest_select(select)?;

    if let Some(order_by) = &query.order_by {
        match &order_by.kind {
            sql::OrderByKind::Expressions(exprs) => {
                for key in exprs {
                    stmt.order_by.push(OrderKey {
                        expr: ingest_expr(&key.expr)?,
                        desc: key.options.asc == Some(false),
                    });
                }
            }
            sql::OrderByKind::All(_) => {
                return Err(IngestError::unsupported("ORDER BY ALL", query));
            }
        }
    }

    match &query.limit_clause {
        Some(sql::LimitClause::LimitOffset { limit, offset, limit_by }) => {
            if !limit_by.is_empty() {
                return Err(IngestError::unsupported("LIMIT BY", query));
            }
            if let Some(expr) = limit {
                stmt.limit = Some(expr_to_u64(expr)?);
            }
            if let Some(offset) = offset {
                stmt.offset = Some(expr_to_u64(&offset.value)?);
            }
        }
        Some(sql::LimitClause::OffsetCommaLimit { offset, limit }) => {
            stmt.offset = Some(expr_to_u64(offset)?);
            stmt.limit = Some(expr_to_u64(limit)?);
        }
        None => {}
    }

    Ok(stmt)
}

fn ingest_select(select: &sql::Select) -> Result<SelectStatement, IngestError> {
    let distinct = match &select.distinct {
        None => false,
        Some(sql::Distinct::Distinct) => true,
        Some(sql::Distinct::On(_)) => {
            return Err(IngestError::unsupported("DISTINCT ON", select));
        }
    };

    if select.having.is_some() {
        return Err(IngestError::unsupported("HAVING clause", select));
    }

    // The wire format has a single base source plus join entries; a
    // comma-separated FROM list (implicit cross join) cannot be shaped.
    if select.from.len() != 1 {
        return Err(IngestError::unsupported("multiple FROM sources", select));
    }
    let table_with_joins = &select.from[0];
    let from = ingest_table_factor(&table_with_joins.relation)?;

    let mut joins = Vec::new();
    for join in &table_with_joins.joins {
        let constraint = match &join.join_operator {
            sql::JoinOperator::Join(c) | sql::JoinOperator::Inner(c) => c,
            other => {
                return Err(IngestError::unsupported("non-inner join", format_join(other)));
            }
        };
        let on = match constraint {
            sql::JoinConstraint::On(expr) => ingest_expr(expr)?,
            _ => {
                return Err(IngestError::unsupported("join constraint without ON", select));
            }
        };
        joins.push(Join {
            table: ingest_table_factor(&join.relation)?,
            on,
        });
    }

    let mut projection = Vec::new();
    for item in &select.projection {
        projection.push(match item {
            sql::SelectItem::Wildcard(_) => Projection::Star,
            sql::SelectItem::UnnamedExpr(expr) => Projection::Expr(ingest_expr(expr)?),
            sql::SelectItem::ExprWithAlias { expr, alias } => Projection::Aliased {
                expr: ingest_expr(expr)?,
                alias: alias.value.clone(),
            },
            other => return Err(IngestError::unsupported("projection item", other)),
        });
    }

    let selection = select.selection.as_ref().map(ingest_expr).transpose()?;

    let group_by = match &select.group_by {
        sql::GroupByExpr::Expressions(exprs, _) => {
            exprs.iter().map(ingest_expr).collect::<Result<Vec<_>, _>>()?
        }
        sql::GroupByExpr::All(_) => {
            return Err(IngestError::unsupported("GROUP BY ALL", select));
        }
    };

    Ok(SelectStatement {
        distinct,
        projection,
        from,
        joins,
        selection,
        group_by,
        order_by: Vec::new(),
        limit: None,
        offset: None,
    })
}

fn ingest_table_factor(factor: &sql::TableFactor) -> Result<TableRef, IngestError> {
    match factor {
        sql::TableFactor::Table { name, alias, .. } => Ok(TableRef {
            name: name.to_string(),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
        }),
        other => Err(IngestError::unsupported("table expression", other)),
    }
}

fn ingest_insert(insert: &sql::Insert) -> Result<InsertStatement, IngestError> {
    let table = match &insert.table {
        sql::TableObject::TableName(name) => name.to_string(),
        other => return Err(IngestError::unsupported("insert target", other)),
    };

    let columns = insert.columns.iter().map(|c| c.value.clone()).collect();

    let mut values = Vec::new();
    match &insert.source {
        Some(source) => match source.body.as_ref() {
            sql::SetExpr::Values(v) => {
                for row in &v.rows {
                    values.push(row.iter().map(ingest_expr).collect::<Result<Vec<_>, _>>()?);
                }
            }
            other => return Err(IngestError::unsupported("INSERT source", other)),
        },
        None => return Err(IngestError::unsupported("INSERT without VALUES", insert)),
    }

    Ok(InsertStatement {
        table,
        columns,
        values,
        returning: ingest_returning(&insert.returning)?,
    })
}

fn ingest_update(update: &sql::Update) -> Result<UpdateStatement, IngestError> {
    let table = ingest_table_factor(&update.table.relation)?;
    if !update.table.joins.is_empty() || update.from.is_some() {
        return Err(IngestError::unsupported("UPDATE with joined sources", update));
    }

    let assignments = update
        .assignments
        .iter()
        .map(|a| Ok((a.target.to_string(), ingest_expr(&a.value)?)))
        .collect::<Result<Vec<_>, IngestError>>()?;

    Ok(UpdateStatement {
        table: table.name,
        assignments,
        selection: update.selection.as_ref().map(ingest_expr).transpose()?,
        returning: ingest_returning(&update.returning)?,
    })
}

fn ingest_delete(delete: &sql::Delete) -> Result<DeleteStatement, IngestError> {
    let tables = match &delete.from {
        sql::FromTable::WithFromKeyword(tables) => tables,
        sql::FromTable::WithoutKeyword(tables) => tables,
    };
    let table = tables
        .first()
        .map(|t| ingest_table_factor(&t.relation))
        .transpose()?
        .ok_or_else(|| IngestError::unsupported("DELETE without FROM", delete))?;

    Ok(DeleteStatement {
        table: table.name,
        selection: delete.selection.as_ref().map(ingest_expr).transpose()?,
        returning: ingest_returning(&delete.returning)?,
    })
}

fn ingest_returning(
    returning: &Option<Vec<sql::SelectItem>>,
) -> Result<Option<Vec<String>>, IngestError> {
    let Some(items) = returning else {
        return Ok(None);
    };
    let mut names = Vec::new();
    for item in items {
        names.push(match item {
            sql::SelectItem::UnnamedExpr(sql::Expr::Identifier(ident)) => ident.value.clone(),
            sql::SelectItem::Wildcard(_) => "*".to_string(),
            other => return Err(IngestError::unsupported("RETURNING item", other)),
        });
    }
    Ok(Some(names))
}

fn ingest_expr(expr: &sql::Expr) -> Result<Expr, IngestError> {
    match expr {
        sql::Expr::Identifier(ident) => Ok(Expr::Column {
            table: None,
            name: ident.value.clone(),
        }),
        sql::Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [table, column] => Ok(Expr::Column {
                table: Some(table.value.clone()),
                name: column.value.clone(),
            }),
            _ => Err(IngestError::unsupported("deeply qualified identifier", expr)),
        },
        sql::Expr::Value(value) => Ok(Expr::Literal(ingest_value(&value.value, expr)?)),
        sql::Expr::Nested(inner) => ingest_expr(inner),
        sql::Expr::BinaryOp { left, op, right } => ingest_binary_op(left, op, right, expr),
        sql::Expr::UnaryOp { op, expr: inner } => match op {
            sql::UnaryOperator::Not => Ok(Expr::Operator {
                name: "not".to_string(),
                operands: vec![ingest_expr(inner)?],
            }),
            sql::UnaryOperator::Minus => match ingest_expr(inner)? {
                Expr::Literal(Value::Int(i)) => Ok(Expr::Literal(Value::Int(-i))),
                Expr::Literal(Value::Float(f)) => Ok(Expr::Literal(Value::Float(-f))),
                other => Ok(Expr::Operator {
                    name: "neg".to_string(),
                    operands: vec![other],
                }),
            },
            sql::UnaryOperator::Plus => ingest_expr(inner),
            _ => Err(IngestError::unsupported("unary operator", expr)),
        },
        sql::Expr::Function(func) => ingest_function(func, expr),
        sql::Expr::Subquery(query) => Ok(Expr::Subquery(Box::new(ingest_query(query)?))),
        sql::Expr::InList { expr: lhs, list, negated } => {
            let mut operands = vec![ingest_expr(lhs)?];
            for item in list {
                operands.push(ingest_expr(item)?);
            }
            Ok(negate_if(
                *negated,
                Expr::Operator { name: "in".to_string(), operands },
            ))
        }
        sql::Expr::InSubquery { expr: lhs, subquery, negated } => {
            let operands = vec![
                ingest_expr(lhs)?,
                Expr::Subquery(Box::new(ingest_query(subquery)?)),
            ];
            Ok(negate_if(
                *negated,
                Expr::Operator { name: "in".to_string(), operands },
            ))
        }
        sql::Expr::Between { expr: lhs, negated, low, high } => Ok(negate_if(
            *negated,
            Expr::Operator {
                name: "between".to_string(),
                operands: vec![ingest_expr(lhs)?, ingest_expr(low)?, ingest_expr(high)?],
            },
        )),
        sql::Expr::Like { expr: lhs, pattern, negated, .. } => Ok(negate_if(
            *negated,
            Expr::Operator {
                name: "like".to_string(),
                operands: vec![ingest_expr(lhs)?, ingest_expr(pattern)?],
            },
        )),
        sql::Expr::ILike { expr: lhs, pattern, negated, .. } => Ok(negate_if(
            *negated,
            Expr::Operator {
                name: "ilike".to_string(),
                operands: vec![ingest_expr(lhs)?, ingest_expr(pattern)?],
            },
        )),
        sql::Expr::IsNull(inner) => Ok(Expr::Operator {
            name: "is_null".to_string(),
            operands: vec![ingest_expr(inner)?],
        }),
        sql::Expr::IsNotNull(inner) => Ok(Expr::Operator {
            name: "is_not_null".to_string(),
            operands: vec![ingest_expr(inner)?],
        }),
        other => Err(IngestError::unsupported("expression", other)),
    }
}

fn ingest_binary_op(
    left: &sql::Expr,
    op: &sql::BinaryOperator,
    right: &sql::Expr,
    whole: &sql::Expr,
) -> Result<Expr, IngestError> {
    let name = match op {
        sql::BinaryOperator::Eq => "eq",
        sql::BinaryOperator::NotEq => "neq",
        sql::BinaryOperator::Lt => "lt",
        sql::BinaryOperator::LtEq => "lte",
        sql::BinaryOperator::Gt => "gt",
        sql::BinaryOperator::GtEq => "gte",
        sql::BinaryOperator::Plus => "add",
        sql::BinaryOperator::Minus => "sub",
        sql::BinaryOperator::Multiply => "mul",
        sql::BinaryOperator::Divide => "div",
        sql::BinaryOperator::Modulo => "mod",
        sql::BinaryOperator::And => "and",
        sql::BinaryOperator::Or => "or",
        other => return Err(IngestError::unsupported("binary operator", format!("{other} in `{whole}`"))),
    };

    if name == "and" || name == "or" {
        // Flatten the parser's left-associative chain into one operand list.
        // Parenthesized groups arrive as Nested and keep their own node, so
        // explicit grouping survives.
        let mut operands = Vec::new();
        collect_logical(left, op, &mut operands)?;
        collect_logical(right, op, &mut operands)?;
        return Ok(Expr::Operator { name: name.to_string(), operands });
    }

    Ok(Expr::Operator {
        name: name.to_string(),
        operands: vec![ingest_expr(left)?, ingest_expr(right)?],
    })
}

fn collect_logical(
    expr: &sql::Expr,
    op: &sql::BinaryOperator,
    out: &mut Vec<Expr>,
) -> Result<(), IngestError> {
    if let sql::Expr::BinaryOp { left, op: inner_op, right } = expr {
        if inner_op == op {
            collect_logical(left, op, out)?;
            collect_logical(right, op, out)?;
            return Ok(());
        }
    }
    out.push(ingest_expr(expr)?);
    Ok(())
}

fn ingest_function(func: &sql::Function, whole: &sql::Expr) -> Result<Expr, IngestError> {
    if func.over.is_some() {
        // Window support is unconfirmed for the remote engine.
        return Err(IngestError::unsupported("window function", whole));
    }

    let name = func.name.to_string().to_lowercase();

    let (distinct, args) = match &func.args {
        sql::FunctionArguments::None => (false, FunctionArgs::Many(Vec::new())),
        sql::FunctionArguments::Subquery(_) => {
            return Err(IngestError::unsupported("subquery function argument", whole));
        }
        sql::FunctionArguments::List(list) => {
            if !list.clauses.is_empty() {
                return Err(IngestError::unsupported("function argument clause", whole));
            }
            let distinct = matches!(
                list.duplicate_treatment,
                Some(sql::DuplicateTreatment::Distinct)
            );

            let mut exprs = Vec::new();
            let mut star = false;
            for arg in &list.args {
                match arg {
                    sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(e)) => {
                        exprs.push(ingest_expr(e)?);
                    }
                    sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Wildcard) => star = true,
                    other => {
                        return Err(IngestError::unsupported("function argument", other));
                    }
                }
            }

            let args = if star {
                if !exprs.is_empty() {
                    return Err(IngestError::unsupported("mixed `*` and arguments", whole));
                }
                FunctionArgs::Star
            } else if exprs.len() == 1 {
                FunctionArgs::Single(Box::new(exprs.remove(0)))
            } else {
                FunctionArgs::Many(exprs)
            };
            (distinct, args)
        }
    };

    Ok(Expr::Function { name, args, distinct })
}

fn ingest_value(value: &sql::Value, whole: &sql::Expr) -> Result<Value, IngestError> {
    match value {
        sql::Value::Null => Ok(Value::Null),
        sql::Value::Boolean(b) => Ok(Value::Bool(*b)),
        sql::Value::Number(repr, _) => {
            if let Ok(i) = repr.parse::<i64>() {
                Ok(Value::Int(i))
            } else {
                repr.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| IngestError::unsupported("numeric literal", whole))
            }
        }
        sql::Value::SingleQuotedString(s) | sql::Value::DoubleQuotedString(s) => {
            Ok(Value::String(s.clone()))
        }
        sql::Value::Placeholder(_) => Err(IngestError::unsupported("bind parameter", whole)),
        other => Err(IngestError::unsupported("literal", format!("{other} in `{whole}`"))),
    }
}

fn negate_if(negated: bool, expr: Expr) -> Expr {
    if negated {
        Expr::Operator {
            name: "not".to_string(),
            operands: vec![expr],
        }
    } else {
        expr
    }
}

fn expr_to_u64(expr: &sql::Expr) -> Result<u64, IngestError> {
    if let sql::Expr::Value(value) = expr {
        if let sql::Value::Number(repr, _) = &value.value {
            if let Ok(n) = repr.parse::<u64>() {
                return Ok(n);
            }
        }
    }
    Err(IngestError::unsupported("LIMIT/OFFSET expression", expr))
}

fn format_join(op: &sql::JoinOperator) -> String {
    format!("{op:?}")
}
