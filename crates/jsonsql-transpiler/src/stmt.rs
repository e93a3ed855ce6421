//! Statement translation
//!
//! Builds complete wire documents from normalized statements: star
//! expansion against the registry, `from` shaping for joins, implicit
//! `ORDER BY id` injection, and the field-for-field insert/update/delete
//! mappings.

use jsonsql_ast::{
    DeleteStatement, InsertStatement, Projection, SelectStatement, Statement, UpdateStatement,
};
use jsonsql_ir::{
    DeleteDocument, InsertDocument, JsonsqlDocument, SelectDocument, UpdateDocument,
};
use jsonsql_registry::SchemaRegistry;
use serde_json::{json, Value};

use crate::error::TranspileError;
use crate::expr::{translate_expr, QueryScope};

pub(crate) fn translate_statement(
    registry: &SchemaRegistry,
    stmt: &Statement,
    auto_order_by_id: bool,
) -> Result<JsonsqlDocument, TranspileError> {
    match stmt {
        Statement::Select(select) => Ok(JsonsqlDocument::Select(translate_select(
            registry,
            select,
            true,
            auto_order_by_id,
        )?)),
        Statement::Insert(insert) => translate_insert(registry, insert),
        Statement::Update(update) => translate_update(registry, update),
        Statement::Delete(delete) => translate_delete(registry, delete),
    }
}

pub(crate) fn translate_select(
    registry: &SchemaRegistry,
    select: &SelectStatement,
    root: bool,
    auto_order_by_id: bool,
) -> Result<SelectDocument, TranspileError> {
    let mut tables = vec![&select.from];
    tables.extend(select.joins.iter().map(|j| &j.table));
    let scope = QueryScope::new(registry, tables);

    let mut data = Vec::new();
    for item in &select.projection {
        match item {
            Projection::Star => {
                if scope.is_multi_table() {
                    return Err(TranspileError::UnsupportedConstruct {
                        construct: "SELECT * across joined tables".to_string(),
                        fragment: format!("SELECT * FROM {}", select.from.name),
                    });
                }
                // Result rows come back as bare positional arrays; an
                // unexpanded `*` would make them unmappable by name.
                for name in registry.resolve_star(&select.from.name)? {
                    data.push(Value::String(name));
                }
            }
            Projection::Expr(expr) => data.push(translate_expr(&scope, expr)?),
            Projection::Aliased { expr, alias } => {
                let inner = translate_expr(&scope, expr)?;
                data.push(json!({ "as": [inner, alias] }));
            }
        }
    }
    // Embedded selects collapse a one-element projection to the bare value.
    let data = if !root && data.len() == 1 {
        data.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(data)
    };

    let from = translate_from(select, &scope)?;

    let filter = select
        .selection
        .as_ref()
        .map(|e| translate_expr(&scope, e))
        .transpose()?;

    let group_by = if select.group_by.is_empty() {
        None
    } else {
        Some(Value::Array(
            select
                .group_by
                .iter()
                .map(|e| translate_expr(&scope, e))
                .collect::<Result<Vec<_>, _>>()?,
        ))
    };

    let mut order_keys = Vec::new();
    for key in &select.order_by {
        let value = translate_expr(&scope, &key.expr)?;
        order_keys.push(if key.desc {
            json!({ "desc": [value] })
        } else {
            value
        });
    }
    if order_keys.is_empty()
        && root
        && auto_order_by_id
        && !scope.is_multi_table()
    {
        if let Some(schema) = registry.get(&select.from.name) {
            if schema.has_field("id") {
                tracing::debug!(
                    table = %select.from.name,
                    "appending ORDER BY id not present in the source SQL"
                );
                order_keys.push(Value::String("id".to_string()));
            }
        }
    }
    let order_by = if order_keys.is_empty() {
        None
    } else {
        Some(Value::Array(order_keys))
    };

    Ok(SelectDocument {
        data,
        from,
        filter,
        group_by,
        order_by,
        limit: select.limit,
        offset: select.offset,
        distinct: select.distinct,
    })
}

/// Bare table name for a single unaliased source; otherwise a list with one
/// `{"table":...}` head entry and one `{"join":...,"on":...}` entry per join.
fn translate_from(select: &SelectStatement, scope: &QueryScope) -> Result<Value, TranspileError> {
    if select.joins.is_empty() && select.from.alias.is_none() {
        return Ok(Value::String(select.from.name.clone()));
    }

    let mut entries = vec![json!({
        "table": select.from.name,
        "as": select.from.effective_alias(),
    })];
    for join in &select.joins {
        let on = translate_expr(scope, &join.on)?;
        entries.push(json!({
            "join": join.table.name,
            "as": join.table.effective_alias(),
            "on": on,
        }));
    }
    Ok(Value::Array(entries))
}

fn translate_insert(
    registry: &SchemaRegistry,
    insert: &InsertStatement,
) -> Result<JsonsqlDocument, TranspileError> {
    let table = jsonsql_ast::TableRef {
        name: insert.table.clone(),
        alias: None,
    };
    let scope = QueryScope::new(registry, vec![&table]);

    let mut rows = Vec::new();
    for row in &insert.values {
        rows.push(Value::Array(
            row.iter()
                .map(|e| translate_expr(&scope, e))
                .collect::<Result<Vec<_>, _>>()?,
        ));
    }

    Ok(JsonsqlDocument::Insert(InsertDocument {
        into: insert.table.clone(),
        columns: insert.columns.clone(),
        values: Value::Array(rows),
        returning: returning_value(&insert.returning),
    }))
}

fn translate_update(
    registry: &SchemaRegistry,
    update: &UpdateStatement,
) -> Result<JsonsqlDocument, TranspileError> {
    let table = jsonsql_ast::TableRef {
        name: update.table.clone(),
        alias: None,
    };
    let scope = QueryScope::new(registry, vec![&table]);

    let mut set = serde_json::Map::new();
    for (column, value) in &update.assignments {
        set.insert(column.clone(), translate_expr(&scope, value)?);
    }

    Ok(JsonsqlDocument::Update(UpdateDocument {
        table: update.table.clone(),
        set: Value::Object(set),
        filter: update
            .selection
            .as_ref()
            .map(|e| translate_expr(&scope, e))
            .transpose()?,
        returning: returning_value(&update.returning),
    }))
}

fn translate_delete(
    registry: &SchemaRegistry,
    delete: &DeleteStatement,
) -> Result<JsonsqlDocument, TranspileError> {
    let table = jsonsql_ast::TableRef {
        name: delete.table.clone(),
        alias: None,
    };
    let scope = QueryScope::new(registry, vec![&table]);

    Ok(JsonsqlDocument::Delete(DeleteDocument {
        from: delete.table.clone(),
        filter: delete
            .selection
            .as_ref()
            .map(|e| translate_expr(&scope, e))
            .transpose()?,
        returning: returning_value(&delete.returning),
    }))
}

/// `RETURNING` passes through as a bare field name for one column, a list
/// for several.
fn returning_value(returning: &Option<Vec<String>>) -> Option<Value> {
    match returning.as_deref() {
        None | Some([]) => None,
        Some([single]) => Some(Value::String(single.clone())),
        Some(many) => Some(json!(many)),
    }
}
