//! End-to-end SQL to wire-document checks against literal expected JSON.

use std::sync::Arc;

use jsonsql_registry::{FieldDefinition, FieldType, SchemaRegistry, TableSchema};
use jsonsql_transpiler::{TranspileError, Transpiler, TranspilerConfig};
use serde_json::json;

fn named_schema(table: &str, total: u32, names: &[&str]) -> TableSchema {
    let mut schema = TableSchema::new(table, total);
    for (position, name) in names.iter().enumerate() {
        schema
            .insert_field(FieldDefinition {
                position: position as u32,
                name: (*name).to_string(),
                field_type: FieldType::Unknown,
                alias: None,
            })
            .unwrap();
    }
    schema
}

fn transpiler(config: TranspilerConfig) -> Transpiler {
    let registry = Arc::new(SchemaRegistry::new(false));
    registry.register(named_schema("subscriber", 6, &["id", "username"]));
    registry.register(named_schema("terminal", 3, &["id", "mac_addr", "subscriber_id"]));
    registry.register(named_schema("session", 2, &["started_at", "terminal_id"]));
    Transpiler::new(registry, config)
}

fn default_transpiler() -> Transpiler {
    transpiler(TranspilerConfig::default())
}

#[test]
fn test_count_star() {
    let doc = default_transpiler()
        .transpile_sql("SELECT COUNT(*) FROM tv_channel")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({"data": [{"function": "count", "args": ["*"]}], "from": "tv_channel"})
    );
}

#[test]
fn test_count_field_bare_string_args() {
    let doc = default_transpiler()
        .transpile_sql("SELECT COUNT(id) FROM media")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({"data": [{"function": "count", "args": "id"}], "from": "media"})
    );
}

#[test]
fn test_count_distinct_nested_function() {
    let doc = default_transpiler()
        .transpile_sql("SELECT COUNT(DISTINCT mac_addr) FROM terminal")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "data": [{"function": "count", "args": {"function": "distinct", "args": "mac_addr"}}],
            "from": "terminal"
        })
    );
}

#[test]
fn test_star_expansion_partial_schema() {
    let doc = default_transpiler()
        .transpile_sql("SELECT * FROM subscriber")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "data": ["id", "username", "Field_2", "Field_3", "Field_4", "Field_5"],
            "from": "subscriber"
        })
    );
}

#[test]
fn test_star_expansion_unknown_table_fails() {
    let err = default_transpiler()
        .transpile_sql("SELECT * FROM ghost")
        .unwrap_err();
    assert!(matches!(err, TranspileError::SchemaResolution(_)));
}

#[test]
fn test_auto_order_by_id_injected() {
    let transpiler = transpiler(TranspilerConfig {
        auto_order_by_id: true,
        ..Default::default()
    });
    let doc = transpiler
        .transpile_sql("SELECT * FROM subscriber LIMIT 5")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "data": ["id", "username", "Field_2", "Field_3", "Field_4", "Field_5"],
            "from": "subscriber",
            "order_by": ["id"],
            "limit": 5
        })
    );
}

#[test]
fn test_auto_order_skipped_without_id_field() {
    let transpiler = transpiler(TranspilerConfig {
        auto_order_by_id: true,
        ..Default::default()
    });
    let doc = transpiler
        .transpile_sql("SELECT * FROM session LIMIT 5")
        .unwrap();
    assert!(doc.to_value().get("order_by").is_none());
}

#[test]
fn test_auto_order_respects_explicit_order() {
    let transpiler = transpiler(TranspilerConfig {
        auto_order_by_id: true,
        ..Default::default()
    });
    let doc = transpiler
        .transpile_sql("SELECT username FROM subscriber ORDER BY username DESC")
        .unwrap();
    assert_eq!(
        doc.to_value()["order_by"],
        json!([{"desc": ["username"]}])
    );
}

#[test]
fn test_join_with_qualified_columns() {
    let doc = default_transpiler()
        .transpile_sql("SELECT a.id, b.name FROM a JOIN b ON a.id = b.a_id")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "data": [{"a": "id"}, {"b": "name"}],
            "from": [
                {"table": "a", "as": "a"},
                {"join": "b", "as": "b", "on": {"eq": [{"a": "id"}, {"b": "a_id"}]}}
            ]
        })
    );
}

#[test]
fn test_join_unqualified_column_resolved_by_schema() {
    let doc = default_transpiler()
        .transpile_sql(
            "SELECT mac_addr FROM terminal t JOIN session s ON t.id = s.terminal_id",
        )
        .unwrap();
    assert_eq!(doc.to_value()["data"], json!([{"t": "mac_addr"}]));
}

#[test]
fn test_join_ambiguous_unqualified_column_rejected() {
    // `id` exists in both subscriber and terminal.
    let err = default_transpiler()
        .transpile_sql(
            "SELECT id FROM subscriber a JOIN terminal b ON a.id = b.subscriber_id",
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TranspileError::AmbiguousFieldReference { column } if column == "id"
    ));
}

#[test]
fn test_join_unqualified_column_with_unknown_schema_rejected() {
    // Table `b` has no registered schema, so ownership cannot be proven.
    let err = default_transpiler()
        .transpile_sql("SELECT mac_addr FROM terminal a JOIN b ON a.id = b.terminal_id")
        .unwrap_err();
    assert!(matches!(err, TranspileError::AmbiguousFieldReference { .. }));
}

#[test]
fn test_single_table_matching_qualifier_dropped() {
    let transpiler = default_transpiler();
    let plain = transpiler.transpile_sql("SELECT media.id FROM media").unwrap();
    assert_eq!(plain.to_value()["data"], json!(["id"]));

    let aliased = transpiler.transpile_sql("SELECT m.id FROM media m").unwrap();
    assert_eq!(aliased.to_value()["data"], json!(["id"]));
}

#[test]
fn test_single_table_foreign_qualifier_rejected() {
    let err = default_transpiler()
        .transpile_sql("SELECT x.id FROM media")
        .unwrap_err();
    assert!(matches!(
        err,
        TranspileError::AmbiguousFieldReference { column } if column == "x.id"
    ));
}

#[test]
fn test_subquery_in_where_collapses_data() {
    let doc = default_transpiler()
        .transpile_sql(
            "SELECT id FROM payment WHERE subscriber_id IN \
             (SELECT id FROM subscriber WHERE username = 'test')",
        )
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "data": ["id"],
            "from": "payment",
            "where": {"in": ["subscriber_id", {"select": {
                "data": "id",
                "from": "subscriber",
                "where": {"eq": ["username", "test"]}
            }}]}
        })
    );
}

#[test]
fn test_in_value_list() {
    let doc = default_transpiler()
        .transpile_sql("SELECT id FROM media WHERE kind IN (1, 2, 3)")
        .unwrap();
    assert_eq!(
        doc.to_value()["where"],
        json!({"in": ["kind", [1, 2, 3]]})
    );
}

#[test]
fn test_not_in_wraps_not() {
    let doc = default_transpiler()
        .transpile_sql("SELECT id FROM media WHERE kind NOT IN (1, 2)")
        .unwrap();
    assert_eq!(
        doc.to_value()["where"],
        json!({"not": [{"in": ["kind", [1, 2]]}]})
    );
}

#[test]
fn test_and_chain_flattened() {
    let doc = default_transpiler()
        .transpile_sql("SELECT id FROM media WHERE a = 1 AND b = 2 AND c = 3")
        .unwrap();
    assert_eq!(
        doc.to_value()["where"],
        json!({"and": [{"eq": ["a", 1]}, {"eq": ["b", 2]}, {"eq": ["c", 3]}]})
    );
}

#[test]
fn test_grouped_or_preserved_inside_and() {
    let doc = default_transpiler()
        .transpile_sql("SELECT id FROM media WHERE a = 1 AND (b = 2 OR c = 3)")
        .unwrap();
    assert_eq!(
        doc.to_value()["where"],
        json!({"and": [
            {"eq": ["a", 1]},
            {"or": [{"eq": ["b", 2]}, {"eq": ["c", 3]}]}
        ]})
    );
}

#[test]
fn test_between_and_like() {
    let transpiler = default_transpiler();
    let between = transpiler
        .transpile_sql("SELECT id FROM payment WHERE amount BETWEEN 10 AND 20")
        .unwrap();
    assert_eq!(
        between.to_value()["where"],
        json!({"between": ["amount", 10, 20]})
    );

    let like = transpiler
        .transpile_sql("SELECT id FROM media WHERE name NOT LIKE 'trailer%'")
        .unwrap();
    assert_eq!(
        like.to_value()["where"],
        json!({"not": [{"like": ["name", "trailer%"]}]})
    );
}

#[test]
fn test_is_null() {
    let doc = default_transpiler()
        .transpile_sql("SELECT id FROM terminal WHERE mac_addr IS NULL")
        .unwrap();
    assert_eq!(doc.to_value()["where"], json!({"is_null": ["mac_addr"]}));
}

#[test]
fn test_group_by_and_distinct() {
    let transpiler = default_transpiler();
    let grouped = transpiler
        .transpile_sql("SELECT kind, COUNT(id) FROM media GROUP BY kind")
        .unwrap();
    assert_eq!(grouped.to_value()["group_by"], json!(["kind"]));

    let distinct = transpiler
        .transpile_sql("SELECT DISTINCT kind FROM media")
        .unwrap();
    assert_eq!(distinct.to_value()["distinct"], json!(true));
}

#[test]
fn test_projection_alias() {
    let doc = default_transpiler()
        .transpile_sql("SELECT id AS subscriber_id FROM subscriber")
        .unwrap();
    assert_eq!(
        doc.to_value()["data"],
        json!([{"as": ["id", "subscriber_id"]}])
    );
}

#[test]
fn test_insert_document() {
    let doc = default_transpiler()
        .transpile_sql("INSERT INTO media (name, kind) VALUES ('trailer', 2) RETURNING id")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "into": "media",
            "columns": ["name", "kind"],
            "values": [["trailer", 2]],
            "returning": "id"
        })
    );
}

#[test]
fn test_update_document() {
    let doc = default_transpiler()
        .transpile_sql("UPDATE subscriber SET username = 'new', active = true WHERE id = 7")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "table": "subscriber",
            "set": {"username": "new", "active": true},
            "where": {"eq": ["id", 7]}
        })
    );
}

#[test]
fn test_delete_document() {
    let doc = default_transpiler()
        .transpile_sql("DELETE FROM payment WHERE amount < 0 RETURNING id, amount")
        .unwrap();
    assert_eq!(
        doc.to_value(),
        json!({
            "from": "payment",
            "where": {"lt": ["amount", 0]},
            "returning": ["id", "amount"]
        })
    );
}

#[test]
fn test_star_across_join_rejected() {
    let err = default_transpiler()
        .transpile_sql("SELECT * FROM subscriber a JOIN terminal b ON a.id = b.subscriber_id")
        .unwrap_err();
    assert!(matches!(err, TranspileError::UnsupportedConstruct { .. }));
}

#[test]
fn test_window_function_and_cte_rejected() {
    let transpiler = default_transpiler();
    assert!(matches!(
        transpiler.transpile_sql("SELECT rank() OVER (ORDER BY id) FROM media"),
        Err(TranspileError::Ingest(_))
    ));
    assert!(matches!(
        transpiler.transpile_sql("WITH x AS (SELECT id FROM media) SELECT id FROM x"),
        Err(TranspileError::Ingest(_))
    ));
}

#[test]
fn test_idempotent_and_stable_fingerprint() {
    let transpiler = default_transpiler();
    let sql = "SELECT * FROM subscriber WHERE username = 'test'";
    let first = transpiler.transpile_sql(sql).unwrap();
    let second = transpiler.transpile_sql(sql).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
}
