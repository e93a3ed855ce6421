//! Normalized statement and expression types
//!
//! A closed representation of the SQL subset the remote engine can express.
//! Every node here has a defined JSONSQL encoding; anything the external
//! parser produces that cannot be represented is rejected during ingestion.

use serde::{Deserialize, Serialize};

/// A normalized SQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub distinct: bool,
    pub projection: Vec<Projection>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A table source with an optional alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The name other expressions use to qualify columns from this source.
    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An inner join with its `ON` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: TableRef,
    pub on: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// `SELECT *` - expanded against the schema registry at translation time.
    Star,
    Expr(Expr),
    Aliased { expr: Expr, alias: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderKey {
    pub expr: Expr,
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    /// One inner vector per `VALUES` row.
    pub values: Vec<Vec<Expr>>,
    pub returning: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub selection: Option<Expr>,
    pub returning: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: String,
    pub selection: Option<Expr>,
    pub returning: Option<Vec<String>>,
}

/// Expression types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Column {
        table: Option<String>,
        name: String,
    },
    Literal(Value),
    /// Operator application: comparisons, arithmetic, `and`/`or`/`not`,
    /// `in`, `between`, `like`, `is_null`. The operand list is not strictly
    /// binary; contiguous `and`/`or` chains are flattened during ingestion.
    Operator {
        name: String,
        operands: Vec<Expr>,
    },
    Function {
        name: String,
        args: FunctionArgs,
        distinct: bool,
    },
    Subquery(Box<SelectStatement>),
    Aliased {
        expr: Box<Expr>,
        alias: String,
    },
}

/// Function argument shapes.
///
/// The three constructors serialize differently on the wire (array vs bare
/// value vs nested object) and must never be collapsed into one another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionArgs {
    /// `COUNT(*)` - a one-element `["*"]` array on the wire.
    Star,
    /// Exactly one argument - a bare (unwrapped) value on the wire.
    Single(Box<Expr>),
    /// Zero or two-plus arguments - an array on the wire.
    Many(Vec<Expr>),
}

/// Scalar literal values. Date/time literals stay textual (ISO-8601); the
/// remote engine accepts no native date type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_alias_falls_back_to_name() {
        let plain = TableRef { name: "media".to_string(), alias: None };
        assert_eq!(plain.effective_alias(), "media");

        let aliased = TableRef { name: "media".to_string(), alias: Some("m".to_string()) };
        assert_eq!(aliased.effective_alias(), "m");
    }
}
