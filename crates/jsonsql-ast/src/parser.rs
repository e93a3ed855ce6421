//! SQL text -> normalized statement
//!
//! Thin front door over `sqlparser`: pick a dialect, parse, and hand the
//! single resulting statement to the ingestion adapter.

use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use crate::ast::Statement;
use crate::ingest::{ingest, IngestError};

/// Input dialect for parsing. Output is dialect-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Generic,
    Postgres,
    MySql,
}

impl SqlDialect {
    fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Generic => Box::new(GenericDialect {}),
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
        }
    }
}

/// Parse one SQL statement and normalize it.
///
/// Multi-statement input is rejected; the transport protocol carries one
/// document per request.
pub fn parse(sql: &str, dialect: SqlDialect) -> Result<Statement, IngestError> {
    let statements = Parser::parse_sql(dialect.dialect().as_ref(), sql)?;
    match statements.as_slice() {
        [] => Err(IngestError::Empty),
        [stmt] => ingest(stmt),
        _ => Err(IngestError::Unsupported {
            construct: "multiple statements".to_string(),
            fragment: sql.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse("", SqlDialect::Generic), Err(IngestError::Empty)));
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = parse("SELECT 1 FROM a; SELECT 2 FROM b", SqlDialect::Generic).unwrap_err();
        assert!(matches!(err, IngestError::Unsupported { .. }));
    }

    #[test]
    fn test_mysql_backtick_identifiers() {
        let stmt = parse("SELECT `id` FROM `media`", SqlDialect::MySql).unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }
}
