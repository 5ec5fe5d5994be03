//! SQL inspection helpers
//!
//! Parsing here is advisory: it only adds detail to diagnostics that were
//! already decided on textually, so any parse failure yields nothing.

use sqlparser::ast::{AlterTableOperation, ColumnDef, DataType, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Names of columns declared with the `STRING` type, in declaration order
pub fn string_columns(sql: &str) -> Vec<String> {
    let dialect = SQLiteDialect {};
    let statements = match Parser::parse_sql(&dialect, sql) {
        Ok(stmts) => stmts,
        Err(e) => {
            tracing::debug!(error = %e, "could not parse SQL for column inspection");
            return Vec::new();
        }
    };

    let mut columns = Vec::new();
    for stmt in &statements {
        match stmt {
            Statement::CreateTable(create) => {
                columns.extend(create.columns.iter().filter_map(string_column_name));
            }
            Statement::AlterTable { operations, .. } => {
                for operation in operations {
                    if let AlterTableOperation::AddColumn { column_def, .. } = operation {
                        columns.extend(string_column_name(column_def));
                    }
                }
            }
            _ => {}
        }
    }
    columns
}

fn string_column_name(column: &ColumnDef) -> Option<String> {
    is_string_type(&column.data_type).then(|| column.name.value.clone())
}

fn is_string_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::String(_) => true,
        // Dialects without a STRING keyword hand it back as a custom type
        DataType::Custom(name, _) => {
            matches!(name.0.as_slice(), [ident] if ident.value.eq_ignore_ascii_case("string"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_create_table_columns() {
        let sql = "CREATE TABLE contacts (_id INTEGER PRIMARY KEY, name STRING, phone STRING NOT NULL, note TEXT)";
        assert_eq!(string_columns(sql), vec!["name", "phone"]);
    }

    #[test]
    fn test_alter_table_add_column() {
        assert_eq!(
            string_columns("ALTER TABLE contacts ADD COLUMN nickname STRING"),
            vec!["nickname"]
        );
    }

    #[test]
    fn test_no_string_columns() {
        assert!(string_columns("CREATE TABLE t (a TEXT, b VARCHAR(20), c CLOB)").is_empty());
    }

    #[test]
    fn test_parse_failure_is_empty() {
        assert!(string_columns("CREATE TABLE t (a STRING").is_empty());
    }
}
