//! Turns the VM's [`QueryOperand`] handle set into one `SELECT`:
//! predicates join with `AND` and bind as parameters, never formatted
//! into the query text.

use std::collections::BTreeSet;

use jary_vm::{BinaryPredicate, ColumnRef, QueryOperand, Value};
use rusqlite::types::Value as SqlValue;

pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// `columns_of` resolves a table name to its full, ordered column list.
pub fn build_query(
    operands: &[QueryOperand],
    columns_of: impl Fn(&str) -> Option<Vec<String>>,
) -> Option<BuiltQuery> {
    let mut tables = BTreeSet::new();
    for op in operands {
        for column in operand_columns(op) {
            tables.insert(column.table.clone());
        }
    }
    if tables.is_empty() {
        return None;
    }

    let mut select_list = Vec::new();
    for table in &tables {
        let columns = columns_of(table)?;
        for column in columns {
            select_list.push(format!("\"{table}\".\"{column}\" AS \"{table}.{column}\""));
        }
    }

    let from_clause = tables
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let mut predicates = Vec::new();
    let mut params = Vec::new();
    for op in operands {
        predicates.push(operand_predicate(op, &mut params));
    }

    let mut sql = format!("SELECT {} FROM {from_clause}", select_list.join(", "));
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    Some(BuiltQuery { sql, params })
}

fn operand_columns(op: &QueryOperand) -> Vec<&ColumnRef> {
    match op {
        QueryOperand::Binary { column, .. } => vec![column],
        QueryOperand::Join { left, right } => vec![left, right],
        QueryOperand::Between { column, .. } => vec![column],
        QueryOperand::Within { column, .. } => vec![column],
    }
}

fn operand_predicate(op: &QueryOperand, params: &mut Vec<SqlValue>) -> String {
    match op {
        QueryOperand::Binary { column, predicate, value } => {
            params.push(to_sql_value(value));
            let op_sql = match predicate {
                BinaryPredicate::Exact => "=",
                BinaryPredicate::Regexp => "REGEXP",
            };
            format!("\"{}\".\"{}\" {op_sql} ?", column.table, column.column)
        }
        QueryOperand::Join { left, right } => {
            format!(
                "\"{}\".\"{}\" = \"{}\".\"{}\"",
                left.table, left.column, right.table, right.column
            )
        }
        QueryOperand::Between { column, min, max } => {
            params.push(to_sql_value(min));
            params.push(to_sql_value(max));
            format!("\"{}\".\"{}\" BETWEEN ? AND ?", column.table, column.column)
        }
        QueryOperand::Within { column, seconds } => {
            params.push(SqlValue::Integer(*seconds));
            format!("\"{}\".\"{}\" >= (unixepoch() - ?)", column.table, column.column)
        }
    }
}

pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Long(n) => SqlValue::Integer(*n),
        Value::ULong(n) => SqlValue::Integer(*n as i64),
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Str(s) | Value::Regex(s) => SqlValue::Text(s.to_string()),
        Value::Time(t) => SqlValue::Integer(t.as_seconds()),
        _ => SqlValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(table: &str, col: &str) -> ColumnRef {
        ColumnRef { table: table.into(), column: col.into() }
    }

    #[test]
    fn single_table_exact_binds_one_param() {
        let ops = vec![QueryOperand::Binary {
            column: column("data", "age"),
            predicate: BinaryPredicate::Exact,
            value: Value::Long(8),
        }];
        let built = build_query(ops.as_slice(), |t| {
            (t == "data").then(|| vec!["__name__".into(), "age".into()])
        })
        .unwrap();
        assert!(built.sql.contains("FROM \"data\""));
        assert!(built.sql.contains("\"data\".\"age\" = ?"));
        assert_eq!(built.params.len(), 1);
    }

    #[test]
    fn join_across_two_tables_has_no_param() {
        let ops = vec![QueryOperand::Join {
            left: column("a", "id"),
            right: column("b", "id"),
        }];
        let built = build_query(ops.as_slice(), |t| Some(vec![format!("{t}_col")])).unwrap();
        assert!(built.sql.contains("\"a\", \"b\""));
        assert!(built.params.is_empty());
    }
}
