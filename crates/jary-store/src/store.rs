//! The SQLite-backed event store: owns the connection, the registered
//! ingress schemas, and implements [`QMatch`].

use std::collections::HashMap;
use std::path::PathBuf;

use jary_vm::{ColumnRef, ColumnValue, QMatch, QueryOperand, RuntimeError, Value, ValueKind};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::error::StoreError;
use crate::schema::IngressSchema;
use crate::sql::{build_query, to_sql_value};

/// Where the store keeps its data: defaults to an in-memory
/// database, never touching disk unless a caller asks for it.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

pub struct Store {
    conn: Connection,
    schemas: HashMap<String, Vec<(String, ValueKind)>>,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = match &config.path {
            Some(path) => Connection::open(path).map_err(StoreError::Open)?,
            None => Connection::open_in_memory().map_err(StoreError::Open)?,
        };
        register_regexp(&conn).map_err(StoreError::Open)?;
        Ok(Self { conn, schemas: HashMap::new() })
    }

    /// Registers one ingress's DDL. Idempotent: re-registering the same
    /// table name just re-runs `CREATE TABLE IF NOT EXISTS` and refreshes
    /// the column map.
    pub fn create_ingress(&mut self, schema: &IngressSchema) -> Result<(), StoreError> {
        self.conn
            .execute(&schema.create_table_sql(), [])
            .map_err(StoreError::Schema)?;
        self.schemas.insert(schema.table.clone(), schema.columns.clone());
        Ok(())
    }

    /// Inserts one event row. `columns` must name a prefix of the
    /// registered schema's declared (non-implicit) fields; `__arrival__`
    /// is left to its `DEFAULT` unless explicitly supplied.
    pub fn insert_event(&self, table: &str, columns: &[(&str, &Value)]) -> Result<(), StoreError> {
        if !self.schemas.contains_key(table) {
            return Err(StoreError::UnknownIngress(table.to_string()));
        }
        let names = columns.iter().map(|(n, _)| format!("\"{n}\"")).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO \"{table}\" ({names}) VALUES ({placeholders})");
        let params = columns.iter().map(|(_, v)| to_sql_value(v)).collect::<Vec<_>>();
        let param_refs = rusqlite::params_from_iter(params.iter());
        self.conn.execute(&sql, param_refs).map_err(StoreError::Insert)?;
        Ok(())
    }

    fn column_kind(&self, table: &str, column: &str) -> Option<ValueKind> {
        self.schemas
            .get(table)?
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, kind)| *kind)
    }
}

impl QMatch for Store {
    fn q_match(
        &self,
        operands: &[QueryOperand],
        on_row: &mut dyn FnMut(&[ColumnValue]) -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let built = build_query(operands, |table| {
            self.schemas.get(table).map(|cols| cols.iter().map(|(n, _)| n.clone()).collect())
        });
        let Some(built) = built else {
            return Ok(());
        };

        log::debug!("q_match: {}", built.sql);

        let mut stmt = self
            .conn
            .prepare(&built.sql)
            .map_err(|err| RuntimeError::QueryFailed(err.to_string()))?;
        let column_count = stmt.column_count();
        let column_refs: Vec<ColumnRef> = (0..column_count)
            .map(|i| parse_alias(stmt.column_name(i).unwrap_or_default()))
            .collect();

        let param_refs = rusqlite::params_from_iter(built.params.iter());
        let mut rows = stmt
            .query(param_refs)
            .map_err(|err| RuntimeError::QueryFailed(err.to_string()))?;

        while let Some(row) = rows.next().map_err(|err| RuntimeError::QueryFailed(err.to_string()))? {
            let mut values = Vec::with_capacity(column_count);
            for (i, column) in column_refs.iter().enumerate() {
                let kind = self.column_kind(&column.table, &column.column).unwrap_or(ValueKind::Long);
                let value = read_column(row, i, kind).map_err(|err| RuntimeError::QueryFailed(err.to_string()))?;
                values.push(ColumnValue {
                    table: column.table.clone(),
                    column: column.column.clone(),
                    value,
                });
            }
            on_row(&values)?;
        }
        Ok(())
    }
}

fn parse_alias(alias: &str) -> ColumnRef {
    match alias.split_once('.') {
        Some((table, column)) => ColumnRef { table: table.to_string(), column: column.to_string() },
        None => ColumnRef { table: String::new(), column: alias.to_string() },
    }
}

fn read_column(row: &rusqlite::Row<'_>, idx: usize, kind: ValueKind) -> rusqlite::Result<Value> {
    Ok(match kind {
        ValueKind::Long => Value::Long(row.get::<_, i64>(idx)?),
        ValueKind::ULong => Value::ULong(row.get::<_, i64>(idx)? as u64),
        ValueKind::Bool => Value::Bool(row.get::<_, i64>(idx)? != 0),
        ValueKind::Str => Value::Str(row.get::<_, String>(idx)?.into()),
        ValueKind::Time => Value::Time(jary_vm::TimeValue {
            offset: row.get::<_, i64>(idx)?,
            unit: jary_vm::TimeUnit::Second,
        }),
        _ => Value::Long(row.get::<_, i64>(idx)?),
    })
}

/// SQLite has no built-in `REGEXP`; the operator dispatches to whatever
/// scalar function is registered under that name.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern = ctx.get::<String>(0)?;
            let text = ctx.get::<String>(1)?;
            let re = Regex::new(&pattern).map_err(|err| rusqlite::Error::UserFunctionError(Box::new(err)))?;
            Ok(re.is_match(&text))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_data_table() -> Store {
        let mut store = Store::open(&StoreConfig::default()).unwrap();
        let schema = IngressSchema::new(
            "data",
            vec![
                ("__name__".into(), ValueKind::Str),
                ("__arrival__".into(), ValueKind::Time),
                ("age".into(), ValueKind::Long),
            ],
        );
        store.create_ingress(&schema).unwrap();
        store
    }

    #[test]
    fn insert_then_exact_match_finds_the_row() {
        let store = store_with_data_table();
        store
            .insert_event(
                "data",
                &[("__name__", &Value::Str("data".into())), ("age", &Value::Long(8))],
            )
            .unwrap();

        let ops = vec![QueryOperand::Binary {
            column: ColumnRef { table: "data".into(), column: "age".into() },
            predicate: jary_vm::BinaryPredicate::Exact,
            value: Value::Long(8),
        }];

        let mut seen = 0;
        store
            .q_match(&ops, &mut |row| {
                seen += 1;
                assert!(row.iter().any(|c| c.column == "age" && c.value.as_long().unwrap() == 8));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn exact_miss_invokes_callback_zero_times() {
        let store = store_with_data_table();
        store
            .insert_event(
                "data",
                &[("__name__", &Value::Str("data".into())), ("age", &Value::Long(8))],
            )
            .unwrap();

        let ops = vec![QueryOperand::Binary {
            column: ColumnRef { table: "data".into(), column: "age".into() },
            predicate: jary_vm::BinaryPredicate::Exact,
            value: Value::Long(9),
        }];

        let mut seen = 0;
        store.q_match(&ops, &mut |_row| { seen += 1; Ok(()) }).unwrap();
        assert_eq!(seen, 0);
    }

    #[test]
    fn insert_into_unregistered_table_is_an_error() {
        let store = Store::open(&StoreConfig::default()).unwrap();
        let err = store.insert_event("nope", &[]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownIngress(_)));
    }
}
