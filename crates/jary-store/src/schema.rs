//! DDL for an ingress table: every event carries
//! `__name__`/`__arrival__` plus its declared fields, backed by one
//! SQLite table per ingress.

use jary_vm::ValueKind;

/// The column layout of one ingress, as the host builds it from the
/// compiled [`jary_vm::EventTable`] schema.
#[derive(Debug, Clone)]
pub struct IngressSchema {
    pub table: String,
    pub columns: Vec<(String, ValueKind)>,
}

impl IngressSchema {
    pub fn new(table: impl Into<String>, columns: Vec<(String, ValueKind)>) -> Self {
        Self { table: table.into(), columns }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    /// `CREATE TABLE IF NOT EXISTS` with `__arrival__` defaulting to the
    /// current time when a caller doesn't supply one explicitly.
    pub fn create_table_sql(&self) -> String {
        let mut columns_sql = Vec::with_capacity(self.columns.len());
        for (name, kind) in &self.columns {
            let affinity = sqlite_affinity(*kind);
            if name == "__arrival__" {
                columns_sql.push(format!("\"{name}\" {affinity} NOT NULL DEFAULT (unixepoch())"));
            } else {
                columns_sql.push(format!("\"{name}\" {affinity}"));
            }
        }
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.table,
            columns_sql.join(", ")
        )
    }
}

pub fn sqlite_affinity(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Long | ValueKind::ULong | ValueKind::Bool | ValueKind::Time => "INTEGER",
        ValueKind::Str => "TEXT",
        other => panic!("value kind {other:?} cannot be stored as an ingress column"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_sql_defaults_arrival() {
        let schema = IngressSchema::new(
            "data",
            vec![
                ("__name__".into(), ValueKind::Str),
                ("__arrival__".into(), ValueKind::Time),
                ("age".into(), ValueKind::Long),
            ],
        );
        let sql = schema.create_table_sql();
        assert!(sql.contains("\"__arrival__\" INTEGER NOT NULL DEFAULT (unixepoch())"));
        assert!(sql.contains("\"age\" INTEGER"));
    }
}
