use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::LoaderError;

/// Database family the rendered SQL targets. Anything else is rejected at
/// configuration time, before a single row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Dialect {
    Sqlite,
    #[value(alias = "mariadb")]
    Mysql,
    #[value(alias = "postgresql")]
    Postgres,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::Mysql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for Dialect {
    type Err = LoaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(LoaderError::UnsupportedDialect(value.to_string())),
        }
    }
}

impl Dialect {
    /// Statement opening the per-file transaction.
    pub fn begin_transaction(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "BEGIN TRANSACTION",
            Dialect::Mysql | Dialect::Postgres => "START TRANSACTION",
        }
    }

    pub fn commit(&self) -> &'static str {
        "COMMIT"
    }

    pub fn rollback(&self) -> &'static str {
        "ROLLBACK"
    }

    /// Renders a string as a quoted SQL literal.
    pub fn quote(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 2);
        out.push('\'');
        for ch in raw.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' if matches!(self, Dialect::Mysql) => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }

    /// Renders one idempotent insert-or-replace statement for a fully
    /// rendered row. `columns` are `(column name, rendered value)` pairs and
    /// the first `key_columns` of them form the primary key.
    ///
    /// SQLite and MySQL get the leading `INSERT ` clause rewritten to
    /// `REPLACE `; PostgreSQL gets an `ON CONFLICT (...) DO UPDATE SET`
    /// clause listing every non-key column, or `DO NOTHING` when every
    /// column is part of the key.
    pub fn upsert(&self, table: &str, columns: &[(String, String)], key_columns: usize) -> String {
        let names = columns
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let values = columns
            .iter()
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!("INSERT INTO {table} ({names}) VALUES ({values})");

        match self {
            Dialect::Sqlite | Dialect::Mysql => insert.replacen("INSERT ", "REPLACE ", 1),
            Dialect::Postgres => {
                let keys = columns[..key_columns]
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if columns.len() <= key_columns {
                    return format!("{insert} ON CONFLICT ({keys}) DO NOTHING");
                }
                let updates = columns[key_columns..]
                    .iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{insert} ON CONFLICT ({keys}) DO UPDATE SET {updates}")
            }
        }
    }
}
