use camino::Utf8Path;
use rusqlite::Connection;

use crate::dialect::Dialect;
use crate::error::LoaderError;
use crate::schema::SchemaMapping;

/// Storage handle the import engine writes through. Passed explicitly to
/// every component that needs it; there is no ambient connection state.
///
/// The crate ships a SQLite implementation; MySQL-family and
/// PostgreSQL-family callers implement this over their own driver and get
/// the matching SQL rendering by returning the right [`Dialect`].
pub trait SqlStore {
    fn dialect(&self) -> Dialect;

    /// Executes one or more `;`-separated statements as a single call.
    fn execute_batch(&self, sql: &str) -> Result<(), LoaderError>;

    /// All `(identifier, code)` pairs currently persisted in the named
    /// table, used to build the reference index.
    fn select_id_code_pairs(
        &self,
        table: &str,
        id_column: &str,
        code_column: &str,
    ) -> Result<Vec<(i64, String)>, LoaderError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Utf8Path) -> Result<Self, LoaderError> {
        let conn = Connection::open(path.as_std_path())?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, LoaderError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Creates the target tables when absent.
    pub fn init_schema(&self, mapping: &SchemaMapping) -> Result<(), LoaderError> {
        for statement in mapping.create_statements()? {
            self.conn.execute_batch(&statement)?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SqlStore for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn execute_batch(&self, sql: &str) -> Result<(), LoaderError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn select_id_code_pairs(
        &self,
        table: &str,
        id_column: &str,
        code_column: &str,
    ) -> Result<Vec<(i64, String)>, LoaderError> {
        let sql = format!("SELECT {id_column}, {code_column} FROM {table}");
        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut pairs = Vec::new();
        for pair in rows {
            pairs.push(pair?);
        }
        Ok(pairs)
    }
}
