use tracing::trace;

use crate::db::SqlStore;
use crate::error::LoaderError;

/// Accumulates rendered statements and flushes them in bounded batches, all
/// inside one transaction per imported file.
///
/// `begin` opens the transaction, `finish` flushes the remaining partial
/// batch and commits. A storage failure mid-file rolls the transaction back,
/// leaving the connection ready for a rerun of the whole file, which is safe
/// because every statement is an upsert.
pub struct BatchWriter<'a> {
    store: &'a dyn SqlStore,
    batch_size: usize,
    buffer: Vec<String>,
    open: bool,
}

impl<'a> BatchWriter<'a> {
    pub fn begin(store: &'a dyn SqlStore, batch_size: usize) -> Result<Self, LoaderError> {
        store.execute_batch(store.dialect().begin_transaction())?;
        Ok(Self {
            store,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            open: true,
        })
    }

    /// Appends one statement; flushes automatically when the batch is full.
    /// Returns `true` when this call caused a flush, so callers can report
    /// progress between batches.
    pub fn add(&mut self, statement: String) -> Result<bool, LoaderError> {
        self.buffer.push(statement);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn flush(&mut self) -> Result<(), LoaderError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        trace!(statements = self.buffer.len(), "flushing batch");
        let sql = self.buffer.join("; \n");
        self.buffer.clear();
        if let Err(err) = self.store.execute_batch(&sql) {
            self.abort();
            return Err(err);
        }
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn finish(mut self) -> Result<(), LoaderError> {
        self.flush()?;
        self.open = false;
        if let Err(err) = self.store.execute_batch(self.store.dialect().commit()) {
            let _ = self.store.execute_batch(self.store.dialect().rollback());
            return Err(err);
        }
        Ok(())
    }

    /// Rolls back the open transaction so the connection is reusable; the
    /// file is rerun in full.
    fn abort(&mut self) {
        if self.open {
            self.open = false;
            let _ = self.store.execute_batch(self.store.dialect().rollback());
        }
    }
}

impl Drop for BatchWriter<'_> {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::schema::SchemaMapping;

    fn timezone_count(store: &SqliteStore) -> i64 {
        store
            .connection()
            .query_row("SELECT COUNT(*) FROM timezones", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn flushes_at_batch_boundary_and_on_finish() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema(&SchemaMapping::default()).unwrap();

        let mut writer = BatchWriter::begin(&store, 2).unwrap();
        assert!(!writer
            .add("REPLACE INTO timezones (timezone) VALUES ('a')".to_string())
            .unwrap());
        assert!(writer
            .add("REPLACE INTO timezones (timezone) VALUES ('b')".to_string())
            .unwrap());
        assert!(!writer
            .add("REPLACE INTO timezones (timezone) VALUES ('c')".to_string())
            .unwrap());
        assert_eq!(writer.pending(), 1);
        writer.finish().unwrap();

        assert_eq!(timezone_count(&store), 3);
    }

    #[test]
    fn failed_flush_rolls_back_and_the_file_can_rerun() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema(&SchemaMapping::default()).unwrap();

        let mut writer = BatchWriter::begin(&store, 2).unwrap();
        writer
            .add("REPLACE INTO timezones (timezone) VALUES ('a')".to_string())
            .unwrap();
        let err = writer.add("INSERT INTO missing_table VALUES (1)".to_string());
        assert!(err.is_err());
        drop(writer);

        // nothing from the failed file survives, and the connection is free
        // to open a fresh transaction
        assert_eq!(timezone_count(&store), 0);
        let mut writer = BatchWriter::begin(&store, 2).unwrap();
        writer
            .add("REPLACE INTO timezones (timezone) VALUES ('a')".to_string())
            .unwrap();
        writer.finish().unwrap();
        assert_eq!(timezone_count(&store), 1);
    }

    #[test]
    fn dropping_an_unfinished_writer_releases_the_transaction() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema(&SchemaMapping::default()).unwrap();

        let writer = BatchWriter::begin(&store, 2).unwrap();
        drop(writer);

        BatchWriter::begin(&store, 2).unwrap().finish().unwrap();
    }
}
