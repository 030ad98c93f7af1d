use camino::Utf8Path;
use tracing::info;

use crate::db::SqlStore;
use crate::domain::TimezoneRecord;
use crate::error::LoaderError;
use crate::import::{Importer, ProgressSink, SMALL_BATCH_SIZE};
use crate::mapper::map_timezone;
use crate::schema::SchemaMapping;
use crate::source::{RecordSource, SourceOptions};
use crate::writer::BatchWriter;

/// Importer for `timeZones.txt` (header line, then country code, timezone
/// name and three offsets). Timezones carry no numeric identifier in the
/// dump, so they are keyed by name; geographic-name rows resolve their
/// timezone reference by that name.
pub struct TimezoneImporter<'a> {
    store: &'a dyn SqlStore,
    mapping: &'a SchemaMapping,
    batch_size: usize,
}

impl<'a> TimezoneImporter<'a> {
    pub fn new(store: &'a dyn SqlStore, mapping: &'a SchemaMapping) -> Self {
        Self {
            store,
            mapping,
            batch_size: SMALL_BATCH_SIZE,
        }
    }
}

impl Importer for TimezoneImporter<'_> {
    fn import(&self, path: &Utf8Path, progress: &dyn ProgressSink) -> Result<bool, LoaderError> {
        let dialect = self.store.dialect();
        let source = RecordSource::open(
            path,
            SourceOptions {
                skip_header: true,
                min_fields: 2,
                ..SourceOptions::default()
            },
        )?;
        let total = source.estimated_rows();

        let mut writer = BatchWriter::begin(self.store, self.batch_size)?;
        let mut pos = 0u64;
        for fields in source {
            pos += 1;
            let Some(record) = TimezoneRecord::parse(&fields) else {
                continue;
            };
            let row = map_timezone(&record, self.mapping, dialect)?;
            if writer.add(dialect.upsert(&self.mapping.timezones.table, &row, 1))? {
                progress.fraction((pos as f64 / total as f64).min(1.0));
            }
        }
        writer.finish()?;
        progress.fraction(1.0);

        info!(rows = pos, "timezones imported");
        Ok(true)
    }
}
