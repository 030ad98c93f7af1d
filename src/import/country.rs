use camino::Utf8Path;
use tracing::info;

use crate::db::SqlStore;
use crate::domain::CountryRecord;
use crate::error::LoaderError;
use crate::import::{Importer, ProgressSink, SMALL_BATCH_SIZE};
use crate::mapper::map_country;
use crate::schema::SchemaMapping;
use crate::source::{RecordSource, SourceOptions};
use crate::writer::BatchWriter;

/// Importer for `countryInfo.txt` (19 tab-separated fields, `#` comments).
pub struct CountryImporter<'a> {
    store: &'a dyn SqlStore,
    mapping: &'a SchemaMapping,
    batch_size: usize,
}

impl<'a> CountryImporter<'a> {
    pub fn new(store: &'a dyn SqlStore, mapping: &'a SchemaMapping) -> Self {
        Self {
            store,
            mapping,
            batch_size: SMALL_BATCH_SIZE,
        }
    }
}

impl Importer for CountryImporter<'_> {
    fn import(&self, path: &Utf8Path, progress: &dyn ProgressSink) -> Result<bool, LoaderError> {
        let dialect = self.store.dialect();
        let source = RecordSource::open(
            path,
            SourceOptions {
                comment_prefix: Some('#'),
                min_fields: 5,
                ..SourceOptions::default()
            },
        )?;
        let total = source.estimated_rows();

        let mut writer = BatchWriter::begin(self.store, self.batch_size)?;
        let mut pos = 0u64;
        for fields in source {
            pos += 1;
            let Some(record) = CountryRecord::parse(&fields) else {
                continue;
            };
            let row = map_country(&record, self.mapping, dialect)?;
            if writer.add(dialect.upsert(&self.mapping.countries.table, &row, 1))? {
                progress.fraction((pos as f64 / total as f64).min(1.0));
            }
        }
        writer.finish()?;
        progress.fraction(1.0);

        info!(rows = pos, "countries imported");
        Ok(true)
    }
}
