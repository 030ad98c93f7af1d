use camino::Utf8Path;
use tracing::info;

use crate::db::SqlStore;
use crate::domain::GeoNameRecord;
use crate::error::LoaderError;
use crate::filter::FilterSpec;
use crate::import::{Importer, LARGE_BATCH_SIZE, ProgressSink};
use crate::index::ReferenceIndex;
use crate::mapper::map_geoname;
use crate::schema::SchemaMapping;
use crate::source::{RecordSource, SourceOptions};
use crate::writer::BatchWriter;

/// Importer for the main geographic-names archive (`allCountries.zip`,
/// 19 tab-separated fields per row).
///
/// Builds the administrative reference index from the persisted store before
/// streaming begins and never refreshes it mid-run: divisions committed by
/// this very run become visible to later stages only.
pub struct GeoNameImporter<'a> {
    store: &'a dyn SqlStore,
    mapping: &'a SchemaMapping,
    filters: FilterSpec,
    batch_size: usize,
}

impl<'a> GeoNameImporter<'a> {
    pub fn new(store: &'a dyn SqlStore, mapping: &'a SchemaMapping, filters: FilterSpec) -> Self {
        Self {
            store,
            mapping,
            filters,
            batch_size: LARGE_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Importer for GeoNameImporter<'_> {
    fn import(&self, path: &Utf8Path, progress: &dyn ProgressSink) -> Result<bool, LoaderError> {
        let dialect = self.store.dialect();
        let index = ReferenceIndex::build(self.store, &self.mapping.administrative)?;
        info!(divisions = index.len(), "built administrative reference index");

        let source = RecordSource::open(
            path,
            SourceOptions {
                numeric_first: true,
                min_fields: 19,
                ..SourceOptions::default()
            },
        )?;
        let total = source.estimated_rows();
        let date_pattern = GeoNameRecord::date_pattern();

        let mut writer = BatchWriter::begin(self.store, self.batch_size)?;
        let mut pos = 0u64;
        let mut accepted = 0u64;
        for fields in source {
            pos += 1;
            let Some(record) = GeoNameRecord::parse(&fields, &date_pattern) else {
                continue;
            };
            if !self.filters.accepts_with_override(&record, &index) {
                continue;
            }
            accepted += 1;
            let row = map_geoname(&record, &index, self.mapping, dialect)?;
            let statement = dialect.upsert(&self.mapping.geonames.table, &row, 1);
            if writer.add(statement)? {
                progress.fraction((pos as f64 / total as f64).min(1.0));
            }
        }
        writer.finish()?;
        progress.fraction(1.0);

        info!(rows = pos, accepted, "geographic names imported");
        Ok(true)
    }
}
