use camino::Utf8Path;
use tracing::info;

use crate::db::SqlStore;
use crate::domain::AdminRecord;
use crate::error::LoaderError;
use crate::import::{Importer, ProgressSink, SMALL_BATCH_SIZE};
use crate::mapper::{map_admin, map_admin_anchor};
use crate::schema::SchemaMapping;
use crate::source::{RecordSource, SourceOptions};
use crate::writer::BatchWriter;

/// Importer for the administrative-codes files (`admin1CodesASCII.txt`,
/// `admin2Codes.txt`; 4 tab-separated fields after a header line).
///
/// Every division is written twice: once into the administrative table and
/// once as a placeholder geographic-name row carrying the division's code,
/// so the main import never leaves anchors orphaned.
pub struct AdministrativeImporter<'a> {
    store: &'a dyn SqlStore,
    mapping: &'a SchemaMapping,
    batch_size: usize,
}

impl<'a> AdministrativeImporter<'a> {
    pub fn new(store: &'a dyn SqlStore, mapping: &'a SchemaMapping) -> Self {
        Self {
            store,
            mapping,
            batch_size: SMALL_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Importer for AdministrativeImporter<'_> {
    fn import(&self, path: &Utf8Path, progress: &dyn ProgressSink) -> Result<bool, LoaderError> {
        let dialect = self.store.dialect();
        let source = RecordSource::open(
            path,
            SourceOptions {
                skip_header: true,
                min_fields: 4,
                ..SourceOptions::default()
            },
        )?;
        let total = source.estimated_rows();

        let mut writer = BatchWriter::begin(self.store, self.batch_size)?;
        let mut pos = 0u64;
        for fields in source {
            pos += 1;
            let Some(record) = AdminRecord::parse(&fields) else {
                continue;
            };

            let division = map_admin(&record, self.mapping, dialect)?;
            writer.add(dialect.upsert(&self.mapping.administrative.table, &division, 1))?;

            let anchor = map_admin_anchor(&record, self.mapping, dialect)?;
            if writer.add(dialect.upsert(&self.mapping.geonames.table, &anchor, 1))? {
                progress.fraction((pos as f64 / total as f64).min(1.0));
            }
        }
        writer.finish()?;
        progress.fraction(1.0);

        info!(rows = pos, file = %path, "administrative divisions imported");
        Ok(true)
    }
}
