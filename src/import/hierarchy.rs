use camino::Utf8Path;
use tracing::info;

use crate::db::SqlStore;
use crate::domain::HierarchyRecord;
use crate::error::LoaderError;
use crate::import::{Importer, LARGE_BATCH_SIZE, ProgressSink};
use crate::mapper::map_hierarchy;
use crate::schema::SchemaMapping;
use crate::source::{RecordSource, SourceOptions};
use crate::writer::BatchWriter;

/// Importer for `hierarchy.zip` (parent id, child id, optional link type).
/// Links are keyed by the `(parent, child)` pair.
pub struct HierarchyImporter<'a> {
    store: &'a dyn SqlStore,
    mapping: &'a SchemaMapping,
    batch_size: usize,
}

impl<'a> HierarchyImporter<'a> {
    pub fn new(store: &'a dyn SqlStore, mapping: &'a SchemaMapping) -> Self {
        Self {
            store,
            mapping,
            batch_size: LARGE_BATCH_SIZE,
        }
    }
}

impl Importer for HierarchyImporter<'_> {
    fn import(&self, path: &Utf8Path, progress: &dyn ProgressSink) -> Result<bool, LoaderError> {
        let dialect = self.store.dialect();
        let source = RecordSource::open(
            path,
            SourceOptions {
                numeric_first: true,
                min_fields: 2,
                ..SourceOptions::default()
            },
        )?;
        let total = source.estimated_rows();

        let mut writer = BatchWriter::begin(self.store, self.batch_size)?;
        let mut pos = 0u64;
        for fields in source {
            pos += 1;
            let Some(record) = HierarchyRecord::parse(&fields) else {
                continue;
            };
            let row = map_hierarchy(&record, self.mapping, dialect)?;
            if writer.add(dialect.upsert(&self.mapping.hierarchy.table, &row, 2))? {
                progress.fraction((pos as f64 / total as f64).min(1.0));
            }
        }
        writer.finish()?;
        progress.fraction(1.0);

        info!(links = pos, "hierarchy imported");
        Ok(true)
    }
}
