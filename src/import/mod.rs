mod administrative;
mod country;
mod geoname;
mod hierarchy;
mod timezone;

pub use administrative::AdministrativeImporter;
pub use country::CountryImporter;
pub use geoname::GeoNameImporter;
pub use hierarchy::HierarchyImporter;
pub use timezone::TimezoneImporter;

use camino::Utf8Path;

use crate::error::LoaderError;

/// Default batch bound for the multi-million-row files.
pub const LARGE_BATCH_SIZE: usize = 10_000;
/// Default batch bound for the small per-entity files.
pub const SMALL_BATCH_SIZE: usize = 100;

/// Fractional progress receiver. Invoked between batches with a value in
/// `0.0..=1.0`; monotonic in practice but not contractually required to be,
/// since archive totals are estimates.
pub trait ProgressSink {
    fn fraction(&self, value: f64);
}

impl<F: Fn(f64)> ProgressSink for F {
    fn fraction(&self, value: f64) {
        self(value)
    }
}

pub struct NopProgress;

impl ProgressSink for NopProgress {
    fn fraction(&self, _value: f64) {}
}

/// One per-entity importer: streams a cached source file into the store as
/// a single transaction and reports fractional progress along the way.
pub trait Importer {
    fn import(&self, path: &Utf8Path, progress: &dyn ProgressSink) -> Result<bool, LoaderError>;
}
