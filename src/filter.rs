use std::collections::{BTreeMap, HashSet};

use crate::domain::GeoNameRecord;
use crate::error::LoaderError;
use crate::index::ReferenceIndex;

/// Declarative row-acceptance predicate for the geographic-names import.
///
/// An empty accept-set places no restriction on that field. Unknown filter
/// keys are a configuration error, raised before any row is processed.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    feature_class: HashSet<String>,
    feature_code: HashSet<String>,
}

impl FilterSpec {
    pub fn from_map(filters: &BTreeMap<String, Vec<String>>) -> Result<Self, LoaderError> {
        let mut spec = Self::default();
        for (key, values) in filters {
            match key.as_str() {
                "featureClass" => spec.feature_class.extend(values.iter().cloned()),
                "featureCode" => spec.feature_code.extend(values.iter().cloned()),
                other => return Err(LoaderError::InvalidFilterKey(other.to_string())),
            }
        }
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        self.feature_class.is_empty() && self.feature_code.is_empty()
    }

    /// Feature-based acceptance only; see [`FilterSpec::accepts_with_override`]
    /// for the full contract.
    pub fn accepts(&self, record: &GeoNameRecord) -> bool {
        if !self.feature_class.is_empty() && !self.feature_class.contains(&record.feature_class) {
            return false;
        }
        if !self.feature_code.is_empty() && !self.feature_code.contains(&record.feature_code) {
            return false;
        }
        true
    }

    /// Rows anchoring an administrative division are always accepted, no
    /// matter what the feature filters say: later stages depend on their
    /// presence.
    pub fn accepts_with_override(&self, record: &GeoNameRecord, index: &ReferenceIndex) -> bool {
        self.accepts(record) || index.contains(record.id)
    }
}
