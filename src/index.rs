use std::collections::HashMap;

use crate::db::SqlStore;
use crate::error::LoaderError;
use crate::schema::TableMapping;

/// In-memory code-to-identifier map over the administrative divisions
/// currently persisted in the store.
///
/// Built exactly once at the start of the geographic-names stage and held
/// read-only for its duration. It reflects already-committed state only:
/// divisions introduced by the same run become visible to later stages, not
/// within their own.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    code_by_id: HashMap<i64, String>,
    id_by_code: HashMap<String, i64>,
}

impl ReferenceIndex {
    pub fn build(store: &dyn SqlStore, mapping: &TableMapping) -> Result<Self, LoaderError> {
        let pairs = store.select_id_code_pairs(
            &mapping.table,
            mapping.column("id")?,
            mapping.column("code")?,
        )?;

        let mut index = Self::default();
        for (id, code) in pairs {
            index.id_by_code.insert(code.clone(), id);
            index.code_by_id.insert(id, code);
        }
        Ok(index)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.code_by_id.contains_key(&id)
    }

    pub fn code_of(&self, id: i64) -> Option<&str> {
        self.code_by_id.get(&id).map(String::as_str)
    }

    pub fn id_of(&self, code: &str) -> Option<i64> {
        self.id_by_code.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.code_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code_by_id.is_empty()
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(i64, &str)]) -> Self {
        let mut index = Self::default();
        for (id, code) in pairs {
            index.id_by_code.insert(code.to_string(), *id);
            index.code_by_id.insert(*id, code.to_string());
        }
        index
    }
}
