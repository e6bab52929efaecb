mod key;
mod row;

pub use key::*;
pub use row::*;

use crate::error::InternalError;
use derive_more::{Deref, DerefMut};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// StoreRegistryError
///

#[derive(Debug, ThisError)]
pub enum StoreRegistryError {
    #[error("partition '{0}' not found")]
    PartitionNotFound(String),

    #[error("partition '{name}' already exists at version {existing}, requested {requested}")]
    VersionMismatch {
        name: String,
        existing: u32,
        requested: u32,
    },
}

impl From<StoreRegistryError> for InternalError {
    fn from(err: StoreRegistryError) -> Self {
        match &err {
            StoreRegistryError::PartitionNotFound(_) => Self::store_internal(err.to_string()),
            StoreRegistryError::VersionMismatch { .. } => Self::store_conflict(err.to_string()),
        }
    }
}

///
/// Partition
///
/// One named storage area holding every row of one entity kind, keyed by the
/// entity's key tuple. Analogous to a table.
///

#[derive(Debug, Default, Deref, DerefMut)]
pub struct Partition {
    #[deref]
    #[deref_mut]
    rows: BTreeMap<KeyTuple, RawRow>,
    version: u32,
}

impl Partition {
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            rows: BTreeMap::new(),
            version,
        }
    }

    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Sum of bytes used by all stored rows.
    #[must_use]
    pub fn memory_bytes(&self) -> u64 {
        self.rows.values().map(|row| row.len() as u64).sum()
    }
}

///
/// StoreRegistry
/// Named partitions for one database handle.
///

#[derive(Debug, Default, Deref, DerefMut)]
pub struct StoreRegistry(BTreeMap<&'static str, Partition>);

impl StoreRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a partition at the given layout version.
    ///
    /// Idempotent for repeated opens at the same version; a version change is
    /// a conflict (no migration logic lives here).
    pub fn create_partition(
        &mut self,
        name: &'static str,
        version: u32,
    ) -> Result<(), StoreRegistryError> {
        if let Some(existing) = self.0.get(name) {
            if existing.version() == version {
                return Ok(());
            }
            return Err(StoreRegistryError::VersionMismatch {
                name: name.to_string(),
                existing: existing.version(),
                requested: version,
            });
        }
        self.0.insert(name, Partition::new(version));

        Ok(())
    }

    /// Look up a partition by name.
    pub fn partition(&self, name: &str) -> Result<&Partition, InternalError> {
        self.0
            .get(name)
            .ok_or_else(|| StoreRegistryError::PartitionNotFound(name.to_string()).into())
    }

    /// Look up a partition mutably by name.
    pub fn partition_mut(&mut self, name: &str) -> Result<&mut Partition, InternalError> {
        self.0
            .get_mut(name)
            .ok_or_else(|| StoreRegistryError::PartitionNotFound(name.to_string()).into())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_creation_is_idempotent_per_version() {
        let mut registry = StoreRegistry::new();
        registry.create_partition("Board", 1).unwrap();
        registry.create_partition("Board", 1).unwrap();
        assert!(registry.contains("Board"));

        assert!(matches!(
            registry.create_partition("Board", 2),
            Err(StoreRegistryError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn missing_partition_is_an_error() {
        let registry = StoreRegistry::new();
        let err = registry.partition("Nope").unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Internal);
    }

    #[test]
    fn key_tuples_order_rows() {
        let mut partition = Partition::new(1);
        let row = RawRow::try_new(vec![1, 2, 3]).unwrap();
        for id in [3i64, 1, 2] {
            partition.insert(KeyTuple::single(StorageKey::Int(id)), row.clone());
        }

        let ids: Vec<i64> = partition
            .keys()
            .filter_map(|k| k.first().and_then(StorageKey::as_int))
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
