use crate::{
    db::{
        database::DatabaseInner,
        record::Record,
        scope::PartitionScope,
        store::{KeyTuple, RawRow, StorageKey},
    },
    error::InternalError,
};
use std::{
    collections::BTreeMap,
    rc::Rc,
};

///
/// TxnMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

impl TxnMode {
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

///
/// Transaction
///
/// One scoped unit of work over a fixed set of partitions. Reads see a
/// snapshot of the store plus this transaction's own buffered writes;
/// `commit` applies the buffer atomically and `abort` discards it.
///
/// The granted scope is fixed at open time. Touching a partition outside it
/// is a caller programming error (fatal); the scope is never auto-expanded
/// mid-transaction.
///

pub struct Transaction {
    db: Rc<DatabaseInner>,
    mode: TxnMode,
    scope: PartitionScope,
    overlay: BTreeMap<&'static str, BTreeMap<KeyTuple, Option<RawRow>>>,
    aborted: bool,
}

impl Transaction {
    pub(crate) fn new(db: Rc<DatabaseInner>, mode: TxnMode, scope: PartitionScope) -> Self {
        Self {
            db,
            mode,
            scope,
            overlay: BTreeMap::new(),
            aborted: false,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> TxnMode {
        self.mode
    }

    #[must_use]
    pub const fn scope(&self) -> &PartitionScope {
        &self.scope
    }

    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Discard all buffered writes; the transaction can no longer commit.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.overlay.clear();
    }

    fn check_scope(&self, partition: &str) -> Result<(), InternalError> {
        if self.scope.contains(partition) {
            return Ok(());
        }

        Err(InternalError::executor_invariant(format!(
            "partition '{partition}' is outside the transaction scope {}",
            self.scope
        )))
    }

    fn check_write(&self, partition: &str) -> Result<(), InternalError> {
        self.check_scope(partition)?;
        if self.aborted {
            return Err(InternalError::store_invariant(
                "transaction is aborted".to_string(),
            ));
        }
        if !self.mode.is_write() {
            return Err(InternalError::executor_invariant(format!(
                "write to '{partition}' inside a read-only transaction"
            )));
        }

        Ok(())
    }

    ///
    /// READS
    ///

    /// Load one record by key, observing buffered writes.
    pub fn get(
        &self,
        partition: &'static str,
        key: &KeyTuple,
    ) -> Result<Option<Record>, InternalError> {
        self.check_scope(partition)?;

        if let Some(changes) = self.overlay.get(partition) {
            if let Some(op) = changes.get(key) {
                return op.as_ref().map(RawRow::decode).transpose();
            }
        }

        let stores = self.db.stores().borrow();
        let row = stores.partition(partition)?.get(key).cloned();
        drop(stores);

        row.as_ref().map(RawRow::decode).transpose()
    }

    /// Load every record of one partition in key order, observing buffered
    /// writes.
    pub fn get_all(&self, partition: &'static str) -> Result<Vec<Record>, InternalError> {
        self.check_scope(partition)?;

        let stores = self.db.stores().borrow();
        let mut merged: BTreeMap<KeyTuple, RawRow> = stores
            .partition(partition)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        drop(stores);

        if let Some(changes) = self.overlay.get(partition) {
            for (key, op) in changes {
                match op {
                    Some(row) => {
                        merged.insert(key.clone(), row.clone());
                    }
                    None => {
                        merged.remove(key);
                    }
                }
            }
        }

        merged.values().map(RawRow::decode).collect()
    }

    /// Highest single-slot integer key in the partition, for auto-increment
    /// defaults. Overlay-aware so nested creates see each other's keys.
    pub(crate) fn max_int_key(
        &self,
        partition: &'static str,
    ) -> Result<Option<i64>, InternalError> {
        self.check_scope(partition)?;

        let stores = self.db.stores().borrow();
        let mut max = stores
            .partition(partition)?
            .keys()
            .filter_map(|k| k.first().and_then(StorageKey::as_int))
            .max();
        drop(stores);

        if let Some(changes) = self.overlay.get(partition) {
            for (key, op) in changes {
                if op.is_some() {
                    if let Some(id) = key.first().and_then(StorageKey::as_int) {
                        max = Some(max.map_or(id, |m| m.max(id)));
                    }
                }
            }
        }

        Ok(max)
    }

    ///
    /// WRITES
    ///

    /// Insert a record at a fresh key; an existing key is a conflict.
    pub fn insert(
        &mut self,
        partition: &'static str,
        key: &KeyTuple,
        record: &Record,
    ) -> Result<(), InternalError> {
        self.check_write(partition)?;
        if self.get(partition, key)?.is_some() {
            return Err(InternalError::store_conflict(format!(
                "key {key} already exists in partition '{partition}'"
            )));
        }

        let row = RawRow::encode(record)?;
        self.overlay
            .entry(partition)
            .or_default()
            .insert(key.clone(), Some(row));

        Ok(())
    }

    /// Insert or replace a record at the given key.
    pub fn put(
        &mut self,
        partition: &'static str,
        key: &KeyTuple,
        record: &Record,
    ) -> Result<(), InternalError> {
        self.check_write(partition)?;

        let row = RawRow::encode(record)?;
        self.overlay
            .entry(partition)
            .or_default()
            .insert(key.clone(), Some(row));

        Ok(())
    }

    /// Remove a record by key; removing an absent key is a no-op.
    pub fn delete(&mut self, partition: &'static str, key: &KeyTuple) -> Result<(), InternalError> {
        self.check_write(partition)?;
        self.overlay
            .entry(partition)
            .or_default()
            .insert(key.clone(), None);

        Ok(())
    }

    ///
    /// COMPLETION
    ///

    /// Apply every buffered write atomically.
    pub fn commit(self) -> Result<(), InternalError> {
        if self.aborted {
            return Err(InternalError::store_invariant(
                "cannot commit an aborted transaction".to_string(),
            ));
        }
        if self.overlay.is_empty() {
            return Ok(());
        }

        let mut stores = self.db.stores().borrow_mut();
        for (name, changes) in &self.overlay {
            let partition = stores.partition_mut(name)?;
            for (key, op) in changes {
                match op {
                    Some(row) => {
                        partition.insert(key.clone(), row.clone());
                    }
                    None => {
                        partition.remove(key);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{database::Database, scope::ScopePlanner},
        test_fixtures::{SCHEMA, TASK, task_record},
    };

    fn task_key(id: i64) -> KeyTuple {
        KeyTuple::single(StorageKey::Int(id))
    }

    fn write_scope(db: &Database) -> Transaction {
        let mut scope = PartitionScope::new();
        scope.insert("Task");
        db.begin(TxnMode::ReadWrite, scope).unwrap()
    }

    #[test]
    fn reads_see_own_buffered_writes() {
        let db = Database::open(&SCHEMA).unwrap();
        let mut tx = write_scope(&db);

        let record = task_record(1, "t1", "A");
        tx.insert("Task", &task_key(1), &record).unwrap();
        assert_eq!(tx.get("Task", &task_key(1)).unwrap(), Some(record));
        assert_eq!(tx.get_all("Task").unwrap().len(), 1);

        tx.delete("Task", &task_key(1)).unwrap();
        assert_eq!(tx.get("Task", &task_key(1)).unwrap(), None);
    }

    #[test]
    fn commit_applies_and_abort_discards() {
        let db = Database::open(&SCHEMA).unwrap();

        let mut tx = write_scope(&db);
        tx.insert("Task", &task_key(1), &task_record(1, "kept", "A"))
            .unwrap();
        tx.commit().unwrap();

        let mut tx = write_scope(&db);
        tx.insert("Task", &task_key(2), &task_record(2, "dropped", "A"))
            .unwrap();
        tx.abort();
        assert!(tx.commit().is_err());

        let tx = write_scope(&db);
        let titles: Vec<String> = tx
            .get_all("Task")
            .unwrap()
            .iter()
            .map(|r| r.get("title").unwrap().as_text().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["kept".to_string()]);
    }

    #[test]
    fn scope_violation_is_fatal() {
        let db = Database::open(&SCHEMA).unwrap();
        let tx = write_scope(&db);

        let err = tx.get_all("Board").unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::InvariantViolation);
    }

    #[test]
    fn read_only_rejects_writes() {
        let db = Database::open(&SCHEMA).unwrap();
        let planner = ScopePlanner::new(&SCHEMA);
        let scope = planner
            .needed_for_find(&TASK, &crate::db::query::FindQuery::new())
            .unwrap();
        let mut tx = db.begin(TxnMode::ReadOnly, scope).unwrap();

        let err = tx
            .insert("Task", &task_key(1), &task_record(1, "t", "A"))
            .unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::InvariantViolation);
    }

    #[test]
    fn duplicate_insert_is_a_conflict() {
        let db = Database::open(&SCHEMA).unwrap();
        let mut tx = write_scope(&db);

        tx.insert("Task", &task_key(1), &task_record(1, "a", "A"))
            .unwrap();
        let err = tx
            .insert("Task", &task_key(1), &task_record(1, "b", "A"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn max_int_key_is_overlay_aware() {
        let db = Database::open(&SCHEMA).unwrap();
        let mut tx = write_scope(&db);

        assert_eq!(tx.max_int_key("Task").unwrap(), None);
        tx.insert("Task", &task_key(7), &task_record(7, "t", "A"))
            .unwrap();
        assert_eq!(tx.max_int_key("Task").unwrap(), Some(7));
    }
}
