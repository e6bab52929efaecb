mod find;
mod write;


use crate::{
    db::{
        data::{CreateData, CreateQuery, UpdateData, UpdateQuery, UpsertQuery},
        database::DatabaseInner,
        events::{ChangeEvent, ChangeKind, Listener, SubscriptionId},
        query::{FindQuery, Include, Select, WhereClause},
        record::RecordView,
        scope::{PartitionScope, ScopePlanner},
        store::KeyTuple,
        txn::{Transaction, TxnMode},
    },
    error::InternalError,
    model::EntityModel,
    value::Value,
};
use std::{collections::BTreeMap, rc::Rc};

///
/// EntityClient
///
/// The generic per-entity operation surface: one instance per entity model,
/// all instances driven by descriptor data rather than generated code.
///
/// Every operation runs inside a single transaction sized by the scope
/// planner. The public methods open (and commit) that transaction; the
/// `*_in` variants join an ambient one, which must already span every
/// partition the nested call needs.
///

#[derive(Clone)]
pub struct EntityClient {
    db: Rc<DatabaseInner>,
    model: &'static EntityModel,
}

impl EntityClient {
    pub(crate) const fn new(db: Rc<DatabaseInner>, model: &'static EntityModel) -> Self {
        Self { db, model }
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    pub(crate) fn planner(&self) -> ScopePlanner<'_> {
        ScopePlanner::new(self.db.schema)
    }

    /// Client for a sibling entity, used by relation traversal.
    pub(crate) fn sibling(&self, entity: &str) -> Result<Self, InternalError> {
        let model = self.db.entity_model(entity)?;

        Ok(Self::new(Rc::clone(&self.db), model))
    }

    fn debug_log(&self, s: impl Into<String>) {
        if self.db.is_debug() {
            println!("[debug] {}", s.into());
        }
    }

    // Commit on success; a failed operation drops the transaction and with it
    // every buffered write.
    fn finish<T>(tx: Transaction, result: Result<T, InternalError>) -> Result<T, InternalError> {
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }

    fn own_scope(&self) -> PartitionScope {
        let mut scope = PartitionScope::new();
        scope.insert(self.model.name);
        scope
    }

    fn projection_scope(
        &self,
        select: Option<&Select>,
        include: Option<&Include>,
    ) -> Result<PartitionScope, InternalError> {
        let probe = FindQuery {
            where_clause: None,
            order_by: Vec::new(),
            select: select.cloned(),
            include: include.cloned(),
        };

        self.planner().needed_for_find(self.model, &probe)
    }

    ///
    /// FIND
    ///

    pub fn find_many(&self, query: &FindQuery) -> Result<Vec<RecordView>, InternalError> {
        let scope = self.planner().needed_for_find(self.model, query)?;
        self.debug_log(format!("find_many on {} (scope {scope})", self.model.name));

        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.find_many_in(query, &mut tx);
        Self::finish(tx, result)
    }

    pub fn find_first(&self, query: &FindQuery) -> Result<Option<RecordView>, InternalError> {
        let scope = self.planner().needed_for_find(self.model, query)?;
        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.find_first_in(query, &mut tx);
        Self::finish(tx, result)
    }

    pub fn find_first_or_throw(&self, query: &FindQuery) -> Result<RecordView, InternalError> {
        let scope = self.planner().needed_for_find(self.model, query)?;
        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.find_first_or_throw_in(query, &mut tx);
        Self::finish(tx, result)
    }

    pub fn find_unique(&self, query: &FindQuery) -> Result<Option<RecordView>, InternalError> {
        let scope = self.planner().needed_for_find(self.model, query)?;
        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.find_unique_in(query, &mut tx);
        Self::finish(tx, result)
    }

    pub fn find_unique_or_throw(&self, query: &FindQuery) -> Result<RecordView, InternalError> {
        let scope = self.planner().needed_for_find(self.model, query)?;
        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.find_unique_or_throw_in(query, &mut tx);
        Self::finish(tx, result)
    }

    ///
    /// COUNT
    ///

    pub fn count(&self, where_clause: Option<&WhereClause>) -> Result<u64, InternalError> {
        let scope = self.planner().needed_for_where(self.model, where_clause)?;
        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.count_in(where_clause, &mut tx);
        Self::finish(tx, result)
    }

    /// Per-field non-null counts; the `_all` key counts all matching records.
    pub fn count_fields(
        &self,
        where_clause: Option<&WhereClause>,
        fields: &[&str],
    ) -> Result<BTreeMap<String, u64>, InternalError> {
        let scope = self.planner().needed_for_where(self.model, where_clause)?;
        let mut tx = self.db.begin(TxnMode::ReadOnly, scope)?;
        let result = self.count_fields_in(where_clause, fields, &mut tx);
        Self::finish(tx, result)
    }

    ///
    /// WRITE
    ///

    pub fn create(&self, query: &CreateQuery) -> Result<RecordView, InternalError> {
        let mut scope = self.planner().needed_for_create(self.model, &query.data)?;
        scope.extend(&self.projection_scope(query.select.as_ref(), query.include.as_ref())?);
        self.debug_log(format!("create on {} (scope {scope})", self.model.name));

        let mut tx = self.db.begin(TxnMode::ReadWrite, scope)?;
        let result = self.create_in(query, &mut tx);
        Self::finish(tx, result)
    }

    pub fn create_many(&self, data: &[CreateData]) -> Result<u64, InternalError> {
        let mut tx = self.db.begin(TxnMode::ReadWrite, self.own_scope())?;
        let result = self.create_many_in(data, &mut tx);
        Self::finish(tx, result)
    }

    pub fn create_many_and_return(
        &self,
        data: &[CreateData],
        select: Option<&Select>,
    ) -> Result<Vec<RecordView>, InternalError> {
        let mut tx = self.db.begin(TxnMode::ReadWrite, self.own_scope())?;
        let result = self.create_many_and_return_in(data, select, &mut tx);
        Self::finish(tx, result)
    }

    pub fn update(&self, query: &UpdateQuery) -> Result<RecordView, InternalError> {
        let mut scope =
            self.planner()
                .needed_for_update(self.model, Some(&query.where_clause), &query.data)?;
        scope.extend(&self.projection_scope(query.select.as_ref(), query.include.as_ref())?);
        self.debug_log(format!("update on {} (scope {scope})", self.model.name));

        let mut tx = self.db.begin(TxnMode::ReadWrite, scope)?;
        let result = self.update_in(query, &mut tx);
        Self::finish(tx, result)
    }

    pub fn update_many(
        &self,
        where_clause: Option<&WhereClause>,
        data: &UpdateData,
    ) -> Result<u64, InternalError> {
        let scope = self
            .planner()
            .needed_for_update(self.model, where_clause, data)?;
        let mut tx = self.db.begin(TxnMode::ReadWrite, scope)?;
        let result = self.update_many_in(where_clause, data, &mut tx);
        Self::finish(tx, result)
    }

    pub fn delete(&self, where_clause: &WhereClause) -> Result<RecordView, InternalError> {
        let scope = self
            .planner()
            .needed_for_delete(self.model, Some(where_clause))?;
        self.debug_log(format!("delete on {} (scope {scope})", self.model.name));

        let mut tx = self.db.begin(TxnMode::ReadWrite, scope)?;
        let result = self.delete_in(where_clause, &mut tx);
        Self::finish(tx, result)
    }

    pub fn delete_many(&self, where_clause: Option<&WhereClause>) -> Result<u64, InternalError> {
        let scope = self.planner().needed_for_delete(self.model, where_clause)?;
        let mut tx = self.db.begin(TxnMode::ReadWrite, scope)?;
        let result = self.delete_many_in(where_clause, &mut tx);
        Self::finish(tx, result)
    }

    pub fn upsert(&self, query: &UpsertQuery) -> Result<RecordView, InternalError> {
        let mut scope = self.planner().needed_for_update(
            self.model,
            Some(&query.where_clause),
            &query.update,
        )?;
        scope.extend(&self.planner().needed_for_create(self.model, &query.create)?);
        scope.extend(&self.projection_scope(query.select.as_ref(), query.include.as_ref())?);

        let mut tx = self.db.begin(TxnMode::ReadWrite, scope)?;
        let result = self.upsert_in(query, &mut tx);
        Self::finish(tx, result)
    }

    ///
    /// EVENTS
    ///

    /// Register a listener for one or more change kinds.
    ///
    /// Delivery is synchronous and eager: listeners run at the emission point
    /// inside the operation, so they observe events even when the surrounding
    /// transaction later fails to commit.
    pub fn subscribe(
        &self,
        kinds: &[ChangeKind],
        listener: impl Fn(&ChangeEvent) + 'static,
    ) -> SubscriptionId {
        let listener: Listener = Rc::new(listener);
        self.db
            .with_subscribers(self.model.name, |reg| reg.subscribe(kinds, listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.db
            .with_subscribers(self.model.name, |reg| reg.unsubscribe(id))
    }

    pub(crate) fn emit(&self, event: &ChangeEvent) {
        let listeners = self
            .db
            .with_subscribers(self.model.name, |reg| reg.listeners_for(event.kind));
        for listener in listeners {
            listener(event);
        }
    }

    ///
    /// KEY HELPERS
    ///

    /// Equality clause pinning every key-path field of `key`.
    pub(crate) fn where_for_key(&self, key: &KeyTuple) -> WhereClause {
        let mut clause = WhereClause::new();
        for (field, value) in self.model.key_path.iter().zip(key.to_values()) {
            clause = clause.field(*field, crate::db::predicate::FieldFilter::value(value));
        }

        clause
    }

    /// The owning key value relation FKs reference (single-field key paths).
    pub(crate) fn single_key_value(
        &self,
        fields: &crate::db::record::Record,
    ) -> Result<Value, InternalError> {
        let field = self.model.single_key_field().ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "entity '{}' has a composite key path and cannot own relations",
                self.model.name
            ))
        })?;

        Ok(fields.value_or_null(field).clone())
    }
}
