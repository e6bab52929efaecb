use crate::{
    db::{
        client::EntityClient,
        data::{
            CreateData, CreateQuery, RelationCreate, RelationUpdate, UpdateData, UpdateQuery,
            UpsertQuery,
        },
        events::ChangeEvent,
        predicate::FieldFilter,
        query::{FindQuery, Select, WhereClause},
        record::{Record, RecordView},
        store::KeyTuple,
        txn::Transaction,
    },
    error::InternalError,
    model::{FieldDefault, FieldKind, RelationKind, RelationModel},
    types::Timestamp,
    value::Value,
};
use std::collections::BTreeMap;

impl EntityClient {
    ///
    /// CREATE
    ///

    /// Fill defaults, resolve nested to-one writes before the insert and
    /// to-many writes after it, then re-read with the requested projection.
    pub fn create_in(
        &self,
        query: &CreateQuery,
        tx: &mut Transaction,
    ) -> Result<RecordView, InternalError> {
        let mut data = query.data.clone();
        self.resolve_to_one_creates(&mut data, tx)?;
        self.validate_foreign_keys(&data.values, tx)?;

        let record = self.fill_defaults(&data.values, tx)?;
        let key = record.key_tuple(self.model)?;
        tx.insert(self.model.name, &key, &record)?;
        self.debug_log(format!("create on {} -> {key}", self.model.name));

        // To-many nested writes depend on the new key.
        let owner_key = key
            .first()
            .map(crate::db::store::StorageKey::to_value)
            .unwrap_or(Value::Null);
        for (name, ops) in &data.relations {
            let relation = self.relation_model(name)?;
            if relation.kind == RelationKind::ToMany {
                self.apply_to_many_creates(relation, ops, &owner_key, tx)?;
            }
        }

        let stored = tx.get(self.model.name, &key)?.ok_or_else(|| {
            InternalError::store_internal(format!("created record vanished at {key}"))
        })?;
        let probe = FindQuery {
            where_clause: None,
            order_by: Vec::new(),
            select: query.select.clone(),
            include: query.include.clone(),
        };
        let views = self.attach_relations(vec![stored], &probe, tx)?;
        let view = Self::apply_select(views, query.select.as_ref())
            .into_iter()
            .next()
            .ok_or_else(|| InternalError::store_internal("projection dropped created record"))?;

        self.emit(&ChangeEvent::create(key));

        Ok(view)
    }

    /// Default-filling and insertion per item, without nested relation
    /// handling; one create event per inserted record.
    pub fn create_many_in(
        &self,
        data: &[CreateData],
        tx: &mut Transaction,
    ) -> Result<u64, InternalError> {
        for item in data {
            let record = self.fill_defaults(&item.values, tx)?;
            let key = record.key_tuple(self.model)?;
            tx.insert(self.model.name, &key, &record)?;
            self.emit(&ChangeEvent::create(key));
        }

        Ok(data.len() as u64)
    }

    pub fn create_many_and_return_in(
        &self,
        data: &[CreateData],
        select: Option<&Select>,
        tx: &mut Transaction,
    ) -> Result<Vec<RecordView>, InternalError> {
        let mut views = Vec::with_capacity(data.len());
        for item in data {
            let record = self.fill_defaults(&item.values, tx)?;
            let key = record.key_tuple(self.model)?;
            tx.insert(self.model.name, &key, &record)?;
            self.emit(&ChangeEvent::create(key));
            views.extend(Self::apply_select(
                vec![RecordView::from_record(record)],
                select,
            ));
        }

        Ok(views)
    }

    ///
    /// UPDATE
    ///

    /// Locate the unique target, apply scalar and nested relation updates,
    /// move the row when the key path changed (cascading the new key into
    /// dependent FKs), and re-read with the requested projection.
    pub fn update_in(
        &self,
        query: &UpdateQuery,
        tx: &mut Transaction,
    ) -> Result<RecordView, InternalError> {
        let found = self.find_unique_in(
            &FindQuery::new().filter(query.where_clause.clone()),
            tx,
        )?;
        let Some(view) = found else {
            tx.abort();
            return Err(InternalError::record_not_found(self.model.name));
        };
        let mut record = view.fields;
        let start_key = record.key_tuple(self.model)?;

        self.apply_scalar_updates(&mut record, &query.data.values)?;
        self.validate_foreign_keys_updated(&record, &query.data.values, tx)?;

        // To-one operations resolve first so the record carries its final
        // foreign keys into the row write.
        for (name, ops) in &query.data.relations {
            let relation = self.relation_model(name)?;
            if relation.kind == RelationKind::ToOne {
                self.apply_to_one_update(relation, ops, &mut record, tx)?;
            }
        }

        // Key identity is stable: a moved key is delete-at-old plus
        // insert-at-new, then dependents follow.
        let end_key = record.key_tuple(self.model)?;
        let moved = end_key != start_key;
        if moved {
            tx.delete(self.model.name, &start_key)?;
        }
        tx.put(self.model.name, &end_key, &record)?;
        self.emit(&ChangeEvent::update(
            end_key.clone(),
            moved.then(|| start_key.clone()),
        ));
        if moved {
            self.cascade_key_change(&start_key, &end_key, tx)?;
            self.debug_log(format!(
                "update on {} moved key {start_key} -> {end_key}",
                self.model.name
            ));
        }

        // To-many operations run against the settled owner row, so nested
        // writes validate against the new key.
        for (name, ops) in &query.data.relations {
            let relation = self.relation_model(name)?;
            if relation.kind == RelationKind::ToMany {
                let owner_key = self.single_key_value(&record)?;
                self.apply_to_many_update(relation, ops, &owner_key, tx)?;
            }
        }

        let reread = FindQuery {
            where_clause: Some(self.where_for_key(&end_key)),
            order_by: Vec::new(),
            select: query.select.clone(),
            include: query.include.clone(),
        };
        self.find_unique_in(&reread, tx)?.ok_or_else(|| {
            InternalError::store_internal(format!("updated record vanished at {end_key}"))
        })
    }

    /// Sequential per-record update inside the same transaction.
    pub fn update_many_in(
        &self,
        where_clause: Option<&WhereClause>,
        data: &UpdateData,
        tx: &mut Transaction,
    ) -> Result<u64, InternalError> {
        let query = FindQuery {
            where_clause: where_clause.cloned(),
            ..FindQuery::default()
        };
        let matches = self.find_many_in(&query, tx)?;
        let count = matches.len() as u64;
        for view in matches {
            let key = view.key_tuple(self.model)?;
            let update = UpdateQuery::new(self.where_for_key(&key), data.clone());
            self.update_in(&update, tx)?;
        }

        Ok(count)
    }

    ///
    /// DELETE
    ///

    /// Cascade-delete required dependents, null the FKs of optional ones,
    /// then remove the record.
    pub fn delete_in(
        &self,
        where_clause: &WhereClause,
        tx: &mut Transaction,
    ) -> Result<RecordView, InternalError> {
        let found =
            self.find_unique_in(&FindQuery::new().filter(where_clause.clone()), tx)?;
        let Some(view) = found else {
            tx.abort();
            return Err(InternalError::record_not_found(self.model.name));
        };
        let key = view.key_tuple(self.model)?;

        for relation in self.model.relations {
            if relation.kind != RelationKind::ToMany {
                continue;
            }
            let target = self.sibling(relation.target)?;
            let owner_key = self.single_key_value(&view.fields)?;
            let scoped = WhereClause::new()
                .field(relation.fk_field, FieldFilter::value(owner_key));
            if relation.required {
                target.delete_many_in(Some(&scoped), tx)?;
            } else {
                let nulled = UpdateData::new().set(relation.fk_field, Value::Null);
                target.update_many_in(Some(&scoped), &nulled, tx)?;
            }
        }

        tx.delete(self.model.name, &key)?;
        self.debug_log(format!("delete on {} -> {key}", self.model.name));
        self.emit(&ChangeEvent::delete(key));

        Ok(view)
    }

    pub fn delete_many_in(
        &self,
        where_clause: Option<&WhereClause>,
        tx: &mut Transaction,
    ) -> Result<u64, InternalError> {
        let query = FindQuery {
            where_clause: where_clause.cloned(),
            ..FindQuery::default()
        };
        let matches = self.find_many_in(&query, tx)?;
        let count = matches.len() as u64;
        for view in matches {
            let key = view.key_tuple(self.model)?;
            self.delete_in(&self.where_for_key(&key), tx)?;
        }

        Ok(count)
    }

    ///
    /// UPSERT
    ///

    /// Update when the unique target exists, create otherwise, then re-read
    /// with throwing semantics to guarantee a definite result.
    pub fn upsert_in(
        &self,
        query: &UpsertQuery,
        tx: &mut Transaction,
    ) -> Result<RecordView, InternalError> {
        let existing =
            self.find_unique_in(&FindQuery::new().filter(query.where_clause.clone()), tx)?;
        let view = match existing {
            None => self.create_in(&CreateQuery::new(query.create.clone()), tx)?,
            Some(_) => self.update_in(
                &UpdateQuery::new(query.where_clause.clone(), query.update.clone()),
                tx,
            )?,
        };

        let key = view.key_tuple(self.model)?;
        let reread = FindQuery {
            where_clause: Some(self.where_for_key(&key)),
            order_by: Vec::new(),
            select: query.select.clone(),
            include: query.include.clone(),
        };
        self.find_unique_or_throw_in(&reread, tx)
    }

    ///
    /// DEFAULTS & VALIDATION
    ///

    /// Build the stored record from provided values plus declared defaults:
    /// auto-increment keys, nulls, false booleans, "now" timestamps. Text
    /// input for timestamp fields is normalized to absolute time.
    fn fill_defaults(
        &self,
        values: &BTreeMap<String, Value>,
        tx: &mut Transaction,
    ) -> Result<Record, InternalError> {
        for name in values.keys() {
            if self.model.field(name).is_none() {
                return Err(InternalError::query_unsupported(format!(
                    "unknown field '{name}' on entity '{}'",
                    self.model.name
                )));
            }
        }

        let mut record = Record::new();
        for field in self.model.fields {
            let value = match values.get(field.name) {
                Some(value) => self.normalize_field_value(field.name, value)?,
                None => match field.default {
                    FieldDefault::AutoIncrement => {
                        let max = tx.max_int_key(self.model.name)?.unwrap_or(0);
                        Value::Int(max + 1)
                    }
                    FieldDefault::Null => Value::Null,
                    FieldDefault::False => Value::Bool(false),
                    FieldDefault::Now => Value::Timestamp(Timestamp::now()),
                    FieldDefault::None => {
                        if field.nullable {
                            Value::Null
                        } else {
                            return Err(InternalError::query_unsupported(format!(
                                "missing required field '{}' on entity '{}'",
                                field.name, self.model.name
                            )));
                        }
                    }
                },
            };
            record.set(field.name, value);
        }

        Ok(record)
    }

    fn apply_scalar_updates(
        &self,
        record: &mut Record,
        values: &BTreeMap<String, Value>,
    ) -> Result<(), InternalError> {
        for (name, value) in values {
            let value = self.normalize_field_value(name, value)?;
            if self.model.is_key_field(name) && value.as_storage_key().is_none() {
                return Err(InternalError::query_unsupported(format!(
                    "key field '{name}' cannot be set to a non-keyable value"
                )));
            }
            record.set(name.clone(), value);
        }

        Ok(())
    }

    fn normalize_field_value(&self, name: &str, value: &Value) -> Result<Value, InternalError> {
        let field = self.model.field(name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "unknown field '{name}' on entity '{}'",
                self.model.name
            ))
        })?;

        let value = match (field.kind, value) {
            (FieldKind::Timestamp, Value::Text(s)) => Timestamp::parse_rfc3339(s)
                .map(Value::Timestamp)
                .map_err(|e| InternalError::query_unsupported(e.to_string()))?,
            _ => value.clone(),
        };

        if !field.admits(&value) {
            return Err(InternalError::query_unsupported(format!(
                "value kind '{}' does not fit {} field '{}'",
                value.label(),
                field.kind.label(),
                field.name
            )));
        }

        Ok(value)
    }

    // A non-null FK must reference an existing record.
    fn validate_foreign_keys(
        &self,
        values: &BTreeMap<String, Value>,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        for relation in self.model.relations {
            if relation.kind != RelationKind::ToOne {
                continue;
            }
            let Some(fk_value) = values.get(relation.fk_field) else {
                continue;
            };
            if fk_value.is_null() {
                continue;
            }
            self.require_related(relation, fk_value, tx)?;
        }

        Ok(())
    }

    // Direct FK updates re-validate against the post-update record state.
    fn validate_foreign_keys_updated(
        &self,
        record: &Record,
        updated: &BTreeMap<String, Value>,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        for relation in self.model.relations {
            if relation.kind != RelationKind::ToOne
                || !updated.contains_key(relation.fk_field)
            {
                continue;
            }
            let fk_value = record.value_or_null(relation.fk_field);
            if fk_value.is_null() {
                if relation.required {
                    return Err(InternalError::executor_conflict(format!(
                        "cannot null foreign key of required relation '{}'",
                        relation.name
                    )));
                }
                continue;
            }
            self.require_related(relation, fk_value, tx)?;
        }

        Ok(())
    }

    fn require_related(
        &self,
        relation: &RelationModel,
        fk_value: &Value,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        let target = self.sibling(relation.target)?;
        let key = fk_value
            .as_storage_key()
            .map(KeyTuple::single)
            .ok_or_else(|| {
                InternalError::query_unsupported(format!(
                    "foreign key '{}' requires a keyable value",
                    relation.fk_field
                ))
            })?;
        if tx.get(target.model.name, &key)?.is_none() {
            return Err(InternalError::executor_conflict(format!(
                "related record not found in '{}' for key {key}",
                target.model.name
            )));
        }

        Ok(())
    }

    ///
    /// NESTED RELATION WRITES
    ///

    fn relation_model(&self, name: &str) -> Result<&'static RelationModel, InternalError> {
        self.model.relation(name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "unknown relation '{name}' on entity '{}'",
                self.model.name
            ))
        })
    }

    // To-one nested writes resolve before the owning insert so the FK can be
    // written with the record.
    fn resolve_to_one_creates(
        &self,
        data: &mut CreateData,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        let names: Vec<String> = data.relations.keys().cloned().collect();
        for name in names {
            let relation = self.relation_model(&name)?;
            if relation.kind != RelationKind::ToOne {
                continue;
            }
            let ops = data
                .relations
                .remove(&name)
                .unwrap_or_else(RelationCreate::new);
            if !ops.create_many.is_empty() || ops.create.len() + ops.connect.len() + ops.connect_or_create.len() > 1 {
                return Err(InternalError::query_unsupported(format!(
                    "to-one relation '{name}' accepts a single nested write"
                )));
            }
            let target = self.sibling(relation.target)?;

            let mut fk_value: Option<Value> = None;
            if let Some(create) = ops.create.first() {
                let view = target.create_in(&CreateQuery::new(create.clone()), tx)?;
                fk_value = Some(view.single_key(target.model)?.to_value());
            }
            if let Some(where_clause) = ops.connect.first() {
                let view = target.find_unique_or_throw_in(
                    &FindQuery::new().filter(where_clause.clone()),
                    tx,
                )?;
                fk_value = Some(view.single_key(target.model)?.to_value());
            }
            if let Some(entry) = ops.connect_or_create.first() {
                let upsert = UpsertQuery::new(
                    entry.where_clause.clone(),
                    entry.create.clone(),
                    UpdateData::new(),
                );
                let view = target.upsert_in(&upsert, tx)?;
                fk_value = Some(view.single_key(target.model)?.to_value());
            }

            if let Some(value) = fk_value {
                data.values.insert(relation.fk_field.to_string(), value);
            }
        }

        Ok(())
    }

    fn apply_to_many_creates(
        &self,
        relation: &RelationModel,
        ops: &RelationCreate,
        owner_key: &Value,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        let target = self.sibling(relation.target)?;
        let fk = relation.fk_field;

        for create in ops.create.iter().chain(&ops.create_many) {
            let data = create.clone().value(fk, owner_key.clone());
            target.create_in(&CreateQuery::new(data), tx)?;
        }
        for where_clause in &ops.connect {
            let data = UpdateData::new().set(fk, owner_key.clone());
            target.update_in(&UpdateQuery::new(where_clause.clone(), data), tx)?;
        }
        for entry in &ops.connect_or_create {
            let create = entry.create.clone().value(fk, owner_key.clone());
            let update = UpdateData::new().set(fk, owner_key.clone());
            target.upsert_in(
                &UpsertQuery::new(entry.where_clause.clone(), create, update),
                tx,
            )?;
        }

        Ok(())
    }

    fn apply_to_one_update(
        &self,
        relation: &'static RelationModel,
        ops: &RelationUpdate,
        record: &mut Record,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        let target = self.sibling(relation.target)?;
        let name = relation.name;

        if !ops.delete.is_empty() || !ops.delete_many.is_empty() || ops.set.is_some() {
            return Err(InternalError::query_unsupported(format!(
                "delete/set operations are not supported on to-one relation '{name}'"
            )));
        }
        if ops.disconnect {
            if relation.required {
                return Err(InternalError::executor_conflict(format!(
                    "cannot disconnect required relation '{name}'"
                )));
            }
            record.set(relation.fk_field, Value::Null);
        }
        if let Some(where_clause) = ops.connect.first() {
            let view = target
                .find_unique_or_throw_in(&FindQuery::new().filter(where_clause.clone()), tx)?;
            record.set(relation.fk_field, view.single_key(target.model)?.to_value());
        }
        if let Some(create) = ops.create.first() {
            let view = target.create_in(&CreateQuery::new(create.clone()), tx)?;
            record.set(relation.fk_field, view.single_key(target.model)?.to_value());
        }
        if let Some(entry) = ops.connect_or_create.first() {
            let upsert = UpsertQuery::new(
                entry.where_clause.clone(),
                entry.create.clone(),
                UpdateData::new(),
            );
            let view = target.upsert_in(&upsert, tx)?;
            record.set(relation.fk_field, view.single_key(target.model)?.to_value());
        }

        let fk_value = record.value_or_null(relation.fk_field).clone();
        let key_field = target.model.single_key_field().ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "relation '{name}' crosses a composite key path"
            ))
        })?;
        let fk_pin = || WhereClause::new().field(key_field, FieldFilter::value(fk_value.clone()));

        for entry in ops.update.iter().chain(&ops.update_many) {
            let mut where_clause = fk_pin();
            if let Some(extra) = &entry.where_clause {
                where_clause = where_clause.and(extra.clone());
            }
            target.update_in(&UpdateQuery::new(where_clause, entry.data.clone()), tx)?;
        }
        for entry in &ops.upsert {
            let create = entry
                .create
                .clone()
                .value(key_field, fk_value.clone());
            let upsert = UpsertQuery::new(
                fk_pin().and(entry.where_clause.clone()),
                create,
                entry.update.clone(),
            );
            target.upsert_in(&upsert, tx)?;
        }

        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn apply_to_many_update(
        &self,
        relation: &'static RelationModel,
        ops: &RelationUpdate,
        owner_key: &Value,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        let target = self.sibling(relation.target)?;
        let name = relation.name;
        let fk = relation.fk_field;
        let fk_eq =
            || WhereClause::new().field(fk, FieldFilter::value(owner_key.clone()));

        for where_clause in &ops.connect {
            let data = UpdateData::new().set(fk, owner_key.clone());
            target.update_in(&UpdateQuery::new(where_clause.clone(), data), tx)?;
        }
        if ops.disconnect {
            if relation.required {
                return Err(InternalError::executor_conflict(format!(
                    "cannot disconnect required relation '{name}'"
                )));
            }
            let nulled = UpdateData::new().set(fk, Value::Null);
            target.update_many_in(Some(&fk_eq()), &nulled, tx)?;
        }
        for create in ops.create.iter().chain(&ops.create_many) {
            let data = create.clone().value(fk, owner_key.clone());
            target.create_in(&CreateQuery::new(data), tx)?;
        }
        for entry in &ops.connect_or_create {
            let create = entry.create.clone().value(fk, owner_key.clone());
            let update = UpdateData::new().set(fk, owner_key.clone());
            target.upsert_in(
                &UpsertQuery::new(entry.where_clause.clone(), create, update),
                tx,
            )?;
        }
        for entry in &ops.update {
            let mut where_clause = fk_eq();
            if let Some(extra) = &entry.where_clause {
                where_clause = where_clause.and(extra.clone());
            }
            target.update_in(&UpdateQuery::new(where_clause, entry.data.clone()), tx)?;
        }
        for entry in &ops.update_many {
            let mut where_clause = fk_eq();
            if let Some(extra) = &entry.where_clause {
                where_clause = where_clause.and(extra.clone());
            }
            target.update_many_in(Some(&where_clause), &entry.data, tx)?;
        }
        for entry in &ops.upsert {
            let create = entry.create.clone().value(fk, owner_key.clone());
            let upsert = UpsertQuery::new(
                entry.where_clause.clone().field(fk, FieldFilter::value(owner_key.clone())),
                create,
                entry.update.clone(),
            );
            target.upsert_in(&upsert, tx)?;
        }
        for where_clause in &ops.delete {
            let scoped = where_clause
                .clone()
                .field(fk, FieldFilter::value(owner_key.clone()));
            target.delete_in(&scoped, tx)?;
        }
        for where_clause in &ops.delete_many {
            let scoped = where_clause
                .clone()
                .field(fk, FieldFilter::value(owner_key.clone()));
            target.delete_many_in(Some(&scoped), tx)?;
        }
        if let Some(targets) = &ops.set {
            let existing = target.count_in(Some(&fk_eq()), tx)?;
            if relation.required {
                if existing > 0 {
                    return Err(InternalError::executor_conflict(format!(
                        "cannot set required relation '{name}' that is already populated"
                    )));
                }
            } else if existing > 0 {
                let nulled = UpdateData::new().set(fk, Value::Null);
                target.update_many_in(Some(&fk_eq()), &nulled, tx)?;
            }
            for where_clause in targets {
                let data = UpdateData::new().set(fk, owner_key.clone());
                target.update_in(&UpdateQuery::new(where_clause.clone(), data), tx)?;
            }
        }

        Ok(())
    }

    // Every dependent FK follows a moved key, one partition at a time.
    fn cascade_key_change(
        &self,
        start_key: &KeyTuple,
        end_key: &KeyTuple,
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        let (Some(old), Some(new)) = (start_key.first(), end_key.first()) else {
            return Ok(());
        };
        for relation in self.model.relations {
            if relation.kind != RelationKind::ToMany {
                continue;
            }
            let target = self.sibling(relation.target)?;
            let scoped = WhereClause::new()
                .field(relation.fk_field, FieldFilter::value(old.to_value()));
            let data = UpdateData::new().set(relation.fk_field, new.to_value());
            target.update_many_in(Some(&scoped), &data, tx)?;
        }

        Ok(())
    }
}
