use crate::{
    db::{
        client::EntityClient,
        predicate::FieldFilter,
        query::{
            FindQuery, OrderBy, OrderTarget, RelationFilter, Select, WhereClause, logical, order,
        },
        record::{Record, RecordView, RelationValue},
        store::KeyTuple,
        txn::Transaction,
    },
    error::InternalError,
    model::RelationKind,
    value::Value,
};
use std::{cmp::Ordering, collections::BTreeMap};

impl EntityClient {
    ///
    /// FIND (ambient-transaction variants)
    ///

    /// Load, filter, order, attach relations, and project.
    pub fn find_many_in(
        &self,
        query: &FindQuery,
        tx: &mut Transaction,
    ) -> Result<Vec<RecordView>, InternalError> {
        let records = tx.get_all(self.model.name)?;
        let mut records = self.apply_where(records, query.where_clause.as_ref(), tx)?;
        self.apply_order(&mut records, &query.order_by, tx)?;
        let views = self.attach_relations(records, query, tx)?;

        Ok(Self::apply_select(views, query.select.as_ref()))
    }

    pub fn find_first_in(
        &self,
        query: &FindQuery,
        tx: &mut Transaction,
    ) -> Result<Option<RecordView>, InternalError> {
        Ok(self.find_many_in(query, tx)?.into_iter().next())
    }

    /// A throwing lookup aborts the active transaction so sibling writes in
    /// the same call chain cannot partially commit.
    pub fn find_first_or_throw_in(
        &self,
        query: &FindQuery,
        tx: &mut Transaction,
    ) -> Result<RecordView, InternalError> {
        match self.find_first_in(query, tx)? {
            Some(view) => Ok(view),
            None => {
                tx.abort();
                Err(InternalError::record_not_found(self.model.name))
            }
        }
    }

    /// Keyed lookup when the where clause pins the full key path; a partial
    /// key yields no match.
    pub fn find_unique_in(
        &self,
        query: &FindQuery,
        tx: &mut Transaction,
    ) -> Result<Option<RecordView>, InternalError> {
        let Some(key) = self.key_from_where(query.where_clause.as_ref())? else {
            return Ok(None);
        };
        let Some(record) = tx.get(self.model.name, &key)? else {
            return Ok(None);
        };

        // The remaining filters still apply to the keyed record.
        let records = self.apply_where(vec![record], query.where_clause.as_ref(), tx)?;
        if records.is_empty() {
            return Ok(None);
        }
        let views = self.attach_relations(records, query, tx)?;

        Ok(Self::apply_select(views, query.select.as_ref()).into_iter().next())
    }

    pub fn find_unique_or_throw_in(
        &self,
        query: &FindQuery,
        tx: &mut Transaction,
    ) -> Result<RecordView, InternalError> {
        match self.find_unique_in(query, tx)? {
            Some(view) => Ok(view),
            None => {
                tx.abort();
                Err(InternalError::record_not_found(self.model.name))
            }
        }
    }

    ///
    /// COUNT
    ///

    pub fn count_in(
        &self,
        where_clause: Option<&WhereClause>,
        tx: &mut Transaction,
    ) -> Result<u64, InternalError> {
        let query = FindQuery {
            where_clause: where_clause.cloned(),
            ..FindQuery::default()
        };

        Ok(self.find_many_in(&query, tx)?.len() as u64)
    }

    /// Each requested field is counted in an independent pass; correctness,
    /// not minimality, is the contract.
    pub fn count_fields_in(
        &self,
        where_clause: Option<&WhereClause>,
        fields: &[&str],
        tx: &mut Transaction,
    ) -> Result<BTreeMap<String, u64>, InternalError> {
        let mut out = BTreeMap::new();
        for field in fields {
            let count = if *field == "_all" {
                self.count_in(where_clause, tx)?
            } else {
                self.model.field(field).ok_or_else(|| {
                    InternalError::query_unsupported(format!(
                        "unknown count field '{field}' on entity '{}'",
                        self.model.name
                    ))
                })?;
                let clause = WhereClause::new()
                    .field(*field, FieldFilter::new().not(Value::Null));
                self.count_in(Some(&clause), tx)?
            };
            out.insert((*field).to_string(), count);
        }

        Ok(out)
    }

    ///
    /// WHERE
    ///

    /// Apply one filter tree: logical narrowing first (AND, then OR, then
    /// NOT — order is load-bearing, OR can reintroduce what AND excluded and
    /// NOT only ever removes), then scalar filters, then relation
    /// quantifiers.
    pub(crate) fn apply_where(
        &self,
        records: Vec<Record>,
        clause: Option<&WhereClause>,
        tx: &mut Transaction,
    ) -> Result<Vec<Record>, InternalError> {
        let Some(clause) = clause else {
            return Ok(records);
        };
        let mut records = records;

        if clause.has_logical() {
            if !clause.and.is_empty() {
                let mut lists = Vec::with_capacity(clause.and.len());
                for sub in &clause.and {
                    lists.push(self.apply_where(records.clone(), Some(sub), tx)?);
                }
                records = logical::intersect_by_key(lists, self.model)?;
            }
            if !clause.or.is_empty() {
                let mut lists = Vec::with_capacity(clause.or.len());
                for sub in &clause.or {
                    lists.push(self.apply_where(records.clone(), Some(sub), tx)?);
                }
                records = logical::union_by_key(lists, self.model)?;
            }
            if !clause.not.is_empty() {
                let mut lists = Vec::with_capacity(clause.not.len());
                for sub in &clause.not {
                    lists.push(self.apply_where(records.clone(), Some(sub), tx)?);
                }
                let excluded = logical::union_by_key(lists, self.model)?;
                records = logical::subtract_by_key(records, &excluded, self.model)?;
            }
        }

        // Scalar filters validate once per clause, then run per record.
        let mut validated = Vec::with_capacity(clause.fields.len());
        for (field_name, filter) in &clause.fields {
            let field = self.model.field(field_name).ok_or_else(|| {
                InternalError::query_unsupported(format!(
                    "unknown field '{field_name}' on entity '{}'",
                    self.model.name
                ))
            })?;
            validated.push((field_name.as_str(), filter.validated(field)?));
        }
        records.retain(|record| {
            validated
                .iter()
                .all(|(name, filter)| filter.matches(record.value_or_null(name)))
        });

        if !clause.relations.is_empty() {
            let mut kept = Vec::with_capacity(records.len());
            for record in records {
                if self.matches_relation_filters(&record, &clause.relations, tx)? {
                    kept.push(record);
                }
            }
            records = kept;
        }

        Ok(records)
    }

    // Relational quantifiers query the target entity scoped to the owning
    // key inside the same transaction, never by materializing the foreign
    // partition into the filter.
    fn matches_relation_filters(
        &self,
        record: &Record,
        filters: &[(String, RelationFilter)],
        tx: &mut Transaction,
    ) -> Result<bool, InternalError> {
        for (name, filter) in filters {
            let relation = self.model.relation(name).ok_or_else(|| {
                InternalError::query_unsupported(format!(
                    "unknown relation '{name}' on entity '{}'",
                    self.model.name
                ))
            })?;
            let target = self.sibling(relation.target)?;

            let matched = match relation.kind {
                RelationKind::ToMany => {
                    let owner_key = self.single_key_value(record)?;
                    let scoped = |sub: &WhereClause| {
                        FindQuery::new().filter(
                            sub.clone()
                                .field(relation.fk_field, FieldFilter::value(owner_key.clone())),
                        )
                    };
                    match filter {
                        RelationFilter::Any(sub) => {
                            target.find_first_in(&scoped(sub), tx)?.is_some()
                        }
                        RelationFilter::None(sub) => {
                            target.find_first_in(&scoped(sub), tx)?.is_none()
                        }
                        RelationFilter::All(sub) => {
                            // one violating record disproves the universal
                            let violating = WhereClause::new()
                                .not(sub.clone())
                                .field(relation.fk_field, FieldFilter::value(owner_key.clone()));
                            target
                                .find_first_in(&FindQuery::new().filter(violating), tx)?
                                .is_none()
                        }
                        RelationFilter::Is(_) | RelationFilter::IsNot(_) => {
                            return Err(InternalError::query_unsupported(format!(
                                "is/is_not filter on to-many relation '{name}'"
                            )));
                        }
                    }
                }
                RelationKind::ToOne => {
                    let fk_value = record.value_or_null(relation.fk_field).clone();
                    let mut related_matches = |sub: &WhereClause| -> Result<bool, InternalError> {
                        if fk_value.is_null() {
                            return Ok(false);
                        }
                        let key_field = target.model.single_key_field().ok_or_else(|| {
                            InternalError::query_unsupported(format!(
                                "relation '{name}' crosses a composite key path"
                            ))
                        })?;
                        let clause = sub
                            .clone()
                            .field(key_field, FieldFilter::value(fk_value.clone()));
                        Ok(target
                            .find_first_in(&FindQuery::new().filter(clause), tx)?
                            .is_some())
                    };
                    match filter {
                        RelationFilter::Is(sub) => related_matches(sub)?,
                        RelationFilter::IsNot(sub) => !related_matches(sub)?,
                        RelationFilter::Any(_) | RelationFilter::All(_) | RelationFilter::None(_) => {
                            return Err(InternalError::query_unsupported(format!(
                                "quantifier filter on to-one relation '{name}'"
                            )));
                        }
                    }
                }
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    ///
    /// ORDER
    ///

    pub(crate) fn apply_order(
        &self,
        records: &mut Vec<Record>,
        order_by: &[OrderBy],
        tx: &mut Transaction,
    ) -> Result<(), InternalError> {
        if order_by.is_empty() {
            return Ok(());
        }

        // Sort keys resolve first (relation keys may read other partitions);
        // the sort itself is pure.
        let mut keyed: Vec<(Vec<Value>, Record)> = Vec::with_capacity(records.len());
        for record in records.drain(..) {
            let mut keys = Vec::with_capacity(order_by.len());
            for clause in order_by {
                keys.push(self.resolve_order_key(&record, clause, tx)?);
            }
            keyed.push((keys, record));
        }

        let mut sort_err: Option<InternalError> = None;
        keyed.sort_by(|a, b| {
            if sort_err.is_some() {
                return Ordering::Equal;
            }
            for (i, clause) in order_by.iter().enumerate() {
                let (direction, nulls) = clause.effective_sort();
                match order::compare_values(&a.0[i], &b.0[i], direction, nulls) {
                    Ok(Ordering::Equal) => {}
                    Ok(ordering) => return ordering,
                    Err(err) => {
                        sort_err = Some(err);
                        return Ordering::Equal;
                    }
                }
            }
            Ordering::Equal
        });
        if let Some(err) = sort_err {
            return Err(err);
        }

        records.extend(keyed.into_iter().map(|(_, record)| record));

        Ok(())
    }

    fn resolve_order_key(
        &self,
        record: &Record,
        clause: &OrderBy,
        tx: &mut Transaction,
    ) -> Result<Value, InternalError> {
        match &clause.target {
            OrderTarget::Field(name) => {
                self.model.field(name).ok_or_else(|| {
                    InternalError::query_unsupported(format!(
                        "unknown order field '{name}' on entity '{}'",
                        self.model.name
                    ))
                })?;
                Ok(record.value_or_null(name).clone())
            }
            OrderTarget::RelationCount(name) => {
                let relation = self.to_many_relation(name)?;
                let target = self.sibling(relation.target)?;
                let owner_key = self.single_key_value(record)?;
                let scoped = WhereClause::new()
                    .field(relation.fk_field, FieldFilter::value(owner_key));
                let count = target.count_in(Some(&scoped), tx)?;
                let count = i64::try_from(count).unwrap_or(i64::MAX);
                Ok(Value::Int(count))
            }
            OrderTarget::Relation(name, nested) => {
                let relation = self.model.relation(name).ok_or_else(|| {
                    InternalError::query_unsupported(format!(
                        "unknown order relation '{name}' on entity '{}'",
                        self.model.name
                    ))
                })?;
                if relation.kind != RelationKind::ToOne {
                    return Err(InternalError::query_unsupported(format!(
                        "ordering through to-many relation '{name}' requires a count",
                    )));
                }
                let target = self.sibling(relation.target)?;

                let fk_value = record.value_or_null(relation.fk_field);
                if fk_value.is_null() {
                    return Ok(Value::Null);
                }
                let key = fk_value.as_storage_key().map(KeyTuple::single).ok_or_else(|| {
                    InternalError::store_corruption(format!(
                        "foreign key '{}' holds a non-keyable value",
                        relation.fk_field
                    ))
                })?;
                let related = tx
                    .get(target.model.name, &key)?
                    .ok_or_else(|| InternalError::record_not_found(target.model.name))?;

                target.resolve_order_key(&related, nested, tx)
            }
        }
    }

    fn to_many_relation(
        &self,
        name: &str,
    ) -> Result<&'static crate::model::RelationModel, InternalError> {
        let relation = self.model.relation(name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "unknown relation '{name}' on entity '{}'",
                self.model.name
            ))
        })?;
        if relation.kind != RelationKind::ToMany {
            return Err(InternalError::query_unsupported(format!(
                "relation '{name}' is not to-many"
            )));
        }

        Ok(relation)
    }

    ///
    /// RELATIONS
    ///

    /// Attach every requested relation, honoring nested find arguments.
    pub(crate) fn attach_relations(
        &self,
        records: Vec<Record>,
        query: &FindQuery,
        tx: &mut Transaction,
    ) -> Result<Vec<RecordView>, InternalError> {
        let requested = query.requested_relations();
        let mut views: Vec<RecordView> = records.into_iter().map(RecordView::from_record).collect();
        if requested.is_empty() {
            return Ok(views);
        }

        for view in &mut views {
            for (name, relation_query) in &requested {
                let relation = self.model.relation(name).ok_or_else(|| {
                    InternalError::query_unsupported(format!(
                        "unknown relation '{name}' on entity '{}'",
                        self.model.name
                    ))
                })?;
                let target = self.sibling(relation.target)?;
                let mut nested = relation_query.find_query();

                match relation.kind {
                    RelationKind::ToMany => {
                        let owner_key = self.single_key_value(&view.fields)?;
                        let fk_clause = WhereClause::new()
                            .field(relation.fk_field, FieldFilter::value(owner_key));
                        nested.where_clause = Some(match nested.where_clause.take() {
                            Some(inner) => fk_clause.and(inner),
                            None => fk_clause,
                        });
                        let related = target.find_many_in(&nested, tx)?;
                        view.attach(*name, RelationValue::Many(related));
                    }
                    RelationKind::ToOne => {
                        let fk_value = view.fields.value_or_null(relation.fk_field).clone();
                        if fk_value.is_null() {
                            view.attach(*name, RelationValue::One(None));
                            continue;
                        }
                        let key_field = target.model.single_key_field().ok_or_else(|| {
                            InternalError::query_unsupported(format!(
                                "relation '{name}' crosses a composite key path"
                            ))
                        })?;
                        let key_clause =
                            WhereClause::new().field(key_field, FieldFilter::value(fk_value));
                        nested.where_clause = Some(match nested.where_clause.take() {
                            Some(inner) => key_clause.and(inner),
                            None => key_clause,
                        });
                        let related = target.find_unique_in(&nested, tx)?;
                        view.attach(*name, RelationValue::One(related.map(Box::new)));
                    }
                }
            }
        }

        Ok(views)
    }

    ///
    /// PROJECTION
    ///

    pub(crate) fn apply_select(
        mut views: Vec<RecordView>,
        select: Option<&Select>,
    ) -> Vec<RecordView> {
        let Some(select) = select else {
            return views;
        };
        let relation_names: Vec<String> =
            select.relations.iter().map(|(name, _)| name.clone()).collect();
        for view in &mut views {
            view.project(&select.fields, &relation_names);
        }

        views
    }

    ///
    /// KEY EXTRACTION
    ///

    /// Extract the full key tuple when every key-path field is pinned to one
    /// equality value at the top level of the clause.
    pub(crate) fn key_from_where(
        &self,
        clause: Option<&WhereClause>,
    ) -> Result<Option<KeyTuple>, InternalError> {
        let Some(clause) = clause else {
            return Ok(None);
        };

        let mut keys = Vec::with_capacity(self.model.key_path.len());
        for field_name in self.model.key_path {
            let Some(pinned) = clause
                .fields
                .iter()
                .find(|(name, _)| name == field_name)
                .and_then(|(_, filter)| filter.pinned_value())
            else {
                return Ok(None);
            };

            // Normalize through the field (text timestamps become absolute).
            let field = self.model.field(field_name).ok_or_else(|| {
                InternalError::store_corruption(format!(
                    "key field '{field_name}' missing from model '{}'",
                    self.model.name
                ))
            })?;
            let normalized = FieldFilter::value(pinned.clone()).validated(field)?;
            let Some(key) = normalized.pinned_value().and_then(Value::as_storage_key) else {
                return Ok(None);
            };
            keys.push(key);
        }

        Ok(Some(KeyTuple::new(keys)))
    }
}
