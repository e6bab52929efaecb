use crate::{
    db::{
        data::{CreateData, RelationCreate, RelationUpdate, UpdateData},
        query::{FindQuery, OrderBy, OrderTarget, RelationFilter, WhereClause},
    },
    error::InternalError,
    model::{EntityModel, RelationKind, RelationModel, SchemaModel},
};
use std::{collections::BTreeSet, fmt};

///
/// PartitionScope
///
/// The set of partitions one logical operation must access, used to size a
/// single transaction. Grows monotonically during planning.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PartitionScope(BTreeSet<&'static str>);

impl PartitionScope {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, partition: &'static str) {
        self.0.insert(partition);
    }

    #[must_use]
    pub fn contains(&self, partition: &str) -> bool {
        self.0.contains(partition)
    }

    pub fn extend(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PartitionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "}}")
    }
}

///
/// ScopePlanner
///
/// Pure static walk over query/mutation descriptors computing the minimal
/// partition set one transaction must span. Never performs I/O; unknown
/// relation names fail here, before any store access.
///

#[derive(Clone, Copy)]
pub struct ScopePlanner<'a> {
    schema: &'a SchemaModel,
}

impl<'a> ScopePlanner<'a> {
    #[must_use]
    pub const fn new(schema: &'a SchemaModel) -> Self {
        Self { schema }
    }

    fn relation(
        &self,
        entity: &'a EntityModel,
        name: &str,
    ) -> Result<(&'a RelationModel, &'a EntityModel), InternalError> {
        let relation = entity.relation(name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "unknown relation '{name}' on entity '{}'",
                entity.name
            ))
        })?;
        let target = self.schema.entity(relation.target).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "relation '{name}' targets unknown entity '{}'",
                relation.target
            ))
        })?;

        Ok((relation, target))
    }

    ///
    /// READ SCOPES
    ///

    pub fn needed_for_find(
        &self,
        entity: &EntityModel,
        query: &FindQuery,
    ) -> Result<PartitionScope, InternalError> {
        let mut scope = PartitionScope::new();
        scope.insert(self.schema_entity(entity)?.name);
        self.add_where(entity, query.where_clause.as_ref(), &mut scope)?;
        for order in &query.order_by {
            self.add_order(entity, order, &mut scope)?;
        }
        for (name, relation_query) in query.requested_relations() {
            let (_, target) = self.relation(entity, name)?;
            scope.insert(target.name);
            let nested = self.needed_for_find(target, &relation_query.find_query())?;
            scope.extend(&nested);
        }

        Ok(scope)
    }

    pub fn needed_for_where(
        &self,
        entity: &EntityModel,
        where_clause: Option<&WhereClause>,
    ) -> Result<PartitionScope, InternalError> {
        let mut scope = PartitionScope::new();
        scope.insert(self.schema_entity(entity)?.name);
        self.add_where(entity, where_clause, &mut scope)?;

        Ok(scope)
    }

    fn add_where(
        &self,
        entity: &EntityModel,
        where_clause: Option<&WhereClause>,
        scope: &mut PartitionScope,
    ) -> Result<(), InternalError> {
        let Some(clause) = where_clause else {
            return Ok(());
        };

        for nested in clause.and.iter().chain(&clause.or).chain(&clause.not) {
            self.add_where(entity, Some(nested), scope)?;
        }
        for (name, filter) in &clause.relations {
            let (_, target) = self.relation(entity, name)?;
            scope.insert(target.name);
            let nested = match filter {
                RelationFilter::Any(clause)
                | RelationFilter::All(clause)
                | RelationFilter::None(clause)
                | RelationFilter::Is(clause)
                | RelationFilter::IsNot(clause) => clause,
            };
            self.add_where(target, Some(nested), scope)?;
        }

        Ok(())
    }

    fn add_order(
        &self,
        entity: &EntityModel,
        order: &OrderBy,
        scope: &mut PartitionScope,
    ) -> Result<(), InternalError> {
        match &order.target {
            OrderTarget::Field(_) => Ok(()),
            OrderTarget::RelationCount(name) => {
                let (_, target) = self.relation(entity, name)?;
                scope.insert(target.name);
                Ok(())
            }
            OrderTarget::Relation(name, nested) => {
                let (_, target) = self.relation(entity, name)?;
                scope.insert(target.name);
                self.add_order(target, nested, scope)
            }
        }
    }

    ///
    /// WRITE SCOPES
    ///

    pub fn needed_for_create(
        &self,
        entity: &EntityModel,
        data: &CreateData,
    ) -> Result<PartitionScope, InternalError> {
        let mut scope = PartitionScope::new();
        scope.insert(self.schema_entity(entity)?.name);

        // A direct foreign-key write reads the referenced partition for
        // integrity validation.
        for relation in entity.relations {
            if relation.kind == RelationKind::ToOne && data.values.contains_key(relation.fk_field) {
                scope.insert(relation.target);
            }
        }

        for (name, ops) in &data.relations {
            let (_, target) = self.relation(entity, name)?;
            scope.insert(target.name);
            self.add_relation_create(target, ops, &mut scope)?;
        }

        Ok(scope)
    }

    fn add_relation_create(
        &self,
        target: &EntityModel,
        ops: &RelationCreate,
        scope: &mut PartitionScope,
    ) -> Result<(), InternalError> {
        for data in ops.create.iter().chain(&ops.create_many) {
            let nested = self.needed_for_create(target, data)?;
            scope.extend(&nested);
        }
        for where_clause in &ops.connect {
            let nested = self.needed_for_where(target, Some(where_clause))?;
            scope.extend(&nested);
        }
        for entry in &ops.connect_or_create {
            let nested = self.needed_for_where(target, Some(&entry.where_clause))?;
            scope.extend(&nested);
            let nested = self.needed_for_create(target, &entry.create)?;
            scope.extend(&nested);
        }

        Ok(())
    }

    pub fn needed_for_update(
        &self,
        entity: &EntityModel,
        where_clause: Option<&WhereClause>,
        data: &UpdateData,
    ) -> Result<PartitionScope, InternalError> {
        let mut scope = self.needed_for_where(entity, where_clause)?;

        for relation in entity.relations {
            if relation.kind == RelationKind::ToOne && data.values.contains_key(relation.fk_field) {
                scope.insert(relation.target);
            }
        }

        // A key-path write cascades the new key into every dependent FK.
        if entity
            .key_path
            .iter()
            .any(|field| data.values.contains_key(*field))
        {
            for relation in entity.relations {
                if relation.kind == RelationKind::ToMany {
                    scope.insert(relation.target);
                }
            }
        }

        for (name, ops) in &data.relations {
            let (_, target) = self.relation(entity, name)?;
            scope.insert(target.name);
            self.add_relation_update(target, ops, &mut scope)?;
        }

        Ok(scope)
    }

    fn add_relation_update(
        &self,
        target: &EntityModel,
        ops: &RelationUpdate,
        scope: &mut PartitionScope,
    ) -> Result<(), InternalError> {
        for data in ops.create.iter().chain(&ops.create_many) {
            let nested = self.needed_for_create(target, data)?;
            scope.extend(&nested);
        }
        for where_clause in ops.connect.iter().chain(ops.set.iter().flatten()) {
            let nested = self.needed_for_where(target, Some(where_clause))?;
            scope.extend(&nested);
        }
        for entry in &ops.connect_or_create {
            let nested = self.needed_for_where(target, Some(&entry.where_clause))?;
            scope.extend(&nested);
            let nested = self.needed_for_create(target, &entry.create)?;
            scope.extend(&nested);
        }
        for entry in ops.update.iter().chain(&ops.update_many) {
            let nested =
                self.needed_for_update(target, entry.where_clause.as_ref(), &entry.data)?;
            scope.extend(&nested);
        }
        for entry in &ops.upsert {
            let nested =
                self.needed_for_update(target, Some(&entry.where_clause), &entry.update)?;
            scope.extend(&nested);
            let nested = self.needed_for_create(target, &entry.create)?;
            scope.extend(&nested);
        }
        if !ops.delete.is_empty() || !ops.delete_many.is_empty() {
            for where_clause in ops.delete.iter().chain(&ops.delete_many) {
                let nested = self.needed_for_where(target, Some(where_clause))?;
                scope.extend(&nested);
            }
            self.add_nested_delete(target, scope)?;
        }

        Ok(())
    }

    pub fn needed_for_delete(
        &self,
        entity: &EntityModel,
        where_clause: Option<&WhereClause>,
    ) -> Result<PartitionScope, InternalError> {
        let mut scope = self.needed_for_where(entity, where_clause)?;
        self.add_nested_delete(entity, &mut scope)?;

        Ok(scope)
    }

    // Deleting an owner may cascade into every transitively dependent
    // partition.
    fn add_nested_delete(
        &self,
        entity: &EntityModel,
        scope: &mut PartitionScope,
    ) -> Result<(), InternalError> {
        let mut visited = BTreeSet::new();
        self.add_nested_delete_inner(entity, scope, &mut visited)
    }

    fn add_nested_delete_inner(
        &self,
        entity: &EntityModel,
        scope: &mut PartitionScope,
        visited: &mut BTreeSet<&'static str>,
    ) -> Result<(), InternalError> {
        let entity = self.schema_entity(entity)?;
        if !visited.insert(entity.name) {
            return Ok(());
        }
        scope.insert(entity.name);
        for relation in entity.relations {
            if relation.kind != RelationKind::ToMany {
                continue;
            }
            let (_, target) = self.relation(entity, relation.name)?;
            self.add_nested_delete_inner(target, scope, visited)?;
        }

        Ok(())
    }

    fn schema_entity(&self, entity: &EntityModel) -> Result<&'a EntityModel, InternalError> {
        self.schema.entity(entity.name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "entity '{}' is not part of schema '{}'",
                entity.name, self.schema.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            data::{CreateData, NestedUpdate, RelationCreate, RelationUpdate, UpdateData},
            predicate::FieldFilter,
            query::{Direction, FindQuery, Include, OrderBy, RelationFilter, RelationQuery, WhereClause},
        },
        test_fixtures::{BOARD, SCHEMA, TASK},
    };

    fn names(scope: &PartitionScope) -> Vec<&'static str> {
        scope.iter().collect()
    }

    #[test]
    fn find_includes_own_partition_only_by_default() {
        let planner = ScopePlanner::new(&SCHEMA);
        let scope = planner.needed_for_find(&TASK, &FindQuery::new()).unwrap();
        assert_eq!(names(&scope), vec!["Task"]);
    }

    #[test]
    fn relation_filters_grow_the_scope() {
        let planner = ScopePlanner::new(&SCHEMA);
        let query = FindQuery::new().filter(WhereClause::new().relation(
            "tasks",
            RelationFilter::Any(WhereClause::eq("title", "t")),
        ));
        let scope = planner.needed_for_find(&BOARD, &query).unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn includes_and_relation_order_grow_the_scope() {
        let planner = ScopePlanner::new(&SCHEMA);

        let query = FindQuery::new().include(Include::new().relation("tasks", RelationQuery::All));
        let scope = planner.needed_for_find(&BOARD, &query).unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);

        let query =
            FindQuery::new().order(OrderBy::relation_count("tasks", Direction::Desc));
        let scope = planner.needed_for_find(&BOARD, &query).unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn logical_children_are_walked() {
        let planner = ScopePlanner::new(&SCHEMA);
        let clause = WhereClause::new().not(WhereClause::new().relation(
            "board",
            RelationFilter::Is(WhereClause::eq("name", "A")),
        ));
        let scope = planner.needed_for_where(&TASK, Some(&clause)).unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn create_with_nested_relation_needs_target() {
        let planner = ScopePlanner::new(&SCHEMA);
        let data = CreateData::new().value("title", "t").relation(
            "board",
            RelationCreate::new().connect(WhereClause::eq("name", "A")),
        );
        let scope = planner.needed_for_create(&TASK, &data).unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn direct_fk_write_needs_target() {
        let planner = ScopePlanner::new(&SCHEMA);
        let data = CreateData::new().value("board_name", "A");
        let scope = planner.needed_for_create(&TASK, &data).unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn key_path_update_needs_dependents() {
        let planner = ScopePlanner::new(&SCHEMA);
        let data = UpdateData::new().set("name", "B");
        let scope = planner
            .needed_for_update(&BOARD, Some(&WhereClause::eq("name", "A")), &data)
            .unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn nested_update_ops_recurse() {
        let planner = ScopePlanner::new(&SCHEMA);
        let data = UpdateData::new().relation(
            "tasks",
            RelationUpdate::new().update_many(NestedUpdate::new(
                Some(WhereClause::new().field("is_completed", FieldFilter::value(true))),
                UpdateData::new().set("is_completed", false),
            )),
        );
        let scope = planner
            .needed_for_update(&BOARD, Some(&WhereClause::eq("name", "A")), &data)
            .unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn delete_reaches_transitive_dependents() {
        let planner = ScopePlanner::new(&SCHEMA);
        let scope = planner
            .needed_for_delete(&BOARD, Some(&WhereClause::eq("name", "A")))
            .unwrap();
        assert_eq!(names(&scope), vec!["Board", "Task"]);
    }

    #[test]
    fn unknown_relation_fails_before_any_store_access() {
        let planner = ScopePlanner::new(&SCHEMA);
        let clause = WhereClause::new().relation(
            "ghosts",
            RelationFilter::Any(WhereClause::new()),
        );
        assert!(planner.needed_for_where(&BOARD, Some(&clause)).is_err());
    }
}
