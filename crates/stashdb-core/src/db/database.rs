use crate::{
    db::{
        client::EntityClient,
        events::SubscriberRegistry,
        scope::PartitionScope,
        store::StoreRegistry,
        txn::{Transaction, TxnMode},
    },
    error::InternalError,
    model::{EntityModel, SchemaModel},
};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

///
/// Database
///
/// Root client: owns the partitioned store, the versioned schema, and the
/// per-entity subscriber registries. Constructed explicitly once and passed
/// by reference; there is no global singleton.
///

#[derive(Clone)]
pub struct Database {
    inner: Rc<DatabaseInner>,
}

impl Database {
    /// Validate the schema and create every partition at the schema version.
    ///
    /// Partition creation is idempotent per (name, version); this mirrors a
    /// versioned store open, not a migration.
    pub fn open(schema: &'static SchemaModel) -> Result<Self, InternalError> {
        schema.validate()?;

        let mut stores = StoreRegistry::new();
        for entity in schema.entities {
            stores.create_partition(entity.name, schema.version)?;
        }

        Ok(Self {
            inner: Rc::new(DatabaseInner {
                schema,
                stores: RefCell::new(stores),
                subscribers: RefCell::new(BTreeMap::new()),
                debug: Cell::new(false),
            }),
        })
    }

    /// Enable debug logging for all clients of this database.
    #[must_use]
    pub fn debug(self) -> Self {
        self.inner.debug.set(true);
        self
    }

    #[must_use]
    pub fn schema(&self) -> &'static SchemaModel {
        self.inner.schema
    }

    /// Get the entity client serving one partition.
    pub fn entity(&self, name: &str) -> Result<EntityClient, InternalError> {
        let model = self.inner.schema.entity(name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "unknown entity '{name}' in schema '{}'",
                self.inner.schema.name
            ))
        })?;

        Ok(EntityClient::new(Rc::clone(&self.inner), model))
    }

    /// Open a transaction over an explicit partition scope.
    pub fn begin(&self, mode: TxnMode, scope: PartitionScope) -> Result<Transaction, InternalError> {
        self.inner.begin(mode, scope)
    }
}

///
/// DatabaseInner
///

pub(crate) struct DatabaseInner {
    pub(crate) schema: &'static SchemaModel,
    stores: RefCell<StoreRegistry>,
    subscribers: RefCell<BTreeMap<&'static str, SubscriberRegistry>>,
    debug: Cell<bool>,
}

impl DatabaseInner {
    pub(crate) const fn stores(&self) -> &RefCell<StoreRegistry> {
        &self.stores
    }

    pub(crate) fn begin(
        self: &Rc<Self>,
        mode: TxnMode,
        scope: PartitionScope,
    ) -> Result<Transaction, InternalError> {
        let stores = self.stores.borrow();
        for name in scope.iter() {
            stores.partition(name)?;
        }
        drop(stores);

        Ok(Transaction::new(Rc::clone(self), mode, scope))
    }

    pub(crate) fn entity_model(&self, name: &str) -> Result<&'static EntityModel, InternalError> {
        self.schema.entity(name).ok_or_else(|| {
            InternalError::query_unsupported(format!(
                "unknown entity '{name}' in schema '{}'",
                self.schema.name
            ))
        })
    }

    pub(crate) fn with_subscribers<R>(
        &self,
        entity: &'static str,
        f: impl FnOnce(&mut SubscriberRegistry) -> R,
    ) -> R {
        let mut subscribers = self.subscribers.borrow_mut();
        f(subscribers.entry(entity).or_default())
    }

    pub(crate) fn is_debug(&self) -> bool {
        self.debug.get()
    }
}
