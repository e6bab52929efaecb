use crate::db::store::KeyTuple;
use std::rc::Rc;

///
/// ChangeKind
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

///
/// ChangeEvent
///
/// Delivered synchronously at the emission point inside the operation, not
/// deferred to transaction completion. Listeners therefore observe events
/// even when the surrounding transaction later aborts; emitted events are
/// never retracted.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub key_path: KeyTuple,
    /// Present only for updates that moved the primary key.
    pub old_key_path: Option<KeyTuple>,
}

impl ChangeEvent {
    #[must_use]
    pub const fn create(key_path: KeyTuple) -> Self {
        Self {
            kind: ChangeKind::Create,
            key_path,
            old_key_path: None,
        }
    }

    #[must_use]
    pub const fn update(key_path: KeyTuple, old_key_path: Option<KeyTuple>) -> Self {
        Self {
            kind: ChangeKind::Update,
            key_path,
            old_key_path,
        }
    }

    #[must_use]
    pub const fn delete(key_path: KeyTuple) -> Self {
        Self {
            kind: ChangeKind::Delete,
            key_path,
            old_key_path: None,
        }
    }
}

///
/// SubscriptionId
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct SubscriptionId(u64);

///
/// Listener
///

pub type Listener = Rc<dyn Fn(&ChangeEvent)>;

struct Subscriber {
    id: SubscriptionId,
    kinds: Vec<ChangeKind>,
    listener: Listener,
}

///
/// SubscriberRegistry
/// Per-entity listener registrations.
///

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl SubscriberRegistry {
    pub fn subscribe(&mut self, kinds: &[ChangeKind], listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            kinds: kinds.to_vec(),
            listener,
        });

        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);

        before != self.subscribers.len()
    }

    /// Snapshot the listeners registered for one event kind.
    ///
    /// Returning clones lets the caller drop its registry borrow before
    /// invoking listeners, so a listener may re-enter the database.
    pub fn listeners_for(&self, kind: ChangeKind) -> Vec<Listener> {
        self.subscribers
            .iter()
            .filter(|s| s.kinds.contains(&kind))
            .map(|s| Rc::clone(&s.listener))
            .collect()
    }
}
