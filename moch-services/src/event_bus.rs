//! Scoped change bus for store mutations.
//!
//! Every successful insert, update or delete in the store publishes a
//! [`ChangeEvent`]. Views subscribe with a [`Scope`] (entity kind and/or
//! related pet) and re-run their queries when a matching event arrives, so a
//! weight added from one screen refreshes a chart on another without polling.
//!
//! Delivery is synchronous and in publish order. An event published from
//! inside a handler is queued and delivered right after the current event,
//! before the outer `publish` returns.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::thread::{self, ThreadId};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use moch_models::{EntityKind, EntityRef, Id};

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Created,
    Updated,
    Deleted,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Created => "created",
            Operation::Updated => "updated",
            Operation::Deleted => "deleted",
        }
    }
}

/// A single committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub id: Id,
    pub operation: Operation,
    /// Pet the entity belongs to (for a pet, the pet itself).
    pub related_pet_id: Option<Id>,
}

impl ChangeEvent {
    pub fn new(target: EntityRef, operation: Operation) -> Self {
        Self {
            kind: target.kind,
            id: target.id,
            operation,
            related_pet_id: target.related_pet_id,
        }
    }
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.kind, self.id, self.operation.as_str())?;
        if let Some(pet_id) = self.related_pet_id {
            write!(f, " (pet {pet_id})")?;
        }
        Ok(())
    }
}

/// Which events a subscriber receives. Unset fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub kind: Option<EntityKind>,
    pub pet_id: Option<Id>,
}

impl Scope {
    /// Every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Events whose related pet is `pet_id`.
    pub fn pet(pet_id: Id) -> Self {
        Self {
            kind: None,
            pet_id: Some(pet_id),
        }
    }

    /// Events about one entity kind.
    pub fn kind(kind: EntityKind) -> Self {
        Self {
            kind: Some(kind),
            pet_id: None,
        }
    }

    /// Narrow this scope to one entity kind.
    pub fn of_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.kind.map_or(true, |k| k == event.kind)
            && self.pet_id.map_or(true, |p| event.related_pet_id == Some(p))
    }
}

type Handler = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Registration {
    id: u64,
    scope: Scope,
    handler: Handler,
}

struct Inner {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Registration>>,
    /// Serializes deliveries across threads.
    dispatch: Mutex<()>,
    /// Thread currently delivering, used to detect nested publishes.
    dispatcher: Mutex<Option<ThreadId>>,
    /// Events published from inside a handler, awaiting delivery.
    pending: Mutex<VecDeque<ChangeEvent>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn dispatching_here(&self) -> bool {
        *lock(&self.dispatcher) == Some(thread::current().id())
    }

    fn unregister(&self, id: u64) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = subscribers.len();
        subscribers.retain(|r| r.id != id);
        before != subscribers.len()
    }

    fn deliver(&self, event: &ChangeEvent) -> usize {
        // Snapshot so handlers may subscribe or release without deadlocking.
        let targets: Vec<Handler> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|r| r.scope.matches(event))
            .map(|r| Arc::clone(&r.handler))
            .collect();

        for handler in &targets {
            handler(event);
        }
        targets.len()
    }
}

/// Clears the dispatcher marker and any undelivered nested events, even if a
/// handler panics.
struct DispatchGuard<'a> {
    inner: &'a Inner,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let dropped = {
            let mut pending = lock(&self.inner.pending);
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            warn!("change_bus: dropped {dropped} nested event(s) after a handler panicked");
        }
        *lock(&self.inner.dispatcher) = None;
    }
}

/// Process-wide publish/subscribe channel for committed store mutations.
///
/// Cheap to clone; clones share subscribers. The bus holds no state across
/// restarts.
#[derive(Clone)]
pub struct ChangeBus {
    inner: Arc<Inner>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
                dispatch: Mutex::new(()),
                dispatcher: Mutex::new(None),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Register `handler` for events matching `scope`.
    ///
    /// The handler runs on the publishing thread. It must not mutate the store
    /// itself; work that needs to should go through [`subscribe_channel`]
    /// and run on a later turn.
    ///
    /// [`subscribe_channel`]: ChangeBus::subscribe_channel
    #[must_use = "dropping the subscription unregisters the handler"]
    pub fn subscribe<F>(&self, scope: Scope, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Registration {
                id,
                scope,
                handler: Arc::new(handler),
            });
        debug!("change_bus: subscription {id} registered for {scope:?}");
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Subscribe with a channel instead of a callback. Events are forwarded in
    /// order; the receiver processes them on its own schedule.
    #[must_use = "dropping the subscription unregisters the channel"]
    pub fn subscribe_channel(
        &self,
        scope: Scope,
    ) -> (Subscription, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(scope, move |event| {
            // A closed receiver just means the consumer went away.
            let _ = tx.send(*event);
        });
        (subscription, rx)
    }

    /// Deliver `event` to every matching subscriber, in registration order.
    pub fn publish(&self, event: ChangeEvent) {
        if self.inner.dispatching_here() {
            lock(&self.inner.pending).push_back(event);
            return;
        }

        let _serial = lock(&self.inner.dispatch);
        *lock(&self.inner.dispatcher) = Some(thread::current().id());
        let _guard = DispatchGuard { inner: &self.inner };

        let mut next = Some(event);
        while let Some(current) = next {
            let delivered = self.inner.deliver(&current);
            if delivered == 0 {
                debug!("change_bus: no subscribers for {current}");
            } else {
                debug!("change_bus: delivered {current} to {delivered} subscriber(s)");
            }
            next = lock(&self.inner.pending).pop_front();
        }
    }

    /// Whether the calling thread is inside a handler of this bus.
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching_here()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Handle for a registered subscriber. Release it (or drop it) when the view
/// stops observing.
pub struct Subscription {
    id: u64,
    bus: Weak<Inner>,
    released: bool,
}

impl Subscription {
    /// Unregister the handler.
    pub fn release(mut self) {
        self.unregister();
    }

    pub fn is_active(&self) -> bool {
        !self.released && self.bus.strong_count() > 0
    }

    fn unregister(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(inner) = self.bus.upgrade() {
            if inner.unregister(self.id) {
                debug!("change_bus: subscription {} released", self.id);
            } else {
                warn!("change_bus: subscription {} was already gone", self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event(kind: EntityKind, pet: Option<Id>) -> ChangeEvent {
        ChangeEvent {
            kind,
            id: Uuid::new_v4(),
            operation: Operation::Created,
            related_pet_id: pet,
        }
    }

    fn recorder(bus: &ChangeBus, scope: Scope) -> (Subscription, Arc<Mutex<Vec<ChangeEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = bus.subscribe(scope, move |e| sink.lock().unwrap().push(*e));
        (sub, seen)
    }

    #[test]
    fn test_scope_matching() {
        let pet = Uuid::new_v4();
        let e = event(EntityKind::WeightEntry, Some(pet));
        assert!(Scope::all().matches(&e));
        assert!(Scope::pet(pet).matches(&e));
        assert!(!Scope::pet(Uuid::new_v4()).matches(&e));
        assert!(Scope::kind(EntityKind::WeightEntry).matches(&e));
        assert!(!Scope::pet(pet).of_kind(EntityKind::Reminder).matches(&e));
        assert!(!Scope::pet(pet).matches(&event(EntityKind::Reminder, None)));
    }

    #[test]
    fn test_publish_preserves_order() {
        let bus = ChangeBus::new();
        let (_sub, seen) = recorder(&bus, Scope::all());
        let events: Vec<_> = [EntityKind::Pet, EntityKind::WeightEntry, EntityKind::Reminder]
            .into_iter()
            .map(|k| event(k, None))
            .collect();
        for e in &events {
            bus.publish(*e);
        }
        assert_eq!(*seen.lock().unwrap(), events);
    }

    #[test]
    fn test_release_unregisters() {
        let bus = ChangeBus::new();
        let (sub, seen) = recorder(&bus, Scope::all());
        assert_eq!(bus.subscriber_count(), 1);
        sub.release();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(event(EntityKind::Pet, None));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let bus = ChangeBus::new();
        {
            let _sub = bus.subscribe(Scope::all(), |_| {});
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_nested_publish_is_delivered_after_current() {
        let bus = ChangeBus::new();
        let first = event(EntityKind::Pet, None);
        let follow_up = event(EntityKind::Reminder, None);

        let republisher = bus.clone();
        let _echo = bus.subscribe(Scope::kind(EntityKind::Pet), move |_| {
            assert!(republisher.is_dispatching());
            republisher.publish(follow_up);
        });
        let (_sub, seen) = recorder(&bus, Scope::all());

        bus.publish(first);
        assert_eq!(*seen.lock().unwrap(), vec![first, follow_up]);
        assert!(!bus.is_dispatching());
    }

    #[test]
    fn test_panicking_handler_does_not_leak_nested_events() {
        use std::sync::atomic::AtomicBool;

        let bus = ChangeBus::new();
        let orphan = event(EntityKind::Reminder, None);
        let armed = Arc::new(AtomicBool::new(true));

        let republisher = bus.clone();
        let trigger = Arc::clone(&armed);
        let _faulty = bus.subscribe(Scope::kind(EntityKind::Pet), move |_| {
            if trigger.swap(false, Ordering::SeqCst) {
                republisher.publish(orphan);
                panic!("handler failure");
            }
        });
        let (_sub, seen) = recorder(&bus, Scope::kind(EntityKind::Reminder));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bus.publish(event(EntityKind::Pet, None));
        }));
        assert!(outcome.is_err());
        assert!(!bus.is_dispatching());

        let next = event(EntityKind::Reminder, None);
        bus.publish(next);
        assert_eq!(*seen.lock().unwrap(), vec![next]);
    }

    #[tokio::test]
    async fn test_channel_subscription() {
        let bus = ChangeBus::new();
        let pet = Uuid::new_v4();
        let (_sub, mut rx) = bus.subscribe_channel(Scope::pet(pet));

        bus.publish(event(EntityKind::WeightEntry, Some(Uuid::new_v4())));
        let mine = event(EntityKind::WeightEntry, Some(pet));
        bus.publish(mine);

        assert_eq!(rx.recv().await, Some(mine));
        assert!(rx.try_recv().is_err());
    }
}
