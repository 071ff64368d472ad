//! Named event bus.
//!
//! An event is a name plus a payload type. The first subscription or
//! invocation fixes the payload type; using the same name with another
//! payload type fails with `AmbiguousCast`. Events without data use `()`,
//! events with several values use a tuple.
//!
//! ```rust
//! use khidma::prelude::*;
//! use std::sync::Arc;
//!
//! let container = Container::builder()
//!     .add_provider(&BuiltinServices)
//!     .build()
//!     .expect("Failed to build container");
//!
//! let events: Arc<dyn EventBus> = container.resolve(0).expect("Failed to resolve");
//! events
//!     .subscribe("player_hit", |damage: &u32| assert_eq!(*damage, 5))
//!     .expect("Failed to subscribe");
//! assert_eq!(events.invoke("player_hit", &5u32).expect("Failed to invoke"), 1);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use khidma_container::error::AmbiguousCastError;
use khidma_container::{ContractKey, KhidmaError, Result};
use parking_lot::RwLock;
use tracing::trace;

use super::logger::Logger;
use crate::Injectable;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A listener with its payload type erased. Holds a `Listener<A>`.
pub type ErasedListener = Arc<dyn Any + Send + Sync>;

type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Object-safe event bus contract. Use the typed helpers from
/// [`EventBusExt`].
pub trait EventBus: Send + Sync {
    fn add_listener(
        &self,
        event: &str,
        payload: ContractKey,
        listener: ErasedListener,
    ) -> Result<SubscriptionId>;

    /// Returns whether a listener was removed.
    fn remove_listener(
        &self,
        event: &str,
        payload: ContractKey,
        id: SubscriptionId,
    ) -> Result<bool>;

    /// Snapshot of the listeners of `event`, creating the event if needed.
    fn listeners(&self, event: &str, payload: ContractKey) -> Result<Vec<ErasedListener>>;

    fn logs_disabled(&self) -> bool;

    fn set_logs_disabled(&self, disabled: bool);

    /// Number of known events.
    fn event_count(&self) -> usize;
}

/// Typed access on top of [`EventBus`].
pub trait EventBusExt: EventBus {
    fn subscribe<A, F>(&self, event: &str, listener: F) -> Result<SubscriptionId>
    where
        A: 'static,
        F: Fn(&A) + Send + Sync + 'static,
    {
        let listener: Listener<A> = Arc::new(listener);
        self.add_listener(event, ContractKey::of::<A>(), Arc::new(listener))
    }

    fn unsubscribe<A: 'static>(&self, event: &str, id: SubscriptionId) -> Result<bool> {
        self.remove_listener(event, ContractKey::of::<A>(), id)
    }

    /// Calls every listener of `event` with `payload`, in subscription
    /// order. Returns how many listeners ran.
    ///
    /// Listeners run outside the bus lock, so they may subscribe or
    /// invoke further events.
    fn invoke<A: 'static>(&self, event: &str, payload: &A) -> Result<usize> {
        let listeners = self.listeners(event, ContractKey::of::<A>())?;
        let mut called = 0;
        for listener in listeners {
            if let Some(listener) = listener.downcast_ref::<Listener<A>>() {
                listener(payload);
                called += 1;
            }
        }
        Ok(called)
    }
}

impl<B: EventBus + ?Sized> EventBusExt for B {}

struct EventSlot {
    payload: ContractKey,
    listeners: Vec<(SubscriptionId, ErasedListener)>,
}

impl EventSlot {
    fn new(payload: ContractKey) -> Self {
        Self {
            payload,
            listeners: Vec::new(),
        }
    }
}

/// [`EventBus`] registered as a singleton.
///
/// Activity is logged through the injected [`Logger`], which starts
/// disabled.
#[derive(Default, Injectable)]
#[injectable(entry = "inject")]
pub struct SceneEvents {
    logger: Option<Arc<dyn Logger>>,
    events: RwLock<HashMap<String, EventSlot>>,
    next_id: AtomicU64,
}

impl SceneEvents {
    fn inject(&mut self, logger: Arc<dyn Logger>) {
        logger.set_disabled(true);
        self.logger = Some(logger);
    }

    fn log(&self, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            if !logger.is_disabled() {
                logger.log(&message());
            }
        }
    }

    /// Runs `action` on the slot of `event`, creating it for `payload`.
    fn with_slot<R>(
        &self,
        event: &str,
        payload: ContractKey,
        action: impl FnOnce(&mut EventSlot) -> R,
    ) -> Result<R> {
        let mut events = self.events.write();
        let slot = events
            .entry(event.to_owned())
            .or_insert_with(|| EventSlot::new(payload));

        if slot.payload != payload {
            return Err(KhidmaError::AmbiguousCast(AmbiguousCastError {
                expected: payload.type_name(),
                actual: Some(slot.payload.type_name()),
            }));
        }
        Ok(action(slot))
    }
}

impl EventBus for SceneEvents {
    fn add_listener(
        &self,
        event: &str,
        payload: ContractKey,
        listener: ErasedListener,
    ) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.with_slot(event, payload, |slot| slot.listeners.push((id, listener)))?;
        self.log(|| format!("{event} was subscribed to"));
        Ok(id)
    }

    fn remove_listener(
        &self,
        event: &str,
        payload: ContractKey,
        id: SubscriptionId,
    ) -> Result<bool> {
        let removed = self.with_slot(event, payload, |slot| {
            let before = slot.listeners.len();
            slot.listeners.retain(|(subscription, _)| *subscription != id);
            slot.listeners.len() != before
        })?;
        self.log(|| format!("{event} was unsubscribed from"));
        Ok(removed)
    }

    fn listeners(&self, event: &str, payload: ContractKey) -> Result<Vec<ErasedListener>> {
        let listeners = self.with_slot(event, payload, |slot| {
            slot.listeners
                .iter()
                .map(|(_, listener)| listener.clone())
                .collect::<Vec<_>>()
        })?;
        trace!(event, listeners = listeners.len(), "Invoking event");
        self.log(|| format!("{event} was invoked"));
        Ok(listeners)
    }

    fn logs_disabled(&self) -> bool {
        self.logger.as_ref().is_none_or(|logger| logger.is_disabled())
    }

    fn set_logs_disabled(&self, disabled: bool) {
        if let Some(logger) = &self.logger {
            logger.set_disabled(disabled);
        }
    }

    fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

impl fmt::Debug for SceneEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.events.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("SceneEvents").field("events", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::TracingLogger;
    use khidma_container::CallerMetadata;
    use parking_lot::Mutex;

    fn events() -> SceneEvents {
        let mut events = SceneEvents::default();
        events.inject(Arc::new(TracingLogger::for_caller(&CallerMetadata::system("test"))));
        events
    }

    #[test]
    fn invoke_reaches_listeners_in_order() {
        let events = events();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            events
                .subscribe("score", move |points: &u32| seen.lock().push((tag, *points)))
                .unwrap();
        }

        assert_eq!(events.invoke("score", &10u32).unwrap(), 2);
        assert_eq!(*seen.lock(), vec![("first", 10), ("second", 10)]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let events = events();
        let calls = Arc::new(AtomicU64::new(0));

        let counter = calls.clone();
        let id = events
            .subscribe("tick", move |_: &()| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        events.subscribe("tick", |_: &()| {}).unwrap();

        assert!(events.unsubscribe::<()>("tick", id).unwrap());
        assert!(!events.unsubscribe::<()>("tick", id).unwrap());
        assert_eq!(events.invoke("tick", &()).unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn invoking_unknown_event_creates_it() {
        let events = events();
        assert_eq!(events.invoke("door_opened", &("hall", 2u8)).unwrap(), 0);
        assert_eq!(events.event_count(), 1);
    }

    #[test]
    fn payload_type_is_fixed_by_first_use() {
        let events = events();
        events.subscribe("hit", |_: &u32| {}).unwrap();

        match events.invoke("hit", &"critical") {
            Err(KhidmaError::AmbiguousCast(err)) => {
                assert!(err.expected.contains("str"));
                assert_eq!(err.actual, Some("u32"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("invoking with another payload type must fail"),
        }
        assert!(events.subscribe("hit", |_: &String| {}).is_err());
    }

    #[test]
    fn logs_start_disabled_and_can_be_enabled() {
        let events = events();
        assert!(events.logs_disabled());
        events.set_logs_disabled(false);
        assert!(!events.logs_disabled());
    }

    #[test]
    fn listener_may_invoke_other_events() {
        let events = Arc::new(events());
        let inner = events.clone();
        events
            .subscribe("outer", move |_: &()| {
                inner.invoke("inner", &()).unwrap();
            })
            .unwrap();
        assert_eq!(events.invoke("outer", &()).unwrap(), 1);
        assert_eq!(events.event_count(), 2);
    }
}
