//! In-process publish/subscribe event bus
//!
//! One bus per event loop. Subscribers register callbacks; publishers post
//! [`Event`] values and every matching callback runs synchronously on the
//! publishing thread, in registration order. Components depend on that
//! ordering: the order tracker's handlers must fire before the position
//! engine's for the same event, which is why the orchestrator constructs
//! them in that order.
//!
//! `publish` copies the subscriber list under the lock and invokes the
//! callbacks unlocked, so a callback may call back into the bus
//! (`publish`, `subscribe`, `unsubscribe`) without deadlocking. A
//! subscriber added during a publish may or may not see the in-flight
//! event; one removed during a publish may still be invoked for it, but
//! never for a later one.

pub mod event_bus;

pub use event_bus::{EventBus, SubscriptionId};
