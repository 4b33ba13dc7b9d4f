//! EventBus - subscriber registry for live orchestration events.
//!
//! Each subscriber owns a bounded queue and an optional room/user filter.
//! Publishing never blocks: a full queue drops the event for that subscriber.

/// Subscriber registry and subscription handle.
pub mod bus;
/// Event type definitions.
pub mod types;

pub use bus::{EventBus, Subscription, DEFAULT_CAPACITY};
pub use types::{EventFilter, RoomEvent};
