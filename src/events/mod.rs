//! Page lifecycle events
//!
//! The page store publishes [`WikiEvent`]s on a [`PageEventBridge`]; the
//! search manager registers itself as a [`WikiEventListener`] to keep its
//! index in step with the store.

mod bridge;
mod types;

pub use bridge::{
    DeliveryReport, ListenerId, PageEventBridge, WikiEventListener, DEFAULT_CHANNEL_CAPACITY,
};
pub use types::{EventEnvelope, EventStats, WikiEvent};
