//! Wiki lifecycle event types

use crate::models::PagePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Events emitted by the page store and the hosting engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WikiEvent {
    /// A page version was saved
    PageSaved { path: PagePath },

    /// A page is about to be deleted; it still exists in the store
    PageDeleteRequested { path: PagePath },

    /// A page was deleted
    PageDeleted { path: PagePath },

    /// A page was renamed
    PageRenamed { from: PagePath, to: PagePath },

    /// The engine finished starting up
    EngineStarted,

    /// The engine is shutting down
    EngineShutdown,
}

impl WikiEvent {
    /// The page this event concerns, if any
    pub fn page_path(&self) -> Option<&PagePath> {
        match self {
            WikiEvent::PageSaved { path }
            | WikiEvent::PageDeleteRequested { path }
            | WikiEvent::PageDeleted { path } => Some(path),
            WikiEvent::PageRenamed { to, .. } => Some(to),
            WikiEvent::EngineStarted | WikiEvent::EngineShutdown => None,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            WikiEvent::PageSaved { .. } => "PageSaved",
            WikiEvent::PageDeleteRequested { .. } => "PageDeleteRequested",
            WikiEvent::PageDeleted { .. } => "PageDeleted",
            WikiEvent::PageRenamed { .. } => "PageRenamed",
            WikiEvent::EngineStarted => "EngineStarted",
            WikiEvent::EngineShutdown => "EngineShutdown",
        }
    }

    pub fn saved(path: impl Into<PagePath>) -> Self {
        WikiEvent::PageSaved { path: path.into() }
    }

    pub fn delete_requested(path: impl Into<PagePath>) -> Self {
        WikiEvent::PageDeleteRequested { path: path.into() }
    }

    pub fn deleted(path: impl Into<PagePath>) -> Self {
        WikiEvent::PageDeleted { path: path.into() }
    }
}

/// Event envelope carried on the broadcast channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: String,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event payload
    pub event: WikiEvent,
}

impl EventEnvelope {
    /// Create a new event envelope
    pub fn new(event: WikiEvent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Event statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventStats {
    pub total_events: u64,
    pub listener_failures: u64,
    pub events_by_type: HashMap<String, u64>,
    pub last_event_time: Option<DateTime<Utc>>,
}

impl EventStats {
    /// Record a new event
    pub fn record_event(&mut self, event_type: &str) {
        self.total_events += 1;
        *self
            .events_by_type
            .entry(event_type.to_string())
            .or_insert(0) += 1;
        self.last_event_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_path_extraction() {
        assert_eq!(
            WikiEvent::saved("Foo").page_path(),
            Some(&PagePath::new("Foo"))
        );
        assert_eq!(WikiEvent::EngineStarted.page_path(), None);

        let renamed = WikiEvent::PageRenamed {
            from: PagePath::new("Old"),
            to: PagePath::new("New"),
        };
        assert_eq!(renamed.page_path(), Some(&PagePath::new("New")));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(WikiEvent::delete_requested("Foo")).unwrap();
        assert_eq!(json["type"], "PageDeleteRequested");
        assert_eq!(json["path"], "Foo");

        let back: WikiEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, WikiEvent::delete_requested("Foo"));
    }

    #[test]
    fn test_stats_recording() {
        let mut stats = EventStats::default();
        stats.record_event("PageSaved");
        stats.record_event("PageSaved");
        stats.record_event("PageDeleted");

        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.events_by_type["PageSaved"], 2);
        assert!(stats.last_event_time.is_some());
    }
}
