//! Event system infrastructure for the todo API.
//!
//! This crate provides the event types that decouple the domain layer from
//! the real-time delivery layer (the WebSocket hub).
//!
//! # Architecture
//!
//! - **Event**: immutable record of one entity mutation, shared read-only by
//!   every subscriber it is delivered to
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates. Entity data is carried
//! as serialized JSON values so the hub never needs to know the entity types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A type alias that represents any entity's id field data type.
pub type Id = i64;

/// The kind of mutation an [`Event`] describes.
///
/// Serialized with the wire names subscribers see in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "create")]
    Created,
    #[serde(rename = "update")]
    Updated,
    #[serde(rename = "delete")]
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "create",
            EventKind::Updated => "update",
            EventKind::Deleted => "delete",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity changed.
///
/// Serializes to the wire shape `{"type": ..., "payload": ..., "timestamp": ...}`
/// where `timestamp` is RFC3339. Fields are private so an event cannot be
/// altered once it has been handed to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(rename = "payload")]
    entity: Value,
    #[serde(rename = "timestamp")]
    occurred_at: DateTime<Utc>,
}

impl Event {
    /// Builds an event stamped with the current time.
    pub fn new(kind: EventKind, entity: Value) -> Self {
        Self::at(kind, entity, Utc::now())
    }

    pub fn at(kind: EventKind, entity: Value, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            entity,
            occurred_at,
        }
    }

    pub fn created(entity: Value) -> Self {
        Self::new(EventKind::Created, entity)
    }

    pub fn updated(entity: Value) -> Self {
        Self::new(EventKind::Updated, entity)
    }

    /// Deleted entities no longer exist, so only the id is carried.
    pub fn deleted(id: Id) -> Self {
        Self::new(EventKind::Deleted, serde_json::json!({ "id": id }))
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn entity(&self) -> &Value {
        &self.entity
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Trait for handling domain events.
/// Implementations perform side effects like pushing notifications to
/// connected subscribers, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    pub async fn publish(&self, event: Event) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
