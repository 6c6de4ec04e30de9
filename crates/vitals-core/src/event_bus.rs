//! Session event bus.
//!
//! Built on `tokio::broadcast`. The session manager publishes navigation
//! commands and state transitions here instead of driving a UI directly, so
//! any presentation layer (or a test) can react by subscribing.

use crate::session::SessionStatus;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default capacity of the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

/// Surfaces the session manager can send the user to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Dashboard,
    Login {
        /// One-off message to show on arrival (e.g. after registering).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
    },
}

/// Event types, used for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventType {
    Navigate,
    StatusChanged,
    DetailsResolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventKind {
    Navigate { route: Route },
    StatusChanged { status: SessionStatus },
    /// The details fetch for `user_id` finished; `loaded` is false when it
    /// failed and the visible user fell back to the bare id.
    DetailsResolved { user_id: UserId, loaded: bool },
}

impl SessionEventKind {
    pub fn event_type(&self) -> SessionEventType {
        match self {
            SessionEventKind::Navigate { .. } => SessionEventType::Navigate,
            SessionEventKind::StatusChanged { .. } => SessionEventType::StatusChanged,
            SessionEventKind::DetailsResolved { .. } => SessionEventType::DetailsResolved,
        }
    }
}

/// A single event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: Uuid,
    pub kind: SessionEventKind,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn event_type(&self) -> SessionEventType {
        self.kind.event_type()
    }

    /// The route, if this is a navigation command.
    pub fn route(&self) -> Option<&Route> {
        match &self.kind {
            SessionEventKind::Navigate { route } => Some(route),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionBus {
    /// Create a new event bus with default capacity.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }

    /// Create a new event bus with a custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers. Returns how many received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, kind: SessionEventKind) -> usize {
        let event = SessionEvent::new(kind);
        tracing::debug!(event = ?event.event_type(), "session event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to only specific event types.
    pub fn subscribe_filtered(&self, types: Vec<SessionEventType>) -> FilteredSubscriber {
        FilteredSubscriber {
            receiver: self.sender.subscribe(),
            filter: types.into_iter().collect(),
        }
    }

    /// Return the number of active subscribers on the channel.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber that only yields events matching a set of [`SessionEventType`]s.
pub struct FilteredSubscriber {
    receiver: broadcast::Receiver<SessionEvent>,
    filter: HashSet<SessionEventType>,
}

impl FilteredSubscriber {
    /// Receive the next event that matches the filter.
    ///
    /// Events that do not match are silently skipped.
    pub async fn recv(&mut self) -> Result<SessionEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.contains(&event.event_type()) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<SessionEvent, broadcast::error::TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.filter.contains(&event.event_type()) {
                return Ok(event);
            }
        }
    }
}
