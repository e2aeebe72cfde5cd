// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming over tokio broadcast channels. Events are lost on
// restart; the operation log in storage is the durable record.

use crate::domain::events::{DeploymentEvent, InfraEvent};
use crate::domain::infra::InfraId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Infra(InfraEvent),
    Deployment(DeploymentEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_infra_event(&self, event: InfraEvent) {
        self.publish(DomainEvent::Infra(event));
    }

    pub fn publish_deployment_event(&self, event: DeploymentEvent) {
        self.publish(DomainEvent::Deployment(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe and filter for a single infra
    pub fn subscribe_infra(&self, infra_id: InfraId) -> InfraEventReceiver {
        InfraEventReceiver {
            receiver: self.sender.subscribe(),
            infra_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for infra-specific events (filtered)
pub struct InfraEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    infra_id: InfraId,
}

impl InfraEventReceiver {
    /// Receive the next event for the subscribed infra, skipping all others
    pub async fn recv(&mut self) -> Result<InfraEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;

            if let DomainEvent::Infra(infra_event) = event {
                if infra_event.infra_id() == self.infra_id {
                    return Ok(infra_event);
                }
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infra::{InfraKind, InfraStatus, ProjectId};
    use crate::domain::lifecycle::LifecycleRequest;
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus.publish_infra_event(InfraEvent::InfraCreated {
            project_id: ProjectId(1),
            infra_id: InfraId(2),
            kind: InfraKind::EKS,
            created_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            DomainEvent::Infra(InfraEvent::InfraCreated { infra_id, kind, .. }) => {
                assert_eq!(infra_id, InfraId(2));
                assert_eq!(kind, InfraKind::EKS);
            }
            other => panic!("Wrong event type received: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_infra_event_filtering() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_infra(InfraId(7));

        for infra_id in [InfraId(3), InfraId(7)] {
            event_bus.publish_infra_event(InfraEvent::DispatchSkipped {
                infra_id,
                request: LifecycleRequest::Update,
                status: InfraStatus::Deleted,
                skipped_at: Utc::now(),
            });
        }

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.infra_id(), InfraId(7));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let event_bus = EventBus::default();
        assert_eq!(event_bus.subscriber_count(), 0);

        event_bus.publish_deployment_event(DeploymentEvent::WorkflowSkipped {
            deployment_id: crate::domain::environment::DeploymentId(1),
            skipped_at: Utc::now(),
        });
    }
}
