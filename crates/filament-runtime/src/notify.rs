//! Outbound notification hook
//!
//! Actors can publish small events (state changed, reminder fired) to an
//! external sink. Delivery is best effort and detached from the invocation:
//! a failing or slow publisher never fails or delays the actor call that
//! produced the event.

use async_trait::async_trait;
use bytes::Bytes;
use filament_core::{ActorId, Result};

/// Sink for actor-emitted notifications
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Publish one event on behalf of an actor
    async fn publish(&self, source: &ActorId, topic: &str, payload: Bytes) -> Result<()>;
}

/// Publisher that drops every event
#[derive(Debug, Clone, Default)]
pub struct NoopPublisher;

#[async_trait]
impl NotificationPublisher for NoopPublisher {
    async fn publish(&self, _source: &ActorId, _topic: &str, _payload: Bytes) -> Result<()> {
        Ok(())
    }
}
