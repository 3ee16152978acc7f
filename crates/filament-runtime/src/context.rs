//! Invocation context handed to actor method handlers
//!
//! The context carries everything a handler may touch: its own identity and
//! state, the call chain for onward invocations, and the scheduling and
//! notification surfaces. Onward calls made through [`ActorContext::invoke`]
//! stay on the caller's chain, which is what makes reentrancy detection
//! work.

use crate::activation::ActorInstance;
use crate::lock::CallChain;
use crate::runtime::RuntimeInner;
use crate::state::StateManager;
use bytes::Bytes;
use filament_core::{ActorId, Result};
use std::sync::Arc;
use tracing::warn;

/// Context for one invocation frame on one actor instance
#[derive(Clone)]
pub struct ActorContext {
    runtime: Arc<RuntimeInner>,
    instance: Arc<ActorInstance>,
    chain: CallChain,
}

impl ActorContext {
    pub(crate) fn new(
        runtime: Arc<RuntimeInner>,
        instance: Arc<ActorInstance>,
        chain: CallChain,
    ) -> Self {
        Self {
            runtime,
            instance,
            chain,
        }
    }

    /// Identity of the actor being invoked
    pub fn id(&self) -> &ActorId {
        self.instance.id()
    }

    /// This instance's buffered state
    pub fn state(&self) -> &StateManager {
        self.instance.state()
    }

    /// The call chain this frame runs on
    pub fn call_chain(&self) -> CallChain {
        self.chain
    }

    /// Whether the current call chain may re-enter actors it already holds
    pub fn reentrancy_enabled(&self) -> bool {
        self.chain.reentrant
    }

    /// Invoke another actor on the current call chain
    ///
    /// A call that loops back into an actor this chain already holds
    /// succeeds only when the chain is reentrant; otherwise it fails with
    /// a reentrancy rejection instead of deadlocking.
    pub async fn invoke(&self, target: &ActorId, method: &str, input: Bytes) -> Result<Bytes> {
        self.runtime
            .invoke_with_chain(target, method, input, self.chain)
            .await
    }

    /// Register or overwrite a durable reminder for this actor
    ///
    /// The record is persisted before any schedule is created; on
    /// persistence failure no reminder exists.
    pub async fn register_reminder(
        &self,
        name: &str,
        payload: Bytes,
        due_ms: u64,
        period_ms: u64,
        ttl_ms: Option<u64>,
    ) -> Result<()> {
        self.runtime
            .register_reminder(self.id(), name, payload, due_ms, period_ms, ttl_ms)
            .await
    }

    /// Unregister a reminder; `Ok(false)` if none existed
    pub async fn unregister_reminder(&self, name: &str) -> Result<bool> {
        self.runtime.unregister_reminder(self.id(), name).await
    }

    /// Register or overwrite an ephemeral timer for this actor
    ///
    /// The callback is the named method of this actor type, resolved at
    /// registration. Timers are never persisted and die with the instance.
    pub fn register_timer(
        &self,
        name: &str,
        method: &str,
        payload: Bytes,
        due_ms: u64,
        period_ms: u64,
    ) -> Result<()> {
        self.runtime
            .register_timer(&self.instance, name, method, payload, due_ms, period_ms)
    }

    /// Cancel a timer; false if no such timer
    pub fn unregister_timer(&self, name: &str) -> bool {
        self.instance.cancel_timer(name)
    }

    /// Names of this instance's registered timers
    pub fn timer_names(&self) -> Vec<String> {
        self.instance.timer_names()
    }

    /// Publish a notification, best effort
    ///
    /// Delivery runs detached from this invocation; a failing publisher is
    /// logged and never fails the actor call.
    pub fn publish(&self, topic: &str, payload: Bytes) {
        let publisher = self.runtime.publisher();
        let source = self.id().clone();
        let topic = topic.to_string();
        tokio::spawn(async move {
            if let Err(error) = publisher.publish(&source, &topic, payload).await {
                warn!(actor_id = %source, topic, %error, "Notification publish failed");
            }
        });
    }
}
