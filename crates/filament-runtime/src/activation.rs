//! Actor instances and the activation table
//!
//! The activation table maps actor ids to live instances and collapses
//! concurrent activations of the same id into one: every caller racing on a
//! cold id awaits the same initialization and observes the same instance. A
//! failed activation is not cached; the slot is removed so the next call
//! retries from scratch.

use crate::lock::InvocationLock;
use crate::registry::ActorTypeDef;
use crate::state::StateManager;
use filament_core::{ActorId, Error, Result};
use filament_storage::StateStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::debug;

/// One live actor instance
pub struct ActorInstance {
    id: ActorId,
    type_def: Arc<ActorTypeDef>,
    state: StateManager,
    lock: InvocationLock,
    /// Ephemeral timers owned by this instance, aborted on deactivation
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    activated_at_unix_ms: u64,
    last_activity_unix_ms: AtomicU64,
    /// Set during deactivation; a closed instance accepts no new calls
    closed: AtomicBool,
}

impl ActorInstance {
    pub(crate) fn new(
        id: ActorId,
        type_def: Arc<ActorTypeDef>,
        store: Arc<dyn StateStore>,
        now_unix_ms: u64,
    ) -> Self {
        Self {
            state: StateManager::new(id.clone(), store),
            id,
            type_def,
            lock: InvocationLock::new(),
            timers: Mutex::new(HashMap::new()),
            activated_at_unix_ms: now_unix_ms,
            last_activity_unix_ms: AtomicU64::new(now_unix_ms),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn type_def(&self) -> &Arc<ActorTypeDef> {
        &self.type_def
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub(crate) fn lock(&self) -> &InvocationLock {
        &self.lock
    }

    pub fn activated_at_unix_ms(&self) -> u64 {
        self.activated_at_unix_ms
    }

    pub(crate) fn touch(&self, now_unix_ms: u64) {
        self.last_activity_unix_ms
            .store(now_unix_ms, Ordering::SeqCst);
    }

    pub(crate) fn idle_ms(&self, now_unix_ms: u64) -> u64 {
        now_unix_ms.saturating_sub(self.last_activity_unix_ms.load(Ordering::SeqCst))
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Install an ephemeral timer task, replacing one with the same name
    pub(crate) fn install_timer(&self, name: &str, handle: JoinHandle<()>) {
        let mut timers = self.timers.lock().expect("timer table poisoned");
        if let Some(old) = timers.insert(name.to_string(), handle) {
            old.abort();
        }
    }

    /// Remove and abort a timer; false if no such timer
    pub(crate) fn cancel_timer(&self, name: &str) -> bool {
        let mut timers = self.timers.lock().expect("timer table poisoned");
        match timers.remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Remove a timer entry without aborting its task
    ///
    /// Used by a firing one-shot timer cleaning up after itself.
    pub(crate) fn forget_timer(&self, name: &str) {
        let mut timers = self.timers.lock().expect("timer table poisoned");
        timers.remove(name);
    }

    /// Names of currently registered timers
    pub fn timer_names(&self) -> Vec<String> {
        let timers = self.timers.lock().expect("timer table poisoned");
        timers.keys().cloned().collect()
    }

    /// Abort all timers; timers do not survive deactivation
    pub(crate) fn cancel_all_timers(&self) {
        let mut timers = self.timers.lock().expect("timer table poisoned");
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ActorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorInstance")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Shared slot in the activation table
type Slot = Arc<OnceCell<Arc<ActorInstance>>>;

/// Table of live actor instances, keyed by qualified actor name
pub struct ActivationTable {
    slots: Mutex<HashMap<String, Slot>>,
    max_live_count: usize,
}

impl ActivationTable {
    pub fn new(max_live_count: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            max_live_count,
        }
    }

    /// Get the live instance for `id`, activating it if needed
    ///
    /// Concurrent callers on a cold id share one activation: exactly one
    /// `activate` future runs, the rest await it. On activation failure the
    /// slot is removed so the id stays cold.
    pub async fn get_or_activate<F, Fut>(&self, id: &ActorId, activate: F) -> Result<Arc<ActorInstance>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<ActorInstance>>>,
    {
        let key = id.qualified_name();
        let slot = {
            let mut slots = self.slots.lock().expect("activation table poisoned");
            if !slots.contains_key(&key) && slots.len() >= self.max_live_count {
                return Err(Error::activation_failed(
                    &key,
                    format!("live actor limit {} reached", self.max_live_count),
                ));
            }
            slots.entry(key.clone()).or_default().clone()
        };

        let result = slot.get_or_try_init(|| activate()).await.cloned();

        if result.is_err() {
            // Only clear the slot if it is still ours and still empty;
            // another caller may have replaced it meanwhile.
            let mut slots = self.slots.lock().expect("activation table poisoned");
            if let Some(current) = slots.get(&key) {
                if Arc::ptr_eq(current, &slot) && current.get().is_none() {
                    slots.remove(&key);
                    debug!(actor_id = %key, "Cleared failed activation slot");
                }
            }
        }

        result
    }

    /// Get the live instance for `id` without activating
    pub fn get(&self, id: &ActorId) -> Option<Arc<ActorInstance>> {
        let slots = self.slots.lock().expect("activation table poisoned");
        slots
            .get(&id.qualified_name())
            .and_then(|slot| slot.get().cloned())
    }

    /// Remove the instance for `id` from the table
    pub fn remove(&self, id: &ActorId) -> Option<Arc<ActorInstance>> {
        let mut slots = self.slots.lock().expect("activation table poisoned");
        slots
            .remove(&id.qualified_name())
            .and_then(|slot| slot.get().cloned())
    }

    /// Snapshot of all live instances
    pub fn live_instances(&self) -> Vec<Arc<ActorInstance>> {
        let slots = self.slots.lock().expect("activation table poisoned");
        slots.values().filter_map(|slot| slot.get().cloned()).collect()
    }

    /// Number of occupied or initializing slots
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().expect("activation table poisoned");
        slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActorTypeDef;
    use filament_storage::MemoryStateStore;
    use std::sync::atomic::AtomicU32;

    fn bulb(id: &str) -> ActorId {
        ActorId::new("SmartBulb", id).unwrap()
    }

    fn make_instance(id: &ActorId) -> Arc<ActorInstance> {
        let def = Arc::new(ActorTypeDef::builder("SmartBulb").build());
        Arc::new(ActorInstance::new(
            id.clone(),
            def,
            Arc::new(MemoryStateStore::new()),
            1_000,
        ))
    }

    #[tokio::test]
    async fn test_concurrent_activation_collapses() {
        let table = Arc::new(ActivationTable::new(100));
        let activations = Arc::new(AtomicU32::new(0));
        let mut tasks = Vec::new();

        for _ in 0..16 {
            let table = table.clone();
            let activations = activations.clone();
            tasks.push(tokio::spawn(async move {
                let id = bulb("bulb1");
                table
                    .get_or_activate(&id, || {
                        let activations = activations.clone();
                        let id = id.clone();
                        async move {
                            activations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                            Ok(make_instance(&id))
                        }
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut instances = Vec::new();
        for task in tasks {
            instances.push(task.await.unwrap());
        }

        assert_eq!(activations.load(Ordering::SeqCst), 1);
        for pair in instances.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[tokio::test]
    async fn test_failed_activation_not_cached() {
        let table = ActivationTable::new(100);
        let id = bulb("bulb1");

        let err = table
            .get_or_activate(&id, || async {
                Err(Error::activation_failed("SmartBulb:bulb1", "boom"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ActivationFailed { .. }));
        assert!(table.get(&id).is_none());
        assert_eq!(table.len(), 0);

        // A later call activates fresh.
        let instance = table
            .get_or_activate(&id, || async { Ok(make_instance(&id)) })
            .await
            .unwrap();
        assert_eq!(instance.id(), &id);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_live_limit_enforced() {
        let table = ActivationTable::new(2);

        for i in 0..2 {
            let id = bulb(&format!("bulb{i}"));
            table
                .get_or_activate(&id, || async { Ok(make_instance(&id)) })
                .await
                .unwrap();
        }

        let id = bulb("bulb2");
        let err = table
            .get_or_activate(&id, || async { Ok(make_instance(&id)) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ActivationFailed { .. }));

        // An already-live id is unaffected by the limit.
        let id = bulb("bulb0");
        table
            .get_or_activate(&id, || async { Ok(make_instance(&id)) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_remove_frees_slot() {
        let table = ActivationTable::new(100);
        let id = bulb("bulb1");

        table
            .get_or_activate(&id, || async { Ok(make_instance(&id)) })
            .await
            .unwrap();
        assert!(table.remove(&id).is_some());
        assert!(table.get(&id).is_none());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_instance_idle_tracking() {
        let id = bulb("bulb1");
        let instance = make_instance(&id);

        assert_eq!(instance.idle_ms(1_500), 500);
        instance.touch(2_000);
        assert_eq!(instance.idle_ms(2_100), 100);
    }
}
