//! Runtime assembly and invocation routing
//!
//! [`ActorRuntime`] owns the registered actor types, the activation table,
//! the state store, and the scheduler. Every external call mints a fresh
//! call chain, resolves the method handler before any activation work, and
//! then runs the handler under the target instance's invocation lock. State
//! commits on handler success and rolls back on handler failure, so a
//! caller never observes a half-applied method.
//!
//! Background tasks (reminder delivery, timers, the idle sweeper) hold only
//! a weak reference to the runtime; dropping the runtime ends them.

use crate::activation::{ActivationTable, ActorInstance};
use crate::context::ActorContext;
use crate::lock::CallChain;
use crate::notify::{NoopPublisher, NotificationPublisher};
use crate::registry::{ActorTypeDef, MethodHandler, ReminderFire};
use crate::scheduler::{
    reminder_field, validate_schedule_name, validate_schedule_payload, ReminderRecord,
    SchedulerRegistry,
};
use bytes::Bytes;
use filament_core::constants::{
    ACTIVATION_RETRY_COUNT_MAX, INVOCATION_PAYLOAD_SIZE_BYTES_MAX, REMINDER_FIELD_PREFIX,
};
use filament_core::{ActorId, Clock, Error, Result, RuntimeConfig, WallClock};
use filament_storage::{MemoryStateStore, StateChange, StateStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Work to run on an instance under its invocation lock
enum Dispatch {
    Method { handler: MethodHandler, input: Bytes },
    Reminder { fire: ReminderFire },
}

/// Shared runtime internals
///
/// Background tasks capture a [`Weak`] to this; only [`ActorRuntime`] and
/// live [`ActorContext`]s hold strong references.
pub(crate) struct RuntimeInner {
    config: RuntimeConfig,
    types: HashMap<String, Arc<ActorTypeDef>>,
    table: ActivationTable,
    store: Arc<dyn StateStore>,
    scheduler: SchedulerRegistry,
    publisher: Arc<dyn NotificationPublisher>,
    clock: Arc<dyn Clock>,
    chain_counter: AtomicU64,
    shutdown: AtomicBool,
}

impl RuntimeInner {
    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub(crate) fn publisher(&self) -> Arc<dyn NotificationPublisher> {
        self.publisher.clone()
    }

    fn type_def(&self, actor_type: &str) -> Result<Arc<ActorTypeDef>> {
        self.types
            .get(actor_type)
            .cloned()
            .ok_or_else(|| Error::UnknownActorType {
                actor_type: actor_type.to_string(),
            })
    }

    fn mint_chain(&self, reentrant: bool) -> CallChain {
        CallChain {
            id: self.chain_counter.fetch_add(1, Ordering::Relaxed) + 1,
            reentrant,
        }
    }

    /// Route one invocation on an existing call chain
    pub(crate) async fn invoke_with_chain(
        self: &Arc<Self>,
        id: &ActorId,
        method: &str,
        input: Bytes,
        chain: CallChain,
    ) -> Result<Bytes> {
        if self.is_shut_down() {
            return Err(Error::internal("runtime is shut down"));
        }
        if input.len() > INVOCATION_PAYLOAD_SIZE_BYTES_MAX {
            return Err(Error::PayloadTooLarge {
                size: input.len(),
                limit: INVOCATION_PAYLOAD_SIZE_BYTES_MAX,
            });
        }

        let type_def = self.type_def(id.actor_type())?;
        // Resolved before activation: a call to an unknown method never
        // activates an instance.
        let handler = type_def.method(method)?;

        self.dispatch_serialized(id, &type_def, chain, method, Dispatch::Method { handler, input })
            .await
    }

    /// Activate `id`, then run `dispatch` under its invocation lock
    ///
    /// Retries when the instance closes between activation and lock
    /// acquisition (a deactivation race); each retry activates fresh.
    async fn dispatch_serialized(
        self: &Arc<Self>,
        id: &ActorId,
        type_def: &Arc<ActorTypeDef>,
        chain: CallChain,
        operation: &str,
        dispatch: Dispatch,
    ) -> Result<Bytes> {
        for _ in 0..ACTIVATION_RETRY_COUNT_MAX {
            let instance = self.activate_instance(id, type_def, chain).await?;
            if let Some(outcome) = self.run_locked(&instance, chain, operation, &dispatch).await {
                return outcome;
            }
        }
        Err(Error::activation_failed(
            id.qualified_name(),
            "instance kept deactivating during dispatch",
        ))
    }

    /// Run one dispatch under the instance lock; `None` if the instance
    /// closed before the lock was held
    async fn run_locked(
        self: &Arc<Self>,
        instance: &Arc<ActorInstance>,
        chain: CallChain,
        operation: &str,
        dispatch: &Dispatch,
    ) -> Option<Result<Bytes>> {
        let guard = match instance.lock().acquire(chain, instance.id(), operation).await {
            Ok(guard) => guard,
            Err(e) => return Some(Err(e)),
        };
        if instance.is_closed() {
            drop(guard);
            return None;
        }

        instance.touch(self.clock.now_unix_ms());
        let ctx = ActorContext::new(self.clone(), instance.clone(), chain);

        let result = match dispatch {
            Dispatch::Method { handler, input } => handler(ctx, input.clone()).await,
            Dispatch::Reminder { fire } => match instance.type_def().on_reminder() {
                Some(hook) => hook(ctx, fire.clone()).await.map(|()| Bytes::new()),
                None => Ok(Bytes::new()),
            },
        };

        // Only the outermost frame of a chain settles the state buffer.
        // An inner reentrant frame leaves its writes pending: committing
        // here would flush the outer frame's half-done writes, and rolling
        // back would discard them.
        let outcome = match result {
            // Commit failure surfaces as-is; pending writes stay buffered
            // so the caller can retry the method.
            Ok(output) if guard.is_outermost() => {
                instance.state().commit().await.map(|()| output)
            }
            Ok(output) => Ok(output),
            Err(e) => {
                if guard.is_outermost() {
                    instance.state().rollback();
                }
                Err(Error::method_failed(
                    instance.id().qualified_name(),
                    operation,
                    e,
                ))
            }
        };

        instance.touch(self.clock.now_unix_ms());
        drop(guard);
        Some(outcome)
    }

    /// Get or create the live instance for `id`
    ///
    /// Runs reminder recovery and the activation hook exactly once per
    /// activation; concurrent callers share the result.
    async fn activate_instance(
        self: &Arc<Self>,
        id: &ActorId,
        type_def: &Arc<ActorTypeDef>,
        chain: CallChain,
    ) -> Result<Arc<ActorInstance>> {
        self.table
            .get_or_activate(id, || {
                let runtime = self.clone();
                let id = id.clone();
                let type_def = type_def.clone();
                async move {
                    let instance = Arc::new(ActorInstance::new(
                        id.clone(),
                        type_def.clone(),
                        runtime.store.clone(),
                        runtime.clock.now_unix_ms(),
                    ));

                    runtime.recover_reminders(&instance).await;

                    if let Some(hook) = type_def.on_activate() {
                        let ctx = ActorContext::new(runtime.clone(), instance.clone(), chain);
                        hook(ctx).await.map_err(|e| {
                            Error::activation_failed(id.qualified_name(), e.to_string())
                        })?;
                        instance.state().commit().await.map_err(|e| {
                            Error::activation_failed(
                                id.qualified_name(),
                                format!("activation state commit: {e}"),
                            )
                        })?;
                    }

                    debug!(actor_id = %id, "Actor activated");
                    Ok(instance)
                }
            })
            .await
    }

    /// Resume delivery tasks for this actor's persisted reminders
    ///
    /// Unreadable records are skipped with a warning; expired records are
    /// deleted. Recovery failure never fails the activation itself.
    async fn recover_reminders(self: &Arc<Self>, instance: &Arc<ActorInstance>) {
        let id = instance.id();
        let fields = match self.store.list_fields(id, REMINDER_FIELD_PREFIX).await {
            Ok(fields) => fields,
            Err(error) => {
                warn!(actor_id = %id, %error, "Reminder recovery read failed");
                return;
            }
        };

        for field in fields {
            let name = field
                .strip_prefix(REMINDER_FIELD_PREFIX)
                .unwrap_or(&field)
                .to_string();
            if self.scheduler.contains(id, &name) {
                continue;
            }

            let bytes = match self.store.try_get(id, &field).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(error) => {
                    warn!(actor_id = %id, reminder = %name, %error, "Reminder record read failed");
                    continue;
                }
            };
            let record: ReminderRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(error) => {
                    warn!(actor_id = %id, reminder = %name, %error, "Skipping unreadable reminder record");
                    continue;
                }
            };

            let now = self.clock.now_unix_ms();
            if record.is_expired(now) {
                if let Err(error) = self
                    .store
                    .apply(id, vec![StateChange::Remove { field: field.clone() }])
                    .await
                {
                    warn!(actor_id = %id, reminder = %name, %error, "Expired reminder cleanup failed");
                }
                continue;
            }

            let delay_ms = record.recovery_delay_ms(now);
            debug!(actor_id = %id, reminder = %name, delay_ms, "Recovered reminder");
            self.spawn_reminder_task(id.clone(), record, delay_ms);
        }
    }

    /// Register or overwrite a durable reminder
    pub(crate) async fn register_reminder(
        self: &Arc<Self>,
        owner: &ActorId,
        name: &str,
        payload: Bytes,
        due_ms: u64,
        period_ms: u64,
        ttl_ms: Option<u64>,
    ) -> Result<()> {
        validate_schedule_name(name)?;
        validate_schedule_payload(name, &payload)?;

        let record = ReminderRecord {
            name: name.to_string(),
            payload,
            due_ms,
            period_ms,
            ttl_ms,
            registered_at_unix_ms: self.clock.now_unix_ms(),
        };
        let value = serde_json::to_vec(&record).map_err(|e| Error::SerializationFailed {
            reason: format!("reminder {name}: {e}"),
        })?;

        // Persist before scheduling: a record that failed to persist must
        // not leave a task running.
        self.store
            .apply(
                owner,
                vec![StateChange::Set {
                    field: record.field(),
                    value: Bytes::from(value),
                }],
            )
            .await
            .map_err(|e| {
                Error::scheduler_persistence_failed(owner.qualified_name(), name, e.to_string())
            })?;

        let delay_ms = record.due_ms;
        self.spawn_reminder_task(owner.clone(), record, delay_ms);
        debug!(actor_id = %owner, reminder = name, due_ms, period_ms, "Reminder registered");
        Ok(())
    }

    /// Unregister a reminder; `Ok(false)` if none existed
    pub(crate) async fn unregister_reminder(
        self: &Arc<Self>,
        owner: &ActorId,
        name: &str,
    ) -> Result<bool> {
        validate_schedule_name(name)?;
        let field = reminder_field(name);

        let existed = self.store.contains(owner, &field).await.map_err(|e| {
            Error::scheduler_persistence_failed(owner.qualified_name(), name, e.to_string())
        })?;

        // Record deletion comes first; aborting the task before a failed
        // delete would resurrect the reminder at the next activation.
        self.store
            .apply(owner, vec![StateChange::Remove { field }])
            .await
            .map_err(|e| {
                Error::scheduler_persistence_failed(owner.qualified_name(), name, e.to_string())
            })?;

        let had_task = self.scheduler.remove(owner, name);
        Ok(existed || had_task)
    }

    /// Start the delivery task for a reminder
    fn spawn_reminder_task(
        self: &Arc<Self>,
        owner: ActorId,
        record: ReminderRecord,
        initial_delay_ms: u64,
    ) {
        let weak = Arc::downgrade(self);
        let name = record.name.clone();
        let task_owner = owner.clone();

        let handle = tokio::spawn(async move {
            let mut delay_ms = initial_delay_ms;
            loop {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let Some(runtime) = weak.upgrade() else { return };
                if runtime.is_shut_down() {
                    return;
                }

                if record.is_expired(runtime.clock.now_unix_ms()) {
                    runtime.cleanup_reminder(&task_owner, &record.name).await;
                    return;
                }

                // Delivery runs detached so an unregister abort cannot kill
                // a firing already in flight.
                let deliver_runtime = runtime.clone();
                let deliver_owner = task_owner.clone();
                let deliver_record = record.clone();
                tokio::spawn(async move {
                    deliver_runtime
                        .deliver_reminder(&deliver_owner, &deliver_record)
                        .await;
                });

                if record.period_ms == 0 {
                    runtime.cleanup_reminder(&task_owner, &record.name).await;
                    return;
                }
                delay_ms = record.period_ms;
            }
        });

        self.scheduler.insert(&owner, &name, handle);
    }

    /// Delete a reminder record and drop its finished task entry
    async fn cleanup_reminder(&self, owner: &ActorId, name: &str) {
        let field = reminder_field(name);
        if let Err(error) = self
            .store
            .apply(owner, vec![StateChange::Remove { field }])
            .await
        {
            warn!(actor_id = %owner, reminder = name, %error, "Reminder record cleanup failed");
        }
        self.scheduler.forget(owner, name);
    }

    /// Deliver one due reminder, activating the owner if needed
    async fn deliver_reminder(self: &Arc<Self>, owner: &ActorId, record: &ReminderRecord) {
        let type_def = match self.type_def(owner.actor_type()) {
            Ok(def) => def,
            Err(error) => {
                warn!(actor_id = %owner, reminder = %record.name, %error, "Dropping reminder firing");
                return;
            }
        };

        let chain = self.mint_chain(type_def.reentrancy_enabled());
        let fire = ReminderFire {
            name: record.name.clone(),
            payload: record.payload.clone(),
            due_ms: record.due_ms,
            period_ms: record.period_ms,
            ttl_ms: record.ttl_ms,
        };
        let operation = format!("reminder:{}", record.name);

        if let Err(error) = self
            .dispatch_serialized(owner, &type_def, chain, &operation, Dispatch::Reminder { fire })
            .await
        {
            warn!(actor_id = %owner, reminder = %record.name, %error, "Reminder delivery failed");
        }
    }

    /// Register or overwrite an ephemeral timer on a live instance
    pub(crate) fn register_timer(
        self: &Arc<Self>,
        instance: &Arc<ActorInstance>,
        name: &str,
        method: &str,
        payload: Bytes,
        due_ms: u64,
        period_ms: u64,
    ) -> Result<()> {
        validate_schedule_name(name)?;
        validate_schedule_payload(name, &payload)?;
        // A bad callback name fails registration, not the first firing.
        instance.type_def().method(method)?;

        let weak = Arc::downgrade(self);
        let owner = instance.id().clone();
        let timer_name = name.to_string();
        let method = method.to_string();

        let handle = tokio::spawn(async move {
            let mut delay_ms = due_ms;
            loop {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let Some(runtime) = weak.upgrade() else { return };
                if runtime.is_shut_down() {
                    return;
                }

                let deliver_runtime = runtime.clone();
                let deliver_owner = owner.clone();
                let deliver_name = timer_name.clone();
                let deliver_method = method.clone();
                let deliver_payload = payload.clone();
                tokio::spawn(async move {
                    deliver_runtime
                        .deliver_timer(
                            &deliver_owner,
                            &deliver_name,
                            &deliver_method,
                            deliver_payload,
                        )
                        .await;
                });

                if period_ms == 0 {
                    if let Some(instance) = runtime.table.get(&owner) {
                        instance.forget_timer(&timer_name);
                    }
                    return;
                }
                delay_ms = period_ms;
            }
        });

        instance.install_timer(name, handle);
        debug!(actor_id = %instance.id(), timer = name, due_ms, period_ms, "Timer registered");
        Ok(())
    }

    /// Deliver one due timer firing
    ///
    /// Timers never activate: if the owner is gone the firing is dropped.
    async fn deliver_timer(self: &Arc<Self>, owner: &ActorId, name: &str, method: &str, payload: Bytes) {
        let Some(instance) = self.table.get(owner) else {
            return;
        };
        if instance.is_closed() {
            return;
        }

        let type_def = instance.type_def().clone();
        let handler = match type_def.method(method) {
            Ok(handler) => handler,
            Err(error) => {
                warn!(actor_id = %owner, timer = name, %error, "Dropping timer firing");
                return;
            }
        };

        let chain = self.mint_chain(type_def.reentrancy_enabled());
        let operation = format!("timer:{name}");

        match self
            .run_locked(
                &instance,
                chain,
                &operation,
                &Dispatch::Method {
                    handler,
                    input: payload,
                },
            )
            .await
        {
            Some(Err(error)) => {
                warn!(actor_id = %owner, timer = name, %error, "Timer delivery failed");
            }
            // None: the instance closed under us; the firing is lost, which
            // is the timer contract.
            Some(Ok(_)) | None => {}
        }
    }

    /// Deactivate `id`; `Ok(false)` if it was not active
    ///
    /// Waits for the in-flight invocation (if any), runs the deactivation
    /// hook, cancels timers, and removes the instance. Reminder delivery
    /// tasks keep running; their next firing reactivates the actor.
    pub(crate) async fn deactivate(self: &Arc<Self>, id: &ActorId) -> Result<bool> {
        let Some(instance) = self.table.get(id) else {
            return Ok(false);
        };

        let chain = self.mint_chain(false);
        let guard = instance.lock().acquire(chain, id, "deactivate").await?;
        if instance.is_closed() {
            return Ok(false);
        }
        instance.close();

        if let Some(hook) = instance.type_def().on_deactivate() {
            let ctx = ActorContext::new(self.clone(), instance.clone(), chain);
            match hook(ctx).await {
                Ok(()) => {
                    if let Err(error) = instance.state().commit().await {
                        warn!(actor_id = %id, %error, "Deactivation state commit failed");
                    }
                }
                Err(error) => {
                    instance.state().rollback();
                    warn!(actor_id = %id, %error, "Deactivation hook failed");
                }
            }
        }

        instance.cancel_all_timers();
        self.table.remove(id);
        drop(guard);

        info!(actor_id = %id, "Actor deactivated");
        Ok(true)
    }

    /// Deactivate instances idle past the configured timeout
    async fn sweep_idle(self: &Arc<Self>) {
        let now = self.clock.now_unix_ms();
        for instance in self.table.live_instances() {
            if instance.is_closed() {
                continue;
            }
            if instance.idle_ms(now) < self.config.idle_timeout_ms {
                continue;
            }
            if !instance.lock().is_free() {
                continue;
            }
            if let Err(error) = self.deactivate(instance.id()).await {
                warn!(actor_id = %instance.id(), %error, "Idle deactivation failed");
            }
        }
    }

    async fn shutdown(self: &Arc<Self>) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scheduler.abort_all();
        for instance in self.table.live_instances() {
            if let Err(error) = self.deactivate(instance.id()).await {
                warn!(actor_id = %instance.id(), %error, "Deactivation during shutdown failed");
            }
        }
        info!("Runtime shut down");
    }
}

/// The virtual actor runtime
///
/// Build one with [`ActorRuntime::builder`], register actor types, then
/// invoke actors by [`ActorId`]. Instances activate on demand and are
/// reclaimed when idle.
pub struct ActorRuntime {
    inner: Arc<RuntimeInner>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ActorRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Invoke a method on an actor, activating it if needed
    ///
    /// Calls on one instance never interleave. The started call chain
    /// carries the root type's reentrancy setting.
    #[instrument(skip(self, input), fields(actor_id = %id, method))]
    pub async fn invoke(&self, id: &ActorId, method: &str, input: Bytes) -> Result<Bytes> {
        let type_def = self.inner.type_def(id.actor_type())?;
        let chain = self.inner.mint_chain(type_def.reentrancy_enabled());
        self.inner.invoke_with_chain(id, method, input, chain).await
    }

    /// Register or overwrite a durable reminder for an actor
    pub async fn register_reminder(
        &self,
        id: &ActorId,
        name: &str,
        payload: Bytes,
        due_ms: u64,
        period_ms: u64,
        ttl_ms: Option<u64>,
    ) -> Result<()> {
        self.inner.type_def(id.actor_type())?;
        self.inner
            .register_reminder(id, name, payload, due_ms, period_ms, ttl_ms)
            .await
    }

    /// Unregister a reminder; `Ok(false)` if none existed
    pub async fn unregister_reminder(&self, id: &ActorId, name: &str) -> Result<bool> {
        self.inner.unregister_reminder(id, name).await
    }

    /// Deactivate an actor; `Ok(false)` if it was not active
    pub async fn deactivate(&self, id: &ActorId) -> Result<bool> {
        self.inner.deactivate(id).await
    }

    /// Whether an instance is currently live
    pub fn is_active(&self, id: &ActorId) -> bool {
        self.inner.table.get(id).is_some()
    }

    /// Number of live (or activating) instances
    pub fn live_actor_count(&self) -> usize {
        self.inner.table.len()
    }

    /// Number of running reminder delivery tasks
    pub fn reminder_task_count(&self) -> usize {
        self.inner.scheduler.len()
    }

    /// Stop background work and deactivate every live instance
    pub async fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper handle poisoned").take() {
            handle.abort();
        }
        self.inner.shutdown().await;
    }
}

impl std::fmt::Debug for ActorRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRuntime")
            .field("actor_types", &self.inner.types.len())
            .field("live_actors", &self.inner.table.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ActorRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper handle poisoned").take() {
            handle.abort();
        }
        // Reminder and timer tasks hold weak references and end on their
        // own once the inner runtime is gone.
        self.inner.scheduler.abort_all();
    }
}

/// Builder for [`ActorRuntime`]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    store: Arc<dyn StateStore>,
    publisher: Arc<dyn NotificationPublisher>,
    clock: Arc<dyn Clock>,
    types: HashMap<String, Arc<ActorTypeDef>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            store: Arc::new(MemoryStateStore::new()),
            publisher: Arc::new(NoopPublisher),
            clock: Arc::new(WallClock::new()),
            types: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a persistent state store instead of the in-memory default
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn NotificationPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an actor type; replaces a previous type with the same name
    pub fn register_actor_type(mut self, def: ActorTypeDef) -> Self {
        self.types.insert(def.name().to_string(), Arc::new(def));
        self
    }

    /// Validate the configuration and start the runtime
    ///
    /// Must run inside a tokio runtime; the idle sweeper is spawned here
    /// when enabled.
    pub fn build(self) -> Result<ActorRuntime> {
        self.config.validate()?;

        let inner = Arc::new(RuntimeInner {
            table: ActivationTable::new(self.config.max_live_actors_count),
            config: self.config,
            types: self.types,
            store: self.store,
            scheduler: SchedulerRegistry::new(),
            publisher: self.publisher,
            clock: self.clock,
            chain_counter: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });

        let sweeper = if inner.config.idle_sweep_enabled {
            Some(Self::spawn_sweeper(&inner))
        } else {
            None
        };

        info!(
            actor_types = inner.types.len(),
            idle_sweep = inner.config.idle_sweep_enabled,
            "Runtime started"
        );
        Ok(ActorRuntime {
            inner,
            sweeper: Mutex::new(sweeper),
        })
    }

    fn spawn_sweeper(inner: &Arc<RuntimeInner>) -> JoinHandle<()> {
        let weak: Weak<RuntimeInner> = Arc::downgrade(inner);
        let interval_ms = inner.config.idle_sweep_interval_ms;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                let Some(runtime) = weak.upgrade() else { return };
                if runtime.is_shut_down() {
                    return;
                }
                runtime.sweep_idle().await;
            }
        })
    }
}
