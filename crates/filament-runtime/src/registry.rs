//! Actor type definitions and method dispatch registry
//!
//! An actor type is registered as a set of named method handlers plus
//! optional lifecycle and reminder hooks. Dispatch resolves the handler by
//! method name before any activation work happens, so a call to an unknown
//! method never activates an instance.

use crate::context::ActorContext;
use bytes::Bytes;
use filament_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by method handlers
pub type BoxedMethodFuture = Pin<Box<dyn Future<Output = Result<Bytes>> + Send>>;

/// Boxed future returned by lifecycle and reminder hooks
pub type BoxedHookFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A registered method handler
pub type MethodHandler = Arc<dyn Fn(ActorContext, Bytes) -> BoxedMethodFuture + Send + Sync>;

/// A registered lifecycle hook
pub type LifecycleHook = Arc<dyn Fn(ActorContext) -> BoxedHookFuture + Send + Sync>;

/// A registered reminder hook
pub type ReminderHook = Arc<dyn Fn(ActorContext, ReminderFire) -> BoxedHookFuture + Send + Sync>;

/// Delivery of a due reminder to its actor's reminder hook
#[derive(Debug, Clone)]
pub struct ReminderFire {
    /// Reminder name as registered
    pub name: String,
    /// Payload captured at registration
    pub payload: Bytes,
    /// Initial due delay, milliseconds
    pub due_ms: u64,
    /// Repeat period in milliseconds, zero for one-shot
    pub period_ms: u64,
    /// Time to live from registration, milliseconds
    pub ttl_ms: Option<u64>,
}

/// Definition of one actor type
///
/// Built through [`ActorTypeBuilder`]; immutable once registered with the
/// runtime.
pub struct ActorTypeDef {
    name: String,
    reentrancy_enabled: bool,
    methods: HashMap<String, MethodHandler>,
    on_activate: Option<LifecycleHook>,
    on_deactivate: Option<LifecycleHook>,
    on_reminder: Option<ReminderHook>,
}

impl ActorTypeDef {
    /// Start building an actor type definition
    pub fn builder(name: impl Into<String>) -> ActorTypeBuilder {
        ActorTypeBuilder {
            name: name.into(),
            reentrancy_enabled: false,
            methods: HashMap::new(),
            on_activate: None,
            on_deactivate: None,
            on_reminder: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether call chains rooted at this type may re-enter held instances
    pub fn reentrancy_enabled(&self) -> bool {
        self.reentrancy_enabled
    }

    /// Resolve a method handler by name
    pub fn method(&self, method: &str) -> Result<MethodHandler> {
        self.methods
            .get(method)
            .cloned()
            .ok_or_else(|| Error::method_not_found(&self.name, method))
    }

    pub(crate) fn on_activate(&self) -> Option<LifecycleHook> {
        self.on_activate.clone()
    }

    pub(crate) fn on_deactivate(&self) -> Option<LifecycleHook> {
        self.on_deactivate.clone()
    }

    pub(crate) fn on_reminder(&self) -> Option<ReminderHook> {
        self.on_reminder.clone()
    }
}

impl fmt::Debug for ActorTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("ActorTypeDef")
            .field("name", &self.name)
            .field("reentrancy_enabled", &self.reentrancy_enabled)
            .field("methods", &methods)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ActorTypeDef`]
pub struct ActorTypeBuilder {
    name: String,
    reentrancy_enabled: bool,
    methods: HashMap<String, MethodHandler>,
    on_activate: Option<LifecycleHook>,
    on_deactivate: Option<LifecycleHook>,
    on_reminder: Option<ReminderHook>,
}

impl ActorTypeBuilder {
    /// Register a named method handler
    ///
    /// Registering the same name twice replaces the earlier handler.
    pub fn method<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActorContext, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        self.methods.insert(
            name.into(),
            Arc::new(move |ctx, input| Box::pin(handler(ctx, input))),
        );
        self
    }

    /// Hook run once after an instance's state is ready, before its first call
    ///
    /// Must not invoke the actor it is activating; the instance is not
    /// callable until the hook returns.
    pub fn on_activate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_activate = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Hook run before an instance is deactivated
    pub fn on_deactivate<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActorContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_deactivate = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    /// Hook receiving every due reminder for instances of this type
    pub fn on_reminder<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActorContext, ReminderFire) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_reminder = Some(Arc::new(move |ctx, fire| Box::pin(hook(ctx, fire))));
        self
    }

    /// Allow call chains rooted at this type to re-enter held instances
    pub fn with_reentrancy(mut self, enabled: bool) -> Self {
        self.reentrancy_enabled = enabled;
        self
    }

    pub fn build(self) -> ActorTypeDef {
        ActorTypeDef {
            name: self.name,
            reentrancy_enabled: self.reentrancy_enabled,
            methods: self.methods,
            on_activate: self.on_activate,
            on_deactivate: self.on_deactivate,
            on_reminder: self.on_reminder,
        }
    }
}
