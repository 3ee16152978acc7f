//! Filament Runtime
//!
//! Actor activation, invocation routing, and scheduling.
//!
//! # Overview
//!
//! - [`ActorRuntime`]: entry point; register actor types, invoke by id
//! - [`activation`]: live instances and the activation table
//! - [`lock`]: per-instance invocation lock with call-chain reentrancy
//! - [`state`]: buffered per-instance state over a pluggable store
//! - [`scheduler`]: durable reminders and ephemeral timers
//! - [`notify`]: best-effort outbound notifications
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use filament_core::ActorId;
//! use filament_runtime::{ActorRuntime, ActorTypeDef};
//!
//! # async fn run() -> filament_core::Result<()> {
//! let runtime = ActorRuntime::builder()
//!     .register_actor_type(
//!         ActorTypeDef::builder("SmartBulb")
//!             .method("GetStatus", |ctx, _input| async move {
//!                 let status = ctx.state().try_get("status").await?;
//!                 Ok(status.unwrap_or_else(|| Bytes::from("off")))
//!             })
//!             .build(),
//!     )
//!     .build()?;
//!
//! let bulb = ActorId::new("SmartBulb", "bulb1")?;
//! let status = runtime.invoke(&bulb, "GetStatus", Bytes::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod context;
pub mod lock;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod state;

mod runtime;

pub use activation::{ActivationTable, ActorInstance};
pub use context::ActorContext;
pub use lock::{CallChain, InvocationGuard, InvocationLock};
pub use notify::{NoopPublisher, NotificationPublisher};
pub use registry::{ActorTypeBuilder, ActorTypeDef, ReminderFire};
pub use runtime::{ActorRuntime, RuntimeBuilder};
pub use scheduler::{ReminderRecord, SchedulerRegistry};
pub use state::StateManager;
