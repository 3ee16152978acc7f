//! Filament Core
//!
//! Core types, errors, and constants for the Filament virtual actor runtime.
//!
//! # Overview
//!
//! Filament is a single-process virtual actor runtime: callers address named,
//! stateful actors by (actor type, actor id); the runtime activates instances
//! on demand, serializes calls per instance, persists state through a
//! pluggable key-value store, and schedules durable reminders and ephemeral
//! timers.
//!
//! # Conventions
//!
//! - Explicit limits with unit-suffixed names (e.g. `ACTOR_ID_LENGTH_BYTES_MAX`)
//! - Structured errors with context, never silent failure
//! - All time reads go through [`clock::Clock`]

pub mod actor;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;

pub use actor::ActorId;
pub use clock::{Clock, ManualClock, WallClock};
pub use config::RuntimeConfig;
pub use constants::*;
pub use error::{Error, Result};
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
