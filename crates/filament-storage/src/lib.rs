//! Filament Storage
//!
//! State store interface and backends for Filament actors.
//!
//! Actor state lives in an external key-value backend, keyed by
//! `(actor type, actor id, field name)`. The runtime buffers writes per
//! instance and flushes them through [`StateStore::apply`], which is atomic:
//! either every change in a commit lands or none do.

pub mod fault;
pub mod memory;
pub mod store;

pub use fault::FaultStore;
pub use memory::MemoryStateStore;
pub use store::{StateChange, StateStore};
