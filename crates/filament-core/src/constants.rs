//! Explicit limits for Filament
//!
//! All limits use most-significant-first naming and carry units in the name.

// =============================================================================
// Actor Identity Limits
// =============================================================================

/// Maximum length of an actor type name in bytes
pub const ACTOR_TYPE_LENGTH_BYTES_MAX: usize = 128;

/// Maximum length of an actor id in bytes
pub const ACTOR_ID_LENGTH_BYTES_MAX: usize = 256;

// =============================================================================
// State Limits
// =============================================================================

/// Maximum length of a state field name in bytes
pub const STATE_FIELD_LENGTH_BYTES_MAX: usize = 256;

/// Maximum size of a single state value in bytes (1 MB)
pub const STATE_VALUE_SIZE_BYTES_MAX: usize = 1024 * 1024;

/// Maximum number of pending (uncommitted) writes per state manager
pub const STATE_PENDING_WRITES_COUNT_MAX: usize = 10_000;

/// Field-name prefix reserved for runtime bookkeeping.
///
/// User state fields must not start with this prefix; reminder records are
/// persisted under it.
pub const STATE_FIELD_RESERVED_PREFIX: &str = "__";

/// Field-name prefix for persisted reminder records
pub const REMINDER_FIELD_PREFIX: &str = "__reminder__/";

// =============================================================================
// Scheduling Limits
// =============================================================================

/// Maximum length of a reminder or timer name in bytes
pub const SCHEDULE_NAME_LENGTH_BYTES_MAX: usize = 256;

/// Maximum size of a reminder payload in bytes (64 KB)
pub const REMINDER_PAYLOAD_SIZE_BYTES_MAX: usize = 64 * 1024;

// =============================================================================
// Runtime Limits
// =============================================================================

/// Maximum size of an invocation payload in bytes (1 MB)
pub const INVOCATION_PAYLOAD_SIZE_BYTES_MAX: usize = 1024 * 1024;

/// Maximum number of live actor instances per process
pub const ACTOR_LIVE_COUNT_MAX: usize = 1_000_000;

/// Default idle timeout before actor deactivation in milliseconds (5 min)
pub const ACTOR_IDLE_TIMEOUT_MS_DEFAULT: u64 = 5 * 60 * 1000;

/// Maximum idle timeout in milliseconds (1 hour)
pub const ACTOR_IDLE_TIMEOUT_MS_MAX: u64 = 60 * 60 * 1000;

/// Default interval between idle-deactivation sweeps in milliseconds (30 sec)
pub const IDLE_SWEEP_INTERVAL_MS_DEFAULT: u64 = 30 * 1000;

/// Maximum times an invocation re-resolves its target after losing a race
/// with deactivation
pub const ACTIVATION_RETRY_COUNT_MAX: usize = 8;

// Compile-time assertions for constant validity
const _: () = {
    assert!(ACTOR_ID_LENGTH_BYTES_MAX >= 64);
    assert!(ACTOR_TYPE_LENGTH_BYTES_MAX >= 32);
    assert!(STATE_VALUE_SIZE_BYTES_MAX <= 100 * 1024 * 1024);
    assert!(ACTOR_IDLE_TIMEOUT_MS_DEFAULT <= ACTOR_IDLE_TIMEOUT_MS_MAX);
    assert!(ACTIVATION_RETRY_COUNT_MAX >= 1);
};
