//! Reminder records and the scheduler task registry
//!
//! Reminders are durable: each one is persisted as a JSON record in its
//! owner's state under the reserved `__reminder__/` field prefix, and a
//! tokio task drives its delivery while the process is up. After a restart
//! the records are recovered on the owner's next activation; a reminder that
//! came due while the process was down fires immediately once and then
//! resumes its period. Timers share the delivery path but are never
//! persisted; they live in their owner's instance and die with it.

use bytes::Bytes;
use filament_core::constants::{
    REMINDER_FIELD_PREFIX, REMINDER_PAYLOAD_SIZE_BYTES_MAX, SCHEDULE_NAME_LENGTH_BYTES_MAX,
};
use filament_core::{ActorId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::task::JoinHandle;

/// Persisted form of one reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderRecord {
    /// Reminder name, unique per owner
    pub name: String,
    /// Opaque payload handed back to the reminder hook on every firing
    pub payload: Bytes,
    /// Delay from registration to first firing, milliseconds
    pub due_ms: u64,
    /// Repeat period in milliseconds, zero for one-shot
    pub period_ms: u64,
    /// Lifetime from registration, milliseconds; `None` lives until
    /// unregistered
    pub ttl_ms: Option<u64>,
    /// Wall-clock registration time, milliseconds since epoch
    pub registered_at_unix_ms: u64,
}

impl ReminderRecord {
    /// State field holding this record
    pub fn field(&self) -> String {
        reminder_field(&self.name)
    }

    /// Absolute expiry time, if a ttl was set
    pub fn expires_at_unix_ms(&self) -> Option<u64> {
        self.ttl_ms
            .map(|ttl| self.registered_at_unix_ms.saturating_add(ttl))
    }

    /// Whether the record has outlived its ttl
    pub fn is_expired(&self, now_unix_ms: u64) -> bool {
        self.expires_at_unix_ms()
            .is_some_and(|expiry| now_unix_ms >= expiry)
    }

    /// Delay until the next firing for a freshly recovered record
    ///
    /// A firing missed while the process was down is not replayed per
    /// occurrence; the reminder fires once immediately and resumes its
    /// schedule from there.
    pub fn recovery_delay_ms(&self, now_unix_ms: u64) -> u64 {
        let first_due = self.registered_at_unix_ms.saturating_add(self.due_ms);
        if now_unix_ms < first_due {
            first_due - now_unix_ms
        } else {
            // Came due while down: one immediate firing, then the period
            // resumes from that firing.
            0
        }
    }
}

/// State field name for a reminder
pub fn reminder_field(name: &str) -> String {
    format!("{REMINDER_FIELD_PREFIX}{name}")
}

/// Validate a reminder or timer name
pub fn validate_schedule_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSchedule {
            name: name.to_string(),
            reason: "name must not be empty".into(),
        });
    }
    if name.len() > SCHEDULE_NAME_LENGTH_BYTES_MAX {
        return Err(Error::InvalidSchedule {
            name: name.to_string(),
            reason: format!(
                "name length {} exceeds limit {}",
                name.len(),
                SCHEDULE_NAME_LENGTH_BYTES_MAX
            ),
        });
    }
    Ok(())
}

/// Validate a reminder payload
pub fn validate_schedule_payload(name: &str, payload: &Bytes) -> Result<()> {
    if payload.len() > REMINDER_PAYLOAD_SIZE_BYTES_MAX {
        return Err(Error::InvalidSchedule {
            name: name.to_string(),
            reason: format!(
                "payload size {} exceeds limit {}",
                payload.len(),
                REMINDER_PAYLOAD_SIZE_BYTES_MAX
            ),
        });
    }
    Ok(())
}

/// Registry of running reminder tasks, keyed by owner and name
///
/// Tracks only in-process delivery tasks; durability lives in the state
/// store records.
#[derive(Default)]
pub struct SchedulerRegistry {
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(owner: &ActorId, name: &str) -> String {
        format!("{}|{}", owner.qualified_name(), name)
    }

    /// Install a delivery task, aborting any previous task for the same
    /// reminder
    pub fn insert(&self, owner: &ActorId, name: &str, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().expect("scheduler registry poisoned");
        if let Some(old) = tasks.insert(Self::key(owner, name), handle) {
            old.abort();
        }
    }

    /// Remove and abort a delivery task; false if none was running
    pub fn remove(&self, owner: &ActorId, name: &str) -> bool {
        let mut tasks = self.tasks.lock().expect("scheduler registry poisoned");
        match tasks.remove(&Self::key(owner, name)) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Remove a task entry without aborting it
    ///
    /// A finishing task calls this on itself; aborting here would kill the
    /// caller mid-cleanup.
    pub fn forget(&self, owner: &ActorId, name: &str) {
        let mut tasks = self.tasks.lock().expect("scheduler registry poisoned");
        tasks.remove(&Self::key(owner, name));
    }

    /// Whether a delivery task is running for this reminder
    pub fn contains(&self, owner: &ActorId, name: &str) -> bool {
        let tasks = self.tasks.lock().expect("scheduler registry poisoned");
        tasks.contains_key(&Self::key(owner, name))
    }

    /// Number of running delivery tasks
    pub fn len(&self) -> usize {
        let tasks = self.tasks.lock().expect("scheduler registry poisoned");
        tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every delivery task; used at shutdown
    pub fn abort_all(&self) {
        let mut tasks = self.tasks.lock().expect("scheduler registry poisoned");
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(due_ms: u64, period_ms: u64, ttl_ms: Option<u64>) -> ReminderRecord {
        ReminderRecord {
            name: "smartbulb_reminder".into(),
            payload: Bytes::from("reminder state"),
            due_ms,
            period_ms,
            ttl_ms,
            registered_at_unix_ms: 10_000,
        }
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let rec = record(5_000, 5_000, Some(60_000));
        let json = serde_json::to_vec(&rec).unwrap();
        let back: ReminderRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.name, rec.name);
        assert_eq!(back.payload, rec.payload);
        assert_eq!(back.period_ms, 5_000);
        assert_eq!(back.expires_at_unix_ms(), Some(70_000));
    }

    #[test]
    fn test_reminder_field_uses_reserved_prefix() {
        let rec = record(0, 0, None);
        assert_eq!(rec.field(), "__reminder__/smartbulb_reminder");
    }

    #[test]
    fn test_expiry() {
        let rec = record(5_000, 5_000, Some(60_000));
        assert!(!rec.is_expired(69_999));
        assert!(rec.is_expired(70_000));

        let no_ttl = record(5_000, 5_000, None);
        assert!(!no_ttl.is_expired(u64::MAX));
    }

    #[test]
    fn test_recovery_delay_before_first_due() {
        // Registered at 10_000, due at 15_000.
        let rec = record(5_000, 5_000, None);
        assert_eq!(rec.recovery_delay_ms(12_000), 3_000);
    }

    #[test]
    fn test_recovery_delay_missed_firing_is_immediate() {
        let rec = record(5_000, 5_000, None);
        // Past the first due time: fire now, not once per missed period.
        assert_eq!(rec.recovery_delay_ms(27_500), 0);

        let one_shot = record(5_000, 0, None);
        assert_eq!(one_shot.recovery_delay_ms(1_000_000), 0);
    }

    #[tokio::test]
    async fn test_registry_insert_aborts_previous() {
        let registry = SchedulerRegistry::new();
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();

        let first = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        registry.insert(&owner, "r1", first);

        let second = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        registry.insert(&owner, "r1", second);

        assert_eq!(registry.len(), 1);
        assert!(registry.remove(&owner, "r1"));
        assert!(!registry.remove(&owner, "r1"));
    }

    #[tokio::test]
    async fn test_registry_forget_leaves_task_running() {
        let registry = SchedulerRegistry::new();
        let owner = ActorId::new("SmartBulb", "bulb1").unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let _ = rx.await;
        });
        registry.insert(&owner, "r1", task);
        registry.forget(&owner, "r1");
        assert!(!registry.contains(&owner, "r1"));

        // The task is still alive and completes normally.
        tx.send(()).unwrap();
    }

    #[test]
    fn test_schedule_name_validation() {
        assert!(validate_schedule_name("smartbulb_reminder").is_ok());
        assert!(validate_schedule_name("").is_err());
        assert!(validate_schedule_name(&"x".repeat(SCHEDULE_NAME_LENGTH_BYTES_MAX + 1)).is_err());
    }
}
