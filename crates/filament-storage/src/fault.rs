//! Fault-injecting state store wrapper
//!
//! Wraps another store and fails reads or commits on demand. Used by runtime
//! tests to exercise the error-propagation contract (commit failure leaves the
//! backend unchanged, pending writes retained for retry).

use crate::store::{StateChange, StateStore};
use async_trait::async_trait;
use bytes::Bytes;
use filament_core::{ActorId, Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Store wrapper with switchable read/commit faults
pub struct FaultStore {
    inner: Arc<dyn StateStore>,
    fail_reads: AtomicBool,
    fail_commits: AtomicBool,
    commit_count: AtomicU64,
}

impl FaultStore {
    /// Wrap a store; all faults start disabled
    pub fn new(inner: Arc<dyn StateStore>) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_commits: AtomicBool::new(false),
            commit_count: AtomicU64::new(0),
        }
    }

    /// Enable or disable read failures
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Enable or disable commit failures
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits observed
    pub fn commit_count(&self) -> u64 {
        self.commit_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for FaultStore {
    async fn try_get(&self, owner: &ActorId, field: &str) -> Result<Option<Bytes>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::state_read_failed(
                format!("{}/{}", owner, field),
                "injected read fault",
            ));
        }
        self.inner.try_get(owner, field).await
    }

    async fn apply(&self, owner: &ActorId, changes: Vec<StateChange>) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            // Fail before touching the inner store so the backend stays unchanged.
            return Err(Error::state_commit_failed("injected commit fault"));
        }
        self.inner.apply(owner, changes).await?;
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_fields(&self, owner: &ActorId, prefix: &str) -> Result<Vec<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::state_read_failed(
                format!("{}/{}", owner, prefix),
                "injected read fault",
            ));
        }
        self.inner.list_fields(owner, prefix).await
    }
}
