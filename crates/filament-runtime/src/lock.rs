//! Per-instance invocation lock with call-chain reentrancy
//!
//! Every actor instance owns one [`InvocationLock`]. A call acquires it for
//! the full logical duration of the invocation, including suspension points,
//! so calls on one instance never interleave. A call chain that loops back
//! into an instance it already holds bypasses the lock instead of deadlocking
//! on itself; when the chain's root actor type has reentrancy disabled, the
//! self-loop is rejected with an explicit error.

use filament_core::{ActorId, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Identity of a call chain, threaded explicitly through every invocation
///
/// Minted at the chain root (the first external invocation). The `reentrant`
/// flag carries the root actor type's reentrancy setting; it decides whether
/// a self-loop bypasses the instance lock or is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallChain {
    /// Opaque chain id, unique within the process
    pub id: u64,
    /// Whether this chain may re-enter instances it already holds
    pub reentrant: bool,
}

/// Current holder of an invocation lock
#[derive(Debug)]
struct Owner {
    chain_id: u64,
    depth: u32,
}

/// Mutual exclusion for one actor instance
pub struct InvocationLock {
    semaphore: Arc<Semaphore>,
    owner: Arc<Mutex<Option<Owner>>>,
}

impl InvocationLock {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            owner: Arc::new(Mutex::new(None)),
        }
    }

    /// Acquire the lock for the given call chain
    ///
    /// Blocks until the lock is free, except when `chain` already owns it:
    /// a reentrant chain proceeds immediately at increased depth, a
    /// non-reentrant chain is rejected (never silently deadlocked).
    pub async fn acquire(
        &self,
        chain: CallChain,
        id: &ActorId,
        operation: &str,
    ) -> Result<InvocationGuard> {
        {
            let mut owner = self.owner.lock().expect("invocation lock poisoned");
            if let Some(own) = owner.as_mut() {
                if own.chain_id == chain.id {
                    if !chain.reentrant {
                        return Err(Error::ReentrancyRejected {
                            id: id.qualified_name(),
                            method: operation.to_string(),
                        });
                    }
                    // The outer frame of this chain is suspended awaiting us,
                    // so the owner entry cannot change underneath us.
                    own.depth += 1;
                    return Ok(InvocationGuard {
                        permit: None,
                        owner: self.owner.clone(),
                    });
                }
            }
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::internal("invocation lock closed"))?;

        let mut owner = self.owner.lock().expect("invocation lock poisoned");
        debug_assert!(owner.is_none(), "lock acquired while owner recorded");
        *owner = Some(Owner {
            chain_id: chain.id,
            depth: 1,
        });

        Ok(InvocationGuard {
            permit: Some(permit),
            owner: self.owner.clone(),
        })
    }

    /// Whether the lock is currently free
    pub fn is_free(&self) -> bool {
        self.semaphore.available_permits() > 0
    }
}

impl Default for InvocationLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard released when an invocation frame unwinds
///
/// The outermost frame of a chain holds the semaphore permit; reentrant
/// frames only adjust the depth counter.
pub struct InvocationGuard {
    permit: Option<OwnedSemaphorePermit>,
    owner: Arc<Mutex<Option<Owner>>>,
}

impl InvocationGuard {
    /// Whether this guard is the outermost frame of its chain on this
    /// instance (the one holding the semaphore permit)
    pub fn is_outermost(&self) -> bool {
        self.permit.is_some()
    }
}

impl std::fmt::Debug for InvocationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationGuard")
            .field("outermost", &self.is_outermost())
            .finish()
    }
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        let mut owner = self.owner.lock().expect("invocation lock poisoned");
        match owner.as_mut() {
            Some(own) if own.depth > 1 => {
                own.depth -= 1;
            }
            _ => {
                *owner = None;
            }
        }
        // `permit` drops afterwards, releasing the semaphore for the
        // outermost frame.
        let _ = self.permit.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn bulb() -> ActorId {
        ActorId::new("SmartBulb", "bulb1").unwrap()
    }

    fn chain(id: u64, reentrant: bool) -> CallChain {
        CallChain { id, reentrant }
    }

    #[tokio::test]
    async fn test_lock_serializes_distinct_chains() {
        let lock = Arc::new(InvocationLock::new());
        let counter = Arc::new(AtomicU64::new(0));
        let mut tasks = Vec::new();

        for i in 0..8u64 {
            let lock = lock.clone();
            let counter = counter.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = lock.acquire(chain(i + 1, false), &bulb(), "op").await.unwrap();
                // Read-sleep-write: interleaving would lose increments.
                let seen = counter.load(Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                counter.store(seen + 1, Ordering::SeqCst);
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_reentrant_chain_bypasses_lock() {
        let lock = InvocationLock::new();
        let c = chain(7, true);

        let outer = lock.acquire(c, &bulb(), "outer").await.unwrap();
        // Same chain re-enters without blocking.
        let inner = lock.acquire(c, &bulb(), "inner").await.unwrap();
        drop(inner);
        drop(outer);

        assert!(lock.is_free());
    }

    #[tokio::test]
    async fn test_non_reentrant_self_loop_rejected() {
        let lock = InvocationLock::new();
        let c = chain(9, false);

        let _outer = lock.acquire(c, &bulb(), "outer").await.unwrap();
        let err = lock.acquire(c, &bulb(), "inner").await.unwrap_err();
        assert!(matches!(err, Error::ReentrancyRejected { .. }));
    }

    #[tokio::test]
    async fn test_lock_released_after_reentrant_unwind() {
        let lock = InvocationLock::new();
        let c = chain(3, true);

        let outer = lock.acquire(c, &bulb(), "outer").await.unwrap();
        let inner = lock.acquire(c, &bulb(), "inner").await.unwrap();
        assert!(!lock.is_free());

        drop(inner);
        // Inner unwind alone must not release the lock.
        assert!(!lock.is_free());

        drop(outer);
        assert!(lock.is_free());

        // A different chain can now acquire.
        let _next = lock.acquire(chain(4, false), &bulb(), "op").await.unwrap();
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let lock = Arc::new(InvocationLock::new());
        let guard = lock.acquire(chain(1, false), &bulb(), "op").await.unwrap();

        let lock2 = lock.clone();
        let waiter = tokio::spawn(async move {
            let _guard = lock2.acquire(chain(2, false), &bulb(), "op").await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }
}
