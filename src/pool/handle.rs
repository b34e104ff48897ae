use super::store::LocalPool;
use crate::error::{PoolError, Result};
use crate::ids::ObjectId;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::time::Duration;
use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

/// How long a caller is willing to wait for a pool mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexTimeout {
    Blocking,
    Polling,
    Waiting(Duration),
}

impl MutexTimeout {
    pub fn from_millis(ms: u32) -> Self {
        MutexTimeout::Waiting(Duration::from_millis(u64::from(ms)))
    }
}

impl Default for MutexTimeout {
    fn default() -> Self {
        MutexTimeout::Waiting(Duration::from_millis(20))
    }
}

#[derive(Debug)]
struct PoolShared {
    owner_id: ObjectId,
    lock_timeout: MutexTimeout,
    pool: Mutex<LocalPool>,
}

/// Shared reference to one owner's local pool and its mutex.
///
/// The manager creates the handle; accessors and datasets clone it. Two
/// handles are equal when they refer to the same pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    shared: Arc<PoolShared>,
}

pub type PoolGuard<'a> = MutexGuard<'a, LocalPool>;

impl PoolHandle {
    pub fn new(owner_id: ObjectId) -> Self {
        Self::with_lock_timeout(owner_id, MutexTimeout::default())
    }

    /// Pool whose datasets use `lock_timeout` for per-variable protection
    /// and drop-time commits.
    pub fn with_lock_timeout(owner_id: ObjectId, lock_timeout: MutexTimeout) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                owner_id,
                lock_timeout,
                pool: Mutex::new(LocalPool::new()),
            }),
        }
    }

    pub fn owner_id(&self) -> ObjectId {
        self.shared.owner_id
    }

    pub fn lock_timeout(&self) -> MutexTimeout {
        self.shared.lock_timeout
    }

    pub fn lock(&self, timeout: MutexTimeout) -> Result<PoolGuard<'_>> {
        let guard = match timeout {
            MutexTimeout::Blocking => Some(self.shared.pool.lock()),
            MutexTimeout::Polling => self.shared.pool.try_lock(),
            MutexTimeout::Waiting(duration) => self.shared.pool.try_lock_for(duration),
        };
        guard.ok_or_else(|| {
            warn!(
                "PoolHandle::lock: 0x{:08x}: mutex lock timed out ({:?})",
                self.owner_id(),
                timeout
            );
            PoolError::LockTimeout
        })
    }

    pub fn same_pool(&self, other: &PoolHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl PartialEq for PoolHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_pool(other)
    }
}

impl Eq for PoolHandle {}

/// Explicit lookup table from owner object ids to their pools, used by
/// consumer-side accessors and datasets.
#[derive(Debug, Default, Clone)]
pub struct PoolDirectory {
    pools: BTreeMap<ObjectId, PoolHandle>,
}

impl PoolDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool under its owner id, replacing any previous one.
    pub fn register(&mut self, handle: PoolHandle) {
        self.pools.insert(handle.owner_id(), handle);
    }

    pub fn get(&self, owner_id: ObjectId) -> Result<PoolHandle> {
        self.pools.get(&owner_id).cloned().ok_or_else(|| {
            warn!("PoolDirectory::get: no pool registered for 0x{:08x}", owner_id);
            PoolError::ObjectNotFound
        })
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
