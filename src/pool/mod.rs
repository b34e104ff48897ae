//! Local data pool: the owner's validity-flagged value store and the typed
//! accessors that read from and commit to it.

pub mod entry;
pub mod handle;
pub mod store;
pub mod variable;
pub mod vector;

pub use entry::{ElementType, PoolData, PoolEntry, PoolType};
pub use handle::{MutexTimeout, PoolDirectory, PoolGuard, PoolHandle};
pub use store::{EntryMut, EntryRef, LocalPool, PoolEntryMap};
pub use variable::PoolVariable;
pub use vector::PoolVector;

use crate::error::Result;
use crate::ids::{Gpid, LocalPoolId, NO_PARAMETER};
use crate::serialize::PoolSerialize;
use core::any::Any;
use serde::{Deserialize, Serialize};

/// Access rights of an accessor to its pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadWriteMode {
    Read,
    Write,
    ReadWrite,
}

impl ReadWriteMode {
    pub fn can_read(self) -> bool {
        self != ReadWriteMode::Write
    }

    pub fn can_write(self) -> bool {
        self != ReadWriteMode::Read
    }
}

/// Object-safe interface of every pool accessor.
///
/// The `*_without_lock` operations take the already locked pool; datasets use
/// them to process all their variables under one lock acquisition. The locking
/// variants acquire the accessor's own pool.
pub trait PoolObject: PoolSerialize + Send + Any {
    fn local_pool_id(&self) -> LocalPoolId;

    fn read_write_mode(&self) -> ReadWriteMode;

    fn pool(&self) -> &PoolHandle;

    fn read_without_lock(&mut self, pool: &LocalPool) -> Result<()>;

    fn commit_without_lock(&mut self, pool: &mut LocalPool) -> Result<()>;

    fn is_valid(&self) -> bool;

    fn set_valid(&mut self, valid: bool);

    fn has_changed(&self) -> bool;

    fn set_changed(&mut self, changed: bool);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn read(&mut self, timeout: MutexTimeout) -> Result<()> {
        if self.local_pool_id() == NO_PARAMETER {
            return Ok(());
        }
        let pool = self.pool().clone();
        let guard = pool.lock(timeout)?;
        self.read_without_lock(&guard)
    }

    fn commit(&mut self, timeout: MutexTimeout) -> Result<()> {
        if self.local_pool_id() == NO_PARAMETER {
            return Ok(());
        }
        let pool = self.pool().clone();
        let mut guard = pool.lock(timeout)?;
        self.commit_without_lock(&mut guard)
    }

    /// Sets the validity and commits in one step.
    fn commit_with_validity(&mut self, valid: bool, timeout: MutexTimeout) -> Result<()> {
        self.set_valid(valid);
        self.commit(timeout)
    }

    fn gpid(&self) -> Gpid {
        Gpid::new(self.pool().owner_id(), self.local_pool_id())
    }
}
