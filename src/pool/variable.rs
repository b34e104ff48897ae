use super::{LocalPool, PoolDirectory, PoolHandle, PoolObject, PoolType, ReadWriteMode};
use crate::error::{PoolError, Result};
use crate::ids::{LocalPoolId, ObjectId, NO_PARAMETER};
use crate::serialize::{Endianness, PoolSerialize, SerialReader, SerialWriter};
use core::any::Any;
use tracing::warn;

/// Scalar accessor for one pool entry.
///
/// The local copy is only authoritative between a read and the matching
/// commit.
#[derive(Debug)]
pub struct PoolVariable<T: PoolType> {
    pool: PoolHandle,
    lpid: LocalPoolId,
    mode: ReadWriteMode,
    value: T,
    valid: bool,
    changed: bool,
}

impl<T: PoolType> PoolVariable<T> {
    /// Creator-side construction from the owner's pool handle.
    pub fn new(pool: &PoolHandle, lpid: LocalPoolId, mode: ReadWriteMode) -> Self {
        if lpid == NO_PARAMETER {
            warn!(
                "PoolVariable::new: 0x{:08x}: pool id {} is the no-parameter sentinel",
                pool.owner_id(),
                lpid
            );
        }
        Self {
            pool: pool.clone(),
            lpid,
            mode,
            value: T::default(),
            valid: false,
            changed: false,
        }
    }

    /// Consumer-side construction, resolving the owner through the directory.
    pub fn from_owner_id(
        directory: &PoolDirectory,
        owner: ObjectId,
        lpid: LocalPoolId,
        mode: ReadWriteMode,
    ) -> Result<Self> {
        let pool = directory.get(owner)?;
        Ok(Self::new(&pool, lpid, mode))
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }
}

impl<T: PoolType> PoolSerialize for PoolVariable<T> {
    fn serialized_size(&self) -> usize {
        T::WIDTH
    }

    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        self.value.encode(writer, endianness)
    }

    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        self.value = T::decode(reader, endianness)?;
        Ok(())
    }
}

impl<T: PoolType> PoolObject for PoolVariable<T> {
    fn local_pool_id(&self) -> LocalPoolId {
        self.lpid
    }

    fn read_write_mode(&self) -> ReadWriteMode {
        self.mode
    }

    fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    fn read_without_lock(&mut self, pool: &LocalPool) -> Result<()> {
        if self.lpid == NO_PARAMETER {
            return Ok(());
        }
        match pool.fetch::<T>(self.lpid, 1) {
            Ok(entry) => {
                self.value = entry.values[0];
                self.valid = entry.valid;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "PoolVariable::read_without_lock: 0x{:08x}: pool id {}: {}",
                    self.pool.owner_id(),
                    self.lpid,
                    e
                );
                self.value = T::default();
                self.valid = false;
                Err(e)
            }
        }
    }

    fn commit_without_lock(&mut self, pool: &mut LocalPool) -> Result<()> {
        if self.lpid == NO_PARAMETER {
            return Ok(());
        }
        if !self.mode.can_write() {
            return Err(PoolError::ReadOnlyVariable);
        }
        match pool.fetch_mut::<T>(self.lpid, 1) {
            Ok(entry) => {
                entry.values[0] = self.value;
                *entry.valid = self.valid;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "PoolVariable::commit_without_lock: 0x{:08x}: pool id {}: {}",
                    self.pool.owner_id(),
                    self.lpid,
                    e
                );
                Err(e)
            }
        }
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    fn has_changed(&self) -> bool {
        self.changed
    }

    fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
