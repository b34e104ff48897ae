use super::{LocalPool, PoolDirectory, PoolHandle, PoolObject, PoolType, ReadWriteMode};
use crate::error::{PoolError, Result};
use crate::ids::{LocalPoolId, ObjectId, NO_PARAMETER};
use crate::serialize::{Endianness, PoolSerialize, SerialReader, SerialWriter};
use core::any::Any;
use core::ops::{Index, IndexMut};
use tracing::warn;

/// Fixed-length array accessor for one pool entry of `N` elements.
#[derive(Debug)]
pub struct PoolVector<T: PoolType, const N: usize> {
    pool: PoolHandle,
    lpid: LocalPoolId,
    mode: ReadWriteMode,
    values: [T; N],
    valid: bool,
    changed: bool,
}

impl<T: PoolType, const N: usize> PoolVector<T, N> {
    pub fn new(pool: &PoolHandle, lpid: LocalPoolId, mode: ReadWriteMode) -> Self {
        Self {
            pool: pool.clone(),
            lpid,
            mode,
            values: [T::default(); N],
            valid: false,
            changed: false,
        }
    }

    pub fn from_owner_id(
        directory: &PoolDirectory,
        owner: ObjectId,
        lpid: LocalPoolId,
        mode: ReadWriteMode,
    ) -> Result<Self> {
        let pool = directory.get(owner)?;
        Ok(Self::new(&pool, lpid, mode))
    }

    pub fn values(&self) -> &[T; N] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T; N] {
        &mut self.values
    }

    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

impl<T: PoolType, const N: usize> Index<usize> for PoolVector<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.values[index]
    }
}

impl<T: PoolType, const N: usize> IndexMut<usize> for PoolVector<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.values[index]
    }
}

impl<T: PoolType, const N: usize> PoolSerialize for PoolVector<T, N> {
    fn serialized_size(&self) -> usize {
        T::WIDTH * N
    }

    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        if writer.remaining() < self.serialized_size() {
            return Err(PoolError::BufferTooShort);
        }
        for value in &self.values {
            value.encode(writer, endianness)?;
        }
        Ok(())
    }

    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        if reader.remaining() < self.serialized_size() {
            return Err(PoolError::StreamTooShort);
        }
        for value in &mut self.values {
            *value = T::decode(reader, endianness)?;
        }
        Ok(())
    }
}

impl<T: PoolType, const N: usize> PoolObject for PoolVector<T, N> {
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
        match pool.fetch::<T>(self.lpid, N) {
            Ok(entry) => {
                self.values.copy_from_slice(entry.values);
                self.valid = entry.valid;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "PoolVector::read_without_lock: 0x{:08x}: pool id {}: {}",
                    self.pool.owner_id(),
                    self.lpid,
                    e
                );
                self.values = [T::default(); N];
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
        let entry = pool.fetch_mut::<T>(self.lpid, N).map_err(|e| {
            warn!(
                "PoolVector::commit_without_lock: 0x{:08x}: pool id {}: {}",
                self.pool.owner_id(),
                self.lpid,
                e
            );
            e
        })?;
        entry.values.copy_from_slice(&self.values);
        *entry.valid = self.valid;
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{MutexTimeout, PoolEntry};

    fn pool() -> PoolHandle {
        let handle = PoolHandle::new(0x2000);
        handle
            .lock(MutexTimeout::Blocking)
            .unwrap()
            .insert_once([(5, PoolEntry::new(&[1i32, -2, 3], true))])
            .unwrap();
        handle
    }

    #[test]
    fn test_vector_read_commit() {
        let pool = pool();
        let mut vec = PoolVector::<i32, 3>::new(&pool, 5, ReadWriteMode::ReadWrite);
        vec.read(MutexTimeout::Polling).unwrap();
        assert_eq!(vec.values(), &[1, -2, 3]);

        vec[1] = 20;
        vec.commit(MutexTimeout::Polling).unwrap();
        let guard = pool.lock(MutexTimeout::Polling).unwrap();
        assert_eq!(guard.fetch::<i32>(5, 3).unwrap().values, &[1, 20, 3]);
    }

    #[test]
    fn test_length_mismatch_is_a_type_conflict() {
        let pool = pool();
        let mut vec = PoolVector::<i32, 2>::new(&pool, 5, ReadWriteMode::Read);
        assert_eq!(vec.read(MutexTimeout::Polling), Err(PoolError::PoolEntryTypeConflict));
        assert!(!vec.is_valid());
    }

    #[test]
    fn test_vector_serialization() {
        let pool = pool();
        let mut vec = PoolVector::<i32, 3>::new(&pool, 5, ReadWriteMode::ReadWrite);
        vec.values_mut().copy_from_slice(&[1, 2, 3]);
        let bytes = vec.to_bytes(Endianness::Big).unwrap();
        assert_eq!(bytes, [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]);

        let mut short = SerialWriter::new(11);
        assert_eq!(vec.serialize(&mut short, Endianness::Big), Err(PoolError::BufferTooShort));
        assert!(short.is_empty());
    }
}
