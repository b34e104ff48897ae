use super::{DataSetState, LocalDataSet, VarHandle};
use crate::error::{PoolError, Result};
use crate::housekeeping::periodic::PeriodicHousekeepingHelper;
use crate::ids::{LocalPoolId, Sid, NO_PARAMETER};
use crate::pool::{LocalPool, MutexTimeout, PoolDirectory, PoolHandle, PoolObject, ReadWriteMode};
use crate::serialize::{Endianness, EndianCodec, PoolSerialize, SerialReader, SerialWriter};
use alloc::boxed::Box;
use heapless::Vec;
use tracing::{debug, warn};

/// Dataset of up to `N` variables belonging to one local pool.
///
/// The creator variant is tied to the owner's manager and can be reported
/// periodically. The consumer variant is a read view from another component
/// and has no periodic metadata.
///
/// Dropping a set that was read but not committed commits every writable
/// variable as invalid, waiting up to the pool's lock timeout.
pub struct LocalPoolDataSet<const N: usize> {
    pool: PoolHandle,
    sid: Sid,
    variables: Vec<Box<dyn PoolObject>, N>,
    state: DataSetState,
    valid: bool,
    changed: bool,
    diagnostics: bool,
    reporting_enabled: bool,
    with_validity_buffer: bool,
    protect_every_read_commit: bool,
    single_var_timeout: MutexTimeout,
    periodic_helper: Option<PeriodicHousekeepingHelper>,
}

impl<const N: usize> LocalPoolDataSet<N> {
    /// Creator-side set with id `set_id` in the owner's pool.
    pub fn new(pool: &PoolHandle, set_id: u32) -> Self {
        let mut set = Self::for_consumer(pool, Sid::new(pool.owner_id(), set_id));
        set.periodic_helper = Some(PeriodicHousekeepingHelper::new());
        set
    }

    /// Consumer-side view of the set `sid`.
    pub fn for_consumer(pool: &PoolHandle, sid: Sid) -> Self {
        Self {
            pool: pool.clone(),
            sid,
            variables: Vec::new(),
            state: DataSetState::Uninitialised,
            valid: false,
            changed: false,
            diagnostics: false,
            reporting_enabled: false,
            with_validity_buffer: true,
            protect_every_read_commit: false,
            single_var_timeout: pool.lock_timeout(),
            periodic_helper: None,
        }
    }

    /// Consumer-side view, resolving the owner of `sid` through the directory.
    pub fn from_sid(directory: &PoolDirectory, sid: Sid) -> Result<Self> {
        let pool = directory.get(sid.object_id)?;
        Ok(Self::for_consumer(&pool, sid))
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub const fn max_size(&self) -> usize {
        N
    }

    pub fn register_variable<V: PoolObject>(&mut self, variable: V) -> Result<VarHandle<V>> {
        let boxed: Box<dyn PoolObject> = Box::new(variable);
        let index = self.register_boxed(Some(boxed))?;
        Ok(VarHandle::new(index))
    }

    /// Registers a type-erased variable and returns its index.
    pub fn register_boxed(&mut self, variable: Option<Box<dyn PoolObject>>) -> Result<usize> {
        if self.state != DataSetState::Uninitialised {
            warn!("LocalPoolDataSet::register_boxed: set {}: call after read", self.sid);
            return Err(PoolError::DataSetUninitialised);
        }
        let variable = variable.ok_or_else(|| {
            warn!("LocalPoolDataSet::register_boxed: set {}: pool variable is null", self.sid);
            PoolError::PoolVarNull
        })?;
        if !self.protect_every_read_commit && !variable.pool().same_pool(&self.pool) {
            warn!(
                "LocalPoolDataSet::register_boxed: set {}: variable {} belongs to another pool",
                self.sid,
                variable.gpid()
            );
            return Err(PoolError::ForeignPoolVariable);
        }
        self.variables.push(variable).map_err(|_| {
            warn!("LocalPoolDataSet::register_boxed: set {}: data set is full", self.sid);
            PoolError::DataSetFull
        })?;
        Ok(self.variables.len() - 1)
    }

    pub fn get<V: PoolObject>(&self, handle: &VarHandle<V>) -> Option<&V> {
        self.variables.get(handle.index())?.as_any().downcast_ref::<V>()
    }

    pub fn get_mut<V: PoolObject>(&mut self, handle: &VarHandle<V>) -> Option<&mut V> {
        self.variables.get_mut(handle.index())?.as_any_mut().downcast_mut::<V>()
    }

    pub fn variable(&self, index: usize) -> Option<&dyn PoolObject> {
        self.variables.get(index).map(|v| v.as_ref())
    }

    pub fn variable_mut(&mut self, index: usize) -> Option<&mut (dyn PoolObject + 'static)> {
        self.variables.get_mut(index).map(|v| v.as_mut())
    }

    /// Lets every variable lock its own pool on read and commit instead of
    /// locking the set's pool once. Required for variables of several owners.
    pub fn set_read_commit_protection_behaviour(&mut self, protect_every_call: bool, timeout: MutexTimeout) {
        self.protect_every_read_commit = protect_every_call;
        self.single_var_timeout = timeout;
    }

    /// Sets validity and commits in one step.
    pub fn commit_with_validity(&mut self, valid: bool, timeout: MutexTimeout) -> Result<()> {
        self.set_validity(valid, true);
        self.commit(timeout)
    }

    pub fn is_validity_buffer_generation_enabled(&self) -> bool {
        self.with_validity_buffer
    }

    fn read_variable(
        variable: &mut dyn PoolObject,
        pool: Option<&LocalPool>,
        timeout: MutexTimeout,
    ) -> Result<()> {
        let result = match pool {
            Some(pool) => variable.read_without_lock(pool),
            None => variable.read(timeout),
        };
        result.map_err(|_| PoolError::InvalidParameterDefinition)
    }

    fn commit_variable(
        variable: &mut dyn PoolObject,
        pool: Option<&mut LocalPool>,
        timeout: MutexTimeout,
    ) -> Result<()> {
        match pool {
            Some(pool) => variable.commit_without_lock(pool),
            None => variable.commit(timeout),
        }
    }

    fn read_all(&mut self, pool: Option<&LocalPool>) -> Result<()> {
        let mut first_error = Ok(());
        for variable in self.variables.iter_mut() {
            if !variable.read_write_mode().can_read() || variable.local_pool_id() == NO_PARAMETER {
                continue;
            }
            let result = if pool.is_some() && !variable.pool().same_pool(&self.pool) {
                Err(PoolError::InvalidParameterDefinition)
            } else {
                Self::read_variable(&mut **variable, pool, self.single_var_timeout)
            };
            if first_error.is_ok() {
                first_error = result;
            }
        }
        first_error
    }

    fn commit_all_after_read(&mut self, mut pool: Option<&mut LocalPool>) {
        for variable in self.variables.iter_mut() {
            if !variable.read_write_mode().can_write() || variable.local_pool_id() == NO_PARAMETER {
                continue;
            }
            if pool.is_some() && !variable.pool().same_pool(&self.pool) {
                continue;
            }
            // Partial commits are allowed: a failing variable does not stop the rest.
            let _ = Self::commit_variable(&mut **variable, pool.as_deref_mut(), self.single_var_timeout);
        }
    }

    fn commit_all_unread(&mut self, mut pool: Option<&mut LocalPool>) -> Result<()> {
        let mut result = Ok(());
        for variable in self.variables.iter_mut() {
            if variable.local_pool_id() == NO_PARAMETER {
                continue;
            }
            if variable.read_write_mode() == ReadWriteMode::Write {
                if pool.is_some() && !variable.pool().same_pool(&self.pool) {
                    continue;
                }
                let _ = Self::commit_variable(&mut **variable, pool.as_deref_mut(), self.single_var_timeout);
            } else if result.is_ok() {
                warn!(
                    "LocalPoolDataSet::commit: set {}: committing variable {} without reading",
                    self.sid,
                    variable.gpid()
                );
                result = Err(PoolError::CommitingWithoutReading);
            }
        }
        result
    }
}

impl<const N: usize> LocalDataSet for LocalPoolDataSet<N> {
    fn sid(&self) -> Sid {
        self.sid
    }

    fn state(&self) -> DataSetState {
        self.state
    }

    fn read(&mut self, timeout: MutexTimeout) -> Result<()> {
        if self.state != DataSetState::Uninitialised {
            warn!("LocalPoolDataSet::read: set {}: set was already read", self.sid);
            return Err(PoolError::SetWasAlreadyRead);
        }
        let result = if self.protect_every_read_commit {
            self.read_all(None)
        } else {
            let pool = self.pool.clone();
            let guard = pool.lock(timeout)?;
            self.read_all(Some(&*guard))
        };
        self.state = DataSetState::WasRead;
        result
    }

    fn commit(&mut self, timeout: MutexTimeout) -> Result<()> {
        let pool = self.pool.clone();
        let result = match self.state {
            DataSetState::WasRead => {
                if self.protect_every_read_commit {
                    self.commit_all_after_read(None);
                } else {
                    let mut guard = pool.lock(timeout)?;
                    self.commit_all_after_read(Some(&mut *guard));
                }
                Ok(())
            }
            DataSetState::Uninitialised => {
                if self.protect_every_read_commit {
                    self.commit_all_unread(None)
                } else {
                    let mut guard = pool.lock(timeout)?;
                    self.commit_all_unread(Some(&mut *guard))
                }
            }
        };
        self.state = DataSetState::Uninitialised;
        result
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn set_validity(&mut self, valid: bool, recursive: bool) {
        if recursive {
            for variable in self.variables.iter_mut() {
                variable.set_valid(valid);
            }
        }
        self.valid = valid;
    }

    fn has_changed(&self) -> bool {
        self.changed
    }

    fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    fn is_diagnostics(&self) -> bool {
        self.diagnostics
    }

    fn set_diagnostics(&mut self, diagnostics: bool) {
        self.diagnostics = diagnostics;
    }

    fn reporting_enabled(&self) -> bool {
        self.reporting_enabled
    }

    fn set_reporting_enabled(&mut self, enabled: bool) {
        self.reporting_enabled = enabled;
    }

    fn set_validity_buffer_generation(&mut self, enabled: bool) {
        self.with_validity_buffer = enabled;
    }

    fn fill_count(&self) -> usize {
        self.variables.len()
    }

    fn local_pool_ids(&self) -> alloc::vec::Vec<LocalPoolId> {
        self.variables.iter().map(|v| v.local_pool_id()).collect()
    }

    fn serialize_variables(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        for variable in self.variables.iter() {
            variable.serialize(writer, endianness)?;
        }
        Ok(())
    }

    fn deserialize_variables(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        for variable in self.variables.iter_mut() {
            variable.deserialize(reader, endianness)?;
        }
        Ok(())
    }

    fn variables_size(&self) -> usize {
        self.variables.iter().map(|v| v.serialized_size()).sum()
    }

    fn serialize_local_pool_ids(
        &self,
        writer: &mut SerialWriter,
        endianness: Endianness,
        with_fill_count: bool,
    ) -> Result<()> {
        if with_fill_count {
            writer.write_u8(self.variables.len() as u8)?;
        }
        for variable in self.variables.iter() {
            variable.local_pool_id().encode(writer, endianness)?;
        }
        Ok(())
    }

    fn periodic_helper(&self) -> Option<&PeriodicHousekeepingHelper> {
        self.periodic_helper.as_ref()
    }

    fn periodic_helper_mut(&mut self) -> Option<&mut PeriodicHousekeepingHelper> {
        self.periodic_helper.as_mut()
    }
}

/// Number of bytes of a validity bitmask for `count` variables.
pub const fn validity_mask_len(count: usize) -> usize {
    count.div_ceil(8)
}

impl<const N: usize> PoolSerialize for LocalPoolDataSet<N> {
    fn serialized_size(&self) -> usize {
        let mut size = self.variables_size();
        if self.with_validity_buffer {
            size += validity_mask_len(self.variables.len());
        }
        size
    }

    /// Variables in registration order, then, if enabled, one validity bit
    /// per variable, MSB first.
    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        if writer.remaining() < self.serialized_size() {
            return Err(PoolError::BufferTooShort);
        }
        self.serialize_variables(writer, endianness)?;
        if self.with_validity_buffer {
            for chunk in self.variables.chunks(8) {
                let mut byte = 0u8;
                for (position, variable) in chunk.iter().enumerate() {
                    if variable.is_valid() {
                        byte |= 1 << (7 - position);
                    }
                }
                writer.write_u8(byte)?;
            }
        }
        Ok(())
    }

    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        self.deserialize_variables(reader, endianness)?;
        if self.with_validity_buffer {
            let mask = reader.read_bytes(validity_mask_len(self.variables.len()))?;
            for (index, variable) in self.variables.iter_mut().enumerate() {
                let bit = mask[index / 8] & (1 << (7 - index % 8));
                variable.set_valid(bit != 0);
            }
        }
        Ok(())
    }
}

impl<const N: usize> Drop for LocalPoolDataSet<N> {
    fn drop(&mut self) {
        if self.state != DataSetState::WasRead {
            return;
        }
        debug!("LocalPoolDataSet::drop: set {}: committing read set as invalid", self.sid);
        let timeout = self.pool.lock_timeout();
        for variable in self.variables.iter_mut() {
            if !variable.read_write_mode().can_write() {
                continue;
            }
            variable.set_valid(false);
            if let Err(e) = variable.commit(timeout) {
                warn!(
                    "LocalPoolDataSet::drop: set {}: invalidating {} failed: {}",
                    self.sid,
                    variable.gpid(),
                    e
                );
            }
        }
    }
}

impl<const N: usize> core::fmt::Debug for LocalPoolDataSet<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalPoolDataSet")
            .field("sid", &self.sid)
            .field("fill_count", &self.variables.len())
            .field("state", &self.state)
            .field("valid", &self.valid)
            .field("changed", &self.changed)
            .field("diagnostics", &self.diagnostics)
            .field("reporting_enabled", &self.reporting_enabled)
            .finish()
    }
}
