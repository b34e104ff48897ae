//! Datasets: ordered groups of pool accessors read and committed as one
//! transaction under a single pool lock.

pub mod local;

pub use local::LocalPoolDataSet;

use crate::error::Result;
use crate::housekeeping::periodic::PeriodicHousekeepingHelper;
use crate::ids::{LocalPoolId, Sid};
use crate::pool::MutexTimeout;
use crate::serialize::{Endianness, PoolSerialize, SerialReader, SerialWriter};
use core::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSetState {
    Uninitialised,
    WasRead,
}

/// Typed index of a variable registered in a dataset.
#[derive(Debug)]
pub struct VarHandle<V> {
    index: usize,
    _marker: PhantomData<fn() -> V>,
}

impl<V> VarHandle<V> {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<V> Clone for VarHandle<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for VarHandle<V> {}

/// Object-safe view of a dataset used by the housekeeping manager.
pub trait LocalDataSet: PoolSerialize + Send {
    fn sid(&self) -> Sid;

    fn state(&self) -> DataSetState;

    fn read(&mut self, timeout: MutexTimeout) -> Result<()>;

    fn commit(&mut self, timeout: MutexTimeout) -> Result<()>;

    fn is_valid(&self) -> bool;

    /// Sets the set's validity and, if `recursive`, that of every variable.
    fn set_validity(&mut self, valid: bool, recursive: bool);

    fn has_changed(&self) -> bool;

    fn set_changed(&mut self, changed: bool);

    fn is_diagnostics(&self) -> bool;

    fn set_diagnostics(&mut self, diagnostics: bool);

    fn reporting_enabled(&self) -> bool;

    fn set_reporting_enabled(&mut self, enabled: bool);

    fn set_validity_buffer_generation(&mut self, enabled: bool);

    fn fill_count(&self) -> usize;

    fn local_pool_ids(&self) -> alloc::vec::Vec<LocalPoolId>;

    /// Writes the variables in registration order, without validity bitmask.
    fn serialize_variables(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()>;

    fn deserialize_variables(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()>;

    fn variables_size(&self) -> usize;

    /// Writes the local pool ids, optionally preceded by the fill count.
    fn serialize_local_pool_ids(
        &self,
        writer: &mut SerialWriter,
        endianness: Endianness,
        with_fill_count: bool,
    ) -> Result<()>;

    fn periodic_helper(&self) -> Option<&PeriodicHousekeepingHelper>;

    fn periodic_helper_mut(&mut self) -> Option<&mut PeriodicHousekeepingHelper>;
}
