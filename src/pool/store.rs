use super::entry::{PoolEntry, PoolType};
use crate::error::{PoolError, Result};
use crate::ids::LocalPoolId;
use alloc::collections::BTreeMap;

/// Read view of one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRef<'a, T> {
    pub values: &'a [T],
    pub valid: bool,
}

/// Write view of one entry.
#[derive(Debug)]
pub struct EntryMut<'a, T> {
    pub values: &'a mut [T],
    pub valid: &'a mut bool,
}

/// Entries handed to [`LocalPool::insert_once`] during owner initialization.
pub type PoolEntryMap = BTreeMap<LocalPoolId, PoolEntry>;

/// Map of local pool ids to entries. Holds no lock of its own: it is only
/// reachable through a [`super::PoolHandle`] guard.
#[derive(Debug, Default)]
pub struct LocalPool {
    entries: BTreeMap<LocalPoolId, PoolEntry>,
    initialized: bool,
}

impl LocalPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates the map. Only the first call succeeds.
    pub fn insert_once<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (LocalPoolId, PoolEntry)>,
    {
        if self.initialized {
            return Err(PoolError::PoolMapAlreadyInitialized);
        }
        self.entries.extend(entries);
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, lpid: LocalPoolId) -> bool {
        self.entries.contains_key(&lpid)
    }

    pub fn entry(&self, lpid: LocalPoolId) -> Option<&PoolEntry> {
        self.entries.get(&lpid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocalPoolId, &PoolEntry)> {
        self.entries.iter()
    }

    /// Typed lookup. Fails with `PoolEntryTypeConflict` if the stored element
    /// type or length differs from the requested one.
    pub fn fetch<T: PoolType>(&self, lpid: LocalPoolId, len: usize) -> Result<EntryRef<'_, T>> {
        let entry = self.entries.get(&lpid).ok_or(PoolError::PoolEntryNotFound)?;
        let values = T::slice(entry.data()).ok_or(PoolError::PoolEntryTypeConflict)?;
        if values.len() != len {
            return Err(PoolError::PoolEntryTypeConflict);
        }
        Ok(EntryRef {
            values,
            valid: entry.is_valid(),
        })
    }

    pub fn fetch_mut<T: PoolType>(&mut self, lpid: LocalPoolId, len: usize) -> Result<EntryMut<'_, T>> {
        let entry = self.entries.get_mut(&lpid).ok_or(PoolError::PoolEntryNotFound)?;
        let (data, valid) = entry.parts_mut();
        let values = T::slice_mut(data).ok_or(PoolError::PoolEntryTypeConflict)?;
        if values.len() != len {
            return Err(PoolError::PoolEntryTypeConflict);
        }
        Ok(EntryMut { values, valid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> LocalPool {
        let mut pool = LocalPool::new();
        pool.insert_once([
            (1, PoolEntry::new(&[5u8], true)),
            (2, PoolEntry::zeroed::<f64>(3)),
        ])
        .unwrap();
        pool
    }

    #[test]
    fn test_insert_once() {
        let mut pool = populated();
        assert!(pool.is_initialized());
        assert_eq!(pool.len(), 2);
        assert_eq!(
            pool.insert_once([(3, PoolEntry::zeroed::<u8>(1))]),
            Err(PoolError::PoolMapAlreadyInitialized)
        );
        assert!(!pool.contains(3));
    }

    #[test]
    fn test_fetch_checks_type_and_length() {
        let pool = populated();
        let entry = pool.fetch::<u8>(1, 1).unwrap();
        assert_eq!(entry.values, &[5]);
        assert!(entry.valid);

        assert_eq!(pool.fetch::<u16>(1, 1).err(), Some(PoolError::PoolEntryTypeConflict));
        assert_eq!(pool.fetch::<f64>(2, 2).err(), Some(PoolError::PoolEntryTypeConflict));
        assert_eq!(pool.fetch::<u8>(9, 1).err(), Some(PoolError::PoolEntryNotFound));
    }

    #[test]
    fn test_fetch_mut_writes_in_place() {
        let mut pool = populated();
        {
            let entry = pool.fetch_mut::<f64>(2, 3).unwrap();
            entry.values[1] = 4.25;
            *entry.valid = true;
        }
        let entry = pool.fetch::<f64>(2, 3).unwrap();
        assert_eq!(entry.values, &[0.0, 4.25, 0.0]);
        assert!(entry.valid);
    }
}
