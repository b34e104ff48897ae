use crate::config::StoreConfig;
use crate::error::{PoolError, Result};
use crate::ids::StoreId;
use alloc::vec::Vec;
use parking_lot::Mutex;
use tracing::warn;

/// Shared store for serialized packets and snapshots. Messages carry a
/// [`StoreId`]; the receiver reads and then deletes the element.
pub trait StorageManager: Send + Sync {
    fn add_data(&self, data: &[u8]) -> Result<StoreId>;

    /// Copy of the element's bytes.
    fn get_data(&self, id: StoreId) -> Result<Vec<u8>>;

    fn delete_data(&self, id: StoreId) -> Result<()>;

    fn free_elements(&self) -> usize;
}

#[derive(Debug)]
struct Page {
    element_size: usize,
    data: Vec<u8>,
    sizes: Vec<Option<usize>>,
}

impl Page {
    fn free_slot(&self) -> Option<usize> {
        self.sizes.iter().position(Option::is_none)
    }
}

/// Bucketed store: each page holds a fixed number of fixed-size elements.
/// Data goes to the smallest page it fits into, spilling to larger pages when
/// that one is full.
#[derive(Debug)]
pub struct LocalStore {
    pages: Mutex<Vec<Page>>,
}

impl LocalStore {
    pub fn new(config: &StoreConfig) -> Self {
        let mut page_configs = config.pages.clone();
        page_configs.sort_by_key(|p| p.element_size);
        let pages = page_configs
            .iter()
            .map(|p| Page {
                element_size: p.element_size,
                data: alloc::vec![0; p.element_size * usize::from(p.number_of_elements)],
                sizes: alloc::vec![None; usize::from(p.number_of_elements)],
            })
            .collect();
        Self {
            pages: Mutex::new(pages),
        }
    }

    pub fn clear(&self) {
        for page in self.pages.lock().iter_mut() {
            page.sizes.iter_mut().for_each(|s| *s = None);
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl StorageManager for LocalStore {
    fn add_data(&self, data: &[u8]) -> Result<StoreId> {
        let mut pages = self.pages.lock();
        let mut fits_somewhere = false;
        for (pool_index, page) in pages.iter_mut().enumerate() {
            if page.element_size < data.len() {
                continue;
            }
            fits_somewhere = true;
            if let Some(slot) = page.free_slot() {
                let start = slot * page.element_size;
                page.data[start..start + data.len()].copy_from_slice(data);
                page.sizes[slot] = Some(data.len());
                return Ok(StoreId::new(pool_index as u16, slot as u16));
            }
        }
        if fits_somewhere {
            warn!("LocalStore::add_data: no free element for {} bytes", data.len());
            Err(PoolError::StoreFull)
        } else {
            warn!("LocalStore::add_data: {} bytes exceed every page size", data.len());
            Err(PoolError::DataTooLarge)
        }
    }

    fn get_data(&self, id: StoreId) -> Result<Vec<u8>> {
        let pages = self.pages.lock();
        let page = pages
            .get(usize::from(id.pool_index))
            .ok_or(PoolError::DataDoesNotExist)?;
        let slot = usize::from(id.packet_index);
        let size = page
            .sizes
            .get(slot)
            .copied()
            .flatten()
            .ok_or(PoolError::DataDoesNotExist)?;
        let start = slot * page.element_size;
        Ok(page.data[start..start + size].to_vec())
    }

    fn delete_data(&self, id: StoreId) -> Result<()> {
        let mut pages = self.pages.lock();
        let size = pages
            .get_mut(usize::from(id.pool_index))
            .and_then(|page| page.sizes.get_mut(usize::from(id.packet_index)))
            .ok_or(PoolError::DataDoesNotExist)?;
        if size.take().is_none() {
            return Err(PoolError::DataDoesNotExist);
        }
        Ok(())
    }

    fn free_elements(&self) -> usize {
        self.pages
            .lock()
            .iter()
            .map(|page| page.sizes.iter().filter(|s| s.is_none()).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorePageConfig;

    fn small_store() -> LocalStore {
        LocalStore::new(&StoreConfig {
            pages: alloc::vec![
                StorePageConfig { number_of_elements: 1, element_size: 16 },
                StorePageConfig { number_of_elements: 1, element_size: 4 },
            ],
        })
    }

    #[test]
    fn test_smallest_fitting_page_is_used() {
        let store = small_store();
        let id = store.add_data(&[1, 2, 3]).unwrap();
        assert_eq!(id, StoreId::new(0, 0));
        assert_eq!(store.get_data(id).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn test_spill_full_and_too_large() {
        let store = small_store();
        store.add_data(&[1]).unwrap();
        let spilled = store.add_data(&[2]).unwrap();
        assert_eq!(spilled.pool_index, 1);
        assert_eq!(store.add_data(&[3]), Err(PoolError::StoreFull));
        assert_eq!(store.add_data(&[0; 17]), Err(PoolError::DataTooLarge));
        assert_eq!(store.free_elements(), 0);
    }

    #[test]
    fn test_delete() {
        let store = small_store();
        let id = store.add_data(&[9; 10]).unwrap();
        store.delete_data(id).unwrap();
        assert_eq!(store.delete_data(id), Err(PoolError::DataDoesNotExist));
        assert_eq!(store.get_data(id), Err(PoolError::DataDoesNotExist));
        assert_eq!(store.free_elements(), 2);
    }
}
