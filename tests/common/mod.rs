#![allow(dead_code)]

use satpool::dataset::VarHandle;
use satpool::ids::{Gpid, StoreId};
use satpool::ipc::{LocalQueue, LocalStore, MessageQueue, QueueHub};
use satpool::pool::{PoolEntryMap, PoolObject};
use satpool::time::{CdsShortTime, FixedClock};
use satpool::{
    CommandMessage, HasLocalDataPool, HkManagerConfig, InternalErrorReporter, LocalDataPoolManager, LocalDataSet,
    LocalPoolDataSet, LocalPoolId, ObjectId, PoolEntry, PoolVariable, PoolVector, ReadWriteMode, Result, Sid,
};
use std::sync::Arc;

pub const OWNER_ID: ObjectId = 0x2000_0001;
pub const OWNER_PERIOD_MS: u32 = 200;

pub const UINT8_ID: LocalPoolId = 1;
pub const FLOAT_ID: LocalPoolId = 2;
pub const UINT32_ID: LocalPoolId = 3;
pub const UINT16_VEC3_ID: LocalPoolId = 4;
pub const INT64_VEC2_ID: LocalPoolId = 5;

pub const TEST_SET_ID: u32 = 1;
pub const TEST_SID: Sid = Sid::new(OWNER_ID, TEST_SET_ID);

pub const FIXED_TIME: CdsShortTime = CdsShortTime {
    day: 24_000,
    ms_of_day: 43_200_000,
};

/// Pool-facing half of the test owner.
pub struct PoolOwnerData {
    pub dataset: LocalPoolDataSet<10>,
    pub uint8: VarHandle<PoolVariable<u8>>,
    pub float: VarHandle<PoolVariable<f32>>,
    pub vec: VarHandle<PoolVector<u16, 3>>,

    pub uint32_var: PoolVariable<u32>,
    pub int64_vec: PoolVector<i64, 2>,

    pub changed_sets: Vec<(Sid, Option<StoreId>)>,
    pub changed_variables: Vec<(Gpid, Option<StoreId>)>,
    pub keep_snapshot_data: bool,
}

impl PoolOwnerData {
    fn new(manager: &LocalDataPoolManager) -> Self {
        let pool = manager.pool();
        let mut dataset = LocalPoolDataSet::new(pool, TEST_SET_ID);
        let uint8 = dataset
            .register_variable(PoolVariable::new(pool, UINT8_ID, ReadWriteMode::ReadWrite))
            .unwrap();
        let float = dataset
            .register_variable(PoolVariable::new(pool, FLOAT_ID, ReadWriteMode::ReadWrite))
            .unwrap();
        let vec = dataset
            .register_variable(PoolVector::new(pool, UINT16_VEC3_ID, ReadWriteMode::ReadWrite))
            .unwrap();
        Self {
            dataset,
            uint8,
            float,
            vec,
            uint32_var: PoolVariable::new(pool, UINT32_ID, ReadWriteMode::ReadWrite),
            int64_vec: PoolVector::new(pool, INT64_VEC2_ID, ReadWriteMode::ReadWrite),
            changed_sets: Vec::new(),
            changed_variables: Vec::new(),
            keep_snapshot_data: false,
        }
    }
}

impl HasLocalDataPool for PoolOwnerData {
    fn object_id(&self) -> ObjectId {
        OWNER_ID
    }

    fn periodic_operation_frequency_ms(&self) -> u32 {
        OWNER_PERIOD_MS
    }

    fn initialize_local_data_pool(
        &mut self,
        entries: &mut PoolEntryMap,
        _manager: &mut LocalDataPoolManager,
    ) -> Result<()> {
        entries.insert(UINT8_ID, PoolEntry::new(&[0u8], false));
        entries.insert(FLOAT_ID, PoolEntry::new(&[0.0f32], false));
        entries.insert(UINT32_ID, PoolEntry::new(&[0u32], false));
        entries.insert(UINT16_VEC3_ID, PoolEntry::zeroed::<u16>(3));
        entries.insert(INT64_VEC2_ID, PoolEntry::zeroed::<i64>(2));
        Ok(())
    }

    fn data_set_mut(&mut self, sid: Sid) -> Option<&mut dyn LocalDataSet> {
        if sid == TEST_SID {
            Some(&mut self.dataset)
        } else {
            None
        }
    }

    fn pool_object_mut(&mut self, lpid: LocalPoolId) -> Option<&mut dyn PoolObject> {
        match lpid {
            UINT32_ID => Some(&mut self.uint32_var),
            INT64_VEC2_ID => Some(&mut self.int64_vec),
            _ => None,
        }
    }

    fn handle_changed_dataset(&mut self, sid: Sid, store_id: Option<StoreId>) -> bool {
        self.changed_sets.push((sid, store_id));
        !self.keep_snapshot_data
    }

    fn handle_changed_pool_variable(&mut self, gpid: Gpid, store_id: Option<StoreId>) -> bool {
        self.changed_variables.push((gpid, store_id));
        !self.keep_snapshot_data
    }
}

/// Test pool owner wired to an in-process queue hub and store.
pub struct TestOwner {
    pub manager: LocalDataPoolManager,
    pub data: PoolOwnerData,
    pub hub: QueueHub,
    pub hk_destination: LocalQueue,
    pub store: Arc<LocalStore>,
    pub reporter: Arc<InternalErrorReporter>,
}

impl TestOwner {
    pub fn new() -> Self {
        Self::with_config(HkManagerConfig::default())
    }

    /// Owner with the given config; the HK destination is always the
    /// owner's `hk_destination` queue.
    pub fn with_config(mut config: HkManagerConfig) -> Self {
        let hub = QueueHub::new();
        let hk_destination = hub.create_queue(32);
        config.hk_destination = Some(hk_destination.id());
        let store = Arc::new(LocalStore::default());
        let reporter = Arc::new(InternalErrorReporter::new());
        let manager = LocalDataPoolManager::new(OWNER_ID, Box::new(hub.create_queue(32)), store.clone(), config)
            .with_clock(Box::new(FixedClock(FIXED_TIME)))
            .with_error_reporter(reporter.clone());
        let data = PoolOwnerData::new(&manager);
        let mut owner = Self {
            manager,
            data,
            hub,
            hk_destination,
            store,
            reporter,
        };
        owner
            .manager
            .initialize_after_task_creation(&mut owner.data)
            .unwrap();
        owner
    }

    pub fn perform_hk(&mut self) -> Result<()> {
        self.manager.perform_hk_operation(&mut self.data)
    }

    pub fn handle(&mut self, message: &CommandMessage) -> Result<()> {
        self.manager.handle_housekeeping_message(&mut self.data, message)
    }

    /// Handles every message waiting in the owner's queue, returning the results.
    pub fn process_queue(&mut self) -> Vec<Result<()>> {
        let mut results = Vec::new();
        while let Some(message) = self.manager.receive_message() {
            results.push(self.manager.handle_housekeeping_message(&mut self.data, &message));
        }
        results
    }

    /// Writes known values into the test set and marks it changed.
    pub fn write_test_set(&mut self, uint8: u8, float: f32, vec: [u16; 3]) {
        let set = &mut self.data.dataset;
        set.read(satpool::MutexTimeout::Polling).unwrap();
        set.get_mut(&self.data.uint8).unwrap().set_value(uint8);
        set.get_mut(&self.data.float).unwrap().set_value(float);
        *set.get_mut(&self.data.vec).unwrap().values_mut() = vec;
        set.commit_with_validity(true, satpool::MutexTimeout::Polling).unwrap();
        set.set_changed(true);
    }
}

pub fn drain(queue: &LocalQueue) -> Vec<CommandMessage> {
    std::iter::from_fn(|| queue.receive()).collect()
}
