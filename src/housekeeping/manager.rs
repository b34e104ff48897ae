use super::message::{CommandMessage, HkCommand};
use super::packet::{HousekeepingPacketDownlink, HousekeepingSetPacket, HousekeepingSnapshot};
use crate::config::{HkManagerConfig, MAX_HK_RECEIVERS, MAX_RESET_HELPERS};
use crate::dataset::LocalDataSet;
use crate::error::{PoolError, Result};
use crate::ids::{Gpid, LocalPoolId, MessageQueueId, ObjectId, Sid, StoreId, NO_OBJECT, NO_QUEUE};
use crate::internal_error::{InternalErrorKind, InternalErrorReporter};
use crate::ipc::{MessageQueue, StorageManager};
use crate::pool::{MutexTimeout, PoolEntryMap, PoolHandle, PoolObject};
use crate::serialize::{Endianness, PoolSerialize};
use crate::time::{SystemClock, TimeProvider};
use alloc::boxed::Box;
use alloc::sync::Arc;
use heapless::Vec;
use tracing::{debug, info, warn};

/// Component owning a local data pool.
///
/// The owner keeps its [`LocalDataPoolManager`] apart from the data it exposes
/// through this trait, so both can be borrowed at the same time:
///
/// ```ignore
/// struct Controller {
///     manager: LocalDataPoolManager,
///     data: ControllerData, // implements HasLocalDataPool
/// }
/// controller.manager.perform_hk_operation(&mut controller.data)?;
/// ```
pub trait HasLocalDataPool {
    fn object_id(&self) -> ObjectId;

    /// Period of the owner's task in milliseconds.
    fn periodic_operation_frequency_ms(&self) -> u32;

    /// Fills the pool map and sets up subscriptions. Called once.
    fn initialize_local_data_pool(
        &mut self,
        entries: &mut PoolEntryMap,
        manager: &mut LocalDataPoolManager,
    ) -> Result<()>;

    fn data_set_mut(&mut self, sid: Sid) -> Option<&mut dyn LocalDataSet>;

    fn pool_object_mut(&mut self, _lpid: LocalPoolId) -> Option<&mut dyn PoolObject> {
        None
    }

    /// Called for set notifications and snapshots. Return `false` to keep the
    /// snapshot's store data alive; the owner is then responsible for it.
    fn handle_changed_dataset(&mut self, _sid: Sid, _store_id: Option<StoreId>) -> bool {
        true
    }

    fn handle_changed_pool_variable(&mut self, _gpid: Gpid, _store_id: Option<StoreId>) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataId {
    Set(Sid),
    Variable(LocalPoolId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingType {
    /// Full packet at a fixed collection interval.
    Periodic,
    /// Full packet whenever the set changed.
    UpdateHk,
    /// Id-only message whenever the data changed.
    UpdateNotification,
    /// Timestamped copy in the store whenever the data changed.
    UpdateSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HkReceiver {
    pub object_id: ObjectId,
    pub data_id: DataId,
    pub reporting_type: ReportingType,
    pub destination: MessageQueueId,
}

/// Counts the update subscribers of one set or variable so its changed flag
/// is only cleared once all of them were serviced in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HkUpdateResetHelper {
    pub data_id: DataId,
    pub update_counter: u8,
    pub current_update_counter: u8,
}

/// Parameters of a periodic or update packet subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HkSubscription {
    pub sid: Sid,
    /// Initial reporting state of a periodic subscription. Update
    /// subscriptions always enable reporting.
    pub enable_reporting: bool,
    /// Ignored by update subscriptions.
    pub collection_interval_s: f32,
    pub is_diagnostics: bool,
    /// `NO_QUEUE` selects the manager's HK destination.
    pub receiver: MessageQueueId,
}

impl HkSubscription {
    pub fn regular(sid: Sid, enable_reporting: bool, collection_interval_s: f32) -> Self {
        Self {
            sid,
            enable_reporting,
            collection_interval_s,
            is_diagnostics: false,
            receiver: NO_QUEUE,
        }
    }

    pub fn diagnostics(sid: Sid, enable_reporting: bool, collection_interval_s: f32) -> Self {
        Self {
            is_diagnostics: true,
            ..Self::regular(sid, enable_reporting, collection_interval_s)
        }
    }

    pub fn with_receiver(mut self, receiver: MessageQueueId) -> Self {
        self.receiver = receiver;
        self
    }
}

/// Housekeeping engine of one pool owner.
///
/// Owns the pool handle and the owner's queue, tracks HK subscriptions and
/// turns them into packets and notifications on every
/// [`perform_hk_operation`](Self::perform_hk_operation) pass.
pub struct LocalDataPoolManager {
    owner_id: ObjectId,
    pool: PoolHandle,
    config: HkManagerConfig,
    hk_destination: MessageQueueId,

    // Collaborators
    queue: Box<dyn MessageQueue>,
    store: Arc<dyn StorageManager>,
    clock: Box<dyn TimeProvider>,
    error_reporter: Option<Arc<InternalErrorReporter>>,

    // Subscriptions
    receivers: Vec<HkReceiver, MAX_HK_RECEIVERS>,
    reset_helpers: Vec<HkUpdateResetHelper, MAX_RESET_HELPERS>,

    map_initialized: bool,
    non_diag_factor: u8,
}

impl LocalDataPoolManager {
    pub fn new(
        owner_id: ObjectId,
        queue: Box<dyn MessageQueue>,
        store: Arc<dyn StorageManager>,
        config: HkManagerConfig,
    ) -> Self {
        let hk_destination = config
            .hk_destination
            .or_else(|| queue.default_destination())
            .unwrap_or(NO_QUEUE);
        let non_diag_factor = config.non_diagnostic_interval_factor.max(1);
        Self {
            owner_id,
            pool: PoolHandle::with_lock_timeout(owner_id, MutexTimeout::Waiting(config.lock_timeout())),
            config,
            hk_destination,
            queue,
            store,
            clock: Box::new(SystemClock),
            error_reporter: None,
            receivers: Vec::new(),
            reset_helpers: Vec::new(),
            map_initialized: false,
            non_diag_factor,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_error_reporter(mut self, reporter: Arc<InternalErrorReporter>) -> Self {
        self.error_reporter = Some(reporter);
        self
    }

    pub fn owner_id(&self) -> ObjectId {
        self.owner_id
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub fn config(&self) -> &HkManagerConfig {
        &self.config
    }

    pub fn queue_id(&self) -> MessageQueueId {
        self.queue.id()
    }

    pub fn hk_destination(&self) -> MessageQueueId {
        self.hk_destination
    }

    pub fn set_hk_destination(&mut self, destination: MessageQueueId) {
        self.hk_destination = destination;
    }

    pub fn receive_message(&self) -> Option<CommandMessage> {
        self.queue.receive_message()
    }

    pub fn store(&self) -> &Arc<dyn StorageManager> {
        &self.store
    }

    pub fn receivers(&self) -> &[HkReceiver] {
        &self.receivers
    }

    pub fn reset_helper(&self, data_id: DataId) -> Option<HkUpdateResetHelper> {
        self.reset_helpers.iter().find(|h| h.data_id == data_id).copied()
    }

    /// Drops every subscription together with its update bookkeeping.
    pub fn clear_receivers_list(&mut self) {
        self.receivers.clear();
        self.reset_helpers.clear();
    }

    /// Lets the owner fill its pool map and subscribe. Later calls only warn.
    pub fn initialize_after_task_creation(&mut self, owner: &mut dyn HasLocalDataPool) -> Result<()> {
        if self.map_initialized {
            warn!(
                "LocalDataPoolManager::initialize_after_task_creation: 0x{:08x}: pool map already initialized",
                self.owner_id
            );
            return Ok(());
        }
        self.non_diag_factor = self.config.non_diagnostic_interval_factor.max(1);
        let mut entries = PoolEntryMap::new();
        owner.initialize_local_data_pool(&mut entries, self)?;
        let entry_count = entries.len();
        self.pool.lock(MutexTimeout::Blocking)?.insert_once(entries)?;
        self.map_initialized = true;
        debug!(
            "LocalDataPoolManager::initialize_after_task_creation: 0x{:08x}: {} pool entries",
            self.owner_id, entry_count
        );
        Ok(())
    }

    pub fn subscribe_for_periodic_packet(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        params: HkSubscription,
    ) -> Result<()> {
        let data_id = DataId::Set(params.sid);
        self.check_capacity(data_id, false)?;
        let period_ms = owner.periodic_operation_frequency_ms();
        let set = owner
            .data_set_mut(params.sid)
            .ok_or_else(|| self.print_warning("subscribe_for_periodic_packet", PoolError::DatasetNotFound))?;
        let helper = set
            .periodic_helper_mut()
            .ok_or_else(|| self.print_warning("subscribe_for_periodic_packet", PoolError::PeriodicHelperInvalid))?;
        helper.initialize(
            params.collection_interval_s,
            period_ms,
            params.is_diagnostics,
            self.non_diag_factor,
        );
        set.set_reporting_enabled(params.enable_reporting);
        set.set_diagnostics(params.is_diagnostics);
        set.set_validity_buffer_generation(self.config.append_validity_buffer);

        self.push_receiver(HkReceiver {
            object_id: NO_OBJECT,
            data_id,
            reporting_type: ReportingType::Periodic,
            destination: self.default_receiver(params.receiver),
        })
    }

    /// Sends a full packet of `params.sid` whenever the set changed. Reporting
    /// is switched on regardless of `params.enable_reporting`.
    pub fn subscribe_for_update_packet(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        params: HkSubscription,
    ) -> Result<()> {
        let data_id = DataId::Set(params.sid);
        self.check_capacity(data_id, true)?;
        let set = owner
            .data_set_mut(params.sid)
            .ok_or_else(|| self.print_warning("subscribe_for_update_packet", PoolError::DatasetNotFound))?;
        set.set_reporting_enabled(true);
        set.set_diagnostics(params.is_diagnostics);
        set.set_validity_buffer_generation(self.config.append_validity_buffer);

        self.push_receiver(HkReceiver {
            object_id: NO_OBJECT,
            data_id,
            reporting_type: ReportingType::UpdateHk,
            destination: self.default_receiver(params.receiver),
        })?;
        self.insert_reset_helper(data_id);
        Ok(())
    }

    /// Subscribes `target_queue` to notifications or snapshots of one of the
    /// owner's sets.
    pub fn subscribe_for_set_update_message(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        set_id: u32,
        destination_object: ObjectId,
        target_queue: MessageQueueId,
        generate_snapshot: bool,
    ) -> Result<()> {
        let sid = Sid::new(self.owner_id, set_id);
        let data_id = DataId::Set(sid);
        self.check_capacity(data_id, true)?;
        if owner.data_set_mut(sid).is_none() {
            return Err(self.print_warning("subscribe_for_set_update_message", PoolError::DatasetNotFound));
        }
        self.push_update_message_receiver(data_id, destination_object, target_queue, generate_snapshot)
    }

    /// Subscribes `target_queue` to notifications or snapshots of one pool variable.
    pub fn subscribe_for_variable_update_message(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        lpid: LocalPoolId,
        destination_object: ObjectId,
        target_queue: MessageQueueId,
        generate_snapshot: bool,
    ) -> Result<()> {
        let data_id = DataId::Variable(lpid);
        self.check_capacity(data_id, true)?;
        if owner.pool_object_mut(lpid).is_none() {
            return Err(self.print_warning(
                "subscribe_for_variable_update_message",
                PoolError::PoolObjectNotFound,
            ));
        }
        self.push_update_message_receiver(data_id, destination_object, target_queue, generate_snapshot)
    }

    /// One housekeeping pass over all receivers. Every receiver is serviced;
    /// the last error encountered is returned.
    pub fn perform_hk_operation(&mut self, owner: &mut dyn HasLocalDataPool) -> Result<()> {
        let mut status = Ok(());
        for index in 0..self.receivers.len() {
            let receiver = self.receivers[index];
            let result = match receiver.reporting_type {
                ReportingType::Periodic => self.perform_periodic_hk_generation(owner, &receiver),
                ReportingType::UpdateHk => self.handle_hk_update(owner, &receiver),
                ReportingType::UpdateNotification => self.handle_notification_update(owner, &receiver),
                ReportingType::UpdateSnapshot => self.handle_notification_snapshot(owner, &receiver),
            };
            if result.is_err() {
                status = result;
            }
        }
        self.reset_hk_update_reset_helpers();
        status
    }

    /// Serializes `set` as a full HK packet into the store and sends the
    /// report to `destination`, or to the HK destination for `NO_QUEUE`.
    /// The set's local copies are sent as they are; the set is not read.
    pub fn generate_housekeeping_packet(
        &self,
        sid: Sid,
        set: &mut dyn LocalDataSet,
        for_downlink: bool,
        destination: MessageQueueId,
    ) -> Result<()> {
        let destination = self.resolve_destination("generate_housekeeping_packet", destination)?;
        let endianness = if for_downlink {
            Endianness::Big
        } else {
            Endianness::Machine
        };
        let diagnostics = set.is_diagnostics();
        let packet = HousekeepingPacketDownlink::new(sid, set);
        let store_id = self.add_to_store(&packet, endianness)?;
        let command = if diagnostics {
            HkCommand::DiagnosticsReport { sid, store_id }
        } else {
            HkCommand::HkReport { sid, store_id }
        };
        self.send_with_store(destination, CommandMessage::new(command), store_id)
    }

    /// Sends the structure report of `sid` to `destination`.
    pub fn generate_set_structure_packet(
        &self,
        owner: &mut dyn HasLocalDataPool,
        sid: Sid,
        is_diagnostics: bool,
        destination: MessageQueueId,
    ) -> Result<()> {
        let set = self.find_typed_set(owner, "generate_set_structure_packet", sid, is_diagnostics)?;
        let interval = set
            .periodic_helper()
            .map_or(0.0, |helper| helper.collection_interval_seconds());
        let packet = HousekeepingSetPacket::from_set(set, interval);
        let destination = self.resolve_destination("generate_set_structure_packet", destination)?;
        let store_id = self.add_to_store(&packet, Endianness::Big)?;
        let command = if is_diagnostics {
            HkCommand::DiagnosticsDefinitionReport { sid, store_id }
        } else {
            HkCommand::HkDefinitionsReport { sid, store_id }
        };
        self.send_with_store(destination, CommandMessage::new(command), store_id)
    }

    pub fn toggle_periodic_generation(
        &self,
        owner: &mut dyn HasLocalDataPool,
        sid: Sid,
        enable: bool,
        is_diagnostics: bool,
    ) -> Result<()> {
        let set = self.find_typed_set(owner, "toggle_periodic_generation", sid, is_diagnostics)?;
        if set.reporting_enabled() == enable {
            return Err(PoolError::ReportingStatusUnchanged);
        }
        set.set_reporting_enabled(enable);
        Ok(())
    }

    pub fn change_collection_interval(
        &self,
        owner: &mut dyn HasLocalDataPool,
        sid: Sid,
        new_interval_s: f32,
        is_diagnostics: bool,
    ) -> Result<()> {
        let set = self.find_typed_set(owner, "change_collection_interval", sid, is_diagnostics)?;
        let helper = set
            .periodic_helper_mut()
            .ok_or_else(|| self.print_warning("change_collection_interval", PoolError::PeriodicHelperInvalid))?;
        helper.change_collection_interval(new_interval_s);
        Ok(())
    }

    /// Interprets one housekeeping command. Commands get a success or failure
    /// reply addressed to their sender; notifications are forwarded to the
    /// owner. Returns `UnknownCommand` for messages that are not commands.
    pub fn handle_housekeeping_message(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        message: &CommandMessage,
    ) -> Result<()> {
        let reply_to = if message.sender == NO_QUEUE {
            self.hk_destination
        } else {
            message.sender
        };
        let (sid, result) = match message.command {
            HkCommand::EnablePeriodicHkGeneration { sid } => {
                (sid, self.toggle_periodic_generation(owner, sid, true, false))
            }
            HkCommand::DisablePeriodicHkGeneration { sid } => {
                (sid, self.toggle_periodic_generation(owner, sid, false, false))
            }
            HkCommand::EnablePeriodicDiagnosticsGeneration { sid } => {
                (sid, self.toggle_periodic_generation(owner, sid, true, true))
            }
            HkCommand::DisablePeriodicDiagnosticsGeneration { sid } => {
                (sid, self.toggle_periodic_generation(owner, sid, false, true))
            }
            HkCommand::ReportHkStructures { sid } | HkCommand::ReportDiagnosticsStructures { sid } => {
                let diagnostics = matches!(message.command, HkCommand::ReportDiagnosticsStructures { .. });
                match self.generate_set_structure_packet(owner, sid, diagnostics, reply_to) {
                    Ok(()) => return Ok(()),
                    Err(e) => (sid, Err(e)),
                }
            }
            HkCommand::ModifyParameterReportCollectionInterval { sid, interval_s } => {
                (sid, self.change_collection_interval(owner, sid, interval_s, false))
            }
            HkCommand::ModifyDiagnosticsReportCollectionInterval { sid, interval_s } => {
                (sid, self.change_collection_interval(owner, sid, interval_s, true))
            }
            HkCommand::GenerateOneParameterReport { sid } | HkCommand::GenerateOneDiagnosticsReport { sid } => {
                let diagnostics = matches!(message.command, HkCommand::GenerateOneDiagnosticsReport { .. });
                let destination = if self.hk_destination == NO_QUEUE {
                    message.sender
                } else {
                    self.hk_destination
                };
                match self.generate_one_shot_report(owner, sid, diagnostics, destination) {
                    Ok(()) => return Ok(()),
                    Err(e) => (sid, Err(e)),
                }
            }
            HkCommand::UpdateNotificationSet { sid } => {
                owner.handle_changed_dataset(sid, None);
                return Ok(());
            }
            HkCommand::UpdateNotificationVariable { gpid } => {
                owner.handle_changed_pool_variable(gpid, None);
                return Ok(());
            }
            HkCommand::UpdateSnapshotSet { sid, store_id } => {
                if owner.handle_changed_dataset(sid, Some(store_id)) {
                    message.clear(&*self.store)?;
                }
                return Ok(());
            }
            HkCommand::UpdateSnapshotVariable { gpid, store_id } => {
                if owner.handle_changed_pool_variable(gpid, Some(store_id)) {
                    message.clear(&*self.store)?;
                }
                return Ok(());
            }
            _ => return Err(PoolError::UnknownCommand),
        };

        let reply = match result {
            Ok(()) => HkCommand::HkRequestSuccess { sid },
            Err(e) => HkCommand::failure(sid, e),
        };
        if let Err(e) = self.queue.send_message(reply_to, CommandMessage::new(reply)) {
            warn!(
                "LocalDataPoolManager::handle_housekeeping_message: 0x{:08x}: reply to {} failed: {}",
                self.owner_id, reply_to, e
            );
            self.report(InternalErrorKind::QueueHit, e);
        }
        result
    }

    /// Logs the current content of one pool entry.
    pub fn print_pool_entry(&self, lpid: LocalPoolId) -> Result<()> {
        let pool = self.pool.lock(self.pool.lock_timeout())?;
        let entry = pool
            .entry(lpid)
            .ok_or_else(|| self.print_warning("print_pool_entry", PoolError::PoolEntryNotFound))?;
        info!("LocalDataPoolManager: 0x{:08x}: pool entry {}: {}", self.owner_id, lpid, entry);
        Ok(())
    }

    fn generate_one_shot_report(
        &self,
        owner: &mut dyn HasLocalDataPool,
        sid: Sid,
        is_diagnostics: bool,
        destination: MessageQueueId,
    ) -> Result<()> {
        let set = self.find_typed_set(owner, "generate_one_shot_report", sid, is_diagnostics)?;
        self.generate_housekeeping_packet(sid, set, true, destination)
    }

    fn perform_periodic_hk_generation(
        &self,
        owner: &mut dyn HasLocalDataPool,
        receiver: &HkReceiver,
    ) -> Result<()> {
        // Periodic packets are only generated from sets.
        let DataId::Set(sid) = receiver.data_id else {
            return Ok(());
        };
        let set = owner
            .data_set_mut(sid)
            .ok_or_else(|| self.print_warning("perform_periodic_hk_generation", PoolError::DatasetNotFound))?;
        if !set.reporting_enabled() {
            return Ok(());
        }
        let helper = set
            .periodic_helper_mut()
            .ok_or_else(|| self.print_warning("perform_periodic_hk_generation", PoolError::PeriodicHelperInvalid))?;
        if !helper.check_op_necessary() {
            return Ok(());
        }
        self.generate_housekeeping_packet(sid, set, true, receiver.destination)
    }

    fn handle_hk_update(&mut self, owner: &mut dyn HasLocalDataPool, receiver: &HkReceiver) -> Result<()> {
        let DataId::Set(sid) = receiver.data_id else {
            return Ok(());
        };
        let set = owner
            .data_set_mut(sid)
            .ok_or_else(|| self.print_warning("handle_hk_update", PoolError::DatasetNotFound))?;
        if !set.has_changed() {
            return Ok(());
        }
        let result = self.generate_housekeeping_packet(sid, set, true, receiver.destination);
        if self.consume_change(receiver.data_id) {
            set.set_changed(false);
        }
        result
    }

    fn handle_notification_update(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        receiver: &HkReceiver,
    ) -> Result<()> {
        match receiver.data_id {
            DataId::Variable(lpid) => {
                let variable = owner
                    .pool_object_mut(lpid)
                    .ok_or_else(|| self.print_warning("handle_notification_update", PoolError::PoolObjectNotFound))?;
                if !variable.has_changed() {
                    return Ok(());
                }
                let gpid = Gpid::new(self.owner_id, lpid);
                let result = self.send_to(
                    receiver.destination,
                    CommandMessage::new(HkCommand::UpdateNotificationVariable { gpid }),
                );
                if self.consume_change(receiver.data_id) {
                    variable.set_changed(false);
                }
                result
            }
            DataId::Set(sid) => {
                let set = owner
                    .data_set_mut(sid)
                    .ok_or_else(|| self.print_warning("handle_notification_update", PoolError::DatasetNotFound))?;
                if !set.has_changed() {
                    return Ok(());
                }
                let result = self.send_to(
                    receiver.destination,
                    CommandMessage::new(HkCommand::UpdateNotificationSet { sid }),
                );
                if self.consume_change(receiver.data_id) {
                    set.set_changed(false);
                }
                result
            }
        }
    }

    fn handle_notification_snapshot(
        &mut self,
        owner: &mut dyn HasLocalDataPool,
        receiver: &HkReceiver,
    ) -> Result<()> {
        let timestamp = self.clock.now();
        match receiver.data_id {
            DataId::Variable(lpid) => {
                let variable = owner
                    .pool_object_mut(lpid)
                    .ok_or_else(|| self.print_warning("handle_notification_snapshot", PoolError::PoolObjectNotFound))?;
                if !variable.has_changed() {
                    return Ok(());
                }
                let stored = {
                    let snapshot = HousekeepingSnapshot::for_variable(timestamp, &mut *variable);
                    self.add_to_store(&snapshot, Endianness::Machine)
                };
                let gpid = Gpid::new(self.owner_id, lpid);
                // A snapshot that could not be stored is dropped for this cycle.
                let result = stored.and_then(|store_id| {
                    self.send_with_store(
                        receiver.destination,
                        CommandMessage::new(HkCommand::UpdateSnapshotVariable { gpid, store_id }),
                        store_id,
                    )
                });
                if self.consume_change(receiver.data_id) {
                    variable.set_changed(false);
                }
                result
            }
            DataId::Set(sid) => {
                let set = owner
                    .data_set_mut(sid)
                    .ok_or_else(|| self.print_warning("handle_notification_snapshot", PoolError::DatasetNotFound))?;
                if !set.has_changed() {
                    return Ok(());
                }
                let stored = {
                    let snapshot = HousekeepingSnapshot::for_set(timestamp, &mut *set);
                    self.add_to_store(&snapshot, Endianness::Machine)
                };
                let result = stored.and_then(|store_id| {
                    self.send_with_store(
                        receiver.destination,
                        CommandMessage::new(HkCommand::UpdateSnapshotSet { sid, store_id }),
                        store_id,
                    )
                });
                if self.consume_change(receiver.data_id) {
                    set.set_changed(false);
                }
                result
            }
        }
    }

    /// Advances the reset helper of `data_id` and returns whether every
    /// update subscriber has now seen the change.
    fn consume_change(&mut self, data_id: DataId) -> bool {
        let Some(helper) = self.reset_helpers.iter_mut().find(|h| h.data_id == data_id) else {
            return false;
        };
        if helper.update_counter <= 1 {
            true
        } else if helper.current_update_counter <= 1 {
            helper.current_update_counter = 0;
            true
        } else {
            helper.current_update_counter -= 1;
            false
        }
    }

    fn reset_hk_update_reset_helpers(&mut self) {
        for helper in self.reset_helpers.iter_mut() {
            helper.current_update_counter = helper.update_counter;
        }
    }

    fn insert_reset_helper(&mut self, data_id: DataId) {
        if let Some(helper) = self.reset_helpers.iter_mut().find(|h| h.data_id == data_id) {
            helper.update_counter = helper.update_counter.saturating_add(1);
            helper.current_update_counter = helper.current_update_counter.saturating_add(1);
            return;
        }
        // Capacity was checked before the receiver was added.
        let _ = self.reset_helpers.push(HkUpdateResetHelper {
            data_id,
            update_counter: 1,
            current_update_counter: 1,
        });
    }

    fn check_capacity(&self, data_id: DataId, needs_reset_helper: bool) -> Result<()> {
        let helper_missing = needs_reset_helper && self.reset_helper(data_id).is_none();
        if self.receivers.is_full() || (helper_missing && self.reset_helpers.is_full()) {
            return Err(self.print_warning("subscribe", PoolError::ReceiverListFull));
        }
        Ok(())
    }

    fn push_receiver(&mut self, receiver: HkReceiver) -> Result<()> {
        self.receivers
            .push(receiver)
            .map_err(|_| self.print_warning("subscribe", PoolError::ReceiverListFull))
    }

    fn push_update_message_receiver(
        &mut self,
        data_id: DataId,
        destination_object: ObjectId,
        target_queue: MessageQueueId,
        generate_snapshot: bool,
    ) -> Result<()> {
        let reporting_type = if generate_snapshot {
            ReportingType::UpdateSnapshot
        } else {
            ReportingType::UpdateNotification
        };
        self.push_receiver(HkReceiver {
            object_id: destination_object,
            data_id,
            reporting_type,
            destination: target_queue,
        })?;
        self.insert_reset_helper(data_id);
        Ok(())
    }

    fn find_typed_set<'o>(
        &self,
        owner: &'o mut dyn HasLocalDataPool,
        context: &str,
        sid: Sid,
        is_diagnostics: bool,
    ) -> Result<&'o mut dyn LocalDataSet> {
        let set = owner
            .data_set_mut(sid)
            .ok_or_else(|| self.print_warning(context, PoolError::DatasetNotFound))?;
        if set.is_diagnostics() != is_diagnostics {
            return Err(PoolError::WrongHkPacketType);
        }
        Ok(set)
    }

    fn default_receiver(&self, receiver: MessageQueueId) -> MessageQueueId {
        if receiver == NO_QUEUE {
            self.hk_destination
        } else {
            receiver
        }
    }

    fn resolve_destination(&self, context: &str, destination: MessageQueueId) -> Result<MessageQueueId> {
        match self.default_receiver(destination) {
            NO_QUEUE => Err(self.print_warning(context, PoolError::QueueOrDestinationInvalid)),
            resolved => Ok(resolved),
        }
    }

    fn add_to_store<S: PoolSerialize + ?Sized>(&self, item: &S, endianness: Endianness) -> Result<StoreId> {
        let bytes = item.to_bytes(endianness)?;
        self.store.add_data(&bytes).map_err(|e| {
            warn!(
                "LocalDataPoolManager::add_to_store: 0x{:08x}: {} bytes dropped: {}",
                self.owner_id,
                bytes.len(),
                e
            );
            self.report(InternalErrorKind::StoreHit, e);
            e
        })
    }

    fn send_to(&self, destination: MessageQueueId, message: CommandMessage) -> Result<()> {
        self.queue.send_message(destination, message).map_err(|e| {
            warn!(
                "LocalDataPoolManager::send_to: 0x{:08x}: sending to {} failed: {}",
                self.owner_id, destination, e
            );
            self.report(InternalErrorKind::QueueHit, e);
            e
        })
    }

    /// Sends a message referencing store data; the data is released again if
    /// the message cannot be delivered.
    fn send_with_store(&self, destination: MessageQueueId, message: CommandMessage, store_id: StoreId) -> Result<()> {
        self.send_to(destination, message).map_err(|e| {
            let _ = self.store.delete_data(store_id);
            self.report(InternalErrorKind::LostTm, e);
            e
        })
    }

    fn report(&self, kind: InternalErrorKind, error: PoolError) {
        if let Some(reporter) = &self.error_reporter {
            reporter.record(kind, self.owner_id, error);
        }
    }

    fn print_warning(&self, context: &str, error: PoolError) -> PoolError {
        warn!("LocalDataPoolManager::{}: 0x{:08x}: {}", context, self.owner_id, error);
        error
    }
}

impl core::fmt::Debug for LocalDataPoolManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LocalDataPoolManager")
            .field("owner_id", &self.owner_id)
            .field("hk_destination", &self.hk_destination)
            .field("receivers", &self.receivers.len())
            .field("map_initialized", &self.map_initialized)
            .finish()
    }
}
