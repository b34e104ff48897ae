mod common;

use common::*;
use satpool::housekeeping::{DataId, HkPacketHeader, HousekeepingSetPacket, HousekeepingSnapshot, ReportingType};
use satpool::ids::{NO_OBJECT, NO_QUEUE};
use satpool::ipc::{MessageQueue, StorageManager};
use satpool::pool::PoolObject;
use satpool::serialize::{Endianness, PoolSerialize, SerialReader};
use satpool::time::CdsShortTime;
use satpool::*;

fn subscribe_set_message(owner: &mut TestOwner, generate_snapshot: bool) {
    let target = owner.hk_destination.id();
    owner
        .manager
        .subscribe_for_set_update_message(&mut owner.data, TEST_SET_ID, NO_OBJECT, target, generate_snapshot)
        .unwrap();
}

fn subscribe_variable_message(owner: &mut TestOwner, lpid: LocalPoolId, generate_snapshot: bool) {
    let target = owner.hk_destination.id();
    owner
        .manager
        .subscribe_for_variable_update_message(&mut owner.data, lpid, NO_OBJECT, target, generate_snapshot)
        .unwrap();
}

#[test]
fn test_initialization_fills_pool() {
    let owner = TestOwner::new();
    let pool = owner.manager.pool().lock(MutexTimeout::Blocking).unwrap();
    assert!(pool.is_initialized());
    assert_eq!(pool.len(), 5);
    assert!(pool.fetch::<u16>(UINT16_VEC3_ID, 3).is_ok());
    assert!(!pool.entry(UINT8_ID).unwrap().is_valid());
}

#[test]
fn test_set_notification() {
    let mut owner = TestOwner::new();
    subscribe_set_message(&mut owner, false);

    // Nothing is sent while the set is unchanged
    owner.perform_hk().unwrap();
    assert!(drain(&owner.hk_destination).is_empty());

    owner.write_test_set(1, 2.0, [3, 4, 5]);
    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].command, HkCommand::UpdateNotificationSet { sid: TEST_SID });
    assert_eq!(messages[0].sender, owner.manager.queue_id());
    assert!(!owner.data.dataset.has_changed());

    owner.handle(&messages[0]).unwrap();
    assert_eq!(owner.data.changed_sets, [(TEST_SID, None)]);

    owner.perform_hk().unwrap();
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_changed_flag_cleared_after_last_subscriber() {
    let mut owner = TestOwner::new();
    subscribe_set_message(&mut owner, false);
    subscribe_set_message(&mut owner, false);
    let helper = owner.manager.reset_helper(DataId::Set(TEST_SID)).unwrap();
    assert_eq!(helper.update_counter, 2);

    owner.write_test_set(1, 2.0, [3, 4, 5]);
    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .all(|m| m.command == HkCommand::UpdateNotificationSet { sid: TEST_SID }));
    assert!(!owner.data.dataset.has_changed());

    // Helpers are refilled after every pass
    let helper = owner.manager.reset_helper(DataId::Set(TEST_SID)).unwrap();
    assert_eq!(helper.current_update_counter, 2);
}

#[test]
fn test_subscriber_added_between_passes() {
    let mut owner = TestOwner::new();
    subscribe_set_message(&mut owner, false);
    owner.write_test_set(1, 2.0, [3, 4, 5]);
    owner.perform_hk().unwrap();
    assert_eq!(drain(&owner.hk_destination).len(), 1);

    subscribe_set_message(&mut owner, false);
    let helper = owner.manager.reset_helper(DataId::Set(TEST_SID)).unwrap();
    assert_eq!((helper.update_counter, helper.current_update_counter), (2, 2));

    owner.write_test_set(6, 7.0, [8, 9, 10]);
    owner.perform_hk().unwrap();
    assert_eq!(drain(&owner.hk_destination).len(), 2);
    assert!(!owner.data.dataset.has_changed());
}

#[test]
fn test_update_packet_on_change() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_update_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 0.0))
        .unwrap();
    assert_eq!(owner.manager.receivers()[0].reporting_type, ReportingType::UpdateHk);
    assert_eq!(owner.manager.receivers()[0].destination, owner.hk_destination.id());

    owner.write_test_set(7, 2.5, [100, 200, 300]);
    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    let HkCommand::HkReport { sid, store_id } = messages[0].command else {
        panic!("unexpected message {:?}", messages[0]);
    };
    assert_eq!(sid, TEST_SID);

    let data = owner.store.get_data(store_id).unwrap();
    let (header, rest) = HkPacketHeader::parse(&data, Endianness::Big).unwrap();
    assert_eq!(header.sid, TEST_SID);
    assert!(header.valid);
    assert_eq!(rest.len(), 1 + 4 + 6 + 1);
    assert_eq!(rest[0], 7);
    assert_eq!(&rest[1..5], &2.5f32.to_be_bytes());
    assert_eq!(&rest[5..11], &[0, 100, 0, 200, 1, 44]);
    assert_eq!(rest[11], 0b1110_0000);
    messages[0].clear(owner.store.as_ref()).unwrap();

    assert!(!owner.data.dataset.has_changed());
    owner.perform_hk().unwrap();
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_update_subscription_always_enables_reporting() {
    let mut owner = TestOwner::new();
    assert!(!owner.data.dataset.reporting_enabled());
    owner
        .manager
        .subscribe_for_update_packet(&mut owner.data, HkSubscription::regular(TEST_SID, false, 0.0))
        .unwrap();
    assert!(owner.data.dataset.reporting_enabled());

    owner.write_test_set(7, 2.5, [100, 200, 300]);
    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].command, HkCommand::HkReport { sid, .. } if sid == TEST_SID));
}

#[test]
fn test_update_packet_without_validity_buffer() {
    let config = HkManagerConfig {
        append_validity_buffer: false,
        ..HkManagerConfig::default()
    };
    let mut owner = TestOwner::with_config(config);
    owner
        .manager
        .subscribe_for_update_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 0.0))
        .unwrap();
    owner.write_test_set(7, 2.5, [100, 200, 300]);
    owner.perform_hk().unwrap();

    let messages = drain(&owner.hk_destination);
    let store_id = messages[0].command.store_id().unwrap();
    let data = owner.store.get_data(store_id).unwrap();
    assert_eq!(data.len(), 9 + 1 + 4 + 6);
}

#[test]
fn test_set_snapshot() {
    let mut owner = TestOwner::new();
    subscribe_set_message(&mut owner, true);
    owner.write_test_set(7, 2.5, [100, 200, 300]);
    owner.perform_hk().unwrap();

    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    let HkCommand::UpdateSnapshotSet { sid, store_id } = messages[0].command else {
        panic!("unexpected message {:?}", messages[0]);
    };
    assert_eq!(sid, TEST_SID);
    assert!(!owner.data.dataset.has_changed());

    let data = owner.store.get_data(store_id).unwrap();
    assert_eq!(data.len(), 7 + 1 + 4 + 6);

    // Rebuild the values in a second set with the same layout
    let pool = owner.manager.pool().clone();
    let mut copy = LocalPoolDataSet::<10>::new(&pool, TEST_SET_ID);
    let uint8 = copy
        .register_variable(PoolVariable::<u8>::new(&pool, UINT8_ID, ReadWriteMode::Read))
        .unwrap();
    let float = copy
        .register_variable(PoolVariable::<f32>::new(&pool, FLOAT_ID, ReadWriteMode::Read))
        .unwrap();
    let vec = copy
        .register_variable(PoolVector::<u16, 3>::new(&pool, UINT16_VEC3_ID, ReadWriteMode::Read))
        .unwrap();
    let timestamp = {
        let mut snapshot = HousekeepingSnapshot::for_set(CdsShortTime::new(0, 0), &mut copy);
        snapshot
            .deserialize(&mut SerialReader::new(&data), Endianness::Machine)
            .unwrap();
        snapshot.timestamp()
    };
    assert_eq!(timestamp, FIXED_TIME);
    assert_eq!(copy.get(&uint8).unwrap().value(), 7);
    assert_eq!(copy.get(&float).unwrap().value(), 2.5);
    assert_eq!(copy.get(&vec).unwrap().values(), &[100, 200, 300]);

    // Default handling releases the store data
    owner.handle(&messages[0]).unwrap();
    assert_eq!(owner.data.changed_sets, [(TEST_SID, Some(store_id))]);
    assert_eq!(owner.store.get_data(store_id), Err(PoolError::DataDoesNotExist));
}

#[test]
fn test_snapshot_kept_when_owner_takes_it() {
    let mut owner = TestOwner::new();
    owner.data.keep_snapshot_data = true;
    subscribe_set_message(&mut owner, true);
    owner.write_test_set(1, 1.0, [1, 1, 1]);
    owner.perform_hk().unwrap();

    let messages = drain(&owner.hk_destination);
    let store_id = messages[0].command.store_id().unwrap();
    owner.handle(&messages[0]).unwrap();
    assert!(owner.store.get_data(store_id).is_ok());
    owner.store.delete_data(store_id).unwrap();
}

#[test]
fn test_variable_snapshot() {
    let mut owner = TestOwner::new();
    subscribe_variable_message(&mut owner, UINT32_ID, true);

    let variable = &mut owner.data.uint32_var;
    variable.read(MutexTimeout::Polling).unwrap();
    variable.set_value(0xCAFE_0042);
    variable.commit(MutexTimeout::Polling).unwrap();
    variable.set_changed(true);

    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    let gpid = Gpid::new(OWNER_ID, UINT32_ID);
    let HkCommand::UpdateSnapshotVariable { gpid: sent_gpid, store_id } = messages[0].command else {
        panic!("unexpected message {:?}", messages[0]);
    };
    assert_eq!(sent_gpid, gpid);
    assert!(!owner.data.uint32_var.has_changed());

    let data = owner.store.get_data(store_id).unwrap();
    assert_eq!(&data[..7], &FIXED_TIME.to_bytes());
    assert_eq!(&data[7..], &0xCAFE_0042u32.to_ne_bytes());

    owner.handle(&messages[0]).unwrap();
    assert_eq!(owner.data.changed_variables, [(gpid, Some(store_id))]);
    assert!(owner.store.get_data(store_id).is_err());
}

#[test]
fn test_variable_notification() {
    let mut owner = TestOwner::new();
    subscribe_variable_message(&mut owner, INT64_VEC2_ID, false);
    assert_eq!(
        owner.manager.reset_helper(DataId::Variable(INT64_VEC2_ID)).unwrap().update_counter,
        1
    );

    owner.perform_hk().unwrap();
    assert!(drain(&owner.hk_destination).is_empty());

    owner.data.int64_vec.set_changed(true);
    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    let gpid = Gpid::new(OWNER_ID, INT64_VEC2_ID);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].command, HkCommand::UpdateNotificationVariable { gpid });
    assert!(!owner.data.int64_vec.has_changed());

    owner.handle(&messages[0]).unwrap();
    assert_eq!(owner.data.changed_variables, [(gpid, None)]);
}

#[test]
fn test_subscribing_unknown_data_is_rejected() {
    let mut owner = TestOwner::new();
    let target = owner.hk_destination.id();
    assert_eq!(
        owner
            .manager
            .subscribe_for_set_update_message(&mut owner.data, 42, NO_OBJECT, target, false),
        Err(PoolError::DatasetNotFound)
    );
    assert_eq!(
        owner
            .manager
            .subscribe_for_variable_update_message(&mut owner.data, UINT8_ID, NO_OBJECT, target, false),
        Err(PoolError::PoolObjectNotFound)
    );
    assert_eq!(
        owner.manager.subscribe_for_periodic_packet(
            &mut owner.data,
            HkSubscription::regular(Sid::new(OWNER_ID, 42), true, 1.0)
        ),
        Err(PoolError::DatasetNotFound)
    );
    assert!(owner.manager.receivers().is_empty());
}

#[test]
fn test_receiver_list_capacity() {
    let mut owner = TestOwner::new();
    let capacity = satpool::config::MAX_HK_RECEIVERS;
    for _ in 0..capacity {
        subscribe_set_message(&mut owner, false);
    }
    let target = owner.hk_destination.id();
    assert_eq!(
        owner
            .manager
            .subscribe_for_set_update_message(&mut owner.data, TEST_SET_ID, NO_OBJECT, target, false),
        Err(PoolError::ReceiverListFull)
    );
    assert_eq!(owner.manager.receivers().len(), capacity);

    owner.manager.clear_receivers_list();
    assert!(owner.manager.receivers().is_empty());
    assert!(owner.manager.reset_helper(DataId::Set(TEST_SID)).is_none());
}

#[test]
fn test_periodic_diagnostics_every_pass() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::diagnostics(TEST_SID, true, 0.2))
        .unwrap();
    assert!(owner.data.dataset.is_diagnostics());
    assert!(owner.data.dataset.reporting_enabled());

    for _ in 0..3 {
        owner.perform_hk().unwrap();
    }
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 3);
    assert!(messages
        .iter()
        .all(|m| matches!(m.command, HkCommand::DiagnosticsReport { sid, .. } if sid == TEST_SID)));
    for message in &messages {
        message.clear(owner.store.as_ref()).unwrap();
    }
}

#[test]
fn test_periodic_regular_set_scaled_by_factor() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 0.2))
        .unwrap();

    for _ in 0..4 {
        owner.perform_hk().unwrap();
    }
    assert!(drain(&owner.hk_destination).is_empty());
    owner.perform_hk().unwrap();
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].command, HkCommand::HkReport { .. }));
}

#[test]
fn test_periodic_disabled_set_is_silent() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::diagnostics(TEST_SID, false, 0.2))
        .unwrap();
    for _ in 0..3 {
        owner.perform_hk().unwrap();
    }
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_periodic_packet_to_explicit_receiver() {
    let mut owner = TestOwner::new();
    let other = owner.hub.create_queue(4);
    owner
        .manager
        .subscribe_for_periodic_packet(
            &mut owner.data,
            HkSubscription::diagnostics(TEST_SID, true, 0.2).with_receiver(other.id()),
        )
        .unwrap();
    owner.perform_hk().unwrap();
    assert_eq!(drain(&other).len(), 1);
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_toggle_commands() {
    let mut owner = TestOwner::new();
    let ground = owner.hub.create_queue(8);
    let manager_queue = owner.manager.queue_id();
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::regular(TEST_SID, false, 1.0))
        .unwrap();

    ground
        .send_message(manager_queue, CommandMessage::new(HkCommand::toggle_reporting(TEST_SID, true, false)))
        .unwrap();
    ground
        .send_message(manager_queue, CommandMessage::new(HkCommand::toggle_reporting(TEST_SID, true, false)))
        .unwrap();
    ground
        .send_message(manager_queue, CommandMessage::new(HkCommand::toggle_reporting(TEST_SID, false, true)))
        .unwrap();
    let results = owner.process_queue();
    assert_eq!(
        results,
        [
            Ok(()),
            Err(PoolError::ReportingStatusUnchanged),
            Err(PoolError::WrongHkPacketType)
        ]
    );
    assert!(owner.data.dataset.reporting_enabled());

    let replies = drain(&ground);
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0].command, HkCommand::HkRequestSuccess { sid: TEST_SID });
    assert_eq!(replies[1].command.failure_error(), Some(PoolError::ReportingStatusUnchanged));
    assert_eq!(replies[2].command.failure_error(), Some(PoolError::WrongHkPacketType));
    assert!(replies.iter().all(|r| r.sender == manager_queue));
    // Nothing goes to the HK destination
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_reply_without_sender_goes_to_hk_destination() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 1.0))
        .unwrap();
    let message = CommandMessage::new(HkCommand::toggle_reporting(TEST_SID, false, false));
    assert_eq!(message.sender, NO_QUEUE);
    owner.handle(&message).unwrap();
    let replies = drain(&owner.hk_destination);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].command, HkCommand::HkRequestSuccess { sid: TEST_SID });
}

#[test]
fn test_unknown_set_gets_failure_reply() {
    let mut owner = TestOwner::new();
    let unknown = Sid::new(OWNER_ID, 99);
    assert_eq!(
        owner.handle(&CommandMessage::new(HkCommand::toggle_reporting(unknown, true, false))),
        Err(PoolError::DatasetNotFound)
    );
    let replies = drain(&owner.hk_destination);
    assert_eq!(
        replies[0].command,
        HkCommand::HkRequestFailure {
            sid: unknown,
            error_code: PoolError::DatasetNotFound.code()
        }
    );
}

#[test]
fn test_collection_interval_change() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 0.2))
        .unwrap();
    owner
        .handle(&CommandMessage::new(HkCommand::collection_interval_modification(
            TEST_SID, 2.0, false,
        )))
        .unwrap();
    let helper = owner.data.dataset.periodic_helper().unwrap();
    assert_eq!(helper.collection_interval_ticks(), 50);
    assert!((helper.collection_interval_seconds() - 2.0).abs() < 1e-6);
    assert_eq!(
        drain(&owner.hk_destination)[0].command,
        HkCommand::HkRequestSuccess { sid: TEST_SID }
    );

    assert_eq!(
        owner.handle(&CommandMessage::new(HkCommand::collection_interval_modification(
            TEST_SID, 2.0, true,
        ))),
        Err(PoolError::WrongHkPacketType)
    );
}

#[test]
fn test_structure_report() {
    let mut owner = TestOwner::new();
    let ground = owner.hub.create_queue(8);
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 1.0))
        .unwrap();
    ground
        .send_message(owner.manager.queue_id(), CommandMessage::new(HkCommand::structure_report(TEST_SID, false)))
        .unwrap();
    assert_eq!(owner.process_queue(), [Ok(())]);

    let replies = drain(&ground);
    assert_eq!(replies.len(), 1);
    let HkCommand::HkDefinitionsReport { sid, store_id } = replies[0].command else {
        panic!("unexpected reply {:?}", replies[0]);
    };
    assert_eq!(sid, TEST_SID);
    let data = owner.store.get_data(store_id).unwrap();
    let packet = HousekeepingSetPacket::parse(&data, Endianness::Big).unwrap();
    assert_eq!(packet.sid, TEST_SID);
    assert!(!packet.diagnostics);
    assert!(packet.reporting_enabled);
    assert!(!packet.valid);
    assert!((packet.collection_interval_s - 1.0).abs() < 1e-6);
    assert_eq!(packet.local_pool_ids, [UINT8_ID, FLOAT_ID, UINT16_VEC3_ID]);
    assert_eq!(data.len(), packet.serialized_size());

    assert_eq!(
        owner.handle(&CommandMessage::new(HkCommand::structure_report(TEST_SID, true))),
        Err(PoolError::WrongHkPacketType)
    );
}

#[test]
fn test_one_shot_reports() {
    let mut owner = TestOwner::new();
    let ground = owner.hub.create_queue(8);
    owner
        .manager
        .subscribe_for_periodic_packet(&mut owner.data, HkSubscription::regular(TEST_SID, false, 1.0))
        .unwrap();
    owner.write_test_set(3, 0.5, [1, 2, 3]);

    ground
        .send_message(owner.manager.queue_id(), CommandMessage::new(HkCommand::one_shot_report(TEST_SID, true)))
        .unwrap();
    ground
        .send_message(owner.manager.queue_id(), CommandMessage::new(HkCommand::one_shot_report(TEST_SID, false)))
        .unwrap();
    assert_eq!(owner.process_queue(), [Err(PoolError::WrongHkPacketType), Ok(())]);

    let replies = drain(&ground);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].command.failure_error(), Some(PoolError::WrongHkPacketType));

    // The report itself goes to the HK destination, even with reporting disabled
    let reports = drain(&owner.hk_destination);
    assert_eq!(reports.len(), 1);
    let HkCommand::HkReport { store_id, .. } = reports[0].command else {
        panic!("unexpected report {:?}", reports[0]);
    };
    let data = owner.store.get_data(store_id).unwrap();
    let (header, rest) = HkPacketHeader::parse(&data, Endianness::Big).unwrap();
    assert_eq!(header.sid, TEST_SID);
    assert_eq!(rest[0], 3);
}

#[test]
fn test_non_command_messages_are_not_handled() {
    let mut owner = TestOwner::new();
    assert_eq!(
        owner.handle(&CommandMessage::new(HkCommand::HkRequestSuccess { sid: TEST_SID })),
        Err(PoolError::UnknownCommand)
    );
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_full_store_is_reported() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_update_packet(&mut owner.data, HkSubscription::regular(TEST_SID, true, 0.0))
        .unwrap();
    while owner.store.add_data(&[0]).is_ok() {}
    assert_eq!(owner.store.free_elements(), 0);

    owner.write_test_set(1, 1.0, [1, 1, 1]);
    assert_eq!(owner.perform_hk(), Err(PoolError::StoreFull));
    assert!(drain(&owner.hk_destination).is_empty());
    assert_eq!(owner.reporter.counters().store_hits, 1);
}

#[test]
fn test_set_change_seen_once_when_snapshot_cannot_be_stored() {
    let mut owner = TestOwner::new();
    subscribe_set_message(&mut owner, false);
    subscribe_set_message(&mut owner, true);
    while owner.store.add_data(&[0]).is_ok() {}

    owner.write_test_set(1, 2.0, [3, 4, 5]);
    assert_eq!(owner.perform_hk(), Err(PoolError::StoreFull));
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].command, HkCommand::UpdateNotificationSet { sid: TEST_SID });
    assert!(!owner.data.dataset.has_changed());

    // The dropped snapshot is not retried and the notification is not repeated
    owner.store.clear();
    owner.perform_hk().unwrap();
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_variable_change_seen_once_when_snapshot_cannot_be_stored() {
    let mut owner = TestOwner::new();
    subscribe_variable_message(&mut owner, UINT32_ID, false);
    subscribe_variable_message(&mut owner, UINT32_ID, true);
    while owner.store.add_data(&[0]).is_ok() {}

    owner.data.uint32_var.set_changed(true);
    assert_eq!(owner.perform_hk(), Err(PoolError::StoreFull));
    let messages = drain(&owner.hk_destination);
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].command,
        HkCommand::UpdateNotificationVariable {
            gpid: Gpid::new(OWNER_ID, UINT32_ID)
        }
    );
    assert!(!owner.data.uint32_var.has_changed());

    owner.store.clear();
    owner.perform_hk().unwrap();
    assert!(drain(&owner.hk_destination).is_empty());
}

#[test]
fn test_configured_lock_timeout_reaches_pool() {
    let owner = TestOwner::with_config(HkManagerConfig {
        lock_timeout_ms: 500,
        ..HkManagerConfig::default()
    });
    assert_eq!(owner.manager.pool().lock_timeout(), MutexTimeout::from_millis(500));
    assert_eq!(owner.data.dataset.pool().lock_timeout(), MutexTimeout::from_millis(500));
}

#[test]
fn test_undeliverable_packet_releases_store_data() {
    let mut owner = TestOwner::new();
    owner
        .manager
        .subscribe_for_update_packet(
            &mut owner.data,
            HkSubscription::regular(TEST_SID, true, 0.0).with_receiver(0x7777),
        )
        .unwrap();
    let free = owner.store.free_elements();

    owner.write_test_set(1, 1.0, [1, 1, 1]);
    assert_eq!(owner.perform_hk(), Err(PoolError::QueueOrDestinationInvalid));
    assert_eq!(owner.store.free_elements(), free);
    let counters = owner.reporter.counters();
    assert_eq!(counters.queue_hits, 1);
    assert_eq!(counters.lost_tm, 1);
    assert_eq!(counters.store_hits, 0);
}

