//! Housekeeping reporting: the per-owner manager, its command protocol, packet
//! layouts and the periodic collection helper.

pub mod manager;
pub mod message;
pub mod packet;
pub mod periodic;

pub use manager::{
    DataId, HasLocalDataPool, HkReceiver, HkSubscription, HkUpdateResetHelper, LocalDataPoolManager,
    ReportingType,
};
pub use message::{CommandMessage, HkCommand};
pub use packet::{
    decode_validity_mask, HkPacketHeader, HousekeepingPacketDownlink, HousekeepingSetPacket, HousekeepingSnapshot,
};
pub use periodic::PeriodicHousekeepingHelper;
