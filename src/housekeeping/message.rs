use crate::error::{PoolError, Result};
use crate::ids::{Gpid, MessageQueueId, Sid, StoreId, NO_QUEUE};
use crate::ipc::StorageManager;
use serde::{Deserialize, Serialize};

/// Message type id of housekeeping commands.
pub const MESSAGE_ID: u8 = 11;

pub const fn make_command_id(number: u8) -> u16 {
    ((MESSAGE_ID as u16) << 8) | number as u16
}

pub mod command_id {
    use super::make_command_id;

    pub const ENABLE_PERIODIC_HK_REPORT_GENERATION: u16 = make_command_id(5);
    pub const DISABLE_PERIODIC_HK_REPORT_GENERATION: u16 = make_command_id(6);
    pub const ENABLE_PERIODIC_DIAGNOSTICS_GENERATION: u16 = make_command_id(7);
    pub const DISABLE_PERIODIC_DIAGNOSTICS_GENERATION: u16 = make_command_id(8);
    pub const REPORT_HK_REPORT_STRUCTURES: u16 = make_command_id(9);
    pub const HK_DEFINITIONS_REPORT: u16 = make_command_id(10);
    pub const REPORT_DIAGNOSTICS_REPORT_STRUCTURES: u16 = make_command_id(11);
    pub const DIAGNOSTICS_DEFINITION_REPORT: u16 = make_command_id(12);
    pub const HK_REPORT: u16 = make_command_id(25);
    pub const DIAGNOSTICS_REPORT: u16 = make_command_id(26);
    pub const GENERATE_ONE_PARAMETER_REPORT: u16 = make_command_id(27);
    pub const GENERATE_ONE_DIAGNOSTICS_REPORT: u16 = make_command_id(28);
    pub const MODIFY_PARAMETER_REPORT_COLLECTION_INTERVAL: u16 = make_command_id(31);
    pub const MODIFY_DIAGNOSTICS_REPORT_COLLECTION_INTERVAL: u16 = make_command_id(32);
    pub const HK_REQUEST_SUCCESS: u16 = make_command_id(128);
    pub const HK_REQUEST_FAILURE: u16 = make_command_id(129);
    pub const UPDATE_NOTIFICATION_SET: u16 = make_command_id(130);
    pub const UPDATE_NOTIFICATION_VARIABLE: u16 = make_command_id(131);
    pub const UPDATE_SNAPSHOT_SET: u16 = make_command_id(132);
    pub const UPDATE_SNAPSHOT_VARIABLE: u16 = make_command_id(133);
}

/// Housekeeping commands, replies and notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HkCommand {
    EnablePeriodicHkGeneration { sid: Sid },
    DisablePeriodicHkGeneration { sid: Sid },
    EnablePeriodicDiagnosticsGeneration { sid: Sid },
    DisablePeriodicDiagnosticsGeneration { sid: Sid },
    ReportHkStructures { sid: Sid },
    ReportDiagnosticsStructures { sid: Sid },
    HkDefinitionsReport { sid: Sid, store_id: StoreId },
    DiagnosticsDefinitionReport { sid: Sid, store_id: StoreId },
    HkReport { sid: Sid, store_id: StoreId },
    DiagnosticsReport { sid: Sid, store_id: StoreId },
    GenerateOneParameterReport { sid: Sid },
    GenerateOneDiagnosticsReport { sid: Sid },
    ModifyParameterReportCollectionInterval { sid: Sid, interval_s: f32 },
    ModifyDiagnosticsReportCollectionInterval { sid: Sid, interval_s: f32 },
    HkRequestSuccess { sid: Sid },
    HkRequestFailure { sid: Sid, error_code: u16 },
    UpdateNotificationSet { sid: Sid },
    UpdateNotificationVariable { gpid: Gpid },
    UpdateSnapshotSet { sid: Sid, store_id: StoreId },
    UpdateSnapshotVariable { gpid: Gpid, store_id: StoreId },
}

impl HkCommand {
    pub fn toggle_reporting(sid: Sid, enable: bool, diagnostics: bool) -> Self {
        match (enable, diagnostics) {
            (true, false) => HkCommand::EnablePeriodicHkGeneration { sid },
            (false, false) => HkCommand::DisablePeriodicHkGeneration { sid },
            (true, true) => HkCommand::EnablePeriodicDiagnosticsGeneration { sid },
            (false, true) => HkCommand::DisablePeriodicDiagnosticsGeneration { sid },
        }
    }

    pub fn structure_report(sid: Sid, diagnostics: bool) -> Self {
        if diagnostics {
            HkCommand::ReportDiagnosticsStructures { sid }
        } else {
            HkCommand::ReportHkStructures { sid }
        }
    }

    pub fn one_shot_report(sid: Sid, diagnostics: bool) -> Self {
        if diagnostics {
            HkCommand::GenerateOneDiagnosticsReport { sid }
        } else {
            HkCommand::GenerateOneParameterReport { sid }
        }
    }

    pub fn collection_interval_modification(sid: Sid, interval_s: f32, diagnostics: bool) -> Self {
        if diagnostics {
            HkCommand::ModifyDiagnosticsReportCollectionInterval { sid, interval_s }
        } else {
            HkCommand::ModifyParameterReportCollectionInterval { sid, interval_s }
        }
    }

    pub fn failure(sid: Sid, error: PoolError) -> Self {
        HkCommand::HkRequestFailure {
            sid,
            error_code: error.code(),
        }
    }

    pub fn command_id(&self) -> u16 {
        use command_id::*;
        match self {
            HkCommand::EnablePeriodicHkGeneration { .. } => ENABLE_PERIODIC_HK_REPORT_GENERATION,
            HkCommand::DisablePeriodicHkGeneration { .. } => DISABLE_PERIODIC_HK_REPORT_GENERATION,
            HkCommand::EnablePeriodicDiagnosticsGeneration { .. } => ENABLE_PERIODIC_DIAGNOSTICS_GENERATION,
            HkCommand::DisablePeriodicDiagnosticsGeneration { .. } => DISABLE_PERIODIC_DIAGNOSTICS_GENERATION,
            HkCommand::ReportHkStructures { .. } => REPORT_HK_REPORT_STRUCTURES,
            HkCommand::ReportDiagnosticsStructures { .. } => REPORT_DIAGNOSTICS_REPORT_STRUCTURES,
            HkCommand::HkDefinitionsReport { .. } => HK_DEFINITIONS_REPORT,
            HkCommand::DiagnosticsDefinitionReport { .. } => DIAGNOSTICS_DEFINITION_REPORT,
            HkCommand::HkReport { .. } => HK_REPORT,
            HkCommand::DiagnosticsReport { .. } => DIAGNOSTICS_REPORT,
            HkCommand::GenerateOneParameterReport { .. } => GENERATE_ONE_PARAMETER_REPORT,
            HkCommand::GenerateOneDiagnosticsReport { .. } => GENERATE_ONE_DIAGNOSTICS_REPORT,
            HkCommand::ModifyParameterReportCollectionInterval { .. } => {
                MODIFY_PARAMETER_REPORT_COLLECTION_INTERVAL
            }
            HkCommand::ModifyDiagnosticsReportCollectionInterval { .. } => {
                MODIFY_DIAGNOSTICS_REPORT_COLLECTION_INTERVAL
            }
            HkCommand::HkRequestSuccess { .. } => HK_REQUEST_SUCCESS,
            HkCommand::HkRequestFailure { .. } => HK_REQUEST_FAILURE,
            HkCommand::UpdateNotificationSet { .. } => UPDATE_NOTIFICATION_SET,
            HkCommand::UpdateNotificationVariable { .. } => UPDATE_NOTIFICATION_VARIABLE,
            HkCommand::UpdateSnapshotSet { .. } => UPDATE_SNAPSHOT_SET,
            HkCommand::UpdateSnapshotVariable { .. } => UPDATE_SNAPSHOT_VARIABLE,
        }
    }

    /// Structure id carried by the message, if any.
    pub fn sid(&self) -> Option<Sid> {
        match *self {
            HkCommand::EnablePeriodicHkGeneration { sid }
            | HkCommand::DisablePeriodicHkGeneration { sid }
            | HkCommand::EnablePeriodicDiagnosticsGeneration { sid }
            | HkCommand::DisablePeriodicDiagnosticsGeneration { sid }
            | HkCommand::ReportHkStructures { sid }
            | HkCommand::ReportDiagnosticsStructures { sid }
            | HkCommand::HkDefinitionsReport { sid, .. }
            | HkCommand::DiagnosticsDefinitionReport { sid, .. }
            | HkCommand::HkReport { sid, .. }
            | HkCommand::DiagnosticsReport { sid, .. }
            | HkCommand::GenerateOneParameterReport { sid }
            | HkCommand::GenerateOneDiagnosticsReport { sid }
            | HkCommand::ModifyParameterReportCollectionInterval { sid, .. }
            | HkCommand::ModifyDiagnosticsReportCollectionInterval { sid, .. }
            | HkCommand::HkRequestSuccess { sid }
            | HkCommand::HkRequestFailure { sid, .. }
            | HkCommand::UpdateNotificationSet { sid }
            | HkCommand::UpdateSnapshotSet { sid, .. } => Some(sid),
            HkCommand::UpdateNotificationVariable { .. } | HkCommand::UpdateSnapshotVariable { .. } => None,
        }
    }

    /// Store element referenced by report and snapshot messages.
    pub fn store_id(&self) -> Option<StoreId> {
        match *self {
            HkCommand::HkDefinitionsReport { store_id, .. }
            | HkCommand::DiagnosticsDefinitionReport { store_id, .. }
            | HkCommand::HkReport { store_id, .. }
            | HkCommand::DiagnosticsReport { store_id, .. }
            | HkCommand::UpdateSnapshotSet { store_id, .. }
            | HkCommand::UpdateSnapshotVariable { store_id, .. } => Some(store_id),
            _ => None,
        }
    }

    /// Error carried by a failure reply.
    pub fn failure_error(&self) -> Option<PoolError> {
        match *self {
            HkCommand::HkRequestFailure { error_code, .. } => PoolError::from_code(error_code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Queue of the sender. Filled in by the sending queue.
    pub sender: MessageQueueId,
    pub command: HkCommand,
}

impl CommandMessage {
    pub fn new(command: HkCommand) -> Self {
        Self {
            sender: NO_QUEUE,
            command,
        }
    }

    pub fn command_id(&self) -> u16 {
        self.command.command_id()
    }

    /// Releases the store data referenced by this message, if any.
    pub fn clear(&self, store: &dyn StorageManager) -> Result<()> {
        match self.command.store_id() {
            Some(store_id) => store.delete_data(store_id),
            None => Ok(()),
        }
    }
}
