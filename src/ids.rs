use serde::{Deserialize, Serialize};

pub type ObjectId = u32;
pub type LocalPoolId = u32;
pub type MessageQueueId = u32;

/// Object id which names no object.
pub const NO_OBJECT: ObjectId = 0xFFFF_FFFF;
/// Pool id which names no pool variable. Read and commit on it are no-ops.
pub const NO_PARAMETER: LocalPoolId = 0;
pub const NO_QUEUE: MessageQueueId = 0;

/// Structure id: names one dataset definition system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sid {
    pub object_id: ObjectId,
    pub set_id: u32,
}

impl Sid {
    pub const INVALID: Sid = Sid {
        object_id: NO_OBJECT,
        set_id: 0xFFFF_FFFF,
    };

    pub const fn new(object_id: ObjectId, set_id: u32) -> Self {
        Self { object_id, set_id }
    }

    pub const fn raw(&self) -> u64 {
        ((self.object_id as u64) << 32) | self.set_id as u64
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self {
            object_id: (raw >> 32) as u32,
            set_id: raw as u32,
        }
    }

    pub fn not_set(&self) -> bool {
        *self == Sid::INVALID
    }
}

impl Default for Sid {
    fn default() -> Self {
        Sid::INVALID
    }
}

impl core::fmt::Display for Sid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x}:{}", self.object_id, self.set_id)
    }
}

/// Global pool id: names one pool variable system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gpid {
    pub object_id: ObjectId,
    pub local_pool_id: LocalPoolId,
}

impl Gpid {
    pub const INVALID: Gpid = Gpid {
        object_id: NO_OBJECT,
        local_pool_id: NO_PARAMETER,
    };

    pub const fn new(object_id: ObjectId, local_pool_id: LocalPoolId) -> Self {
        Self {
            object_id,
            local_pool_id,
        }
    }

    pub const fn raw(&self) -> u64 {
        ((self.object_id as u64) << 32) | self.local_pool_id as u64
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self {
            object_id: (raw >> 32) as u32,
            local_pool_id: raw as u32,
        }
    }
}

impl core::fmt::Display for Gpid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:08x}:{}", self.object_id, self.local_pool_id)
    }
}

/// Address of one element in the shared IPC store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreId {
    pub pool_index: u16,
    pub packet_index: u16,
}

impl StoreId {
    pub const fn new(pool_index: u16, packet_index: u16) -> Self {
        Self {
            pool_index,
            packet_index,
        }
    }

    pub const fn raw(&self) -> u32 {
        ((self.pool_index as u32) << 16) | self.packet_index as u32
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self {
            pool_index: (raw >> 16) as u16,
            packet_index: raw as u16,
        }
    }
}
