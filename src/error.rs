//! Return codes of the data pool and housekeeping layer.
//!
//! Every failure mode maps onto one [`PoolError`] variant. Variants carry a
//! stable 16-bit code (interface id in the high byte, error number in the low
//! byte) so they can travel inside an `HK_REQUEST_FAILURE` reply.

/// Interface ids used in the high byte of a return code.
pub mod interface {
    pub const LOCAL_POOL: u8 = 0x0D;
    pub const DATA_SET: u8 = 0x0E;
    pub const POOL_VARIABLE: u8 = 0x0F;
    pub const HOUSEKEEPING_MANAGER: u8 = 0x10;
    pub const MESSAGE_QUEUE: u8 = 0x11;
    pub const STORAGE_MANAGER: u8 = 0x12;
    pub const SERIALIZE: u8 = 0x13;
    pub const OBJECT_MANAGER: u8 = 0x14;
}

pub type Result<T> = core::result::Result<T, PoolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    // Local pool
    #[error("pool entry not found")]
    PoolEntryNotFound,
    #[error("pool entry type conflict")]
    PoolEntryTypeConflict,
    #[error("pool map was already initialized")]
    PoolMapAlreadyInitialized,
    #[error("pool mutex lock timed out")]
    LockTimeout,

    // Data sets
    #[error("data set is not in the uninitialised state")]
    DataSetUninitialised,
    #[error("pool variable is null")]
    PoolVarNull,
    #[error("data set is full")]
    DataSetFull,
    #[error("data set was already read")]
    SetWasAlreadyRead,
    #[error("invalid parameter definition")]
    InvalidParameterDefinition,
    #[error("commit without read on a readable variable")]
    CommitingWithoutReading,
    #[error("variable belongs to a different pool owner")]
    ForeignPoolVariable,

    // Pool variables
    #[error("variable is read-only")]
    ReadOnlyVariable,

    // Housekeeping manager
    #[error("queue or destination not set")]
    QueueOrDestinationInvalid,
    #[error("wrong housekeeping packet type")]
    WrongHkPacketType,
    #[error("reporting status unchanged")]
    ReportingStatusUnchanged,
    #[error("periodic helper invalid")]
    PeriodicHelperInvalid,
    #[error("pool object not found")]
    PoolObjectNotFound,
    #[error("data set not found")]
    DatasetNotFound,
    #[error("housekeeping receiver list is full")]
    ReceiverListFull,
    #[error("unknown command")]
    UnknownCommand,

    // Message queues
    #[error("message queue full")]
    QueueFull,

    // Storage
    #[error("store is full")]
    StoreFull,
    #[error("data too large for any store page")]
    DataTooLarge,
    #[error("store data does not exist")]
    DataDoesNotExist,

    // Serialization
    #[error("buffer too short")]
    BufferTooShort,
    #[error("stream too short")]
    StreamTooShort,

    // Object lookup
    #[error("object not found")]
    ObjectNotFound,
}

const fn make_code(interface: u8, number: u8) -> u16 {
    ((interface as u16) << 8) | number as u16
}

const ALL_ERRORS: [PoolError; 27] = [
    PoolError::PoolEntryNotFound,
    PoolError::PoolEntryTypeConflict,
    PoolError::PoolMapAlreadyInitialized,
    PoolError::LockTimeout,
    PoolError::DataSetUninitialised,
    PoolError::PoolVarNull,
    PoolError::DataSetFull,
    PoolError::SetWasAlreadyRead,
    PoolError::InvalidParameterDefinition,
    PoolError::CommitingWithoutReading,
    PoolError::ForeignPoolVariable,
    PoolError::ReadOnlyVariable,
    PoolError::QueueOrDestinationInvalid,
    PoolError::WrongHkPacketType,
    PoolError::ReportingStatusUnchanged,
    PoolError::PeriodicHelperInvalid,
    PoolError::PoolObjectNotFound,
    PoolError::DatasetNotFound,
    PoolError::ReceiverListFull,
    PoolError::UnknownCommand,
    PoolError::QueueFull,
    PoolError::StoreFull,
    PoolError::DataTooLarge,
    PoolError::DataDoesNotExist,
    PoolError::BufferTooShort,
    PoolError::StreamTooShort,
    PoolError::ObjectNotFound,
];

impl PoolError {
    /// Stable return code of this error.
    pub const fn code(self) -> u16 {
        use interface::*;
        match self {
            PoolError::PoolEntryNotFound => make_code(LOCAL_POOL, 0x00),
            PoolError::PoolEntryTypeConflict => make_code(LOCAL_POOL, 0x01),
            PoolError::PoolMapAlreadyInitialized => make_code(LOCAL_POOL, 0x02),
            PoolError::LockTimeout => make_code(LOCAL_POOL, 0x03),
            PoolError::DataSetUninitialised => make_code(DATA_SET, 0x01),
            PoolError::PoolVarNull => make_code(DATA_SET, 0x02),
            PoolError::DataSetFull => make_code(DATA_SET, 0x03),
            PoolError::SetWasAlreadyRead => make_code(DATA_SET, 0x04),
            PoolError::InvalidParameterDefinition => make_code(DATA_SET, 0x05),
            PoolError::CommitingWithoutReading => make_code(DATA_SET, 0x06),
            PoolError::ForeignPoolVariable => make_code(DATA_SET, 0x07),
            PoolError::ReadOnlyVariable => make_code(POOL_VARIABLE, 0x01),
            PoolError::QueueOrDestinationInvalid => make_code(HOUSEKEEPING_MANAGER, 0x00),
            PoolError::WrongHkPacketType => make_code(HOUSEKEEPING_MANAGER, 0x01),
            PoolError::ReportingStatusUnchanged => make_code(HOUSEKEEPING_MANAGER, 0x02),
            PoolError::PeriodicHelperInvalid => make_code(HOUSEKEEPING_MANAGER, 0x03),
            PoolError::PoolObjectNotFound => make_code(HOUSEKEEPING_MANAGER, 0x04),
            PoolError::DatasetNotFound => make_code(HOUSEKEEPING_MANAGER, 0x05),
            PoolError::ReceiverListFull => make_code(HOUSEKEEPING_MANAGER, 0x06),
            PoolError::UnknownCommand => make_code(HOUSEKEEPING_MANAGER, 0x07),
            PoolError::QueueFull => make_code(MESSAGE_QUEUE, 0x02),
            PoolError::StoreFull => make_code(STORAGE_MANAGER, 0x02),
            PoolError::DataTooLarge => make_code(STORAGE_MANAGER, 0x03),
            PoolError::DataDoesNotExist => make_code(STORAGE_MANAGER, 0x07),
            PoolError::BufferTooShort => make_code(SERIALIZE, 0x01),
            PoolError::StreamTooShort => make_code(SERIALIZE, 0x02),
            PoolError::ObjectNotFound => make_code(OBJECT_MANAGER, 0x01),
        }
    }

    /// Inverse of [`PoolError::code`].
    pub fn from_code(code: u16) -> Option<Self> {
        ALL_ERRORS.iter().copied().find(|e| e.code() == code)
    }

    /// Whether the error stems from misconfiguration rather than from a
    /// resource or data problem.
    pub fn is_configuration_error(self) -> bool {
        matches!(
            self,
            PoolError::PoolEntryNotFound
                | PoolError::PoolEntryTypeConflict
                | PoolError::PoolMapAlreadyInitialized
                | PoolError::DataSetUninitialised
                | PoolError::PoolVarNull
                | PoolError::DataSetFull
                | PoolError::CommitingWithoutReading
                | PoolError::ForeignPoolVariable
                | PoolError::DatasetNotFound
                | PoolError::PoolObjectNotFound
                | PoolError::PeriodicHelperInvalid
        )
    }
}
