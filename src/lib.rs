//! # Satellite Local Data Pool
//!
//! Per-component data pools with transactional datasets and a housekeeping
//! engine that turns pool content into telemetry.
//!
//! ## Features
//!
//! - **Local data pool**: typed, validity-flagged entries behind one timed mutex per owner
//! - **Accessors**: scalar and fixed-length vector proxies with read/commit semantics
//! - **Datasets**: groups of accessors read and committed under a single lock
//! - **Housekeeping**: periodic, on-change, notification and snapshot reporting
//! - **Command protocol**: enable/disable, interval change, one-shot and structure reports
//! - **Bounded memory**: fixed-capacity receiver lists and dataset registrations
//!
//! ## Quick Start
//!
//! ```rust
//! use satpool::pool::{MutexTimeout, PoolEntry, PoolHandle, PoolVariable, ReadWriteMode};
//! use satpool::{LocalDataSet, LocalPoolDataSet};
//!
//! // Pool of one owner with a single u16 entry
//! let pool = PoolHandle::new(0x4000);
//! pool.lock(MutexTimeout::Blocking)
//!     .unwrap()
//!     .insert_once([(1, PoolEntry::new(&[21u16], true))])
//!     .unwrap();
//!
//! // Read, modify and commit through a dataset
//! let mut set = LocalPoolDataSet::<4>::new(&pool, 1);
//! let temperature = set
//!     .register_variable(PoolVariable::<u16>::new(&pool, 1, ReadWriteMode::ReadWrite))
//!     .unwrap();
//! set.read(MutexTimeout::Polling).unwrap();
//! set.get_mut(&temperature).unwrap().set_value(22);
//! set.commit(MutexTimeout::Polling).unwrap();
//! ```
//!
//! ## Architecture
//!
//! - [`pool`] - Pool entries, the owner's store and accessors
//! - [`dataset`] - Transactional variable groups
//! - [`housekeeping`] - HK manager, messages, packets and the periodic helper
//! - [`ipc`] - In-process message queues and the shared packet store
//! - [`time`] - CCSDS timestamps for snapshots
//! - [`error`] - Return codes

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::struct_excessive_bools)]

extern crate alloc;

pub mod config;
pub mod dataset;
pub mod error;
pub mod housekeeping;
pub mod ids;
pub mod internal_error;
pub mod ipc;
pub mod pool;
pub mod serialize;
pub mod time;

// Re-export main public types for convenience
pub use config::{HkManagerConfig, StoreConfig};
pub use dataset::{LocalDataSet, LocalPoolDataSet};
pub use error::{PoolError, Result};
pub use housekeeping::{CommandMessage, HasLocalDataPool, HkCommand, HkSubscription, LocalDataPoolManager};
pub use ids::{Gpid, LocalPoolId, ObjectId, Sid};
pub use internal_error::InternalErrorReporter;
pub use pool::{MutexTimeout, PoolEntry, PoolHandle, PoolVariable, PoolVector, ReadWriteMode};
