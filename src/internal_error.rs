use crate::error::PoolError;
use crate::ids::ObjectId;
use heapless::Vec;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const MAX_ERROR_HISTORY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternalErrorKind {
    /// A telemetry packet was dropped.
    LostTm,
    /// A message could not be sent.
    QueueHit,
    /// The shared store had no room for a packet.
    StoreHit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalErrorRecord {
    pub id: u32,
    pub kind: InternalErrorKind,
    pub source: ObjectId,
    pub error_code: u16,
    pub timestamp_ms: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalErrorCounters {
    pub lost_tm: u32,
    pub queue_hits: u32,
    pub store_hits: u32,
}

#[derive(Debug)]
struct ReporterState {
    counters: InternalErrorCounters,
    history: Vec<InternalErrorRecord, MAX_ERROR_HISTORY>,
    next_id: u32,
}

/// Counts resource errors of the housekeeping layer and keeps a bounded
/// history of the most recent ones. Shared between managers.
#[derive(Debug)]
pub struct InternalErrorReporter {
    state: Mutex<ReporterState>,
}

impl InternalErrorReporter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReporterState {
                counters: InternalErrorCounters::default(),
                history: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn record(&self, kind: InternalErrorKind, source: ObjectId, error: PoolError) -> u32 {
        let mut state = self.state.lock();
        match kind {
            InternalErrorKind::LostTm => state.counters.lost_tm = state.counters.lost_tm.wrapping_add(1),
            InternalErrorKind::QueueHit => state.counters.queue_hits = state.counters.queue_hits.wrapping_add(1),
            InternalErrorKind::StoreHit => state.counters.store_hits = state.counters.store_hits.wrapping_add(1),
        }

        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        if state.history.is_full() {
            state.history.remove(0);
        }
        let _ = state.history.push(InternalErrorRecord {
            id,
            kind,
            source,
            error_code: error.code(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        });
        id
    }

    pub fn counters(&self) -> InternalErrorCounters {
        self.state.lock().counters
    }

    pub fn history(&self) -> alloc::vec::Vec<InternalErrorRecord> {
        self.state.lock().history.iter().cloned().collect()
    }

    /// Returns the counters and resets them to zero.
    pub fn take_counters(&self) -> InternalErrorCounters {
        core::mem::take(&mut self.state.lock().counters)
    }
}

impl Default for InternalErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
