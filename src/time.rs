//! CCSDS day-segmented (CDS short) timestamps for housekeeping snapshots.

use crate::error::{PoolError, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Serialized size of a CDS short timestamp.
pub const TIMESTAMP_SIZE: usize = 7;
/// P-field: CDS time code, 1958 epoch, 16-bit day segment, no sub-millisecond field.
pub const CDS_SHORT_P_FIELD: u8 = 0x40;

const MS_PER_DAY: u32 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdsShortTime {
    pub day: u16,
    pub ms_of_day: u32,
}

static_assertions::const_assert_eq!(TIMESTAMP_SIZE, 1 + 2 + 4);

fn ccsds_epoch() -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(1958, 1, 1)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&date))
}

impl CdsShortTime {
    pub const fn new(day: u16, ms_of_day: u32) -> Self {
        Self { day, ms_of_day }
    }

    /// Converts a UTC time. Times before 1958 or past the 16-bit day range
    /// saturate to the nearest representable day.
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        let days = ccsds_epoch()
            .map(|epoch| (time - epoch).num_days())
            .unwrap_or(0)
            .clamp(0, i64::from(u16::MAX)) as u16;
        let ms_of_day = time.num_seconds_from_midnight() * 1000 + time.nanosecond() / 1_000_000;
        Self {
            day: days,
            ms_of_day: ms_of_day.min(MS_PER_DAY - 1),
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let epoch = ccsds_epoch()?;
        Some(
            epoch
                + Duration::days(i64::from(self.day))
                + Duration::milliseconds(i64::from(self.ms_of_day)),
        )
    }

    pub fn to_bytes(&self) -> [u8; TIMESTAMP_SIZE] {
        let day = self.day.to_be_bytes();
        let ms = self.ms_of_day.to_be_bytes();
        [CDS_SHORT_P_FIELD, day[0], day[1], ms[0], ms[1], ms[2], ms[3]]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < TIMESTAMP_SIZE {
            return Err(PoolError::StreamTooShort);
        }
        Ok(Self {
            day: u16::from_be_bytes([bytes[1], bytes[2]]),
            ms_of_day: u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
        })
    }
}

/// Source of the timestamps stamped onto snapshots.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> CdsShortTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now(&self) -> CdsShortTime {
        CdsShortTime::from_datetime(Utc::now())
    }
}

/// Clock frozen at one instant, for deterministic snapshots.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub CdsShortTime);

impl TimeProvider for FixedClock {
    fn now(&self) -> CdsShortTime {
        self.0
    }
}
