use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::msg::{Header, Stamp};

/// Maps device-local timestamps onto the host clock.
pub trait TimeSync: Send + Sync {
    fn synchronized_header(&self, frame_id: &str, time_usec: u64) -> Header;
}

/// Host wall clock shifted by an externally estimated device offset.
///
/// Until an offset is known every stamp is the host's current time.
#[derive(Debug, Default)]
pub struct HostClock {
    offset_ns: AtomicI64,
}

impl HostClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset_ns: i64) -> Self {
        HostClock {
            offset_ns: AtomicI64::new(offset_ns),
        }
    }

    /// Updates the device-to-host offset in nanoseconds, `0` meaning unknown.
    pub fn set_offset(&self, offset_ns: i64) {
        self.offset_ns.store(offset_ns, Ordering::Relaxed);
    }

    pub fn offset(&self) -> i64 {
        self.offset_ns.load(Ordering::Relaxed)
    }

    fn synchronise_stamp(&self, time_usec: u64) -> Stamp {
        match self.offset() {
            0 => Stamp::from_duration(
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default(),
            ),
            offset => {
                let device_ns = i128::from(time_usec) * 1000;
                let host_ns = (device_ns + i128::from(offset)).clamp(0, i128::from(u64::MAX));
                Stamp::from_nanos(host_ns as u64)
            }
        }
    }
}

impl TimeSync for HostClock {
    fn synchronized_header(&self, frame_id: &str, time_usec: u64) -> Header {
        Header {
            stamp: self.synchronise_stamp(time_usec),
            frame_id: frame_id.to_string(),
        }
    }
}
