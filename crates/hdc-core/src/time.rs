//! Time utilities for hdc-rs

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hdc_protocol::FileMtime;

/// Convert a file timestamp to its wire form, keeping nanoseconds
///
/// Times before the epoch get negative seconds with non-negative nanoseconds.
pub fn file_mtime(time: SystemTime) -> FileMtime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => FileMtime::new(d.as_secs() as i64, d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            let secs = -(d.as_secs() as i64);
            match d.subsec_nanos() {
                0 => FileMtime::new(secs, 0),
                nanos => FileMtime::new(secs - 1, 1_000_000_000 - nanos),
            }
        }
    }
}

/// Transfer rate in kB/s, as the daemon reports it
pub fn rate_kbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        return bytes as f64 / 1024.0;
    }
    bytes as f64 / 1024.0 / secs
}
