//! Zero-fill erase with checkpointed chunks and adaptive pacing.

use crate::config::EraseConfig;
use crate::error::{Error, Result};
use crate::storage::{Extent, Storage};
use std::io;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of an erase run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EraseReport {
    /// Bytes in fully written chunks. A final chunk cut short by a full
    /// device is not counted, even though its leading bytes were zeroed.
    pub bytes_zeroed: u64,
    /// The storage was truncated to zero length instead of being zero-filled.
    pub truncated: bool,
    /// The run stopped because the device reported it was full.
    pub reached_device_end: bool,
    /// Number of pauses inserted after slow chunks.
    pub pauses: u32,
}

fn is_out_of_space(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENOSPC) || err.kind() == io::ErrorKind::WriteZero
}

/// Overwrite `start..end` with zeros.
///
/// With `end = None` the range runs to the end of the storage: the current
/// length of a regular file, or until the device reports `ENOSPC`. A raw
/// device also stops cleanly at `ENOSPC` when `end` lies past its real size.
/// A regular file erased from offset 0 to its full length is truncated
/// instead.
///
/// Every chunk is flushed before the next one starts, so an interrupted run
/// leaves a zeroed prefix and can simply be repeated.
pub fn overwrite<S: Storage + ?Sized>(
    storage: &mut S,
    start: u64,
    end: Option<u64>,
    config: &EraseConfig,
) -> Result<EraseReport> {
    config.validate().map_err(Error::Validation)?;

    let extent = storage.extent()?;
    let end = match (end, extent) {
        (Some(end), _) => Some(end),
        (None, Extent::Bounded(len)) => Some(len),
        (None, Extent::Unbounded) => None,
    };

    if let Some(end) = end {
        if end < start {
            return Err(Error::Validation(format!(
                "erase range end {} is before start {}",
                end, start
            )));
        }
    }

    let mut report = EraseReport::default();

    if let (Extent::Bounded(len), Some(end)) = (extent, end) {
        if start == 0 && end == len {
            storage.truncate(0)?;
            report.truncated = true;
            info!(len, "truncated storage");
            return Ok(report);
        }
    }

    let zeros = vec![0u8; config.chunk_size];
    let mut position = start;

    loop {
        let len = match end {
            Some(end) => (end - position).min(config.chunk_size as u64) as usize,
            None => config.chunk_size,
        };
        if len == 0 {
            break;
        }

        let started = Instant::now();
        let written = storage
            .write_at(position, &zeros[..len])
            .and_then(|()| storage.flush());

        match written {
            Ok(()) => {}
            Err(err) if extent == Extent::Unbounded && is_out_of_space(&err) => {
                report.reached_device_end = true;
                break;
            }
            Err(err) => return Err(err.into()),
        }

        position += len as u64;
        report.bytes_zeroed += len as u64;
        debug!(position, "zeroed chunk");

        let elapsed = started.elapsed();
        if elapsed >= config.slow_write_threshold {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                position, "slow chunk write, pausing"
            );
            report.pauses += 1;
            std::thread::sleep(config.pause);
        }
    }

    info!(
        start,
        bytes = report.bytes_zeroed,
        reached_device_end = report.reached_device_end,
        "erase finished"
    );
    Ok(report)
}
