//! Background cache refresh: download-signal polling and incremental index
//! growth.
//!
//! The downloader (an external collaborator) writes a small JSON signal file
//! after fetching new photos.  A background worker polls it on a fixed
//! interval; an unchanged marker is a no-op, a changed marker pulls the new
//! records from the photo source and appends them to the selection index.
//! Transient failures skip the tick without touching the stored marker, so
//! the next tick retries the same comparison.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::FilterCriteria;
use crate::controller::CoreState;
use crate::errors::{SlideshowError, SlideshowResult};
use crate::models::{DownloadSignal, PhotoRecord};
use crate::selection::index::SelectionIndex;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The external photo-library binding.
pub trait PhotoSource: Send + Sync {
    /// Records available from the library; `None` means everything.
    ///
    /// Callers deduplicate, so returning already-known records is fine.
    fn photos_since(&self, marker: Option<DateTime<Utc>>) -> SlideshowResult<Vec<PhotoRecord>>;
}

/// The externally written new-content signal, polled rather than pushed.
pub trait ChangeSignal: Send + Sync {
    /// Current signal contents, or `None` when no signal has been written.
    fn current(&self) -> SlideshowResult<Option<DownloadSignal>>;
}

// ---------------------------------------------------------------------------
// SignalFile
// ---------------------------------------------------------------------------

/// JSON signal file shared with the downloader.
pub struct SignalFile {
    path: PathBuf,
}

impl SignalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a fresh signal (the producing side, after a download run).
    pub fn write(&self, photos_added: u64, total_photos: u64) -> SlideshowResult<()> {
        let now = Utc::now();
        let signal = DownloadSignal {
            last_download_timestamp: now,
            photos_added,
            total_photos,
            download_session_id: format!("session_{}", now.timestamp()),
        };
        let raw = serde_json::to_string_pretty(&signal)?;
        std::fs::write(&self.path, raw)?;
        info!(photos_added, total_photos, "download signal written");
        Ok(())
    }
}

impl ChangeSignal for SignalFile {
    fn current(&self) -> SlideshowResult<Option<DownloadSignal>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(SlideshowError::RefreshIo(format!(
                    "signal file {} unreadable: {err}",
                    self.path.display()
                )))
            }
        };
        let signal = serde_json::from_str(&raw).map_err(|err| {
            SlideshowError::RefreshIo(format!(
                "signal file {} malformed: {err}",
                self.path.display()
            ))
        })?;
        Ok(Some(signal))
    }
}

// ---------------------------------------------------------------------------
// Check step
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Signal absent or marker unchanged; the index was not touched.
    Unchanged,
    /// Marker changed; this many records were appended.
    Extended(usize),
}

/// One refresh check: read the signal, compare the marker, extend on change.
///
/// The stored marker advances only after a successful extension, so a failed
/// check is retried wholesale on the next tick.
pub fn run_check(
    index: &mut SelectionIndex,
    last_marker: &mut Option<DateTime<Utc>>,
    criteria: &FilterCriteria,
    source: &dyn PhotoSource,
    signal: &dyn ChangeSignal,
) -> SlideshowResult<RefreshOutcome> {
    debug!("checking download signal");
    let Some(current) = signal.current()? else {
        debug!("no download signal present");
        return Ok(RefreshOutcome::Unchanged);
    };

    if let Some(last) = *last_marker {
        if current.last_download_timestamp <= last {
            debug!("download signal unchanged");
            return Ok(RefreshOutcome::Unchanged);
        }
    }

    info!(
        session = %current.download_session_id,
        photos_added = current.photos_added,
        "new photos signaled, extending selection index"
    );
    let records = source.photos_since(*last_marker)?;
    let added = index.extend(records, criteria);
    *last_marker = Some(current.last_download_timestamp);
    Ok(RefreshOutcome::Extended(added))
}

/// Background variant of `run_check`: the signal read and the record fetch
/// happen before the state lock is taken, so a slow source never stalls a
/// display call.  The marker is re-read under the lock and only moved
/// forward; a concurrent rebuild between fetch and extend is harmless
/// because the index deduplicates.
pub(crate) fn run_background_check(
    state: &Mutex<CoreState>,
    source: &dyn PhotoSource,
    signal: &dyn ChangeSignal,
) -> SlideshowResult<RefreshOutcome> {
    debug!("checking download signal");
    let Some(current) = signal.current()? else {
        debug!("no download signal present");
        return Ok(RefreshOutcome::Unchanged);
    };

    let marker = state.lock().last_marker;
    if let Some(last) = marker {
        if current.last_download_timestamp <= last {
            debug!("download signal unchanged");
            return Ok(RefreshOutcome::Unchanged);
        }
    }

    info!(
        session = %current.download_session_id,
        photos_added = current.photos_added,
        "new photos signaled, extending selection index"
    );
    let records = source.photos_since(marker)?;

    let mut core = state.lock();
    let CoreState {
        index,
        criteria,
        last_marker,
        ..
    } = &mut *core;
    let added = index.extend(records, criteria);
    if last_marker.map_or(true, |last| current.last_download_timestamp > last) {
        *last_marker = Some(current.last_download_timestamp);
    }
    Ok(RefreshOutcome::Extended(added))
}

// ---------------------------------------------------------------------------
// Background worker
// ---------------------------------------------------------------------------

struct Shutdown {
    stop: Mutex<bool>,
    condvar: Condvar,
}

/// Handle to the background refresh thread.  `shutdown` (or drop) stops the
/// worker and joins it; an in-flight check is allowed to finish.
pub struct RefreshHandle {
    shutdown: Arc<Shutdown>,
    join: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(join) = self.join.take() {
            *self.shutdown.stop.lock() = true;
            self.shutdown.condvar.notify_all();
            let _ = join.join();
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Spawn the interval worker against the shared core state.
pub(crate) fn spawn_worker(
    state: Arc<Mutex<CoreState>>,
    source: Arc<dyn PhotoSource>,
    signal: Arc<dyn ChangeSignal>,
    interval: Duration,
) -> SlideshowResult<RefreshHandle> {
    let shutdown = Arc::new(Shutdown {
        stop: Mutex::new(false),
        condvar: Condvar::new(),
    });
    let worker_shutdown = Arc::clone(&shutdown);

    let join = std::thread::Builder::new()
        .name("slideshow-refresh".into())
        .spawn(move || {
            loop {
                // Interruptible interval wait; spurious wakeups loop back
                // onto the same deadline.
                let deadline = Instant::now() + interval;
                {
                    let mut stop = worker_shutdown.stop.lock();
                    while !*stop {
                        if worker_shutdown
                            .condvar
                            .wait_until(&mut stop, deadline)
                            .timed_out()
                        {
                            break;
                        }
                    }
                    if *stop {
                        break;
                    }
                }

                match run_background_check(&state, source.as_ref(), signal.as_ref()) {
                    Ok(RefreshOutcome::Extended(added)) => {
                        info!(added, "background refresh extended the index")
                    }
                    Ok(RefreshOutcome::Unchanged) => {}
                    Err(err) => {
                        warn!(error = %err, "background refresh failed, retrying next interval")
                    }
                }
            }
            debug!("refresh worker stopped");
        })?;

    Ok(RefreshHandle {
        shutdown,
        join: Some(join),
    })
}
