//! Scope timing. Every `ScopeTimer` logs its duration at debug level, and while a
//! trace session is open it is also recorded as a complete ("X") event of the
//! Chrome trace format, loadable in `chrome://tracing` or Perfetto.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// One timed scope, times in microseconds since the session began.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub cat: String,
    pub dur: u64,
    pub name: String,
    pub ph: String,
    pub pid: u32,
    pub tid: u32,
    pub ts: u64,
}

/// Layout of the written trace file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceFile {
    pub other_data: BTreeMap<String, String>,
    pub trace_events: Vec<TraceEvent>,
}

struct Session {
    name: String,
    path: PathBuf,
    start: Instant,
    events: Vec<TraceEvent>,
}

static SESSION: Mutex<Option<Session>> = Mutex::new(None);
static NEXT_THREAD: AtomicU32 = AtomicU32::new(0);

thread_local! {
    static THREAD_ID: u32 = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
}

fn session() -> std::sync::MutexGuard<'static, Option<Session>> {
    // A timer that panicked mid-record leaves nothing half-written worth dropping.
    return SESSION.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
}

/// Starts collecting scopes for a trace written to `path` by `end_session`.
/// An already open session is discarded.
pub fn begin_session(name: &str, path: impl AsRef<Path>) {
    let previous = session().replace(Session {
        name: name.to_string(),
        path: path.as_ref().to_owned(),
        start: Instant::now(),
        events: Vec::new(),
    });
    if let Some(previous) = previous {
        log::warn!(
            "trace session '{}' replaced before it was written",
            previous.name
        );
    }
}

/// Writes the open session to its file and closes it. Returns the path written,
/// `None` when no session was open.
pub fn end_session() -> Result<Option<PathBuf>, ProfileError> {
    let Some(finished) = session().take() else {
        return Ok(None);
    };
    let trace = TraceFile {
        other_data: BTreeMap::new(),
        trace_events: finished.events,
    };
    let file = File::create(&finished.path).map_err(|source| ProfileError::Io {
        path: finished.path.clone(),
        source,
    })?;
    serde_json::to_writer(BufWriter::new(file), &trace)?;
    log::info!(
        "trace '{}' with {} scopes written to {}",
        finished.name,
        trace.trace_events.len(),
        finished.path.display()
    );
    return Ok(Some(finished.path));
}

/// Logs how long a scope took at debug level when dropped.
///
/// ```
/// let _timer = soft_rasterizer::profile::ScopeTimer::new("draw");
/// ```
#[derive(Debug)]
pub struct ScopeTimer {
    name: &'static str,
    start: Instant,
}

impl ScopeTimer {
    pub fn new(name: &'static str) -> Self {
        return Self {
            name,
            start: Instant::now(),
        };
    }

    pub fn name(&self) -> &'static str {
        return self.name;
    }

    pub fn elapsed(&self) -> Duration {
        return self.start.elapsed();
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        log::debug!("{} took {:.3} ms", self.name, elapsed.as_secs_f64() * 1000.0);

        if let Some(open) = session().as_mut() {
            open.events.push(TraceEvent {
                cat: "function".to_string(),
                dur: elapsed.as_micros() as u64,
                name: self.name.to_string(),
                ph: "X".to_string(),
                pid: 0,
                tid: THREAD_ID.with(|id| *id),
                ts: self.start.saturating_duration_since(open.start).as_micros() as u64,
            });
        }
    }
}
