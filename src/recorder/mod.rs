//! GPS track recorder: a supervisor that keeps one dated log file open,
//! appends pre-serialized lines to it and recovers from card failures.

mod config;
mod engine;
mod events;
mod machine;
mod naming;
mod storage;
mod types;

pub use config::{failure_backoff_ms, RecorderConfig};
pub use engine::TrackRecorder;
pub use events::{RecorderError, RecorderEvent};
pub use naming::{LogNamer, LogPath};
pub use storage::LogStorage;
pub use types::{RecorderPhase, RecorderStats};
