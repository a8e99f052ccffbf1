use statig::blocking::IntoStateMachineExt as _;

use super::config::RecorderConfig;
use super::events::{RecorderAction, RecorderError, RecorderEvent, RecorderSignal};
use super::machine::{DispatchContext, RecorderMachine};
use super::naming::{LogNamer, LogPath};
use super::storage::LogStorage;
use super::types::{RecorderPhase, RecorderStats};

/// Upper bound on action/outcome round trips per input event.
const MAX_CHAINED_ACTIONS: usize = 4;

/// Drives the recorder state machine against a [`LogStorage`], executing
/// the actions it requests and feeding their outcomes back in.
pub struct TrackRecorder<S: LogStorage> {
    machine: statig::blocking::StateMachine<RecorderMachine>,
    namer: LogNamer,
    file: Option<S::Handle>,
    path: LogPath,
    last_error: Option<RecorderError>,
}

impl<S: LogStorage> TrackRecorder<S> {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            machine: RecorderMachine::new(config).state_machine(),
            namer: LogNamer::new(config.dir_prefix, config.extension),
            file: None,
            path: LogPath::new(),
            last_error: None,
        }
    }

    pub fn phase(&self) -> RecorderPhase {
        self.machine.inner().phase
    }

    /// False while storage is unavailable and records are being dropped.
    pub fn is_logging(&self) -> bool {
        self.phase() == RecorderPhase::Recording
    }

    pub fn stats(&self) -> RecorderStats {
        self.machine.inner().stats
    }

    pub fn current_path(&self) -> Option<&str> {
        self.file.as_ref().map(|_| self.path.as_str())
    }

    pub fn last_error(&self) -> Option<RecorderError> {
        self.last_error
    }

    pub fn start(&mut self, storage: &mut S, now_ms: u32) {
        self.handle(storage, RecorderEvent::Start { now_ms }, &[]);
    }

    pub fn stop(&mut self, storage: &mut S, now_ms: u32) {
        self.handle(storage, RecorderEvent::Stop { now_ms }, &[]);
    }

    pub fn tick(&mut self, storage: &mut S, now_ms: u32) {
        self.handle(storage, RecorderEvent::Tick { now_ms }, &[]);
    }

    /// Offers one pre-serialized line. Returns true when it was written.
    pub fn record(&mut self, storage: &mut S, now_ms: u32, line: &[u8]) -> bool {
        let before = self.stats().lines_written;
        self.handle(storage, RecorderEvent::Record { now_ms }, line);
        self.stats().lines_written != before
    }

    /// `line` is only read for [`RecorderEvent::Record`].
    pub fn handle(&mut self, storage: &mut S, event: RecorderEvent, line: &[u8]) {
        self.dispatch(storage, event.into(), event.now_ms(), line);
    }

    fn dispatch(&mut self, storage: &mut S, signal: RecorderSignal, now_ms: u32, line: &[u8]) {
        let mut signal = signal;
        for _ in 0..MAX_CHAINED_ACTIONS {
            let mut context = DispatchContext::new(now_ms, storage.is_valid());
            self.machine.handle_with_context(&signal, &mut context);
            let Some(action) = context.action else {
                return;
            };
            signal = self.execute(storage, action, line);
        }
    }

    fn execute(&mut self, storage: &mut S, action: RecorderAction, line: &[u8]) -> RecorderSignal {
        match action {
            RecorderAction::OpenNext => match self.open_next(storage) {
                Ok(()) => RecorderSignal::Opened,
                Err(err) => {
                    log::warn!("recorder: open_failed err={:?}", err);
                    self.last_error = Some(err);
                    RecorderSignal::OpenFailed
                }
            },
            RecorderAction::Append => {
                let result = match self.file.as_ref() {
                    Some(file) => storage.append(file, line),
                    None => Err(sdcard::FatError::StaleHandle),
                };
                self.outcome(result, RecorderSignal::Appended)
            }
            RecorderAction::Flush => {
                let result = match self.file.as_ref() {
                    Some(file) => storage.flush(file),
                    None => Err(sdcard::FatError::StaleHandle),
                };
                self.outcome(result, RecorderSignal::Flushed)
            }
            RecorderAction::Close => {
                if let Some(file) = self.file.take() {
                    if let Err(err) = storage.close(file) {
                        log::debug!("recorder: close_failed path={} err={:?}", self.path, err);
                    } else {
                        log::info!("recorder: closed path={}", self.path);
                    }
                }
                self.path.clear();
                RecorderSignal::Closed
            }
            RecorderAction::Mount => match storage.mount() {
                Ok(()) => RecorderSignal::Mounted,
                Err(err) => {
                    log::warn!("recorder: mount_failed err={:?}", err);
                    self.last_error = Some(err.into());
                    RecorderSignal::MountFailed
                }
            },
        }
    }

    fn outcome(
        &mut self,
        result: Result<(), sdcard::FatError>,
        ok: RecorderSignal,
    ) -> RecorderSignal {
        match result {
            Ok(()) => ok,
            Err(err) => {
                log::warn!("recorder: write_failed path={} err={:?}", self.path, err);
                self.last_error = Some(err.into());
                RecorderSignal::WriteFailed
            }
        }
    }

    fn open_next(&mut self, storage: &mut S) -> Result<(), RecorderError> {
        let now = storage.wall_clock();
        if now.is_none() {
            return Err(RecorderError::NoWallClock);
        }
        let path = self
            .namer
            .next_unused(now, |candidate| storage.exists(candidate))
            .ok_or(RecorderError::NamesExhausted)?;
        let handle = storage.open_append(&path)?;
        log::info!("recorder: opened path={}", path);
        self.file = Some(handle);
        self.path = path;
        Ok(())
    }
}
