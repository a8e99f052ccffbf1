use sdcard::Deadline;
use statig::prelude::*;

use super::config::{failure_backoff_ms, RecorderConfig};
use super::events::{RecorderAction, RecorderSignal};
use super::types::{RecorderPhase, RecorderStats};

pub(super) struct RecorderMachine {
    config: RecorderConfig,
    pub(super) phase: RecorderPhase,
    pub(super) stats: RecorderStats,
    retry_at: Option<Deadline>,
    last_flush_ms: u32,
    last_record_ms: Option<u32>,
    unflushed: bool,
}

pub(super) struct DispatchContext {
    pub(super) now_ms: u32,
    pub(super) storage_valid: bool,
    pub(super) action: Option<RecorderAction>,
}

impl DispatchContext {
    pub(super) fn new(now_ms: u32, storage_valid: bool) -> Self {
        Self {
            now_ms,
            storage_valid,
            action: None,
        }
    }
}

impl RecorderMachine {
    pub(super) fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            phase: RecorderPhase::Idle,
            stats: RecorderStats::default(),
            retry_at: None,
            last_flush_ms: 0,
            last_record_ms: None,
            unflushed: false,
        }
    }

    fn retry_due(&self, now_ms: u32) -> bool {
        self.retry_at.is_none_or(|deadline| deadline.expired(now_ms))
    }

    fn flush_due(&self, now_ms: u32) -> bool {
        self.unflushed && now_ms.wrapping_sub(self.last_flush_ms) >= self.config.flush_interval_ms
    }

    fn record_due(&self, now_ms: u32) -> bool {
        self.last_record_ms
            .is_none_or(|last| now_ms.wrapping_sub(last) >= self.config.log_interval_ms)
    }

    fn enter(&mut self, phase: RecorderPhase) {
        if self.phase != phase {
            log::info!("recorder: state from={} to={}", self.phase.label(), phase.label());
            self.phase = phase;
        }
    }

    fn go_idle(&mut self) -> Outcome<State> {
        self.enter(RecorderPhase::Idle);
        Transition(State::idle())
    }

    fn go_opening(&mut self) -> Outcome<State> {
        self.enter(RecorderPhase::Opening);
        Transition(State::opening())
    }

    fn go_recording(&mut self, now_ms: u32) -> Outcome<State> {
        self.stats.consecutive_failures = 0;
        self.stats.files_opened = self.stats.files_opened.saturating_add(1);
        self.retry_at = None;
        self.last_flush_ms = now_ms;
        self.last_record_ms = None;
        self.unflushed = false;
        self.enter(RecorderPhase::Recording);
        Transition(State::recording())
    }

    fn go_failed(&mut self, now_ms: u32) -> Outcome<State> {
        self.arm_backoff(now_ms);
        self.enter(RecorderPhase::Failed);
        Transition(State::failed())
    }

    fn arm_backoff(&mut self, now_ms: u32) {
        let failures = self.stats.consecutive_failures.saturating_add(1).min(8);
        self.stats.consecutive_failures = failures;
        let backoff_ms = failure_backoff_ms(&self.config, failures);
        self.retry_at = Some(Deadline::after(now_ms, backoff_ms));
        log::warn!("recorder: backoff failures={} retry_in_ms={}", failures, backoff_ms);
    }

    fn skip_record(&mut self) -> Outcome<State> {
        self.stats.lines_skipped = self.stats.lines_skipped.saturating_add(1);
        Handled
    }
}

#[state_machine(initial = "State::idle()")]
impl RecorderMachine {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &RecorderSignal) -> Outcome<State> {
        let _ = context;
        match event {
            RecorderSignal::Start => {
                self.retry_at = None;
                self.go_opening()
            }
            RecorderSignal::Record => self.skip_record(),
            _ => Handled,
        }
    }

    #[state(superstate = "active")]
    fn opening(&mut self, context: &mut DispatchContext, event: &RecorderSignal) -> Outcome<State> {
        match event {
            RecorderSignal::Tick => {
                if self.retry_due(context.now_ms) {
                    context.action = Some(RecorderAction::OpenNext);
                }
                Handled
            }
            RecorderSignal::Opened => self.go_recording(context.now_ms),
            RecorderSignal::OpenFailed => {
                if !context.storage_valid {
                    return self.go_failed(context.now_ms);
                }
                self.retry_at = Some(Deadline::after(context.now_ms, self.config.retry_base_ms));
                Handled
            }
            RecorderSignal::Record => self.skip_record(),
            _ => Super,
        }
    }

    #[state(superstate = "active")]
    fn recording(
        &mut self,
        context: &mut DispatchContext,
        event: &RecorderSignal,
    ) -> Outcome<State> {
        match event {
            RecorderSignal::Record => {
                if !self.record_due(context.now_ms) {
                    return self.skip_record();
                }
                self.last_record_ms = Some(context.now_ms);
                context.action = Some(RecorderAction::Append);
                Handled
            }
            RecorderSignal::Appended => {
                self.stats.lines_written = self.stats.lines_written.saturating_add(1);
                self.unflushed = true;
                if self.flush_due(context.now_ms) {
                    context.action = Some(RecorderAction::Flush);
                }
                Handled
            }
            RecorderSignal::Tick => {
                if self.flush_due(context.now_ms) {
                    context.action = Some(RecorderAction::Flush);
                }
                Handled
            }
            RecorderSignal::Flushed => {
                self.last_flush_ms = context.now_ms;
                self.unflushed = false;
                Handled
            }
            RecorderSignal::WriteFailed => {
                context.action = Some(RecorderAction::Close);
                self.go_failed(context.now_ms)
            }
            _ => Super,
        }
    }

    #[state(superstate = "active")]
    fn failed(&mut self, context: &mut DispatchContext, event: &RecorderSignal) -> Outcome<State> {
        match event {
            RecorderSignal::Tick => {
                if !self.retry_due(context.now_ms) {
                    return Handled;
                }
                if context.storage_valid {
                    context.action = Some(RecorderAction::OpenNext);
                    return self.go_opening();
                }
                context.action = Some(RecorderAction::Mount);
                Handled
            }
            RecorderSignal::Mounted => {
                context.action = Some(RecorderAction::OpenNext);
                self.go_opening()
            }
            RecorderSignal::MountFailed => {
                self.arm_backoff(context.now_ms);
                Handled
            }
            RecorderSignal::Record => self.skip_record(),
            _ => Super,
        }
    }

    #[superstate]
    fn active(&mut self, context: &mut DispatchContext, event: &RecorderSignal) -> Outcome<State> {
        match event {
            RecorderSignal::Stop => {
                context.action = Some(RecorderAction::Close);
                self.go_idle()
            }
            _ => Handled,
        }
    }
}
