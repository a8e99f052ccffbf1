use sdcard::FatError;

/// Input from the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderEvent {
    Start { now_ms: u32 },
    Stop { now_ms: u32 },
    Tick { now_ms: u32 },
    Record { now_ms: u32 },
}

impl RecorderEvent {
    pub fn now_ms(self) -> u32 {
        match self {
            Self::Start { now_ms }
            | Self::Stop { now_ms }
            | Self::Tick { now_ms }
            | Self::Record { now_ms } => now_ms,
        }
    }
}

/// Storage work the machine asks the engine to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum RecorderAction {
    OpenNext,
    Append,
    Flush,
    Close,
    Mount,
}

/// Everything the machine reacts to: application input plus the outcome of
/// the last action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum RecorderSignal {
    Start,
    Stop,
    Tick,
    Record,
    Opened,
    OpenFailed,
    Appended,
    WriteFailed,
    Flushed,
    Closed,
    Mounted,
    MountFailed,
}

impl From<RecorderEvent> for RecorderSignal {
    fn from(value: RecorderEvent) -> Self {
        match value {
            RecorderEvent::Start { .. } => Self::Start,
            RecorderEvent::Stop { .. } => Self::Stop,
            RecorderEvent::Tick { .. } => Self::Tick,
            RecorderEvent::Record { .. } => Self::Record,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderError {
    /// No valid GPS time yet, so no dated file name can be built.
    NoWallClock,
    NamesExhausted,
    Storage(FatError),
}

impl From<FatError> for RecorderError {
    fn from(value: FatError) -> Self {
        Self::Storage(value)
    }
}
