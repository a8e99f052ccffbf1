#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderPhase {
    Idle,
    Opening,
    Recording,
    Failed,
}

impl RecorderPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Opening => "opening",
            Self::Recording => "recording",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecorderStats {
    pub lines_written: u32,
    pub lines_skipped: u32,
    pub files_opened: u32,
    pub consecutive_failures: u8,
}
