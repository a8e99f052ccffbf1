#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Records arriving sooner than this after the last written one are skipped.
    pub log_interval_ms: u32,
    pub flush_interval_ms: u32,
    /// Delay before retrying an open that failed on a still-mounted card.
    pub retry_base_ms: u32,
    pub retry_max_ms: u32,
    pub dir_prefix: &'static str,
    pub extension: &'static str,
}

impl RecorderConfig {
    pub const fn default_const() -> Self {
        Self {
            log_interval_ms: 1_000,
            flush_interval_ms: 5_000,
            retry_base_ms: 300,
            retry_max_ms: 5_000,
            dir_prefix: "LOG",
            extension: "TXT",
        }
    }

    pub const fn with_log_interval_ms(mut self, interval_ms: u32) -> Self {
        self.log_interval_ms = interval_ms;
        self
    }

    pub const fn with_flush_interval_ms(mut self, interval_ms: u32) -> Self {
        self.flush_interval_ms = interval_ms;
        self
    }

    pub const fn with_retry_ms(mut self, base_ms: u32, max_ms: u32) -> Self {
        self.retry_base_ms = base_ms;
        self.retry_max_ms = max_ms;
        self
    }

    pub const fn with_dir_prefix(mut self, prefix: &'static str) -> Self {
        self.dir_prefix = prefix;
        self
    }

    pub const fn with_extension(mut self, extension: &'static str) -> Self {
        self.extension = extension;
        self
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::default_const()
    }
}

/// Delay before the next remount attempt: doubles per consecutive failure,
/// clamped to `retry_max_ms`.
pub fn failure_backoff_ms(config: &RecorderConfig, consecutive_failures: u8) -> u32 {
    let exponent = consecutive_failures.saturating_sub(1).min(6);
    let factor = 1u32 << exponent;
    config
        .retry_base_ms
        .saturating_mul(factor)
        .min(config.retry_max_ms)
}
