#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdConfig {
    /// Bytes clocked while waiting for an R1 response.
    pub response_polls: u16,
    /// GO_IDLE attempts before giving up on reset.
    pub reset_attempts: u16,
    pub init_timeout_ms: u32,
    pub write_busy_timeout_ms: u32,
    pub command_busy_timeout_ms: u32,
    /// Bytes clocked while waiting for a data start token.
    pub data_token_polls: u32,
    pub verify_read_crc: bool,
}

impl SdConfig {
    pub const fn default_const() -> Self {
        Self {
            response_polls: 500,
            reset_attempts: 500,
            init_timeout_ms: 2_000,
            write_busy_timeout_ms: 2_000,
            command_busy_timeout_ms: 500,
            data_token_polls: 50_000,
            verify_read_crc: true,
        }
    }

    pub const fn with_response_polls(mut self, polls: u16) -> Self {
        self.response_polls = polls;
        self
    }

    pub const fn with_reset_attempts(mut self, attempts: u16) -> Self {
        self.reset_attempts = attempts;
        self
    }

    pub const fn with_init_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.init_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_write_busy_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.write_busy_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_command_busy_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.command_busy_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_data_token_polls(mut self, polls: u32) -> Self {
        self.data_token_polls = polls;
        self
    }

    pub const fn with_verify_read_crc(mut self, verify: bool) -> Self {
        self.verify_read_crc = verify;
        self
    }
}

impl Default for SdConfig {
    fn default() -> Self {
        Self::default_const()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FatConfig {
    /// Compare all 11 short-name bytes. When false, the final extension
    /// byte is ignored, matching volumes written by older firmware.
    pub strict_name_match: bool,
}

impl FatConfig {
    pub const fn default_const() -> Self {
        Self {
            strict_name_match: true,
        }
    }

    pub const fn with_strict_name_match(mut self, strict: bool) -> Self {
        self.strict_name_match = strict;
        self
    }
}

impl Default for FatConfig {
    fn default() -> Self {
        Self::default_const()
    }
}
