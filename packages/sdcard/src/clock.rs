/// Monotonic millisecond tick source. The counter is allowed to wrap.
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now_ms(&mut self) -> u32 {
        (**self).now_ms()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    at_ms: u32,
}

impl Deadline {
    pub fn after(now_ms: u32, timeout_ms: u32) -> Self {
        Self {
            at_ms: now_ms.wrapping_add(timeout_ms),
        }
    }

    /// Sign of the wrapping delta decides, so a counter rollover between
    /// arming and checking is harmless.
    pub fn expired(self, now_ms: u32) -> bool {
        (now_ms.wrapping_sub(self.at_ms) as i32) >= 0
    }

    pub fn at_ms(self) -> u32 {
        self.at_ms
    }
}

#[cfg(feature = "embassy")]
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy")]
impl Clock for EmbassyClock {
    fn now_ms(&mut self) -> u32 {
        embassy_time::Instant::now().as_millis() as u32
    }
}
