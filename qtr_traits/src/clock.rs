use std::time::{Duration, Instant};

/// Free-running microsecond clock plus busy delay.
///
/// - micros(): 32-bit microsecond counter; wraps around at 2^32
/// - delay_us(): blocks for at least `us` microseconds by polling
/// - us_since(): elapsed microseconds since `start`, correct across one wrap
pub trait Clock {
    fn micros(&mut self) -> u32;
    fn delay_us(&mut self, us: u32);

    /// Microseconds elapsed since `start` (a previous `micros()` value).
    ///
    /// Uses wrapping subtraction, so the result stays correct when the
    /// counter overflows between the two reads.
    #[inline]
    fn us_since(&mut self, start: u32) -> u32 {
        self.micros().wrapping_sub(start)
    }
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn micros(&mut self) -> u32 {
        // Truncation gives the 32-bit wraparound counter.
        self.origin.elapsed().as_micros() as u32
    }

    fn delay_us(&mut self, us: u32) {
        if us == 0 {
            return;
        }
        // Sleeping is far too coarse for the microsecond settle times.
        let deadline = Instant::now() + Duration::from_micros(u64::from(us));
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
