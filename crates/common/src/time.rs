use std::time::{Duration, Instant};

/// Frame timer: `mark` returns the time since the previous mark.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    last: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    /// Seconds since the previous mark, resetting the mark.
    pub fn mark(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        dt.as_secs_f32()
    }

    /// Seconds since the previous mark without resetting it.
    pub fn peek(&self) -> f32 {
        self.last.elapsed().as_secs_f32()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
