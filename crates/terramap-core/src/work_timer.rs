use std::time::{Duration, Instant};

/// Accumulates wall time over a batch of items, e.g. chunks extracted during one sync pass.
pub struct WorkTimer {
    started: Instant,
    busy: Duration,
    items_completed: u32,
}

impl WorkTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            busy: Duration::ZERO,
            items_completed: 0,
        }
    }

    pub fn items_completed(&self) -> u32 {
        self.items_completed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn complete_item(&mut self, d: Duration) {
        self.busy += d;
        self.items_completed += 1;
    }

    /// Runs `f`, counting it as one item.
    pub fn time<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let t = Instant::now();
        let out = f();
        self.complete_item(t.elapsed());
        out
    }

    pub fn average_item_time_us(&self) -> u32 {
        let busy_us: u32 = self.busy.as_micros().try_into().unwrap_or(u32::MAX);
        busy_us / self.items_completed.max(1)
    }
}
