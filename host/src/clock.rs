use std::time::{Duration, Instant};

use envsense_common::Clock;

/// Monotonic clock counting from its creation, sleeping with `std::thread::sleep`.
#[derive(Clone, Copy, Debug)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[test]
fn test_sleep_until_deadline() {
    let clock = StdClock::new();
    let deadline = clock.now() + Duration::from_millis(20);

    clock.sleep_until(deadline);
    assert!(clock.now() >= deadline);

    // A deadline in the past returns right away.
    let before = Instant::now();
    clock.sleep_until(Duration::ZERO);
    assert!(before.elapsed() < Duration::from_millis(20));
}
