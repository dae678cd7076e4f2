use core::time::Duration;

/// Monotonic time source with passive waiting.
///
/// `now` is the time since an arbitrary fixed start (usually boot), the same convention as
/// `esp_timer_get_time`.
pub trait Clock {
    fn now(&self) -> Duration;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Blocks until `deadline`. Returns immediately if the deadline already passed.
    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now);
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
