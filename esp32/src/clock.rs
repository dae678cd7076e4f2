use core::time::Duration;

use esp_idf_svc::hal::delay::FreeRtos;

use envsense_common::Clock;

/// Time since boot from `esp_timer`, waiting with `vTaskDelay`.
#[derive(Clone, Copy, Default)]
pub struct EspClock;

impl Clock for EspClock {
    fn now(&self) -> Duration {
        // Microseconds since boot-up
        let micros = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        Duration::from_micros(micros as u64)
    }

    fn sleep(&self, duration: Duration) {
        // Round up, FreeRtos rounds down to whole ticks
        let millis = duration.as_micros().div_ceil(1000);
        FreeRtos::delay_ms(millis.min(u32::MAX as u128) as u32);
    }
}
