use core::convert::Infallible;
use core::time::Duration;

use crate::clock::Clock;
use crate::config::TelemetryConfig;
use crate::error::SampleError;
use crate::publisher::{Publisher, Transport};
use crate::sampler::{Sampler, Sensor};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub publish_failures: u64,
    /// Cycles that took longer than the period.
    pub overruns: u64,
}

/// Wakes up at fixed multiples of the period, like `vTaskDelayUntil`.
struct Ticker {
    last_wake: Duration,
    period: Duration,
}

impl Ticker {
    fn start(now: Duration, period: Duration) -> Self {
        Self {
            last_wake: now,
            period,
        }
    }

    /// Sleeps until the next tick. Returns by how much the tick was missed, if it was.
    fn wait(&mut self, clock: &impl Clock) -> Option<Duration> {
        let deadline = self.last_wake + self.period;
        self.last_wake = deadline;

        let now = clock.now();
        if now > deadline {
            return Some(now - deadline);
        }
        clock.sleep_until(deadline);
        None
    }
}

/// Runs one sample-and-publish cycle per period on a single thread.
pub struct Scheduler<S, T, C> {
    period: Duration,
    sampler: Sampler<S, C>,
    publisher: Publisher<T>,
    clock: C,
    stats: SchedulerStats,
}

impl<S: Sensor, T: Transport, C: Clock> Scheduler<S, T, C> {
    pub fn new(
        config: &TelemetryConfig,
        sampler: Sampler<S, C>,
        publisher: Publisher<T>,
        clock: C,
    ) -> Self {
        Self {
            period: config.period,
            sampler,
            publisher,
            clock,
            stats: SchedulerStats::default(),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Runs forever. Only returns when sampling fails.
    pub fn run(&mut self) -> Result<Infallible, SampleError> {
        let mut ticker = Ticker::start(self.clock.now(), self.period);
        loop {
            self.cycle(&mut ticker)?;
        }
    }

    /// Runs `cycles` cycles with the same timing as [`Scheduler::run`].
    pub fn run_cycles(&mut self, cycles: u64) -> Result<SchedulerStats, SampleError> {
        let mut ticker = Ticker::start(self.clock.now(), self.period);
        for _ in 0..cycles {
            self.cycle(&mut ticker)?;
        }
        Ok(self.stats)
    }

    fn cycle(&mut self, ticker: &mut Ticker) -> Result<(), SampleError> {
        let reading = self.sampler.sample().inspect_err(|err| {
            log::error!("Sampling failed, stopping: {}", err);
        })?;
        log::info!("BME680 Sensor: {}", reading);

        if let Err(err) = self.publisher.publish(reading) {
            self.stats.publish_failures += 1;
            log::error!("{}", err);
        }
        self.stats.cycles += 1;

        // passive waiting until the period is over
        if let Some(late) = ticker.wait(&self.clock) {
            self.stats.overruns += 1;
            log::warn!("Cycle overran its period by {} ms", late.as_millis());
        }

        Ok(())
    }
}

#[cfg(test)]
use crate::{
    config::HeaterProfile,
    error::{SensorError, TransportError, TransportErrorKind},
    testing::{FakeSensor, FakeTransport, ManualClock, SensorScript},
};

#[cfg(test)]
fn scheduler(
    clock: &ManualClock,
    sensor: FakeSensor,
    transport: FakeTransport,
) -> Scheduler<FakeSensor, FakeTransport, ManualClock> {
    let config = TelemetryConfig::default();
    let sampler = Sampler::new(sensor, HeaterProfile::Disabled, clock.clone()).unwrap();
    let publisher = Publisher::new(transport, &config);
    Scheduler::new(&config, sampler, publisher, clock.clone())
}

#[test]
fn test_cadence_is_independent_of_publish_latency() {
    let clock = ManualClock::default();
    clock.advance(Duration::from_millis(1234));
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(180));
    let log = sensor.log();
    let transport = FakeTransport::new(clock.clone()).with_latency(Duration::from_millis(2500));
    let mut scheduler = scheduler(&clock, sensor, transport);

    let stats = scheduler.run_cycles(5).unwrap();

    assert_eq!(stats.cycles, 5);
    assert_eq!(stats.overruns, 0);
    let starts = log.borrow().triggered_at.clone();
    assert_eq!(starts.len(), 5);
    for (n, start) in starts.iter().enumerate() {
        assert_eq!(
            *start,
            Duration::from_millis(1234) + DEFAULT_PERIOD * n as u32
        );
    }
    assert_eq!(clock.now(), Duration::from_millis(1234) + DEFAULT_PERIOD * 5);
}

#[cfg(test)]
const DEFAULT_PERIOD: Duration = crate::config::DEFAULT_CYCLE_PERIOD;

#[test]
fn test_push_failure_does_not_stop_the_loop() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(100));
    let log = sensor.log();
    let timeout = TransportError::new(TransportErrorKind::Timeout, "timed out");
    let transport = FakeTransport::new(clock.clone())
        .with_latency(Duration::from_secs(5))
        .with_results(vec![Err(timeout.clone()), Err(timeout)]);
    let requests = transport.requests();
    let mut scheduler = scheduler(&clock, sensor, transport);

    let stats = scheduler.run_cycles(3).unwrap();

    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.publish_failures, 2);
    assert_eq!(requests.borrow().len(), 3);
    assert_eq!(
        log.borrow().triggered_at,
        vec![Duration::ZERO, DEFAULT_PERIOD, DEFAULT_PERIOD * 2]
    );
    assert_eq!(clock.now(), DEFAULT_PERIOD * 3);
}

#[test]
fn test_sampling_failure_stops_the_loop() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(100)).with_script(vec![
        SensorScript::Normal,
        SensorScript::TriggerFails(SensorError::Bus("timeout".into())),
    ]);
    let transport = FakeTransport::new(clock.clone());
    let requests = transport.requests();
    let mut scheduler = scheduler(&clock, sensor, transport);

    let result = scheduler.run();

    assert_eq!(
        result.err(),
        Some(SampleError::Trigger(SensorError::Bus("timeout".into())))
    );
    assert_eq!(scheduler.stats().cycles, 1);
    assert_eq!(requests.borrow().len(), 1);
}

#[test]
fn test_read_failure_publishes_nothing() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(100))
        .with_script(vec![SensorScript::ReadFails(SensorError::NotReady)]);
    let transport = FakeTransport::new(clock.clone());
    let requests = transport.requests();
    let mut scheduler = scheduler(&clock, sensor, transport);

    assert_eq!(
        scheduler.run_cycles(3),
        Err(SampleError::Read(SensorError::NotReady))
    );
    assert!(requests.borrow().is_empty());
    assert_eq!(scheduler.stats(), SchedulerStats::default());
}

#[test]
fn test_overrun_catches_up_on_the_original_grid() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(100));
    let log = sensor.log();
    // Every push takes 12 s, longer than a period.
    let transport = FakeTransport::new(clock.clone()).with_latency(Duration::from_secs(12));
    let mut scheduler = scheduler(&clock, sensor, transport);

    let stats = scheduler.run_cycles(3).unwrap();

    assert_eq!(stats.overruns, 3);
    // No sleep after an overrun, the next cycle starts right away.
    assert_eq!(
        log.borrow().triggered_at,
        vec![
            Duration::ZERO,
            Duration::from_millis(12_100),
            Duration::from_millis(24_200)
        ]
    );
    assert_eq!(clock.now(), Duration::from_millis(36_300));
}

#[test]
fn test_single_overrun_returns_to_the_grid() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(100));
    let log = sensor.log();
    // Only the first push stalls.
    let transport =
        FakeTransport::new(clock.clone()).with_latencies(vec![Duration::from_secs(12)]);
    let requests = transport.requests();
    let mut scheduler = scheduler(&clock, sensor, transport);

    let stats = scheduler.run_cycles(3).unwrap();

    assert_eq!(stats.overruns, 1);
    assert_eq!(requests.borrow().len(), 3);
    // The second cycle starts late, the third is back on the grid.
    assert_eq!(
        log.borrow().triggered_at,
        vec![
            Duration::ZERO,
            Duration::from_millis(12_100),
            DEFAULT_PERIOD * 2
        ]
    );
    assert_eq!(clock.now(), DEFAULT_PERIOD * 3);
}

#[test]
fn test_published_readings_follow_the_samples() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(100));
    let transport = FakeTransport::new(clock.clone());
    let requests = transport.requests();
    let mut scheduler = scheduler(&clock, sensor, transport);

    scheduler.run_cycles(2).unwrap();

    let requests = requests.borrow();
    assert!(requests[0].body.starts_with("sensor,location=office temperature=20.00\n"));
    assert!(requests[1].body.starts_with("sensor,location=office temperature=21.00\n"));
    assert_eq!(requests[1].at - requests[0].at, DEFAULT_PERIOD);
}
