use core::time::Duration;

use crate::clock::Clock;
use crate::config::HeaterProfile;
use crate::error::{SampleError, SensorError};
use crate::reading::Reading;

/// A sensor that measures on request ("forced mode").
///
/// Creating the handle (bus, address, pins) is up to the implementor.
pub trait Sensor {
    /// Applies the heater profile. Called once, before the conversion duration is queried.
    fn configure(&mut self, heater: HeaterProfile) -> Result<(), SensorError>;

    /// Time one measurement cycle takes with the current configuration.
    fn conversion_duration(&mut self) -> Result<Duration, SensorError>;

    /// Starts one measurement cycle. Must not block until the results are available.
    fn trigger_measurement(&mut self) -> Result<(), SensorError>;

    /// Reads the results of the last triggered measurement.
    fn read_result(&mut self) -> Result<Reading, SensorError>;
}

/// Where the sampler currently is in its trigger/wait/read protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SamplerPhase {
    #[default]
    Idle,
    Triggered,
    AwaitingResult,
    Ready,
}

/// Produces one [`Reading`] per call to [`Sampler::sample`].
pub struct Sampler<S, C> {
    sensor: S,
    clock: C,
    conversion: Duration,
    phase: SamplerPhase,
}

impl<S: Sensor, C: Clock> Sampler<S, C> {
    /// Configures `sensor` and queries its conversion duration.
    ///
    /// The configuration is never changed afterwards, so the duration stays valid for the
    /// lifetime of the sampler.
    pub fn new(mut sensor: S, heater: HeaterProfile, clock: C) -> Result<Self, SensorError> {
        sensor.configure(heater)?;
        let conversion = sensor.conversion_duration()?;
        log::info!("Sensor configured, conversion takes {} ms", conversion.as_millis());

        Ok(Self {
            sensor,
            clock,
            conversion,
            phase: SamplerPhase::Idle,
        })
    }

    pub fn conversion_duration(&self) -> Duration {
        self.conversion
    }

    pub fn phase(&self) -> SamplerPhase {
        self.phase
    }

    /// Triggers a measurement, waits for the conversion to finish and reads the result.
    pub fn sample(&mut self) -> Result<Reading, SampleError> {
        let result = self.run_protocol();
        if result.is_err() {
            self.set_phase(SamplerPhase::Idle);
        }
        result
    }

    fn run_protocol(&mut self) -> Result<Reading, SampleError> {
        self.set_phase(SamplerPhase::Idle);

        self.sensor
            .trigger_measurement()
            .map_err(SampleError::Trigger)?;
        self.set_phase(SamplerPhase::Triggered);

        // passive waiting until the measurement results are available
        self.set_phase(SamplerPhase::AwaitingResult);
        self.clock.sleep(self.conversion);

        let reading = self.sensor.read_result().map_err(SampleError::Read)?;
        if let Some(field) = reading.first_invalid_field() {
            return Err(SampleError::Invalid(field));
        }
        self.set_phase(SamplerPhase::Ready);

        Ok(reading)
    }

    fn set_phase(&mut self, phase: SamplerPhase) {
        if self.phase != phase {
            log::trace!("Sampler {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

#[cfg(test)]
use crate::testing::{FakeSensor, ManualClock, SensorScript};

#[test]
fn test_sample_waits_for_conversion() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(150));
    let log = sensor.log();
    let mut sampler = Sampler::new(sensor, HeaterProfile::Disabled, clock.clone()).unwrap();

    let reading = sampler.sample().unwrap();

    assert_eq!(reading, FakeSensor::reading(0));
    assert_eq!(sampler.phase(), SamplerPhase::Ready);
    assert_eq!(clock.now(), Duration::from_millis(150));

    let log = log.borrow();
    assert_eq!(log.configured, Some(HeaterProfile::Disabled));
    assert_eq!(log.triggered_at, vec![Duration::ZERO]);
    assert_eq!(log.read_at, vec![Duration::from_millis(150)]);
}

#[test]
fn test_conversion_duration_is_queried_once() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(10));
    let log = sensor.log();
    let mut sampler = Sampler::new(sensor, HeaterProfile::Disabled, clock).unwrap();

    for _ in 0..3 {
        sampler.sample().unwrap();
    }

    assert_eq!(sampler.conversion_duration(), Duration::from_millis(10));
    assert_eq!(log.borrow().duration_queries, 1);
}

#[test]
fn test_read_error_is_not_a_partial_reading() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(10))
        .with_script(vec![SensorScript::ReadFails(SensorError::Incomplete)]);
    let mut sampler = Sampler::new(sensor, HeaterProfile::Disabled, clock).unwrap();

    assert_eq!(
        sampler.sample(),
        Err(SampleError::Read(SensorError::Incomplete))
    );
    assert_eq!(sampler.phase(), SamplerPhase::Idle);
}

#[test]
fn test_non_finite_result_is_rejected() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(10)).with_script(vec![
        SensorScript::Returns(Reading::new(21.0, f32::NAN, 1000.0, 0.0)),
    ]);
    let mut sampler = Sampler::new(sensor, HeaterProfile::Disabled, clock).unwrap();

    assert_eq!(sampler.sample(), Err(SampleError::Invalid("humidity")));
    assert_eq!(sampler.phase(), SamplerPhase::Idle);
}

#[test]
fn test_trigger_error_skips_the_wait() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(10)).with_script(vec![
        SensorScript::TriggerFails(SensorError::Bus("nack".into())),
    ]);
    let log = sensor.log();
    let mut sampler = Sampler::new(sensor, HeaterProfile::Disabled, clock.clone()).unwrap();

    assert_eq!(
        sampler.sample(),
        Err(SampleError::Trigger(SensorError::Bus("nack".into())))
    );
    assert_eq!(clock.now(), Duration::ZERO);
    assert!(log.borrow().read_at.is_empty());
}

#[test]
fn test_configuration_failure_is_reported() {
    let clock = ManualClock::default();
    let sensor = FakeSensor::new(clock.clone(), Duration::from_millis(10))
        .failing_configuration(SensorError::Config("chip id mismatch".into()));

    let result = Sampler::new(sensor, HeaterProfile::Disabled, clock);
    assert_eq!(
        result.err(),
        Some(SensorError::Config("chip id mismatch".into()))
    );
}
