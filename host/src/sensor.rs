use std::time::{Duration, Instant};

use envsense_common::{HeaterProfile, Reading, Sensor, SensorError};

/// Stand-in for a BME680 on the desktop.
///
/// Produces slowly varying, plausible values and keeps the timing contract of the real
/// chip: results are only available once the conversion time has passed after a trigger.
pub struct SimulatedBme680 {
    heater: HeaterProfile,
    triggered: Option<Instant>,
    measurements: u32,
    /// Number of measurements after which every trigger fails.
    fail_after: Option<u32>,
}

impl SimulatedBme680 {
    /// Measurement cycles for temperature, pressure and humidity with 1x oversampling.
    const MEAS_CYCLES: u64 = 3;

    pub fn new() -> Self {
        Self {
            heater: HeaterProfile::Disabled,
            triggered: None,
            measurements: 0,
            fail_after: None,
        }
    }

    /// Simulates a bus fault after `measurements` successful measurements.
    pub fn fail_after(mut self, measurements: u32) -> Self {
        self.fail_after = Some(measurements);
        self
    }

    /// Duration of a forced mode TPH(G) cycle, following the BME680 datasheet formula.
    fn duration(&self) -> Duration {
        let tph_us = Self::MEAS_CYCLES * 1963 + 477 * 4 + 477 * 5 + 500;
        let mut duration = Duration::from_millis(tph_us / 1000 + 1);
        if let HeaterProfile::Enabled { duration: heat, .. } = self.heater {
            duration += heat;
        }
        duration
    }

    fn simulate(&self) -> Reading {
        let t = self.measurements as f32 * 0.1;
        let gas_resistance = match self.heater {
            HeaterProfile::Disabled => 0.0,
            HeaterProfile::Enabled { .. } => 12_000.0 + 800.0 * (t * 0.3).cos(),
        };
        Reading::new(
            21.5 + 0.8 * t.sin(),
            45.0 + 5.0 * (t * 0.5).cos(),
            1013.25 + 1.5 * (t * 0.2).sin(),
            gas_resistance,
        )
    }
}

impl Default for SimulatedBme680 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sensor for SimulatedBme680 {
    fn configure(&mut self, heater: HeaterProfile) -> Result<(), SensorError> {
        self.heater = heater;
        Ok(())
    }

    fn conversion_duration(&mut self) -> Result<Duration, SensorError> {
        Ok(self.duration())
    }

    fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        if self.fail_after.is_some_and(|limit| self.measurements >= limit) {
            return Err(SensorError::Bus("simulated bus fault".into()));
        }
        self.triggered = Some(Instant::now());
        Ok(())
    }

    fn read_result(&mut self) -> Result<Reading, SensorError> {
        let triggered = self.triggered.take().ok_or(SensorError::NotReady)?;
        if triggered.elapsed() < self.duration() {
            return Err(SensorError::Incomplete);
        }
        let reading = self.simulate();
        self.measurements += 1;
        Ok(reading)
    }
}

#[test]
fn test_conversion_duration() {
    let mut sensor = SimulatedBme680::new();
    sensor.configure(HeaterProfile::Disabled).unwrap();
    assert_eq!(sensor.conversion_duration().unwrap(), Duration::from_millis(11));

    sensor
        .configure(HeaterProfile::Enabled {
            target_celsius: 320,
            duration: Duration::from_millis(150),
        })
        .unwrap();
    assert_eq!(sensor.conversion_duration().unwrap(), Duration::from_millis(161));
}

#[test]
fn test_read_requires_trigger_and_wait() {
    let mut sensor = SimulatedBme680::new();
    assert_eq!(sensor.read_result(), Err(SensorError::NotReady));

    sensor.trigger_measurement().unwrap();
    assert_eq!(sensor.read_result(), Err(SensorError::Incomplete));

    sensor.trigger_measurement().unwrap();
    std::thread::sleep(sensor.conversion_duration().unwrap());
    let reading = sensor.read_result().unwrap();
    assert!(reading.first_invalid_field().is_none());
    assert_eq!(reading.gas_resistance, 0.0);
}

#[test]
fn test_fail_after() {
    let mut sensor = SimulatedBme680::new().fail_after(0);
    assert!(matches!(
        sensor.trigger_measurement(),
        Err(SensorError::Bus(_))
    ));
}
