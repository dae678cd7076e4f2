use core::time::Duration;

use bme680::{
    Bme680, FieldDataCondition, I2CAddress, IIRFilterSize, OversamplingSetting, PowerMode,
    SettingsBuilder,
};
use esp_idf_svc::hal::{delay::FreeRtos, i2c::I2cDriver};

use envsense_common::{HeaterProfile, Reading, Sensor, SensorError};

/// Ambient temperature assumed for the heater resistance calculation.
const AMBIENT_CELSIUS: i8 = 25;

/// A BME680 on an I2C bus, measuring in forced mode.
pub struct Bme680Sensor {
    device: Bme680<I2cDriver<'static>, FreeRtos>,
    delay: FreeRtos,
    conversion: Option<Duration>,
}

fn bus_error(err: impl core::fmt::Debug) -> SensorError {
    SensorError::Bus(format!("{err:?}"))
}

impl Bme680Sensor {
    /// Probes the chip at `address` and reads its calibration data.
    pub fn new(i2c: I2cDriver<'static>, address: u8) -> Result<Self, SensorError> {
        let address = match address {
            0x76 => I2CAddress::Primary,
            0x77 => I2CAddress::Secondary,
            other => I2CAddress::Other(other),
        };
        let mut delay = FreeRtos;
        let device = Bme680::init(i2c, &mut delay, address)
            .map_err(|err| SensorError::Config(format!("{err:?}")))?;

        Ok(Self {
            device,
            delay,
            conversion: None,
        })
    }
}

impl Sensor for Bme680Sensor {
    fn configure(&mut self, heater: HeaterProfile) -> Result<(), SensorError> {
        let builder = SettingsBuilder::new()
            .with_temperature_oversampling(OversamplingSetting::OS1x)
            .with_pressure_oversampling(OversamplingSetting::OS1x)
            .with_humidity_oversampling(OversamplingSetting::OS1x)
            .with_temperature_filter(IIRFilterSize::Size3);

        let settings = match heater {
            HeaterProfile::Disabled => builder.with_run_gas(false).build(),
            HeaterProfile::Enabled {
                target_celsius,
                duration,
            } => builder
                .with_gas_measurement(duration, target_celsius, AMBIENT_CELSIUS)
                .with_run_gas(true)
                .build(),
        };

        let conversion = self.device.get_profile_dur(&settings.0).map_err(bus_error)?;
        self.device
            .set_sensor_settings(&mut self.delay, settings)
            .map_err(|err| SensorError::Config(format!("{err:?}")))?;
        self.conversion = Some(conversion);

        Ok(())
    }

    fn conversion_duration(&mut self) -> Result<Duration, SensorError> {
        self.conversion
            .ok_or_else(|| SensorError::Config("sensor is not configured".into()))
    }

    fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        self.device
            .set_sensor_mode(&mut self.delay, PowerMode::ForcedMode)
            .map_err(bus_error)
    }

    fn read_result(&mut self) -> Result<Reading, SensorError> {
        let (data, condition) = self
            .device
            .get_sensor_data(&mut self.delay)
            .map_err(bus_error)?;
        if matches!(condition, FieldDataCondition::Unchanged) {
            return Err(SensorError::Incomplete);
        }

        Ok(Reading::new(
            data.temperature_celsius(),
            data.humidity_percent(),
            data.pressure_hpa(),
            data.gas_resistance_ohm() as f32,
        ))
    }
}
