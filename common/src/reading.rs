/// One complete measurement of the environmental sensor.
///
/// Readings are plain values: the sampler produces one per cycle, the publisher consumes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in °C.
    pub temperature: f32,
    /// Relative humidity in %.
    pub humidity: f32,
    /// Pressure in hPa.
    pub pressure: f32,
    /// Gas resistance in Ohm. Measured, but not part of the pushed payload.
    pub gas_resistance: f32,
}

impl Reading {
    pub fn new(temperature: f32, humidity: f32, pressure: f32, gas_resistance: f32) -> Self {
        Self {
            temperature,
            humidity,
            pressure,
            gas_resistance,
        }
    }

    /// Returns the name of the first field that is not a finite number.
    pub fn first_invalid_field(&self) -> Option<&'static str> {
        [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("pressure", self.pressure),
            ("gas_resistance", self.gas_resistance),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
    }
}

impl core::fmt::Display for Reading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:.2} °C, {:.2} %, {:.2} hPa, {:.2} Ohm",
            self.temperature, self.humidity, self.pressure, self.gas_resistance
        )
    }
}

#[test]
fn test_reading_display() {
    let reading = Reading::new(21.34, 45.67, 1013.2, 12000.0);
    assert_eq!(
        reading.to_string(),
        "21.34 °C, 45.67 %, 1013.20 hPa, 12000.00 Ohm"
    );
}

#[test]
fn test_first_invalid_field() {
    assert_eq!(Reading::new(20.0, 40.0, 1000.0, 0.0).first_invalid_field(), None);
    assert_eq!(
        Reading::new(20.0, f32::NAN, 1000.0, 0.0).first_invalid_field(),
        Some("humidity")
    );
    assert_eq!(
        Reading::new(20.0, 40.0, 1000.0, f32::INFINITY).first_invalid_field(),
        Some("gas_resistance")
    );
}
