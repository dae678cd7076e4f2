use anyhow::Context;
use envsense_common::{Endpoint, TelemetryConfig, DEFAULT_LOCATION};

// config values are fixed at compile time
const INFLUXDB_HOST: &str = env!("INFLUXDB_HOST");
const INFLUXDB_DB: &str = env!("INFLUXDB_DB");
const INFLUXDB_PORT: &str = match option_env!("INFLUXDB_PORT") {
    Some(port) => port,
    None => "8086",
};
const LOCATION: &str = match option_env!("ENVSENSE_LOCATION") {
    Some(location) => location,
    None => DEFAULT_LOCATION,
};
const BME680_I2C_ADDR: &str = match option_env!("BME680_I2C_ADDR") {
    Some(addr) => addr,
    None => "0x77",
};
const BME680_SDA: &str = match option_env!("BME680_SDA") {
    Some(pin) => pin,
    None => "21",
};
const BME680_SCL: &str = match option_env!("BME680_SCL") {
    Some(pin) => pin,
    None => "22",
};

pub fn telemetry() -> anyhow::Result<TelemetryConfig> {
    let port = INFLUXDB_PORT
        .parse()
        .with_context(|| format!("Invalid INFLUXDB_PORT {INFLUXDB_PORT:?}"))?;

    let config = TelemetryConfig {
        endpoint: Endpoint::influxdb(INFLUXDB_HOST, port, INFLUXDB_DB),
        location: LOCATION.into(),
        ..Default::default()
    };
    config.validate()?;

    Ok(config)
}

pub fn sensor_address() -> anyhow::Result<u8> {
    let digits = BME680_I2C_ADDR.trim_start_matches("0x");
    u8::from_str_radix(digits, 16)
        .with_context(|| format!("Invalid BME680_I2C_ADDR {BME680_I2C_ADDR:?}"))
}

/// GPIO numbers of the sensor bus as `(sda, scl)`.
pub fn sensor_pins() -> anyhow::Result<(u8, u8)> {
    let sda = BME680_SDA
        .parse()
        .with_context(|| format!("Invalid BME680_SDA {BME680_SDA:?}"))?;
    let scl = BME680_SCL
        .parse()
        .with_context(|| format!("Invalid BME680_SCL {BME680_SCL:?}"))?;
    if sda == scl {
        anyhow::bail!("BME680_SDA and BME680_SCL both use GPIO {sda}");
    }
    Ok((sda, scl))
}
