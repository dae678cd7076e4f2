use std::time::Duration;

use anyhow::Context;
use envsense_common::{Endpoint, TelemetryConfig};

/// Settings of the desktop node, read once from the environment at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct HostSettings {
    pub telemetry: TelemetryConfig,
    /// Stop after this many cycles instead of running forever.
    pub cycles: Option<u64>,
    /// Let the simulated sensor fail after this many measurements.
    pub fail_after: Option<u32>,
}

impl HostSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings from `lookup`, falling back to the defaults for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut telemetry = TelemetryConfig::default();

        let host = lookup("INFLUXDB_HOST").unwrap_or_else(|| telemetry.endpoint.host.clone());
        let port = parse(&lookup, "INFLUXDB_PORT")?.unwrap_or(telemetry.endpoint.port);
        let database = lookup("INFLUXDB_DB").unwrap_or_else(|| "sensors".into());
        telemetry.endpoint = Endpoint::influxdb(host, port, &database);

        if let Some(timeout) = parse::<u64>(&lookup, "INFLUXDB_TIMEOUT_MS")? {
            telemetry.endpoint.timeout = Duration::from_millis(timeout);
        }
        if let Some(location) = lookup("ENVSENSE_LOCATION") {
            telemetry.location = location;
        }
        if let Some(period) = parse::<u64>(&lookup, "ENVSENSE_PERIOD_MS")? {
            telemetry.period = Duration::from_millis(period);
        }

        telemetry.validate()?;

        Ok(Self {
            telemetry,
            cycles: parse(&lookup, "ENVSENSE_CYCLES")?,
            fail_after: parse(&lookup, "ENVSENSE_SIM_FAIL_AFTER")?,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("Invalid value {value:?} for {key}"))
        })
        .transpose()
}

#[cfg(test)]
fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    }
}

#[test]
fn test_defaults() {
    let settings = HostSettings::from_lookup(lookup_from(&[])).unwrap();

    assert_eq!(settings.telemetry, TelemetryConfig::default());
    assert_eq!(settings.cycles, None);
    assert_eq!(settings.fail_after, None);
}

#[test]
fn test_overrides() {
    let settings = HostSettings::from_lookup(lookup_from(&[
        ("INFLUXDB_HOST", "influx.lan"),
        ("INFLUXDB_PORT", "9086"),
        ("INFLUXDB_DB", "climate"),
        ("ENVSENSE_LOCATION", "lab"),
        ("ENVSENSE_PERIOD_MS", "2000"),
        ("ENVSENSE_CYCLES", "3"),
    ]))
    .unwrap();

    assert_eq!(
        settings.telemetry.endpoint.url(),
        "http://influx.lan:9086/write?db=climate"
    );
    assert_eq!(settings.telemetry.location, "lab");
    assert_eq!(settings.telemetry.period, Duration::from_secs(2));
    assert_eq!(settings.cycles, Some(3));
}

#[test]
fn test_invalid_values() {
    let err = HostSettings::from_lookup(lookup_from(&[("INFLUXDB_PORT", "http")])).unwrap_err();
    assert!(err.to_string().contains("INFLUXDB_PORT"));

    assert!(HostSettings::from_lookup(lookup_from(&[("ENVSENSE_PERIOD_MS", "0")])).is_err());
    assert!(HostSettings::from_lookup(lookup_from(&[("INFLUXDB_TIMEOUT_MS", "0")])).is_err());
    assert!(
        HostSettings::from_lookup(lookup_from(&[("ENVSENSE_LOCATION", "office\nevil")])).is_err()
    );
}
