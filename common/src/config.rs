use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Time between the start of two consecutive cycles.
pub const DEFAULT_CYCLE_PERIOD: Duration = Duration::from_secs(10);

/// Size of the buffer the payload has to fit in.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 512;

/// Request timeout of the HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub const DEFAULT_LOCATION: &str = "office";

/// The HTTP endpoint the line protocol is posted to. The method is always `POST`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Endpoint {
    pub const METHOD: &'static str = "POST";

    /// Endpoint of the InfluxDB 1.x write API for `database`.
    pub fn influxdb(host: impl Into<String>, port: u16, database: &str) -> Self {
        Self {
            host: host.into(),
            port,
            path: format!("/write?db={database}"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::influxdb("localhost", 8086, "sensors")
    }
}

/// Heater setting of the gas sensor, applied once before the first measurement.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub enum HeaterProfile {
    #[default]
    Disabled,
    Enabled {
        target_celsius: u16,
        duration: Duration,
    },
}

/// Static configuration of a telemetry node. Resolved once at startup, never changed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub period: Duration,
    pub endpoint: Endpoint,
    /// Value of the `location` tag.
    pub location: String,
    pub max_payload_len: usize,
    pub heater: HeaterProfile,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_CYCLE_PERIOD,
            endpoint: Endpoint::default(),
            location: DEFAULT_LOCATION.into(),
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            heater: HeaterProfile::Disabled,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.endpoint.host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.endpoint.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if !self.endpoint.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.endpoint.path.clone()));
        }
        if self.endpoint.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.location.is_empty() {
            return Err(ConfigError::EmptyLocation);
        }
        // A line break would split every record of the payload.
        if self.location.chars().any(char::is_control) {
            return Err(ConfigError::InvalidLocation(self.location.clone()));
        }
        if let HeaterProfile::Enabled { duration, .. } = self.heater {
            if duration.is_zero() {
                return Err(ConfigError::InvalidHeater);
            }
        }
        Ok(())
    }
}

#[test]
fn test_default_config() {
    let config = TelemetryConfig::default();
    config.validate().unwrap();

    assert_eq!(config.period, Duration::from_secs(10));
    assert_eq!(config.location, "office");
    assert_eq!(config.endpoint.url(), "http://localhost:8086/write?db=sensors");
    assert_eq!(config.endpoint.timeout, Duration::from_millis(5000));
}

#[test]
fn test_invalid_config() {
    let config = TelemetryConfig {
        period: Duration::ZERO,
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::ZeroPeriod));

    let config = TelemetryConfig {
        endpoint: Endpoint::influxdb("", 8086, "db"),
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::MissingHost));

    let config = TelemetryConfig {
        endpoint: Endpoint::influxdb("influx", 0, "db"),
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::InvalidPort));

    let config = TelemetryConfig {
        heater: HeaterProfile::Enabled {
            target_celsius: 320,
            duration: Duration::ZERO,
        },
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::InvalidHeater));
}

#[test]
fn test_location_with_control_characters() {
    for location in ["office\nevil,x=1 y=2", "office\r", "tab\there", "bell\u{7}"] {
        let config = TelemetryConfig {
            location: location.into(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLocation(location.into()))
        );
    }

    // Escapable characters are fine.
    let config = TelemetryConfig {
        location: "main office, 2=nd floor".into(),
        ..Default::default()
    };
    config.validate().unwrap();
}

#[test]
fn test_zero_timeout() {
    let mut endpoint = Endpoint::influxdb("influx", 8086, "db");
    endpoint.timeout = Duration::ZERO;
    let config = TelemetryConfig {
        endpoint,
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "endpoint": { "host": "influx.local", "port": 8086, "path": "/write?db=home" },
        "location": "kitchen"
    }"#;
    let config: TelemetryConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.location, "kitchen");
    assert_eq!(config.period, DEFAULT_CYCLE_PERIOD);
    assert_eq!(config.endpoint.timeout, DEFAULT_TIMEOUT);
    assert_eq!(config.endpoint.url(), "http://influx.local:8086/write?db=home");
}
