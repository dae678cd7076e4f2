use thiserror::Error;

/// Errors reported by a sensor driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("bus error: {0}")]
    Bus(String),
    #[error("sensor not ready")]
    NotReady,
    #[error("measurement not completed")]
    Incomplete,
    #[error("configuration failed: {0}")]
    Config(String),
}

/// A failed sampling cycle. Always fatal for the loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("failed to trigger measurement: {0}")]
    Trigger(#[source] SensorError),
    #[error("failed to read measurement: {0}")]
    Read(#[source] SensorError),
    #[error("sensor returned an invalid {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Timeout,
    Io,
    Other,
}

/// Transport level failure of a push. The request never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A failed push. Never fatal, the reading is dropped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("payload of {len} bytes exceeds the limit of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("HTTP POST request failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("cycle period must not be zero")]
    ZeroPeriod,
    #[error("endpoint host is missing")]
    MissingHost,
    #[error("endpoint port must not be zero")]
    InvalidPort,
    #[error("endpoint path {0:?} must start with '/'")]
    InvalidPath(String),
    #[error("endpoint timeout must not be zero")]
    ZeroTimeout,
    #[error("location tag must not be empty")]
    EmptyLocation,
    #[error("location tag {0:?} contains control characters")]
    InvalidLocation(String),
    #[error("heater duration must not be zero")]
    InvalidHeater,
}
