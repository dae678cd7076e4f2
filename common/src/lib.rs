//! Platform independent core of the envsense telemetry node.
//!
//! A [`Scheduler`] drives a [`Sampler`] (trigger, wait for conversion, read back) and a
//! [`Publisher`] (encode to line protocol, POST once) on a fixed, drift-free period. The
//! platform crates provide the [`Sensor`], [`Transport`] and [`Clock`] implementations.

pub mod clock;
pub mod config;
pub mod error;
pub mod line_protocol;
pub mod publisher;
pub mod reading;
pub mod sampler;
pub mod scheduler;

pub use clock::Clock;
pub use config::{Endpoint, HeaterProfile, TelemetryConfig, DEFAULT_CYCLE_PERIOD};
pub use error::{
    ConfigError, PublishError, SampleError, SensorError, TransportError, TransportErrorKind,
};
pub use publisher::{Publisher, Response, Transport};
pub use reading::Reading;
pub use sampler::{Sampler, SamplerPhase, Sensor};
pub use scheduler::{Scheduler, SchedulerStats};

#[cfg(test)]
pub(crate) mod testing;
