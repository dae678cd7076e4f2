//! Desktop side of envsense: the same telemetry loop as the firmware, with a simulated
//! BME680 and a `ureq` based HTTP transport.

pub mod clock;
pub mod config;
pub mod sensor;
pub mod transport;

pub use clock::StdClock;
pub use config::HostSettings;
pub use sensor::SimulatedBme680;
pub use transport::UreqTransport;
