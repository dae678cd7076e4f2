//! Fakes for the platform traits, driven by a manual clock.

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::clock::Clock;
use crate::config::{Endpoint, HeaterProfile};
use crate::error::{SensorError, TransportError};
use crate::publisher::{Response, Transport};
use crate::reading::Reading;
use crate::sampler::Sensor;

/// Clock that only advances when somebody sleeps on it (or calls `advance`).
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn advance(&self, duration: Duration) {
        self.0.set(self.0.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// What the fake sensor does for one measurement.
#[derive(Clone, Debug)]
pub enum SensorScript {
    Normal,
    Returns(Reading),
    TriggerFails(SensorError),
    ReadFails(SensorError),
}

#[derive(Default, Debug)]
pub struct SensorLog {
    pub configured: Option<HeaterProfile>,
    pub duration_queries: usize,
    pub triggered_at: Vec<Duration>,
    pub read_at: Vec<Duration>,
}

pub struct FakeSensor {
    clock: ManualClock,
    conversion: Duration,
    script: VecDeque<SensorScript>,
    current: Option<SensorScript>,
    configure_error: Option<SensorError>,
    log: Rc<RefCell<SensorLog>>,
}

impl FakeSensor {
    pub fn new(clock: ManualClock, conversion: Duration) -> Self {
        Self {
            clock,
            conversion,
            script: VecDeque::new(),
            current: None,
            configure_error: None,
            log: Default::default(),
        }
    }

    pub fn with_script(mut self, script: Vec<SensorScript>) -> Self {
        self.script = script.into();
        self
    }

    pub fn failing_configuration(mut self, error: SensorError) -> Self {
        self.configure_error = Some(error);
        self
    }

    pub fn log(&self) -> Rc<RefCell<SensorLog>> {
        self.log.clone()
    }

    /// The reading returned for the `n`-th measurement when nothing else is scripted.
    pub fn reading(n: usize) -> Reading {
        Reading::new(20.0 + n as f32, 40.0, 1000.0, 12000.0)
    }
}

impl Sensor for FakeSensor {
    fn configure(&mut self, heater: HeaterProfile) -> Result<(), SensorError> {
        if let Some(error) = self.configure_error.clone() {
            return Err(error);
        }
        self.log.borrow_mut().configured = Some(heater);
        Ok(())
    }

    fn conversion_duration(&mut self) -> Result<Duration, SensorError> {
        self.log.borrow_mut().duration_queries += 1;
        Ok(self.conversion)
    }

    fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        let step = self.script.pop_front().unwrap_or(SensorScript::Normal);
        if let SensorScript::TriggerFails(error) = step {
            return Err(error);
        }
        self.log.borrow_mut().triggered_at.push(self.clock.now());
        self.current = Some(step);
        Ok(())
    }

    fn read_result(&mut self) -> Result<Reading, SensorError> {
        let n = self.log.borrow().read_at.len();
        self.log.borrow_mut().read_at.push(self.clock.now());
        match self.current.take() {
            None => Err(SensorError::NotReady),
            Some(SensorScript::ReadFails(error)) => Err(error),
            Some(SensorScript::Returns(reading)) => Ok(reading),
            Some(_) => Ok(Self::reading(n)),
        }
    }
}

/// A request as seen by the fake transport.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub url: String,
    pub body: String,
    pub at: Duration,
}

pub struct FakeTransport {
    clock: ManualClock,
    latency: Duration,
    latencies: VecDeque<Duration>,
    results: VecDeque<Result<Response, TransportError>>,
    requests: Rc<RefCell<Vec<Request>>>,
}

impl FakeTransport {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            latency: Duration::ZERO,
            latencies: VecDeque::new(),
            results: VecDeque::new(),
            requests: Default::default(),
        }
    }

    /// Every request takes `latency` on the manual clock.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Latencies of the next requests, taking precedence over `with_latency`.
    pub fn with_latencies(mut self, latencies: Vec<Duration>) -> Self {
        self.latencies = latencies.into();
        self
    }

    /// Results for the next requests. Requests beyond the script get a `204`.
    pub fn with_results(mut self, results: Vec<Result<Response, TransportError>>) -> Self {
        self.results = results.into();
        self
    }

    pub fn requests(&self) -> Rc<RefCell<Vec<Request>>> {
        self.requests.clone()
    }
}

impl Transport for FakeTransport {
    fn post(&mut self, endpoint: &Endpoint, body: &str) -> Result<Response, TransportError> {
        self.requests.borrow_mut().push(Request {
            url: endpoint.url(),
            body: body.to_owned(),
            at: self.clock.now(),
        });
        let latency = self.latencies.pop_front().unwrap_or(self.latency);
        self.clock.advance(latency);
        self.results.pop_front().unwrap_or(Ok(Response {
            status: 204,
            content_length: Some(0),
        }))
    }
}
