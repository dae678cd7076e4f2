use crate::config::{Endpoint, TelemetryConfig};
use crate::error::{PublishError, TransportError};
use crate::line_protocol;
use crate::reading::Reading;

/// What came back from a successful HTTP exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_length: Option<u64>,
}

/// A blocking HTTP client that posts a body to an endpoint.
///
/// Each call opens one connection and closes it before returning. Any HTTP status is a
/// successful exchange; only transport failures are errors.
pub trait Transport {
    fn post(&mut self, endpoint: &Endpoint, body: &str) -> Result<Response, TransportError>;
}

/// Pushes readings to the configured endpoint, best effort.
pub struct Publisher<T> {
    transport: T,
    endpoint: Endpoint,
    location: String,
    max_payload_len: usize,
}

impl<T: Transport> Publisher<T> {
    pub fn new(transport: T, config: &TelemetryConfig) -> Self {
        Self {
            transport,
            endpoint: config.endpoint.clone(),
            location: config.location.clone(),
            max_payload_len: config.max_payload_len,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Encodes `reading` and posts it once. There is no retry, a failed push is lost.
    pub fn publish(&mut self, reading: Reading) -> Result<Response, PublishError> {
        let payload = line_protocol::encode(&reading, &self.location);
        if payload.len() > self.max_payload_len {
            return Err(PublishError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload_len,
            });
        }

        let response = self.transport.post(&self.endpoint, &payload)?;
        // The status code does not decide about success, a 4xx/5xx still counts as delivered.
        log::debug!(
            "HTTP POST Status = {}, content_length = {}",
            response.status,
            response.content_length.map_or(-1, |len| len as i64)
        );

        Ok(response)
    }
}

#[cfg(test)]
use crate::{
    error::TransportErrorKind,
    testing::{FakeTransport, ManualClock},
};

#[test]
fn test_publish_posts_line_protocol() {
    let transport = FakeTransport::new(ManualClock::default());
    let requests = transport.requests();
    let config = TelemetryConfig {
        endpoint: Endpoint::influxdb("influx.local", 8086, "home"),
        ..Default::default()
    };
    let mut publisher = Publisher::new(transport, &config);

    let response = publisher
        .publish(Reading::new(21.34, 45.67, 1013.20, 12000.0))
        .unwrap();

    assert_eq!(response.status, 204);
    let requests = requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://influx.local:8086/write?db=home");
    assert_eq!(
        requests[0].body,
        "sensor,location=office temperature=21.34\n\
         sensor,location=office humidity=45.67\n\
         sensor,location=office pressure=1013.20\n"
    );
}

#[test]
fn test_error_status_is_success() {
    let transport = FakeTransport::new(ManualClock::default()).with_results(vec![
        Ok(Response {
            status: 400,
            content_length: Some(57),
        }),
        Ok(Response {
            status: 503,
            content_length: None,
        }),
    ]);
    let mut publisher = Publisher::new(transport, &TelemetryConfig::default());
    let reading = Reading::new(20.0, 40.0, 1000.0, 0.0);

    assert_eq!(publisher.publish(reading).unwrap().status, 400);
    assert_eq!(publisher.publish(reading).unwrap().status, 503);
}

#[test]
fn test_transport_error_is_reported() {
    let refused = TransportError::new(TransportErrorKind::Connect, "connection refused");
    let transport =
        FakeTransport::new(ManualClock::default()).with_results(vec![Err(refused.clone())]);
    let requests = transport.requests();
    let mut publisher = Publisher::new(transport, &TelemetryConfig::default());

    let result = publisher.publish(Reading::new(20.0, 40.0, 1000.0, 0.0));

    assert_eq!(result, Err(PublishError::Transport(refused)));
    // no retry
    assert_eq!(requests.borrow().len(), 1);
}

#[test]
fn test_oversized_payload_is_not_sent() {
    let transport = FakeTransport::new(ManualClock::default());
    let requests = transport.requests();
    let config = TelemetryConfig {
        max_payload_len: 64,
        ..Default::default()
    };
    let mut publisher = Publisher::new(transport, &config);

    let result = publisher.publish(Reading::new(20.0, 40.0, 1000.0, 0.0));

    assert!(matches!(
        result,
        Err(PublishError::PayloadTooLarge { max: 64, .. })
    ));
    assert!(requests.borrow().is_empty());
}
