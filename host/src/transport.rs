use std::io;

use envsense_common::{Endpoint, Response, Transport, TransportError, TransportErrorKind};

/// HTTP transport on top of `ureq`.
///
/// Connection pooling is disabled, so every push opens a fresh connection that is closed
/// once the response has been dropped.
#[derive(Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(endpoint: &Endpoint) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(endpoint.timeout)
            .max_idle_connections(0)
            .max_idle_connections_per_host(0)
            .build()
    }
}

impl Transport for UreqTransport {
    fn post(&mut self, endpoint: &Endpoint, body: &str) -> Result<Response, TransportError> {
        let url = endpoint.url();
        log::debug!("-> {} {}", Endpoint::METHOD, url);

        let response = match Self::agent(endpoint)
            .request(Endpoint::METHOD, &url)
            .send_bytes(body.as_bytes())
        {
            Ok(response) => response,
            // ureq reports 4xx and 5xx as errors, here they are just responses.
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => return Err(classify(&transport)),
        };

        let status = response.status();
        let content_length = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse().ok());
        log::debug!("<- {}", status);

        Ok(Response {
            status,
            content_length,
        })
    }
}

fn classify(error: &ureq::Transport) -> TransportError {
    let kind = match error.kind() {
        ureq::ErrorKind::Dns => TransportErrorKind::Dns,
        ureq::ErrorKind::ConnectionFailed => TransportErrorKind::Connect,
        ureq::ErrorKind::Io => match std::error::Error::source(error)
            .and_then(|source| source.downcast_ref::<io::Error>())
            .map(io::Error::kind)
        {
            Some(io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                TransportErrorKind::Timeout
            }
            _ => TransportErrorKind::Io,
        },
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, error.to_string())
}
