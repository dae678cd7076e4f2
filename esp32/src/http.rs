use embedded_svc::{
    http::{client::Client as HttpClient, Headers, Method},
    io::Write,
};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::EspIOError;
use esp_idf_svc::sys;

use envsense_common::{Endpoint, Response, Transport, TransportError, TransportErrorKind};

/// Posts with the ESP-IDF HTTP client.
///
/// The client is created for every request and cleaned up when it goes out of scope, so no
/// connection outlives a push.
#[derive(Default)]
pub struct EspHttpTransport;

fn new_client(endpoint: &Endpoint) -> Result<HttpClient<EspHttpConnection>, EspIOError> {
    let connection = EspHttpConnection::new(&Configuration {
        timeout: Some(endpoint.timeout),
        ..Default::default()
    })?;
    Ok(HttpClient::wrap(connection))
}

impl Transport for EspHttpTransport {
    /// Send an HTTP POST request.
    fn post(&mut self, endpoint: &Endpoint, body: &str) -> Result<Response, TransportError> {
        let url = endpoint.url();
        let content_length = body.len().to_string();
        let headers = [("content-length", content_length.as_str())];

        let mut client = new_client(endpoint).map_err(classify)?;
        let mut request = client
            .request(Method::Post, &url, &headers)
            .map_err(classify)?;
        log::debug!("-> POST {}", url);
        request.write_all(body.as_bytes()).map_err(classify)?;
        request.flush().map_err(classify)?;
        let response = request.submit().map_err(classify)?;

        Ok(Response {
            status: response.status(),
            content_length: response.content_len(),
        })
    }
}

fn classify(err: EspIOError) -> TransportError {
    let code = err.0.code();
    let kind = if code == sys::ESP_ERR_HTTP_CONNECT as sys::esp_err_t {
        // esp_http_client does not tell DNS and connect failures apart
        TransportErrorKind::Connect
    } else if code == sys::ESP_ERR_HTTP_EAGAIN as sys::esp_err_t
        || code == sys::ESP_ERR_TIMEOUT as sys::esp_err_t
    {
        TransportErrorKind::Timeout
    } else if code == sys::ESP_ERR_HTTP_WRITE_DATA as sys::esp_err_t
        || code == sys::ESP_ERR_HTTP_FETCH_HEADER as sys::esp_err_t
        || code == sys::ESP_ERR_HTTP_CONNECTION_CLOSED as sys::esp_err_t
    {
        TransportErrorKind::Io
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.to_string())
}
