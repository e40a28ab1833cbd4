use core::time::Duration;

use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::io::Write;
use embedded_svc::utils::io;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use esp_idf_svc::io::EspIOError;
use esp_idf_svc::sys::{EspError, ESP_ERR_TIMEOUT};

use climate_node_common::{HttpResponse, HttpTransport, TransportError};

/// Response bytes kept for logging; the collector answers with a short JSON.
const BODY_BUFFER: usize = 512;

/// One `esp_http_client` per POST, torn down when the response is read.
pub struct EspTransport {
    timeout: Duration,
}

impl EspTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client(&self) -> Result<HttpClient<EspHttpConnection>, EspError> {
        let connection = EspHttpConnection::new(&HttpConfiguration {
            timeout: Some(self.timeout),
            ..Default::default()
        })?;
        Ok(HttpClient::wrap(connection))
    }
}

fn transport_error(e: EspIOError) -> TransportError {
    if e.0.code() == ESP_ERR_TIMEOUT as i32 {
        TransportError::Timeout
    } else {
        TransportError::Connect(e.to_string())
    }
}

impl HttpTransport for EspTransport {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let mut client = self
            .client()
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let content_length = body.len().to_string();
        let headers = [
            ("Content-Type", "application/json"),
            ("Content-Length", content_length.as_str()),
        ];

        let mut request = client.post(url, &headers).map_err(transport_error)?;
        request.write_all(body).map_err(transport_error)?;
        request.flush().map_err(transport_error)?;
        let mut response = request.submit().map_err(transport_error)?;

        let status = response.status();
        let mut buf = [0u8; BODY_BUFFER];
        let read = io::try_read_full(&mut response, &mut buf)
            .map_err(|e| TransportError::Io(e.0.to_string()))?;

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&buf[..read]).into_owned(),
        })
    }
}
