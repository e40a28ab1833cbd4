use std::time::Duration;

use climate_node_common::{HttpResponse, HttpTransport, TransportError};

/// Delivery over `ureq`, with one timeout covering connect, send and receive.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            // One POST per cycle: a 3xx is reported, never followed.
            agent: ureq::AgentBuilder::new()
                .timeout(timeout)
                .redirects(0)
                .build(),
        }
    }
}

impl HttpTransport for UreqTransport {
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let result = self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .send_bytes(body);

        match result {
            Ok(response) => {
                let status = response.status();
                Ok(HttpResponse {
                    status,
                    body: response.into_string().unwrap_or_default(),
                })
            }
            Err(ureq::Error::Status(status, response)) => Ok(HttpResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(match transport.kind() {
                ureq::ErrorKind::Dns => TransportError::Dns(url.to_string()),
                ureq::ErrorKind::ConnectionFailed => TransportError::Connect(transport.to_string()),
                ureq::ErrorKind::Io if transport.to_string().contains("timed out") => {
                    TransportError::Timeout
                }
                _ => TransportError::Io(transport.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// A collector on a free loopback port. Every request line it sees is
    /// recorded; each connection gets `reply` as status line plus `headers`.
    fn collector(reply: &'static str, headers: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/data", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { return };
                let request = read_request(&mut stream);
                log.lock()
                    .unwrap()
                    .push(request.lines().next().unwrap_or_default().to_string());

                let body = "ok";
                let response = format!(
                    "HTTP/1.1 {reply}\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (url, seen)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    #[test]
    fn redirect_is_reported_not_followed() {
        let (url, seen) = collector("302 Found", "Location: /elsewhere\r\n");
        let mut transport = UreqTransport::new(Duration::from_secs(2));

        let response = transport.post_json(&url, br#"{"temperatura":20.0}"#).unwrap();

        assert_eq!(response.status, 302);
        assert_eq!(*seen.lock().unwrap(), ["POST /data HTTP/1.1"]);
    }

    #[test]
    fn server_error_comes_back_as_a_response() {
        let (url, seen) = collector("500 Internal Server Error", "");
        let mut transport = UreqTransport::new(Duration::from_secs(2));

        let response = transport.post_json(&url, b"{}").unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.body, "ok");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn accepted_post_is_a_200() {
        let (url, _) = collector("200 OK", "Content-Type: text/plain\r\n");
        let mut transport = UreqTransport::new(Duration::from_secs(2));

        let response = transport.post_json(&url, b"{}").unwrap();

        assert_eq!(response.status, 200);
    }

    #[test]
    fn unreachable_collector_is_a_transport_error() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        // Listener dropped: nothing accepts on this port any more.
        let mut transport = UreqTransport::new(Duration::from_millis(500));

        let result = transport.post_json(&format!("http://127.0.0.1:{port}/data"), b"{}");

        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
