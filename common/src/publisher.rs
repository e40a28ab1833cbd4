//! Delivery of telemetry to the collector.

use climate_node_model::{DeliveryOutcome, Payload};
use log::{debug, error, info, warn};

use crate::ports::HttpTransport;

/// Longest stretch of a response body that ends up in the log.
const MAX_LOGGED_BODY: usize = 256;

pub struct TelemetryPublisher<T> {
    transport: T,
    endpoint: String,
    include_severity: bool,
}

impl<T: HttpTransport> TelemetryPublisher<T> {
    pub fn new(transport: T, endpoint: impl Into<String>, include_severity: bool) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            include_severity,
        }
    }

    /// One POST, no retry. A payload that is not delivered is dropped.
    pub fn send(&mut self, payload: &Payload) -> DeliveryOutcome {
        let body = match payload.to_json(self.include_severity) {
            Ok(body) => body,
            Err(e) => {
                error!("Could not encode payload: {e}");
                return DeliveryOutcome::TransportFailed;
            }
        };

        info!(
            "-> POST {} {:?} from {} ({} bytes)",
            self.endpoint,
            payload.kind(),
            payload.device_id(),
            body.len()
        );
        debug!("{}", String::from_utf8_lossy(&body));

        match self.transport.post_json(&self.endpoint, &body) {
            Ok(response) => {
                let outcome = DeliveryOutcome::from_status(response.status);
                info!(
                    "<- {} {:?}",
                    response.status,
                    truncate(&response.body, MAX_LOGGED_BODY)
                );
                if outcome != DeliveryOutcome::Delivered {
                    warn!("Collector rejected the payload");
                }
                outcome
            }
            Err(e) => {
                warn!("POST failed: {e}");
                DeliveryOutcome::TransportFailed
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{HttpResponse, TransportError};
    use climate_node_model::{ErrorEvent, Reading, Thresholds};

    struct Canned {
        reply: Option<u16>,
        sent: Vec<(String, Vec<u8>)>,
    }

    impl HttpTransport for Canned {
        fn post_json(&mut self, url: &str, body: &[u8]) -> Result<HttpResponse, TransportError> {
            self.sent.push((url.to_string(), body.to_vec()));
            match self.reply {
                Some(status) => Ok(HttpResponse {
                    status,
                    body: r#"{"status":"success"}"#.into(),
                }),
                None => Err(TransportError::Timeout),
            }
        }
    }

    fn publisher(reply: Option<u16>) -> TelemetryPublisher<Canned> {
        TelemetryPublisher::new(
            Canned {
                reply,
                sent: Vec::new(),
            },
            "http://collector.local:5000/data",
            false,
        )
    }

    fn reading() -> Payload {
        Reading::classified(25.5, 60.2, None, "node-7", &Thresholds::default()).into()
    }

    #[test]
    fn outcome_follows_status_code() {
        for (status, expected) in [
            (200, DeliveryOutcome::Delivered),
            (201, DeliveryOutcome::Delivered),
            (400, DeliveryOutcome::ServerRejected),
            (500, DeliveryOutcome::ServerRejected),
        ] {
            assert_eq!(publisher(Some(status)).send(&reading()), expected);
        }
    }

    #[test]
    fn no_response_is_a_transport_failure() {
        assert_eq!(
            publisher(None).send(&reading()),
            DeliveryOutcome::TransportFailed
        );
    }

    #[test]
    fn exactly_one_attempt_per_send() {
        let mut publisher = publisher(Some(503));
        publisher.send(&reading());
        assert_eq!(publisher.transport.sent.len(), 1);

        let (url, body) = &publisher.transport.sent[0];
        assert_eq!(url, "http://collector.local:5000/data");
        assert_eq!(
            body.as_slice(),
            br#"{"temperatura":25.5,"umidade":60.2,"device_id":"node-7"}"#
        );
    }

    #[test]
    fn error_events_go_to_the_same_endpoint() {
        let mut publisher = publisher(Some(201));
        let event = ErrorEvent::sensor_fault("DHT11 read failed", "node-7", None);
        assert_eq!(publisher.send(&event.into()), DeliveryOutcome::Delivered);

        let value: serde_json::Value =
            serde_json::from_slice(&publisher.transport.sent[0].1).unwrap();
        assert_eq!(value["status"], "erro_sensor");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("abc", 8), "abc");
        assert_eq!(truncate("temperatura média", 14), "temperatura m");
    }
}
