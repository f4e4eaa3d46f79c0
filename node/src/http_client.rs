use blind_sobel::errors::EdgeError;
use blind_sobel::protocol::{PlainResponse, Transport, WireRequest, WorkerReply};

use std::io::BufReader;

/// Sends requests to `POST {base_url}/detect_edge`. Never retries.
pub struct HttpTransport {
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/detect_edge", base_url.trim_end_matches('/')),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &WireRequest) -> Result<WorkerReply, EdgeError> {
        let body = serde_json::to_vec(request)?;
        log::debug!("POST {} ({} bytes)", self.endpoint, body.len());

        let mut response = ureq::post(&self.endpoint)
            .config()
            .http_status_as_error(false)
            .build()
            .content_type("application/json")
            .send(&body[..])
            .map_err(|e| EdgeError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response
                .body_mut()
                .read_to_string()
                .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
            return Err(EdgeError::Rejected { status, body });
        }

        let reader = BufReader::new(response.into_body().into_reader());
        if request.encrypted {
            Ok(WorkerReply::Stream(Box::new(reader)))
        } else {
            let reply: PlainResponse = serde_json::from_reader(reader)
                .map_err(|e| EdgeError::MalformedResponse(format!("Invalid pixel response: {}", e)))?;
            Ok(WorkerReply::Pixels(reply.pixels))
        }
    }
}
