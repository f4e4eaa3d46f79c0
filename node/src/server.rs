//! HTTP front of an [`EdgeWorker`].
//!
//! `GET /` answers `Works`; `POST /detect_edge` takes the JSON request and
//! answers with either a JSON pixel array or a chunked stream of gradient records.

use anyhow::Result;
use blind_sobel::crypto::HomomorphicCipher;
use blind_sobel::errors::{CryptoError, EdgeError};
use blind_sobel::protocol::{EdgeResponse, EdgeWorker, ErrorBody, PlainResponse};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use std::io::{Cursor, Read};
use std::time::Instant;

type Body = Box<dyn Read + Send>;

pub struct HttpServer<C: HomomorphicCipher> {
    server: Server,
    worker: EdgeWorker<C>,
    json_header: Header,
    text_header: Header,
}

impl<C: HomomorphicCipher> HttpServer<C> {
    pub fn new(addr: &str, worker: EdgeWorker<C>) -> Result<Self> {
        let server =
            Server::http(addr).map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;
        let json_header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
            .map_err(|_| anyhow::anyhow!("invalid content type header"))?;
        let text_header = Header::from_bytes(&b"Content-Type"[..], &b"text/plain"[..])
            .map_err(|_| anyhow::anyhow!("invalid content type header"))?;
        Ok(Self {
            server,
            worker,
            json_header,
            text_header,
        })
    }

    pub fn addr(&self) -> Option<std::net::SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serves requests one after another until the listener closes.
    pub fn serve(&self) {
        for mut request in self.server.incoming_requests() {
            let started = Instant::now();
            let method = request.method().clone();
            let url = request.url().to_string();

            let response = self.route(&mut request);
            let status = response.status_code().0;
            if let Err(e) = request.respond(response) {
                log::warn!("{} {} failed while responding: {}", method, url, e);
                continue;
            }
            log::info!("{} {} -> {} in {:?}", method, url, status, started.elapsed());
        }
    }

    fn route(&self, request: &mut Request) -> Response<Body> {
        let method = request.method().clone();
        let url = request.url().to_string();
        match (&method, url.as_str()) {
            (Method::Get, "/") => self.text(200, "Works"),
            (Method::Post, "/detect_edge") => self.detect_edge(request),
            (Method::Post, _) | (Method::Get, _) => self.error(404, "not found"),
            _ => self.error(405, "method not allowed"),
        }
    }

    fn detect_edge(&self, request: &mut Request) -> Response<Body> {
        let mut body = Vec::new();
        if let Err(e) = request.as_reader().read_to_end(&mut body) {
            return self.error(400, &format!("read error: {}", e));
        }

        match self.worker.handle_json(&body) {
            Ok(EdgeResponse::Pixels(pixels)) => match serde_json::to_vec(&PlainResponse { pixels }) {
                Ok(bytes) => self.respond(200, self.json_header.clone(), Box::new(Cursor::new(bytes))),
                Err(e) => self.error(500, &e.to_string()),
            },
            Ok(EdgeResponse::Gradients(stream)) => {
                log::debug!("streaming {} gradient records", stream.record_count());
                self.respond(200, self.text_header.clone(), Box::new(stream.into_reader()))
            }
            Err(e) => {
                log::warn!("request rejected: {}", e);
                self.error(status_for(&e), &e.to_string())
            }
        }
    }

    fn respond(&self, status: u16, header: Header, body: Body) -> Response<Body> {
        // no length: the body goes out with chunked transfer encoding
        Response::new(StatusCode(status), vec![header], body, None, None)
    }

    fn text(&self, status: u16, text: &str) -> Response<Body> {
        let body = Cursor::new(text.as_bytes().to_vec());
        Response::new(
            StatusCode(status),
            vec![self.text_header.clone()],
            Box::new(body) as Body,
            Some(text.len()),
            None,
        )
    }

    fn error(&self, status: u16, message: &str) -> Response<Body> {
        let body = serde_json::to_vec(&ErrorBody {
            error: message.to_string(),
        })
        .unwrap_or_else(|_| b"{}".to_vec());
        let len = body.len();
        Response::new(
            StatusCode(status),
            vec![self.json_header.clone()],
            Box::new(Cursor::new(body)) as Body,
            Some(len),
            None,
        )
    }
}

/// 400 for requests the worker refused to start on, 501 for a missing
/// encrypted path, 500 for failures during computation.
fn status_for(err: &EdgeError) -> u16 {
    match err.root() {
        EdgeError::UnsupportedMode => 501,
        EdgeError::MalformedRequest(_)
        | EdgeError::Base64(_)
        | EdgeError::Crypto(CryptoError::MalformedCiphertext(_))
        | EdgeError::Crypto(CryptoError::EncodingMismatch { .. }) => 400,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpTransport;

    use blind_sobel::EdgeConfig;
    use blind_sobel::crypto::Encoding;
    use blind_sobel::crypto::paillier::{PaillierPublic, PaillierSecret};
    use blind_sobel::grid::PixelGrid;
    use blind_sobel::protocol::{DetectionMode, EdgeClient};
    use blind_sobel::telemetry::NoopTelemetry;

    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    type HttpClient = EdgeClient<HttpTransport, PaillierSecret>;

    fn config() -> EdgeConfig {
        EdgeConfig {
            chunk_size: 4,
            workers: Some(2),
            modulus_bits: 256,
            ..Default::default()
        }
    }

    /// Serves on an ephemeral port for the rest of the test process.
    fn spawn_worker(plaintext_only: bool) -> Result<String> {
        let worker = if plaintext_only {
            EdgeWorker::<PaillierPublic>::plaintext_only(&config(), Arc::new(NoopTelemetry))?
        } else {
            EdgeWorker::<PaillierPublic>::new(&config(), Arc::new(NoopTelemetry))?
        };
        let server = HttpServer::new("127.0.0.1:0", worker)?;
        let addr = server
            .addr()
            .ok_or_else(|| anyhow::anyhow!("server is not bound to an IP address"))?;
        thread::spawn(move || server.serve());
        Ok(format!("http://{}", addr))
    }

    fn client(base_url: &str) -> Result<HttpClient> {
        Ok(EdgeClient::new(
            HttpTransport::new(base_url),
            config(),
            Arc::new(NoopTelemetry),
        )?)
    }

    fn image() -> Result<PixelGrid> {
        let pixels = (0..36u32).map(|i| ((i * 97 + 13) % 256) as u8).collect();
        Ok(PixelGrid::try_with(6, pixels)?)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&EdgeError::UnsupportedMode), 501);
        assert_eq!(status_for(&EdgeError::MalformedRequest("x".into())), 400);
        let nested = EdgeError::ChunkFailed {
            chunk: 3,
            source: Box::new(EdgeError::Crypto(CryptoError::MalformedCiphertext("x".into()))),
        };
        assert_eq!(status_for(&nested), 400);
        assert_eq!(status_for(&EdgeError::ChunkPanicked { chunk: 0 }), 500);
    }

    #[test]
    fn test_detection_over_http() -> Result<()> {
        let client = client(&spawn_worker(false)?)?;
        let grid = image()?;

        let plain = client.detect(&grid, DetectionMode::Plaintext)?;
        assert_eq!(plain.len(), 36);
        assert!(plain.iter().any(|&p| p > 0));

        let integer = client.detect(&grid, DetectionMode::Encrypted(Encoding::Integer))?;
        assert_eq!(integer, plain);

        let fractional = client.detect(&grid, DetectionMode::Encrypted(Encoding::Fractional))?;
        assert_eq!(fractional.len(), 36);
        for (index, (&f, &p)) in fractional.iter().zip(&plain).enumerate() {
            assert!(f.abs_diff(p) <= 1, "pixel {}: {} vs {}", index, f, p);
        }
        Ok(())
    }

    #[test]
    fn test_plaintext_only_worker_answers_501() -> Result<()> {
        let client = client(&spawn_worker(true)?)?;
        let grid = image()?;

        match client.detect(&grid, DetectionMode::Encrypted(Encoding::Fractional)) {
            Err(EdgeError::Rejected { status, body }) => {
                assert_eq!(status, 501);
                assert!(body.contains("not implemented"), "{}", body);
            }
            other => panic!("expected a 501 rejection, got {:?}", other),
        }
        assert_eq!(client.detect(&grid, DetectionMode::Plaintext)?.len(), 36);
        Ok(())
    }

    #[test]
    fn test_refused_connection_is_a_transport_error() -> Result<()> {
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let client = client(&format!("http://127.0.0.1:{}", port))?;

        let result = client.detect(&image()?, DetectionMode::Plaintext);
        assert!(matches!(result, Err(EdgeError::Transport(_))), "{:?}", result);
        Ok(())
    }
}
