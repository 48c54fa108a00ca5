//! Minimal HTTP/1 client round-trip over hyper.
//!
//! Both the health probe and the management client open one connection
//! per call; each call is short and bounded by a [`crate::Deadline`].

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use thiserror::Error;
use tracing::debug;

use crate::config::ServerAddr;

const USER_AGENT: &str = concat!("beacon/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("http error: {0}")]
    Hyper(#[from] hyper::Error),
}

/// A fully-buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Start a request against `addr` with the host and user-agent headers set.
pub fn request(method: Method, addr: &ServerAddr, path: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(format!("http://{addr}{path}"))
        .header(http::header::HOST, addr.to_string())
        .header(http::header::USER_AGENT, USER_AGENT)
}

/// Send one request over a fresh connection and buffer the response body.
pub async fn round_trip(
    addr: &ServerAddr,
    request: Request<Full<Bytes>>,
) -> Result<HttpResponse, HttpError> {
    let stream = tokio::net::TcpStream::connect(addr.to_string()).await?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "http connection closed with error");
        }
    });

    let response = sender.send_request(request).await?;
    let status = response.status();
    let body = response.into_body().collect().await?.to_bytes();

    Ok(HttpResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sets_host_and_uri() {
        let addr = ServerAddr::new("127.0.0.1", 8080);
        let req = request(Method::GET, &addr, "/health")
            .body(Full::new(Bytes::new()))
            .unwrap();

        assert_eq!(req.uri().to_string(), "http://127.0.0.1:8080/health");
        assert_eq!(req.headers()[http::header::HOST], "127.0.0.1:8080");
        assert!(
            req.headers()[http::header::USER_AGENT]
                .to_str()
                .unwrap()
                .starts_with("beacon/")
        );
    }

    #[tokio::test]
    async fn round_trip_to_closed_port_fails_to_connect() {
        let addr = ServerAddr::new("127.0.0.1", 1);
        let req = request(Method::GET, &addr, "/health")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let err = round_trip(&addr, req).await.unwrap_err();
        assert!(matches!(err, HttpError::Connect(_)));
    }
}
