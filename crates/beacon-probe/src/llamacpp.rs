//! HTTP probe against a llama.cpp server's `/health` endpoint.
//!
//! `200` and `503` both carry a JSON status body and become samples;
//! `401` becomes an "unauthorized" sample; anything else is an error.

use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use http_body_util::Full;
use serde::Deserialize;
use tracing::debug;

use beacon_core::transport::{request, round_trip};
use beacon_core::{BeaconError, BeaconResult, Deadline, HealthSample, ServerAddr, epoch_millis};

use crate::{Probe, ProbeFuture};

pub const HEALTH_PATH: &str = "/health";

pub const STATUS_UNAUTHORIZED: &str = "unauthorized";
pub const STATUS_UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
    #[serde(default)]
    slots_idle: Option<u32>,
    #[serde(default)]
    slots_processing: Option<u32>,
}

/// Probes a llama.cpp server over plain HTTP/1.
#[derive(Debug, Clone)]
pub struct LlamaCppProbe {
    addr: ServerAddr,
    authorization: Option<HeaderValue>,
}

impl LlamaCppProbe {
    pub fn new(addr: ServerAddr, api_key: Option<String>) -> BeaconResult<Self> {
        let authorization = match api_key {
            Some(key) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|e| BeaconError::Config(format!("invalid api key: {e}")))?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        Ok(Self {
            addr,
            authorization,
        })
    }

    async fn fetch_health(&self) -> BeaconResult<HealthSample> {
        let mut builder = request(Method::GET, &self.addr, HEALTH_PATH)
            .header(header::ACCEPT, "application/json");
        if let Some(auth) = &self.authorization {
            builder = builder.header(header::AUTHORIZATION, auth.clone());
        }
        let req = builder
            .body(Full::new(Bytes::new()))
            .map_err(|e| BeaconError::Probe(e.to_string()))?;

        let response = round_trip(&self.addr, req).await.map_err(|e| {
            debug!(error = %e, addr = %self.addr, "health probe request failed");
            BeaconError::Probe(e.to_string())
        })?;

        classify(response.status, &response.body, epoch_millis())
    }
}

impl Probe for LlamaCppProbe {
    fn probe<'a>(&'a self, deadline: &'a Deadline) -> ProbeFuture<'a> {
        Box::pin(async move { deadline.run(self.fetch_health()).await? })
    }
}

/// Turn a `/health` response into a sample.
fn classify(status: StatusCode, body: &[u8], observed_at_ms: u64) -> BeaconResult<HealthSample> {
    match status {
        StatusCode::OK => parse_body(body, observed_at_ms),
        StatusCode::SERVICE_UNAVAILABLE => Ok(parse_body(body, observed_at_ms)
            .unwrap_or_else(|_| HealthSample::new(STATUS_UNAVAILABLE, observed_at_ms))),
        StatusCode::UNAUTHORIZED => Ok(HealthSample::new(STATUS_UNAUTHORIZED, observed_at_ms)),
        other => {
            debug!(status = %other, "health probe unexpected status");
            Err(BeaconError::Probe(format!("unexpected response status {other}")))
        }
    }
}

fn parse_body(body: &[u8], observed_at_ms: u64) -> BeaconResult<HealthSample> {
    let parsed: HealthBody = serde_json::from_slice(body)
        .map_err(|e| BeaconError::Probe(format!("malformed health body: {e}")))?;

    Ok(HealthSample::new(parsed.status, observed_at_ms)
        .with_slots(parsed.slots_idle, parsed.slots_processing))
}
