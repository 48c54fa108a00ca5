//! HTTP client for the management plane's status endpoint.

use bytes::Bytes;
use http::{Method, header};
use http_body_util::Full;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use beacon_core::transport::{request, round_trip};
use beacon_core::{
    BeaconError, BeaconResult, Deadline, Emitted, HealthSample, ResultEvent, ResultSink,
    ServerAddr, SessionId, TargetConfig, emit_result,
};

use crate::{Deliver, DeliverFuture};

pub const DELIVERY_FAILED: &str = "failed to report health status";

/// Body posted to the management plane for every sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub agent_name: Option<String>,
    pub session_id: SessionId,
    pub external_addr: ServerAddr,
    pub sample: HealthSample,
}

/// Path of the session-scoped status endpoint.
pub fn status_update_path(session_id: &SessionId) -> String {
    format!("/api/v1/agent/status_update/{session_id}")
}

#[derive(Debug, Clone)]
pub struct ManagementClient {
    addr: ServerAddr,
}

impl ManagementClient {
    pub fn new(addr: ServerAddr) -> Self {
        Self { addr }
    }

    async fn post_report(&self, session_id: &SessionId, report: &StatusReport) -> BeaconResult<()> {
        let body = serde_json::to_vec(report)
            .map_err(|e| BeaconError::Delivery(format!("serialize report: {e}")))?;

        let req = request(Method::POST, &self.addr, &status_update_path(session_id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| BeaconError::Delivery(e.to_string()))?;

        let response = round_trip(&self.addr, req)
            .await
            .map_err(|e| BeaconError::Delivery(e.to_string()))?;

        if response.status.is_success() {
            Ok(())
        } else {
            Err(BeaconError::Delivery(format!(
                "management server returned {}",
                response.status
            )))
        }
    }
}

impl Deliver for ManagementClient {
    fn deliver<'a>(
        &'a self,
        deadline: &'a Deadline,
        results: &'a ResultSink,
        target: &'a TargetConfig,
        sample: HealthSample,
        session_id: &'a SessionId,
        agent_name: Option<&'a str>,
    ) -> DeliverFuture<'a> {
        Box::pin(async move {
            let report = StatusReport {
                agent_name: agent_name.map(str::to_owned),
                session_id: session_id.clone(),
                external_addr: target.external_addr.clone(),
                sample,
            };

            let outcome = deadline
                .run(self.post_report(session_id, &report))
                .await
                .and_then(std::convert::identity);

            match outcome {
                Ok(()) => {
                    debug!(%session_id, status = %report.sample.status, "health status reported");
                }
                // The session is stopping; not a delivery failure.
                Err(BeaconError::Cancelled) => {
                    debug!(%session_id, "health status delivery cancelled");
                }
                Err(e) => {
                    debug!(%session_id, error = %e, "health status delivery failed");
                    let event = ResultEvent::with_error(DELIVERY_FAILED, e);
                    match emit_result(results, event, deadline.token()).await {
                        Emitted::Sent => {}
                        Emitted::Closed => {
                            warn!(%session_id, "result sink closed; dropping delivery failure");
                        }
                        Emitted::Cancelled => {
                            warn!(%session_id, "result sink full at shutdown; dropping delivery failure");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_path_is_session_scoped() {
        let id = SessionId::new("abc");
        assert_eq!(status_update_path(&id), "/api/v1/agent/status_update/abc");
    }

    #[test]
    fn report_json_shape() {
        let report = StatusReport {
            agent_name: Some("gpu-1".to_string()),
            session_id: SessionId::new("abc"),
            external_addr: ServerAddr::new("10.0.0.5", 8080),
            sample: HealthSample::new("ok", 9),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["agent_name"], "gpu-1");
        assert_eq!(json["session_id"], "abc");
        assert_eq!(json["external_addr"], "10.0.0.5:8080");
        assert_eq!(json["sample"]["status"], "ok");

        let back: StatusReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
