//! Deployment of validated rules to a configured endpoint.
//!
//! One authenticated JSON POST per rule. The response only drives logging;
//! a deployment failure never alters the persisted local artifact.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::io::settings::DeploySettings;

/// Request body for the deployment endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DeployPayload {
    pub rule_name: String,
    pub rule_code: String,
    pub metadata: BTreeMap<String, String>,
}

impl DeployPayload {
    pub fn new(rule_name: &str, rule_code: &str, request: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("request".to_string(), request.to_string());
        Self {
            rule_name: rule_name.to_string(),
            rule_code: rule_code.to_string(),
            metadata,
        }
    }
}

/// Outcome of one deployment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub success: bool,
    pub message: String,
}

/// POST the rule to the deployment endpoint.
///
/// Transport failures are returned as `Ok` outcomes with `success = false`
/// so the caller reports them without aborting the run.
#[instrument(skip_all, fields(rule_name = %payload.rule_name))]
pub fn deploy_rule(settings: &DeploySettings, payload: &DeployPayload) -> Result<DeployOutcome> {
    let http = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("build deploy http client")?;

    let mut request = http.post(&settings.url).json(payload);
    if let Some(token) = &settings.token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = match request.send() {
        Ok(response) => response,
        Err(err) => {
            return Ok(DeployOutcome {
                success: false,
                message: format!("failed to reach deployment endpoint: {err}"),
            });
        }
    };

    let status = response.status();
    let text = response.text().unwrap_or_default();
    if !status.is_success() {
        return Ok(DeployOutcome {
            success: false,
            message: format!("deployment endpoint returned {status}: {text}"),
        });
    }

    Ok(interpret_response(&text))
}

/// Interpret the endpoint's JSON reply; a missing or empty `status` field
/// counts as success, anything other than ok/success/deployed does not.
fn interpret_response(body: &str) -> DeployOutcome {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return DeployOutcome {
            success: true,
            message: body.trim().to_string(),
        };
    };
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(body.trim())
        .to_string();
    let success = matches!(status.as_str(), "" | "ok" | "success" | "deployed");
    DeployOutcome { success, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;

    #[test]
    fn posts_once_with_bearer_token_and_rule_code() {
        let server = StubServer::serve(vec![r#"{"status":"ok","message":"done"}"#.to_string()]);
        let settings = DeploySettings {
            url: server.url(),
            token: Some("dep-token".to_string()),
        };
        let payload = DeployPayload::new(
            "motion_light",
            "rule Motion\nwhen\n    Item MotionSensor changed\nthen\n    sendCommand(LivingRoom_Light, ON)\nend",
            "turn on the light",
        );

        let outcome = deploy_rule(&settings, &payload).expect("deploy");
        assert!(outcome.success);
        assert_eq!(outcome.message, "done");

        let requests = server.finish();
        assert_eq!(requests.len(), 1);
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("post "));
        assert!(request.contains("authorization: bearer dep-token"));
        assert!(requests[0].contains("sendCommand(LivingRoom_Light, ON)"));
        assert!(requests[0].contains("\"rule_name\":\"motion_light\""));
    }

    #[test]
    fn payload_carries_request_metadata() {
        let payload = DeployPayload::new("motion_light", "rule ...", "turn on the light");
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["rule_name"], "motion_light");
        assert_eq!(json["metadata"]["request"], "turn on the light");
    }

    #[test]
    fn status_field_drives_success() {
        assert!(interpret_response(r#"{"status":"deployed","message":"ok"}"#).success);
        assert!(interpret_response(r#"{"message":"no status"}"#).success);
        let failed = interpret_response(r#"{"status":"error","message":"boom"}"#);
        assert!(!failed.success);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn non_json_body_counts_as_success() {
        let outcome = interpret_response("accepted");
        assert!(outcome.success);
        assert_eq!(outcome.message, "accepted");
    }
}
