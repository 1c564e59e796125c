//! HTTP transport -- talks to the form-versions REST API.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Endpoints, relative to the configured base
//! URL:
//!
//! - `GET  form-versions/{id}`
//! - `POST form-versions/{id}/submissions` with `{"payload": ..., "user_id": ...}`
//! - `POST form-versions/{id}/uploads` as `multipart/form-data` (`field_id`, `file`)
//!
//! Error statuses are read, not raised: a 404 maps to `NotFound`, any other
//! failure with a JSON body maps to `Rejected`, and anything unreadable
//! maps to `Network`.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use formgate_eval::SubmissionPayload;
use formgate_schema::{FormVersion, VersionId};
use serde_json::Value;
use tracing::{debug, warn};
use ureq::Agent;

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::record::{FileUpload, SubmissionResult, SubmitterId, UploadedFile};
use crate::traits::FormTransport;

const SUBMIT_FAILED: &str = "form submission failed";
const UPLOAD_FAILED: &str = "file upload failed";

/// A status code and the raw response text.
struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn json(&self) -> Result<Value, TransportError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Transport backed by the form-versions REST API.
pub struct HttpTransport {
    config: TransportConfig,
    agent: Agent,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();
        HttpTransport { config, agent }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn version_url(&self, version_id: &VersionId, suffix: &str) -> String {
        let path = format!("form-versions/{}{}", version_id, suffix);
        self.config.endpoint(&path)
    }

    fn bearer(&self) -> Option<String> {
        self.config
            .auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }
}

/// Run a blocking request on the blocking pool and read its response.
async fn run_blocking<F>(call: F) -> Result<RawResponse, TransportError>
where
    F: FnOnce() -> Result<ureq::http::Response<ureq::Body>, ureq::Error> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut response = call().map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(RawResponse { status, body })
    })
    .await
    .map_err(|e| TransportError::Network(format!("task join error: {}", e)))?
}

#[async_trait]
impl FormTransport for HttpTransport {
    async fn fetch_schema(&self, version_id: &VersionId) -> Result<FormVersion, TransportError> {
        let url = self.version_url(version_id, "");
        let agent = self.agent.clone();
        let bearer = self.bearer();
        debug!(%url, "fetching form version");

        let response = run_blocking(move || {
            let mut request = agent.get(&url).header("Accept", "application/json");
            if let Some(ref value) = bearer {
                request = request.header("Authorization", value);
            }
            request.call()
        })
        .await?;

        if response.status == 404 {
            return Err(TransportError::NotFound {
                version_id: version_id.to_string(),
            });
        }
        if !response.is_success() {
            let fallback = format!("failed to fetch form version {}", version_id);
            let err = failure(&response, &fallback);
            warn!(version = %version_id, status = response.status, error = %err, "schema fetch failed");
            return Err(err);
        }
        Ok(FormVersion::from_json(&response.json()?)?)
    }

    async fn submit_payload(
        &self,
        version_id: &VersionId,
        payload: &SubmissionPayload,
        submitter: Option<&SubmitterId>,
    ) -> Result<SubmissionResult, TransportError> {
        let url = self.version_url(version_id, "/submissions");
        let agent = self.agent.clone();
        let bearer = self.bearer();
        let body = serde_json::json!({
            "payload": payload,
            "user_id": submitter,
        });
        debug!(%url, fields = payload.len(), "submitting form");

        let response = run_blocking(move || {
            let mut request = agent
                .post(&url)
                .header("Accept", "application/json")
                .header("Content-Type", "application/json");
            if let Some(ref value) = bearer {
                request = request.header("Authorization", value);
            }
            request.send_json(&body)
        })
        .await?;

        if !response.is_success() {
            let err = failure(&response, SUBMIT_FAILED);
            warn!(version = %version_id, status = response.status, error = %err, "submission failed");
            return Err(err);
        }
        Ok(SubmissionResult::from_body(response.json()?))
    }

    async fn upload_file(
        &self,
        version_id: &VersionId,
        field_id: &str,
        upload: FileUpload,
    ) -> Result<UploadedFile, TransportError> {
        let url = self.version_url(version_id, "/uploads");
        let agent = self.agent.clone();
        let bearer = self.bearer();
        let boundary = boundary();
        let body = multipart_body(&boundary, field_id, &upload);
        debug!(%url, field = field_id, bytes = upload.bytes.len(), "uploading file");

        let response = run_blocking(move || {
            let mut request = agent
                .post(&url)
                .header("Accept", "application/json")
                .header(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={}", boundary),
                );
            if let Some(ref value) = bearer {
                request = request.header("Authorization", value);
            }
            request.send(&body[..])
        })
        .await?;

        if !response.is_success() {
            let err = upload_failure(&response);
            warn!(version = %version_id, field = field_id, status = response.status, error = %err, "upload failed");
            return Err(err);
        }
        let value = response.json()?;
        let data = match value.get("data") {
            Some(data) if data.is_object() => data.clone(),
            _ => value,
        };
        serde_json::from_value(data).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

// ──────────────────────────────────────────────
// Error bodies
// ──────────────────────────────────────────────

/// Map an error response to `Rejected` when its body is JSON, otherwise to
/// `Network`.
fn failure(response: &RawResponse, fallback: &str) -> TransportError {
    let Ok(body) = serde_json::from_str::<Value>(&response.body) else {
        return TransportError::Network(format!("HTTP {}: {}", response.status, fallback));
    };
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string();
    TransportError::Rejected {
        message,
        errors: field_errors(body.get("errors")),
    }
}

/// Upload failures prefer the first `errors.file` message over `message`.
fn upload_failure(response: &RawResponse) -> TransportError {
    match failure(response, UPLOAD_FAILED) {
        TransportError::Rejected { message, errors } => {
            let message = errors
                .get("file")
                .and_then(|msgs| msgs.first())
                .cloned()
                .unwrap_or(message);
            TransportError::Rejected { message, errors }
        }
        other => other,
    }
}

/// `{"field": ["msg", ...]}`, also accepting a bare string per field.
fn field_errors(value: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    let Some(Value::Object(obj)) = value else {
        return BTreeMap::new();
    };
    obj.iter()
        .map(|(field, msgs)| {
            let msgs = match msgs {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };
            (field.clone(), msgs)
        })
        .filter(|(_, msgs)| !msgs.is_empty())
        .collect()
}

// ──────────────────────────────────────────────
// Multipart encoding
// ──────────────────────────────────────────────

fn boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("formgate-{:032x}", nanos)
}

/// Quotes and line breaks cannot appear inside a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect()
}

fn multipart_body(boundary: &str, field_id: &str, upload: &FileUpload) -> Vec<u8> {
    let mut body = Vec::with_capacity(upload.bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"field_id\"\r\n\r\n{}\r\n",
            boundary, field_id
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            boundary,
            header_safe(&upload.file_name),
            upload.content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(&upload.bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn version_urls() {
        let transport = HttpTransport::new(TransportConfig::new("https://api.test/v1/"));
        let id = VersionId::from(7u64);
        assert_eq!(
            transport.version_url(&id, ""),
            "https://api.test/v1/form-versions/7"
        );
        assert_eq!(
            transport.version_url(&id, "/uploads"),
            "https://api.test/v1/form-versions/7/uploads"
        );
    }

    #[test]
    fn rejected_with_field_errors() {
        let err = failure(
            &raw(
                422,
                r#"{"message":"Invalid data","errors":{"email":["taken","bad"],"name":"short","x":[]}}"#,
            ),
            SUBMIT_FAILED,
        );
        let TransportError::Rejected { message, errors } = err else {
            panic!("expected Rejected");
        };
        assert_eq!(message, "Invalid data");
        assert_eq!(errors["email"], vec!["taken", "bad"]);
        assert_eq!(errors["name"], vec!["short"]);
        assert!(!errors.contains_key("x"));
    }

    #[test]
    fn non_json_failure_is_network() {
        let err = failure(&raw(502, "<html>Bad Gateway</html>"), SUBMIT_FAILED);
        assert_eq!(
            err,
            TransportError::Network("HTTP 502: form submission failed".to_string())
        );
    }

    #[test]
    fn upload_message_precedence() {
        let err = upload_failure(&raw(
            422,
            r#"{"message":"Invalid","errors":{"file":["too large"]}}"#,
        ));
        assert_eq!(err.to_string(), "too large");

        let err = upload_failure(&raw(400, r#"{"message":"Invalid"}"#));
        assert_eq!(err.to_string(), "Invalid");

        let err = upload_failure(&raw(400, r#"{}"#));
        assert_eq!(err.to_string(), "file upload failed");
    }

    #[test]
    fn multipart_layout() {
        let upload = FileUpload::new("cv \"final\".pdf", "application/pdf", b"%PDF".to_vec());
        let body = multipart_body("B", "resume", &upload);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "--B\r\nContent-Disposition: form-data; name=\"field_id\"\r\n\r\nresume\r\n\
             --B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv 'final'.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF\r\n--B--\r\n"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let mut config = TransportConfig::new("http://127.0.0.1:1");
        config.timeout_secs = 2;
        let transport = HttpTransport::new(config);
        let err = transport
            .fetch_schema(&VersionId::from("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
