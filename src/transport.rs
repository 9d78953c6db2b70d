use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{PageliftError, Result, ServiceErrorKind};
use crate::types::{JobKind, JobPayload, JobRequest};

/// The collaborator seam: submit a job description, get back a success
/// payload or a service error. Everything about the wire (paths, headers,
/// serialization, credential placement) lives behind this trait, which is
/// also where tests plug in stubs.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    async fn submit(&self, job: &JobRequest, credential: &str) -> Result<JobPayload>;
}

/// Production transport: JSON POST per job, bearer credential.
pub struct HttpTransport {
    endpoint: Url,
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = HttpClient::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { endpoint, client })
    }

    fn job_url(&self, kind: JobKind) -> Result<Url> {
        let path = match kind {
            JobKind::Pdf => "v1/pdf",
            JobKind::Screenshot => "v1/screenshot",
            JobKind::Scrape => "v1/scrape",
        };
        self.endpoint.join(path).map_err(|e| {
            PageliftError::configuration(format!(
                "endpoint {} cannot address {path}: {e}",
                self.endpoint
            ))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http-json"
    }

    async fn submit(&self, job: &JobRequest, credential: &str) -> Result<JobPayload> {
        let url = self.job_url(job.kind)?;
        let resp = self
            .client
            .post(url)
            .bearer_auth(credential)
            .json(job)
            .send()
            .await?;

        let status = resp.status();
        debug!(kind = ?job.kind, status = status.as_u16(), "service answered");

        if status.is_success() {
            return resp.json::<JobPayload>().await.map_err(|e| {
                PageliftError::service(
                    ServiceErrorKind::Protocol,
                    Some(status.as_u16()),
                    format!("malformed success payload: {e}"),
                )
            });
        }

        let body = resp.text().await.unwrap_or_default();
        Err(PageliftError::service(
            classify_status(status),
            Some(status.as_u16()),
            error_message(&body, status),
        ))
    }
}

fn classify_status(status: StatusCode) -> ServiceErrorKind {
    match status.as_u16() {
        429 => ServiceErrorKind::RateLimited,
        401 | 403 => ServiceErrorKind::AuthRejected,
        400 | 404 | 410 | 422 => ServiceErrorKind::Unrenderable,
        s if s >= 500 => ServiceErrorKind::Outage,
        _ => ServiceErrorKind::Protocol,
    }
}

/// Error bodies are `{"error": "..."}` when the service is healthy enough
/// to say so; anything else falls back to the status line.
#[derive(Deserialize)]
struct WireError {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(wire) = serde_json::from_str::<WireError>(body) {
        if let Some(msg) = wire.error.or(wire.message).filter(|m| !m.is_empty()) {
            return msg;
        }
    }
    format!("HTTP status {status}")
}
