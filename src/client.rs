use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{PageliftError, Result, ServiceErrorKind};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    ContentFormat, JobKind, JobPayload, JobRequest, PdfOptions, ScrapeOptions, ScrapeResult,
    ScreenshotOptions,
};

/// Client for the Pagelift rendering & scraping service.
///
/// Holds read-only configuration and a shared transport, so one instance
/// serves any number of concurrent callers. Each operation is a single
/// request/response exchange: validate, submit, map. No retries, no
/// internal timeouts.
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
}

impl Client {
    /// Client with an explicit credential and the default endpoint.
    pub fn new(credential: &str) -> Result<Self> {
        Self::with_config(ClientConfig::resolve(Some(credential), None)?)
    }

    /// Client with the credential taken from `PAGELIFT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::resolve(None, None)?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.endpoint().clone())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Wire up a custom transport. This is the seam tests use to stub the
    /// remote collaborator.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels in-flight operations on this client. Cancelling
    /// drops (and thereby aborts) the outstanding exchange; the affected
    /// calls resolve to [`PageliftError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Render `url` to a PDF on the service's infrastructure.
    ///
    /// Resolves to the hosted PDF's URL.
    pub async fn render_pdf(&self, url: &str, opts: &PdfOptions) -> Result<String> {
        validate_url(url)?;
        let job = JobRequest::pdf(url, opts);
        let payload = self.submit(&job).await?;
        artifact_url(payload, job.kind)
    }

    /// Capture a screenshot of `url` (viewport, or the whole page with
    /// [`ScreenshotOptions::with_full_page`]).
    ///
    /// Resolves to the hosted image's URL.
    pub async fn screenshot(&self, url: &str, opts: &ScreenshotOptions) -> Result<String> {
        validate_url(url)?;
        let job = JobRequest::screenshot(url, opts);
        let payload = self.submit(&job).await?;
        artifact_url(payload, job.kind)
    }

    /// Scrape `url` into the requested content formats, plus the page's
    /// links and metadata, and optionally auxiliary PDF/screenshot
    /// artifacts.
    ///
    /// Partial extraction is a success: a requested format the service
    /// could not produce comes back as a `None` entry in the content map.
    /// The call only fails when the collaborator reports total failure or
    /// the transport errors.
    pub async fn scrape(&self, url: &str, opts: &ScrapeOptions) -> Result<ScrapeResult> {
        validate_url(url)?;
        let job = JobRequest::scrape(url, opts);
        let payload = self.submit(&job).await?;
        Ok(map_scrape_payload(opts, payload))
    }

    async fn submit(&self, job: &JobRequest) -> Result<JobPayload> {
        if self.cancel.is_cancelled() {
            return Err(PageliftError::Cancelled);
        }
        let start = Instant::now();
        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(PageliftError::Cancelled),
            res = self.transport.submit(job, self.config.credential()) => res,
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(kind = ?job.kind, url = %job.url, elapsed_ms, "job succeeded"),
            Err(e) => warn!(kind = ?job.kind, url = %job.url, elapsed_ms, error = %e, "job failed"),
        }
        result
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(PageliftError::validation("url", "must not be empty"));
    }
    Ok(())
}

fn artifact_url(payload: JobPayload, kind: JobKind) -> Result<String> {
    payload.artifact_url.ok_or_else(|| {
        PageliftError::service(
            ServiceErrorKind::Protocol,
            None,
            format!("{kind:?} payload carried no artifact_url"),
        )
    })
}

/// Map a collaborator payload onto the result contract.
///
/// The payload is never passed through as-is: unsolicited auxiliary
/// artifact URLs are stripped, and the content map is rebuilt around what
/// the caller asked for.
fn map_scrape_payload(opts: &ScrapeOptions, payload: JobPayload) -> ScrapeResult {
    let mut content: BTreeMap<ContentFormat, Option<String>> = BTreeMap::new();
    match &opts.formats {
        Some(formats) => {
            for f in formats {
                content.insert(*f, payload.content.get(f.tag()).cloned().flatten());
            }
        }
        None => {
            // Service default set: keep whatever recognized formats came back.
            for (tag, value) in &payload.content {
                if let Ok(f) = ContentFormat::from_tag(tag) {
                    content.insert(f, value.clone());
                }
            }
        }
    }

    ScrapeResult {
        content,
        links: payload.links,
        metadata: payload.metadata,
        pdf_url: if opts.include_pdf {
            payload.pdf_url
        } else {
            None
        },
        screenshot_url: if opts.include_screenshot {
            payload.screenshot_url
        } else {
            None
        },
    }
}
