use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{PageliftError, Result};

/// Content representations the scrape operation can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// Raw page HTML as fetched.
    Html,
    /// Readability-extracted article text.
    Readability,
    /// HTML with boilerplate stripped.
    CleanedHtml,
    /// Markdown rendition of the page.
    Markdown,
}

impl ContentFormat {
    pub const ALL: [ContentFormat; 4] = [
        ContentFormat::Html,
        ContentFormat::Readability,
        ContentFormat::CleanedHtml,
        ContentFormat::Markdown,
    ];

    /// Wire tag for this format (also the key in scrape payloads).
    pub fn tag(&self) -> &'static str {
        match self {
            ContentFormat::Html => "html",
            ContentFormat::Readability => "readability",
            ContentFormat::CleanedHtml => "cleaned_html",
            ContentFormat::Markdown => "markdown",
        }
    }

    /// Parse a caller-supplied tag. Unrecognized tags are a validation
    /// error, reported before anything is sent to the service.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "html" => Ok(ContentFormat::Html),
            "readability" => Ok(ContentFormat::Readability),
            "cleaned_html" => Ok(ContentFormat::CleanedHtml),
            "markdown" => Ok(ContentFormat::Markdown),
            other => Err(PageliftError::validation(
                "formats",
                format!("unrecognized content format tag: {other}"),
            )),
        }
    }
}

/* ------------ per-operation options ------------ */

/// Options for [`Client::render_pdf`](crate::Client::render_pdf).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfOptions {
    /// Milliseconds the service waits after load before rendering.
    pub delay_ms: Option<u64>,
    /// Route the fetch through a residential proxy.
    pub use_proxy: bool,
}

impl PdfOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }
    pub fn with_proxy(mut self, on: bool) -> Self {
        self.use_proxy = on;
        self
    }
}

/// Options for [`Client::screenshot`](crate::Client::screenshot).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenshotOptions {
    pub delay_ms: Option<u64>,
    pub use_proxy: bool,
    /// Capture the whole scrollable page instead of the viewport.
    pub full_page: bool,
}

impl ScreenshotOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }
    pub fn with_proxy(mut self, on: bool) -> Self {
        self.use_proxy = on;
        self
    }
    pub fn with_full_page(mut self, on: bool) -> Self {
        self.full_page = on;
        self
    }
}

/// Options for [`Client::scrape`](crate::Client::scrape).
///
/// `formats: None` means the service decides which formats to return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeOptions {
    pub delay_ms: Option<u64>,
    pub use_proxy: bool,
    pub formats: Option<Vec<ContentFormat>>,
    /// Ask for a hosted PDF alongside the content.
    pub include_pdf: bool,
    /// Ask for a hosted screenshot alongside the content.
    pub include_screenshot: bool,
}

impl ScrapeOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }
    pub fn with_proxy(mut self, on: bool) -> Self {
        self.use_proxy = on;
        self
    }
    pub fn with_formats(mut self, formats: impl IntoIterator<Item = ContentFormat>) -> Self {
        self.formats = Some(formats.into_iter().collect());
        self
    }
    /// String-tag variant of [`with_formats`](Self::with_formats); fails on
    /// an unrecognized tag.
    pub fn with_format_tags<'a>(
        mut self,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let formats = tags
            .into_iter()
            .map(ContentFormat::from_tag)
            .collect::<Result<Vec<_>>>()?;
        self.formats = Some(formats);
        Ok(self)
    }
    pub fn with_pdf(mut self, on: bool) -> Self {
        self.include_pdf = on;
        self
    }
    pub fn with_screenshot(mut self, on: bool) -> Self {
        self.include_screenshot = on;
        self
    }
}

/* ------------ job description (request side of the seam) ------------ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Pdf,
    Screenshot,
    Scrape,
}

/// The structured request handed to the remote collaborator. One of these
/// is built per call, after validation; fields that do not apply to the
/// operation stay off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRequest {
    pub kind: JobKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    pub use_proxy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_page: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<ContentFormat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_pdf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_screenshot: Option<bool>,
}

impl JobRequest {
    pub fn pdf(url: &str, opts: &PdfOptions) -> Self {
        Self {
            kind: JobKind::Pdf,
            url: url.to_string(),
            delay_ms: opts.delay_ms,
            use_proxy: opts.use_proxy,
            full_page: None,
            formats: None,
            include_pdf: None,
            include_screenshot: None,
        }
    }

    pub fn screenshot(url: &str, opts: &ScreenshotOptions) -> Self {
        Self {
            kind: JobKind::Screenshot,
            url: url.to_string(),
            delay_ms: opts.delay_ms,
            use_proxy: opts.use_proxy,
            full_page: Some(opts.full_page),
            formats: None,
            include_pdf: None,
            include_screenshot: None,
        }
    }

    pub fn scrape(url: &str, opts: &ScrapeOptions) -> Self {
        Self {
            kind: JobKind::Scrape,
            url: url.to_string(),
            delay_ms: opts.delay_ms,
            use_proxy: opts.use_proxy,
            full_page: None,
            formats: opts.formats.clone(),
            include_pdf: Some(opts.include_pdf),
            include_screenshot: Some(opts.include_screenshot),
        }
    }
}

/* ------------ collaborator payload (response side of the seam) ------------ */

/// Success payload from the collaborator, before any invariant
/// enforcement. Artifact operations fill `artifact_url`; scrape jobs fill
/// the rest. Every field defaults so sparse payloads deserialize cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(default)]
    pub artifact_url: Option<String>,
    #[serde(default)]
    pub content: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetaValue>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
}

/// One link from the scraped document: a bag of string attributes
/// (`href`, `text`, `rel`, ...). Records keep document order; duplicates
/// are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkRecord(pub BTreeMap<String, String>);

impl LinkRecord {
    pub fn href(&self) -> Option<&str> {
        self.0.get("href").map(|s| s.as_str())
    }
    pub fn text(&self) -> Option<&str> {
        self.0.get("text").map(|s| s.as_str())
    }
}

/// One metadata entry. Pages carry mixed-type metadata (title, status
/// code, crawl time), so each value is tagged rather than stringly typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Text(String),
    Absent,
}

/// What a scrape call resolves to, after the mapping boundary has
/// enforced the request/result invariants:
///
/// - `content` holds exactly the requested formats (service defaults when
///   none were requested); a format the service failed to extract is a
///   `None` entry, not a missing key.
/// - `pdf_url` / `screenshot_url` are only populated when the originating
///   request asked for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub content: BTreeMap<ContentFormat, Option<String>>,
    pub links: Vec<LinkRecord>,
    pub metadata: BTreeMap<String, MetaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_tags_round_trip() {
        for f in ContentFormat::ALL {
            assert_eq!(ContentFormat::from_tag(f.tag()).unwrap(), f);
        }
    }

    #[test]
    fn unrecognized_tag_is_validation_error() {
        let err = ContentFormat::from_tag("bogus").unwrap_err();
        assert!(matches!(err, PageliftError::Validation { .. }));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn format_tags_builder_rejects_bad_tag() {
        let err = ScrapeOptions::new()
            .with_format_tags(["markdown", "bogus"])
            .unwrap_err();
        assert!(matches!(err, PageliftError::Validation { .. }));
    }

    #[test]
    fn pdf_job_keeps_scrape_fields_off_the_wire() {
        let job = JobRequest::pdf("https://example.com", &PdfOptions::new().with_delay_ms(250));
        let wire = serde_json::to_value(&job).unwrap();
        assert_eq!(
            wire,
            json!({
                "kind": "pdf",
                "url": "https://example.com",
                "delay_ms": 250,
                "use_proxy": false,
            })
        );
    }

    #[test]
    fn screenshot_job_carries_full_page() {
        let job = JobRequest::screenshot(
            "https://example.com",
            &ScreenshotOptions::new().with_full_page(true).with_proxy(true),
        );
        let wire = serde_json::to_value(&job).unwrap();
        assert_eq!(
            wire,
            json!({
                "kind": "screenshot",
                "url": "https://example.com",
                "use_proxy": true,
                "full_page": true,
            })
        );
    }

    #[test]
    fn scrape_job_serializes_formats_as_tags() {
        let job = JobRequest::scrape(
            "https://example.com",
            &ScrapeOptions::new()
                .with_formats([ContentFormat::Markdown, ContentFormat::CleanedHtml])
                .with_pdf(true),
        );
        let wire = serde_json::to_value(&job).unwrap();
        assert_eq!(
            wire,
            json!({
                "kind": "scrape",
                "url": "https://example.com",
                "use_proxy": false,
                "formats": ["markdown", "cleaned_html"],
                "include_pdf": true,
                "include_screenshot": false,
            })
        );
    }

    #[test]
    fn meta_value_deserializes_mixed_types() {
        let payload: BTreeMap<String, MetaValue> = serde_json::from_value(json!({
            "title": "Example Domain",
            "status_code": 200,
            "crawled_at": "2024-05-02T09:30:00Z",
            "author": null,
        }))
        .unwrap();

        assert_eq!(
            payload.get("title"),
            Some(&MetaValue::Text("Example Domain".into()))
        );
        assert_eq!(payload.get("status_code"), Some(&MetaValue::Integer(200)));
        assert!(matches!(
            payload.get("crawled_at"),
            Some(MetaValue::Timestamp(_))
        ));
        assert_eq!(payload.get("author"), Some(&MetaValue::Absent));
    }

    #[test]
    fn link_record_accessors() {
        let link: LinkRecord = serde_json::from_value(json!({
            "href": "/about",
            "text": "About us",
        }))
        .unwrap();
        assert_eq!(link.href(), Some("/about"));
        assert_eq!(link.text(), Some("About us"));
        assert_eq!(link.0.get("rel"), None);
    }

    #[test]
    fn sparse_payload_deserializes_with_defaults() {
        let payload: JobPayload =
            serde_json::from_value(json!({ "artifact_url": "https://cdn.pagelift.dev/a.pdf" }))
                .unwrap();
        assert_eq!(
            payload.artifact_url.as_deref(),
            Some("https://cdn.pagelift.dev/a.pdf")
        );
        assert!(payload.content.is_empty());
        assert!(payload.links.is_empty());
        assert!(payload.pdf_url.is_none());
    }
}
