//! Download requests, their results, and the downloader interface
//!
//! A `Request` is owned by exactly one place at a time: the batch handed to the
//! crawler, a host queue, the downloader, and finally its own callback.

use std::borrow::Cow;
use std::fmt;

/// Callback receiving the outcome of a download, invoked exactly once
pub type ResultCallback = Box<dyn FnOnce(DownloadResult) + Send + 'static>;

/// A URL to download together with the callback that consumes the result
pub struct Request {
    /// The URL to fetch
    pub url: String,

    /// Caller-assigned tag, carried through to the result untouched
    pub id: i64,

    /// Receives the download result, possibly on another thread
    pub callback: ResultCallback,
}

impl Request {
    /// Creates a new request
    pub fn new(
        url: impl Into<String>,
        id: i64,
        callback: impl FnOnce(DownloadResult) + Send + 'static,
    ) -> Self {
        Self {
            url: url.into(),
            id,
            callback: Box::new(callback),
        }
    }

    /// Invokes the callback with the given result, consuming the request
    pub fn complete(self, result: DownloadResult) {
        (self.callback)(result)
    }

    /// Builds a failed result addressed to this request
    pub fn failure(&self, error_message: impl Into<String>) -> DownloadResult {
        DownloadResult::failed(self.url.clone(), self.id, error_message)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A request that passed URL validation, tagged with its scheme and host
#[derive(Debug)]
pub struct PreparedRequest {
    pub(crate) request: Request,
    pub(crate) scheme: String,
    pub(crate) host: String,
}

impl PreparedRequest {
    pub(crate) fn new(request: Request, scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            request,
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// The URL of the wrapped request
    pub fn url(&self) -> &str {
        &self.request.url
    }

    /// The scheme the URL was parsed with
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host the URL was parsed with
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Unwraps the caller's request
    pub fn into_request(self) -> Request {
        self.request
    }
}

/// Media type announced by a response's `Content-Type` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaType {
    /// Top-level type, e.g. `text`
    pub kind: String,

    /// Subtype, e.g. `html`
    pub subtype: String,

    /// The `charset` parameter, empty if absent
    pub charset: String,
}

impl MediaType {
    /// Parses a `Content-Type` header value
    ///
    /// Returns `None` when the value has no `type/subtype` part.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_crawl::MediaType;
    ///
    /// let media = MediaType::parse("text/html; charset=\"UTF-8\"").unwrap();
    /// assert_eq!(media.kind, "text");
    /// assert_eq!(media.subtype, "html");
    /// assert_eq!(media.charset, "UTF-8");
    /// ```
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let essence = parts.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let charset = parts
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .unwrap_or_default();

        Some(Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            charset,
        })
    }

    /// Case-insensitive comparison against a `type/subtype` string
    pub fn matches(&self, essence: &str) -> bool {
        match essence.split_once('/') {
            Some((kind, subtype)) => {
                self.kind.eq_ignore_ascii_case(kind) && self.subtype.eq_ignore_ascii_case(subtype)
            }
            None => false,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        if !self.charset.is_empty() {
            write!(f, "; charset={}", self.charset)?;
        }
        Ok(())
    }
}

/// Outcome of a single download
///
/// Deliberately not `Clone`: the content can be large and is moved from the
/// downloader into the request's callback.
#[derive(Debug, Default)]
pub struct DownloadResult {
    /// The requested URL
    pub url: String,

    /// The tag of the originating request
    pub id: i64,

    /// Response body, empty on failure
    pub content: Vec<u8>,

    /// Media type reported by the server
    pub media_type: MediaType,

    /// Whether the download completed and passed all checks
    pub success: bool,

    /// Why the download failed, empty on success
    pub error_message: String,

    /// Observed transfer rate in bytes per second
    pub download_speed: f64,
}

impl DownloadResult {
    /// Builds a failed result
    pub fn failed(url: impl Into<String>, id: i64, error_message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id,
            error_message: error_message.into(),
            ..Default::default()
        }
    }

    /// Builds a successful result
    pub fn succeeded(
        url: impl Into<String>,
        id: i64,
        content: Vec<u8>,
        media_type: MediaType,
        download_speed: f64,
    ) -> Self {
        Self {
            url: url.into(),
            id,
            content,
            media_type,
            success: true,
            error_message: String::new(),
            download_speed,
        }
    }

    /// The content decoded as UTF-8, with invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Url: ({},{}) mediaType: {} success: {}",
            self.url, self.id, self.media_type, self.success
        )?;
        if !self.success {
            write!(f, " error: {}", self.error_message)?;
        }
        Ok(())
    }
}

/// The component performing the actual transfers
///
/// `download` only initiates the transfer and must not block. The request's
/// callback is invoked exactly once, later, possibly on another thread.
/// Dropping a downloader aborts outstanding transfers without invoking the
/// callbacks of downloads that did not finish.
pub trait Downloader: Send + Sync {
    fn download(&self, request: Request);
}
