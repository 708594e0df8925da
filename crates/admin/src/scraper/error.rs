use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("missing {field} on {url}; page starts: {snippet}")]
    MissingField {
        field: &'static str,
        url: String,
        snippet: String,
    },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl ScraperError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Http(_) => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Map a non-success response status to a typed error.
pub(crate) fn status_error(response: &reqwest::Response, url: &str) -> Option<ScraperError> {
    let status = response.status();
    if status.is_success() {
        return None;
    }

    Some(match status.as_u16() {
        429 => ScraperError::RateLimited {
            url: url.to_owned(),
            retry_after_secs: response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        },
        404 => ScraperError::NotFound {
            url: url.to_owned(),
        },
        code => ScraperError::UnexpectedStatus {
            status: code,
            url: url.to_owned(),
        },
    })
}
