// Error taxonomy for the SGS client
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SgsError>;

/// Request-level failures surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum SgsError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("unknown series '{0}': not a numeric code nor a catalog alias")]
    UnknownSeries(String),

    #[error("series {code} not found upstream")]
    SeriesNotFound { code: u32 },

    #[error("upstream timed out for series {code} after {attempts} attempts")]
    UpstreamTimeout { code: u32, attempts: u32 },

    #[error("upstream server error {status} for series {code}")]
    UpstreamServerError { code: u32, status: u16 },

    #[error("upstream rejected request for series {code} ({status}): {message}")]
    UpstreamRejected {
        code: u32,
        status: u16,
        message: String,
    },

    #[error("transport failure for series {code}: {message}")]
    Transport { code: u32, message: String },

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl SgsError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// True for failures raised before any network call was attempted.
    pub fn is_invalid_parameters(&self) -> bool {
        matches!(self, Self::InvalidParameters(_) | Self::UnknownSeries(_))
    }
}

/// Outcome of a single upstream call, as reported by a `SeriesSource`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("no data")]
    NotFound,

    #[error("rate limited")]
    RateLimited,

    #[error("server error {0}")]
    Server(u16),

    #[error("timed out")]
    Timeout,

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("decode: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Transient faults worth another attempt. `NotFound` is a legitimate
    /// empty-data signal and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Server(_) | Self::Timeout | Self::Transport(_)
        )
    }

    /// Lift an exhausted interval failure into the request-level taxonomy.
    pub fn into_request_error(self, code: u32, attempts: u32) -> SgsError {
        match self {
            Self::NotFound => SgsError::SeriesNotFound { code },
            Self::Timeout => SgsError::UpstreamTimeout { code, attempts },
            Self::RateLimited => SgsError::UpstreamServerError { code, status: 429 },
            Self::Server(status) => SgsError::UpstreamServerError { code, status },
            Self::Rejected { status, body } => SgsError::UpstreamRejected {
                code,
                status,
                message: body,
            },
            Self::Transport(message) | Self::Decode(message) => {
                SgsError::Transport { code, message }
            }
        }
    }
}
