use thiserror::Error;

/// Longest body excerpt carried in an error message.
pub const BODY_EXCERPT_LEN: usize = 300;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{method} {path}: transport error: {source}")]
    Transport {
        method: String,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {path}: expected status {expected}, got {actual}: {body}")]
    Status {
        method: String,
        path: String,
        expected: u16,
        actual: u16,
        body: String,
    },
    #[error("{path}: cannot decode response: {message}")]
    Decode {
        path: String,
        message: String,
    },
    #[error("shape violation: {0}")]
    Shape(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ProbeError {
    /// Errors worth retrying: network failures and gateway statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            Self::Status { actual, .. } => matches!(actual, 502..=504),
            _ => false,
        }
    }
}

pub fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let mut out: String = text.chars().take(BODY_EXCERPT_LEN).collect();
    if text.chars().count() > BODY_EXCERPT_LEN {
        out.push_str("...");
    }
    out
}
