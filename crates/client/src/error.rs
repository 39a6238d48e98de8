use moxapp_core::ErrorKind;

/// Classified failure from a single `execute` attempt. Every variant
/// maps onto exactly one `ErrorKind` for `RequestResult`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("template expansion failed: {0}")]
    Template(String),

    #[error("failed to serialize request body: {0}")]
    Marshal(String),

    #[error("auth application failed: {0}")]
    Auth(String),

    #[error("dns resolution failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request failed: {0}")]
    Unknown(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Template(_) => ErrorKind::Template,
            ClientError::Marshal(_) => ErrorKind::Marshal,
            ClientError::Auth(_) => ErrorKind::Auth,
            ClientError::Dns(_) => ErrorKind::Dns,
            ClientError::Connection(_) => ErrorKind::Connection,
            ClientError::Tls(_) => ErrorKind::Tls,
            ClientError::Timeout(_) => ErrorKind::Timeout,
            ClientError::Cancelled => ErrorKind::Cancelled,
            ClientError::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Classify a low-level reqwest/IO error message into an `error_kind`
/// by pattern-matching its text, per the ordered rules in §4.3.
pub fn classify_text(text: &str) -> ClientError {
    let lower = text.to_lowercase();

    if lower.contains("no such host")
        || lower.contains("lookup")
        || lower.contains("dns")
        || lower.contains("getaddrinfo")
        || lower.contains("name resolution")
    {
        return ClientError::Dns(text.to_string());
    }

    if lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("no route to host")
        || lower.contains("network unreachable")
        || lower.contains("dial tcp")
    {
        return ClientError::Connection(text.to_string());
    }

    if lower.contains("tls") || lower.contains("certificate") || lower.contains("x509") {
        return ClientError::Tls(text.to_string());
    }

    if lower.contains("timeout") || lower.contains("deadline") {
        return ClientError::Timeout(text.to_string());
    }

    ClientError::Unknown(text.to_string())
}
