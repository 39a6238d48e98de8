//! The shared error taxonomy.
//!
//! `ErrorKind` is a closed enum rather than a bare string so that
//! metrics bucketing can match on a fixed set of variants. Its
//! `Display` impl produces exactly the lowercase string values used
//! on the wire (in `RequestResult::error_kind` and the inbound echo
//! payload).

use std::fmt;

/// Classification of a failed outgoing request or an internal
/// failure, shared between the client, the token manager, and the
/// template evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Template,
    Marshal,
    Request,
    Auth,
    Dns,
    Connection,
    Tls,
    Timeout,
    Cancelled,
    Http,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Template => "template",
            ErrorKind::Marshal => "marshal",
            ErrorKind::Request => "request",
            ErrorKind::Auth => "auth",
            ErrorKind::Dns => "dns",
            ErrorKind::Connection => "connection",
            ErrorKind::Tls => "tls",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Http => "http",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ErrorKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "template" => Ok(ErrorKind::Template),
            "marshal" => Ok(ErrorKind::Marshal),
            "request" => Ok(ErrorKind::Request),
            "auth" => Ok(ErrorKind::Auth),
            "dns" => Ok(ErrorKind::Dns),
            "connection" => Ok(ErrorKind::Connection),
            "tls" => Ok(ErrorKind::Tls),
            "timeout" => Ok(ErrorKind::Timeout),
            "cancelled" => Ok(ErrorKind::Cancelled),
            "http" => Ok(ErrorKind::Http),
            _ => Ok(ErrorKind::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_strings() {
        assert_eq!(ErrorKind::Template.to_string(), "template");
        assert_eq!(ErrorKind::Marshal.to_string(), "marshal");
        assert_eq!(ErrorKind::Request.to_string(), "request");
        assert_eq!(ErrorKind::Auth.to_string(), "auth");
        assert_eq!(ErrorKind::Dns.to_string(), "dns");
        assert_eq!(ErrorKind::Connection.to_string(), "connection");
        assert_eq!(ErrorKind::Tls.to_string(), "tls");
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
        assert_eq!(ErrorKind::Cancelled.to_string(), "cancelled");
        assert_eq!(ErrorKind::Http.to_string(), "http");
        assert_eq!(ErrorKind::Unknown.to_string(), "unknown");
    }
}
