//! The outcome record produced by every outgoing request.

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of one dispatched outgoing request, as recorded by the
/// instrumented HTTP client and consumed by the outgoing metrics
/// collector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestResult {
    /// Name of the `OutgoingEndpoint` this request was dispatched for.
    pub endpoint_name: String,

    /// The fully expanded URL that was requested.
    pub url: String,

    /// The HTTP method used.
    pub method: String,

    /// The HTTP status code, if a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Whether the request is considered successful (2xx/3xx status
    /// and no transport-level failure).
    pub success: bool,

    /// Classification of the failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Human-readable failure detail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    /// Total wall-clock duration of the request, in fractional
    /// milliseconds.
    pub total_ms: f64,

    /// DNS resolution duration, in fractional milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_ms: Option<f64>,

    /// TCP connect duration, in fractional milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_ms: Option<f64>,

    /// TLS handshake duration, in fractional milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ms: Option<f64>,

    /// Time to first byte, in fractional milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<f64>,

    /// The hostname the request was sent to, used for per-domain DNS
    /// statistics.
    pub hostname: String,

    /// Size of the response body, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size: Option<u64>,

    /// When the request was dispatched.
    pub timestamp: DateTime<Utc>,
}
