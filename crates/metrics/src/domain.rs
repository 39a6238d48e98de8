use serde::Serialize;
use std::sync::Mutex;

/// Per-hostname DNS success/failure counters (§4.7).
#[derive(Default)]
pub struct DomainMetrics {
    inner: Mutex<DomainInner>,
}

#[derive(Default, Clone, Serialize)]
struct DomainInner {
    dns_successes: u64,
    dns_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainSnapshot {
    pub dns_successes: u64,
    pub dns_failures: u64,
}

impl DomainMetrics {
    pub fn record_success(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).dns_successes += 1;
    }

    pub fn record_failure(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).dns_failures += 1;
    }

    pub fn snapshot(&self) -> DomainSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        DomainSnapshot { dns_successes: inner.dns_successes, dns_failures: inner.dns_failures }
    }
}

/// Decide whether a `RequestResult` produces a domain DNS record at
/// all, and if so whether it's a success or failure, per §4.7: success
/// if `hostname` is non-empty, `dns_time > 0`, and `error_kind !=
/// dns`; failure only if `error_kind == dns`; otherwise no record.
pub fn classify_dns_outcome(
    hostname: &str,
    dns_ms: Option<f64>,
    error_kind: Option<moxapp_core::ErrorKind>,
) -> Option<bool> {
    if hostname.is_empty() {
        return None;
    }
    if error_kind == Some(moxapp_core::ErrorKind::Dns) {
        return Some(false);
    }
    if dns_ms.is_some_and(|v| v > 0.0) {
        return Some(true);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_requires_positive_dns_time_and_non_dns_error() {
        assert_eq!(classify_dns_outcome("example.com", Some(1.5), None), Some(true));
    }

    #[test]
    fn dns_error_is_always_failure() {
        assert_eq!(classify_dns_outcome("example.com", Some(0.0), Some(moxapp_core::ErrorKind::Dns)), Some(false));
    }

    #[test]
    fn empty_hostname_yields_no_record() {
        assert_eq!(classify_dns_outcome("", Some(1.0), None), None);
    }

    #[test]
    fn zero_dns_time_without_dns_error_yields_no_record() {
        assert_eq!(classify_dns_outcome("example.com", Some(0.0), None), None);
        assert_eq!(classify_dns_outcome("example.com", None, None), None);
    }
}
