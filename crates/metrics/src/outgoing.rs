use crate::domain::{classify_dns_outcome, DomainMetrics, DomainSnapshot};
use crate::endpoint::{EndpointMetrics, EndpointSnapshot};
use moxapp_core::RequestResult;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Ingests `RequestResult`s from the outgoing scheduler and produces
/// global, per-endpoint, and per-domain snapshots.
pub struct OutgoingCollector {
    total_requests: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    endpoints: RwLock<HashMap<String, EndpointMetrics>>,
    domains: RwLock<HashMap<String, DomainMetrics>>,
    started_at: RwLock<Instant>,
}

impl Default for OutgoingCollector {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            endpoints: RwLock::new(HashMap::new()),
            domains: RwLock::new(HashMap::new()),
            started_at: RwLock::new(Instant::now()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingSnapshot {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub uptime_secs: f64,
    pub endpoints: HashMap<String, EndpointSnapshot>,
    pub domains: HashMap<String, DomainSnapshot>,
}

impl OutgoingCollector {
    pub fn record(&self, result: &RequestResult) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if result.success {
            self.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        {
            let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
            if let Some(metrics) = endpoints.get(&result.endpoint_name) {
                metrics.record(result.success, result.status, result.error_kind, result.error_msg.as_deref(), result.total_ms, result.dns_ms);
            } else {
                drop(endpoints);
                let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
                let metrics = endpoints.entry(result.endpoint_name.clone()).or_default();
                metrics.record(result.success, result.status, result.error_kind, result.error_msg.as_deref(), result.total_ms, result.dns_ms);
            }
        }

        if let Some(dns_success) = classify_dns_outcome(&result.hostname, result.dns_ms, result.error_kind) {
            let domains = self.domains.read().unwrap_or_else(|e| e.into_inner());
            if let Some(metrics) = domains.get(&result.hostname) {
                record_dns(metrics, dns_success);
            } else {
                drop(domains);
                let mut domains = self.domains.write().unwrap_or_else(|e| e.into_inner());
                let metrics = domains.entry(result.hostname.clone()).or_default();
                record_dns(metrics, dns_success);
            }
        }
    }

    pub fn snapshot(&self) -> OutgoingSnapshot {
        let endpoints = self.endpoints.read().unwrap_or_else(|e| e.into_inner());
        let domains = self.domains.read().unwrap_or_else(|e| e.into_inner());
        OutgoingSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            uptime_secs: self.started_at.read().unwrap_or_else(|e| e.into_inner()).elapsed().as_secs_f64(),
            endpoints: endpoints.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect(),
            domains: domains.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect(),
        }
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.endpoints.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.domains.write().unwrap_or_else(|e| e.into_inner()).clear();
        *self.started_at.write().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }
}

fn record_dns(metrics: &DomainMetrics, success: bool) {
    if success {
        metrics.record_success();
    } else {
        metrics.record_failure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxapp_core::ErrorKind;

    fn result(name: &str, success: bool, error_kind: Option<ErrorKind>, hostname: &str, dns_ms: Option<f64>) -> RequestResult {
        RequestResult {
            endpoint_name: name.into(),
            url: "https://example.com".into(),
            method: "GET".into(),
            status: if success { Some(200) } else { None },
            success,
            error_kind,
            error_msg: None,
            total_ms: 10.0,
            dns_ms,
            connect_ms: Some(0.0),
            tls_ms: Some(0.0),
            ttfb_ms: Some(5.0),
            hostname: hostname.into(),
            response_size: Some(128),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn global_successful_and_failed_sum_to_total() {
        let collector = OutgoingCollector::default();
        collector.record(&result("e1", true, None, "example.com", Some(1.0)));
        collector.record(&result("e1", false, Some(ErrorKind::Timeout), "example.com", None));

        let snap = collector.snapshot();
        assert_eq!(snap.successful + snap.failed, snap.total_requests);
        assert_eq!(snap.endpoints["e1"].total_requests, 2);
    }

    #[test]
    fn dns_failure_only_recorded_for_dns_error_kind() {
        let collector = OutgoingCollector::default();
        collector.record(&result("e1", false, Some(ErrorKind::Dns), "bad.invalid", None));
        collector.record(&result("e1", false, Some(ErrorKind::Http), "bad.invalid", Some(2.0)));

        let snap = collector.snapshot();
        let domain = &snap.domains["bad.invalid"];
        assert_eq!(domain.dns_failures, 1);
        assert_eq!(domain.dns_successes, 1);
    }

    #[test]
    fn reset_clears_everything_and_restarts_uptime() {
        let collector = OutgoingCollector::default();
        collector.record(&result("e1", true, None, "example.com", Some(1.0)));
        collector.reset();
        let snap = collector.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert!(snap.endpoints.is_empty());
    }
}
