use crate::ring_buffer::RingBuffer;
use serde::Serialize;
use std::sync::Mutex;

/// Per-endpoint counters and ring buffers, one mutex per entity
/// (§4.7), matching the granularity of the teacher's per-entity
/// locked structures.
#[derive(Default)]
pub struct EndpointMetrics {
    inner: Mutex<EndpointInner>,
}

#[derive(Default, Clone)]
struct EndpointInner {
    total_requests: u64,
    successful: u64,
    failed: u64,
    timeouts: u64,
    dns_errors: u64,
    connection_errors: u64,
    http_errors: u64,
    other_errors: u64,
    last_status: Option<u16>,
    last_error: Option<String>,
    response_times: RingBuffer,
    dns_times: RingBuffer,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointSnapshot {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub dns_errors: u64,
    pub connection_errors: u64,
    pub http_errors: u64,
    pub other_errors: u64,
    pub last_status: Option<u16>,
    pub last_error: Option<String>,
    pub response_time_avg_ms: f64,
    pub response_time_min_ms: f64,
    pub response_time_max_ms: f64,
    pub response_time_p50_ms: f64,
    pub response_time_p95_ms: f64,
    pub response_time_p99_ms: f64,
    pub dns_time_avg_ms: f64,
}

impl EndpointMetrics {
    pub fn record(&self, success: bool, status: Option<u16>, error_kind: Option<moxapp_core::ErrorKind>, error_msg: Option<&str>, total_ms: f64, dns_ms: Option<f64>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.total_requests += 1;
        if success {
            inner.successful += 1;
        } else {
            inner.failed += 1;
            match error_kind {
                Some(moxapp_core::ErrorKind::Timeout) => inner.timeouts += 1,
                Some(moxapp_core::ErrorKind::Dns) => inner.dns_errors += 1,
                Some(moxapp_core::ErrorKind::Connection) => inner.connection_errors += 1,
                Some(moxapp_core::ErrorKind::Http) => inner.http_errors += 1,
                _ => inner.other_errors += 1,
            }
        }
        inner.last_status = status;
        inner.last_error = error_msg.map(str::to_string);
        inner.response_times.add(total_ms);
        if let Some(dns) = dns_ms {
            inner.dns_times.add(dns);
        }
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        EndpointSnapshot {
            total_requests: inner.total_requests,
            successful: inner.successful,
            failed: inner.failed,
            timeouts: inner.timeouts,
            dns_errors: inner.dns_errors,
            connection_errors: inner.connection_errors,
            http_errors: inner.http_errors,
            other_errors: inner.other_errors,
            last_status: inner.last_status,
            last_error: inner.last_error.clone(),
            response_time_avg_ms: inner.response_times.average(),
            response_time_min_ms: inner.response_times.min(),
            response_time_max_ms: inner.response_times.max(),
            response_time_p50_ms: inner.response_times.percentile(50.0),
            response_time_p95_ms: inner.response_times.percentile(95.0),
            response_time_p99_ms: inner.response_times.percentile(99.0),
            dns_time_avg_ms: inner.dns_times.average(),
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = EndpointInner::default();
    }
}
