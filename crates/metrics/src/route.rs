use crate::ring_buffer::RingBuffer;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Per-route counters for the inbound responder (§4.7).
#[derive(Default)]
pub struct RouteMetrics {
    inner: Mutex<RouteInner>,
}

#[derive(Default)]
struct RouteInner {
    total_requests: u64,
    responses_by_status: HashMap<u16, u64>,
    delay_ms: RingBuffer,
    last_request_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSnapshot {
    pub total_requests: u64,
    pub responses_by_status: HashMap<u16, u64>,
    pub delay_avg_ms: f64,
    pub delay_p50_ms: f64,
    pub delay_p95_ms: f64,
    pub last_request_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl RouteMetrics {
    pub fn record(&self, status: u16, delay_ms: u64, at: chrono::DateTime<chrono::Utc>) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.total_requests += 1;
        *inner.responses_by_status.entry(status).or_insert(0) += 1;
        inner.delay_ms.add(delay_ms as f64);
        inner.last_request_at = Some(at);
    }

    pub fn snapshot(&self) -> RouteSnapshot {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        RouteSnapshot {
            total_requests: inner.total_requests,
            responses_by_status: inner.responses_by_status.clone(),
            delay_avg_ms: inner.delay_ms.average(),
            delay_p50_ms: inner.delay_ms.percentile(50.0),
            delay_p95_ms: inner.delay_ms.percentile(95.0),
            last_request_at: inner.last_request_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_by_status_sums_to_total() {
        let metrics = RouteMetrics::default();
        let now = chrono::Utc::now();
        metrics.record(200, 10, now);
        metrics.record(200, 12, now);
        metrics.record(500, 8, now);

        let snap = metrics.snapshot();
        let status_sum: u64 = snap.responses_by_status.values().sum();
        assert_eq!(status_sum, snap.total_requests);
        assert_eq!(snap.responses_by_status[&200], 2);
        assert_eq!(snap.responses_by_status[&500], 1);
    }
}
