use crate::route::{RouteMetrics, RouteSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

/// Ingests simulated-response events from the inbound responder.
pub struct InboundCollector {
    total_requests: AtomicU64,
    routes: RwLock<HashMap<String, RouteMetrics>>,
    started_at: RwLock<Instant>,
}

impl Default for InboundCollector {
    fn default() -> Self {
        Self { total_requests: AtomicU64::new(0), routes: RwLock::new(HashMap::new()), started_at: RwLock::new(Instant::now()) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundSnapshot {
    pub total_requests: u64,
    pub uptime_secs: f64,
    pub routes: HashMap<String, RouteSnapshot>,
}

impl InboundCollector {
    pub fn record(&self, route_name: &str, status: u16, delay_ms: u64, at: chrono::DateTime<chrono::Utc>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        if let Some(metrics) = routes.get(route_name) {
            metrics.record(status, delay_ms, at);
            return;
        }
        drop(routes);
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        routes.entry(route_name.to_string()).or_default().record(status, delay_ms, at);
    }

    pub fn snapshot(&self) -> InboundSnapshot {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        InboundSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            uptime_secs: self.started_at.read().unwrap_or_else(|e| e.into_inner()).elapsed().as_secs_f64(),
            routes: routes.iter().map(|(k, v)| (k.clone(), v.snapshot())).collect(),
        }
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.routes.write().unwrap_or_else(|e| e.into_inner()).clear();
        *self.started_at.write().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_matches_sum_of_route_totals() {
        let collector = InboundCollector::default();
        let now = chrono::Utc::now();
        collector.record("r1", 200, 10, now);
        collector.record("r1", 500, 20, now);
        collector.record("r2", 200, 5, now);

        let snap = collector.snapshot();
        let route_total: u64 = snap.routes.values().map(|r| r.total_requests).sum();
        assert_eq!(route_total, snap.total_requests);
        assert_eq!(snap.total_requests, 3);
    }

    #[test]
    fn reset_clears_routes() {
        let collector = InboundCollector::default();
        collector.record("r1", 200, 10, chrono::Utc::now());
        collector.reset();
        let snap = collector.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert!(snap.routes.is_empty());
    }
}
