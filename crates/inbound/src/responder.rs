//! The inbound router and responder (§4.6): match a request to a
//! configured route, pick a weighted response, simulate the delay,
//! record the event, and build the echo payload.

use crate::types::{InboundOutcome, InboundRequest};
use moxapp_config::{ConfigStore, InboundRoute, ResponseSpec};
use moxapp_core::{Clock, RandomSource};
use moxapp_metrics::InboundCollector;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PREFIX: &str = "/sim";

pub struct InboundResponder {
    store: Arc<ConfigStore>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    metrics: Arc<InboundCollector>,
    prefix: String,
}

impl InboundResponder {
    pub fn new(store: Arc<ConfigStore>, random: Arc<dyn RandomSource>, clock: Arc<dyn Clock>, metrics: Arc<InboundCollector>) -> Self {
        Self { store, random, clock, metrics, prefix: DEFAULT_PREFIX.to_string() }
    }

    pub async fn handle(&self, req: InboundRequest) -> InboundOutcome {
        let suffix_path = req.path.strip_prefix(self.prefix.as_str()).unwrap_or(req.path.as_str());
        let suffix_path = if suffix_path.is_empty() { "/" } else { suffix_path };

        let Some((route, path_suffix)) = self.store.match_inbound_route(suffix_path, &req.method).await else {
            return InboundOutcome::not_found();
        };

        let response = pick_response(&route, self.random.as_ref());
        let delay_ms = self.random.uniform_range_u64(response.min_response_ms, response.max_response_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let now = self.clock.now_utc();
        self.metrics.record(&route.name, response.status, delay_ms, now);

        let echo = build_echo(&route, &path_suffix, &req, response.status, delay_ms, now);
        InboundOutcome { status: response.status, simulated_delay_ms: delay_ms, echo: Some(echo) }
    }
}

/// Draw `u` in `[0,1)` and return the first response whose running
/// share sum exceeds it, falling back to the last response if
/// rounding leaves none (per §4.6 step 3). Panics only if `responses`
/// is empty, which structural validation forbids.
fn pick_response(route: &InboundRoute, random: &dyn RandomSource) -> ResponseSpec {
    let u = random.uniform_unit();
    let mut running = 0.0;
    for response in &route.responses {
        running += response.share;
        if running > u {
            return *response;
        }
    }
    *route.responses.last().expect("inbound route must have at least one response")
}

fn redact_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            if k.eq_ignore_ascii_case("authorization") {
                (k.clone(), "[REDACTED]".to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

fn echo_body(body: &Option<String>) -> Option<Value> {
    let body = body.as_ref()?;
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(body.clone())),
    }
}

fn build_echo(
    route: &InboundRoute,
    path_suffix: &str,
    req: &InboundRequest,
    status: u16,
    delay_ms: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> Value {
    let mut request = json!({
        "method": req.method,
        "path": req.path,
        "path_suffix": path_suffix,
        "headers": redact_headers(&req.headers),
        "query": req.query,
        "remote": req.remote,
    });
    if let Some(body) = echo_body(&req.body) {
        request["body"] = body;
    }

    json!({
        "timestamp": now.to_rfc3339(),
        "route": { "name": route.name, "path": route.path },
        "request": request,
        "response": { "status": status, "simulated_delay_ms": delay_ms },
    })
}
