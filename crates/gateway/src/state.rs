use moxapp_auth::TokenManager;
use moxapp_config::ConfigStore;
use moxapp_inbound::InboundResponder;
use moxapp_metrics::{InboundCollector, OutgoingCollector};
use moxapp_scheduler::OutgoingScheduler;
use std::sync::Arc;

/// Everything the management API and `/sim` adapter read from or act
/// on. Every field is already its own concurrency-safe type; the
/// gateway never adds locking of its own.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub auth: Arc<TokenManager>,
    pub scheduler: Arc<OutgoingScheduler>,
    pub inbound: Arc<InboundResponder>,
    pub outgoing_metrics: Arc<OutgoingCollector>,
    pub inbound_metrics: Arc<InboundCollector>,
}
