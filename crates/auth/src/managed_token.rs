use chrono::{DateTime, Utc};

/// The token manager's per-name state (§3.1). Exclusively owned by
/// the token manager; updated atomically under the name's refresh
/// lock.
#[derive(Clone)]
pub struct ManagedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_at: DateTime<Utc>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub error_count: u32,
}

impl std::fmt::Debug for ManagedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("refresh_at", &self.refresh_at)
            .field("last_refresh", &self.last_refresh)
            .field("last_error", &self.last_error)
            .field("error_count", &self.error_count)
            .finish()
    }
}

impl ManagedToken {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_at
    }
}
