//! The token manager (§4.4): acquisition, refresh-with-backoff, and
//! stale-token fallback.

use crate::error::AuthError;
use crate::managed_token::ManagedToken;
use crate::token_path::{extract_token, interpret_expires};
use chrono::{Duration as ChronoDuration, Utc};
use moxapp_config::AuthConfig;
use moxapp_core::{Clock, EnvSource, RandomSource, SystemRandom};
use moxapp_template::{evaluate, expand_value, TemplateContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

const REFRESH_DELAYS_SECS: [u64; 4] = [0, 1, 2, 3];
const BACKGROUND_INTERVAL: Duration = Duration::from_secs(30);

struct BackgroundWorker {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Owns the `AuthName -> ManagedToken` map, fetches and refreshes
/// tokens against configured token endpoints, and serves stale tokens
/// when a refresh attempt fails outright.
pub struct TokenManager {
    tokens: RwLock<HashMap<String, ManagedToken>>,
    auth_configs: RwLock<HashMap<String, AuthConfig>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    http: reqwest::Client,
    env: Arc<dyn EnvSource>,
    clock: Arc<dyn Clock>,
    background: Mutex<Option<BackgroundWorker>>,
    background_running: AtomicBool,
}

impl TokenManager {
    pub fn new(env: Arc<dyn EnvSource>, clock: Arc<dyn Clock>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("token manager http client builds");
        Self {
            tokens: RwLock::new(HashMap::new()),
            auth_configs: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
            http,
            env,
            clock,
            background: Mutex::new(None),
            background_running: AtomicBool::new(false),
        }
    }

    /// Replace the manager's snapshot of named auth configs. Called
    /// whenever the configuration store mutates auth configs.
    pub async fn update_auth_configs(&self, configs: HashMap<String, AuthConfig>) {
        *self.auth_configs.write().await = configs;
    }

    /// Fetch a usable token for `name`. If the auth config has no
    /// token endpoint, this is just an env-var lookup (empty string
    /// if unset).
    pub async fn get_token(&self, name: &str) -> Result<String, AuthError> {
        let config = self
            .auth_configs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownAuth(name.to_string()))?;

        if config.token_endpoint.is_none() {
            let value = config
                .env_var
                .as_deref()
                .and_then(|key| self.env.get(key))
                .unwrap_or_default();
            return Ok(value);
        }

        let now = self.clock.now_utc();
        if let Some(existing) = self.tokens.read().await.get(name) {
            if !existing.is_stale(now) {
                return Ok(existing.value.clone());
            }
        }

        self.refresh(name, &config).await
    }

    /// Manually seed a token, e.g. for tests or a bootstrap value.
    pub async fn set_token(&self, name: &str, value: String, ttl: Duration) {
        let now = self.clock.now_utc();
        let expires_at = now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::hours(1));
        let refresh_before = self
            .auth_configs
            .read()
            .await
            .get(name)
            .map(|c| c.refresh_before_expiry)
            .unwrap_or(60);
        let refresh_at = expires_at - ChronoDuration::seconds(refresh_before as i64);
        self.tokens.write().await.insert(
            name.to_string(),
            ManagedToken {
                value,
                expires_at,
                refresh_at,
                last_refresh: Some(now),
                last_error: None,
                error_count: 0,
            },
        );
    }

    /// Force a refresh regardless of the cached token's freshness.
    pub async fn force_refresh(&self, name: &str) -> Result<String, AuthError> {
        let config = self
            .auth_configs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownAuth(name.to_string()))?;
        self.refresh(name, &config).await
    }

    pub async fn get_token_status(&self, name: &str) -> Option<ManagedToken> {
        self.tokens.read().await.get(name).cloned()
    }

    /// Refresh `name`'s token under its per-name lock, re-checking
    /// freshness after acquiring it (another concurrent refresh may
    /// have just completed).
    async fn refresh(&self, name: &str, config: &AuthConfig) -> Result<String, AuthError> {
        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        let now = self.clock.now_utc();
        if let Some(existing) = self.tokens.read().await.get(name) {
            if !existing.is_stale(now) {
                return Ok(existing.value.clone());
            }
        }

        let token_endpoint = config
            .token_endpoint
            .as_ref()
            .ok_or_else(|| AuthError::NoTokenEndpoint(name.to_string()))?;

        let mut last_err: Option<AuthError> = None;
        for delay_secs in REFRESH_DELAYS_SECS {
            if delay_secs > 0 {
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
            match self.fetch_token(name, token_endpoint, config).await {
                Ok((value, expires_at)) => {
                    let now = self.clock.now_utc();
                    let refresh_at = expires_at - ChronoDuration::seconds(config.refresh_before_expiry as i64);
                    self.tokens.write().await.insert(
                        name.to_string(),
                        ManagedToken {
                            value: value.clone(),
                            expires_at,
                            refresh_at,
                            last_refresh: Some(now),
                            last_error: None,
                            error_count: 0,
                        },
                    );
                    return Ok(value);
                }
                Err(err) => last_err = Some(err),
            }
        }

        let failure = last_err.expect("at least one attempt ran");
        let mut tokens = self.tokens.write().await;
        if let Some(existing) = tokens.get_mut(name) {
            existing.error_count += 1;
            existing.last_error = Some(failure.to_string());
            tracing::warn!(auth = name, error = %failure, "token refresh failed, serving stale token");
            Ok(existing.value.clone())
        } else {
            Err(AuthError::NoPriorToken(name.to_string(), failure.to_string()))
        }
    }

    async fn fetch_token(
        &self,
        name: &str,
        endpoint: &moxapp_config::TokenEndpoint,
        config: &AuthConfig,
    ) -> Result<(String, chrono::DateTime<Utc>), AuthError> {
        let url = match (&endpoint.url, &endpoint.url_env) {
            (Some(url), _) => url.clone(),
            (None, Some(url_env)) => self.env.get(url_env).unwrap_or_default(),
            (None, None) => String::new(),
        };

        let random = SystemRandom;
        let ctx = TemplateContext { clock: self.clock.as_ref(), random: &random, env: self.env.as_ref() };
        let url = evaluate(&url, &ctx).map_err(|e| AuthError::Request(name.to_string(), e.to_string()))?;

        let method = reqwest::Method::from_bytes(endpoint.method.as_bytes())
            .unwrap_or(reqwest::Method::POST);
        let mut request = self.http.request(method, &url);

        for (key, value) in &endpoint.headers {
            let expanded = evaluate(value, &ctx).unwrap_or_else(|_| value.clone());
            request = request.header(key, expanded);
        }

        if let (Some(username_env), Some(password_env)) = (&config.username_env, &config.password_env) {
            let username = self.env.get(username_env).unwrap_or_default();
            let password = self.env.get(password_env).unwrap_or_default();
            request = request.basic_auth(username, Some(password));
        }

        if let Some(body) = &endpoint.body {
            let expanded = expand_value(body, &ctx).map_err(|e| AuthError::Request(name.to_string(), e.to_string()))?;
            request = request.json(&expanded);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Request(name.to_string(), e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidJson(name.to_string(), e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::BadStatus(name.to_string(), status.as_u16()));
        }

        let token = extract_token(&body, &endpoint.token_path)
            .ok_or_else(|| AuthError::MissingToken(name.to_string(), endpoint.token_path.clone()))?;
        let expires_at = interpret_expires(&body, endpoint.expires_path.as_deref(), self.clock.now_utc());

        Ok((token, expires_at))
    }

    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks.entry(name.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Start the single background refresh worker. A no-op if one is
    /// already running.
    pub async fn start_background_refresh(self: &Arc<Self>) {
        if self.background_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let cancel = CancellationToken::new();
        let cancel_child = cancel.clone();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(BACKGROUND_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel_child.cancelled() => break,
                    _ = interval.tick() => {
                        this.refresh_due_tokens().await;
                    }
                }
            }
        });
        *self.background.lock().await = Some(BackgroundWorker { cancel, handle });
    }

    pub async fn stop_background_refresh(&self) {
        let worker = self.background.lock().await.take();
        if let Some(worker) = worker {
            worker.cancel.cancel();
            let _ = worker.handle.await;
        }
        self.background_running.store(false, Ordering::SeqCst);
    }

    async fn refresh_due_tokens(&self) {
        let now = self.clock.now_utc();
        let due: Vec<(String, AuthConfig)> = {
            let configs = self.auth_configs.read().await;
            let tokens = self.tokens.read().await;
            configs
                .iter()
                .filter(|(_, c)| c.token_endpoint.is_some())
                .filter(|(name, _)| tokens.get(*name).map(|t| t.is_stale(now)).unwrap_or(true))
                .map(|(name, c)| (name.clone(), c.clone()))
                .collect()
        };
        for (name, config) in due {
            if let Err(err) = self.refresh(&name, &config).await {
                tracing::warn!(auth = %name, error = %err, "background token refresh failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxapp_core::{FakeEnv, SystemClock};
    use std::collections::HashMap as StdHashMap;

    fn manager() -> TokenManager {
        TokenManager::new(Arc::new(FakeEnv::new().with("API_KEY", "abc123")), Arc::new(SystemClock))
    }

    fn env_only_config(name: &str, env_var: &str) -> AuthConfig {
        AuthConfig {
            name: name.to_string(),
            auth_type: moxapp_config::AuthType::ApiKey,
            header_name: Some("X-API-Key".into()),
            query_param: None,
            env_var: Some(env_var.to_string()),
            username_env: None,
            password_env: None,
            token_endpoint: None,
            refresh_before_expiry: 60,
        }
    }

    #[tokio::test]
    async fn get_token_without_endpoint_reads_env_var() {
        let manager = manager();
        let mut configs = StdHashMap::new();
        configs.insert("svc".to_string(), env_only_config("svc", "API_KEY"));
        manager.update_auth_configs(configs).await;

        let token = manager.get_token("svc").await.unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn get_token_for_unknown_auth_errors() {
        let manager = manager();
        let err = manager.get_token("missing").await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownAuth(name) if name == "missing"));
    }

    #[tokio::test]
    async fn set_token_is_served_until_stale() {
        let manager = manager();
        let mut configs = StdHashMap::new();
        configs.insert(
            "svc".to_string(),
            AuthConfig {
                name: "svc".to_string(),
                auth_type: moxapp_config::AuthType::Bearer,
                header_name: None,
                query_param: None,
                env_var: None,
                username_env: None,
                password_env: None,
                token_endpoint: Some(moxapp_config::TokenEndpoint {
                    url: Some("https://auth.example.invalid/token".into()),
                    url_env: None,
                    method: "POST".into(),
                    headers: StdHashMap::new(),
                    body: None,
                    token_path: "access_token".into(),
                    expires_path: None,
                }),
                refresh_before_expiry: 60,
            },
        );
        manager.update_auth_configs(configs).await;

        manager.set_token("svc", "seeded-value".into(), Duration::from_secs(3600)).await;
        let token = manager.get_token("svc").await.unwrap();
        assert_eq!(token, "seeded-value");

        let status = manager.get_token_status("svc").await.unwrap();
        assert_eq!(status.error_count, 0);
    }

    #[tokio::test]
    async fn force_refresh_without_token_endpoint_errors() {
        let manager = manager();
        let mut configs = StdHashMap::new();
        configs.insert("svc".to_string(), env_only_config("svc", "API_KEY"));
        manager.update_auth_configs(configs).await;

        let err = manager.force_refresh("svc").await.unwrap_err();
        assert!(matches!(err, AuthError::NoTokenEndpoint(name) if name == "svc"));
    }

    #[tokio::test]
    async fn background_refresh_start_is_idempotent() {
        let manager = Arc::new(manager());
        manager.start_background_refresh().await;
        assert!(manager.background_running.load(Ordering::SeqCst));
        manager.start_background_refresh().await;
        assert!(manager.background.lock().await.is_some());

        manager.stop_background_refresh().await;
        assert!(!manager.background_running.load(Ordering::SeqCst));
        assert!(manager.background.lock().await.is_none());
    }
}
