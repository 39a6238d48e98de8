//! The instrumented outgoing HTTP client (§4.3).

use crate::error::{classify_text, ClientError};
use crate::timing::TimingCapture;
use moxapp_auth::TokenManager;
use moxapp_config::{AuthConfig, AuthType, OutgoingEndpoint};
use moxapp_core::{Clock, EnvSource, RandomSource, RequestResult};
use moxapp_template::{evaluate, expand_value, TemplateContext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const USER_AGENT: &str = "moxapp/1.0";

/// Builds the shared `reqwest::Client` and executes one
/// template-expanded, authenticated, timed request per call.
pub struct HttpClient {
    http: reqwest::Client,
    env: Arc<dyn EnvSource>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    auth: Arc<TokenManager>,
}

impl HttpClient {
    /// `concurrent_requests` sizes the idle connection pool at
    /// `max(concurrent_requests, 1) * 2`, per §4.3.
    pub fn new(
        concurrent_requests: u32,
        env: Arc<dyn EnvSource>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        auth: Arc<TokenManager>,
    ) -> Self {
        let pool_cap = (concurrent_requests.max(1) as usize) * 2;
        // HTTP/2 is attempted automatically via ALPN over TLS; no
        // prior-knowledge flag is set since most outgoing targets are
        // plain HTTP/1.1 or TLS-negotiated.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(pool_cap)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client builds with these settings");
        Self { http, env, clock, random, auth }
    }

    /// Execute one outgoing request. Never returns an error: every
    /// failure mode is captured in the returned `RequestResult`.
    pub async fn execute(
        &self,
        endpoint: &OutgoingEndpoint,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> RequestResult {
        let timing = TimingCapture::start();
        let timestamp = self.clock.now_utc();
        let ctx = TemplateContext { clock: self.clock.as_ref(), random: self.random.as_ref(), env: self.env.as_ref() };

        let work = self.run(endpoint, &ctx, &timing);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.failure_result_with_hostname(endpoint, &timing, timestamp, ClientError::Cancelled, String::new())
            }
            _ = tokio::time::sleep(timeout) => {
                self.failure_result_with_hostname(endpoint, &timing, timestamp, ClientError::Timeout("deadline exceeded".into()), String::new())
            }
            outcome = work => {
                match outcome {
                    Ok((status, hostname, response_size)) => RequestResult {
                        endpoint_name: endpoint.name.clone(),
                        url: endpoint.url_template.clone(),
                        method: endpoint.method.as_str().to_string(),
                        status: Some(status),
                        success: (200..400).contains(&status),
                        error_kind: if (200..400).contains(&status) { None } else { Some(moxapp_core::ErrorKind::Http) },
                        error_msg: if (200..400).contains(&status) { None } else { Some(format!("http status {status}")) },
                        total_ms: timing.total_ms(),
                        dns_ms: timing.snapshot().dns_ms,
                        connect_ms: timing.snapshot().connect_ms,
                        tls_ms: timing.snapshot().tls_ms,
                        ttfb_ms: timing.snapshot().ttfb_ms,
                        hostname,
                        response_size: Some(response_size),
                        timestamp,
                    },
                    Err((err, hostname)) => self.failure_result_with_hostname(endpoint, &timing, timestamp, err, hostname),
                }
            }
        }
    }

    fn failure_result_with_hostname(
        &self,
        endpoint: &OutgoingEndpoint,
        timing: &TimingCapture,
        timestamp: chrono::DateTime<chrono::Utc>,
        err: ClientError,
        hostname: String,
    ) -> RequestResult {
        let snap = timing.snapshot();
        RequestResult {
            endpoint_name: endpoint.name.clone(),
            url: endpoint.url_template.clone(),
            method: endpoint.method.as_str().to_string(),
            status: None,
            success: false,
            error_kind: Some(err.kind()),
            error_msg: Some(err.to_string()),
            total_ms: timing.total_ms(),
            dns_ms: snap.dns_ms,
            connect_ms: snap.connect_ms,
            tls_ms: snap.tls_ms,
            ttfb_ms: snap.ttfb_ms,
            hostname,
            response_size: None,
            timestamp,
        }
    }

    /// The happy-path pipeline: template expansion, auth, DNS timing,
    /// dispatch, body drain. Returns `Ok((status, hostname, size))` or
    /// `Err((classified_error, hostname))` so the caller can still
    /// attach whatever hostname was resolved before failing.
    async fn run(
        &self,
        endpoint: &OutgoingEndpoint,
        ctx: &TemplateContext<'_>,
        timing: &TimingCapture,
    ) -> Result<(u16, String, u64), (ClientError, String)> {
        let url_str = evaluate(&endpoint.url_template, ctx)
            .map_err(|e| (ClientError::Template(e.to_string()), String::new()))?;

        let url = reqwest::Url::parse(&url_str)
            .map_err(|e| (ClientError::Template(format!("invalid url '{url_str}': {e}")), String::new()))?;
        let hostname = url.host_str().unwrap_or_default().to_string();

        let mut request = self.http.request(
            reqwest_method(endpoint.method.as_str()),
            url.clone(),
        );
        request = request.header(reqwest::header::USER_AGENT, USER_AGENT);

        if endpoint.method.carries_body() {
            if let Some(body) = &endpoint.body {
                let expanded = expand_value(body, ctx)
                    .map_err(|e| (ClientError::Template(e.to_string()), hostname.clone()))?;
                let bytes = serde_json::to_vec(&expanded)
                    .map_err(|e| (ClientError::Marshal(e.to_string()), hostname.clone()))?;
                request = request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes);
            }
        }

        for (key, value) in &endpoint.headers {
            let expanded = evaluate(value, ctx).unwrap_or_else(|_| value.clone());
            request = request.header(key, expanded);
        }

        if let Some(auth) = &endpoint.resolved_auth {
            request = self
                .apply_auth(request, auth)
                .await
                .map_err(|e| (e, hostname.clone()))?;
        }

        let dns_start = Instant::now();
        match tokio::net::lookup_host((hostname.as_str(), url.port_or_known_default().unwrap_or(80))).await {
            Ok(_) => timing.record_dns(dns_start.elapsed()),
            Err(e) => {
                timing.record_dns(dns_start.elapsed());
                return Err((classify_text(&e.to_string()), hostname));
            }
        }
        timing.record_connect_and_tls_unmeasured();

        let connect_start = Instant::now();
        let response = request.send().await.map_err(|e| (classify_text(&e.to_string()), hostname.clone()))?;
        timing.record_ttfb(connect_start);

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| (classify_text(&e.to_string()), hostname.clone()))?;

        Ok((status, hostname, bytes.len() as u64))
    }

    async fn apply_auth(
        &self,
        mut request: reqwest::RequestBuilder,
        auth: &AuthConfig,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        match auth.auth_type {
            AuthType::None => Ok(request),
            AuthType::Bearer => {
                let token = self
                    .auth
                    .get_token(&auth.name)
                    .await
                    .map_err(|e| ClientError::Auth(e.to_string()))?;
                Ok(request.bearer_auth(token))
            }
            AuthType::ApiKey | AuthType::CustomHeader => {
                let header_name = auth
                    .header_name
                    .as_deref()
                    .ok_or_else(|| ClientError::Auth(format!("auth '{}' missing header_name", auth.name)))?;
                let value = auth.env_var.as_deref().and_then(|k| self.env.get(k)).unwrap_or_default();
                request = request.header(header_name, value);
                Ok(request)
            }
            AuthType::ApiKeyQuery => {
                let query_param = auth
                    .query_param
                    .as_deref()
                    .ok_or_else(|| ClientError::Auth(format!("auth '{}' missing query_param", auth.name)))?;
                let value = auth.env_var.as_deref().and_then(|k| self.env.get(k)).unwrap_or_default();
                Ok(request.query(&[(query_param, value)]))
            }
            AuthType::Basic => {
                let username = auth.username_env.as_deref().and_then(|k| self.env.get(k)).unwrap_or_default();
                let password = auth.password_env.as_deref().and_then(|k| self.env.get(k));
                Ok(request.basic_auth(username, password))
            }
        }
    }
}

fn reqwest_method(method: &str) -> reqwest::Method {
    reqwest::Method::from_bytes(method.as_bytes()).unwrap_or(reqwest::Method::GET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxapp_core::{FakeEnv, SystemClock, SystemRandom};

    fn client() -> HttpClient {
        HttpClient::new(
            10,
            Arc::new(FakeEnv::new()),
            Arc::new(SystemClock),
            Arc::new(SystemRandom),
            Arc::new(TokenManager::new(Arc::new(FakeEnv::new()), Arc::new(SystemClock))),
        )
    }

    fn endpoint(url: &str) -> OutgoingEndpoint {
        OutgoingEndpoint {
            name: "test".into(),
            method: moxapp_config::HttpMethod::Get,
            url_template: url.into(),
            frequency: 60.0,
            headers: Default::default(),
            body: None,
            timeout: 5,
            auth: None,
            enabled: true,
            resolved_auth: None,
        }
    }

    #[tokio::test]
    async fn bad_template_short_circuits_with_template_error() {
        let client = client();
        let result = client
            .execute(&endpoint("{{unterminated"), Duration::from_secs(5), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert!(matches!(result.error_kind, Some(moxapp_core::ErrorKind::Template)));
        assert_eq!(result.total_ms >= 0.0, true);
    }

    #[tokio::test]
    async fn unresolvable_host_is_classified_as_dns() {
        let client = client();
        let result = client
            .execute(&endpoint("http://this-host-does-not-exist.invalid/"), Duration::from_secs(5), CancellationToken::new())
            .await;
        assert!(!result.success);
        assert!(matches!(result.error_kind, Some(moxapp_core::ErrorKind::Dns)));
    }

    #[tokio::test]
    async fn cancellation_is_observed() {
        let client = client();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = client
            .execute(&endpoint("http://example.invalid/"), Duration::from_secs(5), cancel)
            .await;
        assert!(!result.success);
        assert!(matches!(result.error_kind, Some(moxapp_core::ErrorKind::Cancelled)));
    }
}
