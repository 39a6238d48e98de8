//! The configured entities: auth, outgoing endpoints, inbound routes,
//! and the global runtime settings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An HTTP method allowed on an outgoing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether this method carries a request body per §4.3.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of authentication an `AuthConfig` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    Bearer,
    ApiKey,
    ApiKeyQuery,
    Basic,
    CustomHeader,
}

/// A named reusable authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub name: String,

    #[serde(rename = "type")]
    pub auth_type: AuthType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<TokenEndpoint>,

    #[serde(default = "default_refresh_before_expiry")]
    pub refresh_before_expiry: u64,
}

fn default_refresh_before_expiry() -> u64 {
    60
}

/// The HTTP call the token manager issues to fetch or refresh a
/// bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_env: Option<String>,

    #[serde(default = "default_post_method")]
    pub method: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    pub token_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_path: Option<String>,
}

fn default_post_method() -> String {
    "POST".into()
}

/// `OutgoingEndpoint.auth`: a name reference, the literal `"none"`,
/// or an inline descriptor that shallow-overrides the referenced
/// config. A YAML `null` (or an absent field) is represented at the
/// call site as `Option::None`, not by a variant here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthRef {
    Inline {
        #[serde(rename = "ref")]
        auth_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query_param: Option<String>,
    },
    Named(String),
}

/// A configured outgoing HTTP target and its rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingEndpoint {
    pub name: String,

    #[serde(default)]
    pub method: HttpMethod,

    pub url_template: String,

    /// Requests per minute.
    pub frequency: f64,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout: u64,

    #[serde(default)]
    pub auth: Option<AuthRef>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Derived snapshot of the resolved auth config. Never trusted on
    /// input; always recomputed during normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_auth: Option<AuthConfig>,
}

fn default_timeout_seconds() -> u64 {
    30
}

pub(crate) fn default_true() -> bool {
    true
}

/// A single weighted response choice within an `InboundRoute`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub status: u16,
    pub share: f64,
    pub min_response_ms: u64,
    pub max_response_ms: u64,
}

/// A configured inbound simulated URL pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRoute {
    pub name: String,

    pub path: String,

    #[serde(default = "default_wildcard_method")]
    pub method: String,

    pub responses: Vec<ResponseSpec>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_wildcard_method() -> String {
    "*".into()
}

/// Runtime-mutable global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_multiplier")]
    pub global_multiplier: f64,

    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: u32,

    #[serde(default)]
    pub log_all_requests: bool,

    #[serde(default = "default_true")]
    pub incoming_enabled: bool,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_concurrent_requests() -> u32 {
    30
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            global_multiplier: default_multiplier(),
            concurrent_requests: default_concurrent_requests(),
            log_all_requests: false,
            incoming_enabled: true,
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

/// The full configuration, matching the on-disk YAML shape of §6.1
/// field for field. Also the value returned by `GetSnapshot` and
/// accepted by `ReplaceAll` — export/import round-trips through this
/// type unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(flatten)]
    pub global: GlobalSettings,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default)]
    pub auth_configs: HashMap<String, AuthConfig>,

    #[serde(default)]
    pub outgoing_endpoints: Vec<OutgoingEndpoint>,

    #[serde(default)]
    pub incoming_routes: Vec<InboundRoute>,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            global: GlobalSettings::default(),
            api_port: default_api_port(),
            auth_configs: HashMap::new(),
            outgoing_endpoints: Vec::new(),
            incoming_routes: Vec::new(),
        }
    }
}
