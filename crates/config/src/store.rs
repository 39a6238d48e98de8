//! The live, thread-safe configuration store (§4.1).

use crate::entities::{AuthConfig, ConfigData, InboundRoute, OutgoingEndpoint};
use crate::error::ConfigError;
use crate::normalize::normalize_endpoint;
use crate::validate::validate_config_data;
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use tokio::sync::RwLock;

/// Holds the in-memory configuration. A single reader/writer lock
/// protects the whole store; reads clone out slices/maps so callers
/// never hold a long-lived pointer into it.
pub struct ConfigStore {
    inner: RwLock<ConfigData>,
    /// The YAML path `reload` re-reads from. Unset for stores built
    /// straight from in-memory `ConfigData` (e.g. in tests).
    config_path: StdMutex<Option<PathBuf>>,
}

impl ConfigStore {
    pub fn new(data: ConfigData) -> Self {
        Self { inner: RwLock::new(data), config_path: StdMutex::new(None) }
    }

    /// Build a store from a candidate `ConfigData`, normalizing
    /// (`fatal_auth = false`, matching file-load semantics) and
    /// validating before accepting it.
    pub fn from_loaded(mut data: ConfigData) -> Result<Self, ConfigError> {
        let errors = normalize_and_validate(&mut data, false);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        Ok(Self::new(data))
    }

    pub async fn snapshot(&self) -> ConfigData {
        self.inner.read().await.clone()
    }

    /// Record the YAML path `reload` should re-read. Separate from
    /// construction so a CLI-overridden `ConfigData` can still be
    /// built first and tied to its source file afterward.
    pub fn set_config_path(&self, path: PathBuf) {
        *self.config_path.lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
    }

    /// Re-read the configured YAML path and replace the live
    /// configuration with it (§9: no watch-on-disk, reload is the only
    /// other path besides the management API by which runtime state
    /// changes). Non-fatal about unresolved auth references, matching
    /// the semantics of the initial file load.
    pub async fn reload(&self) -> Result<(), ConfigError> {
        let path = self
            .config_path
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| ConfigError::NotFound("no config file path configured for reload".into()))?;
        let mut data = crate::file::load_yaml(&path)?;
        let errors = normalize_and_validate(&mut data, false);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        *self.inner.write().await = data;
        Ok(())
    }

    /// Atomically replace the whole configuration. The candidate is
    /// normalized and validated on a scratch copy; the swap only
    /// happens if that succeeds, so readers always observe either the
    /// old or the new config entirely.
    pub async fn replace_all(&self, mut candidate: ConfigData) -> Result<(), ConfigError> {
        let errors = normalize_and_validate(&mut candidate, true);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        *self.inner.write().await = candidate;
        Ok(())
    }

    // ---- outgoing endpoints ----

    pub async fn list_outgoing(&self) -> Vec<OutgoingEndpoint> {
        self.inner.read().await.outgoing_endpoints.clone()
    }

    pub async fn get_outgoing(&self, name: &str) -> Option<OutgoingEndpoint> {
        self.inner
            .read()
            .await
            .outgoing_endpoints
            .iter()
            .find(|e| e.name == name)
            .cloned()
    }

    pub async fn add_outgoing(&self, mut endpoint: OutgoingEndpoint) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        if data.outgoing_endpoints.iter().any(|e| e.name == endpoint.name) {
            return Err(ConfigError::Conflict(format!("endpoint '{}' already exists", endpoint.name)));
        }
        normalize_endpoint(&mut endpoint, &data.auth_configs, true).map_err(|e| ConfigError::Validation(vec![e]))?;
        let errors = crate::validate::validate_outgoing_endpoint(&endpoint);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        data.outgoing_endpoints.push(endpoint);
        Ok(())
    }

    pub async fn update_outgoing(&self, name: &str, mut endpoint: OutgoingEndpoint) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        let index = data
            .outgoing_endpoints
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| ConfigError::NotFound(format!("endpoint '{name}' not found")))?;
        normalize_endpoint(&mut endpoint, &data.auth_configs, true).map_err(|e| ConfigError::Validation(vec![e]))?;
        let errors = crate::validate::validate_outgoing_endpoint(&endpoint);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        data.outgoing_endpoints[index] = endpoint;
        Ok(())
    }

    pub async fn delete_outgoing(&self, name: &str) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        let before = data.outgoing_endpoints.len();
        data.outgoing_endpoints.retain(|e| e.name != name);
        if data.outgoing_endpoints.len() == before {
            return Err(ConfigError::NotFound(format!("endpoint '{name}' not found")));
        }
        Ok(())
    }

    pub async fn set_outgoing_enabled(&self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        let endpoint = data
            .outgoing_endpoints
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::NotFound(format!("endpoint '{name}' not found")))?;
        endpoint.enabled = enabled;
        Ok(())
    }

    // ---- inbound routes ----

    pub async fn list_incoming(&self) -> Vec<InboundRoute> {
        self.inner.read().await.incoming_routes.clone()
    }

    pub async fn get_incoming(&self, name: &str) -> Option<InboundRoute> {
        self.inner
            .read()
            .await
            .incoming_routes
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    pub async fn add_incoming(&self, route: InboundRoute) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        if data.incoming_routes.iter().any(|r| r.name == route.name) {
            return Err(ConfigError::Conflict(format!("route '{}' already exists", route.name)));
        }
        let errors = crate::validate::validate_inbound_route(&route);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        data.incoming_routes.push(route);
        Ok(())
    }

    pub async fn update_incoming(&self, name: &str, route: InboundRoute) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        let index = data
            .incoming_routes
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| ConfigError::NotFound(format!("route '{name}' not found")))?;
        let errors = crate::validate::validate_inbound_route(&route);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        data.incoming_routes[index] = route;
        Ok(())
    }

    pub async fn delete_incoming(&self, name: &str) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        let before = data.incoming_routes.len();
        data.incoming_routes.retain(|r| r.name != name);
        if data.incoming_routes.len() == before {
            return Err(ConfigError::NotFound(format!("route '{name}' not found")));
        }
        Ok(())
    }

    pub async fn set_incoming_route_enabled(&self, name: &str, enabled: bool) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        let route = data
            .incoming_routes
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| ConfigError::NotFound(format!("route '{name}' not found")))?;
        route.enabled = enabled;
        Ok(())
    }

    // ---- auth configs ----

    pub async fn list_auth(&self) -> Vec<AuthConfig> {
        self.inner.read().await.auth_configs.values().cloned().collect()
    }

    pub async fn get_auth(&self, name: &str) -> Option<AuthConfig> {
        self.inner.read().await.auth_configs.get(name).cloned()
    }

    pub async fn add_auth(&self, auth: AuthConfig) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        if data.auth_configs.contains_key(&auth.name) {
            return Err(ConfigError::Conflict(format!("auth config '{}' already exists", auth.name)));
        }
        let errors = crate::validate::validate_auth_config(&auth);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        data.auth_configs.insert(auth.name.clone(), auth);
        Ok(())
    }

    pub async fn update_auth(&self, name: &str, auth: AuthConfig) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        if !data.auth_configs.contains_key(name) {
            return Err(ConfigError::NotFound(format!("auth config '{name}' not found")));
        }
        let errors = crate::validate::validate_auth_config(&auth);
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        data.auth_configs.insert(name.to_string(), auth);
        Ok(())
    }

    /// Delete an auth config. Refused (per §8.1 invariant 10) when any
    /// outgoing endpoint still references it, whether by name or via
    /// an inline override.
    pub async fn delete_auth(&self, name: &str) -> Result<(), ConfigError> {
        let mut data = self.inner.write().await;
        if !data.auth_configs.contains_key(name) {
            return Err(ConfigError::NotFound(format!("auth config '{name}' not found")));
        }
        if auth_in_use(&data, name) {
            return Err(ConfigError::Conflict(format!(
                "auth config '{name}' is referenced by an outgoing endpoint"
            )));
        }
        data.auth_configs.remove(name);
        Ok(())
    }

    // ---- global settings ----

    pub async fn set_global_multiplier(&self, value: f64) {
        self.inner.write().await.global.global_multiplier = value;
    }

    pub async fn set_concurrent_requests(&self, value: u32) {
        self.inner.write().await.global.concurrent_requests = value;
    }

    pub async fn set_log_all_requests(&self, value: bool) {
        self.inner.write().await.global.log_all_requests = value;
    }

    /// The master switch: halts all outgoing scheduling irrespective
    /// of per-endpoint settings.
    pub async fn set_enabled(&self, value: bool) {
        self.inner.write().await.global.enabled = value;
    }

    pub async fn set_incoming_enabled(&self, value: bool) {
        self.inner.write().await.global.incoming_enabled = value;
    }

    pub async fn get_total_base_requests_per_min(&self) -> f64 {
        self.inner
            .read()
            .await
            .outgoing_endpoints
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.frequency)
            .sum()
    }

    pub async fn get_adjusted_requests_per_min(&self) -> f64 {
        let data = self.inner.read().await;
        let total: f64 = data
            .outgoing_endpoints
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.frequency)
            .sum();
        total * data.global.global_multiplier
    }

    /// Find the best-matching inbound route for a request path and
    /// method: routes sorted by path length descending, the first
    /// enabled match wins. Returns the matched route and the path
    /// suffix remaining after the route's prefix.
    pub async fn match_inbound_route(&self, path: &str, method: &str) -> Option<(InboundRoute, String)> {
        let data = self.inner.read().await;
        if !data.global.incoming_enabled {
            return None;
        }

        let mut candidates: Vec<&InboundRoute> = data
            .incoming_routes
            .iter()
            .filter(|r| r.enabled)
            .filter(|r| r.method == "*" || r.method.eq_ignore_ascii_case(method))
            .filter(|r| {
                path.starts_with(r.path.as_str())
                    && (path.len() == r.path.len() || path[r.path.len()..].starts_with('/'))
            })
            .collect();

        candidates.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        candidates.first().map(|route| {
            let suffix = path[route.path.len()..].to_string();
            ((*route).clone(), suffix)
        })
    }
}

fn auth_in_use(data: &ConfigData, auth_name: &str) -> bool {
    use crate::entities::AuthRef;
    data.outgoing_endpoints.iter().any(|endpoint| match &endpoint.auth {
        Some(AuthRef::Named(name)) => name == auth_name,
        Some(AuthRef::Inline { auth_ref, .. }) => auth_ref == auth_name,
        None => false,
    })
}

/// Normalize (auth resolution) then structurally validate a whole
/// `ConfigData`, returning the combined list of error messages.
fn normalize_and_validate(data: &mut ConfigData, fatal_auth: bool) -> Vec<String> {
    let mut errors = Vec::new();
    let auth_configs = data.auth_configs.clone();
    for endpoint in &mut data.outgoing_endpoints {
        if let Err(message) = normalize_endpoint(endpoint, &auth_configs, fatal_auth) {
            errors.push(message);
        }
    }
    errors.extend(validate_config_data(data));
    errors
}
