//! Normalization: resolving `auth` references into `resolved_auth`
//! snapshots. Field-level defaults (timeout=30, method=GET, an absent
//! `enabled` meaning `true`) are handled by `serde` defaults on the
//! entity types themselves and need no runtime step here.

use crate::entities::{AuthConfig, AuthRef, AuthType, OutgoingEndpoint};
use std::collections::HashMap;

/// The synthetic `AuthConfig` an endpoint resolves to when it
/// requests no authentication, or when resolution fails and the
/// caller is non-fatal about it.
pub fn none_auth_config() -> AuthConfig {
    AuthConfig {
        name: "none".into(),
        auth_type: AuthType::None,
        header_name: None,
        query_param: None,
        env_var: None,
        username_env: None,
        password_env: None,
        token_endpoint: None,
        refresh_before_expiry: 60,
    }
}

/// Resolve an endpoint's `auth` field against the store's named auth
/// configs, applying any inline shallow overrides.
///
/// Returns `Err(message)` when a named reference doesn't exist;
/// callers decide whether that is fatal (API create/update) or
/// should fall back to `none` with a warning (file load).
pub fn resolve_auth(
    auth: &Option<AuthRef>,
    auth_configs: &HashMap<String, AuthConfig>,
) -> Result<AuthConfig, String> {
    let auth_ref = match auth {
        None => return Ok(none_auth_config()),
        Some(r) => r,
    };

    match auth_ref {
        AuthRef::Named(name) if name == "none" => Ok(none_auth_config()),
        AuthRef::Named(name) => auth_configs
            .get(name)
            .cloned()
            .ok_or_else(|| format!("auth config '{name}' not found")),
        AuthRef::Inline { auth_ref, header_name, query_param } => {
            let base = auth_configs
                .get(auth_ref)
                .cloned()
                .ok_or_else(|| format!("auth config '{auth_ref}' not found"))?;
            let mut overridden = base;
            if let Some(h) = header_name {
                overridden.header_name = Some(h.clone());
            }
            if let Some(q) = query_param {
                overridden.query_param = Some(q.clone());
            }
            Ok(overridden)
        }
    }
}

/// Recompute `resolved_auth` for one endpoint. On a missing
/// reference: fatal callers get an error message; non-fatal callers
/// fall back to `none` and log a warning.
pub fn normalize_endpoint(
    endpoint: &mut OutgoingEndpoint,
    auth_configs: &HashMap<String, AuthConfig>,
    fatal: bool,
) -> Result<(), String> {
    match resolve_auth(&endpoint.auth, auth_configs) {
        Ok(resolved) => {
            endpoint.resolved_auth = Some(resolved);
            Ok(())
        }
        Err(message) => {
            if fatal {
                Err(message)
            } else {
                tracing::warn!(endpoint = %endpoint.name, %message, "falling back to no auth");
                endpoint.resolved_auth = Some(none_auth_config());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OutgoingEndpoint;

    fn sample_auth(name: &str) -> AuthConfig {
        AuthConfig {
            name: name.into(),
            auth_type: AuthType::Bearer,
            header_name: None,
            query_param: None,
            env_var: Some("TOKEN".into()),
            username_env: None,
            password_env: None,
            token_endpoint: None,
            refresh_before_expiry: 60,
        }
    }

    #[test]
    fn absent_auth_resolves_to_none() {
        let configs = HashMap::new();
        let resolved = resolve_auth(&None, &configs).unwrap();
        assert_eq!(resolved.auth_type, AuthType::None);
    }

    #[test]
    fn literal_none_string_resolves_to_none() {
        let configs = HashMap::new();
        let resolved = resolve_auth(&Some(AuthRef::Named("none".into())), &configs).unwrap();
        assert_eq!(resolved.auth_type, AuthType::None);
    }

    #[test]
    fn named_reference_resolves_to_stored_config() {
        let mut configs = HashMap::new();
        configs.insert("svc".into(), sample_auth("svc"));
        let resolved = resolve_auth(&Some(AuthRef::Named("svc".into())), &configs).unwrap();
        assert_eq!(resolved.name, "svc");
    }

    #[test]
    fn inline_override_shallow_overrides_header_name() {
        let mut configs = HashMap::new();
        configs.insert("svc".into(), sample_auth("svc"));
        let auth_ref = AuthRef::Inline {
            auth_ref: "svc".into(),
            header_name: Some("X-Custom".into()),
            query_param: None,
        };
        let resolved = resolve_auth(&Some(auth_ref), &configs).unwrap();
        assert_eq!(resolved.header_name.as_deref(), Some("X-Custom"));
        assert_eq!(resolved.env_var.as_deref(), Some("TOKEN"));
    }

    #[test]
    fn missing_reference_is_fatal_when_requested() {
        let configs = HashMap::new();
        let err = resolve_auth(&Some(AuthRef::Named("missing".into())), &configs).unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn normalize_endpoint_falls_back_non_fatally() {
        let mut endpoint = OutgoingEndpoint {
            name: "e".into(),
            method: Default::default(),
            url_template: "https://example.com".into(),
            frequency: 60.0,
            headers: HashMap::new(),
            body: None,
            timeout: 30,
            auth: Some(AuthRef::Named("missing".into())),
            enabled: true,
            resolved_auth: None,
        };
        let configs = HashMap::new();
        normalize_endpoint(&mut endpoint, &configs, false).unwrap();
        assert_eq!(
            endpoint.resolved_auth.unwrap().auth_type,
            AuthType::None
        );
    }

    #[test]
    fn normalize_endpoint_fails_fatally() {
        let mut endpoint = OutgoingEndpoint {
            name: "e".into(),
            method: Default::default(),
            url_template: "https://example.com".into(),
            frequency: 60.0,
            headers: HashMap::new(),
            body: None,
            timeout: 30,
            auth: Some(AuthRef::Named("missing".into())),
            enabled: true,
            resolved_auth: None,
        };
        let configs = HashMap::new();
        assert!(normalize_endpoint(&mut endpoint, &configs, true).is_err());
    }

    #[test]
    fn normalize_is_idempotent_given_stable_auth_configs() {
        let mut configs = HashMap::new();
        configs.insert("svc".into(), sample_auth("svc"));
        let mut endpoint = OutgoingEndpoint {
            name: "e".into(),
            method: Default::default(),
            url_template: "https://example.com".into(),
            frequency: 60.0,
            headers: HashMap::new(),
            body: None,
            timeout: 30,
            auth: Some(AuthRef::Named("svc".into())),
            enabled: true,
            resolved_auth: None,
        };
        normalize_endpoint(&mut endpoint, &configs, true).unwrap();
        let first = endpoint.resolved_auth.clone();
        normalize_endpoint(&mut endpoint, &configs, true).unwrap();
        assert_eq!(first.unwrap().name, endpoint.resolved_auth.unwrap().name);
    }
}
