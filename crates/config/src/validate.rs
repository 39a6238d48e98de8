//! Structural validation, per §3.1. Each function returns an
//! accumulated list of human-readable error messages; an empty list
//! means the value is valid.

use crate::entities::{AuthConfig, AuthType, ConfigData, InboundRoute, OutgoingEndpoint, TokenEndpoint};

const SHARE_TOLERANCE: f64 = 0.001;

pub fn validate_token_endpoint(endpoint: &TokenEndpoint) -> Vec<String> {
    let mut errors = Vec::new();
    if endpoint.token_path.trim().is_empty() {
        errors.push("token_endpoint.token_path is required".into());
    }
    let has_url = endpoint.url.is_some();
    let has_url_env = endpoint.url_env.is_some();
    if has_url == has_url_env {
        errors.push("token_endpoint must set exactly one of url or url_env".into());
    }
    errors
}

pub fn validate_auth_config(auth: &AuthConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if auth.token_endpoint.is_some() && auth.auth_type != AuthType::Bearer {
        errors.push(format!(
            "auth '{}': token_endpoint is only valid for type bearer",
            auth.name
        ));
    }
    if let Some(token_endpoint) = &auth.token_endpoint {
        for err in validate_token_endpoint(token_endpoint) {
            errors.push(format!("auth '{}': {err}", auth.name));
        }
    }

    match auth.auth_type {
        AuthType::ApiKey => {
            if auth.header_name.is_none() {
                errors.push(format!("auth '{}': header_name is required for api_key", auth.name));
            }
            if auth.env_var.is_none() {
                errors.push(format!("auth '{}': env_var is required for api_key", auth.name));
            }
        }
        AuthType::ApiKeyQuery => {
            if auth.query_param.is_none() {
                errors.push(format!(
                    "auth '{}': query_param is required for api_key_query",
                    auth.name
                ));
            }
            if auth.env_var.is_none() {
                errors.push(format!("auth '{}': env_var is required for api_key_query", auth.name));
            }
        }
        AuthType::Basic => {
            if auth.username_env.is_none() {
                errors.push(format!("auth '{}': username_env is required for basic", auth.name));
            }
            if auth.password_env.is_none() {
                errors.push(format!("auth '{}': password_env is required for basic", auth.name));
            }
        }
        AuthType::CustomHeader => {
            if auth.header_name.is_none() {
                errors.push(format!(
                    "auth '{}': header_name is required for custom_header",
                    auth.name
                ));
            }
            if auth.env_var.is_none() {
                errors.push(format!("auth '{}': env_var is required for custom_header", auth.name));
            }
        }
        AuthType::Bearer | AuthType::None => {}
    }

    errors
}

pub fn validate_outgoing_endpoint(endpoint: &OutgoingEndpoint) -> Vec<String> {
    let mut errors = Vec::new();
    if endpoint.name.trim().is_empty() {
        errors.push("endpoint name must not be empty".into());
    }
    if endpoint.frequency < 0.0 {
        errors.push(format!("endpoint '{}': frequency must be >= 0", endpoint.name));
    }
    if endpoint.timeout == 0 {
        errors.push(format!("endpoint '{}': timeout must be > 0", endpoint.name));
    }
    errors
}

pub fn validate_inbound_route(route: &InboundRoute) -> Vec<String> {
    let mut errors = Vec::new();
    if !route.path.starts_with('/') {
        errors.push(format!("route '{}': path must start with /", route.name));
    }
    if route.responses.is_empty() {
        errors.push(format!("route '{}': responses must not be empty", route.name));
    }

    let mut share_sum = 0.0;
    for response in &route.responses {
        if !(0.0..=1.0).contains(&response.share) {
            errors.push(format!(
                "route '{}': response share {} out of [0,1]",
                route.name, response.share
            ));
        }
        if !(100..=599).contains(&response.status) {
            errors.push(format!(
                "route '{}': response status {} out of [100,599]",
                route.name, response.status
            ));
        }
        if response.max_response_ms < response.min_response_ms {
            errors.push(format!(
                "route '{}': max_response_ms < min_response_ms",
                route.name
            ));
        }
        share_sum += response.share;
    }

    if !route.responses.is_empty() && (share_sum - 1.0).abs() > SHARE_TOLERANCE {
        errors.push(format!(
            "route '{}': response shares sum to {share_sum}, expected 1 +/- {SHARE_TOLERANCE}",
            route.name
        ));
    }

    errors
}

/// Structural validation over the whole config: name uniqueness plus
/// every per-entity rule above. Does not re-run auth resolution —
/// that happens during normalization and is folded in by the caller.
pub fn validate_config_data(data: &ConfigData) -> Vec<String> {
    let mut errors = Vec::new();

    for auth in data.auth_configs.values() {
        errors.extend(validate_auth_config(auth));
    }

    let mut seen_endpoint_names = std::collections::HashSet::new();
    for endpoint in &data.outgoing_endpoints {
        if !seen_endpoint_names.insert(&endpoint.name) {
            errors.push(format!("duplicate endpoint name '{}'", endpoint.name));
        }
        errors.extend(validate_outgoing_endpoint(endpoint));
    }

    let mut seen_route_names = std::collections::HashSet::new();
    for route in &data.incoming_routes {
        if !seen_route_names.insert(&route.name) {
            errors.push(format!("duplicate route name '{}'", route.name));
        }
        errors.extend(validate_inbound_route(route));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ResponseSpec;

    fn route_with_shares(shares: &[f64]) -> InboundRoute {
        InboundRoute {
            name: "r".into(),
            path: "/sim/test".into(),
            method: "*".into(),
            responses: shares
                .iter()
                .map(|&share| ResponseSpec {
                    status: 200,
                    share,
                    min_response_ms: 0,
                    max_response_ms: 10,
                })
                .collect(),
            enabled: true,
        }
    }

    #[test]
    fn route_requires_leading_slash() {
        let mut route = route_with_shares(&[1.0]);
        route.path = "sim/test".into();
        let errors = validate_inbound_route(&route);
        assert!(errors.iter().any(|e| e.contains("must start with /")));
    }

    #[test]
    fn route_shares_must_sum_to_one_within_tolerance() {
        let route = route_with_shares(&[0.5, 0.4999]);
        assert!(validate_inbound_route(&route).is_empty());

        let bad = route_with_shares(&[0.5, 0.3]);
        assert!(!validate_inbound_route(&bad).is_empty());
    }

    #[test]
    fn route_rejects_status_out_of_range() {
        let mut route = route_with_shares(&[1.0]);
        route.responses[0].status = 999;
        let errors = validate_inbound_route(&route);
        assert!(errors.iter().any(|e| e.contains("out of [100,599]")));
    }

    #[test]
    fn api_key_requires_header_name_and_env_var() {
        let auth = AuthConfig {
            name: "a".into(),
            auth_type: AuthType::ApiKey,
            header_name: None,
            query_param: None,
            env_var: None,
            username_env: None,
            password_env: None,
            token_endpoint: None,
            refresh_before_expiry: 60,
        };
        let errors = validate_auth_config(&auth);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn token_endpoint_rejected_on_non_bearer_auth() {
        let auth = AuthConfig {
            name: "a".into(),
            auth_type: AuthType::ApiKey,
            header_name: Some("X-Key".into()),
            query_param: None,
            env_var: Some("KEY".into()),
            username_env: None,
            password_env: None,
            token_endpoint: Some(TokenEndpoint {
                url: Some("https://example.com/token".into()),
                url_env: None,
                method: "POST".into(),
                headers: Default::default(),
                body: None,
                token_path: "access_token".into(),
                expires_path: None,
            }),
            refresh_before_expiry: 60,
        };
        let errors = validate_auth_config(&auth);
        assert!(errors.iter().any(|e| e.contains("only valid for type bearer")));
    }

    #[test]
    fn token_endpoint_requires_exactly_one_url_source() {
        let both = TokenEndpoint {
            url: Some("https://example.com".into()),
            url_env: Some("TOKEN_URL".into()),
            method: "POST".into(),
            headers: Default::default(),
            body: None,
            token_path: "access_token".into(),
            expires_path: None,
        };
        assert!(!validate_token_endpoint(&both).is_empty());

        let neither = TokenEndpoint {
            url: None,
            url_env: None,
            ..both.clone()
        };
        assert!(!validate_token_endpoint(&neither).is_empty());
    }

    #[test]
    fn endpoint_requires_positive_timeout_and_nonnegative_frequency() {
        let endpoint = OutgoingEndpoint {
            name: "e".into(),
            method: Default::default(),
            url_template: "https://example.com".into(),
            frequency: -1.0,
            headers: Default::default(),
            body: None,
            timeout: 0,
            auth: None,
            enabled: true,
            resolved_auth: None,
        };
        let errors = validate_outgoing_endpoint(&endpoint);
        assert_eq!(errors.len(), 2);
    }
}
