//! The `/sim/*` inbound adapter (§6.3): decodes the axum request into
//! an `InboundRequest`, hands it to the responder, and writes back
//! whatever status/body it returns. All business logic lives in
//! `moxapp-inbound`; this module only does HTTP marshalling.

use crate::state::AppState;
use axum::extract::{ConnectInfo, OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{body::Bytes, Json, Router};
use moxapp_inbound::InboundRequest;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;

pub fn router() -> Router<AppState> {
    Router::new().route("/sim", any(handle)).route("/sim/{*rest}", any(handle))
}

async fn handle(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_map: HashMap<String, String> =
        headers.iter().map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string())).collect();
    let query = parse_query(uri.query().unwrap_or(""));
    let body = if body.is_empty() { None } else { Some(String::from_utf8_lossy(&body).into_owned()) };

    let req = InboundRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: header_map,
        query,
        body,
        remote: addr.to_string(),
    };

    let outcome = state.inbound.handle(req).await;
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match outcome.echo {
        Some(echo) => (status, Json(echo)).into_response(),
        None => (status, Json(json!({ "error": "no matching route" }))).into_response(),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            Some((urlencoding::decode(key).ok()?.into_owned(), urlencoding::decode(value).ok()?.into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_query_pairs() {
        let parsed = parse_query("a=1&b=two%20words");
        assert_eq!(parsed.get("a"), Some(&"1".to_string()));
        assert_eq!(parsed.get("b"), Some(&"two words".to_string()));
    }

    #[test]
    fn empty_query_yields_empty_map() {
        assert!(parse_query("").is_empty());
    }
}
