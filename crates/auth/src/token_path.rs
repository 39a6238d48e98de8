//! Dotted-path extraction from a token endpoint's JSON response, and
//! interpretation of `expires_path` values (§4.4 step 6).

use chrono::{DateTime, Duration, Utc};

/// Walk a dotted path (`"data.access_token"`) through nested JSON
/// objects.
pub fn get_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Extract the token string at `token_path`.
pub fn extract_token(body: &serde_json::Value, token_path: &str) -> Option<String> {
    get_path(body, token_path)?.as_str().map(str::to_string)
}

/// Interpret an `expires_path` value into an absolute expiry instant,
/// per §4.4: a number `> 10^12` is epoch milliseconds, `> 10^9` is
/// epoch seconds, otherwise it's seconds from now. Absent or
/// malformed values default to one hour from now.
pub fn interpret_expires(body: &serde_json::Value, expires_path: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let default = now + Duration::hours(1);

    let Some(path) = expires_path else {
        return default;
    };
    let Some(raw) = get_path(body, path) else {
        return default;
    };

    let number = match raw.as_f64() {
        Some(n) => n,
        None => match raw.as_str().and_then(|s| s.parse::<f64>().ok()) {
            Some(n) => n,
            None => return default,
        },
    };

    if number > 1e12 {
        DateTime::from_timestamp_millis(number as i64).unwrap_or(default)
    } else if number > 1e9 {
        DateTime::from_timestamp(number as i64, 0).unwrap_or(default)
    } else {
        now + Duration::milliseconds((number * 1000.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_token() {
        let body = serde_json::json!({"data": {"access_token": "abc123"}});
        assert_eq!(extract_token(&body, "data.access_token"), Some("abc123".into()));
    }

    #[test]
    fn missing_path_yields_none() {
        let body = serde_json::json!({"data": {}});
        assert_eq!(extract_token(&body, "data.access_token"), None);
    }

    #[test]
    fn non_string_token_yields_none() {
        let body = serde_json::json!({"access_token": 123});
        assert_eq!(extract_token(&body, "access_token"), None);
    }

    #[test]
    fn seconds_from_now_for_small_values() {
        let now = Utc::now();
        let body = serde_json::json!({"expires_in": 60});
        let expires = interpret_expires(&body, Some("expires_in"), now);
        let delta = expires - now;
        assert!(delta.num_seconds() >= 59 && delta.num_seconds() <= 61);
    }

    #[test]
    fn epoch_seconds_for_values_over_1e9() {
        let now = Utc::now();
        let epoch_secs = 2_000_000_000_i64;
        let body = serde_json::json!({"exp": epoch_secs});
        let expires = interpret_expires(&body, Some("exp"), now);
        assert_eq!(expires.timestamp(), epoch_secs);
    }

    #[test]
    fn epoch_millis_for_values_over_1e12() {
        let now = Utc::now();
        let epoch_millis = 2_000_000_000_000_i64;
        let body = serde_json::json!({"exp": epoch_millis});
        let expires = interpret_expires(&body, Some("exp"), now);
        assert_eq!(expires.timestamp_millis(), epoch_millis);
    }

    #[test]
    fn absent_expires_path_defaults_to_one_hour() {
        let now = Utc::now();
        let body = serde_json::json!({});
        let expires = interpret_expires(&body, None, now);
        let delta = expires - now;
        assert!(delta.num_minutes() >= 59 && delta.num_minutes() <= 61);
    }

    #[test]
    fn malformed_value_defaults_to_one_hour() {
        let now = Utc::now();
        let body = serde_json::json!({"exp": "not-a-number"});
        let expires = interpret_expires(&body, Some("exp"), now);
        let delta = expires - now;
        assert!(delta.num_minutes() >= 59 && delta.num_minutes() <= 61);
    }
}
