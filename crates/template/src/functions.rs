//! The closed set of template functions (§4.2). Adding a function
//! means adding a variant and a case here and in `evaluate` — not
//! registering a callback.

use crate::error::TemplateError;
use moxapp_core::{Clock, EnvSource, RandomSource};

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateFn {
    RandomString(u64),
    RandomInt(i64, i64),
    RandomPhone,
    RandomEmail,
    RandomUuid,
    Now,
    Today,
    Yesterday,
    UnixNow,
    UnixMilli,
    UrlEncode(String),
    Env(String),
    EnvDefault(String, String),
}

impl TemplateFn {
    /// Parse a function name and its already-tokenized arguments.
    pub fn parse(name: &str, args: &[String]) -> Result<Self, TemplateError> {
        let invalid = |reason: &str| TemplateError::InvalidArgs {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match name {
            "randomString" => {
                let [n] = args_exact(args, name)?;
                let n: u64 = n.parse().map_err(|_| invalid("expected an integer length"))?;
                Ok(TemplateFn::RandomString(n))
            }
            "randomInt" => {
                let [a, b] = args_exact(args, name)?;
                let a: i64 = a.parse().map_err(|_| invalid("expected an integer"))?;
                let b: i64 = b.parse().map_err(|_| invalid("expected an integer"))?;
                Ok(TemplateFn::RandomInt(a, b))
            }
            "randomPhone" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::RandomPhone)
            }
            "randomEmail" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::RandomEmail)
            }
            "randomUUID" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::RandomUuid)
            }
            "now" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::Now)
            }
            "today" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::Today)
            }
            "yesterday" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::Yesterday)
            }
            "unixNow" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::UnixNow)
            }
            "unixMilli" => {
                args_exact::<0>(args, name)?;
                Ok(TemplateFn::UnixMilli)
            }
            "urlEncode" => {
                let [s] = args_exact(args, name)?;
                Ok(TemplateFn::UrlEncode(s))
            }
            "env" => {
                let [k] = args_exact(args, name)?;
                Ok(TemplateFn::Env(k))
            }
            "envDefault" => {
                let [k, d] = args_exact(args, name)?;
                Ok(TemplateFn::EnvDefault(k, d))
            }
            other => Err(TemplateError::UnknownFunction(other.to_string())),
        }
    }

    pub fn evaluate(&self, clock: &dyn Clock, random: &dyn RandomSource, env: &dyn EnvSource) -> String {
        match self {
            TemplateFn::RandomString(n) => random_string(random, *n),
            TemplateFn::RandomInt(a, b) => random_int(random, *a, *b).to_string(),
            TemplateFn::RandomPhone => random_phone(random),
            TemplateFn::RandomEmail => format!("test{}@example.com", random_int(random, 0, 9999)),
            TemplateFn::RandomUuid => uuid::Uuid::new_v4().to_string(),
            TemplateFn::Now => clock.now_utc().to_rfc3339(),
            TemplateFn::Today => clock.now_utc().format("%Y-%m-%d").to_string(),
            TemplateFn::Yesterday => (clock.now_utc() - chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string(),
            TemplateFn::UnixNow => clock.now_utc().timestamp().to_string(),
            TemplateFn::UnixMilli => clock.now_utc().timestamp_millis().to_string(),
            TemplateFn::UrlEncode(s) => urlencoding::encode(s).into_owned(),
            TemplateFn::Env(k) => env.get(k).unwrap_or_default(),
            TemplateFn::EnvDefault(k, d) => env.get(k).unwrap_or_else(|| d.clone()),
        }
    }
}

fn random_int(random: &dyn RandomSource, a: i64, b: i64) -> i64 {
    if b <= a {
        return a;
    }
    let span = (b - a) as u64;
    a + random.uniform_range_u64(0, span) as i64
}

fn random_string(random: &dyn RandomSource, n: u64) -> String {
    (0..n)
        .map(|_| {
            let idx = random.uniform_range_u64(0, ALPHANUMERIC.len() as u64 - 1) as usize;
            ALPHANUMERIC[idx] as char
        })
        .collect()
}

fn random_phone(random: &dyn RandomSource) -> String {
    let digits = random.uniform_range_u64(100_000_000, 999_999_999);
    format!("+33{digits}")
}

/// Require exactly `N` arguments, returning them as a fixed array.
fn args_exact<const N: usize>(args: &[String], name: &str) -> Result<[String; N], TemplateError> {
    <[String; N]>::try_from(args.to_vec()).map_err(|got| TemplateError::InvalidArgs {
        name: name.to_string(),
        reason: format!("expected {N} argument(s), got {}", got.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_random_int_requires_two_integers() {
        let parsed = TemplateFn::parse("randomInt", &["1".into(), "10".into()]).unwrap();
        assert_eq!(parsed, TemplateFn::RandomInt(1, 10));
        assert!(TemplateFn::parse("randomInt", &["1".into()]).is_err());
        assert!(TemplateFn::parse("randomInt", &["x".into(), "10".into()]).is_err());
    }

    #[test]
    fn unknown_function_is_rejected() {
        assert!(matches!(
            TemplateFn::parse("doesNotExist", &[]),
            Err(TemplateError::UnknownFunction(_))
        ));
    }

    #[test]
    fn random_int_returns_a_when_b_le_a() {
        struct ZeroRandom;
        impl RandomSource for ZeroRandom {
            fn uniform_unit(&self) -> f64 {
                0.0
            }
            fn uniform_range_u64(&self, lo: u64, _hi: u64) -> u64 {
                lo
            }
        }
        assert_eq!(random_int(&ZeroRandom, 5, 5), 5);
        assert_eq!(random_int(&ZeroRandom, 5, 2), 5);
    }
}
