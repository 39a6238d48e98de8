//! The stateless evaluator: expands `{{fn arg...}}` expressions
//! embedded in strings, and recurses through JSON-shaped bodies.

use crate::error::TemplateError;
use crate::functions::TemplateFn;
use moxapp_core::{Clock, EnvSource, RandomSource};

/// The external services a template evaluation draws on.
pub struct TemplateContext<'a> {
    pub clock: &'a dyn Clock,
    pub random: &'a dyn RandomSource,
    pub env: &'a dyn EnvSource,
}

/// Expand every `{{fn arg...}}` expression in `template`.
pub fn evaluate(template: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        match rest.find("{{") {
            None => {
                output.push_str(rest);
                break;
            }
            Some(start) => {
                output.push_str(&rest[..start]);
                let after_open = &rest[start + 2..];
                match after_open.find("}}") {
                    None => return Err(TemplateError::Unterminated(template.to_string())),
                    Some(end) => {
                        let expr = after_open[..end].trim();
                        output.push_str(&evaluate_expression(expr, ctx)?);
                        rest = &after_open[end + 2..];
                    }
                }
            }
        }
    }

    Ok(output)
}

fn evaluate_expression(expr: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
    let tokens = tokenize(expr);
    let (name, args) = tokens.split_first().ok_or(TemplateError::EmptyExpression)?;
    let function = TemplateFn::parse(name, args)?;
    Ok(function.evaluate(ctx.clock, ctx.random, ctx.env))
}

/// Split an expression into whitespace-separated tokens, honoring
/// double-quoted arguments that may themselves contain spaces.
fn tokenize(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in expr.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Recursively expand a JSON-shaped body: strings are expanded,
/// mappings and sequences are traversed element-wise, scalars pass
/// through unchanged.
pub fn expand_value(
    value: &serde_json::Value,
    ctx: &TemplateContext<'_>,
) -> Result<serde_json::Value, TemplateError> {
    match value {
        serde_json::Value::String(s) => Ok(serde_json::Value::String(evaluate(s, ctx)?)),
        serde_json::Value::Array(items) => {
            let expanded: Result<Vec<_>, _> = items.iter().map(|v| expand_value(v, ctx)).collect();
            Ok(serde_json::Value::Array(expanded?))
        }
        serde_json::Value::Object(map) => {
            let mut expanded = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                expanded.insert(key.clone(), expand_value(v, ctx)?);
            }
            Ok(serde_json::Value::Object(expanded))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moxapp_core::{FakeEnv, SystemClock, SystemRandom};

    fn ctx<'a>(env: &'a FakeEnv, clock: &'a SystemClock, random: &'a SystemRandom) -> TemplateContext<'a> {
        TemplateContext { clock, random, env }
    }

    #[test]
    fn literal_text_passes_through_unchanged() {
        let env = FakeEnv::new();
        let clock = SystemClock;
        let random = SystemRandom;
        let result = evaluate("https://example.com/health", &ctx(&env, &clock, &random)).unwrap();
        assert_eq!(result, "https://example.com/health");
    }

    #[test]
    fn multiple_expressions_in_one_template_expand() {
        let env = FakeEnv::new().with("REGION", "eu");
        let clock = SystemClock;
        let random = SystemRandom;
        let result = evaluate("/region/{{env \"REGION\"}}/id/{{randomInt 1 1}}", &ctx(&env, &clock, &random)).unwrap();
        assert_eq!(result, "/region/eu/id/1");
    }

    #[test]
    fn env_default_falls_back_when_unset() {
        let env = FakeEnv::new();
        let clock = SystemClock;
        let random = SystemRandom;
        let result = evaluate("{{envDefault \"MISSING\" \"fallback\"}}", &ctx(&env, &clock, &random)).unwrap();
        assert_eq!(result, "fallback");
    }

    #[test]
    fn unterminated_expression_is_an_error() {
        let env = FakeEnv::new();
        let clock = SystemClock;
        let random = SystemRandom;
        assert!(evaluate("{{randomUUID", &ctx(&env, &clock, &random)).is_err());
    }

    #[test]
    fn unknown_function_short_circuits_the_whole_template() {
        let env = FakeEnv::new();
        let clock = SystemClock;
        let random = SystemRandom;
        assert!(evaluate("{{doesNotExist}}", &ctx(&env, &clock, &random)).is_err());
    }

    #[test]
    fn expand_value_recurses_through_objects_and_arrays() {
        let env = FakeEnv::new().with("USER", "alice");
        let clock = SystemClock;
        let random = SystemRandom;
        let body = serde_json::json!({
            "user": "{{env \"USER\"}}",
            "tags": ["a", "{{randomInt 2 2}}"],
            "count": 3,
            "active": true,
            "note": null,
        });
        let expanded = expand_value(&body, &ctx(&env, &clock, &random)).unwrap();
        assert_eq!(expanded["user"], "alice");
        assert_eq!(expanded["tags"][1], "2");
        assert_eq!(expanded["count"], 3);
        assert_eq!(expanded["active"], true);
        assert!(expanded["note"].is_null());
    }
}
