/// Failures from parsing or evaluating a `{{fn arg...}}` expression.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated template expression in '{0}'")]
    Unterminated(String),

    #[error("empty template expression")]
    EmptyExpression,

    #[error("unknown template function '{0}'")]
    UnknownFunction(String),

    #[error("invalid arguments to '{name}': {reason}")]
    InvalidArgs { name: String, reason: String },
}
