//! The template evaluator (§4.2): a stateless, closed-grammar
//! expander for URL, header, and body templates.

pub mod error;
pub mod eval;
pub mod functions;

pub use error::TemplateError;
pub use eval::{evaluate, expand_value, TemplateContext};
pub use functions::TemplateFn;
