pub mod responder;
pub mod types;

pub use responder::InboundResponder;
pub use types::{InboundOutcome, InboundRequest};
