//! Shared primitives used across every MoxApp crate: clock and
//! randomness abstractions, environment access, the error
//! classification taxonomy, and the `RequestResult` outcome type.

pub mod clock;
pub mod env;
pub mod error;
pub mod request_result;

pub use clock::{Clock, RandomSource, SystemClock, SystemRandom};
pub use env::{EnvSource, FakeEnv, ProcessEnv};
pub use error::ErrorKind;
pub use request_result::RequestResult;
