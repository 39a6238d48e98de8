//! The live configuration store: entities, normalization, structural
//! validation, YAML load/save, and thread-safe CRUD.

pub mod entities;
pub mod error;
pub mod file;
pub mod normalize;
pub mod store;
pub mod validate;

pub use entities::{
    AuthConfig, AuthRef, AuthType, ConfigData, GlobalSettings, HttpMethod, InboundRoute,
    OutgoingEndpoint, ResponseSpec, TokenEndpoint,
};
pub use error::ConfigError;
pub use store::ConfigStore;
