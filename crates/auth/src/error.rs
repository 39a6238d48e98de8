/// Failures from token acquisition and refresh.
#[derive(Debug, thiserror::Error, Clone)]
pub enum AuthError {
    #[error("unknown auth config '{0}'")]
    UnknownAuth(String),

    #[error("auth '{0}' has no token endpoint configured")]
    NoTokenEndpoint(String),

    #[error("token endpoint request for '{0}' failed: {1}")]
    Request(String, String),

    #[error("token endpoint for '{0}' returned status {1}")]
    BadStatus(String, u16),

    #[error("token endpoint response for '{0}' is not valid JSON: {1}")]
    InvalidJson(String, String),

    #[error("token_path '{1}' not found or not a string in response for '{0}'")]
    MissingToken(String, String),

    #[error("no prior token for '{0}' and refresh failed: {1}")]
    NoPriorToken(String, String),
}
