//! YAML load/save for the on-disk configuration shape (§6.1).

use crate::entities::ConfigData;
use crate::error::ConfigError;
use std::path::Path;

/// Load configuration from a YAML file. A missing file yields
/// defaults (an empty configuration with the master switch on),
/// matching the store's "no watch-on-disk" model: the file is read
/// once at startup or on an explicit reload.
pub fn load_yaml(path: &Path) -> Result<ConfigData, ConfigError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        return Ok(ConfigData::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Serialize configuration to YAML and write it to `path`.
pub fn save_yaml(path: &Path, data: &ConfigData) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(data).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{HttpMethod, OutgoingEndpoint};
    use std::collections::HashMap;

    #[test]
    fn missing_file_yields_defaults() {
        let data = load_yaml(Path::new("/nonexistent/moxapp.yaml")).unwrap();
        assert!(data.global.enabled);
        assert!(data.outgoing_endpoints.is_empty());
    }

    #[test]
    fn round_trips_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moxapp.yaml");

        let mut data = ConfigData::default();
        data.global.global_multiplier = 2.5;
        data.outgoing_endpoints.push(OutgoingEndpoint {
            name: "checkout".into(),
            method: HttpMethod::Post,
            url_template: "https://api.example.com/checkout".into(),
            frequency: 30.0,
            headers: HashMap::new(),
            body: None,
            timeout: 10,
            auth: None,
            enabled: true,
            resolved_auth: None,
        });

        save_yaml(&path, &data).unwrap();
        let loaded = load_yaml(&path).unwrap();
        assert_eq!(loaded.global.global_multiplier, 2.5);
        assert_eq!(loaded.outgoing_endpoints.len(), 1);
        assert_eq!(loaded.outgoing_endpoints[0].name, "checkout");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moxapp.yaml");
        std::fs::write(&path, "enabled: true\nsome_future_key: 42\n").unwrap();
        let data = load_yaml(&path).unwrap();
        assert!(data.global.enabled);
    }
}
