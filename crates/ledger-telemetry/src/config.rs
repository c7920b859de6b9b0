//! Logging settings, read from `LC_*` variables the same way the node
//! reads its own configuration.

use std::env;

/// How the subscriber formats and filters events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Tag attached to the startup event, usually the node name.
    pub service_name: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub console_output: bool,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ledger-core".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source; unset or blank variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(name) = get("LC_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(level) = get("LC_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(value) = get("LC_CONSOLE_OUTPUT") {
            config.console_output = flag(&value);
        }
        if let Some(value) = get("LC_JSON_LOGS") {
            config.json_logs = flag(&value);
        }
        config
    }
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> TelemetryConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TelemetryConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_unset_variables_keep_defaults() {
        assert_eq!(from(&[]), TelemetryConfig::default());
        assert_eq!(from(&[("LC_LOG_LEVEL", "  ")]).log_level, "info");
    }

    #[test]
    fn test_variables_override() {
        let config = from(&[
            ("LC_SERVICE_NAME", "node-7"),
            ("LC_LOG_LEVEL", "lc_08_consensus=debug,info"),
            ("LC_JSON_LOGS", "TRUE"),
            ("LC_CONSOLE_OUTPUT", "0"),
        ]);
        assert_eq!(config.service_name, "node-7");
        assert_eq!(config.log_level, "lc_08_consensus=debug,info");
        assert!(config.json_logs);
        assert!(!config.console_output);
    }
}
