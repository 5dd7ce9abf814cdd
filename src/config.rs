use crate::AppError;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_FILE_PATH: &str = "/var/log/app.log";

/// Process configuration, resolved once from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub log_file_path: String,
    pub request_logging_enabled: bool,
    /// Raw `K_CONFIG_TRACING` blob. Parsed later so that a bad value only
    /// produces a warning once logging is up.
    pub tracing_config: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse().map_err(|_| AppError::Config {
                key: "PORT",
                value: value.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            log_file_path: lookup("LOG_FILE_PATH")
                .unwrap_or_else(|| DEFAULT_LOG_FILE_PATH.to_string()),
            request_logging_enabled: lookup("REQUEST_LOGGING_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            tracing_config: lookup("K_CONFIG_TRACING").unwrap_or_default(),
        })
    }
}

/// Parses the usual boolean spellings: `1 t T TRUE true True` and
/// `0 f F FALSE false False`. Anything else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_file_path, "/var/log/app.log");
        assert!(!config.request_logging_enabled);
        assert!(config.tracing_config.is_empty());
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("LOG_FILE_PATH", "/tmp/display.log"),
            ("REQUEST_LOGGING_ENABLED", "True"),
            ("K_CONFIG_TRACING", r#"{"backend":"none"}"#),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.log_file_path, "/tmp/display.log");
        assert!(config.request_logging_enabled);
        assert_eq!(config.tracing_config, r#"{"backend":"none"}"#);
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, AppError::Config { key: "PORT", .. }));
    }

    #[test]
    fn unparsable_request_logging_flag_is_off() {
        let config = Config::from_lookup(lookup(&[("REQUEST_LOGGING_ENABLED", "yes")])).unwrap();
        assert!(!config.request_logging_enabled);
    }

    #[test]
    fn bool_spellings() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        for v in ["", "yes", "tRUE", " true"] {
            assert_eq!(parse_bool(v), None, "{v}");
        }
    }
}
