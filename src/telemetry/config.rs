use std::collections::HashMap;

use strum::{Display, EnumString};

use crate::{parse_bool, TracingConfigError};

const DEFAULT_SAMPLE_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    #[default]
    None,
    Otlp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum OtlpProtocol {
    #[default]
    #[strum(serialize = "grpc")]
    Grpc,
    #[strum(to_string = "http/protobuf", serialize = "http")]
    HttpProtobuf,
}

/// Tracing settings carried in `K_CONFIG_TRACING`, a JSON object of strings:
///
/// ```json
/// {"backend": "otlp", "otlp-endpoint": "http://collector:4317", "sample-rate": "0.5"}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TracingConfig {
    pub backend: Backend,
    pub endpoint: Option<String>,
    pub protocol: OtlpProtocol,
    /// Sample every trace regardless of `sample_rate`.
    pub debug: bool,
    pub sample_rate: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            backend: Backend::None,
            endpoint: None,
            protocol: OtlpProtocol::Grpc,
            debug: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl TracingConfig {
    pub fn from_json(blob: &str) -> Result<Self, TracingConfigError> {
        if blob.trim().is_empty() {
            return Err(TracingConfigError::Empty);
        }
        let map: HashMap<String, String> = serde_json::from_str(blob)?;
        Self::from_map(&map)
    }

    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, TracingConfigError> {
        let mut config = Self::default();

        if let Some(backend) = map.get("backend") {
            config.backend = backend
                .parse()
                .map_err(|_| TracingConfigError::UnknownBackend(backend.clone()))?;
        }
        if let Some(protocol) = map.get("otlp-protocol") {
            config.protocol = protocol
                .parse()
                .map_err(|_| TracingConfigError::UnknownProtocol(protocol.clone()))?;
        }
        config.endpoint = map
            .get("otlp-endpoint")
            .filter(|e| !e.trim().is_empty())
            .cloned();
        if config.backend == Backend::Otlp && config.endpoint.is_none() {
            return Err(TracingConfigError::MissingEndpoint);
        }

        if let Some(debug) = map.get("debug") {
            config.debug = parse_bool(debug).ok_or_else(|| TracingConfigError::InvalidValue {
                key: "debug",
                value: debug.clone(),
            })?;
        }
        if let Some(rate) = map.get("sample-rate") {
            let rate: f64 = rate
                .trim()
                .parse()
                .map_err(|_| TracingConfigError::InvalidValue {
                    key: "sample-rate",
                    value: rate.clone(),
                })?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(TracingConfigError::SampleRateOutOfRange(rate));
            }
            config.sample_rate = rate;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_is_an_error() {
        assert!(matches!(
            TracingConfig::from_json("  "),
            Err(TracingConfigError::Empty)
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            TracingConfig::from_json("{backend: none"),
            Err(TracingConfigError::Json(_))
        ));
    }

    #[test]
    fn empty_object_is_the_noop_default() {
        let config = TracingConfig::from_json("{}").unwrap();
        assert_eq!(config, TracingConfig::default());
        assert_eq!(config.backend, Backend::None);
        assert_eq!(config.sample_rate, 0.1);
    }

    #[test]
    fn otlp_backend() {
        let config = TracingConfig::from_json(
            r#"{"backend":"otlp","otlp-endpoint":"http://collector:4318","otlp-protocol":"http/protobuf","debug":"true","sample-rate":"0.5"}"#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Otlp);
        assert_eq!(config.endpoint.as_deref(), Some("http://collector:4318"));
        assert_eq!(config.protocol, OtlpProtocol::HttpProtobuf);
        assert!(config.debug);
        assert_eq!(config.sample_rate, 0.5);
    }

    #[test]
    fn otlp_requires_endpoint() {
        assert!(matches!(
            TracingConfig::from_json(r#"{"backend":"otlp"}"#),
            Err(TracingConfigError::MissingEndpoint)
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            TracingConfig::from_json(r#"{"backend":"zipkin","zipkin-endpoint":"http://z"}"#),
            Err(TracingConfigError::UnknownBackend(b)) if b == "zipkin"
        ));
    }

    #[test]
    fn sample_rate_bounds() {
        assert!(matches!(
            TracingConfig::from_json(r#"{"sample-rate":"1.5"}"#),
            Err(TracingConfigError::SampleRateOutOfRange(_))
        ));
        assert!(matches!(
            TracingConfig::from_json(r#"{"sample-rate":"lots"}"#),
            Err(TracingConfigError::InvalidValue { key: "sample-rate", .. })
        ));
        assert_eq!(
            TracingConfig::from_json(r#"{"sample-rate":"1"}"#)
                .unwrap()
                .sample_rate,
            1.0
        );
    }

    #[test]
    fn protocol_names() {
        assert_eq!("http".parse::<OtlpProtocol>().unwrap(), OtlpProtocol::HttpProtobuf);
        assert_eq!(OtlpProtocol::HttpProtobuf.to_string(), "http/protobuf");
        assert_eq!(Backend::Otlp.to_string(), "otlp");
    }
}
