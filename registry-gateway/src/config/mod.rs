//! Process configuration, read once from the environment at startup.
//!
//! The resulting [`Settings`] value is immutable; it is handed to the
//! application builder and cloned into the components that need it.

use secrecy::Secret;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const REGISTRY_URL_VAR: &str = "HARBORURL";
pub const REGISTRY_ADMIN_VAR: &str = "HARBOR_ADMIN";
pub const REGISTRY_PASSWORD_VAR: &str = "HARBOR_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub registry: RegistrySettings,
    pub provisioning: ProvisioningSettings,
    pub telemetry: TelemetrySettings,
    pub service_name: String,
}

#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Registry endpoint and the administrative principal used for every call.
#[derive(Clone, Debug)]
pub struct RegistrySettings {
    pub url: String,
    pub username: String,
    pub password: Secret<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ProvisioningSettings {
    pub robot_name_prefix: String,
}

#[derive(Clone, Debug)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

/// Flat view of the environment as seen by the `config` crate.
#[derive(Deserialize, Default)]
struct RawEnv {
    #[serde(alias = "HARBORURL")]
    harborurl: Option<String>,
    #[serde(alias = "HARBOR_ADMIN")]
    harbor_admin: Option<String>,
    #[serde(alias = "HARBOR_PASSWORD")]
    harbor_password: Option<String>,
    #[serde(alias = "GATEWAY_HOST")]
    gateway_host: Option<String>,
    #[serde(alias = "GATEWAY_PORT")]
    gateway_port: Option<u16>,
    #[serde(alias = "REGISTRY_TIMEOUT_SECS")]
    registry_timeout_secs: Option<u64>,
    #[serde(alias = "ROBOT_NAME_PREFIX")]
    robot_name_prefix: Option<String>,
    #[serde(alias = "LOG_LEVEL")]
    log_level: Option<String>,
    #[serde(alias = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otel_exporter_otlp_endpoint: Option<String>,
}

impl Settings {
    /// Loads settings from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load(None)
    }

    /// Loads settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Some(vars.into_iter().collect()))
    }

    fn load(source: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        let raw: RawEnv = config::Config::builder()
            .add_source(config::Environment::default().source(source))
            .build()?
            .try_deserialize()?;

        let url = required(raw.harborurl, REGISTRY_URL_VAR)?;
        let username = required(raw.harbor_admin, REGISTRY_ADMIN_VAR)?;
        let password = required(raw.harbor_password, REGISTRY_PASSWORD_VAR)?;

        Ok(Self {
            server: ServerSettings {
                host: raw.gateway_host.unwrap_or_else(|| "0.0.0.0".to_string()),
                port: raw.gateway_port.unwrap_or(4001),
            },
            registry: RegistrySettings {
                url,
                username,
                password: Secret::new(password),
                timeout: Duration::from_secs(raw.registry_timeout_secs.unwrap_or(30)),
            },
            provisioning: ProvisioningSettings {
                robot_name_prefix: raw.robot_name_prefix.unwrap_or_else(|| "gw-".to_string()),
            },
            telemetry: TelemetrySettings {
                log_level: raw
                    .log_level
                    .unwrap_or_else(|| "info,registry_gateway=debug".to_string()),
                otlp_endpoint: raw.otel_exporter_otlp_endpoint.filter(|s| !s.is_empty()),
            },
            service_name: "registry-gateway".to_string(),
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("HARBORURL", "https://harbor.internal"),
            ("HARBOR_ADMIN", "admin"),
            ("HARBOR_PASSWORD", "Harbor12345"),
        ]
    }

    #[test]
    fn loads_required_values_with_defaults() {
        let settings = Settings::from_vars(vars(&required_vars())).unwrap();

        assert_eq!(settings.registry.url, "https://harbor.internal");
        assert_eq!(settings.registry.username, "admin");
        assert_eq!(settings.registry.password.expose_secret(), "Harbor12345");
        assert_eq!(settings.registry.timeout, Duration::from_secs(30));
        assert_eq!(settings.server.port, 4001);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.provisioning.robot_name_prefix, "gw-");
        assert!(settings.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn each_required_variable_is_enforced() {
        for missing in [REGISTRY_URL_VAR, REGISTRY_ADMIN_VAR, REGISTRY_PASSWORD_VAR] {
            let pairs: Vec<_> = required_vars()
                .into_iter()
                .filter(|(k, _)| *k != missing)
                .collect();

            match Settings::from_vars(vars(&pairs)) {
                Err(ConfigError::Missing(name)) => assert_eq!(name, missing),
                other => panic!("expected Missing({missing}), got {other:?}"),
            }
        }
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut pairs = required_vars();
        pairs[2] = ("HARBOR_PASSWORD", "   ");

        assert!(matches!(
            Settings::from_vars(vars(&pairs)),
            Err(ConfigError::Missing(REGISTRY_PASSWORD_VAR))
        ));
    }

    #[test]
    fn optional_overrides_are_applied() {
        let mut pairs = required_vars();
        pairs.extend([
            ("GATEWAY_PORT", "8088"),
            ("REGISTRY_TIMEOUT_SECS", "5"),
            ("ROBOT_NAME_PREFIX", "ci-"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://tempo:4317"),
        ]);

        let settings = Settings::from_vars(vars(&pairs)).unwrap();

        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.registry.timeout, Duration::from_secs(5));
        assert_eq!(settings.provisioning.robot_name_prefix, "ci-");
        assert_eq!(
            settings.telemetry.otlp_endpoint.as_deref(),
            Some("http://tempo:4317")
        );
    }
}
