// OPC UA test server for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2021 Alexander Schrode
use crate::constants::{
    DEFAULT_ENDPOINT_PATH, DEFAULT_PASSWORD, DEFAULT_SECURITY_DIRECTORY, DEFAULT_TCP_PORT,
    DEFAULT_USER, DISCOVERY_SUFFIX, PRODUCT_URI, SERVER_NAME,
};
use crate::error::ConfigError;
use log::info;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sizes the bulk namespace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestConfiguration {
    /// instances with scalar variables
    pub number_of_simple: u32,
    /// instances with array variables
    pub number_of_array: u32,
    /// length of every array variable
    pub array_size: u32,
}

impl TestConfiguration {
    pub fn new(number_of_simple: u32, number_of_array: u32, array_size: u32) -> Self {
        Self {
            number_of_simple,
            number_of_array,
            array_size,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_array > 0 && self.array_size == 0 {
            return Err(ConfigError::Invalid(
                "arraySize must be greater than 0 when numberOfArray is set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self::new(100, 10, 100)
    }
}

/// Sizes the simulation namespace
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfiguration {
    pub number_of_devices: u32,
}

impl SimulationConfiguration {
    pub fn new(number_of_devices: u32) -> Self {
        Self { number_of_devices }
    }
}

impl Default for SimulationConfiguration {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Endpoint and identity of the hosting server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfiguration {
    pub host: String,
    pub tcp_port: u16,
    pub application_name: String,
    pub application_uri: String,
    pub product_uri: String,
    /// Path of the session endpoints, the discovery endpoint lives below it
    pub endpoint_path: String,
    /// Holds the server keypair and the pki directory
    pub security_directory: PathBuf,
    /// User name to password, checked by the username token policy
    pub users: BTreeMap<String, String>,
}

impl ServerConfiguration {
    pub fn discovery_path(&self) -> String {
        format!("{}{}", self.endpoint_path.trim_end_matches('/'), DISCOVERY_SUFFIX)
    }

    pub fn pki_dir(&self) -> PathBuf {
        self.security_directory.join("pki")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "endpointPath must start with '/': {}",
                self.endpoint_path
            )));
        }
        if self.users.is_empty() {
            return Err(ConfigError::Invalid("at least one user is required".into()));
        }
        Ok(())
    }
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            tcp_port: DEFAULT_TCP_PORT,
            application_name: SERVER_NAME.into(),
            application_uri: PRODUCT_URI.into(),
            product_uri: PRODUCT_URI.into(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.into(),
            security_directory: PathBuf::from(DEFAULT_SECURITY_DIRECTORY),
            users: vec![(DEFAULT_USER.to_string(), DEFAULT_PASSWORD.to_string())]
                .into_iter()
                .collect(),
        }
    }
}

/// Complete configuration, read from a toml file with the sections
/// [server], [test] and [simulation]
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfiguration,
    pub test: TestConfiguration,
    pub simulation: SimulationConfiguration,
}

const ENV_NUMBER_OF_SIMPLE: &str = "OMP_OPCUA_MILO_TEST_NUMBER_OF_SIMPLE";
const ENV_NUMBER_OF_ARRAY: &str = "OMP_OPCUA_MILO_TEST_NUMBER_OF_ARRAY";
const ENV_ARRAY_SIZE: &str = "OMP_OPCUA_MILO_TEST_ARRAY_SIZE";
const ENV_NUMBER_OF_DEVICES: &str = "OMP_OPCUA_MILO_SIMULATION_NUMBER_OF_DEVICES";
const ENV_TCP_PORT: &str = "OMP_OPCUA_MILO_SERVER_TCP_PORT";

impl Configuration {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Self::read_file(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration {}", path.display());
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the file if given, then applies the environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like load, with the overrides taken from lookup. The result is
    /// validated once, after the overrides.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match path {
            Some(p) => Self::read_file(p)?,
            None => Self::default(),
        };
        cfg.apply_overrides(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overrides single values from a key lookup, normally the environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_value(&lookup, ENV_NUMBER_OF_SIMPLE, &mut self.test.number_of_simple)?;
        override_value(&lookup, ENV_NUMBER_OF_ARRAY, &mut self.test.number_of_array)?;
        override_value(&lookup, ENV_ARRAY_SIZE, &mut self.test.array_size)?;
        override_value(
            &lookup,
            ENV_NUMBER_OF_DEVICES,
            &mut self.simulation.number_of_devices,
        )?;
        override_value(&lookup, ENV_TCP_PORT, &mut self.server.tcp_port)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.test.validate()
    }
}

fn override_value<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{} has an invalid value: {}", key, raw)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_sections() -> Result<(), ConfigError> {
        let cfg = Configuration::from_toml_str(
            r#"
            [server]
            tcpPort = 4840

            [test]
            numberOfSimple = 2
            numberOfArray = 1
            arraySize = 4

            [simulation]
            numberOfDevices = 3
            "#,
        )?;
        assert_eq!(cfg.server.tcp_port, 4840);
        assert_eq!(cfg.server.product_uri, PRODUCT_URI);
        assert_eq!(cfg.test, TestConfiguration::new(2, 1, 4));
        assert_eq!(cfg.simulation.number_of_devices, 3);
        Ok(())
    }

    #[test]
    fn arrays_need_a_size() {
        let res = Configuration::from_toml_str("[test]\nnumberOfArray = 1\narraySize = 0\n");
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
        assert!(TestConfiguration::new(0, 0, 0).validate().is_ok());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let res = Configuration::from_toml_str("[test]\nnumberOfSimple = -1\n");
        assert!(matches!(res, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn overrides_replace_file_values() -> Result<(), ConfigError> {
        let env: HashMap<&str, &str> = [
            (ENV_NUMBER_OF_SIMPLE, "5"),
            (ENV_NUMBER_OF_DEVICES, " 2 "),
        ]
        .iter()
        .cloned()
        .collect();
        let mut cfg = Configuration::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()))?;
        assert_eq!(cfg.test.number_of_simple, 5);
        assert_eq!(cfg.simulation.number_of_devices, 2);
        assert_eq!(cfg.server.tcp_port, DEFAULT_TCP_PORT);

        let res = cfg.apply_overrides(|k| {
            if k == ENV_TCP_PORT {
                Some("not a port".to_string())
            } else {
                None
            }
        });
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn overrides_apply_before_validation() -> Result<(), ConfigError> {
        let path = std::env::temp_dir().join(format!("opcua-test-server-{}.toml", std::process::id()));
        fs::write(&path, "[test]\nnumberOfArray = 1\narraySize = 0\n")?;
        assert!(matches!(
            Configuration::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
        let cfg = Configuration::load_with(Some(&path), |k| {
            if k == ENV_ARRAY_SIZE {
                Some("8".to_string())
            } else {
                None
            }
        });
        let res = Configuration::load_with(Some(&path), |_| None);
        fs::remove_file(&path)?;
        assert_eq!(cfg?.test, TestConfiguration::new(100, 1, 8));
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn server_endpoints_and_users() -> Result<(), ConfigError> {
        let cfg = Configuration::default();
        assert_eq!(cfg.server.endpoint_path, "/milo");
        assert_eq!(cfg.server.discovery_path(), "/milo/discovery");
        assert_eq!(cfg.server.pki_dir(), Path::new("security").join("pki"));
        assert_eq!(
            cfg.server.users.get("milo").map(String::as_str),
            Some("the-power-of-open")
        );

        let cfg = Configuration::from_toml_str(
            r#"
            [server]
            endpointPath = "/test/"
            securityDirectory = "/var/lib/opcua"

            [server.users]
            alice = "secret"
            "#,
        )?;
        assert_eq!(cfg.server.discovery_path(), "/test/discovery");
        assert_eq!(cfg.server.pki_dir(), Path::new("/var/lib/opcua/pki"));
        assert_eq!(cfg.server.users.len(), 1);

        let res = Configuration::from_toml_str("[server]\nendpointPath = \"milo\"\n");
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
        let res = Configuration::from_toml_str("[server.users]\n");
        assert!(matches!(res, Err(ConfigError::Invalid(_))));
        Ok(())
    }
}
