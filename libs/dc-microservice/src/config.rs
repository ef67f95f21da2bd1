//! Layered application configuration.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. built-in defaults ([`AppConfig::default`])
//! 2. the YAML file passed on the command line, if any
//! 3. environment variables prefixed with `DC__`, nested with `__`
//!    (e.g. `DC__MICROSERVICE__TENANT_ID=acme`)
//!
//! Module sections stay raw JSON under `modules.<name>.config` and are typed
//! by the module itself through [`AppConfig::module_config_or_default`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::context::MicroserviceContext;
use crate::logging::LoggingConfig;

pub const ENV_PREFIX: &str = "DC__";
const ENV_SEPARATOR: &str = "__";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid config for module '{module}': {source}")]
    InvalidModuleConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config for module '{module}': {message}")]
    Invalid { module: String, message: String },

    #[error("failed to render configuration: {0}")]
    Render(String),
}

/// Keycloak endpoint shared by the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeycloakInfrastructure {
    pub hostname: String,
}

impl Default for KeycloakInfrastructure {
    fn default() -> Self {
        Self {
            hostname: "dc-keycloak".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfrastructureConfig {
    pub keycloak: KeycloakInfrastructure,
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub microservice: MicroserviceContext,
    pub infrastructure: InfrastructureConfig,
    pub logging: LoggingConfig,
    /// Raw per-module sections: `modules.<name>.config`.
    pub modules: BTreeMap<String, serde_json::Value>,
}

impl AppConfig {
    /// Load defaults, then `path` (if given), then `DC__*` environment overrides.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingFile`] if `path` does not exist, or
    /// [`ConfigError::Load`] if a source cannot be parsed into [`AppConfig`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR));

        let config: Self = figment.extract().map_err(Box::new)?;
        tracing::debug!(
            functional_area = %config.microservice.functional_area,
            tenant_id = %config.microservice.tenant_id,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Typed section for `module`, falling back to `T::default()`.
    ///
    /// - module absent, not an object, or without `config` → `Ok(T::default())`
    /// - `config` present but invalid → [`ConfigError::InvalidModuleConfig`]
    ///
    /// # Errors
    /// See above.
    pub fn module_config_or_default<T: DeserializeOwned + Default>(
        &self,
        module: &str,
    ) -> Result<T, ConfigError> {
        let Some(section) = self
            .modules
            .get(module)
            .and_then(serde_json::Value::as_object)
            .and_then(|obj| obj.get("config"))
        else {
            return Ok(T::default());
        };

        serde_json::from_value(section.clone()).map_err(|source| ConfigError::InvalidModuleConfig {
            module: module.to_owned(),
            source,
        })
    }

    /// Store a typed section under `modules.<module>.config`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Render`] if `config` cannot be represented as JSON.
    pub fn set_module_config<T: Serialize>(
        &mut self,
        module: &str,
        config: &T,
    ) -> Result<(), ConfigError> {
        let value = serde_json::to_value(config).map_err(|e| ConfigError::Render(e.to_string()))?;
        self.modules
            .insert(module.to_owned(), serde_json::json!({ "config": value }));
        Ok(())
    }

    /// Render as YAML. Secrets are redacted by their `Serialize` impls.
    ///
    /// # Errors
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self).map_err(|e| ConfigError::Render(e.to_string()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct SampleModuleConfig {
        retries: u32,
        label: String,
    }

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file_or_env() {
        temp_env::with_vars_unset(
            ["DC__MICROSERVICE__TENANT_ID", "DC__LOGGING__LEVEL"],
            || {
                let cfg = AppConfig::load(None).unwrap();
                assert_eq!(cfg.microservice, MicroserviceContext::default());
                assert_eq!(cfg.infrastructure.keycloak.hostname, "dc-keycloak");
                assert!(cfg.modules.is_empty());
            },
        );
    }

    #[test]
    fn yaml_overrides_defaults() {
        let file = write_yaml(
            r"
microservice:
  instance_id: inst1
  tenant_id: tenantA
infrastructure:
  keycloak:
    hostname: kc.internal
modules:
  sample:
    config:
      retries: 4
",
        );

        temp_env::with_vars_unset(["DC__MICROSERVICE__TENANT_ID"], || {
            let cfg = AppConfig::load(Some(file.path())).unwrap();
            assert_eq!(cfg.microservice.instance_id, "inst1");
            assert_eq!(cfg.microservice.tenant_id, "tenantA");
            assert_eq!(cfg.microservice.functional_area, "user-management");
            assert_eq!(cfg.infrastructure.keycloak.hostname, "kc.internal");

            let sample: SampleModuleConfig = cfg.module_config_or_default("sample").unwrap();
            assert_eq!(sample.retries, 4);
            assert_eq!(sample.label, "");
        });
    }

    #[test]
    fn env_overrides_yaml() {
        let file = write_yaml("microservice:\n  tenant_id: from-file\n");

        temp_env::with_var("DC__MICROSERVICE__TENANT_ID", Some("from-env"), || {
            let cfg = AppConfig::load(Some(file.path())).unwrap();
            assert_eq!(cfg.microservice.tenant_id, "from-env");
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let file = write_yaml("surprise: true\n");
        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn module_config_falls_back_to_default() {
        let mut cfg = AppConfig::default();
        cfg.modules
            .insert("no_config".to_owned(), serde_json::json!({ "other": 1 }));
        cfg.modules
            .insert("not_object".to_owned(), serde_json::json!("text"));

        for name in ["absent", "no_config", "not_object"] {
            let got: SampleModuleConfig = cfg.module_config_or_default(name).unwrap();
            assert_eq!(got, SampleModuleConfig::default(), "module {name}");
        }
    }

    #[test]
    fn invalid_module_config_is_reported() {
        let mut cfg = AppConfig::default();
        cfg.modules.insert(
            "sample".to_owned(),
            serde_json::json!({ "config": { "retries": "many" } }),
        );

        let err = cfg
            .module_config_or_default::<SampleModuleConfig>("sample")
            .unwrap_err();
        match err {
            ConfigError::InvalidModuleConfig { module, .. } => assert_eq!(module, "sample"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn yaml_rendering_contains_sections() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("microservice:"));
        assert!(yaml.contains("dc-keycloak"));
    }
}
