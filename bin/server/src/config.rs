//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`WORKFLOW__APPROVAL_POLICY`, `AUTHZ__MODE`).

use pmo_tracker_workflow::ApprovalPolicy;
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Workflow configuration.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Authorization configuration.
    #[serde(default)]
    pub authz: AuthzConfig,
}

/// Workflow-related configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowConfig {
    /// How many review stages a submitted project goes through.
    #[serde(default)]
    pub approval_policy: ApprovalPolicy,
}

/// Which permission oracle answers capability checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthzMode {
    /// Capabilities follow the user's role in the users table.
    #[default]
    Roles,
    /// Capabilities are checked against SpiceDB.
    ///
    /// Role relationships are written once at startup from the users
    /// table and never removed. Users added or re-roled afterwards keep
    /// their old capabilities until the server restarts.
    Spicedb,
}

/// Authorization configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfig {
    #[serde(default)]
    pub mode: AuthzMode,
    /// SpiceDB gRPC endpoint, required in `spicedb` mode.
    pub spicedb_endpoint: Option<String>,
    /// SpiceDB preshared key, required in `spicedb` mode.
    pub spicedb_preshared_key: Option<String>,
}

/// SpiceDB connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpicedbSettings {
    pub endpoint: String,
    pub preshared_key: String,
}

impl AuthzConfig {
    /// Returns the SpiceDB settings when running in `spicedb` mode.
    ///
    /// # Errors
    ///
    /// Returns an error if `spicedb` mode is selected without an endpoint
    /// or preshared key.
    pub fn spicedb(&self) -> Result<Option<SpicedbSettings>, config::ConfigError> {
        if self.mode != AuthzMode::Spicedb {
            return Ok(None);
        }
        let endpoint = self.spicedb_endpoint.clone().ok_or_else(|| {
            config::ConfigError::Message(
                "AUTHZ__SPICEDB_ENDPOINT is required in spicedb mode".to_string(),
            )
        })?;
        let preshared_key = self.spicedb_preshared_key.clone().ok_or_else(|| {
            config::ConfigError::Message(
                "AUTHZ__SPICEDB_PRESHARED_KEY is required in spicedb mode".to_string(),
            )
        })?;
        Ok(Some(SpicedbSettings {
            endpoint,
            preshared_key,
        }))
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(source: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(source.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.authz.spicedb()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let env = config::Environment::default().source(Some(
            vars.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        ServerConfig::from_source(env)
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/pmo")]).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/pmo");
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.workflow.approval_policy, ApprovalPolicy::TwoStage);
        assert_eq!(config.authz.mode, AuthzMode::Roles);
        assert_eq!(config.authz.spicedb().unwrap(), None);
    }

    #[test]
    fn nested_keys_use_double_underscore() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/pmo"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("WORKFLOW__APPROVAL_POLICY", "single_stage"),
            ("AUTHZ__MODE", "spicedb"),
            ("AUTHZ__SPICEDB_ENDPOINT", "http://localhost:50051"),
            ("AUTHZ__SPICEDB_PRESHARED_KEY", "secret"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.workflow.approval_policy, ApprovalPolicy::SingleStage);
        assert_eq!(
            config.authz.spicedb().unwrap(),
            Some(SpicedbSettings {
                endpoint: "http://localhost:50051".to_string(),
                preshared_key: "secret".to_string(),
            })
        );
    }

    #[test]
    fn spicedb_mode_requires_endpoint() {
        let err = load(&[
            ("DATABASE_URL", "postgres://localhost/pmo"),
            ("AUTHZ__MODE", "spicedb"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("AUTHZ__SPICEDB_ENDPOINT"));
    }

    #[test]
    fn database_url_is_required() {
        assert!(load(&[]).is_err());
    }
}
