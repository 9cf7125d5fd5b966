//! Configuration loading.
//!
//! A config file holds one [`DeploymentContext`] per target environment:
//!
//! ```json
//! {
//!   "defaultEnvironment": "dev",
//!   "environments": {
//!     "dev": {
//!       "accountId": "123456789012",
//!       "region": "us-east-1",
//!       "dataSourceUris": ["s3://rag-docs/manuals"]
//!     }
//!   }
//! }
//! ```
//!
//! Account and region may be left out of the file and supplied through
//! `RAGSTACK_ACCOUNT_ID` / `RAGSTACK_REGION` (or `CDK_DEFAULT_ACCOUNT` /
//! `CDK_DEFAULT_REGION`).

use crate::context::DeploymentContext;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Environment variables consulted for the account id, in priority order.
pub const ACCOUNT_ENV_VARS: [&str; 2] = ["RAGSTACK_ACCOUNT_ID", "CDK_DEFAULT_ACCOUNT"];

/// Environment variables consulted for the region, in priority order.
pub const REGION_ENV_VARS: [&str; 2] = ["RAGSTACK_REGION", "CDK_DEFAULT_REGION"];

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "ragstack.json";

/// The on-disk configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Environment used when none is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_environment: Option<String>,
    /// Settings per environment.
    #[serde(default)]
    pub environments: BTreeMap<String, DeploymentContext>,
}

impl ConfigFile {
    /// Parses a config file from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the expected shape.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_json_str(&text)
    }

    /// Returns the defined environment names.
    #[must_use]
    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    /// Selects the settings for an environment.
    ///
    /// Without a name, the file's default environment is used, or the only
    /// environment if exactly one is defined.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be resolved.
    pub fn select(&self, name: Option<&str>) -> Result<DeploymentContext, ConfigError> {
        let resolved = match name {
            Some(n) => n.to_string(),
            None => match (&self.default_environment, self.environments.len()) {
                (Some(default), _) => default.clone(),
                (None, 1) => self.environment_names().remove(0),
                _ => {
                    return Err(ConfigError::UnknownEnvironment {
                        name: "<default>".to_string(),
                        available: self.environment_names(),
                    })
                }
            },
        };

        let mut context = self
            .environments
            .get(&resolved)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: resolved.clone(),
                available: self.environment_names(),
            })?;
        context.environment = resolved;
        Ok(context)
    }
}

/// Fills account and region from environment variables.
///
/// Values from `lookup` override the file; the first variable that is set
/// and non-empty wins.
#[must_use]
pub fn apply_env_overrides<F>(mut context: DeploymentContext, lookup: F) -> DeploymentContext
where
    F: Fn(&str) -> Option<String>,
{
    let first_set = |vars: &[&str]| {
        vars.iter()
            .find_map(|v| lookup(*v).filter(|value| !value.trim().is_empty()))
    };

    if let Some(account) = first_set(&ACCOUNT_ENV_VARS[..]) {
        context.account_id = account;
    }
    if let Some(region) = first_set(&REGION_ENV_VARS[..]) {
        context.region = region;
    }
    context
}

/// Loads, selects, overrides from the process environment and validates.
///
/// # Errors
///
/// Returns an error if any step fails.
pub fn load_context(path: impl AsRef<Path>, environment: Option<&str>) -> Result<DeploymentContext, ConfigError> {
    let file = ConfigFile::load(path)?;
    let context = apply_env_overrides(file.select(environment)?, |v| std::env::var(v).ok());
    context.validate()?;
    Ok(context)
}
