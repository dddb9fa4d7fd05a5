//! Process configuration, read once at startup and never mutated.
//!
//! Every required variable that is absent surfaces as a
//! [`ConfigError::MissingVar`] naming it, before any network call is made.
//! Nothing is silently defaulted except the documented optionals.

use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// ERP record category the inserted tasks land in.
pub const DEFAULT_ERP_ENTITY_ID: u32 = 70;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Which credential the CRM authentication step starts from.
#[derive(Debug, Clone)]
pub enum CrmAuth {
    /// OAuth refresh-token exchange on every run.
    Refresh {
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        refresh_token: String,
    },
    /// Pre-issued long-lived token; skips the exchange entirely.
    LongLived { token: String },
}

#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub subdomain: String,
    pub auth: CrmAuth,
    /// Replaces the `https://{subdomain}.amocrm.ru` origin; tests point
    /// this at a local mock server.
    pub base_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct ErpConfig {
    pub url: Url,
    pub key: String,
    pub username: String,
    pub password: String,
    pub entity_id: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub crm: CrmConfig,
    pub erp: ErpConfig,
    pub server: ServerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            crm: CrmConfig::from_vars(vars)?,
            erp: ErpConfig::from_vars(vars)?,
            server: ServerConfig::from_vars(vars),
        })
    }
}

impl CrmConfig {
    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        // A long-lived token takes precedence: deployments that issued one
        // have no refresh credentials at all.
        let auth = match optional(vars, "AMOCRM_LONG_LIVED_TOKEN") {
            Some(token) => CrmAuth::LongLived { token },
            None => CrmAuth::Refresh {
                client_id: required(vars, "AMOCRM_CLIENT_ID")?,
                client_secret: required(vars, "AMOCRM_CLIENT_SECRET")?,
                redirect_uri: required(vars, "AMOCRM_REDIRECT_URI")?,
                refresh_token: required(vars, "AMOCRM_REFRESH_TOKEN")?,
            },
        };
        Ok(Self {
            subdomain: required(vars, "AMOCRM_SUBDOMAIN")?,
            auth,
            base_url: None,
        })
    }
}

impl ErpConfig {
    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let url = required(vars, "ERP_API_URL")?;
        let url = Url::parse(&url).map_err(|e| ConfigError::InvalidVar {
            name: "ERP_API_URL",
            reason: e.to_string(),
        })?;
        let entity_id = match optional(vars, "ERP_ENTITY_ID") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                name: "ERP_ENTITY_ID",
                reason: format!("not an unsigned integer: {raw}"),
            })?,
            None => DEFAULT_ERP_ENTITY_ID,
        };
        Ok(Self {
            url,
            key: required(vars, "ERP_API_KEY")?,
            username: required(vars, "ERP_API_USERNAME")?,
            password: required(vars, "ERP_API_PASSWORD")?,
            entity_id,
        })
    }
}

impl ServerConfig {
    fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self {
            listen_addr: optional(vars, "LISTEN_ADDR")
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
        }
    }
}

fn required(
    vars: &HashMap<String, String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional(vars, name).ok_or(ConfigError::MissingVar(name))
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name).filter(|v| !v.is_empty()).cloned()
}
