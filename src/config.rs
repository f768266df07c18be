//! Connector configuration
//!
//! Each connector is built from an immutable identity: its name, the
//! credentials it authenticates with and the location it reads from.
//! All configs can be loaded from environment variables (and a `.env`
//! file when present).

use crate::error::{Error, Result, require};
use std::env;

/// Default Graph API root.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// OAuth2 client-credentials for the Graph mail API.
#[derive(Debug, Clone)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// API root, `https://graph.microsoft.com/v1.0` unless overridden.
    pub api_base: String,
    /// Token endpoint; derived from the tenant when `None`.
    pub token_url: Option<String>,
}

impl GraphCredentials {
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base: GRAPH_API_BASE.to_string(),
            token_url: None,
        }
    }

    /// The OAuth2 token endpoint for this tenant.
    #[must_use]
    pub fn token_url(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first blank field.
    pub fn validate(&self) -> Result<()> {
        require(&self.client_id, "client_id")?;
        require(&self.client_secret, "client_secret")?;
        require(&self.tenant_id, "tenant_id")?;
        Ok(())
    }
}

/// Mailbox connector configuration.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub name: String,
    /// Mailbox owner, e.g. `ingest@contoso.com`.
    pub username: String,
    /// `/` or `\` separated folder path, `Inbox` when `None`.
    pub mail_folder: Option<String>,
    pub credentials: GraphCredentials,
}

impl MailboxConfig {
    /// Load mailbox configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `GRAPH_TENANT_ID`
    /// - `GRAPH_CLIENT_ID`
    /// - `GRAPH_CLIENT_SECRET`
    /// - `MAILBOX_USERNAME`
    ///
    /// Optional (with defaults):
    /// - `MAILBOX_NAME` (default: `mailbox`)
    /// - `MAILBOX_FOLDER` (default: `Inbox`)
    /// - `GRAPH_API_BASE` (default: `https://graph.microsoft.com/v1.0`)
    /// - `GRAPH_TOKEN_URL` (default: derived from the tenant)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut credentials = GraphCredentials::new(
            required("GRAPH_TENANT_ID")?,
            required("GRAPH_CLIENT_ID")?,
            required("GRAPH_CLIENT_SECRET")?,
        );
        if let Some(base) = optional("GRAPH_API_BASE") {
            credentials.api_base = base;
        }
        credentials.token_url = optional("GRAPH_TOKEN_URL");

        Ok(Self {
            name: optional("MAILBOX_NAME").unwrap_or_else(|| "mailbox".to_string()),
            username: required("MAILBOX_USERNAME")?,
            mail_folder: optional("MAILBOX_FOLDER"),
            credentials,
        })
    }
}

/// SFTP connector configuration.
#[derive(Debug, Clone)]
pub struct SftpConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub remote_folder: String,
}

impl SftpConfig {
    /// Default SSH port.
    pub const DEFAULT_PORT: u16 = 22;

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first blank field.
    pub fn validate(&self) -> Result<()> {
        require(&self.name, "name")?;
        require(&self.host, "host")?;
        require(&self.username, "username")?;
        require(&self.password, "password")?;
        require(&self.remote_folder, "remote_folder")?;
        Ok(())
    }

    /// Load SFTP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `SFTP_HOST`
    /// - `SFTP_USERNAME`
    /// - `SFTP_PASSWORD`
    /// - `SFTP_FOLDER`
    ///
    /// Optional (with defaults):
    /// - `SFTP_NAME` (default: `sftp`)
    /// - `SFTP_PORT` (default: `22`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            name: optional("SFTP_NAME").unwrap_or_else(|| "sftp".to_string()),
            host: required("SFTP_HOST")?,
            port: optional("SFTP_PORT")
                .map_or(Ok(Self::DEFAULT_PORT), |port| port.parse::<u16>())
                .map_err(|e| Error::Config(format!("Invalid SFTP_PORT: {e}")))?,
            username: required("SFTP_USERNAME")?,
            password: required("SFTP_PASSWORD")?,
            remote_folder: required("SFTP_FOLDER")?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| Error::Config(format!("{key} not set")))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
