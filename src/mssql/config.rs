use std::fmt;

use tiberius::{AuthMethod, Config as TiberiusConfig, EncryptionLevel};

use crate::error::CatalogDbError;

pub const DEFAULT_PORT: u16 = 1433;

/// Environment keys read by [`MssqlOptions::from_env`].
pub const ENV_SERVER: &str = "CATALOG_DB_SERVER";
pub const ENV_DATABASE: &str = "CATALOG_DB_DATABASE";
pub const ENV_USER: &str = "CATALOG_DB_USER";
pub const ENV_PASSWORD: &str = "CATALOG_DB_PASSWORD";
pub const ENV_PORT: &str = "CATALOG_DB_PORT";
pub const ENV_INSTANCE: &str = "CATALOG_DB_INSTANCE";

/// Options for the SQL Server connection.
#[derive(Clone, PartialEq, Eq)]
pub struct MssqlOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub trust_cert: bool,
    pub encrypt: bool,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            server,
            database,
            user,
            password,
            port: None,
            instance_name: None,
            trust_cert: true,
            encrypt: false,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    /// Read options from the process environment.
    ///
    /// # Errors
    /// Returns `CatalogDbError::ConfigError` when a required key is missing
    /// or the port is not a number.
    pub fn from_env() -> Result<Self, CatalogDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MssqlOptions::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `CatalogDbError::ConfigError` when a required key is missing
    /// or the port is not a number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CatalogDbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CatalogDbError::ConfigError(format!("{key} is not set")))
        };
        let port = lookup(ENV_PORT)
            .map(|raw| {
                raw.parse::<u16>().map_err(|e| {
                    CatalogDbError::ConfigError(format!("{ENV_PORT}={raw:?} is not a port: {e}"))
                })
            })
            .transpose()?;

        Ok(Self::new(
            required(ENV_SERVER)?,
            required(ENV_DATABASE)?,
            required(ENV_USER)?,
            required(ENV_PASSWORD)?,
        )
        .with_port(port)
        .with_instance_name(lookup(ENV_INSTANCE).filter(|v| !v.is_empty())))
    }

    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

impl fmt::Debug for MssqlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MssqlOptions")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("instance_name", &self.instance_name)
            .field("trust_cert", &self.trust_cert)
            .field("encrypt", &self.encrypt)
            .finish()
    }
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            opts: MssqlOptions::new(server, database, user, password),
        }
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.opts.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.opts.encrypt = encrypt;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }
}

pub(crate) fn build_tiberius_config(opts: &MssqlOptions) -> TiberiusConfig {
    let mut config = TiberiusConfig::new();
    config.host(&opts.server);
    config.database(&opts.database);
    config.port(opts.port_or_default());
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    if let Some(instance) = &opts.instance_name {
        config.instance_name(instance);
    }
    if opts.trust_cert {
        config.trust_cert();
    }
    config.encryption(if opts.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    config
}
