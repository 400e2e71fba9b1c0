//! Server properties file loading
//!
//! Reads the INI file describing the directory server and bind credentials,
//! with `LDAP_BATCH__<SECTION>__<KEY>` environment variables overriding it:
//!
//! ```ini
//! [server]
//! server = ldap.example.com
//! starttls = false
//! verify_certificate = true
//! connect_timeout = 30
//! search_timeout = 60
//!
//! [credentials]
//! username = cn=reader,dc=example,dc=com
//! password = secret
//! ```

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use ini::{Ini, ParseOption};
use ldap_batch::{ConnectionSettings, DirectoryConfig};
use serde::Deserialize;

use crate::error::{CliError, CliResult};

const ENV_PREFIX: &str = "LDAP_BATCH";

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    server: Option<String>,
    starttls: Option<bool>,
    verify_certificate: Option<bool>,
    connect_timeout: Option<u64>,
    search_timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsSection {
    username: Option<String>,
    password: Option<String>,
}

/// Parsed server properties.
#[derive(Debug, Default, Deserialize)]
pub struct ServerProperties {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    credentials: CredentialsSection,
}

impl ServerProperties {
    /// Load properties from an INI file, applying environment overrides.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let builder = Self::file_defaults(&text)?.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );
        Self::build(builder)
    }

    /// Parse properties from INI text.
    pub fn parse(text: &str) -> CliResult<Self> {
        Self::build(Self::file_defaults(text)?)
    }

    /// Seed a builder with the file's values, taken verbatim.
    ///
    /// Bind DNs escape commas with `\` and passwords may contain quotes, so
    /// neither escapes nor quotes are interpreted.
    fn file_defaults(text: &str) -> CliResult<ConfigBuilder<DefaultState>> {
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
        };
        let ini = Ini::load_from_str_opt(text, options)
            .map_err(|e| CliError::Config(format!("invalid properties file: {e}")))?;

        let mut builder = Config::builder();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            for (key, value) in properties.iter() {
                builder = builder.set_default(format!("{section}.{key}"), value)?;
            }
        }
        Ok(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> CliResult<Self> {
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Build the directory configuration.
    ///
    /// Absent required keys are passed through empty; the lookup engine
    /// reports them as missing fields.
    pub fn into_directory_config(self) -> DirectoryConfig {
        let mut connection = ConnectionSettings::default();
        if let Some(secs) = self.server.connect_timeout {
            connection = connection.with_connection_timeout(secs);
        }
        if let Some(secs) = self.server.search_timeout {
            connection = connection.with_search_timeout(secs);
        }

        let mut config = DirectoryConfig::new(
            self.server.server.unwrap_or_default(),
            self.credentials.username.unwrap_or_default(),
            self.credentials.password.unwrap_or_default(),
        )
        .with_connection(connection);

        config.use_starttls = self.server.starttls.unwrap_or(false);
        config.verify_certificate = self.server.verify_certificate.unwrap_or(true);
        config
    }
}
