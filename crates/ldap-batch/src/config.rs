//! Batch lookup configuration
//!
//! Connection/credential data for the directory server and the search
//! specification applied to every identifier of a run.

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, LookupResult};
use crate::filter::is_attribute_description;

/// Connection and credential settings for one directory server.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// LDAP URL (`ldap://`, `ldaps://`, `ldapi://`) or bare `host[:port]`.
    pub server_address: String,

    /// Bind DN or user principal used for the simple bind.
    pub username: String,

    /// Bind password.
    pub password: String,

    /// Upgrade a plain `ldap://` connection with STARTTLS.
    #[serde(default)]
    pub use_starttls: bool,

    /// Verify the server certificate on TLS connections.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .field("use_starttls", &self.use_starttls)
            .field("verify_certificate", &self.verify_certificate)
            .field("connection", &self.connection)
            .finish()
    }
}

fn default_true() -> bool {
    true
}

const DEFAULT_LDAP_PORT: u16 = 389;

impl DirectoryConfig {
    /// Create a new directory config with required fields.
    pub fn new(
        server_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_address: server_address.into(),
            username: username.into(),
            password: password.into(),
            use_starttls: false,
            verify_certificate: true,
            connection: ConnectionSettings::default(),
        }
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Disable server certificate verification.
    #[must_use]
    pub fn without_certificate_verification(mut self) -> Self {
        self.verify_certificate = false;
        self
    }

    /// Replace the connection settings.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Validate that every required field is present and the address is usable.
    pub fn validate(&self) -> LookupResult<()> {
        let required = [
            ("server_address", &self.server_address),
            ("username", &self.username),
            ("password", &self.password),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(LookupError::missing_field(name));
            }
        }

        let url = self.url()?;
        if self.use_starttls && !url.starts_with("ldap://") {
            return Err(LookupError::configuration(
                "STARTTLS requires a plain ldap:// server address",
            ));
        }

        Ok(())
    }

    /// Get the LDAP URL for the server address.
    ///
    /// A bare `host` becomes `ldap://host:389`, `host:port` becomes
    /// `ldap://host:port`; explicit LDAP URLs are kept as given.
    pub fn url(&self) -> LookupResult<String> {
        let address = self.server_address.trim();
        if address.is_empty() {
            return Err(LookupError::missing_field("server_address"));
        }

        if let Some((scheme, rest)) = address.split_once("://") {
            return match scheme.to_ascii_lowercase().as_str() {
                "ldap" | "ldaps" | "ldapi" if !rest.is_empty() => Ok(address.to_string()),
                "ldap" | "ldaps" | "ldapi" => Err(LookupError::configuration(format!(
                    "server address has no host: {address}"
                ))),
                other => Err(LookupError::configuration(format!(
                    "unsupported server address scheme: {other}"
                ))),
            };
        }

        if address.contains(char::is_whitespace) || address.contains('/') {
            return Err(LookupError::configuration(format!(
                "malformed server address: {address}"
            )));
        }

        let malformed = || LookupError::configuration(format!("malformed server address: {address}"));
        let (host, port) = match address.strip_prefix('[') {
            Some(rest) => {
                let (inner, after) = rest.split_once(']').ok_or_else(malformed)?;
                let port = match after {
                    "" => None,
                    _ => Some(after.strip_prefix(':').ok_or_else(malformed)?),
                };
                (format!("[{inner}]"), port)
            }
            None => match address.split_once(':') {
                Some((host, port)) => (host.to_string(), Some(port)),
                None => (address.to_string(), None),
            },
        };

        if host.is_empty() || host == "[]" {
            return Err(malformed());
        }

        match port {
            None => Ok(format!("ldap://{host}:{DEFAULT_LDAP_PORT}")),
            Some(port) => {
                let port: u16 = port.parse().map_err(|_| {
                    LookupError::configuration(format!("invalid port in server address: {address}"))
                })?;
                Ok(format!("ldap://{host}:{port}"))
            }
        }
    }
}

/// Timeouts applied to the directory session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Per-search timeout in seconds (0 disables the limit).
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_search_timeout() -> u64 {
    60
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            search_timeout_secs: default_search_timeout(),
        }
    }
}

impl ConnectionSettings {
    /// Set the connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the search timeout.
    #[must_use]
    pub fn with_search_timeout(mut self, secs: u64) -> Self {
        self.search_timeout_secs = secs;
        self
    }

    /// Get connection timeout as Duration.
    pub fn connection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get search timeout as Duration, if one is configured.
    pub fn search_timeout(&self) -> Option<std::time::Duration> {
        (self.search_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.search_timeout_secs))
    }
}

/// What to match on, where to search and which attributes to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    /// Attribute the identifiers are matched against.
    pub field: String,

    /// Search base DN; every search covers its whole subtree.
    pub base: String,

    /// Attributes to return, in output column order.
    pub attributes: Vec<String>,

    /// Separator used when an attribute has more than one value.
    #[serde(default = "default_multi_value_separator")]
    pub multi_value_separator: String,
}

fn default_multi_value_separator() -> String {
    "|".to_string()
}

impl SearchSpec {
    /// Create a new search spec.
    pub fn new<I, S>(field: impl Into<String>, base: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            base: base.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            multi_value_separator: default_multi_value_separator(),
        }
    }

    /// Set the multi-value separator.
    pub fn with_multi_value_separator(mut self, separator: impl Into<String>) -> Self {
        self.multi_value_separator = separator.into();
        self
    }

    /// Split a comma-separated attribute list, trimming each name.
    pub fn parse_attributes(list: &str) -> Vec<String> {
        list.split(',').map(|attr| attr.trim().to_string()).collect()
    }

    /// Validate the spec before any session is opened.
    pub fn validate(&self) -> LookupResult<()> {
        let field = self.field.trim();
        if field.is_empty() {
            return Err(LookupError::invalid_spec("search field is required"));
        }
        if !is_attribute_description(field) {
            return Err(LookupError::invalid_spec(format!(
                "search field is not a valid attribute name: {field}"
            )));
        }

        if self.base.trim().is_empty() {
            return Err(LookupError::invalid_spec("search base is required"));
        }

        if self.attributes.is_empty() {
            return Err(LookupError::invalid_spec(
                "at least one search attribute is required",
            ));
        }
        if let Some(pos) = self.attributes.iter().position(|a| a.trim().is_empty()) {
            return Err(LookupError::invalid_spec(format!(
                "search attribute #{} is empty",
                pos + 1
            )));
        }

        Ok(())
    }

    /// Attributes requested and emitted, in column order.
    ///
    /// The match field always comes first, even when the caller also listed
    /// it among the attributes; duplicates are kept.
    pub fn effective_attributes(&self) -> Vec<String> {
        std::iter::once(&self.field)
            .chain(self.attributes.iter())
            .map(|attr| attr.trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DirectoryConfig {
        DirectoryConfig::new("ldap.example.com", "cn=reader,dc=example,dc=com", "secret")
    }

    #[test]
    fn test_directory_config_new() {
        let config = config();

        assert_eq!(config.server_address, "ldap.example.com");
        assert!(!config.use_starttls);
        assert!(config.verify_certificate);
        assert_eq!(config.connection.connection_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_are_configuration_errors() {
        let cases = [
            (DirectoryConfig::new("", "u", "p"), "server_address"),
            (DirectoryConfig::new("ldap.example.com", " ", "p"), "username"),
            (DirectoryConfig::new("ldap.example.com", "u", ""), "password"),
        ];

        for (config, field) in cases {
            let err = config.validate().unwrap_err();
            assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
            assert!(err.to_string().contains(field), "{err} should name {field}");
        }
    }

    #[test]
    fn test_url_normalisation() {
        assert_eq!(config().url().unwrap(), "ldap://ldap.example.com:389");

        let mut config = config();
        config.server_address = "ldap.example.com:10389".to_string();
        assert_eq!(config.url().unwrap(), "ldap://ldap.example.com:10389");

        config.server_address = "ldaps://ldap.example.com".to_string();
        assert_eq!(config.url().unwrap(), "ldaps://ldap.example.com");

        config.server_address = "[2001:db8::1]".to_string();
        assert_eq!(config.url().unwrap(), "ldap://[2001:db8::1]:389");

        config.server_address = "[2001:db8::1]:636".to_string();
        assert_eq!(config.url().unwrap(), "ldap://[2001:db8::1]:636");
    }

    #[test]
    fn test_url_rejects_unknown_scheme_and_bad_port() {
        let mut config = config();
        config.server_address = "http://ldap.example.com".to_string();
        assert!(config.validate().is_err());

        config.server_address = "ldap.example.com:notaport".to_string();
        assert!(config.validate().is_err());

        config.server_address = "ldap://".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_starttls_requires_plain_ldap() {
        let mut config = config().with_starttls();
        assert!(config.validate().is_ok());

        config.server_address = "ldaps://ldap.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", config());
        assert!(debug.contains("***REDACTED***"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_search_timeout_zero_disables_limit() {
        let settings = ConnectionSettings::default().with_search_timeout(0);
        assert!(settings.search_timeout().is_none());

        let settings = settings.with_search_timeout(5);
        assert_eq!(settings.search_timeout(), Some(std::time::Duration::from_secs(5)));
    }

    #[test]
    fn test_effective_attributes_prepends_field() {
        let spec = SearchSpec::new("uid", "dc=example,dc=com", ["cn", "mail"]);
        assert_eq!(spec.effective_attributes(), vec!["uid", "cn", "mail"]);
    }

    #[test]
    fn test_effective_attributes_keeps_duplicates() {
        let spec = SearchSpec::new("uid", "dc=example,dc=com", ["uid", "cn"]);
        assert_eq!(spec.effective_attributes(), vec!["uid", "uid", "cn"]);
    }

    #[test]
    fn test_parse_attributes_trims_names() {
        assert_eq!(SearchSpec::parse_attributes("attr1, attr2"), vec!["attr1", "attr2"]);
        assert_eq!(SearchSpec::parse_attributes("cn"), vec!["cn"]);
    }

    #[test]
    fn test_search_spec_validation() {
        assert!(SearchSpec::new("uid", "dc=example,dc=com", ["cn"]).validate().is_ok());

        let invalid = [
            SearchSpec::new("", "dc=example,dc=com", ["cn"]),
            SearchSpec::new("uid", "  ", ["cn"]),
            SearchSpec::new("uid", "dc=example,dc=com", Vec::<String>::new()),
            SearchSpec::new("uid", "dc=example,dc=com", ["cn", ""]),
            SearchSpec::new("u id", "dc=example,dc=com", ["cn"]),
        ];
        for spec in invalid {
            let err = spec.validate().unwrap_err();
            assert_eq!(err.error_code(), "INVALID_SPEC", "{spec:?}");
        }
    }

    #[test]
    fn test_search_spec_serialization_defaults_separator() {
        let json = r#"{"field":"uid","base":"dc=example,dc=com","attributes":["cn"]}"#;
        let spec: SearchSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.multi_value_separator, "|");
    }
}
