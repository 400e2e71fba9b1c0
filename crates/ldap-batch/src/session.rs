//! Directory session abstraction
//!
//! One authenticated session per batch run. The engine only talks to the
//! directory through these traits, so tests can substitute an in-memory
//! directory for the LDAP-backed [`crate::connector::LdapSessionFactory`].

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::DirectoryConfig;
use crate::error::LookupResult;

/// Lifecycle of a directory session.
///
/// `Unopened -> Opening -> Open -> Closed`, or `Opening -> Failed` when the
/// connection or bind fails. Only `Open` accepts searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unopened,
    Opening,
    Open,
    Closed,
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unopened => write!(f, "unopened"),
            SessionState::Opening => write!(f, "opening"),
            SessionState::Open => write!(f, "open"),
            SessionState::Closed => write!(f, "closed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// A single entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEntry {
    /// Distinguished name of the entry.
    pub dn: String,

    /// Textual attributes. Their order is unspecified; look them up by name.
    pub attrs: Vec<(String, Vec<String>)>,

    /// Attributes whose values are not valid UTF-8.
    #[serde(default)]
    pub bin_attrs: Vec<(String, Vec<Vec<u8>>)>,
}

impl MatchEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Default::default()
        }
    }

    /// Add a single-valued attribute.
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_values(name, [value])
    }

    /// Add a multi-valued attribute.
    pub fn with_values<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    /// Add a binary attribute.
    pub fn with_binary(mut self, name: impl Into<String>, value: Vec<u8>) -> Self {
        self.bin_attrs.push((name.into(), vec![value]));
        self
    }

    /// Get the textual values of an attribute (case-insensitive name match).
    pub fn values(&self, name: &str) -> Option<&[String]> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Render an attribute as one cell.
    ///
    /// Multiple values are joined with `separator` in server order; binary
    /// values are base64-encoded. An absent attribute renders as `""`.
    pub fn project(&self, name: &str, separator: &str) -> String {
        if let Some(values) = self.values(name) {
            return values.join(separator);
        }

        self.bin_attrs
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, values)| {
                values
                    .iter()
                    .map(|v| base64::engine::general_purpose::STANDARD.encode(v))
                    .collect::<Vec<_>>()
                    .join(separator)
            })
            .unwrap_or_default()
    }
}

/// An open, authenticated directory session.
#[async_trait]
pub trait DirectorySession: Send {
    /// Current lifecycle state.
    fn state(&self) -> SessionState;

    /// Run one subtree search under `base`, returning only `attributes`.
    ///
    /// No matching entry is an empty result, not an error.
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> LookupResult<Vec<MatchEntry>>;

    /// Release the connection. Calling it again is a no-op.
    async fn close(&mut self) -> LookupResult<()>;
}

/// Opens directory sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: DirectorySession;

    /// Connect and bind. On failure no session exists and nothing needs closing.
    async fn open(&self, config: &DirectoryConfig) -> LookupResult<Self::Session>;
}
