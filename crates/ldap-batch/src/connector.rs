//! LDAP session implementation
//!
//! Implements the session traits on top of `ldap3`'s async client.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use crate::config::DirectoryConfig;
use crate::error::{LookupError, LookupResult};
use crate::session::{DirectorySession, MatchEntry, SessionFactory, SessionState};

/// LDAP result code: success.
const RC_SUCCESS: u32 = 0;
/// LDAP result code: sizeLimitExceeded (entries returned are still valid).
const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
/// LDAP result code: invalidCredentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: filterError.
const RC_FILTER_ERROR: u32 = 87;
/// LDAP result code: other.
const RC_OTHER: u32 = 80;

/// Opens authenticated sessions against an LDAP server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapSessionFactory;

impl LdapSessionFactory {
    /// Create a new session factory.
    pub fn new() -> Self {
        Self
    }

    fn conn_settings(config: &DirectoryConfig) -> LdapConnSettings {
        LdapConnSettings::new()
            .set_conn_timeout(config.connection.connection_timeout())
            .set_starttls(config.use_starttls)
            .set_no_tls_verify(!config.verify_certificate)
    }
}

#[async_trait]
impl SessionFactory for LdapSessionFactory {
    type Session = LdapSession;

    #[instrument(skip(self, config), fields(server = %config.server_address))]
    async fn open(&self, config: &DirectoryConfig) -> LookupResult<LdapSession> {
        config.validate()?;
        let url = config.url()?;

        if !config.verify_certificate {
            warn!("TLS certificate verification is disabled for this session");
        }

        debug!(url = %url, state = %SessionState::Opening, "Connecting to LDAP server");

        let (conn, mut ldap) = LdapConnAsync::with_settings(Self::conn_settings(config), &url)
            .await
            .map_err(|e| {
                LookupError::connection_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        debug!(username = %config.username, "Performing LDAP bind");

        let result = ldap
            .with_timeout(config.connection.connection_timeout())
            .simple_bind(&config.username, &config.password)
            .await
            .map_err(|e| {
                LookupError::connection_with_source(
                    format!("LDAP bind failed for {}", config.username),
                    e,
                )
            })?;

        if result.rc != RC_SUCCESS {
            // The handle is unusable; let the server drop the connection.
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind after failed bind");
            }

            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(LookupError::Authentication {
                    message: format!("invalid credentials for {}", config.username),
                });
            }
            return Err(LookupError::connection(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(url = %url, "LDAP session established");

        Ok(LdapSession {
            ldap: Some(ldap),
            state: SessionState::Open,
            search_timeout_secs: config.connection.search_timeout_secs,
        })
    }
}

/// An open LDAP session; exclusively owned by one batch run.
pub struct LdapSession {
    ldap: Option<Ldap>,
    state: SessionState,
    search_timeout_secs: u64,
}

impl LdapSession {
    /// Map an `ldap3` error raised during a search.
    ///
    /// Only transport failures tear the session down; the rest concern the
    /// current search alone.
    fn map_search_error(&mut self, err: LdapError) -> LookupError {
        match err {
            LdapError::Timeout { .. } => LookupError::Timeout {
                timeout_secs: self.search_timeout_secs,
            },
            LdapError::LdapResult { result } => LookupError::search(result.rc, result.text),
            LdapError::FilterParsing => {
                LookupError::search(RC_FILTER_ERROR, "malformed search filter")
            }
            err @ (LdapError::Io { .. }
            | LdapError::OpSend { .. }
            | LdapError::ResultRecv { .. }
            | LdapError::IdScrubSend { .. }
            | LdapError::MiscSend { .. }
            | LdapError::EndOfStream) => {
                // Nothing more can be sent over this connection.
                self.ldap = None;
                self.state = SessionState::Closed;
                LookupError::connection_lost_with_source("LDAP connection lost during search", err)
            }
            other => LookupError::search(RC_OTHER, other.to_string()),
        }
    }

    /// Accept or reject the final result of a search.
    ///
    /// sizeLimitExceeded still carries valid entries, so they are kept.
    fn check_search_result(result: &LdapResult, returned: usize) -> LookupResult<()> {
        match result.rc {
            RC_SUCCESS => Ok(()),
            RC_SIZE_LIMIT_EXCEEDED => {
                warn!(returned, "Size limit exceeded, result is partial");
                Ok(())
            }
            rc => Err(LookupError::search(rc, result.text.clone())),
        }
    }

    fn entry_from_search(entry: SearchEntry) -> MatchEntry {
        MatchEntry {
            dn: entry.dn,
            attrs: entry.attrs.into_iter().collect(),
            bin_attrs: entry.bin_attrs.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    fn state(&self) -> SessionState {
        self.state
    }

    #[instrument(skip(self, attributes))]
    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> LookupResult<Vec<MatchEntry>> {
        let ldap = match (&self.state, self.ldap.as_mut()) {
            (SessionState::Open, Some(ldap)) => ldap,
            _ => {
                return Err(LookupError::InvalidState {
                    operation: "search",
                    state: self.state,
                })
            }
        };

        if self.search_timeout_secs > 0 {
            ldap.with_timeout(std::time::Duration::from_secs(self.search_timeout_secs));
        }

        let result = ldap
            .search(base, Scope::Subtree, filter, attributes.to_vec())
            .await;

        let ldap3::SearchResult(entries, res) = match result {
            Ok(result) => result,
            Err(e) => return Err(self.map_search_error(e)),
        };

        Self::check_search_result(&res, entries.len())?;

        let entries: Vec<MatchEntry> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(Self::entry_from_search)
            .collect();

        debug!(entries = entries.len(), "LDAP search completed");

        Ok(entries)
    }

    async fn close(&mut self) -> LookupResult<()> {
        self.state = SessionState::Closed;

        if let Some(mut ldap) = self.ldap.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
            info!("LDAP session closed");
        }

        Ok(())
    }
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession")
            .field("state", &self.state)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .finish()
    }
}
