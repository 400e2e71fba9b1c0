//! Scripted in-memory directory for engine tests.
//!
//! Records every open, search and close so tests can check the session
//! lifecycle and the exact sequence of filters issued.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ldap_batch::{
    DirectoryConfig, DirectorySession, LookupError, LookupResult, MatchEntry, SessionFactory,
    SessionState,
};
use tokio_util::sync::CancellationToken;

/// Canned response for one filter.
#[derive(Clone)]
pub enum Response {
    Entries(Vec<MatchEntry>),
    Rejected { rc: u32, message: String },
    Timeout,
    ConnectionLost,
}

/// How `open` should behave.
#[derive(Clone, Copy, Default)]
pub enum OpenBehavior {
    #[default]
    Succeed,
    Unreachable,
    BadCredentials,
}

/// One recorded search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub base: String,
    pub filter: String,
    pub attributes: Vec<String>,
}

#[derive(Default)]
pub struct Calls {
    pub opens: usize,
    pub closes: usize,
    pub searches: Vec<SearchCall>,
}

/// Session factory backed by scripted responses.
#[derive(Clone, Default)]
pub struct MockDirectory {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    calls: Arc<Mutex<Calls>>,
    open_behavior: OpenBehavior,
    cancel_after_searches: Option<(usize, CancellationToken)>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `filter` with the given entries.
    pub fn with_entries(self, filter: &str, entries: Vec<MatchEntry>) -> Self {
        self.with_response(filter, Response::Entries(entries))
    }

    /// Answer `filter` with a scripted response.
    pub fn with_response(self, filter: &str, response: Response) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(filter.to_string(), response);
        self
    }

    pub fn with_open_behavior(mut self, behavior: OpenBehavior) -> Self {
        self.open_behavior = behavior;
        self
    }

    /// Cancel `token` once `count` searches have been issued.
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after_searches = Some((count, token));
        self
    }

    pub fn opens(&self) -> usize {
        self.calls.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.calls.lock().unwrap().closes
    }

    pub fn searches(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().searches.clone()
    }

    pub fn filters(&self) -> Vec<String> {
        self.searches().into_iter().map(|call| call.filter).collect()
    }
}

#[async_trait]
impl SessionFactory for MockDirectory {
    type Session = MockSession;

    async fn open(&self, config: &DirectoryConfig) -> LookupResult<MockSession> {
        config.validate()?;

        match self.open_behavior {
            OpenBehavior::Succeed => {}
            OpenBehavior::Unreachable => {
                return Err(LookupError::connection(format!(
                    "Failed to connect to LDAP server at {}",
                    config.server_address
                )))
            }
            OpenBehavior::BadCredentials => {
                return Err(LookupError::Authentication {
                    message: format!("invalid credentials for {}", config.username),
                })
            }
        }

        self.calls.lock().unwrap().opens += 1;
        Ok(MockSession {
            directory: self.clone(),
            state: SessionState::Open,
        })
    }
}

pub struct MockSession {
    directory: MockDirectory,
    state: SessionState,
}

#[async_trait]
impl DirectorySession for MockSession {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[String],
    ) -> LookupResult<Vec<MatchEntry>> {
        if self.state != SessionState::Open {
            return Err(LookupError::InvalidState {
                operation: "search",
                state: self.state,
            });
        }

        let issued = {
            let mut calls = self.directory.calls.lock().unwrap();
            calls.searches.push(SearchCall {
                base: base.to_string(),
                filter: filter.to_string(),
                attributes: attributes.to_vec(),
            });
            calls.searches.len()
        };

        if let Some((count, token)) = &self.directory.cancel_after_searches {
            if issued >= *count {
                token.cancel();
            }
        }

        let response = self.directory.responses.lock().unwrap().get(filter).cloned();
        match response {
            None => Ok(Vec::new()),
            Some(Response::Entries(entries)) => Ok(entries),
            Some(Response::Rejected { rc, message }) => Err(LookupError::search(rc, message)),
            Some(Response::Timeout) => Err(LookupError::Timeout { timeout_secs: 1 }),
            Some(Response::ConnectionLost) => {
                self.state = SessionState::Closed;
                Err(LookupError::ConnectionLost {
                    message: "connection reset by peer".to_string(),
                    source: None,
                })
            }
        }
    }

    async fn close(&mut self) -> LookupResult<()> {
        self.directory.calls.lock().unwrap().closes += 1;
        self.state = SessionState::Closed;
        Ok(())
    }
}
