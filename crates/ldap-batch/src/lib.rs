//! # LDAP Batch Lookup
//!
//! Looks up a batch of identifiers against an LDAP directory and returns one
//! row of requested attribute values per matching entry.
//!
//! A run opens exactly one authenticated session, issues one subtree search
//! per non-blank identifier in input order, and closes the session on every
//! path. Failed searches for single identifiers are recorded on the table and
//! do not stop the batch.
//!
//! ## Example
//!
//! ```ignore
//! use ldap_batch::{BatchLookup, DirectoryConfig, LdapSessionFactory, SearchSpec};
//!
//! let config = DirectoryConfig::new("ldap.example.com", "cn=reader,dc=example,dc=com", "secret");
//! let spec = SearchSpec::new("uid", "dc=example,dc=com", ["cn", "mail"]);
//!
//! let engine = BatchLookup::new(LdapSessionFactory::new());
//! let table = engine.run(&config, &spec, &["jdoe", "asmith"]).await?;
//!
//! for row in table.iter() {
//!     println!("{}", row.join(";"));
//! }
//! ```

pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod filter;
pub mod session;
pub mod table;

// Re-exports
pub use config::{ConnectionSettings, DirectoryConfig, SearchSpec};
pub use connector::{LdapSession, LdapSessionFactory};
pub use engine::BatchLookup;
pub use error::{LookupError, LookupResult};
pub use filter::build_filter;
pub use session::{DirectorySession, MatchEntry, SessionFactory, SessionState};
pub use table::{LookupFailure, ResultRow, ResultTable};

// Re-export the cancellation token accepted by `BatchLookup::run_with_cancellation`
pub use tokio_util::sync::CancellationToken;
