//! Test helpers for batch lookup integration tests.
//!
//! This module provides:
//! - A scripted, instrumented mock directory
//! - Common configuration and entry fixtures

#![allow(dead_code)]

pub mod mock_directory;

use ldap_batch::{DirectoryConfig, MatchEntry, SearchSpec};

pub fn test_config() -> DirectoryConfig {
    DirectoryConfig::new("ldap.example.com", "u", "p")
}

pub fn test_spec() -> SearchSpec {
    SearchSpec::new("uid", "dc=example,dc=com", ["cn", "mail"])
}

pub fn person(uid: &str, cn: &str, mail: &str) -> MatchEntry {
    MatchEntry::new(format!("uid={uid},ou=people,dc=example,dc=com"))
        .with("uid", uid)
        .with("cn", cn)
        .with("mail", mail)
}

pub fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
