//! LDAP filter construction
//!
//! Builds RFC 4515 equality filters from an attribute and a raw identifier.

use crate::error::{LookupError, LookupResult};

/// Build an equality filter `(field=value)`.
///
/// Both inputs are trimmed. The value is escaped so that filter syntax
/// characters in an identifier cannot alter the filter structure.
pub fn build_filter(field: &str, value: &str) -> LookupResult<String> {
    let field = field.trim();
    let value = value.trim();

    if field.is_empty() {
        return Err(LookupError::invalid_filter_input("filter attribute is empty"));
    }
    if value.is_empty() {
        return Err(LookupError::invalid_filter_input("filter value is empty"));
    }
    if !is_attribute_description(field) {
        return Err(LookupError::invalid_filter_input(format!(
            "invalid attribute name: {field}"
        )));
    }

    Ok(format!("({}={})", field, escape_filter_value(value)))
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Check an attribute description per RFC 4512: a descriptor
/// (`ALPHA *(ALPHA / DIGIT / "-")`) or a numeric OID, followed by
/// optional `;option` suffixes.
pub fn is_attribute_description(attr: &str) -> bool {
    let mut parts = attr.split(';');
    let oid = parts.next().unwrap_or_default();

    let is_descr = oid.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && oid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

    let is_numeric_oid = !oid.is_empty()
        && oid.split('.').all(|arc| {
            !arc.is_empty()
                && arc.chars().all(|c| c.is_ascii_digit())
                && (arc == "0" || !arc.starts_with('0'))
        });

    (is_descr || is_numeric_oid)
        && parts.all(|option| {
            !option.is_empty() && option.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
