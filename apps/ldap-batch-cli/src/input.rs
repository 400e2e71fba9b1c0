//! Identifier list loading
//!
//! Identifiers are read one per line. Blank lines are kept so that failure
//! indexes line up with input lines; the engine skips them.

use std::io::Read;
use std::path::Path;

use crate::error::CliResult;

/// Read identifiers from a file, or from stdin when `path` is `None` or `-`.
pub fn read_identifiers(path: Option<&Path>) -> CliResult<Vec<String>> {
    let text = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)?,
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    Ok(split_identifiers(&text))
}

/// Split text into one identifier per line.
pub fn split_identifiers(text: &str) -> Vec<String> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(|line| line.trim().to_string())
        .collect()
}
