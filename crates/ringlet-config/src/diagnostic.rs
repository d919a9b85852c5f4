// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error types and rendering.

use thiserror::Error;

/// A configuration error surfaced at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration failed to parse or deserialize.
    #[error("config parse error: {message}")]
    Parse { message: String },

    /// A semantic constraint was violated after deserialization.
    #[error("config validation error: {message}")]
    Validation { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Parse {
            message: err.to_string(),
        }
    }
}

/// Render collected configuration errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    eprintln!("ringlet: configuration invalid ({} error(s))", errors.len());
    for err in errors {
        eprintln!("  - {err}");
    }
}
