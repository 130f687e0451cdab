//! # Gateway Error Handling
//!
//! Defines the [`GatewayError`] enum, which represents the different error
//! types that can occur across the gateway's components. Mirrors the
//! taxonomy in spec.md §7: user errors are not represented here (they are
//! returned as localized rejection text, never as a `Result::Err`) —
//! this enum covers store, transport, and remote-API faults only.

use thiserror::Error;

/// Represents the different error types that can occur in the gateway crate.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A SQLite-backed store operation failed.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The configured serial port could not be opened or read from.
    #[error("transport error: {0}")]
    Transport(String),

    /// The Notes API or reverse geocoder returned an unusable response.
    #[error("remote API error: {0}")]
    Remote(String),

    /// The HTTP client itself failed (timeout, connection refused, DNS).
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A required environment setting was missing or unparsable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A catch-all for uncategorized cases, consistent with the "Other"
    /// fallback the teacher crate's error enum carries.
    #[error("other error: {0}")]
    Other(String),
}
