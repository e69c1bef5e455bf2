//! # Error Types
//!
//! This module defines error types used throughout the ticket-stamp library.

use thiserror::Error;

/// Main error type for ticket-stamp operations
#[derive(Debug, Error)]
pub enum TicketError {
    /// Background template could not be fetched or decoded
    #[error("Asset load failed: {0}")]
    AssetLoad(String),

    /// Font file could not be read or parsed
    #[error("Font error: {0}")]
    Font(String),

    /// PNG encoding or saving failed
    #[error("Export error: {0}")]
    Export(String),

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Export was requested before anything was drawn
    #[error("Nothing has been rendered yet")]
    NothingRendered,

    /// Server transport errors (bind, serve)
    #[error("Transport error: {0}")]
    Transport(String),
}
