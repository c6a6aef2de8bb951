//! Error types for the relay controller.
//!
//! # Design
//! The wire codec never fails: malformed pairs are dropped and absent fields
//! leave the call untouched. Errors only surface where the controller talks
//! to its own registry or to the host page, plus handshake parsing on the
//! relay-document side.

use thiserror::Error;

use crate::relay::SessionId;

/// Errors returned by `RelayController` and `Handshake::parse`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No live session is registered under this id. It either never existed,
    /// already completed, or was cancelled.
    #[error("unknown relay session {0}")]
    UnknownSession(SessionId),

    /// The call is missing a field that `initialize` needs.
    #[error("call state is missing {0}")]
    MissingField(&'static str),

    /// A request header cannot be carried on the wire: it contains a line
    /// break, or its name contains `": "`.
    #[error("invalid request header {0:?}")]
    InvalidHeader(String),

    /// The host could not find the embedded document for a session.
    #[error("relay frame not found: {0}")]
    FrameNotFound(String),

    /// A handshake fragment could not be parsed.
    #[error("invalid handshake fragment: {0}")]
    InvalidHandshake(String),

    /// Any other failure reported by the host page.
    #[error("host error: {0}")]
    Host(String),
}
