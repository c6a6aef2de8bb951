//! Cross-origin request relay through hidden embedded documents.
//!
//! # Overview
//! A page that cannot call another origin directly embeds a relay document
//! served by that origin, hands it an encoded request, and gets an encoded
//! reply back. This crate holds the page side of that protocol: the call
//! state, the url-encoded wire codec, the handshake fragment, and the
//! controller that drives sessions. The page itself is abstracted behind
//! `RelayHost` (host-does-IO), so the core never touches a document.
//!
//! # Design
//! - `CallState` is a plain record; the controller owns it while the call is
//!   in flight and returns it on completion, cancellation, or expiry.
//! - The codec is lenient by construction: malformed input is skipped, never
//!   reported.
//! - Sessions live in a registry with monotonic ids, so calls may overlap.
//! - Timeouts are enforced only when the caller runs `reap`.

pub mod call;
pub mod codec;
pub mod config;
pub mod error;
pub mod handshake;
pub mod host;
pub mod relay;

pub use call::{CallState, ReadyState, DEFAULT_METHOD};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, RelayRequest, RelayResponse,
};
pub use config::RelayConfig;
pub use error::RelayError;
pub use handshake::Handshake;
pub use host::{RelayFrame, RelayHost, RelayMessage};
pub use relay::{CancelToken, Expired, ExpiryReason, ReceiveOutcome, RelayController, SessionId};
