//! Handshake fragment passed to the relay document when its frame is created.
//!
//! The fragment is the only channel through which the relay document learns
//! its session id and the origin it should call:
//!
//! ```text
//! <id>:init:id=<id>&server=<percent-encoded server URI>
//! ```

use crate::codec::decode_pairs;
use crate::error::RelayError;
use crate::relay::SessionId;

const INIT_MARKER: &str = ":init:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub session_id: SessionId,
    pub server_uri: String,
}

impl Handshake {
    pub fn new(session_id: SessionId, server_uri: &str) -> Self {
        Self {
            session_id,
            server_uri: server_uri.to_string(),
        }
    }

    pub fn fragment(&self) -> String {
        format!(
            "{id}{INIT_MARKER}id={id}&server={server}",
            id = self.session_id,
            server = urlencoding::encode(&self.server_uri)
        )
    }

    /// Relay document address with the handshake appended as its fragment.
    pub fn frame_src(&self, relay_uri: &str) -> String {
        format!("{relay_uri}#{}", self.fragment())
    }

    /// Parse a handshake from a bare fragment or from a full frame address.
    pub fn parse(input: &str) -> Result<Self, RelayError> {
        let fragment = match input.split_once('#') {
            Some((_, fragment)) => fragment,
            None => input,
        };
        let (prefix, params) = fragment.split_once(INIT_MARKER).ok_or_else(|| {
            RelayError::InvalidHandshake(format!("missing init marker in {fragment:?}"))
        })?;
        let prefix_id = parse_id(prefix)?;

        let mut id = None;
        let mut server = None;
        for (name, value) in decode_pairs(params) {
            match name.as_str() {
                "id" => id = Some(parse_id(&value)?),
                "server" => server = Some(value),
                _ => {}
            }
        }

        let session_id = id.ok_or_else(|| RelayError::InvalidHandshake("missing id".to_string()))?;
        if session_id != prefix_id {
            return Err(RelayError::InvalidHandshake(format!(
                "id mismatch: {prefix_id} vs {session_id}"
            )));
        }
        let server_uri =
            server.ok_or_else(|| RelayError::InvalidHandshake("missing server".to_string()))?;

        Ok(Self {
            session_id,
            server_uri,
        })
    }
}

fn parse_id(raw: &str) -> Result<SessionId, RelayError> {
    raw.parse::<u64>()
        .map(SessionId)
        .map_err(|_| RelayError::InvalidHandshake(format!("bad session id {raw:?}")))
}
