//! Relay controller: drives calls through hidden relay documents.
//!
//! # Design
//! Every call gets its own session in a registry keyed by `SessionId`. Ids
//! come from a monotonic counter starting at 0, so several calls can be in
//! flight at once. A session owns its frame description, its `CallState`, a
//! cancellation token, and an optional deadline.
//!
//! Lifecycle of one call:
//! 1. `initialize` embeds a hidden frame whose address carries the handshake.
//! 2. `send` encodes the call and delivers it to the relay document. The
//!    relay document must have finished loading; no readiness check is made
//!    and what happens before that point depends entirely on the host.
//! 3. `receive` is fed the relay document's reply. Once a body arrives the
//!    frame is removed, the call is marked complete, and ownership of the
//!    call returns to the caller.
//!
//! Nothing here runs in the background. A relay that never answers leaves
//! its session alive until the caller cancels it or `reap` finds its
//! deadline has passed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::call::CallState;
use crate::codec::{decode_response, encode_request};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::handshake::Handshake;
use crate::host::{RelayFrame, RelayHost, RelayMessage};

/// Identifier of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared flag that asks the controller to drop a session at the next `reap`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of feeding a reply into `RelayController::receive`.
#[derive(Debug)]
pub enum ReceiveOutcome {
    /// The reply carried no body; the session stays open.
    Pending,
    /// The body arrived. The session is gone and the call is handed back.
    Complete(CallState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    Cancelled,
    TimedOut,
}

/// A session removed by `reap`.
#[derive(Debug)]
pub struct Expired {
    pub session_id: SessionId,
    pub reason: ExpiryReason,
    pub call: CallState,
}

struct Session {
    frame: RelayFrame,
    call: CallState,
    cancel: CancelToken,
    deadline: Option<Instant>,
}

pub struct RelayController<H: RelayHost> {
    host: H,
    config: RelayConfig,
    sessions: HashMap<SessionId, Session>,
    next_id: u64,
}

impl<H: RelayHost> RelayController<H> {
    pub fn new(host: H, config: RelayConfig) -> Self {
        Self {
            host,
            config,
            sessions: HashMap::new(),
            next_id: 0,
        }
    }

    /// Embed the relay document for `call` and register a session for it.
    ///
    /// The call must carry both a relay document URI and a server URI. The
    /// server URI reaches the relay document only through the handshake
    /// fragment built here.
    pub fn initialize(&mut self, mut call: CallState) -> Result<SessionId, RelayError> {
        let relay_uri = call
            .relay_uri
            .as_deref()
            .ok_or(RelayError::MissingField("relay document URI"))?;
        let server_uri = call
            .server_uri
            .as_deref()
            .ok_or(RelayError::MissingField("server URI"))?;

        let session_id = SessionId(self.next_id);
        let handshake = Handshake::new(session_id, server_uri);
        let frame = RelayFrame::hidden(
            format!("{}{session_id}", self.config.frame_id_prefix),
            handshake.frame_src(relay_uri),
        );
        self.host.attach_frame(&frame)?;
        self.next_id += 1;

        debug!(session = %session_id, src = %frame.src, "relay frame attached");

        call.session_id = Some(session_id);
        let deadline = self.config.timeout().map(|timeout| Instant::now() + timeout);
        self.sessions.insert(
            session_id,
            Session {
                frame,
                call,
                cancel: CancelToken::default(),
                deadline,
            },
        );
        Ok(session_id)
    }

    /// Encode the session's call and hand it to the relay document.
    pub fn send(&mut self, session_id: SessionId) -> Result<(), RelayError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(RelayError::UnknownSession(session_id))?;
        let message = RelayMessage {
            session_id,
            element_id: session.frame.element_id.clone(),
            payload: encode_request(&session.call),
        };
        debug!(session = %session_id, bytes = message.payload.len(), "delivering relay request");
        self.host.deliver(message)
    }

    /// Entry point the relay document calls back with its encoded reply.
    pub fn receive(
        &mut self,
        session_id: SessionId,
        text: &str,
    ) -> Result<ReceiveOutcome, RelayError> {
        let Entry::Occupied(mut entry) = self.sessions.entry(session_id) else {
            warn!(session = %session_id, "reply for unknown relay session");
            return Err(RelayError::UnknownSession(session_id));
        };

        let response = decode_response(text);
        let call = &mut entry.get_mut().call;
        if !call.apply_response(&response) {
            debug!(session = %session_id, status = ?response.status, "partial relay reply");
            if !self.config.deliver_only_on_completion {
                call.fire_load();
            }
            return Ok(ReceiveOutcome::Pending);
        }

        let mut session = entry.remove();
        self.host.detach_frame(&session.frame.element_id);
        debug!(session = %session_id, status = ?session.call.status, "relay call complete");
        session.call.fire_load();
        Ok(ReceiveOutcome::Complete(session.call))
    }

    /// Tear down a session immediately. The completion callback is not fired.
    pub fn cancel(&mut self, session_id: SessionId) -> Option<CallState> {
        let session = self.sessions.remove(&session_id)?;
        self.host.detach_frame(&session.frame.element_id);
        debug!(session = %session_id, "relay session cancelled");
        Some(session.call)
    }

    pub fn cancel_token(&self, session_id: SessionId) -> Option<CancelToken> {
        self.sessions.get(&session_id).map(|s| s.cancel.clone())
    }

    pub fn deadline(&self, session_id: SessionId) -> Option<Instant> {
        self.sessions.get(&session_id).and_then(|s| s.deadline)
    }

    /// Remove sessions whose token was cancelled or whose deadline is at or
    /// before `now`, detaching their frames. Callbacks are not fired.
    pub fn reap(&mut self, now: Instant) -> Vec<Expired> {
        let mut doomed: Vec<(SessionId, ExpiryReason)> = self
            .sessions
            .iter()
            .filter_map(|(id, session)| {
                if session.cancel.is_cancelled() {
                    Some((*id, ExpiryReason::Cancelled))
                } else if session.deadline.is_some_and(|deadline| deadline <= now) {
                    Some((*id, ExpiryReason::TimedOut))
                } else {
                    None
                }
            })
            .collect();
        doomed.sort_by_key(|(id, _)| *id);

        let mut expired = Vec::with_capacity(doomed.len());
        for (session_id, reason) in doomed {
            if let Some(session) = self.sessions.remove(&session_id) {
                self.host.detach_frame(&session.frame.element_id);
                warn!(session = %session_id, ?reason, "relay session expired");
                expired.push(Expired {
                    session_id,
                    reason,
                    call: session.call,
                });
            }
        }
        expired
    }

    pub fn call(&self, session_id: SessionId) -> Option<&CallState> {
        self.sessions.get(&session_id).map(|s| &s.call)
    }

    pub fn frame(&self, session_id: SessionId) -> Option<&RelayFrame> {
        self.sessions.get(&session_id).map(|s| &s.frame)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
