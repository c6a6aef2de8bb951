//! State holder for one relayed call.
//!
//! # Design
//! `CallState` is the facade a page fills in before handing it to the relay
//! controller: request inputs on one side, response outputs on the other,
//! and a completion callback. It carries no protocol logic beyond copying a
//! decoded response into itself. The controller owns it while the call is in
//! flight and hands it back once the call completes or is cancelled.

use std::collections::BTreeMap;
use std::fmt;

use crate::codec::RelayResponse;
use crate::error::RelayError;
use crate::relay::SessionId;

/// Method sent when the caller does not pick one.
pub const DEFAULT_METHOD: &str = "POST";

/// Completion callback. Receives the call after its fields were updated.
pub type LoadCallback = Box<dyn FnMut(&CallState) + Send>;

/// Readiness of a call. Only two values are meaningful; the discriminants
/// match the numeric values relay pages expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    NotStarted = 0,
    Complete = 4,
}

/// Inputs, outputs, and completion callback of one outbound call.
pub struct CallState {
    pub api_uri: String,
    pub method: Option<String>,
    pub body: Option<String>,
    pub server_uri: Option<String>,
    pub relay_uri: Option<String>,
    pub(crate) session_id: Option<SessionId>,
    request_headers: BTreeMap<String, String>,

    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub response_text: Option<String>,
    all_response_headers: Option<String>,
    response_headers: BTreeMap<String, String>,
    ready_state: ReadyState,

    on_load: Option<LoadCallback>,
}

impl CallState {
    pub fn new(api_uri: &str) -> Self {
        Self {
            api_uri: api_uri.to_string(),
            method: Some(DEFAULT_METHOD.to_string()),
            body: None,
            server_uri: None,
            relay_uri: None,
            session_id: None,
            request_headers: BTreeMap::new(),
            status: None,
            status_text: None,
            response_text: None,
            all_response_headers: None,
            response_headers: BTreeMap::new(),
            ready_state: ReadyState::NotStarted,
            on_load: None,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Origin the relay document performs the real call against.
    pub fn with_server_uri(mut self, uri: &str) -> Self {
        self.server_uri = Some(uri.to_string());
        self
    }

    /// Address of the relay document hosted on the target origin.
    pub fn with_relay_uri(mut self, uri: &str) -> Self {
        self.relay_uri = Some(uri.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, RelayError> {
        self.set_request_header(name, value)?;
        Ok(self)
    }

    pub fn on_load<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&CallState) + Send + 'static,
    {
        self.on_load = Some(Box::new(callback));
        self
    }

    /// Set an outbound header, replacing any earlier value for `name`.
    ///
    /// Headers travel as CRLF-joined `Name: Value` lines inside a single wire
    /// field, so neither part may contain CR or LF and the name may not
    /// contain `": "`. Such headers are rejected with
    /// `RelayError::InvalidHeader` and the mapping is left unchanged.
    pub fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), RelayError> {
        let breaks_line = |s: &str| s.contains(['\r', '\n']);
        if breaks_line(name) || breaks_line(value) || name.contains(": ") {
            return Err(RelayError::InvalidHeader(name.to_string()));
        }
        self.request_headers.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn request_headers(&self) -> &BTreeMap<String, String> {
        &self.request_headers
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn is_complete(&self) -> bool {
        self.ready_state == ReadyState::Complete
    }

    /// Raw response-header text exactly as the relay reported it.
    pub fn all_response_headers(&self) -> Option<&str> {
        self.all_response_headers.as_deref()
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers.get(name).map(String::as_str)
    }

    pub fn response_headers(&self) -> &BTreeMap<String, String> {
        &self.response_headers
    }

    /// Store the raw header block and index its `Name: Value` lines.
    ///
    /// Carriage returns are dropped before splitting on newlines. Lines
    /// without a `": "` separator are skipped.
    pub fn set_response_headers(&mut self, raw: &str) {
        self.all_response_headers = Some(raw.to_string());
        let stripped = raw.replace('\r', "");
        for line in stripped.split('\n').filter(|l| !l.is_empty()) {
            if let Some((name, value)) = line.split_once(": ") {
                self.response_headers.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// Copy the fields present in `response` into this call.
    ///
    /// Absent fields leave earlier values alone. A present body marks the
    /// call complete. Returns whether a body was present.
    pub fn apply_response(&mut self, response: &RelayResponse) -> bool {
        if let Some(headers) = &response.response_headers {
            self.set_response_headers(headers);
        }
        if let Some(status) = response.status {
            self.status = Some(status);
        }
        if let Some(text) = &response.status_text {
            self.status_text = Some(text.clone());
        }
        match &response.response_text {
            Some(body) => {
                self.response_text = Some(body.clone());
                self.ready_state = ReadyState::Complete;
                true
            }
            None => false,
        }
    }

    /// Invoke the completion callback, if any.
    pub(crate) fn fire_load(&mut self) {
        if let Some(mut callback) = self.on_load.take() {
            callback(self);
            self.on_load = Some(callback);
        }
    }
}

impl fmt::Debug for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallState")
            .field("api_uri", &self.api_uri)
            .field("method", &self.method)
            .field("session_id", &self.session_id)
            .field("status", &self.status)
            .field("ready_state", &self.ready_state)
            .field("has_on_load", &self.on_load.is_some())
            .finish_non_exhaustive()
    }
}
