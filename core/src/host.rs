//! Page-side collaborator of the relay controller.
//!
//! # Design
//! The controller never touches a document. It describes the frame to embed,
//! the message to hand to the relay document, and the frame to remove; an
//! implementation of `RelayHost` carries those out (a browser binding, a
//! native webview through the C ABI, or an in-memory test double). Messages
//! travel as a `RelayMessage` envelope so hosts without direct access to the
//! frame's context can forward them over any messaging primitive.

use crate::error::RelayError;
use crate::relay::SessionId;

/// Width and height attributes of the embedded document.
pub const FRAME_SIZE: u32 = 400;

/// Inline style that keeps the embedded document out of sight.
pub const HIDDEN_FRAME_STYLE: &str =
    "position: absolute; top: 0px; left: 0px; width: 1px; height: 1px; visibility: hidden;";

/// Description of the hidden embedded document for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    pub element_id: String,
    pub src: String,
    pub width: u32,
    pub height: u32,
    pub style: &'static str,
}

impl RelayFrame {
    pub fn hidden(element_id: String, src: String) -> Self {
        Self {
            element_id,
            src,
            width: FRAME_SIZE,
            height: FRAME_SIZE,
            style: HIDDEN_FRAME_STYLE,
        }
    }
}

/// Encoded request addressed to one relay document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub session_id: SessionId,
    pub element_id: String,
    pub payload: String,
}

/// Operations the embedding page performs on the controller's behalf.
pub trait RelayHost {
    /// Insert `frame` into the page.
    fn attach_frame(&mut self, frame: &RelayFrame) -> Result<(), RelayError>;

    /// Invoke the relay document's entry point with `message.payload`.
    ///
    /// The relay document must already have loaded; hosts are not expected
    /// to queue or wait.
    fn deliver(&mut self, message: RelayMessage) -> Result<(), RelayError>;

    /// Remove the frame with `element_id` from the page. Unknown ids are a
    /// no-op.
    fn detach_frame(&mut self, element_id: &str);
}
