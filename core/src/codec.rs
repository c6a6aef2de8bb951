//! Flat url-encoded wire format exchanged with the relay document.
//!
//! # Design
//! Both directions use `key=value` pairs joined by `&`, every value
//! percent-encoded. The request side is built from a `CallState`; the
//! response side is decoded leniently: empty pieces, pairs without `=`, and
//! pairs that fail to percent-decode are dropped, unknown keys are ignored,
//! and the last occurrence of a repeated key wins. Nothing here returns an
//! error.
//!
//! The `decode_request` / `encode_response` halves belong to the relay
//! document. They live here so tests and C hosts can play that role.

use std::collections::BTreeMap;

use tracing::trace;

use crate::call::CallState;

/// Request fields as carried on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayRequest {
    pub uri: String,
    pub request_headers: BTreeMap<String, String>,
    pub method: Option<String>,
    pub data: Option<String>,
}

/// Response fields as carried on the wire. `None` means the field was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub response_headers: Option<String>,
    pub response_text: Option<String>,
}

impl RelayRequest {
    pub fn from_call(call: &CallState) -> Self {
        Self {
            uri: call.api_uri.clone(),
            request_headers: call.request_headers().clone(),
            method: call.method.clone(),
            data: call.body.clone(),
        }
    }

    /// Serialize with `uri` first, then the optional fields that are set.
    pub fn encode(&self) -> String {
        let mut out = format!("uri={}", urlencoding::encode(&self.uri));
        if !self.request_headers.is_empty() {
            let lines: Vec<String> = self
                .request_headers
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            push_field(&mut out, "requestHeaders", &lines.join("\r\n"));
        }
        if let Some(method) = &self.method {
            push_field(&mut out, "method", method);
        }
        if let Some(data) = &self.data {
            push_field(&mut out, "data", data);
        }
        out
    }
}

impl RelayResponse {
    /// Serialize the present fields in a fixed order.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(status) = self.status {
            push_field(&mut out, "status", &status.to_string());
        }
        if let Some(text) = &self.status_text {
            push_field(&mut out, "statusText", text);
        }
        if let Some(headers) = &self.response_headers {
            push_field(&mut out, "responseHeaders", headers);
        }
        if let Some(body) = &self.response_text {
            push_field(&mut out, "responseText", body);
        }
        out
    }
}

/// Encode the outbound half of `call` for delivery to the relay document.
pub fn encode_request(call: &CallState) -> String {
    RelayRequest::from_call(call).encode()
}

pub fn decode_request(text: &str) -> RelayRequest {
    let mut request = RelayRequest::default();
    for (name, value) in decode_pairs(text) {
        match name.as_str() {
            "uri" => request.uri = value,
            "requestHeaders" => request.request_headers = parse_header_lines(&value),
            "method" => request.method = Some(value),
            "data" => request.data = Some(value),
            _ => trace!(field = %name, "ignoring unknown request field"),
        }
    }
    request
}

pub fn encode_response(response: &RelayResponse) -> String {
    response.encode()
}

/// Decode the relay document's reply.
///
/// `status=0` is kept as `Some(0)`; a status that is not an integer in
/// `u16` range is dropped.
pub fn decode_response(text: &str) -> RelayResponse {
    let mut response = RelayResponse::default();
    for (name, value) in decode_pairs(text) {
        match name.as_str() {
            "status" => match value.trim().parse::<u16>() {
                Ok(status) => response.status = Some(status),
                Err(_) => trace!(%value, "ignoring unparsable status"),
            },
            "statusText" => response.status_text = Some(value),
            "responseHeaders" => response.response_headers = Some(value),
            "responseText" => response.response_text = Some(value),
            _ => trace!(field = %name, "ignoring unknown response field"),
        }
    }
    response
}

/// Split `text` into percent-decoded `(name, value)` pairs.
pub fn decode_pairs(text: &str) -> impl Iterator<Item = (String, String)> + '_ {
    text.split('&')
        .filter(|piece| !piece.is_empty())
        .filter_map(|piece| {
            let Some((name, value)) = piece.split_once('=') else {
                trace!(%piece, "dropping pair without '='");
                return None;
            };
            match (urlencoding::decode(name), urlencoding::decode(value)) {
                (Ok(name), Ok(value)) => Some((name.into_owned(), value.into_owned())),
                _ => {
                    trace!(%piece, "dropping pair that failed to decode");
                    None
                }
            }
        })
}

/// Parse `Name: Value` lines separated by CRLF or LF.
pub fn parse_header_lines(raw: &str) -> BTreeMap<String, String> {
    raw.replace('\r', "")
        .split('\n')
        .filter_map(|line| line.split_once(": "))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn push_field(out: &mut String, name: &str, value: &str) {
    if !out.is_empty() {
        out.push('&');
    }
    out.push_str(name);
    out.push('=');
    out.push_str(&urlencoding::encode(value));
}
