//! Verify the wire codec and handshake against JSON test vectors stored in
//! `test-vectors/`.
//!
//! The same files can be replayed by a relay document or a C host to check
//! that both sides of the boundary agree on the exact wire text.

use std::collections::BTreeMap;

use xda_core::{decode_request, encode_request, CallState, Handshake, RelayRequest, SessionId};

fn opt_str(value: &serde_json::Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/request.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut call = CallState::new(case["api_uri"].as_str().unwrap());
        if let Some(method) = case.get("method") {
            call.method = opt_str(method);
        }
        call.body = case.get("body").and_then(opt_str);
        let headers: BTreeMap<String, String> =
            serde_json::from_value(case["headers"].clone()).unwrap();
        for (header, value) in &headers {
            call.set_request_header(header, value).unwrap();
        }

        // Verify encode
        let encoded = encode_request(&call);
        assert_eq!(encoded, case["expected"].as_str().unwrap(), "{name}: encoded");

        // Verify decode restores what was encoded
        let decoded = decode_request(&encoded);
        assert_eq!(decoded, RelayRequest::from_call(&call), "{name}: decoded");
        assert_eq!(decoded.request_headers, headers, "{name}: headers");
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/response.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected"];

        let mut call = CallState::new("/vector");
        call.response_text = case.get("prior_response_text").and_then(opt_str);
        let response = xda_core::decode_response(case["text"].as_str().unwrap());
        let complete = call.apply_response(&response);

        assert_eq!(
            call.status,
            expected["status"].as_u64().map(|s| s as u16),
            "{name}: status"
        );
        assert_eq!(call.status_text, opt_str(&expected["status_text"]), "{name}: status text");
        assert_eq!(call.response_text, opt_str(&expected["response_text"]), "{name}: body");
        let headers: BTreeMap<String, String> =
            serde_json::from_value(expected["response_headers"].clone()).unwrap();
        assert_eq!(call.response_headers(), &headers, "{name}: headers");
        assert_eq!(complete, expected["complete"].as_bool().unwrap(), "{name}: complete");
        assert_eq!(call.is_complete(), complete, "{name}: ready state");
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[test]
fn handshake_test_vectors() {
    let raw = include_str!("../../test-vectors/handshake.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let handshake = Handshake::new(
            SessionId(case["session_id"].as_u64().unwrap()),
            case["server_uri"].as_str().unwrap(),
        );
        let src = handshake.frame_src(case["relay_uri"].as_str().unwrap());
        assert_eq!(src, case["expected_src"].as_str().unwrap(), "{name}: src");
        assert_eq!(Handshake::parse(&src).unwrap(), handshake, "{name}: parse");
    }
}
