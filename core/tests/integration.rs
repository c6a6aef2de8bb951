//! Full relay round-trip against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port and plugs a `LoopbackHost` into
//! the controller. The host stands in for the page and for the relay
//! documents it embeds: on `deliver` it parses the frame's handshake,
//! decodes the request, performs it over real HTTP with ureq against the
//! server origin it learned, and queues the encoded reply. The test then
//! pumps those replies back into `RelayController::receive`, as the relay
//! document would by calling into the page.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use xda_core::{
    decode_request, encode_response, CallState, Handshake, ReadyState, ReceiveOutcome,
    RelayConfig, RelayController, RelayError, RelayFrame, RelayHost, RelayMessage,
    RelayResponse, SessionId,
};

#[derive(Default)]
struct LoopbackHost {
    frames: HashMap<String, RelayFrame>,
    replies: Vec<(SessionId, String)>,
}

impl LoopbackHost {
    fn take_replies(&mut self) -> Vec<(SessionId, String)> {
        std::mem::take(&mut self.replies)
    }
}

impl RelayHost for LoopbackHost {
    fn attach_frame(&mut self, frame: &RelayFrame) -> Result<(), RelayError> {
        self.frames.insert(frame.element_id.clone(), frame.clone());
        Ok(())
    }

    fn deliver(&mut self, message: RelayMessage) -> Result<(), RelayError> {
        let frame = self
            .frames
            .get(&message.element_id)
            .ok_or_else(|| RelayError::FrameNotFound(message.element_id.clone()))?;
        let handshake = Handshake::parse(&frame.src)?;
        assert_eq!(handshake.session_id, message.session_id);

        let reply = relay_document(&handshake.server_uri, &message.payload);
        self.replies.push((handshake.session_id, reply));
        Ok(())
    }

    fn detach_frame(&mut self, element_id: &str) {
        self.frames.remove(element_id);
    }
}

/// Play the relay document: perform the decoded request on the server
/// origin and encode what came back.
fn relay_document(server_uri: &str, payload: &str) -> String {
    let request = decode_request(payload);
    let url = if request.uri.starts_with("http") {
        request.uri.clone()
    } else {
        format!("{server_uri}{}", request.uri)
    };

    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let method = request.method.as_deref().unwrap_or("GET");
    let body = request.data.unwrap_or_default();
    let result = match method {
        "GET" | "DELETE" => {
            let mut builder = if method == "GET" { agent.get(&url) } else { agent.delete(&url) };
            for (name, value) in &request.request_headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()
        }
        _ => {
            let mut builder = if method == "PUT" { agent.put(&url) } else { agent.post(&url) };
            for (name, value) in &request.request_headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send(body.as_bytes())
        }
    };

    let response = match result {
        Ok(mut response) => {
            let headers: Vec<String> = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|v| format!("{}: {v}", name.as_str()))
                })
                .collect();
            RelayResponse {
                status: Some(response.status().as_u16()),
                status_text: response.status().canonical_reason().map(str::to_string),
                response_headers: Some(headers.join("\r\n")),
                response_text: Some(response.body_mut().read_to_string().unwrap_or_default()),
            }
        }
        // A network failure surfaces as status 0 with an empty body.
        Err(_) => RelayResponse {
            status: Some(0),
            response_text: Some(String::new()),
            ..RelayResponse::default()
        },
    };
    encode_response(&response)
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
    });

    format!("http://{addr}")
}

fn call(base: &str, path: &str) -> CallState {
    CallState::new(&format!("{base}{path}"))
        .with_server_uri(base)
        .with_relay_uri(&format!("{base}/relay.html"))
}

/// Feed every queued reply back into the controller.
fn pump(relay: &mut RelayController<LoopbackHost>) -> Vec<CallState> {
    let mut done = Vec::new();
    for (session_id, reply) in relay.host_mut().take_replies() {
        if let ReceiveOutcome::Complete(call) = relay.receive(session_id, &reply).unwrap() {
            done.push(call);
        }
    }
    done
}

#[test]
fn relay_lifecycle() {
    let base = start_server();
    let mut relay = RelayController::new(LoopbackHost::default(), RelayConfig::default());

    // Step 1: create an item through the relay.
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let create = call(&base, "/items")
        .with_header("X-Token", "abc")
        .unwrap()
        .with_header("Content-Type", "application/json")
        .unwrap()
        .with_body(r#"{"name":"Widget"}"#)
        .on_load(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let id = relay.initialize(create).unwrap();
    assert!(relay.host().frames.contains_key("clientFrame_0"));
    relay.send(id).unwrap();

    let mut done = pump(&mut relay);
    assert_eq!(done.len(), 1);
    let created = done.pop().unwrap();
    assert_eq!(created.status, Some(201));
    assert_eq!(created.status_text.as_deref(), Some("Created"));
    assert_eq!(created.ready_state(), ReadyState::Complete);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(relay.host().frames.is_empty());

    let item: mock_server::Item =
        serde_json::from_str(created.response_text.as_deref().unwrap()).unwrap();
    assert_eq!(item.name, "Widget");

    // Step 2: list items; the count header crosses the relay.
    let list = call(&base, "/items").with_method("GET");
    let id = relay.initialize(list).unwrap();
    assert_eq!(id, SessionId(1));
    relay.send(id).unwrap();
    let listed = pump(&mut relay).pop().unwrap();
    assert_eq!(listed.status, Some(200));
    assert_eq!(listed.response_header(mock_server::COUNT_HEADER), Some("1"));
    let items: Vec<mock_server::Item> =
        serde_json::from_str(listed.response_text.as_deref().unwrap()).unwrap();
    assert_eq!(items, vec![item.clone()]);

    // Step 3: delete returns an empty body, which still completes the call.
    let delete = call(&base, &format!("/items/{}", item.id)).with_method("DELETE");
    let id = relay.initialize(delete).unwrap();
    relay.send(id).unwrap();
    let deleted = pump(&mut relay).pop().unwrap();
    assert_eq!(deleted.status, Some(204));
    assert_eq!(deleted.response_text.as_deref(), Some(""));
    assert!(deleted.is_complete());

    // Step 4: a write without a token is rejected by the origin.
    let rejected = call(&base, "/items")
        .with_header("Content-Type", "application/json")
        .unwrap()
        .with_body(r#"{"name":"Nope"}"#);
    let id = relay.initialize(rejected).unwrap();
    relay.send(id).unwrap();
    let rejected = pump(&mut relay).pop().unwrap();
    assert_eq!(rejected.status, Some(401));
    assert_eq!(rejected.response_text.as_deref(), Some("missing X-Token"));
}

#[test]
fn overlapping_calls_complete_independently() {
    let base = start_server();
    let config = RelayConfig {
        deliver_only_on_completion: true,
        ..RelayConfig::default()
    };
    let mut relay = RelayController::new(LoopbackHost::default(), config);

    let first = call(&base, "/echo")
        .with_method("PUT")
        .with_header("X-Token", "first & only")
        .unwrap()
        .with_body("one=1&two=2");
    let second = call(&base, "/echo").with_method("GET");
    let a = relay.initialize(first).unwrap();
    let b = relay.initialize(second).unwrap();
    assert_eq!(relay.session_count(), 2);

    relay.send(b).unwrap();
    relay.send(a).unwrap();
    let mut done = pump(&mut relay);
    assert_eq!(done.len(), 2);
    done.sort_by_key(|c| c.session_id());

    let echo_a: mock_server::Echo =
        serde_json::from_str(done[0].response_text.as_deref().unwrap()).unwrap();
    let echo_b: mock_server::Echo =
        serde_json::from_str(done[1].response_text.as_deref().unwrap()).unwrap();
    assert_eq!(echo_a.method, "PUT");
    assert_eq!(echo_a.token.as_deref(), Some("first & only"));
    assert_eq!(echo_a.body, "one=1&two=2");
    assert_eq!(echo_b.method, "GET");
    assert!(echo_b.token.is_none());
    assert_eq!(relay.session_count(), 0);
}

#[test]
fn send_after_cancel_reports_unknown_session() {
    let base = start_server();
    let mut relay = RelayController::new(LoopbackHost::default(), RelayConfig::default());
    let id = relay.initialize(call(&base, "/items")).unwrap();
    assert!(relay.cancel(id).is_some());
    assert!(relay.host().frames.is_empty());
    assert!(matches!(relay.send(id), Err(RelayError::UnknownSession(_))));
}
