//! Test-only doubles and fixtures.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

use anyhow::{Result, anyhow};

use crate::core::snapshot::{Item, SystemSnapshot, Thing};
use crate::io::llm::{ChatRequest, LlmClient};

/// One scripted LLM reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail the call with this transport error message.
    TransportError(String),
}

/// LLM double that replays predetermined replies and records every request.
///
/// Calls beyond the script fail, which keeps call-count assertions honest.
pub struct ScriptedLlm {
    replies: RefCell<VecDeque<ScriptedReply>>,
    calls: RefCell<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<String>) -> Self {
        Self::with_script(replies.into_iter().map(ScriptedReply::Text).collect())
    }

    pub fn with_script(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.borrow().clone()
    }

    /// User-message contents of every recorded call, in order.
    pub fn user_prompts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|req| {
                req.messages
                    .iter()
                    .find(|m| m.role == "user")
                    .map(|m| m.content.clone())
            })
            .collect()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.calls.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::TransportError(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted llm exhausted after {} calls", self.call_count())),
        }
    }
}

/// A verdict reply that passes.
pub fn passing_verdict(summary: &str) -> String {
    serde_json::json!({ "verdict": "valid", "summary": summary }).to_string()
}

/// A verdict reply that fails with one feedback string.
pub fn failing_verdict(summary: &str, feedback: &str) -> String {
    serde_json::json!({
        "verdict": "invalid",
        "summary": summary,
        "feedback": feedback,
        "fixes": []
    })
    .to_string()
}

/// Minimal single-connection HTTP stub for exercising the blocking clients.
///
/// Serves the scripted response bodies in order, one connection each (every
/// response closes its connection), then stops; `finish` returns the raw
/// requests for assertions.
pub struct StubServer {
    addr: SocketAddr,
    handle: thread::JoinHandle<Vec<String>>,
}

impl StubServer {
    pub fn serve(bodies: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let addr = listener.local_addr().expect("stub server addr");
        let handle = thread::spawn(move || {
            let mut requests = Vec::with_capacity(bodies.len());
            for body in bodies {
                let (mut stream, _) = listener.accept().expect("accept");
                requests.push(read_http_request(&mut stream));
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).expect("write response");
            }
            requests
        });
        Self { addr, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for every scripted connection and return the raw requests.
    pub fn finish(self) -> Vec<String> {
        self.handle.join().expect("stub server thread")
    }
}

fn read_http_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(header_end) = find_subslice(&buf, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A chat-completions body whose first choice replies with `content`.
pub fn chat_completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

/// A small snapshot with one switch, one sensor, and one offline thing.
pub fn sample_snapshot() -> SystemSnapshot {
    SystemSnapshot {
        items: vec![
            Item {
                name: "LivingRoom_Light".to_string(),
                item_type: "Switch".to_string(),
                state: Some("OFF".to_string()),
                tags: vec!["Lighting".to_string()],
            },
            Item {
                name: "MotionSensor".to_string(),
                item_type: "Contact".to_string(),
                state: Some("CLOSED".to_string()),
                tags: Vec::new(),
            },
        ],
        things: vec![Thing {
            uid: "zwave:sensor:1".to_string(),
            label: Some("Hall sensor".to_string()),
            status: "OFFLINE".to_string(),
        }],
        live_rules: Vec::new(),
        local_rules: Vec::new(),
    }
}
