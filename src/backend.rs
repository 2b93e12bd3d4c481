use std::collections::{HashMap, VecDeque};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One outbound request, built per user action and discarded after the
/// round trip.
#[derive(Debug, Clone)]
pub(crate) struct ActionRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<String>,
}

/// A dispatched call as the mock transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TransportError {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.method, self.path, self.message)
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Body(String),
    NetworkFailure,
}

#[derive(Debug, Default)]
struct RouteMock {
    queued: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

impl RouteMock {
    fn next(&mut self) -> Option<MockReply> {
        self.queued.pop_front().or_else(|| self.fallback.clone())
    }
}

/// Route table standing in for the storefront backend. One-shot replies are
/// consumed FIFO before the sticky fallback, so duplicate submissions can be
/// given distinct responses.
#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    routes: HashMap<(Method, String), RouteMock>,
    calls: Vec<RecordedCall>,
}

impl MockBackend {
    pub(crate) fn mock_response(&mut self, method: Method, path: &str, body: &str) {
        self.route(method, path).fallback = Some(MockReply::Body(body.to_string()));
    }

    pub(crate) fn mock_response_once(&mut self, method: Method, path: &str, body: &str) {
        self.route(method, path)
            .queued
            .push_back(MockReply::Body(body.to_string()));
    }

    pub(crate) fn mock_network_failure(&mut self, method: Method, path: &str) {
        self.route(method, path).fallback = Some(MockReply::NetworkFailure);
    }

    pub(crate) fn mock_network_failure_once(&mut self, method: Method, path: &str) {
        self.route(method, path)
            .queued
            .push_back(MockReply::NetworkFailure);
    }

    fn route(&mut self, method: Method, path: &str) -> &mut RouteMock {
        self.routes
            .entry((method, path.to_string()))
            .or_default()
    }

    pub(crate) fn dispatch(
        &mut self,
        request: ActionRequest,
    ) -> Result<String, TransportError> {
        let ActionRequest {
            method,
            path,
            headers,
            body,
        } = request;
        self.calls.push(RecordedCall {
            method,
            path: path.clone(),
            headers,
            body,
        });

        let reply = self
            .routes
            .get_mut(&(method, path.clone()))
            .and_then(RouteMock::next);
        match reply {
            Some(MockReply::Body(body)) => Ok(body),
            Some(MockReply::NetworkFailure) => Err(TransportError {
                method,
                path,
                message: "network failure".into(),
            }),
            None => Err(TransportError {
                method,
                path,
                message: "no route mock".into(),
            }),
        }
    }

    pub(crate) fn recorded_calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    pub(crate) fn calls_to(&self, method: Method, path: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }
}

/// Mocked `confirm()` dialog: queued answers are consumed first, then the
/// settable default. Defaults to declining.
#[derive(Debug, Default)]
pub(crate) struct ConfirmMock {
    responses: VecDeque<bool>,
    default_response: bool,
}

impl ConfirmMock {
    pub(crate) fn queue(&mut self, response: bool) {
        self.responses.push_back(response);
    }

    pub(crate) fn set_default(&mut self, response: bool) {
        self.default_response = response;
    }

    pub(crate) fn answer(&mut self) -> bool {
        self.responses.pop_front().unwrap_or(self.default_response)
    }
}

/// Reloads are recorded, not re-rendered: the harness observes the
/// reload-as-consistency event instead of rebuilding the page.
#[derive(Debug, Default)]
pub(crate) struct NavigationState {
    reload_count: usize,
}

impl NavigationState {
    pub(crate) fn record_reload(&mut self) {
        self.reload_count += 1;
    }

    pub(crate) fn reload_count(&self) -> usize {
        self.reload_count
    }
}

pub(crate) fn form_urlencode(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                encode_form_component(name),
                encode_form_component(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_form_component(src: &str) -> String {
    let mut out = String::new();
    for b in src.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'*' | b'-' | b'.' | b'_') {
            out.push(*b as char);
        } else if *b == b' ' {
            out.push('+');
        } else {
            out.push('%');
            out.push(to_hex_upper((*b >> 4) & 0x0F));
            out.push(to_hex_upper(*b & 0x0F));
        }
    }
    out
}

fn to_hex_upper(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        10..=15 => (b'A' + (nibble - 10)) as char,
        _ => '?',
    }
}
