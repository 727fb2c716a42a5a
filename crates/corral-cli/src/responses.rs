//! Response handlers: turn a server reply into something the console prints.

use corral_protocol::{DispatchRegistry, Envelope, Operation};

/// What a response handler extracted from one reply.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reply {
    lines: Vec<String>,
    verdict: Option<bool>,
    unexpected: Option<&'static str>,
}

impl Reply {
    /// Lines to print, in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether a `login`/`register` reply was affirmative.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.verdict == Some(true)
    }

    /// Body kind of a reply the handler could not interpret.
    #[must_use]
    pub const fn unexpected(&self) -> Option<&'static str> {
        self.unexpected
    }
}

/// Builds the client's response table.
///
/// Operations without an entry are sent fire-and-forget.
#[must_use]
pub fn response_registry() -> DispatchRegistry<Reply> {
    let mut registry = DispatchRegistry::new();
    registry
        .on_response(Operation::Info, render_info)
        .on_response(Operation::Show, render_show)
        .on_response(Operation::Login, record_verdict)
        .on_response(Operation::Register, record_verdict);
    registry
}

fn render_info(reply: &mut Reply, response: &Envelope) {
    match response.body().as_collection_info() {
        Some(info) => reply.lines.push(info.to_string()),
        None => reply.unexpected = Some(response.body().kind()),
    }
}

fn render_show(reply: &mut Reply, response: &Envelope) {
    match response.body().as_records() {
        Some([]) => reply.lines.push(String::from("collection is empty")),
        Some(records) => reply
            .lines
            .extend(records.iter().map(ToString::to_string)),
        None => reply.unexpected = Some(response.body().kind()),
    }
}

fn record_verdict(reply: &mut Reply, response: &Envelope) {
    match response.body().as_flag() {
        Some(flag) => reply.verdict = Some(flag),
        None => reply.unexpected = Some(response.body().kind()),
    }
}
