use serde::Serialize;

use crate::command::{Command, FailureKind, KeyKind};

/// An operator-visible outcome of the console loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A line that is not a command, shown verbatim.
    Echo { line: String },
    /// A line that was not valid UTF-8 and was skipped.
    Undecodable { size: usize },
    /// A command was answered with `size` bytes on the wire.
    Served { command: Command, size: usize },
    /// Key material was received and verified; logging follows.
    KeyMaterial {
        kind: KeyKind,
        size: usize,
        base64: String,
    },
    /// The device reported successful provisioning.
    Provisioned { message: &'static str },
    /// The device reported a failed step.
    DeviceFailure {
        failure: FailureKind,
        message: &'static str,
    },
    /// Received key material failed its checksum and was dropped.
    ChecksumMismatch {
        kind: KeyKind,
        message: &'static str,
        declared: u32,
        computed: u32,
    },
    /// A command could not be completed on the host side.
    ExchangeAbandoned { command: Command, reason: String },
}

/// Receives console events.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}
