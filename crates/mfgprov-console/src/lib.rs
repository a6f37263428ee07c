//! Device command loop for factory provisioning.
//!
//! The device drives the session: it prints newline-terminated commands and
//! the host answers each one, either with a small fixed token, a framed
//! payload, or by pulling a framed payload of key material back and logging
//! it. Device-reported failures are diagnostics, never a reason to stop.

pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod keylog;

pub use command::{Command, FailureKind, KeyKind};
pub use config::{ConsoleConfig, DEFAULT_EK_CERT_RANGE, DEFAULT_HOST_TOKEN, DEFAULT_MAC0, DEFAULT_MAC1};
pub use console::{mac_block, Console, LineRead, RunSummary, REBOOT_NOTICE};
pub use error::{ConsoleError, Result};
pub use event::{Event, EventSink};
pub use keylog::{encode_mime, KeyLog};
