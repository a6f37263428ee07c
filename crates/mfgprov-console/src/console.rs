use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mfgprov_frame::{FrameError, FrameReader, FrameWriter, OVERHEAD};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::command::{Command, FailureKind, KeyKind};
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::event::{Event, EventSink};
use crate::keylog::{encode_mime, KeyLog};

/// Printed after every device failure and every rejected payload.
///
/// The console keeps running afterwards; the device may still print
/// diagnostics worth reading.
pub const REBOOT_NOTICE: &str = "REBOOTING SYSTEM";

const SUCCESS_MESSAGE: &str = "Device provisioning successful. Power off device now!";

/// The MAC answer: both words and their wrapping sum, little-endian.
pub fn mac_block(mac0: u32, mac1: u32) -> [u8; 12] {
    let mut block = [0u8; 12];
    block[0..4].copy_from_slice(&mac0.to_le_bytes());
    block[4..8].copy_from_slice(&mac1.to_le_bytes());
    block[8..12].copy_from_slice(&mac0.wrapping_add(mac1).to_le_bytes());
    block
}

/// Outcome of waiting for one line from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A decoded line, line ending stripped.
    Line(String),
    /// A line of `n` bytes that was not valid UTF-8.
    Undecodable(usize),
    /// Nothing arrived within the transport's poll interval.
    Idle,
    /// The device side closed the stream.
    Closed,
}

/// Counters for one console run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub lines: u64,
    pub commands: u64,
    pub echoed: u64,
    pub undecodable: u64,
    pub served: u64,
    pub key_records: u64,
    pub device_failures: u64,
    pub checksum_mismatches: u64,
    pub abandoned: u64,
    pub provisioned: bool,
}

/// The provisioning console: reads device commands and answers them.
///
/// Reads and writes go through separate handles so a serial port can be
/// split with `try_clone`; tests use in-memory streams.
pub struct Console<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    config: ConsoleConfig,
    key_log: KeyLog,
    running: Arc<AtomicBool>,
    summary: RunSummary,
}

impl<R: Read, W: Write> Console<R, W> {
    pub fn new(reader: R, writer: W, config: ConsoleConfig) -> Self {
        let reader = FrameReader::with_config(reader, config.frame.clone());
        let writer = FrameWriter::with_config(writer, config.frame.clone());
        let key_log = KeyLog::new(config.ek_log.clone());
        Self {
            reader,
            writer,
            config,
            key_log,
            running: Arc::new(AtomicBool::new(true)),
            summary: RunSummary::default(),
        }
    }

    /// Flag that keeps [`Console::run`] going; clear it to stop the loop.
    ///
    /// The loop notices at the next line or poll timeout.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Serve the device until cancelled or the stream closes.
    ///
    /// Device failures, undecodable lines and bad checksums are reported
    /// through `sink` and never end the loop. Only host-side I/O errors do.
    pub fn run(&mut self, sink: &mut dyn EventSink) -> Result<RunSummary> {
        info!("awaiting device commands");
        while self.is_running() {
            let line = match self.read_line()? {
                LineRead::Line(line) => line,
                LineRead::Undecodable(size) => {
                    debug!(size, "skipping undecodable line");
                    self.summary.undecodable += 1;
                    sink.emit(Event::Undecodable { size });
                    continue;
                }
                LineRead::Idle => continue,
                LineRead::Closed => {
                    info!("device closed the link");
                    break;
                }
            };

            self.summary.lines += 1;
            match self.dispatch(&line, sink) {
                Ok(()) => {}
                Err(err) if err.is_closed() => {
                    info!("device closed the link mid-exchange");
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(self.summary.clone())
    }

    /// Wait for the next line from the device.
    pub fn read_line(&mut self) -> Result<LineRead> {
        match self.reader.read_line() {
            Ok(bytes) => match std::str::from_utf8(&bytes) {
                Ok(line) => Ok(LineRead::Line(line.to_string())),
                Err(_) => Ok(LineRead::Undecodable(bytes.len())),
            },
            Err(FrameError::ConnectionClosed) => Ok(LineRead::Closed),
            Err(err) if err.is_timeout() => Ok(LineRead::Idle),
            Err(err) => Err(err.into()),
        }
    }

    /// Perform the action for one line.
    ///
    /// Lines that are not commands are echoed and otherwise ignored.
    pub fn dispatch(&mut self, line: &str, sink: &mut dyn EventSink) -> Result<()> {
        let Some(command) = Command::parse(line) else {
            self.summary.echoed += 1;
            sink.emit(Event::Echo {
                line: line.to_string(),
            });
            return Ok(());
        };

        debug!(command = command.literal(), "dispatching device command");
        self.summary.commands += 1;

        match command {
            Command::RequestMac => {
                let block = mac_block(self.config.mac0, self.config.mac1);
                self.writer.write_raw(&block)?;
                self.served(command, block.len(), sink);
            }
            Command::HostCheck => {
                let token = self.config.host_token.to_le_bytes();
                self.writer.write_raw(&token)?;
                self.served(command, token.len(), sink);
            }
            Command::DeviceCert => {
                let path = self.config.device_cert.clone();
                self.send_file(command, path, sink)?;
            }
            Command::EkCertificate => {
                let path = self.config.ek_certificate_path().cloned();
                self.send_file(command, path, sink)?;
            }
            Command::SmbiosSerial => {
                let serial = self.config.serial_number.clone();
                self.send_payload(command, &serial, sink)?;
            }
            Command::EkCert => self.receive_key(command, KeyKind::EkCert, sink)?,
            Command::EkPublic => self.receive_key(command, KeyKind::EkPublic, sink)?,
            Command::Success => {
                info!("device reported provisioning success");
                self.summary.provisioned = true;
                sink.emit(Event::Provisioned {
                    message: SUCCESS_MESSAGE,
                });
            }
            Command::Failure(failure) => self.device_failure(failure, sink),
        }
        Ok(())
    }

    fn served(&mut self, command: Command, size: usize, sink: &mut dyn EventSink) {
        info!(command = command.literal(), size, "answered device");
        self.summary.served += 1;
        sink.emit(Event::Served { command, size });
    }

    fn abandon(&mut self, command: Command, reason: String, sink: &mut dyn EventSink) {
        error!(command = command.literal(), %reason, "exchange abandoned");
        self.summary.abandoned += 1;
        sink.emit(Event::ExchangeAbandoned { command, reason });
    }

    fn device_failure(&mut self, failure: FailureKind, sink: &mut dyn EventSink) {
        warn!(failure = failure.literal(), "{}", failure.message());
        self.summary.device_failures += 1;
        sink.emit(Event::DeviceFailure {
            failure,
            message: failure.message(),
        });
    }

    fn send_file(
        &mut self,
        command: Command,
        path: Option<PathBuf>,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let Some(path) = path else {
            self.abandon(command, "no certificate file configured".to_string(), sink);
            return Ok(());
        };
        let payload = match std::fs::read(&path) {
            Ok(payload) => payload,
            Err(err) => {
                self.abandon(
                    command,
                    format!("failed reading {}: {err}", path.display()),
                    sink,
                );
                return Ok(());
            }
        };
        debug!(path = %path.display(), size = payload.len(), "sending file");
        self.send_payload(command, &payload, sink)
    }

    fn send_payload(
        &mut self,
        command: Command,
        payload: &[u8],
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        match self.writer.send(payload) {
            Ok(()) => {
                self.served(command, OVERHEAD + payload.len(), sink);
                Ok(())
            }
            Err(err @ FrameError::PayloadTooLarge { .. }) => {
                self.abandon(command, err.to_string(), sink);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn receive_key(
        &mut self,
        command: Command,
        kind: KeyKind,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        // Deadline and cancellation are checked per chunk, not only on idle reads.
        let started = Instant::now();
        let frame = loop {
            if !self.is_running() {
                let dropped = self.reader.discard_buffered();
                debug!(dropped, "dropping partial frame");
                self.abandon(command, "cancelled".to_string(), sink);
                return Ok(());
            }
            if let Some(limit) = self.config.exchange_timeout {
                if started.elapsed() >= limit {
                    let dropped = self.reader.discard_buffered();
                    self.abandon(
                        command,
                        format!("no complete frame within {limit:?} ({dropped} bytes dropped)"),
                        sink,
                    );
                    return Ok(());
                }
            }

            match self.reader.poll_frame() {
                Ok(Some(frame)) => break frame,
                Ok(None) => {}
                Err(err) if err.is_timeout() => {}
                Err(err @ FrameError::PayloadTooLarge { .. }) => {
                    self.abandon(command, err.to_string(), sink);
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        };

        let computed = frame.computed_checksum();
        if !frame.is_verified() {
            warn!(
                declared = frame.checksum,
                computed,
                size = frame.payload.len(),
                "{}",
                kind.mismatch_message()
            );
            self.summary.checksum_mismatches += 1;
            sink.emit(Event::ChecksumMismatch {
                kind,
                message: kind.mismatch_message(),
                declared: frame.checksum,
                computed,
            });
            return Ok(());
        }

        let material = kind.select(&frame.payload, &self.config.ek_cert_range);
        let encoded = encode_mime(material);
        info!(
            kind = kind.label(),
            received = frame.payload.len(),
            recorded = material.len(),
            "key material received"
        );
        sink.emit(Event::KeyMaterial {
            kind,
            size: material.len(),
            base64: encoded.clone(),
        });

        match self.key_log.append(&encoded) {
            Ok(()) => self.summary.key_records += 1,
            Err(err) => self.abandon(command, err.to_string(), sink),
        }
        Ok(())
    }

    /// Bytes received from the device but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.reader.buffered()
    }

    /// Counters so far.
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Consume the console and return the reader and writer streams.
    pub fn into_parts(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }
}
