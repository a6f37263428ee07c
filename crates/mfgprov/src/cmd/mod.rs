use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use mfgprov_frame::DEFAULT_MAX_PAYLOAD;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod inspect;
pub mod ports;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a device's provisioning requests over a serial port.
    Run(RunArgs),
    /// List serial ports on this host.
    Ports(PortsArgs),
    /// Decode a captured frame file and check its checksums.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Serial port the device is attached to (e.g. /dev/ttyUSB0, COM4).
    #[arg(long, short = 'p', env = "MFGPROV_PORT")]
    pub port: String,
    /// Line speed.
    #[arg(long, env = "MFGPROV_BAUD", default_value_t = mfgprov_transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// How often a quiet link is checked for Ctrl-C (e.g. 200ms).
    #[arg(long, env = "MFGPROV_POLL_INTERVAL", default_value = "200ms", value_parser = parse_duration)]
    pub poll_interval: Duration,
    /// Certificate file sent for MFG:devicecert.
    #[arg(long, env = "MFGPROV_DEVICE_CERT")]
    pub device_cert: Option<PathBuf>,
    /// Certificate file sent for MFG:ekcertificate. Default: --device-cert.
    #[arg(long, env = "MFGPROV_EK_CERTIFICATE")]
    pub ek_certificate: Option<PathBuf>,
    /// Serial number sent for MFG:smbiossystemserial; a newline is appended.
    #[arg(long, env = "MFGPROV_SERIAL_NUMBER", default_value = "RealSerialNumber123456789")]
    pub serial_number: String,
    /// Append-only log for received key material.
    #[arg(long, env = "MFGPROV_EK_LOG", default_value = "mfgek.txt")]
    pub ek_log: PathBuf,
    /// First MAC word (decimal or 0x-prefixed hex).
    #[arg(long, env = "MFGPROV_MAC0", default_value = "0xDEADBEEF", value_parser = parse_u32)]
    pub mac0: u32,
    /// Second MAC word (decimal or 0x-prefixed hex).
    #[arg(long, env = "MFGPROV_MAC1", default_value = "0x0000BAD0", value_parser = parse_u32)]
    pub mac1: u32,
    /// Byte range of an MFG:ekcert payload that is recorded (START..END).
    #[arg(long, env = "MFGPROV_EK_CERT_RANGE", default_value = "10..326", value_parser = parse_range)]
    pub ek_cert_range: Range<usize>,
    /// Abandon a key-material frame not completed within this long (e.g. 5s).
    #[arg(long, env = "MFGPROV_EXCHANGE_TIMEOUT", value_parser = parse_duration)]
    pub exchange_timeout: Option<Duration>,
    /// Largest frame payload accepted or sent, in bytes.
    #[arg(long, env = "MFGPROV_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Capture file holding one or more frames.
    pub file: PathBuf,
    /// Largest frame payload accepted, in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

pub fn parse_u32(input: &str) -> CliResult<u32> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => input.replace('_', "").parse(),
    };
    parsed.map_err(|_| CliError::new(USAGE, format!("invalid 32-bit value: {input}")))
}

pub fn parse_range(input: &str) -> CliResult<Range<usize>> {
    let invalid = || CliError::new(USAGE, format!("invalid range (expected START..END): {input}"));
    let (start, end) = input.trim().split_once("..").ok_or_else(invalid)?;
    let start: usize = start.parse().map_err(|_| invalid())?;
    let end: usize = end.parse().map_err(|_| invalid())?;
    if start > end {
        return Err(CliError::new(
            USAGE,
            format!("range start {start} is past its end {end}"),
        ));
    }
    Ok(start..end)
}
