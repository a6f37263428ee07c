use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mfgprov_console::{Event, EventSink, RunSummary, REBOOT_NOTICE};
use mfgprov_transport::PortInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Prints console events to stdout as they happen.
///
/// Text formats reproduce the bench transcript operators are used to; JSON
/// emits one object per line.
pub struct Reporter<W> {
    out: W,
    format: OutputFormat,
}

impl Reporter<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        if self.format == OutputFormat::Json {
            let line = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
            writeln!(self.out, "{line}")?;
            return self.out.flush();
        }

        match event {
            Event::Echo { line } => writeln!(self.out, "{line}")?,
            Event::Undecodable { size } => {
                writeln!(self.out, "undecodable line skipped ({size} bytes)")?
            }
            Event::Served { command, size } => {
                writeln!(self.out, "{}: sent {size} bytes", command.literal())?
            }
            Event::KeyMaterial { kind, base64, .. } => {
                writeln!(self.out, "{}", kind.label())?;
                writeln!(self.out, "{base64}")?;
            }
            Event::Provisioned { message } => writeln!(self.out, "{message}")?,
            Event::DeviceFailure { message, .. } | Event::ChecksumMismatch { message, .. } => {
                writeln!(self.out, "{message}")?;
                writeln!(self.out, "{REBOOT_NOTICE}")?;
            }
            Event::ExchangeAbandoned { command, reason } => {
                writeln!(self.out, "{}: abandoned ({reason})", command.literal())?
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for Reporter<W> {
    fn emit(&mut self, event: Event) {
        if let Err(err) = self.write_event(&event) {
            tracing::warn!(error = %err, "failed writing console output");
        }
    }
}

pub fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct SummaryOutput<'a> {
                event: &'static str,
                #[serde(flatten)]
                summary: &'a RunSummary,
            }
            let out = SummaryOutput {
                event: "summary",
                summary,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["LINES", "SERVED", "KEYS", "FAILURES", "BAD SUMS", "PROVISIONED"]);
            table.add_row(vec![
                summary.lines.to_string(),
                summary.served.to_string(),
                summary.key_records.to_string(),
                summary.device_failures.to_string(),
                summary.checksum_mismatches.to_string(),
                summary.provisioned.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "lines={} served={} keys={} failures={} bad_checksums={} abandoned={} provisioned={}",
                summary.lines,
                summary.served,
                summary.key_records,
                summary.device_failures,
                summary.checksum_mismatches,
                summary.abandoned,
                summary.provisioned
            );
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    product: Option<&'a str>,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    kind: &port.kind,
                    product: port.product.as_deref(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["PORT", "KIND", "PRODUCT"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.clone(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                match &port.product {
                    Some(product) => println!("{} ({}, {product})", port.name, port.kind),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
    }
}

/// One frame found in a capture file.
#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub index: usize,
    pub offset: usize,
    pub length: usize,
    pub declared_checksum: u32,
    pub computed_checksum: u32,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub frames: Vec<FrameReport>,
    pub trailing_bytes: usize,
    pub error: Option<String>,
}

pub fn print_inspection(report: &InspectReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "OFFSET", "LENGTH", "DECLARED", "COMPUTED", "VERIFIED"]);
            for frame in &report.frames {
                table.add_row(vec![
                    frame.index.to_string(),
                    frame.offset.to_string(),
                    frame.length.to_string(),
                    format!("{:#010x}", frame.declared_checksum),
                    format!("{:#010x}", frame.computed_checksum),
                    frame.verified.to_string(),
                ]);
            }
            println!("{table}");
            print_inspection_tail(report);
        }
        OutputFormat::Pretty => {
            for frame in &report.frames {
                println!(
                    "frame {} offset={} length={} declared={:#010x} computed={:#010x} verified={}",
                    frame.index,
                    frame.offset,
                    frame.length,
                    frame.declared_checksum,
                    frame.computed_checksum,
                    frame.verified
                );
            }
            print_inspection_tail(report);
        }
    }
}

fn print_inspection_tail(report: &InspectReport) {
    if report.trailing_bytes > 0 {
        println!("trailing bytes: {}", report.trailing_bytes);
    }
    if let Some(error) = &report.error {
        println!("error: {error}");
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}
