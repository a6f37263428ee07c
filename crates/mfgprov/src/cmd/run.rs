use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mfgprov_console::{Console, ConsoleConfig};
use mfgprov_frame::FrameConfig;
use mfgprov_transport::{LinkConfig, SerialLink};

use crate::cmd::RunArgs;
use crate::exit::{console_error, transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_summary, OutputFormat, Reporter};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let link_config = link_config(&args);
    let console_config = console_config(args);

    let writer =
        SerialLink::open(&link_config).map_err(|err| transport_error("open failed", err))?;
    let reader = writer
        .try_clone()
        .map_err(|err| transport_error("link split failed", err))?;

    let mut console = Console::new(reader, writer, console_config);
    install_ctrlc_handler(console.cancel_handle())?;

    tracing::info!(
        port = %link_config.port,
        ek_log = %console.config().ek_log.display(),
        "provisioning console ready"
    );

    let mut reporter = Reporter::stdout(format);
    let summary = console
        .run(&mut reporter)
        .map_err(|err| console_error("console stopped", err))?;

    print_summary(&summary, format);
    Ok(SUCCESS)
}

fn link_config(args: &RunArgs) -> LinkConfig {
    LinkConfig {
        port: args.port.clone(),
        baud_rate: args.baud,
        poll_interval: args.poll_interval,
    }
}

fn console_config(args: RunArgs) -> ConsoleConfig {
    let mut serial_number = args.serial_number.into_bytes();
    serial_number.push(b'\n');

    ConsoleConfig {
        mac0: args.mac0,
        mac1: args.mac1,
        device_cert: args.device_cert,
        ek_certificate: args.ek_certificate,
        serial_number,
        ek_log: args.ek_log,
        ek_cert_range: args.ek_cert_range,
        frame: FrameConfig {
            max_payload_size: args.max_payload,
        },
        exchange_timeout: args.exchange_timeout,
        ..ConsoleConfig::default()
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
