use std::fs;

use bytes::BytesMut;
use mfgprov_frame::decode_frame;

use crate::cmd::InspectArgs;
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_inspection, FrameReport, InspectReport, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let capture = fs::read(&args.file)
        .map_err(|err| io_error(&format!("failed reading {}", args.file.display()), err))?;

    let report = inspect(&capture, args.max_payload);
    print_inspection(&report, format);

    let clean = report.error.is_none()
        && report.trailing_bytes == 0
        && report.frames.iter().all(|frame| frame.verified);
    if clean {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

/// Walk a capture of back-to-back frames.
fn inspect(capture: &[u8], max_payload: usize) -> InspectReport {
    let mut buf = BytesMut::from(capture);
    let mut frames = Vec::new();
    let mut error = None;

    loop {
        let offset = capture.len() - buf.len();
        match decode_frame(&mut buf, max_payload) {
            Ok(Some(frame)) => frames.push(FrameReport {
                index: frames.len(),
                offset,
                length: frame.payload.len(),
                declared_checksum: frame.checksum,
                computed_checksum: frame.computed_checksum(),
                verified: frame.is_verified(),
            }),
            Ok(None) => break,
            Err(err) => {
                error = Some(format!("at offset {offset}: {err}"));
                break;
            }
        }
    }

    InspectReport {
        frames,
        trailing_bytes: buf.len(),
        error,
    }
}
