use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{ConsoleError, Result};

/// Characters per line of MIME-style base64 output.
const MIME_LINE_LENGTH: usize = 76;

/// Base64-encode in MIME layout: 76-character lines, each ending in `\n`.
///
/// Existing key-log consumers split records on this layout. Empty input
/// encodes to an empty string.
pub fn encode_mime(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MIME_LINE_LENGTH + 1);
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(MIME_LINE_LENGTH));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out
}

/// Append-only log of received key material.
///
/// The file is opened for each record and closed straight after, so records
/// already written survive the process being killed mid-session.
#[derive(Debug, Clone)]
pub struct KeyLog {
    path: PathBuf,
}

impl KeyLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record verbatim.
    pub fn append(&self, record: &str) -> Result<()> {
        let write = || -> std::io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            file.write_all(record.as_bytes())?;
            file.flush()
        };
        write().map_err(|source| ConsoleError::KeyLog {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mfgprov-keylog-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    #[test]
    fn mime_encoding_wraps_at_76() {
        assert_eq!(encode_mime(b""), "");
        assert_eq!(encode_mime(b"\x01\x02\x03"), "AQID\n");

        let encoded = encode_mime(&[0u8; 120]);
        let lines: Vec<&str> = encoded.split_terminator('\n').collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 76);
        assert_eq!(lines[2].len(), 8);
        assert!(encoded.ends_with('\n'));
    }

    #[test]
    fn append_creates_and_accumulates() {
        let dir = unique_temp_dir("append");
        let log = KeyLog::new(dir.join("mfgek.txt"));

        log.append("AQID\n").expect("first append should succeed");
        log.append("BAUG\n").expect("second append should succeed");

        let contents = std::fs::read_to_string(log.path()).expect("log should be readable");
        assert_eq!(contents, "AQID\nBAUG\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_to_missing_directory_fails() {
        let dir = unique_temp_dir("missing");
        let log = KeyLog::new(dir.join("no-such-dir").join("mfgek.txt"));

        let err = log.append("AQID\n").unwrap_err();
        assert!(matches!(err, ConsoleError::KeyLog { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
