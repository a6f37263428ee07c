//! Device command literals.
//!
//! Commands are matched by exact string equality; there is no prefix
//! matching and no case folding.

use std::ops::Range;

use serde::{Serialize, Serializer};

/// A recognised device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `MFG:reqmac`: device asks for its MAC address pair.
    RequestMac,
    /// `MFG:hostcheck`: device checks a provisioning host is attached.
    HostCheck,
    /// `MFG:devicecert`: device asks for its cross-signed certificate.
    DeviceCert,
    /// `MFG:ekcertificate`: device asks for its EK certificate.
    EkCertificate,
    /// `MFG:smbiossystemserial`: device asks for its system serial number.
    SmbiosSerial,
    /// `MFG:ekcert`: device is about to send its EK certificate.
    EkCert,
    /// `MFG:ekpublic`: device is about to send its EK public key.
    EkPublic,
    /// `MFG:success`: provisioning finished.
    Success,
    /// `MFGF:*`: device reports a failed step.
    Failure(FailureKind),
}

impl Command {
    /// Every command the console answers.
    pub const ALL: [Command; 16] = [
        Command::RequestMac,
        Command::HostCheck,
        Command::DeviceCert,
        Command::EkCertificate,
        Command::SmbiosSerial,
        Command::EkCert,
        Command::EkPublic,
        Command::Success,
        Command::Failure(FailureKind::Mac),
        Command::Failure(FailureKind::RemoteHost),
        Command::Failure(FailureKind::EkCert),
        Command::Failure(FailureKind::EkPublic),
        Command::Failure(FailureKind::DeviceCert),
        Command::Failure(FailureKind::EkCertificate),
        Command::Failure(FailureKind::Smbios),
        Command::Failure(FailureKind::ProvisionedStatus),
    ];

    /// Match a line against the command table.
    pub fn parse(line: &str) -> Option<Self> {
        let command = match line {
            "MFG:reqmac" => Command::RequestMac,
            "MFG:hostcheck" => Command::HostCheck,
            "MFG:devicecert" => Command::DeviceCert,
            "MFG:ekcertificate" => Command::EkCertificate,
            "MFG:smbiossystemserial" => Command::SmbiosSerial,
            "MFG:ekcert" => Command::EkCert,
            "MFG:ekpublic" => Command::EkPublic,
            "MFG:success" => Command::Success,
            other => Command::Failure(FailureKind::parse(other)?),
        };
        Some(command)
    }

    /// The literal the device sends for this command.
    pub fn literal(self) -> &'static str {
        match self {
            Command::RequestMac => "MFG:reqmac",
            Command::HostCheck => "MFG:hostcheck",
            Command::DeviceCert => "MFG:devicecert",
            Command::EkCertificate => "MFG:ekcertificate",
            Command::SmbiosSerial => "MFG:smbiossystemserial",
            Command::EkCert => "MFG:ekcert",
            Command::EkPublic => "MFG:ekpublic",
            Command::Success => "MFG:success",
            Command::Failure(kind) => kind.literal(),
        }
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.literal())
    }
}

/// A provisioning step the device reports as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Mac,
    RemoteHost,
    EkCert,
    EkPublic,
    DeviceCert,
    EkCertificate,
    Smbios,
    ProvisionedStatus,
}

impl FailureKind {
    fn parse(line: &str) -> Option<Self> {
        let kind = match line {
            "MFGF:mac" => FailureKind::Mac,
            "MFGF:remotehost" => FailureKind::RemoteHost,
            "MFGF:ekcert" => FailureKind::EkCert,
            "MFGF:ekpublic" => FailureKind::EkPublic,
            "MFGF:devicecert" => FailureKind::DeviceCert,
            "MFGF:ekcertificate" => FailureKind::EkCertificate,
            "MFGF:smbios" => FailureKind::Smbios,
            "MFGF:provisionedS" => FailureKind::ProvisionedStatus,
            _ => return None,
        };
        Some(kind)
    }

    /// The literal the device sends for this failure.
    pub fn literal(self) -> &'static str {
        match self {
            FailureKind::Mac => "MFGF:mac",
            FailureKind::RemoteHost => "MFGF:remotehost",
            FailureKind::EkCert => "MFGF:ekcert",
            FailureKind::EkPublic => "MFGF:ekpublic",
            FailureKind::DeviceCert => "MFGF:devicecert",
            FailureKind::EkCertificate => "MFGF:ekcertificate",
            FailureKind::Smbios => "MFGF:smbios",
            FailureKind::ProvisionedStatus => "MFGF:provisionedS",
        }
    }

    /// Operator diagnostic for this failure.
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::Mac => "Device failed to receive MAC address!",
            FailureKind::RemoteHost => "Device failed to communicate with host!",
            FailureKind::EkCert => "Device failed to retrieve EK certificate!",
            FailureKind::EkPublic => "Device failed to retrieve EK public key!",
            FailureKind::DeviceCert => "Device failed to store device certificate!",
            FailureKind::EkCertificate => "Device failed to store EK certificate!",
            FailureKind::Smbios => "Device failed to store smbios values!",
            FailureKind::ProvisionedStatus => "Device failed to store provisioning status!",
        }
    }
}

impl Serialize for FailureKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.literal())
    }
}

/// Key material the device sends back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Endorsement-key certificate; only a sub-range of the payload is kept.
    EkCert,
    /// Endorsement-key public part; the whole payload is kept.
    EkPublic,
}

impl KeyKind {
    /// Heading printed above the encoded material.
    pub fn label(self) -> &'static str {
        match self {
            KeyKind::EkCert => "fTPM Endorsement Key Certificate:",
            KeyKind::EkPublic => "fTPM Endorsement Key Public:",
        }
    }

    /// Diagnostic for a payload whose checksum did not match.
    pub fn mismatch_message(self) -> &'static str {
        match self {
            KeyKind::EkCert => "Invalid EK certificate received!",
            KeyKind::EkPublic => "Invalid EK public key received!",
        }
    }

    /// The part of `payload` that is recorded.
    ///
    /// For certificates, `cert_range` is clamped to the payload, so a short
    /// payload yields a shorter (possibly empty) slice rather than an error.
    pub fn select<'a>(self, payload: &'a [u8], cert_range: &Range<usize>) -> &'a [u8] {
        match self {
            KeyKind::EkCert => {
                let start = cert_range.start.min(payload.len());
                let end = cert_range.end.min(payload.len()).max(start);
                &payload[start..end]
            }
            KeyKind::EkPublic => payload,
        }
    }
}
