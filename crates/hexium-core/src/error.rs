use std::fmt;

use crate::cartridge::header::HEADER_LEN;

#[derive(Debug)]
pub enum Error {
    /// Cartridge image is shorter than the 480-byte header.
    HeaderTooShort { actual: usize },
    /// Magic number (`"CX16 CARTRIDGE\r\n"`) is missing.
    InvalidMagic,
    /// Header advertises a format version we do not implement.
    UnsupportedVersion { found: [u8; 16] },
    /// A bank payload is shorter than advertised by the bank-type table.
    BankTooShort { bank: u8, expected: usize, actual: usize },
    /// A bank number outside the cartridge space (32..=255) was given to a
    /// cartridge-defining operation.
    InvalidBankRange { start: u8, end: u8 },
    /// A path was expected to name a cartridge (`.crt` or `.crt.gz`) file.
    NotACartridgePath(String),
    /// The cartridge has no associated path, so sidecar files cannot be
    /// derived.
    NoCartridgePath,
    /// Wrapper for I/O errors raised at the file-system boundary.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderTooShort { actual } => {
                write!(f, "header expected {HEADER_LEN} bytes, got {actual}")
            }
            Self::InvalidMagic => write!(f, "missing cartridge magic bytes"),
            Self::UnsupportedVersion { found } => {
                write!(
                    f,
                    "unsupported cartridge version: {:?}",
                    String::from_utf8_lossy(found)
                )
            }
            Self::BankTooShort {
                bank,
                expected,
                actual,
            } => write!(f, "bank {bank} expected {expected} bytes, got {actual}"),
            Self::InvalidBankRange { start, end } => {
                write!(f, "bank range {start}..={end} is outside cartridge space")
            }
            Self::NotACartridgePath(path) => {
                write!(f, "\"{path}\" does not appear to be a cartridge (.crt) file")
            }
            Self::NoCartridgePath => write!(f, "cartridge has no backing file"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
