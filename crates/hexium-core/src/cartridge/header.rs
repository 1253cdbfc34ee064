//! The on-disk cartridge header: magic, version, text fields, and the
//! bank-type table.
//!
//! Everything before the payload is fixed-size and little-endian. Text
//! fields are NUL-padded; the version string is space-padded ASCII.

use crate::error::Error;
use crate::memory::cartridge::MAX_BANKS;

/// Total header length: 256 descriptor bytes plus one bank-type byte per
/// cartridge bank.
pub const HEADER_LEN: usize = 256 + MAX_BANKS;

pub const MAGIC: [u8; 16] = *b"CX16 CARTRIDGE\r\n";
pub const CURRENT_VERSION: [u8; 16] = *b"01.00           ";

pub const DESCRIPTION_LEN: usize = 32;
pub const AUTHOR_LEN: usize = 32;
pub const COPYRIGHT_LEN: usize = 32;
pub const PROGRAM_VERSION_LEN: usize = 32;
const RESERVED_LEN: usize = 96;

/// Per-bank storage class.
///
/// ROM banks are read-only; RAM banks reset on every load; NVRAM banks are
/// persisted separately in the sidecar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum BankType {
    #[default]
    None = 0,
    Rom = 1,
    UninitializedRam = 2,
    InitializedRam = 3,
    UninitializedNvram = 4,
    InitializedNvram = 5,
}

impl BankType {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Rom),
            2 => Some(Self::UninitializedRam),
            3 => Some(Self::InitializedRam),
            4 => Some(Self::UninitializedNvram),
            5 => Some(Self::InitializedNvram),
            _ => None,
        }
    }

    /// Banks whose payload is stored in the main cartridge file.
    pub fn stored_in_cartridge(self) -> bool {
        matches!(
            self,
            Self::Rom | Self::InitializedRam | Self::InitializedNvram
        )
    }

    /// Banks persisted to the NVRAM sidecar.
    pub fn is_nvram(self) -> bool {
        matches!(self, Self::UninitializedNvram | Self::InitializedNvram)
    }

    /// Banks the guest may write to.
    pub fn writable(self) -> bool {
        matches!(
            self,
            Self::UninitializedRam
                | Self::InitializedRam
                | Self::UninitializedNvram
                | Self::InitializedNvram
        )
    }
}

/// Parsed cartridge header.
#[derive(Debug, Clone)]
pub struct Header {
    description: [u8; DESCRIPTION_LEN],
    author: [u8; AUTHOR_LEN],
    copyright: [u8; COPYRIGHT_LEN],
    program_version: [u8; PROGRAM_VERSION_LEN],
    pub(crate) bank_types: [BankType; MAX_BANKS],
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    pub fn new() -> Self {
        Self {
            description: [0; DESCRIPTION_LEN],
            author: [0; AUTHOR_LEN],
            copyright: [0; COPYRIGHT_LEN],
            program_version: [0; PROGRAM_VERSION_LEN],
            bank_types: [BankType::None; MAX_BANKS],
        }
    }

    /// Parses a header, verifying the magic number and format version.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::HeaderTooShort {
                actual: bytes.len(),
            });
        }
        if bytes[0..16] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        if bytes[16..32] != CURRENT_VERSION {
            let mut found = [0u8; 16];
            found.copy_from_slice(&bytes[16..32]);
            return Err(Error::UnsupportedVersion { found });
        }

        let mut header = Self::new();
        header.description.copy_from_slice(&bytes[32..64]);
        header.author.copy_from_slice(&bytes[64..96]);
        header.copyright.copy_from_slice(&bytes[96..128]);
        header.program_version.copy_from_slice(&bytes[128..160]);
        // bytes 160..256 are reserved
        for (bank, raw) in bytes[256..256 + MAX_BANKS].iter().enumerate() {
            header.bank_types[bank] = match BankType::from_raw(*raw) {
                Some(bank_type) => bank_type,
                None => {
                    tracing::warn!("unknown cartridge bank type {raw} at bank {bank}");
                    BankType::None
                }
            };
        }
        Ok(header)
    }

    /// Serializes the header in on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..16].copy_from_slice(&MAGIC);
        bytes[16..32].copy_from_slice(&CURRENT_VERSION);
        bytes[32..64].copy_from_slice(&self.description);
        bytes[64..96].copy_from_slice(&self.author);
        bytes[96..128].copy_from_slice(&self.copyright);
        bytes[128..160].copy_from_slice(&self.program_version);
        for (bank, bank_type) in self.bank_types.iter().enumerate() {
            bytes[256 + bank] = *bank_type as u8;
        }
        bytes
    }

    pub fn bank_types(&self) -> &[BankType; MAX_BANKS] {
        &self.bank_types
    }

    pub fn description(&self) -> String {
        text_field(&self.description)
    }

    pub fn author(&self) -> String {
        text_field(&self.author)
    }

    pub fn copyright(&self) -> String {
        text_field(&self.copyright)
    }

    pub fn program_version(&self) -> String {
        text_field(&self.program_version)
    }

    pub fn set_description(&mut self, value: &str) {
        set_text_field(&mut self.description, value);
    }

    pub fn set_author(&mut self, value: &str) {
        set_text_field(&mut self.author, value);
    }

    pub fn set_copyright(&mut self, value: &str) {
        set_text_field(&mut self.copyright, value);
    }

    pub fn set_program_version(&mut self, value: &str) {
        set_text_field(&mut self.program_version, value);
    }
}

fn text_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn set_text_field(field: &mut [u8], value: &str) {
    field.fill(0);
    let len = value.len().min(field.len());
    field[..len].copy_from_slice(&value.as_bytes()[..len]);
}
