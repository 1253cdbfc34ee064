//! Cartridge banks: a 224-bank region of 16 KiB banks with per-bank type
//! and persistence semantics.
//!
//! The on-disk format is the header (see [`header`]) followed by the
//! payloads of every bank whose type is stored in the main file, in bank
//! order. NVRAM bank payloads live in a `<stem>.nvram` sidecar so they
//! survive across sessions without rewriting the cartridge image. Paths
//! ending in `.gz` are transparently gzip-compressed.

pub mod header;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::Error;
use crate::memory::cartridge::{BANK_SIZE, FIRST_BANK, MAX_BANKS, MAX_SIZE};

use self::header::{BankType, HEADER_LEN, Header};

pub struct Cartridge {
    header: Header,
    data: Vec<u8>,
    path: Option<PathBuf>,
    nvram_path: Option<PathBuf>,
}

impl Default for Cartridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge {
    /// An empty cartridge; all banks are `None`.
    pub fn new() -> Self {
        Self {
            header: Header::new(),
            data: vec![0; MAX_SIZE],
            path: None,
            nvram_path: None,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Backing file of a loaded cartridge.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Type of a bank, quoted in CPU bank number space.
    pub fn bank_type(&self, bank: u8) -> BankType {
        match bank.checked_sub(FIRST_BANK) {
            Some(index) => self.header.bank_types[usize::from(index)],
            None => BankType::None,
        }
    }

    /// Loads a cartridge image. ROM and initialized-RAM payloads come from
    /// the main file; initialized NVRAM prefers the sidecar when present.
    /// Uninitialized banks are zeroed, or filled with random bytes when
    /// `randomize` is set. On any failure the partially-read state is
    /// discarded.
    pub fn load(path: impl AsRef<Path>, randomize: bool) -> Result<Self, Error> {
        let path = path.as_ref();
        check_cartridge_path(path)?;
        let nvram_path = sidecar_path(path);

        let mut reader = open_reader(path)?;
        let mut nvram_reader = if nvram_path.is_file() {
            Some(BufReader::new(File::open(&nvram_path)?))
        } else {
            None
        };

        let mut header_bytes = [0u8; HEADER_LEN];
        reader.read_exact(&mut header_bytes)?;
        let header = Header::parse(&header_bytes)?;

        let mut data = vec![0u8; MAX_SIZE];
        let mut scratch = [0u8; BANK_SIZE];
        for bank in 0..MAX_BANKS {
            let chunk = &mut data[bank * BANK_SIZE..(bank + 1) * BANK_SIZE];
            let read_failed = |err: std::io::Error, bank: usize| Error::BankTooShort {
                bank: (bank + usize::from(FIRST_BANK)) as u8,
                expected: BANK_SIZE,
                actual: if err.kind() == std::io::ErrorKind::UnexpectedEof {
                    0
                } else {
                    BANK_SIZE
                },
            };
            match header.bank_types[bank] {
                BankType::None => {}
                BankType::Rom | BankType::InitializedRam => {
                    reader
                        .read_exact(chunk)
                        .map_err(|err| read_failed(err, bank))?;
                }
                BankType::UninitializedRam | BankType::UninitializedNvram => {
                    initialize_bank(chunk, randomize);
                }
                BankType::InitializedNvram => match &mut nvram_reader {
                    Some(nvram) => {
                        nvram
                            .read_exact(chunk)
                            .map_err(|err| read_failed(err, bank))?;
                        // the main file still carries a placeholder payload
                        reader
                            .read_exact(&mut scratch)
                            .map_err(|err| read_failed(err, bank))?;
                    }
                    None => {
                        reader
                            .read_exact(chunk)
                            .map_err(|err| read_failed(err, bank))?;
                    }
                },
            }
        }

        Ok(Self {
            header,
            data,
            path: Some(path.to_path_buf()),
            nvram_path: Some(nvram_path),
        })
    }

    /// Writes the header and every stored bank payload in bank order.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        check_cartridge_path(path)?;

        let mut writer = open_writer(path)?;
        writer.write_all(&self.header.to_bytes())?;
        for bank in 0..MAX_BANKS {
            if self.header.bank_types[bank].stored_in_cartridge() {
                writer.write_all(&self.data[bank * BANK_SIZE..(bank + 1) * BANK_SIZE])?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes every NVRAM bank payload to the sidecar file.
    pub fn save_nvram(&self) -> Result<(), Error> {
        let nvram_path = self.nvram_path.as_ref().ok_or(Error::NoCartridgePath)?;
        let mut writer = BufWriter::new(File::create(nvram_path)?);
        for bank in 0..MAX_BANKS {
            if self.header.bank_types[bank].is_nvram() {
                writer.write_all(&self.data[bank * BANK_SIZE..(bank + 1) * BANK_SIZE])?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Returns `true` when the cartridge has NVRAM banks to persist.
    pub fn has_nvram(&self) -> bool {
        self.header.bank_types.iter().any(|t| t.is_nvram())
    }

    /// Guest read. `None` for banks outside cartridge space and for
    /// unpopulated banks, which the bus folds into open-bus values.
    pub fn read(&self, addr: u16, bank: u8) -> Option<u8> {
        let index = usize::from(bank.checked_sub(FIRST_BANK)?);
        if self.header.bank_types[index] == BankType::None {
            return None;
        }
        let offset = usize::from(addr) & (BANK_SIZE - 1);
        Some(self.data[(index << 14) + offset])
    }

    /// Guest write; dropped for ROM and unpopulated banks.
    pub fn write(&mut self, addr: u16, bank: u8, value: u8) {
        let Some(index) = bank.checked_sub(FIRST_BANK) else {
            return;
        };
        let index = usize::from(index);
        if self.header.bank_types[index].writable() {
            let offset = usize::from(addr) & (BANK_SIZE - 1);
            self.data[(index << 14) + offset] = value;
        }
    }

    // --- builder operations (authoring tool) ---

    /// Assigns a type to an inclusive range of banks.
    pub fn define_bank_range(
        &mut self,
        start_bank: u8,
        end_bank: u8,
        bank_type: BankType,
    ) -> Result<(), Error> {
        let (start, end) = cart_range(start_bank, end_bank)?;
        for bank in start..=end {
            self.header.bank_types[bank] = bank_type;
        }
        Ok(())
    }

    /// Assigns a type to a bank range and fills its payload with a 32-bit
    /// little-endian pattern repeated every four bytes.
    pub fn fill(
        &mut self,
        start_bank: u8,
        end_bank: u8,
        bank_type: BankType,
        pattern: u32,
    ) -> Result<(), Error> {
        let (start, end) = cart_range(start_bank, end_bank)?;
        fill_pattern(&mut self.data[start << 14..(end + 1) << 14], pattern);
        for bank in start..=end {
            self.header.bank_types[bank] = bank_type;
        }
        Ok(())
    }

    /// Imports files tightly packed from `start_bank` on, assigning
    /// `bank_type` to every touched bank. The final partial bank is padded
    /// with the fill pattern; the fill range is clamped to the cartridge
    /// bounds.
    pub fn import_files(
        &mut self,
        files: &[impl AsRef<Path>],
        start_bank: u8,
        bank_type: BankType,
        pattern: u32,
    ) -> Result<(), Error> {
        let (start, _) = cart_range(start_bank, start_bank)?;

        let mut address = start << 14;
        for file in files {
            if address == MAX_SIZE {
                return Err(Error::InvalidBankRange {
                    start: start_bank,
                    end: 255,
                });
            }
            let mut reader = BufReader::new(File::open(file.as_ref())?);
            loop {
                let n = reader.read(&mut self.data[address..MAX_SIZE])?;
                if n == 0 {
                    break;
                }
                address += n;
            }
        }

        let fill_end = ((address + BANK_SIZE - 1) & !(BANK_SIZE - 1)).min(MAX_SIZE);
        fill_pattern(&mut self.data[address..fill_end], pattern);

        if address > start << 14 {
            let last = (address - 1) >> 14;
            for bank in start..=last {
                self.header.bank_types[bank] = bank_type;
            }
        }
        Ok(())
    }
}

/// Maps an inclusive CPU-space bank range into payload indices; anything
/// below bank 32 is an error for cartridge-defining operations.
fn cart_range(start_bank: u8, end_bank: u8) -> Result<(usize, usize), Error> {
    let err = Error::InvalidBankRange {
        start: start_bank,
        end: end_bank,
    };
    if start_bank < FIRST_BANK || end_bank < start_bank {
        return Err(err);
    }
    Ok((
        usize::from(start_bank - FIRST_BANK),
        usize::from(end_bank - FIRST_BANK),
    ))
}

fn fill_pattern(region: &mut [u8], pattern: u32) {
    let bytes = pattern.to_le_bytes();
    for (i, byte) in region.iter_mut().enumerate() {
        *byte = bytes[i & 3];
    }
}

fn initialize_bank(chunk: &mut [u8], randomize: bool) {
    if randomize {
        rand::fill(chunk);
    } else {
        chunk.fill(0);
    }
}

fn is_gz(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// The path must name a `.crt` file, optionally compressed as `.crt.gz`.
fn check_cartridge_path(path: &Path) -> Result<(), Error> {
    let inner = if is_gz(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    let ok = inner
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("crt"));
    if ok {
        Ok(())
    } else {
        Err(Error::NotACartridgePath(path.display().to_string()))
    }
}

/// `<cartridge-stem>.nvram` next to the (uncompressed) cartridge name.
fn sidecar_path(path: &Path) -> PathBuf {
    let base = if is_gz(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    };
    base.with_extension("nvram")
}

fn open_reader(path: &Path) -> Result<Box<dyn Read>, Error> {
    let file = BufReader::new(File::open(path)?);
    if is_gz(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn open_writer(path: &Path) -> Result<Box<dyn Write>, Error> {
    let file = BufWriter::new(File::create(path)?);
    if is_gz(path) {
        Ok(Box::new(GzEncoder::new(file, Compression::new(6))))
    } else {
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_ID: AtomicU32 = AtomicU32::new(0);

    /// Unique scratch path; the temp dir outlives the test run.
    fn scratch(name: &str) -> PathBuf {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "hexium-cart-{}-{id}-{name}",
            std::process::id()
        ))
    }

    #[test]
    fn new_cartridge_is_empty() {
        let cartridge = Cartridge::new();
        assert!(
            cartridge
                .header()
                .bank_types()
                .iter()
                .all(|t| *t == BankType::None)
        );
        assert_eq!(cartridge.read(0xC000, 32), None);
        assert_eq!(cartridge.read(0xC000, 0), None);
    }

    #[test]
    fn bank_ranges_below_32_are_rejected() {
        let mut cartridge = Cartridge::new();
        assert!(matches!(
            cartridge.define_bank_range(10, 40, BankType::Rom),
            Err(Error::InvalidBankRange { .. })
        ));
        assert!(matches!(
            cartridge.fill(40, 35, BankType::Rom, 0),
            Err(Error::InvalidBankRange { .. })
        ));
    }

    #[test]
    fn rom_banks_ignore_guest_writes() {
        let mut cartridge = Cartridge::new();
        cartridge.fill(32, 32, BankType::Rom, 0x11111111).unwrap();
        cartridge.write(0xC000, 32, 0x99);
        assert_eq!(cartridge.read(0xC000, 32), Some(0x11));

        cartridge
            .define_bank_range(33, 33, BankType::UninitializedRam)
            .unwrap();
        cartridge.write(0xC000, 33, 0x99);
        assert_eq!(cartridge.read(0xC000, 33), Some(0x99));
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = scratch("round-trip.crt");

        let mut cartridge = Cartridge::new();
        cartridge.header_mut().set_description("Test Cartridge");
        cartridge.header_mut().set_author("Nobody");
        cartridge.fill(32, 32, BankType::Rom, 0x55555555).unwrap();
        cartridge
            .fill(64, 64, BankType::InitializedNvram, 0xAAAAAAAA)
            .unwrap();
        cartridge.save(&path).unwrap();

        let loaded = Cartridge::load(&path, false).unwrap();
        assert_eq!(loaded.header().description(), "Test Cartridge");
        assert_eq!(loaded.header().author(), "Nobody");
        assert_eq!(loaded.bank_type(32), BankType::Rom);
        assert_eq!(loaded.bank_type(64), BankType::InitializedNvram);
        assert_eq!(loaded.read(0xC000, 32), Some(0x55));
        assert_eq!(loaded.read(0xFFFF, 32), Some(0x55));
        assert_eq!(loaded.read(0xC000, 64), Some(0xAA));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn uninitialized_banks_reset_on_load() {
        let path = scratch("uninit.crt");

        let mut cartridge = Cartridge::new();
        cartridge
            .fill(40, 41, BankType::UninitializedRam, 0x12121212)
            .unwrap();
        cartridge.save(&path).unwrap();

        let loaded = Cartridge::load(&path, false).unwrap();
        assert_eq!(loaded.bank_type(40), BankType::UninitializedRam);
        // payload is not persisted; banks come back zeroed
        assert_eq!(loaded.read(0xC000, 40), Some(0x00));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn nvram_prefers_the_sidecar() {
        let path = scratch("sidecar.crt");

        let mut cartridge = Cartridge::new();
        cartridge
            .fill(64, 64, BankType::InitializedNvram, 0x11111111)
            .unwrap();
        cartridge.save(&path).unwrap();

        // first load: no sidecar yet, payload comes from the image
        let mut loaded = Cartridge::load(&path, false).unwrap();
        assert_eq!(loaded.read(0xC000, 64), Some(0x11));

        // the guest updates NVRAM and the host persists it
        loaded.write(0xC000, 64, 0x77);
        loaded.save_nvram().unwrap();

        let reloaded = Cartridge::load(&path, false).unwrap();
        assert_eq!(reloaded.read(0xC000, 64), Some(0x77));
        assert_eq!(reloaded.read(0xC001, 64), Some(0x11));

        std::fs::remove_file(&path).unwrap();
        std::fs::remove_file(path.with_extension("nvram")).unwrap();
    }

    #[test]
    fn gz_cartridges_round_trip() {
        let path = scratch("packed.crt.gz");

        let mut cartridge = Cartridge::new();
        cartridge.fill(32, 33, BankType::Rom, 0xC3C3C3C3).unwrap();
        cartridge.save(&path).unwrap();

        // really compressed: a gzip stream starts with 1F 8B
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1F, 0x8B]);

        let loaded = Cartridge::load(&path, false).unwrap();
        assert_eq!(loaded.read(0xC000, 33), Some(0xC3));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_rejects_bad_magic_and_bad_paths() {
        let path = scratch("bad.crt");
        std::fs::write(&path, vec![0u8; HEADER_LEN]).unwrap();
        assert!(matches!(
            Cartridge::load(&path, false),
            Err(Error::InvalidMagic)
        ));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            Cartridge::load("image.bin", false),
            Err(Error::NotACartridgePath(_))
        ));
    }

    #[test]
    fn truncated_payload_is_reported() {
        let path = scratch("short.crt");

        let mut header = Header::new();
        header.bank_types[0] = BankType::Rom;
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&[0xEE; 100]); // far short of a full bank
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            Cartridge::load(&path, false),
            Err(Error::BankTooShort { bank: 32, .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn import_files_packs_tightly_and_pads_the_tail() {
        let bin_a = scratch("a.bin");
        let bin_b = scratch("b.bin");
        std::fs::write(&bin_a, vec![0xAA; BANK_SIZE + 100]).unwrap();
        std::fs::write(&bin_b, vec![0xBB; 50]).unwrap();

        let mut cartridge = Cartridge::new();
        cartridge
            .import_files(&[&bin_a, &bin_b], 32, BankType::Rom, 0x000000FF)
            .unwrap();

        // both touched banks got the type
        assert_eq!(cartridge.bank_type(32), BankType::Rom);
        assert_eq!(cartridge.bank_type(33), BankType::Rom);
        assert_eq!(cartridge.bank_type(34), BankType::None);

        // file B starts right after file A inside bank 33
        assert_eq!(cartridge.read(0xC000, 33), Some(0xAA));
        assert_eq!(cartridge.read(0xC064, 33), Some(0xBB));
        // the rest of bank 33 is fill pattern
        assert_eq!(cartridge.read(0xC100, 33), Some(0xFF));
        assert_eq!(cartridge.read(0xFFFF, 33), Some(0xFF));

        std::fs::remove_file(&bin_a).unwrap();
        std::fs::remove_file(&bin_b).unwrap();
    }

    #[test]
    fn fill_repeats_the_pattern_every_four_bytes() {
        let mut cartridge = Cartridge::new();
        cartridge
            .fill(32, 32, BankType::Rom, 0x44332211)
            .unwrap();
        assert_eq!(cartridge.read(0xC000, 32), Some(0x11));
        assert_eq!(cartridge.read(0xC001, 32), Some(0x22));
        assert_eq!(cartridge.read(0xC002, 32), Some(0x33));
        assert_eq!(cartridge.read(0xC003, 32), Some(0x44));
        assert_eq!(cartridge.read(0xC004, 32), Some(0x11));
    }
}
