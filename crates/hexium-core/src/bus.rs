//! The banked address-space decoder.
//!
//! A 24-bit address (16-bit address plus 8-bit bank byte) resolves to low
//! RAM, banked RAM, base ROM, cartridge banks, linear high RAM, or the
//! memory-mapped I/O page. The video coprocessor, the cartridge, and the
//! collaborator ports all hang off this decoder; the CPU sees nothing but
//! [`Bus`].

pub mod emu;
#[cfg(test)]
pub(crate) mod mock;

use tracing::warn;

use crate::cartridge::Cartridge;
use crate::memory::bus as map;
use crate::video::Vera;

use self::emu::EmuState;

/// What the CPU plugs into.
///
/// Slow I/O regions charge extra wait states, which the interpreter drains
/// into its cycle counter after each instruction.
pub trait Bus {
    fn read(&mut self, addr: u16, bank: u8) -> u8;
    fn write(&mut self, addr: u16, bank: u8, value: u8);

    /// Asserted when an interrupt vector is fetched.
    fn vector_pull(&mut self) {}

    /// Wait states accumulated since the last drain.
    fn drain_wait_states(&mut self) -> u32 {
        0
    }
}

/// A memory-mapped peripheral occupying a 16-byte register window (the VIA
/// ports and the optional MIDI card). Emulation of the devices themselves
/// is a host concern; the core only routes accesses and aggregates IRQs.
pub trait IoDevice {
    fn read(&mut self, reg: u8, debug: bool) -> u8;
    fn write(&mut self, reg: u8, value: u8);
    fn step(&mut self, cycles: u32) {
        let _ = cycles;
    }
    fn irq_line_high(&self) -> bool {
        false
    }
}

/// The FM synthesizer port at `$9F40-$9F5F`. The range is partially
/// decoded: even addresses latch the register number, odd addresses carry
/// data writes and status reads.
pub trait FmPort {
    fn write_reg(&mut self, reg: u8, value: u8);
    fn read_status(&mut self) -> u8;
    fn step(&mut self, cycles: u32) {
        let _ = cycles;
    }
    fn irq_line_high(&self) -> bool {
        false
    }
}

/// Address-space geometry and diagnostics switches.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Banked-RAM banks behind the `$A000` window (1..=256).
    pub num_ram_banks: usize,
    /// 64 KiB banks reachable through a non-zero bank byte.
    pub num_linear_banks: usize,
    /// Honor the bank byte at all (65C816 machines). When clear every
    /// access collapses to bank 0.
    pub extended: bool,
    /// Fill RAM with random bytes at power-on instead of zeros.
    pub randomize: bool,
    /// Warn when the guest reads RAM it never wrote.
    pub report_uninitialized: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            num_ram_banks: map::NUM_MAX_RAM_BANKS,
            num_linear_banks: 1,
            extended: false,
            randomize: false,
            report_uninitialized: false,
        }
    }
}

pub struct AddressSpace {
    ram: Vec<u8>,
    bram: Vec<u8>,
    rom: Vec<u8>,
    ram_bank: u8,
    rom_bank: u8,

    num_ram_banks: usize,
    num_linear_banks: usize,
    extended: bool,
    report_uninitialized: bool,

    pub video: Vera,
    pub cartridge: Option<Cartridge>,
    pub via1: Option<Box<dyn IoDevice>>,
    pub via2: Option<Box<dyn IoDevice>>,
    pub fm: Option<Box<dyn FmPort>>,
    /// Optional MIDI card: 16-byte-aligned base address inside the I/O page
    /// plus the device behind it.
    pub midi: Option<(u16, Box<dyn IoDevice>)>,
    pub emu: EmuState,

    fm_reg: u8,
    wait_states: u32,
    clock: u32,

    ram_written: Vec<bool>,
    bram_written: Vec<bool>,
}

impl AddressSpace {
    pub fn new(config: &BusConfig) -> Self {
        let num_ram_banks = config.num_ram_banks.clamp(1, map::NUM_MAX_RAM_BANKS);
        let num_linear_banks = config.num_linear_banks.clamp(1, 256);
        let mut ram = vec![0u8; num_linear_banks * map::LINEAR_BANK_SIZE];
        let mut bram = vec![0u8; num_ram_banks * map::RAM_BANK_SIZE];

        if config.randomize {
            rand::fill(&mut ram[..]);
            // Leave the unused hole in the address space at 0: memory dumps
            // will likely confuse people less often.
            ram[usize::from(map::IO_BASE)..0x10000].fill(0);
            rand::fill(&mut bram[..]);
        }

        let (ram_written, bram_written) = if config.report_uninitialized {
            (vec![false; ram.len()], vec![false; bram.len()])
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            ram,
            bram,
            rom: vec![0; map::NUM_ROM_BANKS * map::ROM_BANK_SIZE],
            ram_bank: 0,
            rom_bank: 0,
            num_ram_banks,
            num_linear_banks,
            extended: config.extended,
            report_uninitialized: config.report_uninitialized,
            video: Vera::new(config.randomize),
            cartridge: None,
            via1: None,
            via2: None,
            fm: None,
            midi: None,
            emu: EmuState::default(),
            fm_reg: 0,
            wait_states: 0,
            clock: 0,
            ram_written,
            bram_written,
        }
    }

    /// Restores the default bank selections.
    pub fn reset(&mut self) {
        self.ram_bank = 0;
        self.rom_bank = 0;
    }

    pub fn set_ram_bank(&mut self, bank: u8) {
        self.ram_bank = bank;
    }

    pub fn ram_bank(&self) -> u8 {
        self.ram_bank
    }

    pub fn set_rom_bank(&mut self, bank: u8) {
        self.rom_bank = bank;
    }

    pub fn rom_bank(&self) -> u8 {
        self.rom_bank
    }

    /// Copies a ROM image into the base ROM banks.
    pub fn load_rom(&mut self, image: &[u8]) {
        let len = image.len().min(self.rom.len());
        self.rom[..len].copy_from_slice(&image[..len]);
    }

    /// Mirror of the CPU cycle counter for the clock-snapshot registers.
    pub fn set_clock(&mut self, clock: u32) {
        self.clock = clock;
    }

    /// Level of the aggregated peripheral IRQ line (video core plus every
    /// attached collaborator).
    pub fn irq_line_high(&self) -> bool {
        self.video.irq_line_high()
            || self.via1.as_ref().is_some_and(|d| d.irq_line_high())
            || self.via2.as_ref().is_some_and(|d| d.irq_line_high())
            || self.fm.as_ref().is_some_and(|d| d.irq_line_high())
            || self.midi.as_ref().is_some_and(|(_, d)| d.irq_line_high())
    }

    /// Advances the attached collaborators; the video core is stepped
    /// separately by the scheduler because it reports frame boundaries.
    pub fn step_peripherals(&mut self, cycles: u32) {
        if let Some(via1) = &mut self.via1 {
            via1.step(cycles);
        }
        if let Some(via2) = &mut self.via2 {
            via2.step(cycles);
        }
        if let Some(fm) = &mut self.fm {
            fm.step(cycles);
        }
        if let Some((_, midi)) = &mut self.midi {
            midi.step(cycles);
        }
    }

    /// Debugger read: same decode, no I/O side effects, no wait states.
    /// `bank_override` substitutes the RAM/ROM bank selection.
    pub fn debug_read(&mut self, addr: u16, bank: u8, bank_override: Option<u8>) -> u8 {
        self.read_internal(addr, bank, true, bank_override)
    }

    /// Debugger write: may patch base ROM.
    pub fn debug_write(&mut self, addr: u16, bank: u8, value: u8, bank_override: Option<u8>) {
        self.write_internal(addr, bank, value, true, bank_override);
    }

    fn open_bus(addr: u16) -> u8 {
        (addr >> 8) as u8
    }

    fn read_internal(&mut self, addr: u16, bank: u8, debug: bool, bank_override: Option<u8>) -> u8 {
        let bank = if self.extended { bank } else { 0 };

        if bank != 0 {
            let index = usize::from(bank);
            if index < self.num_linear_banks {
                return self.ram[index * map::LINEAR_BANK_SIZE + usize::from(addr)];
            }
            return Self::open_bus(addr);
        }

        if addr < 2 {
            // CPU port
            return if addr == 0 { self.ram_bank } else { self.rom_bank };
        }
        if addr < map::IO_BASE {
            return self.ram[usize::from(addr)];
        }
        if addr < map::BANKED_RAM_BASE {
            return self.read_io(addr, debug);
        }
        if addr < map::ROM_BASE {
            let ram_bank = bank_override.unwrap_or(self.ram_bank);
            if usize::from(ram_bank) < self.num_ram_banks {
                let offset = usize::from(addr - map::BANKED_RAM_BASE);
                return self.bram[(usize::from(ram_bank) << 13) + offset];
            }
            return Self::open_bus(addr);
        }

        let rom_bank = bank_override.unwrap_or(self.rom_bank);
        if usize::from(rom_bank) < map::NUM_ROM_BANKS {
            let offset = usize::from(addr - map::ROM_BASE);
            self.rom[(usize::from(rom_bank) << 14) + offset]
        } else {
            match &self.cartridge {
                Some(cartridge) => cartridge
                    .read(addr, rom_bank)
                    .unwrap_or_else(|| Self::open_bus(addr)),
                None => Self::open_bus(addr),
            }
        }
    }

    fn read_io(&mut self, addr: u16, debug: bool) -> u8 {
        if !debug && addr >= map::SLOW_IO_BASE {
            // slow IO5-7 range
            self.wait_states += map::SLOW_IO_WAIT_STATES;
        }

        if addr < map::VIA2_BASE {
            match &mut self.via1 {
                Some(via1) => via1.read((addr & 0xF) as u8, debug),
                None => map::IO_OPEN_BUS,
            }
        } else if addr < map::VIDEO_BASE {
            match &mut self.via2 {
                Some(via2) => via2.read((addr & 0xF) as u8, debug),
                None => map::IO_OPEN_BUS,
            }
        } else if addr < map::FM_BASE {
            self.video.read((addr & 0x1F) as u8, debug)
        } else if addr < map::FM_END {
            // slow IO2 range
            if !debug {
                self.wait_states += map::SLOW_IO_WAIT_STATES;
            }
            if addr & 0x01 != 0 {
                // partial decoding in this range
                match &mut self.fm {
                    Some(fm) => fm.read_status(),
                    None => map::IO_OPEN_BUS,
                }
            } else {
                map::IO_OPEN_BUS
            }
        } else if (map::EMU_BASE..map::EMU_BASE + 16).contains(&addr) {
            let clock = self.clock;
            self.emu.read((addr & 0xF) as u8, debug, clock)
        } else if let Some((base, midi)) = &mut self.midi
            && addr & 0xFFF0 == *base
        {
            midi.read((addr & 0xF) as u8, debug)
        } else {
            // future expansion
            map::IO_OPEN_BUS
        }
    }

    fn write_internal(
        &mut self,
        addr: u16,
        bank: u8,
        value: u8,
        debug: bool,
        bank_override: Option<u8>,
    ) {
        let bank = if self.extended { bank } else { 0 };

        if bank != 0 {
            let index = usize::from(bank);
            if index < self.num_linear_banks {
                let offset = index * map::LINEAR_BANK_SIZE + usize::from(addr);
                self.ram[offset] = value;
                self.mark_ram_written(offset);
            }
            return;
        }

        if addr < 2 {
            // CPU port; the byte also lands in RAM below
            if addr == 0 {
                self.ram_bank = value;
            } else {
                self.rom_bank = value;
            }
        }

        if addr < map::IO_BASE {
            self.ram[usize::from(addr)] = value;
            self.mark_ram_written(usize::from(addr));
        } else if addr < map::BANKED_RAM_BASE {
            self.write_io(addr, value, debug);
        } else if addr < map::ROM_BASE {
            let ram_bank = bank_override.unwrap_or(self.ram_bank);
            if usize::from(ram_bank) < self.num_ram_banks {
                let offset = (usize::from(ram_bank) << 13) + usize::from(addr - map::BANKED_RAM_BASE);
                self.bram[offset] = value;
                if self.report_uninitialized {
                    self.bram_written[offset] = true;
                }
            }
        } else {
            let rom_bank = bank_override.unwrap_or(self.rom_bank);
            if usize::from(rom_bank) < map::NUM_ROM_BANKS {
                // Base ROM ignores writes, unless patched via the debugger.
                if debug {
                    let offset = (usize::from(rom_bank) << 14) + usize::from(addr - map::ROM_BASE);
                    self.rom[offset] = value;
                }
            } else if let Some(cartridge) = &mut self.cartridge {
                cartridge.write(addr, rom_bank, value);
            }
        }
    }

    fn write_io(&mut self, addr: u16, value: u8, debug: bool) {
        if !debug && addr >= map::SLOW_IO_BASE {
            // slow IO5-7 range
            self.wait_states += map::SLOW_IO_WAIT_STATES;
        }

        if addr < map::VIA2_BASE {
            if let Some(via1) = &mut self.via1 {
                via1.write((addr & 0xF) as u8, value);
            }
        } else if addr < map::VIDEO_BASE {
            if let Some(via2) = &mut self.via2 {
                via2.write((addr & 0xF) as u8, value);
            }
        } else if addr < map::FM_BASE {
            self.video.write((addr & 0x1F) as u8, value);
        } else if addr < map::FM_END {
            // slow IO2 range
            if !debug {
                self.wait_states += map::SLOW_IO_WAIT_STATES;
            }
            if addr & 0x01 == 0 {
                // register select (partially decoded)
                self.fm_reg = value;
            } else if let Some(fm) = &mut self.fm {
                let reg = self.fm_reg;
                fm.write_reg(reg, value);
            }
        } else if (map::EMU_BASE..map::EMU_BASE + 16).contains(&addr) {
            let clock = self.clock;
            self.emu.write((addr & 0xF) as u8, value, clock);
        } else if let Some((base, midi)) = &mut self.midi
            && addr & 0xFFF0 == *base
        {
            midi.write((addr & 0xF) as u8, value);
        }
        // future expansion: writes are dropped
    }

    fn mark_ram_written(&mut self, offset: usize) {
        if self.report_uninitialized {
            self.ram_written[offset] = true;
        }
    }

    /// Warns about reads of RAM bytes the guest never wrote.
    fn check_uninitialized(&self, addr: u16, bank: u8) {
        if !self.report_uninitialized {
            return;
        }
        let bank = if self.extended { bank } else { 0 };
        if bank != 0 {
            let offset = usize::from(bank) * map::LINEAR_BANK_SIZE + usize::from(addr);
            if offset < self.ram_written.len() && !self.ram_written[offset] {
                warn!("read of uninitialized RAM at {bank:02X}:{addr:04X}");
            }
        } else if addr < map::IO_BASE {
            if usize::from(addr) >= 2 && !self.ram_written[usize::from(addr)] {
                warn!("read of uninitialized RAM at {addr:04X}");
            }
        } else if (map::BANKED_RAM_BASE..map::ROM_BASE).contains(&addr)
            && usize::from(self.ram_bank) < self.num_ram_banks
        {
            let offset =
                (usize::from(self.ram_bank) << 13) + usize::from(addr - map::BANKED_RAM_BASE);
            if !self.bram_written[offset] {
                warn!(
                    "read of uninitialized banked RAM at {:02X}:{addr:04X}",
                    self.ram_bank
                );
            }
        }
    }

    /// Dumps memory contents: low/linear RAM, then banked RAM.
    pub fn save(
        &self,
        writer: &mut impl std::io::Write,
        dump_ram: bool,
        dump_banked: bool,
    ) -> std::io::Result<()> {
        if dump_ram {
            let len = if self.extended {
                self.ram.len()
            } else {
                usize::from(map::BANKED_RAM_BASE)
            };
            writer.write_all(&self.ram[..len])?;
        }
        if dump_banked {
            writer.write_all(&self.bram)?;
        }
        Ok(())
    }
}

impl Bus for AddressSpace {
    fn read(&mut self, addr: u16, bank: u8) -> u8 {
        self.check_uninitialized(addr, bank);
        self.read_internal(addr, bank, false, None)
    }

    fn write(&mut self, addr: u16, bank: u8, value: u8) {
        self.write_internal(addr, bank, value, false, None);
    }

    fn vector_pull(&mut self) {
        self.rom_bank = 0;
    }

    fn drain_wait_states(&mut self) -> u32 {
        std::mem::take(&mut self.wait_states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::header::BankType;

    fn address_space() -> AddressSpace {
        AddressSpace::new(&BusConfig::default())
    }

    #[test]
    fn low_ram_round_trips() {
        let mut bus = address_space();
        for addr in [0x0002u16, 0x0100, 0x1234, 0x9EFF] {
            bus.write(addr, 0, 0x5A);
            assert_eq!(bus.read(addr, 0), 0x5A);
        }
    }

    #[test]
    fn cpu_port_aliases_bank_registers() {
        let mut bus = address_space();
        bus.write(0x0000, 0, 7);
        bus.write(0x0001, 0, 3);
        assert_eq!(bus.ram_bank(), 7);
        assert_eq!(bus.rom_bank(), 3);
        assert_eq!(bus.read(0x0000, 0), 7);
        assert_eq!(bus.read(0x0001, 0), 3);
    }

    #[test]
    fn banked_ram_is_selected_by_ram_bank() {
        let mut bus = address_space();
        bus.set_ram_bank(3);
        bus.write(0xA000, 0, 0xAB);
        bus.set_ram_bank(4);
        assert_ne!(bus.read(0xA000, 0), 0xAB);
        bus.set_ram_bank(3);
        assert_eq!(bus.read(0xA000, 0), 0xAB);
    }

    #[test]
    fn missing_ram_bank_reads_open_bus() {
        let mut config = BusConfig::default();
        config.num_ram_banks = 4;
        let mut bus = AddressSpace::new(&config);
        bus.set_ram_bank(200);
        bus.write(0xA123, 0, 0x11); // dropped
        assert_eq!(bus.read(0xA123, 0), 0xA1);
    }

    #[test]
    fn rom_ignores_writes_but_debug_can_patch() {
        let mut bus = address_space();
        let mut image = vec![0u8; map::ROM_BANK_SIZE];
        image[0] = 0x42;
        bus.load_rom(&image);

        bus.write(0xC000, 0, 0x99);
        assert_eq!(bus.read(0xC000, 0), 0x42);

        bus.debug_write(0xC000, 0, 0x99, None);
        assert_eq!(bus.read(0xC000, 0), 0x99);
    }

    #[test]
    fn empty_cartridge_bank_reads_open_bus() {
        let mut bus = address_space();
        bus.set_rom_bank(40);
        assert_eq!(bus.read(0xD234, 0), 0xD2);

        let mut cartridge = crate::cartridge::Cartridge::new();
        cartridge.fill(40, 40, BankType::Rom, 0x55555555).unwrap();
        bus.cartridge = Some(cartridge);
        assert_eq!(bus.read(0xD234, 0), 0x55);
        // bank 41 is still unpopulated
        bus.set_rom_bank(41);
        assert_eq!(bus.read(0xD234, 0), 0xD2);
    }

    #[test]
    fn cartridge_ram_bank_accepts_writes() {
        let mut bus = address_space();
        let mut cartridge = crate::cartridge::Cartridge::new();
        cartridge
            .define_bank_range(50, 50, BankType::UninitializedRam)
            .unwrap();
        bus.cartridge = Some(cartridge);
        bus.set_rom_bank(50);
        bus.write(0xC100, 0, 0x77);
        assert_eq!(bus.read(0xC100, 0), 0x77);
    }

    #[test]
    fn slow_io_reads_charge_wait_states() {
        let mut bus = address_space();
        bus.read(0x9FB0, 0);
        assert_eq!(bus.drain_wait_states(), map::SLOW_IO_WAIT_STATES);
        assert_eq!(bus.drain_wait_states(), 0);

        // the FM range is slow too
        bus.read(0x9F41, 0);
        assert_eq!(bus.drain_wait_states(), map::SLOW_IO_WAIT_STATES);

        // debug reads are free
        bus.debug_read(0x9FB0, 0, None);
        assert_eq!(bus.drain_wait_states(), 0);
    }

    #[test]
    fn unmapped_io_reads_open_bus() {
        let mut bus = address_space();
        assert_eq!(bus.read(0x9F00, 0), map::IO_OPEN_BUS); // no VIA attached
        assert_eq!(bus.read(0x9F60, 0), map::IO_OPEN_BUS);
        assert_eq!(bus.read(0x9FC0, 0), map::IO_OPEN_BUS);
    }

    #[test]
    fn emulator_state_window_identifies_itself() {
        let mut bus = address_space();
        assert_eq!(bus.read(0x9FBE, 0), b'1');
        assert_eq!(bus.read(0x9FBF, 0), b'6');
        bus.write(0x9FB3, 0, 2);
        assert_eq!(bus.read(0x9FB3, 0), 2);
        assert_eq!(bus.emu.echo_mode, 2);
    }

    #[test]
    fn clock_snapshot_latches_on_lsb_read() {
        let mut bus = address_space();
        bus.set_clock(0x11223344);
        bus.write(0x9FB8, 0, 0); // rebase
        bus.set_clock(0x11223344 + 0x0100);
        assert_eq!(bus.read(0x9FB8, 0), 0x00);
        assert_eq!(bus.read(0x9FB9, 0), 0x01);
        assert_eq!(bus.read(0x9FBA, 0), 0x00);
        assert_eq!(bus.read(0x9FBB, 0), 0x00);
    }

    #[test]
    fn vector_pull_restores_rom_bank_zero() {
        let mut bus = address_space();
        bus.set_rom_bank(12);
        bus.vector_pull();
        assert_eq!(bus.rom_bank(), 0);
    }

    #[test]
    fn linear_banks_require_the_extended_bus() {
        let mut plain = address_space();
        plain.write(0x4000, 2, 0x12);
        // bank byte ignored: the write landed in bank 0
        assert_eq!(plain.read(0x4000, 0), 0x12);

        let mut config = BusConfig::default();
        config.extended = true;
        config.num_linear_banks = 4;
        let mut wide = AddressSpace::new(&config);
        wide.write(0x4000, 2, 0x34);
        assert_eq!(wide.read(0x4000, 2), 0x34);
        assert_eq!(wide.read(0x4000, 0), 0x00);
        // out-of-range banks float
        assert_eq!(wide.read(0x4000, 200), 0x40);
    }

    #[test]
    fn video_window_reaches_the_core() {
        let mut bus = address_space();
        // select the data port address and write through port 0
        bus.write(0x9F20, 0, 0x00);
        bus.write(0x9F21, 0, 0x00);
        bus.write(0x9F22, 0, 0x10); // increment 1
        bus.write(0x9F23, 0, 0x42);
        assert_eq!(bus.video.space_read(0), 0x42);
    }
}
