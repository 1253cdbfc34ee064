//! The machine scheduler: the one place where time advances.
//!
//! The scheduler owns the CPU and the address space (which in turn owns the
//! video core, the cartridge, and the collaborator ports). Each step runs
//! one instruction, advances every peripheral by the cycles it consumed,
//! and aggregates the peripheral IRQ lines back into the CPU.

use crate::bus::{AddressSpace, BusConfig};
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;

/// Machine-level configuration.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Select the 65C816 personality instead of the 65C02.
    pub is_816: bool,
    /// CPU clock in MHz (1..=40).
    pub mhz: u8,
    pub bus: BusConfig,
    /// Allow partial-line renders on video register writes.
    pub enable_midline: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            is_816: false,
            mhz: 8,
            bus: BusConfig::default(),
            enable_midline: false,
        }
    }
}

type StopCallback = Box<dyn FnMut(u16)>;

pub struct Machine {
    pub cpu: Cpu,
    pub bus: AddressSpace,
    is_816: bool,
    mhz: u8,
    on_stop: Option<StopCallback>,
    stop_reported: bool,
}

impl Machine {
    pub fn new(config: &MachineConfig) -> Self {
        let mut bus_config = config.bus.clone();
        bus_config.extended = config.is_816;
        let mut bus = AddressSpace::new(&bus_config);
        bus.video.set_mhz(config.mhz.clamp(1, 40));
        bus.video.set_enable_midline(config.enable_midline);
        Self {
            cpu: Cpu::new(),
            bus,
            is_816: config.is_816,
            mhz: config.mhz.clamp(1, 40),
            on_stop: None,
            stop_reported: false,
        }
    }

    pub fn load_rom(&mut self, image: &[u8]) {
        self.bus.load_rom(image);
    }

    pub fn insert_cartridge(&mut self, cartridge: Cartridge) {
        self.bus.cartridge = Some(cartridge);
    }

    /// Callback fired once when the guest executes STP; the host decides
    /// whether to reset or ignore.
    pub fn set_on_stop(&mut self, callback: impl FnMut(u16) + 'static) {
        self.on_stop = Some(Box::new(callback));
    }

    /// Full machine reset: banks, video core, and CPU (through the reset
    /// vector).
    pub fn reset(&mut self) {
        self.bus.reset();
        self.bus.video.reset();
        self.cpu.reset(&mut self.bus, self.is_816);
        self.stop_reported = false;
    }

    /// Runs one instruction and advances every peripheral by the cycles it
    /// consumed. Returns `true` when the video core finished a frame.
    pub fn step(&mut self) -> bool {
        let cycles = self.cpu.step(&mut self.bus);
        self.bus.set_clock(self.cpu.cycles());

        self.bus.step_peripherals(cycles);
        let new_frame = self.bus.video.step(f32::from(self.mhz), cycles, false);

        if self.bus.irq_line_high() {
            self.cpu.irq(&mut self.bus);
        }

        if self.cpu.stopped() && !self.stop_reported {
            self.stop_reported = true;
            let addr = self.cpu.stop_addr();
            if let Some(on_stop) = &mut self.on_stop {
                on_stop(addr);
            }
        }

        new_frame
    }

    /// Steps until the next frame boundary.
    pub fn run_frame(&mut self) {
        while !self.step() {}
    }

    /// Asserts the NMI line (typically a host key combination).
    pub fn nmi(&mut self) {
        self.cpu.nmi(&mut self.bus);
    }

    /// Persists cartridge NVRAM if the cartridge carries any.
    pub fn save_nvram(&self) -> Result<(), crate::error::Error> {
        match &self.bus.cartridge {
            Some(cartridge) if cartridge.has_nvram() => cartridge.save_nvram(),
            _ => Ok(()),
        }
    }
}
