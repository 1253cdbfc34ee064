//! Whole-machine scenarios: CPU, decoder, and video core wired together by
//! the scheduler.

use std::cell::Cell;
use std::rc::Rc;

use hexium_core::bus::Bus;
use hexium_core::cartridge::Cartridge;
use hexium_core::cartridge::header::BankType;
use hexium_core::machine::{Machine, MachineConfig};

const ROM_BANK_SIZE: usize = 16 * 1024;

/// Builds a 32-bank ROM image with `program` at $C000 and the reset vector
/// pointing at it.
fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; 32 * ROM_BANK_SIZE];
    image[..program.len()].copy_from_slice(program);
    image[0x3FFC] = 0x00; // reset vector -> $C000
    image[0x3FFD] = 0xC0;
    image
}

fn machine_with_program(program: &[u8]) -> Machine {
    let mut machine = Machine::new(&MachineConfig::default());
    machine.load_rom(&rom_with_program(program));
    machine.reset();
    machine
}

#[test]
fn boots_through_the_reset_vector() {
    let mut machine = machine_with_program(&[0xA9, 0x42, 0x8D, 0x00, 0x02]); // LDA #$42; STA $0200
    machine.step();
    machine.step();
    assert_eq!(machine.cpu.a(), 0x42);
    assert_eq!(machine.bus.read(0x0200, 0), 0x42);
}

#[test]
fn guest_can_switch_ram_banks_through_the_cpu_port() {
    // LDA #$03; STA $00; LDA #$AB; STA $A000; LDA #$04; STA $00; LDA $A000
    let program = [
        0xA9, 0x03, 0x85, 0x00, 0xA9, 0xAB, 0x8D, 0x00, 0xA0, 0xA9, 0x04, 0x85, 0x00, 0xAD, 0x00,
        0xA0,
    ];
    let mut machine = machine_with_program(&program);
    for _ in 0..7 {
        machine.step();
    }
    // bank 4 does not hold bank 3's byte
    assert_ne!(machine.cpu.a(), 0xAB);

    // flip back by poking the port directly
    machine.bus.set_ram_bank(3);
    assert_eq!(machine.bus.read(0xA000, 0), 0xAB);
}

#[test]
fn cartridge_roundtrip_through_the_decoder() {
    let mut cartridge = Cartridge::new();
    cartridge.fill(32, 32, BankType::Rom, 0x55555555).unwrap();
    cartridge
        .fill(64, 64, BankType::InitializedNvram, 0xAAAAAAAA)
        .unwrap();

    let mut machine = machine_with_program(&[0xEA]);
    machine.insert_cartridge(cartridge);

    machine.bus.set_rom_bank(32);
    assert_eq!(machine.bus.read(0xC000, 0), 0x55);
    machine.bus.set_rom_bank(64);
    assert_eq!(machine.bus.read(0xC000, 0), 0xAA);
}

#[test]
fn stp_fires_the_stop_callback_once() {
    let mut machine = machine_with_program(&[0xEA, 0xDB]); // NOP; STP
    let stopped_at = Rc::new(Cell::new(None));
    let seen = stopped_at.clone();
    machine.set_on_stop(move |addr| seen.set(Some(addr)));

    machine.step();
    machine.step();
    assert_eq!(stopped_at.get(), Some(0xC001));
    assert!(machine.cpu.stopped());

    // the machine keeps ticking but the callback does not re-fire
    stopped_at.set(None);
    machine.step();
    assert_eq!(stopped_at.get(), None);
}

#[test]
fn vsync_interrupt_reaches_the_cpu() {
    // enable the VSYNC interrupt, set VGA output, then spin
    let program = [
        0xA9, 0x01, 0x8D, 0x26, 0x9F, // LDA #$01; STA $9F26 (IEN = VSYNC)
        0x8D, 0x29, 0x9F, // STA $9F29 (DCSEL=0: VGA output)
        0x58, // CLI
        0x4C, 0x09, 0xC0, // JMP *
    ];
    let mut machine = machine_with_program(&program);
    // IRQ vector -> a tight loop at $0500 in low RAM
    machine.bus.debug_write(0xFFFE, 0, 0x00, None);
    machine.bus.debug_write(0xFFFF, 0, 0x05, None);
    machine.bus.write(0x0500, 0, 0x4C); // JMP $0500
    machine.bus.write(0x0501, 0, 0x00);
    machine.bus.write(0x0502, 0, 0x05);

    machine.run_frame();
    // after the frame the VSYNC flag is up and the CPU took the vector
    assert_eq!(machine.bus.video.read(0x07, true) & 0x01, 0x01);
    assert!((0x0500..0x0503).contains(&machine.cpu.pc));
}

#[test]
fn frames_keep_a_steady_cycle_budget() {
    let mut machine = machine_with_program(&[0x4C, 0x00, 0xC0]); // JMP $C000
    machine.bus.video.write(0x09, 0x01); // VGA output

    machine.run_frame();
    let start = machine.cpu.cycles();
    machine.run_frame();
    let per_frame = machine.cpu.cycles() - start;

    // 525 lines of 800 pixels at 25 MHz, clocked at 8 MHz
    let expected = (525.0 * 800.0 * 8.0 / 25.0) as u32;
    let deviation = per_frame.abs_diff(expected);
    assert!(
        deviation < expected / 100,
        "frame took {per_frame} cycles, expected about {expected}"
    );
}

#[test]
fn emulator_state_window_is_visible_to_the_guest() {
    // LDA $9FBE; STA $0300; LDA $9FBF; STA $0301
    let program = [
        0xAD, 0xBE, 0x9F, 0x8D, 0x00, 0x03, 0xAD, 0xBF, 0x9F, 0x8D, 0x01, 0x03,
    ];
    let mut machine = machine_with_program(&program);
    for _ in 0..4 {
        machine.step();
    }
    assert_eq!(machine.bus.read(0x0300, 0), b'1');
    assert_eq!(machine.bus.read(0x0301, 0), b'6');
}

#[test]
fn slow_io_access_stretches_the_instruction() {
    // LDA $9FB0 pays 3 wait states on top of the 4-cycle absolute load
    let mut machine = machine_with_program(&[0xAD, 0xB0, 0x9F]);
    let before = machine.cpu.cycles();
    machine.step();
    assert_eq!(machine.cpu.cycles() - before, 4 + 3);
}

#[test]
fn native_mode_program_runs_on_the_816_machine() {
    let mut config = MachineConfig::default();
    config.is_816 = true;
    // CLC; XCE; REP #$30; LDA #$1234; STA $0400; SEC; XCE
    let program = [
        0x18, 0xFB, 0xC2, 0x30, 0xA9, 0x34, 0x12, 0x8D, 0x00, 0x04, 0x38, 0xFB,
    ];
    let mut machine = Machine::new(&config);
    machine.load_rom(&rom_with_program(&program));
    machine.reset();
    for _ in 0..7 {
        machine.step();
    }
    assert!(machine.cpu.e);
    assert_eq!(machine.bus.read(0x0400, 0), 0x34);
    assert_eq!(machine.bus.read(0x0401, 0), 0x12);
}
