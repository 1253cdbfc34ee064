//! The emulator-state register window at `$9FB0-$9FBF`.
//!
//! Guests use this window to toggle host-side features and to read a
//! snapshot of the CPU clock. The recorders and the debugger themselves are
//! host concerns; the window just latches their command bytes.
//!
//! Register map:
//! - 0: debugger enable
//! - 1: video logging
//! - 2: keyboard logging
//! - 3: echo mode
//! - 4: save on exit
//! - 5: GIF recorder command
//! - 6: WAV recorder command
//! - 7: disable emulator hotkeys
//! - 8: write rebases the clock counter; read latches it and returns the LSB
//! - 9-11: write debug bytes / console output; read returns clock bytes 1-3
//! - 13: keymap index
//! - 14/15: ASCII "16" for emulator detection

use std::io::Write;

use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct EmuState {
    pub debugger_enabled: bool,
    pub log_video: bool,
    pub log_keyboard: bool,
    pub echo_mode: u8,
    pub save_on_exit: bool,
    pub gif_command: u8,
    pub wav_command: u8,
    pub disable_hotkeys: bool,
    pub keymap: u8,
    clock_base: u32,
    clock_snap: u32,
}

impl EmuState {
    pub fn write(&mut self, reg: u8, value: u8, clock: u32) {
        let v = value != 0;
        match reg {
            0 => self.debugger_enabled = v,
            1 => self.log_video = v,
            2 => self.log_keyboard = v,
            3 => self.echo_mode = value,
            4 => self.save_on_exit = v,
            5 => self.gif_command = value,
            6 => self.wav_command = value,
            7 => self.disable_hotkeys = v,
            8 => self.clock_base = clock,
            9 => println!("User debug 1: ${value:02x}"),
            10 => println!("User debug 2: ${value:02x}"),
            11 => {
                if value == 0x09 || value == 0x0A || value == 0x0D || (0x20..0x7F).contains(&value)
                {
                    print!("{}", value as char);
                } else if value >= 0xA1 {
                    print!("{}", iso_8859_15_char(value));
                } else {
                    print!("\u{FFFD}");
                }
                let _ = std::io::stdout().flush();
            }
            _ => warn!("invalid emulator-state register ${reg:x}"),
        }
    }

    pub fn read(&mut self, reg: u8, debug: bool, clock: u32) -> u8 {
        match reg {
            0 => self.debugger_enabled.into(),
            1 => self.log_video.into(),
            2 => self.log_keyboard.into(),
            3 => self.echo_mode,
            4 => self.save_on_exit.into(),
            5 => self.gif_command,
            6 => self.wav_command,
            7 => self.disable_hotkeys.into(),
            8 => {
                if !debug {
                    self.clock_snap = clock.wrapping_sub(self.clock_base);
                }
                self.clock_snap as u8
            }
            9 => (self.clock_snap >> 8) as u8,
            10 => (self.clock_snap >> 16) as u8,
            11 => (self.clock_snap >> 24) as u8,
            13 => self.keymap,
            14 => b'1', // emulator detection
            15 => b'6',
            _ => {
                if !debug {
                    warn!("invalid emulator-state register ${reg:x}");
                }
                0xFF
            }
        }
    }
}

/// ISO-8859-15 code point for a byte at or above `0xA1`: Latin-1 with the
/// eight revised positions.
fn iso_8859_15_char(byte: u8) -> char {
    match byte {
        0xA4 => '\u{20AC}', // euro sign
        0xA6 => 'Š',
        0xA8 => 'š',
        0xB4 => 'Ž',
        0xB8 => 'ž',
        0xBC => 'Œ',
        0xBD => 'œ',
        0xBE => 'Ÿ',
        _ => byte as char,
    }
}
