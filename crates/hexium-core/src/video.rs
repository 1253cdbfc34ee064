//! The video coprocessor: register window, VRAM data ports, scanline
//! renderer, raster timing, and IRQ generation.
//!
//! **Orientation for newcomers**
//! - The CPU sees a 32-byte register window. Two data ports expose VRAM
//!   through auto-incrementing 17-bit addresses; a 6-bit DCSEL selector
//!   multiplexes the display-composer register file through four window
//!   positions.
//! - Scan-out runs at a fixed 25 MHz pixel clock. The scheduler advances the
//!   core by CPU cycle counts; whenever the horizontal position crosses the
//!   end of a scan line, one output line is rendered in full.
//! - Composer and layer registers are double-buffered over a two-line
//!   history so mid-line writes land with the hardware's pipeline latency.
//! - Sprite collisions accumulate into the ISR high nibble and are latched
//!   at vsync.

mod fx;
mod layer;
mod palette;
mod sprite;

use tracing::trace;

use crate::memory::vram;
use crate::video::fx::Fx;
use crate::video::layer::LayerProperties;
use crate::video::palette::{CachedPalette, DEFAULT_PALETTE, resolve_entry};
use crate::video::sprite::SpriteProperties;

pub const SCREEN_WIDTH: usize = 640;
pub const SCREEN_HEIGHT: usize = 480;

pub(crate) const NUM_SPRITES: usize = 128;
const NUM_LAYERS: usize = 2;
const COMPOSER_SLOTS: usize = 4 * 64;

// both VGA and NTSC
const SCAN_HEIGHT: u16 = 525;
const PIXEL_FREQ: f32 = 25.0;

// VGA
const VGA_SCAN_WIDTH: f32 = 800.0;

// NTSC: 262.5 lines per frame, lower field first
const NTSC_HALF_SCAN_WIDTH: f32 = 794.0;
const NTSC_Y_OFFSET_LOW: u16 = 42;
const NTSC_Y_OFFSET_HIGH: u16 = 568;
const TITLE_SAFE_X: f32 = 0.067;
const TITLE_SAFE_Y: f32 = 0.05;

/// ISR bit assignments (low nibble; the high nibble holds collision bits).
pub(crate) const ISR_VSYNC: u8 = 1;
pub(crate) const ISR_LINE: u8 = 2;
pub(crate) const ISR_SPRCOL: u8 = 4;
pub(crate) const ISR_AFLOW: u8 = 8;

/// Version signature read back through write-only composer slots.
const VERSION: [u8; 4] = [b'V', 0x00, 0x03, 0x02];

/// Audio collaborator owned by the video core.
///
/// Sound synthesis is out of scope for the core; this trait is the contract
/// the synthesizer presents: the PSG register window inside VRAM, the PCM
/// control registers, and the FIFO level that drives the AFLOW interrupt.
pub trait AudioBackend {
    /// Catch the mixer up to the present before a register change.
    fn render(&mut self) {}
    /// Reset synthesizer state alongside the video core.
    fn reset(&mut self) {}
    fn psg_write(&mut self, reg: u8, value: u8) {
        let _ = (reg, value);
    }
    fn pcm_read_ctrl(&mut self) -> u8 {
        0
    }
    fn pcm_read_rate(&mut self) -> u8 {
        0
    }
    fn pcm_write_ctrl(&mut self, value: u8) {
        let _ = value;
    }
    fn pcm_write_rate(&mut self, value: u8) {
        let _ = value;
    }
    fn pcm_write_fifo(&mut self, value: u8) {
        let _ = value;
    }
    fn fifo_almost_empty(&self) -> bool {
        false
    }
}

/// The video coprocessor.
pub struct Vera {
    vram: Vec<u8>,
    palette: [u8; 512],
    sprite_data: [[u8; 8]; NUM_SPRITES],

    // data ports
    io_addr: [u32; 2],
    io_rddata: [u8; 2],
    io_inc: [u8; 2],
    addrsel: usize,
    dcsel: u8,

    ien: u8,
    isr: u8,
    irq_line: u16,

    reg_layer: [[u8; 7]; NUM_LAYERS],
    reg_composer: [u8; COMPOSER_SLOTS],
    prev_reg_composer: [[u8; COMPOSER_SLOTS]; 2],

    layer_properties: [LayerProperties; NUM_LAYERS],
    prev_layer_properties: [[LayerProperties; NUM_LAYERS]; 2],
    sprite_properties: [SpriteProperties; NUM_SPRITES],

    layer_line: [[u8; SCREEN_WIDTH]; NUM_LAYERS],
    sprite_line_col: [u8; SCREEN_WIDTH],
    sprite_line_z: [u8; SCREEN_WIDTH],
    sprite_line_mask: [u8; SCREEN_WIDTH],
    sprite_line_collisions: u8,
    layer_line_enable: [bool; NUM_LAYERS],
    old_layer_line_enable: [bool; NUM_LAYERS],
    sprite_line_enable: bool,
    old_sprite_line_enable: bool,

    fx: Fx,

    cached_palette: CachedPalette,

    vga_scan_pos_x: f32,
    vga_scan_pos_y: u16,
    ntsc_half_cnt: f32,
    ntsc_scan_pos_y: u16,
    frame_count: u32,

    framebuffer: Vec<u32>,

    // scan-out state carried between partial line renders
    y_prev: u16,
    s_pos_x_p: u16,
    eff_y_fp: u32, // 16.16 fixed point
    eff_x_fp: u32, // 16.16 fixed point
    col_line: [u8; SCREEN_WIDTH],

    mhz: f32,
    enable_midline: bool,
    randomize: bool,
    log_ports: bool,

    audio: Option<Box<dyn AudioBackend>>,
}

impl Vera {
    pub fn new(randomize: bool) -> Self {
        let mut vera = Self {
            vram: vec![0; vram::VRAM_SIZE],
            palette: [0; 512],
            sprite_data: [[0; 8]; NUM_SPRITES],
            io_addr: [0; 2],
            io_rddata: [0; 2],
            io_inc: [0; 2],
            addrsel: 0,
            dcsel: 0,
            ien: 0,
            isr: 0,
            irq_line: 0,
            reg_layer: [[0; 7]; NUM_LAYERS],
            reg_composer: [0; COMPOSER_SLOTS],
            prev_reg_composer: [[0; COMPOSER_SLOTS]; 2],
            layer_properties: [LayerProperties::default(); NUM_LAYERS],
            prev_layer_properties: [[LayerProperties::default(); NUM_LAYERS]; 2],
            sprite_properties: [SpriteProperties::default(); NUM_SPRITES],
            layer_line: [[0; SCREEN_WIDTH]; NUM_LAYERS],
            sprite_line_col: [0; SCREEN_WIDTH],
            sprite_line_z: [0; SCREEN_WIDTH],
            sprite_line_mask: [0; SCREEN_WIDTH],
            sprite_line_collisions: 0,
            layer_line_enable: [false; NUM_LAYERS],
            old_layer_line_enable: [false; NUM_LAYERS],
            sprite_line_enable: false,
            old_sprite_line_enable: false,
            fx: Fx::new(),
            cached_palette: CachedPalette::default(),
            vga_scan_pos_x: 0.0,
            vga_scan_pos_y: 0,
            ntsc_half_cnt: 0.0,
            ntsc_scan_pos_y: 0,
            frame_count: 0,
            framebuffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            y_prev: 0,
            s_pos_x_p: 0,
            eff_y_fp: 0,
            eff_x_fp: 0,
            col_line: [0; SCREEN_WIDTH],
            mhz: 8.0,
            enable_midline: false,
            randomize,
            log_ports: false,
            audio: None,
        };
        vera.reset();
        vera
    }

    /// CPU clock rate used when register writes trigger mid-line renders.
    pub fn set_mhz(&mut self, mhz: u8) {
        self.mhz = f32::from(mhz);
    }

    /// Enables mid-line raster effects (partial line renders on data-port
    /// writes).
    pub fn set_enable_midline(&mut self, enable: bool) {
        self.enable_midline = enable;
    }

    /// Enables trace logging of data-port accesses.
    pub fn set_log_ports(&mut self, enable: bool) {
        self.log_ports = enable;
    }

    pub fn attach_audio(&mut self, audio: Box<dyn AudioBackend>) {
        self.audio = Some(audio);
    }

    /// Resets the register file, ports, layers, palette, and composer to
    /// power-on state. VRAM is randomized or zeroed per the constructor
    /// flag.
    pub fn reset(&mut self) {
        // init I/O registers
        self.io_addr = [0; 2];
        self.io_inc = [0; 2];
        self.addrsel = 0;
        self.dcsel = 0;
        self.io_rddata = [0; 2];

        self.ien = 0;
        self.isr = 0;
        self.irq_line = 0;

        // init layer registers
        self.reg_layer = [[0; 7]; NUM_LAYERS];

        // init composer registers
        self.reg_composer = [0; COMPOSER_SLOTS];
        self.reg_composer[1] = 128; // hscale = 1.0
        self.reg_composer[2] = 128; // vscale = 1.0
        self.reg_composer[5] = (640 >> 2) as u8;
        self.reg_composer[7] = (480 >> 1) as u8;

        self.fx = Fx::new();

        // init sprite data
        self.sprite_data = [[0; 8]; NUM_SPRITES];

        // copy palette
        for (i, entry) in DEFAULT_PALETTE.iter().enumerate() {
            self.palette[i * 2] = *entry as u8;
            self.palette[i * 2 + 1] = (*entry >> 8) as u8;
        }
        self.refresh_palette();

        if self.randomize {
            rand::fill(&mut self.vram[..]);
        } else {
            self.vram.fill(0);
        }

        self.sprite_line_collisions = 0;

        self.vga_scan_pos_x = 0.0;
        self.vga_scan_pos_y = 0;
        self.ntsc_half_cnt = 0.0;
        self.ntsc_scan_pos_y = 0;

        for layer in 0..NUM_LAYERS {
            self.refresh_layer_properties(layer);
        }
        for sprite in 0..NUM_SPRITES {
            self.refresh_sprite_properties(sprite);
        }

        if let Some(audio) = &mut self.audio {
            audio.reset();
        }
    }

    // --- VRAM space ---

    pub fn space_read(&self, address: u32) -> u8 {
        self.vram[(address & vram::VRAM_MASK) as usize]
    }

    pub(crate) fn space_read_range(&self, dest: &mut [u8], address: u32) {
        let start = address as usize;
        if start + dest.len() <= vram::VRAM_SIZE {
            dest.copy_from_slice(&self.vram[start..start + dest.len()]);
        } else {
            for (i, byte) in dest.iter_mut().enumerate() {
                *byte = self.space_read(address.wrapping_add(i as u32));
            }
        }
    }

    /// Writes one byte of the video address space, mirroring it into the
    /// palette and sprite shadow state when it lands in their windows.
    pub fn space_write(&mut self, address: u32, value: u8) {
        self.vram[(address & vram::VRAM_MASK) as usize] = value;
        self.space_write_side_effects(address, value);
    }

    pub(crate) fn space_write_side_effects(&mut self, address: u32, value: u8) {
        let address = address & vram::VRAM_MASK;
        if (vram::PSG_START..vram::PSG_END).contains(&address) {
            if let Some(audio) = &mut self.audio {
                audio.render();
                audio.psg_write((address & 0x3F) as u8, value);
            }
        } else if (vram::PALETTE_START..vram::PALETTE_END).contains(&address) {
            self.palette[(address & 0x1FF) as usize] = value;
            self.cached_palette.dirty = true;
        } else if address >= vram::SPRITE_START {
            let sprite = (address >> 3 & 0x7F) as usize;
            self.sprite_data[sprite][(address & 0x7) as usize] = value;
            self.refresh_sprite_properties(sprite);
        }
    }

    // --- register window ---

    /// Reads one register of the 32-byte window. Debug reads have no side
    /// effects: data ports return the pre-fetched byte without advancing.
    pub fn read(&mut self, reg: u8, debug: bool) -> u8 {
        let ntsc_mode = self.reg_composer[0] & 2 != 0;
        let scanline = if ntsc_mode {
            self.ntsc_scan_pos_y % SCAN_HEIGHT
        } else {
            self.vga_scan_pos_y
        };
        let scanline = scanline.min(511);

        match reg & 0x1F {
            0x00 => self.io_addr[self.addrsel] as u8,
            0x01 => (self.io_addr[self.addrsel] >> 8) as u8,
            0x02 => {
                (self.io_addr[self.addrsel] >> 16) as u8
                    | u8::from(self.fx.nibble_bit[self.addrsel]) << 1
                    | u8::from(self.fx.nibble_incr[self.addrsel]) << 2
                    | self.io_inc[self.addrsel] << 3
            }
            reg @ (0x03 | 0x04) => {
                let port = usize::from(reg - 3);
                if debug {
                    return self.io_rddata[port];
                }

                let address = self.get_and_inc_address(port, false);
                let value = self.io_rddata[port];

                if port == 1 && self.fx.addr1_mode == 3 {
                    self.fx_affine_prefetch();
                } else {
                    self.io_rddata[port] = self.space_read(self.io_addr[port]);
                }

                if self.fx.cache_fill {
                    let i = usize::from(self.fx.cache_byte_index);
                    if self.fx.four_bit_mode {
                        if self.fx.cache_nibble_index {
                            self.fx.cache[i] = self.fx.cache[i] & 0xF0 | value & 0x0F;
                            self.fx.cache_nibble_index = false;
                            self.fx.cache_byte_index = self.fx.cache_byte_index + 1 & 0x3;
                        } else {
                            self.fx.cache[i] = self.fx.cache[i] & 0x0F | value & 0xF0;
                            self.fx.cache_nibble_index = true;
                        }
                    } else {
                        self.fx.cache[i] = value;
                        if self.fx.cache_increment_mode {
                            self.fx.cache_byte_index =
                                self.fx.cache_byte_index & 0x2 | self.fx.cache_byte_index + 1 & 0x1;
                        } else {
                            self.fx.cache_byte_index = self.fx.cache_byte_index + 1 & 0x3;
                        }
                    }
                }

                if self.log_ports {
                    trace!("READ  video_space[${address:X}] = ${value:02X}");
                }
                value
            }
            0x05 => self.dcsel << 1 | self.addrsel as u8,
            0x06 => {
                ((self.irq_line & 0x100) >> 1) as u8
                    | ((scanline & 0x100) >> 2) as u8
                    | self.ien & 0xF
            }
            0x07 => self.isr | self.aflow_bit(),
            0x08 => scanline as u8,

            reg @ 0x09..=0x0C => {
                let i = usize::from(reg - 0x09) + (usize::from(self.dcsel) << 2);
                match i {
                    // DCSEL = [0,1] with any composer register, or [2] at $9F29
                    0x00..=0x08 => self.reg_composer[i],
                    0x16 => {
                        // DCSEL=5, $9F2B
                        let len = self.fx.poly_fill_length;
                        let x_pos = self.fx.x_pixel_position;
                        let y_pos = self.fx.y_pixel_position;
                        if len >= 768 {
                            return if self.fx.two_bit_poly && self.fx.addr1_mode == 2 {
                                0x00
                            } else {
                                0x80
                            };
                        }
                        if self.fx.four_bit_mode {
                            if self.fx.two_bit_poly && self.fx.addr1_mode == 2 {
                                ((y_pos & 0x8000) >> 8) as u8
                                    | (x_pos >> 11) as u8 & 0x60
                                    | (x_pos >> 14) as u8 & 0x10
                                    | ((len & 0x7) << 1) as u8
                                    | ((x_pos & 0x8000) >> 15) as u8
                            } else {
                                u8::from(len & 0xFFF8 != 0) << 7
                                    | (x_pos >> 11) as u8 & 0x60
                                    | (x_pos >> 14) as u8 & 0x10
                                    | ((len & 0x7) << 1) as u8
                            }
                        } else {
                            u8::from(len & 0xFFF0 != 0) << 7
                                | (x_pos >> 11) as u8 & 0x60
                                | ((len & 0xF) << 1) as u8
                        }
                    }
                    // DCSEL=5, $9F2C
                    0x17 => ((self.fx.poly_fill_length & 0x03F8) >> 2) as u8,
                    0x18 => {
                        // DCSEL=6, $9F29: reading resets the accumulator
                        if !debug {
                            self.fx.mult_accumulator = 0;
                        }
                        VERSION[i % 4]
                    }
                    0x19 => {
                        // DCSEL=6, $9F2A: reading folds in the current product
                        if !debug {
                            self.fx.accumulate();
                        }
                        VERSION[i % 4]
                    }
                    // The rest of the space is write-only, so reading the
                    // values out instead returns the version string.
                    _ => VERSION[i % 4],
                }
            }

            reg @ 0x0D..=0x13 => self.reg_layer[0][usize::from(reg - 0x0D)],
            reg @ 0x14..=0x1A => self.reg_layer[1][usize::from(reg - 0x14)],

            0x1B => match &mut self.audio {
                Some(audio) => {
                    audio.render();
                    audio.pcm_read_ctrl()
                }
                None => 0,
            },
            0x1C => match &mut self.audio {
                Some(audio) => audio.pcm_read_rate(),
                None => 0,
            },
            0x1D => 0,

            // SPI port; storage emulation is a host concern
            0x1E | 0x1F => 0,
            _ => 0,
        }
    }

    /// Writes one register of the 32-byte window.
    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x1F {
            0x00 => {
                if self.fx.two_bit_poly
                    && self.fx.four_bit_mode
                    && self.fx.addr1_mode == 2
                    && self.addrsel == 1
                {
                    self.fx.two_bit_poking = true;
                    self.io_addr[1] = self.io_addr[1] & 0x1FFFC | u32::from(value & 0x3);
                } else {
                    self.io_addr[self.addrsel] =
                        self.io_addr[self.addrsel] & 0x1FF00 | u32::from(value);
                    if self.fx.hop_16bit && self.addrsel == 1 {
                        self.fx.hop_16bit_align = value & 3;
                    }
                }
                self.io_rddata[self.addrsel] = self.space_read(self.io_addr[self.addrsel]);
            }
            0x01 => {
                self.io_addr[self.addrsel] =
                    self.io_addr[self.addrsel] & 0x100FF | u32::from(value) << 8;
                self.io_rddata[self.addrsel] = self.space_read(self.io_addr[self.addrsel]);
            }
            0x02 => {
                self.io_addr[self.addrsel] =
                    self.io_addr[self.addrsel] & 0x0FFFF | u32::from(value & 0x1) << 16;
                self.fx.nibble_bit[self.addrsel] = value >> 1 & 0x1 != 0;
                self.fx.nibble_incr[self.addrsel] = value >> 2 & 0x1 != 0;
                self.io_inc[self.addrsel] = value >> 3;
                self.io_rddata[self.addrsel] = self.space_read(self.io_addr[self.addrsel]);
            }
            reg @ (0x03 | 0x04) => {
                let port = usize::from(reg - 3);

                if self.fx.two_bit_poking && self.fx.addr1_mode != 0 {
                    self.fx.two_bit_poking = false;
                    let cached = self.fx.cache[usize::from(self.fx.cache_byte_index)];
                    let latched = self.io_rddata[1];
                    let addr = (self.io_addr[1] & vram::VRAM_MASK) as usize;
                    self.vram[addr] = match value >> 6 {
                        0x00 => cached & 0xC0 | latched & 0x3F,
                        0x01 => cached & 0x30 | latched & 0xCF,
                        0x02 => cached & 0x0C | latched & 0xF3,
                        _ => cached & 0x03 | latched & 0xFC,
                    };
                    return;
                }

                if self.enable_midline {
                    // potential midline raster effect
                    self.step(self.mhz, 0, true);
                }
                let nibble = self.fx.nibble_bit[port];
                let address = self.get_and_inc_address(port, true);
                if self.log_ports {
                    trace!("WRITE video_space[${address:X}] = ${value:02X}");
                }

                if self.fx.cache_write {
                    let address = address & 0x1FFFC;
                    if self.fx.cache_byte_cycling {
                        let cached = self.fx.cache[usize::from(self.fx.cache_byte_index)];
                        self.fx_cache_write(address, cached, value & 0x03);
                        self.fx_cache_write(address + 1, cached, value >> 2 & 0x03);
                        self.fx_cache_write(address + 2, cached, value >> 4 & 0x03);
                        self.fx_cache_write(address + 3, cached, value >> 6);
                    } else if self.fx.multiplier {
                        let product = self.fx.cache_product();
                        let result = if self.fx.subtract {
                            self.fx.mult_accumulator.wrapping_sub(product)
                        } else {
                            self.fx.mult_accumulator.wrapping_add(product)
                        };
                        self.fx_cache_write(address, result as u8, value & 0x03);
                        self.fx_cache_write(address + 1, (result >> 8) as u8, value >> 2 & 0x03);
                        self.fx_cache_write(address + 2, (result >> 16) as u8, value >> 4 & 0x03);
                        self.fx_cache_write(address + 3, (result >> 24) as u8, value >> 6);
                    } else {
                        let cache = self.fx.cache;
                        self.fx_cache_write(address, cache[0], value & 0x03);
                        self.fx_cache_write(address + 1, cache[1], value >> 2 & 0x03);
                        self.fx_cache_write(address + 2, cache[2], value >> 4 & 0x03);
                        self.fx_cache_write(address + 3, cache[3], value >> 6);
                    }
                } else if self.fx.cache_byte_cycling {
                    let cached = self.fx.cache[usize::from(self.fx.cache_byte_index)];
                    if self.fx.four_bit_mode {
                        self.fx_cache_write(address, cached, u8::from(nibble) + 1);
                    } else {
                        self.fx_cache_write(address, cached, 0);
                    }
                } else {
                    // Normal write
                    self.fx_space_write(address, nibble, value);
                }

                self.io_rddata[port] = self.space_read(self.io_addr[port]);
            }
            0x05 => {
                if value & 0x80 != 0 {
                    self.reset();
                }
                self.dcsel = value >> 1 & 0x3F;
                self.addrsel = usize::from(value & 1);
            }
            0x06 => {
                self.irq_line = self.irq_line & 0xFF | u16::from(value >> 7) << 8;
                self.ien = value & 0xF;
            }
            0x07 => {
                self.isr &= value ^ 0xFF;
            }
            0x08 => {
                self.irq_line = self.irq_line & 0x100 | u16::from(value);
            }

            reg @ 0x09..=0x0C => {
                // potential midline raster effect
                self.step(self.mhz, 0, true);
                let i = usize::from(reg - 0x09) + (usize::from(self.dcsel) << 2);
                if i == 0 {
                    // if progressive mode field goes from 0 to 1, or if mode
                    // goes from vga to something else with progressive mode
                    // on, clear the framebuffer
                    if (self.reg_composer[0] & 0x8 == 0 && value & 0x8 != 0)
                        || (self.reg_composer[0] & 0x3 == 1 && value & 0x3 > 1 && value & 0x8 != 0)
                    {
                        self.framebuffer.fill(0);
                    }

                    // interlace field bit is read-only
                    self.reg_composer[0] = self.reg_composer[0] & !0x7F | value & 0x7F;
                    self.cached_palette.dirty = true;
                } else {
                    self.reg_composer[i] = value;
                }

                self.composer_side_effects(i, value);
            }

            reg @ 0x0D..=0x13 => {
                // potential midline raster effect
                self.step(self.mhz, 0, true);
                self.reg_layer[0][usize::from(reg - 0x0D)] = value;
                self.refresh_layer_properties(0);
            }
            reg @ 0x14..=0x1A => {
                // potential midline raster effect
                self.step(self.mhz, 0, true);
                self.reg_layer[1][usize::from(reg - 0x14)] = value;
                self.refresh_layer_properties(1);
            }

            0x1B => {
                if let Some(audio) = &mut self.audio {
                    audio.render();
                    audio.pcm_write_ctrl(value);
                }
            }
            0x1C => {
                if let Some(audio) = &mut self.audio {
                    audio.render();
                    audio.pcm_write_rate(value);
                }
            }
            0x1D => {
                if let Some(audio) = &mut self.audio {
                    audio.render();
                    audio.pcm_write_fifo(value);
                }
            }

            // SPI port; storage emulation is a host concern
            0x1E | 0x1F => {}
            _ => {}
        }
    }

    /// Expansion-engine decodes for the DCSEL-selected composer slots.
    fn composer_side_effects(&mut self, i: usize, value: u8) {
        match i {
            0x08 => {
                // DCSEL=2, $9F29
                self.fx.addr1_mode = value & 0x03;
                self.fx.four_bit_mode = value & 0x04 != 0;
                self.fx.hop_16bit = value & 0x08 != 0;
                self.fx.cache_byte_cycling = value & 0x10 != 0;
                self.fx.cache_fill = value & 0x20 != 0;
                self.fx.cache_write = value & 0x40 != 0;
                self.fx.trans_writes = value & 0x80 != 0;
            }
            0x09 => {
                // DCSEL=2, $9F2A
                self.fx.affine_tile_base = u32::from(value & 0xFC) << 9;
                self.fx.affine_clip = value & 0x02 != 0;
                self.fx.two_bit_poly = value & 0x01 != 0;
            }
            0x0A => {
                // DCSEL=2, $9F2B
                self.fx.affine_map_base = u32::from(value & 0xFC) << 9;
                self.fx.affine_map_size = 2 << ((value & 0x03) << 1);
            }
            0x0B => {
                // DCSEL=2, $9F2C
                self.fx.cache_increment_mode = value & 0x01 != 0;
                self.fx.cache_nibble_index = value & 0x02 != 0;
                self.fx.cache_byte_index = value >> 2 & 0x03;
                self.fx.multiplier = value & 0x10 != 0;
                self.fx.subtract = value & 0x20 != 0;
                if value & 0x40 != 0 {
                    self.fx.accumulate();
                }
                if value & 0x80 != 0 {
                    self.fx.mult_accumulator = 0;
                }
            }
            0x0C | 0x0D => {
                // DCSEL=3, $9F29/$9F2A
                self.fx.x_pixel_increment = Self::pixel_increment(
                    self.reg_composer[0x0C],
                    self.reg_composer[0x0D],
                );
                if i == 0x0D {
                    // Reset subpixel to 0.5
                    self.fx.x_pixel_position = self.fx.x_pixel_position & 0x07FF_0000 | 0x8000;
                }
            }
            0x0E | 0x0F => {
                // DCSEL=3, $9F2B/$9F2C
                self.fx.y_pixel_increment = Self::pixel_increment(
                    self.reg_composer[0x0E],
                    self.reg_composer[0x0F],
                );
                if i == 0x0F {
                    // Reset subpixel to 0.5
                    self.fx.y_pixel_position = self.fx.y_pixel_position & 0x07FF_0000 | 0x8000;
                }
            }
            0x10 => {
                // DCSEL=4, $9F29
                self.fx.x_pixel_position =
                    self.fx.x_pixel_position & 0x0700_FF80 | u32::from(value) << 16;
                self.fx_affine_prefetch();
            }
            0x11 => {
                // DCSEL=4, $9F2A
                self.fx.x_pixel_position = self.fx.x_pixel_position & 0x00FF_FF00
                    | u32::from(value & 0x7) << 24
                    | u32::from(value & 0x80);
                self.fx_affine_prefetch();
            }
            0x12 => {
                // DCSEL=4, $9F2B
                self.fx.y_pixel_position =
                    self.fx.y_pixel_position & 0x0700_FF80 | u32::from(value) << 16;
                self.fx_affine_prefetch();
            }
            0x13 => {
                // DCSEL=4, $9F2C
                self.fx.y_pixel_position = self.fx.y_pixel_position & 0x00FF_FF00
                    | u32::from(value & 0x7) << 24
                    | u32::from(value & 0x80);
                self.fx_affine_prefetch();
            }
            0x14 => {
                // DCSEL=5, $9F29
                self.fx.x_pixel_position =
                    self.fx.x_pixel_position & 0x07FF_0080 | u32::from(value) << 8;
            }
            0x15 => {
                // DCSEL=5, $9F2A
                self.fx.y_pixel_position =
                    self.fx.y_pixel_position & 0x07FF_0080 | u32::from(value) << 8;
            }
            0x18 => self.fx.cache[0] = value,
            0x19 => self.fx.cache[1] = value,
            0x1A => self.fx.cache[2] = value,
            0x1B => self.fx.cache[3] = value,
            _ => {}
        }
    }

    /// Decodes a 16.16 pixel increment from its two register bytes: 7+8 bit
    /// base, sign extension, and the optional x32 multiplier.
    fn pixel_increment(lo: u8, hi: u8) -> u32 {
        let base = (u32::from(hi & 0x7F) << 15) + (u32::from(lo) << 7);
        let extended = base | if hi & 0x40 != 0 { 0xFFC0_0000 } else { 0 };
        extended << if hi & 0x80 != 0 { 5 } else { 0 }
    }

    // --- scan timing ---

    /// Advances scan-out by `cycles` CPU cycles at `mhz`. Returns `true`
    /// when a frame finished. A zero-cycle call with `midline` set renders
    /// the pixels emitted so far on the current line, so register writes can
    /// take effect mid-line.
    pub fn step(&mut self, mhz: f32, cycles: u32, midline: bool) -> bool {
        self.mhz = mhz;
        let steps = cycles as f32;
        let ntsc_mode = self.reg_composer[0] & 2 != 0;
        let mut new_frame = false;

        self.vga_scan_pos_x += PIXEL_FREQ * steps / mhz;
        if self.vga_scan_pos_x > VGA_SCAN_WIDTH {
            self.vga_scan_pos_x -= VGA_SCAN_WIDTH;
            if !ntsc_mode {
                let y = self.vga_scan_pos_y;
                self.render_line(y, VGA_SCAN_WIDTH);
            }
            self.vga_scan_pos_y += 1;
            if self.vga_scan_pos_y == SCAN_HEIGHT {
                self.vga_scan_pos_y = 0;
                if !ntsc_mode {
                    new_frame = true;
                    self.frame_count += 1;
                }
            }
            if !ntsc_mode {
                let y = self.vga_scan_pos_y;
                let compare = self.irq_line;
                self.update_isr_and_coll(y, compare);
            }
        } else if midline && !ntsc_mode {
            let y = self.vga_scan_pos_y;
            let x = self.vga_scan_pos_x;
            self.render_line(y, x);
        }

        self.ntsc_half_cnt += PIXEL_FREQ * steps / mhz;
        if self.ntsc_half_cnt > NTSC_HALF_SCAN_WIDTH {
            self.ntsc_half_cnt -= NTSC_HALF_SCAN_WIDTH;
            if ntsc_mode {
                if self.ntsc_scan_pos_y < SCAN_HEIGHT {
                    let y = self.ntsc_scan_pos_y.wrapping_sub(NTSC_Y_OFFSET_LOW);
                    if y & 1 == 0 {
                        self.render_line(y, NTSC_HALF_SCAN_WIDTH);
                    }
                } else {
                    let y = self.ntsc_scan_pos_y.wrapping_sub(NTSC_Y_OFFSET_HIGH);
                    if y & 1 == 0 {
                        self.render_line(y | 1, NTSC_HALF_SCAN_WIDTH);
                    }
                }
            }
            self.ntsc_scan_pos_y += 1;
            if self.ntsc_scan_pos_y == SCAN_HEIGHT {
                self.reg_composer[0] |= 0x80; // interlace field
                if ntsc_mode {
                    new_frame = true;
                    self.frame_count += 1;
                }
            }
            if self.ntsc_scan_pos_y == SCAN_HEIGHT * 2 {
                self.reg_composer[0] &= !0x80;
                self.ntsc_scan_pos_y = 0;
                if ntsc_mode {
                    new_frame = true;
                    self.frame_count += 1;
                }
            }
            if ntsc_mode {
                // this is correct enough for even screen heights
                let compare = self.irq_line & !1;
                let y = if self.ntsc_scan_pos_y < SCAN_HEIGHT {
                    self.ntsc_scan_pos_y.wrapping_sub(NTSC_Y_OFFSET_LOW)
                } else {
                    self.ntsc_scan_pos_y.wrapping_sub(NTSC_Y_OFFSET_HIGH)
                };
                self.update_isr_and_coll(y, compare);
            }
        } else if midline && ntsc_mode {
            if self.ntsc_scan_pos_y < SCAN_HEIGHT {
                let y = self.ntsc_scan_pos_y.wrapping_sub(NTSC_Y_OFFSET_LOW);
                if y & 1 == 0 {
                    let x = self.ntsc_half_cnt;
                    self.render_line(y, x);
                }
            } else {
                let y = self.ntsc_scan_pos_y.wrapping_sub(NTSC_Y_OFFSET_HIGH);
                if y & 1 == 0 {
                    let x = self.ntsc_half_cnt;
                    self.render_line(y | 1, x);
                }
            }
        }

        new_frame
    }

    fn update_isr_and_coll(&mut self, y: u16, compare: u16) {
        if y == SCREEN_HEIGHT as u16 {
            if self.sprite_line_collisions != 0 {
                self.isr |= ISR_SPRCOL;
            }
            self.isr = self.isr & 0xF | self.sprite_line_collisions;
            self.sprite_line_collisions = 0;
            self.isr |= ISR_VSYNC;
        }
        if y == compare {
            self.isr |= ISR_LINE;
        }
    }

    /// Renders the current scan line up to `scan_pos_x` output pixels.
    fn render_line(&mut self, mut y: u16, scan_pos_x: f32) {
        let dc_video = self.reg_composer[0];
        let vstart = u16::from(self.reg_composer[6]) << 1;

        if y != self.y_prev {
            self.y_prev = y;
            self.s_pos_x_p = 0;

            // Copy the composer array to the 2-line history buffer so that
            // the raster effects that happen on a delay take effect at
            // exactly the right time.
            self.prev_reg_composer[1] = self.prev_reg_composer[0];
            self.prev_reg_composer[0] = self.reg_composer;

            // Same with the layer properties.
            self.prev_layer_properties[1] = self.prev_layer_properties[0];
            self.prev_layer_properties[0] = self.layer_properties;

            if dc_video & 3 > 1 {
                // 480i or 240p
                if y >> 1 == 0 {
                    self.eff_y_fp =
                        u32::from(y) * (u32::from(self.prev_reg_composer[1][2]) << 9);
                } else if y & 0xFFFE > vstart {
                    self.eff_y_fp = self
                        .eff_y_fp
                        .wrapping_add(u32::from(self.prev_reg_composer[1][2]) << 10);
                }
            } else if y == 0 {
                self.eff_y_fp = 0;
            } else if y > vstart {
                self.eff_y_fp = self
                    .eff_y_fp
                    .wrapping_add(u32::from(self.prev_reg_composer[1][2]) << 9);
            }
        }

        if dc_video & 8 != 0 && dc_video & 3 > 1 {
            // progressive NTSC/RGB mode
            y &= 0xFFFE;
        }

        // refresh palette for next entry
        if self.cached_palette.dirty {
            self.refresh_palette();
        }

        if y >= SCREEN_HEIGHT as u16 {
            return;
        }

        let s_pos_x = (scan_pos_x.round() as u16).min(SCREEN_WIDTH as u16);

        if self.s_pos_x_p == 0 {
            self.eff_x_fp = 0;
        }

        let out_mode = self.reg_composer[0] & 3;

        let border_color = self.reg_composer[3];
        let mut hstart = u16::from(self.reg_composer[4]) << 2;
        let mut hstop = u16::from(self.reg_composer[5]) << 2;
        let vstop = u16::from(self.reg_composer[7]) << 1;

        let eff_y = (self.eff_y_fp >> 16) as u16;

        self.layer_line_enable[0] = dc_video & 0x10 != 0;
        self.layer_line_enable[1] = dc_video & 0x20 != 0;
        self.sprite_line_enable = dc_video & 0x40 != 0;

        // clear layer_line if layer gets disabled
        for layer in 0..NUM_LAYERS {
            if !self.layer_line_enable[layer] && self.old_layer_line_enable[layer] {
                for i in usize::from(self.s_pos_x_p)..SCREEN_WIDTH {
                    self.layer_line[layer][i] = 0;
                }
            }
            if self.s_pos_x_p == 0 {
                self.old_layer_line_enable[layer] = self.layer_line_enable[layer];
            }
        }

        // clear sprite_line if sprites get disabled
        if !self.sprite_line_enable && self.old_sprite_line_enable {
            for i in usize::from(self.s_pos_x_p)..SCREEN_WIDTH {
                self.sprite_line_col[i] = 0;
                self.sprite_line_z[i] = 0;
                self.sprite_line_mask[i] = 0;
            }
        }
        if self.s_pos_x_p == 0 {
            self.old_sprite_line_enable = self.sprite_line_enable;
        }

        if self.sprite_line_enable {
            self.render_sprite_line(eff_y);
        }

        if self.layer_line_enable[0] {
            if self.prev_layer_properties[1][0].text_mode {
                self.render_layer_line_text(0, eff_y);
            } else if self.prev_layer_properties[1][0].bitmap_mode {
                self.render_layer_line_bitmap(0, eff_y);
            } else {
                self.render_layer_line_tile(0, eff_y);
            }
        }
        if self.layer_line_enable[1] {
            if self.prev_layer_properties[1][1].text_mode {
                self.render_layer_line_text(1, eff_y);
            } else if self.prev_layer_properties[1][1].bitmap_mode {
                self.render_layer_line_bitmap(1, eff_y);
            } else {
                self.render_layer_line_tile(1, eff_y);
            }
        }

        // If video output is enabled, calculate color indices for the line.
        if out_mode != 0 {
            if y < vstart || y > vstop {
                self.col_line.fill(border_color);
            } else {
                hstart = hstart.min(SCREEN_WIDTH as u16);
                hstop = hstop.min(SCREEN_WIDTH as u16);

                let mut x = self.s_pos_x_p;
                while x < hstart && x < s_pos_x {
                    self.col_line[usize::from(x)] = border_color;
                    x += 1;
                }

                let scale = u32::from(self.reg_composer[1]);
                let mut x = hstart.max(self.s_pos_x_p);
                while x < hstop && x < s_pos_x {
                    // scales above 1.0 can point past the line buffers
                    let eff_x = usize::from((self.eff_x_fp >> 16) as u16).min(SCREEN_WIDTH - 1);
                    self.col_line[usize::from(x)] = composite_index(
                        self.sprite_line_z[eff_x],
                        self.sprite_line_col[eff_x],
                        self.layer_line[0][eff_x],
                        self.layer_line[1][eff_x],
                    );
                    self.eff_x_fp = self.eff_x_fp.wrapping_add(scale << 9);
                    x += 1;
                }

                for x in hstop..s_pos_x {
                    self.col_line[usize::from(x)] = border_color;
                }
            }
        }

        // Look up all color indices.
        let row = usize::from(y) * SCREEN_WIDTH;
        for x in usize::from(self.s_pos_x_p)..usize::from(s_pos_x) {
            self.framebuffer[row + x] = self.cached_palette.entries[usize::from(self.col_line[x])];
        }

        // NTSC overscan: dim pixels outside the title-safe area
        if out_mode == 2 {
            for x in usize::from(self.s_pos_x_p)..usize::from(s_pos_x) {
                if (x as f32) < SCREEN_WIDTH as f32 * TITLE_SAFE_X
                    || x as f32 > SCREEN_WIDTH as f32 * (1.0 - TITLE_SAFE_X)
                    || (y as f32) < SCREEN_HEIGHT as f32 * TITLE_SAFE_Y
                    || y as f32 > SCREEN_HEIGHT as f32 * (1.0 - TITLE_SAFE_Y)
                {
                    let pixel = &mut self.framebuffer[row + x];
                    *pixel = (*pixel & 0x00FC_FCFC) >> 2;
                }
            }
        }

        self.s_pos_x_p = s_pos_x;
    }

    fn refresh_palette(&mut self) {
        let out_mode = self.reg_composer[0] & 3;
        let chroma_disable = self.reg_composer[0] & 0x07 == 6;
        for i in 0..256 {
            self.cached_palette.entries[i] = if out_mode == 0 {
                // video generation off -> show blue screen
                0x0000_00FF
            } else {
                let raw = u16::from(self.palette[i * 2]) | u16::from(self.palette[i * 2 + 1]) << 8;
                resolve_entry(raw, chroma_disable)
            };
        }
        self.cached_palette.dirty = false;
    }

    // --- output state ---

    fn aflow_bit(&self) -> u8 {
        match &self.audio {
            Some(audio) if audio.fifo_almost_empty() => ISR_AFLOW,
            _ => 0,
        }
    }

    /// Level of the composed IRQ output line.
    pub fn irq_line_high(&self) -> bool {
        (self.isr | self.aflow_bit()) & self.ien != 0
    }

    /// The 640x480 output buffer, one packed `0x00RRGGBB` word per pixel.
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Current data-port address (for debuggers and tracing).
    pub fn port_address(&self, sel: usize) -> u32 {
        self.io_addr[sel & 1]
    }

    /// Dumps VRAM and the register state in dump order: VRAM, composer,
    /// palette, layer registers, sprite attributes.
    pub fn save(&self, writer: &mut impl std::io::Write) -> std::io::Result<()> {
        writer.write_all(&self.vram)?;
        writer.write_all(&self.reg_composer)?;
        writer.write_all(&self.palette)?;
        for layer in &self.reg_layer {
            writer.write_all(layer)?;
        }
        for sprite in &self.sprite_data {
            writer.write_all(sprite)?;
        }
        Ok(())
    }
}

/// Z-depth pixel composition.
fn composite_index(spr_z: u8, spr_col: u8, l1_col: u8, l2_col: u8) -> u8 {
    let pick = |a: u8, b: u8| if a != 0 { a } else { b };
    match spr_z {
        3 => pick(spr_col, pick(l2_col, l1_col)),
        2 => pick(l2_col, pick(spr_col, l1_col)),
        1 => pick(l2_col, pick(l1_col, spr_col)),
        _ => pick(l2_col, l1_col),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vera() -> Vera {
        Vera::new(false)
    }

    /// Point a data port at `addr` with the given increment code.
    fn set_port(vera: &mut Vera, sel: u8, addr: u32, inc_code: u8) {
        vera.write(0x05, sel & 1); // CTRL: ADDRSEL
        vera.write(0x00, addr as u8);
        vera.write(0x01, (addr >> 8) as u8);
        vera.write(0x02, (addr >> 16) as u8 & 1 | inc_code << 3);
    }

    fn run_frame(vera: &mut Vera) {
        while !vera.step(8.0, 100, false) {}
    }

    #[test]
    fn reset_installs_composer_defaults() {
        let mut vera = vera();
        assert_eq!(vera.read(0x09, true), 0); // output off
        assert_eq!(vera.read(0x0A, true), 128); // hscale 1.0
        assert_eq!(vera.read(0x0B, true), 128); // vscale 1.0
        assert_eq!(vera.read(0x07, true), 0); // ISR clear
    }

    #[test]
    fn data_port_writes_advance_the_address() {
        let mut vera = vera();
        set_port(&mut vera, 0, 0x1000, 2); // increment +1
        for byte in [0x11, 0x22, 0x33, 0x44] {
            vera.write(0x03, byte);
        }
        assert_eq!(vera.port_address(0), 0x1004);
        assert_eq!(vera.space_read(0x1000), 0x11);
        assert_eq!(vera.space_read(0x1003), 0x44);
    }

    #[test]
    fn port1_reads_back_what_port0_wrote() {
        let mut vera = vera();
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x55];
        set_port(&mut vera, 0, 0x4000, 2);
        for byte in data {
            vera.write(0x03, byte);
        }
        set_port(&mut vera, 1, 0x4000, 2);
        for byte in data {
            assert_eq!(vera.read(0x04, false), byte);
        }
        assert_eq!(vera.port_address(1), 0x4000 + data.len() as u32);
    }

    #[test]
    fn negative_strides_walk_backwards() {
        let mut vera = vera();
        vera.space_write(0x2000, 0xAA);
        vera.space_write(0x1FFF, 0xBB);
        set_port(&mut vera, 0, 0x2000, 3); // increment -1
        assert_eq!(vera.read(0x03, false), 0xAA);
        assert_eq!(vera.read(0x03, false), 0xBB);
        assert_eq!(vera.port_address(0), 0x1FFE);
    }

    #[test]
    fn wide_strides_match_the_table() {
        let mut vera = vera();
        set_port(&mut vera, 0, 0x0000, 28); // +320
        vera.write(0x03, 0);
        assert_eq!(vera.port_address(0), 320);
        set_port(&mut vera, 0, 0x0000, 21); // -512
        vera.write(0x03, 0);
        assert_eq!(vera.port_address(0), 512u32.wrapping_neg());
    }

    #[test]
    fn debug_reads_have_no_side_effects() {
        let mut vera = vera();
        vera.space_write(0x3000, 0x7E);
        set_port(&mut vera, 0, 0x3000, 2);
        let before = vera.port_address(0);
        assert_eq!(vera.read(0x03, true), 0x7E);
        assert_eq!(vera.read(0x03, true), 0x7E);
        assert_eq!(vera.port_address(0), before);
    }

    #[test]
    fn dcsel_banks_the_composer_window() {
        let mut vera = vera();
        vera.write(0x05, 6 << 1); // DCSEL=6: cache registers
        vera.write(0x09, 0x12);
        vera.write(0x0A, 0x34);
        vera.write(0x05, 0); // DCSEL=0: display registers unharmed
        assert_eq!(vera.read(0x0A, true), 128);
    }

    #[test]
    fn isr_is_write_one_to_clear() {
        let mut vera = vera();
        vera.write(0x09, 0x01); // VGA output
        run_frame(&mut vera);
        assert_eq!(vera.read(0x07, true) & ISR_VSYNC, ISR_VSYNC);
        vera.write(0x07, ISR_VSYNC);
        assert_eq!(vera.read(0x07, true) & ISR_VSYNC, 0);
    }

    #[test]
    fn raster_compare_raises_the_line_flag() {
        let mut vera = vera();
        vera.write(0x09, 0x01); // VGA output
        vera.write(0x08, 100); // IRQ_LINE = 100
        vera.write(0x06, 0x02); // IEN: LINE
        assert!(!vera.irq_line_high());
        run_frame(&mut vera);
        assert_eq!(vera.read(0x07, true) & ISR_LINE, ISR_LINE);
        assert!(vera.irq_line_high());
        vera.write(0x07, ISR_LINE);
        assert!(!vera.irq_line_high());
    }

    #[test]
    fn text_layer_renders_a_glyph_row() {
        let mut vera = vera();

        // 32x32 text map at $0000, 8x8 tiles at $2000
        vera.write(0x0D, 0x00); // config: text, 32x32 map
        vera.write(0x0E, 0x00); // map base $0000
        vera.write(0x0F, (0x2000u32 >> 9) as u8); // tile base $2000

        // glyph 1, top row %10110100
        vera.space_write(0x2000 + 8, 0b1011_0100);
        // map (0,0): tile 1, attribute $17 (fg 7 on bg 1)
        vera.space_write(0x0000, 0x01);
        vera.space_write(0x0001, 0x17);

        vera.write(0x09, 0x11); // VGA output + layer 0
        run_frame(&mut vera);
        run_frame(&mut vera); // properties settle through the line history

        let fg = vera.cached_palette.entries[7];
        let bg = vera.cached_palette.entries[1];
        let expected = [fg, bg, fg, fg, bg, fg, bg, bg];
        assert_eq!(&vera.framebuffer()[..8], &expected);
    }

    fn define_sprite(vera: &mut Vera, slot: u32, addr: u32, x: u8, zdepth: u8, mask: u8) {
        let base = vram::SPRITE_START + slot * 8;
        vera.space_write(base, (addr >> 5) as u8);
        vera.space_write(base + 1, 0x80 | (addr >> 13) as u8); // 8bpp
        vera.space_write(base + 2, x);
        vera.space_write(base + 3, 0);
        vera.space_write(base + 4, 0); // y = 0
        vera.space_write(base + 5, 0);
        vera.space_write(base + 6, mask | zdepth << 2);
        vera.space_write(base + 7, 0); // 8x8, palette offset 0
    }

    #[test]
    fn sprite_zdepth_resolves_overlaps() {
        let mut vera = vera();

        // sprite 0: color 5 at $0400, z=3; sprite 1: color 9 at $0500, z=2
        for i in 0..64 {
            vera.space_write(0x0400 + i, 5);
            vera.space_write(0x0500 + i, 9);
        }
        define_sprite(&mut vera, 0, 0x0400, 0, 3, 0);
        define_sprite(&mut vera, 1, 0x0500, 0, 2, 0);

        vera.write(0x09, 0x41); // VGA output + sprites
        run_frame(&mut vera);
        run_frame(&mut vera);
        assert_eq!(vera.framebuffer()[0], vera.cached_palette.entries[5]);

        // transparent pixel in the front sprite exposes the one behind
        vera.space_write(0x0400, 0);
        run_frame(&mut vera);
        run_frame(&mut vera);
        assert_eq!(vera.framebuffer()[0], vera.cached_palette.entries[9]);
        assert_eq!(vera.framebuffer()[1], vera.cached_palette.entries[5]);
    }

    #[test]
    fn overlapping_sprites_with_shared_mask_collide() {
        let mut vera = vera();
        for i in 0..64 {
            vera.space_write(0x0400 + i, 5);
            vera.space_write(0x0500 + i, 9);
        }
        define_sprite(&mut vera, 0, 0x0400, 0, 3, 0x10);
        define_sprite(&mut vera, 1, 0x0500, 0, 2, 0x10);

        vera.write(0x09, 0x41);
        run_frame(&mut vera);
        let isr = vera.read(0x07, true);
        assert_eq!(isr & ISR_SPRCOL, ISR_SPRCOL);
        assert_eq!(isr & 0xF0, 0x10);
    }

    #[test]
    fn disjoint_sprites_do_not_collide() {
        let mut vera = vera();
        for i in 0..64 {
            vera.space_write(0x0400 + i, 5);
            vera.space_write(0x0500 + i, 9);
        }
        define_sprite(&mut vera, 0, 0x0400, 0, 3, 0x10);
        define_sprite(&mut vera, 1, 0x0500, 100, 2, 0x10);

        vera.write(0x09, 0x41);
        run_frame(&mut vera);
        let isr = vera.read(0x07, true);
        assert_eq!(isr & ISR_SPRCOL, 0);
        assert_eq!(isr & 0xF0, 0);
    }

    #[test]
    fn chroma_disable_renders_greyscale() {
        let mut vera = vera();
        // output mode 2 (NTSC) + chroma disable bit = composer value 6
        vera.write(0x09, 0x06);
        // a saturated red palette entry resolves to equal channels
        let raw = 0x0F00u16;
        let grey = resolve_entry(raw, true);
        let r = grey >> 16 & 0xFF;
        let g = grey >> 8 & 0xFF;
        let b = grey & 0xFF;
        assert_eq!(r, g);
        assert_eq!(g, b);
        // and without the flag it stays red
        let color = resolve_entry(raw, false);
        assert_eq!(color, 0x00FF_0000);
    }

    #[test]
    fn palette_writes_through_the_port_recolor_output() {
        let mut vera = vera();
        // palette entry 1 -> $0F0 (green)
        set_port(&mut vera, 0, vram::PALETTE_START + 2, 2);
        vera.write(0x03, 0xF0);
        vera.write(0x03, 0x00);
        vera.write(0x09, 0x01); // VGA
        run_frame(&mut vera);
        assert_eq!(vera.cached_palette.entries[1], 0x0000_F000 | 0x0000_0F00);
    }

    #[test]
    fn ctrl_bit7_resets_the_core() {
        let mut vera = vera();
        set_port(&mut vera, 0, 0x12345, 2);
        vera.write(0x09, 0x11);
        vera.write(0x05, 0x80);
        assert_eq!(vera.port_address(0), 0);
        assert_eq!(vera.read(0x09, true), 0);
    }

    #[test]
    fn nibble_increment_walks_half_bytes() {
        let mut vera = vera();
        // FX 4-bit mode via DCSEL=2, $9F29
        vera.write(0x05, 2 << 1);
        vera.write(0x09, 0x04);
        // port 0 at 0, increment 0, nibble increment on
        vera.write(0x05, 0);
        vera.write(0x00, 0x00);
        vera.write(0x01, 0x00);
        vera.write(0x02, 0x04); // NIBBLE_INCR, increment code 0
        vera.write(0x03, 0xA0); // high nibble of byte 0
        vera.write(0x03, 0x0B); // low nibble of byte 0
        vera.write(0x03, 0xC0); // high nibble of byte 1
        assert_eq!(vera.space_read(0), 0xAB);
        assert_eq!(vera.space_read(1), 0xC0);
    }

    #[test]
    fn fx_cache_multiply_accumulates() {
        let mut vera = vera();
        // cache = 100 * -3 via DCSEL=6 cache registers
        vera.write(0x05, 6 << 1);
        vera.write(0x09, 100); // operand A low
        vera.write(0x0A, 0);
        vera.write(0x0B, 0xFD); // operand B = -3
        vera.write(0x0C, 0xFF);
        assert_eq!(vera.fx.cache_product(), -300);

        // accumulate twice through DCSEL=2 $9F2C bit 6
        vera.write(0x05, 2 << 1);
        vera.write(0x0C, 0x40);
        vera.write(0x0C, 0x40);
        assert_eq!(vera.fx.mult_accumulator, -600);
        // bit 7 clears
        vera.write(0x0C, 0x80);
        assert_eq!(vera.fx.mult_accumulator, 0);
    }

    #[test]
    fn version_string_reads_from_write_only_slots() {
        let mut vera = vera();
        vera.write(0x05, 8 << 1); // DCSEL=8: unmapped
        assert_eq!(vera.read(0x09, true), b'V');
    }
}
