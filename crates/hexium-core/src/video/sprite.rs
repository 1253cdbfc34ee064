//! Sprite attribute decoding and the per-scanline sprite renderer.
//!
//! The 128 sprite attribute slots are mirrored from the top of VRAM; a
//! write to any byte of a slot recomputes that sprite's derived properties.
//! Rendering walks the sprites in slot order under the hardware's per-line
//! work budget, accumulating collision bits and resolving overlaps by
//! Z-depth.

use crate::video::{NUM_SPRITES, SCREEN_WIDTH, Vera};

/// Derived per-sprite state, unpacked from the 8-byte attribute slot.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpriteProperties {
    pub(crate) zdepth: u8,
    pub(crate) collision_mask: u8,

    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) width_log2: u8,
    pub(crate) height_log2: u8,
    pub(crate) width: u16,
    pub(crate) height: u16,

    pub(crate) hflip: bool,
    pub(crate) vflip: bool,

    /// 0 = 4 bpp, 1 = 8 bpp.
    pub(crate) color_mode: u8,
    pub(crate) address: u32,

    pub(crate) palette_offset: u16,
}

fn expand_4bpp(dst: &mut [u8], src: &[u8]) {
    for (pair, byte) in dst.chunks_exact_mut(2).zip(src) {
        pair[0] = byte >> 4;
        pair[1] = byte & 0xF;
    }
}

impl Vera {
    /// Recomputes the derived properties of one sprite slot.
    pub(crate) fn refresh_sprite_properties(&mut self, sprite: usize) {
        let data = &self.sprite_data[sprite];
        let props = &mut self.sprite_properties[sprite];

        props.zdepth = data[6] >> 2 & 3;
        props.collision_mask = data[6] & 0xF0;

        props.x = (u16::from(data[2]) | u16::from(data[3] & 3) << 8) as i16;
        props.y = (u16::from(data[4]) | u16::from(data[5] & 3) << 8) as i16;
        props.width_log2 = (data[7] >> 4 & 3) + 3;
        props.height_log2 = (data[7] >> 6) + 3;
        props.width = 1 << props.width_log2;
        props.height = 1 << props.height_log2;

        // fix up negative coordinates
        if props.x >= 0x400 - props.width as i16 {
            props.x -= 0x400;
        }
        if props.y >= 0x400 - props.height as i16 {
            props.y -= 0x400;
        }

        props.hflip = data[6] & 1 != 0;
        props.vflip = data[6] >> 1 & 1 != 0;

        props.color_mode = data[1] >> 7 & 1;
        props.address = u32::from(data[0]) << 5 | u32::from(data[1] & 0xF) << 13;

        props.palette_offset = u16::from(data[7] & 0x0F) << 4;
    }

    pub(crate) fn render_sprite_line(&mut self, y: u16) {
        self.sprite_line_col.fill(0);
        self.sprite_line_z.fill(0);
        self.sprite_line_mask.fill(0);

        let y = i32::from(y);
        let mut budget = 800 + 1;

        'sprites: for i in 0..NUM_SPRITES {
            // one clock per lookup
            budget -= 1;
            if budget == 0 {
                break;
            }
            let props = self.sprite_properties[i];

            if props.zdepth == 0 {
                continue;
            }

            // check whether this line falls within the sprite
            if y < i32::from(props.y) || y >= i32::from(props.y) + i32::from(props.height) {
                continue;
            }

            let eff_sy = if props.vflip {
                i32::from(props.height) - 1 - (y - i32::from(props.y))
            } else {
                y - i32::from(props.y)
            };

            let mut eff_sx: i32 = if props.hflip {
                i32::from(props.width) - 1
            } else {
                0
            };
            let eff_sx_incr: i32 = if props.hflip { -1 } else { 1 };

            let row_shift = props.width_log2 - (1 - props.color_mode);
            let row_addr = props.address + ((eff_sy as u32) << row_shift);

            let mut unpacked = [0u8; 64];
            let width = usize::from(props.width).min(64);
            let mut row = [0u8; 64];
            self.space_read_range(&mut row[..width], row_addr);
            if props.color_mode == 0 {
                // 4bpp
                expand_4bpp(&mut unpacked[..width], &row);
            } else {
                // 8bpp
                unpacked[..width].copy_from_slice(&row[..width]);
            }

            for sx in 0..i32::from(props.width) {
                let line_x = i32::from(props.x) + sx;
                if !(0..SCREEN_WIDTH as i32).contains(&line_x) {
                    eff_sx += eff_sx_incr;
                    continue;
                }

                // one clock per fetched 32 bits
                if sx & 3 == 0 {
                    budget -= 1;
                    if budget == 0 {
                        break 'sprites;
                    }
                }

                // one clock per rendered pixel
                budget -= 1;
                if budget == 0 {
                    break 'sprites;
                }

                let col_index = unpacked[(eff_sx & 63) as usize];
                eff_sx += eff_sx_incr;

                if col_index > 0 {
                    let line_x = line_x as usize;
                    self.sprite_line_collisions |=
                        self.sprite_line_mask[line_x] & props.collision_mask;
                    self.sprite_line_mask[line_x] |= props.collision_mask;

                    if props.zdepth > self.sprite_line_z[line_x] {
                        self.sprite_line_col[line_x] =
                            (u16::from(col_index) + props.palette_offset) as u8;
                        self.sprite_line_z[line_x] = props.zdepth;
                    }
                }
            }
        }
    }
}
