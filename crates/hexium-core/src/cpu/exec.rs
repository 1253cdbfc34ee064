//! Operation routines for both personalities.
//!
//! Each routine reads and writes memory through the [`Bus`], mutates the
//! register file, and records penalty flags in the per-instruction [`Step`].
//! Width-sensitive operations consult the M and X flags; 16-bit operands
//! occupy two consecutive addresses with no page wrap.

use crate::bus::Bus;
use crate::cpu::addressing::Addressing;
use crate::cpu::instruction::Op;
use crate::cpu::status::{FLAG_BREAK, Status};
use crate::cpu::{Cpu, InterruptKind, Step};

impl Cpu {
    /// Reads the instruction operand: the accumulator for accumulator mode,
    /// otherwise one or two bytes at the effective address.
    fn operand<B: Bus>(&mut self, bus: &mut B, step: &Step, wide: bool) -> u16 {
        if step.addressing == Addressing::Accumulator {
            if wide {
                self.c
            } else {
                u16::from(self.a())
            }
        } else if wide {
            let lo = bus.read(step.ea, step.ea_bank);
            let hi = bus.read(step.ea.wrapping_add(1), step.ea_bank);
            u16::from(lo) | u16::from(hi) << 8
        } else {
            u16::from(bus.read(step.ea, step.ea_bank))
        }
    }

    /// Writes an instruction result back to the accumulator or memory.
    fn write_back<B: Bus>(&mut self, bus: &mut B, step: &Step, value: u16, wide: bool) {
        if step.addressing == Addressing::Accumulator {
            if wide {
                self.c = value;
            } else {
                self.set_a(value as u8);
            }
        } else if wide {
            bus.write(step.ea, step.ea_bank, value as u8);
            bus.write(step.ea.wrapping_add(1), step.ea_bank, (value >> 8) as u8);
        } else {
            bus.write(step.ea, step.ea_bank, value as u8);
        }
    }

    /// Taken-branch helper: applies the displacement and charges one cycle,
    /// or two when the branch crosses a page.
    fn branch_if(&mut self, step: &mut Step, taken: bool) {
        if taken {
            let old_pc = self.pc;
            self.pc = self.pc.wrapping_add(step.reladdr);
            if old_pc & 0xFF00 != self.pc & 0xFF00 {
                step.extra += 2;
            } else {
                step.extra += 1;
            }
        }
    }

    pub(crate) fn execute<B: Bus>(&mut self, op: Op, bus: &mut B, step: &mut Step) {
        match op {
            Op::Adc => self.op_adc(bus, step),
            Op::Sbc => self.op_sbc(bus, step),

            Op::And => {
                step.penalty_op = true;
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(self.acc_for_mode() & value);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.save_accum(result);
            }
            Op::Eor => {
                step.penalty_op = true;
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(self.acc_for_mode() ^ value);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.save_accum(result);
            }
            Op::Ora => {
                step.penalty_op = true;
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(self.acc_for_mode() | value);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.save_accum(result);
            }

            Op::Asl => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(value) << 1;
                self.p.update_carry(result, wide);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.write_back(bus, step, result as u16, wide);
            }
            Op::Lsr => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(value >> 1);
                self.p.set(Status::CARRY, value & 1 != 0);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.write_back(bus, step, result as u16, wide);
            }
            Op::Rol => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let carry = u32::from(self.p.contains(Status::CARRY));
                let result = u32::from(value) << 1 | carry;
                self.p.update_carry(result, wide);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.write_back(bus, step, result as u16, wide);
            }
            Op::Ror => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let carry_in = if self.p.contains(Status::CARRY) {
                    if wide { 0x8000u32 } else { 0x80 }
                } else {
                    0
                };
                let result = u32::from(value >> 1) | carry_in;
                self.p.set(Status::CARRY, value & 1 != 0);
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.write_back(bus, step, result as u16, wide);
            }

            Op::Bcc => {
                let taken = !self.p.contains(Status::CARRY);
                self.branch_if(step, taken);
            }
            Op::Bcs => {
                let taken = self.p.contains(Status::CARRY);
                self.branch_if(step, taken);
            }
            Op::Beq => {
                let taken = self.p.contains(Status::ZERO);
                self.branch_if(step, taken);
            }
            Op::Bne => {
                let taken = !self.p.contains(Status::ZERO);
                self.branch_if(step, taken);
            }
            Op::Bmi => {
                let taken = self.p.contains(Status::NEGATIVE);
                self.branch_if(step, taken);
            }
            Op::Bpl => {
                let taken = !self.p.contains(Status::NEGATIVE);
                self.branch_if(step, taken);
            }
            Op::Bvc => {
                let taken = !self.p.contains(Status::OVERFLOW);
                self.branch_if(step, taken);
            }
            Op::Bvs => {
                let taken = self.p.contains(Status::OVERFLOW);
                self.branch_if(step, taken);
            }
            Op::Bra => {
                let old_pc = self.pc;
                self.pc = self.pc.wrapping_add(step.reladdr);
                if self.e && old_pc & 0xFF00 != self.pc & 0xFF00 {
                    step.extra += 1;
                }
            }
            Op::Brl => {
                self.pc = self.pc.wrapping_add(step.reladdr);
            }

            Op::Bit => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(self.acc_for_mode() & value);
                self.p.update_zero(result, wide);
                // Immediate BIT only affects Z.
                if step.opcode != 0x89 {
                    let flag_bits = if wide { (value >> 8) as u8 } else { value as u8 };
                    self.p = Status::from_bits_truncate(self.p.bits() & 0x3F | flag_bits & 0xC0);
                }
            }

            Op::Brk => {
                step.penalty_e = true;
                self.pc = self.pc.wrapping_add(1);
                self.interrupt_sequence(bus, InterruptKind::Brk);
            }
            Op::Cop => {
                step.penalty_e = true;
                self.pc = self.pc.wrapping_add(1);
                self.interrupt_sequence(bus, InterruptKind::Cop);
            }

            Op::Clc => self.p.remove(Status::CARRY),
            Op::Cld => self.p.remove(Status::DECIMAL),
            Op::Cli => self.p.remove(Status::INTERRUPT),
            Op::Clv => self.p.remove(Status::OVERFLOW),
            Op::Sec => self.p.insert(Status::CARRY),
            Op::Sed => self.p.insert(Status::DECIMAL),
            Op::Sei => self.p.insert(Status::INTERRUPT),

            Op::Cmp => {
                step.penalty_op = true;
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let acc = self.acc_for_mode();
                let result = u32::from(acc).wrapping_sub(u32::from(value));
                self.p.set(Status::CARRY, acc >= value);
                self.p.set(Status::ZERO, acc == value);
                self.p.update_sign(result, wide);
            }
            Op::Cpx => {
                let wide = self.index_16bit();
                let value = self.operand(bus, step, wide);
                let x = if wide { self.x } else { u16::from(self.xl()) };
                let result = u32::from(x).wrapping_sub(u32::from(value));
                self.p.set(Status::CARRY, x >= value);
                self.p.set(Status::ZERO, x == value);
                self.p.update_sign(result, wide);
            }
            Op::Cpy => {
                let wide = self.index_16bit();
                let value = self.operand(bus, step, wide);
                let y = if wide { self.y } else { u16::from(self.yl()) };
                let result = u32::from(y).wrapping_sub(u32::from(value));
                self.p.set(Status::CARRY, y >= value);
                self.p.set(Status::ZERO, y == value);
                self.p.update_sign(result, wide);
            }

            Op::Dec => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(value.wrapping_sub(1));
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.write_back(bus, step, result as u16, wide);
            }
            Op::Inc => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let result = u32::from(value.wrapping_add(1));
                self.p.update_zero(result, wide);
                self.p.update_sign(result, wide);
                self.write_back(bus, step, result as u16, wide);
            }

            Op::Dex => {
                if self.index_16bit() {
                    self.x = self.x.wrapping_sub(1);
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let x = self.xl().wrapping_sub(1);
                    self.set_xl(x);
                    self.p.update_zero(u32::from(x), false);
                    self.p.update_sign(u32::from(x), false);
                }
            }
            Op::Dey => {
                if self.index_16bit() {
                    self.y = self.y.wrapping_sub(1);
                    let y = u32::from(self.y);
                    self.p.update_zero(y, true);
                    self.p.update_sign(y, true);
                } else {
                    let y = self.yl().wrapping_sub(1);
                    self.set_yl(y);
                    self.p.update_zero(u32::from(y), false);
                    self.p.update_sign(u32::from(y), false);
                }
            }
            Op::Inx => {
                if self.index_16bit() {
                    self.x = self.x.wrapping_add(1);
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let x = self.xl().wrapping_add(1);
                    self.set_xl(x);
                    self.p.update_zero(u32::from(x), false);
                    self.p.update_sign(u32::from(x), false);
                }
            }
            Op::Iny => {
                if self.index_16bit() {
                    self.y = self.y.wrapping_add(1);
                    let y = u32::from(self.y);
                    self.p.update_zero(y, true);
                    self.p.update_sign(y, true);
                } else {
                    let y = self.yl().wrapping_add(1);
                    self.set_yl(y);
                    self.p.update_zero(u32::from(y), false);
                    self.p.update_sign(u32::from(y), false);
                }
            }

            Op::Jmp => self.pc = step.ea,
            Op::Jml => {
                self.pc = step.ea;
                self.k = step.ea_bank;
            }
            Op::Jsr => {
                let ret = self.pc.wrapping_sub(1);
                self.push16(bus, ret);
                self.pc = step.ea;
            }
            Op::Jsl => {
                let k = self.k;
                self.push8(bus, k);
                let ret = self.pc.wrapping_sub(1);
                self.push16(bus, ret);
                self.k = step.ea_bank;
                self.pc = step.ea;
            }

            Op::Lda => {
                step.penalty_op = true;
                step.penalty_m = true;
                if self.memory_16bit() {
                    self.c = self.operand(bus, step, true);
                    let c = u32::from(self.c);
                    self.p.update_zero(c, true);
                    self.p.update_sign(c, true);
                } else {
                    let value = self.operand(bus, step, false) as u8;
                    self.set_a(value);
                    self.p.update_zero(u32::from(value), false);
                    self.p.update_sign(u32::from(value), false);
                }
            }
            Op::Ldx => {
                step.penalty_op = true;
                step.penalty_x = true;
                if self.index_16bit() {
                    self.x = self.operand(bus, step, true);
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let value = self.operand(bus, step, false) as u8;
                    self.set_xl(value);
                    self.p.update_zero(u32::from(value), false);
                    self.p.update_sign(u32::from(value), false);
                }
            }
            Op::Ldy => {
                step.penalty_op = true;
                step.penalty_x = true;
                if self.index_16bit() {
                    self.y = self.operand(bus, step, true);
                    let y = u32::from(self.y);
                    self.p.update_zero(y, true);
                    self.p.update_sign(y, true);
                } else {
                    let value = self.operand(bus, step, false) as u8;
                    self.set_yl(value);
                    self.p.update_zero(u32::from(value), false);
                    self.p.update_sign(u32::from(value), false);
                }
            }

            Op::Mvn => {
                // One byte per invocation; PC rewinds so the instruction
                // repeats until C rolls over to $FFFF.
                if self.c != 0xFFFF {
                    if self.index_16bit() {
                        let value = bus.read(self.x, self.db);
                        bus.write(self.y, self.db, value);
                        self.x = self.x.wrapping_add(1);
                        self.y = self.y.wrapping_add(1);
                    } else {
                        let value = bus.read(u16::from(self.xl()), self.db);
                        bus.write(u16::from(self.yl()), self.db, value);
                        self.set_xl(self.xl().wrapping_add(1));
                        self.set_yl(self.yl().wrapping_add(1));
                    }
                    self.c = self.c.wrapping_sub(1);
                    self.pc = self.pc.wrapping_sub(3);
                }
            }
            Op::Mvp => {
                if self.c != 0xFFFF {
                    if self.index_16bit() {
                        let value = bus.read(self.x, self.db);
                        bus.write(self.y, self.db, value);
                        self.x = self.x.wrapping_sub(1);
                        self.y = self.y.wrapping_sub(1);
                    } else {
                        let value = bus.read(u16::from(self.xl()), self.db);
                        bus.write(u16::from(self.yl()), self.db, value);
                        self.set_xl(self.xl().wrapping_sub(1));
                        self.set_yl(self.yl().wrapping_sub(1));
                    }
                    self.c = self.c.wrapping_sub(1);
                    self.pc = self.pc.wrapping_sub(3);
                }
            }

            Op::Nop => {
                if !self.is_816 {
                    // 65C02 multi-byte NOPs that pay the page-cross penalty.
                    match step.opcode {
                        0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => step.penalty_op = true,
                        _ => {}
                    }
                }
            }
            Op::Wdm => {}

            Op::Pea => {
                let value = self.operand(bus, step, true);
                self.push16(bus, value);
            }
            Op::Pei => {
                let value = step.ea;
                self.push16(bus, value);
            }
            Op::Per => {
                let value = self.pc.wrapping_add(step.reladdr);
                self.push16(bus, value);
            }

            Op::Pha => {
                if self.memory_16bit() {
                    let c = self.c;
                    self.push16(bus, c);
                } else {
                    let a = self.a();
                    self.push8(bus, a);
                }
            }
            Op::Pla => {
                if self.memory_16bit() {
                    self.c = self.pull16(bus);
                    let c = u32::from(self.c);
                    self.p.update_zero(c, true);
                    self.p.update_sign(c, true);
                } else {
                    let a = self.pull8(bus);
                    self.set_a(a);
                    self.p.update_zero(u32::from(a), false);
                    self.p.update_sign(u32::from(a), false);
                }
            }
            Op::Phx => {
                step.penalty_m = true;
                if self.index_16bit() {
                    let x = self.x;
                    self.push16(bus, x);
                } else {
                    let x = self.xl();
                    self.push8(bus, x);
                }
            }
            Op::Plx => {
                step.penalty_m = true;
                if self.index_16bit() {
                    self.x = self.pull16(bus);
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let x = self.pull8(bus);
                    self.set_xl(x);
                    self.p.update_zero(u32::from(x), false);
                    self.p.update_sign(u32::from(x), false);
                }
            }
            Op::Phy => {
                step.penalty_m = true;
                if self.index_16bit() {
                    let y = self.y;
                    self.push16(bus, y);
                } else {
                    let y = self.yl();
                    self.push8(bus, y);
                }
            }
            Op::Ply => {
                step.penalty_m = true;
                if self.index_16bit() {
                    self.y = self.pull16(bus);
                    let y = u32::from(self.y);
                    self.p.update_zero(y, true);
                    self.p.update_sign(y, true);
                } else {
                    let y = self.pull8(bus);
                    self.set_yl(y);
                    self.p.update_zero(u32::from(y), false);
                    self.p.update_sign(u32::from(y), false);
                }
            }
            Op::Phb => {
                let db = self.db;
                self.push8(bus, db);
            }
            Op::Plb => {
                self.db = self.pull8(bus);
                let db = u32::from(self.db);
                self.p.update_zero(db, false);
                self.p.update_sign(db, false);
            }
            Op::Phd => {
                let dp = self.dp;
                self.push16(bus, dp);
            }
            Op::Pld => {
                self.dp = self.pull16(bus);
            }
            Op::Phk => {
                let k = self.k;
                self.push8(bus, k);
            }
            Op::Php => {
                let status = if self.e {
                    (self.p | FLAG_BREAK).bits()
                } else {
                    self.p.bits()
                };
                self.push8(bus, status);
            }
            Op::Plp => {
                let status = self.pull8(bus);
                self.p = Status::from_bits_truncate(status);
                if self.e {
                    self.p |= Status::INDEX_WIDTH | Status::MEMORY_WIDTH;
                }
            }

            Op::Rep => {
                let value = self.operand(bus, step, false) as u8;
                self.p = Status::from_bits_truncate(self.p.bits() & !value);
                if self.e {
                    self.p |= Status::INDEX_WIDTH | Status::MEMORY_WIDTH;
                }
            }
            Op::Sep => {
                let value = self.operand(bus, step, false) as u8;
                self.p = Status::from_bits_truncate(self.p.bits() | value);
                if self.e {
                    self.p |= Status::INDEX_WIDTH | Status::MEMORY_WIDTH;
                }
                if value & Status::INDEX_WIDTH.bits() != 0 {
                    self.set_xh(0);
                    self.set_yh(0);
                }
            }

            Op::Rti => {
                let status = self.pull8(bus);
                self.p = Status::from_bits_truncate(status);
                self.pc = self.pull16(bus);
                if !self.e {
                    self.k = self.pull8(bus);
                } else {
                    self.p |= Status::INDEX_WIDTH | Status::MEMORY_WIDTH;
                }
                if !self.index_16bit() {
                    self.set_xh(0);
                    self.set_yh(0);
                }
            }
            Op::Rtl => {
                self.pc = self.pull16(bus).wrapping_add(1);
                self.k = self.pull8(bus);
            }
            Op::Rts => {
                self.pc = self.pull16(bus).wrapping_add(1);
            }

            Op::Sta => {
                let wide = self.memory_16bit();
                let acc = self.acc_for_mode();
                self.write_back(bus, step, acc, wide);
            }
            Op::Stx => {
                let wide = self.index_16bit();
                let x = if wide { self.x } else { u16::from(self.xl()) };
                self.write_back(bus, step, x, wide);
            }
            Op::Sty => {
                let wide = self.index_16bit();
                let y = if wide { self.y } else { u16::from(self.yl()) };
                self.write_back(bus, step, y, wide);
            }
            Op::Stz => {
                let wide = self.memory_16bit();
                self.write_back(bus, step, 0, wide);
            }

            Op::Tax => {
                if self.index_16bit() {
                    // 16 bits transferred, no matter the state of M.
                    self.x = self.c;
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let a = self.a();
                    self.set_xl(a);
                    self.p.update_zero(u32::from(a), false);
                    self.p.update_sign(u32::from(a), false);
                }
            }
            Op::Tay => {
                if self.index_16bit() {
                    self.y = self.c;
                    let y = u32::from(self.y);
                    self.p.update_zero(y, true);
                    self.p.update_sign(y, true);
                } else {
                    let a = self.a();
                    self.set_yl(a);
                    self.p.update_zero(u32::from(a), false);
                    self.p.update_sign(u32::from(a), false);
                }
            }
            Op::Tcd => {
                self.dp = self.c;
                let dp = u32::from(self.dp);
                self.p.update_zero(dp, true);
                self.p.update_sign(dp, true);
            }
            Op::Tdc => {
                self.c = self.dp;
                let c = u32::from(self.c);
                self.p.update_zero(c, true);
                self.p.update_sign(c, true);
            }
            Op::Tcs => {
                self.sp = if self.e {
                    0x0100 | self.c & 0x00FF
                } else {
                    self.c
                };
            }
            Op::Tsc => {
                self.c = self.sp;
                let c = u32::from(self.c);
                self.p.update_zero(c, true);
                self.p.update_sign(c, true);
            }
            Op::Tsx => {
                if self.index_16bit() {
                    self.x = self.sp;
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let sp = self.sp as u8;
                    self.set_xl(sp);
                    self.set_xh(0);
                    self.p.update_zero(u32::from(sp), false);
                    self.p.update_sign(u32::from(sp), false);
                }
            }
            Op::Txs => {
                self.sp = if self.e {
                    0x0100 | u16::from(self.xl())
                } else {
                    self.x
                };
            }
            Op::Txa => {
                if self.memory_16bit() {
                    if self.index_16bit() {
                        self.c = self.x;
                        let c = u32::from(self.c);
                        self.p.update_zero(c, true);
                        self.p.update_sign(c, true);
                    } else {
                        let x = self.xl();
                        self.set_a(x);
                        self.set_b(0);
                        self.p.update_zero(u32::from(x), false);
                        self.p.update_sign(u32::from(x), false);
                    }
                } else {
                    let x = self.xl();
                    self.set_a(x);
                    self.p.update_zero(u32::from(x), false);
                    self.p.update_sign(u32::from(x), false);
                }
            }
            Op::Tya => {
                if self.memory_16bit() {
                    if self.index_16bit() {
                        self.c = self.y;
                        let c = u32::from(self.c);
                        self.p.update_zero(c, true);
                        self.p.update_sign(c, true);
                    } else {
                        let y = self.yl();
                        self.set_a(y);
                        self.set_b(0);
                        self.p.update_zero(u32::from(y), false);
                        self.p.update_sign(u32::from(y), false);
                    }
                } else {
                    let y = self.yl();
                    self.set_a(y);
                    self.p.update_zero(u32::from(y), false);
                    self.p.update_sign(u32::from(y), false);
                }
            }
            Op::Txy => {
                if self.index_16bit() {
                    self.y = self.x;
                    let y = u32::from(self.y);
                    self.p.update_zero(y, true);
                    self.p.update_sign(y, true);
                } else {
                    let x = self.xl();
                    self.set_yl(x);
                    self.p.update_zero(u32::from(x), false);
                    self.p.update_sign(u32::from(x), false);
                }
            }
            Op::Tyx => {
                if self.index_16bit() {
                    self.x = self.y;
                    let x = u32::from(self.x);
                    self.p.update_zero(x, true);
                    self.p.update_sign(x, true);
                } else {
                    let y = self.yl();
                    self.set_xl(y);
                    self.p.update_zero(u32::from(y), false);
                    self.p.update_sign(u32::from(y), false);
                }
            }

            Op::Tsb => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let acc = self.acc_for_mode();
                self.p.update_zero(u32::from(acc & value), wide);
                self.write_back(bus, step, value | acc, wide);
            }
            Op::Trb => {
                let wide = self.memory_16bit();
                let value = self.operand(bus, step, wide);
                let acc = self.acc_for_mode();
                self.p.update_zero(u32::from(acc & value), wide);
                let mask = if wide { self.c ^ 0xFFFF } else { u16::from(self.a() ^ 0xFF) };
                self.write_back(bus, step, value & mask, wide);
            }

            Op::Wai => self.waiting = true,
            Op::Stp => {
                self.stopped = true;
                self.stop_addr = self.opcode_addr;
            }

            Op::Xba => {
                let a = self.a();
                let b = self.b();
                self.set_a(b);
                self.set_b(a);
                self.p.update_zero(u32::from(b), false);
                self.p.update_sign(u32::from(b), false);
            }
            Op::Xce => {
                let carry = self.p.contains(Status::CARRY);
                self.p.set(Status::CARRY, self.e);
                self.e = carry;
                if self.e {
                    self.p |= Status::INDEX_WIDTH | Status::MEMORY_WIDTH;
                    self.sp = 0x0100 | self.sp & 0x00FF;
                    self.set_xh(0);
                    self.set_yh(0);
                }
            }

            Op::Rmb(bit) => {
                let value = bus.read(step.ea, 0);
                bus.write(step.ea, 0, value & !(1 << bit));
            }
            Op::Smb(bit) => {
                let value = bus.read(step.ea, 0);
                bus.write(step.ea, 0, value | 1 << bit);
            }
            Op::Bbr(bit) => {
                let value = bus.read(step.ea, 0);
                let taken = value & 1 << bit == 0;
                self.branch_if(step, taken);
            }
            Op::Bbs(bit) => {
                let value = bus.read(step.ea, 0);
                let taken = value & 1 << bit != 0;
                self.branch_if(step, taken);
            }
        }
    }

    fn op_adc<B: Bus>(&mut self, bus: &mut B, step: &mut Step) {
        step.penalty_op = true;
        let wide = self.memory_16bit();
        let carry = u32::from(self.p.contains(Status::CARRY));

        if self.p.contains(Status::DECIMAL) {
            // BCD arithmetic stays 8-bit; the CMOS cores also set N and Z
            // from the decimal result, at the cost of one extra cycle.
            let value = self.operand(bus, step, false) as u32;
            let a = u32::from(self.a());
            let mut tmp = (a & 0x0F) + (value & 0x0F) + carry;
            let mut tmp2 = (a & 0xF0) + (value & 0xF0);
            if tmp > 0x09 {
                tmp2 += 0x10;
                tmp += 0x06;
            }
            if tmp2 > 0x90 {
                tmp2 += 0x60;
            }
            self.p.set(Status::CARRY, tmp2 & 0xFF00 != 0);
            let result = tmp & 0x0F | tmp2 & 0xF0;

            self.p.update_zero(result, wide);
            self.p.update_sign(result, wide);

            step.extra += 1;
            self.save_accum(result);
        } else {
            let value = u32::from(self.operand(bus, step, wide));
            let acc = u32::from(self.acc_for_mode());
            let result = acc + value + carry;

            self.p.update_carry(result, wide);
            self.p.update_zero(result, wide);
            self.p.update_overflow(result, acc, value, wide);
            self.p.update_sign(result, wide);

            self.save_accum(result);
        }
    }

    fn op_sbc<B: Bus>(&mut self, bus: &mut B, step: &mut Step) {
        step.penalty_op = true;
        let wide = self.memory_16bit();
        let carry = u32::from(self.p.contains(Status::CARRY));

        if self.p.contains(Status::DECIMAL) {
            let value = self.operand(bus, step, false) as u32;
            let a = u32::from(self.a());
            let mut result = a.wrapping_sub(value & 0x0F).wrapping_add(carry).wrapping_sub(1);
            if result & 0x0F > a & 0x0F {
                result = result.wrapping_sub(6);
            }
            result = result.wrapping_sub(value & 0xF0);
            if result & 0xFFF0 > a & 0xF0 {
                result = result.wrapping_sub(0x60);
            }
            self.p.set(Status::CARRY, result <= a);

            self.p.update_zero(result, wide);
            self.p.update_sign(result, wide);

            step.extra += 1;
            self.save_accum(result);
        } else {
            let mask = if wide { 0xFFFF } else { 0x00FF };
            let value = u32::from(self.operand(bus, step, wide)) ^ mask;
            let acc = u32::from(self.acc_for_mode());
            let result = acc + value + carry;

            self.p.update_carry(result, wide);
            self.p.update_zero(result, wide);
            self.p.update_overflow(result, acc, value, wide);
            self.p.update_sign(result, wide);

            self.save_accum(result);
        }
    }
}
