use crate::cpu::addressing::Addressing as A;
use crate::cpu::instruction::{Instruction as I, Op as O};

// Short aliases for addressing modes (to keep the 16x16 tables readable)
const IMP: A = A::Implied;
const STK: A = A::Stack;
const ACC: A = A::Accumulator;
const IMM8: A = A::Immediate8;
const IMMM: A = A::ImmediateM;
const IMMX: A = A::ImmediateX;
const IMM16: A = A::Immediate16;
const REL: A = A::Relative;
const REL16: A = A::Relative16;
const ZP: A = A::ZeroPage;
const ZPX: A = A::ZeroPageX;
const ZPY: A = A::ZeroPageY;
const ABS: A = A::Absolute;
const ABX: A = A::AbsoluteX;
const ABY: A = A::AbsoluteY;
const IND: A = A::Indirect;
const INX: A = A::IndirectX;
const INY: A = A::IndirectY;
const IZP: A = A::ZpIndirect;
const IZPN: A = A::ZpIndirectNoWrap;
const AIX: A = A::AbsoluteIndexedIndirect;
const ZPR: A = A::ZeroPageRelative;
const SR: A = A::StackRelative;
const SRY: A = A::StackRelativeY;
const BMV: A = A::BlockMove;
const ABL: A = A::AbsoluteLong;
const ABLX: A = A::AbsoluteLongX;
const INDL: A = A::IndirectLong;
const DIL: A = A::DpIndirectLong;
const DILY: A = A::DpIndirectLongY;

macro_rules! op {
    ($ins:ident, $addr:ident, $cyc:expr) => {
        I::new(O::$ins, $addr, $cyc)
    };
    ($ins:ident($n:expr), $addr:ident, $cyc:expr) => {
        I::new(O::$ins($n), $addr, $cyc)
    };
}

/// 65C02 decode table, including the Rockwell bit instructions. Undocumented
/// opcodes are NOPs with their documented byte counts and cycle costs.
#[rustfmt::skip]
pub(crate) static LOOKUP_65C02: [I; 256] = [
    // 0                  1                  2                  3                  4                  5                  6                  7
    // 8                  9                  A                  B                  C                  D                  E                  F

    // 0x00
    op!(Brk, STK, 7),  op!(Ora, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Tsb, ZP, 5),   op!(Ora, ZP, 3),   op!(Asl, ZP, 5),   op!(Rmb(0), ZP, 5),
    op!(Php, IMP, 3),  op!(Ora, IMMM, 2), op!(Asl, ACC, 2),  op!(Nop, IMP, 1),  op!(Tsb, ABS, 6),  op!(Ora, ABS, 4),  op!(Asl, ABS, 6),  op!(Bbr(0), ZPR, 5),

    // 0x10
    op!(Bpl, REL, 2),  op!(Ora, INY, 5),  op!(Ora, IZP, 5),  op!(Nop, IMP, 1),  op!(Trb, ZP, 5),   op!(Ora, ZPX, 4),  op!(Asl, ZPX, 6),  op!(Rmb(1), ZP, 5),
    op!(Clc, IMP, 2),  op!(Ora, ABY, 4),  op!(Inc, ACC, 2),  op!(Nop, IMP, 1),  op!(Trb, ABS, 6),  op!(Ora, ABX, 4),  op!(Asl, ABX, 6),  op!(Bbr(1), ZPR, 5),

    // 0x20
    op!(Jsr, ABS, 6),  op!(And, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Bit, ZP, 3),   op!(And, ZP, 3),   op!(Rol, ZP, 5),   op!(Rmb(2), ZP, 5),
    op!(Plp, IMP, 4),  op!(And, IMMM, 2), op!(Rol, ACC, 2),  op!(Nop, IMP, 1),  op!(Bit, ABS, 4),  op!(And, ABS, 4),  op!(Rol, ABS, 6),  op!(Bbr(2), ZPR, 5),

    // 0x30
    op!(Bmi, REL, 2),  op!(And, INY, 5),  op!(And, IZP, 5),  op!(Nop, IMP, 1),  op!(Bit, ZPX, 4),  op!(And, ZPX, 4),  op!(Rol, ZPX, 6),  op!(Rmb(3), ZP, 5),
    op!(Sec, IMP, 2),  op!(And, ABY, 4),  op!(Dec, ACC, 2),  op!(Nop, IMP, 1),  op!(Bit, ABX, 4),  op!(And, ABX, 4),  op!(Rol, ABX, 6),  op!(Bbr(3), ZPR, 5),

    // 0x40
    op!(Rti, IMP, 6),  op!(Eor, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Nop, ZP, 3),   op!(Eor, ZP, 3),   op!(Lsr, ZP, 5),   op!(Rmb(4), ZP, 5),
    op!(Pha, IMP, 3),  op!(Eor, IMMM, 2), op!(Lsr, ACC, 2),  op!(Nop, IMP, 1),  op!(Jmp, ABS, 3),  op!(Eor, ABS, 4),  op!(Lsr, ABS, 6),  op!(Bbr(4), ZPR, 5),

    // 0x50
    op!(Bvc, REL, 2),  op!(Eor, INY, 5),  op!(Eor, IZP, 5),  op!(Nop, IMP, 1),  op!(Nop, ZPX, 4),  op!(Eor, ZPX, 4),  op!(Lsr, ZPX, 6),  op!(Rmb(5), ZP, 5),
    op!(Cli, IMP, 2),  op!(Eor, ABY, 4),  op!(Phy, IMP, 3),  op!(Nop, IMP, 1),  op!(Nop, ABS, 8),  op!(Eor, ABX, 4),  op!(Lsr, ABX, 6),  op!(Bbr(5), ZPR, 5),

    // 0x60
    op!(Rts, IMP, 6),  op!(Adc, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Stz, ZP, 3),   op!(Adc, ZP, 3),   op!(Ror, ZP, 5),   op!(Rmb(6), ZP, 5),
    op!(Pla, IMP, 4),  op!(Adc, IMMM, 2), op!(Ror, ACC, 2),  op!(Nop, IMP, 1),  op!(Jmp, IND, 5),  op!(Adc, ABS, 4),  op!(Ror, ABS, 6),  op!(Bbr(6), ZPR, 5),

    // 0x70
    op!(Bvs, REL, 2),  op!(Adc, INY, 5),  op!(Adc, IZP, 5),  op!(Nop, IMP, 1),  op!(Stz, ZPX, 4),  op!(Adc, ZPX, 4),  op!(Ror, ZPX, 6),  op!(Rmb(7), ZP, 5),
    op!(Sei, IMP, 2),  op!(Adc, ABY, 4),  op!(Ply, IMP, 4),  op!(Nop, IMP, 1),  op!(Jmp, AIX, 6),  op!(Adc, ABX, 4),  op!(Ror, ABX, 6),  op!(Bbr(7), ZPR, 5),

    // 0x80
    op!(Bra, REL, 3),  op!(Sta, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Sty, ZP, 3),   op!(Sta, ZP, 3),   op!(Stx, ZP, 3),   op!(Smb(0), ZP, 5),
    op!(Dey, IMP, 2),  op!(Bit, IMMM, 2), op!(Txa, IMP, 2),  op!(Nop, IMP, 1),  op!(Sty, ABS, 4),  op!(Sta, ABS, 4),  op!(Stx, ABS, 4),  op!(Bbs(0), ZPR, 5),

    // 0x90
    op!(Bcc, REL, 2),  op!(Sta, INY, 6),  op!(Sta, IZP, 5),  op!(Nop, IMP, 1),  op!(Sty, ZPX, 4),  op!(Sta, ZPX, 4),  op!(Stx, ZPY, 4),  op!(Smb(1), ZP, 5),
    op!(Tya, IMP, 2),  op!(Sta, ABY, 5),  op!(Txs, IMP, 2),  op!(Nop, IMP, 1),  op!(Stz, ABS, 4),  op!(Sta, ABX, 5),  op!(Stz, ABX, 5),  op!(Bbs(1), ZPR, 5),

    // 0xA0
    op!(Ldy, IMMX, 2), op!(Lda, INX, 6),  op!(Ldx, IMMX, 2), op!(Nop, IMP, 1),  op!(Ldy, ZP, 3),   op!(Lda, ZP, 3),   op!(Ldx, ZP, 3),   op!(Smb(2), ZP, 5),
    op!(Tay, IMP, 2),  op!(Lda, IMMM, 2), op!(Tax, IMP, 2),  op!(Nop, IMP, 1),  op!(Ldy, ABS, 4),  op!(Lda, ABS, 4),  op!(Ldx, ABS, 4),  op!(Bbs(2), ZPR, 5),

    // 0xB0
    op!(Bcs, REL, 2),  op!(Lda, INY, 5),  op!(Lda, IZP, 5),  op!(Nop, IMP, 1),  op!(Ldy, ZPX, 4),  op!(Lda, ZPX, 4),  op!(Ldx, ZPY, 4),  op!(Smb(3), ZP, 5),
    op!(Clv, IMP, 2),  op!(Lda, ABY, 4),  op!(Tsx, IMP, 2),  op!(Nop, IMP, 1),  op!(Ldy, ABX, 4),  op!(Lda, ABX, 4),  op!(Ldx, ABY, 4),  op!(Bbs(3), ZPR, 5),

    // 0xC0
    op!(Cpy, IMMX, 2), op!(Cmp, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Cpy, ZP, 3),   op!(Cmp, ZP, 3),   op!(Dec, ZP, 5),   op!(Smb(4), ZP, 5),
    op!(Iny, IMP, 2),  op!(Cmp, IMMM, 2), op!(Dex, IMP, 2),  op!(Wai, IMP, 3),  op!(Cpy, ABS, 4),  op!(Cmp, ABS, 4),  op!(Dec, ABS, 6),  op!(Bbs(4), ZPR, 5),

    // 0xD0
    op!(Bne, REL, 2),  op!(Cmp, INY, 5),  op!(Cmp, IZP, 5),  op!(Nop, IMP, 1),  op!(Nop, ZPX, 4),  op!(Cmp, ZPX, 4),  op!(Dec, ZPX, 6),  op!(Smb(5), ZP, 5),
    op!(Cld, IMP, 2),  op!(Cmp, ABY, 4),  op!(Phx, IMP, 3),  op!(Stp, IMP, 3),  op!(Nop, ABS, 4),  op!(Cmp, ABX, 4),  op!(Dec, ABX, 7),  op!(Bbs(5), ZPR, 5),

    // 0xE0
    op!(Cpx, IMMX, 2), op!(Sbc, INX, 6),  op!(Nop, IMM8, 2), op!(Nop, IMP, 1),  op!(Cpx, ZP, 3),   op!(Sbc, ZP, 3),   op!(Inc, ZP, 5),   op!(Smb(6), ZP, 5),
    op!(Inx, IMP, 2),  op!(Sbc, IMMM, 2), op!(Nop, IMP, 2),  op!(Nop, IMP, 1),  op!(Cpx, ABS, 4),  op!(Sbc, ABS, 4),  op!(Inc, ABS, 6),  op!(Bbs(6), ZPR, 5),

    // 0xF0
    op!(Beq, REL, 2),  op!(Sbc, INY, 5),  op!(Sbc, IZP, 5),  op!(Nop, IMP, 1),  op!(Nop, ZPX, 4),  op!(Sbc, ZPX, 4),  op!(Inc, ZPX, 6),  op!(Smb(7), ZP, 5),
    op!(Sed, IMP, 2),  op!(Sbc, ABY, 4),  op!(Plx, IMP, 4),  op!(Nop, IMP, 1),  op!(Nop, ABS, 4),  op!(Sbc, ABX, 4),  op!(Inc, ABX, 7),  op!(Bbs(7), ZPR, 5),
];

/// 65C816 decode table. Base cycles assume 8-bit widths, emulation-mode
/// stack behavior, and page-aligned direct page; the step loop adds the
/// width, page-cross, and native-mode penalties.
#[rustfmt::skip]
pub(crate) static LOOKUP_65C816: [I; 256] = [
    // 0                  1                  2                   3                  4                   5                  6                  7
    // 8                  9                  A                   B                  C                   D                  E                  F

    // 0x00
    op!(Brk, STK, 7),  op!(Ora, INX, 6),  op!(Cop, STK, 7),   op!(Ora, SR, 4),   op!(Tsb, ZP, 5),    op!(Ora, ZP, 3),   op!(Asl, ZP, 5),   op!(Ora, DIL, 6),
    op!(Php, IMP, 3),  op!(Ora, IMMM, 2), op!(Asl, ACC, 2),   op!(Phd, IMP, 4),  op!(Tsb, ABS, 6),   op!(Ora, ABS, 4),  op!(Asl, ABS, 6),  op!(Ora, ABL, 5),

    // 0x10
    op!(Bpl, REL, 2),  op!(Ora, INY, 5),  op!(Ora, IZP, 5),   op!(Ora, SRY, 7),  op!(Trb, ZP, 5),    op!(Ora, ZPX, 4),  op!(Asl, ZPX, 6),  op!(Ora, DILY, 6),
    op!(Clc, IMP, 2),  op!(Ora, ABY, 4),  op!(Inc, ACC, 2),   op!(Tcs, IMP, 2),  op!(Trb, ABS, 6),   op!(Ora, ABX, 4),  op!(Asl, ABX, 6),  op!(Ora, ABLX, 5),

    // 0x20
    op!(Jsr, ABS, 6),  op!(And, INX, 6),  op!(Jsl, ABL, 8),   op!(And, SR, 4),   op!(Bit, ZP, 3),    op!(And, ZP, 3),   op!(Rol, ZP, 5),   op!(And, DIL, 6),
    op!(Plp, IMP, 4),  op!(And, IMMM, 2), op!(Rol, ACC, 2),   op!(Pld, IMP, 5),  op!(Bit, ABS, 4),   op!(And, ABS, 4),  op!(Rol, ABS, 6),  op!(And, ABL, 5),

    // 0x30
    op!(Bmi, REL, 2),  op!(And, INY, 5),  op!(And, IZP, 5),   op!(And, SRY, 7),  op!(Bit, ZPX, 4),   op!(And, ZPX, 4),  op!(Rol, ZPX, 6),  op!(And, DILY, 6),
    op!(Sec, IMP, 2),  op!(And, ABY, 4),  op!(Dec, ACC, 2),   op!(Tsc, IMP, 2),  op!(Bit, ABX, 4),   op!(And, ABX, 4),  op!(Rol, ABX, 6),  op!(And, ABLX, 5),

    // 0x40
    op!(Rti, IMP, 7),  op!(Eor, INX, 6),  op!(Wdm, IMM8, 2),  op!(Eor, SR, 4),   op!(Mvp, BMV, 7),   op!(Eor, ZP, 3),   op!(Lsr, ZP, 5),   op!(Eor, DIL, 6),
    op!(Pha, IMP, 3),  op!(Eor, IMMM, 2), op!(Lsr, ACC, 2),   op!(Phk, IMP, 3),  op!(Jmp, ABS, 3),   op!(Eor, ABS, 4),  op!(Lsr, ABS, 6),  op!(Eor, ABL, 5),

    // 0x50
    op!(Bvc, REL, 2),  op!(Eor, INY, 5),  op!(Eor, IZP, 5),   op!(Eor, SRY, 7),  op!(Mvn, BMV, 7),   op!(Eor, ZPX, 4),  op!(Lsr, ZPX, 6),  op!(Eor, DILY, 6),
    op!(Cli, IMP, 2),  op!(Eor, ABY, 4),  op!(Phy, IMP, 3),   op!(Tcd, IMP, 2),  op!(Jml, ABL, 4),   op!(Eor, ABX, 4),  op!(Lsr, ABX, 6),  op!(Eor, ABLX, 5),

    // 0x60
    op!(Rts, IMP, 6),  op!(Adc, INX, 6),  op!(Per, REL16, 6), op!(Adc, SR, 4),   op!(Stz, ZP, 3),    op!(Adc, ZP, 3),   op!(Ror, ZP, 5),   op!(Adc, DIL, 6),
    op!(Pla, IMP, 4),  op!(Adc, IMMM, 2), op!(Ror, ACC, 2),   op!(Rtl, IMP, 6),  op!(Jmp, IND, 5),   op!(Adc, ABS, 4),  op!(Ror, ABS, 6),  op!(Adc, ABL, 5),

    // 0x70
    op!(Bvs, REL, 2),  op!(Adc, INY, 5),  op!(Adc, IZP, 5),   op!(Adc, SRY, 7),  op!(Stz, ZPX, 4),   op!(Adc, ZPX, 4),  op!(Ror, ZPX, 6),  op!(Adc, DILY, 6),
    op!(Sei, IMP, 2),  op!(Adc, ABY, 4),  op!(Ply, IMP, 4),   op!(Tdc, IMP, 2),  op!(Jmp, AIX, 6),   op!(Adc, ABX, 4),  op!(Ror, ABX, 6),  op!(Adc, ABLX, 5),

    // 0x80
    op!(Bra, REL, 3),  op!(Sta, INX, 6),  op!(Brl, REL16, 4), op!(Sta, SR, 4),   op!(Sty, ZP, 3),    op!(Sta, ZP, 3),   op!(Stx, ZP, 3),   op!(Sta, DIL, 6),
    op!(Dey, IMP, 2),  op!(Bit, IMMM, 2), op!(Txa, IMP, 2),   op!(Phb, IMP, 3),  op!(Sty, ABS, 4),   op!(Sta, ABS, 4),  op!(Stx, ABS, 4),  op!(Sta, ABL, 5),

    // 0x90
    op!(Bcc, REL, 2),  op!(Sta, INY, 6),  op!(Sta, IZP, 5),   op!(Sta, SRY, 7),  op!(Sty, ZPX, 4),   op!(Sta, ZPX, 4),  op!(Stx, ZPY, 4),  op!(Sta, DILY, 6),
    op!(Tya, IMP, 2),  op!(Sta, ABY, 5),  op!(Txs, IMP, 2),   op!(Txy, IMP, 2),  op!(Stz, ABS, 4),   op!(Sta, ABX, 5),  op!(Stz, ABX, 5),  op!(Sta, ABLX, 5),

    // 0xA0
    op!(Ldy, IMMX, 2), op!(Lda, INX, 6),  op!(Ldx, IMMX, 2),  op!(Lda, SR, 4),   op!(Ldy, ZP, 3),    op!(Lda, ZP, 3),   op!(Ldx, ZP, 3),   op!(Lda, DIL, 6),
    op!(Tay, IMP, 2),  op!(Lda, IMMM, 2), op!(Tax, IMP, 2),   op!(Plb, IMP, 4),  op!(Ldy, ABS, 4),   op!(Lda, ABS, 4),  op!(Ldx, ABS, 4),  op!(Lda, ABL, 5),

    // 0xB0
    op!(Bcs, REL, 2),  op!(Lda, INY, 5),  op!(Lda, IZP, 5),   op!(Lda, SRY, 7),  op!(Ldy, ZPX, 4),   op!(Lda, ZPX, 4),  op!(Ldx, ZPY, 4),  op!(Lda, DILY, 6),
    op!(Clv, IMP, 2),  op!(Lda, ABY, 4),  op!(Tsx, IMP, 2),   op!(Tyx, IMP, 2),  op!(Ldy, ABX, 4),   op!(Lda, ABX, 4),  op!(Ldx, ABY, 4),  op!(Lda, ABLX, 5),

    // 0xC0
    op!(Cpy, IMMX, 2), op!(Cmp, INX, 6),  op!(Rep, IMM8, 3),  op!(Cmp, SR, 4),   op!(Cpy, ZP, 3),    op!(Cmp, ZP, 3),   op!(Dec, ZP, 5),   op!(Cmp, DIL, 6),
    op!(Iny, IMP, 2),  op!(Cmp, IMMM, 2), op!(Dex, IMP, 2),   op!(Wai, IMP, 3),  op!(Cpy, ABS, 4),   op!(Cmp, ABS, 4),  op!(Dec, ABS, 6),  op!(Cmp, ABL, 5),

    // 0xD0
    op!(Bne, REL, 2),  op!(Cmp, INY, 5),  op!(Cmp, IZP, 5),   op!(Cmp, SRY, 7),  op!(Pei, IZPN, 6),  op!(Cmp, ZPX, 4),  op!(Dec, ZPX, 6),  op!(Cmp, DILY, 6),
    op!(Cld, IMP, 2),  op!(Cmp, ABY, 4),  op!(Phx, IMP, 3),   op!(Stp, IMP, 3),  op!(Jml, INDL, 6),  op!(Cmp, ABX, 4),  op!(Dec, ABX, 7),  op!(Cmp, ABLX, 5),

    // 0xE0
    op!(Cpx, IMMX, 2), op!(Sbc, INX, 6),  op!(Sep, IMM8, 3),  op!(Sbc, SR, 4),   op!(Cpx, ZP, 3),    op!(Sbc, ZP, 3),   op!(Inc, ZP, 5),   op!(Sbc, DIL, 6),
    op!(Inx, IMP, 2),  op!(Sbc, IMMM, 2), op!(Nop, IMP, 2),   op!(Xba, IMP, 3),  op!(Cpx, ABS, 4),   op!(Sbc, ABS, 4),  op!(Inc, ABS, 6),  op!(Sbc, ABL, 5),

    // 0xF0
    op!(Beq, REL, 2),  op!(Sbc, INY, 5),  op!(Sbc, IZP, 5),   op!(Sbc, SRY, 7),  op!(Pea, IMM16, 5), op!(Sbc, ZPX, 4),  op!(Inc, ZPX, 6),  op!(Sbc, DILY, 6),
    op!(Sed, IMP, 2),  op!(Sbc, ABY, 4),  op!(Plx, IMP, 4),   op!(Xce, IMP, 2),  op!(Jsr, AIX, 8),   op!(Sbc, ABX, 4),  op!(Inc, ABX, 7),  op!(Sbc, ABLX, 5),
];
