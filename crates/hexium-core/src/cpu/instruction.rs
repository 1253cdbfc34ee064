use crate::cpu::addressing::Addressing;

/// Operations of both CPU personalities.
///
/// Undocumented 65C02 opcodes decode to `Nop`; their distinct byte counts
/// and cycle costs are captured by the lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Bra,
    Brk,
    Brl,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cop,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jml,
    Jmp,
    Jsl,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Mvn,
    Mvp,
    Nop,
    Ora,
    Pea,
    Pei,
    Per,
    Pha,
    Phb,
    Phd,
    Phk,
    Php,
    Phx,
    Phy,
    Pla,
    Plb,
    Pld,
    Plp,
    Plx,
    Ply,
    Rep,
    Rol,
    Ror,
    Rti,
    Rtl,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sep,
    Sta,
    Stp,
    Stx,
    Sty,
    Stz,
    Tax,
    Tay,
    Tcd,
    Tcs,
    Tdc,
    Trb,
    Tsb,
    Tsc,
    Tsx,
    Txa,
    Txs,
    Txy,
    Tya,
    Tyx,
    Wai,
    Wdm,
    Xba,
    Xce,
    /// Rockwell bit clear in zero page (65C02).
    Rmb(u8),
    /// Rockwell bit set in zero page (65C02).
    Smb(u8),
    /// Branch on bit reset (65C02).
    Bbr(u8),
    /// Branch on bit set (65C02).
    Bbs(u8),
}

/// One decoded opcode slot: operation, addressing mode, and base cycles.
///
/// Penalty cycles (page crossings, 16-bit operands, decimal mode, non-page-
/// aligned direct page) are added on top of `cycles` by the step loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Instruction {
    pub(crate) op: Op,
    pub(crate) addressing: Addressing,
    pub(crate) cycles: u8,
}

impl Instruction {
    pub(crate) const fn new(op: Op, addressing: Addressing, cycles: u8) -> Self {
        Self {
            op,
            addressing,
            cycles,
        }
    }
}
