use bitflags::bitflags;

bitflags! {
    /// The 8-bit processor status register (P).
    ///
    /// Bit layout:
    /// 7 6 5 4 3 2 1 0
    /// N V M X D I Z C
    ///
    /// On the 65C816 bits 4 and 5 select the index and memory operand
    /// widths. On the 65C02 (and in emulation mode) bit 4 doubles as the
    /// break flag and bit 5 reads as a constant 1, following WDC semantics.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry flag (C).
        const CARRY        = 0b0000_0001;

        /// Zero flag (Z).
        const ZERO         = 0b0000_0010;

        /// Interrupt disable flag (I). When set, IRQs are masked.
        const INTERRUPT    = 0b0000_0100;

        /// Decimal mode flag (D). ADC and SBC operate on BCD operands
        /// while this is set.
        const DECIMAL      = 0b0000_1000;

        /// Index register width (X). Set selects 8-bit index registers.
        /// Reads as the break flag on the 65C02.
        const INDEX_WIDTH  = 0b0001_0000;

        /// Memory/accumulator width (M). Set selects 8-bit operations.
        /// Reads as a constant 1 on the 65C02.
        const MEMORY_WIDTH = 0b0010_0000;

        /// Overflow flag (V).
        const OVERFLOW     = 0b0100_0000;

        /// Negative flag (N). Mirrors the sign bit of the last result.
        const NEGATIVE     = 0b1000_0000;
    }
}

/// Break flag pushed by BRK in emulation mode (aliases the X width bit).
pub const FLAG_BREAK: Status = Status::INDEX_WIDTH;
/// Constant "always 1" bit of the 65C02 status byte (aliases the M bit).
pub const FLAG_CONSTANT: Status = Status::MEMORY_WIDTH;

impl Status {
    /// Set or clear the zero flag from an 8- or 16-bit result.
    pub fn update_zero(&mut self, value: u32, wide: bool) {
        let mask = if wide { 0xFFFF } else { 0x00FF };
        self.set(Status::ZERO, value & mask == 0);
    }

    /// Set or clear the negative flag from the sign bit of a result.
    pub fn update_sign(&mut self, value: u32, wide: bool) {
        let bit = if wide { 0x8000 } else { 0x0080 };
        self.set(Status::NEGATIVE, value & bit != 0);
    }

    /// Set or clear the carry flag from the carry-out bit of a result.
    pub fn update_carry(&mut self, value: u32, wide: bool) {
        let bit = if wide { 0x1_0000 } else { 0x0100 };
        self.set(Status::CARRY, value & bit != 0);
    }

    /// Signed-overflow calculation for ADC/SBC. `acc` is the accumulator
    /// operand and `operand` the (possibly complemented) memory operand.
    pub fn update_overflow(&mut self, result: u32, acc: u32, operand: u32, wide: bool) {
        let bit = if wide { 0x8000 } else { 0x0080 };
        self.set(Status::OVERFLOW, (result ^ acc) & (result ^ operand) & bit != 0);
    }
}
