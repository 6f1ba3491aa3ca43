use std::fmt::{Display, Formatter};
use std::ops::{Index, IndexMut};

use crate::error::OutOfRange;
use crate::memory::STACK_START;

/// The LS-8 has 8 registers, each 8 bits. The last three are reserved by convention:
/// - R5 is the interrupt mask (IM)
/// - R6 is the interrupt status (IS)
/// - R7 is the stack pointer (SP)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    /// Interrupt mask when used by convention
    R5 = 5,
    /// Interrupt status when used by convention
    R6 = 6,
    /// Stack pointer when used by convention
    R7 = 7,
}

pub const REGISTER_COUNT: usize = 8;

impl Register {
    pub const IM: Register = Register::R5;
    pub const IS: Register = Register::R6;
    pub const SP: Register = Register::R7;

    /// Registers saved on interrupt entry, in push order.
    pub const SAVED_ON_INTERRUPT: [Register; 6] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
    ];
}

impl TryFrom<u8> for Register {
    type Error = OutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Register::R0),
            1 => Ok(Register::R1),
            2 => Ok(Register::R2),
            3 => Ok(Register::R3),
            4 => Ok(Register::R4),
            5 => Ok(Register::R5),
            6 => Ok(Register::R6),
            7 => Ok(Register::R7),
            _ => Err(OutOfRange::Register(value)),
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", *self as u8)
    }
}

/// The register file.
///
/// IM, IS and SP get their own fields so the interrupt controller and the
/// stack never go through bare indices. Instructions still reach them as
/// R5, R6 and R7 through `Index<Register>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    general: [u8; 5],
    pub im: u8,
    pub is: u8,
    pub sp: u8,
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            general: [0; 5],
            im: 0,
            is: 0,
            sp: STACK_START,
        }
    }

    /// All eight values in R0..R7 order.
    pub fn values(&self) -> [u8; REGISTER_COUNT] {
        let g = &self.general;
        [g[0], g[1], g[2], g[3], g[4], self.im, self.is, self.sp]
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Register> for Registers {
    type Output = u8;
    fn index(&self, index: Register) -> &Self::Output {
        match index {
            Register::R5 => &self.im,
            Register::R6 => &self.is,
            Register::R7 => &self.sp,
            general => &self.general[general as usize],
        }
    }
}

impl IndexMut<Register> for Registers {
    fn index_mut(&mut self, index: Register) -> &mut Self::Output {
        match index {
            Register::R5 => &mut self.im,
            Register::R6 => &mut self.is,
            Register::R7 => &mut self.sp,
            general => &mut self.general[general as usize],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_pointer_starts_at_f4() {
        let registers = Registers::new();
        assert_eq!(registers.sp, 0xF4);
        assert_eq!(registers[Register::SP], 0xF4);
        assert_eq!(registers.values(), [0, 0, 0, 0, 0, 0, 0, 0xF4]);
    }

    #[test]
    fn reserved_registers_alias_named_fields() {
        let mut registers = Registers::new();
        registers[Register::R5] = 0b11;
        registers[Register::R6] = 0b10;
        registers[Register::R7] = 0x80;
        assert_eq!(registers.im, 0b11);
        assert_eq!(registers.is, 0b10);
        assert_eq!(registers.sp, 0x80);

        registers.im = 1;
        assert_eq!(registers[Register::IM], 1);
    }

    #[test]
    fn register_index_out_of_range() {
        assert_eq!(Register::try_from(7), Ok(Register::R7));
        assert_eq!(Register::try_from(8), Err(OutOfRange::Register(8)));
        assert_eq!(Register::try_from(0xFF), Err(OutOfRange::Register(0xFF)));
    }
}
