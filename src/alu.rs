use crate::error::{Result, VmError};
use crate::instructions::{AluOperation, ConditionFlag, Opcode};
use crate::registers::{Register, Registers};

/// Runs a decoded ALU operation against the register file.
pub fn execute(operation: AluOperation, registers: &mut Registers, flags: &mut u8) -> Result<()> {
    match operation {
        AluOperation::Binary { op, reg_a, reg_b } => binary(op, registers, flags, reg_a, reg_b),
        AluOperation::Unary { op, reg } => unary(op, registers, reg),
    }
}

/// Two-register operations. The result lands in `reg_a`; CMP writes `flags` instead.
///
/// All arithmetic wraps at 8 bits. Shifting by 8 or more clears the register.
pub fn binary(
    op: Opcode,
    registers: &mut Registers,
    flags: &mut u8,
    reg_a: Register,
    reg_b: Register,
) -> Result<()> {
    let a = registers[reg_a];
    let b = registers[reg_b];
    let value = match op {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::Mod => a.checked_rem(b).ok_or(VmError::DivisionByZero)?,
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::Shl => a.checked_shl(u32::from(b)).unwrap_or(0),
        Opcode::Shr => a.checked_shr(u32::from(b)).unwrap_or(0),
        Opcode::Cmp => {
            *flags = compare(a, b).into();
            return Ok(());
        }
        _ => return Err(VmError::UnsupportedOperation { opcode: op as u8 }),
    };
    registers[reg_a] = value;
    Ok(())
}

/// Single-register operations, applied in place.
pub fn unary(op: Opcode, registers: &mut Registers, reg: Register) -> Result<()> {
    let value = registers[reg];
    registers[reg] = match op {
        Opcode::Not => !value,
        Opcode::Inc => value.wrapping_add(1),
        Opcode::Dec => value.wrapping_sub(1),
        _ => return Err(VmError::UnsupportedOperation { opcode: op as u8 }),
    };
    Ok(())
}

fn compare(a: u8, b: u8) -> ConditionFlag {
    if a < b {
        ConditionFlag::Less
    } else if a > b {
        ConditionFlag::Greater
    } else {
        ConditionFlag::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn registers_with(a: u8, b: u8) -> Registers {
        let mut registers = Registers::new();
        registers[Register::R0] = a;
        registers[Register::R1] = b;
        registers
    }

    fn run_binary(op: Opcode, a: u8, b: u8) -> Result<(u8, u8)> {
        let mut registers = registers_with(a, b);
        let mut flags = 0;
        binary(op, &mut registers, &mut flags, Register::R0, Register::R1)?;
        Ok((registers[Register::R0], flags))
    }

    #[test]
    fn arithmetic_wraps_at_8_bits() {
        assert_eq!(run_binary(Opcode::Add, 200, 100).unwrap().0, 44);
        assert_eq!(run_binary(Opcode::Sub, 3, 5).unwrap().0, 254);
        assert_eq!(run_binary(Opcode::Mul, 5, 7).unwrap().0, 35);
        assert_eq!(run_binary(Opcode::Mul, 16, 17).unwrap().0, 16);
        assert_eq!(run_binary(Opcode::Mod, 17, 5).unwrap().0, 2);
    }

    #[test]
    fn bitwise_and_shifts() {
        assert_eq!(run_binary(Opcode::And, 0b1100, 0b1010).unwrap().0, 0b1000);
        assert_eq!(run_binary(Opcode::Or, 0b1100, 0b1010).unwrap().0, 0b1110);
        assert_eq!(run_binary(Opcode::Xor, 0b1100, 0b1010).unwrap().0, 0b0110);
        assert_eq!(run_binary(Opcode::Shl, 0b1000_0001, 1).unwrap().0, 0b0000_0010);
        assert_eq!(run_binary(Opcode::Shr, 0b1000_0001, 7).unwrap().0, 1);
        assert_eq!(run_binary(Opcode::Shl, 0xFF, 8).unwrap().0, 0);
        assert_eq!(run_binary(Opcode::Shr, 0xFF, 200).unwrap().0, 0);
    }

    #[test]
    fn mod_by_zero_fails() {
        assert!(matches!(
            run_binary(Opcode::Mod, 9, 0),
            Err(VmError::DivisionByZero)
        ));
    }

    #[test]
    fn cmp_leaves_registers_alone() {
        let (r0, flags) = run_binary(Opcode::Cmp, 4, 9).unwrap();
        assert_eq!(r0, 4);
        assert_eq!(flags, 0b100);
        assert_eq!(run_binary(Opcode::Cmp, 9, 4).unwrap().1, 0b010);
        assert_eq!(run_binary(Opcode::Cmp, 9, 9).unwrap().1, 0b001);
    }

    #[test]
    fn unary_ops() {
        let mut registers = Registers::new();
        registers[Register::R2] = 255;
        unary(Opcode::Inc, &mut registers, Register::R2).unwrap();
        assert_eq!(registers[Register::R2], 0);
        unary(Opcode::Dec, &mut registers, Register::R2).unwrap();
        assert_eq!(registers[Register::R2], 255);
        unary(Opcode::Not, &mut registers, Register::R2).unwrap();
        assert_eq!(registers[Register::R2], 0);
    }

    #[test]
    fn unsupported_ops_are_rejected() {
        assert!(matches!(
            run_binary(Opcode::Ldi, 1, 2),
            Err(VmError::UnsupportedOperation { opcode: 0x82 })
        ));
        let mut registers = Registers::new();
        assert!(matches!(
            unary(Opcode::Add, &mut registers, Register::R0),
            Err(VmError::UnsupportedOperation { opcode: 0xA0 })
        ));
    }

    proptest! {
        #[test]
        fn cmp_sets_exactly_one_flag(a in any::<u8>(), b in any::<u8>()) {
            let (_, flags) = run_binary(Opcode::Cmp, a, b).unwrap();
            prop_assert_eq!(flags.count_ones(), 1);
            let expected = match a.cmp(&b) {
                std::cmp::Ordering::Less => 0b100,
                std::cmp::Ordering::Greater => 0b010,
                std::cmp::Ordering::Equal => 0b001,
            };
            prop_assert_eq!(flags, expected);
        }

        #[test]
        fn inc_then_dec_is_identity(value in any::<u8>()) {
            let mut registers = Registers::new();
            registers[Register::R3] = value;
            unary(Opcode::Inc, &mut registers, Register::R3).unwrap();
            unary(Opcode::Dec, &mut registers, Register::R3).unwrap();
            prop_assert_eq!(registers[Register::R3], value);
        }
    }
}
