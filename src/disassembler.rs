use crate::instructions::{AluOperation, Instruction, InstructionDecoder};
use crate::memory::{Memory, MEMORY_SIZE};
use crate::program::Program;

/// Lists `program` one instruction per line.
///
/// Bytes that do not start a valid instruction are listed as `.DATA`, so
/// the vector table and other data after the code still show up.
pub fn disassemble_program(program: &Program) -> String {
    // Anything past the end of memory can never execute, so it is listed as data.
    let loaded = program.data.len().min(MEMORY_SIZE);
    let mut memory = Memory::new();
    memory.mem[..loaded].copy_from_slice(&program.data[..loaded]);

    let mut result = String::new();
    let mut addr = 0;
    while addr < program.data.len() {
        match memory.decode_at(addr) {
            Ok(instr) if addr + instr.size() <= loaded => {
                result.push_str(&format!("{:02X}: {}\n", addr, instr.disassemble()));
                addr += instr.size();
            }
            _ => {
                let byte = program.data[addr];
                if byte.is_ascii_graphic() {
                    result.push_str(&format!(
                        "{:02X}: .DATA 0x{:02X} '{}'\n",
                        addr, byte, byte as char
                    ));
                } else {
                    result.push_str(&format!("{:02X}: .DATA 0x{:02X}\n", addr, byte));
                }
                addr += 1;
            }
        }
    }
    result
}

pub trait Disassemble {
    fn disassemble(&self) -> String;
}

impl Disassemble for Instruction {
    fn disassemble(&self) -> String {
        let mnemonic = self.opcode();
        match self {
            Instruction::Hlt | Instruction::Ret | Instruction::Iret => mnemonic.to_string(),
            Instruction::Push(reg)
            | Instruction::Pop(reg)
            | Instruction::Prn(reg)
            | Instruction::Pra(reg)
            | Instruction::Call(reg)
            | Instruction::Int(reg)
            | Instruction::Jmp(reg)
            | Instruction::Jump { target: reg, .. } => format!("{} {}", mnemonic, reg),
            Instruction::Alu(operation) => operation.disassemble(),
            Instruction::Ldi { dest_reg, imm } | Instruction::Addi { dest_reg, imm } => {
                format!("{} {}, 0x{:02X}", mnemonic, dest_reg, imm)
            }
            Instruction::Ld { dest_reg, addr_reg } => {
                format!("{} {}, {}", mnemonic, dest_reg, addr_reg)
            }
            Instruction::St { addr_reg, src_reg } => {
                format!("{} {}, {}", mnemonic, addr_reg, src_reg)
            }
        }
    }
}

impl Disassemble for AluOperation {
    fn disassemble(&self) -> String {
        match self {
            AluOperation::Binary { op, reg_a, reg_b } => format!("{} {}, {}", op, reg_a, reg_b),
            AluOperation::Unary { op, reg } => format!("{} {}", op, reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_print8() {
        let program = Program::from_bytes(vec![0x82, 0x00, 0x08, 0x47, 0x00, 0x01]).unwrap();
        assert_eq!(
            disassemble_program(&program),
            "00: LDI R0, 0x08\n03: PRN R0\n05: HLT\n"
        );
    }

    #[test]
    fn alu_and_jumps() {
        let program =
            Program::from_bytes(vec![0xA2, 0x01, 0x02, 0x65, 0x03, 0x56, 0x04, 0x84, 0x00, 0x01])
                .unwrap();
        assert_eq!(
            disassemble_program(&program),
            "00: MUL R1, R2\n03: INC R3\n05: JNE R4\n07: ST R0, R1\n"
        );
    }

    #[test]
    fn bytes_past_end_of_memory_become_data() {
        let program = Program {
            data: vec![0x01; MEMORY_SIZE + 2],
        };
        let listing = disassemble_program(&program);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), MEMORY_SIZE + 2);
        assert_eq!(lines[0xFF], "FF: HLT");
        assert_eq!(lines[0x100], "100: .DATA 0x01");
        assert_eq!(lines[0x101], "101: .DATA 0x01");
    }

    #[test]
    fn undecodable_bytes_become_data() {
        let program = Program::from_bytes(vec![0x41, 0x00, 0x82, 0x09]).unwrap();
        assert_eq!(
            disassemble_program(&program),
            "00: .DATA 0x41 'A'\n01: .DATA 0x00\n02: .DATA 0x82\n03: .DATA 0x09\n"
        );
    }
}
