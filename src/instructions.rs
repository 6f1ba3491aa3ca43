use std::fmt::{Display, Formatter};

use crate::error::{Result, VmError};
use crate::memory::{Ls8Memory, Memory};
use crate::registers::Register;

/// The LS-8 instruction set.
///
/// An instruction is one opcode byte followed by zero, one or two operand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Halt: Stop the machine
    Hlt = 0b0000_0001,
    /// Return: Pop the return address into PC
    Ret = 0b0001_0001,
    /// Interrupt Return: Restore the state saved on interrupt entry
    Iret = 0b0001_0011,
    /// Push: Decrement SP and store a register at the top of the stack
    /// Format: PUSH reg
    Push = 0b0100_0101,
    /// Pop: Load the top of the stack into a register and increment SP
    /// Format: POP reg
    Pop = 0b0100_0110,
    /// Print Number: Write the decimal value of a register
    /// Format: PRN reg
    Prn = 0b0100_0111,
    /// Print Alpha: Write the character for a register's value
    /// Format: PRA reg
    Pra = 0b0100_1000,
    /// Call: Push the return address and jump to the address in a register
    /// Format: CALL reg
    Call = 0b0101_0000,
    /// Software Interrupt: Raise the interrupt numbered by a register
    /// Format: INT reg
    Int = 0b0101_0010,
    /// Jump: Unconditional jump to the address in a register
    /// Format: JMP reg
    Jmp = 0b0101_0100,
    /// Jump if Equal
    Jeq = 0b0101_0101,
    /// Jump if Not Equal
    Jne = 0b0101_0110,
    /// Jump if Greater Than
    Jgt = 0b0101_0111,
    /// Jump if Less Than
    Jlt = 0b0101_1000,
    /// Jump if Less or Equal
    Jle = 0b0101_1001,
    /// Jump if Greater or Equal
    Jge = 0b0101_1010,
    /// Increment a register
    Inc = 0b0110_0101,
    /// Decrement a register
    Dec = 0b0110_0110,
    /// Bitwise NOT of a register
    Not = 0b0110_1001,
    /// Load Immediate: Set a register to a constant
    /// Format: LDI reg, imm8
    Ldi = 0b1000_0010,
    /// Load: Load a register from the address held in another register
    /// Format: LD regA, regB
    Ld = 0b1000_0011,
    /// Store: Store a register at the address held in another register
    /// Format: ST regA, regB
    St = 0b1000_0100,
    Add = 0b1010_0000,
    Mul = 0b1010_0010,
    Sub = 0b1010_0011,
    Mod = 0b1010_0100,
    /// Add Immediate: Add a constant to a register
    /// Format: ADDI reg, imm8
    Addi = 0b1010_0101,
    /// Compare: Set FL from two registers
    Cmp = 0b1010_0111,
    And = 0b1010_1000,
    Or = 0b1010_1010,
    Xor = 0b1010_1011,
    Shl = 0b1010_1100,
    Shr = 0b1010_1101,
}

impl Opcode {
    /// Number of operand bytes following the opcode.
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::Hlt | Opcode::Ret | Opcode::Iret => 0,
            Opcode::Push
            | Opcode::Pop
            | Opcode::Prn
            | Opcode::Pra
            | Opcode::Call
            | Opcode::Int
            | Opcode::Jmp
            | Opcode::Jeq
            | Opcode::Jne
            | Opcode::Jgt
            | Opcode::Jlt
            | Opcode::Jle
            | Opcode::Jge
            | Opcode::Inc
            | Opcode::Dec
            | Opcode::Not => 1,
            Opcode::Ldi
            | Opcode::Ld
            | Opcode::St
            | Opcode::Add
            | Opcode::Mul
            | Opcode::Sub
            | Opcode::Mod
            | Opcode::Addi
            | Opcode::Cmp
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr => 2,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = VmError;

    fn try_from(value: u8) -> Result<Self> {
        let opcode = match value {
            0b0000_0001 => Opcode::Hlt,
            0b0001_0001 => Opcode::Ret,
            0b0001_0011 => Opcode::Iret,
            0b0100_0101 => Opcode::Push,
            0b0100_0110 => Opcode::Pop,
            0b0100_0111 => Opcode::Prn,
            0b0100_1000 => Opcode::Pra,
            0b0101_0000 => Opcode::Call,
            0b0101_0010 => Opcode::Int,
            0b0101_0100 => Opcode::Jmp,
            0b0101_0101 => Opcode::Jeq,
            0b0101_0110 => Opcode::Jne,
            0b0101_0111 => Opcode::Jgt,
            0b0101_1000 => Opcode::Jlt,
            0b0101_1001 => Opcode::Jle,
            0b0101_1010 => Opcode::Jge,
            0b0110_0101 => Opcode::Inc,
            0b0110_0110 => Opcode::Dec,
            0b0110_1001 => Opcode::Not,
            0b1000_0010 => Opcode::Ldi,
            0b1000_0011 => Opcode::Ld,
            0b1000_0100 => Opcode::St,
            0b1010_0000 => Opcode::Add,
            0b1010_0010 => Opcode::Mul,
            0b1010_0011 => Opcode::Sub,
            0b1010_0100 => Opcode::Mod,
            0b1010_0101 => Opcode::Addi,
            0b1010_0111 => Opcode::Cmp,
            0b1010_1000 => Opcode::And,
            0b1010_1010 => Opcode::Or,
            0b1010_1011 => Opcode::Xor,
            0b1010_1100 => Opcode::Shl,
            0b1010_1101 => Opcode::Shr,
            _ => return Err(VmError::UnsupportedOperation { opcode: value }),
        };
        Ok(opcode)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mnemonic = match self {
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Iret => "IRET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Pra => "PRA",
            Opcode::Call => "CALL",
            Opcode::Int => "INT",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Jgt => "JGT",
            Opcode::Jlt => "JLT",
            Opcode::Jle => "JLE",
            Opcode::Jge => "JGE",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Not => "NOT",
            Opcode::Ldi => "LDI",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Sub => "SUB",
            Opcode::Mod => "MOD",
            Opcode::Addi => "ADDI",
            Opcode::Cmp => "CMP",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
        };
        f.write_str(mnemonic)
    }
}

/// Represents a decoded LS-8 instruction with its operands resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Hlt,
    Ret,
    Iret,
    Push(Register),
    Pop(Register),
    Prn(Register),
    Pra(Register),
    Call(Register),
    Int(Register),
    Jmp(Register),
    Jump {
        condition: JumpCondition,
        target: Register,
    },
    Alu(AluOperation),
    Ldi {
        dest_reg: Register,
        imm: u8,
    },
    Ld {
        dest_reg: Register,
        addr_reg: Register,
    },
    St {
        addr_reg: Register,
        src_reg: Register,
    },
    Addi {
        dest_reg: Register,
        imm: u8,
    },
}

/// An operation handed to the ALU.
///
/// The opcode is carried through so the ALU makes the final call on whether it supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOperation {
    Binary {
        op: Opcode,
        reg_a: Register,
        reg_b: Register,
    },
    Unary {
        op: Opcode,
        reg: Register,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpCondition {
    Equal,
    NotEqual,
    Greater,
    Less,
    LessOrEqual,
    GreaterOrEqual,
}

impl JumpCondition {
    pub fn holds(self, flags: u8) -> bool {
        let equal = flags & u8::from(ConditionFlag::Equal) != 0;
        let greater = flags & u8::from(ConditionFlag::Greater) != 0;
        let less = flags & u8::from(ConditionFlag::Less) != 0;
        match self {
            JumpCondition::Equal => equal,
            JumpCondition::NotEqual => !equal,
            JumpCondition::Greater => greater,
            JumpCondition::Less => less,
            JumpCondition::LessOrEqual => less || equal,
            JumpCondition::GreaterOrEqual => greater || equal,
        }
    }

    pub fn opcode(self) -> Opcode {
        match self {
            JumpCondition::Equal => Opcode::Jeq,
            JumpCondition::NotEqual => Opcode::Jne,
            JumpCondition::Greater => Opcode::Jgt,
            JumpCondition::Less => Opcode::Jlt,
            JumpCondition::LessOrEqual => Opcode::Jle,
            JumpCondition::GreaterOrEqual => Opcode::Jge,
        }
    }
}

/// Condition flags written by CMP. Exactly one is set after a compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionFlag {
    Equal = 0b001,
    Greater = 0b010,
    Less = 0b100,
}

impl From<ConditionFlag> for u8 {
    fn from(flag: ConditionFlag) -> Self {
        flag as u8
    }
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Hlt => Opcode::Hlt,
            Instruction::Ret => Opcode::Ret,
            Instruction::Iret => Opcode::Iret,
            Instruction::Push(_) => Opcode::Push,
            Instruction::Pop(_) => Opcode::Pop,
            Instruction::Prn(_) => Opcode::Prn,
            Instruction::Pra(_) => Opcode::Pra,
            Instruction::Call(_) => Opcode::Call,
            Instruction::Int(_) => Opcode::Int,
            Instruction::Jmp(_) => Opcode::Jmp,
            Instruction::Jump { condition, .. } => condition.opcode(),
            Instruction::Alu(AluOperation::Binary { op, .. })
            | Instruction::Alu(AluOperation::Unary { op, .. }) => *op,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::St { .. } => Opcode::St,
            Instruction::Addi { .. } => Opcode::Addi,
        }
    }

    /// Encoded size in bytes, opcode included.
    pub fn size(&self) -> usize {
        1 + self.opcode().operand_count()
    }

    /// Builds an instruction from an opcode and the operand bytes that follow it.
    ///
    /// `operands` must hold at least `opcode.operand_count()` bytes.
    pub fn from_parts(opcode: Opcode, operands: &[u8]) -> Result<Instruction> {
        let reg = |i: usize| -> Result<Register> { Ok(Register::try_from(operands[i])?) };
        let instr = match opcode {
            Opcode::Hlt => Instruction::Hlt,
            Opcode::Ret => Instruction::Ret,
            Opcode::Iret => Instruction::Iret,
            Opcode::Push => Instruction::Push(reg(0)?),
            Opcode::Pop => Instruction::Pop(reg(0)?),
            Opcode::Prn => Instruction::Prn(reg(0)?),
            Opcode::Pra => Instruction::Pra(reg(0)?),
            Opcode::Call => Instruction::Call(reg(0)?),
            Opcode::Int => Instruction::Int(reg(0)?),
            Opcode::Jmp => Instruction::Jmp(reg(0)?),
            Opcode::Jeq => jump(JumpCondition::Equal, reg(0)?),
            Opcode::Jne => jump(JumpCondition::NotEqual, reg(0)?),
            Opcode::Jgt => jump(JumpCondition::Greater, reg(0)?),
            Opcode::Jlt => jump(JumpCondition::Less, reg(0)?),
            Opcode::Jle => jump(JumpCondition::LessOrEqual, reg(0)?),
            Opcode::Jge => jump(JumpCondition::GreaterOrEqual, reg(0)?),
            Opcode::Inc | Opcode::Dec | Opcode::Not => {
                Instruction::Alu(AluOperation::Unary {
                    op: opcode,
                    reg: reg(0)?,
                })
            }
            Opcode::Ldi => Instruction::Ldi {
                dest_reg: reg(0)?,
                imm: operands[1],
            },
            Opcode::Addi => Instruction::Addi {
                dest_reg: reg(0)?,
                imm: operands[1],
            },
            Opcode::Ld => Instruction::Ld {
                dest_reg: reg(0)?,
                addr_reg: reg(1)?,
            },
            Opcode::St => Instruction::St {
                addr_reg: reg(0)?,
                src_reg: reg(1)?,
            },
            Opcode::Add
            | Opcode::Mul
            | Opcode::Sub
            | Opcode::Mod
            | Opcode::Cmp
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr => Instruction::Alu(AluOperation::Binary {
                op: opcode,
                reg_a: reg(0)?,
                reg_b: reg(1)?,
            }),
        };
        Ok(instr)
    }
}

fn jump(condition: JumpCondition, target: Register) -> Instruction {
    Instruction::Jump { condition, target }
}

pub trait InstructionDecoder {
    /// Decodes the instruction whose opcode sits at `addr`.
    fn decode_at(&self, addr: usize) -> Result<Instruction>;
}

impl InstructionDecoder for Memory {
    fn decode_at(&self, addr: usize) -> Result<Instruction> {
        let opcode = Opcode::try_from(self.read(addr)?)?;
        let mut operands = [0u8; 2];
        for (i, operand) in operands
            .iter_mut()
            .take(opcode.operand_count())
            .enumerate()
        {
            *operand = self.read(addr + 1 + i)?;
        }
        Instruction::from_parts(opcode, &operands)
    }
}
