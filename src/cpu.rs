use std::io::Write;

use crate::alu;
use crate::error::{OutOfRange, Result};
use crate::instructions::{Instruction, InstructionDecoder};
use crate::memory::{Ls8Memory, Memory};
use crate::registers::Registers;

/// The main CPU structure for the LS-8 virtual machine.
///
/// The CPU owns its registers and memory outright and writes PRN/PRA output
/// to `W`. It provides methods to fetch, decode and execute instructions;
/// the interrupt sequence lives alongside the controller in `interrupts`.
///
/// The LS-8 has:
/// - 8 general purpose registers (R0-R7, with R5-R7 reserved by convention)
/// - a program counter (PC)
/// - a flags register (FL)
pub struct Cpu<W: Write> {
    pub registers: Registers,
    pub memory: Memory,
    pub pc: u8,
    pub fl: u8,
    /// Cleared on interrupt entry, set again by IRET.
    pub interrupts_enabled: bool,
    pub instr_count: u64,
    output: W,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Halted,
}

impl<W: Write> Cpu<W> {
    pub fn new(output: W) -> Self {
        Cpu {
            registers: Registers::new(),
            memory: Memory::new(),
            pc: 0,
            fl: 0,
            interrupts_enabled: true,
            instr_count: 0,
            output,
        }
    }

    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        self.memory.load(image)
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn fetch(&self) -> Result<Instruction> {
        self.memory.decode_at(self.pc as usize)
    }

    pub fn step(&mut self) -> Result<ExecutionStatus> {
        let instr = self.fetch()?;
        self.execute(instr)
    }

    pub fn execute(&mut self, instr: Instruction) -> Result<ExecutionStatus> {
        self.instr_count += 1;
        match instr {
            Instruction::Hlt => return Ok(ExecutionStatus::Halted),
            Instruction::Ldi { dest_reg, imm } => {
                self.registers[dest_reg] = imm;
            }
            Instruction::Ld { dest_reg, addr_reg } => {
                let addr = self.registers[addr_reg] as usize;
                self.registers[dest_reg] = self.memory.read(addr)?;
            }
            Instruction::St { addr_reg, src_reg } => {
                let addr = self.registers[addr_reg] as usize;
                self.memory.write(addr, self.registers[src_reg])?;
            }
            Instruction::Prn(reg) => {
                writeln!(self.output, "{}", self.registers[reg])?;
                self.output.flush()?;
            }
            Instruction::Pra(reg) => {
                writeln!(self.output, "{}", char::from(self.registers[reg]))?;
                self.output.flush()?;
            }
            Instruction::Push(reg) => {
                // SP moves first, so PUSH R7 stores the decremented SP.
                let sp = self.decrement_sp()?;
                self.memory.write(sp as usize, self.registers[reg])?;
            }
            Instruction::Pop(reg) => {
                // The increment lands after the write, so POP R7 yields value + 1.
                self.registers[reg] = self.memory.read(self.registers.sp as usize)?;
                self.increment_sp()?;
            }
            Instruction::Call(reg) => {
                let target = self.registers[reg];
                let return_addr = self.next_pc(instr.size())?;
                self.push(return_addr)?;
                self.pc = target;
                return Ok(ExecutionStatus::Running);
            }
            Instruction::Ret => {
                self.pc = self.pop()?;
                return Ok(ExecutionStatus::Running);
            }
            Instruction::Iret => {
                self.return_from_interrupt()?;
                return Ok(ExecutionStatus::Running);
            }
            Instruction::Jmp(reg) => {
                self.pc = self.registers[reg];
                return Ok(ExecutionStatus::Running);
            }
            Instruction::Jump { condition, target } => {
                self.pc = if condition.holds(self.fl) {
                    self.registers[target]
                } else {
                    self.next_pc(instr.size())?
                };
                return Ok(ExecutionStatus::Running);
            }
            Instruction::Alu(operation) => {
                alu::execute(operation, &mut self.registers, &mut self.fl)?;
            }
            Instruction::Addi { dest_reg, imm } => {
                self.registers[dest_reg] = self.registers[dest_reg].wrapping_add(imm);
            }
            Instruction::Int(reg) => {
                self.raise_interrupt(self.registers[reg] & 0x07);
            }
        }
        self.pc = self.next_pc(instr.size())?;
        Ok(ExecutionStatus::Running)
    }

    /// Decrements SP, then stores `value` at the new top of the stack.
    pub fn push(&mut self, value: u8) -> Result<()> {
        let sp = self.decrement_sp()?;
        self.memory.write(sp as usize, value)
    }

    /// Reads the top of the stack, then increments SP.
    pub fn pop(&mut self) -> Result<u8> {
        let value = self.memory.read(self.registers.sp as usize)?;
        self.increment_sp()?;
        Ok(value)
    }

    fn decrement_sp(&mut self) -> Result<u8> {
        let sp = self
            .registers
            .sp
            .checked_sub(1)
            .ok_or(OutOfRange::StackOverflow)?;
        self.registers.sp = sp;
        Ok(sp)
    }

    fn increment_sp(&mut self) -> Result<()> {
        self.registers.sp = self
            .registers
            .sp
            .checked_add(1)
            .ok_or(OutOfRange::StackUnderflow)?;
        Ok(())
    }

    /// Marks interrupt `bit` as pending in IS.
    pub fn raise_interrupt(&mut self, bit: u8) {
        self.registers.is |= 1 << bit;
    }

    /// One-line dump of PC, FL, the three bytes at PC and every register.
    pub fn trace_line(&self) -> String {
        let pc = self.pc as usize;
        let byte = |addr: usize| self.memory.mem.get(addr).copied().unwrap_or(0);
        let mut line = format!(
            "TRACE: {:02X} | {:02X} | {:02X} {:02X} {:02X} |",
            self.pc,
            self.fl,
            byte(pc),
            byte(pc + 1),
            byte(pc + 2)
        );
        for value in self.registers.values() {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    fn next_pc(&self, size: usize) -> Result<u8> {
        let next = self.pc as usize + size;
        Ok(u8::try_from(next).map_err(|_| OutOfRange::ProgramCounter(next))?)
    }
}
