//! An emulator for the LS-8, an 8-bit register machine with 256 bytes of
//! memory, a downward-growing stack and timer/keyboard interrupts.

pub mod alu;
pub mod config;
pub mod cpu;
pub mod disassembler;
pub mod error;
pub mod instructions;
pub mod interrupts;
pub mod memory;
pub mod program;
pub mod registers;
pub mod terminal;
pub mod vm;

pub use config::VmConfig;
pub use cpu::{Cpu, ExecutionStatus};
pub use error::{OutOfRange, ProgramError, Result, VmError};
pub use interrupts::{Clock, KeySource, ManualClock, ScriptedKeyboard};
pub use program::Program;
pub use vm::{MachineState, Vm};
