use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

/// Fatal conditions raised while executing a program.
///
/// Every variant stops the machine; there is no recovery path.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("unsupported operation 0b{opcode:08b}")]
    UnsupportedOperation { opcode: u8 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("out of range: {0}")]
    OutOfRange(#[from] OutOfRange),
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

/// The kinds of bounds violation the machine detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutOfRange {
    #[error("register index {0}")]
    Register(u8),
    #[error("memory address 0x{0:X}")]
    Address(usize),
    #[error("program counter 0x{0:X}")]
    ProgramCounter(usize),
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
}

/// Errors raised while reading a program image.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("failed to read program: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: invalid binary literal {text:?}")]
    InvalidLiteral { line: usize, text: String },
    #[error("program is {size} bytes, memory holds {capacity}")]
    TooLarge { size: usize, capacity: usize },
}
