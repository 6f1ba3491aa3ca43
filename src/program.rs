use std::fs;
use std::path::Path;

use crate::error::ProgramError;
use crate::memory::MEMORY_SIZE;

/// A program image ready to be copied into memory at address 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub data: Vec<u8>,
}

impl Program {
    /// Parses the LS-8 text format: one binary literal per line.
    ///
    /// Anything after `#` is a comment. Lines that are empty once the
    /// comment and surrounding whitespace are gone do not take up an address.
    ///
    /// ```
    /// use ls8_vm::program::Program;
    ///
    /// let source = "10000010 # LDI R0,8\n00000000\n00001000\n\n# done\n00000001\n";
    /// let program = Program::parse(source).unwrap();
    ///
    /// assert_eq!(program.data, vec![0b1000_0010, 0, 8, 1]);
    /// ```
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let mut data = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let text = line.split('#').next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            data.push(parse_literal(text).ok_or_else(|| ProgramError::InvalidLiteral {
                line: index + 1,
                text: text.to_string(),
            })?);
        }
        Self::from_bytes(data)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProgramError> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ProgramError> {
        if data.len() > MEMORY_SIZE {
            return Err(ProgramError::TooLarge {
                size: data.len(),
                capacity: MEMORY_SIZE,
            });
        }
        Ok(Program { data })
    }
}

fn parse_literal(text: &str) -> Option<u8> {
    if text.len() > 8 || !text.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u8::from_str_radix(text, 2).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_and_comment_lines() {
        let source = "\
# print8.ls8
10000010 # LDI R0,8
00000000

00001000
01000111 # PRN R0
00000000
00000001 # HLT
";
        let program = Program::parse(source).unwrap();
        assert_eq!(program.data, vec![0x82, 0x00, 0x08, 0x47, 0x00, 0x01]);
    }

    #[test]
    fn tolerates_crlf_and_indentation() {
        let program = Program::parse("  00000001  \r\n\t10100000#ADD\r\n").unwrap();
        assert_eq!(program.data, vec![0x01, 0xA0]);
    }

    #[test]
    fn rejects_bad_literals_with_line_number() {
        let err = Program::parse("00000001\n0000000x\n").unwrap_err();
        match err {
            ProgramError::InvalidLiteral { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "0000000x");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(Program::parse("100000000\n").is_err());
        assert!(Program::parse("+1\n").is_err());
    }

    #[test]
    fn rejects_images_larger_than_memory() {
        let source = "00000000\n".repeat(MEMORY_SIZE + 1);
        assert!(matches!(
            Program::parse(&source),
            Err(ProgramError::TooLarge { size: 257, .. })
        ));
    }
}
