use crate::error::{OutOfRange, Result};

/// The LS-8 addresses 256 bytes of memory.
pub const MEMORY_SIZE: usize = 256;
/// Initial stack pointer. The stack grows down from here.
pub const STACK_START: u8 = 0xF4;
/// The keyboard interrupt leaves the pressed key here.
pub const KEY_ADDR: u8 = 0xF4;
/// First slot of the interrupt vector table. Interrupt `n` vectors through `VECTOR_TABLE + n`.
pub const VECTOR_TABLE: u8 = 0xF8;

/// Flat main memory shared by code, data and the stack.
pub struct Memory {
    pub mem: [u8; MEMORY_SIZE],
}

/// Byte-level access to LS-8 memory.
///
/// Addresses are `usize` so that computed addresses that fall off the end
/// are reported instead of wrapping.
pub trait Ls8Memory {
    fn read(&self, addr: usize) -> Result<u8>;
    fn write(&mut self, addr: usize, val: u8) -> Result<()>;
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            mem: [0; MEMORY_SIZE],
        }
    }

    /// Copies `image` into memory starting at address 0.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > MEMORY_SIZE {
            return Err(OutOfRange::Address(image.len() - 1).into());
        }
        self.mem[..image.len()].copy_from_slice(image);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Ls8Memory for Memory {
    fn read(&self, addr: usize) -> Result<u8> {
        self.mem
            .get(addr)
            .copied()
            .ok_or_else(|| OutOfRange::Address(addr).into())
    }

    fn write(&mut self, addr: usize, val: u8) -> Result<()> {
        let cell = self.mem.get_mut(addr).ok_or(OutOfRange::Address(addr))?;
        *cell = val;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;

    #[test]
    fn read_write_in_range() {
        let mut memory = Memory::new();
        memory.write(0xFF, 0x42).unwrap();
        assert_eq!(memory.read(0xFF).unwrap(), 0x42);
        assert_eq!(memory.read(0x00).unwrap(), 0);
    }

    #[test]
    fn access_past_end_is_out_of_range() {
        let mut memory = Memory::new();
        assert!(matches!(
            memory.read(MEMORY_SIZE),
            Err(VmError::OutOfRange(OutOfRange::Address(256)))
        ));
        assert!(matches!(
            memory.write(300, 1),
            Err(VmError::OutOfRange(OutOfRange::Address(300)))
        ));
    }

    #[test]
    fn load_places_image_at_zero() {
        let mut memory = Memory::new();
        memory.load(&[0x82, 0x00, 0x08]).unwrap();
        assert_eq!(&memory.mem[..4], &[0x82, 0x00, 0x08, 0x00]);
    }

    #[test]
    fn load_rejects_oversized_image() {
        let mut memory = Memory::new();
        let image = vec![0u8; MEMORY_SIZE + 1];
        assert!(memory.load(&image).is_err());
    }
}
