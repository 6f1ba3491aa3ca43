use std::cell::Cell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::debug;

use crate::cpu::Cpu;
use crate::error::Result;
use crate::memory::{Ls8Memory, KEY_ADDR, VECTOR_TABLE};
use crate::registers::Register;

/// Hardware interrupt lines and their bit in IM/IS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// - Timer: fires once per configured period
    Timer = 0,
    /// - Keyboard: fires when a key is available
    Keyboard = 1,
}

impl Interrupt {
    pub fn bit(self) -> u8 {
        self as u8
    }
}

/// Source of elapsed time for the timer interrupt.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Simulated time that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Non-blocking source of key presses.
pub trait KeySource {
    /// Returns the next key if one is ready. Must never block.
    fn poll_key(&mut self) -> Option<u8>;
}

/// A keyboard that never has anything to say.
#[derive(Debug, Default)]
pub struct NoKeyboard;

impl KeySource for NoKeyboard {
    fn poll_key(&mut self) -> Option<u8> {
        None
    }
}

/// Hands out a fixed sequence of keys, one per poll.
#[derive(Debug, Default)]
pub struct ScriptedKeyboard {
    keys: VecDeque<u8>,
}

impl ScriptedKeyboard {
    pub fn new(keys: impl IntoIterator<Item = u8>) -> Self {
        ScriptedKeyboard {
            keys: keys.into_iter().collect(),
        }
    }
}

impl KeySource for ScriptedKeyboard {
    fn poll_key(&mut self) -> Option<u8> {
        self.keys.pop_front()
    }
}

/// Turns timer and keyboard events into IS bits and delivers pending interrupts.
///
/// Sources never call handlers directly: they only set bits in IS. Delivery
/// happens between instructions, one interrupt per cycle, lowest bit first.
pub struct InterruptController {
    timer_period: Duration,
    last_tick: Duration,
    clock: Box<dyn Clock>,
    keyboard: Box<dyn KeySource>,
}

impl InterruptController {
    pub fn new(timer_period: Duration, clock: Box<dyn Clock>, keyboard: Box<dyn KeySource>) -> Self {
        let last_tick = clock.now();
        InterruptController {
            timer_period,
            last_tick,
            clock,
            keyboard,
        }
    }

    /// Samples the timer and keyboard, raising IS bits for anything that happened.
    ///
    /// The timer advances by exactly one period per firing and holds off
    /// while its previous tick is still pending, so ticks that arrive during
    /// a handler are delivered one after another instead of merging.
    pub fn poll_sources<W: Write>(&mut self, cpu: &mut Cpu<W>) -> Result<()> {
        let timer_bit: u8 = 1 << Interrupt::Timer.bit();
        if !self.timer_period.is_zero() && cpu.registers.is & timer_bit == 0 {
            let now = self.clock.now();
            if now.saturating_sub(self.last_tick) >= self.timer_period {
                self.last_tick += self.timer_period;
                cpu.raise_interrupt(Interrupt::Timer.bit());
            }
        }

        if let Some(key) = self.keyboard.poll_key() {
            cpu.memory.write(KEY_ADDR as usize, key)?;
            cpu.raise_interrupt(Interrupt::Keyboard.bit());
        }
        Ok(())
    }

    /// Polls the sources and delivers at most one pending interrupt.
    /// Returns the bit that was delivered.
    pub fn service<W: Write>(&mut self, cpu: &mut Cpu<W>) -> Result<Option<u8>> {
        self.poll_sources(cpu)?;
        let Some(bit) = pending_interrupt(cpu) else {
            return Ok(None);
        };
        let return_pc = cpu.pc;
        cpu.enter_interrupt(bit)?;
        debug!(
            "interrupt {} delivered: pc 0x{:02X} -> handler 0x{:02X}",
            bit, return_pc, cpu.pc
        );
        Ok(Some(bit))
    }
}

/// The interrupt that would be delivered now, if any.
///
/// Priority is the lowest set bit of `IM & IS`: the timer beats the keyboard.
pub fn pending_interrupt<W: Write>(cpu: &Cpu<W>) -> Option<u8> {
    if !cpu.interrupts_enabled {
        return None;
    }
    let masked = cpu.registers.im & cpu.registers.is;
    if masked == 0 {
        None
    } else {
        Some(masked.trailing_zeros() as u8)
    }
}

impl<W: Write> Cpu<W> {
    /// Saves machine state and jumps through the vector table.
    ///
    /// Stack after entry, top first: R5, R4, R3, R2, R1, R0, FL, PC.
    pub fn enter_interrupt(&mut self, bit: u8) -> Result<()> {
        self.registers.is &= !(1 << bit);
        self.interrupts_enabled = false;

        self.push(self.pc)?;
        self.push(self.fl)?;
        for reg in Register::SAVED_ON_INTERRUPT {
            self.push(self.registers[reg])?;
        }
        self.pc = self.memory.read(VECTOR_TABLE as usize + bit as usize)?;
        Ok(())
    }

    /// Undoes `enter_interrupt` and re-enables interrupts.
    pub fn return_from_interrupt(&mut self) -> Result<()> {
        for reg in Register::SAVED_ON_INTERRUPT.into_iter().rev() {
            self.registers[reg] = self.pop()?;
        }
        self.fl = self.pop()?;
        self.pc = self.pop()?;
        self.interrupts_enabled = true;
        Ok(())
    }
}
