use std::io::Write;

use log::{debug, info, log_enabled, trace, Level};

use crate::config::VmConfig;
use crate::cpu::{Cpu, ExecutionStatus};
use crate::error::Result;
use crate::interrupts::{Clock, InterruptController, KeySource, NoKeyboard, SystemClock};
use crate::program::Program;

/// Lifecycle of a VM instance. `Halted` and `Faulted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Running,
    Halted,
    Faulted,
}

/// Represents the virtual machine responsible for executing LS-8 programs.
///
/// - `cpu`: registers, memory and the output sink.
/// - `interrupts`: the timer and keyboard sources plus delivery.
/// - `state`: where the execution loop is in its lifecycle.
pub struct Vm<W: Write> {
    cpu: Cpu<W>,
    interrupts: InterruptController,
    state: MachineState,
}

impl<W: Write> Vm<W> {
    /// A VM on wall-clock time with no keyboard attached.
    pub fn new(config: &VmConfig, output: W) -> Self {
        Self::with_devices(
            config,
            output,
            Box::new(SystemClock::new()),
            Box::new(NoKeyboard),
        )
    }

    pub fn with_devices(
        config: &VmConfig,
        output: W,
        clock: Box<dyn Clock>,
        keyboard: Box<dyn KeySource>,
    ) -> Self {
        Vm {
            cpu: Cpu::new(output),
            interrupts: InterruptController::new(config.timer_period, clock, keyboard),
            state: MachineState::Idle,
        }
    }

    pub fn load(&mut self, program: &Program) -> Result<()> {
        self.cpu.load(&program.data)
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn cpu(&self) -> &Cpu<W> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu<W> {
        &mut self.cpu
    }

    pub fn into_output(self) -> W {
        self.cpu.into_output()
    }

    /// Runs one cycle: deliver a pending interrupt if any, then fetch and execute.
    ///
    /// Starts the machine if it is idle. Once halted or faulted this is a no-op.
    pub fn step(&mut self) -> Result<MachineState> {
        match self.state {
            MachineState::Halted | MachineState::Faulted => return Ok(self.state),
            MachineState::Idle => {
                info!("starting execution at 0x{:02X}", self.cpu.pc);
                self.state = MachineState::Running;
            }
            MachineState::Running => {}
        }

        match self.cycle() {
            Ok(ExecutionStatus::Running) => {}
            Ok(ExecutionStatus::Halted) => {
                info!("halted after {} instructions", self.cpu.instr_count);
                self.state = MachineState::Halted;
            }
            Err(err) => {
                debug!("fault at 0x{:02X}: {}", self.cpu.pc, err);
                self.state = MachineState::Faulted;
                return Err(err);
            }
        }
        Ok(self.state)
    }

    /// Runs until HLT or a fatal error.
    pub fn run(&mut self) -> Result<()> {
        while self.step()? == MachineState::Running {}
        Ok(())
    }

    /// Loads `program` and runs it to completion.
    pub fn start(&mut self, program: &Program) -> Result<()> {
        self.load(program)?;
        self.run()
    }

    fn cycle(&mut self) -> Result<ExecutionStatus> {
        self.interrupts.service(&mut self.cpu)?;
        if log_enabled!(Level::Trace) {
            trace!("{}", self.cpu.trace_line());
        }
        self.cpu.step()
    }
}
