use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ls8_vm::disassembler::disassemble_program;
use ls8_vm::interrupts::{KeySource, NoKeyboard, SystemClock};
use ls8_vm::terminal::{spawn_control_c_handler, RawTerminal, TerminalKeyboard};
use ls8_vm::{Program, Vm, VmConfig};

/// LS-8 emulator
#[derive(Parser, Debug)]
#[command(name = "ls8", version, about = "Runs LS-8 programs")]
struct Args {
    /// Program image: one binary byte per line, `#` comments allowed
    program: PathBuf,

    /// Timer interrupt period in milliseconds (0 disables the timer)
    #[arg(long, default_value_t = 1000)]
    timer_ms: u64,

    /// Do not poll stdin for keyboard interrupts
    #[arg(long)]
    no_keyboard: bool,

    /// Print a listing of the program instead of running it
    #[arg(short, long)]
    disassemble: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log a trace line before every instruction
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.trace {
        "trace"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let program = Program::from_file(&args.program)
        .with_context(|| format!("failed to load {}", args.program.display()))?;
    info!(
        "loaded {} bytes from {}",
        program.data.len(),
        args.program.display()
    );

    if args.disassemble {
        print!("{}", disassemble_program(&program));
        return Ok(());
    }

    let config = VmConfig::default()
        .with_timer_period(Duration::from_millis(args.timer_ms))
        .with_keyboard(!args.no_keyboard);

    let raw_terminal = if config.keyboard {
        spawn_control_c_handler().context("failed to install Ctrl-C handler")?;
        RawTerminal::enable().context("failed to configure terminal")?
    } else {
        None
    };
    let keyboard: Box<dyn KeySource> = if config.keyboard {
        Box::new(TerminalKeyboard::new())
    } else {
        Box::new(NoKeyboard)
    };

    let mut vm = Vm::with_devices(
        &config,
        io::stdout(),
        Box::new(SystemClock::new()),
        keyboard,
    );
    let result = vm.start(&program);
    drop(raw_terminal);

    result.with_context(|| {
        format!(
            "{} stopped at 0x{:02X}",
            args.program.display(),
            vm.cpu().pc
        )
    })
}
