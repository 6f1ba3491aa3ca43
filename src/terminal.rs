use std::io::{self, IsTerminal};
use std::os::fd::{BorrowedFd, RawFd};
use std::{process, thread};

use libc::STDIN_FILENO;
use log::{debug, warn};
use nix::sys::select::{select, FdSet};
use nix::sys::time::{TimeVal, TimeValLike};
use nix::unistd;
use signal_hook::consts::SIGINT;
use signal_hook::iterator::Signals;
use termios::{tcsetattr, Termios, ECHO, ICANON, TCSANOW};

use crate::interrupts::KeySource;

/// Handles the Ctrl-C (SIGINT) interrupt signal by restoring terminal settings,
/// printing a message, and exiting the process with code 130.
pub fn handle_control_c(sig: i32) {
    if let Err(err) = restore_terminal_settings() {
        warn!("failed to restore terminal: {}", err);
    }
    println!("The LS-8 VM received Ctrl-C interrupt signal (= {}).", sig);
    process::exit(130);
}

/// Spawns a background thread that calls `handle_control_c` on SIGINT.
pub fn spawn_control_c_handler() -> io::Result<()> {
    let mut signals = Signals::new([SIGINT])?;
    thread::spawn(move || {
        for sig in signals.forever() {
            handle_control_c(sig);
        }
    });
    Ok(())
}

/// Disables input buffering and echo so single key presses reach the VM immediately.
pub fn disable_input_buffering() -> io::Result<()> {
    let mut term = Termios::from_fd(STDIN_FILENO)?;
    term.c_lflag &= !(ICANON | ECHO);
    tcsetattr(STDIN_FILENO, TCSANOW, &term)
}

/// Restores canonical mode and echo.
pub fn restore_terminal_settings() -> io::Result<()> {
    let mut term = Termios::from_fd(STDIN_FILENO)?;
    term.c_lflag |= ICANON | ECHO;
    tcsetattr(STDIN_FILENO, TCSANOW, &term)
}

/// Keeps stdin in raw mode for as long as it lives.
pub struct RawTerminal {
    _private: (),
}

impl RawTerminal {
    /// Switches stdin to raw mode. Returns `None` when stdin is not a terminal.
    pub fn enable() -> io::Result<Option<Self>> {
        if !io::stdin().is_terminal() {
            return Ok(None);
        }
        disable_input_buffering()?;
        Ok(Some(RawTerminal { _private: () }))
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(err) = restore_terminal_settings() {
            warn!("failed to restore terminal: {}", err);
        }
    }
}

/// Checks whether a byte is waiting on `fd` without blocking.
pub fn check_key(fd: RawFd) -> bool {
    let mut readfds = FdSet::new();
    // SAFETY: callers only pass descriptors that stay open while polled.
    let fd = unsafe { BorrowedFd::borrow_raw(fd) };
    readfds.insert(fd);

    match select(None, &mut readfds, None, None, &mut TimeVal::zero()) {
        Ok(value) => value == 1,
        Err(err) => {
            debug!("select on fd failed: {}", err);
            false
        }
    }
}

/// Reads exactly one byte from `fd`.
///
/// Goes to the descriptor directly: `io::stdin()` buffers ahead, which would
/// hide queued keys from `check_key`.
pub fn get_char(fd: RawFd) -> io::Result<u8> {
    let mut buffer = [0; 1];
    match unistd::read(fd, &mut buffer)? {
        0 => Err(io::ErrorKind::UnexpectedEof.into()),
        _ => Ok(buffer[0]),
    }
}

/// Keyboard backed by the process's stdin.
///
/// Only reads when `select` says a byte is ready, so polling never stalls
/// the execution loop. Each poll consumes exactly one byte. Stops polling
/// after end of input.
#[derive(Debug)]
pub struct TerminalKeyboard {
    fd: RawFd,
    closed: bool,
}

impl TerminalKeyboard {
    pub fn new() -> Self {
        Self::from_fd(STDIN_FILENO)
    }

    /// Polls `fd` instead of stdin. The descriptor must outlive the keyboard.
    pub fn from_fd(fd: RawFd) -> Self {
        TerminalKeyboard { fd, closed: false }
    }
}

impl Default for TerminalKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for TerminalKeyboard {
    fn poll_key(&mut self) -> Option<u8> {
        if self.closed || !check_key(self.fd) {
            return None;
        }
        match get_char(self.fd) {
            Ok(key) => Some(key),
            Err(err) => {
                debug!("keyboard closed: {}", err);
                self.closed = true;
                None
            }
        }
    }
}
