use std::path::PathBuf;
use std::time::Duration;

use ls8_vm::interrupts::NoKeyboard;
use ls8_vm::{
    MachineState, ManualClock, Program, ScriptedKeyboard, Vm, VmConfig, VmError,
};

// timer.ls8 counts in memory: IRET restores R0..R5, so a register count would not survive.
const COUNTER_ADDR: usize = 0xE0;

fn program(name: &str) -> Program {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "programs", name]
        .iter()
        .collect();
    Program::from_file(&path).unwrap()
}

fn run_to_completion(name: &str) -> (Vm<Vec<u8>>, Result<(), VmError>) {
    let config = VmConfig::default().with_keyboard(false);
    let mut vm = Vm::new(&config, Vec::new());
    let result = vm.start(&program(name));
    (vm, result)
}

fn output(vm: Vm<Vec<u8>>) -> String {
    String::from_utf8(vm.into_output()).unwrap()
}

#[test]
fn print8_prints_8() {
    let (vm, result) = run_to_completion("print8.ls8");
    result.unwrap();
    assert_eq!(vm.state(), MachineState::Halted);
    assert_eq!(output(vm), "8\n");
}

#[test]
fn subroutine_multiplies() {
    let (vm, result) = run_to_completion("call.ls8");
    result.unwrap();
    assert_eq!(vm.cpu().registers.sp, 0xF4);
    assert_eq!(output(vm), "35\n");
}

#[test]
fn unknown_opcode_stops_the_machine() {
    let (vm, result) = run_to_completion("badop.ls8");
    assert!(matches!(
        result,
        Err(VmError::UnsupportedOperation { opcode: 0xFF })
    ));
    assert_eq!(vm.state(), MachineState::Faulted);
    assert_eq!(output(vm), "1\n");
}

fn timer_vm(clock: &ManualClock) -> Vm<Vec<u8>> {
    let config = VmConfig::default().with_timer_period(Duration::from_secs(1));
    let mut vm = Vm::with_devices(
        &config,
        Vec::new(),
        Box::new(clock.clone()),
        Box::new(NoKeyboard),
    );
    vm.load(&program("timer.ls8")).unwrap();
    vm
}

fn step_n(vm: &mut Vm<Vec<u8>>, n: usize) {
    for _ in 0..n {
        assert_eq!(vm.step().unwrap(), MachineState::Running);
    }
}

#[test]
fn timer_counts_simulated_seconds() {
    let clock = ManualClock::new();
    let mut vm = timer_vm(&clock);

    // Let the setup code run before any time passes.
    step_n(&mut vm, 10);
    assert_eq!(vm.cpu().memory.mem[COUNTER_ADDR], 0);

    for second in 1..=10u8 {
        clock.advance(Duration::from_secs(1));
        step_n(&mut vm, 20);
        assert_eq!(vm.cpu().memory.mem[COUNTER_ADDR], second);
    }
    assert_eq!(vm.cpu().registers.sp, 0xF4);
    assert!(vm.cpu().interrupts_enabled);
}

#[test]
fn timer_catches_up_after_a_stall() {
    let clock = ManualClock::new();
    let mut vm = timer_vm(&clock);
    step_n(&mut vm, 10);

    clock.advance(Duration::from_millis(4500));
    step_n(&mut vm, 100);
    assert_eq!(vm.cpu().memory.mem[COUNTER_ADDR], 4);

    clock.advance(Duration::from_millis(500));
    step_n(&mut vm, 20);
    assert_eq!(vm.cpu().memory.mem[COUNTER_ADDR], 5);
}

#[test]
fn masked_timer_never_runs_the_handler() {
    let clock = ManualClock::new();
    let mut vm = timer_vm(&clock);
    step_n(&mut vm, 4);
    // Skip the instruction that unmasks the timer.
    vm.cpu_mut().pc = 15;

    clock.advance(Duration::from_secs(3));
    step_n(&mut vm, 50);
    assert_eq!(vm.cpu().memory.mem[COUNTER_ADDR], 0);
    assert_eq!(vm.cpu().registers.is & 1, 1);
}

#[test]
fn keyboard_interrupt_echoes_key() {
    let config = VmConfig::default().with_timer_period(Duration::ZERO);
    let mut vm = Vm::with_devices(
        &config,
        Vec::new(),
        Box::new(ManualClock::new()),
        Box::new(ScriptedKeyboard::new(*b"k")),
    );
    vm.load(&program("keyboard.ls8")).unwrap();
    step_n(&mut vm, 30);

    assert_eq!(vm.cpu().memory.mem[0xF4], b'k');
    assert_eq!(vm.cpu().registers.is, 0);
    assert_eq!(output(vm), "k\n");
}
