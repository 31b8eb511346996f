//! Small hand assembled programs showing the CPU at work.

use crate::cpu::control::{CPUFlags, EmulatorContext};
use crate::error::Result;
use crate::instruction::Instruction;
use crate::memory::Memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demo {
    Addition,
    MultiAddition,
    FunctionCall,
}

impl ::std::str::FromStr for Demo {
    type Err = String;

    fn from_str(name: &str) -> ::std::result::Result<Demo, String> {
        match name {
            "add" => Ok(Demo::Addition),
            "multi" => Ok(Demo::MultiAddition),
            "call" => Ok(Demo::FunctionCall),
            _ => Err(format!("unknown demo {:?}, expected add, multi or call", name)),
        }
    }
}

impl Demo {
    pub fn run(self) -> Result<u8> {
        match self {
            Demo::Addition => addition_demo(),
            Demo::MultiAddition => multi_addition_demo(),
            Demo::FunctionCall => function_call_demo(),
        }
    }
}

fn run_from_zero(memory: Memory, registers: &[(u8, u8)]) -> Result<u8> {
    let flags = CPUFlags {
        entry_point: 0x000,
        ..CPUFlags::default()
    };
    let mut context = EmulatorContext::new(memory, flags)?;
    for &(id, value) in registers {
        context.registers_mut().write_register(id, value);
    }
    context.run_cpu()?;
    Ok(context.registers().read_register(0))
}

/// opcode 0x8014:
/// - 8 means the operation involves two registers
/// - 0 is the first register
/// - 1 is the second register
/// - 4 means addition
pub fn addition_demo() -> Result<u8> {
    let mut memory = Memory::new();
    memory.write_halfword(0x000, 0x8014)?;
    let result = run_from_zero(memory, &[(0, 5), (1, 10)])?;
    info!("5 + 10 = {}", result);
    Ok(result)
}

pub fn multi_addition_demo() -> Result<u8> {
    let mut memory = Memory::new();
    for (n, y) in (1..=3u8).enumerate() {
        memory.write_halfword(2 * n as u16, Instruction::Add { x: 0, y }.encode())?;
    }
    let result = run_from_zero(memory, &[(0, 5), (1, 10), (2, 10), (3, 10)])?;
    info!("5 + 10 + 10 + 10 = {}", result);
    Ok(result)
}

/// Calls a function adding v1 to v0 twice, and calls it twice.
pub fn function_call_demo() -> Result<u8> {
    let mut memory = Memory::new();
    let call = Instruction::Call(0x100).encode();
    let add = Instruction::Add { x: 0, y: 1 }.encode();
    memory.write_halfword(0x000, call)?;
    memory.write_halfword(0x002, call)?;
    memory.write_halfword(0x004, Instruction::Halt.encode())?;

    memory.write_halfword(0x100, add)?;
    memory.write_halfword(0x102, add)?;
    memory.write_halfword(0x104, Instruction::Return.encode())?;
    let result = run_from_zero(memory, &[(0, 5), (1, 10)])?;
    info!("5 + (10 * 2) + (10 * 2) = {}", result);
    Ok(result)
}

#[test]
fn test_addition_demo() {
    assert_eq!(addition_demo().unwrap(), 15);
}

#[test]
fn test_multi_addition_demo() {
    assert_eq!(multi_addition_demo().unwrap(), 35);
}

#[test]
fn test_function_call_demo() {
    assert_eq!(function_call_demo().unwrap(), 45);
}

#[test]
fn test_demo_names() {
    assert_eq!("call".parse::<Demo>(), Ok(Demo::FunctionCall));
    assert!("sub".parse::<Demo>().is_err());
    assert_eq!(Demo::Addition.run().unwrap(), 15);
}
