//! Semantics of every supported operation.

use crate::cpu::event::CPUEvent;
use crate::cpu::registers::{RegisterFile, FLAG};
use crate::error::Result;
use crate::instruction::Instruction;
use crate::memory::Memory;

pub fn eval_instruction(
    instruction: Instruction,
    registers: &mut RegisterFile,
    memory: &mut Memory,
) -> Result<CPUEvent> {
    trace!("0x{:03x}:\t{}", registers.get_pc(), instruction);

    let pc = registers.get_pc();
    let next = pc.wrapping_add(2);

    // the flag is written last, so it wins when x is VF
    macro_rules! with_flag {
        ($x:expr, $result:expr, $flag:expr) => {{
            registers.write_register($x, $result);
            registers.write_register(FLAG, $flag as u8);
        }};
    }

    let event = match instruction {
        Instruction::Halt => CPUEvent::Halt,
        Instruction::Return => CPUEvent::FlowChange(registers.pop_return()?),
        Instruction::Jump(nnn) => CPUEvent::FlowChange(nnn),
        Instruction::Call(nnn) => {
            registers.push_return(next)?;
            CPUEvent::FlowChange(nnn)
        }
        Instruction::SkipEqImm { x, kk } => skip_if(registers.read_register(x) == kk),
        Instruction::SkipNeImm { x, kk } => skip_if(registers.read_register(x) != kk),
        Instruction::SkipEqReg { x, y } => {
            skip_if(registers.read_register(x) == registers.read_register(y))
        }
        Instruction::SkipNeReg { x, y } => {
            skip_if(registers.read_register(x) != registers.read_register(y))
        }
        Instruction::LoadImm { x, kk } => {
            registers.write_register(x, kk);
            CPUEvent::Nothing
        }
        Instruction::AddImm { x, kk } => {
            let r = registers.read_register(x).wrapping_add(kk);
            registers.write_register(x, r);
            CPUEvent::Nothing
        }
        Instruction::Move { x, y } => {
            let r = registers.read_register(y);
            registers.write_register(x, r);
            CPUEvent::Nothing
        }
        Instruction::Or { x, y } => {
            let r = registers.read_register(x) | registers.read_register(y);
            registers.write_register(x, r);
            CPUEvent::Nothing
        }
        Instruction::And { x, y } => {
            let r = registers.read_register(x) & registers.read_register(y);
            registers.write_register(x, r);
            CPUEvent::Nothing
        }
        Instruction::Xor { x, y } => {
            let r = registers.read_register(x) ^ registers.read_register(y);
            registers.write_register(x, r);
            CPUEvent::Nothing
        }
        Instruction::Add { x, y } => {
            let (r, overflow) = registers
                .read_register(x)
                .overflowing_add(registers.read_register(y));
            with_flag!(x, r, overflow);
            CPUEvent::Nothing
        }
        Instruction::Sub { x, y } => {
            let (a, b) = (registers.read_register(x), registers.read_register(y));
            with_flag!(x, a.wrapping_sub(b), a >= b);
            CPUEvent::Nothing
        }
        Instruction::SubNeg { x, y } => {
            let (a, b) = (registers.read_register(x), registers.read_register(y));
            with_flag!(x, b.wrapping_sub(a), b >= a);
            CPUEvent::Nothing
        }
        Instruction::ShiftRight { x, .. } => {
            let a = registers.read_register(x);
            with_flag!(x, a >> 1, a & 0x01);
            CPUEvent::Nothing
        }
        Instruction::ShiftLeft { x, .. } => {
            let a = registers.read_register(x);
            with_flag!(x, a << 1, a >> 7);
            CPUEvent::Nothing
        }
        Instruction::LoadIndex(nnn) => {
            registers.write_index(nnn);
            CPUEvent::Nothing
        }
        Instruction::JumpOffset(nnn) => {
            CPUEvent::FlowChange(nnn.wrapping_add(registers.read_register(0) as u16))
        }
        Instruction::AddIndex { x } => {
            let i = registers
                .read_index()
                .wrapping_add(registers.read_register(x) as u16);
            registers.write_index(i);
            CPUEvent::Nothing
        }
        Instruction::StoreBcd { x } => {
            let value = registers.read_register(x);
            let i = registers.read_index();
            memory.write_block(i, &[value / 100, (value / 10) % 10, value % 10])?;
            CPUEvent::Nothing
        }
        Instruction::StoreRegisters { x } => {
            let i = registers.read_index();
            memory.write_block(i, &registers.registers()[..=x as usize])?;
            CPUEvent::Nothing
        }
        Instruction::LoadRegisters { x } => {
            let i = registers.read_index();
            let values = memory.read_slice(i, x as usize + 1)?;
            for (id, value) in values.iter().enumerate() {
                registers.write_register(id as u8, *value);
            }
            CPUEvent::Nothing
        }
    };

    Ok(event)
}

fn skip_if(condition: bool) -> CPUEvent {
    if condition {
        CPUEvent::Skip
    } else {
        CPUEvent::Nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmuError;

    fn exec(instruction: Instruction, registers: &mut RegisterFile, memory: &mut Memory) -> CPUEvent {
        eval_instruction(instruction, registers, memory).unwrap()
    }

    #[test]
    fn test_add_sets_carry() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0, 200);
        registers.write_register(1, 100);
        exec(Instruction::Add { x: 0, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 44);
        assert_eq!(registers.read_register(FLAG), 1);

        exec(Instruction::Add { x: 0, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 144);
        assert_eq!(registers.read_register(FLAG), 0);
    }

    #[test]
    fn test_flag_wins_over_result() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0xF, 0xFF);
        registers.write_register(0x1, 0x01);
        exec(Instruction::Add { x: 0xF, y: 0x1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0xF), 1);
    }

    #[test]
    fn test_subtraction_borrow() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0, 5);
        registers.write_register(1, 10);
        exec(Instruction::Sub { x: 0, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 251);
        assert_eq!(registers.read_register(FLAG), 0);

        registers.write_register(2, 3);
        registers.write_register(3, 10);
        exec(Instruction::SubNeg { x: 2, y: 3 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(2), 7);
        assert_eq!(registers.read_register(FLAG), 1);
    }

    #[test]
    fn test_shifts() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(4, 0b1000_0011);
        exec(Instruction::ShiftRight { x: 4, y: 0 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(4), 0b0100_0001);
        assert_eq!(registers.read_register(FLAG), 1);

        registers.write_register(4, 0b1000_0011);
        exec(Instruction::ShiftLeft { x: 4, y: 0 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(4), 0b0000_0110);
        assert_eq!(registers.read_register(FLAG), 1);
    }

    #[test]
    fn test_add_immediate_keeps_flag() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0x3, 0xFF);
        registers.write_register(FLAG, 7);
        exec(Instruction::AddImm { x: 0x3, kk: 2 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0x3), 1);
        assert_eq!(registers.read_register(FLAG), 7);
    }

    #[test]
    fn test_skips() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(1, 0x42);
        assert_eq!(
            exec(Instruction::SkipEqImm { x: 1, kk: 0x42 }, &mut registers, &mut memory),
            CPUEvent::Skip
        );
        assert_eq!(
            exec(Instruction::SkipNeImm { x: 1, kk: 0x42 }, &mut registers, &mut memory),
            CPUEvent::Nothing
        );
        assert_eq!(
            exec(Instruction::SkipNeReg { x: 1, y: 2 }, &mut registers, &mut memory),
            CPUEvent::Skip
        );
    }

    #[test]
    fn test_call_and_return() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        assert_eq!(
            exec(Instruction::Call(0x300), &mut registers, &mut memory),
            CPUEvent::FlowChange(0x300)
        );
        assert_eq!(
            exec(Instruction::Return, &mut registers, &mut memory),
            CPUEvent::FlowChange(0x202)
        );
        assert!(matches!(
            eval_instruction(Instruction::Return, &mut registers, &mut memory),
            Err(EmuError::StackUnderflow { .. })
        ));
    }

    #[test]
    fn test_jump_with_offset() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0, 0x10);
        assert_eq!(
            exec(Instruction::JumpOffset(0x300), &mut registers, &mut memory),
            CPUEvent::FlowChange(0x310)
        );
    }

    #[test]
    fn test_index_memory_operations() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0, 254);
        exec(Instruction::LoadIndex(0x400), &mut registers, &mut memory);
        exec(Instruction::StoreBcd { x: 0 }, &mut registers, &mut memory);
        assert_eq!(memory.read_slice(0x400, 3).unwrap(), &[2, 5, 4]);

        registers.write_register(1, 0x10);
        exec(Instruction::AddIndex { x: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_index(), 0x410);

        exec(Instruction::StoreRegisters { x: 1 }, &mut registers, &mut memory);
        assert_eq!(memory.read_slice(0x410, 2).unwrap(), &[254, 0x10]);

        registers.write_register(0, 0);
        registers.write_register(1, 0);
        exec(Instruction::LoadRegisters { x: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 254);
        assert_eq!(registers.read_register(1), 0x10);
    }

    #[test]
    fn test_memory_fault() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0, 123);
        registers.write_index(0xFFE);
        assert!(matches!(
            eval_instruction(Instruction::StoreBcd { x: 0 }, &mut registers, &mut memory),
            Err(EmuError::AddressOutOfRange { address: 0x1000 })
        ));
        assert_eq!(memory.read_slice(0xFFE, 2).unwrap(), &[0, 0]);

        registers.write_index(0xFFD);
        assert!(eval_instruction(Instruction::StoreRegisters { x: 3 }, &mut registers, &mut memory).is_err());
        assert_eq!(memory.read_slice(0xFFD, 3).unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn test_register_moves_and_logic() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(1, 0b1100_1010);
        exec(Instruction::Move { x: 0, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 0b1100_1010);

        registers.write_register(2, 0b0101_0110);
        exec(Instruction::Or { x: 0, y: 2 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 0b1101_1110);

        exec(Instruction::And { x: 0, y: 2 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 0b0101_0110);

        exec(Instruction::Xor { x: 0, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 0b1001_1100);
        assert_eq!(registers.read_register(1), 0b1100_1010);
    }

    #[test]
    fn test_skip_on_equal_registers() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(3, 9);
        registers.write_register(4, 9);
        assert_eq!(
            exec(Instruction::SkipEqReg { x: 3, y: 4 }, &mut registers, &mut memory),
            CPUEvent::Skip
        );
        registers.write_register(4, 8);
        assert_eq!(
            exec(Instruction::SkipEqReg { x: 3, y: 4 }, &mut registers, &mut memory),
            CPUEvent::Nothing
        );
    }

    #[test]
    fn test_equal_operands_do_not_borrow() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();
        registers.write_register(0, 7);
        registers.write_register(1, 7);
        exec(Instruction::Sub { x: 0, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(0), 0);
        assert_eq!(registers.read_register(FLAG), 1);

        registers.write_register(FLAG, 0);
        registers.write_register(2, 7);
        exec(Instruction::SubNeg { x: 2, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(2), 0);
        assert_eq!(registers.read_register(FLAG), 1);
    }

    #[test]
    fn test_flag_wins_for_subtraction_and_shifts() {
        let mut registers = RegisterFile::new(0x200);
        let mut memory = Memory::new();

        // 0x10 - 0x20 borrows, the result 0xF0 is replaced by the flag
        registers.write_register(FLAG, 0x10);
        registers.write_register(1, 0x20);
        exec(Instruction::Sub { x: FLAG, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(FLAG), 0);

        registers.write_register(FLAG, 0x10);
        exec(Instruction::SubNeg { x: FLAG, y: 1 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(FLAG), 1);

        registers.write_register(FLAG, 0b1000_0010);
        exec(Instruction::ShiftRight { x: FLAG, y: 0 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(FLAG), 0);

        registers.write_register(FLAG, 0b1000_0010);
        exec(Instruction::ShiftLeft { x: FLAG, y: 0 }, &mut registers, &mut memory);
        assert_eq!(registers.read_register(FLAG), 1);
    }
}
