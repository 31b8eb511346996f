//! Decoding, encoding and disassembly of opcodes.

use crate::cpu::bitutils::*;
use crate::cpu::registers::get_register_name;
use crate::memory::MEMORY_SIZE;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Halt,                          // 0000
    Return,                        // 00EE
    Jump(u16),                     // 1nnn
    Call(u16),                     // 2nnn
    SkipEqImm { x: u8, kk: u8 },   // 3xkk
    SkipNeImm { x: u8, kk: u8 },   // 4xkk
    SkipEqReg { x: u8, y: u8 },    // 5xy0
    LoadImm { x: u8, kk: u8 },     // 6xkk
    AddImm { x: u8, kk: u8 },      // 7xkk
    Move { x: u8, y: u8 },         // 8xy0
    Or { x: u8, y: u8 },           // 8xy1
    And { x: u8, y: u8 },          // 8xy2
    Xor { x: u8, y: u8 },          // 8xy3
    Add { x: u8, y: u8 },          // 8xy4
    Sub { x: u8, y: u8 },          // 8xy5
    ShiftRight { x: u8, y: u8 },   // 8xy6
    SubNeg { x: u8, y: u8 },       // 8xy7
    ShiftLeft { x: u8, y: u8 },    // 8xyE
    SkipNeReg { x: u8, y: u8 },    // 9xy0
    LoadIndex(u16),                // Annn
    JumpOffset(u16),               // Bnnn
    AddIndex { x: u8 },            // Fx1E
    StoreBcd { x: u8 },            // Fx33
    StoreRegisters { x: u8 },      // Fx55
    LoadRegisters { x: u8 },       // Fx65
}

impl Instruction {
    pub fn decode(opcode: u16) -> Option<Instruction> {
        let (c, x, y, d) = decode_nibbles(opcode);
        let kk = get_kk(opcode);
        let nnn = get_nnn(opcode);

        let instruction = match (c, x, y, d) {
            (0x0, 0x0, 0x0, 0x0) => Instruction::Halt,
            (0x0, 0x0, 0xE, 0xE) => Instruction::Return,
            (0x1, _, _, _) => Instruction::Jump(nnn),
            (0x2, _, _, _) => Instruction::Call(nnn),
            (0x3, _, _, _) => Instruction::SkipEqImm { x, kk },
            (0x4, _, _, _) => Instruction::SkipNeImm { x, kk },
            (0x5, _, _, 0x0) => Instruction::SkipEqReg { x, y },
            (0x6, _, _, _) => Instruction::LoadImm { x, kk },
            (0x7, _, _, _) => Instruction::AddImm { x, kk },
            (0x8, _, _, 0x0) => Instruction::Move { x, y },
            (0x8, _, _, 0x1) => Instruction::Or { x, y },
            (0x8, _, _, 0x2) => Instruction::And { x, y },
            (0x8, _, _, 0x3) => Instruction::Xor { x, y },
            (0x8, _, _, 0x4) => Instruction::Add { x, y },
            (0x8, _, _, 0x5) => Instruction::Sub { x, y },
            (0x8, _, _, 0x6) => Instruction::ShiftRight { x, y },
            (0x8, _, _, 0x7) => Instruction::SubNeg { x, y },
            (0x8, _, _, 0xE) => Instruction::ShiftLeft { x, y },
            (0x9, _, _, 0x0) => Instruction::SkipNeReg { x, y },
            (0xA, _, _, _) => Instruction::LoadIndex(nnn),
            (0xB, _, _, _) => Instruction::JumpOffset(nnn),
            (0xF, _, 0x1, 0xE) => Instruction::AddIndex { x },
            (0xF, _, 0x3, 0x3) => Instruction::StoreBcd { x },
            (0xF, _, 0x5, 0x5) => Instruction::StoreRegisters { x },
            (0xF, _, 0x6, 0x5) => Instruction::LoadRegisters { x },
            _ => return None,
        };
        Some(instruction)
    }

    pub fn encode(&self) -> u16 {
        let with_byte = |c: u16, x: u8, kk: u8| (c << 12) | ((x as u16 & 0xF) << 8) | kk as u16;
        let with_address = |c: u16, nnn: u16| (c << 12) | (nnn & 0x0F_FF);

        match *self {
            Instruction::Halt => 0x0000,
            Instruction::Return => 0x00EE,
            Instruction::Jump(nnn) => with_address(0x1, nnn),
            Instruction::Call(nnn) => with_address(0x2, nnn),
            Instruction::SkipEqImm { x, kk } => with_byte(0x3, x, kk),
            Instruction::SkipNeImm { x, kk } => with_byte(0x4, x, kk),
            Instruction::SkipEqReg { x, y } => compose(0x5, x, y, 0x0),
            Instruction::LoadImm { x, kk } => with_byte(0x6, x, kk),
            Instruction::AddImm { x, kk } => with_byte(0x7, x, kk),
            Instruction::Move { x, y } => compose(0x8, x, y, 0x0),
            Instruction::Or { x, y } => compose(0x8, x, y, 0x1),
            Instruction::And { x, y } => compose(0x8, x, y, 0x2),
            Instruction::Xor { x, y } => compose(0x8, x, y, 0x3),
            Instruction::Add { x, y } => compose(0x8, x, y, 0x4),
            Instruction::Sub { x, y } => compose(0x8, x, y, 0x5),
            Instruction::ShiftRight { x, y } => compose(0x8, x, y, 0x6),
            Instruction::SubNeg { x, y } => compose(0x8, x, y, 0x7),
            Instruction::ShiftLeft { x, y } => compose(0x8, x, y, 0xE),
            Instruction::SkipNeReg { x, y } => compose(0x9, x, y, 0x0),
            Instruction::LoadIndex(nnn) => with_address(0xA, nnn),
            Instruction::JumpOffset(nnn) => with_address(0xB, nnn),
            Instruction::AddIndex { x } => compose(0xF, x, 0x1, 0xE),
            Instruction::StoreBcd { x } => compose(0xF, x, 0x3, 0x3),
            Instruction::StoreRegisters { x } => compose(0xF, x, 0x5, 0x5),
            Instruction::LoadRegisters { x } => compose(0xF, x, 0x6, 0x5),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let r = get_register_name;
        match *self {
            Instruction::Halt => write!(f, "halt"),
            Instruction::Return => write!(f, "ret"),
            Instruction::Jump(nnn) => write!(f, "jp\t0x{:03x}", nnn),
            Instruction::Call(nnn) => write!(f, "call\t0x{:03x}", nnn),
            Instruction::SkipEqImm { x, kk } => write!(f, "se\t{},0x{:02x}", r(x), kk),
            Instruction::SkipNeImm { x, kk } => write!(f, "sne\t{},0x{:02x}", r(x), kk),
            Instruction::SkipEqReg { x, y } => write!(f, "se\t{},{}", r(x), r(y)),
            Instruction::LoadImm { x, kk } => write!(f, "ld\t{},0x{:02x}", r(x), kk),
            Instruction::AddImm { x, kk } => write!(f, "add\t{},0x{:02x}", r(x), kk),
            Instruction::Move { x, y } => write!(f, "ld\t{},{}", r(x), r(y)),
            Instruction::Or { x, y } => write!(f, "or\t{},{}", r(x), r(y)),
            Instruction::And { x, y } => write!(f, "and\t{},{}", r(x), r(y)),
            Instruction::Xor { x, y } => write!(f, "xor\t{},{}", r(x), r(y)),
            Instruction::Add { x, y } => write!(f, "add\t{},{}", r(x), r(y)),
            Instruction::Sub { x, y } => write!(f, "sub\t{},{}", r(x), r(y)),
            Instruction::ShiftRight { x, .. } => write!(f, "shr\t{}", r(x)),
            Instruction::SubNeg { x, y } => write!(f, "subn\t{},{}", r(x), r(y)),
            Instruction::ShiftLeft { x, .. } => write!(f, "shl\t{}", r(x)),
            Instruction::SkipNeReg { x, y } => write!(f, "sne\t{},{}", r(x), r(y)),
            Instruction::LoadIndex(nnn) => write!(f, "ld\ti,0x{:03x}", nnn),
            Instruction::JumpOffset(nnn) => write!(f, "jp\tv0,0x{:03x}", nnn),
            Instruction::AddIndex { x } => write!(f, "add\ti,{}", r(x)),
            Instruction::StoreBcd { x } => write!(f, "ld\tb,{}", r(x)),
            Instruction::StoreRegisters { x } => write!(f, "ld\t[i],{}", r(x)),
            Instruction::LoadRegisters { x } => write!(f, "ld\t{},[i]", r(x)),
        }
    }
}

/// One line per word: `address  opcode  mnemonic`. A trailing odd byte is ignored,
/// and the listing stops at the end of memory.
pub fn disassemble(program: &[u8], base: u16) -> String {
    let mut listing = String::new();
    for (n, word) in program.chunks_exact(2).enumerate() {
        let address = base as usize + 2 * n;
        if address + 2 > MEMORY_SIZE {
            warn!(
                "Image does not fit in memory, listing stops at 0x{:03x}",
                address
            );
            break;
        }
        let opcode = u16::from_be_bytes([word[0], word[1]]);
        let text = match Instruction::decode(opcode) {
            Some(instruction) => instruction.to_string(),
            None => "???".to_string(),
        };
        listing.push_str(&format!("0x{:03x}:\t{:04x}\t{}\n", address, opcode, text));
    }
    listing
}
