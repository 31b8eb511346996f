use crate::error::{EmuError, Result};

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;

/// VF doubles as the carry/borrow flag.
pub const FLAG: u8 = 0xF;

pub struct RegisterFile {
    v: [u8; REGISTER_COUNT],
    i: u16,
    pc: u16,
    stack: [u16; STACK_DEPTH],
    stack_pointer: usize,
}

impl RegisterFile {
    pub fn new(entry_point: u16) -> RegisterFile {
        RegisterFile {
            v: [0u8; REGISTER_COUNT],
            i: 0,
            pc: entry_point,
            stack: [0u16; STACK_DEPTH],
            stack_pointer: 0,
        }
    }

    pub fn read_register(&self, id: u8) -> u8 {
        self.v[id as usize & 0xF]
    }

    pub fn write_register(&mut self, id: u8, value: u8) {
        self.v[id as usize & 0xF] = value;
    }

    pub fn registers(&self) -> [u8; REGISTER_COUNT] {
        self.v
    }

    pub fn read_index(&self) -> u16 {
        self.i
    }

    pub fn write_index(&mut self, value: u16) {
        self.i = value;
    }

    pub fn get_pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    pub fn push_return(&mut self, address: u16) -> Result<()> {
        if self.stack_pointer >= STACK_DEPTH {
            return Err(EmuError::StackOverflow { address: self.pc });
        }
        self.stack[self.stack_pointer] = address;
        self.stack_pointer += 1;
        Ok(())
    }

    pub fn pop_return(&mut self) -> Result<u16> {
        if self.stack_pointer == 0 {
            return Err(EmuError::StackUnderflow { address: self.pc });
        }
        self.stack_pointer -= 1;
        Ok(self.stack[self.stack_pointer])
    }

    pub fn dump_registers(&self) -> String {
        let mut out = String::from("REGISTERS:\n");
        for id in 0..REGISTER_COUNT as u8 {
            out.push_str(&format!(
                "{}:\t0x{:02x}\n",
                get_register_name(id),
                self.read_register(id)
            ));
        }
        out.push_str(&format!("i:\t0x{:03x}\n", self.i));
        out.push_str(&format!("pc:\t0x{:03x}\n", self.pc));
        out.push_str(&format!("stack:\t{:03x?}\n", &self.stack[..self.stack_pointer]));
        out.push_str("------\n");
        out
    }

    pub fn print_registers(&self) {
        println!();
        print!("{}", self.dump_registers());
        println!();
    }
}

pub fn get_register_name(id: u8) -> &'static str {
    match id {
        0x0 => "v0",
        0x1 => "v1",
        0x2 => "v2",
        0x3 => "v3",
        0x4 => "v4",
        0x5 => "v5",
        0x6 => "v6",
        0x7 => "v7",
        0x8 => "v8",
        0x9 => "v9",
        0xA => "va",
        0xB => "vb",
        0xC => "vc",
        0xD => "vd",
        0xE => "ve",
        0xF => "vf",
        _ => unreachable!(),
    }
}

#[test]
fn test_call_stack() {
    let mut registers = RegisterFile::new(0x200);
    for n in 0..STACK_DEPTH as u16 {
        registers.push_return(0x202 + 2 * n).unwrap();
    }
    match registers.push_return(0x300) {
        Err(EmuError::StackOverflow { address }) => assert_eq!(address, 0x200),
        _ => panic!("expected stack overflow"),
    }
    assert_eq!(registers.pop_return().unwrap(), 0x202 + 2 * 15);
    assert_eq!(registers.pop_return().unwrap(), 0x202 + 2 * 14);
}

#[test]
fn test_empty_stack_underflows() {
    let mut registers = RegisterFile::new(0x200);
    assert!(matches!(
        registers.pop_return(),
        Err(EmuError::StackUnderflow { address: 0x200 })
    ));
}

#[test]
fn test_dump_registers() {
    let mut registers = RegisterFile::new(0x200);
    registers.write_register(0xA, 0x2F);
    let dump = registers.dump_registers();
    assert!(dump.contains("va:\t0x2f"));
    assert!(dump.contains("pc:\t0x200"));
}
