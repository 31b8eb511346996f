use byteorder::{BigEndian, ByteOrder};
use crate::error::{EmuError, Result};

pub const MEMORY_SIZE: usize = 0x1000;

/// Programs are conventionally loaded here, below lies the interpreter area.
pub const PROGRAM_START: u16 = 0x200;

/// The 4KB RAM of the emulated machine. Words are stored big endian.
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            data: vec![0; MEMORY_SIZE],
        }
    }

    fn check_range(&self, address: usize, len: usize) -> Result<()> {
        if address + len > self.data.len() {
            Err(EmuError::AddressOutOfRange {
                address: address + len - 1,
            })
        } else {
            Ok(())
        }
    }

    pub fn read_byte(&self, address: u16) -> Result<u8> {
        self.check_range(address as usize, 1)?;
        Ok(self.data[address as usize])
    }

    pub fn write_byte(&mut self, address: u16, value: u8) -> Result<()> {
        self.check_range(address as usize, 1)?;
        self.data[address as usize] = value;
        Ok(())
    }

    pub fn read_halfword(&self, address: u16) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_slice(address, 2)?))
    }

    pub fn write_halfword(&mut self, address: u16, value: u16) -> Result<()> {
        self.check_range(address as usize, 2)?;
        let start = address as usize;
        BigEndian::write_u16(&mut self.data[start..start + 2], value);
        Ok(())
    }

    pub fn read_slice(&self, address: u16, len: usize) -> Result<&[u8]> {
        self.check_range(address as usize, len)?;
        Ok(&self.data[address as usize..address as usize + len])
    }

    pub fn fetch_instruction(&self, address: u16) -> Result<u16> {
        self.read_halfword(address)
    }

    pub fn write_block(&mut self, address: u16, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        self.check_range(address as usize, data.len())?;
        let start = address as usize;
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copies a program image into memory, failing when it does not fit as a whole.
    pub fn load_program(&mut self, address: u16, program: &[u8]) -> Result<()> {
        if address as usize + program.len() > self.data.len() {
            return Err(EmuError::ProgramTooLarge {
                size: program.len(),
                address,
            });
        }
        debug!(
            "Loading {} bytes of program at 0x{:03x}",
            program.len(),
            address
        );
        self.write_block(address, program)
    }
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}

#[test]
fn test_halfwords_are_big_endian() {
    let mut memory = Memory::new();
    memory.write_halfword(0x200, 0x8014).unwrap();
    assert_eq!(memory.read_byte(0x200).unwrap(), 0x80);
    assert_eq!(memory.read_byte(0x201).unwrap(), 0x14);
    assert_eq!(memory.fetch_instruction(0x200).unwrap(), 0x8014);
}

#[test]
fn test_out_of_range_access() {
    let mut memory = Memory::new();
    assert!(memory.read_byte(0xFFF).is_ok());
    match memory.read_byte(0x1000) {
        Err(EmuError::AddressOutOfRange { address }) => assert_eq!(address, 0x1000),
        _ => panic!("expected out of range error"),
    }
    assert!(memory.fetch_instruction(0xFFF).is_err());
    assert!(memory.write_byte(0xFFFF, 1).is_err());
}

#[test]
fn test_load_program() {
    let mut memory = Memory::new();
    memory.load_program(PROGRAM_START, &[0x60, 0x05, 0x00, 0x00]).unwrap();
    assert_eq!(memory.fetch_instruction(PROGRAM_START).unwrap(), 0x6005);

    let too_big = vec![0u8; MEMORY_SIZE];
    match memory.load_program(PROGRAM_START, &too_big) {
        Err(EmuError::ProgramTooLarge { size, address }) => {
            assert_eq!(size, MEMORY_SIZE);
            assert_eq!(address, PROGRAM_START);
        }
        _ => panic!("expected program too large error"),
    }
    assert!(memory.load_program(0, &too_big).is_ok());
}
