//! Bit operation utilities
//!
//! An opcode is four nibbles `c x y d`. `c` selects the operation group,
//! `x` and `y` usually name registers and `d` refines the operation.
//! The low byte is called `kk` and the low 12 bits `nnn`.

pub fn get_c(opcode: u16) -> u8 {
    ((opcode & 0xF0_00) >> 12) as u8
}

pub fn get_x(opcode: u16) -> u8 {
    ((opcode & 0x0F_00) >> 8) as u8
}

pub fn get_y(opcode: u16) -> u8 {
    ((opcode & 0x00_F0) >> 4) as u8
}

pub fn get_d(opcode: u16) -> u8 {
    (opcode & 0x00_0F) as u8
}

pub fn get_kk(opcode: u16) -> u8 {
    (opcode & 0x00_FF) as u8
}

pub fn get_nnn(opcode: u16) -> u16 {
    opcode & 0x0F_FF
}

pub fn decode_nibbles(opcode: u16) -> (u8, u8, u8, u8) {
    (get_c(opcode), get_x(opcode), get_y(opcode), get_d(opcode))
}

pub fn compose(c: u8, x: u8, y: u8, d: u8) -> u16 {
    ((c as u16 & 0xF) << 12) | ((x as u16 & 0xF) << 8) | ((y as u16 & 0xF) << 4) | (d as u16 & 0xF)
}

#[test]
fn test_decode_nibbles() {
    assert_eq!(decode_nibbles(0x8014), (0x8, 0x0, 0x1, 0x4));
    assert_eq!(decode_nibbles(0xABCD), (0xA, 0xB, 0xC, 0xD));
}

#[test]
fn test_fields() {
    assert_eq!(get_kk(0x3A7F), 0x7F);
    assert_eq!(get_nnn(0x2123), 0x123);
    assert_eq!(get_x(0x3A7F), 0xA);
}

#[test]
fn test_compose() {
    assert_eq!(compose(0x8, 0x0, 0x1, 0x4), 0x8014);
    assert_eq!(compose(0x1F, 0x1, 0x2, 0x3), 0xF123);
}
