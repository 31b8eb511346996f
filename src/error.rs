use std::io;
use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, EmuError>;

#[derive(Debug, Error)]
pub enum EmuError {
    #[error("unknown opcode 0x{opcode:04x} at address 0x{address:03x}")]
    UnknownOpcode { opcode: u16, address: u16 },

    #[error("call stack overflow at address 0x{address:03x}")]
    StackOverflow { address: u16 },

    #[error("return with empty call stack at address 0x{address:03x}")]
    StackUnderflow { address: u16 },

    #[error("memory access out of range at address 0x{address:x}")]
    AddressOutOfRange { address: usize },

    #[error("program of {size} bytes does not fit into memory at 0x{address:03x}")]
    ProgramTooLarge { size: usize, address: u16 },

    #[error("invalid hex word {token:?} on line {line}")]
    InvalidHex { line: usize, token: String },

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("invalid floating point number {0:?}")]
    InvalidNumber(String),

    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),

    #[error("execution diverged from trace at step {step}: pc is 0x{actual:03x}, trace expects 0x{expected:03x}")]
    TraceDiverged {
        step: usize,
        expected: u16,
        actual: u16,
    },

    #[error("register {register} holds 0x{actual:02x} at step {step}, trace expects 0x{expected:02x}")]
    TraceRegisterMismatch {
        step: usize,
        register: &'static str,
        expected: u8,
        actual: u8,
    },

    #[error("trace ended after {0} records")]
    TraceExhausted(usize),

    #[error("malformed trace record: {0}")]
    Trace(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EmuError {
    /// Bad command line input rather than a failure of the program itself.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, EmuError::InvalidAddress(_) | EmuError::InvalidNumber(_))
    }
}

#[test]
fn test_usage_errors() {
    assert!(EmuError::InvalidAddress("0x1000".to_string()).is_usage_error());
    assert!(EmuError::InvalidNumber("1.5e".to_string()).is_usage_error());
    assert!(!EmuError::StepLimitExceeded(10).is_usage_error());
}
