use byteorder::{BigEndian, WriteBytesExt};
use crate::error::{EmuError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomFormat {
    Binary,
    /// 16 bit words written as hex text, e.g. `6005 6a02 8014`
    Hex,
}

pub fn load_rom<P: AsRef<Path>>(path: P, format: RomFormat) -> Result<Vec<u8>> {
    let path = path.as_ref();
    info!("Loading program image from {}...", path.display());
    let mut fd = File::open(path)?;
    let mut buffer = Vec::new();
    fd.read_to_end(&mut buffer)?;

    let program = match format {
        RomFormat::Binary => buffer,
        RomFormat::Hex => parse_hex_program(&String::from_utf8_lossy(&buffer))?,
    };
    debug!("\tProgram image is {} bytes long", program.len());
    Ok(program)
}

/// Comments start with `#` or `;` and run to the end of the line.
pub fn parse_hex_program(text: &str) -> Result<Vec<u8>> {
    let mut program = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let code = match line.find(|c: char| c == '#' || c == ';') {
            Some(start) => &line[..start],
            None => line,
        };

        for token in code
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            let invalid = || EmuError::InvalidHex {
                line: number + 1,
                token: token.to_string(),
            };
            if digits.is_empty() || digits.len() > 4 {
                return Err(invalid());
            }
            let word = u16::from_str_radix(digits, 16).map_err(|_| invalid())?;
            program.write_u16::<BigEndian>(word)?;
        }
    }

    Ok(program)
}
