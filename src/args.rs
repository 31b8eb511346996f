use argparse::{ArgumentParser, IncrBy, List, Store, StoreOption, StoreTrue};
use crate::cpu::control::CPUFlags;
use crate::error::{EmuError, Result};
use crate::memory::{MEMORY_SIZE, PROGRAM_START};
use crate::rom::RomFormat;
use std::io::{stderr, stdout};

pub struct Arguments {
    pub verbosity_level: u32,
    pub command: String,
    pub arguments: Vec<String>,
}

/// The number is parsed straight into the requested width, so it is rounded only once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatNumber {
    Single(f32),
    Double(f64),
}

pub struct FloatArguments {
    pub number: FloatNumber,
    pub no_color: bool,
    pub debug: bool,
}

pub struct RunArguments {
    pub rom: String,
    pub format: RomFormat,
    pub flags: CPUFlags,
}

pub struct DisasmArguments {
    pub rom: String,
    pub format: RomFormat,
    pub base: u16,
}

pub fn parse_arguments() -> Arguments {
    let mut args = Arguments {
        verbosity_level: 0,
        command: String::new(),
        arguments: Vec::new(),
    };

    {  // this block limits scope of borrows by ap.refer() method
        let mut ap = ArgumentParser::new();
        ap.set_description("Deconstructs floating point numbers and emulates a small CHIP-8 instruction set.");
        ap.refer(&mut args.verbosity_level)
            .add_option(&["-v", "--verbose"], IncrBy(1),
            "Verbosity level. Can be used multiple times.");
        ap.refer(&mut args.command)
            .required()
            .add_argument("command", Store,
            "One of float, fixed, rand, run, disasm, demo.");
        ap.refer(&mut args.arguments)
            .add_argument("arguments", List,
            "Arguments for the command. Put -- in front of negative numbers.");
        ap.stop_on_first_argument(true);
        ap.parse_args_or_exit();
    }

    args.arguments.insert(0, format!("floatcpu {}", args.command));
    args
}

fn parse_or_exit(ap: &ArgumentParser, arguments: Vec<String>) {
    if let Err(code) = ap.parse(arguments, &mut stdout(), &mut stderr()) {
        ::std::process::exit(code);
    }
}

pub fn parse_float_arguments(arguments: Vec<String>) -> Result<FloatArguments> {
    let mut number = String::new();
    let mut double = false;
    let mut no_color = false;
    let mut debug = false;

    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Split a floating point number into sign, exponent and mantissa.");
        ap.refer(&mut number)
            .required()
            .add_argument("number", Store, "Floating point number.");
        ap.refer(&mut double)
            .add_option(&["--double"], StoreTrue, "Treat the number as f64 instead of f32.");
        ap.refer(&mut no_color)
            .add_option(&["--no-color"], StoreTrue, "Do not highlight the bit fields.");
        ap.refer(&mut debug)
            .add_option(&["-d", "--debug"], StoreTrue, "Print the parsed number first.");
        parse_or_exit(&ap, arguments);
    }

    Ok(FloatArguments {
        number: parse_float_number(&number, double)?,
        no_color,
        debug,
    })
}

pub fn parse_float_number(text: &str, double: bool) -> Result<FloatNumber> {
    let trimmed = text.trim();
    let parsed = if double {
        trimmed.parse::<f64>().map(FloatNumber::Double)
    } else {
        trimmed.parse::<f32>().map(FloatNumber::Single)
    };
    parsed.map_err(|_| EmuError::InvalidNumber(text.to_string()))
}

pub fn parse_number_argument(arguments: Vec<String>, description: &str) -> f64 {
    let mut number = 0.0;
    {
        let mut ap = ArgumentParser::new();
        ap.set_description(description);
        ap.refer(&mut number)
            .required()
            .add_argument("number", Store, "Floating point number.");
        parse_or_exit(&ap, arguments);
    }
    number
}

pub fn parse_byte_argument(arguments: Vec<String>, description: &str) -> u8 {
    let mut byte = 0u8;
    {
        let mut ap = ArgumentParser::new();
        ap.set_description(description);
        ap.refer(&mut byte)
            .required()
            .add_argument("byte", Store, "Value between 0 and 255.");
        parse_or_exit(&ap, arguments);
    }
    byte
}

pub fn parse_run_arguments(arguments: Vec<String>) -> Result<RunArguments> {
    let mut rom = String::new();
    let mut hex = false;
    let mut entry_point: Option<String> = None;
    let mut max_steps: Option<u64> = None;
    let mut unlimited = false;
    let mut flags = CPUFlags::default();

    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Run a program image.");
        ap.refer(&mut rom)
            .required()
            .add_argument("ROM", Store, "Program image to run.");
        ap.refer(&mut hex)
            .add_option(&["--hex"], StoreTrue, "The image is hex text instead of raw bytes.");
        ap.refer(&mut entry_point)
            .add_option(&["-e", "--entry-point"], StoreOption,
                        "Load and start the program at this address. Defaults to 0x200.");
        ap.refer(&mut max_steps)
            .add_option(&["--max-steps"], StoreOption,
                        "Abort after this many instructions. Defaults to 1000000.");
        ap.refer(&mut unlimited)
            .add_option(&["--unlimited"], StoreTrue, "Never abort because of the instruction count.");
        ap.refer(&mut flags.trace_conf.trace_output)
            .add_option(&["--trace-out"], StoreOption, "Record the execution into this gzipped trace.");
        ap.refer(&mut flags.trace_conf.trace_check)
            .add_option(&["--trace-check"], StoreOption, "Check flow of the emulation using this tracefile.");
        ap.refer(&mut flags.trace_conf.trace_strict)
            .add_option(&["--strict"], StoreTrue, "When tracing, abort when a register value differs.");
        ap.refer(&mut flags.dump_registers)
            .add_option(&["--dump-registers"], StoreTrue, "Print all registers after every instruction.");
        parse_or_exit(&ap, arguments);
    }

    if let Some(address) = entry_point {
        flags.entry_point = parse_address(&address)?;
    }
    if unlimited {
        flags.max_steps = None;
    } else if max_steps.is_some() {
        flags.max_steps = max_steps;
    }

    Ok(RunArguments {
        rom,
        format: rom_format(hex),
        flags,
    })
}

pub fn parse_disasm_arguments(arguments: Vec<String>) -> Result<DisasmArguments> {
    let mut rom = String::new();
    let mut hex = false;
    let mut base: Option<String> = None;

    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Print a listing of a program image.");
        ap.refer(&mut rom)
            .required()
            .add_argument("ROM", Store, "Program image to disassemble.");
        ap.refer(&mut hex)
            .add_option(&["--hex"], StoreTrue, "The image is hex text instead of raw bytes.");
        ap.refer(&mut base)
            .add_option(&["-e", "--entry-point"], StoreOption, "Address of the first word. Defaults to 0x200.");
        parse_or_exit(&ap, arguments);
    }

    let base = match base {
        Some(address) => parse_address(&address)?,
        None => PROGRAM_START,
    };

    Ok(DisasmArguments {
        rom,
        format: rom_format(hex),
        base,
    })
}

pub fn parse_demo_arguments(arguments: Vec<String>) -> Vec<String> {
    let mut names = Vec::new();
    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Run the built-in demo programs (add, multi, call). Runs all of them by default.");
        ap.refer(&mut names)
            .add_argument("demo", List, "Names of demos to run.");
        parse_or_exit(&ap, arguments);
    }
    names
}

fn rom_format(hex: bool) -> RomFormat {
    if hex {
        RomFormat::Hex
    } else {
        RomFormat::Binary
    }
}

/// Accepts decimal or `0x` prefixed hex.
pub fn parse_address(text: &str) -> Result<u16> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => trimmed.parse::<u16>(),
    };

    match parsed {
        Ok(address) if (address as usize) < MEMORY_SIZE => Ok(address),
        _ => Err(EmuError::InvalidAddress(text.to_string())),
    }
}

#[test]
fn test_parse_address() {
    assert_eq!(parse_address("0x200").unwrap(), 0x200);
    assert_eq!(parse_address("512").unwrap(), 0x200);
    assert_eq!(parse_address("0XFFF").unwrap(), 0xFFF);
    assert!(parse_address("0x1000").is_err());
    assert!(parse_address("two").is_err());
}

#[test]
fn test_run_arguments() {
    let arguments = vec![
        "floatcpu run".to_string(),
        "--hex".to_string(),
        "-e".to_string(),
        "0x300".to_string(),
        "--unlimited".to_string(),
        "program.hex".to_string(),
    ];
    let run = parse_run_arguments(arguments).unwrap();
    assert_eq!(run.rom, "program.hex");
    assert_eq!(run.format, RomFormat::Hex);
    assert_eq!(run.flags.entry_point, 0x300);
    assert_eq!(run.flags.max_steps, None);
}

#[test]
fn test_float_arguments_accept_negative_numbers() {
    let arguments = vec![
        "floatcpu float".to_string(),
        "--double".to_string(),
        "--".to_string(),
        "-2.5".to_string(),
    ];
    let float = parse_float_arguments(arguments).unwrap();
    assert_eq!(float.number, FloatNumber::Double(-2.5));
    assert!(!float.no_color);
}

#[test]
fn test_single_precision_is_rounded_once() {
    // halfway between 1.0 and the next f32 plus a hair; a detour through f64 lands on 1.0
    let text = "1.000000059604644830901776231257827021181583404541015625";
    match parse_float_number(text, false).unwrap() {
        FloatNumber::Single(number) => assert_eq!(number.to_bits(), 0x3F80_0001),
        other => panic!("expected f32, got {:?}", other),
    }
    assert!(matches!(
        parse_float_number("1.5e", false),
        Err(EmuError::InvalidNumber(_))
    ));
}

#[test]
fn test_bad_entry_point_is_rejected() {
    let arguments = vec![
        "floatcpu run".to_string(),
        "-e".to_string(),
        "0x1000".to_string(),
        "program.ch8".to_string(),
    ];
    match parse_run_arguments(arguments) {
        Err(err) => assert!(err.is_usage_error()),
        Ok(_) => panic!("expected an invalid address"),
    }
}
