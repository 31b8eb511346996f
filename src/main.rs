#[macro_use]
extern crate log;

mod args;
mod cpu;
mod demos;
mod error;
mod fixed;
mod float;
mod instruction;
mod memory;
mod mylog;
mod rom;

use args::FloatNumber;
use cpu::control::EmulatorContext;
use demos::Demo;
use error::{EmuError, Result};
use fixed::{mock_rand, Q7};
use float::DeconstructedFloat;
use memory::Memory;

fn main() {
    let arguments = args::parse_arguments();
    if let Err(err) = mylog::configure_logging(arguments.verbosity_level) {
        eprintln!("Could not initialize logging: {}", err);
    }

    let code = match run_command(arguments) {
        Ok(()) => 0,
        Err(err) => {
            error!("{}", err);
            exit_code(&err)
        }
    };
    ::std::process::exit(code);
}

fn exit_code(err: &EmuError) -> i32 {
    if err.is_usage_error() {
        2
    } else {
        1
    }
}

fn run_command(arguments: args::Arguments) -> Result<()> {
    let rest = arguments.arguments;
    match arguments.command.as_str() {
        "float" => {
            let args = args::parse_float_arguments(rest)?;
            match args.number {
                FloatNumber::Single(number) => {
                    if args.debug {
                        println!("{}", number);
                    }
                    DeconstructedFloat::new(number).print(!args.no_color);
                }
                FloatNumber::Double(number) => {
                    if args.debug {
                        println!("{}", number);
                    }
                    DeconstructedFloat::new(number).print(!args.no_color);
                }
            }
        }
        "fixed" => {
            let number = args::parse_number_argument(rest, "Convert a floating point number to Q7 fixed point.");
            let q = Q7::from(number);
            println!(
                "{} -> Q7({}) = 0b{:08b} -> {}",
                number,
                q.0,
                q.0 as u8,
                f64::from(q)
            );
        }
        "rand" => {
            let byte = args::parse_byte_argument(rest, "Turn a byte into a float in [0, 1).");
            println!("{} -> {}", byte, mock_rand(byte));
        }
        "run" => {
            let args = args::parse_run_arguments(rest)?;
            let program = rom::load_rom(&args.rom, args.format)?;
            let mut memory = Memory::new();
            memory.load_program(args.flags.entry_point, &program)?;

            let mut context = EmulatorContext::new(memory, args.flags)?;
            let summary = context.run_cpu()?;
            println!(
                "Stopped at 0x{:03x} after {} instructions ({:?})",
                summary.final_pc, summary.steps, summary.reason
            );
            context.registers().print_registers();
        }
        "disasm" => {
            let args = args::parse_disasm_arguments(rest)?;
            let program = rom::load_rom(&args.rom, args.format)?;
            print!("{}", instruction::disassemble(&program, args.base));
        }
        "demo" => {
            let mut names = args::parse_demo_arguments(rest);
            if names.is_empty() {
                names = vec!["add".to_string(), "multi".to_string(), "call".to_string()];
            }
            for name in names {
                match name.parse::<Demo>() {
                    Ok(demo) => println!("{}: v0 = {}", name, demo.run()?),
                    Err(message) => {
                        eprintln!("{}", message);
                        ::std::process::exit(2);
                    }
                }
            }
        }
        other => {
            eprintln!(
                "Unknown command {:?}. Expected one of float, fixed, rand, run, disasm, demo.",
                other
            );
            ::std::process::exit(2);
        }
    }
    Ok(())
}

#[test]
fn test_exit_codes() {
    assert_eq!(exit_code(&EmuError::InvalidAddress("two".to_string())), 2);
    assert_eq!(exit_code(&EmuError::StackUnderflow { address: 0x200 }), 1);
}
