use crate::cpu::event::CPUEvent;
use crate::cpu::instructions::eval_instruction;
use crate::cpu::registers::RegisterFile;
use crate::cpu::watchdog::{read_trace, InstructionRecord, TraceRecorder, Watchdog};
use crate::error::{EmuError, Result};
use crate::instruction::Instruction;
use crate::memory::{Memory, PROGRAM_START};

pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

#[derive(Debug)]
pub struct CPUFlags {
    pub entry_point: u16,
    pub max_steps: Option<u64>,
    pub dump_registers: bool,
    pub trace_conf: CPUFlagsTrace,
}

#[derive(Debug, Default)]
pub struct CPUFlagsTrace {
    pub trace_output: Option<String>,
    pub trace_check: Option<String>,
    pub trace_strict: bool,
}

impl Default for CPUFlags {
    fn default() -> CPUFlags {
        CPUFlags {
            entry_point: PROGRAM_START,
            max_steps: Some(DEFAULT_MAX_STEPS),
            dump_registers: false,
            trace_conf: CPUFlagsTrace::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// a `0000` opcode was reached
    Halted,
    /// the program jumped onto itself
    IdleLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub reason: HaltReason,
    pub final_pc: u16,
}

pub struct EmulatorContext {
    memory: Memory,
    registers: RegisterFile,
    watchdog: Watchdog,
    recorder: Option<TraceRecorder>,
    dump_registers: bool,
}

impl EmulatorContext {
    pub fn new(memory: Memory, flags: CPUFlags) -> Result<EmulatorContext> {
        let real_trace = match flags.trace_conf.trace_check {
            Some(ref tracefile) => Some(read_trace(tracefile)?),
            None => None,
        };
        let recorder = match flags.trace_conf.trace_output {
            Some(ref tracefile) => Some(TraceRecorder::create(tracefile)?),
            None => None,
        };

        Ok(EmulatorContext {
            memory,
            registers: RegisterFile::new(flags.entry_point),
            watchdog: Watchdog::new(flags.max_steps, real_trace, flags.trace_conf.trace_strict),
            recorder,
            dump_registers: flags.dump_registers,
        })
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Runs until the program halts. A pending trace file is finished either way.
    pub fn run_cpu(&mut self) -> Result<RunSummary> {
        info!("Running CPU from 0x{:03x}", self.registers.get_pc());
        let mut result = self.work_loop();

        if let Some(recorder) = self.recorder.take() {
            if let Err(err) = recorder.finish() {
                if result.is_ok() {
                    result = Err(err);
                } else {
                    error!("Could not finish the trace file: {}", err);
                }
            }
        }

        match result {
            Ok(summary) => {
                info!(
                    "CPU stopped after {} instructions ({:?})",
                    summary.steps, summary.reason
                );
                Ok(summary)
            }
            Err(err) => {
                error!("CPU stopped at 0x{:03x}: {}", self.registers.get_pc(), err);
                if self.dump_registers {
                    self.registers.print_registers();
                }
                Err(err)
            }
        }
    }

    fn work_loop(&mut self) -> Result<RunSummary> {
        let memory = &mut self.memory;
        let register_file = &mut self.registers;
        let watchdog = &mut self.watchdog;

        loop {
            let pc = register_file.get_pc();
            watchdog.run_cpu_watchdogs(register_file)?;

            let opcode = memory.fetch_instruction(pc)?;
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.record(&InstructionRecord {
                    address: pc,
                    opcode,
                    registers: register_file.registers(),
                })?;
            }

            let instruction = Instruction::decode(opcode)
                .ok_or(EmuError::UnknownOpcode { opcode, address: pc })?;
            let event = eval_instruction(instruction, register_file, memory)?;

            if self.dump_registers {
                register_file.print_registers();
            }

            let reason = if watchdog.is_idle_loop(pc, &instruction) {
                Some(HaltReason::IdleLoop)
            } else {
                match event {
                    CPUEvent::Nothing => {
                        register_file.set_pc(pc.wrapping_add(2));
                        None
                    }
                    CPUEvent::Skip => {
                        register_file.set_pc(pc.wrapping_add(4));
                        None
                    }
                    CPUEvent::FlowChange(npc) => {
                        register_file.set_pc(npc);
                        None
                    }
                    CPUEvent::Halt => Some(HaltReason::Halted),
                }
            };

            if let Some(reason) = reason {
                return Ok(RunSummary {
                    steps: watchdog.instruction_number(),
                    reason,
                    final_pc: pc,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::parse_hex_program;
    use std::io::{self, Write};

    /// Accepts every write but cannot flush, so finishing a trace fails.
    struct UnflushableSink;

    impl Write for UnflushableSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    fn context_with(program: &str, flags: CPUFlags) -> EmulatorContext {
        let mut memory = Memory::new();
        memory
            .load_program(flags.entry_point, &parse_hex_program(program).unwrap())
            .unwrap();
        EmulatorContext::new(memory, flags).unwrap()
    }

    #[test]
    fn test_counting_loop() {
        // v0 counts to 5 through a conditional skip
        let mut context = context_with(
            "6000 7001 3005 1202 0000",
            CPUFlags::default(),
        );
        let summary = context.run_cpu().unwrap();
        assert_eq!(context.registers().read_register(0), 5);
        assert_eq!(summary.reason, HaltReason::Halted);
        assert_eq!(summary.final_pc, 0x208);
        assert_eq!(summary.steps, 1 + 5 * 2 + 4 + 1);
    }

    #[test]
    fn test_idle_loop_stops_run() {
        let mut context = context_with("6107 1202", CPUFlags::default());
        let summary = context.run_cpu().unwrap();
        assert_eq!(summary.reason, HaltReason::IdleLoop);
        assert_eq!(summary.final_pc, 0x202);
        assert_eq!(context.registers().read_register(1), 7);
    }

    #[test]
    fn test_unknown_opcode() {
        let mut context = context_with("6107 00e0", CPUFlags::default());
        match context.run_cpu() {
            Err(EmuError::UnknownOpcode { opcode, address }) => {
                assert_eq!(opcode, 0x00E0);
                assert_eq!(address, 0x202);
            }
            _ => panic!("expected unknown opcode"),
        }
    }

    #[test]
    fn test_runaway_recursion_overflows_stack() {
        let mut context = context_with("2200", CPUFlags::default());
        assert!(matches!(
            context.run_cpu(),
            Err(EmuError::StackOverflow { address: 0x200 })
        ));
    }

    #[test]
    fn test_step_limit() {
        let flags = CPUFlags {
            max_steps: Some(10),
            ..CPUFlags::default()
        };
        // ping-pong between two jumps
        let mut context = context_with("1202 1200", flags);
        assert!(matches!(
            context.run_cpu(),
            Err(EmuError::StepLimitExceeded(10))
        ));
    }

    #[test]
    fn test_running_off_the_end_of_memory() {
        let mut memory = Memory::new();
        memory.write_halfword(0xFFC, 0x6001).unwrap();
        memory.write_halfword(0xFFE, 0x6002).unwrap();
        let flags = CPUFlags {
            entry_point: 0xFFC,
            ..CPUFlags::default()
        };
        let mut context = EmulatorContext::new(memory, flags).unwrap();
        assert!(matches!(
            context.run_cpu(),
            Err(EmuError::AddressOutOfRange { .. })
        ));
    }

    #[test]
    fn test_recorded_trace_replays() {
        let dir = tempfile::tempdir().unwrap();
        let tracefile = dir.path().join("trace.gz");
        let tracefile = tracefile.to_str().unwrap().to_string();
        let program = "6005 610a 8014 0000";

        let flags = CPUFlags {
            trace_conf: CPUFlagsTrace {
                trace_output: Some(tracefile.clone()),
                ..CPUFlagsTrace::default()
            },
            ..CPUFlags::default()
        };
        context_with(program, flags).run_cpu().unwrap();

        let trace = read_trace(&tracefile).unwrap();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace[2].address, 0x204);
        assert_eq!(trace[2].opcode, 0x8014);
        assert_eq!(trace[2].registers[1], 0x0a);
        assert_eq!(trace[3].registers[0], 15);

        let flags = CPUFlags {
            trace_conf: CPUFlagsTrace {
                trace_check: Some(tracefile.clone()),
                trace_strict: true,
                ..CPUFlagsTrace::default()
            },
            ..CPUFlags::default()
        };
        assert!(context_with(program, flags).run_cpu().is_ok());

        let flags = CPUFlags {
            trace_conf: CPUFlagsTrace {
                trace_check: Some(tracefile),
                trace_strict: true,
                ..CPUFlagsTrace::default()
            },
            ..CPUFlags::default()
        };
        assert!(matches!(
            context_with("6005 610b 8014 0000", flags).run_cpu(),
            Err(EmuError::TraceRegisterMismatch { register: "v1", .. })
        ));
    }

    #[test]
    fn test_emulation_error_wins_over_trace_error() {
        let mut context = context_with("6107 00e0", CPUFlags::default());
        context.recorder = Some(TraceRecorder::new(Box::new(UnflushableSink)));
        assert!(matches!(
            context.run_cpu(),
            Err(EmuError::UnknownOpcode { opcode: 0x00E0, address: 0x202 })
        ));
        assert!(context.recorder.is_none());
    }

    #[test]
    fn test_trace_error_fails_finished_run() {
        let mut context = context_with("6107 0000", CPUFlags::default());
        context.recorder = Some(TraceRecorder::new(Box::new(UnflushableSink)));
        assert!(matches!(context.run_cpu(), Err(EmuError::Io(_))));
    }
}
