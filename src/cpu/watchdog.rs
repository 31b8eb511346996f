use crate::cpu::registers::{get_register_name, RegisterFile, REGISTER_COUNT};
use crate::error::{EmuError, Result};
use crate::instruction::Instruction;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_derive::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// State of the machine right before the instruction at `address` executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRecord {
    pub address: u16,
    pub opcode: u16,
    pub registers: [u8; REGISTER_COUNT],
}

pub struct Watchdog {
    instruction_number: usize,
    max_steps: Option<u64>,
    real_trace: Option<Vec<InstructionRecord>>,
    strict: bool,
}

impl Watchdog {
    pub fn new(max_steps: Option<u64>, real_trace: Option<Vec<InstructionRecord>>, strict: bool) -> Watchdog {
        Watchdog {
            instruction_number: 0,
            max_steps,
            real_trace,
            strict,
        }
    }

    pub fn instruction_number(&self) -> usize {
        self.instruction_number
    }

    pub fn run_cpu_watchdogs(&mut self, register_file: &RegisterFile) -> Result<()> {
        if let Some(limit) = self.max_steps {
            if self.instruction_number as u64 >= limit {
                return Err(EmuError::StepLimitExceeded(limit));
            }
        }

        if let Some(trace) = self.real_trace.as_ref() {
            let record = trace
                .get(self.instruction_number)
                .ok_or(EmuError::TraceExhausted(trace.len()))?;

            if register_file.get_pc() != record.address {
                return Err(EmuError::TraceDiverged {
                    step: self.instruction_number,
                    expected: record.address,
                    actual: register_file.get_pc(),
                });
            }

            for (id, expected) in record.registers.iter().enumerate() {
                let actual = register_file.read_register(id as u8);
                if actual != *expected {
                    let register = get_register_name(id as u8);
                    if self.strict {
                        return Err(EmuError::TraceRegisterMismatch {
                            step: self.instruction_number,
                            register,
                            expected: *expected,
                            actual,
                        });
                    }
                    warn!(
                        "Unexpected value in register {} at step {}. Found 0x{:02x} instead of 0x{:02x}.",
                        register, self.instruction_number, actual, *expected
                    );
                }
            }
        }

        self.instruction_number += 1;
        Ok(())
    }

    /// A jump onto itself never leaves, programs use it as their final idle loop.
    pub fn is_idle_loop(&self, pc: u16, instruction: &Instruction) -> bool {
        match *instruction {
            Instruction::Jump(target) if target == pc => {
                warn!("Jump to self at 0x{:03x}, treating as end of program", pc);
                true
            }
            _ => false,
        }
    }
}

pub struct TraceRecorder {
    encoder: GzEncoder<Box<dyn Write>>,
    records: usize,
}

impl TraceRecorder {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<TraceRecorder> {
        let file = File::create(path)?;
        Ok(TraceRecorder::new(Box::new(BufWriter::new(file))))
    }

    pub fn new(sink: Box<dyn Write>) -> TraceRecorder {
        TraceRecorder {
            encoder: GzEncoder::new(sink, Compression::default()),
            records: 0,
        }
    }

    pub fn record(&mut self, record: &InstructionRecord) -> Result<()> {
        serde_json::to_writer(&mut self.encoder, record)?;
        self.encoder.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<usize> {
        let mut sink = self.encoder.finish()?;
        sink.flush()?;
        info!("Trace with {} records written", self.records);
        Ok(self.records)
    }
}

pub fn read_trace<P: AsRef<Path>>(tracefile: P) -> Result<Vec<InstructionRecord>> {
    info!("Loading trace into memory...");
    let trace = read_trace_from(File::open(tracefile)?)?;
    info!("Trace loaded, {} records", trace.len());
    Ok(trace)
}

pub fn read_trace_from<R: Read>(reader: R) -> Result<Vec<InstructionRecord>> {
    let file = BufReader::new(GzDecoder::new(reader));
    let mut real_trace = Vec::new();
    for line in file.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        real_trace.push(serde_json::from_str(&line)?);
    }
    Ok(real_trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn record(address: u16, v0: u8) -> InstructionRecord {
        let mut registers = [0u8; REGISTER_COUNT];
        registers[0] = v0;
        InstructionRecord {
            address,
            opcode: 0x7001,
            registers,
        }
    }

    #[test]
    fn test_trace_roundtrip_through_gzip() {
        let buffer = SharedBuffer::default();
        let mut recorder = TraceRecorder::new(Box::new(buffer.clone()));
        recorder.record(&record(0x200, 0)).unwrap();
        recorder.record(&record(0x202, 1)).unwrap();
        assert_eq!(recorder.finish().unwrap(), 2);

        let bytes = buffer.0.lock().unwrap().clone();
        let trace = read_trace_from(&bytes[..]).unwrap();
        assert_eq!(trace, vec![record(0x200, 0), record(0x202, 1)]);
    }

    #[test]
    fn test_step_limit() {
        let registers = RegisterFile::new(0x200);
        let mut watchdog = Watchdog::new(Some(2), None, false);
        watchdog.run_cpu_watchdogs(&registers).unwrap();
        watchdog.run_cpu_watchdogs(&registers).unwrap();
        assert!(matches!(
            watchdog.run_cpu_watchdogs(&registers),
            Err(EmuError::StepLimitExceeded(2))
        ));
    }

    #[test]
    fn test_trace_divergence() {
        let mut registers = RegisterFile::new(0x200);
        let mut watchdog = Watchdog::new(None, Some(vec![record(0x200, 0), record(0x202, 0)]), false);
        watchdog.run_cpu_watchdogs(&registers).unwrap();
        registers.set_pc(0x204);
        match watchdog.run_cpu_watchdogs(&registers) {
            Err(EmuError::TraceDiverged { step, expected, actual }) => {
                assert_eq!(step, 1);
                assert_eq!(expected, 0x202);
                assert_eq!(actual, 0x204);
            }
            _ => panic!("expected divergence"),
        }
    }

    #[test]
    fn test_register_mismatch_only_fails_when_strict() {
        let registers = RegisterFile::new(0x200);

        let mut lenient = Watchdog::new(None, Some(vec![record(0x200, 9)]), false);
        assert!(lenient.run_cpu_watchdogs(&registers).is_ok());
        assert!(matches!(
            lenient.run_cpu_watchdogs(&registers),
            Err(EmuError::TraceExhausted(1))
        ));

        let mut strict = Watchdog::new(None, Some(vec![record(0x200, 9)]), true);
        assert!(matches!(
            strict.run_cpu_watchdogs(&registers),
            Err(EmuError::TraceRegisterMismatch { register: "v0", expected: 9, actual: 0, .. })
        ));
    }

    #[test]
    fn test_idle_loop() {
        let watchdog = Watchdog::new(None, None, false);
        assert!(watchdog.is_idle_loop(0x20A, &Instruction::Jump(0x20A)));
        assert!(!watchdog.is_idle_loop(0x20A, &Instruction::Jump(0x200)));
        assert!(!watchdog.is_idle_loop(0x20A, &Instruction::Call(0x20A)));
    }
}
