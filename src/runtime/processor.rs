use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use serde::Serialize;

use crate::alu::{ClassicalAlu, DEFAULT_BIT_WIDTH};
use crate::error::{ExecError, LoadError};
use crate::instructions::{Instruction, Operand};
use crate::io::{InputSource, OutputSink};
use crate::loader;
use crate::memory::{ClassicalMemory, DEFAULT_MAX_SIZE};
use crate::registers::{RegisterFile, NUM_REGS};
use crate::runtime::quantum_state::QuantumState;

/// Which instruction families a processor accepts. Classical mode
/// rejects every quantum opcode; hybrid runs both families against the
/// same program counter and flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Classical,
    Hybrid,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classical" => Ok(Mode::Classical),
            "hybrid" => Ok(Mode::Hybrid),
            other => Err(format!("unknown mode '{other}' (use classical or hybrid)")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Classical => write!(f, "classical"),
            Mode::Hybrid => write!(f, "hybrid"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub qubits: usize,
    pub memory_size: usize,
    pub bit_width: u32,
    pub mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            qubits: 8,
            memory_size: DEFAULT_MAX_SIZE,
            bit_width: DEFAULT_BIT_WIDTH,
            mode: Mode::Hybrid,
        }
    }
}

/// Read-only view of the machine, for any presentation layer. Taking
/// one never mutates the processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub registers: [i64; NUM_REGS],
    pub flag: bool,
    pub pc: usize,
    pub clock: u64,
    pub current: Option<String>,
    pub memory: BTreeMap<usize, i64>,
    pub queue: Vec<i64>,
}

// whether a handler moved the program counter itself.
enum Flow {
    Advance,
    Jumped,
}

/// The execution engine: owns the register file, memory, both alus and
/// the quantum state, plus the loaded program and clock, and drives
/// the fetch-decode-execute cycle.
pub struct Processor {
    pub registers: RegisterFile,
    pub memory: ClassicalMemory,
    pub alu: ClassicalAlu,
    pub quantum: QuantumState,
    program: Vec<Instruction>,
    clock: u64,
    mode: Mode,
    running: bool,
    output: Box<dyn OutputSink>,
    input: Box<dyn InputSource>,
}

impl Processor {
    pub fn new(config: Config, output: Box<dyn OutputSink>, input: Box<dyn InputSource>) -> Self {
        Self::build(QuantumState::new(config.qubits), config, output, input)
    }

    /// Deterministic measurement outcomes for testing and replay.
    pub fn with_seed(
        config: Config,
        seed: u64,
        output: Box<dyn OutputSink>,
        input: Box<dyn InputSource>,
    ) -> Self {
        Self::build(
            QuantumState::with_seed(config.qubits, seed),
            config,
            output,
            input,
        )
    }

    fn build(
        quantum: QuantumState,
        config: Config,
        output: Box<dyn OutputSink>,
        input: Box<dyn InputSource>,
    ) -> Self {
        Processor {
            registers: RegisterFile::new(),
            memory: ClassicalMemory::new(config.memory_size),
            alu: ClassicalAlu::new(config.bit_width),
            quantum,
            program: Vec::new(),
            clock: 0,
            mode: config.mode,
            running: true,
            output,
            input,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// Parses and installs a text program. Replace-or-fail: a parse
    /// error leaves the previously loaded program runnable.
    pub fn load_source(&mut self, source: &str) -> Result<(), LoadError> {
        let program = loader::parse_text(source)?;
        self.install(program);
        Ok(())
    }

    /// Installs an already-decoded program (the structured form).
    pub fn load_instructions(&mut self, program: Vec<Instruction>) {
        self.install(program);
    }

    fn install(&mut self, program: Vec<Instruction>) {
        info!("loaded {} instructions", program.len());
        self.program = program;
        self.registers.set_pc(0);
        self.clock = 0;
        self.running = true;
    }

    /// Clears every component back to its initial state. The loaded
    /// program is kept.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.memory.reset();
        self.quantum.reset();
        self.clock = 0;
        self.running = true;
    }

    /// Executes one instruction. Returns false once the processor has
    /// halted, whether by completion or by error; errors are reported
    /// to the output sink and are never retried.
    pub fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.program.is_empty() {
            self.output.emit(&format!("error: {}", ExecError::NoProgram));
            self.running = false;
            return false;
        }
        let pc = self.registers.pc();
        if pc >= self.program.len() {
            self.output.emit("program finished");
            self.running = false;
            return false;
        }
        let instruction = self.program[pc].clone();
        debug!("clock {} pc {}: {}", self.clock, pc, instruction);
        let result = self.execute(&instruction);
        self.clock += 1;
        match result {
            Ok(Flow::Advance) => {
                self.registers.set_pc(pc + 1);
                true
            }
            Ok(Flow::Jumped) => true,
            Err(e) => {
                self.output.emit(&format!("error: {e}"));
                self.running = false;
                false
            }
        }
    }

    /// Runs until the program completes or an error halts execution.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Resolves an operand to its current value. Pure with respect to
    /// machine state.
    fn read(&self, op: &Operand) -> Result<i64, ExecError> {
        match op {
            Operand::Reg(i) => self.registers.get(*i),
            Operand::Flag => Ok(self.registers.flag() as i64),
            Operand::Imm(v) => Ok(*v),
            Operand::MemAt(a) => Ok(self.memory.read(*a as i64)),
            Operand::MemReg(i) => {
                let address = self.registers.get(*i)?;
                Ok(self.memory.read(address))
            }
            Operand::Qubit(_) => Err(ExecError::NotReadable(op.to_string())),
        }
    }

    fn write(&mut self, op: &Operand, value: i64) -> Result<(), ExecError> {
        match op {
            Operand::Reg(i) => self.registers.set(*i, value),
            Operand::Flag => {
                self.registers.set_flag(value != 0);
                Ok(())
            }
            Operand::MemAt(a) => self.memory.write(*a as i64, value),
            Operand::MemReg(i) => {
                let address = self.registers.get(*i)?;
                self.memory.write(address, value)
            }
            Operand::Imm(_) | Operand::Qubit(_) => Err(ExecError::NotWritable(op.to_string())),
        }
    }

    fn jump(&mut self, target: i64) -> Result<Flow, ExecError> {
        if target < 0 || target as usize >= self.program.len() {
            return Err(ExecError::JumpOutOfRange {
                target,
                len: self.program.len(),
            });
        }
        self.registers.set_pc(target as usize);
        Ok(Flow::Jumped)
    }

    fn execute(&mut self, instruction: &Instruction) -> Result<Flow, ExecError> {
        use Instruction::*;

        if self.mode == Mode::Classical && instruction.is_quantum() {
            return Err(ExecError::ModeViolation(instruction.opcode().to_string()));
        }

        match instruction {
            Mov(src, dst) => {
                let value = self.read(src)?;
                self.write(dst, value)?;
            }
            Add(dst, src) => {
                let (result, _carry) = self.alu.add(self.read(dst)?, self.read(src)?);
                self.write(dst, result)?;
            }
            Sub(dst, src) => {
                let (result, _borrow) = self.alu.sub(self.read(dst)?, self.read(src)?);
                self.write(dst, result)?;
            }
            Mul(dst, src) => {
                let result = self.alu.mul(self.read(dst)?, self.read(src)?);
                self.write(dst, result)?;
            }
            Dvd(dst, src) => {
                let divisor = self.read(src)?;
                if divisor == 0 {
                    return Err(ExecError::DivisionByZero);
                }
                let result = floor_div(self.read(dst)?, divisor);
                self.write(dst, result)?;
            }
            Neg(dst) => {
                let value = self.read(dst)?;
                self.write(dst, -value)?;
            }
            Cmp(a, b) => {
                let result = self.read(a)? > self.read(b)?;
                self.registers.set_flag(result);
            }
            Eqq(a, b) => {
                let result = self.read(a)? == self.read(b)?;
                self.registers.set_flag(result);
            }
            And(a) => {
                let result = self.read(a)? != 0 && self.registers.flag();
                self.registers.set_flag(result);
            }
            Or(a) => {
                let result = self.read(a)? != 0 || self.registers.flag();
                self.registers.set_flag(result);
            }
            Not => {
                let flag = self.registers.flag();
                self.registers.set_flag(!flag);
            }
            Jmp(target) => {
                let target = self.read(target)?;
                return self.jump(target);
            }
            JmpIf(target) => {
                let target = self.read(target)?;
                if self.registers.flag() {
                    return self.jump(target);
                }
            }
            Out(src) => {
                let value = self.read(src)?;
                self.output.emit(&value.to_string());
            }
            In(dst) => {
                let value = match self.input.request_integer("input> ") {
                    Ok(v) => v,
                    Err(reason) => {
                        // lenient by design: a failed read becomes 0 so
                        // interactive sessions survive typos.
                        self.output
                            .emit(&format!("error: invalid input ({reason}), using 0"));
                        0
                    }
                };
                self.write(dst, value)?;
            }
            Push(src) => {
                let value = self.read(src)?;
                self.memory.push(value);
            }
            Pop(dst) => {
                let value = self.memory.pop()?;
                self.write(dst, value)?;
            }
            Rotate => self.memory.rotate()?,
            H(q) => self.quantum.apply_h(*q)?,
            X(q) => self.quantum.apply_x(*q)?,
            Y(q) => self.quantum.apply_y(*q)?,
            Z(q) => self.quantum.apply_z(*q)?,
            SGate(q) => self.quantum.apply_s(*q)?,
            TGate(q) => self.quantum.apply_t(*q)?,
            Rx(angle, q) => self.quantum.apply_rx(*q, *angle)?,
            Ry(angle, q) => self.quantum.apply_ry(*q, *angle)?,
            Rz(angle, q) => self.quantum.apply_rz(*q, *angle)?,
            Cnot(control, target) => self.quantum.apply_cnot(*control, *target)?,
            Cz(control, target) => self.quantum.apply_cz(*control, *target)?,
            Cy(control, target) => self.quantum.apply_cy(*control, *target)?,
            Toffoli(c1, c2, target) => self.quantum.apply_toffoli(*c1, *c2, *target)?,
            Swap(q1, q2) => self.quantum.swap(*q1, *q2)?,
            Measure(q, dst) => {
                let outcome = self.quantum.measure(*q)?;
                self.write(dst, outcome as i64)?;
            }
            ResetQ(q) => self.quantum.force(*q, 0)?,
            Bell(q1, q2) => self.quantum.bell(*q1, *q2)?,
            Qft(qubits) => self.quantum.qft(qubits)?,
        }
        Ok(Flow::Advance)
    }

    pub fn snapshot(&self) -> Snapshot {
        let pc = self.registers.pc();
        Snapshot {
            registers: self.registers.all(),
            flag: self.registers.flag(),
            pc,
            clock: self.clock,
            current: self.program.get(pc).map(|i| i.to_string()),
            memory: self.memory.contents(),
            queue: self.memory.queue_contents(),
        }
    }
}

// python-style floor division; plain i64 division truncates toward
// zero instead.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}
