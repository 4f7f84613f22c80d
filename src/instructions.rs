// all supported instructions in the pearl assembly language, plus the
// text decoder. decoding is pure: arity and operand-class errors
// surface here, before anything executes.

use std::fmt;

use serde::Deserialize;

use crate::registers::NUM_REGS;

/// A parsed operand token. Resolving one to a value (or writing
/// through one) is the processor's job; parsing has no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// general-purpose register p0..p7
    Reg(usize),
    /// the boolean flag b
    Flag,
    /// direct memory address, written h<addr>
    MemAt(usize),
    /// memory addressed through a register, written [pN]
    MemReg(usize),
    /// immediate integer
    Imm(i64),
    /// qubit reference q<N>
    Qubit(usize),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(i) => write!(f, "p{i}"),
            Operand::Flag => write!(f, "b"),
            Operand::MemAt(a) => write!(f, "h{a}"),
            Operand::MemReg(i) => write!(f, "[p{i}]"),
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Qubit(q) => write!(f, "q{q}"),
        }
    }
}

pub fn parse_operand(token: &str) -> Result<Operand, String> {
    let t = token.trim().to_lowercase();
    if t.is_empty() {
        return Err("empty operand".into());
    }
    if t == "b" {
        return Ok(Operand::Flag);
    }
    if let Some(rest) = t.strip_prefix('p') {
        if let Ok(idx) = rest.parse::<usize>() {
            if idx >= NUM_REGS {
                return Err(format!("no such register 'p{idx}'"));
            }
            return Ok(Operand::Reg(idx));
        }
    }
    if let Some(inner) = t.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return match parse_operand(inner)? {
            Operand::Reg(idx) => Ok(Operand::MemReg(idx)),
            _ => Err(format!("indirect operand '[{inner}]' must name a register")),
        };
    }
    if let Some(rest) = t.strip_prefix('h') {
        if let Ok(addr) = rest.parse::<usize>() {
            return Ok(Operand::MemAt(addr));
        }
    }
    if let Some(rest) = t.strip_prefix('q') {
        if let Ok(idx) = rest.parse::<usize>() {
            return Ok(Operand::Qubit(idx));
        }
    }
    if let Ok(value) = t.parse::<i64>() {
        return Ok(Operand::Imm(value));
    }
    Err(format!("unrecognized operand '{token}'"))
}

/// One decoded instruction. Operand order follows the assembly text:
/// `mov src dst`, while the arithmetic ops read and write their first
/// operand (`add dst src`).
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Mov(Operand, Operand),
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Mul(Operand, Operand),
    Dvd(Operand, Operand),
    Neg(Operand),
    Cmp(Operand, Operand),
    Eqq(Operand, Operand),
    And(Operand),
    Or(Operand),
    Not,
    Jmp(Operand),
    JmpIf(Operand),
    Out(Operand),
    In(Operand),
    Push(Operand),
    Pop(Operand),
    Rotate,
    H(usize),
    X(usize),
    Y(usize),
    Z(usize),
    SGate(usize),
    TGate(usize),
    Rx(f64, usize),
    Ry(f64, usize),
    Rz(f64, usize),
    Cnot(usize, usize),
    Cz(usize, usize),
    Cy(usize, usize),
    Toffoli(usize, usize, usize),
    Swap(usize, usize),
    Measure(usize, Operand),
    ResetQ(usize),
    Bell(usize, usize),
    Qft(Vec<usize>),
}

impl Instruction {
    pub fn opcode(&self) -> &'static str {
        use Instruction::*;
        match self {
            Mov(..) => "mov",
            Add(..) => "add",
            Sub(..) => "sub",
            Mul(..) => "mul",
            Dvd(..) => "dvd",
            Neg(..) => "neg",
            Cmp(..) => "cmp",
            Eqq(..) => "eqq",
            And(..) => "and",
            Or(..) => "or",
            Not => "not",
            Jmp(..) => "jmp",
            JmpIf(..) => "jmpif",
            Out(..) => "out",
            In(..) => "in",
            Push(..) => "push",
            Pop(..) => "pop",
            Rotate => "pp",
            H(..) => "h",
            X(..) => "x",
            Y(..) => "y",
            Z(..) => "z",
            SGate(..) => "s",
            TGate(..) => "t",
            Rx(..) => "rx",
            Ry(..) => "ry",
            Rz(..) => "rz",
            Cnot(..) => "cnot",
            Cz(..) => "cz",
            Cy(..) => "cy",
            Toffoli(..) => "ccx",
            Swap(..) => "swap",
            Measure(..) => "measure",
            ResetQ(..) => "reset",
            Bell(..) => "bell",
            Qft(..) => "qft",
        }
    }

    /// True for every instruction that touches the quantum register
    /// file. These are gated out in classical mode.
    pub fn is_quantum(&self) -> bool {
        use Instruction::*;
        matches!(
            self,
            H(..) | X(..)
                | Y(..)
                | Z(..)
                | SGate(..)
                | TGate(..)
                | Rx(..)
                | Ry(..)
                | Rz(..)
                | Cnot(..)
                | Cz(..)
                | Cy(..)
                | Toffoli(..)
                | Swap(..)
                | Measure(..)
                | ResetQ(..)
                | Bell(..)
                | Qft(..)
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        write!(f, "{}", self.opcode())?;
        match self {
            Mov(a, b) | Add(a, b) | Sub(a, b) | Mul(a, b) | Dvd(a, b) | Cmp(a, b) | Eqq(a, b) => {
                write!(f, " {a} {b}")
            }
            Neg(a) | And(a) | Or(a) | Jmp(a) | JmpIf(a) | Out(a) | In(a) | Push(a) | Pop(a) => {
                write!(f, " {a}")
            }
            Not | Rotate => Ok(()),
            H(q) | X(q) | Y(q) | Z(q) | SGate(q) | TGate(q) | ResetQ(q) => write!(f, " q{q}"),
            Rx(angle, q) | Ry(angle, q) | Rz(angle, q) => write!(f, " {angle} q{q}"),
            Cnot(a, b) | Cz(a, b) | Cy(a, b) | Swap(a, b) | Bell(a, b) => {
                write!(f, " q{a} q{b}")
            }
            Toffoli(a, b, c) => write!(f, " q{a} q{b} q{c}"),
            Measure(q, dst) => write!(f, " q{q} {dst}"),
            Qft(qs) => {
                for q in qs {
                    write!(f, " q{q}")?;
                }
                Ok(())
            }
        }
    }
}

/// Decodes one line of assembly text. Mnemonics are case-insensitive;
/// `#` comments must already be stripped by the loader.
pub fn parse_instruction(line: &str) -> Result<Instruction, String> {
    let tokens: Vec<&str> = line.trim().split_whitespace().collect();
    if tokens.is_empty() {
        return Err("empty instruction line".into());
    }
    decode_instruction(tokens[0], &tokens[1..])
}

/// Decodes an opcode plus raw operand tokens, checking arity and
/// operand classes. The structured (json) program form feeds through
/// here as well, so both forms get identical validation.
pub fn decode_instruction(opcode: &str, operands: &[&str]) -> Result<Instruction, String> {
    let op = opcode.to_lowercase();

    let expect_arity = |n: usize| {
        if operands.len() == n {
            Ok(())
        } else {
            Err(format!(
                "'{op}' expects {n} operand(s), got {}",
                operands.len()
            ))
        }
    };
    let operand = |i: usize| parse_operand(operands[i]);
    // destination positions must name a writable place.
    let dst_operand = |i: usize| {
        let parsed = parse_operand(operands[i])?;
        match parsed {
            Operand::Imm(_) | Operand::Qubit(_) => {
                Err(format!("'{}' is not a writable destination", operands[i]))
            }
            _ => Ok(parsed),
        }
    };
    let qubit = |i: usize| match parse_operand(operands[i])? {
        Operand::Qubit(q) => Ok(q),
        _ => Err(format!("'{}' is not a qubit operand", operands[i])),
    };
    let angle = |i: usize| {
        operands[i]
            .parse::<f64>()
            .map_err(|_| format!("invalid angle '{}'", operands[i]))
    };

    match op.as_str() {
        "mov" => {
            expect_arity(2)?;
            Ok(Instruction::Mov(operand(0)?, dst_operand(1)?))
        }
        "add" => {
            expect_arity(2)?;
            Ok(Instruction::Add(dst_operand(0)?, operand(1)?))
        }
        "sub" => {
            expect_arity(2)?;
            Ok(Instruction::Sub(dst_operand(0)?, operand(1)?))
        }
        "mul" => {
            expect_arity(2)?;
            Ok(Instruction::Mul(dst_operand(0)?, operand(1)?))
        }
        "dvd" => {
            expect_arity(2)?;
            Ok(Instruction::Dvd(dst_operand(0)?, operand(1)?))
        }
        "neg" => {
            expect_arity(1)?;
            Ok(Instruction::Neg(dst_operand(0)?))
        }
        "cmp" => {
            expect_arity(2)?;
            Ok(Instruction::Cmp(operand(0)?, operand(1)?))
        }
        "eqq" => {
            expect_arity(2)?;
            Ok(Instruction::Eqq(operand(0)?, operand(1)?))
        }
        "and" => {
            expect_arity(1)?;
            Ok(Instruction::And(operand(0)?))
        }
        "or" => {
            expect_arity(1)?;
            Ok(Instruction::Or(operand(0)?))
        }
        "not" => {
            expect_arity(1)?;
            match parse_operand(operands[0])? {
                Operand::Flag => Ok(Instruction::Not),
                _ => Err("'not' operates on the b flag only".into()),
            }
        }
        "jmp" => {
            expect_arity(1)?;
            Ok(Instruction::Jmp(operand(0)?))
        }
        "jmpif" => {
            expect_arity(1)?;
            Ok(Instruction::JmpIf(operand(0)?))
        }
        "out" => {
            expect_arity(1)?;
            Ok(Instruction::Out(operand(0)?))
        }
        "in" => {
            expect_arity(1)?;
            Ok(Instruction::In(dst_operand(0)?))
        }
        "push" => {
            expect_arity(1)?;
            Ok(Instruction::Push(operand(0)?))
        }
        "pop" => {
            expect_arity(1)?;
            Ok(Instruction::Pop(dst_operand(0)?))
        }
        "pp" => {
            expect_arity(0)?;
            Ok(Instruction::Rotate)
        }
        "h" => {
            expect_arity(1)?;
            Ok(Instruction::H(qubit(0)?))
        }
        "x" => {
            expect_arity(1)?;
            Ok(Instruction::X(qubit(0)?))
        }
        "y" => {
            expect_arity(1)?;
            Ok(Instruction::Y(qubit(0)?))
        }
        "z" => {
            expect_arity(1)?;
            Ok(Instruction::Z(qubit(0)?))
        }
        "s" => {
            expect_arity(1)?;
            Ok(Instruction::SGate(qubit(0)?))
        }
        "t" => {
            expect_arity(1)?;
            Ok(Instruction::TGate(qubit(0)?))
        }
        "rx" => {
            expect_arity(2)?;
            Ok(Instruction::Rx(angle(0)?, qubit(1)?))
        }
        "ry" => {
            expect_arity(2)?;
            Ok(Instruction::Ry(angle(0)?, qubit(1)?))
        }
        "rz" => {
            expect_arity(2)?;
            Ok(Instruction::Rz(angle(0)?, qubit(1)?))
        }
        "cx" | "cnot" => {
            expect_arity(2)?;
            Ok(Instruction::Cnot(qubit(0)?, qubit(1)?))
        }
        "cz" => {
            expect_arity(2)?;
            Ok(Instruction::Cz(qubit(0)?, qubit(1)?))
        }
        "cy" => {
            expect_arity(2)?;
            Ok(Instruction::Cy(qubit(0)?, qubit(1)?))
        }
        "ccx" | "toffoli" => {
            expect_arity(3)?;
            Ok(Instruction::Toffoli(qubit(0)?, qubit(1)?, qubit(2)?))
        }
        "swap" => {
            expect_arity(2)?;
            Ok(Instruction::Swap(qubit(0)?, qubit(1)?))
        }
        "measure" => {
            expect_arity(2)?;
            Ok(Instruction::Measure(qubit(0)?, dst_operand(1)?))
        }
        "reset" => {
            expect_arity(1)?;
            Ok(Instruction::ResetQ(qubit(0)?))
        }
        "bell" => {
            expect_arity(2)?;
            Ok(Instruction::Bell(qubit(0)?, qubit(1)?))
        }
        "qft" => {
            if operands.is_empty() {
                return Err("'qft' expects at least one qubit operand".into());
            }
            let mut qubits = Vec::with_capacity(operands.len());
            for i in 0..operands.len() {
                let q = qubit(i)?;
                if qubits.contains(&q) {
                    return Err(format!("duplicate qubit 'q{q}' in qft"));
                }
                qubits.push(q);
            }
            Ok(Instruction::Qft(qubits))
        }
        _ => Err(format!("unknown opcode '{opcode}'")),
    }
}

/// The structured program form: opcode plus raw operand tokens, as
/// found in json program files or supplied directly by an embedder.
#[derive(Debug, Clone, Deserialize)]
pub struct RawInstruction {
    pub opcode: String,
    #[serde(default)]
    pub operands: Vec<String>,
}

impl RawInstruction {
    pub fn decode(&self) -> Result<Instruction, String> {
        let refs: Vec<&str> = self.operands.iter().map(String::as_str).collect();
        decode_instruction(&self.opcode, &refs)
    }
}
