use thiserror::Error;

/// Errors raised while turning program source into instructions.
///
/// A load failure never disturbs the processor: the previously loaded
/// program (if any) stays runnable.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("invalid json program: {0}")]
    Json(String),

    #[error("unsupported program file extension '{0}'")]
    Extension(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// errors raised while executing a single instruction. all of these are
// fail-stop: the processor reports the error and halts.
#[derive(Debug, Error, PartialEq)]
pub enum ExecError {
    #[error("no program loaded")]
    NoProgram,

    #[error("register index out of bounds: {0}")]
    UnknownRegister(usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("jump target {target} out of range for program of {len} instructions")]
    JumpOutOfRange { target: i64, len: usize },

    #[error("memory address {address} out of range (max {max})")]
    MemoryOutOfRange { address: i64, max: usize },

    #[error("{0} on empty queue")]
    QueueUnderflow(&'static str),

    #[error("quantum instruction '{0}' not allowed in classical mode")]
    ModeViolation(String),

    #[error("qubit index {q} out of bounds for {n}-qubit state")]
    QubitOutOfRange { q: usize, n: usize },

    #[error("control and target qubits cannot be the same")]
    SameQubit,

    #[error("cannot read a value from operand '{0}'")]
    NotReadable(String),

    #[error("cannot write to operand '{0}'")]
    NotWritable(String),
}
