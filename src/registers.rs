use crate::error::ExecError;
use serde::Serialize;

pub const NUM_REGS: usize = 8;

/// The classical register bank: eight general-purpose registers
/// (p0..p7), the program counter, and the single boolean flag written
/// by comparisons and consumed by conditional jumps.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterFile {
    regs: [i64; NUM_REGS],
    pc: usize,
    b: bool,
}

impl RegisterFile {
    pub fn new() -> Self {
        RegisterFile {
            regs: [0; NUM_REGS],
            pc: 0,
            b: false,
        }
    }

    fn check_reg_idx(idx: usize) -> Result<(), ExecError> {
        if idx < NUM_REGS {
            Ok(())
        } else {
            Err(ExecError::UnknownRegister(idx))
        }
    }

    pub fn get(&self, idx: usize) -> Result<i64, ExecError> {
        Self::check_reg_idx(idx)?;
        Ok(self.regs[idx])
    }

    pub fn set(&mut self, idx: usize, val: i64) -> Result<(), ExecError> {
        Self::check_reg_idx(idx)?;
        self.regs[idx] = val;
        Ok(())
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    pub fn flag(&self) -> bool {
        self.b
    }

    pub fn set_flag(&mut self, val: bool) {
        self.b = val;
    }

    pub fn all(&self) -> [i64; NUM_REGS] {
        self.regs
    }

    pub fn reset(&mut self) {
        self.regs = [0; NUM_REGS];
        self.pc = 0;
        self.b = false;
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        RegisterFile::new()
    }
}
