// program file loading. two source forms decode through the same
// validation path: plain text (one instruction per line, `#` comments)
// and json (a bare array of {opcode, operands} objects, or the same
// array wrapped in {"instructions": [...]}).

use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::LoadError;
use crate::instructions::{parse_instruction, Instruction, RawInstruction};

pub const TEXT_EXTENSIONS: &[&str] = &["pasm", "asm", "txt"];

pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Vec<Instruction>, LoadError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let source = fs::read_to_string(path)?;
    let program = if ext == "json" {
        parse_json(&source)?
    } else if ext.is_empty() || TEXT_EXTENSIONS.contains(&ext.as_str()) {
        parse_text(&source)?
    } else {
        return Err(LoadError::Extension(ext));
    };
    debug!("loaded {} instructions from {}", program.len(), path.display());
    Ok(program)
}

pub fn parse_text(source: &str) -> Result<Vec<Instruction>, LoadError> {
    let mut program = Vec::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let instruction = parse_instruction(line).map_err(|reason| LoadError::Parse {
            line: idx + 1,
            reason,
        })?;
        program.push(instruction);
    }
    Ok(program)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonProgram {
    Bare(Vec<RawInstruction>),
    Wrapped { instructions: Vec<RawInstruction> },
}

pub fn parse_json(source: &str) -> Result<Vec<Instruction>, LoadError> {
    let raw: JsonProgram =
        serde_json::from_str(source).map_err(|e| LoadError::Json(e.to_string()))?;
    let raw = match raw {
        JsonProgram::Bare(list) => list,
        JsonProgram::Wrapped { instructions } => instructions,
    };
    let mut program = Vec::with_capacity(raw.len());
    for (idx, instruction) in raw.iter().enumerate() {
        program.push(instruction.decode().map_err(|reason| LoadError::Parse {
            line: idx + 1,
            reason,
        })?);
    }
    Ok(program)
}
