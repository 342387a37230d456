//! Opcodes and the per-rule code buffer.
//!
//! The source material frames these as bytes with immediates decoded
//! off a raw buffer; a tagged enum is the same total information with
//! the immediate carried in the variant instead of re-derived by a
//! decode loop — the opcode set is frozen and decoders stay total
//! functions over it.

use jary_base::Fatal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Push8(u8),
    Push16(u16),
    Setbf8,
    Load,
    Call(u8),
    Jmpf(i16),
    Jmpt(i16),
    Not,
    Cmp,
    Cmpstr,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Equal,
    Join,
    Regex,
    Between,
    Within,
    Query,
    Output,
    End,
}

/// One of the two code regions a rule compiles to: the entry chunk
/// (sets up and runs `QUERY`) or the filter chunk (runs per matched
/// row). Both share this representation.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    ops: Vec<Opcode>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Opcode) -> usize {
        let at = self.ops.len();
        self.ops.push(op);
        at
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn op(&self, pc: usize) -> Opcode {
        self.ops[pc]
    }

    /// Patches a previously emitted `Jmpf`/`Jmpt` at `at` so it jumps
    /// to `target`. Jumps beyond `±32767` are a hard compile error
    /// rather than a silent truncation.
    pub fn patch_jump(&mut self, at: usize, target: usize) -> Result<(), Fatal> {
        let delta = target as i64 - (at as i64 + 1);
        if !(i16::MIN as i64..=i16::MAX as i64).contains(&delta) {
            return Err(Fatal::InvariantViolation(format!(
                "jump offset {delta} exceeds +/-32767 at instruction {at}"
            )));
        }
        match &mut self.ops[at] {
            Opcode::Jmpf(o) | Opcode::Jmpt(o) => *o = delta as i16,
            other => {
                return Err(Fatal::InvariantViolation(format!(
                    "instruction {at} is not a conditional jump: {other:?}"
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_jump_computes_relative_offset() {
        let mut chunk = Chunk::new();
        let at = chunk.push(Opcode::Jmpf(0));
        chunk.push(Opcode::Push8(1));
        chunk.push(Opcode::Push8(2));
        let target = chunk.len();
        chunk.patch_jump(at, target).unwrap();
        assert_eq!(chunk.op(at), Opcode::Jmpf(2));
    }

    #[test]
    fn patch_jump_rejects_oversized_offset() {
        let mut chunk = Chunk::new();
        let at = chunk.push(Opcode::Jmpt(0));
        let err = chunk.patch_jump(at, at + 1 + 40_000);
        assert!(err.is_err());
    }

    #[test]
    fn patch_jump_rejects_non_jump_instruction() {
        let mut chunk = Chunk::new();
        let at = chunk.push(Opcode::Add);
        assert!(chunk.patch_jump(at, at + 1).is_err());
    }
}
