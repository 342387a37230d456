//! Rule compilation: gathers a rule's sections, emits its filter chunk
//! (condition gate + output + action) and entry chunk (match lines +
//! `QUERY`).

use jary_front::AstKind;
use jary_vm::{Chunk, Opcode, ValueKind};

use crate::compiler::Compiler;
use crate::resolve::Resolved;

/// One compiled rule's entry point and source name, for host lookup
/// after compilation.
#[derive(Debug, Clone)]
pub struct RuleMeta {
    pub name: String,
    pub entry_offset: usize,
}

impl<'a> Compiler<'a> {
    pub(crate) fn compile_rule(&mut self, id: u32, entry: &mut Chunk, filter: &mut Chunk) -> Option<RuleMeta> {
        let children = self.ast.children(id).to_vec();
        let name = self.lexeme(children[0]).to_string();

        let mut match_sect = None;
        let mut condition_sect = None;
        let mut output_sect = None;
        let mut action_lines: Vec<u32> = Vec::new();

        for &sect_id in &children[1..] {
            match self.ast.kind(sect_id) {
                AstKind::MatchSect => match_sect = Some(sect_id),
                AstKind::ConditionSect => condition_sect = Some(sect_id),
                AstKind::OutputSect => output_sect = Some(sect_id),
                // A `jump` section is a legacy synonym for `action`: both
                // bucket their lines into the same action-list compilation.
                AstKind::ActionSect | AstKind::JumpSect => {
                    action_lines.extend_from_slice(self.ast.children(sect_id));
                }
                AstKind::FieldSect => {}
                _ => {}
            }
        }

        let Some(match_sect) = match_sect else {
            self.error_at(id, "rule is missing a 'match' section");
            return None;
        };

        let filter_offset = filter.len();
        let mut patch_list = Vec::new();

        if let Some(cond_sect) = condition_sect {
            for &line in self.ast.children(cond_sect) {
                match self.compile_expr(line, filter) {
                    Some(Resolved::Value(ValueKind::Bool)) => {
                        patch_list.push(filter.push(Opcode::Jmpf(0)));
                    }
                    Some(other) => {
                        self.error_at(line, format!("invalid condition expression: {}", other.describe()));
                    }
                    None => {}
                }
            }
        }

        if let Some(output_sect) = output_sect {
            self.compile_output_lines(output_sect, filter);
        }

        if !action_lines.is_empty() {
            self.compile_action_lines(&action_lines, filter);
        }

        let end_at = filter.push(Opcode::End);
        for at in patch_list {
            if filter.patch_jump(at, end_at).is_err() {
                self.error_at(id, "condition jump target exceeds +/-32767");
            }
        }

        let ofs_const = self.pool.intern_ofs(filter_offset as u32);

        let entry_offset = entry.len();
        let mut qlen = 0u32;
        for &line in self.ast.children(match_sect) {
            match self.compile_expr(line, entry) {
                Some(Resolved::Match) => qlen += 1,
                Some(other) => {
                    self.error_at(line, format!("invalid match expression: {}", other.describe()));
                }
                None => {}
            }
        }

        let qlen_const = self.pool.intern_long(qlen as i64);
        self.push_const(entry, qlen_const);
        self.push_const(entry, ofs_const);
        entry.push(Opcode::Query);
        entry.push(Opcode::End);

        Some(RuleMeta { name, entry_offset })
    }

    /// `output` lines: each must type to LONG/ULONG/BOOL/STR; a bad line
    /// aborts the whole section.
    fn compile_output_lines(&mut self, output_sect: u32, filter: &mut Chunk) {
        let lines = self.ast.children(output_sect).to_vec();
        let mut count = 0u32;
        for &line in &lines {
            match self.compile_expr(line, filter) {
                Some(Resolved::Value(
                    ValueKind::Long | ValueKind::ULong | ValueKind::Bool | ValueKind::Str,
                )) => {
                    count += 1;
                }
                Some(other) => {
                    self.error_at(line, format!("invalid output expression: {}", other.describe()));
                    return;
                }
                None => return,
            }
        }
        let count_const = self.pool.intern_ulong(count as u64);
        self.push_const(filter, count_const);
        filter.push(Opcode::Output);
    }

    /// `action`/`jump` lines: each must resolve to a void module call; a
    /// bad line aborts the whole section (matches the original's PANIC).
    fn compile_action_lines(&mut self, lines: &[u32], filter: &mut Chunk) {
        for &line in lines {
            match self.compile_expr(line, filter) {
                Some(Resolved::Action) => {}
                Some(other) => {
                    self.error_at(line, format!("invalid target expression: {}", other.describe()));
                    return;
                }
                None => return,
            }
        }
    }
}
