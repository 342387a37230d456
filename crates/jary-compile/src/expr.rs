//! Expression compilation.
//!
//! One dispatch per [`AstKind`], mirroring the source material's
//! `rules[TOTAL_AST_TYPES]` table. Every handler either emits into the
//! chunk it was handed and returns the node's [`Resolved`] type, or
//! appends a [`Diagnostic`] and returns `None` — callers propagate the
//! `None` without aborting the surrounding section.

use jary_base::{Diagnostic, TokenSpan};
use jary_front::AstKind;
use jary_vm::{Chunk, Descriptor, Opcode, TimeUnit, TimeValue, Value, ValueKind};

use crate::compiler::Compiler;
use crate::resolve::{FuncSig, Resolved};

pub(crate) fn value_kind_from_tag(tag: u32) -> Option<ValueKind> {
    ValueKind::from_tag(tag)
}

impl<'a> Compiler<'a> {
    pub(crate) fn lexeme(&self, id: u32) -> &str {
        &self.tokens[self.ast.token(id) as usize].lexeme
    }

    pub(crate) fn error(&mut self, from: u32, to: u32, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(message, TokenSpan::new(self.ast.token(from), self.ast.token(to))));
    }

    pub(crate) fn error_at(&mut self, id: u32, message: impl Into<String>) {
        self.error(id, id, message);
    }

    pub(crate) fn push_const(&mut self, chunk: &mut Chunk, id: u32) {
        if id <= u8::MAX as u32 {
            chunk.push(Opcode::Push8(id as u8));
        } else {
            chunk.push(Opcode::Push16(id as u16));
        }
    }

    /// Compiles one expression node into `chunk`, returning its
    /// compile-time type or `None` if a diagnostic was raised.
    pub(crate) fn compile_expr(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        match self.ast.kind(id) {
            AstKind::Name | AstKind::Event => self.compile_bare(id),
            AstKind::Qaccess => self.compile_access(id, true, chunk),
            AstKind::Eaccess => self.compile_access(id, false, chunk),
            AstKind::Call => self.compile_call(id, chunk),

            AstKind::Not => self.compile_not(id, chunk),
            AstKind::And => self.compile_and(id, chunk),
            AstKind::Or => self.compile_or(id, chunk),

            AstKind::Joinx => self.compile_join(id, chunk),
            AstKind::Exact | AstKind::Equal => self.compile_exact(id, chunk),
            AstKind::Between => self.compile_between(id, chunk),
            AstKind::Within => self.compile_within(id, chunk),
            AstKind::RegexOp => self.compile_regex_match(id, chunk),

            AstKind::Equality => self.compile_equality(id, chunk),
            AstKind::Lesser => self.compile_compare(id, chunk, Opcode::Lt),
            AstKind::Greater => self.compile_compare(id, chunk, Opcode::Gt),

            AstKind::Concat => self.compile_concat(id, chunk),
            AstKind::Addition => self.compile_arith(id, chunk, Opcode::Add),
            AstKind::Subtract => self.compile_arith(id, chunk, Opcode::Sub),
            AstKind::Multiply => self.compile_arith(id, chunk, Opcode::Mul),
            AstKind::Divide => self.compile_arith(id, chunk, Opcode::Div),

            AstKind::Long => self.compile_long(id, chunk),
            AstKind::Str => self.compile_str(id, chunk),
            AstKind::Regexp => self.compile_regexp(id, chunk),
            AstKind::Hour => self.compile_time(id, chunk, TimeUnit::Hour),
            AstKind::Minute => self.compile_time(id, chunk, TimeUnit::Minute),
            AstKind::Second => self.compile_time(id, chunk, TimeUnit::Second),
            AstKind::True => self.compile_bool(id, chunk, true),
            AstKind::False => self.compile_bool(id, chunk, false),

            _ => {
                self.error_at(id, "invalid expression");
                None
            }
        }
    }

    /// A bare `name`/`$name` leaf, resolved against the root scope. Only
    /// `import`/`ingress` declarations live there, so this only ever
    /// yields a bare scope reference — nothing is pushed.
    fn compile_bare(&mut self, id: u32) -> Option<Resolved> {
        let lexeme = self.lexeme(id).to_string();
        match self.root.get(&lexeme) {
            None => {
                self.error_at(id, "missing definition");
                None
            }
            Some((_, value, kind)) => {
                if kind == ValueKind::Event as u32 {
                    Some(Resolved::Event(value))
                } else if kind == ValueKind::Module as u32 {
                    Some(Resolved::Module(value))
                } else {
                    self.error_at(id, "invalid expression");
                    None
                }
            }
        }
    }

    /// `scope.member` — a `Qaccess` (match section, no load) or an
    /// `Eaccess` (everywhere else, loads the field/function).
    fn compile_access(&mut self, id: u32, is_query: bool, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        if !matches!(self.ast.kind(left), AstKind::Name | AstKind::Event) {
            self.error_at(left, "invalid expression");
            return None;
        }

        let owner_lexeme = self.lexeme(left).to_string();
        let Some((_, owner_const_id, owner_kind)) = self.root.get(&owner_lexeme) else {
            self.error_at(left, "missing definition");
            return None;
        };

        let member_lexeme = self.lexeme(right).to_string();

        let (member_id, member_kind) = if owner_kind == ValueKind::Event as u32 {
            let Value::Event(table) = self.pool.get(owner_const_id) else {
                self.error_at(left, "invalid expression");
                return None;
            };
            let found = table.borrow().schema.get(&member_lexeme).map(|(_, v, k)| (v, k));
            match found {
                Some((member_id, kind_tag)) => {
                    let Some(kind) = value_kind_from_tag(kind_tag) else {
                        self.error_at(right, "missing definition");
                        return None;
                    };
                    (member_id, kind)
                }
                None => {
                    self.error_at(right, "missing definition");
                    return None;
                }
            }
        } else if owner_kind == ValueKind::Module as u32 {
            let Value::Module(table) = self.pool.get(owner_const_id) else {
                self.error_at(left, "invalid expression");
                return None;
            };
            match table.borrow().schema.get(&member_lexeme) {
                Some((_, member_id, _)) => (member_id, ValueKind::Func),
                None => {
                    self.error_at(right, "missing definition");
                    return None;
                }
            }
        } else {
            self.error_at(left, "invalid expression");
            return None;
        };

        let descriptor = Descriptor {
            name_id: owner_const_id,
            member_id,
        };
        let const_id = self.pool.intern_descriptor(descriptor);
        self.push_const(chunk, const_id);

        if is_query {
            return Some(Resolved::Descriptor(member_kind));
        }

        chunk.push(Opcode::Load);

        if member_kind == ValueKind::Func {
            let Value::Module(table) = self.pool.get(owner_const_id) else {
                unreachable!("member_kind Func only set when owner is a module");
            };
            let func = table.borrow().function(member_id).clone();
            return Some(Resolved::Func(FuncSig {
                return_kind: func.return_kind,
                arg_kinds: func.arg_kinds,
            }));
        }

        Some(Resolved::Value(member_kind))
    }

    fn compile_call(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id).to_vec();
        let callee_id = children[0];
        let arg_ids = &children[1..];

        let resolved = self.compile_expr(callee_id, chunk)?;
        let sig = match resolved {
            Resolved::Func(sig) => sig,
            other => {
                self.error_at(callee_id, format!("type mismatch: expected FUNC, found {}", other.describe()));
                return None;
            }
        };

        if arg_ids.len() != sig.arg_kinds.len() {
            self.error_at(id, "invalid signature");
            return None;
        }
        if arg_ids.len() > u8::MAX as usize {
            self.error_at(id, "too many arguments (limit is 255)");
            return None;
        }

        for (i, &arg_id) in arg_ids.iter().enumerate() {
            let arg_resolved = self.compile_expr(arg_id, chunk)?;
            let arg_kind = match arg_resolved {
                Resolved::Value(k) => k,
                other => {
                    self.error(id, arg_id, format!("bad argument type mismatch: found {}", other.describe()));
                    return None;
                }
            };
            if arg_kind != sig.arg_kinds[i] {
                self.error(id, arg_id, "bad argument type mismatch");
                return None;
            }
        }

        chunk.push(Opcode::Call(arg_ids.len() as u8));

        Some(match sig.return_kind {
            Some(k) => Resolved::Value(k),
            None => Resolved::Action,
        })
    }

    fn compile_not(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let child = self.ast.children(id)[0];
        let resolved = self.compile_expr(child, chunk)?;
        if !matches!(resolved, Resolved::Value(ValueKind::Bool)) {
            self.error(id, child, "invalid operation");
            return None;
        }
        chunk.push(Opcode::Not);
        Some(Resolved::Value(ValueKind::Bool))
    }

    fn compile_and(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Value(ValueKind::Bool)) {
            self.error(left, id, "invalid predicate");
            return None;
        }
        let at = chunk.push(Opcode::Jmpf(0));

        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Bool)) {
            self.error(right, right, "invalid predicate");
            return None;
        }
        chunk.patch_jump(at, chunk.len()).ok()?;
        Some(Resolved::Value(ValueKind::Bool))
    }

    fn compile_or(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Value(ValueKind::Bool)) {
            self.error(left, left, "invalid predicate");
            return None;
        }
        let at = chunk.push(Opcode::Jmpt(0));

        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Bool)) {
            self.error(right, right, "invalid predicate");
            return None;
        }
        chunk.patch_jump(at, chunk.len()).ok()?;
        Some(Resolved::Value(ValueKind::Bool))
    }

    /// `exact`/`equal` — synonyms at the bytecode level (the source
    /// material maps both AST kinds to the same compile function).
    fn compile_exact(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        if !matches!(self.ast.kind(left), AstKind::Qaccess) {
            self.error_at(left, "invalid expression");
            return None;
        }
        let lresolved = self.compile_expr(left, chunk)?;
        let lkind = match lresolved {
            Resolved::Descriptor(k @ (ValueKind::Str | ValueKind::Long)) => k,
            other => {
                self.error_at(left, format!("invalid expression: {}", other.describe()));
                return None;
            }
        };

        let rresolved = self.compile_expr(right, chunk)?;
        let rkind = match rresolved {
            Resolved::Value(k) => k,
            other => {
                self.error(left, right, format!("invalid expression: {}", other.describe()));
                return None;
            }
        };
        if rkind != lkind {
            self.error(left, right, "invalid expression");
            return None;
        }

        chunk.push(Opcode::Equal);
        Some(Resolved::Match)
    }

    fn compile_join(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        if !matches!(self.ast.kind(left), AstKind::Qaccess) {
            self.error_at(left, "invalid expression");
            return None;
        }
        if !matches!(self.ast.kind(right), AstKind::Qaccess) {
            self.error(left, right, "invalid expression");
            return None;
        }

        let lresolved = self.compile_expr(left, chunk)?;
        let rresolved = self.compile_expr(right, chunk)?;

        let (Resolved::Descriptor(lkind), Resolved::Descriptor(rkind)) = (lresolved, rresolved) else {
            self.error(left, right, "invalid expression");
            return None;
        };
        if lkind != rkind {
            self.error(left, right, "invalid expression");
            return None;
        }

        chunk.push(Opcode::Join);
        Some(Resolved::Match)
    }

    /// `$event within <time>` — binds the event's implicit
    /// `__arrival__` field rather than requiring the author to spell it
    /// out (the source material's `JY_K_EVENT` left-operand check).
    fn compile_within(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        let Resolved::Event(event_const_id) = lresolved else {
            self.error_at(left, "invalid expression");
            return None;
        };

        let Value::Event(table) = self.pool.get(event_const_id) else {
            self.error_at(left, "invalid expression");
            return None;
        };
        let arrival = table.borrow().schema.get("__arrival__").map(|(_, v, _)| v);
        let Some(member_id) = arrival else {
            self.error_at(left, "invalid expression");
            return None;
        };
        let descriptor_id = self.pool.intern_descriptor(Descriptor {
            name_id: event_const_id,
            member_id,
        });
        self.push_const(chunk, descriptor_id);

        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Time)) {
            self.error_at(id, "invalid expression");
            return None;
        }

        chunk.push(Opcode::Within);
        Some(Resolved::Match)
    }

    /// `between` — the RHS is always scanned/parsed as a `..` concat
    /// node regardless of numeric context; special-cased here
    /// to pull out its two LONG children directly instead of running
    /// the normal (string-only) concat compile path.
    fn compile_between(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        if !matches!(self.ast.kind(right), AstKind::Concat) {
            self.error(left, right, "invalid expression");
            return None;
        }

        if !matches!(self.ast.kind(left), AstKind::Qaccess) {
            self.error_at(left, "invalid expression");
            return None;
        }
        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Descriptor(ValueKind::Long)) {
            self.error_at(left, "invalid expression");
            return None;
        }

        let range_children = self.ast.children(right);
        let (min_id, max_id) = (range_children[0], range_children[1]);

        let min_resolved = self.compile_expr(min_id, chunk)?;
        if !matches!(min_resolved, Resolved::Value(ValueKind::Long)) {
            self.error_at(min_id, "invalid expression");
            return None;
        }
        let max_resolved = self.compile_expr(max_id, chunk)?;
        if !matches!(max_resolved, Resolved::Value(ValueKind::Long)) {
            self.error(left, id, "invalid expression");
            return None;
        }

        chunk.push(Opcode::Between);
        Some(Resolved::Match)
    }

    fn compile_regex_match(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        if !matches!(self.ast.kind(left), AstKind::Qaccess) {
            self.error_at(left, "expected a string lhs");
            return None;
        }
        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Descriptor(ValueKind::Str)) {
            self.error_at(left, "expected a string lhs");
            return None;
        }

        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Regex)) {
            self.error(left, right, "invalid regex expression");
            return None;
        }

        chunk.push(Opcode::Regex);
        Some(Resolved::Match)
    }

    fn compile_equality(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        let lkind = match lresolved {
            Resolved::Value(k) => k,
            other => {
                self.error(left, right, format!("invalid expression: {}", other.describe()));
                return None;
            }
        };

        let op = match lkind {
            ValueKind::Long | ValueKind::Bool => Opcode::Cmp,
            ValueKind::Str => Opcode::Cmpstr,
            _ => {
                self.error(left, right, "invalid expression");
                return None;
            }
        };

        let rresolved = self.compile_expr(right, chunk)?;
        let rkind = match rresolved {
            Resolved::Value(k) => k,
            other => {
                self.error(left, right, format!("invalid expression: {}", other.describe()));
                return None;
            }
        };
        if rkind != lkind {
            self.error(left, right, "invalid expression");
            return None;
        }

        chunk.push(op);
        Some(Resolved::Value(ValueKind::Bool))
    }

    fn compile_compare(&mut self, id: u32, chunk: &mut Chunk, op: Opcode) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Value(ValueKind::Long)) {
            self.error(left, right, "invalid expression");
            return None;
        }
        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Long)) {
            self.error(left, right, "invalid expression");
            return None;
        }

        chunk.push(op);
        Some(Resolved::Value(ValueKind::Bool))
    }

    fn compile_concat(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Value(ValueKind::Str)) {
            self.error(left, right, "invalid expression");
            return None;
        }
        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Str)) {
            self.error(left, right, "invalid expression");
            return None;
        }

        chunk.push(Opcode::Concat);
        Some(Resolved::Value(ValueKind::Str))
    }

    fn compile_arith(&mut self, id: u32, chunk: &mut Chunk, op: Opcode) -> Option<Resolved> {
        let children = self.ast.children(id);
        let (left, right) = (children[0], children[1]);

        let lresolved = self.compile_expr(left, chunk)?;
        if !matches!(lresolved, Resolved::Value(ValueKind::Long)) {
            self.error_at(id, "invalid expression");
            return None;
        }
        let rresolved = self.compile_expr(right, chunk)?;
        if !matches!(rresolved, Resolved::Value(ValueKind::Long)) {
            self.error_at(id, "invalid expression");
            return None;
        }

        chunk.push(op);
        Some(Resolved::Value(ValueKind::Long))
    }

    fn compile_long(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let lexeme = self.lexeme(id);
        let n: i64 = lexeme.parse().unwrap_or(0);
        let const_id = self.pool.intern_long(n);
        self.push_const(chunk, const_id);
        Some(Resolved::Value(ValueKind::Long))
    }

    fn compile_str(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let lexeme = self.lexeme(id);
        let inner = strip_delim(lexeme);
        let const_id = self.pool.intern_str(inner);
        self.push_const(chunk, const_id);
        Some(Resolved::Value(ValueKind::Str))
    }

    fn compile_regexp(&mut self, id: u32, chunk: &mut Chunk) -> Option<Resolved> {
        let lexeme = self.lexeme(id);
        let inner = strip_delim(lexeme);
        let const_id = self.pool.intern_regex(inner);
        self.push_const(chunk, const_id);
        Some(Resolved::Value(ValueKind::Regex))
    }

    fn compile_time(&mut self, id: u32, chunk: &mut Chunk, unit: TimeUnit) -> Option<Resolved> {
        let lexeme = self.lexeme(id);
        let digits = &lexeme[..lexeme.len() - 1];
        let offset: i64 = digits.parse().unwrap_or(0);
        let const_id = self.pool.intern_time(TimeValue { offset, unit });
        self.push_const(chunk, const_id);
        Some(Resolved::Value(ValueKind::Time))
    }

    fn compile_bool(&mut self, _id: u32, chunk: &mut Chunk, value: bool) -> Option<Resolved> {
        let const_id = self.pool.intern_bool(value);
        self.push_const(chunk, const_id);
        Some(Resolved::Value(ValueKind::Bool))
    }
}

fn strip_delim(s: &str) -> &str {
    if s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        ""
    }
}
