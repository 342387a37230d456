//! Pratt parser with synchronizing error recovery.
//!
//! The parser never aborts on a single error: every failure path appends
//! a [`Diagnostic`] and resynchronizes to one of three recovery points
//! (list/section/declaration), rewinding the AST to the last
//! known-good node index first.

use crate::ast::{Ast, AstKind};
use crate::token::{Token, TokenKind};
use jary_base::{Diagnostic, TokenSpan};

const MAX_ARGS: usize = 65535;
const MAX_RULE_SECTIONS: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None = 0,
    Or = 1,
    And = 2,
    Equality = 3,
    Comparison = 4,
    Term = 5,
    Factor = 6,
    CallMinus1 = 7,
    Call = 8,
}

/// Whether the current declaration body parses `QACCESS` or `EACCESS`
/// member references — a `match` section resolves to descriptors,
/// everything else resolves to loaded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessMode {
    Query,
    Eval,
}

/// Output of a full parse: the AST plus every diagnostic raised along
/// the way. A non-empty `diagnostics` does not imply an empty `ast` —
/// compilation proceeds over whatever parsed successfully.
pub struct ParseOutput {
    pub ast: Ast,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse(tokens: &[Token]) -> ParseOutput {
    let significant: Vec<Token> = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Spaces | TokenKind::Comment))
        .cloned()
        .collect();

    let mut parser = Parser {
        tokens: significant,
        pos: 0,
        ast: Ast::new(),
        diagnostics: Vec::new(),
        access_mode: AccessMode::Eval,
    };
    parser.parse_script();

    ParseOutput {
        ast: parser.ast,
        diagnostics: parser.diagnostics,
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    diagnostics: Vec<Diagnostic>,
    access_mode: AccessMode,
}

impl Parser {
    fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn cur_id(&self) -> u32 {
        self.pos as u32
    }

    fn advance(&mut self) -> u32 {
        let id = self.cur_id();
        if self.peek() != TokenKind::Eof {
            self.pos += 1;
        }
        id
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let span = TokenSpan::single(self.cur_id());
        self.diagnostics.push(Diagnostic::new(message, span));
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Option<u32> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error(message);
            None
        }
    }

    // ---- synchronizers ----

    fn is_declarator(&self, kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Rule | TokenKind::Import | TokenKind::Include | TokenKind::Ingress
        )
    }

    fn is_section_name(&self, kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Input
                | TokenKind::Match
                | TokenKind::Condition
                | TokenKind::Output
                | TokenKind::Action
                | TokenKind::Field
                | TokenKind::Jump
        )
    }

    /// Skip to newline / right-brace / section / declarator / EOF.
    fn sync_list(&mut self) {
        while !matches!(self.peek(), TokenKind::Eof | TokenKind::Newline | TokenKind::RightBrace)
            && !self.is_section_name(self.peek())
            && !self.is_declarator(self.peek())
        {
            self.advance();
        }
    }

    /// Skip to right-brace / section / declarator / EOF.
    fn sync_section(&mut self) {
        while !matches!(self.peek(), TokenKind::Eof | TokenKind::RightBrace)
            && !self.is_section_name(self.peek())
            && !self.is_declarator(self.peek())
        {
            self.advance();
        }
    }

    /// Skip to declarator / EOF.
    fn sync_declaration(&mut self) {
        while !matches!(self.peek(), TokenKind::Eof) && !self.is_declarator(self.peek()) {
            self.advance();
        }
    }

    // ---- top level ----

    fn parse_script(&mut self) {
        loop {
            self.skip_newlines();
            if self.check(TokenKind::Eof) {
                break;
            }

            let checkpoint = self.ast.len() as u32;
            if self.parse_decl().is_none() {
                self.ast.truncate(checkpoint);
                self.sync_declaration();
            }
        }
    }

    fn parse_decl(&mut self) -> Option<u32> {
        match self.peek() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Include => self.parse_include(),
            TokenKind::Ingress => self.parse_ingress(),
            TokenKind::Rule => self.parse_rule(),
            _ => {
                self.error("expected 'import', 'include', 'ingress' or 'rule'");
                None
            }
        }
    }

    fn parse_import(&mut self) -> Option<u32> {
        let kw = self.advance();
        let name_tok = self.expect(TokenKind::Identifier, "expected module name after 'import'")?;
        let name = self.ast.push(AstKind::Name, name_tok, Vec::new());
        Some(self.ast.push(AstKind::ImportStmt, kw, vec![name]))
    }

    fn parse_include(&mut self) -> Option<u32> {
        let kw = self.advance();
        let path_tok = self.expect(TokenKind::String, "expected a string path after 'include'")?;
        let path = self.ast.push(AstKind::Str, path_tok, Vec::new());
        Some(self.ast.push(AstKind::IncludeStmt, kw, vec![path]))
    }

    fn parse_ingress(&mut self) -> Option<u32> {
        let kw = self.advance();
        let name_tok = self.expect(TokenKind::Identifier, "expected ingress name")?;
        let name = self.ast.push(AstKind::Name, name_tok, Vec::new());
        self.expect(TokenKind::LeftBrace, "expected '{' after ingress name")?;

        let mut children = vec![name];
        self.parse_decl_body(&mut children, false);
        Some(self.ast.push(AstKind::IngressDecl, kw, children))
    }

    fn parse_rule(&mut self) -> Option<u32> {
        let kw = self.advance();
        let name_tok = self.expect(TokenKind::Identifier, "expected rule name")?;
        let name = self.ast.push(AstKind::Name, name_tok, Vec::new());
        self.expect(TokenKind::LeftBrace, "expected '{' after rule name")?;

        let mut children = vec![name];
        self.parse_decl_body(&mut children, true);

        if children.len() - 1 >= MAX_RULE_SECTIONS {
            self.error("too many sections in rule declaration");
        }
        self.check_rule_section_caps(&children[1..], kw);
        Some(self.ast.push(AstKind::RuleDecl, kw, children))
    }

    fn check_rule_section_caps(&mut self, sections: &[u32], kw: u32) {
        let mut match_n = 0u32;
        let mut condition_n = 0u32;
        let mut action_n = 0u32;
        let mut output_n = 0u32;

        for &s in sections {
            match self.ast.kind(s) {
                AstKind::MatchSect => match_n += 1,
                AstKind::ConditionSect => condition_n += 1,
                AstKind::ActionSect => action_n += 1,
                AstKind::OutputSect => output_n += 1,
                _ => {}
            }
        }

        if match_n == 0 {
            let span = TokenSpan::single(kw);
            self.diagnostics
                .push(Diagnostic::new("rule is missing a 'match' section", span));
        } else if match_n > 1 {
            self.error("a rule may have at most one 'match' section");
        }
        if condition_n > 1 {
            self.error("a rule may have at most one 'condition' section");
        }
        if action_n > 1 {
            self.error("a rule may have at most one 'action' section");
        }
        if output_n > 1 {
            self.error("a rule may have at most one 'output' section");
        }
    }

    /// Parses the brace-enclosed list of sections common to `ingress` and
    /// `rule` bodies.
    fn parse_decl_body(&mut self, children: &mut Vec<u32>, _is_rule: bool) {
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::RightBrace | TokenKind::Eof) {
                break;
            }

            let checkpoint = self.ast.len() as u32;
            match self.parse_section() {
                Some(id) => children.push(id),
                None => {
                    self.ast.truncate(checkpoint);
                    self.sync_section();
                }
            }
        }
        self.expect(TokenKind::RightBrace, "expected '}' to close declaration body");
    }

    fn parse_section(&mut self) -> Option<u32> {
        let kind = self.peek();
        if !self.is_section_name(kind) {
            self.error("expected a section name (input, match, condition, output, action, field)");
            return None;
        }
        let kw = self.advance();
        self.expect(TokenKind::Colon, "expected ':' after section name")?;
        self.expect(TokenKind::Newline, "expected a newline after section header")?;

        let is_field_sect = matches!(kind, TokenKind::Field | TokenKind::Input);
        self.access_mode = if kind == TokenKind::Match {
            AccessMode::Query
        } else {
            AccessMode::Eval
        };

        let mut lines = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek(), TokenKind::RightBrace | TokenKind::Eof)
                || self.is_section_name(self.peek())
            {
                break;
            }

            let checkpoint = self.ast.len() as u32;
            let line = if is_field_sect {
                self.parse_field_line()
            } else {
                self.parse_expression(Precedence::Or)
            };

            match line {
                Some(id) => lines.push(id),
                None => {
                    self.ast.truncate(checkpoint);
                    self.sync_list();
                }
            }

            if !matches!(self.peek(), TokenKind::RightBrace | TokenKind::Eof)
                && !self.is_section_name(self.peek())
            {
                self.expect(TokenKind::Newline, "expected a newline after section entry");
            }
        }

        let sect_kind = match kind {
            TokenKind::Input | TokenKind::Field => AstKind::FieldSect,
            TokenKind::Match => AstKind::MatchSect,
            TokenKind::Condition => AstKind::ConditionSect,
            TokenKind::Output => AstKind::OutputSect,
            TokenKind::Action => AstKind::ActionSect,
            TokenKind::Jump => AstKind::JumpSect,
            _ => unreachable!(),
        };
        Some(self.ast.push(sect_kind, kw, lines))
    }

    fn parse_field_line(&mut self) -> Option<u32> {
        let name_tok = self.expect(TokenKind::Identifier, "expected a field name")?;
        let type_kind = match self.peek() {
            TokenKind::LongType => AstKind::LongType,
            TokenKind::StringType => AstKind::StrType,
            TokenKind::BoolType => AstKind::BoolType,
            _ => {
                self.error("expected a field type (long, string or bool)");
                return None;
            }
        };
        let type_tok = self.advance();
        let type_node = self.ast.push(type_kind, type_tok, Vec::new());
        Some(self.ast.push(AstKind::FieldDecl, name_tok, vec![type_node]))
    }

    // ---- Pratt expression parser ----

    fn parse_expression(&mut self, min_prec: Precedence) -> Option<u32> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some((prec, _)) = self.infix_precedence(self.peek()) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            left = self.parse_infix(left)?;
        }

        Some(left)
    }

    fn infix_precedence(&self, kind: TokenKind) -> Option<(Precedence, ())> {
        use TokenKind::*;
        let prec = match kind {
            Or => Precedence::Or,
            And => Precedence::And,
            Exact | Equal | Between | Within | Regex | Eq | Tilde => Precedence::Equality,
            LessThan | GreaterThan => Precedence::Comparison,
            Plus | Minus | Concat => Precedence::Term,
            Star | Slash => Precedence::Factor,
            Joinx => Precedence::CallMinus1,
            Dot | LeftParen => Precedence::Call,
            _ => return None,
        };
        Some((prec, ()))
    }

    fn parse_infix(&mut self, left: u32) -> Option<u32> {
        match self.peek() {
            TokenKind::Dot => self.parse_access(left),
            TokenKind::LeftParen => self.parse_call(left),
            kind => {
                let (prec, _) = self.infix_precedence(kind)?;
                let op_tok = self.advance();
                let right = self.parse_expression(Self::next_precedence(prec))?;
                let ast_kind = Self::binary_kind(kind);
                Some(self.ast.push(ast_kind, op_tok, vec![left, right]))
            }
        }
    }

    fn next_precedence(prec: Precedence) -> Precedence {
        match prec {
            Precedence::None => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::CallMinus1,
            Precedence::CallMinus1 => Precedence::Call,
            Precedence::Call => Precedence::Call,
        }
    }

    fn binary_kind(kind: TokenKind) -> AstKind {
        use TokenKind::*;
        match kind {
            Or => AstKind::Or,
            And => AstKind::And,
            Exact => AstKind::Exact,
            Equal => AstKind::Equal,
            Between => AstKind::Between,
            Within => AstKind::Within,
            Regex => AstKind::RegexOp,
            Eq | Tilde => AstKind::Equality,
            LessThan => AstKind::Lesser,
            GreaterThan => AstKind::Greater,
            Plus => AstKind::Addition,
            Minus => AstKind::Subtract,
            Concat => AstKind::Concat,
            Star => AstKind::Multiply,
            Slash => AstKind::Divide,
            Joinx => AstKind::Joinx,
            _ => unreachable!("not a binary operator token"),
        }
    }

    fn parse_access(&mut self, left: u32) -> Option<u32> {
        let dot_tok = self.advance();
        let member_tok = self.expect(TokenKind::Identifier, "expected a field name after '.'")?;
        let member = self.ast.push(AstKind::Name, member_tok, Vec::new());
        let kind = match self.access_mode {
            AccessMode::Query => AstKind::Qaccess,
            AccessMode::Eval => AstKind::Eaccess,
        };
        Some(self.ast.push(kind, dot_tok, vec![left, member]))
    }

    fn parse_call(&mut self, callee: u32) -> Option<u32> {
        let paren_tok = self.advance();
        let mut children = vec![callee];

        self.skip_newlines();
        if !self.check(TokenKind::RightParen) {
            loop {
                self.skip_newlines();
                let arg = self.parse_expression(Precedence::Or)?;
                children.push(arg);

                if children.len() - 1 > MAX_ARGS {
                    self.error("too many arguments (limit is 65535)");
                }

                self.skip_newlines();
                if self.check(TokenKind::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RightParen, "expected ')' to close call arguments")?;
        Some(self.ast.push(AstKind::Call, paren_tok, children))
    }

    fn parse_prefix(&mut self) -> Option<u32> {
        match self.peek() {
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression(Precedence::Or)?;
                self.expect(TokenKind::RightParen, "expected ')' to close grouping")?;
                Some(inner)
            }
            TokenKind::Not => {
                let tok = self.advance();
                let operand = self.parse_expression(Precedence::Equality)?;
                Some(self.ast.push(AstKind::Not, tok, vec![operand]))
            }
            TokenKind::Number => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Long, tok, Vec::new()))
            }
            TokenKind::Hour => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Hour, tok, Vec::new()))
            }
            TokenKind::Minute => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Minute, tok, Vec::new()))
            }
            TokenKind::Second => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Second, tok, Vec::new()))
            }
            TokenKind::String => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Str, tok, Vec::new()))
            }
            TokenKind::Regexp => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Regexp, tok, Vec::new()))
            }
            TokenKind::True => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::True, tok, Vec::new()))
            }
            TokenKind::False => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::False, tok, Vec::new()))
            }
            TokenKind::Identifier => {
                let tok = self.advance();
                Some(self.ast.push(AstKind::Name, tok, Vec::new()))
            }
            TokenKind::Dollar => {
                self.advance();
                let tok = self.expect(TokenKind::Identifier, "expected an event name after '$'")?;
                Some(self.ast.push(AstKind::Event, tok, Vec::new()))
            }
            _ => {
                self.error("unexpected token in expression position");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse_src(src: &str) -> ParseOutput {
        let tokens = scan(src);
        parse(&tokens)
    }

    #[test]
    fn parses_basic_ingress_and_rule() {
        let src = "ingress data {\nfield:\nage long\n}\nrule r {\nmatch:\n$data.age exact 8\n}\n";
        let out = parse_src(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.ast.kind(Ast::ROOT), AstKind::Root);
        let decls = out.ast.children(Ast::ROOT);
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn ast_token_isomorphism_holds() {
        let src = "rule r {\nmatch:\n$data.age between 5..10\n}\n";
        let out = parse_src(src);
        for id in 0..out.ast.len() as u32 {
            for &child in out.ast.children(id) {
                assert!((child as usize) < out.ast.len());
            }
        }
    }

    #[test]
    fn missing_match_section_is_an_error() {
        let src = "rule r {\ncondition:\ntrue\n}\n";
        let out = parse_src(src);
        assert!(out.diagnostics.iter().any(|d| d.message.contains("match")));
    }

    #[test]
    fn duplicate_match_section_is_an_error() {
        let src = "rule r {\nmatch:\n$data.age exact 1\nmatch:\n$data.age exact 2\n}\n";
        let out = parse_src(src);
        assert!(out
            .diagnostics
            .iter()
            .any(|d| d.message.contains("at most one 'match'")));
    }

    #[test]
    fn recovers_from_bad_token_and_continues() {
        let src = "import @@@\nimport mark\n";
        let out = parse_src(src);
        assert!(!out.diagnostics.is_empty());
        // Recovery should still find the second, well-formed import.
        let decls = out.ast.children(Ast::ROOT);
        assert!(decls
            .iter()
            .any(|&d| out.ast.kind(d) == AstKind::ImportStmt));
    }

    #[test]
    fn dot_access_kind_depends_on_section() {
        let src = "rule r {\nmatch:\n$data.age exact 1\ncondition:\n$data.age == 1\n}\n";
        let out = parse_src(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let mut saw_qaccess = false;
        let mut saw_eaccess = false;
        for id in 0..out.ast.len() as u32 {
            match out.ast.kind(id) {
                AstKind::Qaccess => saw_qaccess = true,
                AstKind::Eaccess => saw_eaccess = true,
                _ => {}
            }
        }
        assert!(saw_qaccess && saw_eaccess);
    }

    #[test]
    fn call_upgrades_trailing_paren() {
        let src = "rule r {\naction:\nmark(\"hello\")\n}\n";
        let out = parse_src(src);
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert!((0..out.ast.len() as u32).any(|id| out.ast.kind(id) == AstKind::Call));
    }
}
