//! Byte-stream scanner.
//!
//! [`scan_one`] is the pure core: `(slice) → (consumed,
//! kind)`, stateless between calls. [`Scanner`] is the thin stateful
//! wrapper that drives it over a whole source buffer, tracking line and
//! column by inspecting the bytes each call consumed.

use crate::token::{keyword_kind, Token, TokenKind};
use jary_base::Span;

/// Scans exactly one token starting at `input[0]`. Returns the number of
/// bytes consumed and the resulting kind. Never panics: an empty slice
/// yields `(0, TokenKind::Eof)`, and unrecognized bytes yield
/// `(1, TokenKind::Err)` rather than aborting.
pub fn scan_one(input: &[u8]) -> (usize, TokenKind) {
    if input.is_empty() {
        return (0, TokenKind::Eof);
    }

    let c = input[0];

    match c {
        b' ' | b'\r' | b'\t' => {
            let mut n = 1;
            while n < input.len() && matches!(input[n], b' ' | b'\r' | b'\t') {
                n += 1;
            }
            (n, TokenKind::Spaces)
        }
        b'\n' => {
            let mut n = 1;
            while n < input.len() && input[n] == b'\n' {
                n += 1;
            }
            (n, TokenKind::Newline)
        }
        b'(' => (1, TokenKind::LeftParen),
        b')' => (1, TokenKind::RightParen),
        b'{' => (1, TokenKind::LeftBrace),
        b'}' => (1, TokenKind::RightBrace),
        b'[' => (1, TokenKind::LeftBracket),
        b']' => (1, TokenKind::RightBracket),
        b',' => (1, TokenKind::Comma),
        b':' => (1, TokenKind::Colon),
        b'^' => (1, TokenKind::Caret),
        b'?' => (1, TokenKind::Qmark),
        b'|' => (1, TokenKind::Vertbar),
        b'\\' => (1, TokenKind::Backslash),
        b'~' => (1, TokenKind::Tilde),
        b'-' => (1, TokenKind::Minus),
        b'+' => (1, TokenKind::Plus),
        b'*' => (1, TokenKind::Star),
        b'<' => (1, TokenKind::LessThan),
        b'>' => (1, TokenKind::GreaterThan),
        b'$' => (1, TokenKind::Dollar),

        b'.' => {
            if input.get(1) == Some(&b'.') {
                (2, TokenKind::Concat)
            } else {
                (1, TokenKind::Dot)
            }
        }
        b'=' => {
            if input.get(1) == Some(&b'=') {
                (2, TokenKind::Eq)
            } else {
                (1, TokenKind::Err)
            }
        }
        b'/' => scan_slash(input),
        b'"' => scan_string(input),
        b'0'..=b'9' => scan_number(input),
        c if c == b'_' || c.is_ascii_alphabetic() => scan_word(input),
        _ => (1, TokenKind::Err),
    }
}

fn scan_slash(input: &[u8]) -> (usize, TokenKind) {
    if input.first() != Some(&b'/') {
        unreachable!("scan_slash called without leading '/'");
    }
    if input.get(1) == Some(&b'/') {
        let mut n = 2;
        while n < input.len() && input[n] != b'\n' {
            n += 1;
        }
        return (n, TokenKind::Comment);
    }

    // Try to scan a /regex/ literal; a lone slash (no closing delimiter on
    // the same line) falls back to TokenKind::Slash.
    let mut n = 1;
    while n < input.len() && input[n] != b'\n' {
        if input[n] == b'\\' && n + 1 < input.len() {
            n += 2;
            continue;
        }
        if input[n] == b'/' {
            return (n + 1, TokenKind::Regexp);
        }
        n += 1;
    }

    (1, TokenKind::Slash)
}

fn scan_string(input: &[u8]) -> (usize, TokenKind) {
    let mut n = 1;
    while n < input.len() {
        match input[n] {
            b'"' => return (n + 1, TokenKind::String),
            b'\\' if n + 1 < input.len() => n += 2,
            b'\n' => return (n, TokenKind::ErrStr),
            _ => n += 1,
        }
    }
    (n, TokenKind::ErrStr)
}

fn scan_number(input: &[u8]) -> (usize, TokenKind) {
    let mut n = 0;
    while n < input.len() && input[n].is_ascii_digit() {
        n += 1;
    }

    match input.get(n) {
        Some(b'h') => (n + 1, TokenKind::Hour),
        Some(b'm') => (n + 1, TokenKind::Minute),
        Some(b's') => (n + 1, TokenKind::Second),
        _ => (n, TokenKind::Number),
    }
}

fn scan_word(input: &[u8]) -> (usize, TokenKind) {
    let mut n = 0;
    while n < input.len() && (input[n] == b'_' || input[n].is_ascii_alphanumeric()) {
        n += 1;
    }

    let word = std::str::from_utf8(&input[..n]).unwrap_or("");
    match keyword_kind(word) {
        Some(TokenKind::True) => (n, TokenKind::True),
        Some(kind) => (n, kind),
        None if word == "true" => (n, TokenKind::True),
        None if word == "false" => (n, TokenKind::False),
        None => (n, TokenKind::Identifier),
    }
}

/// Drives [`scan_one`] over a whole source buffer, producing an owned
/// token stream with line/column positions.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans the whole buffer into a token stream, always ending with one
    /// `TokenKind::Eof` token.
    pub fn scan_all(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let (consumed, kind) = scan_one(&self.bytes[self.pos..]);
        let end = start + consumed;
        let lexeme = self.source[start..end].to_string();
        let (line, column) = (self.line, self.column);

        for &b in &self.bytes[start..end] {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;

        Token::new(kind, line, column, lexeme, Span::new(start, end))
    }
}

/// Scans source and returns every token, including structural
/// `Spaces`/`Newline`/`Comment` tokens the parser will skip.
pub fn scan(source: &str) -> Vec<Token> {
    Scanner::new(source).scan_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_stream_completeness() {
        let src = "ingress data {\n  field:\n    age long\n}\n";
        let tokens = scan(src);
        let rebuilt: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn scans_eq_vs_bare_equals() {
        let (n, k) = scan_one(b"==");
        assert_eq!((n, k), (2, TokenKind::Eq));
        let (n, k) = scan_one(b"=x");
        assert_eq!((n, k), (1, TokenKind::Err));
    }

    #[test]
    fn scans_concat_vs_dot() {
        assert_eq!(scan_one(b".."), (2, TokenKind::Concat));
        assert_eq!(scan_one(b".x"), (1, TokenKind::Dot));
    }

    #[test]
    fn scans_time_suffixed_numbers() {
        assert_eq!(scan_one(b"1h"), (2, TokenKind::Hour));
        assert_eq!(scan_one(b"30m"), (3, TokenKind::Minute));
        assert_eq!(scan_one(b"5s"), (2, TokenKind::Second));
        assert_eq!(scan_one(b"42"), (2, TokenKind::Number));
    }

    #[test]
    fn scans_regex_literal_with_escape() {
        let (n, k) = scan_one(br"/a\/b/ rest");
        assert_eq!(k, TokenKind::Regexp);
        assert_eq!(n, 6);
    }

    #[test]
    fn lone_slash_is_not_a_regex() {
        let (n, k) = scan_one(b"3 / 2");
        assert_eq!((n, k), (1, TokenKind::Slash));
    }

    #[test]
    fn unterminated_string_is_err_str() {
        let (_, k) = scan_one(b"\"unterminated");
        assert_eq!(k, TokenKind::ErrStr);
    }

    #[test]
    fn unknown_byte_is_err_token_not_abort() {
        let (n, k) = scan_one(b"@");
        assert_eq!((n, k), (1, TokenKind::Err));
    }

    #[test]
    fn identifiers_fall_back_from_keywords() {
        assert_eq!(scan_one(b"age"), (3, TokenKind::Identifier));
        assert_eq!(scan_one(b"match"), (5, TokenKind::Match));
        assert_eq!(scan_one(b"exact"), (5, TokenKind::Exact));
    }

    #[test]
    fn whitespace_runs_coalesce() {
        assert_eq!(scan_one(b"   \tx"), (4, TokenKind::Spaces));
        assert_eq!(scan_one(b"\n\n\nx"), (3, TokenKind::Newline));
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let (n, k) = scan_one(b"// a comment\nnext");
        assert_eq!(k, TokenKind::Comment);
        assert_eq!(n, 12);
    }
}
