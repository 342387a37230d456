//! Token kinds and the owned token stream produced by the scanner.

use jary_base::Span;

/// Every lexical category the scanner can produce.
///
/// Variants partition into punctuation, operator symbols, keywords
/// (section names and declarators), literal classes, identifiers,
/// end-of-input, and the two error kinds `Err`/`ErrStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Unknown byte.
    Err,
    /// Unterminated string literal.
    ErrStr,

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Dot,
    Comma,
    Colon,
    Newline,
    Spaces,

    Caret,
    Qmark,
    Vertbar,
    Backslash,

    // Declarators
    Rule,
    Import,
    Include,
    Ingress,

    // Section names
    Jump,
    Output,
    Input,
    Match,
    Condition,
    Field,
    Action,

    // Field types
    LongType,
    StringType,
    BoolType,

    // Operator symbols
    Tilde,
    Concat,
    Minus,
    Plus,
    Star,
    Slash,
    Comment,

    Joinx,
    Exact,
    Equal,

    Eq,
    LessThan,
    GreaterThan,
    And,
    Or,
    Not,
    Any,
    All,

    Within,
    Between,
    Regex,

    // Literals
    Regexp,
    String,
    Number,
    False,
    True,
    Hour,
    Minute,
    Second,

    Identifier,
    Dollar,
    Alias,

    Eof,
}

/// `{kind, line, column, lexeme_slice}`. `lexeme` is an owned
/// copy of the matched source text rather than a borrow, so the token
/// stream can outlive the source buffer the scanner ran over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, line: u32, column: u32, lexeme: String, span: Span) -> Self {
        Self {
            kind,
            line,
            column,
            lexeme,
            span,
        }
    }
}

/// Matches an identifier against the fixed keyword set.
/// Identifiers that miss every keyword remain `TokenKind::Identifier`.
pub fn keyword_kind(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "rule" => Rule,
        "import" => Import,
        "include" => Include,
        "ingress" => Ingress,

        "jump" => Jump,
        "output" => Output,
        "input" => Input,
        "match" => Match,
        "condition" => Condition,
        "field" => Field,
        "action" => Action,

        "long" => LongType,
        "string" => StringType,
        "bool" => BoolType,

        "join" => Joinx,
        "exact" => Exact,
        "equal" => Equal,
        "within" => Within,
        "between" => Between,
        "regex" => Regex,

        "and" => And,
        "or" => Or,
        "not" => Not,
        "any" => Any,
        "all" => All,

        "false" => False,
        "true" => True,

        "as" => Alias,

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_kind_recognizes_section_names() {
        assert_eq!(keyword_kind("match"), Some(TokenKind::Match));
        assert_eq!(keyword_kind("condition"), Some(TokenKind::Condition));
        assert_eq!(keyword_kind("output"), Some(TokenKind::Output));
        assert_eq!(keyword_kind("action"), Some(TokenKind::Action));
        assert_eq!(keyword_kind("field"), Some(TokenKind::Field));
    }

    #[test]
    fn keyword_kind_rejects_plain_identifiers() {
        assert_eq!(keyword_kind("age"), None);
        assert_eq!(keyword_kind("data"), None);
    }
}
