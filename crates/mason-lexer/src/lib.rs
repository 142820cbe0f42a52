//! Mason lexer: converts build-file source text into tokens.

use mason_syntax::error::{lex_err, Result};
use mason_syntax::token::{keyword_kind, Token, TokenKind};

/// Streaming character scanner that produces tokens with 1-based positions.
///
/// Whitespace (space, tab, carriage return) is skipped; newlines are emitted
/// as explicit tokens because the parser uses them as statement separators.
/// `# ...` and `// ...` comments run to end of line.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '/' if self.peek_next() == Some('/') => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_string(&mut self, quote: char, line: usize, column: usize) -> Result<Token> {
        let mut value = String::new();
        while let Some(c) = self.advance() {
            if c == quote {
                return Ok(Token {
                    kind: TokenKind::Str(value.clone()),
                    lexeme: value,
                    line,
                    column,
                });
            }
            if c == '\\' {
                match self.advance() {
                    Some(n) => {
                        let esc = match n {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        };
                        value.push(esc);
                    }
                    None => break,
                }
            } else {
                value.push(c);
            }
        }
        lex_err(line, column, "Unterminated string")
    }

    fn read_number(&mut self, line: usize, column: usize) -> Result<Token> {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let mut is_integer = true;
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            is_integer = false;
            s.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let value: f64 = s
            .parse()
            .map_err(|_| mason_syntax::Error::lexer("Invalid number", line, column))?;
        Ok(Token {
            kind: TokenKind::Number { value, is_integer },
            lexeme: s,
            line,
            column,
        })
    }

    fn read_ident_or_keyword(&mut self, line: usize, column: usize) -> Token {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = keyword_kind(&s).unwrap_or_else(|| TokenKind::Ident(s.clone()));
        Token {
            kind,
            lexeme: s,
            line,
            column,
        }
    }

    fn read_symbol(&mut self, line: usize, column: usize) -> Token {
        self.advance(); // the colon
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Symbol(name.clone()),
            lexeme: name,
            line,
            column,
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    /// Tokenize the entire input into a vector of tokens ending with Eof.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let line = self.line;
            let column = self.column;
            let simple = |kind: TokenKind, lexeme: &str| Token {
                kind,
                lexeme: lexeme.to_string(),
                line,
                column,
            };
            let tk = match self.peek() {
                None => {
                    tokens.push(simple(TokenKind::Eof, ""));
                    break;
                }
                Some('\n') => {
                    self.advance();
                    simple(TokenKind::Newline, "")
                }
                Some(q @ ('"' | '\'')) => {
                    self.advance();
                    self.read_string(q, line, column)?
                }
                Some(c) if c.is_ascii_digit() => self.read_number(line, column)?,
                Some(':') if self.peek_next().map_or(false, Self::is_ident_start) => {
                    self.read_symbol(line, column)
                }
                Some(c) if Self::is_ident_start(c) => self.read_ident_or_keyword(line, column),
                Some(c) => {
                    self.advance();
                    match c {
                        '(' => simple(TokenKind::LParen, "("),
                        ')' => simple(TokenKind::RParen, ")"),
                        '[' => simple(TokenKind::LBracket, "["),
                        ']' => simple(TokenKind::RBracket, "]"),
                        '{' => simple(TokenKind::LBrace, "{"),
                        '}' => simple(TokenKind::RBrace, "}"),
                        ',' => simple(TokenKind::Comma, ","),
                        '.' => simple(TokenKind::Dot, "."),
                        ';' => simple(TokenKind::Semicolon, ";"),
                        ':' => simple(TokenKind::Colon, ":"),
                        '*' => simple(TokenKind::Star, "*"),
                        '/' => simple(TokenKind::Slash, "/"),
                        '%' => simple(TokenKind::Percent, "%"),
                        '+' => {
                            if self.matches('=') {
                                simple(TokenKind::PlusEq, "+=")
                            } else {
                                simple(TokenKind::Plus, "+")
                            }
                        }
                        '-' => {
                            if self.matches('>') {
                                simple(TokenKind::Arrow, "->")
                            } else if self.matches('=') {
                                simple(TokenKind::MinusEq, "-=")
                            } else {
                                simple(TokenKind::Minus, "-")
                            }
                        }
                        '=' => {
                            if self.matches('=') {
                                simple(TokenKind::EqEq, "==")
                            } else if self.matches('>') {
                                simple(TokenKind::FatArrow, "=>")
                            } else {
                                simple(TokenKind::Equal, "=")
                            }
                        }
                        '!' => {
                            if self.matches('=') {
                                simple(TokenKind::NotEq, "!=")
                            } else {
                                simple(TokenKind::Not, "!")
                            }
                        }
                        '<' => {
                            if self.matches('=') {
                                simple(TokenKind::LessEq, "<=")
                            } else {
                                simple(TokenKind::Less, "<")
                            }
                        }
                        '>' => {
                            if self.matches('=') {
                                simple(TokenKind::GreaterEq, ">=")
                            } else {
                                simple(TokenKind::Greater, ">")
                            }
                        }
                        other => {
                            return lex_err(
                                line,
                                column,
                                format!("Unexpected character '{}'", other),
                            );
                        }
                    }
                }
            };
            tokens.push(tk);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().expect("lexing should succeed")
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("project executable library shared_library static_library"),
            vec![
                TokenKind::Project,
                TokenKind::Executable,
                TokenKind::Library,
                TokenKind::SharedLibrary,
                TokenKind::StaticLibrary,
                TokenKind::Eof,
            ]
        );
        // near-keywords stay identifiers
        assert_eq!(
            kinds("projects End iff"),
            vec![
                TokenKind::Ident("projects".into()),
                TokenKind::Ident("End".into()),
                TokenKind::Ident("iff".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literals_and_escapes() {
        assert_eq!(
            kinds(r#""hello" 'world'"#),
            vec![
                TokenKind::Str("hello".into()),
                TokenKind::Str("world".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds(r#""a\tb\nc\\d\"e""#),
            vec![TokenKind::Str("a\tb\nc\\d\"e".into()), TokenKind::Eof]
        );
        // unknown escape drops the backslash
        assert_eq!(
            kinds(r#""a\qb""#),
            vec![TokenKind::Str("aqb".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_reports_start_position() {
        let err = Lexer::new("x = \"oops").tokenize().unwrap_err();
        assert_eq!(err.position(), Some((1, 5)));
        assert!(err.to_string().contains("Unterminated string"));
    }

    #[test]
    fn numbers_track_integer_flag() {
        assert_eq!(
            kinds("42 3.25"),
            vec![
                TokenKind::Number {
                    value: 42.0,
                    is_integer: true
                },
                TokenKind::Number {
                    value: 3.25,
                    is_integer: false
                },
                TokenKind::Eof,
            ]
        );
        // a dot with no digit after it is member access, not a fraction
        assert_eq!(
            kinds("3.x"),
            vec![
                TokenKind::Number {
                    value: 3.0,
                    is_integer: true
                },
                TokenKind::Dot,
                TokenKind::Ident("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn symbols_drop_the_colon() {
        assert_eq!(
            kinds(":cpp :release"),
            vec![
                TokenKind::Symbol("cpp".into()),
                TokenKind::Symbol("release".into()),
                TokenKind::Eof,
            ]
        );
        // a bare colon stays a delimiter
        assert_eq!(
            kinds("{ 1 : 2 }"),
            vec![
                TokenKind::LBrace,
                TokenKind::Number {
                    value: 1.0,
                    is_integer: true
                },
                TokenKind::Colon,
                TokenKind::Number {
                    value: 2.0,
                    is_integer: true
                },
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn multi_char_operators_are_greedy() {
        assert_eq!(
            kinds("== != <= >= += -= -> => = < > + -"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LessEq,
                TokenKind::GreaterEq,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::Arrow,
                TokenKind::FatArrow,
                TokenKind::Equal,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn bang_is_not() {
        assert_eq!(
            kinds("!x"),
            vec![TokenKind::Not, TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("a # trailing words\nb // more\nc"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Newline,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_are_explicit_tokens() {
        assert_eq!(
            kinds("a\n\nb"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = lex("ab cd\n  ef");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 4));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 3));
        for t in &tokens {
            assert!(t.line >= 1 && t.column >= 1);
        }
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let err = Lexer::new("a @ b").tokenize().unwrap_err();
        assert!(err.to_string().contains("Unexpected character '@'"));
        assert_eq!(err.position(), Some((1, 3)));
    }

    #[test]
    fn lexemes_reproduce_the_source_text() {
        let src = "flags += [\"-Wall\", \"-O2\"]";
        let joined: String = lex(src).iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(joined, "flags+=[-Wall,-O2]");
    }
}
