//! Hand-written scanner for the nginx-style directive grammar (spec §6).
//!
//! Structurally the same `Peekable<Chars>` walk the donor's YAML lexer used
//! (`src/lexer/mod.rs`): line/col tracking, quoted-string and bare-word/number
//! scanning, `#` comments. Indentation-sensitivity is gone; brace and
//! semicolon tokens take its place.

use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Word(String),
    StringLit(String),
    Number(u64),
    LBrace,
    RBrace,
    Semicolon,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(s) => write!(f, "{s}"),
            TokenKind::StringLit(s) => write!(f, "\"{s}\""),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Semicolon => write!(f, ";"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Loc {
    pub line: usize,
    pub col: usize,
}

impl Display for Loc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' at {}", self.kind, self.loc)
    }
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input: input.chars().peekable(), line: 1, col: 1 }
    }

    fn advance(&mut self) {
        if let Some(c) = self.input.next() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn peek(&mut self) -> Option<&char> {
        self.input.peek()
    }

    fn current_loc(&self) -> Loc {
        Loc { line: self.line, col: self.col }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
                continue;
            }

            if c == '#' {
                self.skip_comment();
                continue;
            }

            let loc = self.current_loc();

            match c {
                '{' => {
                    tokens.push(Token { kind: TokenKind::LBrace, loc });
                    self.advance();
                }
                '}' => {
                    tokens.push(Token { kind: TokenKind::RBrace, loc });
                    self.advance();
                }
                ';' => {
                    tokens.push(Token { kind: TokenKind::Semicolon, loc });
                    self.advance();
                }
                q if q == '"' || q == '\'' => self.handle_quoted_string(&mut tokens, loc, q),
                _ => self.handle_word_or_number(&mut tokens, loc)?,
            }
        }

        Ok(tokens)
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn handle_quoted_string(&mut self, tokens: &mut Vec<Token>, loc: Loc, quote_char: char) {
        self.advance(); // opening quote
        let mut val = String::new();

        while let Some(&c) = self.peek() {
            if c == quote_char {
                self.advance();
                break;
            }
            val.push(c);
            self.advance();
        }

        tokens.push(Token { kind: TokenKind::StringLit(val), loc });
    }

    fn handle_word_or_number(&mut self, tokens: &mut Vec<Token>, loc: Loc) -> Result<(), String> {
        let mut val = String::new();

        while let Some(&c) = self.peek() {
            if c.is_whitespace() || "{};\"'#".contains(c) {
                break;
            }
            val.push(c);
            self.advance();
        }

        if val.is_empty() {
            let c = *self.peek().unwrap();
            return Err(format!("unexpected character '{}' at line {}, col {}", c, self.line, self.col));
        }

        if let Ok(num) = val.parse::<u64>() {
            tokens.push(Token { kind: TokenKind::Number(num), loc });
        } else {
            tokens.push(Token { kind: TokenKind::Word(val), loc });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_server_block() {
        let src = "http {\n  server {\n    listen 8080;\n    host \"127.0.0.1\";\n  }\n}\n";
        let tokens = Lexer::new(src).tokenize().unwrap();
        let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &TokenKind::Word("http".into()),
                &TokenKind::LBrace,
                &TokenKind::Word("server".into()),
                &TokenKind::LBrace,
                &TokenKind::Word("listen".into()),
                &TokenKind::Number(8080),
                &TokenKind::Semicolon,
                &TokenKind::Word("host".into()),
                &TokenKind::StringLit("127.0.0.1".into()),
                &TokenKind::Semicolon,
                &TokenKind::RBrace,
                &TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        let src = "listen 80; # the main port\n";
        let tokens = Lexer::new(src).tokenize().unwrap();
        assert_eq!(tokens.len(), 3);
    }
}
