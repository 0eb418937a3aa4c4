//! Tarn lexer: converts source text into tokens.

use tarn_syntax::error::{error_at, Result};
use tarn_syntax::token::{Token, TokenKind};

/// Streaming character scanner that produces tokens carrying their literal
/// text and character offset.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
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
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Builds a token whose literal is the consumed span `start..pos`, which
    /// keeps every token's literal equal to the source substring at its
    /// offset.
    fn emit(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            literal: self.src[start..self.pos].iter().collect(),
            offset: start,
        }
    }

    /// Skips whitespace and the escape-like leaders `\b \n \r \t`, none of
    /// which produce tokens.
    fn skip_blank(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\n') | Some('\r') => {
                    self.advance();
                }
                Some('\\') if matches!(self.peek_next(), Some('b' | 'n' | 'r' | 't')) => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_blank();
            if self.peek().is_none() {
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    /// Lexes a single token; the caller has already skipped whitespace.
    pub fn next_token(&mut self) -> Result<Token> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '@' => Ok(self.read_identifier(start)),
            Some(c) if c.is_ascii_digit() => self.read_number(start),
            // a '-' belongs to a number only when a digit follows directly
            Some('-') if matches!(self.peek_next(), Some(d) if d.is_ascii_digit()) => {
                self.read_number(start)
            }
            Some('\'') => self.read_character(start),
            Some('"') => self.read_string(start),
            Some(_) => self.read_operator(start),
            None => error_at(self.pos, "unexpected end of input"),
        }
    }

    fn read_identifier(&mut self, start: usize) -> Token {
        self.advance();
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            self.advance();
        }
        self.emit(TokenKind::Identifier, start)
    }

    /// Numbers: optional leading `-`, then either a lone `0` or a nonzero
    /// digit followed by digits, then an optional fraction. `007` therefore
    /// stops after the first `0`, and a trailing `.` with no digit after it
    /// is left for the operator rule.
    fn read_number(&mut self, start: usize) -> Result<Token> {
        let negative = self.peek() == Some('-');
        if negative {
            self.advance();
        }
        let zero_led = self.peek() == Some('0');
        if zero_led {
            self.advance();
        } else {
            match self.peek() {
                Some(c) if ('1'..='9').contains(&c) => {
                    self.advance();
                }
                _ => return error_at(self.pos, "expected a digit"),
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
            return Ok(self.emit(TokenKind::Decimal, start));
        }
        if negative && zero_led {
            return error_at(self.pos, "negative zero is not a number");
        }
        Ok(self.emit(TokenKind::Integer, start))
    }

    fn read_character(&mut self, start: usize) -> Result<Token> {
        self.advance();
        match self.peek() {
            None => return error_at(self.pos, "unterminated character literal"),
            Some('\'') => return error_at(self.pos, "empty character literal"),
            Some('\n') => return error_at(self.pos, "newline in character literal"),
            Some('\\') => {
                self.advance();
                match self.peek() {
                    Some('b' | 'n' | 'r' | 't' | '\'' | '"' | '\\') => {
                        self.advance();
                    }
                    _ => return error_at(self.pos, "invalid escape sequence"),
                }
            }
            Some(_) => {
                self.advance();
            }
        }
        if self.peek() == Some('\'') {
            self.advance();
            Ok(self.emit(TokenKind::Character, start))
        } else {
            error_at(self.pos, "expected a closing single quote")
        }
    }

    fn read_string(&mut self, start: usize) -> Result<Token> {
        self.advance();
        loop {
            match self.peek() {
                None => return error_at(self.pos, "unterminated string literal"),
                Some('"') => {
                    self.advance();
                    return Ok(self.emit(TokenKind::String, start));
                }
                Some('\n') => return error_at(self.pos, "newline in string literal"),
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('b' | 'n' | 'r' | 't' | '\'' | '"' | '\\') => {
                            self.advance();
                        }
                        _ => return error_at(self.pos, "invalid escape sequence"),
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Operators: greedily forms `== != <= >= && ||`, otherwise emits one
    /// punctuation character on its own.
    fn read_operator(&mut self, start: usize) -> Result<Token> {
        const SINGLE: &str = "+-*/%^?<>!=&|()[]{};:,.";
        let c = match self.peek() {
            Some(c) => c,
            None => return error_at(self.pos, "unexpected end of input"),
        };
        let two = matches!(
            (c, self.peek_next()),
            ('=', Some('='))
                | ('!', Some('='))
                | ('<', Some('='))
                | ('>', Some('='))
                | ('&', Some('&'))
                | ('|', Some('|'))
        );
        if two {
            self.advance();
            self.advance();
            return Ok(self.emit(TokenKind::Operator, start));
        }
        if SINGLE.contains(c) {
            self.advance();
            return Ok(self.emit(TokenKind::Operator, start));
        }
        error_at(self.pos, format!("unexpected character '{}'", c))
    }
}
