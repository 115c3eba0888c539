use std::iter::FusedIterator;

use log::debug;
use phf::phf_map;

use crate::error::ScanError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

/// Single-pass lexer over a UTF-8 source string.
///
/// Yields `Result<Token, ScanError>` and keeps going after a lexical error,
/// so one pass can surface several of them.  A final `EOF` token is emitted
/// exactly once, then the iterator fuses.
#[derive(Debug, Clone)]
pub struct Scanner<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: usize,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Scan one lexeme.  `Ok(None)` means the lexeme produced no token
    /// (whitespace or a comment).
    fn scan_token(&mut self) -> Result<Option<TokenType>, ScanError> {
        let byte: u8 = self.advance();

        let token_type: TokenType = match byte {
            b'(' => TokenType::LEFT_PAREN,

            b')' => TokenType::RIGHT_PAREN,

            b'{' => TokenType::LEFT_BRACE,

            b'}' => TokenType::RIGHT_BRACE,

            b',' => TokenType::COMMA,

            b'.' => TokenType::DOT,

            b'-' => TokenType::MINUS,

            b'+' => TokenType::PLUS,

            b';' => TokenType::SEMICOLON,

            b'*' => TokenType::STAR,

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' => {
                if self.match_byte(b'/') {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                    return Ok(None);
                }

                TokenType::SLASH
            }

            b'"' => self.scan_string()?,

            b'0'..=b'9' => self.scan_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            _ => {
                debug!(
                    "Unexpected character '{}' at line {}",
                    byte as char, self.line
                );

                return Err(ScanError::new(
                    self.line,
                    format!("Unexpected character: {}", byte as char),
                ));
            }
        };

        Ok(Some(token_type))
    }

    fn scan_string(&mut self) -> Result<TokenType, ScanError> {
        // An unterminated string is reported at the line where it began.
        let opening_line: usize = self.line;

        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return Err(ScanError::new(opening_line, "Unterminated string."));
        }

        self.advance();

        // Quotes are ASCII, so the slice boundaries are valid char boundaries.
        let literal: String = self.source[self.start + 1..self.current - 1].to_string();

        Ok(TokenType::STRING(literal))
    }

    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A trailing '.' is not part of the number.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let number: f64 = self.source[self.start..self.current].parse().unwrap_or(0.0);

        TokenType::NUMBER(number)
    }

    fn scan_identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        let text: &[u8] = &self.bytes[self.start..self.current];

        match KEYWORDS.get(text) {
            Some(token_type) => token_type.clone(),

            None => TokenType::IDENTIFIER,
        }
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        let byte: u8 = self.bytes[self.current];

        self.current += 1;

        byte
    }

    #[inline]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.current] != expected {
            false
        } else {
            self.current += 1;

            true
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.current]
        }
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.len() {
            0
        } else {
            self.bytes[self.current + 1]
        }
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.len()
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_at_end() {
                if self.current == self.len() {
                    self.current += 1;

                    debug!("Reached EOF at line {}", self.line);

                    return Some(Ok(Token::new(TokenType::EOF, String::new(), self.line)));
                }

                return None;
            }

            self.start = self.current;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(token_type)) => {
                    let lexeme: String = self.source[self.start..self.current].to_string();

                    debug!(
                        "Emitting token: type={:?}, lexeme={}, line={}",
                        token_type, lexeme, self.line
                    );

                    return Some(Ok(Token::new(token_type, lexeme, self.line)));
                }

                // Whitespace or a comment, keep scanning.
                Ok(None) => continue,
            }
        }
    }
}

impl FusedIterator for Scanner<'_> {}
