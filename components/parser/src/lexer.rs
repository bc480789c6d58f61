//! Kai lexer - tokenizes S-expression source into tokens

use core_types::SourcePosition;

use crate::error::ParseError;

/// Kai token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `'`, shorthand for `(quote ...)`
    Quote,
    /// Integer literal
    Integer(i64),
    /// Real literal
    Real(f64),
    /// String literal, escapes already decoded
    String(String),
    /// Any other atom
    Symbol(String),
    /// End of input
    EOF,
}

/// Lexer for Kai source code
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    current_token: Option<(Token, SourcePosition)>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            current_token: None,
        }
    }

    /// The source text being tokenized
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get the next token along with the position it starts at
    pub fn next_token(&mut self) -> Result<(Token, SourcePosition), ParseError> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> Result<&Token, ParseError> {
        let token = match self.current_token.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(&self.current_token.insert(token).0)
    }

    fn scan_token(&mut self) -> Result<(Token, SourcePosition), ParseError> {
        self.skip_whitespace_and_comments();

        let start = self.current_position();
        if self.is_at_end() {
            return Ok((Token::EOF, start));
        }

        let token = match self.peek() {
            '(' => {
                self.advance();
                Token::LParen
            }
            ')' => {
                self.advance();
                Token::RParen
            }
            '\'' => {
                self.advance();
                Token::Quote
            }
            '"' => self.scan_string(start)?,
            _ => self.scan_atom(start)?,
        };
        Ok((token, start))
    }

    fn scan_string(&mut self, start: SourcePosition) -> Result<Token, ParseError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            if self.is_at_end() {
                return Err(ParseError::UnterminatedString { position: start });
            }
            let escape_position = self.current_position();
            match self.advance() {
                '"' => return Ok(Token::String(text)),
                '\\' => {
                    if self.is_at_end() {
                        return Err(ParseError::UnterminatedString { position: start });
                    }
                    match self.advance() {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        ch => {
                            return Err(ParseError::InvalidEscape {
                                ch,
                                position: escape_position,
                            })
                        }
                    }
                }
                ch => text.push(ch),
            }
        }
    }

    fn scan_atom(&mut self, start: SourcePosition) -> Result<Token, ParseError> {
        let mut text = String::new();
        while !self.is_at_end() && !is_delimiter(self.peek()) {
            text.push(self.advance());
        }
        if text.is_empty() {
            return Err(ParseError::UnexpectedChar {
                ch: self.peek(),
                position: start,
            });
        }
        classify_atom(text, start)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ';' => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                ch if ch.is_whitespace() => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '(' | ')' | '\'' | '"' | ';')
}

/// Decide whether an atom is a number or a symbol.
///
/// An atom is numeric when it starts with a digit, optionally after a sign
/// or a leading dot, so `+`, `-` and `inf` stay symbols.
fn classify_atom(text: String, start: SourcePosition) -> Result<Token, ParseError> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(&text);
    let numeric = match unsigned.as_bytes() {
        [first, ..] if first.is_ascii_digit() => true,
        [b'.', second, ..] => second.is_ascii_digit(),
        _ => false,
    };
    if !numeric {
        return Ok(Token::Symbol(text));
    }

    if unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return match text.parse::<i64>() {
            Ok(n) => Ok(Token::Integer(n)),
            Err(_) => Err(ParseError::InvalidNumber {
                text,
                position: start,
            }),
        };
    }
    match text.parse::<f64>() {
        Ok(n) => Ok(Token::Real(n)),
        Err(_) => Err(ParseError::InvalidNumber {
            text,
            position: start,
        }),
    }
}
