//! Reader - builds positioned syntax trees from tokens
//!
//! The reader knows nothing about special forms; it only balances
//! parentheses and expands `'x` into `(quote x)`. Lowering happens in
//! [`crate::lower`].

use std::fmt;
use std::mem;

use core_types::SourcePosition;

use crate::error::ParseError;
use crate::lexer::{Lexer, Token};

/// An atom or list read from source, with the position it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    /// What was read
    pub kind: SyntaxKind,
    /// Where it starts
    pub position: SourcePosition,
}

/// Shape of a [`Syntax`] node
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxKind {
    /// Integer atom
    Integer(i64),
    /// Real atom
    Real(f64),
    /// String atom
    String(String),
    /// Symbol atom, including `nil`, `true` and `false`
    Symbol(String),
    /// Parenthesized list
    List(Vec<Syntax>),
}

impl Syntax {
    /// The symbol name, if this node is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            SyntaxKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// The elements, if this node is a list
    pub fn as_list(&self) -> Option<&[Syntax]> {
        match &self.kind {
            SyntaxKind::List(items) => Some(items),
            _ => None,
        }
    }

    fn take_items(&mut self) -> Vec<Syntax> {
        match &mut self.kind {
            SyntaxKind::List(items) => mem::take(items),
            _ => Vec::new(),
        }
    }
}

impl Drop for Syntax {
    fn drop(&mut self) {
        let mut pending = self.take_items();
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.take_items());
        }
    }
}

// Rendering and lowering nest with the tree; both grow the stack on demand.
pub(crate) const RED_ZONE: usize = 64 * 1024;
pub(crate) const STACK_PER_RECURSION: usize = 1024 * 1024;

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SyntaxKind::Integer(n) => write!(f, "{}", n),
            SyntaxKind::Real(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            SyntaxKind::String(s) => write!(f, "{:?}", s),
            SyntaxKind::Symbol(name) => f.write_str(name),
            SyntaxKind::List(items) => {
                f.write_str("(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
                        write!(f, "{}", item)
                    })?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Reader over a source string
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Create a reader for `source`
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Read every top-level form
    ///
    /// # Examples
    ///
    /// ```
    /// use parser::Parser;
    ///
    /// let forms = Parser::new("(define x 1) 'x").read_all().unwrap();
    /// assert_eq!(forms.len(), 2);
    /// assert_eq!(forms[1].to_string(), "(quote x)");
    /// ```
    pub fn read_all(&mut self) -> Result<Vec<Syntax>, ParseError> {
        let mut forms = Vec::new();
        while let Some(form) = self.read()? {
            forms.push(form);
        }
        Ok(forms)
    }

    /// Read the next top-level form, `None` at end of input
    pub fn read(&mut self) -> Result<Option<Syntax>, ParseError> {
        if self.lexer.peek_token()? == &Token::EOF {
            return Ok(None);
        }
        let (token, position) = self.lexer.next_token()?;
        self.read_from(token, position).map(Some)
    }

    /// Read one form whose first token has already been taken.
    ///
    /// Lists are built with an explicit stack so deeply nested input cannot
    /// overflow the native stack.
    fn read_from(
        &mut self,
        token: Token,
        position: SourcePosition,
    ) -> Result<Syntax, ParseError> {
        // Each open list (or pending quote) with the position it started at
        let mut open: Vec<(Pending, SourcePosition)> = Vec::new();
        let mut token = token;
        let mut position = position;

        loop {
            let mut finished = match token {
                Token::LParen => {
                    open.push((Pending::List(Vec::new()), position));
                    None
                }
                Token::Quote => {
                    open.push((Pending::Quote, position));
                    None
                }
                Token::RParen => match open.pop() {
                    Some((Pending::List(items), start)) => Some(Syntax {
                        kind: SyntaxKind::List(items),
                        position: start,
                    }),
                    Some((Pending::Quote, start)) => {
                        return Err(ParseError::UnexpectedEof { position: start })
                    }
                    None => return Err(ParseError::UnbalancedClose { position }),
                },
                Token::EOF => {
                    let start = open.last().map_or(position, |(_, start)| *start);
                    return Err(ParseError::UnexpectedEof { position: start });
                }
                Token::Integer(n) => Some(atom(SyntaxKind::Integer(n), position)),
                Token::Real(n) => Some(atom(SyntaxKind::Real(n), position)),
                Token::String(s) => Some(atom(SyntaxKind::String(s), position)),
                Token::Symbol(s) => Some(atom(SyntaxKind::Symbol(s), position)),
            };

            // Hand a finished form to its enclosing list, wrapping quotes
            while let Some(form) = finished.take() {
                match open.last_mut() {
                    None => return Ok(form),
                    Some((Pending::List(items), _)) => items.push(form),
                    Some((Pending::Quote, start)) => {
                        let start = *start;
                        open.pop();
                        finished = Some(Syntax {
                            kind: SyntaxKind::List(vec![
                                atom(SyntaxKind::Symbol("quote".into()), start),
                                form,
                            ]),
                            position: start,
                        });
                    }
                }
            }

            let (next, next_position) = self.lexer.next_token()?;
            token = next;
            position = next_position;
        }
    }
}

enum Pending {
    List(Vec<Syntax>),
    Quote,
}

fn atom(kind: SyntaxKind, position: SourcePosition) -> Syntax {
    Syntax { kind, position }
}
