//! Kai Parser Component
//!
//! Provides the lexer, the S-expression reader and the lowering of special
//! forms into the [`Expr`] tree the evaluator walks.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes Kai source code
//! - [`Token`] - Parentheses, quote, literals and symbols
//! - [`Parser`] - Reads balanced forms into positioned [`Syntax`] trees
//! - [`Lowerer`] - Recognizes special forms and interns symbols
//!
//! # Example
//!
//! ```
//! use core_types::{Expr, SymbolTable};
//! use parser::parse_program;
//!
//! let mut symbols = SymbolTable::new();
//! let program = parse_program("(define y 1) (f 5)", &mut symbols).unwrap();
//!
//! assert_eq!(program.len(), 2);
//! assert!(matches!(program[0], Expr::Define { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod lexer;
pub mod lower;
pub mod parser;

use core_types::{Expr, SymbolTable};

pub use error::ParseError;
pub use lexer::{Lexer, Token};
pub use lower::{Lowerer, SPECIAL_FORMS};
pub use parser::{Parser, Syntax, SyntaxKind};

/// Read and lower every top-level form of `source`
pub fn parse_program(source: &str, symbols: &mut SymbolTable) -> Result<Vec<Expr>, ParseError> {
    let forms = Parser::new(source).read_all()?;
    Lowerer::new(symbols).lower_all(&forms)
}
