//! The parsed expression tree.
//!
//! The parser lowers S-expressions into [`Expr`]; special forms are resolved
//! at that point, so the evaluator matches them before general application
//! without looking at symbol names.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{ErrorKind, Symbol};

/// A self-evaluating constant
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `nil`
    Nil,
    /// `true` / `false`
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Real literal
    Real(f64),
    /// String literal; a fresh heap string is allocated per evaluation
    String(Arc<str>),
}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Nil => {}
            Literal::Boolean(b) => b.hash(state),
            Literal::Integer(n) => n.hash(state),
            Literal::Real(n) => n.to_bits().hash(state),
            Literal::String(s) => s.hash(state),
        }
    }
}

/// Quoted data, turned into values by `quote`
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum Datum {
    /// A constant
    Literal(Literal),
    /// A symbol
    Symbol(Symbol),
    /// A proper list; becomes a chain of cells ending in nil
    List(Vec<Datum>),
}

/// The code of a `lambda`, shared by every closure created from it
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct LambdaExpr {
    /// Name given by `(define (name ...) ...)`, used in error stacks
    pub name: Option<Symbol>,
    /// Positional parameters
    pub params: Vec<Symbol>,
    /// Body expressions; the last one is the result
    pub body: Vec<Expr>,
}

/// One `catch` clause of a `try`
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct CatchClause {
    /// Kinds handled by this clause; empty handles every recoverable kind
    pub kinds: Vec<ErrorKind>,
    /// Name bound to the error table inside the handler
    pub binding: Symbol,
    /// Handler body
    pub body: Vec<Expr>,
}

impl CatchClause {
    /// Whether this clause intercepts errors of `kind`
    pub fn handles(&self, kind: ErrorKind) -> bool {
        kind.is_recoverable() && (self.kinds.is_empty() || self.kinds.contains(&kind))
    }
}

/// A node of the parsed tree
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum Expr {
    /// Constant
    Literal(Literal),
    /// Variable reference
    Symbol(Symbol),
    /// `(quote d)`
    Quote(Datum),
    /// `(if c t e)`
    If {
        /// Condition
        condition: Box<Expr>,
        /// Taken when the condition is truthy
        then_branch: Box<Expr>,
        /// Taken otherwise; nil when absent
        else_branch: Option<Box<Expr>>,
    },
    /// `(define name value)`
    Define {
        /// Bound name
        name: Symbol,
        /// Initial value
        value: Box<Expr>,
    },
    /// `(set! name value)`
    Assign {
        /// Existing binding to mutate
        name: Symbol,
        /// New value
        value: Box<Expr>,
    },
    /// `(lambda (params) body)`
    Lambda(Arc<LambdaExpr>),
    /// `(let ((name value) ...) body)`
    Let {
        /// Bindings evaluated in order inside the new frame
        bindings: Vec<(Symbol, Expr)>,
        /// Body
        body: Vec<Expr>,
    },
    /// `(block body...)`
    Block(Vec<Expr>),
    /// `(return value)`
    Return(Box<Expr>),
    /// `(and ...)`
    And(Vec<Expr>),
    /// `(or ...)`
    Or(Vec<Expr>),
    /// `(raise value)`
    Raise(Box<Expr>),
    /// `(try body clauses...)`
    Try {
        /// Protected expression
        body: Box<Expr>,
        /// Handlers, tried in order
        handlers: Vec<CatchClause>,
    },
    /// `(require name)`
    Require(Symbol),
    /// `(this-frame)`
    CurrentFrame,
    /// Function application
    Call {
        /// Operator position
        operator: Box<Expr>,
        /// Argument positions, evaluated left to right
        arguments: Vec<Expr>,
    },
}

impl Expr {
    /// Application of `operator` to `arguments`
    pub fn call(operator: Expr, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            operator: Box::new(operator),
            arguments,
        }
    }

    /// Integer constant
    pub fn integer(n: i64) -> Self {
        Expr::Literal(Literal::Integer(n))
    }

    /// Whether this node has no subexpressions
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Expr::Literal(_) | Expr::Symbol(_) | Expr::Quote(_) | Expr::Require(_) | Expr::CurrentFrame
        )
    }

    /// Visit the direct subexpressions, lambda bodies and handlers included
    pub fn for_each_child<'a>(&'a self, mut visit: impl FnMut(&'a Expr)) {
        match self {
            Expr::Literal(_)
            | Expr::Symbol(_)
            | Expr::Quote(_)
            | Expr::Require(_)
            | Expr::CurrentFrame => {}
            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => {
                visit(&**condition);
                visit(&**then_branch);
                if let Some(else_branch) = else_branch {
                    visit(&**else_branch);
                }
            }
            Expr::Define { value, .. }
            | Expr::Assign { value, .. }
            | Expr::Return(value)
            | Expr::Raise(value) => visit(&**value),
            Expr::Lambda(code) => code.body.iter().for_each(visit),
            Expr::Let { bindings, body } => {
                for (_, value) in bindings {
                    visit(value);
                }
                body.iter().for_each(visit);
            }
            Expr::Block(items) | Expr::And(items) | Expr::Or(items) => items.iter().for_each(visit),
            Expr::Try { body, handlers } => {
                visit(&**body);
                for handler in handlers {
                    for expr in &handler.body {
                        visit(expr);
                    }
                }
            }
            Expr::Call {
                operator,
                arguments,
            } => {
                visit(&**operator);
                arguments.iter().for_each(visit);
            }
        }
    }

    /// Move every compound subexpression into `out`, leaving leaves behind
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        fn detach(slot: &mut Expr, out: &mut Vec<Expr>) {
            if !slot.is_leaf() {
                out.push(std::mem::replace(slot, Expr::CurrentFrame));
            }
        }
        fn drain(items: &mut Vec<Expr>, out: &mut Vec<Expr>) {
            out.extend(items.drain(..).filter(|expr| !expr.is_leaf()));
        }

        match self {
            Expr::Literal(_)
            | Expr::Symbol(_)
            | Expr::Quote(_)
            | Expr::Require(_)
            | Expr::CurrentFrame => {}
            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => {
                detach(condition, out);
                detach(then_branch, out);
                if let Some(else_branch) = else_branch {
                    detach(else_branch, out);
                }
            }
            Expr::Define { value, .. }
            | Expr::Assign { value, .. }
            | Expr::Return(value)
            | Expr::Raise(value) => detach(value, out),
            Expr::Lambda(code) => {
                // Shared code stays whole; its last owner tears it down.
                if let Some(code) = Arc::get_mut(code) {
                    drain(&mut code.body, out);
                }
            }
            Expr::Let { bindings, body } => {
                out.extend(
                    bindings
                        .drain(..)
                        .map(|(_, value)| value)
                        .filter(|expr| !expr.is_leaf()),
                );
                drain(body, out);
            }
            Expr::Block(items) | Expr::And(items) | Expr::Or(items) => drain(items, out),
            Expr::Try { body, handlers } => {
                detach(body, out);
                for handler in handlers {
                    drain(&mut handler.body, out);
                }
            }
            Expr::Call {
                operator,
                arguments,
            } => {
                detach(operator, out);
                drain(arguments, out);
            }
        }
    }
}

// Trees as deep as the reader accepts must not recurse on drop.
impl Drop for Expr {
    fn drop(&mut self) {
        if self.is_leaf() {
            return;
        }
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

impl Drop for Datum {
    fn drop(&mut self) {
        let Datum::List(items) = self else {
            return;
        };
        let mut pending: Vec<Datum> = items
            .drain(..)
            .filter(|item| matches!(item, Datum::List(_)))
            .collect();
        while let Some(mut datum) = pending.pop() {
            if let Datum::List(items) = &mut datum {
                pending.extend(items.drain(..).filter(|item| matches!(item, Datum::List(_))));
            }
        }
    }
}
