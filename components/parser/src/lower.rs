//! Lowering of syntax trees into [`Expr`].
//!
//! Special forms are recognized here by their head symbol, so the evaluator
//! never inspects names to decide how to evaluate a list.

use std::collections::HashSet;
use std::sync::Arc;

use core_types::{
    CatchClause, Datum, ErrorKind, Expr, LambdaExpr, Literal, SourcePosition, Symbol,
    SymbolTable,
};

use crate::error::{malformed, ParseError};
use crate::parser::{Syntax, SyntaxKind, RED_ZONE, STACK_PER_RECURSION};

/// Names that introduce special forms
pub const SPECIAL_FORMS: [&str; 14] = [
    "quote",
    "if",
    "define",
    "set!",
    "lambda",
    "let",
    "block",
    "return",
    "and",
    "or",
    "raise",
    "try",
    "require",
    "this-frame",
];

/// Lowers syntax into expressions, interning every symbol it meets
pub struct Lowerer<'s> {
    symbols: &'s mut SymbolTable,
}

impl<'s> Lowerer<'s> {
    /// Create a lowerer interning into `symbols`
    pub fn new(symbols: &'s mut SymbolTable) -> Self {
        Self { symbols }
    }

    /// Lower one form
    pub fn lower(&mut self, syntax: &Syntax) -> Result<Expr, ParseError> {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.lower_form(syntax))
    }

    fn lower_form(&mut self, syntax: &Syntax) -> Result<Expr, ParseError> {
        match &syntax.kind {
            SyntaxKind::Integer(n) => Ok(Expr::Literal(Literal::Integer(*n))),
            SyntaxKind::Real(n) => Ok(Expr::Literal(Literal::Real(*n))),
            SyntaxKind::String(s) => Ok(Expr::Literal(Literal::String(Arc::from(s.as_str())))),
            SyntaxKind::Symbol(name) => Ok(match constant(name) {
                Some(literal) => Expr::Literal(literal),
                None => Expr::Symbol(self.symbols.intern(name)),
            }),
            SyntaxKind::List(items) => self.lower_list(items, syntax.position),
        }
    }

    /// Lower a sequence of forms
    pub fn lower_all(&mut self, forms: &[Syntax]) -> Result<Vec<Expr>, ParseError> {
        forms.iter().map(|form| self.lower(form)).collect()
    }

    /// Convert syntax into quoted data
    pub fn datum(&mut self, syntax: &Syntax) -> Datum {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.datum_form(syntax))
    }

    fn datum_form(&mut self, syntax: &Syntax) -> Datum {
        match &syntax.kind {
            SyntaxKind::Integer(n) => Datum::Literal(Literal::Integer(*n)),
            SyntaxKind::Real(n) => Datum::Literal(Literal::Real(*n)),
            SyntaxKind::String(s) => Datum::Literal(Literal::String(Arc::from(s.as_str()))),
            SyntaxKind::Symbol(name) => match constant(name) {
                Some(literal) => Datum::Literal(literal),
                None => Datum::Symbol(self.symbols.intern(name)),
            },
            SyntaxKind::List(items) => {
                Datum::List(items.iter().map(|item| self.datum(item)).collect())
            }
        }
    }

    fn lower_list(
        &mut self,
        items: &[Syntax],
        position: SourcePosition,
    ) -> Result<Expr, ParseError> {
        let Some((head, rest)) = items.split_first() else {
            return Ok(Expr::Literal(Literal::Nil));
        };

        match head.as_symbol() {
            Some("quote") => {
                let [datum] = rest else {
                    return Err(malformed("quote", "expected exactly one operand", position));
                };
                Ok(Expr::Quote(self.datum(datum)))
            }
            Some("if") => self.lower_if(rest, position),
            Some("define") => self.lower_define(rest, position),
            Some("set!") => {
                let [name, value] = rest else {
                    return Err(malformed("set!", "expected a name and a value", position));
                };
                Ok(Expr::Assign {
                    name: self.binding_name("set!", name)?,
                    value: Box::new(self.lower(value)?),
                })
            }
            Some("lambda") => {
                let Some((params, body)) = rest.split_first() else {
                    return Err(malformed("lambda", "missing parameter list", position));
                };
                let lambda = self.lambda(None, params, body)?;
                Ok(Expr::Lambda(Arc::new(lambda)))
            }
            Some("let") => self.lower_let(rest, position),
            Some("block") => Ok(Expr::Block(self.lower_all(rest)?)),
            Some("return") => match rest {
                [] => Ok(Expr::Return(Box::new(Expr::Literal(Literal::Nil)))),
                [value] => Ok(Expr::Return(Box::new(self.lower(value)?))),
                _ => Err(malformed("return", "expected at most one operand", position)),
            },
            Some("and") => Ok(Expr::And(self.lower_all(rest)?)),
            Some("or") => Ok(Expr::Or(self.lower_all(rest)?)),
            Some("raise") => {
                let [payload] = rest else {
                    return Err(malformed("raise", "expected exactly one operand", position));
                };
                Ok(Expr::Raise(Box::new(self.lower(payload)?)))
            }
            Some("try") => self.lower_try(rest, position),
            Some("require") => {
                let [name] = rest else {
                    return Err(malformed("require", "expected a module name", position));
                };
                Ok(Expr::Require(self.binding_name("require", name)?))
            }
            Some("this-frame") => {
                if !rest.is_empty() {
                    return Err(malformed("this-frame", "takes no operands", position));
                }
                Ok(Expr::CurrentFrame)
            }
            _ => {
                let operator = self.lower(head)?;
                let arguments = self.lower_all(rest)?;
                Ok(Expr::call(operator, arguments))
            }
        }
    }

    fn lower_if(&mut self, rest: &[Syntax], position: SourcePosition) -> Result<Expr, ParseError> {
        let (condition, then_branch, else_branch) = match rest {
            [c, t] => (c, t, None),
            [c, t, e] => (c, t, Some(e)),
            _ => return Err(malformed("if", "expected 2 or 3 operands", position)),
        };
        Ok(Expr::If {
            condition: Box::new(self.lower(condition)?),
            then_branch: Box::new(self.lower(then_branch)?),
            else_branch: match else_branch {
                Some(e) => Some(Box::new(self.lower(e)?)),
                None => None,
            },
        })
    }

    fn lower_define(
        &mut self,
        rest: &[Syntax],
        position: SourcePosition,
    ) -> Result<Expr, ParseError> {
        let Some((target, body)) = rest.split_first() else {
            return Err(malformed("define", "missing name", position));
        };

        // (define (name params...) body...)
        if let Some(signature) = target.as_list() {
            let Some((name, params)) = signature.split_first() else {
                return Err(malformed("define", "empty function signature", position));
            };
            let name = self.binding_name("define", name)?;
            let params = Syntax {
                kind: SyntaxKind::List(params.to_vec()),
                position: target.position,
            };
            let lambda = self.lambda(Some(name), &params, body)?;
            return Ok(Expr::Define {
                name,
                value: Box::new(Expr::Lambda(Arc::new(lambda))),
            });
        }

        let name = self.binding_name("define", target)?;
        let [value] = body else {
            return Err(malformed("define", "expected a name and a value", position));
        };
        let mut value = self.lower(value)?;
        // Anonymous lambdas bound by define take the binding's name
        if let Expr::Lambda(lambda) = &mut value {
            if let Some(code) = Arc::get_mut(lambda).filter(|code| code.name.is_none()) {
                code.name = Some(name);
            }
        }
        Ok(Expr::Define {
            name,
            value: Box::new(value),
        })
    }

    fn lower_let(&mut self, rest: &[Syntax], position: SourcePosition) -> Result<Expr, ParseError> {
        let Some((bindings, body)) = rest.split_first() else {
            return Err(malformed("let", "missing binding list", position));
        };
        let Some(bindings) = bindings.as_list() else {
            return Err(malformed("let", "binding list must be a list", position));
        };

        let mut lowered = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let Some([name, value]) = binding.as_list() else {
                return Err(malformed("let", "each binding is (name value)", binding.position));
            };
            lowered.push((self.binding_name("let", name)?, self.lower(value)?));
        }
        Ok(Expr::Let {
            bindings: lowered,
            body: self.lower_all(body)?,
        })
    }

    fn lower_try(&mut self, rest: &[Syntax], position: SourcePosition) -> Result<Expr, ParseError> {
        let Some((body, clauses)) = rest.split_first() else {
            return Err(malformed("try", "missing body", position));
        };
        if clauses.is_empty() {
            return Err(malformed("try", "expected at least one catch clause", position));
        }

        let mut handlers = Vec::with_capacity(clauses.len());
        for clause in clauses {
            handlers.push(self.catch_clause(clause)?);
        }
        Ok(Expr::Try {
            body: Box::new(self.lower(body)?),
            handlers,
        })
    }

    /// `(catch name body...)` or `(catch (Kind...) name body...)`
    fn catch_clause(&mut self, clause: &Syntax) -> Result<CatchClause, ParseError> {
        let items = match clause.as_list() {
            Some([head, items @ ..]) if head.as_symbol() == Some("catch") => items,
            _ => {
                return Err(malformed("try", "clauses must start with catch", clause.position))
            }
        };

        let (kinds, rest) = match items.split_first() {
            Some((first, rest)) if first.as_list().is_some() => {
                (self.error_kinds(first)?, rest)
            }
            _ => (Vec::new(), items),
        };
        let Some((binding, body)) = rest.split_first() else {
            return Err(malformed("catch", "missing binding name", clause.position));
        };
        Ok(CatchClause {
            kinds,
            binding: self.binding_name("catch", binding)?,
            body: self.lower_all(body)?,
        })
    }

    fn error_kinds(&mut self, list: &Syntax) -> Result<Vec<ErrorKind>, ParseError> {
        let mut kinds = Vec::new();
        for item in list.as_list().unwrap_or_default() {
            let kind = item.as_symbol().and_then(ErrorKind::from_name);
            match kind {
                Some(ErrorKind::OutOfMemory) => {
                    return Err(malformed("catch", "OutOfMemory cannot be caught", item.position))
                }
                Some(kind) => kinds.push(kind),
                None => {
                    return Err(malformed(
                        "catch",
                        format!("unknown error kind {}", item),
                        item.position,
                    ))
                }
            }
        }
        Ok(kinds)
    }

    fn lambda(
        &mut self,
        name: Option<Symbol>,
        params: &Syntax,
        body: &[Syntax],
    ) -> Result<LambdaExpr, ParseError> {
        let Some(items) = params.as_list() else {
            return Err(malformed("lambda", "parameters must be a list", params.position));
        };
        let mut seen = HashSet::new();
        let mut symbols = Vec::with_capacity(items.len());
        for item in items {
            let symbol = self.binding_name("lambda", item)?;
            if !seen.insert(symbol) {
                return Err(malformed(
                    "lambda",
                    format!("duplicate parameter {}", item),
                    item.position,
                ));
            }
            symbols.push(symbol);
        }
        Ok(LambdaExpr {
            name,
            params: symbols,
            body: self.lower_all(body)?,
        })
    }

    /// A symbol usable as a binding name
    fn binding_name(&mut self, form: &'static str, syntax: &Syntax) -> Result<Symbol, ParseError> {
        match syntax.as_symbol() {
            Some(name) if SPECIAL_FORMS.contains(&name) => Err(malformed(
                form,
                format!("cannot bind special form name {}", name),
                syntax.position,
            )),
            Some(name) if constant(name).is_none() => Ok(self.symbols.intern(name)),
            _ => Err(malformed(
                form,
                format!("expected a name, got {}", syntax),
                syntax.position,
            )),
        }
    }
}

fn constant(name: &str) -> Option<Literal> {
    match name {
        "nil" => Some(Literal::Nil),
        "true" => Some(Literal::Boolean(true)),
        "false" => Some(Literal::Boolean(false)),
        _ => None,
    }
}
