//! Typed intermediate representation for JIT compilation
//!
//! Sits between the expression tree and Cranelift IR. Lowering decides
//! whether a function body is inside the compilable subset and records the
//! primitive bindings the generated code assumes.

use core_types::{Expr, LambdaExpr, Literal, Primitive, PrimitiveGuard, Symbol};
use rustc_hash::FxHashMap;

use crate::error::CompileError;

/// Static type of an IR value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitType {
    /// i64 with wrapping arithmetic
    Integer,
    /// 0 or 1 in an i64 slot
    Boolean,
}

/// Wrapping integer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
}

/// Signed integer comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `=`
    Equal,
}

/// IR expression
#[derive(Debug, Clone, PartialEq)]
pub enum IrExpr {
    /// Integer constant
    Integer(i64),
    /// Boolean constant
    Boolean(bool),
    /// Positional parameter
    Param(usize),
    /// Left fold of an arithmetic operator over at least two operands
    Arith {
        /// Operator
        op: ArithOp,
        /// Operands, all integers
        args: Vec<IrExpr>,
    },
    /// Unary minus
    Negate(Box<IrExpr>),
    /// Integer comparison producing a boolean
    Compare {
        /// Condition
        cmp: Comparison,
        /// Left operand
        lhs: Box<IrExpr>,
        /// Right operand
        rhs: Box<IrExpr>,
    },
    /// Boolean negation
    Not(Box<IrExpr>),
    /// Two-armed conditional on a boolean
    If {
        /// Boolean condition
        condition: Box<IrExpr>,
        /// Taken when true
        then_branch: Box<IrExpr>,
        /// Taken when false
        else_branch: Box<IrExpr>,
        /// Type of both arms
        ty: JitType,
    },
}

/// A lowered function
#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    /// Parameter count
    pub arity: usize,
    /// Body expression
    pub body: IrExpr,
    /// Type of the result
    pub returns: JitType,
    /// Primitive bindings the body assumes
    pub guards: Vec<PrimitiveGuard>,
}

/// Deepest expression nesting lowering accepts
pub const MAX_NESTING: usize = 256;

/// Lower `code` into the compilable subset.
///
/// `primitives` maps free symbols of the body to the primitive they
/// currently resolve to.
pub fn lower(
    code: &LambdaExpr,
    primitives: &FxHashMap<Symbol, Primitive>,
) -> Result<IrFunction, CompileError> {
    let [body] = code.body.as_slice() else {
        return Err(CompileError::unsupported("body must be a single expression"));
    };

    let mut lowering = Lowering {
        params: &code.params,
        primitives,
        guards: Vec::new(),
        depth: 0,
    };
    let (body, returns) = lowering.expr(body)?;
    Ok(IrFunction {
        arity: code.params.len(),
        body,
        returns,
        guards: lowering.guards,
    })
}

struct Lowering<'a> {
    params: &'a [Symbol],
    primitives: &'a FxHashMap<Symbol, Primitive>,
    guards: Vec<PrimitiveGuard>,
    depth: usize,
}

impl Lowering<'_> {
    fn expr(&mut self, expr: &Expr) -> Result<(IrExpr, JitType), CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::unsupported("expression nested too deeply"));
        }
        self.depth += 1;
        let lowered = self.expr_form(expr);
        self.depth -= 1;
        lowered
    }

    fn expr_form(&mut self, expr: &Expr) -> Result<(IrExpr, JitType), CompileError> {
        match expr {
            Expr::Literal(Literal::Integer(n)) => Ok((IrExpr::Integer(*n), JitType::Integer)),
            Expr::Literal(Literal::Boolean(b)) => Ok((IrExpr::Boolean(*b), JitType::Boolean)),
            Expr::Symbol(symbol) => match self.params.iter().position(|p| p == symbol) {
                Some(index) => Ok((IrExpr::Param(index), JitType::Integer)),
                None => Err(CompileError::unsupported("free variable")),
            },
            Expr::If {
                condition,
                then_branch,
                else_branch: Some(else_branch),
            } => {
                let condition = self.typed(condition, JitType::Boolean)?;
                let (then_branch, ty) = self.expr(then_branch)?;
                let else_branch = self.typed(else_branch, ty)?;
                Ok((
                    IrExpr::If {
                        condition: Box::new(condition),
                        then_branch: Box::new(then_branch),
                        else_branch: Box::new(else_branch),
                        ty,
                    },
                    ty,
                ))
            }
            Expr::Call {
                operator,
                arguments,
            } => self.call(operator, arguments),
            _ => Err(CompileError::unsupported("expression form")),
        }
    }

    fn typed(&mut self, expr: &Expr, expected: JitType) -> Result<IrExpr, CompileError> {
        let (ir, ty) = self.expr(expr)?;
        if ty != expected {
            return Err(CompileError::unsupported(format!(
                "expected {:?}, found {:?}",
                expected, ty
            )));
        }
        Ok(ir)
    }

    fn integers(&mut self, args: &[Expr]) -> Result<Vec<IrExpr>, CompileError> {
        args.iter()
            .map(|arg| self.typed(arg, JitType::Integer))
            .collect()
    }

    fn call(&mut self, operator: &Expr, args: &[Expr]) -> Result<(IrExpr, JitType), CompileError> {
        let Expr::Symbol(symbol) = operator else {
            return Err(CompileError::unsupported("computed operator"));
        };
        if self.params.contains(symbol) {
            return Err(CompileError::unsupported("parameter in operator position"));
        }
        let Some(primitive) = self.primitives.get(symbol).copied() else {
            return Err(CompileError::unsupported("call to a non-primitive"));
        };

        let lowered = match primitive {
            Primitive::Add => self.fold(ArithOp::Add, args, 0)?,
            Primitive::Mul => self.fold(ArithOp::Mul, args, 1)?,
            Primitive::Sub => match args {
                [] => return Err(CompileError::unsupported("- without operands")),
                [only] => (
                    IrExpr::Negate(Box::new(self.typed(only, JitType::Integer)?)),
                    JitType::Integer,
                ),
                _ => (
                    IrExpr::Arith {
                        op: ArithOp::Sub,
                        args: self.integers(args)?,
                    },
                    JitType::Integer,
                ),
            },
            Primitive::Lt => self.compare(Comparison::Less, args)?,
            Primitive::Gt => self.compare(Comparison::Greater, args)?,
            Primitive::Le => self.compare(Comparison::LessEqual, args)?,
            Primitive::Ge => self.compare(Comparison::GreaterEqual, args)?,
            Primitive::NumEq => self.compare(Comparison::Equal, args)?,
            Primitive::Not => {
                let [arg] = args else {
                    return Err(CompileError::unsupported("not takes one operand"));
                };
                match self.expr(arg)? {
                    (ir, JitType::Boolean) => (IrExpr::Not(Box::new(ir)), JitType::Boolean),
                    // Integers are always truthy.
                    (_, JitType::Integer) => (IrExpr::Boolean(false), JitType::Boolean),
                }
            }
            Primitive::Div | Primitive::Rem => {
                return Err(CompileError::unsupported("division may raise"))
            }
        };

        self.guard(*symbol, primitive);
        Ok(lowered)
    }

    fn fold(
        &mut self,
        op: ArithOp,
        args: &[Expr],
        identity: i64,
    ) -> Result<(IrExpr, JitType), CompileError> {
        let mut args = self.integers(args)?;
        let ir = match args.len() {
            0 => IrExpr::Integer(identity),
            1 => args.remove(0),
            _ => IrExpr::Arith { op, args },
        };
        Ok((ir, JitType::Integer))
    }

    fn compare(
        &mut self,
        cmp: Comparison,
        args: &[Expr],
    ) -> Result<(IrExpr, JitType), CompileError> {
        let [lhs, rhs] = args else {
            return Err(CompileError::unsupported("comparison takes two operands"));
        };
        Ok((
            IrExpr::Compare {
                cmp,
                lhs: Box::new(self.typed(lhs, JitType::Integer)?),
                rhs: Box::new(self.typed(rhs, JitType::Integer)?),
            },
            JitType::Boolean,
        ))
    }

    fn guard(&mut self, symbol: Symbol, primitive: Primitive) {
        if !self.guards.iter().any(|guard| guard.symbol == symbol) {
            self.guards.push(PrimitiveGuard { symbol, primitive });
        }
    }
}
