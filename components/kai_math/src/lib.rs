//! Numeric helpers loadable with `(require kai_math)`
//!
//! Built as a `cdylib`, the library exports its declaration under the
//! standard symbol. Built as an `rlib`, hosts can link the same declaration
//! in process:
//!
//! ```
//! use std::sync::Arc;
//!
//! use module_loader::ModuleLoader;
//!
//! let mut loader = ModuleLoader::new(Vec::new());
//! loader.register_static(Arc::new(kai_math::kai_module_declaration));
//! let module = loader.load("kai_math").unwrap();
//! assert_eq!(module.functions.len(), 4);
//! ```

use core_types::{Exception, Value};
use memory_manager::{Arity, Heap};
use module_loader::{export_module, ModuleRegistrar};

fn number(name: &str, value: Value) -> Result<f64, Exception> {
    value.as_real().ok_or_else(|| {
        Exception::type_error(format!("{} expects numbers, got {}", name, value.tag()))
    })
}

fn integer(name: &str, value: Value) -> Result<i64, Exception> {
    value.as_integer().ok_or_else(|| {
        Exception::type_error(format!("{} expects integers, got {}", name, value.tag()))
    })
}

fn square(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    match args[0] {
        Value::Integer(n) => Ok(Value::Integer(n.wrapping_mul(n))),
        other => {
            let x = number("square", other)?;
            Ok(Value::Real(x * x))
        }
    }
}

fn abs(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    match args[0] {
        Value::Integer(n) => Ok(Value::Integer(n.wrapping_abs())),
        other => Ok(Value::Real(number("abs", other)?.abs())),
    }
}

fn hypot(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let x = number("hypot", args[0])?;
    let y = number("hypot", args[1])?;
    Ok(Value::Real(x.hypot(y)))
}

fn gcd(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let mut a = integer("gcd", args[0])?.unsigned_abs();
    let mut b = integer("gcd", args[1])?.unsigned_abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    Ok(Value::Integer(a as i64))
}

fn register(registrar: &mut ModuleRegistrar) {
    registrar
        .function("square", Arity::exact(1), square)
        .function("abs", Arity::exact(1), abs)
        .function("hypot", Arity::exact(2), hypot)
        .function("gcd", Arity::exact(2), gcd);
}

export_module!("kai_math", register);
