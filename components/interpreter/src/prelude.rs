//! Builtin native functions bound in every global frame.
//!
//! Arithmetic and comparison natives carry a [`Primitive`] marker so the
//! native backend can recognize calls to them.

use std::sync::Arc;

use core_types::{Exception, HeapId, Primitive, Symbol, Value};
use memory_manager::{display, structurally_equal, Arity, Heap, NativeEntry, OutOfMemory};

use crate::scope;

/// One prelude binding
struct Builtin {
    name: &'static str,
    arity: Arity,
    entry: NativeEntry,
    primitive: Option<Primitive>,
}

const fn builtin(name: &'static str, arity: Arity, entry: NativeEntry) -> Builtin {
    Builtin {
        name,
        arity,
        entry,
        primitive: None,
    }
}

const fn primitive(
    name: &'static str,
    arity: Arity,
    entry: NativeEntry,
    primitive: Primitive,
) -> Builtin {
    Builtin {
        name,
        arity,
        entry,
        primitive: Some(primitive),
    }
}

const fn exact(n: usize) -> Arity {
    Arity {
        min: n,
        max: Some(n),
    }
}

const fn at_least(n: usize) -> Arity {
    Arity { min: n, max: None }
}

const fn range(min: usize, max: usize) -> Arity {
    Arity {
        min,
        max: Some(max),
    }
}

const BUILTINS: &[Builtin] = &[
    // numbers
    primitive("+", at_least(0), add, Primitive::Add),
    primitive("-", at_least(1), sub, Primitive::Sub),
    primitive("*", at_least(0), mul, Primitive::Mul),
    primitive("/", exact(2), div, Primitive::Div),
    primitive("%", exact(2), rem, Primitive::Rem),
    primitive("<", exact(2), lt, Primitive::Lt),
    primitive(">", exact(2), gt, Primitive::Gt),
    primitive("<=", exact(2), le, Primitive::Le),
    primitive(">=", exact(2), ge, Primitive::Ge),
    primitive("=", exact(2), num_eq, Primitive::NumEq),
    // values
    builtin("eq?", exact(2), identical),
    builtin("equal?", exact(2), equal),
    primitive("not", exact(1), not, Primitive::Not),
    builtin("type-of", exact(1), type_of),
    builtin("nil?", exact(1), is_nil),
    // cells and lists
    builtin("cons", exact(2), cons),
    builtin("head", exact(1), head),
    builtin("tail", exact(1), tail),
    builtin("set-head!", exact(2), set_head),
    builtin("set-tail!", exact(2), set_tail),
    builtin("list", at_least(0), list),
    builtin("length", exact(1), length),
    // tables
    builtin("table", at_least(0), table),
    builtin("get", range(2, 3), get),
    builtin("put!", exact(3), put),
    builtin("remove!", exact(2), remove),
    builtin("has?", exact(2), has),
    builtin("keys", exact(1), keys),
    builtin("set-prototype!", exact(2), set_prototype),
    // strings and output
    builtin("to-string", exact(1), to_string),
    builtin("concat", at_least(0), concat),
    builtin("print", at_least(0), print),
];

/// Bind every builtin in `frame`
pub fn install(heap: &mut Heap, frame: HeapId) -> Result<(), OutOfMemory> {
    for builtin in BUILTINS {
        let entry = builtin.entry;
        let value = heap.alloc_native(
            builtin.name,
            builtin.arity,
            Arc::new(move |heap: &mut Heap, args: &[Value]| entry(heap, args)),
            builtin.primitive,
        )?;
        if let Value::NativeFunction(id) = value {
            heap.native_mut(id).restartable = true;
        }
        let symbol = heap.intern(builtin.name);
        scope::define(heap, frame, symbol, value);
    }
    Ok(())
}

/// Names of every builtin, in definition order
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|builtin| builtin.name)
}

fn expected(name: &str, what: &str, got: Value) -> Exception {
    Exception::type_error(format!("{} expects {}, got {}", name, what, got.tag()))
}

// ---- numbers ----

#[derive(Clone, Copy)]
enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    fn of(name: &str, value: Value) -> Result<Self, Exception> {
        match value {
            Value::Integer(n) => Ok(Number::Integer(n)),
            Value::Real(n) => Ok(Number::Real(n)),
            other => Err(expected(name, "numbers", other)),
        }
    }

    fn real(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Real(n) => n,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Integer(n) => n == 0,
            Number::Real(n) => n == 0.0,
        }
    }

    fn value(self) -> Value {
        match self {
            Number::Integer(n) => Value::Integer(n),
            Number::Real(n) => Value::Real(n),
        }
    }
}

fn combine(
    a: Number,
    b: Number,
    integer: fn(i64, i64) -> i64,
    real: fn(f64, f64) -> f64,
) -> Number {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => Number::Integer(integer(x, y)),
        (x, y) => Number::Real(real(x.real(), y.real())),
    }
}

fn fold(
    name: &str,
    initial: Number,
    args: &[Value],
    integer: fn(i64, i64) -> i64,
    real: fn(f64, f64) -> f64,
) -> Result<Value, Exception> {
    let mut acc = initial;
    for arg in args {
        acc = combine(acc, Number::of(name, *arg)?, integer, real);
    }
    Ok(acc.value())
}

fn add(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    fold("+", Number::Integer(0), args, i64::wrapping_add, |a, b| a + b)
}

fn mul(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    fold("*", Number::Integer(1), args, i64::wrapping_mul, |a, b| a * b)
}

fn sub(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let first = Number::of("-", args[0])?;
    if args.len() == 1 {
        return Ok(match first {
            Number::Integer(n) => Value::Integer(n.wrapping_neg()),
            Number::Real(n) => Value::Real(-n),
        });
    }
    fold("-", first, &args[1..], i64::wrapping_sub, |a, b| a - b)
}

fn divide(
    name: &str,
    args: &[Value],
    integer: fn(i64, i64) -> i64,
    real: fn(f64, f64) -> f64,
) -> Result<Value, Exception> {
    let a = Number::of(name, args[0])?;
    let b = Number::of(name, args[1])?;
    if b.is_zero() {
        return Err(Exception::type_error(format!("{}: division by zero", name)));
    }
    Ok(combine(a, b, integer, real).value())
}

fn div(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    divide("/", args, i64::wrapping_div, |a, b| a / b)
}

fn rem(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    divide("%", args, i64::wrapping_rem, |a, b| a % b)
}

fn compare(
    name: &str,
    args: &[Value],
    integer: fn(&i64, &i64) -> bool,
    real: fn(&f64, &f64) -> bool,
) -> Result<Value, Exception> {
    let a = Number::of(name, args[0])?;
    let b = Number::of(name, args[1])?;
    let result = match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => integer(&x, &y),
        (x, y) => real(&x.real(), &y.real()),
    };
    Ok(Value::Boolean(result))
}

fn lt(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    compare("<", args, i64::lt, f64::lt)
}

fn gt(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    compare(">", args, i64::gt, f64::gt)
}

fn le(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    compare("<=", args, i64::le, f64::le)
}

fn ge(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    compare(">=", args, i64::ge, f64::ge)
}

/// Numeric for two numbers, structural otherwise
fn num_eq(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    match (args[0], args[1]) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Boolean(x == y)),
        (a, b) if a.as_real().is_some() && b.as_real().is_some() => {
            Ok(Value::Boolean(a.as_real() == b.as_real()))
        }
        (a, b) => Ok(Value::Boolean(structurally_equal(heap, a, b))),
    }
}

// ---- values ----

fn identical(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(Value::Boolean(args[0] == args[1]))
}

fn equal(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(Value::Boolean(structurally_equal(heap, args[0], args[1])))
}

fn not(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(Value::Boolean(!args[0].is_truthy()))
}

fn type_of(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(Value::Symbol(heap.intern(args[0].tag().name())))
}

fn is_nil(_: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(Value::Boolean(args[0].is_nil()))
}

// ---- cells and lists ----

fn cell_id(name: &str, value: Value) -> Result<HeapId, Exception> {
    match value {
        Value::Cell(id) => Ok(id),
        other => Err(expected(name, "a cell", other)),
    }
}

fn cons(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(heap.alloc_cell(args[0], args[1])?)
}

fn head(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(heap.cell(cell_id("head", args[0])?).head)
}

fn tail(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(heap.cell(cell_id("tail", args[0])?).tail)
}

fn set_head(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    heap.cell_mut(cell_id("set-head!", args[0])?).head = args[1];
    Ok(args[1])
}

fn set_tail(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    heap.cell_mut(cell_id("set-tail!", args[0])?).tail = args[1];
    Ok(args[1])
}

fn list(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    Ok(heap.alloc_list(args)?)
}

fn length(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let count = match args[0] {
        Value::String(id) => heap.string(id).chars().count(),
        Value::Table(id) => heap.table(id).entries.len(),
        list @ (Value::Nil | Value::Cell(_)) => match heap.list_items(list) {
            Some(items) => items.len(),
            None => return Err(expected("length", "a proper list", list)),
        },
        other => return Err(expected("length", "a list, string or table", other)),
    };
    Ok(Value::Integer(count as i64))
}

// ---- tables ----

fn table_id(name: &str, value: Value) -> Result<HeapId, Exception> {
    match value {
        Value::Table(id) => Ok(id),
        other => Err(expected(name, "a table", other)),
    }
}

fn key(name: &str, value: Value) -> Result<Symbol, Exception> {
    match value {
        Value::Symbol(symbol) => Ok(symbol),
        other => Err(expected(name, "a symbol key", other)),
    }
}

fn table(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    if args.len() % 2 != 0 {
        return Err(Exception::arity("table", "an even number of", args.len()));
    }
    let mut entries = Vec::with_capacity(args.len() / 2);
    for pair in args.chunks(2) {
        entries.push((key("table", pair[0])?, pair[1]));
    }
    Ok(heap.alloc_table_from(entries)?)
}

fn get(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let id = table_id("get", args[0])?;
    let key = key("get", args[1])?;
    let default = args.get(2).copied().unwrap_or(Value::Nil);
    Ok(heap.table_get(id, key).unwrap_or(default))
}

fn put(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let id = table_id("put!", args[0])?;
    let key = key("put!", args[1])?;
    heap.table_mut(id).entries.insert(key, args[2]);
    Ok(args[2])
}

fn remove(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let id = table_id("remove!", args[0])?;
    let key = key("remove!", args[1])?;
    Ok(heap.table_mut(id).entries.remove(&key).unwrap_or(Value::Nil))
}

fn has(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let id = table_id("has?", args[0])?;
    let key = key("has?", args[1])?;
    Ok(Value::Boolean(heap.table_get(id, key).is_some()))
}

fn keys(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let id = table_id("keys", args[0])?;
    let symbols: Vec<Value> = heap
        .table(id)
        .entries
        .keys()
        .map(|symbol| Value::Symbol(*symbol))
        .collect();
    Ok(heap.alloc_list(&symbols)?)
}

fn set_prototype(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let id = table_id("set-prototype!", args[0])?;
    let prototype = match args[1] {
        Value::Nil => None,
        other => Some(table_id("set-prototype!", other)?),
    };
    heap.set_prototype(id, prototype)?;
    Ok(args[0])
}

// ---- strings and output ----

fn to_string(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    if let Value::String(_) = args[0] {
        return Ok(args[0]);
    }
    let text = display(heap, args[0]);
    Ok(heap.alloc_string(&text)?)
}

fn concat(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let mut text = String::new();
    for arg in args {
        text.push_str(&display(heap, *arg));
    }
    Ok(heap.alloc_string(&text)?)
}

fn print(heap: &mut Heap, args: &[Value]) -> Result<Value, Exception> {
    let parts: Vec<String> = args.iter().map(|arg| display(heap, *arg)).collect();
    println!("{}", parts.join(" "));
    Ok(Value::Nil)
}
