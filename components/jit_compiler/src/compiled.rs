//! Compiled function entries handed back to the evaluator

use core_types::{CompiledCode, PrimitiveGuard, Value};

use crate::ir::JitType;

/// Native calling convention: a pointer to the integer arguments
pub(crate) type Entry = unsafe extern "C" fn(*const i64) -> i64;

/// A finalized native function
#[derive(Debug)]
pub struct NativeCode {
    entry: Entry,
    arity: usize,
    returns: JitType,
    guards: Vec<PrimitiveGuard>,
    fingerprint: u64,
}

impl NativeCode {
    pub(crate) fn new(
        entry: Entry,
        arity: usize,
        returns: JitType,
        guards: Vec<PrimitiveGuard>,
        fingerprint: u64,
    ) -> Self {
        Self {
            entry,
            arity,
            returns,
            guards,
            fingerprint,
        }
    }

    /// Type of the value the entry returns
    pub fn returns(&self) -> JitType {
        self.returns
    }

    /// Fingerprint of the source tree this was compiled from
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

impl CompiledCode for NativeCode {
    fn arity(&self) -> usize {
        self.arity
    }

    fn guards(&self) -> &[PrimitiveGuard] {
        &self.guards
    }

    fn invoke(&self, args: &[i64]) -> Value {
        assert_eq!(args.len(), self.arity, "compiled entry called with wrong arity");
        // SAFETY: the entry was generated for exactly `arity` i64 loads from
        // the argument pointer, and its code memory is never freed.
        let raw = unsafe { (self.entry)(args.as_ptr()) };
        match self.returns {
            JitType::Integer => Value::Integer(raw),
            JitType::Boolean => Value::Boolean(raw != 0),
        }
    }
}
