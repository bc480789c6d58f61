//! Interned symbols.
//!
//! Every identifier used as a frame or table key goes through a
//! [`SymbolTable`], so two structurally equal symbols are always the same
//! [`Symbol`] and key comparison is a single integer compare.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// An interned identifier.
///
/// Only meaningful together with the [`SymbolTable`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Position of the symbol in its table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// Intern table mapping names to symbols and back.
///
/// # Examples
///
/// ```
/// use core_types::SymbolTable;
///
/// let mut symbols = SymbolTable::new();
/// let a = symbols.intern("lambda");
/// let b = symbols.intern("lambda");
/// assert_eq!(a, b);
/// assert_eq!(symbols.name(a), "lambda");
/// assert_eq!(symbols.get("missing"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    names: Vec<Arc<str>>,
    index: FxHashMap<Arc<str>, Symbol>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the symbol for `name`, creating it on first use
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.index.get(name) {
            return *symbol;
        }

        let symbol = Symbol(self.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        self.names.push(name.clone());
        self.index.insert(name, symbol);
        symbol
    }

    /// Look up an existing symbol without interning
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).copied()
    }

    /// The name a symbol was interned from
    ///
    /// # Panics
    ///
    /// Panics if the symbol was issued by a different table.
    pub fn name(&self, symbol: Symbol) -> &str {
        match self.names.get(symbol.index()) {
            Some(name) => name,
            None => panic!("symbol {} does not belong to this table", symbol),
        }
    }

    /// Number of interned symbols
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true when nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
