//! Unit tests for the symbol table

use core_types::SymbolTable;

#[test]
fn test_structurally_equal_symbols_are_identical() {
    let mut symbols = SymbolTable::new();
    let first = symbols.intern(&String::from("counter"));
    let second = symbols.intern("counter");
    assert_eq!(first, second);
    assert_eq!(first.index(), second.index());
}

#[test]
fn test_names_are_preserved() {
    let mut symbols = SymbolTable::new();
    let names = ["+", "set-head!", "equal?"];
    let interned: Vec<_> = names.iter().map(|n| symbols.intern(n)).collect();
    for (name, symbol) in names.iter().zip(interned) {
        assert_eq!(symbols.name(symbol), *name);
    }
}
