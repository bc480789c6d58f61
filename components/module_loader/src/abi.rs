//! The contract between the runtime and a native module.
//!
//! Dynamic modules are Rust `cdylib`s built against the same `core_types`
//! and `memory_manager` versions as the host, with the same compiler. The
//! declaration carries both an ABI number and the core crate version; the
//! loader refuses a library when either differs.

use memory_manager::{Arity, NativeEntry};

/// Version of the declaration layout and registrar calling convention
pub const ABI_VERSION: u32 = 1;

/// Version of the core crates the host was built with
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exported symbol name a dynamic module must define (NUL terminated)
pub const DECLARATION_SYMBOL: &[u8] = b"kai_module_declaration\0";

/// One function offered by a module.
///
/// The host calls an entry at most once per application. An entry that
/// fails with `OutOfMemory` surfaces that error to the program; it is not
/// repeated after a collection, so an entry may mutate its arguments
/// before it allocates.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    /// Binding name inside the module table
    pub name: String,
    /// Accepted argument counts
    pub arity: Arity,
    /// Host entry point
    pub entry: NativeEntry,
}

/// Collects the functions a module registers during initialization
#[derive(Debug, Default)]
pub struct ModuleRegistrar {
    entries: Vec<ModuleEntry>,
}

impl ModuleRegistrar {
    /// Create an empty registrar
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function.
    ///
    /// Registering the same name twice keeps the later entry.
    pub fn function(&mut self, name: &str, arity: Arity, entry: NativeEntry) -> &mut Self {
        self.entries.retain(|existing| existing.name != name);
        self.entries.push(ModuleEntry {
            name: name.to_string(),
            arity,
            entry,
        });
        self
    }

    /// Registered functions in registration order
    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    /// Consume the registrar
    pub fn into_entries(self) -> Vec<ModuleEntry> {
        self.entries
    }
}

/// A module linked into the host process
pub trait NativeModule: Send + Sync {
    /// Name used by `(require name)`
    fn name(&self) -> &str;

    /// Register the module's functions
    fn register(&self, registrar: &mut ModuleRegistrar);
}

/// The static a dynamic module exports under [`DECLARATION_SYMBOL`]
#[derive(Debug, Clone, Copy)]
pub struct ModuleDeclaration {
    /// Must equal [`ABI_VERSION`]
    pub abi_version: u32,
    /// Must equal [`CORE_VERSION`]
    pub core_version: &'static str,
    /// Module name; must match the requested name
    pub name: &'static str,
    /// Initialization entry point
    pub register: fn(&mut ModuleRegistrar),
}

impl NativeModule for ModuleDeclaration {
    fn name(&self) -> &str {
        self.name
    }

    fn register(&self, registrar: &mut ModuleRegistrar) {
        (self.register)(registrar)
    }
}

/// Export a module declaration from a `cdylib`.
///
/// ```ignore
/// fn register(registrar: &mut module_loader::ModuleRegistrar) {
///     registrar.function("square", Arity::exact(1), square);
/// }
///
/// module_loader::export_module!("math", register);
/// ```
#[macro_export]
macro_rules! export_module {
    ($name:expr, $register:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static kai_module_declaration: $crate::ModuleDeclaration = $crate::ModuleDeclaration {
            abi_version: $crate::ABI_VERSION,
            core_version: $crate::CORE_VERSION,
            name: $name,
            register: $register,
        };
    };
}
