//! Module resolution and loading.
//!
//! Static modules registered by the host take precedence over libraries
//! found on the search path. Libraries are never unloaded: every native
//! function created from one holds it alive.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use rustc_hash::FxHashMap;

use core_types::Value;
use memory_manager::{Arity, Heap, NativeFn};

use crate::abi::{
    ModuleDeclaration, ModuleEntry, ModuleRegistrar, NativeModule, ABI_VERSION, CORE_VERSION,
    DECLARATION_SYMBOL,
};
use crate::error::ModuleLoadError;

/// Where a module name resolved to
#[derive(Clone)]
pub enum ModuleSource {
    /// Registered in process
    Static(Arc<dyn NativeModule>),
    /// Library file on the search path
    Library(PathBuf),
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Static(module) => write!(f, "Static({})", module.name()),
            ModuleSource::Library(path) => write!(f, "Library({})", path.display()),
        }
    }
}

/// A native function ready to be allocated on a heap
#[derive(Clone)]
pub struct LoadedFunction {
    /// Binding name inside the module table
    pub name: String,
    /// Accepted argument counts
    pub arity: Arity,
    /// Callable entry; keeps its library loaded
    pub entry: NativeFn,
}

impl fmt::Debug for LoadedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// The result of initializing a module
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// Module name
    pub name: String,
    /// Registered functions in registration order
    pub functions: Vec<LoadedFunction>,
}

/// Finds and initializes native modules
pub struct ModuleLoader {
    search_paths: Vec<PathBuf>,
    statics: FxHashMap<String, Arc<dyn NativeModule>>,
    libraries: FxHashMap<PathBuf, Arc<Library>>,
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("search_paths", &self.search_paths)
            .field("statics", &self.statics.keys().collect::<Vec<_>>())
            .field("libraries", &self.libraries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleLoader {
    /// Create a loader searching `search_paths` in order
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            statics: FxHashMap::default(),
            libraries: FxHashMap::default(),
        }
    }

    /// Append a directory to the search path
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Directories searched for libraries
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Number of library files held open
    pub fn open_libraries(&self) -> usize {
        self.libraries.len()
    }

    /// Register an in-process module, replacing one of the same name
    pub fn register_static(&mut self, module: Arc<dyn NativeModule>) {
        tracing::debug!(module = module.name(), "registering static module");
        self.statics.insert(module.name().to_string(), module);
    }

    /// Locate `name` without running any module code
    pub fn resolve(&self, name: &str) -> Result<ModuleSource, ModuleLoadError> {
        validate_name(name)?;

        if let Some(module) = self.statics.get(name) {
            return Ok(ModuleSource::Static(Arc::clone(module)));
        }

        let file_name = libloading::library_filename(name);
        let mut searched = Vec::with_capacity(self.search_paths.len());
        for directory in &self.search_paths {
            let candidate = directory.join(&file_name);
            if candidate.is_file() {
                tracing::debug!(module = name, path = %candidate.display(), "resolved module library");
                return Ok(ModuleSource::Library(candidate));
            }
            searched.push(candidate);
        }

        Err(ModuleLoadError::NotFound {
            name: name.to_string(),
            searched,
        })
    }

    /// Resolve `name`, then run its registration.
    ///
    /// Loading the same library twice reuses the open handle. Callers cache
    /// the resulting module if they need per-name idempotency.
    pub fn load(&mut self, name: &str) -> Result<LoadedModule, ModuleLoadError> {
        let loaded = match self.resolve(name)? {
            ModuleSource::Static(module) => {
                let entries = initialize(name, module.as_ref())?;
                LoadedModule {
                    name: name.to_string(),
                    functions: entries.into_iter().map(static_function).collect(),
                }
            }
            ModuleSource::Library(path) => self.load_library(name, &path)?,
        };
        tracing::info!(
            module = name,
            functions = loaded.functions.len(),
            "module loaded"
        );
        Ok(loaded)
    }

    fn load_library(&mut self, name: &str, path: &Path) -> Result<LoadedModule, ModuleLoadError> {
        let library = match self.libraries.get(path) {
            Some(library) => Arc::clone(library),
            None => {
                // SAFETY: loading runs the library's static initializers. Module
                // libraries are trusted extensions built for this host.
                let library = unsafe { Library::new(path) }.map_err(|source| {
                    ModuleLoadError::Open {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                let library = Arc::new(library);
                self.libraries
                    .insert(path.to_path_buf(), Arc::clone(&library));
                library
            }
        };

        // SAFETY: the symbol is the `ModuleDeclaration` static emitted by
        // `export_module!`; the ABI version is checked before any field other
        // than the version numbers is trusted.
        let declaration: ModuleDeclaration = unsafe {
            let symbol = library
                .get::<*const ModuleDeclaration>(DECLARATION_SYMBOL)
                .map_err(|source| ModuleLoadError::MissingDeclaration {
                    path: path.to_path_buf(),
                    source,
                })?;
            symbol.read()
        };

        check_declaration(name, &declaration)?;
        let entries = initialize(name, &declaration)?;

        Ok(LoadedModule {
            name: name.to_string(),
            functions: entries
                .into_iter()
                .map(|entry| library_function(entry, Arc::clone(&library)))
                .collect(),
        })
    }
}

fn validate_name(name: &str) -> Result<(), ModuleLoadError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ModuleLoadError::InvalidName {
            name: name.to_string(),
        })
    }
}

fn check_declaration(name: &str, declaration: &ModuleDeclaration) -> Result<(), ModuleLoadError> {
    if declaration.abi_version != ABI_VERSION {
        return Err(ModuleLoadError::AbiMismatch {
            name: name.to_string(),
            expected: ABI_VERSION,
            found: declaration.abi_version,
        });
    }
    if declaration.core_version != CORE_VERSION {
        return Err(ModuleLoadError::CoreVersionMismatch {
            name: name.to_string(),
            expected: CORE_VERSION,
            found: declaration.core_version.to_string(),
        });
    }
    if declaration.name != name {
        return Err(ModuleLoadError::NameMismatch {
            expected: name.to_string(),
            found: declaration.name.to_string(),
        });
    }
    Ok(())
}

/// Run a module's registration, turning a panic into an error
fn initialize(name: &str, module: &dyn NativeModule) -> Result<Vec<ModuleEntry>, ModuleLoadError> {
    let mut registrar = ModuleRegistrar::new();
    panic::catch_unwind(AssertUnwindSafe(|| module.register(&mut registrar))).map_err(|_| {
        ModuleLoadError::InitPanicked {
            name: name.to_string(),
        }
    })?;
    Ok(registrar.into_entries())
}

fn static_function(entry: ModuleEntry) -> LoadedFunction {
    let function = entry.entry;
    LoadedFunction {
        name: entry.name,
        arity: entry.arity,
        entry: Arc::new(move |heap: &mut Heap, args: &[Value]| function(heap, args)),
    }
}

fn library_function(entry: ModuleEntry, library: Arc<Library>) -> LoadedFunction {
    let function = entry.entry;
    LoadedFunction {
        name: entry.name,
        arity: entry.arity,
        entry: Arc::new(move |heap: &mut Heap, args: &[Value]| {
            let _loaded = &library;
            function(heap, args)
        }),
    }
}
