//! Module loading errors

use std::path::PathBuf;

use core_types::Exception;
use thiserror::Error;

/// Why a module could not be resolved or initialized
#[derive(Debug, Error)]
pub enum ModuleLoadError {
    /// Module names are plain identifiers, never paths
    #[error("invalid module name '{name}'")]
    InvalidName {
        /// Requested name
        name: String,
    },

    /// No static module and no library file matched
    #[error("module '{name}' not found (searched {})", display_paths(.searched))]
    NotFound {
        /// Requested name
        name: String,
        /// Library paths that were tried
        searched: Vec<PathBuf>,
    },

    /// The dynamic linker rejected the file
    #[error("failed to open module library {}", .path.display())]
    Open {
        /// Library path
        path: PathBuf,
        /// Linker error
        #[source]
        source: libloading::Error,
    },

    /// The library does not export a module declaration
    #[error("{} does not export a module declaration", .path.display())]
    MissingDeclaration {
        /// Library path
        path: PathBuf,
        /// Lookup error
        #[source]
        source: libloading::Error,
    },

    /// The declaration layout version differs from the host's
    #[error("module '{name}' uses ABI version {found}, expected {expected}")]
    AbiMismatch {
        /// Requested name
        name: String,
        /// Host ABI version
        expected: u32,
        /// Library ABI version
        found: u32,
    },

    /// The library was built against different core crates
    #[error("module '{name}' was built for core {found}, host is {expected}")]
    CoreVersionMismatch {
        /// Requested name
        name: String,
        /// Host core version
        expected: &'static str,
        /// Library core version
        found: String,
    },

    /// The library declares a different module
    #[error("library for '{expected}' declares module '{found}'")]
    NameMismatch {
        /// Requested name
        expected: String,
        /// Declared name
        found: String,
    },

    /// The registration function panicked
    #[error("module '{name}' panicked during initialization")]
    InitPanicked {
        /// Requested name
        name: String,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no module paths".to_string();
    }
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<ModuleLoadError> for Exception {
    fn from(error: ModuleLoadError) -> Self {
        Exception::module_load(error.to_string())
    }
}
