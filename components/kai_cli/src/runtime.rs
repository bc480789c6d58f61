//! Runtime orchestration for the `kai` binary
//!
//! A [`Session`] owns one interpreter runtime configured from the command
//! line, with the Cranelift backend installed unless compilation is off.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use core_types::Value;
use interpreter::{Runtime, RuntimeConfig};
use jit_compiler::CraneliftBackend;

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Environment variable listing extra module directories in the platform's
/// search path syntax (`:` on Unix, `;` on Windows)
pub const MODULE_PATH_ENV: &str = "KAI_MODULE_PATH";

/// Layer the configuration sources.
///
/// The config file comes first, then flags, then `module_path_env`, whose
/// directories are appended after any given on the command line.
///
/// # Examples
///
/// ```
/// use clap::Parser;
/// use kai_cli::{build_config, Cli};
///
/// let cli = Cli::try_parse_from(["kai", "--no-jit", "-m", "lib"]).unwrap();
/// let env = std::env::join_paths(["/opt/kai", "/usr/lib/kai"]).unwrap();
/// let config = build_config(&cli, Some(&env)).unwrap();
/// assert!(!config.jit_enabled);
/// assert_eq!(config.module_paths.len(), 3);
/// ```
pub fn build_config(cli: &Cli, module_path_env: Option<&OsStr>) -> CliResult<RuntimeConfig> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)?,
        None => RuntimeConfig::default(),
    };

    if cli.no_jit {
        config.jit_enabled = false;
    }
    for dir in &cli.module_path {
        config = config.with_module_path(dir);
    }
    if let Some(list) = module_path_env {
        for dir in std::env::split_paths(list).filter(|dir| !dir.as_os_str().is_empty()) {
            config = config.with_module_path(dir);
        }
    }
    Ok(config)
}

/// One runtime driven by the CLI
pub struct Session {
    runtime: Runtime,
    print_ast: bool,
    gc_stats: bool,
}

impl Session {
    /// Create a session with bundled modules registered
    pub fn new(config: RuntimeConfig) -> CliResult<Self> {
        let jit = config.jit_enabled;
        let mut runtime = Runtime::new(config)?;
        runtime.register_module(Arc::new(kai_math::kai_module_declaration));

        if jit {
            match CraneliftBackend::new() {
                Ok(backend) => runtime.set_backend(Box::new(backend)),
                Err(error) => tracing::warn!(%error, "native backend unavailable, interpreting"),
            }
        }

        Ok(Self {
            runtime,
            print_ast: false,
            gc_stats: false,
        })
    }

    /// Create a session from parsed arguments and the process environment
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let env = std::env::var_os(MODULE_PATH_ENV);
        let config = build_config(cli, env.as_deref())?;
        Ok(Self::new(config)?
            .with_print_ast(cli.print_ast)
            .with_gc_stats(cli.gc_stats))
    }

    /// Enable AST printing
    pub fn with_print_ast(mut self, enabled: bool) -> Self {
        self.print_ast = enabled;
        self
    }

    /// Enable the exit statistics report
    pub fn with_gc_stats(mut self, enabled: bool) -> Self {
        self.gc_stats = enabled;
        self
    }

    /// Whether statistics should be printed on exit
    pub fn wants_gc_stats(&self) -> bool {
        self.gc_stats
    }

    /// The underlying runtime
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The underlying runtime, mutably
    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    /// Run a program file
    pub fn execute_file(&mut self, path: &Path) -> CliResult<Value> {
        let source = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.execute_string(&source)
    }

    /// Run program text, returning the value of its last expression
    pub fn execute_string(&mut self, source: &str) -> CliResult<Value> {
        let program = self.runtime.parse(source)?;

        if self.print_ast {
            for expr in &program {
                println!("{:#?}", expr);
            }
        }

        Ok(self.runtime.evaluate_all(&program)?)
    }

    /// Printed form of a result; nil prints nothing
    pub fn render(&self, value: Value) -> Option<String> {
        match value {
            Value::Nil => None,
            other => Some(self.runtime.display(other)),
        }
    }

    /// One-line collector summary
    pub fn gc_report(&self) -> String {
        let stats = self.runtime.gc_stats();
        format!(
            "gc: collections={} allocated={} freed={} live={}",
            stats.collections, stats.total_allocated, stats.total_freed, stats.live_objects
        )
    }
}
