//! Versioned cache of compiled entries.
//!
//! Entries are keyed by a fingerprint of the function tree and the
//! primitives it was compiled against, and keep the lowered function they
//! were generated from. A hit must match that function exactly; a
//! fingerprint collision is a miss. Each entry remembers the backend
//! version that produced it; a lookup under a different version drops the
//! entry instead of returning it.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use core_types::{LambdaExpr, PrimitiveGuard};
use rustc_hash::{FxHashMap, FxHasher};

use crate::compiled::NativeCode;
use crate::ir::IrFunction;

/// Version of the code generator; bump when generated code changes shape
pub const BACKEND_VERSION: u32 = 1;

/// Content fingerprint of a function and its assumed primitives
pub fn fingerprint(code: &LambdaExpr, guards: &[PrimitiveGuard]) -> u64 {
    let mut hasher = FxHasher::default();
    code.params.hash(&mut hasher);
    code.body.hash(&mut hasher);
    guards.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug)]
struct CacheEntry {
    version: u32,
    function: IrFunction,
    code: Arc<NativeCode>,
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Entries dropped for a version mismatch
    pub invalidated: u64,
    /// Lookups whose fingerprint matched a different function
    pub collisions: u64,
}

/// Compiled entries by fingerprint
#[derive(Debug)]
pub struct CodeCache {
    version: u32,
    entries: FxHashMap<u64, CacheEntry>,
    stats: CacheStats,
}

impl CodeCache {
    /// Empty cache for the current backend version
    pub fn new() -> Self {
        Self::with_version(BACKEND_VERSION)
    }

    /// Empty cache for `version`
    pub fn with_version(version: u32) -> Self {
        Self {
            version,
            entries: FxHashMap::default(),
            stats: CacheStats::default(),
        }
    }

    /// Version new entries are stamped with
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Switch to another backend version; older entries become stale
    pub fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    /// Entry for `fingerprint`, if one was produced by this version from
    /// exactly `function`
    pub fn get(&mut self, fingerprint: u64, function: &IrFunction) -> Option<Arc<NativeCode>> {
        match self.entries.get(&fingerprint) {
            Some(entry) if entry.version == self.version && entry.function == *function => {
                self.stats.hits += 1;
                Some(Arc::clone(&entry.code))
            }
            Some(entry) if entry.version == self.version => {
                self.stats.collisions += 1;
                self.stats.misses += 1;
                None
            }
            Some(_) => {
                self.entries.remove(&fingerprint);
                self.stats.invalidated += 1;
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store `code`, generated from `function`, under `fingerprint`.
    ///
    /// A colliding entry is replaced.
    pub fn insert(&mut self, fingerprint: u64, function: IrFunction, code: Arc<NativeCode>) {
        self.entries.insert(
            fingerprint,
            CacheEntry {
                version: self.version,
                function,
                code,
            },
        );
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for CodeCache {
    fn default() -> Self {
        Self::new()
    }
}
