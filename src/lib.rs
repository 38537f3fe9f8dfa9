//! # Worklet Extraction Pass
//!
//! Rewrites functions meant to run in a separate execution context (a
//! "worklet") into self-describing values the remote runtime can rebuild.
//!
//! ## Pass Invariants
//!
//! 1. **Classification**: a function is a worklet when its body opens with the
//!    `'worklet'` directive, when it sits at a listed argument position of a
//!    listed callee, or when it is a property value of the object literal given
//!    first to an object hook. Each function is processed at most once.
//!
//! 2. **Closure Capture**: every name read inside the worklet and bound outside
//!    it is captured, except configured and built-in globals. Member chains are
//!    captured as narrowly as possible (`a.b` captures `{a: {b: a.b}}`), and a
//!    terminal capture always wins over a narrower one.
//!
//! 3. **Serialization**: the serialized text destructures the captured roots
//!    from `jsThis._closure`, carries no `'worklet'` directive and no type
//!    annotations, and is printed minified. Its 64-bit hash keys the runtime's
//!    cache.
//!
//! 4. **Emission**: each worklet is replaced in place by a wrapper that attaches
//!    `_closure`, `asString`, `__workletHash`, `__location` and, when nonzero,
//!    `__optimization`, registers the function and evaluates to it. Named
//!    declarations keep their binding. Code outside worklets is untouched.
//!
//! 5. **Idempotence**: emitted code contains no directive and no function
//!    argument at a listed position, so running the pass twice changes nothing.
//!    Emitting one definition twice within a pass is an invariant violation
//!    (W-ERR-REENTRANT-001).

mod cache;
mod capture;
mod classify;
mod codegen;
mod config;
mod discovery;
mod emit;
mod optimize;
mod scope;
mod tables;
mod transform;
mod validate;
mod visitor;

#[cfg(test)]
mod closure_tests;

pub use capture::CaptureTrie;
pub use codegen::string_hash_64;
pub use config::{Globals, TransformOptions};
pub use discovery::{find_source_files, transform_directory, FileResult};
pub use optimize::OptimizationFlags;
pub use transform::{transform_source, transform_with_globals, TransformOutput, WorkletRecord};
pub use validate::*;

#[cfg(feature = "napi")]
pub use discovery::transform_directory_native;
#[cfg(feature = "napi")]
pub use transform::{transform_worklets_native, worklet_hash_native};
