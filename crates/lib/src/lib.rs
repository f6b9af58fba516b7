//! exeforge-lib: turn scripts into standalone executables.
//!
//! This crate drives the external compilers and packagers that do the
//! actual work:
//! - `toolchain`: the registry of backends, probing and installation
//! - `compile`: the dispatcher and per-toolchain invocation strategies
//! - `state`: settings, profiles, recent files and build history on disk
//! - `orchestrator`: the context object front ends talk to

pub mod batch;
pub mod buildlog;
pub mod compile;
pub mod consts;
pub mod exec;
pub mod orchestrator;
pub mod platform;
pub mod sign;
pub mod state;
pub mod toolchain;
pub mod util;

pub use orchestrator::Orchestrator;
