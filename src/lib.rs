//! Reify – reified instruction programs and their trampoline
//!
//! Application code describes a sequence of effectful instructions in
//! ordinary sequential style; a separately supplied handler decides how each
//! instruction is carried out. This crate provides:
//! - `instruction_set!` for declaring a closed set of typed instructions and
//!   the handler contract that goes with it
//! - `Program`, the inert tree a description is reified into
//! - `program`, which turns an `async` description into a `Program`
//! - `Executor`, a stack-safe trampoline that runs a `Program` against a handler
//! - schema and shape types for tooling that renders the same design elsewhere

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Runtime model: instructions, handlers, programs, builder and executor
pub mod runtime;
/// Instruction schemas and their resolved interpreter shapes
pub mod schema;

// Re-export key types for convenience
pub use runtime::error::{
    BuildError, BuildResult, CellError, Error, ExecError, ExecResult, Result, SchemaError,
    SchemaResult,
};
pub use runtime::{
    Accept, Dispatch, Effects, Executor, ExecutorConfig, Handle, Instruction, InstructionSet,
    Logged, Perform, Program, Recorder, ResultCell, RunId, RunOutcome, RunStats, Thunk, dispatch,
    program, run,
};
pub use schema::{InstructionDescriptor, InterpreterShape, Parameter, Schema, TypeRef};

/// Current version of the reify crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
