//! Error types for the reify runtime
//!
//! Each concern gets its own thiserror enum; `Error` collects them for callers
//! that drive both the schema layer and the executor.

use thiserror::Error;

/// Top-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Schema-related errors
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Program construction errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Program execution errors
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Violations of the instruction schema invariants
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema base name is empty
    #[error("Schema base name must not be empty")]
    EmptyBaseName,

    /// An instruction has an empty name
    #[error("Instruction at position {0} has an empty name")]
    EmptyInstructionName(usize),

    /// Two instructions share a name
    #[error("Instruction '{0}' is declared more than once")]
    DuplicateInstruction(String),

    /// An instruction has no result type
    #[error("Instruction '{0}' has an empty result type")]
    EmptyResultType(String),

    /// A parameter is missing its name or type
    #[error("Parameter {position} of instruction '{instruction}' is missing a name or type")]
    IncompleteParameter {
        /// Instruction owning the parameter
        instruction: String,
        /// Zero-based parameter position
        position: usize,
    },

    /// Two parameters of one instruction share a name
    #[error("Parameter '{parameter}' is declared more than once on instruction '{instruction}'")]
    DuplicateParameter {
        /// Instruction owning the parameters
        instruction: String,
        /// Repeated parameter name
        parameter: String,
    },

    /// Two resolved variants were assigned the same tag
    #[error("Variants '{first}' and '{second}' share tag {tag}")]
    DuplicateTag {
        /// Shared tag value
        tag: usize,
        /// First variant carrying the tag
        first: String,
        /// Second variant carrying the tag
        second: String,
    },

    /// Schema document could not be decoded
    #[error("Invalid schema document: {0}")]
    Decode(String),
}

/// Misuse of a write-once result cell
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CellError {
    /// `set` was called on a cell that already holds a result
    #[error("result cell was already set")]
    AlreadySet,

    /// The result was read before any handler produced it
    #[error("result cell was read before it was set")]
    Unset,

    /// The result was already consumed by a continuation
    #[error("result cell was already taken")]
    AlreadyTaken,
}

/// Failures raised while a program description produces its next node
#[derive(Debug, Error)]
pub enum BuildError {
    /// The describing code itself failed
    #[error("program description failed: {0}")]
    Described(#[source] anyhow::Error),

    /// The description suspended on something that is not an instruction
    #[error("program description suspended without requesting an instruction")]
    ForeignSuspension,

    /// A continuation could not read the result of its instruction
    #[error("continuation could not read its instruction result: {0}")]
    Cell(#[from] CellError),
}

/// Failures surfaced by the trampoline executor
#[derive(Debug, Error)]
pub enum ExecError {
    /// A handler operation failed while performing its effect
    #[error("handler for '{instruction}' failed: {source}")]
    Handler {
        /// Name of the instruction variant being handled
        instruction: &'static str,
        /// Error reported by the handler
        #[source]
        source: anyhow::Error,
    },

    /// The dispatch glue could not store the handler's result
    #[error("could not record result of '{instruction}': {source}")]
    Cell {
        /// Name of the instruction variant being handled
        instruction: &'static str,
        /// Cell failure
        #[source]
        source: CellError,
    },

    /// Producing the next program node failed
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The configured step limit was reached before a `Return` node
    #[error("program exceeded the step limit of {0}")]
    StepLimitExceeded(u64),
}

/// Convenience result alias for schema operations
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Convenience result alias for program construction
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Convenience result alias for executor operations
pub type ExecResult<T> = std::result::Result<T, ExecError>;

/// Result type using `Error`
pub type Result<T> = std::result::Result<T, Error>;
