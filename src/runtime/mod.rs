//! Runtime model and public API
//!
//! Instruction values, the handler contract, program trees, the sequential
//! builder and the trampoline executor that ties them together.

use serde::{Deserialize, Serialize};

// Submodules
pub mod builder;
pub mod cell;
pub mod error;
pub mod executor;
pub mod ids;
pub mod instruction;
pub mod instrument;
mod macros;
pub mod program;

/// Configuration for the trampoline executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Reduction steps between cooperative yields to the async runtime
    pub yield_interval: Option<u64>,

    /// Maximum number of `Delay`/`Await` reductions before the run fails
    pub step_limit: Option<u64>,

    /// Emit a tracing event for every reduction step
    pub debug: bool,
}

impl ExecutorConfig {
    /// Parse a configuration from a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> error::Result<Self> {
        serde_json::from_str(json).map_err(|e| error::Error::Config(e.to_string()))
    }
}

// Re-export commonly used types
pub use builder::{Effects, Perform, program};
pub use cell::ResultCell;
pub use executor::{Executor, RunOutcome, RunStats, run};
pub use ids::RunId;
pub use instruction::{Accept, Handle, Instruction, InstructionSet, dispatch};
pub use instrument::{Dispatch, Logged, Recorder};
pub use program::{Program, Thunk};
