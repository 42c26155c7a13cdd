//! Program trees
//!
//! A `Program` is inert data: a finished value, a deferred step, or a
//! suspension on one instruction followed by a continuation. Continuations
//! take no argument; they read the result their instruction's handler left
//! in the result cell. They are `FnOnce`, so each can resume at most once.

use std::fmt;

use super::error::{BuildError, BuildResult};
use super::instruction::{Instruction, InstructionSet};
use crate::schema::NodeShape;

/// Deferred computation of the next program node
pub type Thunk<I, T> = Box<dyn FnOnce() -> BuildResult<Program<I, T>> + Send>;

/// Reified computation over the instruction set `I` producing `T`
pub enum Program<I, T> {
    /// Finished computation
    Return(T),
    /// Step computed only when the executor reaches it
    Delay(Thunk<I, T>),
    /// Dispatch the instruction, then resume with the continuation
    Await(I, Thunk<I, T>),
}

impl<I, T> Program<I, T>
where
    I: InstructionSet,
    T: Send + 'static,
{
    /// A program that finishes immediately with `value`
    pub fn pure(value: T) -> Self {
        Program::Return(value)
    }

    /// Defer building the rest of the program until it is reached
    pub fn delay<F>(step: F) -> Self
    where
        F: FnOnce() -> Program<I, T> + Send + 'static,
    {
        Program::Delay(Box::new(move || Ok(step())))
    }

    /// Defer a step that may fail while being described
    pub fn try_delay<F>(step: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Program<I, T>> + Send + 'static,
    {
        Program::Delay(Box::new(move || step().map_err(BuildError::Described)))
    }

    /// A program whose description fails as soon as it is evaluated
    pub fn fail(error: impl Into<anyhow::Error>) -> Self {
        let error = error.into();
        Program::Delay(Box::new(move || Err(BuildError::Described(error))))
    }

    /// Suspend on `instruction` and continue with its result.
    pub fn perform<X, F>(instruction: X, next: F) -> Self
    where
        X: Instruction<Set = I>,
        I: From<X>,
        F: FnOnce(X::Output) -> Program<I, T> + Send + 'static,
    {
        let cell = instruction.result_cell().clone();
        Program::Await(
            I::from(instruction),
            Box::new(move || {
                let value = cell.take()?;
                Ok(next(value))
            }),
        )
    }

    /// Node kind at the root of this program
    pub fn kind(&self) -> NodeShape {
        match self {
            Program::Return(_) => NodeShape::Return,
            Program::Delay(_) => NodeShape::Delay,
            Program::Await(..) => NodeShape::Await,
        }
    }

    /// Instruction awaited at the root, if the root is an `Await` node
    pub fn pending_instruction(&self) -> Option<&I> {
        match self {
            Program::Await(instruction, _) => Some(instruction),
            _ => None,
        }
    }
}

impl<I: fmt::Debug, T: fmt::Debug> fmt::Debug for Program<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Return(value) => f.debug_tuple("Return").field(value).finish(),
            Program::Delay(_) => f.write_str("Delay(..)"),
            Program::Await(instruction, _) => {
                f.debug_tuple("Await").field(instruction).finish_non_exhaustive()
            }
        }
    }
}
