//! Instruction values and the handler contract
//!
//! An instruction set is a closed enum with one variant per schema entry;
//! each variant wraps a struct implementing [`Instruction`]. Handlers
//! implement [`Handle`] once per variant, and the generated handler trait of
//! a set requires all of them, so a missing operation is a compile error
//! rather than a runtime fallback. Sets are normally produced by
//! [`instruction_set!`](crate::instruction_set).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::cell::ResultCell;
use super::error::{ExecError, ExecResult};
use crate::schema::{InstructionDescriptor, Schema};

/// A single effect request with typed parameters and a declared result type
pub trait Instruction: fmt::Debug + Send + Sized + 'static {
    /// Variant name as declared in the schema
    const NAME: &'static str;

    /// Result type the handler produces for this instruction
    type Output: Send + 'static;

    /// Closed set this instruction belongs to
    type Set: InstructionSet + From<Self>;

    /// Cell the handler's result is written into
    fn result_cell(&self) -> &Arc<ResultCell<Self::Output>>;

    /// Schema entry describing this instruction
    fn descriptor() -> InstructionDescriptor;
}

/// Closed set of instruction variants
pub trait InstructionSet: fmt::Debug + Send + Sized + 'static {
    /// Name of the set (the schema base name)
    const BASE_NAME: &'static str;

    /// Name of the variant held by this value
    fn name(&self) -> &'static str;

    /// Schema the set was declared from
    fn schema() -> Schema;
}

/// Handler operation for one instruction variant
///
/// The operation may suspend for as long as it needs. Its result is not
/// returned to the trampoline; dispatch stores it in the instruction's
/// result cell and the trampoline only observes completion.
pub trait Handle<X: Instruction> {
    /// Carry out the effect requested by `instruction`
    fn handle(&mut self, instruction: &X) -> impl Future<Output = anyhow::Result<X::Output>>;
}

/// Dispatch of a set value to the single matching handler operation
pub trait Accept<H: ?Sized>: InstructionSet {
    /// Apply this instruction to `handler`, completing once its result is stored
    fn accept(&self, handler: &mut H) -> impl Future<Output = ExecResult<()>>;
}

/// Run `handler`'s operation for `instruction` and store its result.
///
/// On handler failure the cell is left empty.
pub async fn dispatch<X, H>(instruction: &X, handler: &mut H) -> ExecResult<()>
where
    X: Instruction,
    H: Handle<X> + ?Sized,
{
    let value = handler
        .handle(instruction)
        .await
        .map_err(|source| ExecError::Handler {
            instruction: X::NAME,
            source,
        })?;

    instruction
        .result_cell()
        .set(value)
        .map_err(|source| ExecError::Cell {
            instruction: X::NAME,
            source,
        })
}
