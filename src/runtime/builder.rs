//! Sequential program descriptions
//!
//! [`program`] turns an `async` block written like straight-line code into a
//! [`Program`] tree. The block requests effects with [`Effects::perform`];
//! each request suspends the block, and the builder turns that suspension
//! into an `Await` node whose continuation polls the block again. Nothing in
//! the block runs until the executor reaches the first `Delay` node.
//!
//! ```
//! use reify::{Program, program};
//!
//! reify::instruction_set! {
//!     enum Counter {
//!         handler CounterHandler;
//!         ReadValue() -> i64;
//!     }
//! }
//!
//! let described: Program<Counter, i64> = program(|fx| async move {
//!     let x = fx.perform(ReadValue::new()).await?;
//!     Ok(x + 1)
//! });
//! assert!(matches!(described, Program::Delay(_)));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;
use parking_lot::Mutex;

use super::cell::ResultCell;
use super::error::{BuildError, BuildResult, CellError};
use super::instruction::{Instruction, InstructionSet};
use super::program::Program;

/// The single outstanding request of a description, tagged with the ticket
/// of the `Perform` that issued it
struct Slot<I> {
    issued: u64,
    pending: Option<(u64, I)>,
}

impl<I> Slot<I> {
    fn holds(&self, ticket: u64) -> bool {
        matches!(self.pending, Some((pending, _)) if pending == ticket)
    }
}

type Request<I> = Arc<Mutex<Slot<I>>>;

/// Capability handed to a description for requesting instructions
pub struct Effects<I> {
    request: Request<I>,
}

impl<I: InstructionSet> Effects<I> {
    /// Request `instruction`; awaiting the returned future yields its result.
    pub fn perform<X>(&self, instruction: X) -> Perform<I, X::Output>
    where
        X: Instruction<Set = I>,
        I: From<X>,
    {
        let cell = instruction.result_cell().clone();
        Perform {
            instruction: Some(I::from(instruction)),
            ticket: None,
            cell,
            request: self.request.clone(),
        }
    }
}

impl<I> Clone for Effects<I> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
        }
    }
}

/// Future of one requested instruction's result
///
/// The first poll hands the instruction to the builder and suspends. The
/// next poll happens only after the executor dispatched it, and reads the
/// result cell. If another request is still outstanding the instruction
/// waits for the next resumption, so concurrently awaited requests are
/// issued one at a time in poll order. Dropping a `Perform` before the
/// builder collected its request withdraws the request.
#[must_use = "instructions are only requested when awaited"]
pub struct Perform<I, R> {
    instruction: Option<I>,
    ticket: Option<u64>,
    cell: Arc<ResultCell<R>>,
    request: Request<I>,
}

impl<I, R> Unpin for Perform<I, R> {}

impl<I, R> Future for Perform<I, R> {
    type Output = Result<R, CellError>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let mut slot = this.request.lock();
        if let Some(instruction) = this.instruction.take() {
            if slot.pending.is_none() {
                slot.issued += 1;
                let ticket = slot.issued;
                slot.pending = Some((ticket, instruction));
                this.ticket = Some(ticket);
            } else {
                this.instruction = Some(instruction);
            }
            return Poll::Pending;
        }
        if this.ticket.is_some_and(|ticket| slot.holds(ticket)) {
            return Poll::Pending;
        }
        drop(slot);
        Poll::Ready(this.cell.take())
    }
}

impl<I, R> Drop for Perform<I, R> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket {
            let mut slot = self.request.lock();
            if slot.holds(ticket) {
                slot.pending = None;
            }
        }
    }
}

type Description<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

struct Machine<I, T> {
    description: Description<T>,
    request: Request<I>,
}

impl<I, T> Machine<I, T>
where
    I: InstructionSet,
    T: Send + 'static,
{
    /// Run the description up to its next request or its end.
    fn resume(mut self) -> BuildResult<Program<I, T>> {
        let mut cx = Context::from_waker(noop_waker_ref());
        let polled = self.description.as_mut().poll(&mut cx);
        let requested = self.request.lock().pending.take();
        match polled {
            Poll::Ready(Ok(value)) => Ok(Program::Return(value)),
            Poll::Ready(Err(error)) => Err(BuildError::Described(error)),
            Poll::Pending => match requested {
                Some((_, instruction)) => {
                    Ok(Program::Await(instruction, Box::new(move || self.resume())))
                }
                None => Err(BuildError::ForeignSuspension),
            },
        }
    }
}

/// Build a program from a sequential description.
///
/// The result is a `Delay` node; the description starts running when the
/// executor evaluates it. An error returned by the description aborts the
/// program at that point.
pub fn program<I, T, F, Fut>(describe: F) -> Program<I, T>
where
    I: InstructionSet,
    T: Send + 'static,
    F: FnOnce(Effects<I>) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    Program::Delay(Box::new(move || {
        let request = Arc::new(Mutex::new(Slot {
            issued: 0,
            pending: None,
        }));
        let effects = Effects {
            request: request.clone(),
        };
        Machine {
            description: Box::pin(describe(effects)),
            request,
        }
        .resume()
    }))
}

#[cfg(test)]
mod tests {
    use futures::future::Either;

    use super::*;

    crate::instruction_set! {
        enum Steps {
            handler StepsHandler;
            A() -> i32;
            B(a: i32) -> String;
        }
    }

    fn expect_delay(program: Program<Steps, String>) -> Program<Steps, String> {
        match program {
            Program::Delay(step) => step().unwrap(),
            other => panic!("expected delay, got {:?}", other),
        }
    }

    #[test]
    fn test_nodes_follow_description() {
        let described = program(|fx: Effects<Steps>| async move {
            let a = fx.perform(A::new()).await?;
            let b = fx.perform(B::new(a)).await?;
            Ok(b)
        });

        let Program::Await(Steps::A(a), resume) = expect_delay(described) else {
            panic!("expected await on A");
        };
        a.result_cell().set(7).unwrap();

        let Program::Await(Steps::B(b), resume) = resume().unwrap() else {
            panic!("expected await on B");
        };
        assert_eq!(b.a, 7);
        b.result_cell().set("seven".to_string()).unwrap();

        match resume().unwrap() {
            Program::Return(value) => assert_eq!(value, "seven"),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_description_error_aborts() {
        let described = program(|fx: Effects<Steps>| async move {
            let a = fx.perform(A::new()).await?;
            if a < 0 {
                anyhow::bail!("negative seat count");
            }
            Ok(a.to_string())
        });

        let Program::Await(Steps::A(a), resume) = expect_delay(described) else {
            panic!("expected await on A");
        };
        a.result_cell().set(-1).unwrap();
        let err = resume().unwrap_err();
        assert!(matches!(err, BuildError::Described(_)));
        assert!(err.to_string().contains("negative seat count"));
    }

    #[test]
    fn test_foreign_suspension_is_rejected() {
        let described: Program<Steps, String> = program(|_fx| async move {
            futures::future::pending::<()>().await;
            Ok(String::new())
        });
        let Program::Delay(step) = described else {
            panic!("expected delay");
        };
        assert!(matches!(step(), Err(BuildError::ForeignSuspension)));
    }

    #[test]
    fn test_request_lost_in_select_is_withdrawn() {
        let described = program(|fx: Effects<Steps>| async move {
            let raced = futures::future::select(fx.perform(A::new()), futures::future::ready(5));
            let v = match raced.await {
                Either::Left((a, _)) => a?,
                Either::Right((v, losing)) => {
                    drop(losing);
                    v
                }
            };
            let b = fx.perform(B::new(v)).await?;
            Ok(b)
        });

        let Program::Await(Steps::B(b), resume) = expect_delay(described) else {
            panic!("expected await on B only");
        };
        assert_eq!(b.a, 5);
        b.result_cell().set("five".into()).unwrap();
        match resume().unwrap() {
            Program::Return(value) => assert_eq!(value, "five"),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_return_with_request_outstanding_dispatches_nothing() {
        let described = program(|fx: Effects<Steps>| async move {
            let mut pending = fx.perform(A::new());
            assert!(futures::poll!(&mut pending).is_pending());
            Ok("done".to_string())
        });

        match expect_delay(described) {
            Program::Return(value) => assert_eq!(value, "done"),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_request_is_never_issued() {
        let leaked = Arc::new(Mutex::new(None));
        let keep = leaked.clone();
        let described = program(move |fx: Effects<Steps>| async move {
            let mut pending = fx.perform(A::new());
            assert!(futures::poll!(&mut pending).is_pending());
            *keep.lock() = Some(pending);
            Ok("done".to_string())
        });

        match expect_delay(described) {
            Program::Return(value) => assert_eq!(value, "done"),
            other => panic!("expected return, got {:?}", other),
        }
        let outstanding = leaked.lock().take().unwrap();
        assert!(outstanding.request.lock().pending.is_none());
    }

    #[test]
    fn test_joined_requests_are_serialized() {
        let described = program(|fx: Effects<Steps>| async move {
            let (a, b) = futures::join!(fx.perform(A::new()), fx.perform(B::new(1)));
            Ok(format!("{}-{}", a?, b?))
        });

        let Program::Await(Steps::A(a), resume) = expect_delay(described) else {
            panic!("expected await on A");
        };
        a.result_cell().set(3).unwrap();
        let Program::Await(Steps::B(b), resume) = resume().unwrap() else {
            panic!("expected await on B");
        };
        b.result_cell().set("x".into()).unwrap();
        match resume().unwrap() {
            Program::Return(value) => assert_eq!(value, "3-x"),
            other => panic!("expected return, got {:?}", other),
        }
    }
}
