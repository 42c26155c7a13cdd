//! Trampoline executor
//!
//! Drives a [`Program`] to its `Return` node one reduction at a time, in a
//! loop, so the native stack stays flat no matter how many nodes the program
//! unfolds into. `Await` nodes are dispatched to the handler and their
//! continuation runs only after the dispatch completed successfully.

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::ExecutorConfig;
use super::error::{ExecError, ExecResult};
use super::ids::RunId;
use super::instruction::Accept;
use super::program::Program;

/// Counters collected while running one program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Nodes reduced, including the final `Return`
    pub steps: u64,
    /// `Delay` nodes evaluated
    pub delays: u64,
    /// Instructions dispatched to completion
    pub dispatches: u64,
}

/// Value of a finished run together with its bookkeeping
#[derive(Debug, Clone)]
pub struct RunOutcome<T> {
    /// Identifier the run was traced under
    pub run_id: RunId,
    /// Value of the final `Return` node
    pub value: T,
    /// Reduction counters
    pub stats: RunStats,
}

/// Trampoline that runs programs against caller-supplied handlers
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor with the given configuration
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `program` to completion, dispatching its instructions to `handler`.
    pub async fn run<I, T, H>(&self, program: Program<I, T>, handler: &mut H) -> ExecResult<T>
    where
        I: Accept<H>,
        T: Send + 'static,
        H: ?Sized,
    {
        self.run_with_stats(program, handler)
            .await
            .map(|outcome| outcome.value)
    }

    /// Run `program` to completion and report reduction counters.
    pub async fn run_with_stats<I, T, H>(
        &self,
        program: Program<I, T>,
        handler: &mut H,
    ) -> ExecResult<RunOutcome<T>>
    where
        I: Accept<H>,
        T: Send + 'static,
        H: ?Sized,
    {
        let run_id = RunId::new();
        let span = tracing::debug_span!("run", %run_id, set = I::BASE_NAME);
        self.drive(run_id, program, handler).instrument(span).await
    }

    /// Run `program` on the current thread, blocking until it finishes.
    ///
    /// Intended for handlers that do not depend on an async runtime's
    /// reactor; handlers that need one should use [`Executor::run`].
    pub fn run_blocking<I, T, H>(&self, program: Program<I, T>, handler: &mut H) -> ExecResult<T>
    where
        I: Accept<H>,
        T: Send + 'static,
        H: ?Sized,
    {
        futures::executor::block_on(self.run(program, handler))
    }

    async fn drive<I, T, H>(
        &self,
        run_id: RunId,
        mut program: Program<I, T>,
        handler: &mut H,
    ) -> ExecResult<RunOutcome<T>>
    where
        I: Accept<H>,
        T: Send + 'static,
        H: ?Sized,
    {
        let mut stats = RunStats::default();

        loop {
            stats.steps += 1;
            if self.config.debug {
                tracing::debug!(step = stats.steps, node = ?program.kind(), "reducing");
            }

            program = match program {
                Program::Return(value) => {
                    tracing::debug!(
                        steps = stats.steps,
                        dispatches = stats.dispatches,
                        "program returned"
                    );
                    return Ok(RunOutcome {
                        run_id,
                        value,
                        stats,
                    });
                }
                Program::Delay(step) => {
                    self.check_limit(&stats)?;
                    stats.delays += 1;
                    step().inspect_err(|error| {
                        tracing::debug!(%error, "program step failed");
                    })?
                }
                Program::Await(instruction, resume) => {
                    self.check_limit(&stats)?;
                    let name = instruction.name();
                    tracing::trace!(instruction = name, "dispatching");
                    if let Err(error) = instruction.accept(handler).await {
                        tracing::debug!(instruction = name, %error, "dispatch failed");
                        return Err(error);
                    }
                    drop(instruction);
                    stats.dispatches += 1;
                    resume().inspect_err(|error| {
                        tracing::debug!(instruction = name, %error, "continuation failed");
                    })?
                }
            };

            if let Some(interval) = self.config.yield_interval {
                if interval > 0 && stats.steps % interval == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    fn check_limit(&self, stats: &RunStats) -> ExecResult<()> {
        match self.config.step_limit {
            Some(limit) if stats.steps > limit => {
                tracing::warn!(limit, "program exceeded step limit");
                Err(ExecError::StepLimitExceeded(limit))
            }
            _ => Ok(()),
        }
    }
}

/// Run `program` with the default executor configuration.
pub async fn run<I, T, H>(program: Program<I, T>, handler: &mut H) -> ExecResult<T>
where
    I: Accept<H>,
    T: Send + 'static,
    H: ?Sized,
{
    Executor::default().run(program, handler).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::BuildError;
    use crate::{Effects, Handle, program};

    crate::instruction_set! {
        enum Counter {
            handler CounterHandler;
            ReadValue() -> i64;
            Tick() -> ();
        }
    }

    #[derive(Default)]
    struct Fixed {
        reads: usize,
        ticks: usize,
    }

    impl Handle<ReadValue> for Fixed {
        async fn handle(&mut self, _instruction: &ReadValue) -> anyhow::Result<i64> {
            self.reads += 1;
            Ok(41)
        }
    }

    impl Handle<Tick> for Fixed {
        async fn handle(&mut self, _instruction: &Tick) -> anyhow::Result<()> {
            self.ticks += 1;
            Ok(())
        }
    }

    fn ticks(n: u64) -> Program<Counter, u64> {
        if n == 0 {
            Program::pure(0)
        } else {
            Program::perform(Tick::new(), move |()| ticks(n - 1))
        }
    }

    #[tokio::test]
    async fn test_read_value_plus_one() {
        let described = program(|fx: Effects<Counter>| async move {
            let x = fx.perform(ReadValue::new()).await?;
            Ok(x + 1)
        });
        let mut handler = Fixed::default();
        assert_eq!(run(described, &mut handler).await.unwrap(), 42);
        assert_eq!(handler.reads, 1);
    }

    #[tokio::test]
    async fn test_stats_count_nodes() {
        let mut handler = Fixed::default();
        let outcome = Executor::default()
            .run_with_stats(ticks(3), &mut handler)
            .await
            .unwrap();
        assert_eq!(outcome.value, 0);
        assert_eq!(
            outcome.stats,
            RunStats {
                steps: 4,
                delays: 0,
                dispatches: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_step_limit() {
        let executor = Executor::new(ExecutorConfig {
            step_limit: Some(2),
            ..ExecutorConfig::default()
        });
        let mut handler = Fixed::default();
        let err = executor.run(ticks(10), &mut handler).await.unwrap_err();
        assert!(matches!(err, ExecError::StepLimitExceeded(2)));
        assert_eq!(handler.ticks, 2);
    }

    #[tokio::test]
    async fn test_yield_interval_still_completes() {
        let executor = Executor::new(ExecutorConfig {
            yield_interval: Some(3),
            debug: true,
            ..ExecutorConfig::default()
        });
        let mut handler = Fixed::default();
        assert_eq!(executor.run(ticks(20), &mut handler).await.unwrap(), 0);
        assert_eq!(handler.ticks, 20);
    }

    #[test]
    fn test_run_blocking() {
        let described: Program<Counter, i64> = Program::delay(|| {
            Program::perform(ReadValue::new(), |x| Program::pure(x * 2))
        });
        let mut handler = Fixed::default();
        let value = Executor::default()
            .run_blocking(described, &mut handler)
            .unwrap();
        assert_eq!(value, 82);
    }

    #[tokio::test]
    async fn test_description_failure_is_reported() {
        let described: Program<Counter, i64> = Program::fail(anyhow::anyhow!("no counter"));
        let mut handler = Fixed::default();
        let err = run(described, &mut handler).await.unwrap_err();
        assert!(matches!(err, ExecError::Build(BuildError::Described(_))));
        assert_eq!(handler.reads, 0);
    }
}
