//! Instrumented handlers
//!
//! Wrappers that add observation to any handler without touching the
//! programs that run against it. Both implement [`Handle`] for every
//! instruction their inner handler handles, so they satisfy every generated
//! handler trait the inner handler satisfies.

use super::instruction::{Handle, Instruction};

/// Handler wrapper that traces every dispatch
#[derive(Debug, Clone, Default)]
pub struct Logged<H> {
    inner: H,
}

impl<H> Logged<H> {
    /// Wrap `inner`
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped handler
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Unwrap the handler
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<X, H> Handle<X> for Logged<H>
where
    X: Instruction,
    H: Handle<X>,
{
    async fn handle(&mut self, instruction: &X) -> anyhow::Result<X::Output> {
        tracing::info!(instruction = X::NAME, params = ?instruction, "handling instruction");
        let result = self.inner.handle(instruction).await;
        match &result {
            Ok(_) => tracing::debug!(instruction = X::NAME, "instruction handled"),
            Err(error) => tracing::warn!(instruction = X::NAME, %error, "instruction failed"),
        }
        result
    }
}

/// One dispatch observed by a [`Recorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Instruction variant name
    pub instruction: &'static str,
    /// Debug rendering of the instruction's parameters
    pub detail: String,
    /// Whether the inner handler completed successfully
    pub succeeded: bool,
}

/// Handler wrapper that records dispatches in the order they arrive
#[derive(Debug, Clone, Default)]
pub struct Recorder<H> {
    inner: H,
    dispatches: Vec<Dispatch>,
}

impl<H> Recorder<H> {
    /// Wrap `inner` with an empty log
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            dispatches: Vec::new(),
        }
    }

    /// Dispatches observed so far
    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    /// Instruction names observed so far, in dispatch order
    pub fn names(&self) -> Vec<&'static str> {
        self.dispatches.iter().map(|d| d.instruction).collect()
    }

    /// Borrow the wrapped handler
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Split into the wrapped handler and the recorded log
    pub fn into_parts(self) -> (H, Vec<Dispatch>) {
        (self.inner, self.dispatches)
    }
}

impl<X, H> Handle<X> for Recorder<H>
where
    X: Instruction,
    H: Handle<X>,
{
    async fn handle(&mut self, instruction: &X) -> anyhow::Result<X::Output> {
        let index = self.dispatches.len();
        self.dispatches.push(Dispatch {
            instruction: X::NAME,
            detail: format!("{:?}", instruction),
            succeeded: false,
        });
        let value = self.inner.handle(instruction).await?;
        self.dispatches[index].succeeded = true;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::executor::run;
    use crate::runtime::program::Program;

    crate::instruction_set! {
        enum Store {
            handler StoreHandler;
            Put(key: String, value: u32) -> bool;
            Get(key: String) -> Option<u32>;
        }
    }

    #[derive(Default)]
    struct Memory {
        entries: std::collections::HashMap<String, u32>,
    }

    impl Handle<Put> for Memory {
        async fn handle(&mut self, instruction: &Put) -> anyhow::Result<bool> {
            Ok(self
                .entries
                .insert(instruction.key.clone(), instruction.value)
                .is_none())
        }
    }

    impl Handle<Get> for Memory {
        async fn handle(&mut self, instruction: &Get) -> anyhow::Result<Option<u32>> {
            match self.entries.get(&instruction.key) {
                Some(value) => Ok(Some(*value)),
                None if instruction.key.is_empty() => anyhow::bail!("empty key"),
                None => Ok(None),
            }
        }
    }

    fn put_then_get(key: &str) -> Program<Store, Option<u32>> {
        let key = key.to_string();
        Program::perform(Put::new(key.clone(), 9), move |_| {
            Program::perform(Get::new(key), Program::pure)
        })
    }

    #[tokio::test]
    async fn test_recorder_keeps_dispatch_order() {
        let mut handler = Recorder::new(Memory::default());
        let value = run(put_then_get("seats"), &mut handler).await.unwrap();
        assert_eq!(value, Some(9));
        assert_eq!(handler.names(), vec!["Put", "Get"]);
        assert_eq!(
            handler.dispatches()[0].detail,
            "Put { key: \"seats\", value: 9 }"
        );
        assert!(handler.dispatches().iter().all(|d| d.succeeded));
    }

    #[tokio::test]
    async fn test_recorder_marks_failures() {
        let program: Program<Store, Option<u32>> =
            Program::perform(Get::new(String::new()), Program::pure);
        let mut handler = Recorder::new(Memory::default());
        assert!(run(program, &mut handler).await.is_err());
        let (_, log) = handler.into_parts();
        assert_eq!(log.len(), 1);
        assert!(!log[0].succeeded);
    }

    #[tokio::test]
    async fn test_logged_is_transparent() {
        let mut handler = Logged::new(Recorder::new(Memory::default()));
        let value = run(put_then_get("k"), &mut handler).await.unwrap();
        assert_eq!(value, Some(9));
        assert_eq!(handler.into_inner().names(), vec!["Put", "Get"]);
    }
}
