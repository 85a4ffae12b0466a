// SPDX-License-Identifier: MIT

//! Step functions: the units of work a graph runs in sequence

use super::state::{PartialUpdate, State};
use crate::adk::error::BoxError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

pub type StepResult = Result<PartialUpdate, BoxError>;

/// A graph node. Reads the merged state and proposes an update.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, state: &State) -> StepResult;
}

#[async_trait]
impl<T: Step + ?Sized> Step for Arc<T> {
    async fn run(&self, state: &State) -> StepResult {
        (**self).run(state).await
    }
}

type StepHandler = Arc<dyn Fn(State) -> BoxFuture<'static, StepResult> + Send + Sync>;

/// Adapts a closure into a [`Step`].
///
/// The closure receives a snapshot of the state, so it can move it into the
/// returned future.
#[derive(Clone)]
pub struct FnStep {
    handler: StepHandler,
}

impl FnStep {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult> + Send + 'static,
    {
        let handler: StepHandler =
            Arc::new(move |state: State| -> BoxFuture<'static, StepResult> { Box::pin(f(state)) });
        Self { handler }
    }
}

#[async_trait]
impl Step for FnStep {
    async fn run(&self, state: &State) -> StepResult {
        (self.handler)(state.clone()).await
    }
}

/// Build a step from a synchronous function of the state
pub fn step_fn<F>(f: F) -> FnStep
where
    F: Fn(&State) -> StepResult + Send + Sync + 'static,
{
    let f = Arc::new(f);
    FnStep::new(move |state: State| {
        let f = f.clone();
        async move { f(&state) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::langkit::graph::state::{FieldType, StateFieldDef, StateSchema};
    use serde_json::json;

    fn state() -> State {
        let schema = StateSchema::new().field("name", StateFieldDef::overwrite(FieldType::String));
        let mut state = State::new(&schema);
        state
            .apply(&PartialUpdate::new().with("name", "Ada"))
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_step_fn_reads_state() {
        let greet = step_fn(|s| {
            let name = s.get_str("name").unwrap_or_default();
            Ok(PartialUpdate::new().with("name", format!("Hello, {}", name)))
        });

        let update = greet.run(&state()).await.unwrap();
        assert_eq!(update.get("name"), Some(&json!("Hello, Ada")));
    }

    #[tokio::test]
    async fn test_async_fn_step() {
        let step = FnStep::new(|s: State| async move {
            tokio::task::yield_now().await;
            let upper = s.get_str("name").unwrap_or_default().to_uppercase();
            Ok(PartialUpdate::new().with("name", upper))
        });

        let update = step.run(&state()).await.unwrap();
        assert_eq!(update.get("name"), Some(&json!("ADA")));
    }

    #[tokio::test]
    async fn test_step_error_propagates() {
        let failing = step_fn(|_| Err("boom".into()));
        let err = failing.run(&state()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
