//! A single stage of a pipeline and the actions it runs.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::ActionPanic;
use crate::queue::Queue;

/// Error returned by a step action.
pub type ActionError = Box<dyn Error + Send + Sync>;

/// Outcome of applying a step action to one value.
///
/// `Ok(Some(v))` forwards `v`, `Ok(None)` filters the value out and `Err`
/// drops it after logging.
pub type ActionResult<T> = Result<Option<T>, ActionError>;

/// Future type for step actions.
pub type ActionFuture<T> = Pin<Box<dyn Future<Output = ActionResult<T>> + Send>>;

/// Type-erased action shared by every worker of a step.
pub(crate) type StepAction<T> = Arc<dyn Fn(T) -> ActionFuture<T> + Send + Sync>;

/// Wrap a synchronous action. Each call runs on the blocking pool.
pub(crate) fn blocking_action<T, F, E>(action: F) -> StepAction<T>
where
    T: Send + 'static,
    F: Fn(T) -> Result<Option<T>, E> + Send + Sync + 'static,
    E: Into<ActionError> + Send + 'static,
{
    let action = Arc::new(action);
    Arc::new(move |value| -> ActionFuture<T> {
        let action = Arc::clone(&action);
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || action(value)).await {
                Ok(result) => result.map_err(Into::into),
                Err(e) if e.is_panic() => Err(panicked(&*e.into_panic())),
                Err(e) => Err(Box::new(e) as ActionError),
            }
        })
    })
}

/// Wrap an asynchronous action. Panics while building or polling the
/// future are caught and reported as action errors.
pub(crate) fn async_action<T, F, Fut, E>(action: F) -> StepAction<T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    E: Into<ActionError> + Send + 'static,
{
    Arc::new(move |value| -> ActionFuture<T> {
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| action(value))) {
            Ok(fut) => fut,
            Err(payload) => {
                let error = panicked(&*payload);
                return Box::pin(async move { Err(error) });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result.map_err(Into::into),
                Err(payload) => Err(panicked(&*payload)),
            }
        })
    })
}

fn panicked(payload: &(dyn Any + Send)) -> ActionError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    Box::new(ActionPanic { message })
}

/// One stage of an assembled pipeline.
///
/// Queues are shared with the neighbouring stages, not owned.
pub struct Step<T> {
    pub(crate) name: String,
    pub(crate) degree: usize,
    pub(crate) input: Queue<T>,
    pub(crate) output: Option<Queue<T>>,
    pub(crate) action: StepAction<T>,
}

impl<T> Step<T> {
    /// Label used in logs and metrics, `stage-<index>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of parallel workers.
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn input(&self) -> &Queue<T> {
        &self.input
    }

    /// `None` when results of this step are discarded.
    pub fn output(&self) -> Option<&Queue<T>> {
        self.output.as_ref()
    }

    /// Apply the step's action to one value.
    pub async fn apply(&self, value: T) -> ActionResult<T> {
        (self.action)(value).await
    }
}

impl<T> Clone for Step<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            degree: self.degree,
            input: self.input.clone(),
            output: self.output.clone(),
            action: Arc::clone(&self.action),
        }
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("degree", &self.degree)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}
