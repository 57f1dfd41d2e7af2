//! One-shot completion signal for a pipeline run.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Resolves once every stage of a run has finished.
///
/// Returned by [`Pipeline::run`](crate::Pipeline::run). Fires exactly once per
/// run, whether the pipeline drained or was interrupted. Dropping it does not
/// stop the run.
#[derive(Debug)]
#[must_use = "a run keeps going in the background; await the completion to know when it ends"]
pub struct Completion {
    rx: oneshot::Receiver<()>,
}

impl Completion {
    pub(in crate::pipeline) fn new(rx: oneshot::Receiver<()>) -> Self {
        Self { rx }
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender means the aggregator was torn down with the runtime;
        // the run is over either way.
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_when_signalled() {
        let (tx, rx) = oneshot::channel();
        let completion = Completion::new(rx);
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(1), completion)
            .await
            .expect("completion should resolve");
    }

    #[tokio::test]
    async fn test_pending_until_signalled() {
        let (tx, rx) = oneshot::channel();
        let mut completion = Completion::new(rx);

        let early = tokio::time::timeout(Duration::from_millis(20), &mut completion).await;
        assert!(early.is_err());

        tx.send(()).unwrap();
        completion.await;
    }

    #[tokio::test]
    async fn test_resolves_when_sender_dropped() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        Completion::new(rx).await;
    }
}
