//! Pipeline execution engine.
//!
//! A [`Pipeline`] is an assembled, validated sequence of [`Step`]s. Each call to
//! [`Pipeline::run`] starts one worker pool per step and hands back a
//! [`Completion`] that resolves when every stage has finished. Interruption is
//! cooperative: [`Pipeline::interrupt`] cancels a token every worker of the
//! current run watches between values.

mod completion;
mod step;
mod worker;

use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use workline_core::emit;
use workline_core::metrics::events::RunCompleted;

use crate::config::EngineConfig;
use crate::queue::Queue;

pub use completion::Completion;
pub use step::{ActionError, ActionFuture, ActionResult, Step};
pub(crate) use step::{StepAction, async_action, blocking_action};

/// An assembled pipeline, ready to run.
///
/// Built by [`PipelineBuilder`](crate::PipelineBuilder). May be run any number
/// of times; runs must not overlap.
pub struct Pipeline<T> {
    name: Arc<str>,
    config: EngineConfig,
    input: Queue<T>,
    output: Option<Queue<T>>,
    steps: Vec<Step<T>>,
    /// Interrupt token of the most recent run.
    current_run: Mutex<Option<CancellationToken>>,
}

impl<T> Pipeline<T> {
    pub(crate) fn new(
        name: &str,
        config: EngineConfig,
        input: Queue<T>,
        output: Option<Queue<T>>,
        steps: Vec<Step<T>>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            config,
            input,
            output,
            steps,
            current_run: Mutex::new(None),
        }
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The external feed the first step consumes.
    pub fn input(&self) -> &Queue<T> {
        &self.input
    }

    /// The external feed the last step produces to, `None` when discarding.
    pub fn output(&self) -> Option<&Queue<T>> {
        self.output.as_ref()
    }

    pub fn steps(&self) -> &[Step<T>] {
        &self.steps
    }

    /// Cancel the current run.
    ///
    /// Every worker of every stage stops at its next check: before taking a
    /// new value, or while blocked forwarding one. A running action is never
    /// cut short. Has no effect before the first run, once the run has
    /// completed, or when the pipeline was configured as not interruptible.
    pub fn interrupt(&self) {
        if !self.config.interruptible {
            warn!(pipeline = %self.name, "Interrupt ignored: pipeline is not interruptible");
            return;
        }

        match self.current_run().as_ref() {
            Some(token) if token.is_cancelled() => {
                debug!(pipeline = %self.name, "Run already interrupted");
            }
            Some(token) => {
                info!(pipeline = %self.name, "Interrupting pipeline");
                token.cancel();
            }
            None => {
                warn!(pipeline = %self.name, "Interrupt ignored: pipeline has not been run");
            }
        }
    }

    fn current_run(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.current_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Pipeline<T>
where
    T: Clone + Debug + Send + 'static,
{
    /// Start every stage and return immediately.
    ///
    /// The returned [`Completion`] fires exactly once, after the last stage has
    /// finished. The caller closes the input feed to let the run drain, and
    /// must keep draining the output feed, if any, until then.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(&self) -> Completion {
        let interrupt = CancellationToken::new();
        *self.current_run() = Some(interrupt.clone());

        // Links between stages were closed by the previous run's monitors.
        for step in self.steps.iter().take(self.steps.len().saturating_sub(1)) {
            if let Some(link) = &step.output {
                if link.reopen() {
                    debug!(pipeline = %self.name, stage = %step.name, "Reopened stage output");
                }
            }
        }

        let stages = self.steps.len();
        let (stage_done_tx, stage_done_rx) = mpsc::channel(stages.max(1));
        for step in &self.steps {
            worker::spawn_stage(
                step.clone(),
                Arc::clone(&self.name),
                interrupt.clone(),
                stage_done_tx.clone(),
            );
        }
        drop(stage_done_tx);

        let (completion_tx, completion_rx) = oneshot::channel();
        tokio::spawn(aggregate(
            stage_done_rx,
            stages,
            completion_tx,
            Arc::clone(&self.name),
        ));

        info!(pipeline = %self.name, stages, "Pipeline started");
        Completion::new(completion_rx)
    }
}

/// Fold per-stage reports into the run's single completion signal.
async fn aggregate(
    mut stage_done: mpsc::Receiver<String>,
    stages: usize,
    completion: oneshot::Sender<()>,
    pipeline: Arc<str>,
) {
    let start = Instant::now();
    let mut finished = 0;

    while finished < stages {
        match stage_done.recv().await {
            Some(stage) => {
                finished += 1;
                debug!(
                    pipeline = %pipeline,
                    stage = %stage,
                    finished,
                    stages,
                    "Stage reported done"
                );
            }
            None => {
                warn!(
                    pipeline = %pipeline,
                    finished,
                    stages,
                    "Stage reports stopped early, completing run"
                );
                break;
            }
        }
    }

    emit!(RunCompleted {
        duration: start.elapsed(),
        pipeline: pipeline.to_string(),
    });
    info!(pipeline = %pipeline, elapsed_ms = start.elapsed().as_millis(), "Pipeline completed");

    // The caller may have dropped the completion; nothing left to signal.
    let _ = completion.send(());
}

impl<T> Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn two_stage(config: EngineConfig) -> (Pipeline<u32>, Queue<u32>, Queue<u32>) {
        let input = Queue::bounded(4);
        let link = Queue::bounded(config.link_capacity);
        let output = Queue::bounded(4);
        let steps = vec![
            Step {
                name: "stage-0".to_string(),
                degree: 2,
                input: input.clone(),
                output: Some(link.clone()),
                action: blocking_action(|v: u32| Ok::<_, ActionError>(Some(v + 1))),
            },
            Step {
                name: "stage-1".to_string(),
                degree: 3,
                input: link,
                output: Some(output.clone()),
                action: blocking_action(|v: u32| Ok::<_, ActionError>(Some(v * 2))),
            },
        ];
        let pipeline = Pipeline::new(
            "mod_test",
            config,
            input.clone(),
            Some(output.clone()),
            steps,
        );
        (pipeline, input, output)
    }

    async fn collect(output: &Queue<u32>) -> Vec<u32> {
        let mut values = Vec::new();
        while let Some(v) = output.recv().await {
            values.push(v);
        }
        values.sort_unstable();
        values
    }

    #[tokio::test]
    async fn test_run_drains_and_completes() {
        let (pipeline, input, output) = two_stage(EngineConfig::default());
        let completion = pipeline.run();

        let feeder = tokio::spawn(async move {
            for v in 0..5 {
                input.send(v).await.unwrap();
            }
            input.close();
        });

        assert_eq!(collect(&output).await, vec![2, 4, 6, 8, 10]);
        tokio::time::timeout(Duration::from_secs(1), completion)
            .await
            .unwrap();
        feeder.await.unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_before_run_is_noop() {
        let (pipeline, _input, _output) = two_stage(EngineConfig::default());
        pipeline.interrupt();
        assert!(pipeline.current_run().is_none());
    }

    #[tokio::test]
    async fn test_interrupt_completes_run_with_open_input() {
        let (pipeline, _input, output) = two_stage(EngineConfig::default());
        let completion = pipeline.run();

        pipeline.interrupt();
        pipeline.interrupt();

        tokio::time::timeout(Duration::from_secs(1), completion)
            .await
            .unwrap();
        assert!(output.is_closed());
    }

    #[tokio::test]
    async fn test_interrupt_ignored_when_disabled() {
        let config = EngineConfig {
            interruptible: false,
            ..EngineConfig::default()
        };
        let (pipeline, input, output) = two_stage(config);
        let mut completion = pipeline.run();

        pipeline.interrupt();
        let early = tokio::time::timeout(Duration::from_millis(50), &mut completion).await;
        assert!(early.is_err(), "run must keep going");

        input.close();
        assert!(collect(&output).await.is_empty());
        completion.await;
    }

    #[tokio::test]
    async fn test_run_again_after_completion() {
        let (pipeline, input, output) = two_stage(EngineConfig::default());

        for round in 0..2u32 {
            let completion = pipeline.run();
            input.send(round).await.unwrap();
            input.close();

            assert_eq!(collect(&output).await, vec![(round + 1) * 2]);
            completion.await;

            input.reopen();
            output.reopen();
        }
    }
}
