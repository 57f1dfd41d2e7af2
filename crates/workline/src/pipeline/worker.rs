//! Stage worker pools.
//!
//! Every step runs `degree` workers pulling from its input queue, plus one
//! monitor task. The monitor waits for all workers to exit, closes the step's
//! output queue so the next stage can drain, and reports the stage as done.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use workline_core::emit;
use workline_core::metrics::events::{
    ActionDuration, ActiveWorkers, ItemOutcome, ItemProcessed, StageCompleted,
};

use super::step::Step;

/// Spawn the workers of `step` and the monitor that reports on `stage_done`.
///
/// The returned handle resolves once the stage has been reported done.
pub(in crate::pipeline) fn spawn_stage<T>(
    step: Step<T>,
    pipeline: Arc<str>,
    interrupt: CancellationToken,
    stage_done: mpsc::Sender<String>,
) -> JoinHandle<()>
where
    T: Clone + Debug + Send + 'static,
{
    let mut workers = JoinSet::new();
    for worker in 0..step.degree {
        workers.spawn(run_worker(
            step.clone(),
            worker,
            Arc::clone(&pipeline),
            interrupt.clone(),
        ));
    }

    emit!(ActiveWorkers {
        count: step.degree,
        pipeline: pipeline.to_string(),
        stage: step.name.clone(),
    });
    debug!(pipeline = %pipeline, stage = %step.name, degree = step.degree, "Stage started");

    tokio::spawn(monitor(step, workers, pipeline, stage_done))
}

/// Wait for every worker, close the stage output, report the stage done.
async fn monitor<T>(
    step: Step<T>,
    mut workers: JoinSet<()>,
    pipeline: Arc<str>,
    stage_done: mpsc::Sender<String>,
) where
    T: Send + 'static,
{
    let mut remaining = step.degree;
    while let Some(result) = workers.join_next().await {
        remaining -= 1;
        if let Err(e) = result {
            error!(pipeline = %pipeline, stage = %step.name, error = %e, "Stage worker panicked");
        }
        emit!(ActiveWorkers {
            count: remaining,
            pipeline: pipeline.to_string(),
            stage: step.name.clone(),
        });
    }

    // Downstream workers drain what is buffered, then see the end of input.
    if let Some(output) = &step.output {
        output.close();
    }

    emit!(StageCompleted {
        pipeline: pipeline.to_string(),
        stage: step.name.clone(),
    });
    debug!(pipeline = %pipeline, stage = %step.name, "Stage completed");

    if stage_done.send(step.name).await.is_err() {
        debug!(pipeline = %pipeline, "Completion aggregator gone, stage report dropped");
    }
}

/// Pull values until the input is exhausted or the run is interrupted.
async fn run_worker<T>(
    step: Step<T>,
    worker: usize,
    pipeline: Arc<str>,
    interrupt: CancellationToken,
) where
    T: Clone + Debug + Send + 'static,
{
    debug!(pipeline = %pipeline, stage = %step.name, worker, "Worker started");

    loop {
        let value = tokio::select! {
            biased;

            _ = interrupt.cancelled() => {
                debug!(pipeline = %pipeline, stage = %step.name, worker, "Worker interrupted");
                break;
            }

            value = step.input.recv() => match value {
                Some(value) => value,
                None => break,
            },
        };

        let start = Instant::now();
        let result = step.apply(value.clone()).await;
        emit!(ActionDuration {
            duration: start.elapsed(),
            pipeline: pipeline.to_string(),
            stage: step.name.clone(),
        });

        let outcome = match result {
            Ok(Some(result)) => match &step.output {
                Some(output) => tokio::select! {
                    biased;

                    _ = interrupt.cancelled() => {
                        debug!(
                            pipeline = %pipeline,
                            stage = %step.name,
                            worker,
                            "Interrupted while forwarding, dropping value"
                        );
                        record(ItemOutcome::Discarded, &pipeline, &step.name);
                        break;
                    }

                    sent = output.send(result) => match sent {
                        Ok(()) => ItemOutcome::Forwarded,
                        Err(_) => {
                            warn!(
                                pipeline = %pipeline,
                                stage = %step.name,
                                value = ?value,
                                "Output queue closed, dropping value"
                            );
                            ItemOutcome::Discarded
                        }
                    },
                },
                None => ItemOutcome::Discarded,
            },
            Ok(None) => ItemOutcome::Filtered,
            Err(error) => {
                warn!(
                    pipeline = %pipeline,
                    stage = %step.name,
                    error = %error,
                    value = ?value,
                    "Action failed, dropping value"
                );
                ItemOutcome::Failed
            }
        };

        record(outcome, &pipeline, &step.name);
    }

    debug!(pipeline = %pipeline, stage = %step.name, worker, "Worker exited");
}

fn record(outcome: ItemOutcome, pipeline: &str, stage: &str) {
    emit!(ItemProcessed {
        outcome,
        pipeline: pipeline.to_string(),
        stage: stage.to_string(),
    });
}
