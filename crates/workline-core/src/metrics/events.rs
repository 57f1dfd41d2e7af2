//! Internal events for pipeline metrics emission.
//!
//! Each event struct represents a measurable occurrence in a running pipeline
//! and implements `InternalEvent`, which records the matching metric. Every
//! event carries a `pipeline` label; stage-level events also carry `stage`.

use metrics::{counter, gauge, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// What happened to one item after a stage applied its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Result handed to the next queue.
    Forwarded,
    /// Action returned no value.
    Filtered,
    /// Result produced but the stage has no output queue.
    Discarded,
    /// Action returned an error or panicked.
    Failed,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Forwarded => "forwarded",
            ItemOutcome::Filtered => "filtered",
            ItemOutcome::Discarded => "discarded",
            ItemOutcome::Failed => "failed",
        }
    }
}

/// Event emitted once per item a stage worker has finished with.
pub struct ItemProcessed {
    pub outcome: ItemOutcome,
    pub pipeline: String,
    pub stage: String,
}

impl InternalEvent for ItemProcessed {
    fn emit(self) {
        trace!(
            outcome = self.outcome.as_str(),
            pipeline = %self.pipeline,
            stage = %self.stage,
            "Item processed"
        );
        counter!(
            "workline_items_total",
            "pipeline" => self.pipeline,
            "stage" => self.stage,
            "outcome" => self.outcome.as_str()
        )
        .increment(1);
    }
}

/// Event emitted with the time spent inside a stage action.
pub struct ActionDuration {
    pub duration: Duration,
    pub pipeline: String,
    pub stage: String,
}

impl InternalEvent for ActionDuration {
    fn emit(self) {
        histogram!(
            "workline_action_duration_seconds",
            "pipeline" => self.pipeline,
            "stage" => self.stage
        )
        .record(self.duration.as_secs_f64());
    }
}

/// Event emitted when the number of live workers of a stage changes.
pub struct ActiveWorkers {
    pub count: usize,
    pub pipeline: String,
    pub stage: String,
}

impl InternalEvent for ActiveWorkers {
    fn emit(self) {
        trace!(
            count = self.count,
            pipeline = %self.pipeline,
            stage = %self.stage,
            "Active workers"
        );
        gauge!(
            "workline_active_workers",
            "pipeline" => self.pipeline,
            "stage" => self.stage
        )
        .set(self.count as f64);
    }
}

/// Event emitted when every worker of a stage has exited.
pub struct StageCompleted {
    pub pipeline: String,
    pub stage: String,
}

impl InternalEvent for StageCompleted {
    fn emit(self) {
        trace!(pipeline = %self.pipeline, stage = %self.stage, "Stage completed");
        counter!(
            "workline_stages_completed_total",
            "pipeline" => self.pipeline,
            "stage" => self.stage
        )
        .increment(1);
    }
}

/// Event emitted when a run fires its completion signal.
pub struct RunCompleted {
    pub duration: Duration,
    pub pipeline: String,
}

impl InternalEvent for RunCompleted {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            pipeline = %self.pipeline,
            "Run completed"
        );
        counter!("workline_runs_completed_total", "pipeline" => self.pipeline.clone())
            .increment(1);
        histogram!("workline_run_duration_seconds", "pipeline" => self.pipeline)
            .record(self.duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricsController, init_test};

    #[test]
    fn test_item_outcome_labels() {
        assert_eq!(ItemOutcome::Forwarded.as_str(), "forwarded");
        assert_eq!(ItemOutcome::Filtered.as_str(), "filtered");
        assert_eq!(ItemOutcome::Discarded.as_str(), "discarded");
        assert_eq!(ItemOutcome::Failed.as_str(), "failed");
    }

    #[test]
    fn test_events_are_rendered() {
        init_test();

        crate::emit!(ItemProcessed {
            outcome: ItemOutcome::Failed,
            pipeline: "events_test".to_string(),
            stage: "stage-0".to_string(),
        });
        crate::emit!(RunCompleted {
            duration: Duration::from_millis(5),
            pipeline: "events_test".to_string(),
        });

        let output = MetricsController::get().unwrap().render();
        assert!(output.contains("workline_items_total"));
        assert!(output.contains("outcome=\"failed\""));
        assert!(output.contains("workline_runs_completed_total"));
    }
}
