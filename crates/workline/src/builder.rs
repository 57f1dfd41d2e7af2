//! Fluent construction of pipelines.
//!
//! ```no_run
//! # async fn example() -> Result<(), workline::BuildError> {
//! use workline::{ActionError, PipelineBuilder, Queue};
//!
//! let input = Queue::bounded(16);
//! let output = Queue::bounded(16);
//!
//! let pipeline = PipelineBuilder::new()
//!     .create_new()
//!     .consuming_from(input.clone())
//!     .then_running(|n: u64| Ok::<_, ActionError>(Some(n * 2)), 4)
//!     .then_running(|n: u64| Ok::<_, ActionError>((n % 3 != 0).then_some(n)), 2)
//!     .outputting_to(output.clone())
//!     .build()?;
//!
//! let completion = pipeline.run();
//! # let _ = completion;
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;
use std::future::Future;

use snafu::prelude::*;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{
    BuildError, InvalidDegreeSnafu, MissingInputSnafu, MissingOutputSnafu, NoStepsSnafu,
    NotInitializedSnafu,
};
use crate::pipeline::{ActionError, Pipeline, Step, StepAction, async_action, blocking_action};
use crate::queue::Queue;

/// Where the last step's results go.
enum OutputChoice<T> {
    Undecided,
    Feed(Queue<T>),
    Discard,
}

/// A step staged by `then_running`, wired at build time.
struct StagedStep<T> {
    action: StepAction<T>,
    degree: usize,
}

/// The definition under construction between `create_new` and `build`.
struct Draft<T> {
    name: String,
    input: Option<Queue<T>>,
    output: OutputChoice<T>,
    steps: Vec<StagedStep<T>>,
    /// `links[i]` connects step `i` to step `i + 1`.
    links: Vec<Queue<T>>,
}

/// Assembles a [`Pipeline`] one staging call at a time.
///
/// Every staging call returns the builder so calls can be chained. Staging
/// calls made before [`create_new`](Self::create_new) are ignored, and
/// [`build`](Self::build) reports the builder as not initialized.
pub struct PipelineBuilder<T> {
    config: EngineConfig,
    draft: Option<Draft<T>>,
}

impl<T> Default for PipelineBuilder<T> {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl<T> PipelineBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            draft: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a fresh, empty definition, discarding any previous draft.
    pub fn create_new(&mut self) -> &mut Self {
        self.draft = Some(Draft {
            name: "pipeline".to_string(),
            input: None,
            output: OutputChoice::Undecided,
            steps: Vec::new(),
            links: Vec::new(),
        });
        self
    }

    /// Label the pipeline in logs and metrics.
    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        if let Some(draft) = self.draft_mut("named") {
            draft.name = name.into();
        }
        self
    }

    /// Use `feed` as the pipeline input. The first step consumes it.
    pub fn consuming_from(&mut self, feed: Queue<T>) -> &mut Self {
        if let Some(draft) = self.draft_mut("consuming_from") {
            draft.input = Some(feed);
        }
        self
    }

    /// Send the last step's results to `feed`.
    pub fn outputting_to(&mut self, feed: Queue<T>) -> &mut Self {
        if let Some(draft) = self.draft_mut("outputting_to") {
            draft.output = OutputChoice::Feed(feed);
        }
        self
    }

    /// Drop the last step's results. The last step still runs.
    pub fn discard_output(&mut self) -> &mut Self {
        if let Some(draft) = self.draft_mut("discard_output") {
            draft.output = OutputChoice::Discard;
        }
        self
    }

    fn stage(&mut self, action: StepAction<T>, degree: usize) -> &mut Self {
        let link_capacity = self.config.link_capacity;
        let Some(draft) = self.draft_mut("then_running") else {
            return self;
        };

        if !draft.steps.is_empty() {
            draft.links.push(Queue::bounded(link_capacity));
        }
        if degree == 0 {
            debug!(step = draft.steps.len(), "Step staged with degree 0");
        }
        draft.steps.push(StagedStep { action, degree });
        self
    }

    fn draft_mut(&mut self, call: &'static str) -> Option<&mut Draft<T>> {
        if self.draft.is_none() {
            debug!(call, "Builder not initialized, ignoring call");
        }
        self.draft.as_mut()
    }
}

impl<T> PipelineBuilder<T>
where
    T: Clone + Debug + Send + 'static,
{
    /// Append a step running a synchronous `action` on `degree` workers.
    ///
    /// Each call runs on tokio's blocking pool, so the action may block.
    pub fn then_running<F, E>(&mut self, action: F, degree: usize) -> &mut Self
    where
        F: Fn(T) -> Result<Option<T>, E> + Send + Sync + 'static,
        E: Into<ActionError> + Send + 'static,
    {
        self.stage(blocking_action(action), degree)
    }

    /// Append a step running an asynchronous `action` on `degree` workers.
    pub fn then_running_async<F, Fut, E>(&mut self, action: F, degree: usize) -> &mut Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
        E: Into<ActionError> + Send + 'static,
    {
        self.stage(async_action(action), degree)
    }

    /// Validate the draft and assemble a pipeline.
    ///
    /// The draft is kept: building again yields another pipeline over the
    /// same queues.
    pub fn build(&self) -> Result<Pipeline<T>, BuildError> {
        let draft = self.draft.as_ref().context(NotInitializedSnafu)?;
        let input = draft.input.clone().context(MissingInputSnafu)?;
        ensure!(!draft.steps.is_empty(), NoStepsSnafu);

        if let Some((step, staged)) = draft
            .steps
            .iter()
            .enumerate()
            .find(|(_, staged)| staged.degree == 0)
        {
            return InvalidDegreeSnafu {
                step,
                degree: staged.degree,
            }
            .fail();
        }

        let output = match &draft.output {
            OutputChoice::Feed(feed) => Some(feed.clone()),
            OutputChoice::Discard => None,
            OutputChoice::Undecided => {
                ensure!(!self.config.require_output, MissingOutputSnafu);
                None
            }
        };

        let last = draft.steps.len() - 1;
        let steps = draft
            .steps
            .iter()
            .enumerate()
            .map(|(index, staged)| Step {
                name: format!("stage-{index}"),
                degree: staged.degree,
                input: match index {
                    0 => input.clone(),
                    _ => draft.links[index - 1].clone(),
                },
                output: if index == last {
                    output.clone()
                } else {
                    Some(draft.links[index].clone())
                },
                action: staged.action.clone(),
            })
            .collect();

        debug!(pipeline = %draft.name, steps = draft.steps.len(), "Pipeline built");
        Ok(Pipeline::new(
            &draft.name,
            self.config.clone(),
            input,
            output,
            steps,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(v: i32) -> Result<Option<i32>, ActionError> {
        Ok(Some(v))
    }

    #[test]
    fn test_build_before_create_new() {
        let mut builder = PipelineBuilder::<i32>::new();
        builder
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1)
            .discard_output();

        assert_eq!(builder.build().unwrap_err(), BuildError::NotInitialized);
    }

    #[test]
    fn test_build_without_input() {
        let err = PipelineBuilder::<i32>::new()
            .create_new()
            .then_running(identity, 1)
            .discard_output()
            .build()
            .unwrap_err();

        assert_eq!(err, BuildError::MissingInput);
    }

    #[test]
    fn test_build_without_steps() {
        let err = PipelineBuilder::<i32>::new()
            .create_new()
            .consuming_from(Queue::bounded(1))
            .discard_output()
            .build()
            .unwrap_err();

        assert_eq!(err, BuildError::NoSteps);
    }

    #[test]
    fn test_missing_input_reported_before_missing_steps() {
        let err = PipelineBuilder::<i32>::new()
            .create_new()
            .build()
            .unwrap_err();

        assert_eq!(err, BuildError::MissingInput);
    }

    #[test]
    fn test_zero_degree_rejected() {
        let err = PipelineBuilder::<i32>::new()
            .create_new()
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 2)
            .then_running(identity, 0)
            .discard_output()
            .build()
            .unwrap_err();

        assert_eq!(err, BuildError::InvalidDegree { step: 1, degree: 0 });
    }

    #[test]
    fn test_strict_output_policy() {
        let mut builder = PipelineBuilder::<i32>::new();
        builder
            .create_new()
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1);

        assert_eq!(builder.build().unwrap_err(), BuildError::MissingOutput);
    }

    #[test]
    fn test_lenient_output_policy() {
        let pipeline = PipelineBuilder::<i32>::with_config(EngineConfig::lenient())
            .create_new()
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1)
            .build()
            .unwrap();

        assert!(pipeline.output().is_none());
        assert!(pipeline.steps()[0].output().is_none());
    }

    #[test]
    fn test_single_step_wiring() {
        let input = Queue::bounded(1);
        let output = Queue::bounded(1);
        let pipeline = PipelineBuilder::new()
            .create_new()
            .consuming_from(input.clone())
            .then_running(identity, 3)
            .outputting_to(output.clone())
            .build()
            .unwrap();

        let steps = pipeline.steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name(), "stage-0");
        assert_eq!(steps[0].degree(), 3);
        assert!(Queue::same_queue(steps[0].input(), &input));
        assert!(Queue::same_queue(steps[0].output().unwrap(), &output));
        assert!(Queue::same_queue(pipeline.input(), &input));
    }

    #[test]
    fn test_multi_step_wiring() {
        let input = Queue::bounded(1);
        let output = Queue::bounded(1);
        let pipeline = PipelineBuilder::new()
            .create_new()
            .consuming_from(input.clone())
            .then_running(identity, 1)
            .then_running(identity, 2)
            .then_running(identity, 3)
            .outputting_to(output.clone())
            .build()
            .unwrap();

        let steps = pipeline.steps();
        assert_eq!(steps.len(), 3);
        assert!(Queue::same_queue(steps[0].input(), &input));
        for pair in steps.windows(2) {
            assert!(Queue::same_queue(
                pair[0].output().unwrap(),
                pair[1].input()
            ));
            assert!(!Queue::same_queue(pair[1].input(), &input));
        }
        assert!(Queue::same_queue(steps[2].output().unwrap(), &output));
        assert_eq!(steps[1].input().capacity(), 1);
    }

    #[test]
    fn test_feeds_bound_at_build_time() {
        let input = Queue::bounded(1);
        let output = Queue::bounded(1);
        let pipeline = PipelineBuilder::new()
            .create_new()
            .then_running(identity, 1)
            .outputting_to(output.clone())
            .then_running(identity, 1)
            .consuming_from(input.clone())
            .build()
            .unwrap();

        let steps = pipeline.steps();
        assert!(Queue::same_queue(steps[0].input(), &input));
        assert!(Queue::same_queue(steps[1].output().unwrap(), &output));
    }

    #[test]
    fn test_discard_output() {
        let pipeline = PipelineBuilder::new()
            .create_new()
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1)
            .then_running(identity, 1)
            .discard_output()
            .build()
            .unwrap();

        assert!(pipeline.output().is_none());
        assert!(pipeline.steps()[1].output().is_none());
        assert!(pipeline.steps()[0].output().is_some());
    }

    #[test]
    fn test_link_capacity_from_config() {
        let config = EngineConfig {
            link_capacity: 8,
            ..EngineConfig::default()
        };
        let pipeline = PipelineBuilder::with_config(config)
            .create_new()
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1)
            .then_running(identity, 1)
            .discard_output()
            .build()
            .unwrap();

        assert_eq!(pipeline.steps()[1].input().capacity(), 8);
    }

    #[test]
    fn test_create_new_resets_draft() {
        let mut builder = PipelineBuilder::new();
        builder
            .create_new()
            .named("first")
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1)
            .discard_output();
        let first = builder.build().unwrap();
        assert_eq!(first.name(), "first");

        builder.create_new();
        assert_eq!(builder.build().unwrap_err(), BuildError::MissingInput);
    }

    #[test]
    fn test_rebuild_shares_queues() {
        let mut builder = PipelineBuilder::new();
        builder
            .create_new()
            .consuming_from(Queue::bounded(1))
            .then_running(identity, 1)
            .then_running(identity, 1)
            .discard_output();

        let a = builder.build().unwrap();
        let b = builder.build().unwrap();
        assert!(Queue::same_queue(
            a.steps()[1].input(),
            b.steps()[1].input()
        ));
        assert_eq!(a.name(), "pipeline");
    }

    #[test]
    fn test_create_new_twice_gives_independent_pipelines() {
        let mut builder = PipelineBuilder::new();
        let build = |builder: &mut PipelineBuilder<i32>| {
            builder
                .create_new()
                .consuming_from(Queue::bounded(1))
                .then_running(identity, 1)
                .then_running(identity, 1)
                .outputting_to(Queue::bounded(1))
                .build()
                .unwrap()
        };

        let a = build(&mut builder);
        let b = build(&mut builder);

        assert!(!Queue::same_queue(a.input(), b.input()));
        assert!(!Queue::same_queue(
            a.steps()[1].input(),
            b.steps()[1].input()
        ));
        assert!(!Queue::same_queue(
            a.output().unwrap(),
            b.output().unwrap()
        ));
    }
}
