//! Linear provisioning pipeline
//!
//! Preconditions are checked first (fail fast, nothing recorded). Steps then
//! run strictly in order; the first failing step halts the pipeline and the
//! side effects of completed steps are kept.

use super::banner::{Banner, ReportStyle, Subject};
use super::errors::StepError;
use super::sink::ErrorSink;
use super::StepFuture;
use crate::system::{HostFacts, Precondition};

type StepOp = Box<dyn for<'s> FnOnce(&'s mut ErrorSink) -> StepFuture<'s, ()> + Send>;

/// One named provisioning action
pub struct Step {
    name: String,
    operation: StepOp,
}

impl Step {
    pub fn new<F>(name: impl Into<String>, operation: F) -> Self
    where
        F: for<'s> FnOnce(&'s mut ErrorSink) -> StepFuture<'s, ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            operation: Box::new(operation),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    CheckingPreconditions,
    Running(usize),
    Succeeded,
    Failed,
}

/// Preconditions and steps for one provisioning subject
pub struct StepPipeline {
    subject: Subject,
    preconditions: Vec<Precondition>,
    steps: Vec<Step>,
    state: PipelineState,
}

impl StepPipeline {
    pub fn new(subject: Subject) -> Self {
        Self {
            subject,
            preconditions: Vec::new(),
            steps: Vec::new(),
            state: PipelineState::NotStarted,
        }
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::info!("Pipeline state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run to a terminal state
    pub async fn run(mut self, facts: &HostFacts) -> PipelineOutcome {
        let mut sink = ErrorSink::new();

        self.transition(PipelineState::CheckingPreconditions);
        let preconditions = std::mem::take(&mut self.preconditions);
        for precondition in &preconditions {
            if let Err(err) = precondition.check(facts) {
                tracing::error!("Precondition {:?} failed: {}", precondition, err);
                self.transition(PipelineState::Failed);
                return self.finish(sink, Some(err));
            }
        }

        let steps = std::mem::take(&mut self.steps);
        for (index, Step { name, operation }) in steps.into_iter().enumerate() {
            self.transition(PipelineState::Running(index));
            tracing::info!("Step {}: {}", index + 1, name);

            if let Err(err) = operation(&mut sink).await {
                tracing::error!("Step '{}' failed: {}", name, err);
                self.transition(PipelineState::Failed);
                return self.finish(sink, Some(err));
            }
        }

        self.transition(PipelineState::Succeeded);
        self.finish(sink, None)
    }

    fn finish(self, sink: ErrorSink, error: Option<StepError>) -> PipelineOutcome {
        PipelineOutcome {
            subject: self.subject,
            state: self.state,
            sink,
            error,
        }
    }
}

/// Terminal result of a pipeline run
#[derive(Debug)]
pub struct PipelineOutcome {
    pub subject: Subject,
    pub state: PipelineState,
    pub sink: ErrorSink,
    pub error: Option<StepError>,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Succeeded
    }

    /// 0 on success, otherwise the halting error's code
    pub fn exit_code(&self) -> i32 {
        match &self.error {
            None => 0,
            Some(err) => err.exit_code(),
        }
    }

    /// The single banner for this run, if the subject prints one
    pub fn banner(&self, style: ReportStyle) -> Option<Banner> {
        match &self.error {
            None => Banner::success(&self.subject),
            Some(err) => Some(Banner::failure(
                &self.subject,
                &self.sink,
                &err.to_string(),
                style,
            )),
        }
    }
}
