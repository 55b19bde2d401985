//! Ordered fallback across alternative endpoints
//!
//! Candidates are tried strictly in the order given (e.g. HTTPS before HTTP).
//! The first success wins and later candidates are never run. Failures of
//! candidates are recorded only provisionally: after every attempt the sink
//! is rolled back to its checkpoint, and only the terminal failure of the
//! last candidate is kept once every candidate has failed. Discarded
//! failures are still written to the log.

use super::errors::{StepError, StepFailure};
use super::sink::ErrorSink;
use super::StepFuture;

type CandidateOp<T> = Box<dyn for<'s> FnOnce(&'s mut ErrorSink) -> StepFuture<'s, T> + Send>;

/// One alternative way of performing an operation
pub struct FallbackCandidate<T> {
    label: String,
    operation: CandidateOp<T>,
}

impl<T> FallbackCandidate<T> {
    pub fn new<F>(label: impl Into<String>, operation: F) -> Self
    where
        F: for<'s> FnOnce(&'s mut ErrorSink) -> StepFuture<'s, T> + Send + 'static,
    {
        Self {
            label: label.into(),
            operation: Box::new(operation),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Try each candidate in order, returning the label and value of the first success
pub async fn try_in_order<T>(
    candidates: Vec<FallbackCandidate<T>>,
    sink: &mut ErrorSink,
) -> Result<(String, T), StepError> {
    let mut tried = Vec::with_capacity(candidates.len());
    let mut last_error: Option<StepFailure> = None;

    for candidate in candidates {
        tracing::info!("Trying candidate: {}", candidate.label());
        let FallbackCandidate { label, operation } = candidate;

        let checkpoint = sink.checkpoint();
        match operation(&mut *sink).await {
            Ok(value) => {
                for failure in sink.since(checkpoint)? {
                    tracing::warn!(
                        "Discarding failure from successful candidate {}: {}",
                        label,
                        failure.first_line()
                    );
                }
                sink.rollback(checkpoint)?;
                tracing::info!("Candidate succeeded: {}", label);
                return Ok((label, value));
            }
            Err(err) => {
                tracing::warn!("Candidate {} failed: {}", label, err);
                let mut trail = sink.split_off(checkpoint)?;
                let terminal = trail.pop().unwrap_or_else(|| err.to_failure());
                for earlier in &trail {
                    tracing::warn!("Discarding earlier failure of {}:\n{}", label, earlier.text());
                }
                if let Some(superseded) = last_error.replace(terminal) {
                    tracing::warn!("Superseded candidate failure:\n{}", superseded.text());
                }
                tried.push(label);
            }
        }
    }

    if let Some(failure) = last_error {
        sink.append(failure);
    }
    tracing::error!("All candidates failed: {}", tried.join(", "));
    Err(StepError::AllCandidatesFailed { labels: tried })
}
