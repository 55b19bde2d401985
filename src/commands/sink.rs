//! Ordered collector of step failures for one provisioning run

use super::errors::{CheckpointError, StepError, StepFailure};
use crate::constants::FAILURE_SEPARATOR;

/// Saved sink length, used to discard everything appended after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Append-only list of failures, in the order they happened
///
/// The sink only grows through [`append`](ErrorSink::append) and only shrinks
/// through [`rollback`](ErrorSink::rollback). It never deduplicates.
#[derive(Debug, Default)]
pub struct ErrorSink {
    failures: Vec<StepFailure>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, failure: StepFailure) {
        tracing::debug!("Recording failure: {}", failure.first_line());
        self.failures.push(failure);
    }

    /// Record a failure that did not come from the command runner, then hand the error back
    pub fn record(&mut self, error: StepError) -> StepError {
        self.append(error.to_failure());
        error
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.failures.len())
    }

    /// Drop every failure appended since `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        self.split_off(checkpoint).map(|_| ())
    }

    /// Failures appended since `checkpoint`, left in place
    pub fn since(&self, checkpoint: Checkpoint) -> Result<&[StepFailure], CheckpointError> {
        let Checkpoint(at) = checkpoint;
        self.failures.get(at..).ok_or(CheckpointError {
            checkpoint: at,
            len: self.failures.len(),
        })
    }

    /// Remove and return every failure appended since `checkpoint`
    pub fn split_off(&mut self, checkpoint: Checkpoint) -> Result<Vec<StepFailure>, CheckpointError> {
        let Checkpoint(at) = checkpoint;
        if at > self.failures.len() {
            return Err(CheckpointError {
                checkpoint: at,
                len: self.failures.len(),
            });
        }
        Ok(self.failures.split_off(at))
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepFailure> {
        self.failures.iter()
    }

    /// One `  - <first line>` entry per failure
    pub fn first_line_summary(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("  - {}", f.first_line()))
            .collect()
    }

    /// Every line of every failure, indented, each failure preceded by a separator
    pub fn full_dump(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for failure in &self.failures {
            lines.push(FAILURE_SEPARATOR.to_string());
            for line in failure.text().lines() {
                lines.push(format!("  {}", line));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(desc: &str) -> StepFailure {
        StepFailure::command(desc, vec!["false".to_string()], "", "boom")
    }

    #[test]
    fn test_append_preserves_order() {
        let mut sink = ErrorSink::new();
        sink.append(failure("uno"));
        sink.append(failure("dos"));
        sink.append(failure("tres"));

        let descs: Vec<&str> = sink.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(descs, vec!["uno", "dos", "tres"]);
    }

    #[test]
    fn test_no_deduplication() {
        let mut sink = ErrorSink::new();
        sink.append(failure("igual"));
        sink.append(failure("igual"));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut sink = ErrorSink::new();
        sink.append(failure("antes"));
        let cp = sink.checkpoint();
        sink.append(failure("despues 1"));
        sink.append(failure("despues 2"));

        sink.rollback(cp).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.iter().next().unwrap().description, "antes");
    }

    #[test]
    fn test_rollback_past_end_is_rejected() {
        let mut sink = ErrorSink::new();
        sink.append(failure("a"));
        sink.append(failure("b"));
        let cp = sink.checkpoint();
        sink.rollback(Checkpoint(0)).unwrap();

        let err = sink.rollback(cp).unwrap_err();
        assert_eq!(err, CheckpointError { checkpoint: 2, len: 0 });
    }

    #[test]
    fn test_since_leaves_entries_in_place() {
        let mut sink = ErrorSink::new();
        sink.append(failure("antes"));
        let cp = sink.checkpoint();
        sink.append(failure("despues"));

        let recent = sink.since(cp).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].description, "despues");
        assert_eq!(sink.len(), 2);
        assert!(sink.since(Checkpoint(3)).is_err());
    }

    #[test]
    fn test_split_off_returns_removed_in_order() {
        let mut sink = ErrorSink::new();
        let cp = sink.checkpoint();
        sink.append(failure("x"));
        sink.append(failure("y"));

        let removed = sink.split_off(cp).unwrap();
        assert!(sink.is_empty());
        assert_eq!(removed[0].description, "x");
        assert_eq!(removed[1].description, "y");
    }

    #[test]
    fn test_record_appends_and_returns_error() {
        let mut sink = ErrorSink::new();
        let err = sink.record(StepError::MissingTool("No se ha encontrado systemctl".to_string()));
        assert!(matches!(err, StepError::MissingTool(_)));
        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.iter().next().unwrap().first_line(),
            "No se ha encontrado systemctl"
        );
    }

    #[test]
    fn test_first_line_summary() {
        let mut sink = ErrorSink::new();
        sink.append(StepFailure::detail("linea uno\nlinea dos", ""));
        sink.append(failure("otra"));
        assert_eq!(
            sink.first_line_summary(),
            vec!["  - linea uno".to_string(), "  - otra".to_string()]
        );
    }

    #[test]
    fn test_full_dump_delimits_failures() {
        let mut sink = ErrorSink::new();
        sink.append(failure("uno"));
        sink.append(failure("dos"));

        let dump = sink.full_dump();
        let separators = dump.iter().filter(|l| *l == FAILURE_SEPARATOR).count();
        assert_eq!(separators, 2);
        assert_eq!(dump[0], FAILURE_SEPARATOR);
        assert_eq!(dump[1], "  uno");
        assert_eq!(dump[2], "  Comando: false");
        assert!(dump.contains(&"  dos".to_string()));
    }
}
