use smartcut_oracle::OracleError;

/// Result of a stage that may have run on partial oracle signal.
///
/// `Degraded` carries the value built from the batches that did answer,
/// plus the indices of the batches that did not. Callers that only need the
/// data use [`StageOutcome::into_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Complete(T),
    Degraded { value: T, failed_batches: Vec<usize> },
}

impl<T> StageOutcome<T> {
    /// `Complete` when nothing failed, `Degraded` otherwise.
    pub fn from_batches(value: T, failed_batches: Vec<usize>) -> Self {
        if failed_batches.is_empty() {
            StageOutcome::Complete(value)
        } else {
            StageOutcome::Degraded {
                value,
                failed_batches,
            }
        }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Complete(v) => v,
            StageOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Complete(v) => v,
            StageOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }

    pub fn failed_batches(&self) -> &[usize] {
        match self {
            StageOutcome::Complete(_) => &[],
            StageOutcome::Degraded { failed_batches, .. } => failed_batches,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageOutcome<U> {
        match self {
            StageOutcome::Complete(v) => StageOutcome::Complete(f(v)),
            StageOutcome::Degraded {
                value,
                failed_batches,
            } => StageOutcome::Degraded {
                value: f(value),
                failed_batches,
            },
        }
    }
}

/// Fatal stage failure. The runner halts and surfaces the message as the
/// job status.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("transcript has no lines")]
    EmptyTranscript,
    #[error("{stage}: {source}")]
    Oracle {
        stage: &'static str,
        #[source]
        source: OracleError,
    },
    /// The oracle answered but nothing usable could be extracted. `raw` is
    /// kept for postmortem and deliberately left out of the message.
    #[error("{stage}: unparseable oracle output: {detail}")]
    Unparseable {
        stage: &'static str,
        detail: String,
        raw: String,
    },
    #[error("encoding prompt payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl StageError {
    /// Raw oracle text worth preserving next to the failed artifact, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            StageError::Unparseable { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
