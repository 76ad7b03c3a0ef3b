//! Concurrent per-batch oracle calls with order-preserving reassembly.

use smartcut_core::extract::ExtractError;
use smartcut_oracle::{OracleClient, OracleError};
use tokio::task::JoinSet;

#[derive(Debug, thiserror::Error)]
enum BatchFailure {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Unparseable(#[from] ExtractError),
}

/// Parsed answers of every batch that succeeded, in batch order, plus the
/// indices of those that failed.
pub(crate) struct BatchResults<T> {
    pub answered: Vec<T>,
    pub failed: Vec<usize>,
}

/// Send one prompt per batch concurrently and parse each reply.
///
/// A batch whose oracle call fails, whose reply cannot be parsed, or whose
/// task dies contributes nothing; its index is reported in `failed`.
/// Completion order never affects the result order.
pub(crate) async fn fan_out<T>(
    client: &OracleClient,
    stage: &'static str,
    prompts: Vec<String>,
    parse: fn(&str) -> Result<T, ExtractError>,
) -> BatchResults<T>
where
    T: Send + 'static,
{
    let total = prompts.len();
    let mut set = JoinSet::new();
    for (index, prompt) in prompts.into_iter().enumerate() {
        let client = client.clone();
        set.spawn(async move {
            let result = match client.invoke(&prompt).await {
                Ok(raw) => parse(&raw).map_err(BatchFailure::from),
                Err(e) => Err(BatchFailure::from(e)),
            };
            (index, result)
        });
    }

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(value))) => slots[index] = Some(value),
            Ok((index, Err(e))) => {
                tracing::warn!(stage, batch = index, error = %e, "batch produced no signal");
            }
            Err(e) => tracing::error!(stage, error = %e, "batch task aborted"),
        }
    }

    let mut answered = Vec::with_capacity(total);
    let mut failed = Vec::new();
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(value) => answered.push(value),
            None => failed.push(index),
        }
    }
    BatchResults { answered, failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcut_oracle::{RetryPolicy, ScriptedOracle};
    use std::sync::Arc;

    fn parse_len(raw: &str) -> Result<usize, ExtractError> {
        smartcut_core::extract::decode_bracketed(raw).map(|v| v.len())
    }

    #[tokio::test]
    async fn results_follow_batch_order() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.route_text("batch-0", "[1]");
        oracle.route_text("batch-1", "no list");
        oracle.route_text("batch-2", "[1, 2, 3]");
        let client = OracleClient::new(oracle).with_retry(RetryPolicy::immediate(1));

        let prompts = (0..3).map(|i| format!("batch-{i}")).collect();
        let results = fan_out(&client, "test", prompts, parse_len).await;
        assert_eq!(results.answered, vec![1, 3]);
        assert_eq!(results.failed, vec![1]);
    }

    #[tokio::test]
    async fn oracle_failure_marks_batch() {
        let oracle = Arc::new(ScriptedOracle::new());
        oracle.route_text("batch-1", "[]");
        let client = OracleClient::new(oracle).with_retry(RetryPolicy::immediate(2));

        let prompts = (0..2).map(|i| format!("batch-{i}")).collect();
        let results = fan_out(&client, "test", prompts, parse_len).await;
        assert_eq!(results.answered, vec![0]);
        assert_eq!(results.failed, vec![0]);
    }
}
