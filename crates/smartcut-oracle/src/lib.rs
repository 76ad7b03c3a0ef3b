//! The text-generation oracle behind every planning, filtering and clustering
//! decision. Callers see a single contract: prompt in, plain text out, or an
//! [`OracleError`] once retries and the wall-clock budget are spent.

mod client;
mod http;
mod mock;
mod reply;

pub use client::{OracleClient, RetryPolicy};
pub use http::ChatCompletionsOracle;
pub use mock::ScriptedOracle;
pub use reply::{Oracle, OracleError, OracleReply};
