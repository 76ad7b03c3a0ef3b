use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use smartcut_oracle::{ChatCompletionsOracle, OracleClient, RetryPolicy};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for one pipeline run. Every field has a default, so an empty
/// YAML document is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub cleansing: CleansingConfig,
    pub concept: ConceptPolicy,
    pub oracle: OracleConfig,
}

/// Advisory segment length (in transcript lines) communicated to the oracle,
/// plus how many batches the transcript is split into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationConfig {
    pub min_guide: usize,
    pub max_guide: usize,
    pub batches: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_guide: 10,
            max_guide: 15,
            batches: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleansingConfig {
    pub batches: usize,
}

impl Default for CleansingConfig {
    fn default() -> Self {
        Self { batches: 2 }
    }
}

/// Group-size bounds and clip-count target for conceptual merging.
/// `min_clips` is requested from the oracle, never enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConceptPolicy {
    pub min_group: usize,
    pub max_group: usize,
    pub min_clips: usize,
}

impl Default for ConceptPolicy {
    fn default() -> Self {
        Self {
            min_group: 6,
            max_group: 8,
            min_clips: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1` or a LiteLLM proxy.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub request_timeout_sec: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub call_timeout_sec: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: None,
            request_timeout_sec: 300,
            max_attempts: 10,
            base_delay_ms: 10_000,
            max_delay_ms: 120_000,
            call_timeout_sec: 15 * 60,
        }
    }
}

impl OracleConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    /// Build the HTTP-backed client. A missing key is allowed (local proxies);
    /// the endpoint will answer 401 if it needs one.
    pub fn build_client(&self) -> Result<OracleClient> {
        let api_key = std::env::var(&self.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(var = %self.api_key_env, "oracle API key not set");
        }
        let oracle = ChatCompletionsOracle::new(
            &self.base_url,
            &self.model,
            Duration::from_secs(self.request_timeout_sec),
        )?
        .with_api_key(api_key)
        .with_temperature(self.temperature);
        Ok(OracleClient::new(Arc::new(oracle))
            .with_retry(self.retry_policy())
            .with_call_timeout(Duration::from_secs(self.call_timeout_sec)))
    }
}

impl PipelineConfig {
    /// Load and validate a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse and validate a config from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = if yaml.trim().is_empty() {
            PipelineConfig::default()
        } else {
            serde_yaml::from_str(yaml).context("config schema validation failed")?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let seg = &self.segmentation;
        if seg.batches == 0 {
            bail!("segmentation.batches must be at least 1");
        }
        if seg.min_guide > seg.max_guide {
            bail!(
                "segmentation.min_guide ({}) exceeds max_guide ({})",
                seg.min_guide,
                seg.max_guide
            );
        }
        if self.cleansing.batches == 0 {
            bail!("cleansing.batches must be at least 1");
        }
        let c = &self.concept;
        if c.min_group == 0 || c.min_group > c.max_group {
            bail!(
                "concept group bounds must satisfy 1 <= min_group <= max_group, got {}..={}",
                c.min_group,
                c.max_group
            );
        }
        if self.oracle.max_attempts == 0 {
            bail!("oracle.max_attempts must be at least 1");
        }
        if self.oracle.base_delay_ms > self.oracle.max_delay_ms {
            bail!("oracle.base_delay_ms exceeds oracle.max_delay_ms");
        }
        Ok(())
    }
}
