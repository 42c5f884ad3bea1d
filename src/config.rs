//! Configuration for a résumé pipeline.
//!
//! Everything a [`crate::runner::Pipeline`] needs is set on one
//! [`PipelineConfig`], built via [`PipelineConfigBuilder`]. The components
//! themselves never read the environment; provider auto-detection happens
//! once, in [`crate::runner::Pipeline::from_config`].

use crate::error::PipelineError;
use crate::pipeline::layout::RenderStyle;
use crate::progress::PipelineProgressCallback;
use crate::task::TaskKind;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when a provider is named but no model is.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for a [`crate::runner::Pipeline`].
///
/// # Example
/// ```rust
/// use resume_pipeline::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .provider_name("openai")
///     .model("gpt-4.1-nano")
///     .max_tokens(1500)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses [`DEFAULT_MODEL`] or the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every task. Default: None (per-task default,
    /// see [`TaskKind::default_temperature`]).
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate per answer. Default: 2048.
    ///
    /// A rewritten two-page résumé fits comfortably; a truncated JSON answer
    /// would only end up as a fallback.
    pub max_tokens: usize,

    /// Per-completion timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Largest accepted document, in bytes. Default: 10 MiB.
    pub max_document_bytes: usize,

    /// Requests processed at once by [`crate::runner::Pipeline::run_many`]. Default: 4.
    pub concurrency: usize,

    /// Typography of rendered documents.
    pub render_style: RenderStyle,

    /// Optional stage-level progress events.
    pub progress_callback: Option<Arc<dyn PipelineProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: None,
            max_tokens: 2048,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            max_document_bytes: 10 * 1024 * 1024,
            concurrency: 4,
            render_style: RenderStyle::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("concurrency", &self.concurrency)
            .field("render_style", &self.render_style)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Temperature used for `kind`: the override if set, else the task default.
    pub fn temperature_for(&self, kind: TaskKind) -> f32 {
        self.temperature.unwrap_or_else(|| kind.default_temperature())
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl fmt::Debug for PipelineConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl PipelineConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    /// Not clamped: out-of-range values are reported by [`build`](Self::build).
    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_document_bytes(mut self, n: usize) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn render_style(mut self, style: RenderStyle) -> Self {
        self.config.render_style = style;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn PipelineProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(PipelineError::InvalidConfig(format!(
                    "temperature must be 0.0–2.0, got {}",
                    t
                )));
            }
        }
        if c.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig("timeouts must be ≥ 1 second".into()));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.max_document_bytes == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_document_bytes must be ≥ 1".into(),
            ));
        }
        c.render_style
            .validate()
            .map_err(|e| PipelineError::InvalidConfig(format!("render style: {}", e)))?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::builder().build().unwrap();
        assert_eq!(c.max_tokens, 2048);
        assert_eq!(c.api_timeout_secs, 60);
        assert_eq!(c.download_timeout_secs, 120);
        assert_eq!(c.max_document_bytes, 10 * 1024 * 1024);
        assert_eq!(c.concurrency, 4);
        assert!(c.temperature.is_none());
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn per_task_temperature_unless_overridden() {
        let c = PipelineConfig::default();
        assert_eq!(c.temperature_for(TaskKind::Summarize), 0.2);
        assert_eq!(c.temperature_for(TaskKind::Compare), 0.3);
        assert_eq!(c.temperature_for(TaskKind::Optimize), 0.5);

        let c = PipelineConfig::builder().temperature(0.0).build().unwrap();
        for kind in TaskKind::ALL {
            assert_eq!(c.temperature_for(kind), 0.0);
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(PipelineConfig::builder().temperature(2.5).build().is_err());
        assert!(PipelineConfig::builder().temperature(-0.1).build().is_err());
        assert!(PipelineConfig::builder().max_tokens(0).build().is_err());
        assert!(PipelineConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(PipelineConfig::builder().max_document_bytes(0).build().is_err());

        let bad_style = RenderStyle {
            margin_pt: 400.0,
            ..RenderStyle::default()
        };
        let err = PipelineConfig::builder()
            .render_style(bad_style)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("render style"));
    }

    #[test]
    fn concurrency_floor_is_one() {
        let c = PipelineConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);

        let zero = PipelineConfigBuilder {
            config: PipelineConfig {
                concurrency: 0,
                ..PipelineConfig::default()
            },
        };
        assert!(zero.build().is_err());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let c = PipelineConfig::builder()
            .progress_callback(Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{:?}", c);
        assert!(dbg.contains("<dyn PipelineProgressCallback>"));
        assert!(dbg.contains("max_tokens: 2048"));
    }
}
