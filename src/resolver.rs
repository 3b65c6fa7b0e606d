use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::strategy::{CaptionStrategy, ScrapeStrategy, TimedTextStrategy};
use crate::youtube::YoutubeClient;
use crate::{ResolutionMethod, Segment, Transcript, VideoId};

const EMPTY_RESULT: &str = "No valid transcript segments found";

/// One independent way of obtaining a transcript
#[async_trait]
pub trait Strategy: Send + Sync {
    fn method(&self) -> ResolutionMethod;

    /// Normalized segments, possibly empty
    async fn attempt(&self, video_id: &VideoId) -> Result<Vec<Segment>>;
}

#[derive(Debug, Clone)]
pub struct StrategyFailure {
    pub method: ResolutionMethod,
    pub reason: String,
}

/// Every strategy failed; failures are kept in attempt order
#[derive(Debug, Error)]
#[error("All methods failed ({})", summarize(.failures))]
pub struct Exhausted {
    pub failures: Vec<StrategyFailure>,
}

fn summarize(failures: &[StrategyFailure]) -> String {
    if failures.is_empty() {
        return "no strategies configured".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{}: {}", f.method, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of running a single strategy in isolation
#[derive(Debug, Serialize)]
pub struct Diagnostic {
    pub method: ResolutionMethod,
    pub success: bool,
    pub segments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Resolver {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Resolver {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: preferred language, fallback language, auto, direct fetch, scrape
    pub fn from_config(client: Arc<YoutubeClient>, config: &Config) -> Self {
        Self::new(vec![
            Box::new(CaptionStrategy::new(
                Arc::clone(&client),
                ResolutionMethod::PreferredLanguage,
                config.preferred_languages.clone(),
            )),
            Box::new(CaptionStrategy::new(
                Arc::clone(&client),
                ResolutionMethod::FallbackLanguage,
                config.fallback_languages.clone(),
            )),
            Box::new(CaptionStrategy::new(Arc::clone(&client), ResolutionMethod::Auto, Vec::new())),
            Box::new(TimedTextStrategy::new(
                Arc::clone(&client),
                config.timedtext_languages.clone(),
            )),
            Box::new(ScrapeStrategy::new(client)),
        ])
    }

    pub fn methods(&self) -> Vec<ResolutionMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Try each strategy in order and return the first non-empty result
    pub async fn resolve(&self, video_id: &VideoId) -> Result<Transcript, Exhausted> {
        info!("Attempting transcript retrieval for {video_id}");
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            let method = strategy.method();
            let reason = match strategy.attempt(video_id).await {
                Ok(segments) if !segments.is_empty() => {
                    info!("{method} produced {} segments for {video_id}", segments.len());
                    return Ok(Transcript {
                        video_id: video_id.clone(),
                        method,
                        segments,
                    });
                }
                Ok(_) => EMPTY_RESULT.to_string(),
                Err(e) => format!("{e:#}"),
            };
            info!("{method} failed for {video_id}: {reason}");
            failures.push(StrategyFailure { method, reason });
        }

        let exhausted = Exhausted { failures };
        warn!("{exhausted}");
        Err(exhausted)
    }

    /// Run every strategy, without stopping at the first success
    pub async fn diagnose(&self, video_id: &VideoId) -> Vec<Diagnostic> {
        let mut results = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let method = strategy.method();
            let diagnostic = match strategy.attempt(video_id).await {
                Ok(segments) => Diagnostic {
                    method,
                    success: !segments.is_empty(),
                    segments: segments.len(),
                    error: segments.is_empty().then(|| EMPTY_RESULT.to_string()),
                    sample: segments.into_iter().next(),
                },
                Err(e) => Diagnostic {
                    method,
                    success: false,
                    segments: 0,
                    sample: None,
                    error: Some(format!("{e:#}")),
                },
            };
            results.push(diagnostic);
        }

        results
    }
}
