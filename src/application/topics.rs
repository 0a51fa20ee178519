//! Daily research topics from a text-generation model, with a static fallback.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

use crate::domain::reports::iso_date;

/// Number of topics a generated list must contain.
pub const TOPIC_COUNT: usize = 10;

const FALLBACK_TOPICS: [&str; TOPIC_COUNT] = [
    "Direct Liquid Cooling supply risk map",
    "Multi-output regression reliability in industrial prediction",
    "Data lakehouse architecture trends",
    "QuietPower Index benchmarking method",
    "FFT-based steady-state sound classification",
    "Thermal-Reliability co-design patterns",
    "Spec-Driven Development in MLOps pipelines",
    "Fan curve auto-generation sanity checks",
    "Edge AI for acoustic anomaly detection",
    "Power/Noise efficiency frontier mapping",
];

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("topic model request failed: {0}")]
    Request(String),
    #[error("topic model returned no text")]
    EmptyResponse,
    #[error("topic list is not a JSON array: {0}")]
    Malformed(String),
    #[error("expected {expected} topics, got {actual}")]
    WrongCount { expected: usize, actual: usize },
}

/// A text-generation backend that answers a single prompt.
#[async_trait]
pub trait TopicModel: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, TopicError>;
}

#[derive(Clone, Default)]
pub struct TopicGenerator {
    model: Option<Arc<dyn TopicModel>>,
}

impl TopicGenerator {
    pub fn new(model: Option<Arc<dyn TopicModel>>) -> Self {
        Self { model }
    }

    /// Topics for `today`. Never fails: any model problem yields the fallback list.
    pub async fn generate(&self, today: Date) -> Vec<String> {
        let Some(model) = self.model.as_ref() else {
            info!(
                target = "gazette::topics",
                "no topic model configured; using fallback topics"
            );
            return fallback_topics(today);
        };

        let result = match model.complete(&build_prompt(today)).await {
            Ok(text) => parse_topics(&text),
            Err(err) => Err(err),
        };

        match result {
            Ok(topics) => {
                info!(
                    target = "gazette::topics",
                    model = model.name(),
                    count = topics.len(),
                    "generated daily topics"
                );
                topics
            }
            Err(err) => {
                counter!("gazette_topics_fallback_total").increment(1);
                warn!(
                    target = "gazette::topics",
                    model = model.name(),
                    error = %err,
                    "topic generation failed; using fallback topics"
                );
                fallback_topics(today)
            }
        }
    }
}

pub fn fallback_topics(today: Date) -> Vec<String> {
    let today = iso_date(today);
    FALLBACK_TOPICS
        .iter()
        .map(|topic| format!("{today} · {topic}"))
        .collect()
}

pub fn build_prompt(today: Date) -> String {
    format!(
        "You are a research editor generating concise daily tech/business research topics for an engineer-manager in thermal, acoustics, and ML systems.
Date: {today}.
Requirements:
- Return exactly {TOPIC_COUNT} short, actionable topics (8-12 words each), no numbering.
- Focus mix: (1) thermal/DLC, (2) acoustics/audio ML, (3) MLOps/SDD, (4) data architecture/lakehouse, (5) HW-SW co-design/product ops.
- Avoid hype, avoid vague titles. Each must be specific and researchable.
- Output: JSON array of strings (no commentary).
",
        today = iso_date(today)
    )
}

/// Parse the model reply: a JSON array of exactly [`TOPIC_COUNT`] entries.
///
/// A surrounding Markdown code fence is stripped. Non-string entries are kept
/// in their JSON rendering.
pub fn parse_topics(text: &str) -> Result<Vec<String>, TopicError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(TopicError::EmptyResponse);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|err| TopicError::Malformed(err.to_string()))?;
    let Value::Array(items) = value else {
        return Err(TopicError::Malformed("top-level value is not an array".into()));
    };
    if items.len() != TOPIC_COUNT {
        return Err(TopicError::WrongCount {
            expected: TOPIC_COUNT,
            actual: items.len(),
        });
    }

    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .collect())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop an info string such as `json` on the opening fence line.
    match rest.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with('[') => body.trim(),
        _ => rest.trim(),
    }
}
