use log::debug;
use thiserror::Error;

use crate::spec::{
    question::{InputType, QuestionConfig, QuestionSpec},
    trial::{NormalizedTrial, TrialConfig},
};

pub const DEFAULT_COLUMNS: u32 = 40;
pub const DEFAULT_STEP: f64 = 0.0;

/// Fatal configuration problems, reported before anything is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("trial has no questions")]
    NoQuestions,
    #[error("question {index} is missing a prompt")]
    MissingPrompt { index: usize },
}

/// Resolve a single question against the defaults and the type whitelist.
pub fn normalize_question(
    index: usize,
    config: &QuestionConfig,
) -> Result<QuestionSpec, ConfigError> {
    let prompt = config
        .prompt
        .clone()
        .ok_or(ConfigError::MissingPrompt { index })?;

    Ok(QuestionSpec {
        prompt,
        value: config.value.clone().unwrap_or_default(),
        columns: config.columns.unwrap_or(DEFAULT_COLUMNS),
        kind: resolve_kind(index, config.kind.as_deref()),
        step: config.step.unwrap_or(DEFAULT_STEP),
        min: resolve_bound(config.min.as_deref()),
        max: resolve_bound(config.max.as_deref()),
        feedback: config.feedback.clone().unwrap_or_default(),
        feedback_time: config.feedback_time.unwrap_or(0),
        required: config.required.unwrap_or(false),
    })
}

/// Normalize every question of a trial, failing on the first bad one.
pub fn normalize_trial(config: &TrialConfig) -> Result<NormalizedTrial, ConfigError> {
    if config.questions.is_empty() {
        return Err(ConfigError::NoQuestions);
    }

    let questions = config
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| normalize_question(index, question))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NormalizedTrial {
        questions,
        preamble: config.preamble.clone(),
        button_label: config.button_label.clone(),
    })
}

fn resolve_kind(index: usize, label: Option<&str>) -> InputType {
    match label {
        None => InputType::default(),
        Some(label) => InputType::from_label(label).unwrap_or_else(|| {
            debug!("question {index}: unsupported type '{label}', using number");
            InputType::Number
        }),
    }
}

// A blank bound would render as `min=""`, so it counts as unset.
fn resolve_bound(bound: Option<&str>) -> Option<String> {
    bound
        .filter(|value| !value.trim().is_empty())
        .map(String::from)
}
