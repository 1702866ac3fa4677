use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::question::{QuestionConfig, QuestionSpec};

pub const DEFAULT_BUTTON_LABEL: &str = "Continue";

fn default_button_label() -> String {
    DEFAULT_BUTTON_LABEL.to_string()
}

/// Configuration for one survey trial, supplied once by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrialConfig {
    #[serde(default)]
    pub questions: Vec<QuestionConfig>,
    /// Raw markup shown above the questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(default = "default_button_label")]
    pub button_label: String,
}

impl TrialConfig {
    pub fn new(questions: Vec<QuestionConfig>) -> Self {
        Self {
            questions,
            preamble: None,
            button_label: default_button_label(),
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn with_button_label(mut self, label: impl Into<String>) -> Self {
        self.button_label = label.into();
        self
    }
}

/// Trial configuration after every question went through normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedTrial {
    pub questions: Vec<QuestionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    pub button_label: String,
}
