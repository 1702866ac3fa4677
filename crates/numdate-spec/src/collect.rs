use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::render::RenderPlan;

/// Respondent entries keyed `Q{index}`, in question order.
pub type ResponseRecord = IndexMap<String, String>;

pub fn response_key(index: usize) -> String {
    format!("Q{index}")
}

/// Control values reported by the rendering surface when the form is
/// submitted, keyed by control `name`. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Submission {
    values: HashMap<String, String>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Submission
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// How responses are shaped when handed to a host as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEncoding {
    /// `responses` is a JSON object.
    #[default]
    Structured,
    /// `responses` is that object serialized into a JSON string.
    Stringified,
}

/// The single record emitted when a trial is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrialResult {
    /// Response time in milliseconds.
    pub rt: f64,
    pub responses: ResponseRecord,
}

impl TrialResult {
    /// Negative or non-finite response times collapse to zero.
    pub fn new(rt: f64, responses: ResponseRecord) -> Self {
        let rt = if rt.is_finite() { rt.max(0.0) } else { 0.0 };
        Self { rt, responses }
    }

    pub fn to_host_value(&self, encoding: ResponseEncoding) -> Result<Value, serde_json::Error> {
        match encoding {
            ResponseEncoding::Structured => serde_json::to_value(self),
            ResponseEncoding::Stringified => Ok(json!({
                "rt": self.rt,
                "responses": serde_json::to_string(&self.responses)?,
            })),
        }
    }
}

/// Milliseconds between two clock readings, never negative.
pub fn elapsed_ms(started_at: f64, submitted_at: f64) -> f64 {
    (submitted_at - started_at).max(0.0)
}

/// Read every control's value in render order. A control the surface did
/// not report still holds its initial value.
pub fn collect_responses(plan: &RenderPlan, submission: &Submission) -> ResponseRecord {
    let mut responses = ResponseRecord::with_capacity(plan.controls.len());
    for control in &plan.controls {
        let value = match submission.get(&control.name) {
            Some(value) => value.to_string(),
            None => {
                debug!(
                    "control '{}' missing from submission, keeping initial value",
                    control.name
                );
                control.value.clone()
            }
        };
        responses.insert(response_key(control.index), value);
    }
    responses
}
