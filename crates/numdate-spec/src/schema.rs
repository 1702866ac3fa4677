//! Declarative parameter metadata for tooling and documentation.
//!
//! Nothing here participates in normalization; defaults listed below mirror
//! the ones applied in [`crate::normalize`].

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::collect::TrialResult;
use crate::normalize::{DEFAULT_COLUMNS, DEFAULT_STEP};
use crate::spec::trial::{DEFAULT_BUTTON_LABEL, TrialConfig};

pub const PLUGIN_NAME: &str = "survey-numdate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Complex,
    String,
    Int,
    Float,
    Bool,
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub pretty_name: String,
    /// `None` means the parameter has no default and must be supplied or
    /// stays absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<ParameterInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterInfo>,
}

impl PluginInfo {
    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }
}

impl ParameterInfo {
    pub fn nested_parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.nested.iter().find(|parameter| parameter.name == name)
    }
}

fn parameter(
    name: &str,
    kind: ParameterKind,
    pretty_name: &str,
    default: Option<Value>,
    description: &str,
) -> ParameterInfo {
    ParameterInfo {
        name: name.into(),
        kind,
        pretty_name: pretty_name.into(),
        default,
        description: description.into(),
        array: false,
        nested: Vec::new(),
    }
}

/// Parameter metadata for the trial configuration.
pub fn parameter_info() -> PluginInfo {
    let question_parameters = vec![
        parameter(
            "prompt",
            ParameterKind::String,
            "Prompt",
            None,
            "Prompt for the subject to respond to.",
        ),
        parameter(
            "value",
            ParameterKind::String,
            "Value",
            Some(json!("")),
            "Initial, editable content of the response field.",
        ),
        parameter(
            "columns",
            ParameterKind::Int,
            "Columns",
            Some(json!(DEFAULT_COLUMNS)),
            "Visual width of the response field.",
        ),
        parameter(
            "type",
            ParameterKind::String,
            "Type",
            Some(json!("number")),
            "Input type: number, date, time, month, week or datetime-local. Anything else falls back to number.",
        ),
        parameter(
            "step",
            ParameterKind::Float,
            "Step",
            Some(json!(DEFAULT_STEP)),
            "Legal intervals of the response; 0 leaves it unconstrained.",
        ),
        parameter(
            "max",
            ParameterKind::String,
            "Max",
            None,
            "Legal maximum of the response, in the format of the input type.",
        ),
        parameter(
            "min",
            ParameterKind::String,
            "Min",
            None,
            "Legal minimum of the response, in the format of the input type.",
        ),
        parameter(
            "feedback",
            ParameterKind::String,
            "Feedback",
            Some(json!("")),
            "Feedback for the response. %r is replaced by the response, %q by the prompt.",
        ),
        parameter(
            "feedback_time",
            ParameterKind::Int,
            "Feedback Time",
            Some(json!(0)),
            "Seconds the feedback stays up; 0 waits for the respondent to continue.",
        ),
        parameter(
            "required",
            ParameterKind::Bool,
            "Required",
            Some(json!(false)),
            "Require a response.",
        ),
    ];

    let questions = ParameterInfo {
        array: true,
        nested: question_parameters,
        ..parameter(
            "questions",
            ParameterKind::Complex,
            "Questions",
            None,
            "Questions shown on the page, in order.",
        )
    };

    PluginInfo {
        name: PLUGIN_NAME.into(),
        description: "Numeric, date and time response questions on a single page.".into(),
        parameters: vec![
            questions,
            parameter(
                "preamble",
                ParameterKind::Html,
                "Preamble",
                Some(Value::Null),
                "HTML shown at the top of the page above all the questions.",
            ),
            parameter(
                "button_label",
                ParameterKind::String,
                "Button label",
                Some(json!(DEFAULT_BUTTON_LABEL)),
                "Text of the button that finishes the trial.",
            ),
        ],
    }
}

/// JSON Schema of [`TrialConfig`].
pub fn trial_config_schema() -> Value {
    serde_json::to_value(schema_for!(TrialConfig)).unwrap_or(Value::Null)
}

/// JSON Schema of [`TrialResult`].
pub fn trial_result_schema() -> Value {
    serde_json::to_value(schema_for!(TrialResult)).unwrap_or(Value::Null)
}
