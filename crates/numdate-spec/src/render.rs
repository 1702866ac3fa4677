use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::spec::{question::InputType, trial::NormalizedTrial};

/// Prefix of every question control's `name` attribute.
pub const CONTROL_NAME_PREFIX: &str = "survey-numdate-response-";

const FORM_TEMPLATE_NAME: &str = "survey-numdate-form";

const FORM_TEMPLATE: &str = r#"{{#if has_preamble}}<div id="survey-numdate-preamble" class="survey-numdate-preamble">{{{preamble}}}</div>
{{/if}}<form id="survey-numdate-form">
{{#each controls}}<div id="survey-numdate-{{index}}" class="survey-numdate-question" style="margin: 2em 0em;">
<p class="survey-numdate">{{prompt}}</p>
<input type="{{input_type}}" step="{{step}}" name="{{name}}" size="{{size}}" value="{{value}}"{{#if autofocus}} autofocus{{/if}}{{#if required}} required{{/if}}{{#if max}} max="{{max}}"{{/if}}{{#if min}} min="{{min}}"{{/if}}>
</div>
{{/each}}<input type="submit" id="survey-numdate-next" class="survey-numdate-btn" value="{{button_label}}">
</form>"#;

/// Failures raised while turning a plan into markup.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to register form template: {0}")]
    Template(#[source] Box<handlebars::TemplateError>),
    #[error("failed to render form: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Element kinds the renderer emits for questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Input,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Input => "input",
        }
    }
}

/// Describes a single question control in render order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlDescriptor {
    pub index: usize,
    pub element: ElementKind,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: InputType,
    pub step: f64,
    pub name: String,
    pub size: u32,
    pub value: String,
    pub autofocus: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

impl ControlDescriptor {
    /// Value for the HTML `step` attribute. A zero step is unconstrained,
    /// which HTML spells `any`.
    pub fn step_attribute(&self) -> String {
        if self.step > 0.0 {
            self.step.to_string()
        } else {
            "any".to_string()
        }
    }
}

/// Submit control placed below all questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitControl {
    pub label: String,
}

/// Ordered controls plus page-level chrome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    pub controls: Vec<ControlDescriptor>,
    pub submit: SubmitControl,
}

impl RenderPlan {
    pub fn control(&self, name: &str) -> Option<&ControlDescriptor> {
        self.controls.iter().find(|control| control.name == name)
    }
}

/// A plan together with the markup produced for it; this is what gets
/// mounted into the display element.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedForm {
    pub plan: RenderPlan,
    pub html: String,
}

pub fn control_name(index: usize) -> String {
    format!("{CONTROL_NAME_PREFIX}{index}")
}

/// Build the render plan from a normalized trial.
pub fn build_render_plan(trial: &NormalizedTrial) -> RenderPlan {
    let controls = trial
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| ControlDescriptor {
            index,
            element: ElementKind::Input,
            prompt: question.prompt.clone(),
            kind: question.kind,
            step: question.step,
            name: control_name(index),
            size: question.columns,
            value: question.value.clone(),
            autofocus: index == 0,
            required: question.required,
            min: question.min.clone(),
            max: question.max.clone(),
        })
        .collect();

    RenderPlan {
        preamble: trial.preamble.clone(),
        controls,
        submit: SubmitControl {
            label: trial.button_label.clone(),
        },
    }
}

#[derive(Serialize)]
struct HtmlForm<'a> {
    // An empty preamble still gets its container; only an absent one is skipped.
    has_preamble: bool,
    preamble: Option<&'a str>,
    controls: Vec<HtmlControl<'a>>,
    button_label: &'a str,
}

#[derive(Serialize)]
struct HtmlControl<'a> {
    index: usize,
    prompt: &'a str,
    input_type: &'static str,
    step: String,
    name: &'a str,
    size: u32,
    value: &'a str,
    autofocus: bool,
    required: bool,
    min: Option<&'a str>,
    max: Option<&'a str>,
}

/// Render the plan as an HTML form. The preamble is inserted verbatim;
/// everything else is escaped.
pub fn render_html(plan: &RenderPlan) -> Result<String, RenderError> {
    let mut registry = Handlebars::new();
    registry
        .register_template_string(FORM_TEMPLATE_NAME, FORM_TEMPLATE)
        .map_err(|err| RenderError::Template(Box::new(err)))?;

    let data = HtmlForm {
        has_preamble: plan.preamble.is_some(),
        preamble: plan.preamble.as_deref(),
        controls: plan
            .controls
            .iter()
            .map(|control| HtmlControl {
                index: control.index,
                prompt: &control.prompt,
                input_type: control.kind.as_str(),
                step: control.step_attribute(),
                name: &control.name,
                size: control.size,
                value: &control.value,
                autofocus: control.autofocus,
                required: control.required,
                min: control.min.as_deref(),
                max: control.max.as_deref(),
            })
            .collect(),
        button_label: &plan.submit.label,
    };

    Ok(registry.render(FORM_TEMPLATE_NAME, &data)?)
}

/// Build the plan and its markup in one go.
pub fn render_form(plan: RenderPlan) -> Result<RenderedForm, RenderError> {
    let html = render_html(&plan)?;
    Ok(RenderedForm { plan, html })
}

/// Render the plan as a structured JSON-friendly value.
pub fn render_json_ui(plan: &RenderPlan) -> Value {
    let questions = plan
        .controls
        .iter()
        .map(|control| {
            let mut map = Map::new();
            map.insert("index".into(), json!(control.index));
            map.insert("name".into(), Value::String(control.name.clone()));
            map.insert("element".into(), Value::String(control.element.as_str().into()));
            map.insert("prompt".into(), Value::String(control.prompt.clone()));
            map.insert("type".into(), Value::String(control.kind.as_str().into()));
            map.insert("step".into(), json!(control.step));
            map.insert("size".into(), json!(control.size));
            map.insert("value".into(), Value::String(control.value.clone()));
            map.insert("autofocus".into(), Value::Bool(control.autofocus));
            map.insert("required".into(), Value::Bool(control.required));
            if let Some(min) = &control.min {
                map.insert("min".into(), Value::String(min.clone()));
            }
            if let Some(max) = &control.max {
                map.insert("max".into(), Value::String(max.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "preamble": plan.preamble,
        "questions": questions,
        "submit": {
            "label": plan.submit.label,
        },
    })
}

/// Render the plan as human-friendly text.
pub fn render_text(plan: &RenderPlan) -> String {
    let mut lines = Vec::new();
    if let Some(preamble) = &plan.preamble {
        lines.push(preamble.clone());
    }

    for control in &plan.controls {
        let mut entry = format!("Q{} {} ({})", control.index, control.prompt, control.kind);
        if control.required {
            entry.push_str(" [required]");
        }
        lines.push(entry);
        if let Some(constraints) = describe_constraints(control) {
            lines.push(format!("  Constraints: {}", constraints));
        }
        if !control.value.is_empty() {
            lines.push(format!("  Initial value: {}", control.value));
        }
    }

    lines.push(format!("[{}]", plan.submit.label));
    lines.join("\n")
}

/// Short summary of a control's bounds and step, if it has any.
pub fn describe_constraints(control: &ControlDescriptor) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(min) = &control.min {
        parts.push(format!("min {}", min));
    }
    if let Some(max) = &control.max {
        parts.push(format!("max {}", max));
    }
    if control.step > 0.0 {
        parts.push(format!("step {}", control.step));
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
