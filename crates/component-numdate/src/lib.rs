use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use numdate_spec::{
    ConfigError, HeadlessDisplay, ManualClock, NormalizedTrial, NumdateTrial, RenderError,
    RenderPlan, ResponseEncoding, ResponseRecord, Submission, TrialConfig, TrialError,
    TrialResult, build_render_plan, feedback_for, normalize_trial, parameter_info,
    render_html as spec_render_html, render_json_ui, trial_config_schema, validate_record,
};

const DEFAULT_TRIAL: &str = include_str!("../../numdate-spec/tests/fixtures/age_birthdate.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse submission/{0}")]
    SubmissionParse(#[source] serde_json::Error),
    #[error("failed to parse responses/{0}")]
    ResponsesParse(#[source] serde_json::Error),
    #[error("invalid trial: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Trial(#[from] TrialError),
    #[error("trial finished without a result")]
    NoResult,
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    trial: Option<TrialConfig>,
    #[serde(default)]
    response_encoding: ResponseEncoding,
}

fn load_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_trial_config(config: &ComponentConfig) -> Result<TrialConfig, ComponentError> {
    match &config.trial {
        Some(trial) => Ok(trial.clone()),
        None => serde_json::from_str(DEFAULT_TRIAL).map_err(ComponentError::ConfigParse),
    }
}

fn load_trial(config_json: &str) -> Result<NormalizedTrial, ComponentError> {
    let config = load_config(config_json)?;
    Ok(normalize_trial(&load_trial_config(&config)?)?)
}

fn load_plan(config_json: &str) -> Result<RenderPlan, ComponentError> {
    load_trial(config_json).map(|trial| build_render_plan(&trial))
}

fn parse_responses(responses_json: &str) -> Result<ResponseRecord, ComponentError> {
    serde_json::from_str(responses_json).map_err(ComponentError::ResponsesParse)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn encode(value: &impl Serialize) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

/// Parameter metadata for tooling.
pub fn describe() -> String {
    respond(encode(&parameter_info()))
}

pub fn get_config_schema() -> String {
    respond(Ok(trial_config_schema()))
}

pub fn normalize(config_json: &str) -> String {
    respond(load_trial(config_json).and_then(|trial| encode(&trial)))
}

pub fn render_plan(config_json: &str) -> String {
    respond(load_plan(config_json).map(|plan| render_json_ui(&plan)))
}

pub fn render_html(config_json: &str) -> String {
    respond_string(load_plan(config_json).and_then(|plan| Ok(spec_render_html(&plan)?)))
}

/// Run one trial from render to submission against a headless display,
/// using the two supplied timestamps as render and submit times.
pub fn submit(
    config_json: &str,
    submission_json: &str,
    started_at: f64,
    submitted_at: f64,
) -> String {
    respond(run_trial(config_json, submission_json, started_at, submitted_at))
}

fn run_trial(
    config_json: &str,
    submission_json: &str,
    started_at: f64,
    submitted_at: f64,
) -> Result<Value, ComponentError> {
    let config = load_config(config_json)?;
    let trial_config = load_trial_config(&config)?;
    let submission: Submission =
        serde_json::from_str(submission_json).map_err(ComponentError::SubmissionParse)?;

    let clock = ManualClock::new(started_at);
    let mut display = HeadlessDisplay::new();
    let mut trial = NumdateTrial::new(&trial_config, &clock)?;
    let mut result: Option<TrialResult> = None;

    trial.render(&mut display)?;
    clock.set(submitted_at);
    trial.submit(&mut display, &submission, &mut |emitted: TrialResult| {
        result = Some(emitted)
    })?;

    let result = result.ok_or(ComponentError::NoResult)?;
    debug!("component trial finished with rt {:.3}ms", result.rt);
    result
        .to_host_value(config.response_encoding)
        .map_err(ComponentError::JsonEncode)
}

pub fn validate_responses(config_json: &str, responses_json: &str) -> String {
    respond(load_plan(config_json).and_then(|plan| {
        let responses = parse_responses(responses_json)?;
        encode(&validate_record(&plan, &responses))
    }))
}

pub fn feedback(config_json: &str, responses_json: &str) -> String {
    respond(load_trial(config_json).and_then(|trial| {
        let responses = parse_responses(responses_json)?;
        encode(&feedback_for(&trial, &responses))
    }))
}
