mod terminal;

use clap::{Parser, Subcommand, ValueEnum};
use component_numdate::{
    describe, get_config_schema, normalize as component_normalize, render_html, render_plan,
    validate_responses,
};
use numdate_spec::{
    ControlDescriptor, Feedback, FeedbackDisplay, MonotonicClock, NumdateTrial, ResponseEncoding,
    Submission, TrialConfig, TrialResult, ValidationResult, build_render_plan, check_value,
    feedback_for, normalize_trial, render_text, trial_result_schema,
};
use serde_json::{Value, json};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use terminal::{Presenter, TerminalDisplay};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Numeric and date survey trial CLI",
    long_about = "Runs survey-numdate trials in a terminal and inspects their configuration, rendering and responses"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum RenderMode {
    Text,
    Html,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    Info,
    Config,
    Result,
}

#[derive(Subcommand)]
enum Command {
    /// Run a trial interactively in the terminal.
    Run {
        /// Path to the trial configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// How the mounted form is shown before prompting.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
        /// Also write the trial result JSON to this file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Print the result encoded as CBOR (hex).
        #[arg(long)]
        cbor: bool,
        /// Emit responses as a JSON string instead of an object.
        #[arg(long)]
        stringify_responses: bool,
    },
    /// Render a trial without running it.
    Render {
        /// Path to the trial configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderMode::Html)]
        format: RenderMode,
    },
    /// Print the normalized questions of a trial.
    Normalize {
        /// Path to the trial configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
    },
    /// Print parameter metadata or JSON schemas.
    Schema {
        #[arg(long, value_enum, default_value_t = SchemaKind::Info)]
        kind: SchemaKind,
    },
    /// Check collected responses against a trial's constraints.
    Validate {
        /// Path to the trial configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Path to the responses JSON (`{"Q0": "...", ...}`).
        #[arg(long, value_name = "RESPONSES")]
        responses: PathBuf,
    },
}

fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            format,
            out,
            cbor,
            stringify_responses,
        } => {
            let encoding = if stringify_responses {
                ResponseEncoding::Stringified
            } else {
                ResponseEncoding::Structured
            };
            run_trial(config, format, out, cbor, encoding)
        }
        Command::Render { config, format } => run_render(config, format),
        Command::Normalize { config } => run_normalize(config),
        Command::Schema { kind } => run_schema(kind),
        Command::Validate { config, responses } => run_validate(config, responses),
    }
}

fn read_trial_config(path: &Path) -> CliResult<TrialConfig> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn component_config(path: &Path) -> CliResult<String> {
    let contents = fs::read_to_string(path)?;
    let trial: Value = serde_json::from_str(&contents)?;
    Ok(json!({ "trial": trial }).to_string())
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_trial(
    config_path: PathBuf,
    format: RenderMode,
    out: Option<PathBuf>,
    cbor: bool,
    encoding: ResponseEncoding,
) -> CliResult<()> {
    let config = read_trial_config(&config_path)?;
    let mut trial = NumdateTrial::new(&config, MonotonicClock::new())?;
    let mut display = TerminalDisplay::new(format);
    let plan = trial.render(&mut display)?.clone();
    let presenter = Presenter::new(plan.controls.len());

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut submission = Submission::new();
    for control in &plan.controls {
        match prompt_control(&presenter, control, &mut input)? {
            Some(value) => submission.insert(control.name.clone(), value),
            None => {
                trial.abort(&mut display);
                return Err("trial aborted by user".into());
            }
        }
    }
    println!("[{}]", plan.submit.label);

    let mut result: Option<TrialResult> = None;
    trial.submit(&mut display, &submission, &mut |emitted: TrialResult| {
        result = Some(emitted)
    })?;
    let result = result.ok_or("trial finished without a result")?;

    let host_value = result.to_host_value(encoding)?;
    let pretty = serde_json::to_string_pretty(&host_value)?;
    let cbor_bytes = if cbor {
        Some(serde_cbor::to_vec(&host_value)?)
    } else {
        None
    };
    presenter.show_result(&result, &pretty, cbor_bytes.as_deref());

    if let Some(path) = out {
        fs::write(&path, &pretty)?;
        log::debug!("wrote trial result to {}", path.display());
    }

    let feedback = feedback_for(trial.trial(), &result.responses);
    show_feedback(&feedback, &mut input)
}

/// Ask for one control's value until it passes the advisory checks.
/// `None` means the respondent typed `exit`.
fn prompt_control(
    presenter: &Presenter,
    control: &ControlDescriptor,
    input: &mut impl BufRead,
) -> CliResult<Option<String>> {
    loop {
        presenter.show_prompt(control);
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err("unexpected end of input".into());
        }
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Ok(None);
        }

        let value = resolve_entry(control, trimmed);
        match check_value(control, &value) {
            Some(violation) => presenter.show_violation(&violation),
            None => return Ok(Some(value)),
        }
    }
}

/// An empty entry leaves the control's initial value in place.
fn resolve_entry(control: &ControlDescriptor, raw: &str) -> String {
    if raw.is_empty() {
        control.value.clone()
    } else {
        raw.to_string()
    }
}

fn show_feedback(feedback: &[Feedback], input: &mut impl BufRead) -> CliResult<()> {
    for entry in feedback {
        println!("{}: {}", entry.question_key, entry.text);
        match entry.display {
            FeedbackDisplay::Timed(seconds) => {
                thread::sleep(Duration::from_secs(u64::from(seconds)));
            }
            FeedbackDisplay::UntilDismissed => {
                print!("Press Enter to continue ");
                io::stdout().flush()?;
                let mut line = String::new();
                input.read_line(&mut line)?;
            }
        }
    }
    Ok(())
}

fn run_render(config_path: PathBuf, format: RenderMode) -> CliResult<()> {
    match format {
        RenderMode::Text => {
            let config = read_trial_config(&config_path)?;
            let plan = build_render_plan(&normalize_trial(&config)?);
            println!("{}", render_text(&plan));
        }
        RenderMode::Html => {
            let config_json = component_config(&config_path)?;
            let html = render_html(&config_json);
            if html.starts_with('{') {
                parse_component_result(&html)?;
            }
            println!("{}", html);
        }
        RenderMode::Json => {
            let config_json = component_config(&config_path)?;
            let ui = parse_component_result(&render_plan(&config_json))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_normalize(config_path: PathBuf) -> CliResult<()> {
    let config_json = component_config(&config_path)?;
    let normalized = parse_component_result(&component_normalize(&config_json))?;
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}

fn run_schema(kind: SchemaKind) -> CliResult<()> {
    let value = match kind {
        SchemaKind::Info => parse_component_result(&describe())?,
        SchemaKind::Config => parse_component_result(&get_config_schema())?,
        SchemaKind::Result => trial_result_schema(),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run_validate(config_path: PathBuf, responses_path: PathBuf) -> CliResult<()> {
    let config_json = component_config(&config_path)?;
    let responses_json = fs::read_to_string(responses_path)?;
    let value = parse_component_result(&validate_responses(&config_json, &responses_json))?;
    let result: ValidationResult = serde_json::from_value(value)?;

    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {} ({})", error.question_key, error.message, error.code);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use numdate_spec::{InputType, render::ElementKind};
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    const SCENARIO: &str = include_str!("../../numdate-spec/tests/fixtures/age_birthdate.json");
    const BOUNDED: &str = include_str!("../../numdate-spec/tests/fixtures/bounded_trial.json");

    fn write_fixture(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn control(kind: InputType, value: &str) -> ControlDescriptor {
        ControlDescriptor {
            index: 0,
            element: ElementKind::Input,
            prompt: "Prompt".into(),
            kind,
            step: 0.0,
            name: "survey-numdate-response-0".into(),
            size: 40,
            value: value.into(),
            autofocus: true,
            required: false,
            min: None,
            max: None,
        }
    }

    #[test]
    fn empty_entry_keeps_initial_value() {
        let wake = control(InputType::Time, "07:00");
        assert_eq!(resolve_entry(&wake, ""), "07:00");
        assert_eq!(resolve_entry(&wake, "06:45"), "06:45");
    }

    #[test]
    fn prompt_control_retries_until_valid() {
        let presenter = Presenter::new(1);
        let number = control(InputType::Number, "");
        let mut input = io::Cursor::new("abc\n34\n");
        let value = prompt_control(&presenter, &number, &mut input).expect("prompt");
        assert_eq!(value.as_deref(), Some("34"));
    }

    #[test]
    fn prompt_control_stops_on_exit() {
        let presenter = Presenter::new(1);
        let number = control(InputType::Number, "");
        let mut input = io::Cursor::new("exit\n");
        assert_eq!(
            prompt_control(&presenter, &number, &mut input).expect("prompt"),
            None
        );
    }

    #[test]
    fn prompt_control_fails_on_eof() {
        let presenter = Presenter::new(1);
        let number = control(InputType::Number, "");
        let mut input = io::Cursor::new("");
        assert!(prompt_control(&presenter, &number, &mut input).is_err());
    }

    #[test]
    fn run_command_collects_scenario_responses() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let config = write_fixture(&workspace, "trial.json", SCENARIO);
        let out = workspace.path().join("result.json");

        Command::cargo_bin("survey-numdate")?
            .arg("run")
            .arg("--config")
            .arg(&config)
            .arg("--out")
            .arg(&out)
            .write_stdin("34\n1990-05-01\n")
            .assert()
            .success();

        let result: Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
        assert_eq!(result["responses"]["Q0"], "34");
        assert_eq!(result["responses"]["Q1"], "1990-05-01");
        assert!(result["rt"].as_f64().unwrap_or(-1.0) >= 0.0);
        Ok(())
    }

    #[test]
    fn run_command_reprompts_on_invalid_date() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let config = write_fixture(&workspace, "trial.json", SCENARIO);

        let assert = Command::cargo_bin("survey-numdate")?
            .arg("run")
            .arg("--config")
            .arg(&config)
            .arg("--stringify-responses")
            .write_stdin("34\n05/01/1990\n1990-05-01\n")
            .assert()
            .success();

        let stderr = String::from_utf8(assert.get_output().stderr.clone())?;
        let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
        assert!(stderr.contains("Invalid answer"));
        assert!(stdout.contains(r#""responses": "{\"Q0\":\"34\",\"Q1\":\"1990-05-01\"}""#));
        Ok(())
    }

    #[test]
    fn run_command_reports_exit() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let config = write_fixture(&workspace, "trial.json", SCENARIO);

        Command::cargo_bin("survey-numdate")?
            .arg("run")
            .arg("--config")
            .arg(&config)
            .write_stdin("exit\n")
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn render_command_prints_html() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let config = workspace.path().join("trial.json");
        fs::write(&config, BOUNDED)?;

        let assert = Command::cargo_bin("survey-numdate")?
            .arg("render")
            .arg("--config")
            .arg(&config)
            .assert()
            .success();
        let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
        assert!(stdout.contains("survey-numdate-preamble"));
        assert!(stdout.contains("value=\"Submit answers\""));
        assert!(stdout.contains("max=\"24\""));
        Ok(())
    }

    #[test]
    fn render_command_rejects_missing_prompt() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let config = write_fixture(&workspace, "trial.json", r#"{"questions":[{"type":"date"}]}"#);

        Command::cargo_bin("survey-numdate")?
            .arg("render")
            .arg("--config")
            .arg(&config)
            .arg("--format")
            .arg("json")
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn validate_command_fails_for_out_of_range() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let config = write_fixture(&workspace, "trial.json", BOUNDED);
        let responses = write_fixture(
            &workspace,
            "responses.json",
            r#"{"Q0":"30","Q1":"07:00","Q2":"2021-W05","Q3":""}"#,
        );

        let assert = Command::cargo_bin("survey-numdate")?
            .arg("validate")
            .arg("--config")
            .arg(&config)
            .arg("--responses")
            .arg(&responses)
            .assert()
            .failure();
        let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("Q0 - value above maximum (range_overflow)"));
        Ok(())
    }

    #[test]
    fn schema_command_prints_parameter_info() -> Result<(), Box<dyn std::error::Error>> {
        let assert = Command::cargo_bin("survey-numdate")?
            .arg("schema")
            .assert()
            .success();
        let info: Value = serde_json::from_slice(&assert.get_output().stdout)?;
        assert_eq!(info["name"], "survey-numdate");
        Ok(())
    }
}
