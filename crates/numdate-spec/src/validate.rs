//! Advisory constraint checks for surfaces without native form validation.
//!
//! Browsers enforce `required`, `min`, `max` and `step` before the submit
//! event fires, and the trial driver never re-validates. Headless surfaces
//! (terminals, tests) call into this module explicitly instead.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::collect::{ResponseRecord, response_key};
use crate::render::{ControlDescriptor, RenderPlan};
use crate::spec::question::InputType;

// Years are capped at six digits, the widest the HTML date inputs accept.
const NUMBER_PATTERN: &str = r"^-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?$";
const DATE_PATTERN: &str = r"^(\d{4,6})-(\d{2})-(\d{2})$";
const MONTH_PATTERN: &str = r"^(\d{4,6})-(\d{2})$";
const WEEK_PATTERN: &str = r"^(\d{4,6})-W(\d{2})$";
const TIME_PATTERN: &str = r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,3}))?)?$";
const DATETIME_PATTERN: &str = r"^(\d{4,6}-\d{2}-\d{2})[T ](\d{2}:\d{2}(?::\d{2}(?:\.\d{1,3})?)?)$";

static NUMBER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(NUMBER_PATTERN).ok());
static DATE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(DATE_PATTERN).ok());
static MONTH_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(MONTH_PATTERN).ok());
static WEEK_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(WEEK_PATTERN).ok());
static TIME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(TIME_PATTERN).ok());
static DATETIME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(DATETIME_PATTERN).ok());

const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintViolation {
    /// Response key (`Q{index}`) of the offending control.
    pub question_key: String,
    pub name: String,
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ConstraintViolation>,
    #[serde(default)]
    pub missing_required: Vec<String>,
}

/// Check one raw entry against its control's constraints.
pub fn check_value(control: &ControlDescriptor, raw: &str) -> Option<ConstraintViolation> {
    if raw.is_empty() {
        if control.required {
            return Some(violation(control, "a value is required", "value_missing"));
        }
        return None;
    }

    let Some(value) = parse_scalar(control.kind, raw) else {
        return Some(violation(
            control,
            &format!("expected {}", format_hint(control.kind)),
            "type_mismatch",
        ));
    };

    let min = control
        .min
        .as_deref()
        .and_then(|bound| parse_scalar(control.kind, bound));
    let max = control
        .max
        .as_deref()
        .and_then(|bound| parse_scalar(control.kind, bound));

    if let Some(min) = min
        && value < min
    {
        return Some(violation(control, "value below minimum", "range_underflow"));
    }

    if let Some(max) = max
        && value > max
    {
        return Some(violation(control, "value above maximum", "range_overflow"));
    }

    if control.step > 0.0 {
        let steps = (value - min.unwrap_or(0.0)) / control.step;
        if (steps - steps.round()).abs() > STEP_EPSILON * steps.abs().max(1.0) {
            return Some(violation(
                control,
                "value does not match step",
                "step_mismatch",
            ));
        }
    }

    None
}

/// Check a collected record against the plan it was collected from.
pub fn validate_record(plan: &RenderPlan, responses: &ResponseRecord) -> ValidationResult {
    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for control in &plan.controls {
        let key = response_key(control.index);
        let raw = responses.get(&key).map(String::as_str).unwrap_or("");
        if raw.is_empty() && control.required {
            missing_required.push(key);
            continue;
        }
        if let Some(error) = check_value(control, raw) {
            errors.push(error);
        }
    }

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty(),
        errors,
        missing_required,
    }
}

/// Expected textual shape of a value of the given type.
pub fn format_hint(kind: InputType) -> &'static str {
    match kind {
        InputType::Number => "a number",
        InputType::Date => "a date (YYYY-MM-DD)",
        InputType::Time => "a time (HH:MM or HH:MM:SS)",
        InputType::Month => "a month (YYYY-MM)",
        InputType::Week => "a week (YYYY-Www)",
        InputType::DatetimeLocal => "a date and time (YYYY-MM-DDTHH:MM)",
    }
}

/// Map a raw value onto a number ordered like the type and measured in the
/// type's step unit: days for dates, months, weeks, seconds for times.
pub fn parse_scalar(kind: InputType, raw: &str) -> Option<f64> {
    match kind {
        InputType::Number => parse_number(raw),
        InputType::Date => parse_date(raw).map(|days| days as f64),
        InputType::Month => parse_month(raw),
        InputType::Week => parse_week(raw),
        InputType::Time => parse_time(raw),
        InputType::DatetimeLocal => parse_datetime(raw),
    }
}

fn violation(control: &ControlDescriptor, message: &str, code: &str) -> ConstraintViolation {
    ConstraintViolation {
        question_key: response_key(control.index),
        name: control.name.clone(),
        message: message.into(),
        code: code.into(),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    if !NUMBER_RE.as_ref()?.is_match(raw) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_date(raw: &str) -> Option<i64> {
    let captures = DATE_RE.as_ref()?.captures(raw)?;
    let year: i64 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let day: u32 = captures[3].parse().ok()?;
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    Some(days_from_civil(year, month, day))
}

fn parse_month(raw: &str) -> Option<f64> {
    let captures = MONTH_RE.as_ref()?.captures(raw)?;
    let year: i64 = captures[1].parse().ok()?;
    let month: i64 = captures[2].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(((year - 1970) * 12 + month - 1) as f64)
}

fn parse_week(raw: &str) -> Option<f64> {
    let captures = WEEK_RE.as_ref()?.captures(raw)?;
    let year: i64 = captures[1].parse().ok()?;
    let week: i64 = captures[2].parse().ok()?;
    if week < 1 || week > weeks_in_year(year) {
        return None;
    }
    let jan4 = days_from_civil(year, 1, 4);
    let monday = jan4 - weekday(jan4) + (week - 1) * 7;
    // 1970-W01 starts on 1969-12-29, three days before the epoch.
    Some(((monday + 3) / 7) as f64)
}

fn parse_time(raw: &str) -> Option<f64> {
    let captures = TIME_RE.as_ref()?.captures(raw)?;
    let hours: u32 = captures[1].parse().ok()?;
    let minutes: u32 = captures[2].parse().ok()?;
    let seconds: u32 = match captures.get(3) {
        Some(value) => value.as_str().parse().ok()?,
        None => 0,
    };
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    let fraction = match captures.get(4) {
        Some(value) => format!("0.{}", value.as_str()).parse::<f64>().ok()?,
        None => 0.0,
    };
    Some(f64::from(hours * 3600 + minutes * 60 + seconds) + fraction)
}

fn parse_datetime(raw: &str) -> Option<f64> {
    let captures = DATETIME_RE.as_ref()?.captures(raw)?;
    let days = parse_date(&captures[1])?;
    let seconds = parse_time(&captures[2])?;
    Some(days as f64 * 86_400.0 + seconds)
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let month = i64::from(month);
    let day = i64::from(day);
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let shifted_month = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * shifted_month + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Monday is 0.
fn weekday(days: i64) -> i64 {
    (days + 3).rem_euclid(7)
}

fn weeks_in_year(year: i64) -> i64 {
    let jan1 = weekday(days_from_civil(year, 1, 1));
    if jan1 == 3 || (is_leap_year(year) && jan1 == 2) {
        53
    } else {
        52
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ElementKind, SubmitControl};

    fn control(kind: InputType) -> ControlDescriptor {
        ControlDescriptor {
            index: 0,
            element: ElementKind::Input,
            prompt: "Prompt".into(),
            kind,
            step: 0.0,
            name: "survey-numdate-response-0".into(),
            size: 40,
            value: String::new(),
            autofocus: true,
            required: false,
            min: None,
            max: None,
        }
    }

    #[test]
    fn epoch_is_day_zero() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        assert_eq!(weekday(0), 3);
    }

    #[test]
    fn week_scalars_are_consecutive() {
        assert_eq!(parse_week("1970-W01"), Some(0.0));
        let last_2020 = parse_week("2020-W53").expect("2020 has 53 weeks");
        let first_2021 = parse_week("2021-W01").expect("week");
        assert_eq!(first_2021 - last_2020, 1.0);
        assert_eq!(parse_week("2021-W53"), None);
    }

    #[test]
    fn dates_reject_impossible_days() {
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2023-02-29").is_none());
        assert!(parse_date("2023-13-01").is_none());
        assert!(parse_date("05/01/1990").is_none());
    }

    #[test]
    fn times_accept_optional_seconds() {
        assert_eq!(parse_time("01:30"), Some(5400.0));
        assert_eq!(parse_time("01:30:15"), Some(5415.0));
        assert_eq!(parse_time("00:00:00.5"), Some(0.5));
        assert_eq!(parse_time("24:00"), None);
    }

    #[test]
    fn datetime_combines_date_and_time() {
        assert_eq!(parse_datetime("1970-01-02T00:01"), Some(86_460.0));
        assert_eq!(parse_datetime("1970-01-02 00:01"), Some(86_460.0));
        assert_eq!(parse_datetime("1970-01-02"), None);
    }

    #[test]
    fn number_bounds_and_step() {
        let mut number = control(InputType::Number);
        number.min = Some("0".into());
        number.max = Some("120".into());
        number.step = 0.5;

        assert!(check_value(&number, "34.5").is_none());
        assert_eq!(check_value(&number, "-1").map(|e| e.code), Some("range_underflow".into()));
        assert_eq!(check_value(&number, "121").map(|e| e.code), Some("range_overflow".into()));
        assert_eq!(check_value(&number, "3.25").map(|e| e.code), Some("step_mismatch".into()));
        assert_eq!(check_value(&number, "abc").map(|e| e.code), Some("type_mismatch".into()));
    }

    #[test]
    fn date_bounds_compare_chronologically() {
        let mut date = control(InputType::Date);
        date.min = Some("1900-01-01".into());
        date.max = Some("2020-12-31".into());

        assert!(check_value(&date, "1990-05-01").is_none());
        assert_eq!(
            check_value(&date, "2021-01-01").map(|e| e.code),
            Some("range_overflow".into())
        );
    }

    #[test]
    fn empty_optional_value_is_valid() {
        let number = control(InputType::Number);
        assert!(check_value(&number, "").is_none());

        let mut required = control(InputType::Number);
        required.required = true;
        assert_eq!(
            check_value(&required, "").map(|e| e.code),
            Some("value_missing".into())
        );
    }

    #[test]
    fn unparsable_bound_is_ignored() {
        let mut number = control(InputType::Number);
        number.min = Some("soon".into());
        assert!(check_value(&number, "-5").is_none());
    }

    #[test]
    fn oversized_years_are_type_mismatches() {
        let date = control(InputType::Date);
        assert_eq!(
            check_value(&date, "100000000000000000-01-01").map(|e| e.code),
            Some("type_mismatch".into())
        );
        assert!(check_value(&date, "275760-09-13").is_none());

        let mut month = control(InputType::Month);
        month.max = Some("2030-12".into());
        let plan = RenderPlan {
            preamble: None,
            controls: vec![month],
            submit: SubmitControl {
                label: "Continue".into(),
            },
        };
        let mut responses = ResponseRecord::new();
        responses.insert("Q0".into(), "9000000000000000000-01".into());
        let result = validate_record(&plan, &responses);
        assert!(!result.valid);
        assert_eq!(result.errors[0].code, "type_mismatch");

        assert_eq!(parse_week("1234567-W01"), None);
        assert_eq!(parse_datetime("1234567-01-01T00:00"), None);
    }

    #[test]
    fn patterns_compile() {
        for pattern in [&NUMBER_RE, &DATE_RE, &MONTH_RE, &WEEK_RE, &TIME_RE, &DATETIME_RE] {
            assert!(pattern.is_some());
        }
    }
}
