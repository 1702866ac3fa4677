use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::collect::{ResponseRecord, response_key};
use crate::spec::trial::NormalizedTrial;

/// How long a feedback message stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", content = "seconds", rename_all = "snake_case")]
pub enum FeedbackDisplay {
    Timed(u32),
    /// `feedback_time` of zero: the respondent dismisses it.
    UntilDismissed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Feedback {
    pub question_key: String,
    pub text: String,
    pub display: FeedbackDisplay,
}

/// Fill a feedback template: `%r` becomes the response, `%q` the prompt.
pub fn format_feedback(template: &str, prompt: &str, response: &str) -> String {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '%' {
            match chars.peek() {
                Some('r') => {
                    output.push_str(response);
                    chars.next();
                    continue;
                }
                Some('q') => {
                    output.push_str(prompt);
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        output.push(ch);
    }
    output
}

/// Feedback for every question that defines a template. Not part of the
/// submission path; hosts call this after they received the result.
pub fn feedback_for(trial: &NormalizedTrial, responses: &ResponseRecord) -> Vec<Feedback> {
    trial
        .questions
        .iter()
        .enumerate()
        .filter(|(_, question)| !question.feedback.is_empty())
        .map(|(index, question)| {
            let key = response_key(index);
            let response = responses.get(&key).map(String::as_str).unwrap_or("");
            Feedback {
                text: format_feedback(&question.feedback, &question.prompt, response),
                display: match question.feedback_time {
                    0 => FeedbackDisplay::UntilDismissed,
                    seconds => FeedbackDisplay::Timed(seconds),
                },
                question_key: key,
            }
        })
        .collect()
}
