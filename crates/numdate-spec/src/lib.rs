#![allow(missing_docs)]

pub mod collect;
pub mod feedback;
pub mod normalize;
pub mod render;
pub mod schema;
pub mod spec;
pub mod trial;
pub mod validate;

pub use collect::{
    ResponseEncoding, ResponseRecord, Submission, TrialResult, collect_responses, elapsed_ms,
    response_key,
};
pub use feedback::{Feedback, FeedbackDisplay, feedback_for, format_feedback};
pub use normalize::{ConfigError, normalize_question, normalize_trial};
pub use render::{
    ControlDescriptor, ElementKind, RenderError, RenderPlan, RenderedForm, SubmitControl,
    build_render_plan, render_form, render_html, render_json_ui, render_text,
};
pub use schema::{
    ParameterInfo, ParameterKind, PluginInfo, parameter_info, trial_config_schema,
    trial_result_schema,
};
pub use spec::{InputType, NormalizedTrial, QuestionConfig, QuestionSpec, TrialConfig};
pub use trial::{
    Clock, DisplayElement, HeadlessDisplay, ManualClock, MonotonicClock, NumdateTrial,
    SubmitOutcome, TrialError, TrialHost, TrialState,
};
pub use validate::{ConstraintViolation, ValidationResult, check_value, validate_record};
