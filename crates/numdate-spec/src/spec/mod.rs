pub mod question;
pub mod trial;

pub use question::{InputType, QuestionConfig, QuestionSpec};
pub use trial::{DEFAULT_BUTTON_LABEL, NormalizedTrial, TrialConfig};
