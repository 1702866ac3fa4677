use std::fmt::Write;

use log::debug;
use numdate_spec::{
    ConstraintViolation, ControlDescriptor, DisplayElement, RenderedForm, TrialResult,
    render::describe_constraints, render_json_ui, validate::format_hint,
};

use crate::RenderMode;

/// Terminal stand-in for the page container. It has no native form
/// validation; the caller runs the advisory checks itself.
pub struct TerminalDisplay {
    mode: RenderMode,
    mounted: bool,
}

impl TerminalDisplay {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            mounted: false,
        }
    }
}

impl DisplayElement for TerminalDisplay {
    fn mount(&mut self, form: &RenderedForm) {
        match self.mode {
            RenderMode::Text => {
                if let Some(preamble) = &form.plan.preamble {
                    println!("{}", preamble);
                }
            }
            RenderMode::Html => println!("{}", form.html),
            RenderMode::Json => {
                let ui = render_json_ui(&form.plan);
                match serde_json::to_string_pretty(&ui) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(err) => eprintln!("Failed to serialize render plan: {}", err),
                }
            }
        }
        debug!("mounted form with {} control(s)", form.plan.controls.len());
        self.mounted = true;
    }

    fn clear(&mut self) {
        if self.mounted {
            println!("---");
        }
        self.mounted = false;
    }
}

/// Formats prompts and results for the interactive run.
pub struct Presenter {
    total: usize,
}

impl Presenter {
    pub fn new(total: usize) -> Self {
        Self { total }
    }

    pub fn show_prompt(&self, control: &ControlDescriptor) {
        let mut line = format!(
            "{}/{} {} ({})",
            control.index + 1,
            self.total,
            control.prompt,
            format_hint(control.kind)
        );
        if control.required {
            line.push_str(" *");
        }
        if !control.value.is_empty() {
            line.push_str(&format!(" [{}]", control.value));
        }
        println!("{}", line);
        if let Some(constraints) = describe_constraints(control) {
            println!("  {}", constraints);
        }
    }

    pub fn show_violation(&self, violation: &ConstraintViolation) {
        eprintln!("Invalid answer: {}", violation.message);
        eprintln!("  Code: {}", violation.code);
    }

    pub fn show_result(&self, result: &TrialResult, pretty: &str, cbor: Option<&[u8]>) {
        println!("Done ({:.0} ms)", result.rt);
        println!("{}", pretty);
        if let Some(bytes) = cbor {
            println!("Result (CBOR hex): {}", encode_hex(bytes));
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_encoding_is_lowercase_pairs() {
        assert_eq!(encode_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }
}
