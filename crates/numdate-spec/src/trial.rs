//! Trial driver: normalize, render, await one submission, collect, hand off.
//!
//! The host supplies three collaborators: a [`DisplayElement`] to mount the
//! form into, a [`Clock`] for response timing, and a [`TrialHost`] that takes
//! ownership of the [`TrialResult`].

use std::cell::Cell;
use std::time::Instant;

use log::{debug, warn};
use thiserror::Error;

use crate::collect::{Submission, TrialResult, collect_responses, elapsed_ms};
use crate::normalize::{ConfigError, normalize_trial};
use crate::render::{RenderError, RenderPlan, RenderedForm, build_render_plan, render_html};
use crate::spec::trial::{NormalizedTrial, TrialConfig};

/// Monotonic millisecond timestamp source.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Clock backed by [`Instant`], measured from its construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Used for replay and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, millis: f64) {
        self.now.set(self.now.get() + millis);
    }

    pub fn set(&self, millis: f64) {
        self.now.set(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// The container a trial renders into. Mounting replaces prior content.
pub trait DisplayElement {
    fn mount(&mut self, form: &RenderedForm);
    fn clear(&mut self);
}

/// In-memory display for surfaces without a DOM. It performs no native
/// validation, so `required`/`min`/`max`/`step` are advisory there; see
/// [`crate::validate`].
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    content: Option<RenderedForm>,
    mounts: usize,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<&RenderedForm> {
        self.content.as_ref()
    }

    pub fn html(&self) -> &str {
        self.content
            .as_ref()
            .map(|form| form.html.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    pub fn mount_count(&self) -> usize {
        self.mounts
    }
}

impl DisplayElement for HeadlessDisplay {
    fn mount(&mut self, form: &RenderedForm) {
        self.content = Some(form.clone());
        self.mounts += 1;
    }

    fn clear(&mut self) {
        self.content = None;
    }
}

/// Receives the trial result. Ownership moves to the host.
pub trait TrialHost {
    fn finish_trial(&mut self, result: TrialResult);
}

impl<F> TrialHost for F
where
    F: FnMut(TrialResult),
{
    fn finish_trial(&mut self, result: TrialResult) {
        self(result)
    }
}

#[derive(Debug, Error)]
pub enum TrialError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("trial has not been rendered yet")]
    NotRendered,
    #[error("trial was already rendered")]
    AlreadyRendered,
    #[error("trial has already finished")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialState {
    Idle,
    Rendered { started_at: f64 },
    Terminal,
}

/// What happened to a submission event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The result was collected and handed to the host.
    Completed,
    /// The trial was already terminal; nothing was emitted.
    Ignored,
}

/// One survey-numdate trial instance.
#[derive(Debug)]
pub struct NumdateTrial<C: Clock> {
    trial: NormalizedTrial,
    clock: C,
    plan: Option<RenderPlan>,
    state: TrialState,
}

impl<C: Clock> NumdateTrial<C> {
    /// Normalizes the configuration; configuration errors surface here,
    /// before anything is rendered.
    pub fn new(config: &TrialConfig, clock: C) -> Result<Self, ConfigError> {
        let trial = normalize_trial(config)?;
        Ok(Self {
            trial,
            clock,
            plan: None,
            state: TrialState::Idle,
        })
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn trial(&self) -> &NormalizedTrial {
        &self.trial
    }

    pub fn plan(&self) -> Option<&RenderPlan> {
        self.plan.as_ref()
    }

    /// Mount the form and start the response clock once mounting is done.
    pub fn render<D>(&mut self, display: &mut D) -> Result<&RenderPlan, TrialError>
    where
        D: DisplayElement + ?Sized,
    {
        match self.state {
            TrialState::Idle => {}
            TrialState::Rendered { .. } => return Err(TrialError::AlreadyRendered),
            TrialState::Terminal => return Err(TrialError::Finished),
        }

        let plan = build_render_plan(&self.trial);
        let html = render_html(&plan)?;
        let form = RenderedForm { plan, html };
        display.mount(&form);

        let started_at = self.clock.now();
        self.state = TrialState::Rendered { started_at };
        debug!(
            "rendered {} question(s) at {:.3}ms",
            form.plan.controls.len(),
            started_at
        );
        Ok(self.plan.insert(form.plan))
    }

    /// Handle the form's submission event. Only the first one after render
    /// reaches the host.
    pub fn submit<D, H>(
        &mut self,
        display: &mut D,
        submission: &Submission,
        host: &mut H,
    ) -> Result<SubmitOutcome, TrialError>
    where
        D: DisplayElement + ?Sized,
        H: TrialHost + ?Sized,
    {
        let started_at = match self.state {
            TrialState::Idle => return Err(TrialError::NotRendered),
            TrialState::Terminal => {
                warn!("ignoring submission for a finished trial");
                return Ok(SubmitOutcome::Ignored);
            }
            TrialState::Rendered { started_at } => started_at,
        };
        let plan = self.plan.take().ok_or(TrialError::NotRendered)?;

        let submitted_at = self.clock.now();
        let responses = collect_responses(&plan, submission);
        let result = TrialResult::new(elapsed_ms(started_at, submitted_at), responses);

        self.state = TrialState::Terminal;
        display.clear();
        debug!(
            "trial submitted after {:.3}ms with {} response(s)",
            result.rt,
            result.responses.len()
        );
        host.finish_trial(result);
        Ok(SubmitOutcome::Completed)
    }

    /// Tear the form down without emitting a result. Later submissions are
    /// ignored.
    pub fn abort<D>(&mut self, display: &mut D)
    where
        D: DisplayElement + ?Sized,
    {
        if self.state == TrialState::Terminal {
            return;
        }
        if matches!(self.state, TrialState::Rendered { .. }) {
            display.clear();
        }
        warn!("trial aborted before submission");
        self.plan = None;
        self.state = TrialState::Terminal;
    }
}
