//! Scenario runner
//!
//! Executes the steps of one scenario strictly in order against a private
//! [`RequestContext`]. Assertion failures are recorded and the following
//! assertions still run; any other error skips the rest of the scenario.

use crate::config::HarnessConfig;
use crate::context::RequestContext;
use crate::error::Result;
use crate::steps::{StepAction, StepRegistry};
use crate::BUILD_INFO;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub text: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub run_id: Uuid,
    pub outcomes: Vec<StepOutcome>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status == StepStatus::Passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, StepStatus::Failed(_)))
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario {}", self.run_id)?;
        for outcome in &self.outcomes {
            match &outcome.status {
                StepStatus::Passed => writeln!(f, "  [pass] {}", outcome.text)?,
                StepStatus::Failed(message) => {
                    writeln!(f, "  [FAIL] {}: {}", outcome.text, message)?
                }
                StepStatus::Skipped => writeln!(f, "  [skip] {}", outcome.text)?,
            }
        }
        Ok(())
    }
}

/// One scenario's run state. Never shared between scenarios.
#[derive(Debug)]
pub struct ScenarioRun {
    run_id: Uuid,
    registry: Arc<StepRegistry>,
    config: HarnessConfig,
    context: RequestContext,
}

impl ScenarioRun {
    pub fn new(registry: Arc<StepRegistry>, config: HarnessConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            registry,
            config,
            context: RequestContext::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Resolve and execute one step.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub async fn step(&mut self, text: &str) -> Result<()> {
        let action = self.registry.resolve(text, &self.config)?;
        self.apply(action).await
    }

    pub async fn apply(&mut self, action: StepAction) -> Result<()> {
        match action {
            StepAction::Configure(uri) => self.context.configure(&uri),
            StepAction::Send(method) => self
                .context
                .invoke(method, self.config.timeout)
                .await
                .map(|_| ()),
            StepAction::Expect(assertion) => {
                assertion.check(self.context.response()?)?;
                Ok(())
            }
        }
    }

    /// Run every step and report each outcome individually.
    #[instrument(skip(self, steps), fields(run_id = %self.run_id))]
    pub async fn run<I, S>(&mut self, steps: I) -> ScenarioReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Running scenario with {}", BUILD_INFO);
        let mut outcomes = Vec::new();
        let mut aborted = false;

        for step in steps {
            let text = step.as_ref().to_string();
            if aborted {
                outcomes.push(StepOutcome {
                    text,
                    status: StepStatus::Skipped,
                });
                continue;
            }

            let status = match self.step(&text).await {
                Ok(()) => StepStatus::Passed,
                Err(e) if e.is_assertion() => {
                    warn!(step = %text, error = %e, "Step failed");
                    StepStatus::Failed(e.to_string())
                }
                Err(e) => {
                    error!(step = %text, error = %e, "Scenario aborted");
                    aborted = true;
                    StepStatus::Failed(e.to_string())
                }
            };
            outcomes.push(StepOutcome { text, status });
        }

        ScenarioReport {
            run_id: self.run_id,
            outcomes,
        }
    }
}
