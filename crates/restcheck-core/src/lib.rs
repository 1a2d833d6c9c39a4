//! # Restcheck Core
//!
//! Declarative HTTP request and assertion core for behaviour-driven API checks.
//!
//! A scenario configures a [`RequestContext`], sends exactly one request and
//! then evaluates [`Assertion`]s against the [`CapturedResponse`]. Step text is
//! bound to those operations through an explicit [`StepRegistry`], and
//! [`ScenarioRun`] drives the steps of one scenario in order.

pub mod assertion;
pub mod config;
pub mod context;
pub mod error;
pub mod method;
pub mod path;
pub mod scenario;
pub mod steps;

pub use assertion::{values_match, Assertion, Verdict};
pub use config::HarnessConfig;
pub use context::{CapturedResponse, RequestContext};
pub use error::{AssertionFailure, HarnessError, NetworkErrorKind, Result};
pub use method::HttpMethod;
pub use path::FieldPath;
pub use scenario::{ScenarioReport, ScenarioRun, StepOutcome, StepStatus};
pub use steps::{StepAction, StepArgs, StepHandler, StepRegistry};

/// Current Restcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information recorded in scenario logs
pub const BUILD_INFO: &str = concat!(
    "Restcheck ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Endpoints of the public placeholder API exercised by the users smoke test
pub mod endpoints {
    pub const PLACEHOLDER_BASE_URI: &str = "https://jsonplaceholder.typicode.com";
    pub const USERS_PATH: &str = "/users/1";
}
