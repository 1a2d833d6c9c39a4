//! Step registry
//!
//! An explicit table from step text to handler, built once at startup.
//! Patterns are cucumber expressions (`{int}`, `{float}`, `{word}`,
//! `{string}`) compiled into anchored regular expressions. Handlers are plain
//! functions that turn the captured arguments into a [`StepAction`]; running
//! the action is left to [`crate::ScenarioRun`].

use crate::assertion::Assertion;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::method::HttpMethod;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// What a resolved step asks the scenario to do
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Configure(String),
    Send(HttpMethod),
    Expect(Assertion),
}

/// Arguments captured from one step's text, in pattern order
#[derive(Debug, Clone)]
pub struct StepArgs<'a> {
    text: &'a str,
    values: Vec<String>,
}

impl<'a> StepArgs<'a> {
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn string(&self, index: usize) -> Result<&str> {
        self.values
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.invalid(format!("missing argument {index}")))
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        let raw = self.string(index)?;
        raw.parse()
            .map_err(|e| self.invalid(format!("'{raw}' is not an integer: {e}")))
    }

    /// Integer argument as JSON, widening to `u64` past `i64::MAX`.
    pub fn json_int(&self, index: usize) -> Result<Value> {
        let raw = self.string(index)?;
        raw.parse::<i64>()
            .map(Value::from)
            .or_else(|_| raw.parse::<u64>().map(Value::from))
            .map_err(|e| self.invalid(format!("'{raw}' is not an integer: {e}")))
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        let raw = self.string(index)?;
        raw.parse()
            .map_err(|e| self.invalid(format!("'{raw}' is not a number: {e}")))
    }

    pub fn status(&self, index: usize) -> Result<u16> {
        let raw = self.int(index)?;
        u16::try_from(raw)
            .ok()
            .filter(|code| (100..=999).contains(code))
            .ok_or_else(|| self.invalid(format!("{raw} is not an HTTP status code")))
    }

    fn invalid(&self, reason: String) -> HarnessError {
        HarnessError::InvalidStepArgument {
            text: self.text.to_string(),
            reason,
        }
    }
}

pub type StepHandler = fn(&StepArgs<'_>, &HarnessConfig) -> Result<StepAction>;

struct StepDefinition {
    expression: String,
    pattern: Regex,
    handler: StepHandler,
}

#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("definitions", &self.expressions().collect::<Vec<_>>())
            .finish()
    }
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in English phrases and the Portuguese
    /// phrases of the users smoke test.
    pub fn with_default_steps() -> Result<Self> {
        let mut registry = Self::new();

        registry.register("I configure the GET users endpoint", configure_users_endpoint)?;
        registry.register("I configure the endpoint {string}", configure_endpoint)?;
        registry.register("I send an HTTP {word} request", send_request)?;
        registry.register("I receive HTTP status {int}", expect_status)?;
        registry.register("I receive the user with id {int}", expect_user_id)?;
        registry.register(
            "I receive the field {string} with value {int}",
            expect_field_int,
        )?;
        registry.register(
            "I receive the field {string} with value {float}",
            expect_field_float,
        )?;
        registry.register(
            "I receive the field {string} with text {string}",
            expect_field_text,
        )?;

        registry.register(
            "Eu configuro o endpoint do serviço de GET users",
            configure_users_endpoint,
        )?;
        registry.register("Eu envio uma requisição HTTP GET", send_get)?;
        registry.register("Eu recebo o código de resposta HTTP {int}", expect_status)?;
        registry.register("Eu recebo o usuário com id {int}", expect_user_id)?;

        Ok(registry)
    }

    pub fn register(&mut self, expression: &str, handler: StepHandler) -> Result<()> {
        if self.definitions.iter().any(|d| d.expression == expression) {
            return Err(HarnessError::InvalidStepPattern {
                expression: expression.to_string(),
                reason: "already registered".to_string(),
            });
        }
        let pattern = compile_expression(expression)?;
        self.definitions.push(StepDefinition {
            expression: expression.to_string(),
            pattern,
            handler,
        });
        Ok(())
    }

    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.expression.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Bind `text` to exactly one definition and run its handler.
    pub fn resolve(&self, text: &str, config: &HarnessConfig) -> Result<StepAction> {
        let text = text.trim();
        let mut matches = self
            .definitions
            .iter()
            .filter_map(|definition| {
                definition
                    .pattern
                    .captures(text)
                    .map(|captures| (definition, captures))
            })
            .collect::<Vec<_>>();

        if matches.len() > 1 {
            return Err(HarnessError::AmbiguousStep {
                text: text.to_string(),
                candidates: matches
                    .iter()
                    .map(|(definition, _)| definition.expression.clone())
                    .collect(),
            });
        }
        let (definition, captures) = matches.pop().ok_or_else(|| HarnessError::UnknownStep {
            text: text.to_string(),
        })?;

        let args = StepArgs {
            text,
            values: captures
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        };
        debug!(step = text, expression = %definition.expression, "Step resolved");
        (definition.handler)(&args, config)
    }
}

fn compile_expression(expression: &str) -> Result<Regex> {
    let invalid = |reason: String| HarnessError::InvalidStepPattern {
        expression: expression.to_string(),
        reason,
    };

    let mut pattern = String::from("^");
    let mut rest = expression;
    while let Some(open) = rest.find('{') {
        let (literal, tail) = rest.split_at(open);
        pattern.push_str(&regex::escape(literal));
        let close = tail
            .find('}')
            .ok_or_else(|| invalid("unterminated '{'".to_string()))?;
        let group = match &tail[1..close] {
            "int" => r"(-?\d+)",
            "float" => r"(-?\d+\.\d+)",
            "word" => r"(\S+)",
            "string" => r#""([^"]*)""#,
            other => return Err(invalid(format!("unknown parameter type {{{other}}}"))),
        };
        pattern.push_str(group);
        rest = &tail[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| invalid(e.to_string()))
}

fn configure_users_endpoint(_args: &StepArgs<'_>, config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Configure(config.users_endpoint()))
}

fn configure_endpoint(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Configure(args.string(0)?.to_string()))
}

fn send_request(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    let method = args
        .string(0)?
        .parse::<HttpMethod>()
        .map_err(|_| HarnessError::InvalidStepArgument {
            text: args.text().to_string(),
            reason: "unsupported HTTP method".to_string(),
        })?;
    Ok(StepAction::Send(method))
}

fn send_get(_args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Send(HttpMethod::Get))
}

fn expect_status(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Expect(Assertion::status_code_equals(
        args.status(0)?,
    )))
}

fn expect_user_id(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Expect(Assertion::json_field_equals(
        "id",
        args.json_int(0)?,
    )?))
}

fn expect_field_int(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Expect(Assertion::json_field_equals(
        args.string(0)?,
        args.json_int(1)?,
    )?))
}

fn expect_field_float(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Expect(Assertion::json_field_equals(
        args.string(0)?,
        args.float(1)?,
    )?))
}

fn expect_field_text(args: &StepArgs<'_>, _config: &HarnessConfig) -> Result<StepAction> {
    Ok(StepAction::Expect(Assertion::json_field_equals(
        args.string(0)?,
        args.string(1)?,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> StepRegistry {
        StepRegistry::with_default_steps().unwrap()
    }

    #[test]
    fn users_endpoint_step_uses_the_configured_base() {
        let config = HarnessConfig::default().with_base_uri("http://127.0.0.1:4000");
        let action = registry()
            .resolve("I configure the GET users endpoint", &config)
            .unwrap();
        assert_eq!(
            action,
            StepAction::Configure("http://127.0.0.1:4000/users/1".to_string())
        );
    }

    #[test]
    fn portuguese_phrases_resolve_to_the_english_actions() {
        let registry = registry();
        let config = HarnessConfig::default();
        let pairs = [
            (
                "Eu configuro o endpoint do serviço de GET users",
                "I configure the GET users endpoint",
            ),
            ("Eu envio uma requisição HTTP GET", "I send an HTTP GET request"),
            (
                "Eu recebo o código de resposta HTTP 200",
                "I receive HTTP status 200",
            ),
            ("Eu recebo o usuário com id 1", "I receive the user with id 1"),
        ];
        for (portuguese, english) in pairs {
            assert_eq!(
                registry.resolve(portuguese, &config).unwrap(),
                registry.resolve(english, &config).unwrap(),
                "{portuguese}"
            );
        }
    }

    #[test]
    fn parameters_are_typed() {
        let registry = registry();
        let config = HarnessConfig::default();

        assert_eq!(
            registry.resolve("I send an HTTP delete request", &config).unwrap(),
            StepAction::Send(HttpMethod::Delete)
        );
        assert_eq!(
            registry
                .resolve("I receive the user with id 1", &config)
                .unwrap(),
            StepAction::Expect(Assertion::json_field_equals("id", 1).unwrap())
        );
        assert_eq!(
            registry
                .resolve(r#"I receive the field "address.geo.lat" with text "-37.3159""#, &config)
                .unwrap(),
            StepAction::Expect(
                Assertion::json_field_equals("address.geo.lat", json!("-37.3159")).unwrap()
            )
        );
        assert_eq!(
            registry
                .resolve(r#"I receive the field "score" with value 2.5"#, &config)
                .unwrap(),
            StepAction::Expect(Assertion::json_field_equals("score", 2.5).unwrap())
        );
    }

    #[test]
    fn ids_beyond_i64_are_kept_as_unsigned() {
        let registry = registry();
        let config = HarnessConfig::default();

        assert_eq!(
            registry
                .resolve("I receive the user with id 18446744073709551615", &config)
                .unwrap(),
            StepAction::Expect(Assertion::json_field_equals("id", u64::MAX).unwrap())
        );
        assert_eq!(
            registry
                .resolve(r#"I receive the field "count" with value -3"#, &config)
                .unwrap(),
            StepAction::Expect(Assertion::json_field_equals("count", -3).unwrap())
        );
        assert!(matches!(
            registry.resolve("I receive the user with id 99999999999999999999999", &config),
            Err(HarnessError::InvalidStepArgument { .. })
        ));
    }

    #[test]
    fn unknown_and_invalid_steps_are_reported() {
        let registry = registry();
        let config = HarnessConfig::default();

        assert!(matches!(
            registry.resolve("I dance", &config),
            Err(HarnessError::UnknownStep { .. })
        ));
        assert!(matches!(
            registry.resolve("I send an HTTP FETCH request", &config),
            Err(HarnessError::InvalidStepArgument { .. })
        ));
        assert!(matches!(
            registry.resolve("I receive HTTP status 70000", &config),
            Err(HarnessError::InvalidStepArgument { .. })
        ));
    }

    #[test]
    fn overlapping_patterns_are_ambiguous() {
        let mut registry = registry();
        registry
            .register("I send an HTTP GET request", send_get)
            .unwrap();
        let error = registry
            .resolve("I send an HTTP GET request", &HarnessConfig::default())
            .unwrap_err();
        assert!(matches!(error, HarnessError::AmbiguousStep { ref candidates, .. } if candidates.len() == 2));
    }

    #[test]
    fn duplicate_and_malformed_expressions_are_rejected() {
        let mut registry = registry();
        assert!(registry
            .register("I receive HTTP status {int}", expect_status)
            .is_err());
        assert!(registry.register("I wait {duration}", send_get).is_err());
        assert!(registry.register("I wait {int", send_get).is_err());
    }

    #[test]
    fn literal_text_is_escaped() {
        let mut registry = StepRegistry::new();
        registry.register("the total is (about) 3.5?", send_get).unwrap();
        let config = HarnessConfig::default();
        assert!(registry.resolve("the total is (about) 3.5?", &config).is_ok());
        assert!(registry.resolve("the total is about 3x5", &config).is_err());
    }
}
