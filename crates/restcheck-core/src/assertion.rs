//! Assertion evaluator
//!
//! Assertions are pure checks over an already captured response. `check`
//! yields the typed failure; `evaluate` flattens it into a pass flag and a
//! message for reporting.

use crate::context::CapturedResponse;
use crate::error::{AssertionFailure, Result};
use crate::path::FieldPath;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    StatusCodeEquals(u16),
    JsonFieldEquals { path: FieldPath, expected: Value },
}

/// Outcome of one assertion in reportable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Assertion {
    pub fn status_code_equals(expected: u16) -> Self {
        Assertion::StatusCodeEquals(expected)
    }

    /// Fails with `InvalidPath` when `path` is malformed.
    pub fn json_field_equals(path: &str, expected: impl Into<Value>) -> Result<Self> {
        Ok(Assertion::JsonFieldEquals {
            path: FieldPath::parse(path)?,
            expected: expected.into(),
        })
    }

    pub fn check(&self, response: &CapturedResponse) -> std::result::Result<(), AssertionFailure> {
        match self {
            Assertion::StatusCodeEquals(expected) => {
                if response.status() == *expected {
                    Ok(())
                } else {
                    Err(AssertionFailure::StatusMismatch {
                        expected: *expected,
                        actual: response.status(),
                    })
                }
            }
            Assertion::JsonFieldEquals { path, expected } => {
                let actual = path.resolve(response.body()).ok_or_else(|| {
                    AssertionFailure::FieldNotFound {
                        path: path.to_string(),
                    }
                })?;
                if values_match(expected, actual) {
                    Ok(())
                } else {
                    Err(AssertionFailure::ValueMismatch {
                        path: path.to_string(),
                        expected: expected.clone(),
                        actual: actual.clone(),
                    })
                }
            }
        }
    }

    pub fn evaluate(&self, response: &CapturedResponse) -> Verdict {
        match self.check(response) {
            Ok(()) => Verdict {
                passed: true,
                message: format!("{self}: passed"),
            },
            Err(failure) => Verdict {
                passed: false,
                message: failure.to_string(),
            },
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::StatusCodeEquals(expected) => write!(f, "status == {expected}"),
            Assertion::JsonFieldEquals { path, expected } => write!(f, "{path} == {expected}"),
        }
    }
}

/// Type-aware equality: numbers compare by value regardless of integer or
/// float representation, strings never equal numbers, containers compare
/// element-wise.
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => {
            if let (Some(e), Some(a)) = (e.as_i64(), a.as_i64()) {
                return e == a;
            }
            if let (Some(e), Some(a)) = (e.as_u64(), a.as_u64()) {
                return e == a;
            }
            match (e.as_f64(), a.as_f64()) {
                (Some(e), Some(a)) => e == a,
                _ => false,
            }
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| values_match(e, a))
        }
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e
                    .iter()
                    .all(|(key, e)| a.get(key).is_some_and(|a| values_match(e, a)))
        }
        _ => expected == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ok_user() -> CapturedResponse {
        CapturedResponse::new(200, json!({"id": 1, "name": "Leanne Graham"}))
    }

    #[test]
    fn status_code_equals_passes_on_match() {
        assert!(Assertion::status_code_equals(200).evaluate(&ok_user()).passed);
    }

    #[test]
    fn status_code_mismatch_names_both_codes() {
        let response = CapturedResponse::new(404, json!({}));
        let verdict = Assertion::status_code_equals(200).evaluate(&response);
        assert!(!verdict.passed);
        assert!(verdict.message.contains("200"));
        assert!(verdict.message.contains("404"));
    }

    #[test]
    fn json_field_equals_passes_on_matching_id() {
        let assertion = Assertion::json_field_equals("id", 1).unwrap();
        assert_eq!(assertion.check(&ok_user()), Ok(()));
    }

    #[test]
    fn json_field_mismatch_names_both_values() {
        let response = CapturedResponse::new(200, json!({"id": 2}));
        let assertion = Assertion::json_field_equals("id", 1).unwrap();

        let failure = assertion.check(&response).unwrap_err();
        assert!(matches!(failure, AssertionFailure::ValueMismatch { .. }));
        let message = assertion.evaluate(&response).message;
        assert!(message.contains('1'));
        assert!(message.contains('2'));
    }

    #[test]
    fn json_field_missing_is_field_not_found() {
        let response = CapturedResponse::new(200, json!({"name": "x"}));
        let assertion = Assertion::json_field_equals("id", 1).unwrap();
        assert_eq!(
            assertion.check(&response),
            Err(AssertionFailure::FieldNotFound {
                path: "id".to_string()
            })
        );
    }

    #[test]
    fn null_body_has_no_fields() {
        let response = CapturedResponse::from_raw(500, "oops");
        let assertion = Assertion::json_field_equals("id", 1).unwrap();
        assert!(matches!(
            assertion.check(&response),
            Err(AssertionFailure::FieldNotFound { .. })
        ));
    }

    #[test]
    fn numbers_compare_by_value_not_representation() {
        assert!(values_match(&json!(1), &json!(1.0)));
        assert!(values_match(&json!(1.0), &json!(1)));
        assert!(!values_match(&json!(1), &json!("1")));
        assert!(!values_match(&json!("1"), &json!(1)));
        assert!(!values_match(&json!(-1), &json!(u64::MAX)));
    }

    #[test]
    fn containers_compare_recursively() {
        assert!(values_match(&json!({"a": [1, 2.0]}), &json!({"a": [1.0, 2]})));
        assert!(!values_match(&json!({"a": [1]}), &json!({"a": [1], "b": 2})));
        assert!(!values_match(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn malformed_path_is_rejected_at_construction() {
        assert!(Assertion::json_field_equals("a..b", 1).is_err());
    }

    proptest! {
        #[test]
        fn status_assertion_passes_iff_codes_equal(expected in 100u16..600, actual in 100u16..600) {
            let response = CapturedResponse::new(actual, Value::Null);
            let verdict = Assertion::status_code_equals(expected).evaluate(&response);
            prop_assert_eq!(verdict.passed, expected == actual);
            if !verdict.passed {
                prop_assert!(verdict.message.contains(&expected.to_string()));
                prop_assert!(verdict.message.contains(&actual.to_string()));
            }
        }

        #[test]
        fn field_assertion_passes_iff_values_equal(
            key in "[a-z][a-z0-9_]{0,12}",
            expected in any::<i64>(),
            actual in any::<i64>(),
        ) {
            let mut body = serde_json::Map::new();
            body.insert(key.clone(), json!(actual));
            let response = CapturedResponse::new(200, Value::Object(body));
            let assertion = Assertion::json_field_equals(&key, expected).unwrap();
            prop_assert_eq!(assertion.check(&response).is_ok(), expected == actual);
        }

        #[test]
        fn integers_equal_their_float_form(value in -1_000_000i64..1_000_000) {
            prop_assert!(values_match(&json!(value), &json!(value as f64)));
            prop_assert!(!values_match(&json!(value), &json!(value.to_string())));
        }
    }
}
