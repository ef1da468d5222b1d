//! Condition evaluation against a [`PermissionContext`]
//!
//! A condition list is a logical AND. A field that does not resolve in the
//! context makes its condition false (fail closed). Malformed conditions
//! (unknown operator, `in` without a sequence) are reported as
//! [`AuthzError::InvalidCondition`] by [`ConditionEvaluator::try_evaluate`]
//! and collapse to `false` in [`ConditionEvaluator::evaluate`].

use crate::context::{ContextValue, PermissionContext};
use crate::error::{AuthzError, Result};
use crate::registry::{Condition, Operator};

/// Stateless condition evaluator
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate `conditions`; any error is a denial
    pub fn evaluate(conditions: &[Condition], context: &PermissionContext) -> bool {
        Self::try_evaluate(conditions, context).unwrap_or(false)
    }

    /// Evaluate `conditions`, surfacing malformed ones
    ///
    /// Stops at the first false or malformed condition.
    pub fn try_evaluate(conditions: &[Condition], context: &PermissionContext) -> Result<bool> {
        for condition in conditions {
            if !Self::evaluate_one(condition, context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn evaluate_one(condition: &Condition, context: &PermissionContext) -> Result<bool> {
        let expected = &condition.value;

        if let Operator::Unknown(name) = &condition.operator {
            return Err(AuthzError::InvalidCondition(format!(
                "unknown operator '{}' on field '{}'",
                name, condition.field
            )));
        }
        if condition.operator == Operator::In && expected.as_sequence().is_none() {
            return Err(AuthzError::InvalidCondition(format!(
                "operator 'in' on field '{}' requires a sequence value",
                condition.field
            )));
        }

        let Some(actual) = context.lookup(&condition.field) else {
            return Ok(false);
        };

        let result = match &condition.operator {
            Operator::Equals => actual == expected,
            Operator::Contains => match actual {
                ContextValue::Sequence(items) => items.contains(expected),
                _ => actual.coerce_string().contains(&expected.coerce_string()),
            },
            Operator::In => expected
                .as_sequence()
                .is_some_and(|items| items.contains(actual)),
            Operator::GreaterThan => compare(actual, expected, |a, b| a > b),
            Operator::LessThan => compare(actual, expected, |a, b| a < b),
            Operator::StartsWith => actual.coerce_string().starts_with(&expected.coerce_string()),
            Operator::EndsWith => actual.coerce_string().ends_with(&expected.coerce_string()),
            Operator::Unknown(_) => false,
        };

        Ok(result)
    }
}

fn compare(actual: &ContextValue, expected: &ContextValue, op: fn(f64, f64) -> bool) -> bool {
    match (actual.coerce_number(), expected.coerce_number()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}
