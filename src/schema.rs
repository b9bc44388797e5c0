//! Request body validation for [`InputRecord`].
//!
//! Every field is checked and all failures are collected, so a rejected
//! request reports each offending field with the constraint it broke.

use crate::types::record::{
    Contact, Education, InputRecord, Job, Marital, Month, Poutcome, YesNo,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Location of the failure, e.g. `["body", "age"]`
    pub loc: Vec<String>,
    /// Human-readable explanation
    pub msg: String,
    /// Machine-readable failure kind
    #[serde(rename = "type")]
    pub kind: String,
    /// The rejected value, when one was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl FieldError {
    fn new(field: &str, kind: &str, msg: impl Into<String>, input: Option<&Value>) -> Self {
        let mut loc = vec!["body".to_string()];
        if !field.is_empty() {
            loc.push(field.to_string());
        }
        Self {
            loc,
            msg: msg.into(),
            kind: kind.to_string(),
            input: input.cloned(),
        }
    }

    /// Name of the offending field, if the error is attached to one.
    pub fn field(&self) -> Option<&str> {
        self.loc.get(1).map(String::as_str)
    }
}

/// All validation failures for one request body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Error for a body that is not valid JSON at all.
    pub fn json_invalid(detail: impl fmt::Display) -> Self {
        Self(vec![FieldError::new(
            "",
            "json_invalid",
            format!("JSON decode error: {}", detail),
            None,
        )])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether any error refers to `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == Some(field))
    }

    fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.loc.join("."), e.msg))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Inclusive bounds for an integer field
#[derive(Debug, Clone, Copy)]
struct IntBounds {
    min: Option<i64>,
    max: Option<i64>,
}

const AGE: IntBounds = IntBounds { min: Some(18), max: Some(120) };
const NON_NEGATIVE: IntBounds = IntBounds { min: Some(0), max: None };
const AT_LEAST_ONE: IntBounds = IntBounds { min: Some(1), max: None };

/// Field-by-field reader that records failures instead of stopping at the first.
struct Checker<'a> {
    body: &'a Map<String, Value>,
    errors: ValidationErrors,
}

impl<'a> Checker<'a> {
    fn present(&mut self, field: &str) -> Option<&'a Value> {
        match self.body.get(field) {
            Some(value) => Some(value),
            None => {
                self.errors
                    .push(FieldError::new(field, "missing", "Field required", None));
                None
            }
        }
    }

    fn int(&mut self, field: &str, bounds: IntBounds) -> Option<i64> {
        let raw = self.present(field)?;
        let value = match as_integer(raw) {
            Some(v) => v,
            None => {
                self.errors.push(FieldError::new(
                    field,
                    "int_type",
                    "Input should be a valid integer",
                    Some(raw),
                ));
                return None;
            }
        };

        if let Some(min) = bounds.min {
            if value < min {
                self.errors.push(FieldError::new(
                    field,
                    "greater_than_equal",
                    format!("Input should be greater than or equal to {}", min),
                    Some(raw),
                ));
                return None;
            }
        }
        if let Some(max) = bounds.max {
            if value > max {
                self.errors.push(FieldError::new(
                    field,
                    "less_than_equal",
                    format!("Input should be less than or equal to {}", max),
                    Some(raw),
                ));
                return None;
            }
        }
        Some(value)
    }

    fn float(&mut self, field: &str) -> Option<f64> {
        let raw = self.present(field)?;
        match raw.as_f64() {
            Some(v) => Some(v),
            None => {
                self.errors.push(FieldError::new(
                    field,
                    "float_type",
                    "Input should be a valid number",
                    Some(raw),
                ));
                None
            }
        }
    }

    fn choice<T>(
        &mut self,
        field: &str,
        variants: &[&str],
        parse: fn(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = self.present(field)?;
        let parsed = raw.as_str().and_then(parse);
        if parsed.is_none() {
            let expected: Vec<String> = variants.iter().map(|v| format!("'{}'", v)).collect();
            self.errors.push(FieldError::new(
                field,
                "literal_error",
                format!("Input should be {}", join_alternatives(&expected)),
                Some(raw),
            ));
        }
        parsed
    }
}

/// JSON integers, plus floats with no fractional part (`35.0`).
///
/// Whole numbers outside the `i64` range saturate, so they still fail the
/// field's bound check rather than the type check.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    if value.as_u64().is_some() {
        return Some(i64::MAX);
    }
    let f = value.as_f64()?;
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    // `i64::MAX as f64` rounds up to 2^63
    if f >= i64::MAX as f64 {
        Some(i64::MAX)
    } else if f < i64::MIN as f64 {
        Some(i64::MIN)
    } else {
        Some(f as i64)
    }
}

fn join_alternatives(items: &[String]) -> String {
    match items.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

impl InputRecord {
    /// Validate a JSON request body into a record.
    ///
    /// Unknown fields are ignored. Every declared field is required.
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let Some(object) = body.as_object() else {
            let mut errors = ValidationErrors::default();
            errors.push(FieldError::new(
                "",
                "model_type",
                "Input should be a valid dictionary or object to extract fields from",
                Some(body),
            ));
            return Err(errors);
        };

        let mut c = Checker {
            body: object,
            errors: ValidationErrors::default(),
        };

        let age = c.int("age", AGE);
        let balance = c.float("balance");
        let duration = c.int("duration", NON_NEGATIVE);
        let campaign = c.int("campaign", AT_LEAST_ONE);
        let previous = c.int("previous", NON_NEGATIVE);
        let job = c.choice("job", Job::VARIANTS, Job::parse);
        let marital = c.choice("marital", Marital::VARIANTS, Marital::parse);
        let education = c.choice("education", Education::VARIANTS, Education::parse);
        let default = c.choice("default", YesNo::VARIANTS, YesNo::parse);
        let housing = c.choice("housing", YesNo::VARIANTS, YesNo::parse);
        let loan = c.choice("loan", YesNo::VARIANTS, YesNo::parse);
        let contact = c.choice("contact", Contact::VARIANTS, Contact::parse);
        let month = c.choice("month", Month::VARIANTS, Month::parse);
        let poutcome = c.choice("poutcome", Poutcome::VARIANTS, Poutcome::parse);

        match (
            age, balance, duration, campaign, previous, job, marital, education, default,
            housing, loan, contact, month, poutcome,
        ) {
            (
                Some(age),
                Some(balance),
                Some(duration),
                Some(campaign),
                Some(previous),
                Some(job),
                Some(marital),
                Some(education),
                Some(default),
                Some(housing),
                Some(loan),
                Some(contact),
                Some(month),
                Some(poutcome),
            ) if c.errors.is_empty() => Ok(Self {
                age,
                balance,
                duration,
                campaign,
                previous,
                job,
                marital,
                education,
                default,
                housing,
                loan,
                contact,
                month,
                poutcome,
            }),
            _ => Err(c.errors),
        }
    }
}
