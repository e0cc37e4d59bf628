//! Field checks shared by the request types. Request types derive [`Validate`]; their
//! `validate` method runs those rules and turns raw input into a checked value or a
//! [`ValidationError`] naming the offending field. Domain operations only ever receive checked
//! values.

use crate::money::{AmountError, Cents};
use std::borrow::Cow;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<ValidationErrors> for ValidationError {
    /// Reports the first failing field in alphabetical order.
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        fields
            .into_iter()
            .find_map(|(field, errors)| errors.first().map(|error| (field, describe(error))))
            .map(|(field, message)| Self::new(field, message))
            .unwrap_or_else(|| Self::new("request", "is invalid"))
    }
}

fn describe(error: &validator::ValidationError) -> String {
    match error.message {
        Some(ref message) => message.to_string(),
        None => format!("failed the {} check", error.code),
    }
}

/// Runs the derived rules of `request`.
pub(crate) fn check<T: Validate>(request: &T) -> Result<(), ValidationError> {
    Validate::validate(request).map_err(ValidationError::from)
}

/// Custom rule for decimal amount fields.
pub(crate) fn decimal_amount(value: &str) -> Result<(), validator::ValidationError> {
    value.parse::<Cents>().map(|_| ()).map_err(amount_error)
}

fn amount_error(e: AmountError) -> validator::ValidationError {
    let mut error = validator::ValidationError::new("amount");
    error.message = Some(Cow::from(e.to_string()));
    error
}

pub(crate) fn amount(field: &'static str, value: &str) -> Result<Cents, ValidationError> {
    value
        .parse()
        .map_err(|e: AmountError| ValidationError::new(field, e.to_string()))
}
