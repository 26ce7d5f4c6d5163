//! Data Transfer Objects for API requests and responses

pub mod call;
pub mod callcenter;
pub mod common;

pub use call::*;
pub use callcenter::*;
pub use common::*;

use fsapi_core::ApiError;
use validator::{Validate, ValidationErrors};

/// Request bodies whose `validator` failures are reported one at a time
pub trait Checked: Validate {
    /// Fields in the order their failures take precedence
    const FIELDS: &'static [&'static str];

    fn check(&self) -> Result<(), ApiError> {
        self.validate()
            .map_err(|errors| ApiError::Validation(first_failure(&errors, Self::FIELDS)))
    }
}

/// Message of the first failing field, in declaration order
fn first_failure(errors: &ValidationErrors, order: &[&str]) -> String {
    let fields = errors.field_errors();

    order
        .iter()
        .find_map(|name| {
            fields.iter().find_map(|(field, errs)| {
                let field: &str = field.as_ref();
                if field != *name {
                    return None;
                }
                errs.first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
            })
        })
        .unwrap_or_else(|| errors.to_string())
}
