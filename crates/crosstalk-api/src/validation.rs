use crate::types::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty field {0}")]
    Empty(&'static str),
    #[error("too long {0}")]
    TooLong(&'static str),
    #[error("invalid field {0}")]
    Invalid(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_body_bytes: usize,
    pub max_identifier_len: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
            max_identifier_len: 128,
        }
    }
}

pub fn validate_identifier(
    value: &str,
    field: &'static str,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if value.len() > limits.max_identifier_len {
        return Err(ValidationError::TooLong(field));
    }
    Ok(())
}

pub fn validate_number(number: &str) -> Result<(), ValidationError> {
    if number.trim().is_empty() {
        return Err(ValidationError::Empty("number"));
    }
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid("number"));
    }
    Ok(())
}

pub fn validate_send_request(
    req: &SendRequest,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    validate_identifier(&req.from, "from", limits)?;
    validate_identifier(&req.to, "to", limits)?;
    if req.content_type.trim().is_empty() {
        return Err(ValidationError::Empty("content_type"));
    }
    if req.body.len() > limits.max_body_bytes {
        return Err(ValidationError::TooLong("body"));
    }
    Ok(())
}

pub fn validate_mapping_entry(entry: &MappingEntry) -> Result<(), ValidationError> {
    validate_number(&entry.number)?;
    if entry.matrix_id.trim().is_empty() {
        return Err(ValidationError::Empty("matrix_id"));
    }
    for alt in entry.alt_numbers.iter() {
        if alt.trim().is_empty() {
            return Err(ValidationError::Empty("alt_numbers"));
        }
    }
    Ok(())
}
