use crate::error::{ProcurementError, Result};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_FEEDBACK_LEN: usize = 1000;

pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ProcurementError::Validation {
            field: "name",
            reason: "must not be empty".to_string(),
        });
    }
    check_max_len("name", name, MAX_NAME_LEN)
}

pub fn validate_description(description: &str) -> Result<()> {
    check_max_len("description", description, MAX_DESCRIPTION_LEN)
}

pub fn validate_feedback(feedback: &str) -> Result<()> {
    if feedback.trim().is_empty() {
        return Err(ProcurementError::Validation {
            field: "feedback",
            reason: "must not be empty".to_string(),
        });
    }
    check_max_len("feedback", feedback, MAX_FEEDBACK_LEN)
}

// Limits count characters, not bytes
fn check_max_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(ProcurementError::Validation {
            field,
            reason: format!("{} characters exceeds the limit of {}", len, max),
        });
    }
    Ok(())
}
