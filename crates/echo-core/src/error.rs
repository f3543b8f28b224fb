use thiserror::Error;

/// Misconfiguration caught at construction time. Runtime collaborator
/// failures are never surfaced as errors; they degrade to a logged skip.
#[derive(Debug, Error)]
pub enum EchoError {
    #[error("invalid {name}: {value} ({reason})")]
    InvalidParam {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
}

pub(crate) fn require_positive(name: &'static str, value: f32) -> Result<(), EchoError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(EchoError::InvalidParam {
            name,
            value,
            reason: "must be a positive finite number",
        })
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f32) -> Result<(), EchoError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(EchoError::InvalidParam {
            name,
            value,
            reason: "must be a non-negative finite number",
        })
    }
}
