/// Errors raised by the intake pipeline
///
/// Each variant corresponds to the stage that rejected the submission, which
/// decides how the API reports it:
///
/// | Variant       | Stage            | HTTP |
/// |---------------|------------------|------|
/// | `Validation`  | validated        | 422  |
/// | `Security`    | security-checked | 403  |
/// | `Persistence` | persisted        | 500  |
/// | `Storage`     | persisted        | 500  |

use std::fmt;

use super::IntakeStage;
use crate::integrations::storage::StorageError;
use crate::security::sanitize::UnsafeInput;
use crate::validation::FieldErrors;

/// Reason the security gate turned a submission away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityFailure {
    /// No CAPTCHA token was sent
    MissingCaptcha,

    /// The provider said the token is not valid
    InvalidCaptcha,

    /// The provider could not be asked (unreachable, misconfigured)
    CaptchaUnavailable,

    /// A text field carried script content
    UnsafeInput { field: String, kind: UnsafeInput },
}

impl SecurityFailure {
    /// Message shown to the caller
    pub fn message(&self) -> String {
        match self {
            SecurityFailure::MissingCaptcha => "CAPTCHA token is required".to_string(),
            SecurityFailure::InvalidCaptcha => "CAPTCHA verification failed".to_string(),
            SecurityFailure::CaptchaUnavailable => {
                "CAPTCHA could not be verified, please try again later".to_string()
            }
            SecurityFailure::UnsafeInput { field, kind } => {
                format!("Field '{}' contains disallowed content ({})", field, kind.describe())
            }
        }
    }
}

impl fmt::Display for SecurityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Error type for the intake pipeline
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Payload failed validation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Security gate rejected the submission
    #[error("Security check failed: {0}")]
    Security(SecurityFailure),

    /// Record could not be written
    #[error("Failed to persist submission: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Upload bytes could not be stored
    #[error("Failed to store upload: {0}")]
    Storage(#[from] StorageError),
}

impl IntakeError {
    /// Stage at which the pipeline stopped
    pub fn stage(&self) -> IntakeStage {
        match self {
            IntakeError::Validation(_) => IntakeStage::Received,
            IntakeError::Security(_) => IntakeStage::Validated,
            IntakeError::Persistence(_) | IntakeError::Storage(_) => IntakeStage::SecurityChecked,
        }
    }
}

impl From<FieldErrors> for IntakeError {
    fn from(errors: FieldErrors) -> Self {
        IntakeError::Validation(errors)
    }
}

impl From<SecurityFailure> for IntakeError {
    fn from(failure: SecurityFailure) -> Self {
        IntakeError::Security(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_messages_are_distinct() {
        let messages = [
            SecurityFailure::MissingCaptcha.message(),
            SecurityFailure::InvalidCaptcha.message(),
            SecurityFailure::CaptchaUnavailable.message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn test_unsafe_input_message_names_field() {
        let failure = SecurityFailure::UnsafeInput {
            field: "message".to_string(),
            kind: UnsafeInput::ScriptTag,
        };
        assert_eq!(
            failure.message(),
            "Field 'message' contains disallowed content (script tag)"
        );
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(
            IntakeError::from(SecurityFailure::MissingCaptcha).stage(),
            IntakeStage::Validated
        );
        assert_eq!(
            IntakeError::from(FieldErrors::new()).stage(),
            IntakeStage::Received
        );
    }
}
