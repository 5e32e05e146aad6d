use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the registries and the resolution service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0} was not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("'{0}' is a reserved name")]
    ReservedName(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Discovery miss. Unknown application, unknown version and dangling
    /// environment links all collapse into this variant.
    #[error("Version {version} of the app {application} was not found.")]
    EnvironmentNotFound { application: String, version: String },

    #[error("{0}")]
    Storage(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Translate a store failure. Duplicate keys become `AlreadyExists` for
    /// `subject`; anything else is wrapped with the attempted action.
    pub fn from_store(action: &str, subject: impl Into<String>, err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(_) => ServiceError::AlreadyExists(subject.into()),
            StoreError::Backend(message) => {
                ServiceError::Storage(format!("Failed to {}: {}", action, message))
            }
        }
    }

    /// Wrap a store failure that cannot be a uniqueness violation.
    pub fn storage(action: &str, err: StoreError) -> Self {
        ServiceError::Storage(format!("Failed to {}: {}", action, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_becomes_already_exists() {
        let err = ServiceError::from_store(
            "create application",
            "Application 'test'",
            StoreError::DuplicateKey("applications_gamespace_name_key".to_string()),
        );
        assert_eq!(err, ServiceError::AlreadyExists("Application 'test'".to_string()));
    }

    #[test]
    fn test_backend_error_keeps_action_and_message() {
        let err = ServiceError::from_store(
            "create application",
            "Application 'test'",
            StoreError::Backend("connection reset".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to create application: connection reset"
        );
    }

    #[test]
    fn test_environment_not_found_message() {
        let err = ServiceError::EnvironmentNotFound {
            application: "test".to_string(),
            version: "2.0".to_string(),
        };
        assert_eq!(err.to_string(), "Version 2.0 of the app test was not found.");
    }
}
