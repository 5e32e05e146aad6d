pub mod api_catalog;
pub mod application_registry;
pub mod directory;
pub mod environment_registry;
pub mod resolution;
pub mod services;
pub mod version_order;

pub use api_catalog::*;
pub use application_registry::*;
pub use directory::*;
pub use environment_registry::*;
pub use resolution::*;
pub use services::*;
pub use version_order::*;

use crate::error::{ServiceError, ServiceResult};

pub(crate) fn require_non_empty(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::InvalidData(format!("{} must not be empty", field)));
    }
    Ok(())
}
