pub mod email;
pub mod tenant_name;

pub use email::validate_email;
pub use tenant_name::validate_tenant_name;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    EmailEmpty,
    EmailTooLong,
    EmailInvalidFormat,
    TenantNameEmpty,
    TenantNameTooLong,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailEmpty => write!(f, "Email cannot be empty"),
            Self::EmailTooLong => write!(f, "Email is too long (max 254 characters)"),
            Self::EmailInvalidFormat => write!(f, "Invalid email format"),
            Self::TenantNameEmpty => write!(f, "Workspace name cannot be empty"),
            Self::TenantNameTooLong => {
                write!(f, "Workspace name is too long (max 255 characters)")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
