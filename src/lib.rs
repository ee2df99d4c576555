//! Tenant context resolution and authorization scoping for multi-tenant
//! applications.
//!
//! `bailiwick` is storage-agnostic: all persistence goes through the
//! repository traits in [`repository`], and the identity provider is an
//! external collaborator behind [`repository::IdentityProvider`]. The crate
//! provides:
//!
//! - [`TenantContextResolver`] — turns an opaque session handle into a
//!   [`TenantContext`] (who is signed in, which tenant they are operating
//!   in, what they may do there).
//! - [`ScopedGateway`] — a data-access handle that cannot be constructed
//!   without a resolved tenant, and whose [`scoped::TenantScope`] proof is
//!   required to query tenant-owned data.
//! - The membership lifecycle actions in [`actions`] — invitations, role
//!   changes, removal, tenant create/delete/switch — each enforcing the
//!   ownership invariants at the boundary of the mutation.
//!
//! Enable the `mocks` feature for in-memory repositories suitable for
//! testing without a database.

pub mod actions;
pub mod config;
pub mod context;
pub mod crypto;
pub mod directory;
pub mod events;
pub mod repository;
pub mod scoped;
pub mod secret;
pub mod types;
pub mod validators;

#[cfg(feature = "mocks")]
pub mod mocks;

pub use config::{BailiwickConfig, InvitationConfig};
pub use context::{
    AuthRedirect, CurrentUser, RequireError, ResolvedContext, TenantContext, TenantContextResolver,
};
pub use directory::MembershipDirectory;
pub use events::register_event_listeners;
pub use repository::{
    IdentityProvider, InvitationRepository, MembershipRepository, ProfileRepository,
    SessionHandle, Stores, TenantRepository, UnitOfWork,
};
pub use scoped::{ScopedGateway, SoftDeleted, TenantOwned, TenantScope};
pub use secret::SecretString;
pub use types::{
    Invitation, Membership, MembershipStatus, Plan, Principal, Profile, Role, Tenant,
    TenantWithPermissions,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single per-field validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Per-field validation messages for an operation input.
///
/// Validation runs before any storage access; an operation that returns
/// [`TenancyError::Validation`] has performed zero writes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

/// Errors produced by tenancy operations.
///
/// Messages are user-safe: authorization failures never reveal whether the
/// target resource exists, and storage failures carry their detail in the
/// variant (for logging) while displaying a generic retryable message.
#[derive(Debug, Clone, PartialEq)]
pub enum TenancyError {
    /// Malformed input, with per-field messages. Never reaches storage.
    Validation(FieldErrors),
    /// No authenticated principal behind the session handle.
    AuthenticationRequired,
    /// An operation required a fully resolved tenant context.
    TenantContextRequired,
    /// The caller's role does not permit the operation.
    Forbidden,
    /// Target resource absent, or outside the caller's tenant.
    NotFound,
    /// The caller has no active membership in the requested tenant.
    AccessDenied,
    /// Invitation token unknown, expired, or already used.
    InvitationNotFound,
    /// The invitation was issued for a different email address.
    EmailMismatch,
    /// Applying the change would leave the tenant without an active owner.
    SoleOwner,
    /// Deleting the tenant would leave the caller without any workspace.
    SoleWorkspace,
    DatabaseError(String),
    Internal(String),
}

impl std::error::Error for TenancyError {}

impl fmt::Display for TenancyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenancyError::Validation(_) => write!(f, "Some fields are invalid"),
            TenancyError::AuthenticationRequired => {
                write!(f, "You must be signed in to perform this action")
            }
            TenancyError::TenantContextRequired => {
                write!(f, "Must be authenticated and have a tenant")
            }
            TenancyError::Forbidden => {
                write!(f, "You don't have permission to perform this action")
            }
            TenancyError::NotFound => write!(f, "Not found"),
            TenancyError::AccessDenied => write!(f, "Access denied to this tenant"),
            TenancyError::InvitationNotFound => {
                write!(f, "This invitation does not exist or has expired")
            }
            TenancyError::EmailMismatch => {
                write!(f, "This invitation was issued for a different email address")
            }
            TenancyError::SoleOwner => {
                write!(f, "A workspace must keep at least one active owner")
            }
            TenancyError::SoleWorkspace => {
                write!(f, "You cannot delete your last workspace")
            }
            TenancyError::DatabaseError(_) | TenancyError::Internal(_) => {
                write!(f, "Something went wrong, please try again")
            }
        }
    }
}

impl From<FieldErrors> for TenancyError {
    fn from(errors: FieldErrors) -> Self {
        TenancyError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collect() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());

        errors.push("email", "Invalid email format");
        errors.push("role", "Owners cannot be invited");

        assert!(!errors.is_empty());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "role"]);
    }

    #[test]
    fn test_storage_errors_display_generic_message() {
        let err = TenancyError::DatabaseError("connection refused to 10.0.0.3".to_owned());
        let shown = err.to_string();
        assert!(!shown.contains("10.0.0.3"));
    }

    #[test]
    fn test_authorization_errors_do_not_enumerate() {
        assert_eq!(
            TenancyError::Forbidden.to_string(),
            "You don't have permission to perform this action"
        );
    }
}
