//! Tenant-scoped data access.
//!
//! [`ScopedGateway`] can only be built from a resolved tenant context, and it
//! is the only way to mint a [`TenantScope`]. Feature modules make their
//! tenant-owned queries take a `TenantScope`, so no code path can touch
//! tenant data without the tenant filter being present.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::context::{ResolvedContext, TenantContext};
use crate::types::{Invitation, Membership, Role, Tenant};
use crate::TenancyError;

/// An entity row owned by a tenant.
pub trait TenantOwned {
    fn tenant_id(&self) -> Uuid;
}

impl TenantOwned for Membership {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl TenantOwned for Invitation {
    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

/// An entity that is soft-deleted via a nullable timestamp.
///
/// `is_live` is the one predicate every query path uses to exclude deleted
/// rows; check it through this trait instead of inspecting timestamps inline.
pub trait SoftDeleted {
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

impl SoftDeleted for Tenant {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Proof that a query is confined to one tenant.
///
/// Only [`ScopedGateway`] can construct a `TenantScope`, so any function that
/// takes one is guaranteed to carry the mandatory tenant predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: Uuid,
}

impl TenantScope {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    /// The mandatory predicate: does the entity belong to the scoped tenant?
    pub fn contains<E: TenantOwned>(&self, entity: &E) -> bool {
        entity.tenant_id() == self.tenant_id
    }

    /// Conjoins the tenant predicate with a caller-supplied one.
    pub fn filter<'a, E, P>(&'a self, extra: P) -> impl Fn(&E) -> bool + 'a
    where
        E: TenantOwned,
        P: Fn(&E) -> bool + 'a,
    {
        move |entity| self.contains(entity) && extra(entity)
    }
}

/// Data-access handle bound to one resolved (user, tenant, role) triple.
///
/// Role guards raise a permission error rather than a redirect; they are the
/// last line of defense and run even when the UI already gated the action.
#[derive(Debug, Clone, Copy)]
pub struct ScopedGateway {
    tenant_id: Uuid,
    user_id: Uuid,
    role: Role,
}

impl ScopedGateway {
    /// Builds a gateway from a fully resolved context.
    pub fn new(context: &ResolvedContext) -> Self {
        Self {
            tenant_id: context.current_tenant.tenant.id,
            user_id: context.user.profile.id,
            role: context.current_tenant.membership.role,
        }
    }

    /// Builds a gateway from a lenient context.
    ///
    /// # Errors
    ///
    /// Returns [`TenancyError::TenantContextRequired`] unless the context
    /// carries both an authenticated user and a current tenant.
    pub fn from_context(context: &TenantContext) -> Result<Self, TenancyError> {
        match (&context.user, &context.current_tenant) {
            (Some(user), Some(current)) => Ok(Self {
                tenant_id: current.tenant.id,
                user_id: user.profile.id,
                role: current.membership.role,
            }),
            _ => Err(TenancyError::TenantContextRequired),
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Owner or admin.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_owner(&self) -> bool {
        self.role.is_owner()
    }

    /// Ensure the user has admin privileges (owner or admin).
    pub fn require_admin(&self) -> Result<(), TenancyError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(TenancyError::Forbidden)
        }
    }

    /// Ensure the user is the tenant owner.
    pub fn require_owner(&self) -> Result<(), TenancyError> {
        if self.is_owner() {
            Ok(())
        } else {
            Err(TenancyError::Forbidden)
        }
    }

    /// Mints the scoping proof for queries against tenant-owned tables.
    pub fn scope(&self) -> TenantScope {
        TenantScope {
            tenant_id: self.tenant_id,
        }
    }
}
