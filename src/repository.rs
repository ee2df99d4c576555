//! Repository traits: the storage and identity collaborator contracts.
//!
//! Everything the crate persists goes through these traits. Backends only
//! need parameterized equality/conjunction lookups, conflict-aware upserts,
//! and multi-statement transactions (via [`UnitOfWork`]).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{
    BusinessProfile, Invitation, Membership, MembershipStatus, Plan, Principal, Profile, Role,
    Tenant,
};
use crate::TenancyError;

/// Opaque session handle, forwarded verbatim to the identity provider.
///
/// Typically a session cookie or bearer token; treated as sensitive and
/// redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionHandle([REDACTED])")
    }
}

impl From<&str> for SessionHandle {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The external identity provider. Credential verification, OAuth and
/// email-link flows live behind it; this crate only consumes the result.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the authenticated principal behind the session, or `None`.
    async fn current_principal(
        &self,
        session: &SessionHandle,
    ) -> Result<Option<Principal>, TenancyError>;

    async fn sign_out(&self, session: &SessionHandle) -> Result<(), TenancyError>;
}

#[derive(Debug, Clone)]
pub struct UpsertProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Result of a profile upsert: the row, and whether it was newly inserted.
#[derive(Debug, Clone)]
pub struct UpsertedProfile {
    pub profile: Profile,
    pub created: bool,
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, TenancyError>;

    /// Insert the profile, or on conflict refresh only the email confirmation
    /// timestamp. Name and avatar set by the user later are never overwritten.
    async fn upsert(&self, data: UpsertProfile) -> Result<UpsertedProfile, TenancyError>;

    /// Update the advisory current-tenant pointer. Last writer wins.
    async fn set_current_tenant(
        &self,
        profile_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> Result<(), TenancyError>;
}

#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub name: String,
    pub owner_id: Uuid,
    pub plan: Plan,
    pub business: BusinessProfile,
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, data: CreateTenant) -> Result<Tenant, TenancyError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, TenancyError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tenant>, TenancyError>;

    /// Non-deleted tenants whose `owner_id` column is the given profile.
    async fn find_live_by_owner(&self, owner_id: Uuid) -> Result<Vec<Tenant>, TenancyError>;

    /// Sets the soft-delete timestamp. The row is kept.
    async fn soft_delete(&self, id: Uuid) -> Result<Tenant, TenancyError>;
}

#[derive(Debug, Clone)]
pub struct CreateMembership {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn create(&self, data: CreateMembership) -> Result<Membership, TenancyError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Membership>, TenancyError>;

    /// The unique (tenant, profile) row, any status.
    async fn find_by_tenant_and_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, TenancyError>;

    /// Active memberships of a user, ordered by creation time ascending
    /// (oldest first; default tenant selection relies on this ordering).
    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, TenancyError>;

    /// Active memberships in a tenant.
    async fn list_active_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Membership>, TenancyError>;

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Membership, TenancyError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<Membership, TenancyError>;
    async fn update_role_and_status(
        &self,
        id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership, TenancyError>;

    async fn count_active_owners(&self, tenant_id: Uuid) -> Result<u64, TenancyError>;

    /// Transition every membership of the tenant to `Removed`. Returns the
    /// number of rows touched.
    async fn remove_all_for_tenant(&self, tenant_id: Uuid) -> Result<u64, TenancyError>;
}

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub tenant_id: Uuid,
    pub email: String,
    pub role: Role,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn create(&self, data: CreateInvitation) -> Result<Invitation, TenancyError>;

    /// The unique (tenant, email) row, accepted or not.
    async fn find_by_tenant_and_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Invitation>, TenancyError>;

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, TenancyError>;

    /// Refresh an existing invitation in place: new role, token and expiry,
    /// accepted timestamp cleared, creation timestamp reset.
    async fn reissue(
        &self,
        id: Uuid,
        role: Role,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, TenancyError>;

    async fn mark_accepted(&self, id: Uuid) -> Result<Invitation, TenancyError>;

    /// Unaccepted, unexpired invitations for a tenant.
    async fn list_pending_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Invitation>, TenancyError>;
}

/// Bundle of the four repositories, as seen inside and outside transactions.
pub trait Stores: Send + Sync {
    fn profiles(&self) -> &dyn ProfileRepository;
    fn tenants(&self) -> &dyn TenantRepository;
    fn memberships(&self) -> &dyn MembershipRepository;
    fn invitations(&self) -> &dyn InvitationRepository;
}

/// Boxed future returned by transactional closures.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TenancyError>> + Send + 'a>>;

/// A store that can execute multi-statement work atomically.
///
/// `work` receives a transactional view of the stores; every write made
/// through it is committed when the closure returns `Ok` and rolled back when
/// it returns `Err`:
///
/// ```rust,ignore
/// store
///     .run_in_transaction(|tx| {
///         Box::pin(async move {
///             let tenant = tx.tenants().create(data).await?;
///             tx.memberships().create(owner_membership(tenant.id)).await?;
///             Ok(tenant)
///         })
///     })
///     .await?;
/// ```
pub trait UnitOfWork: Stores {
    fn run_in_transaction<'a, T, F>(&'a self, work: F) -> StoreFuture<'a, T>
    where
        T: Send + 'a,
        F: for<'t> FnOnce(&'t dyn Stores) -> StoreFuture<'t, T> + Send + 'a;
}
