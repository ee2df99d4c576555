//! Membership lookups with derived permission flags.

use std::collections::HashMap;

use uuid::Uuid;

use crate::repository::{MembershipRepository, TenantRepository};
use crate::scoped::{SoftDeleted, TenantScope};
use crate::types::{Membership, Role, TenantWithPermissions};
use crate::TenancyError;

/// Read-side component answering "which tenants does this user belong to,
/// and what may they do there".
pub struct MembershipDirectory<M, T> {
    memberships: M,
    tenants: T,
}

impl<M, T> MembershipDirectory<M, T>
where
    M: MembershipRepository,
    T: TenantRepository,
{
    pub fn new(memberships: M, tenants: T) -> Self {
        Self {
            memberships,
            tenants,
        }
    }

    /// All active memberships of the user joined with their live tenants,
    /// oldest membership first, capability flags computed once per entry.
    pub async fn list_memberships(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<TenantWithPermissions>, TenancyError> {
        list_with_permissions(&self.memberships, &self.tenants, profile_id).await
    }

    /// The user's active role in the tenant, if any.
    pub async fn get_role(
        &self,
        profile_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Role>, TenancyError> {
        active_role(&self.memberships, profile_id, tenant_id).await
    }

    pub async fn is_owner_or_admin(
        &self,
        profile_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, TenancyError> {
        Ok(self
            .get_role(profile_id, tenant_id)
            .await?
            .is_some_and(Role::is_admin))
    }

    pub async fn is_owner(
        &self,
        profile_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, TenancyError> {
        Ok(self
            .get_role(profile_id, tenant_id)
            .await?
            .is_some_and(Role::is_owner))
    }

    /// Active members of the scoped tenant. Taking a [`TenantScope`] proof
    /// keeps the tenant filter mandatory at the call site.
    pub async fn list_members(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<Membership>, TenancyError> {
        self.memberships
            .list_active_for_tenant(scope.tenant_id())
            .await
    }
}

/// Single scoped lookup on the unique (profile, tenant) pair, filtered to
/// active status.
pub(crate) async fn active_role(
    memberships: &dyn MembershipRepository,
    profile_id: Uuid,
    tenant_id: Uuid,
) -> Result<Option<Role>, TenancyError> {
    Ok(memberships
        .find_by_tenant_and_user(tenant_id, profile_id)
        .await?
        .filter(Membership::is_active)
        .map(|m| m.role))
}

/// Join active memberships to their tenants, preserving the repository's
/// oldest-first ordering and dropping soft-deleted tenants.
pub(crate) async fn list_with_permissions(
    memberships: &dyn MembershipRepository,
    tenants: &dyn TenantRepository,
    profile_id: Uuid,
) -> Result<Vec<TenantWithPermissions>, TenancyError> {
    let rows = memberships.list_active_for_user(profile_id).await?;
    let ids: Vec<Uuid> = rows.iter().map(|m| m.tenant_id).collect();
    let by_id: HashMap<Uuid, _> = tenants
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    Ok(rows
        .into_iter()
        .filter_map(|membership| {
            by_id
                .get(&membership.tenant_id)
                .filter(|tenant| tenant.is_live())
                .map(|tenant| TenantWithPermissions::new(tenant.clone(), membership))
        })
        .collect())
}
