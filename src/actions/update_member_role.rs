use chrono::Utc;
use uuid::Uuid;

use crate::events::{self, TenancyEvent};
use crate::repository::MembershipRepository;
use crate::scoped::ScopedGateway;
use crate::types::{Membership, Role};
use crate::TenancyError;

/// Input data for changing a member's role.
#[derive(Debug, Clone)]
pub struct UpdateMemberRoleInput {
    pub membership_id: Uuid,
    pub new_role: Role,
}

/// Action to change the role of a membership in the caller's current tenant.
///
/// Guards, in order: only owners may modify another owner; only owners may
/// promote to owner; and any change away from `Owner` is rejected when it
/// would leave the tenant without an active owner (this covers an owner
/// demoting themselves).
pub struct UpdateMemberRoleAction<M> {
    memberships: M,
}

impl<M: MembershipRepository> UpdateMemberRoleAction<M> {
    pub fn new(memberships: M) -> Self {
        Self { memberships }
    }

    /// Applies the role change.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::Forbidden`] - caller lacks the required role
    /// - [`TenancyError::NotFound`] - membership absent or outside the
    ///   caller's tenant
    /// - [`TenancyError::SoleOwner`] - change would leave zero active owners
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_member_role", skip_all, err)
    )]
    pub async fn execute(
        &self,
        gateway: &ScopedGateway,
        input: UpdateMemberRoleInput,
    ) -> Result<Membership, TenancyError> {
        gateway.require_admin()?;

        let scope = gateway.scope();
        let target = self
            .memberships
            .find_by_id(input.membership_id)
            .await?
            .filter(|m| scope.contains(m))
            .ok_or(TenancyError::NotFound)?;

        if target.role.is_owner() && !gateway.is_owner() {
            log::warn!(
                target: "bailiwick",
                "msg=\"non-owner attempted to modify an owner\", tenant_id={}, caller_id={}",
                gateway.tenant_id(),
                gateway.user_id()
            );
            return Err(TenancyError::Forbidden);
        }

        if input.new_role.is_owner() && !gateway.is_owner() {
            return Err(TenancyError::Forbidden);
        }

        // Demoting the last active owner would orphan the tenant; this also
        // catches an owner demoting themselves.
        if target.role.is_owner() && !input.new_role.is_owner() {
            let owners = self
                .memberships
                .count_active_owners(gateway.tenant_id())
                .await?;
            if owners <= 1 {
                return Err(TenancyError::SoleOwner);
            }
        }

        let updated = self
            .memberships
            .update_role(target.id, input.new_role)
            .await?;

        log::info!(
            target: "bailiwick",
            "msg=\"member role changed\", tenant_id={}, membership_id={}, role={}",
            updated.tenant_id,
            updated.id,
            updated.role.as_str()
        );
        events::dispatch(TenancyEvent::MemberRoleChanged {
            membership_id: updated.id,
            tenant_id: updated.tenant_id,
            role: updated.role,
            at: Utc::now(),
        })
        .await;

        Ok(updated)
    }
}
