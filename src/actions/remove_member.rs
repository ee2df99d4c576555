use chrono::Utc;
use uuid::Uuid;

use crate::events::{self, TenancyEvent};
use crate::repository::MembershipRepository;
use crate::scoped::ScopedGateway;
use crate::types::{Membership, MembershipStatus};
use crate::TenancyError;

/// Action to remove a member from the caller's current tenant.
///
/// Removal is a soft status transition to `Removed`, never a row delete:
/// the history stays available for audit and billing. Removing an owner
/// requires an owner caller, and the sole owner cannot remove themselves.
pub struct RemoveMemberAction<M> {
    memberships: M,
}

impl<M: MembershipRepository> RemoveMemberAction<M> {
    pub fn new(memberships: M) -> Self {
        Self { memberships }
    }

    /// Transitions the membership to `Removed`.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::Forbidden`] - caller lacks the required role
    /// - [`TenancyError::NotFound`] - membership absent or outside the
    ///   caller's tenant
    /// - [`TenancyError::SoleOwner`] - the caller is the only active owner
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "remove_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        gateway: &ScopedGateway,
        membership_id: Uuid,
    ) -> Result<Membership, TenancyError> {
        gateway.require_admin()?;

        let scope = gateway.scope();
        let target = self
            .memberships
            .find_by_id(membership_id)
            .await?
            .filter(|m| scope.contains(m))
            .ok_or(TenancyError::NotFound)?;

        if target.role.is_owner() && !gateway.is_owner() {
            log::warn!(
                target: "bailiwick",
                "msg=\"non-owner attempted to remove an owner\", tenant_id={}, caller_id={}",
                gateway.tenant_id(),
                gateway.user_id()
            );
            return Err(TenancyError::Forbidden);
        }

        if target.user_id == gateway.user_id() && target.role.is_owner() {
            let owners = self
                .memberships
                .count_active_owners(gateway.tenant_id())
                .await?;
            if owners <= 1 {
                return Err(TenancyError::SoleOwner);
            }
        }

        let removed = self
            .memberships
            .update_status(target.id, MembershipStatus::Removed)
            .await?;

        log::info!(
            target: "bailiwick",
            "msg=\"member removed\", tenant_id={}, membership_id={}",
            removed.tenant_id,
            removed.id
        );
        events::dispatch(TenancyEvent::MemberRemoved {
            membership_id: removed.id,
            tenant_id: removed.tenant_id,
            at: Utc::now(),
        })
        .await;

        Ok(removed)
    }
}
