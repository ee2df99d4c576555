use chrono::Utc;
use uuid::Uuid;

use crate::directory;
use crate::events::{self, TenancyEvent};
use crate::repository::{MembershipRepository, ProfileRepository};
use crate::{FieldErrors, TenancyError};

/// Action to move a user's current-tenant pointer.
///
/// The pointer is advisory and re-validated on every context resolution, so
/// concurrent switches are last-writer-wins by design. Access is validated
/// against a live membership before the pointer is touched.
pub struct SwitchTenantAction<M, P> {
    memberships: M,
    profiles: P,
}

impl<M, P> SwitchTenantAction<M, P>
where
    M: MembershipRepository,
    P: ProfileRepository,
{
    pub fn new(memberships: M, profiles: P) -> Self {
        Self {
            memberships,
            profiles,
        }
    }

    /// Points `profile_id`'s current tenant at `tenant_id`.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::Validation`] for a nil tenant id
    /// - [`TenancyError::AccessDenied`] without an active membership in the
    ///   target tenant; the pointer is never written in that case
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "switch_tenant", skip_all, err)
    )]
    pub async fn execute(&self, profile_id: Uuid, tenant_id: Uuid) -> Result<(), TenancyError> {
        if tenant_id.is_nil() {
            return Err(TenancyError::Validation(FieldErrors::single(
                "tenantId",
                "A tenant id is required",
            )));
        }

        let role = directory::active_role(&self.memberships, profile_id, tenant_id).await?;
        if role.is_none() {
            log::warn!(
                target: "bailiwick",
                "msg=\"tenant switch denied\", tenant_id={tenant_id}, profile_id={profile_id}"
            );
            return Err(TenancyError::AccessDenied);
        }

        self.profiles
            .set_current_tenant(profile_id, Some(tenant_id))
            .await?;

        log::info!(
            target: "bailiwick",
            "msg=\"tenant switched\", tenant_id={tenant_id}, profile_id={profile_id}"
        );
        events::dispatch(TenancyEvent::TenantSwitched {
            profile_id,
            tenant_id,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }
}
