use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::events::{self, TenancyEvent};
use crate::repository::{Stores, UnitOfWork};
use crate::scoped::SoftDeleted;
use crate::types::Role;
use crate::{FieldErrors, TenancyError};

/// Action to soft-delete a tenant.
///
/// Owner-only, and rejected when the target is the caller's only owned live
/// workspace (every user keeps at least one). The deletion transaction
/// soft-deletes the tenant, transitions all its memberships to `Removed`,
/// and repoints the caller's current-tenant pointer when it referenced the
/// deleted tenant; the pointer is left unset when no tenant remains, which
/// the next context resolution reports as the no-tenant state.
pub struct DeleteTenantAction<S> {
    store: S,
}

impl<S: UnitOfWork> DeleteTenantAction<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Soft-deletes `tenant_id` on behalf of `profile_id`.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::Validation`] for a nil tenant id
    /// - [`TenancyError::Forbidden`] unless the caller is an active owner of
    ///   the target
    /// - [`TenancyError::SoleWorkspace`] when it is the caller's last owned
    ///   live tenant
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "delete_tenant", skip_all, err)
    )]
    pub async fn execute(&self, profile_id: Uuid, tenant_id: Uuid) -> Result<(), TenancyError> {
        if tenant_id.is_nil() {
            return Err(TenancyError::Validation(FieldErrors::single(
                "tenantId",
                "A tenant id is required",
            )));
        }

        // The target does not have to be the caller's current tenant, so the
        // ownership check is a direct scoped lookup rather than a gateway guard.
        let is_owner = crate::directory::active_role(self.store.memberships(), profile_id, tenant_id)
            .await?
            .is_some_and(Role::is_owner);
        if !is_owner {
            log::warn!(
                target: "bailiwick",
                "msg=\"tenant delete denied\", tenant_id={tenant_id}, caller_id={profile_id}"
            );
            return Err(TenancyError::Forbidden);
        }

        if self.count_owned_live(profile_id).await? <= 1 {
            return Err(TenancyError::SoleWorkspace);
        }

        self.store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    tx.tenants().soft_delete(tenant_id).await?;
                    tx.memberships().remove_all_for_tenant(tenant_id).await?;

                    let profile = tx
                        .profiles()
                        .find_by_id(profile_id)
                        .await?
                        .ok_or(TenancyError::NotFound)?;
                    if profile.current_tenant_id == Some(tenant_id) {
                        let next = next_live_tenant(tx, profile_id).await?;
                        tx.profiles().set_current_tenant(profile_id, next).await?;
                    }

                    Ok(())
                })
            })
            .await?;

        log::info!(
            target: "bailiwick",
            "msg=\"tenant deleted\", tenant_id={tenant_id}, caller_id={profile_id}"
        );
        events::dispatch(TenancyEvent::TenantDeleted {
            tenant_id,
            at: Utc::now(),
        })
        .await;

        Ok(())
    }

    /// Live tenants in which the caller holds an active owner membership.
    async fn count_owned_live(&self, profile_id: Uuid) -> Result<usize, TenancyError> {
        let memberships = self.store.memberships().list_active_for_user(profile_id).await?;
        let owned: Vec<Uuid> = memberships
            .iter()
            .filter(|m| m.role.is_owner())
            .map(|m| m.tenant_id)
            .collect();
        let live: HashSet<Uuid> = self
            .store
            .tenants()
            .find_by_ids(&owned)
            .await?
            .into_iter()
            .filter(SoftDeleted::is_live)
            .map(|t| t.id)
            .collect();
        Ok(live.len())
    }
}

/// Oldest live tenant the user still actively belongs to, if any.
async fn next_live_tenant(
    tx: &dyn Stores,
    profile_id: Uuid,
) -> Result<Option<Uuid>, TenancyError> {
    let memberships = tx.memberships().list_active_for_user(profile_id).await?;
    let ids: Vec<Uuid> = memberships.iter().map(|m| m.tenant_id).collect();
    let live: HashSet<Uuid> = tx
        .tenants()
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .filter(SoftDeleted::is_live)
        .map(|t| t.id)
        .collect();
    Ok(memberships
        .into_iter()
        .map(|m| m.tenant_id)
        .find(|id| live.contains(id)))
}
