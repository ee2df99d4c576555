use chrono::Utc;
use uuid::Uuid;

use crate::config::BailiwickConfig;
use crate::events::{self, TenancyEvent};
use crate::repository::{CreateMembership, CreateTenant, UnitOfWork};
use crate::types::{BusinessProfile, MembershipStatus, Role, Tenant};
use crate::validators::validate_tenant_name;
use crate::{FieldErrors, TenancyError};

/// Input data for creating a workspace.
#[derive(Debug, Clone, Default)]
pub struct CreateTenantInput {
    pub name: String,
    pub business: BusinessProfile,
}

/// Action to create a tenant for an authenticated user.
///
/// Works from the no-tenant state: the caller only needs a profile, not an
/// existing tenant. Creates the tenant, the caller's Owner/Active membership
/// and repoints their current-tenant pointer in one transaction.
pub struct CreateTenantAction<S> {
    store: S,
    config: BailiwickConfig,
}

impl<S: UnitOfWork> CreateTenantAction<S> {
    /// Creates a new `CreateTenantAction` with default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: BailiwickConfig::default(),
        }
    }

    /// Creates a new `CreateTenantAction` with custom configuration.
    pub fn with_config(store: S, config: BailiwickConfig) -> Self {
        Self { store, config }
    }

    /// Creates the tenant and makes `profile_id` its owner.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::Validation`] for an empty or oversized name
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "create_tenant", skip_all, err)
    )]
    pub async fn execute(
        &self,
        profile_id: Uuid,
        input: CreateTenantInput,
    ) -> Result<Tenant, TenancyError> {
        if let Err(err) = validate_tenant_name(&input.name) {
            return Err(TenancyError::Validation(FieldErrors::single(
                "name",
                err.to_string(),
            )));
        }

        let plan = self.config.default_plan;
        let tenant = self
            .store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    let tenant = tx
                        .tenants()
                        .create(CreateTenant {
                            name: input.name.trim().to_owned(),
                            owner_id: profile_id,
                            plan,
                            business: input.business,
                        })
                        .await?;

                    tx.memberships()
                        .create(CreateMembership {
                            tenant_id: tenant.id,
                            user_id: profile_id,
                            role: Role::Owner,
                            status: MembershipStatus::Active,
                        })
                        .await?;

                    tx.profiles()
                        .set_current_tenant(profile_id, Some(tenant.id))
                        .await?;

                    Ok(tenant)
                })
            })
            .await?;

        log::info!(
            target: "bailiwick",
            "msg=\"tenant created\", tenant_id={}, owner_id={}",
            tenant.id,
            tenant.owner_id
        );
        events::dispatch(TenancyEvent::TenantCreated {
            tenant_id: tenant.id,
            owner_id: tenant.owner_id,
            at: Utc::now(),
        })
        .await;

        Ok(tenant)
    }
}
