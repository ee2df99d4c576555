use chrono::Utc;

use crate::config::BailiwickConfig;
use crate::events::{self, TenancyEvent};
use crate::repository::{CreateMembership, CreateTenant, UnitOfWork, UpsertProfile};
use crate::types::{BusinessProfile, MembershipStatus, Principal, Profile, Role};
use crate::TenancyError;

/// Ensures a durable profile exists for a verified principal.
///
/// On first sight of an identity this also provisions a default tenant and
/// an owner-level membership, in the same transaction as the profile insert:
/// a crash between the inserts is never observable as committed partial
/// state, and "every user has at least one workspace" is established exactly
/// once. Re-running for a known principal only refreshes the email
/// confirmation timestamp.
pub struct EnsureProfileAction<S> {
    store: S,
    config: BailiwickConfig,
}

impl<S: UnitOfWork> EnsureProfileAction<S> {
    /// Creates a new `EnsureProfileAction` with default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: BailiwickConfig::default(),
        }
    }

    /// Creates a new `EnsureProfileAction` with custom configuration.
    pub fn with_config(store: S, config: BailiwickConfig) -> Self {
        Self { store, config }
    }

    /// Upserts the profile and, on true first-time creation, provisions the
    /// default tenant.
    ///
    /// Idempotent: calling twice for the same principal never creates a
    /// second default tenant (guarded by the "already owns a live tenant"
    /// check inside the transaction).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "ensure_profile", skip_all, err)
    )]
    pub async fn execute(&self, principal: &Principal) -> Result<Profile, TenancyError> {
        let principal = principal.clone();
        let default_plan = self.config.default_plan;

        let (profile, created, provisioned_tenant) = self
            .store
            .run_in_transaction(move |tx| {
                Box::pin(async move {
                    let upserted = tx
                        .profiles()
                        .upsert(UpsertProfile {
                            id: principal.id,
                            email: principal.email.clone(),
                            name: principal.name.clone(),
                            avatar_url: principal.avatar_url.clone(),
                        })
                        .await?;

                    let mut provisioned = None;
                    if upserted.created {
                        let owned = tx.tenants().find_live_by_owner(principal.id).await?;
                        if owned.is_empty() {
                            let tenant = tx
                                .tenants()
                                .create(CreateTenant {
                                    name: default_tenant_name(&principal),
                                    owner_id: principal.id,
                                    plan: default_plan,
                                    business: BusinessProfile::default(),
                                })
                                .await?;
                            tx.memberships()
                                .create(CreateMembership {
                                    tenant_id: tenant.id,
                                    user_id: principal.id,
                                    role: Role::Owner,
                                    status: MembershipStatus::Active,
                                })
                                .await?;
                            provisioned = Some(tenant.id);
                        }
                    }

                    Ok((upserted.profile, upserted.created, provisioned))
                })
            })
            .await?;

        if created {
            log::info!(
                target: "bailiwick",
                "msg=\"profile created\", profile_id={}, email=\"{}\"",
                profile.id,
                profile.email
            );
            events::dispatch(TenancyEvent::ProfileProvisioned {
                profile_id: profile.id,
                email: profile.email.clone(),
                at: Utc::now(),
            })
            .await;
        }

        if let Some(tenant_id) = provisioned_tenant {
            log::info!(
                target: "bailiwick",
                "msg=\"default tenant provisioned\", tenant_id={tenant_id}, profile_id={}",
                profile.id
            );
            events::dispatch(TenancyEvent::DefaultTenantProvisioned {
                tenant_id,
                profile_id: profile.id,
                at: Utc::now(),
            })
            .await;
        }

        Ok(profile)
    }
}

/// The default workspace is named after the user's display name, or their
/// email address when no name is known.
fn default_tenant_name(principal: &Principal) -> String {
    principal
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| principal.email.clone())
}

#[cfg(all(test, feature = "mocks"))]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::mocks::MockStore;
    use crate::repository::Stores;

    fn principal(email: &str, name: Option<&str>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            verified: true,
            name: name.map(str::to_owned),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_first_sight_provisions_default_tenant() {
        let store = MockStore::new();
        let action = EnsureProfileAction::new(store.clone());
        let principal = principal("founder@example.com", None);

        let profile = action.execute(&principal).await.unwrap();
        assert_eq!(profile.id, principal.id);

        let owned = store
            .tenants()
            .find_live_by_owner(principal.id)
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "founder@example.com");

        let memberships = store
            .memberships()
            .list_active_for_user(principal.id)
            .await
            .unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role, Role::Owner);
    }

    #[tokio::test]
    async fn test_default_tenant_named_from_display_name() {
        let store = MockStore::new();
        let action = EnsureProfileAction::new(store.clone());
        let principal = principal("ada@example.com", Some("Ada Lovelace"));

        action.execute(&principal).await.unwrap();

        let owned = store
            .tenants()
            .find_live_by_owner(principal.id)
            .await
            .unwrap();
        assert_eq!(owned[0].name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_idempotent_second_call() {
        let store = MockStore::new();
        let action = EnsureProfileAction::new(store.clone());
        let principal = principal("founder@example.com", None);

        let first = action.execute(&principal).await.unwrap();
        let second = action.execute(&principal).await.unwrap();

        assert_eq!(first.id, second.id);

        // exactly one profile, one tenant, one membership
        let owned = store
            .tenants()
            .find_live_by_owner(principal.id)
            .await
            .unwrap();
        assert_eq!(owned.len(), 1);

        let memberships = store
            .memberships()
            .list_active_for_user(principal.id)
            .await
            .unwrap();
        assert_eq!(memberships.len(), 1);
    }

    #[tokio::test]
    async fn test_reverification_keeps_user_edits() {
        let store = MockStore::new();
        let action = EnsureProfileAction::new(store.clone());
        let mut principal = principal("founder@example.com", Some("Old Name"));

        action.execute(&principal).await.unwrap();

        // the provider later reports a different name; the stored profile
        // keeps what the user set
        principal.name = Some("Provider Name".to_owned());
        let profile = action.execute(&principal).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Old Name"));
    }
}
