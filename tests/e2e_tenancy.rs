//! End-to-end tests for tenant context resolution and the membership
//! lifecycle, using the mock repositories.
//!
//! Run with: `cargo test --features mocks --test e2e_tenancy`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use uuid::Uuid;

use bailiwick::actions::{
    AcceptInvitationAction, CreateTenantAction, CreateTenantInput, DeleteTenantAction,
    EnsureProfileAction, InviteMemberAction, InviteMemberInput, RemoveMemberAction,
    SwitchTenantAction, UpdateMemberRoleAction, UpdateMemberRoleInput,
};
use bailiwick::mocks::{MockIdentityProvider, MockStore};
use bailiwick::types::{BusinessProfile, Principal, Role};
use bailiwick::{
    AuthRedirect, RequireError, ScopedGateway, SessionHandle, Stores, TenancyError,
    TenantContextResolver,
};

struct Harness {
    identity: MockIdentityProvider,
    store: MockStore,
}

impl Harness {
    fn new() -> Self {
        Self {
            identity: MockIdentityProvider::new(),
            store: MockStore::new(),
        }
    }

    fn resolver(&self) -> TenantContextResolver<MockIdentityProvider, MockStore> {
        TenantContextResolver::new(self.identity.clone(), self.store.clone())
    }

    /// Signs a fresh principal in and runs the profile bootstrapper,
    /// simulating a completed registration/verification flow.
    async fn register(&self, email: &str, session: &str) -> (Principal, SessionHandle) {
        let principal = Principal {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            verified: true,
            name: None,
            avatar_url: None,
        };
        let session = SessionHandle::new(session);
        self.identity.sign_in(&session, principal.clone());

        EnsureProfileAction::new(self.store.clone())
            .execute(&principal)
            .await
            .unwrap();

        (principal, session)
    }

    async fn gateway(&self, session: &SessionHandle) -> ScopedGateway {
        let context = self.resolver().require(session).await.unwrap();
        ScopedGateway::new(&context)
    }
}

#[tokio::test]
async fn test_registration_bootstraps_default_tenant() {
    let harness = Harness::new();
    let (principal, session) = harness.register("founder@example.com", "s1").await;

    // exactly one tenant named from the email, with one owner membership
    let owned = harness
        .store
        .tenants()
        .find_live_by_owner(principal.id)
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].name, "founder@example.com");

    // context resolution returns it as the current tenant
    let context = harness.resolver().require(&session).await.unwrap();
    assert_eq!(context.current_tenant.tenant.id, owned[0].id);
    assert!(context.current_tenant.is_owner);
    assert!(context.current_tenant.can_manage_settings);
    assert_eq!(context.tenants.len(), 1);

    // and the fallback choice was persisted to the profile pointer
    let profile = harness
        .store
        .profiles()
        .find_by_id(principal.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.current_tenant_id, Some(owned[0].id));
}

#[tokio::test]
async fn test_unauthenticated_resolution() {
    let harness = Harness::new();
    let session = SessionHandle::new("nobody");

    // lenient: empty context
    let context = harness.resolver().resolve(&session).await.unwrap();
    assert!(context.user.is_none());
    assert!(context.current_tenant.is_none());
    assert!(context.tenants.is_empty());

    // strict: login redirect, not an error to catch
    let err = harness.resolver().require(&session).await.unwrap_err();
    assert_eq!(err, RequireError::Redirect(AuthRedirect::Login));
}

#[tokio::test]
async fn test_no_profile_redirects_to_setup() {
    let harness = Harness::new();

    // signed in, but ensure_profile never ran
    let principal = Principal {
        id: Uuid::new_v4(),
        email: "new@example.com".to_owned(),
        verified: true,
        name: None,
        avatar_url: None,
    };
    let session = SessionHandle::new("s1");
    harness.identity.sign_in(&session, principal);

    let err = harness.resolver().require(&session).await.unwrap_err();
    assert_eq!(err, RequireError::Redirect(AuthRedirect::ProfileSetup));
}

#[tokio::test]
async fn test_invitation_lifecycle() {
    let harness = Harness::new();
    let (_, owner_session) = harness.register("owner@example.com", "owner").await;
    let owner_gateway = harness.gateway(&owner_session).await;

    // invite
    let invite = InviteMemberAction::new(harness.store.invitations.clone());
    let output = invite
        .execute(
            &owner_gateway,
            InviteMemberInput {
                email: "teammate@example.com".to_owned(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap();

    // invitee registers (gets their own default tenant) and accepts
    let (invitee, invitee_session) = harness.register("teammate@example.com", "invitee").await;
    let accept = AcceptInvitationAction::new(harness.identity.clone(), harness.store.clone());
    let membership = accept
        .execute(&invitee_session, &output.token)
        .await
        .unwrap();
    assert_eq!(membership.tenant_id, owner_gateway.tenant_id());
    assert_eq!(membership.role, Role::Admin);

    // the invitee now sees both tenants, oldest membership first
    let context = harness.resolver().require(&invitee_session).await.unwrap();
    assert_eq!(context.tenants.len(), 2);
    assert_eq!(context.tenants[1].tenant.id, owner_gateway.tenant_id());
    assert!(context.tenants[1].is_admin);
    assert!(!context.tenants[1].is_owner);

    // current tenant is still their own default workspace
    assert_ne!(
        context.current_tenant.tenant.id,
        owner_gateway.tenant_id()
    );

    // switch over to the invited tenant
    let switch = SwitchTenantAction::new(
        harness.store.memberships.clone(),
        harness.store.profiles.clone(),
    );
    switch
        .execute(invitee.id, owner_gateway.tenant_id())
        .await
        .unwrap();

    let context = harness.resolver().require(&invitee_session).await.unwrap();
    assert_eq!(context.current_tenant.tenant.id, owner_gateway.tenant_id());
}

#[tokio::test]
async fn test_concurrent_accept_of_same_token() {
    let harness = Harness::new();
    let (_, owner_session) = harness.register("owner@example.com", "owner").await;
    let owner_gateway = harness.gateway(&owner_session).await;

    let invite = InviteMemberAction::new(harness.store.invitations.clone());
    let output = invite
        .execute(
            &owner_gateway,
            InviteMemberInput {
                email: "teammate@example.com".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap();

    let (invitee, invitee_session) = harness.register("teammate@example.com", "invitee").await;

    let accept_a = AcceptInvitationAction::new(harness.identity.clone(), harness.store.clone());
    let accept_b = AcceptInvitationAction::new(harness.identity.clone(), harness.store.clone());

    let (first, second) = tokio::join!(
        accept_a.execute(&invitee_session, &output.token),
        accept_b.execute(&invitee_session, &output.token),
    );

    // exactly one accept wins; the loser sees the spent token as gone
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == TenancyError::InvitationNotFound));

    // exactly one active membership row in the inviting tenant
    let members = harness
        .store
        .memberships()
        .list_active_for_tenant(owner_gateway.tenant_id())
        .await
        .unwrap();
    let invitee_rows: Vec<_> = members.iter().filter(|m| m.user_id == invitee.id).collect();
    assert_eq!(invitee_rows.len(), 1);

    // and the invitation's accepted timestamp is set
    assert!(harness
        .store
        .invitations()
        .list_pending_for_tenant(owner_gateway.tenant_id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_admin_cannot_touch_owner() {
    let harness = Harness::new();
    let (owner, owner_session) = harness.register("owner@example.com", "owner").await;
    let owner_gateway = harness.gateway(&owner_session).await;

    // bring in an admin
    let invite = InviteMemberAction::new(harness.store.invitations.clone());
    let output = invite
        .execute(
            &owner_gateway,
            InviteMemberInput {
                email: "admin@example.com".to_owned(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap();
    let (admin, admin_session) = harness.register("admin@example.com", "admin").await;
    AcceptInvitationAction::new(harness.identity.clone(), harness.store.clone())
        .execute(&admin_session, &output.token)
        .await
        .unwrap();
    SwitchTenantAction::new(
        harness.store.memberships.clone(),
        harness.store.profiles.clone(),
    )
    .execute(admin.id, owner_gateway.tenant_id())
    .await
    .unwrap();
    let admin_gateway = harness.gateway(&admin_session).await;
    assert_eq!(admin_gateway.role(), Role::Admin);

    let owner_membership = harness
        .store
        .memberships()
        .find_by_tenant_and_user(owner_gateway.tenant_id(), owner.id)
        .await
        .unwrap()
        .unwrap();

    // demoting the owner is rejected, role unchanged
    let update = UpdateMemberRoleAction::new(harness.store.memberships.clone());
    let err = update
        .execute(
            &admin_gateway,
            UpdateMemberRoleInput {
                membership_id: owner_membership.id,
                new_role: Role::Member,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, TenancyError::Forbidden);

    let unchanged = harness
        .store
        .memberships()
        .find_by_id(owner_membership.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.role, Role::Owner);

    // removing the owner is rejected too
    let remove = RemoveMemberAction::new(harness.store.memberships.clone());
    let err = remove
        .execute(&admin_gateway, owner_membership.id)
        .await
        .unwrap_err();
    assert_eq!(err, TenancyError::Forbidden);
}

#[tokio::test]
async fn test_sole_owner_removal_flow() {
    let harness = Harness::new();
    let (owner, owner_session) = harness.register("owner@example.com", "owner").await;
    let owner_gateway = harness.gateway(&owner_session).await;

    let own_membership = harness
        .store
        .memberships()
        .find_by_tenant_and_user(owner_gateway.tenant_id(), owner.id)
        .await
        .unwrap()
        .unwrap();

    let remove = RemoveMemberAction::new(harness.store.memberships.clone());

    // alone: self-removal rejected
    let err = remove
        .execute(&owner_gateway, own_membership.id)
        .await
        .unwrap_err();
    assert_eq!(err, TenancyError::SoleOwner);

    // add a second owner: invite as admin, then promote
    let invite = InviteMemberAction::new(harness.store.invitations.clone());
    let output = invite
        .execute(
            &owner_gateway,
            InviteMemberInput {
                email: "cofounder@example.com".to_owned(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap();
    let (_, cofounder_session) = harness.register("cofounder@example.com", "cofounder").await;
    let cofounder_membership =
        AcceptInvitationAction::new(harness.identity.clone(), harness.store.clone())
            .execute(&cofounder_session, &output.token)
            .await
            .unwrap();

    let update = UpdateMemberRoleAction::new(harness.store.memberships.clone());
    update
        .execute(
            &owner_gateway,
            UpdateMemberRoleInput {
                membership_id: cofounder_membership.id,
                new_role: Role::Owner,
            },
        )
        .await
        .unwrap();

    // with a second owner the same call succeeds
    let removed = remove
        .execute(&owner_gateway, own_membership.id)
        .await
        .unwrap();
    assert_eq!(removed.id, own_membership.id);

    // the invariant held throughout: still at least one active owner
    let owners = harness
        .store
        .memberships()
        .count_active_owners(owner_gateway.tenant_id())
        .await
        .unwrap();
    assert!(owners >= 1);
}

#[tokio::test]
async fn test_delete_tenant_flow() {
    let harness = Harness::new();
    let (owner, owner_session) = harness.register("owner@example.com", "owner").await;
    let default_tenant = harness.gateway(&owner_session).await.tenant_id();

    let delete = DeleteTenantAction::new(harness.store.clone());

    // only workspace: rejected
    let err = delete.execute(owner.id, default_tenant).await.unwrap_err();
    assert_eq!(err, TenancyError::SoleWorkspace);

    // create a second workspace; creation repoints the current tenant
    let second = CreateTenantAction::new(harness.store.clone())
        .execute(
            owner.id,
            CreateTenantInput {
                name: "Second".to_owned(),
                business: BusinessProfile::default(),
            },
        )
        .await
        .unwrap();
    let context = harness.resolver().require(&owner_session).await.unwrap();
    assert_eq!(context.current_tenant.tenant.id, second.id);
    assert_eq!(context.tenants.len(), 2);

    // deleting the current workspace repoints back to the remaining one
    delete.execute(owner.id, second.id).await.unwrap();

    let context = harness.resolver().require(&owner_session).await.unwrap();
    assert_eq!(context.current_tenant.tenant.id, default_tenant);
    assert_eq!(context.tenants.len(), 1);

    // the deleted workspace is soft-deleted, not gone
    let deleted = harness
        .store
        .tenants()
        .find_by_id(second.id)
        .await
        .unwrap()
        .unwrap();
    assert!(deleted.deleted_at.is_some());
}

#[tokio::test]
async fn test_stale_pointer_falls_back_to_oldest() {
    let harness = Harness::new();
    let (user, session) = harness.register("user@example.com", "s1").await;
    let default_tenant = harness.gateway(&session).await.tenant_id();

    // second workspace becomes current
    let second = CreateTenantAction::new(harness.store.clone())
        .execute(
            user.id,
            CreateTenantInput {
                name: "Second".to_owned(),
                business: BusinessProfile::default(),
            },
        )
        .await
        .unwrap();

    // the pointer goes stale: membership in the second workspace is removed
    // behind the user's back
    let membership = harness
        .store
        .memberships()
        .find_by_tenant_and_user(second.id, user.id)
        .await
        .unwrap()
        .unwrap();
    harness
        .store
        .memberships()
        .update_status(membership.id, bailiwick::MembershipStatus::Removed)
        .await
        .unwrap();

    // resolution falls back to the oldest membership and persists the choice
    let context = harness.resolver().require(&session).await.unwrap();
    assert_eq!(context.current_tenant.tenant.id, default_tenant);

    let profile = harness
        .store
        .profiles()
        .find_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.current_tenant_id, Some(default_tenant));
}

#[tokio::test]
async fn test_reinvite_after_removal_restores_membership() {
    let harness = Harness::new();
    let (_, owner_session) = harness.register("owner@example.com", "owner").await;
    let owner_gateway = harness.gateway(&owner_session).await;

    // invite, accept, remove
    let invite = InviteMemberAction::new(harness.store.invitations.clone());
    let output = invite
        .execute(
            &owner_gateway,
            InviteMemberInput {
                email: "teammate@example.com".to_owned(),
                role: Role::Member,
            },
        )
        .await
        .unwrap();
    let (_, invitee_session) = harness.register("teammate@example.com", "invitee").await;
    let accept = AcceptInvitationAction::new(harness.identity.clone(), harness.store.clone());
    let membership = accept
        .execute(&invitee_session, &output.token)
        .await
        .unwrap();

    RemoveMemberAction::new(harness.store.memberships.clone())
        .execute(&owner_gateway, membership.id)
        .await
        .unwrap();

    // re-invite the same address: the unique invitation row is reissued and
    // acceptance reinstates the unique membership row
    let output = invite
        .execute(
            &owner_gateway,
            InviteMemberInput {
                email: "teammate@example.com".to_owned(),
                role: Role::BillingAdmin,
            },
        )
        .await
        .unwrap();
    let restored = accept
        .execute(&invitee_session, &output.token)
        .await
        .unwrap();

    assert_eq!(restored.id, membership.id);
    assert_eq!(restored.role, Role::BillingAdmin);
    assert!(restored.is_active());
}
