//! In-memory mock implementations for testing without a database.
//!
//! Enable with the `mocks` feature. [`MockStore`] bundles the four
//! repositories and implements [`UnitOfWork`] with snapshot/rollback
//! semantics: transactions run serialized behind an async lock, and a
//! closure returning `Err` restores the pre-transaction state.

#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::repository::{
    CreateInvitation, CreateMembership, CreateTenant, IdentityProvider, InvitationRepository,
    MembershipRepository, ProfileRepository, SessionHandle, StoreFuture, Stores, TenantRepository,
    UnitOfWork, UpsertProfile, UpsertedProfile,
};
use crate::types::{
    Invitation, Membership, MembershipStatus, Principal, Profile, Role, Tenant,
};
use crate::TenancyError;

fn poisoned() -> TenancyError {
    TenancyError::Internal("lock poisoned".into())
}

/// In-memory identity provider keyed by session handle.
#[derive(Clone)]
pub struct MockIdentityProvider {
    sessions: Arc<RwLock<HashMap<String, Principal>>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a principal behind a session handle (test setup helper).
    pub fn sign_in(&self, session: &SessionHandle, principal: Principal) {
        self.sessions
            .write()
            .expect("lock poisoned")
            .insert(session.as_str().to_owned(), principal);
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn current_principal(
        &self,
        session: &SessionHandle,
    ) -> Result<Option<Principal>, TenancyError> {
        let sessions = self.sessions.read().map_err(|_| poisoned())?;
        Ok(sessions.get(session.as_str()).cloned())
    }

    async fn sign_out(&self, session: &SessionHandle) -> Result<(), TenancyError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned())?;
        sessions.remove(session.as_str());
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockProfileRepository {
    rows: Arc<RwLock<HashMap<Uuid, Profile>>>,
}

impl MockProfileRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn snapshot(&self) -> HashMap<Uuid, Profile> {
        self.rows.read().expect("lock poisoned").clone()
    }

    fn restore(&self, snapshot: HashMap<Uuid, Profile>) {
        *self.rows.write().expect("lock poisoned") = snapshot;
    }
}

impl Default for MockProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn upsert(&self, data: UpsertProfile) -> Result<UpsertedProfile, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let now = Utc::now();

        if let Some(existing) = rows.get_mut(&data.id) {
            // conflict: refresh the confirmation timestamp only
            existing.email_confirmed_at = Some(now);
            return Ok(UpsertedProfile {
                profile: existing.clone(),
                created: false,
            });
        }

        let profile = Profile {
            id: data.id,
            email: data.email,
            name: data.name,
            avatar_url: data.avatar_url,
            current_tenant_id: None,
            email_confirmed_at: Some(now),
            created_at: now,
        };
        rows.insert(profile.id, profile.clone());
        Ok(UpsertedProfile {
            profile,
            created: true,
        })
    }

    async fn set_current_tenant(
        &self,
        profile_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> Result<(), TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let profile = rows.get_mut(&profile_id).ok_or(TenancyError::NotFound)?;
        profile.current_tenant_id = tenant_id;
        Ok(())
    }
}

#[derive(Clone)]
pub struct MockTenantRepository {
    rows: Arc<RwLock<HashMap<Uuid, Tenant>>>,
}

impl MockTenantRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn snapshot(&self) -> HashMap<Uuid, Tenant> {
        self.rows.read().expect("lock poisoned").clone()
    }

    fn restore(&self, snapshot: HashMap<Uuid, Tenant>) {
        *self.rows.write().expect("lock poisoned") = snapshot;
    }
}

impl Default for MockTenantRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantRepository for MockTenantRepository {
    async fn create(&self, data: CreateTenant) -> Result<Tenant, TenancyError> {
        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: data.name,
            owner_id: data.owner_id,
            plan: data.plan,
            business: data.business,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tenant>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn find_live_by_owner(&self, owner_id: Uuid) -> Result<Vec<Tenant>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|t| t.owner_id == owner_id && t.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<Tenant, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let tenant = rows.get_mut(&id).ok_or(TenancyError::NotFound)?;
        let now = Utc::now();
        tenant.deleted_at = Some(now);
        tenant.updated_at = now;
        Ok(tenant.clone())
    }
}

#[derive(Clone)]
pub struct MockMembershipRepository {
    rows: Arc<RwLock<HashMap<Uuid, Membership>>>,
}

impl MockMembershipRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn snapshot(&self) -> HashMap<Uuid, Membership> {
        self.rows.read().expect("lock poisoned").clone()
    }

    fn restore(&self, snapshot: HashMap<Uuid, Membership>) {
        *self.rows.write().expect("lock poisoned") = snapshot;
    }
}

impl Default for MockMembershipRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipRepository for MockMembershipRepository {
    async fn create(&self, data: CreateMembership) -> Result<Membership, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        // the (tenant, profile) pair is unique, like the real schema
        if rows
            .values()
            .any(|m| m.tenant_id == data.tenant_id && m.user_id == data.user_id)
        {
            return Err(TenancyError::DatabaseError(
                "unique constraint violation: memberships (tenant_id, user_id)".into(),
            ));
        }

        let now = Utc::now();
        let membership = Membership {
            id: Uuid::new_v4(),
            tenant_id: data.tenant_id,
            user_id: data.user_id,
            role: data.role,
            status: data.status,
            created_at: now,
            updated_at: now,
        };
        rows.insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Membership>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn find_by_tenant_and_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .find(|m| m.tenant_id == tenant_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut memberships: Vec<Membership> = rows
            .values()
            .filter(|m| m.user_id == user_id && m.status == MembershipStatus::Active)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| (m.created_at, m.id));
        Ok(memberships)
    }

    async fn list_active_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Membership>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut memberships: Vec<Membership> = rows
            .values()
            .filter(|m| m.tenant_id == tenant_id && m.status == MembershipStatus::Active)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| (m.created_at, m.id));
        Ok(memberships)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Membership, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let membership = rows.get_mut(&id).ok_or(TenancyError::NotFound)?;
        membership.role = role;
        membership.updated_at = Utc::now();
        Ok(membership.clone())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<Membership, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let membership = rows.get_mut(&id).ok_or(TenancyError::NotFound)?;
        membership.status = status;
        membership.updated_at = Utc::now();
        Ok(membership.clone())
    }

    async fn update_role_and_status(
        &self,
        id: Uuid,
        role: Role,
        status: MembershipStatus,
    ) -> Result<Membership, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let membership = rows.get_mut(&id).ok_or(TenancyError::NotFound)?;
        membership.role = role;
        membership.status = status;
        membership.updated_at = Utc::now();
        Ok(membership.clone())
    }

    async fn count_active_owners(&self, tenant_id: Uuid) -> Result<u64, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let count = rows
            .values()
            .filter(|m| {
                m.tenant_id == tenant_id
                    && m.status == MembershipStatus::Active
                    && m.role == Role::Owner
            })
            .count();
        Ok(count as u64)
    }

    async fn remove_all_for_tenant(&self, tenant_id: Uuid) -> Result<u64, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let now = Utc::now();
        let mut touched = 0;
        for membership in rows.values_mut() {
            if membership.tenant_id == tenant_id && membership.status != MembershipStatus::Removed {
                membership.status = MembershipStatus::Removed;
                membership.updated_at = now;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[derive(Clone)]
pub struct MockInvitationRepository {
    rows: Arc<RwLock<HashMap<Uuid, Invitation>>>,
}

impl MockInvitationRepository {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn snapshot(&self) -> HashMap<Uuid, Invitation> {
        self.rows.read().expect("lock poisoned").clone()
    }

    fn restore(&self, snapshot: HashMap<Uuid, Invitation>) {
        *self.rows.write().expect("lock poisoned") = snapshot;
    }
}

impl Default for MockInvitationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvitationRepository for MockInvitationRepository {
    async fn create(&self, data: CreateInvitation) -> Result<Invitation, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        if rows
            .values()
            .any(|i| i.tenant_id == data.tenant_id && i.email == data.email)
        {
            return Err(TenancyError::DatabaseError(
                "unique constraint violation: invitations (tenant_id, email)".into(),
            ));
        }

        let invitation = Invitation {
            id: Uuid::new_v4(),
            tenant_id: data.tenant_id,
            email: data.email,
            role: data.role,
            token_hash: data.token_hash,
            expires_at: data.expires_at,
            created_at: Utc::now(),
            accepted_at: None,
        };
        rows.insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn find_by_tenant_and_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Invitation>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .find(|i| i.tenant_id == tenant_id && i.email == email)
            .cloned())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().find(|i| i.token_hash == token_hash).cloned())
    }

    async fn reissue(
        &self,
        id: Uuid,
        role: Role,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let invitation = rows.get_mut(&id).ok_or(TenancyError::NotFound)?;
        invitation.role = role;
        token_hash.clone_into(&mut invitation.token_hash);
        invitation.expires_at = expires_at;
        invitation.created_at = Utc::now();
        invitation.accepted_at = None;
        Ok(invitation.clone())
    }

    async fn mark_accepted(&self, id: Uuid) -> Result<Invitation, TenancyError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let invitation = rows.get_mut(&id).ok_or(TenancyError::NotFound)?;
        invitation.accepted_at = Some(Utc::now());
        Ok(invitation.clone())
    }

    async fn list_pending_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<Invitation>, TenancyError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let now = Utc::now();
        Ok(rows
            .values()
            .filter(|i| i.tenant_id == tenant_id && i.accepted_at.is_none() && i.expires_at > now)
            .cloned()
            .collect())
    }
}

/// Bundle of all mock repositories, usable wherever [`Stores`] or
/// [`UnitOfWork`] is expected. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MockStore {
    pub profiles: MockProfileRepository,
    pub tenants: MockTenantRepository,
    pub memberships: MockMembershipRepository,
    pub invitations: MockInvitationRepository,
    tx_gate: Arc<tokio::sync::Mutex<()>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            profiles: MockProfileRepository::new(),
            tenants: MockTenantRepository::new(),
            memberships: MockMembershipRepository::new(),
            invitations: MockInvitationRepository::new(),
            tx_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Stores for MockStore {
    fn profiles(&self) -> &dyn ProfileRepository {
        &self.profiles
    }

    fn tenants(&self) -> &dyn TenantRepository {
        &self.tenants
    }

    fn memberships(&self) -> &dyn MembershipRepository {
        &self.memberships
    }

    fn invitations(&self) -> &dyn InvitationRepository {
        &self.invitations
    }
}

impl UnitOfWork for MockStore {
    fn run_in_transaction<'a, T, F>(&'a self, work: F) -> StoreFuture<'a, T>
    where
        T: Send + 'a,
        F: for<'t> FnOnce(&'t dyn Stores) -> StoreFuture<'t, T> + Send + 'a,
    {
        Box::pin(async move {
            // serialize transactions; snapshot everything, roll back on Err
            let _gate = self.tx_gate.lock().await;
            let snapshot = (
                self.profiles.snapshot(),
                self.tenants.snapshot(),
                self.memberships.snapshot(),
                self.invitations.snapshot(),
            );

            match work(self).await {
                Ok(value) => Ok(value),
                Err(err) => {
                    self.profiles.restore(snapshot.0);
                    self.tenants.restore(snapshot.1);
                    self.memberships.restore(snapshot.2);
                    self.invitations.restore(snapshot.3);
                    Err(err)
                }
            }
        })
    }
}

/// Test fixtures shared by unit and integration tests.
pub mod testing {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::context::{CurrentUser, ResolvedContext};
    use crate::scoped::ScopedGateway;
    use crate::types::{
        BusinessProfile, Membership, MembershipStatus, Plan, Principal, Profile, Role, Tenant,
        TenantWithPermissions,
    };

    /// A gateway for a fresh tenant/user pair with the given role.
    pub fn gateway(role: Role) -> ScopedGateway {
        gateway_for(Uuid::new_v4(), Uuid::new_v4(), role)
    }

    /// A gateway bound to specific ids, built through a resolved context the
    /// same way production code builds one.
    pub fn gateway_for(tenant_id: Uuid, user_id: Uuid, role: Role) -> ScopedGateway {
        let now = Utc::now();
        let principal = Principal {
            id: user_id,
            email: "caller@example.com".to_owned(),
            verified: true,
            name: None,
            avatar_url: None,
        };
        let profile = Profile {
            id: user_id,
            email: principal.email.clone(),
            name: None,
            avatar_url: None,
            current_tenant_id: Some(tenant_id),
            email_confirmed_at: Some(now),
            created_at: now,
        };
        let tenant = Tenant {
            id: tenant_id,
            name: "Fixture".to_owned(),
            owner_id: user_id,
            plan: Plan::Free,
            business: BusinessProfile::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let membership = Membership {
            id: Uuid::new_v4(),
            tenant_id,
            user_id,
            role,
            status: MembershipStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let current = TenantWithPermissions::new(tenant, membership);
        ScopedGateway::new(&ResolvedContext {
            user: CurrentUser { principal, profile },
            current_tenant: current.clone(),
            tenants: vec![current],
        })
    }
}
