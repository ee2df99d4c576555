//! Core types for tenant membership and authorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role held by a member within a tenant.
///
/// The set is closed: capability checks are derived predicates on this enum,
/// never ad hoc string comparisons. `BillingAdmin` carries no elevated
/// authorization capability; it is member-equivalent for permission purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Member,
    BillingAdmin,
}

impl Role {
    /// Storage encoding of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
            Self::BillingAdmin => "BILLING_ADMIN",
        }
    }

    /// Parse from storage encoding.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OWNER" => Some(Self::Owner),
            "ADMIN" => Some(Self::Admin),
            "MEMBER" => Some(Self::Member),
            "BILLING_ADMIN" => Some(Self::BillingAdmin),
            _ => None,
        }
    }

    pub fn is_owner(self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Owner or admin.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    pub fn can_manage_members(self) -> bool {
        self.is_admin()
    }

    pub fn can_manage_settings(self) -> bool {
        self.is_owner()
    }
}

/// Lifecycle status of a membership row. Removal is a status transition,
/// never a row delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Active,
    Invited,
    Removed,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Invited => "INVITED",
            Self::Removed => "REMOVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "INVITED" => Some(Self::Invited),
            "REMOVED" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// Billing plan tier of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

/// An externally authenticated identity, as handed over by the identity
/// provider. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// External identity id; doubles as the profile id.
    pub id: Uuid,
    pub email: String,
    /// Whether the provider has verified the email address.
    pub verified: bool,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Application-level profile, 1:1 with a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the owning principal.
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    /// Advisory pointer to the tenant the user last operated in. Re-validated
    /// against live memberships on every context resolution.
    pub current_tenant_id: Option<Uuid>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Business and contact metadata attached to a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub country: Option<String>,
    pub language: String,
    pub timezone: String,
    pub currency: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            email: None,
            phone: None,
            website: None,
            country: None,
            language: "en".to_owned(),
            timezone: "UTC".to_owned(),
            currency: "USD".to_owned(),
        }
    }
}

/// An organization/workspace owning its own data; the unit of multi-tenancy.
///
/// Tenants are never hard-deleted: deletion sets `deleted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub plan: Plan,
    pub business: BusinessProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Joins a profile to a tenant with a role and status.
/// Unique per (profile, tenant) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

/// An invitation for an email address to join a tenant.
///
/// Unique per (tenant, email); re-inviting the same address reissues the row
/// in place instead of accumulating duplicates. Accepted invitations are kept
/// with their timestamp; expired ones are filtered by query, not purged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    /// Role to grant on acceptance. Never `Owner`.
    pub role: Role,
    /// SHA-256 hash of the single-use token; the clear token is never stored.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Check if the invitation has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Check if the invitation has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }
}

/// A tenant joined with the caller's membership in it, with capability flags
/// computed once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantWithPermissions {
    pub tenant: Tenant,
    pub membership: Membership,
    pub is_owner: bool,
    pub is_admin: bool,
    pub can_manage_members: bool,
    pub can_manage_settings: bool,
}

impl TenantWithPermissions {
    pub fn new(tenant: Tenant, membership: Membership) -> Self {
        let role = membership.role;
        Self {
            tenant,
            membership,
            is_owner: role.is_owner(),
            is_admin: role.is_admin(),
            can_manage_members: role.can_manage_members(),
            can_manage_settings: role.can_manage_settings(),
        }
    }
}
