use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::Role;

/// Tenancy events emitted by lifecycle actions.
///
/// Events are always fired from actions. If no listeners are registered,
/// they are silently ignored (no-op). Register listeners via
/// [`register_event_listeners`](crate::register_event_listeners) to handle events.
#[derive(Debug, Clone)]
pub enum TenancyEvent {
    // profile bootstrap
    ProfileProvisioned {
        profile_id: Uuid,
        email: String,
        at: DateTime<Utc>,
    },
    DefaultTenantProvisioned {
        tenant_id: Uuid,
        profile_id: Uuid,
        at: DateTime<Utc>,
    },

    // tenant lifecycle
    TenantCreated {
        tenant_id: Uuid,
        owner_id: Uuid,
        at: DateTime<Utc>,
    },
    TenantDeleted {
        tenant_id: Uuid,
        at: DateTime<Utc>,
    },
    TenantSwitched {
        profile_id: Uuid,
        tenant_id: Uuid,
        at: DateTime<Utc>,
    },

    // invitations
    InvitationCreated {
        invitation_id: Uuid,
        tenant_id: Uuid,
        email: String,
        at: DateTime<Utc>,
    },
    InvitationReissued {
        invitation_id: Uuid,
        tenant_id: Uuid,
        email: String,
        at: DateTime<Utc>,
    },
    InvitationAccepted {
        invitation_id: Uuid,
        tenant_id: Uuid,
        profile_id: Uuid,
        at: DateTime<Utc>,
    },

    // membership mutation
    MemberRoleChanged {
        membership_id: Uuid,
        tenant_id: Uuid,
        role: Role,
        at: DateTime<Utc>,
    },
    MemberRemoved {
        membership_id: Uuid,
        tenant_id: Uuid,
        at: DateTime<Utc>,
    },
}

impl TenancyEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProfileProvisioned { .. } => "profile.provisioned",
            Self::DefaultTenantProvisioned { .. } => "tenant.provisioned_default",
            Self::TenantCreated { .. } => "tenant.created",
            Self::TenantDeleted { .. } => "tenant.deleted",
            Self::TenantSwitched { .. } => "tenant.switched",
            Self::InvitationCreated { .. } => "invitation.created",
            Self::InvitationReissued { .. } => "invitation.reissued",
            Self::InvitationAccepted { .. } => "invitation.accepted",
            Self::MemberRoleChanged { .. } => "membership.role_changed",
            Self::MemberRemoved { .. } => "membership.removed",
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ProfileProvisioned { at, .. }
            | Self::DefaultTenantProvisioned { at, .. }
            | Self::TenantCreated { at, .. }
            | Self::TenantDeleted { at, .. }
            | Self::TenantSwitched { at, .. }
            | Self::InvitationCreated { at, .. }
            | Self::InvitationReissued { at, .. }
            | Self::InvitationAccepted { at, .. }
            | Self::MemberRoleChanged { at, .. }
            | Self::MemberRemoved { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let now = Utc::now();
        let id = Uuid::new_v4();

        assert_eq!(
            TenancyEvent::ProfileProvisioned {
                profile_id: id,
                email: "test@example.com".to_owned(),
                at: now
            }
            .name(),
            "profile.provisioned"
        );

        assert_eq!(
            TenancyEvent::DefaultTenantProvisioned {
                tenant_id: id,
                profile_id: id,
                at: now
            }
            .name(),
            "tenant.provisioned_default"
        );

        assert_eq!(
            TenancyEvent::TenantCreated {
                tenant_id: id,
                owner_id: id,
                at: now
            }
            .name(),
            "tenant.created"
        );

        assert_eq!(
            TenancyEvent::TenantDeleted {
                tenant_id: id,
                at: now
            }
            .name(),
            "tenant.deleted"
        );

        assert_eq!(
            TenancyEvent::TenantSwitched {
                profile_id: id,
                tenant_id: id,
                at: now
            }
            .name(),
            "tenant.switched"
        );

        assert_eq!(
            TenancyEvent::InvitationCreated {
                invitation_id: id,
                tenant_id: id,
                email: "test@example.com".to_owned(),
                at: now
            }
            .name(),
            "invitation.created"
        );

        assert_eq!(
            TenancyEvent::InvitationAccepted {
                invitation_id: id,
                tenant_id: id,
                profile_id: id,
                at: now
            }
            .name(),
            "invitation.accepted"
        );

        assert_eq!(
            TenancyEvent::MemberRoleChanged {
                membership_id: id,
                tenant_id: id,
                role: Role::Admin,
                at: now
            }
            .name(),
            "membership.role_changed"
        );

        assert_eq!(
            TenancyEvent::MemberRemoved {
                membership_id: id,
                tenant_id: id,
                at: now
            }
            .name(),
            "membership.removed"
        );
    }

    #[test]
    fn test_event_timestamp() {
        let now = Utc::now();

        let event = TenancyEvent::TenantSwitched {
            profile_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            at: now,
        };

        assert_eq!(event.timestamp(), now);
    }
}
