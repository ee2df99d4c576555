use chrono::{Duration, Utc};

use crate::config::InvitationConfig;
use crate::crypto::{generate_token, hash_token};
use crate::events::{self, TenancyEvent};
use crate::repository::{CreateInvitation, InvitationRepository};
use crate::scoped::ScopedGateway;
use crate::types::{Invitation, Role};
use crate::validators::validate_email;
use crate::{FieldErrors, SecretString, TenancyError};

/// Input data for inviting a member into the caller's current tenant.
#[derive(Debug, Clone)]
pub struct InviteMemberInput {
    pub email: String,
    /// Role to grant on acceptance. `Owner` is rejected as a field error.
    pub role: Role,
}

/// Output from creating or reissuing an invitation.
#[derive(Debug)]
pub struct InviteMemberOutput {
    /// The created or refreshed invitation record.
    pub invitation: Invitation,
    /// The plain token to deliver to the invitee (not stored, only returned once).
    pub token: SecretString,
}

/// Action to invite an email address into a tenant.
///
/// Invitations are idempotent per (tenant, email): a second invite reissues
/// the existing row with a fresh token, a fresh expiry and the new role
/// instead of accumulating duplicates. The returned clear token should be
/// delivered to the invitee (e.g. via an email listener); only its hash is
/// stored.
pub struct InviteMemberAction<I> {
    invitations: I,
    config: InvitationConfig,
}

impl<I: InvitationRepository> InviteMemberAction<I> {
    /// Creates a new `InviteMemberAction` with default configuration.
    pub fn new(invitations: I) -> Self {
        Self {
            invitations,
            config: InvitationConfig::default(),
        }
    }

    /// Creates a new `InviteMemberAction` with custom configuration.
    pub fn with_config(invitations: I, config: InvitationConfig) -> Self {
        Self {
            invitations,
            config,
        }
    }

    /// Creates or reissues the invitation.
    ///
    /// # Errors
    ///
    /// - [`TenancyError::Validation`] for a malformed email or an `Owner` role
    /// - [`TenancyError::Forbidden`] unless the caller is owner or admin
    /// - `Err(_)` on storage failures
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "invite_member", skip_all, err)
    )]
    pub async fn execute(
        &self,
        gateway: &ScopedGateway,
        input: InviteMemberInput,
    ) -> Result<InviteMemberOutput, TenancyError> {
        let mut fields = FieldErrors::new();
        if let Err(err) = validate_email(&input.email) {
            fields.push("email", err.to_string());
        }
        if input.role == Role::Owner {
            fields.push("role", "Owners cannot be invited");
        }
        if !fields.is_empty() {
            return Err(TenancyError::Validation(fields));
        }

        gateway.require_admin()?;

        let token = generate_token(self.config.token_bytes);
        let token_hash = hash_token(&token);
        let expires_at = Utc::now() + Duration::days(self.config.expiry_days);

        let existing = self
            .invitations
            .find_by_tenant_and_email(gateway.tenant_id(), &input.email)
            .await?;

        let invitation = match existing {
            Some(previous) => {
                let invitation = self
                    .invitations
                    .reissue(previous.id, input.role, &token_hash, expires_at)
                    .await?;
                log::info!(
                    target: "bailiwick",
                    "msg=\"invitation reissued\", tenant_id={}, invitation_id={}, email=\"{}\"",
                    invitation.tenant_id,
                    invitation.id,
                    invitation.email
                );
                events::dispatch(TenancyEvent::InvitationReissued {
                    invitation_id: invitation.id,
                    tenant_id: invitation.tenant_id,
                    email: invitation.email.clone(),
                    at: Utc::now(),
                })
                .await;
                invitation
            }
            None => {
                let invitation = self
                    .invitations
                    .create(CreateInvitation {
                        tenant_id: gateway.tenant_id(),
                        email: input.email,
                        role: input.role,
                        token_hash,
                        expires_at,
                    })
                    .await?;
                log::info!(
                    target: "bailiwick",
                    "msg=\"invitation created\", tenant_id={}, invitation_id={}, email=\"{}\"",
                    invitation.tenant_id,
                    invitation.id,
                    invitation.email
                );
                events::dispatch(TenancyEvent::InvitationCreated {
                    invitation_id: invitation.id,
                    tenant_id: invitation.tenant_id,
                    email: invitation.email.clone(),
                    at: Utc::now(),
                })
                .await;
                invitation
            }
        };

        Ok(InviteMemberOutput {
            invitation,
            token: SecretString::new(token),
        })
    }

    /// Unaccepted, unexpired invitations of the caller's tenant.
    pub async fn list_pending(
        &self,
        gateway: &ScopedGateway,
    ) -> Result<Vec<Invitation>, TenancyError> {
        gateway.require_admin()?;
        self.invitations
            .list_pending_for_tenant(gateway.tenant_id())
            .await
    }
}
